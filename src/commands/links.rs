// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Listing and managing linked Steam accounts.

use crate::config::Brand;
use crate::error::Result;
use crate::models::LinkSet;
use crate::time_utils::{format_link_date, format_utc_rfc3339};
use crate::AppState;
use serde_json::json;
use std::process::ExitCode;

/// Profile URL on the Steam community site.
fn steam_profile_url(steamid64: &str) -> String {
    format!("https://steamcommunity.com/profiles/{steamid64}")
}

pub fn print_links(brand: &Brand, links: &LinkSet) {
    println!("{} - linked Steam accounts", brand.title);
    if links.is_empty() {
        println!("  No Steam accounts linked yet. Use `steam-link login` to add one.");
        return;
    }

    for link in links {
        let marker = if link.is_default { "*" } else { " " };
        println!(
            "{marker} {:<17}  linked {}  {}",
            link.steamid64,
            format_link_date(link.linked_at),
            steam_profile_url(&link.steamid64)
        );
    }
    println!("(* = default)");
}

fn links_json(links: &LinkSet) -> serde_json::Value {
    let entries: Vec<_> = links
        .iter()
        .map(|link| {
            json!({
                "steamid64": link.steamid64,
                "is_default": link.is_default,
                "linked_at": format_utc_rfc3339(link.linked_at),
            })
        })
        .collect();
    json!({ "steam_ids": entries })
}

/// `list`
pub async fn list(state: &AppState, as_json: bool) -> Result<()> {
    let links = state.steam.list_links().await?;

    if as_json {
        println!("{:#}", links_json(&links));
    } else {
        print_links(&state.config.brand, &links);
    }
    Ok(())
}

/// `set-default`
pub async fn set_default(state: &AppState, steamid64: &str) -> Result<()> {
    let links = state.steam.set_default(steamid64).await?;
    println!("Steam ID {steamid64} is now your default.");
    print_links(&state.config.brand, &links);
    Ok(())
}

/// `remove`: the default link is never offered for removal.
pub async fn remove(state: &AppState, steamid64: &str) -> Result<ExitCode> {
    let current = state.steam.list_links().await?;
    if current
        .default_link()
        .is_some_and(|link| link.steamid64 == steamid64)
    {
        eprintln!(
            "Steam ID {steamid64} is your default and cannot be removed. \
             Make another Steam ID the default first."
        );
        return Ok(ExitCode::FAILURE);
    }

    let links = state.steam.remove_link(steamid64).await?;
    println!("Steam ID {steamid64} was removed.");
    print_links(&state.config.brand, &links);
    Ok(ExitCode::SUCCESS)
}
