// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Command-line surface: one subcommand per view of the association flow.

pub mod link;
pub mod links;
pub mod session;

use crate::error::LinkError;
use crate::AppState;
use clap::{Parser, Subcommand, ValueEnum};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "steam-link", version, about = "Link Steam accounts to your platform account")]
pub struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Request a Steam login URL to start linking an account
    Login {
        /// Where Steam should send the browser back to
        #[arg(long)]
        redirect_uri: Option<String>,
    },
    /// Process the URL the browser was sent back to by Steam
    Callback {
        /// Full callback URL, including the openid.* parameters
        url: String,
        /// Also require openid.identity before treating the URL as a callback
        #[arg(long)]
        strict: bool,
        /// Do not wait for the redirect to the profile
        #[arg(long)]
        no_wait: bool,
        /// Show technical details of failures
        #[arg(long)]
        debug: bool,
    },
    /// List linked Steam accounts
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Make a linked Steam account the default
    SetDefault { steamid64: String },
    /// Remove a linked Steam account
    Remove { steamid64: String },
    /// Manage the stored identity-provider session
    #[command(subcommand)]
    Session(session::SessionCommand),
}

impl Command {
    pub async fn run(self, state: &AppState) -> anyhow::Result<ExitCode> {
        let result = match self {
            Command::Login { redirect_uri } => link::login(state, redirect_uri)
                .await
                .map(|()| ExitCode::SUCCESS),
            Command::Callback {
                url,
                strict,
                no_wait,
                debug,
            } => {
                let options = link::CallbackOptions {
                    strict,
                    wait: !no_wait,
                    debug,
                };
                return link::callback(state, url, options).await;
            }
            Command::List { json } => links::list(state, json)
                .await
                .map(|()| ExitCode::SUCCESS),
            Command::SetDefault { steamid64 } => links::set_default(state, &steamid64)
                .await
                .map(|()| ExitCode::SUCCESS),
            Command::Remove { steamid64 } => links::remove(state, &steamid64).await,
            Command::Session(command) => return command.run(state).await,
        };

        match result {
            Ok(code) => Ok(code),
            Err(err) => {
                report_error(state, &err).await;
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

/// Print a failure the way the views show it.
pub async fn report_error(state: &AppState, err: &LinkError) {
    eprintln!("Error: {}", err.user_message());

    if matches!(err, LinkError::Unauthenticated | LinkError::Unauthorized(_)) {
        print_login_hint(state).await;
    }
}

/// Tell the user where to log in with the identity provider.
pub async fn print_login_hint(state: &AppState) {
    let login_url = match state.session.take_pending_login().await {
        Some(url) => url,
        None => state.session.login_url(),
    };
    eprintln!("Log in at: {login_url}");
    eprintln!("Then store the session with `steam-link session set`.");
}
