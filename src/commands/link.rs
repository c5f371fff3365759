// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Starting a Steam login and handling the callback.

use crate::commands::{links, print_login_hint};
use crate::error::{ErrorKind, Result};
use crate::services::{CallbackFlow, Detection, FlowReport, FlowState, Navigator};
use crate::AppState;
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Navigator for a terminal: the "address bar" is the URL we were given and
/// navigation is recorded for the command to act on.
pub struct TerminalNavigator {
    url: Mutex<String>,
    visited: Mutex<Option<String>>,
}

impl TerminalNavigator {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Mutex::new(url.into()),
            visited: Mutex::new(None),
        }
    }

    /// Path of the last in-app navigation, if any.
    pub fn visited(&self) -> Option<String> {
        self.visited
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Navigator for TerminalNavigator {
    fn current_url(&self) -> String {
        self.url
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn replace_url(&self, url: &str) {
        tracing::debug!(url, "Address bar cleaned");
        *self.url.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = url.to_string();
    }

    fn navigate(&self, path: &str) {
        *self
            .visited
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(path.to_string());
    }
}

/// `login`: print the Steam login URL the browser should be sent to.
pub async fn login(state: &AppState, redirect_uri: Option<String>) -> Result<()> {
    let redirect_uri =
        redirect_uri.unwrap_or_else(|| state.steam.callback_redirect_uri().to_string());

    let url = state.steam.request_login_url(&redirect_uri).await?;

    println!("{}", state.config.brand.title);
    println!("Open this URL in your browser to sign in with Steam:");
    println!();
    println!("  {url}");
    println!();
    println!("Steam will send you back to {redirect_uri}.");
    println!("Pass that full address to `steam-link callback`.");
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct CallbackOptions {
    pub strict: bool,
    pub wait: bool,
    pub debug: bool,
}

/// `callback`: reconcile the URL Steam returned to.
pub async fn callback(
    state: &AppState,
    url: String,
    options: CallbackOptions,
) -> anyhow::Result<ExitCode> {
    let navigator = Arc::new(TerminalNavigator::new(url));
    let detection = if options.strict {
        Detection::ModeAndIdentity
    } else {
        Detection::Mode
    };

    let mut flow = CallbackFlow::new(
        &state.steam,
        Arc::clone(&navigator),
        state.config.profile_path.clone(),
        state.config.redirect_delay,
    )
    .with_detection(detection);
    if options.debug {
        flow.toggle_debug();
    }

    // Ctrl-C tears the view down: pending verification results are
    // discarded and the profile redirect never fires.
    let teardown = flow.teardown_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, tearing down callback view");
            teardown.cancel();
        }
    });

    eprintln!("{}", progress_message(false));
    let mut report = flow.run().await.clone();
    let interactive = std::io::stdin().is_terminal();

    while report.state == FlowState::Failed {
        print_failure(&report);
        if matches!(
            report.error_kind,
            Some(ErrorKind::Unauthenticated | ErrorKind::Unauthorized)
        ) {
            print_login_hint(state).await;
            break;
        }
        if !interactive || report.requires_new_login {
            break;
        }

        match prompt_after_failure(report.has_technical_detail()).await {
            FailureChoice::Retry => {
                eprintln!("{}", progress_message(true));
                match flow.retry().await {
                    Some(next) => report = next.clone(),
                    None => break,
                }
            }
            FailureChoice::Details => {
                flow.toggle_debug();
                report = flow.report().clone();
            }
            FailureChoice::Quit => break,
        }
    }

    let code = match report.state {
        FlowState::Succeeded => {
            print_success(&report, &navigator.current_url());
            if let Some(timer) = flow.take_redirect_timer() {
                if options.wait {
                    println!(
                        "Going to your profile in {}s (Ctrl-C to stay here)...",
                        state.config.redirect_delay.as_secs()
                    );
                    if timer.wait().await {
                        show_profile(state, navigator.visited()).await;
                    }
                } else {
                    timer.cancel();
                }
            }
            ExitCode::SUCCESS
        }
        FlowState::NotApplicable => {
            println!("Not a Steam callback URL, nothing to do.");
            ExitCode::SUCCESS
        }
        FlowState::Failed => {
            if report.requires_new_login {
                println!("Start a new Steam login with `steam-link login`.");
            }
            ExitCode::FAILURE
        }
        other => {
            tracing::info!(state = ?other, "Callback view closed before completion");
            ExitCode::FAILURE
        }
    };

    ctrl_c.abort();
    Ok(code)
}

/// Shown while the callback is being checked and verified.
fn progress_message(retry: bool) -> &'static str {
    if retry {
        "Retrying Steam verification..."
    } else {
        "Checking Steam callback and verifying with the server..."
    }
}

enum FailureChoice {
    Retry,
    Details,
    Quit,
}

async fn prompt_after_failure(has_detail: bool) -> FailureChoice {
    if has_detail {
        println!("[r]etry, show [d]etails, or [q]uit?");
    } else {
        println!("[r]etry or [q]uit?");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    match lines.next_line().await {
        Ok(Some(line)) => match line.trim().to_ascii_lowercase().as_str() {
            "r" | "retry" => FailureChoice::Retry,
            "d" | "details" if has_detail => FailureChoice::Details,
            _ => FailureChoice::Quit,
        },
        _ => FailureChoice::Quit,
    }
}

fn print_success(report: &FlowReport, cleaned_url: &str) {
    println!("{}", report.title);
    println!("{}", report.message);
    if let Some(status) = report.status_label() {
        println!("Status: {status}");
    }
    tracing::debug!(url = cleaned_url, "Callback handled");
}

fn print_failure(report: &FlowReport) {
    eprintln!("{}", report.title);
    eprintln!("{}", report.message);
    if let Some(detail) = report.technical_detail() {
        eprintln!();
        eprintln!("Details: {detail}");
        eprintln!("OpenID parameters received: {}", report.param_count);
    }
}

/// What the profile view would show after the redirect.
async fn show_profile(state: &AppState, path: Option<String>) {
    let path = path.unwrap_or_else(|| state.config.profile_path.clone());
    println!();
    println!("{}{}", state.config.app_origin.origin().ascii_serialization(), path);
    links::print_links(&state.config.brand, &state.steam.cached_links().await);
}
