// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storing and inspecting the identity-provider session.

use crate::commands::report_error;
use crate::services::session::token_expiry;
use crate::services::{AuthSession, SessionTokens};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use clap::Subcommand;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Store tokens obtained from the identity provider
    Set {
        /// Access token; read from stdin when omitted
        #[arg(long)]
        access_token: Option<String>,
        #[arg(long)]
        refresh_token: Option<String>,
    },
    /// Show whether a session is stored and when it expires
    Status,
    /// Forget the stored session
    Clear,
}

impl SessionCommand {
    pub async fn run(self, state: &AppState) -> anyhow::Result<ExitCode> {
        let result = match self {
            SessionCommand::Set {
                access_token,
                refresh_token,
            } => {
                let access_token = match access_token {
                    Some(token) => token,
                    None => read_token_from_stdin().await?,
                };
                if access_token.is_empty() {
                    anyhow::bail!("access token is empty");
                }

                state
                    .session
                    .store(SessionTokens {
                        access_token,
                        refresh_token,
                    })
                    .await
                    .map(|()| {
                        println!("Session stored in {}", state.config.session_file.display());
                    })
            }
            SessionCommand::Status => {
                print_status(state).await;
                Ok(())
            }
            SessionCommand::Clear => state.session.clear().await.map(|()| {
                println!("Session cleared.");
            }),
        };

        match result {
            Ok(()) => Ok(ExitCode::SUCCESS),
            Err(err) => {
                report_error(state, &err).await;
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

async fn read_token_from_stdin() -> anyhow::Result<String> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let line = lines.next_line().await?.unwrap_or_default();
    Ok(line.trim().to_string())
}

async fn print_status(state: &AppState) {
    let Some(token) = state.session.token().await else {
        println!("Not logged in.");
        println!("Log in at: {}", state.session.login_url());
        return;
    };

    match token_expiry(&token) {
        Some(exp) => println!("Logged in, access token expires {}", format_utc_rfc3339(exp)),
        None => println!("Logged in, access token expiry unknown"),
    }
}
