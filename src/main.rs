// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Steam-Link command line
//!
//! Links Steam accounts to a platform account through the Steam OpenID
//! association flow of the platform backend.

use clap::Parser;
use std::process::ExitCode;
use steam_link::{
    commands::{Cli, LogFormat},
    config::Config,
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(cli.log_format);

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::debug!(
        api_root = %config.api_root,
        tenant = %config.brand.tenant,
        "Configuration loaded"
    );

    let state = AppState::new(config).await?;

    cli.command.run(&state).await
}

/// Initialize logging on stderr; stdout is reserved for command output.
fn init_logging(format: LogFormat) {
    let json = (format == LogFormat::Json).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(true)
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let pretty = (format == LogFormat::Pretty).then(|| {
        tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("steam_link=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(json)
        .with(pretty)
        .init();
}
