// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Steam-Link: associate Steam accounts with a platform account
//!
//! This crate drives the Steam OpenID association flow against the
//! platform backend: it requests Steam login URLs, reconciles the OpenID
//! callback and manages the SteamIDs linked to the signed-in user.

pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;

use config::Config;
use services::{ApiGateway, KeycloakSession, SteamLinkClient};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub session: Arc<KeycloakSession>,
    pub steam: SteamLinkClient<KeycloakSession>,
}

impl AppState {
    /// Wire up the session and the link client from the configuration.
    pub async fn new(config: Config) -> Result<Self, error::LinkError> {
        let session = Arc::new(
            KeycloakSession::load(
                config.keycloak.clone(),
                config.session_file.clone(),
                config.profile_url(),
            )
            .await?,
        );

        let gateway = ApiGateway::new(config.api_root.clone(), Arc::clone(&session));
        let steam = SteamLinkClient::new(gateway, config.callback_redirect_uri());

        Ok(Self {
            config,
            session,
            steam,
        })
    }
}
