// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Steam account association client.
//!
//! Wraps the backend endpoints that issue Steam login URLs, verify OpenID
//! callbacks and manage the user's linked SteamIDs. Every response is
//! validated here so callers only ever see typed results.

use crate::error::{LinkError, Result};
use crate::models::{
    AssociationOutcome, LinkSet, MessageResponse, OpenIdParams, SteamIdsResponse,
    SteamUrlResponse, VerifyRequest, VerifyResponse,
};
use crate::services::gateway::{ApiGateway, Endpoint};
use crate::services::session::AuthSession;
use tokio::sync::RwLock;

/// High-level client for Steam association.
pub struct SteamLinkClient<S> {
    gateway: ApiGateway<S>,
    callback_redirect_uri: String,
    /// Last listing returned by the backend; only ever replaced wholesale.
    links: RwLock<LinkSet>,
}

impl<S: AuthSession> SteamLinkClient<S> {
    pub fn new(gateway: ApiGateway<S>, callback_redirect_uri: impl Into<String>) -> Self {
        Self {
            gateway,
            callback_redirect_uri: callback_redirect_uri.into(),
            links: RwLock::new(LinkSet::default()),
        }
    }

    /// Address of the callback view Steam should return to.
    pub fn callback_redirect_uri(&self) -> &str {
        &self.callback_redirect_uri
    }

    /// Ask the backend for a Steam login URL bound to `redirect_uri`.
    ///
    /// The caller navigates the browser to the result with a full-page
    /// redirect; it is not an in-app route.
    pub async fn request_login_url(&self, redirect_uri: &str) -> Result<String> {
        tracing::info!(redirect_uri = %redirect_uri, "Requesting Steam login URL");

        let response: SteamUrlResponse = self
            .gateway
            .call(Endpoint::SteamUrl { redirect_uri })
            .await?;

        if response.steam_login_url.trim().is_empty() {
            return Err(LinkError::InvalidResponse(
                "no Steam login URL in response".to_string(),
            ));
        }

        tracing::info!("Steam login URL received");
        Ok(response.steam_login_url)
    }

    /// Verify a Steam callback with the backend and persist the link.
    ///
    /// Fails locally with `MissingParameters` if `openid.mode`,
    /// `openid.identity` or `openid.sig` is absent; such a request never
    /// reaches the network.
    pub async fn verify_callback(&self, params: &OpenIdParams) -> Result<AssociationOutcome> {
        let missing = params.missing_required();
        if !missing.is_empty() {
            tracing::warn!(missing = ?missing, "Refusing to verify incomplete callback");
            return Err(LinkError::MissingParameters(missing));
        }

        tracing::info!(
            param_count = params.len(),
            mode = params.mode().unwrap_or_default(),
            claimed_steamid = params.steamid64().unwrap_or("<unknown>"),
            "Verifying Steam callback"
        );

        let response: VerifyResponse = self
            .gateway
            .call_json(
                Endpoint::SteamVerify,
                &VerifyRequest {
                    openid_params: params,
                },
            )
            .await?;

        let message = response.message.clone();
        let outcome = AssociationOutcome::try_from(response)?;

        tracing::info!(
            status = outcome.status_label(),
            steamid64 = outcome.steamid64().unwrap_or_default(),
            backend_message = %message,
            "Steam verification finished"
        );
        Ok(outcome)
    }

    /// Fetch all links of the current user.
    pub async fn list_links(&self) -> Result<LinkSet> {
        let response: SteamIdsResponse = self.gateway.call(Endpoint::SteamIds).await?;
        if let Some(message) = response.message.as_deref() {
            tracing::debug!(backend_message = message, "Steam ID listing message");
        }

        let links = LinkSet::new(response.steam_ids)?;
        *self.links.write().await = links.clone();

        tracing::debug!(count = links.len(), "Steam IDs loaded");
        Ok(links)
    }

    /// Last listing fetched by [`Self::list_links`].
    pub async fn cached_links(&self) -> LinkSet {
        self.links.read().await.clone()
    }

    /// Make `steamid64` the default link and return the refreshed listing.
    pub async fn set_default(&self, steamid64: &str) -> Result<LinkSet> {
        let response: MessageResponse = self.gateway.call(Endpoint::SetDefault(steamid64)).await?;
        tracing::info!(
            steamid64,
            backend_message = %response.message,
            "Default Steam ID set"
        );

        self.list_links().await
    }

    /// Remove the link to `steamid64` and return the refreshed listing.
    ///
    /// The backend decides whether the link may be removed (it refuses to
    /// drop the default); nothing is removed locally.
    pub async fn remove_link(&self, steamid64: &str) -> Result<LinkSet> {
        let response: MessageResponse = self
            .gateway
            .call(Endpoint::RemoveSteamId(steamid64))
            .await?;
        tracing::info!(
            steamid64,
            backend_message = %response.message,
            "Steam ID removed"
        );

        self.list_links().await
    }
}
