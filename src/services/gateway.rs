// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authenticated HTTP gateway to the link backend.
//!
//! Handles:
//! - Bearer token and JSON content type on every call
//! - Fail-fast when there is no session
//! - A single refresh-and-replay when the backend answers 401
//! - Endpoint-specific deadlines

use crate::error::{LinkError, Result};
use crate::services::session::AuthSession;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Minimum remaining validity requested when refreshing after a 401.
pub const REFRESH_MIN_VALIDITY: Duration = Duration::from_secs(30);

/// Backend endpoints used by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    /// `GET /api/auth/steam_url?redirect_uri=...`
    SteamUrl { redirect_uri: &'a str },
    /// `POST /api/auth/steam_verify`
    SteamVerify,
    /// `GET /api/user/steam_ids`
    SteamIds,
    /// `DELETE /api/user/steam_ids/{steamid64}`
    RemoveSteamId(&'a str),
    /// `GET /api/user/steamid/{steamid64}/set_default`
    SetDefault(&'a str),
}

impl Endpoint<'_> {
    pub fn method(&self) -> Method {
        match self {
            Endpoint::SteamVerify => Method::POST,
            Endpoint::RemoveSteamId(_) => Method::DELETE,
            Endpoint::SteamUrl { .. } | Endpoint::SteamIds | Endpoint::SetDefault(_) => {
                Method::GET
            }
        }
    }

    /// Path relative to the API root.
    pub fn path(&self) -> String {
        match self {
            Endpoint::SteamUrl { .. } => "auth/steam_url".to_string(),
            Endpoint::SteamVerify => "auth/steam_verify".to_string(),
            Endpoint::SteamIds => "user/steam_ids".to_string(),
            Endpoint::RemoveSteamId(id) => format!("user/steam_ids/{}", urlencoding::encode(id)),
            Endpoint::SetDefault(id) => {
                format!("user/steamid/{}/set_default", urlencoding::encode(id))
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Endpoint::SteamUrl { .. } => "steam_url",
            Endpoint::SteamVerify => "steam_verify",
            Endpoint::SteamIds => "steam_ids",
            Endpoint::RemoveSteamId(_) => "remove_steam_id",
            Endpoint::SetDefault(_) => "set_default",
        }
    }
}

/// Request deadlines per endpoint class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Verification involves a server-side round trip to Steam.
    pub verify: Duration,
    pub login_url: Duration,
    pub default: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            verify: Duration::from_secs(15),
            login_url: Duration::from_secs(10),
            default: Duration::from_secs(8),
        }
    }
}

impl Timeouts {
    pub fn for_endpoint(&self, endpoint: &Endpoint<'_>) -> Duration {
        match endpoint {
            Endpoint::SteamVerify => self.verify,
            Endpoint::SteamUrl { .. } => self.login_url,
            _ => self.default,
        }
    }
}

/// Gateway that authenticates every backend call with the session token.
pub struct ApiGateway<S> {
    http: reqwest::Client,
    api_root: Url,
    session: Arc<S>,
    timeouts: Timeouts,
}

impl<S: AuthSession> ApiGateway<S> {
    pub fn new(api_root: Url, session: Arc<S>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_root,
            session,
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Call an endpoint without a body.
    pub async fn call<T: DeserializeOwned>(&self, endpoint: Endpoint<'_>) -> Result<T> {
        self.send(endpoint, None).await
    }

    /// Call an endpoint with a JSON body.
    pub async fn call_json<T, B>(&self, endpoint: Endpoint<'_>, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(body)
            .map_err(|e| LinkError::InvalidResponse(format!("failed to encode request: {e}")))?;
        self.send(endpoint, Some(body)).await
    }

    /// Send a request, refreshing the token and replaying once on 401.
    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint<'_>,
        body: Option<Vec<u8>>,
    ) -> Result<T> {
        let token = self.current_token().await?;

        match self.dispatch(&endpoint, &token, body.as_deref()).await {
            Err(LinkError::Unauthorized(detail)) => {
                tracing::info!(
                    endpoint = endpoint.name(),
                    detail = %detail,
                    "Backend rejected token, refreshing"
                );

                if let Err(e) = self.session.update_token(REFRESH_MIN_VALIDITY).await {
                    tracing::warn!(error = %e, "Token refresh failed, redirecting to login");
                    self.session.login().await;
                    return Err(LinkError::Unauthorized(format!("token refresh failed: {e}")));
                }

                let token = self.current_token().await?;
                // Replay exactly once; a second 401 surfaces as Unauthorized.
                self.dispatch(&endpoint, &token, body.as_deref()).await
            }
            other => other,
        }
    }

    async fn current_token(&self) -> Result<String> {
        if !self.session.is_logged_in().await {
            tracing::warn!("No active session");
            return Err(LinkError::Unauthenticated);
        }

        match self.session.token().await {
            Some(token) if !token.is_empty() => Ok(token),
            _ => {
                tracing::warn!("Session has no access token");
                Err(LinkError::Unauthenticated)
            }
        }
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint<'_>,
        token: &str,
        body: Option<&[u8]>,
    ) -> Result<T> {
        let url = self
            .api_root
            .join(&endpoint.path())
            .map_err(|e| LinkError::Transport(format!("invalid endpoint URL: {e}")))?;
        let timeout = self.timeouts.for_endpoint(endpoint);

        let mut request = self
            .http
            .request(endpoint.method(), url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "application/json")
            .timeout(timeout);

        if let Endpoint::SteamUrl { redirect_uri } = endpoint {
            request = request.query(&[("redirect_uri", redirect_uri)]);
        }
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        let started = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| classify_transport(e, timeout))?;
        let status = response.status();

        tracing::debug!(
            endpoint = endpoint.name(),
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Backend responded"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = LinkError::from_status(status.as_u16(), &body);
            if status.as_u16() != 401 {
                tracing::warn!(
                    endpoint = endpoint.name(),
                    status = status.as_u16(),
                    kind = %err.kind(),
                    "Backend request failed"
                );
            }
            return Err(err);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_transport(e, timeout))?;

        serde_json::from_slice(&bytes).map_err(|e| {
            LinkError::InvalidResponse(format!("{} returned malformed JSON: {e}", endpoint.name()))
        })
    }
}

fn classify_transport(err: reqwest::Error, timeout: Duration) -> LinkError {
    if err.is_timeout() {
        tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Request timed out");
        LinkError::Timeout(timeout)
    } else {
        LinkError::Transport(err.to_string())
    }
}
