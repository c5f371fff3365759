// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity-provider session used to authenticate backend calls.
//!
//! The session is owned by the identity provider (Keycloak); this crate only
//! needs to ask for the current token, whether the user is logged in, to
//! refresh a token that is about to expire and to send the user to login.

use crate::config::KeycloakConfig;
use crate::error::LinkError;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Access to the user's bearer token.
pub trait AuthSession: Send + Sync {
    /// Whether the provider considers the user logged in.
    fn is_logged_in(&self) -> impl Future<Output = bool> + Send;

    /// Current access token, if any.
    fn token(&self) -> impl Future<Output = Option<String>> + Send;

    /// Refresh the token if it expires within `min_validity`.
    ///
    /// Returns whether a refresh actually happened.
    fn update_token(
        &self,
        min_validity: Duration,
    ) -> impl Future<Output = Result<bool, LinkError>> + Send;

    /// Send the user to the provider's login page.
    fn login(&self) -> impl Future<Output = ()> + Send;
}

/// Tokens persisted between invocations.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

/// Claims we read from the access token; the signature is the backend's job.
#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    exp: i64,
}

/// Expiry (`exp`) of a JWT access token, without verifying its signature.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;

    let data = decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    DateTime::from_timestamp(data.claims.exp, 0)
}

/// Token endpoint response for the `refresh_token` grant.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Keycloak session backed by a token file.
pub struct KeycloakSession {
    http: reqwest::Client,
    keycloak: KeycloakConfig,
    path: PathBuf,
    login_redirect_uri: String,
    tokens: RwLock<Option<SessionTokens>>,
    /// Login URL the user was sent to, if a login was triggered.
    pending_login: Mutex<Option<String>>,
}

impl KeycloakSession {
    /// Load the session from `path`; a missing file means "logged out".
    pub async fn load(
        keycloak: KeycloakConfig,
        path: impl Into<PathBuf>,
        login_redirect_uri: String,
    ) -> Result<Self, LinkError> {
        let path = path.into();
        let tokens = read_tokens(&path).await?;

        tracing::debug!(
            path = %path.display(),
            logged_in = tokens.is_some(),
            "Session loaded"
        );

        Ok(Self {
            http: reqwest::Client::new(),
            keycloak,
            path,
            login_redirect_uri,
            tokens: RwLock::new(tokens),
            pending_login: Mutex::new(None),
        })
    }

    /// Replace the stored tokens and persist them.
    pub async fn store(&self, tokens: SessionTokens) -> Result<(), LinkError> {
        write_tokens(&self.path, &tokens).await?;
        *self.tokens.write().await = Some(tokens);
        Ok(())
    }

    /// Forget the session and remove the token file.
    pub async fn clear(&self) -> Result<(), LinkError> {
        *self.tokens.write().await = None;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LinkError::Session(format!(
                "failed to remove {}: {e}",
                self.path.display()
            ))),
        }
    }

    /// Provider login URL that returns to the application afterwards.
    pub fn login_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope=openid",
            self.keycloak.auth_endpoint(),
            urlencoding::encode(&self.keycloak.client_id),
            urlencoding::encode(&self.login_redirect_uri),
        )
    }

    /// Login URL recorded by the last [`AuthSession::login`] call.
    pub async fn take_pending_login(&self) -> Option<String> {
        self.pending_login.lock().await.take()
    }

    async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, LinkError> {
        let response = self
            .http
            .post(self.keycloak.token_endpoint())
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.keycloak.client_id.as_str()),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| LinkError::Session(format!("Token refresh request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "Token refresh rejected");
            return Err(LinkError::Session(format!(
                "Token refresh failed with status {status}: {body}"
            )));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| LinkError::Session(format!("Failed to parse token response: {e}")))?;

        Ok(SessionTokens {
            access_token: refreshed.access_token,
            // Keycloak may omit the refresh token when it is not rotated.
            refresh_token: refreshed
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
        })
    }
}

impl AuthSession for KeycloakSession {
    async fn is_logged_in(&self) -> bool {
        self.tokens.read().await.is_some()
    }

    async fn token(&self) -> Option<String> {
        self.tokens
            .read()
            .await
            .as_ref()
            .map(|t| t.access_token.clone())
            .filter(|t| !t.is_empty())
    }

    async fn update_token(&self, min_validity: Duration) -> Result<bool, LinkError> {
        let current = self.tokens.read().await.clone();
        let tokens = current.ok_or(LinkError::Unauthenticated)?;

        let margin = chrono::Duration::from_std(min_validity).unwrap_or_default();
        let still_valid = token_expiry(&tokens.access_token)
            .is_some_and(|exp| Utc::now() + margin < exp);
        if still_valid {
            return Ok(false);
        }

        let refresh_token = tokens
            .refresh_token
            .as_deref()
            .ok_or_else(|| LinkError::Session("no refresh token available".to_string()))?;

        tracing::info!("Access token expiring, refreshing");
        let refreshed = self.refresh(refresh_token).await?;
        self.store(refreshed).await?;
        tracing::info!("Token refreshed and stored");

        Ok(true)
    }

    async fn login(&self) {
        let url = self.login_url();
        tracing::warn!(login_url = %url, "Session expired, login required");
        *self.pending_login.lock().await = Some(url);
    }
}

async fn read_tokens(path: &Path) -> Result<Option<SessionTokens>, LinkError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(LinkError::Session(format!(
                "failed to read {}: {e}",
                path.display()
            )))
        }
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| LinkError::Session(format!("corrupt session file {}: {e}", path.display())))
}

async fn write_tokens(path: &Path, tokens: &SessionTokens) -> Result<(), LinkError> {
    let json = serde_json::to_vec_pretty(tokens)
        .map_err(|e| LinkError::Session(format!("failed to encode session: {e}")))?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| LinkError::Session(format!("failed to write {}: {e}", path.display())))
}
