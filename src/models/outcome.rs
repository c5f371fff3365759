// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request and response bodies of the link backend, and the verified
//! association outcome derived from them.

use crate::error::LinkError;
use crate::models::{ExternalIdentityLink, OpenIdParams};
use serde::{Deserialize, Serialize};

/// Result of verifying a Steam callback with the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssociationOutcome {
    /// A new link was created.
    Created { steamid64: String, is_default: bool },
    /// The Steam account was already linked to this user.
    Existing { steamid64: String },
    /// The Steam account is linked to a different user.
    Conflict { message: String },
}

impl AssociationOutcome {
    pub fn steamid64(&self) -> Option<&str> {
        match self {
            AssociationOutcome::Created { steamid64, .. }
            | AssociationOutcome::Existing { steamid64 } => Some(steamid64),
            AssociationOutcome::Conflict { .. } => None,
        }
    }

    /// Short label describing the outcome.
    pub fn status_label(&self) -> &'static str {
        match self {
            AssociationOutcome::Created { .. } => "New link created",
            AssociationOutcome::Existing { .. } => "Already linked",
            AssociationOutcome::Conflict { .. } => "Conflict - linked to another account",
        }
    }
}

/// `GET /api/auth/steam_url` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SteamUrlResponse {
    #[serde(default)]
    pub steam_login_url: String,
}

/// `POST /api/auth/steam_verify` request body.
#[derive(Debug, Serialize)]
pub struct VerifyRequest<'a> {
    pub openid_params: &'a OpenIdParams,
}

/// Association status reported by the verify endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyStatus {
    Created,
    Existing,
    Conflict,
}

/// `POST /api/auth/steam_verify` response.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub message: String,
    pub steamid64: Option<String>,
    pub is_default: Option<bool>,
    pub status: VerifyStatus,
}

impl TryFrom<VerifyResponse> for AssociationOutcome {
    type Error = LinkError;

    fn try_from(response: VerifyResponse) -> Result<Self, Self::Error> {
        let steamid64 = response.steamid64.filter(|id| !id.is_empty());

        match (response.status, steamid64) {
            (VerifyStatus::Created, Some(steamid64)) => Ok(AssociationOutcome::Created {
                steamid64,
                is_default: response.is_default.unwrap_or(false),
            }),
            (VerifyStatus::Existing, Some(steamid64)) => {
                Ok(AssociationOutcome::Existing { steamid64 })
            }
            (VerifyStatus::Conflict, _) => Ok(AssociationOutcome::Conflict {
                message: response.message,
            }),
            (status, None) => Err(LinkError::InvalidResponse(format!(
                "verify status {status:?} without steamid64"
            ))),
        }
    }
}

/// `GET /api/user/steam_ids` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SteamIdsResponse {
    #[serde(default)]
    pub steam_ids: Vec<ExternalIdentityLink>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Plain `{ message }` acknowledgement of a mutation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}
