// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Steam accounts linked to the signed-in user.

use crate::error::LinkError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// One Steam account bound to the platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentityLink {
    /// SteamID64 of the linked account
    pub steamid64: String,
    /// Whether this is the user's primary Steam account
    pub is_default: bool,
    /// When the link was created
    #[serde(deserialize_with = "deserialize_linked_at")]
    pub linked_at: DateTime<Utc>,
}

/// All links of one user, as last reported by the backend.
///
/// Construction enforces the listing invariants: SteamIDs are unique and at
/// most one link is the default. The set is only ever replaced wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LinkSet(Vec<ExternalIdentityLink>);

impl LinkSet {
    pub fn new(links: Vec<ExternalIdentityLink>) -> Result<Self, LinkError> {
        let mut seen = HashSet::new();
        for link in &links {
            if !seen.insert(link.steamid64.as_str()) {
                return Err(LinkError::InvalidResponse(format!(
                    "duplicate Steam ID {} in listing",
                    link.steamid64
                )));
            }
        }

        let defaults = links.iter().filter(|l| l.is_default).count();
        if defaults > 1 {
            return Err(LinkError::InvalidResponse(format!(
                "{defaults} links marked as default"
            )));
        }

        Ok(Self(links))
    }

    pub fn default_link(&self) -> Option<&ExternalIdentityLink> {
        self.0.iter().find(|l| l.is_default)
    }

    pub fn get(&self, steamid64: &str) -> Option<&ExternalIdentityLink> {
        self.0.iter().find(|l| l.steamid64 == steamid64)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExternalIdentityLink> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a LinkSet {
    type Item = &'a ExternalIdentityLink;
    type IntoIter = std::slice::Iter<'a, ExternalIdentityLink>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Parse a backend timestamp.
///
/// Accepts RFC 3339, a naive ISO 8601 timestamp (taken as UTC) and the
/// RFC 2822 form that Flask-style JSON encoders emit.
pub fn parse_linked_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    // RFC 2822 requires a numeric zone; Flask emits "GMT".
    let rfc2822 = raw.strip_suffix(" GMT").map(|s| format!("{s} +0000"));
    DateTime::parse_from_rfc2822(rfc2822.as_deref().unwrap_or(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn deserialize_linked_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_linked_at(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid linked_at timestamp: {raw}")))
}
