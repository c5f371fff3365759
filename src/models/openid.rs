// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Steam OpenID 2.0 callback parameters extracted from a redirect URL.

use serde::Serialize;
use std::collections::BTreeMap;
use url::{form_urlencoded, Url};

/// Query keys of a Steam OpenID 2.0 positive assertion.
pub const OPENID_KEYS: [&str; 10] = [
    "openid.ns",
    "openid.mode",
    "openid.op_endpoint",
    "openid.claimed_id",
    "openid.identity",
    "openid.return_to",
    "openid.response_nonce",
    "openid.assoc_handle",
    "openid.signed",
    "openid.sig",
];

/// Keys that must be present (and non-empty) before verification is attempted.
pub const REQUIRED_KEYS: [&str; 3] = ["openid.mode", "openid.identity", "openid.sig"];

const OPENID_PREFIX: &str = "openid.";
const STEAM_IDENTITY_PREFIXES: [&str; 2] = [
    "https://steamcommunity.com/openid/id/",
    "http://steamcommunity.com/openid/id/",
];

/// Recognized OpenID parameters of one callback URL.
///
/// Only keys that appear in the URL are stored; absent keys are omitted
/// rather than set to empty. Serializes as a flat JSON object keyed by the
/// full parameter name, which is the shape the verify endpoint expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OpenIdParams(BTreeMap<&'static str, String>);

impl OpenIdParams {
    /// Extract the recognized parameters from a callback URL.
    ///
    /// Returns `None` when the URL does not parse or carries no
    /// `openid.mode` value; an unparsable URL is "not a callback".
    pub fn from_url(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        let mut params = BTreeMap::new();

        for (key, value) in parsed.query_pairs() {
            if let Some(known) = OPENID_KEYS.iter().find(|k| **k == key) {
                params.insert(*known, value.into_owned());
            }
        }

        let params = Self(params);
        if params.has("openid.mode") {
            Some(params)
        } else {
            None
        }
    }

    /// Value of a recognized key, if the URL carried it.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether a key is present with a non-empty value.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty())
    }

    pub fn mode(&self) -> Option<&str> {
        self.get("openid.mode")
    }

    pub fn identity(&self) -> Option<&str> {
        self.get("openid.identity")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    /// Required keys that are absent or empty, in canonical order.
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| !self.has(key))
            .collect()
    }

    /// SteamID64 claimed by the identity URL.
    ///
    /// For display and logging only; the backend performs the actual
    /// verification and decides which account is linked.
    pub fn steamid64(&self) -> Option<&str> {
        let identity = self.identity()?;
        let id = STEAM_IDENTITY_PREFIXES
            .iter()
            .find_map(|prefix| identity.strip_prefix(prefix))?;
        let id = id.trim_end_matches('/');

        if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
            Some(id)
        } else {
            None
        }
    }

    #[cfg(test)]
    pub(crate) fn from_pairs(pairs: &[(&'static str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| (*k, (*v).to_string()))
                .collect(),
        )
    }
}

/// Whether the URL looks like a Steam OpenID callback (`openid.mode` present).
pub fn is_callback_url(url: &str) -> bool {
    OpenIdParams::from_url(url).is_some()
}

/// Stricter callback check that also requires `openid.identity`.
pub fn is_verified_callback_url(url: &str) -> bool {
    OpenIdParams::from_url(url).is_some_and(|p| p.has("openid.identity"))
}

/// Number of `openid.*` query keys in the URL, recognized or not.
pub fn openid_param_count(url: &str) -> usize {
    Url::parse(url)
        .map(|u| {
            u.query_pairs()
                .filter(|(k, _)| k.starts_with(OPENID_PREFIX))
                .count()
        })
        .unwrap_or(0)
}

/// Remove every `openid.*` key from the URL's query.
///
/// Other query keys and the fragment are kept; an empty query is dropped
/// entirely. An unparsable URL is returned unchanged.
pub fn strip_openid_params(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };

    // Filter raw segments so the remaining keys keep their original encoding.
    let kept: Vec<&str> = parsed
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|segment| !segment.is_empty() && !is_openid_segment(segment))
        .collect();
    let kept = kept.join("&");

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.set_query(Some(&kept));
    }

    parsed.to_string()
}

fn is_openid_segment(segment: &str) -> bool {
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .is_some_and(|(key, _)| key.starts_with(OPENID_PREFIX))
}
