// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use steam_link::config::Config;
use steam_link::error::LinkError;
use steam_link::services::{
    ApiGateway, AuthSession, CallbackFlow, Navigator, SteamLinkClient, Timeouts,
};
use url::Url;
use wiremock::MockServer;

#[allow(dead_code)]
pub const STEAMID: &str = "76561198000000000";

/// Callback URL as Steam sends it back, plus an unrelated app parameter.
#[allow(dead_code)]
pub fn callback_url() -> String {
    format!(
        "https://shop.example.com/steam-callback?tab=steam\
         &openid.ns=http%3A%2F%2Fspecs.openid.net%2Fauth%2F2.0\
         &openid.mode=id_res\
         &openid.claimed_id=https%3A%2F%2Fsteamcommunity.com%2Fopenid%2Fid%2F{STEAMID}\
         &openid.identity=https%3A%2F%2Fsteamcommunity.com%2Fopenid%2Fid%2F{STEAMID}\
         &openid.response_nonce=2025-01-01T00%3A00%3A00Zabc\
         &openid.sig=abc"
    )
}

/// Scripted identity-provider session.
#[allow(dead_code)]
pub struct FakeSession {
    token: Mutex<Option<String>>,
    /// Token installed by a successful refresh; `None` makes refresh fail.
    refreshed_token: Option<String>,
    pub refresh_calls: AtomicUsize,
    pub login_calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeSession {
    pub fn logged_in(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
            refreshed_token: None,
            refresh_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
        }
    }

    pub fn logged_out() -> Self {
        Self {
            token: Mutex::new(None),
            ..Self::logged_in("")
        }
    }

    /// Refreshing swaps the current token for `token`.
    pub fn refreshing_to(mut self, token: &str) -> Self {
        self.refreshed_token = Some(token.to_string());
        self
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logins(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }
}

impl AuthSession for FakeSession {
    async fn is_logged_in(&self) -> bool {
        self.token.lock().unwrap().is_some()
    }

    async fn token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    async fn update_token(&self, _min_validity: Duration) -> Result<bool, LinkError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        match &self.refreshed_token {
            Some(token) => {
                *self.token.lock().unwrap() = Some(token.clone());
                Ok(true)
            }
            None => Err(LinkError::Session("refresh token expired".to_string())),
        }
    }

    async fn login(&self) {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Navigator that records every address bar change and navigation.
#[allow(dead_code)]
pub struct RecordingNavigator {
    url: Mutex<String>,
    pub replaced: Mutex<Vec<String>>,
    pub visits: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingNavigator {
    pub fn at(url: &str) -> Arc<Self> {
        Arc::new(Self {
            url: Mutex::new(url.to_string()),
            replaced: Mutex::new(Vec::new()),
            visits: Mutex::new(Vec::new()),
        })
    }

    pub fn url(&self) -> String {
        self.url.lock().unwrap().clone()
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }

    pub fn replacements(&self) -> usize {
        self.replaced.lock().unwrap().len()
    }
}

impl Navigator for RecordingNavigator {
    fn current_url(&self) -> String {
        self.url()
    }

    fn replace_url(&self, url: &str) {
        *self.url.lock().unwrap() = url.to_string();
        self.replaced.lock().unwrap().push(url.to_string());
    }

    fn navigate(&self, path: &str) {
        self.visits.lock().unwrap().push(path.to_string());
    }
}

/// Config pointing at the mock backend.
#[allow(dead_code)]
pub fn test_config(server: &MockServer) -> Config {
    let origin = Url::parse(&server.uri()).expect("mock server URI");
    Config::test_default(&origin)
}

/// Gateway to the mock backend with short deadlines.
#[allow(dead_code)]
pub fn test_gateway(server: &MockServer, session: Arc<FakeSession>) -> ApiGateway<FakeSession> {
    let config = test_config(server);
    ApiGateway::new(config.api_root, session).with_timeouts(Timeouts {
        verify: Duration::from_millis(500),
        login_url: Duration::from_millis(500),
        default: Duration::from_millis(500),
    })
}

#[allow(dead_code)]
pub fn test_client(server: &MockServer, session: Arc<FakeSession>) -> SteamLinkClient<FakeSession> {
    let config = test_config(server);
    SteamLinkClient::new(test_gateway(server, session), config.callback_redirect_uri())
}

/// Callback flow with a short redirect delay.
#[allow(dead_code)]
pub fn test_flow<'a>(
    client: &'a SteamLinkClient<FakeSession>,
    navigator: Arc<RecordingNavigator>,
) -> CallbackFlow<'a, FakeSession, RecordingNavigator> {
    CallbackFlow::new(client, navigator, "/profile", Duration::from_millis(50))
}

/// Body of `GET /api/user/steam_ids`.
#[allow(dead_code)]
pub fn steam_ids_body(ids: &[(&str, bool)]) -> serde_json::Value {
    let steam_ids: Vec<_> = ids
        .iter()
        .map(|(id, is_default)| {
            serde_json::json!({
                "steamid64": id,
                "is_default": is_default,
                "linked_at": "2025-01-02T03:04:05Z",
            })
        })
        .collect();
    serde_json::json!({ "steam_ids": steam_ids })
}
