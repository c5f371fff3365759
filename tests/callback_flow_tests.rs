// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

mod common;

use common::{
    callback_url, steam_ids_body, test_client, test_flow, FakeSession, RecordingNavigator, STEAMID,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use steam_link::error::ErrorKind;
use steam_link::models::AssociationOutcome;
use steam_link::services::{Detection, FlowState};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_verify(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/api/auth/steam_verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_listing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/user/steam_ids"))
        .respond_with(ResponseTemplate::new(200).set_body_json(steam_ids_body(&[(STEAMID, true)])))
        .mount(server)
        .await;
}

fn logged_in() -> Arc<FakeSession> {
    Arc::new(FakeSession::logged_in("token"))
}

#[tokio::test]
async fn test_created_link_succeeds_and_redirects() {
    let server = MockServer::start().await;
    mount_verify(
        &server,
        json!({
            "message": "Steam ID linked",
            "steamid64": STEAMID,
            "is_default": true,
            "status": "created",
        }),
    )
    .await;
    mount_listing(&server).await;

    let client = test_client(&server, logged_in());
    let navigator = RecordingNavigator::at(&callback_url());
    let mut flow = test_flow(&client, Arc::clone(&navigator));

    let report = flow.run().await.clone();

    assert_eq!(report.state, FlowState::Succeeded);
    assert_eq!(report.title, "Steam linked successfully");
    assert!(report.message.contains(STEAMID));
    assert!(report.message.contains("default"));
    assert_eq!(
        report.outcome,
        Some(AssociationOutcome::Created {
            steamid64: STEAMID.to_string(),
            is_default: true,
        })
    );
    assert_eq!(
        flow.transitions(),
        &[
            FlowState::Idle,
            FlowState::DetectingCallback,
            FlowState::ExtractingParams,
            FlowState::Verifying,
            FlowState::Succeeded,
        ]
    );

    // Provider parameters are gone, the app's own parameter stays.
    assert_eq!(navigator.url(), "https://shop.example.com/steam-callback?tab=steam");
    assert_eq!(navigator.replacements(), 1);

    // The link list was refreshed.
    assert_eq!(client.cached_links().await.len(), 1);

    let timer = flow.take_redirect_timer().expect("redirect should be scheduled");
    assert!(timer.wait().await);
    assert_eq!(navigator.visits(), vec!["/profile"]);
}

#[tokio::test]
async fn test_existing_link_succeeds() {
    let server = MockServer::start().await;
    mount_verify(
        &server,
        json!({ "message": "ok", "steamid64": STEAMID, "status": "existing" }),
    )
    .await;
    mount_listing(&server).await;

    let client = test_client(&server, logged_in());
    let navigator = RecordingNavigator::at(&callback_url());
    let mut flow = test_flow(&client, navigator);

    let report = flow.run().await;

    assert_eq!(report.state, FlowState::Succeeded);
    assert_eq!(
        report.message,
        format!("Steam ID {STEAMID} was already linked to your account.")
    );
    assert_eq!(report.status_label(), Some("Already linked"));
}

#[tokio::test]
async fn test_conflict_fails_without_redirect() {
    let server = MockServer::start().await;
    mount_verify(
        &server,
        json!({ "status": "conflict", "message": "already linked" }),
    )
    .await;

    let client = test_client(&server, logged_in());
    let navigator = RecordingNavigator::at(&callback_url());
    let mut flow = test_flow(&client, Arc::clone(&navigator));

    let report = flow.run().await.clone();

    assert_eq!(report.state, FlowState::Failed);
    assert_eq!(report.title, "Steam ID already linked");
    assert_eq!(report.error_kind, Some(ErrorKind::Conflict));
    assert!(report.requires_new_login);
    assert!(!navigator.url().contains("openid."));
    assert!(flow.redirect_timer().is_none());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(navigator.visits().is_empty());
}

#[tokio::test]
async fn test_missing_params_fail_before_network() {
    let server = MockServer::start().await;
    Mock::given(path("/api/auth/steam_verify"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server, logged_in());
    let navigator = RecordingNavigator::at("https://x/cb?openid.mode=id_res&openid.sig=abc");
    let mut flow = test_flow(&client, Arc::clone(&navigator));

    let report = flow.run().await;

    assert_eq!(report.state, FlowState::Failed);
    assert_eq!(report.error_kind, Some(ErrorKind::MissingParameters));
    assert!(report.message.contains("openid.identity"));
    assert!(!flow.transitions().contains(&FlowState::Verifying));
    assert_eq!(navigator.url(), "https://x/cb");
}

#[tokio::test]
async fn test_non_callback_url_is_not_applicable() {
    let server = MockServer::start().await;
    let client = test_client(&server, logged_in());
    let navigator = RecordingNavigator::at("https://x/steam-callback?tab=steam");
    let mut flow = test_flow(&client, Arc::clone(&navigator));

    let report = flow.run().await;

    assert_eq!(report.state, FlowState::NotApplicable);
    assert!(report.message.is_empty());
    assert!(report.error_kind.is_none());
    assert_eq!(navigator.replacements(), 0);
}

#[tokio::test]
async fn test_strict_detection_requires_identity() {
    let server = MockServer::start().await;
    let client = test_client(&server, logged_in());
    let navigator = RecordingNavigator::at("https://x/cb?openid.mode=id_res&openid.sig=abc");
    let mut flow = test_flow(&client, navigator).with_detection(Detection::ModeAndIdentity);

    assert_eq!(flow.run().await.state, FlowState::NotApplicable);
}

#[tokio::test]
async fn test_retry_reuses_original_params() {
    let server = MockServer::start().await;
    Mock::given(path("/api/auth/steam_verify"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "error": "steam down" })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_verify(
        &server,
        json!({ "message": "ok", "steamid64": STEAMID, "is_default": false, "status": "created" }),
    )
    .await;
    mount_listing(&server).await;

    let client = test_client(&server, logged_in());
    let navigator = RecordingNavigator::at(&callback_url());
    let mut flow = test_flow(&client, Arc::clone(&navigator));

    let report = flow.run().await.clone();
    assert_eq!(report.state, FlowState::Failed);
    assert_eq!(report.error_kind, Some(ErrorKind::ServerError));
    assert!(report.message.contains("Steam servers"));
    assert!(!report.requires_new_login);

    // The address bar was already cleaned; retry uses the URL captured on load.
    assert!(!navigator.url().contains("openid."));
    let report = flow.retry().await.expect("retry from Failed").clone();

    assert_eq!(report.state, FlowState::Succeeded);
    assert_eq!(
        report.message,
        format!("Steam ID {STEAMID} was linked to your account.")
    );
    assert!(flow.original_url().contains("openid.sig=abc"));
    flow.teardown();
}

#[tokio::test]
async fn test_retry_only_from_failed() {
    let server = MockServer::start().await;
    let client = test_client(&server, logged_in());
    let mut flow = test_flow(&client, RecordingNavigator::at("https://x/profile"));

    flow.run().await;
    assert!(flow.retry().await.is_none());
}

#[tokio::test]
async fn test_debug_detail_hidden_until_toggled() {
    let server = MockServer::start().await;
    Mock::given(path("/api/auth/steam_verify"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "db exploded" })))
        .mount(&server)
        .await;

    let client = test_client(&server, logged_in());
    let mut flow = test_flow(&client, RecordingNavigator::at(&callback_url()));

    let report = flow.run().await;
    assert!(report.has_technical_detail());
    assert!(report.technical_detail().is_none());

    flow.toggle_debug();
    let detail = flow.report().technical_detail().expect("detail visible");
    assert!(detail.contains("db exploded"));
}

#[tokio::test]
async fn test_teardown_cancels_pending_redirect() {
    let server = MockServer::start().await;
    mount_verify(
        &server,
        json!({ "message": "ok", "steamid64": STEAMID, "status": "existing" }),
    )
    .await;
    mount_listing(&server).await;

    let client = test_client(&server, logged_in());
    let navigator = RecordingNavigator::at(&callback_url());
    let mut flow = test_flow(&client, Arc::clone(&navigator));

    flow.run().await;
    assert!(flow.redirect_timer().is_some());
    flow.teardown();

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(navigator.visits().is_empty());
}

#[tokio::test]
async fn test_teardown_discards_late_verification() {
    let server = MockServer::start().await;
    Mock::given(path("/api/auth/steam_verify"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "message": "ok", "steamid64": STEAMID, "status": "created" }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let client = test_client(&server, logged_in());
    let navigator = RecordingNavigator::at(&callback_url());
    let mut flow = test_flow(&client, Arc::clone(&navigator));

    let teardown = flow.teardown_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        teardown.cancel();
    });

    let report = flow.run().await;

    assert_eq!(report.state, FlowState::Verifying);
    assert!(report.outcome.is_none());
    assert!(flow.redirect_timer().is_none());
    assert!(navigator.visits().is_empty());
    assert!(flow.retry().await.is_none());
}

#[tokio::test]
async fn test_teardown_during_listing_refresh_discards_success() {
    let server = MockServer::start().await;
    mount_verify(
        &server,
        json!({ "message": "ok", "steamid64": STEAMID, "status": "created" }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/user/steam_ids"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(steam_ids_body(&[(STEAMID, true)]))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let client = test_client(&server, logged_in());
    let navigator = RecordingNavigator::at(&callback_url());
    let mut flow = test_flow(&client, Arc::clone(&navigator));

    let teardown = flow.teardown_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        teardown.cancel();
    });

    let report = flow.run().await;

    assert_eq!(report.state, FlowState::Verifying);
    assert!(report.outcome.is_none());
    assert!(!flow.transitions().contains(&FlowState::Succeeded));
    assert!(flow.redirect_timer().is_none());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(navigator.visits().is_empty());
}
