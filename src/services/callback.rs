// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reconciliation of the Steam OpenID callback.
//!
//! Runs when the browser comes back from Steam: detect the callback, extract
//! and check the OpenID parameters, verify them with the backend, clean the
//! address bar and decide what the user sees next. All state is rebuilt from
//! the callback URL; nothing survives from the invocation that started the
//! Steam login.

use crate::error::{ErrorKind, LinkError};
use crate::models::openid::{self, OpenIdParams};
use crate::models::AssociationOutcome;
use crate::services::session::AuthSession;
use crate::services::steam::SteamLinkClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Address bar and router of the hosting view.
pub trait Navigator: Send + Sync {
    /// URL currently shown to the user.
    fn current_url(&self) -> String;

    /// Replace the current history entry without navigating.
    fn replace_url(&self, url: &str);

    /// Navigate to an in-app path.
    fn navigate(&self, path: &str);
}

/// How strictly a URL must look like a callback before the flow starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Detection {
    /// `openid.mode` present.
    #[default]
    Mode,
    /// `openid.mode` and `openid.identity` present.
    ModeAndIdentity,
}

impl Detection {
    fn matches(self, url: &str) -> bool {
        match self {
            Detection::Mode => openid::is_callback_url(url),
            Detection::ModeAndIdentity => openid::is_verified_callback_url(url),
        }
    }
}

/// States of the callback flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    DetectingCallback,
    /// The URL is not a Steam callback; nothing to show.
    NotApplicable,
    ExtractingParams,
    Verifying,
    Succeeded,
    Failed,
}

/// What the view should display after a run.
#[derive(Debug, Clone)]
pub struct FlowReport {
    pub state: FlowState,
    pub title: String,
    pub message: String,
    pub outcome: Option<AssociationOutcome>,
    pub error_kind: Option<ErrorKind>,
    /// Retrying verification cannot help; the user must start a new login.
    pub requires_new_login: bool,
    /// Number of `openid.*` keys in the callback URL
    pub param_count: usize,
    technical_detail: Option<String>,
    show_debug: bool,
}

impl FlowReport {
    fn empty(state: FlowState) -> Self {
        Self {
            state,
            title: String::new(),
            message: String::new(),
            outcome: None,
            error_kind: None,
            requires_new_login: false,
            param_count: 0,
            technical_detail: None,
            show_debug: false,
        }
    }

    /// Technical detail of a failure, only once the debug panel is open.
    pub fn technical_detail(&self) -> Option<&str> {
        if self.show_debug {
            self.technical_detail.as_deref()
        } else {
            None
        }
    }

    pub fn has_technical_detail(&self) -> bool {
        self.technical_detail.is_some()
    }

    pub fn status_label(&self) -> Option<&'static str> {
        self.outcome.as_ref().map(AssociationOutcome::status_label)
    }
}

/// Pending navigation to the profile view after a successful link.
///
/// Cancelled explicitly, when its parent flow is torn down, or when dropped.
pub struct RedirectTimer {
    token: CancellationToken,
    handle: Option<JoinHandle<bool>>,
}

impl RedirectTimer {
    pub fn schedule<N>(
        delay: Duration,
        navigator: Arc<N>,
        path: String,
        parent: &CancellationToken,
    ) -> Self
    where
        N: Navigator + 'static,
    {
        let token = parent.child_token();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => {
                    tracing::debug!("Profile redirect cancelled");
                    false
                }
                _ = tokio::time::sleep(delay) => {
                    tracing::info!(path = %path, "Redirecting to profile");
                    navigator.navigate(&path);
                    true
                }
            }
        });

        Self {
            token,
            handle: Some(handle),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for the timer; returns whether the redirect happened.
    pub async fn wait(mut self) -> bool {
        match self.handle.take() {
            Some(handle) => handle.await.unwrap_or(false),
            None => false,
        }
    }
}

impl Drop for RedirectTimer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// One run of the callback view.
pub struct CallbackFlow<'a, S, N> {
    client: &'a SteamLinkClient<S>,
    navigator: Arc<N>,
    profile_path: String,
    redirect_delay: Duration,
    detection: Detection,
    /// URL as it was when the view loaded, before any cleanup.
    url: String,
    state: FlowState,
    transitions: Vec<FlowState>,
    report: FlowReport,
    teardown: CancellationToken,
    timer: Option<RedirectTimer>,
}

impl<'a, S, N> CallbackFlow<'a, S, N>
where
    S: AuthSession,
    N: Navigator + 'static,
{
    pub fn new(
        client: &'a SteamLinkClient<S>,
        navigator: Arc<N>,
        profile_path: impl Into<String>,
        redirect_delay: Duration,
    ) -> Self {
        Self {
            client,
            navigator,
            profile_path: profile_path.into(),
            redirect_delay,
            detection: Detection::default(),
            url: String::new(),
            state: FlowState::Idle,
            transitions: vec![FlowState::Idle],
            report: FlowReport::empty(FlowState::Idle),
            teardown: CancellationToken::new(),
            timer: None,
        }
    }

    pub fn with_detection(mut self, detection: Detection) -> Self {
        self.detection = detection;
        self
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Every state the flow has been in, in order.
    pub fn transitions(&self) -> &[FlowState] {
        &self.transitions
    }

    pub fn report(&self) -> &FlowReport {
        &self.report
    }

    /// URL captured when the view loaded.
    pub fn original_url(&self) -> &str {
        &self.url
    }

    pub fn redirect_timer(&self) -> Option<&RedirectTimer> {
        self.timer.as_ref()
    }

    pub fn take_redirect_timer(&mut self) -> Option<RedirectTimer> {
        self.timer.take()
    }

    /// Token that tears the view down when cancelled.
    pub fn teardown_token(&self) -> CancellationToken {
        self.teardown.clone()
    }

    /// Tear the view down: cancel the redirect and ignore late results.
    pub fn teardown(&mut self) {
        self.teardown.cancel();
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    pub fn toggle_debug(&mut self) {
        self.report.show_debug = !self.report.show_debug;
    }

    /// Run the flow from page load.
    pub async fn run(&mut self) -> &FlowReport {
        self.transition(FlowState::DetectingCallback);
        self.url = self.navigator.current_url();
        self.report.param_count = openid::openid_param_count(&self.url);

        if !self.detection.matches(&self.url) {
            tracing::debug!("Not a Steam callback URL");
            self.transition(FlowState::NotApplicable);
            self.report = FlowReport::empty(FlowState::NotApplicable);
            return &self.report;
        }

        tracing::info!(
            param_count = self.report.param_count,
            "Steam callback detected"
        );
        self.process().await;
        &self.report
    }

    /// Retry from `Failed` with the parameters of the original URL.
    ///
    /// Returns `None` when the flow is not in the `Failed` state.
    pub async fn retry(&mut self) -> Option<&FlowReport> {
        if self.state != FlowState::Failed || self.teardown.is_cancelled() {
            return None;
        }

        tracing::info!("Retrying Steam callback verification");
        self.process().await;
        Some(&self.report)
    }

    async fn process(&mut self) {
        self.transition(FlowState::ExtractingParams);

        let Some(params) = OpenIdParams::from_url(&self.url) else {
            self.fail(LinkError::MissingParameters(vec!["openid.mode"]));
            return;
        };

        let missing = params.missing_required();
        if !missing.is_empty() {
            self.fail(LinkError::MissingParameters(missing));
            return;
        }

        self.transition(FlowState::Verifying);

        let client = self.client;
        let result = tokio::select! {
            result = client.verify_callback(&params) => result,
            _ = self.teardown.cancelled() => {
                tracing::info!("Callback view torn down, discarding verification result");
                return;
            }
        };

        match result {
            Ok(AssociationOutcome::Conflict { message }) => {
                self.fail(LinkError::Conflict(message));
            }
            Ok(outcome) => self.succeed(outcome).await,
            Err(e) => self.fail(e),
        }
    }

    async fn succeed(&mut self, outcome: AssociationOutcome) {
        self.clean_url();

        let message = match &outcome {
            AssociationOutcome::Created {
                steamid64,
                is_default,
            } => {
                let mut message = format!("Steam ID {steamid64} was linked to your account.");
                if *is_default {
                    message.push_str(" It is now your default Steam ID.");
                }
                message
            }
            AssociationOutcome::Existing { steamid64 } => {
                format!("Steam ID {steamid64} was already linked to your account.")
            }
            AssociationOutcome::Conflict { message } => message.clone(),
        };

        let client = self.client;
        tokio::select! {
            result = client.list_links() => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "Failed to refresh Steam ID list after linking");
                }
            }
            _ = self.teardown.cancelled() => {}
        }
        if self.teardown.is_cancelled() {
            tracing::info!("Callback view torn down, discarding verification result");
            return;
        }

        self.transition(FlowState::Succeeded);
        self.report = FlowReport {
            title: "Steam linked successfully".to_string(),
            message,
            outcome: Some(outcome),
            param_count: self.report.param_count,
            ..FlowReport::empty(FlowState::Succeeded)
        };

        self.timer = Some(RedirectTimer::schedule(
            self.redirect_delay,
            Arc::clone(&self.navigator),
            self.profile_path.clone(),
            &self.teardown,
        ));
    }

    fn fail(&mut self, err: LinkError) {
        self.clean_url();

        tracing::warn!(kind = %err.kind(), error = %err, "Steam callback failed");

        let title = match &err {
            LinkError::Conflict(_) => "Steam ID already linked",
            _ => "Steam authentication failed",
        };

        self.transition(FlowState::Failed);
        self.report = FlowReport {
            title: title.to_string(),
            message: err.user_message(),
            error_kind: Some(err.kind()),
            requires_new_login: err.requires_new_login(),
            param_count: self.report.param_count,
            technical_detail: Some(err.to_string()),
            show_debug: self.report.show_debug,
            ..FlowReport::empty(FlowState::Failed)
        };
    }

    /// Drop the provider parameters from the address bar, whatever the outcome.
    fn clean_url(&self) {
        let current = self.navigator.current_url();
        let cleaned = openid::strip_openid_params(&current);
        if cleaned != current {
            self.navigator.replace_url(&cleaned);
        }
    }

    fn transition(&mut self, to: FlowState) {
        tracing::debug!(from = ?self.state, to = ?to, "Callback flow transition");
        self.state = to;
        self.report.state = to;
        self.transitions.push(to);
    }
}

impl<S, N> Drop for CallbackFlow<'_, S, N> {
    fn drop(&mut self) {
        self.teardown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNavigator {
        visits: Mutex<Vec<String>>,
    }

    impl Navigator for RecordingNavigator {
        fn current_url(&self) -> String {
            String::new()
        }

        fn replace_url(&self, _url: &str) {}

        fn navigate(&self, path: &str) {
            self.visits.lock().unwrap().push(path.to_string());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_navigates_after_delay() {
        let navigator = Arc::new(RecordingNavigator::default());
        let parent = CancellationToken::new();
        let timer = RedirectTimer::schedule(
            Duration::from_secs(5),
            navigator.clone(),
            "/profile".to_string(),
            &parent,
        );

        assert!(timer.wait().await);
        assert_eq!(*navigator.visits.lock().unwrap(), vec!["/profile"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_cancel_prevents_navigation() {
        let navigator = Arc::new(RecordingNavigator::default());
        let parent = CancellationToken::new();
        let timer = RedirectTimer::schedule(
            Duration::from_secs(5),
            navigator.clone(),
            "/profile".to_string(),
            &parent,
        );

        timer.cancel();
        assert!(!timer.wait().await);
        assert!(navigator.visits.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_teardown_cancels_timer() {
        let navigator = Arc::new(RecordingNavigator::default());
        let parent = CancellationToken::new();
        let timer = RedirectTimer::schedule(
            Duration::from_secs(5),
            navigator.clone(),
            "/profile".to_string(),
            &parent,
        );

        parent.cancel();
        assert!(timer.is_cancelled());
        assert!(!timer.wait().await);
        assert!(navigator.visits.lock().unwrap().is_empty());
    }

    #[test]
    fn test_detection_strength() {
        let url = "https://x/cb?openid.mode=id_res";
        assert!(Detection::Mode.matches(url));
        assert!(!Detection::ModeAndIdentity.matches(url));
    }
}
