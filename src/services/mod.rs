// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - session, backend gateway and association logic.

pub mod callback;
pub mod gateway;
pub mod session;
pub mod steam;

pub use callback::{CallbackFlow, Detection, FlowReport, FlowState, Navigator, RedirectTimer};
pub use gateway::{ApiGateway, Endpoint, Timeouts};
pub use session::{AuthSession, KeycloakSession, SessionTokens};
pub use steam::SteamLinkClient;
