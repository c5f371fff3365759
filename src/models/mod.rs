// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod link;
pub mod openid;
pub mod outcome;

pub use link::{ExternalIdentityLink, LinkSet};
pub use openid::OpenIdParams;
pub use outcome::{
    AssociationOutcome, MessageResponse, SteamIdsResponse, SteamUrlResponse, VerifyRequest,
    VerifyResponse, VerifyStatus,
};
