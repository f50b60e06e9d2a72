// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod client;
pub mod grant;
pub mod props;
pub mod request;
pub mod user;

pub use client::ClientRegistration;
pub use grant::{AuthorizationCode, Grant};
pub use props::{Props, UserContext};
pub use request::{AuthorizationRequest, ScopeSet};
pub use user::{Identity, UpstreamToken, UserRecord};
