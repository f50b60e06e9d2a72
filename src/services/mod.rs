// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod approval;
pub mod binder;
pub mod cookie_codec;
pub mod flow_state;
pub mod grants;
pub mod keys;
pub mod random;
pub mod sealing;
pub mod signing;
pub mod tokens;
pub mod upstream;

pub use approval::ApprovalGate;
pub use binder::CallbackBinder;
pub use cookie_codec::{ApprovalRecord, AuthFailure, CookieCodec};
pub use flow_state::{FlowState, FlowStateSigner, StateError};
pub use grants::GrantIssuer;
pub use keys::KeyRing;
pub use sealing::{PropsSealer, SealError};
pub use tokens::{AccessClaims, AccessTokenIssuer, IssuedToken};
pub use upstream::{GitHubClient, UpstreamProvider};
