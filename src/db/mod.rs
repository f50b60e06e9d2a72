//! Storage collaborators.
//!
//! The bridge only needs three narrow stores. Both backends enforce the
//! uniqueness that keeps concurrent logins from duplicating a user: the
//! provider ID is the map key / document ID.

pub mod firestore;
pub mod memory;

use async_trait::async_trait;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{AuthorizationCode, ClientRegistration, Grant, Identity, UserRecord};

/// Collection names as constants.
pub mod collections {
    pub const CLIENTS: &str = "clients";
    pub const USERS: &str = "users";
    pub const GRANTS: &str = "grants";
    /// Authorization codes, keyed by the SHA-256 of the code
    pub const AUTH_CODES: &str = "auth_codes";
}

/// Registered downstream clients.
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    async fn find_client(&self, client_id: &str) -> Result<Option<ClientRegistration>, AppError>;

    async fn register_client(&self, client: &ClientRegistration) -> Result<(), AppError>;
}

/// Canonical local users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create or update the user for `identity.provider_id`.
    ///
    /// Idempotent: a repeat login updates mutable fields and keeps the
    /// original `internal_id`.
    async fn upsert_user(&self, identity: &Identity) -> Result<UserRecord, AppError>;
}

/// Grant and authorization-code persistence for the token endpoint.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Store a grant together with the code that redeems it.
    async fn put_grant(
        &self,
        grant: &Grant,
        code_hash: &str,
        code: &AuthorizationCode,
    ) -> Result<(), AppError>;

    /// Remove and return a code. A second call with the same hash returns `None`.
    async fn take_code(&self, code_hash: &str) -> Result<Option<AuthorizationCode>, AppError>;

    async fn get_grant(&self, grant_id: &str) -> Result<Option<Grant>, AppError>;
}
