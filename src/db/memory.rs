//! In-process storage backend.
//!
//! Used when no GCP project is configured and by the test suite. Uniqueness
//! and single-use semantics come from `DashMap`'s per-key locking.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use crate::db::{ClientRegistry, GrantStore, UserStore};
use crate::error::AppError;
use crate::models::{AuthorizationCode, ClientRegistration, Grant, Identity, UserRecord};
use crate::time_utils::format_utc_rfc3339;

/// In-memory store implementing every storage collaborator.
#[derive(Clone, Default)]
pub struct MemoryStore {
    clients: Arc<DashMap<String, ClientRegistration>>,
    /// Keyed by provider ID
    users: Arc<DashMap<u64, UserRecord>>,
    grants: Arc<DashMap<String, Grant>>,
    codes: Arc<DashMap<String, AuthorizationCode>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn get_user_by_provider_id(&self, provider_id: u64) -> Option<UserRecord> {
        self.users.get(&provider_id).map(|u| u.clone())
    }

    pub fn grant_count(&self) -> usize {
        self.grants.len()
    }

    pub fn code_count(&self) -> usize {
        self.codes.len()
    }

    /// Drop codes past their expiry along with their grants. A code that
    /// expired unredeemed never produced a token, so its grant is unreachable.
    fn evict_expired_codes(&self, now: i64) {
        let mut dead_grants = Vec::new();
        self.codes.retain(|_, code| {
            let live = code.expires_at >= now;
            if !live {
                dead_grants.push(code.grant_id.clone());
            }
            live
        });
        for grant_id in dead_grants {
            self.grants.remove(&grant_id);
        }
    }
}

#[async_trait]
impl ClientRegistry for MemoryStore {
    async fn find_client(&self, client_id: &str) -> Result<Option<ClientRegistration>, AppError> {
        Ok(self.clients.get(client_id).map(|c| c.clone()))
    }

    async fn register_client(&self, client: &ClientRegistration) -> Result<(), AppError> {
        match self.clients.entry(client.client_id.clone()) {
            Entry::Occupied(_) => Err(AppError::Database(format!(
                "client {} already registered",
                client.client_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(client.clone());
                Ok(())
            }
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn upsert_user(&self, identity: &Identity) -> Result<UserRecord, AppError> {
        let now = format_utc_rfc3339(Utc::now());
        let user = match self.users.entry(identity.provider_id) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().apply_identity(identity, &now);
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                let user = UserRecord::new(uuid::Uuid::new_v4().to_string(), identity, &now);
                slot.insert(user.clone());
                user
            }
        };
        Ok(user)
    }
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn put_grant(
        &self,
        grant: &Grant,
        code_hash: &str,
        code: &AuthorizationCode,
    ) -> Result<(), AppError> {
        self.evict_expired_codes(Utc::now().timestamp());
        self.grants.insert(grant.grant_id.clone(), grant.clone());
        self.codes.insert(code_hash.to_string(), code.clone());
        Ok(())
    }

    async fn take_code(&self, code_hash: &str) -> Result<Option<AuthorizationCode>, AppError> {
        Ok(self.codes.remove(code_hash).map(|(_, code)| code))
    }

    async fn get_grant(&self, grant_id: &str) -> Result<Option<Grant>, AppError> {
        Ok(self.grants.get(grant_id).map(|g| g.clone()))
    }
}
