// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides the storage collaborators for:
//! - Clients (downstream registrations)
//! - Users (keyed by upstream provider ID)
//! - Grants and single-use authorization codes

use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::FirestoreWritePrecondition;

use crate::db::{collections, ClientRegistry, GrantStore, UserStore};
use crate::error::AppError;
use crate::models::{AuthorizationCode, ClientRegistration, Grant, Identity, UserRecord};
use crate::time_utils::format_utc_rfc3339;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, provider_id: u64) -> Result<Option<UserRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&provider_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn update_user(&self, user: &UserRecord) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(user.provider_id.to_string())
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Create the user document, failing if one already exists.
    ///
    /// Returns `Ok(false)` when another request created it first.
    async fn insert_user(&self, user: &UserRecord) -> Result<bool, AppError> {
        let result: Result<UserRecord, FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(user.provider_id.to_string())
            .object(user)
            .execute()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(FirestoreError::DataConflictError(_)) => Ok(false),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }
}

#[async_trait]
impl ClientRegistry for FirestoreDb {
    async fn find_client(&self, client_id: &str) -> Result<Option<ClientRegistration>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CLIENTS)
            .obj()
            .one(client_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn register_client(&self, client: &ClientRegistration) -> Result<(), AppError> {
        let _: ClientRegistration = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::CLIENTS)
            .document_id(&client.client_id)
            .object(client)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for FirestoreDb {
    async fn upsert_user(&self, identity: &Identity) -> Result<UserRecord, AppError> {
        let now = format_utc_rfc3339(chrono::Utc::now());

        if let Some(mut user) = self.get_user(identity.provider_id).await? {
            user.apply_identity(identity, &now);
            self.update_user(&user).await?;
            return Ok(user);
        }

        let user = UserRecord::new(uuid::Uuid::new_v4().to_string(), identity, &now);
        if self.insert_user(&user).await? {
            tracing::info!(
                provider_id = identity.provider_id,
                internal_id = %user.internal_id,
                "Created user"
            );
            return Ok(user);
        }

        // Lost the creation race: adopt the winner's record.
        let mut user = self.get_user(identity.provider_id).await?.ok_or_else(|| {
            AppError::Database(format!(
                "user {} vanished after insert conflict",
                identity.provider_id
            ))
        })?;
        user.apply_identity(identity, &now);
        self.update_user(&user).await?;
        Ok(user)
    }
}

#[async_trait]
impl GrantStore for FirestoreDb {
    async fn put_grant(
        &self,
        grant: &Grant,
        code_hash: &str,
        code: &AuthorizationCode,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::GRANTS)
            .document_id(&grant.grant_id)
            .object(grant)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add grant to transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::AUTH_CODES)
            .document_id(code_hash)
            .object(code)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add code to transaction: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;
        Ok(())
    }

    async fn take_code(&self, code_hash: &str) -> Result<Option<AuthorizationCode>, AppError> {
        let client = self.get_client()?;
        let code: Option<AuthorizationCode> = client
            .fluent()
            .select()
            .by_id_in(collections::AUTH_CODES)
            .obj()
            .one(code_hash)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(code) = code else {
            return Ok(None);
        };

        // Only the request whose delete succeeds gets to redeem the code.
        let deleted = client
            .fluent()
            .delete()
            .from(collections::AUTH_CODES)
            .document_id(code_hash)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .execute()
            .await;

        match deleted {
            Ok(()) => Ok(Some(code)),
            Err(FirestoreError::DataNotFoundError(_)) | Err(FirestoreError::DataConflictError(_)) => {
                tracing::warn!("Authorization code redeemed concurrently");
                Ok(None)
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    async fn get_grant(&self, grant_id: &str) -> Result<Option<Grant>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::GRANTS)
            .obj()
            .one(grant_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
