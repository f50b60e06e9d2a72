// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth bridge server
//!
//! Authorizes downstream tool clients against an upstream OAuth identity
//! provider.

use oauth_bridge::{
    config::Config,
    db::{ClientRegistry, FirestoreDb, GrantStore, MemoryStore, UserStore},
    services::{GitHubClient, UpstreamProvider},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        public_url = %config.public_url,
        "Starting OAuth bridge"
    );

    let (clients, users, grants): (
        Arc<dyn ClientRegistry>,
        Arc<dyn UserStore>,
        Arc<dyn GrantStore>,
    ) = match config.gcp_project_id.as_deref() {
        Some(project_id) => {
            let db = Arc::new(FirestoreDb::new(project_id).await?);
            (db.clone(), db.clone(), db)
        }
        None => {
            tracing::warn!("GCP_PROJECT_ID not set, using in-memory storage");
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store.clone(), store)
        }
    };

    let upstream: Arc<dyn UpstreamProvider> = Arc::new(GitHubClient::new(&config)?);
    tracing::info!(
        authorize_url = %config.upstream_authorize_url,
        "Upstream provider client initialized"
    );

    let state = Arc::new(AppState::new(
        config.clone(),
        clients,
        users,
        grants,
        upstream,
    )?);

    // Build router
    let app = oauth_bridge::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("oauth_bridge=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
