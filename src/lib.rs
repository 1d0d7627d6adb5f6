//! Pluggy → PostgreSQL synchronization service.
//!
//! Receives Pluggy webhook notifications about linked financial items,
//! fetches the affected resources from the Pluggy REST API, and persists
//! them as normalized rows keyed by the provider-assigned natural id.
//! Idempotent upserts make duplicate and redelivered webhooks harmless.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `errors`: Error handling types.
//! - `handlers`: Shared state and ancillary HTTP handlers.
//! - `mappers`: Pure provider-to-record conversion.
//! - `models`: Persisted row types.
//! - `pluggy_client`: Pluggy API client.
//! - `provider_models`: Typed Pluggy response schema.
//! - `storage`: Upsert-based persistence gateway.
//! - `sync`: Per-item sync orchestrator.
//! - `webhook_handler`: Webhook ingress and event dispatcher.
//! - `webhook_models`: Webhook payload models.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod mappers;
pub mod models;
pub mod pluggy_client;
pub mod provider_models;
pub mod storage;
pub mod sync;
pub mod webhook_handler;
pub mod webhook_models;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::AppState;

/// Build the application router.
///
/// The webhook route skips rate limiting: the provider expects a 2xx inside
/// its delivery timeout and throttling it would only trigger redeliveries.
/// The ancillary API routes are rate limited per client IP.
pub fn app_router(state: Arc<AppState>) -> Router {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .expect("valid rate limiter configuration"),
    );

    let api_routes = Router::new()
        .route("/api/items/:id", get(handlers::get_item))
        .route("/api/items/:id", delete(handlers::delete_item))
        .route("/api/accounts", get(handlers::list_accounts))
        .route("/api/transactions", get(handlers::list_transactions))
        .route("/api/transactions", post(handlers::create_transactions))
        .route(
            "/api/transactions/:id",
            delete(handlers::delete_transaction),
        )
        .route("/api/sync/:item_id", post(handlers::trigger_sync))
        .layer(
            ServiceBuilder::new()
                .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    let webhook_routes = Router::new()
        .route("/webhooks/pluggy", post(webhook_handler::pluggy_webhook))
        .layer(RequestBodyLimitLayer::new(1024 * 1024));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api_routes)
        .merge(webhook_routes)
        .with_state(state)
}
