use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::AppError;
use crate::mappers;
use crate::models::{AccountRecord, ItemRecord, TransactionRecord};
use crate::pluggy_client::PluggyClient;
use crate::provider_models::ProviderTransaction;
use crate::storage::SyncStorage;
use crate::sync::{SyncReport, SyncService};

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// Provider client; `None` when credentials are not configured.
    pub pluggy: Option<PluggyClient>,
}

impl AppState {
    fn provider(&self) -> Result<&PluggyClient, AppError> {
        self.pluggy.as_ref().ok_or_else(|| {
            AppError::Configuration("Provider credentials not configured".to_string())
        })
    }

    fn storage(&self) -> SyncStorage {
        SyncStorage::new(self.db.clone())
    }
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-pluggy-sync",
            "version": "0.1.0"
        })),
    )
}

#[derive(Debug, Deserialize)]
pub struct ItemSourceParams {
    /// `store` (default) reads the persisted row; `live` reads through to
    /// the provider and refreshes the row on the way.
    pub source: Option<String>,
}

/// GET /api/items/:id
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
    Query(params): Query<ItemSourceParams>,
) -> Result<Json<ItemRecord>, AppError> {
    let storage = state.storage();

    if params.source.as_deref() == Some("live") {
        let provider = state.provider()?;
        let item = provider.fetch_item(&item_id).await?;
        let record = mappers::map_item(&item);
        storage.upsert_item(&record).await?;
        return Ok(Json(record));
    }

    let record = storage
        .get_item(&item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item {} not found", item_id)))?;
    Ok(Json(record))
}

/// DELETE /api/items/:id. Cascades over every dependent resource.
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.storage().delete_item_cascade(&item_id).await?;
    Ok(Json(json!({ "deleted": item_id })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountListParams {
    pub item_id: String,
}

/// GET /api/accounts?itemId=
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AccountListParams>,
) -> Result<Json<Vec<AccountRecord>>, AppError> {
    let accounts = state
        .storage()
        .get_accounts_by_item(&params.item_id)
        .await?;
    Ok(Json(accounts))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListParams {
    pub account_id: String,
}

/// GET /api/transactions?accountId=
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TransactionListParams>,
) -> Result<Json<Vec<TransactionRecord>>, AppError> {
    let transactions = state
        .storage()
        .get_transactions_by_account(&params.account_id)
        .await?;
    Ok(Json(transactions))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBatchBody {
    pub account_id: String,
    pub transactions: Vec<ProviderTransaction>,
}

/// POST /api/transactions. Manual batch insert of provider-shaped
/// transactions.
pub async fn create_transactions(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TransactionBatchBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    if body.transactions.is_empty() {
        return Err(AppError::BadRequest("No transactions provided".to_string()));
    }

    let records: Vec<_> = body
        .transactions
        .iter()
        .map(|t| mappers::map_transaction(t, &body.account_id))
        .collect();
    let upserted = state.storage().upsert_transactions(&records).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "upserted": upserted })),
    ))
}

/// DELETE /api/transactions/:id
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = state.storage().delete_transaction(&transaction_id).await?;
    Ok(Json(json!({ "deleted": deleted > 0 })))
}

/// POST /api/sync/:item_id. Runs an on-demand full sync pass.
pub async fn trigger_sync(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
) -> Result<Json<SyncReport>, AppError> {
    let provider = state.provider()?;
    let storage = state.storage();
    let report = SyncService::new(provider, &storage)
        .sync_item(&item_id)
        .await?;
    Ok(Json(report))
}
