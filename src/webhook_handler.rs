use axum::{extract::State, http::StatusCode, Json};
use serde_json::Value;
use std::sync::Arc;

use crate::errors::AppError;
use crate::handlers::AppState;
use crate::mappers;
use crate::pluggy_client::PluggyClient;
use crate::storage::SyncStorage;
use crate::sync::SyncService;
use crate::webhook_models::{WebhookAck, WebhookEventKind, WebhookPayload};

/// Pluggy webhook ingress.
///
/// Validates the envelope (`event` + `eventId` required) and acknowledges
/// immediately with 200; the actual processing runs in a spawned task.
/// Pluggy redelivers any webhook not answered 2xx within ~5 seconds, and a
/// slow sync can take longer than that. Acking first is safe because every
/// downstream write is an idempotent upsert, so redeliveries and the rare
/// lost in-flight task are both absorbed by the next delivery.
pub async fn pluggy_webhook(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<WebhookAck>), AppError> {
    if !body.is_object() {
        return Err(AppError::BadRequest(
            "Webhook body must be a JSON object".to_string(),
        ));
    }
    for field in ["event", "eventId"] {
        if body.get(field).and_then(|v| v.as_str()).is_none() {
            return Err(AppError::BadRequest(format!(
                "Webhook body missing required field '{}'",
                field
            )));
        }
    }

    let payload: WebhookPayload = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook body: {}", e)))?;

    tracing::info!(
        "Received webhook event {} ({})",
        payload.event,
        payload.event_id
    );

    let ack = WebhookAck {
        received: true,
        event: payload.event.clone(),
        event_id: payload.event_id.clone(),
    };

    tokio::spawn(dispatch_event(state, payload));

    Ok((StatusCode::OK, Json(ack)))
}

/// Route one event to its handler.
///
/// This boundary never raises: any handler error is logged and absorbed so
/// the provider is never pushed into a redelivery storm by our own failures.
pub async fn dispatch_event(state: Arc<AppState>, payload: WebhookPayload) {
    let kind = WebhookEventKind::parse(&payload.event);

    let result = match &kind {
        WebhookEventKind::ItemCreated
        | WebhookEventKind::ItemUpdated
        | WebhookEventKind::ItemLoginSucceeded => {
            handle_item_refresh(&state, &payload, true).await
        }
        // Status refresh only: the connection is not in a syncable state.
        WebhookEventKind::ItemError | WebhookEventKind::ItemWaitingUserInput => {
            handle_item_refresh(&state, &payload, false).await
        }
        WebhookEventKind::ItemDeleted => handle_item_deleted(&state, &payload).await,
        WebhookEventKind::ConnectorStatusUpdated => {
            tracing::info!(
                "Connector status update: connector={:?} data={:?}",
                payload.connector_id,
                payload.data
            );
            Ok(())
        }
        // created and updated share one idempotent upsert path.
        WebhookEventKind::TransactionsCreated | WebhookEventKind::TransactionsUpdated => {
            handle_transactions_upsert(&state, &payload).await
        }
        WebhookEventKind::TransactionsDeleted => {
            handle_transactions_deleted(&state, &payload).await
        }
        WebhookEventKind::Payment(tag) => {
            // Payment lifecycle events carry no data this integration
            // persists; received and logged only.
            tracing::info!("Payment event {} received ({}), not persisted", tag, payload.event_id);
            Ok(())
        }
        WebhookEventKind::Unknown(tag) => {
            tracing::warn!("Unrecognized webhook event '{}' ({})", tag, payload.event_id);
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!(
            "Webhook event {} ({}) failed: {}",
            payload.event,
            payload.event_id,
            e
        );
    }
}

/// Provider client, or a logged no-op when credentials are not configured.
fn provider_or_skip<'a>(state: &'a AppState, event: &str) -> Option<&'a PluggyClient> {
    if state.pluggy.is_none() {
        tracing::warn!(
            "Skipping webhook event {}: provider credentials not configured",
            event
        );
    }
    state.pluggy.as_ref()
}

/// Fetch the latest item state and upsert it; optionally run a full sync
/// pass afterwards.
async fn handle_item_refresh(
    state: &AppState,
    payload: &WebhookPayload,
    run_sync: bool,
) -> Result<(), AppError> {
    let Some(provider) = provider_or_skip(state, &payload.event) else {
        return Ok(());
    };
    let item_id = payload
        .item_id
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Item event without itemId".to_string()))?;

    let storage = SyncStorage::new(state.db.clone());

    let item = provider.fetch_item(item_id).await?;
    storage.upsert_item(&mappers::map_item(&item)).await?;

    if run_sync {
        let sync = SyncService::new(provider, &storage);
        sync.sync_item(item_id).await?;
    }

    Ok(())
}

async fn handle_item_deleted(state: &AppState, payload: &WebhookPayload) -> Result<(), AppError> {
    let item_id = payload
        .item_id
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("item/deleted without itemId".to_string()))?;

    let storage = SyncStorage::new(state.db.clone());
    storage.delete_item_cascade(item_id).await
}

/// Fetch the affected accounts' transactions, keep only the notified ids
/// when the envelope names them, and upsert the result.
async fn handle_transactions_upsert(
    state: &AppState,
    payload: &WebhookPayload,
) -> Result<(), AppError> {
    let Some(provider) = provider_or_skip(state, &payload.event) else {
        return Ok(());
    };
    let storage = SyncStorage::new(state.db.clone());

    // Explicit accountId, or every account under the item.
    let account_ids: Vec<String> = match payload.account_id.clone() {
        Some(account_id) => vec![account_id],
        None => {
            let item_id = payload.item_id.as_deref().ok_or_else(|| {
                AppError::BadRequest("Transaction event without accountId or itemId".to_string())
            })?;
            provider
                .fetch_accounts(item_id)
                .await?
                .into_iter()
                .map(|a| a.id)
                .collect()
        }
    };

    let wanted = payload
        .transaction_ids
        .as_deref()
        .filter(|ids| !ids.is_empty());

    let mut upserted = 0usize;
    for account_id in &account_ids {
        let transactions = provider.fetch_all_transactions(account_id).await?;
        let records: Vec<_> = transactions
            .iter()
            .filter(|t| wanted.map_or(true, |ids| ids.contains(&t.id)))
            .map(|t| mappers::map_transaction(t, account_id))
            .collect();
        upserted += storage.upsert_transactions(&records).await?;
    }

    tracing::info!(
        "Upserted {} transaction(s) across {} account(s) for event {}",
        upserted,
        account_ids.len(),
        payload.event_id
    );
    Ok(())
}

/// Batch-delete by natural key; an empty or absent id list is a no-op.
async fn handle_transactions_deleted(
    state: &AppState,
    payload: &WebhookPayload,
) -> Result<(), AppError> {
    let ids = match payload.transaction_ids.as_deref() {
        Some(ids) if !ids.is_empty() => ids,
        _ => {
            tracing::debug!(
                "transactions/deleted without transactionIds ({}), nothing to do",
                payload.event_id
            );
            return Ok(());
        }
    };

    let storage = SyncStorage::new(state.db.clone());
    storage.delete_transactions(ids).await?;
    Ok(())
}
