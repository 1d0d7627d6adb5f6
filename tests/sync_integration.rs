//! End-to-end webhook scenarios against a real PostgreSQL database and a
//! mocked provider API.
//!
//! Marked ignored to avoid running against production by accident; set
//! TEST_DATABASE_URL (or DATABASE_URL) to run:
//!
//!     cargo test -- --ignored

use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rust_pluggy_sync::config::Config;
use rust_pluggy_sync::handlers::AppState;
use rust_pluggy_sync::mappers;
use rust_pluggy_sync::pluggy_client::PluggyClient;
use rust_pluggy_sync::provider_models::{ProviderAccount, ProviderItem};
use rust_pluggy_sync::storage::SyncStorage;
use rust_pluggy_sync::webhook_handler::dispatch_event;
use rust_pluggy_sync::webhook_models::WebhookPayload;

async fn test_pool() -> anyhow::Result<PgPool> {
    let db_url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let pool = PgPoolOptions::new().max_connections(5).connect(&db_url).await?;
    sqlx::raw_sql(include_str!("../migrations/0001_init.sql"))
        .execute(&pool)
        .await?;
    Ok(pool)
}

fn test_state(pool: PgPool, provider_url: String) -> Arc<AppState> {
    let config = Config {
        database_url: "postgresql://unused".to_string(),
        port: 3000,
        pluggy_base_url: provider_url.clone(),
        pluggy_client_id: Some("test-id".to_string()),
        pluggy_client_secret: Some("test-secret".to_string()),
        webhook_url: None,
    };
    let pluggy = PluggyClient::new(provider_url, "test-id".to_string(), "test-secret".to_string())
        .expect("client construction");

    Arc::new(AppState {
        db: pool,
        config,
        pluggy: Some(pluggy),
    })
}

fn uid(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

fn payload(value: serde_json::Value) -> WebhookPayload {
    serde_json::from_value(value).expect("valid payload")
}

async fn mount_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"apiKey": "key-test"})))
        .mount(server)
        .await;
}

/// Seed an item row (and optionally an account) directly through the
/// storage gateway, the way a previous sync pass would have.
async fn seed_item_with_account(pool: &PgPool, item_id: &str, account_id: &str) {
    let storage = SyncStorage::new(pool.clone());

    let item: ProviderItem =
        serde_json::from_value(json!({"id": item_id, "status": "UPDATED"})).unwrap();
    storage.upsert_item(&mappers::map_item(&item)).await.unwrap();

    let account: ProviderAccount =
        serde_json::from_value(json!({"id": account_id, "type": "BANK", "balance": 100}))
            .unwrap();
    storage
        .upsert_account(&mappers::map_account(&account, item_id))
        .await
        .unwrap();
}

async fn count(pool: &PgPool, sql: &str, id: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// item/updated drives a full sync pass: item + accounts + transactions +
/// bills for credit accounts + investments with their transactions + loans;
/// a 404 identity is skipped silently.
#[tokio::test]
#[ignore]
async fn item_updated_event_runs_full_sync() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let server = MockServer::start().await;
    mount_auth(&server).await;

    let item_id = uid("it");
    let bank_account = uid("ac-bank");
    let credit_account = uid("ac-credit");
    let investment_id = uid("inv");

    Mock::given(method("GET"))
        .and(path(format!("/items/{}", item_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": item_id,
            "status": "UPDATED",
            "connector": {"id": 201, "name": "Test Bank"}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/accounts"))
        .and(query_param("itemId", &item_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": bank_account, "type": "BANK", "balance": 1250.75, "currencyCode": "BRL"},
                {"id": credit_account, "type": "CREDIT", "balance": -320.10,
                 "creditData": {"limit": 5000}}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/transactions"))
        .and(query_param("accountId", &bank_account))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": uid("tx"), "date": "2024-03-05T00:00:00Z", "amount": -42.9,
                 "type": "DEBIT", "status": "POSTED", "description": "Groceries"}
            ],
            "page": 1, "totalPages": 1, "total": 1
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/transactions"))
        .and(query_param("accountId", &credit_account))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": uid("tx"), "date": "2024-03-06", "amount": -99.0, "type": "DEBIT"}
            ],
            "page": 1, "totalPages": 1, "total": 1
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/bills"))
        .and(query_param("accountId", &credit_account))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": uid("bill"), "dueDate": "2024-04-10", "totalAmount": 419.1,
                 "minimumPayment": 62.87}
            ]
        })))
        .mount(&server)
        .await;

    // No identity product enabled for this item
    Mock::given(method("GET"))
        .and(path("/identity"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/investments"))
        .and(query_param("itemId", &item_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": investment_id, "type": "FIXED_INCOME", "balance": 10000.0}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/investments/{}/transactions", investment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": uid("itx"), "type": "BUY", "tradeDate": "2024-02-01",
                 "quantity": 10, "value": 1000.0}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/loans"))
        .and(query_param("itemId", &item_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": uid("loan"), "contractNumber": "C-1", "contractAmount": 50000.0}
            ]
        })))
        .mount(&server)
        .await;

    let state = test_state(pool.clone(), server.uri());
    dispatch_event(
        state,
        payload(json!({"event": "item/updated", "eventId": uid("ev"), "itemId": item_id})),
    )
    .await;

    assert_eq!(count(&pool, "SELECT count(*) FROM items WHERE item_id = $1", &item_id).await, 1);
    assert_eq!(
        count(&pool, "SELECT count(*) FROM accounts WHERE item_id = $1", &item_id).await,
        2
    );
    assert_eq!(
        count(&pool, "SELECT count(*) FROM transactions WHERE account_id = $1", &bank_account)
            .await,
        1
    );
    // Bills only for the CREDIT account
    assert_eq!(
        count(
            &pool,
            "SELECT count(*) FROM credit_card_bills WHERE account_id = $1",
            &credit_account
        )
        .await,
        1
    );
    assert_eq!(
        count(&pool, "SELECT count(*) FROM identities WHERE item_id = $1", &item_id).await,
        0
    );
    assert_eq!(
        count(&pool, "SELECT count(*) FROM investments WHERE item_id = $1", &item_id).await,
        1
    );
    assert_eq!(
        count(
            &pool,
            "SELECT count(*) FROM investment_transactions WHERE investment_id = $1",
            &investment_id
        )
        .await,
        1
    );
    assert_eq!(count(&pool, "SELECT count(*) FROM loans WHERE item_id = $1", &item_id).await, 1);

    // Transaction dates normalized to the calendar day
    let date: chrono::NaiveDate = sqlx::query_scalar(
        "SELECT date FROM transactions WHERE account_id = $1",
    )
    .bind(&bank_account)
    .fetch_one(&pool)
    .await?;
    assert_eq!(date, chrono::NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());

    Ok(())
}

/// A failing transaction fetch for one account must not stop the sibling
/// account or the item-level resource families.
#[tokio::test]
#[ignore]
async fn failing_account_does_not_abort_sibling_steps() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let server = MockServer::start().await;
    mount_auth(&server).await;

    let item_id = uid("it");
    let broken_account = uid("ac-broken");
    let healthy_account = uid("ac-ok");

    Mock::given(method("GET"))
        .and(path(format!("/items/{}", item_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": item_id, "status": "UPDATED"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/accounts"))
        .and(query_param("itemId", &item_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": broken_account, "type": "BANK"},
                {"id": healthy_account, "type": "BANK"}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/transactions"))
        .and(query_param("accountId", &broken_account))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/transactions"))
        .and(query_param("accountId", &healthy_account))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": uid("tx"), "date": "2024-01-01", "amount": 1.0}],
            "page": 1, "totalPages": 1, "total": 1
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/identity"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    for endpoint in ["/investments", "/loans"] {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .mount(&server)
            .await;
    }

    let state = test_state(pool.clone(), server.uri());
    dispatch_event(
        state,
        payload(json!({"event": "item/updated", "eventId": uid("ev"), "itemId": item_id})),
    )
    .await;

    assert_eq!(
        count(&pool, "SELECT count(*) FROM transactions WHERE account_id = $1", &broken_account)
            .await,
        0
    );
    assert_eq!(
        count(&pool, "SELECT count(*) FROM transactions WHERE account_id = $1", &healthy_account)
            .await,
        1
    );
    Ok(())
}

/// transactions/created with an explicit id list only touches those ids.
#[tokio::test]
#[ignore]
async fn transaction_event_filters_to_notified_ids() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let server = MockServer::start().await;
    mount_auth(&server).await;

    let item_id = uid("it");
    let account_id = uid("ac");
    let t1 = uid("t1");
    let t2 = uid("t2");
    let t3 = uid("t3");
    seed_item_with_account(&pool, &item_id, &account_id).await;

    Mock::given(method("GET"))
        .and(path("/transactions"))
        .and(query_param("accountId", &account_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": t1, "date": "2024-01-01", "amount": 1.0},
                {"id": t2, "date": "2024-01-02", "amount": 2.0},
                {"id": t3, "date": "2024-01-03", "amount": 3.0}
            ],
            "page": 1, "totalPages": 1, "total": 3
        })))
        .mount(&server)
        .await;

    let state = test_state(pool.clone(), server.uri());
    dispatch_event(
        state,
        payload(json!({
            "event": "transactions/created",
            "eventId": uid("ev"),
            "itemId": item_id,
            "accountId": account_id,
            "transactionIds": [t1, t2]
        })),
    )
    .await;

    assert_eq!(
        count(&pool, "SELECT count(*) FROM transactions WHERE transaction_id = $1", &t1).await,
        1
    );
    assert_eq!(
        count(&pool, "SELECT count(*) FROM transactions WHERE transaction_id = $1", &t2).await,
        1
    );
    // t3 was in the provider response but not in the notification
    assert_eq!(
        count(&pool, "SELECT count(*) FROM transactions WHERE transaction_id = $1", &t3).await,
        0
    );
    Ok(())
}

/// transactions/deleted removes by natural key; an empty id list is a no-op.
#[tokio::test]
#[ignore]
async fn transactions_deleted_event_deletes_by_key() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let server = MockServer::start().await;
    mount_auth(&server).await;

    let item_id = uid("it");
    let account_id = uid("ac");
    let tx_id = uid("tx");
    seed_item_with_account(&pool, &item_id, &account_id).await;

    let storage = SyncStorage::new(pool.clone());
    let tx: rust_pluggy_sync::provider_models::ProviderTransaction =
        serde_json::from_value(json!({"id": tx_id, "date": "2024-01-01"})).unwrap();
    storage
        .upsert_transaction(&mappers::map_transaction(&tx, &account_id))
        .await
        .unwrap();

    let state = test_state(pool.clone(), server.uri());

    // Empty list: nothing happens
    dispatch_event(
        state.clone(),
        payload(json!({
            "event": "transactions/deleted", "eventId": uid("ev"), "transactionIds": []
        })),
    )
    .await;
    assert_eq!(
        count(&pool, "SELECT count(*) FROM transactions WHERE transaction_id = $1", &tx_id).await,
        1
    );

    dispatch_event(
        state,
        payload(json!({
            "event": "transactions/deleted", "eventId": uid("ev"), "transactionIds": [tx_id]
        })),
    )
    .await;
    assert_eq!(
        count(&pool, "SELECT count(*) FROM transactions WHERE transaction_id = $1", &tx_id).await,
        0
    );
    Ok(())
}

/// item/deleted cascades over dependents; deleting an unknown item is not
/// an error.
#[tokio::test]
#[ignore]
async fn item_deleted_event_cascades() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let server = MockServer::start().await;
    mount_auth(&server).await;

    let item_id = uid("it");
    let account_id = uid("ac");
    seed_item_with_account(&pool, &item_id, &account_id).await;

    let state = test_state(pool.clone(), server.uri());
    dispatch_event(
        state.clone(),
        payload(json!({"event": "item/deleted", "eventId": uid("ev"), "id": item_id})),
    )
    .await;

    assert_eq!(count(&pool, "SELECT count(*) FROM items WHERE item_id = $1", &item_id).await, 0);
    assert_eq!(
        count(&pool, "SELECT count(*) FROM accounts WHERE account_id = $1", &account_id).await,
        0
    );

    // Second delivery for the same (now absent) item: still absorbed
    dispatch_event(
        state,
        payload(json!({"event": "item/deleted", "eventId": uid("ev"), "id": item_id})),
    )
    .await;
    Ok(())
}

/// Upserting the same natural key twice leaves one row holding the last
/// write, and the second call does not raise.
#[tokio::test]
#[ignore]
async fn upsert_is_idempotent_and_last_write_wins() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let item_id = uid("it");
    let account_id = uid("ac");
    seed_item_with_account(&pool, &item_id, &account_id).await;

    let storage = SyncStorage::new(pool.clone());
    let updated: ProviderAccount = serde_json::from_value(json!({
        "id": account_id, "type": "BANK", "balance": 999.99
    }))
    .unwrap();
    storage
        .upsert_account(&mappers::map_account(&updated, &item_id))
        .await
        .unwrap();

    assert_eq!(
        count(&pool, "SELECT count(*) FROM accounts WHERE account_id = $1", &account_id).await,
        1
    );
    let balance: bigdecimal::BigDecimal =
        sqlx::query_scalar("SELECT balance FROM accounts WHERE account_id = $1")
            .bind(&account_id)
            .fetch_one(&pool)
            .await?;
    assert_eq!(balance, "999.99".parse::<bigdecimal::BigDecimal>().unwrap());
    Ok(())
}
