use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound webhook envelope from the provider.
///
/// `event` and `event_id` are always present on well-formed deliveries; the
/// remaining fields depend on the event family. Unknown fields are kept in
/// `raw` for logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub event: String,
    pub event_id: String,

    /// Item id; some item events carry it as `id` instead.
    #[serde(default, alias = "id")]
    pub item_id: Option<String>,

    #[serde(default)]
    pub account_id: Option<String>,

    #[serde(default)]
    pub transaction_ids: Option<Vec<String>>,

    #[serde(default)]
    pub connector_id: Option<Value>,

    #[serde(default)]
    pub data: Option<Value>,

    #[serde(flatten)]
    pub raw: Value,
}

/// Acknowledgement body returned to the provider for any well-formed
/// delivery, regardless of downstream outcome.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub received: bool,
    pub event: String,
    pub event_id: String,
}

/// Event-type routing key, parsed from the envelope's `event` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventKind {
    ItemCreated,
    ItemUpdated,
    ItemLoginSucceeded,
    ItemError,
    ItemWaitingUserInput,
    ItemDeleted,
    ConnectorStatusUpdated,
    TransactionsCreated,
    TransactionsUpdated,
    TransactionsDeleted,
    /// Payment lifecycle sub-events (payment_intent, payment_request,
    /// scheduled_payment, automatic_pix_payment, payment_refund). Received
    /// and logged, never persisted.
    Payment(String),
    Unknown(String),
}

impl WebhookEventKind {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "item/created" => WebhookEventKind::ItemCreated,
            "item/updated" => WebhookEventKind::ItemUpdated,
            "item/login_succeeded" => WebhookEventKind::ItemLoginSucceeded,
            "item/error" => WebhookEventKind::ItemError,
            "item/waiting_user_input" => WebhookEventKind::ItemWaitingUserInput,
            "item/deleted" => WebhookEventKind::ItemDeleted,
            "connector/status_updated" => WebhookEventKind::ConnectorStatusUpdated,
            "transactions/created" => WebhookEventKind::TransactionsCreated,
            "transactions/updated" => WebhookEventKind::TransactionsUpdated,
            "transactions/deleted" => WebhookEventKind::TransactionsDeleted,
            other => {
                const PAYMENT_FAMILIES: [&str; 5] = [
                    "payment_intent/",
                    "payment_request/",
                    "scheduled_payment/",
                    "automatic_pix_payment/",
                    "payment_refund/",
                ];
                if PAYMENT_FAMILIES.iter().any(|p| other.starts_with(p)) {
                    WebhookEventKind::Payment(other.to_string())
                } else {
                    WebhookEventKind::Unknown(other.to_string())
                }
            }
        }
    }
}
