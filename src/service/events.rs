//! Webhook event kinds and payload shape (spec.md §4.8).

use serde::Serialize;

/// One row of the event table in spec.md §4.8. The string form is also the
/// `kind` column stored in `transaction_webhook_sent` (the idempotency key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DepositPending,
    DepositConfirmed,
    WithdrawPending,
    WithdrawConfirmed,
    InternalTransferConfirmed,
    Failed,
    Cancelled,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::DepositPending => "deposit_pending",
            EventKind::DepositConfirmed => "deposit_confirmed",
            EventKind::WithdrawPending => "withdraw_pending",
            EventKind::WithdrawConfirmed => "withdraw_confirmed",
            EventKind::InternalTransferConfirmed => "internal_transfer_confirmed",
            EventKind::Failed => "failed",
            EventKind::Cancelled => "cancelled",
        }
    }
}

/// Webhook POST body (spec.md §4.8 "Payload").
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub event: &'static str,
    #[serde(rename = "txId")]
    pub tx_id: String,
    pub amount: i64,
    pub value_formatted: f64,
    pub asset_id: i64,
    pub asset_name: String,
    pub address: String,
    pub comment: Option<String>,
    pub kernel: Option<String>,
}
