//! Webhook dispatcher (spec.md §4.8). Cadence: independent loop.
//!
//! Grounded on the teacher's `service::webhook::WebhookThread`: a
//! long-lived `reqwest::blocking::Client`, one POST per configured
//! destination, failures logged rather than propagated. Generalized from
//! "POST `{accounts:[...]}`" to the per-event-kind payload spec.md §4.8
//! defines, with exponential-backoff retry and `FailedWebhook` persistence on
//! exhaustion.

use std::thread;
use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::Client;
use slog::{debug, error, warn, Logger};
use url::Url;

use crate::{
    db::{
        Address, AddressModel, Asset, AssetModel, FailedWebhook, FailedWebhookModel, LedgerDb,
        NewFailedWebhook, Transaction, TransactionModel,
    },
    error::GatewayError,
    service::events::{EventKind, WebhookPayload},
};

fn candidate_kinds(
    status: i32,
    confirmations: i32,
    threshold: i32,
    sender_is_user: bool,
    receiver_is_user: bool,
) -> Vec<EventKind> {
    let mut kinds = Vec::new();
    if matches!(status, 0 | 1 | 5) && receiver_is_user {
        kinds.push(EventKind::DepositPending);
    }
    if matches!(status, 0 | 1) && sender_is_user {
        kinds.push(EventKind::WithdrawPending);
    }
    if status == 3 && confirmations >= threshold {
        if sender_is_user && receiver_is_user {
            kinds.push(EventKind::InternalTransferConfirmed);
        } else if receiver_is_user {
            kinds.push(EventKind::DepositConfirmed);
        } else if sender_is_user {
            kinds.push(EventKind::WithdrawConfirmed);
        }
    }
    if status == 4 {
        kinds.push(EventKind::Failed);
    }
    if status == 2 {
        kinds.push(EventKind::Cancelled);
    }
    kinds
}

pub fn dispatch_webhooks(
    http: &Client,
    ledger: &LedgerDb,
    webhook_urls: &[Url],
    confirmation_threshold: i32,
    max_retries: u32,
    logger: &Logger,
) -> Result<(), GatewayError> {
    let transactions = {
        let mut conn = ledger.get_conn()?;
        Transaction::list_all(&mut conn)?
    };

    for tx in transactions {
        let sent = {
            let mut conn = ledger.get_conn()?;
            Transaction::webhook_sent_kinds(&tx.tx_id, &mut conn)?
        };

        let (sender_is_user, receiver_is_user) = {
            let mut conn = ledger.get_conn()?;
            (
                Address::find(&tx.sender, &mut conn)?.is_some(),
                Address::find(&tx.receiver, &mut conn)?.is_some(),
            )
        };

        for kind in candidate_kinds(
            tx.status,
            tx.confirmations,
            confirmation_threshold,
            sender_is_user,
            receiver_is_user,
        ) {
            if sent.contains(kind.as_str()) {
                continue;
            }

            let address = match kind {
                EventKind::DepositPending | EventKind::DepositConfirmed => tx.receiver.clone(),
                _ => tx.sender.clone(),
            };
            let payload = build_payload(ledger, &tx, kind, address)?;

            let mut all_delivered = true;
            for url in webhook_urls {
                if !deliver_with_retry(http, url, kind, &payload, max_retries, ledger, logger)? {
                    all_delivered = false;
                }
            }

            // Only the idempotency flag for a fully delivered kind is set
            // (spec.md §8 scenario 6): a kind that exhausted retries stays
            // unmarked so the next cycle's `candidate_kinds` offers it again,
            // alongside the persisted `FailedWebhook` replay path.
            if all_delivered {
                let mut conn = ledger.get_conn()?;
                Transaction::mark_webhook_sent(&tx.tx_id, kind.as_str(), Utc::now().timestamp(), &mut conn)?;
            }
        }
    }
    Ok(())
}

fn build_payload(
    ledger: &LedgerDb,
    tx: &crate::db::Transaction,
    kind: EventKind,
    address: String,
) -> Result<WebhookPayload, GatewayError> {
    let mut conn = ledger.get_conn()?;
    let asset = Asset::find(tx.asset_id, &mut conn)?;
    let decimals = asset.as_ref().map(|a| a.decimals).unwrap_or(8);
    let asset_name = asset
        .map(|a| a.metadata)
        .unwrap_or_else(|| format!("asset-{}", tx.asset_id));

    Ok(WebhookPayload {
        event: kind.as_str(),
        tx_id: tx.tx_id.clone(),
        amount: tx.value,
        value_formatted: tx.value as f64 / 10f64.powi(decimals),
        asset_id: tx.asset_id,
        asset_name,
        address,
        comment: tx.comment.clone(),
        kernel: tx.kernel.clone(),
    })
}

/// POSTs `payload` to `url`, retrying up to `max_retries` times with
/// exponential backoff `10 * 2^attempt` seconds (spec.md §4.8). On
/// exhaustion, persists a `FailedWebhook` row for later replay.
fn deliver_with_retry(
    http: &Client,
    url: &Url,
    kind: EventKind,
    payload: &WebhookPayload,
    max_retries: u32,
    ledger: &LedgerDb,
    logger: &Logger,
) -> Result<(), GatewayError> {
    let body = serde_json::to_string(payload)
        .map_err(|e| GatewayError::Validation(format!("failed to serialize webhook payload: {e}")))?;

    for attempt in 0..max_retries {
        match http.post(url.clone()).json(payload).send() {
            Ok(response) if response.status().is_success() => return Ok(()),
            Ok(response) => {
                warn!(logger, "webhook delivery failed"; "url" => url.as_str(), "kind" => kind.as_str(), "status" => response.status().as_u16(), "attempt" => attempt);
            }
            Err(e) => {
                warn!(logger, "webhook delivery failed"; "url" => url.as_str(), "kind" => kind.as_str(), "error" => %e, "attempt" => attempt);
            }
        }
        thread::sleep(Duration::from_secs(10 * 2u64.pow(attempt)));
    }

    error!(logger, "webhook delivery exhausted retries, persisting for replay"; "url" => url.as_str(), "kind" => kind.as_str());
    let mut conn = ledger.get_conn()?;
    FailedWebhook::insert(
        &NewFailedWebhook {
            url: url.as_str(),
            event_kind: kind.as_str(),
            payload: &body,
            last_attempt: Utc::now().timestamp(),
            attempts: max_retries as i32,
        },
        &mut conn,
    )?;
    Ok(())
}

/// Replays persisted `FailedWebhook` rows; deletes on success (spec.md §4.8
/// "Failed webhook replay").
pub fn replay_failed_webhooks(http: &Client, ledger: &LedgerDb, logger: &Logger) -> Result<(), GatewayError> {
    let failed = {
        let mut conn = ledger.get_conn()?;
        FailedWebhook::list_all(&mut conn)?
    };

    for row in failed {
        let url: Url = match row.url.parse() {
            Ok(u) => u,
            Err(e) => {
                error!(logger, "failed webhook row has an unparseable URL, dropping"; "id" => row.id, "error" => %e);
                let mut conn = ledger.get_conn()?;
                FailedWebhook::delete(row.id, &mut conn)?;
                continue;
            }
        };

        match http
            .post(url)
            .header("content-type", "application/json")
            .body(row.payload.clone())
            .send()
        {
            Ok(response) if response.status().is_success() => {
                let mut conn = ledger.get_conn()?;
                FailedWebhook::delete(row.id, &mut conn)?;
                debug!(logger, "replayed failed webhook"; "id" => row.id);
            }
            _ => {
                let mut conn = ledger.get_conn()?;
                FailedWebhook::bump_attempt(row.id, Utc::now().timestamp(), &mut conn)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_transfer_merges_deposit_and_withdraw_confirmed() {
        let kinds = candidate_kinds(3, 10, 10, true, true);
        assert_eq!(kinds, vec![EventKind::InternalTransferConfirmed]);
    }

    #[test]
    fn plain_deposit_confirmed() {
        let kinds = candidate_kinds(3, 10, 10, false, true);
        assert_eq!(kinds, vec![EventKind::DepositConfirmed]);
    }

    #[test]
    fn pending_deposit_and_withdraw_can_coexist() {
        let kinds = candidate_kinds(1, 0, 10, true, true);
        assert_eq!(kinds, vec![EventKind::DepositPending, EventKind::WithdrawPending]);
    }
}
