//! Transaction projector (spec.md §4.5), the primary state machine. Cadence:
//! fast loop, before the withdrawal queue.
//!
//! Grounded on the teacher's `service::sync::sync_all_accounts` shape (page
//! through node state, per-item try/log-and-continue so one bad row never
//! stops the batch) and spec.md §9's "state machine as table" design note —
//! implemented here as straight-line per-tx branches rather than nested
//! conditionals, matching the §4.5 table column-for-column.

use slog::{error, Logger};

use crate::{
    db::{
        Address, AddressModel, LedgerDb, NewTransaction, PendingWithdrawal,
        PendingWithdrawalModel, Transaction, TransactionModel, TX_STATUS_CANCELLED,
        TX_STATUS_COMPLETED, TX_STATUS_FAILED, TX_STATUS_IN_PROGRESS, TX_STATUS_REGISTERING,
    },
    error::GatewayError,
    rpc::{types::NodeTransaction, NodeClient},
};

const PAGE_SIZE: u64 = 200;

pub fn project_transactions(
    client: &dyn NodeClient,
    ledger: &LedgerDb,
    confirmation_threshold: i32,
    logger: &Logger,
) -> Result<(), GatewayError> {
    let mut skip = 0u64;
    loop {
        let page = client.tx_list(skip, PAGE_SIZE)?;
        if page.is_empty() {
            break;
        }
        skip += page.len() as u64;

        for tx in &page {
            if let Err(e) = project_one(client, ledger, tx, confirmation_threshold, logger) {
                error!(logger, "projector: skipping poisoned row"; "tx_id" => &tx.tx_id, "error" => %e);
            }
        }
    }
    Ok(())
}

fn project_one(
    _client: &dyn NodeClient,
    ledger: &LedgerDb,
    tx: &NodeTransaction,
    confirmation_threshold: i32,
    logger: &Logger,
) -> Result<(), GatewayError> {
    let mut conn = ledger.get_conn()?;
    let existing = Transaction::find(&tx.tx_id, &mut conn)?;

    match existing {
        None => {
            if !matches!(
                tx.status,
                TX_STATUS_IN_PROGRESS | TX_STATUS_COMPLETED | TX_STATUS_REGISTERING
            ) {
                // Not yet durable (spec.md §4.5 last row).
                return Ok(());
            }
            Transaction::insert(
                &NewTransaction {
                    tx_id: &tx.tx_id,
                    status: tx.status,
                    status_string: &tx.status_string,
                    income: tx.income,
                    tx_type: tx.tx_type,
                    asset_id: tx.asset_id as i64,
                    value: tx.value,
                    fee: tx.fee,
                    sender: &tx.sender,
                    receiver: &tx.receiver,
                    sender_identity: tx.sender_identity.as_deref(),
                    receiver_identity: tx.receiver_identity.as_deref(),
                    comment: tx.comment.as_deref(),
                    create_time: tx.create_time,
                    confirmations: tx.confirmations,
                    kernel: tx.kernel.as_deref(),
                    failure_reason: tx.failure_reason.as_deref(),
                    success: false,
                },
                &mut conn,
            )?;
            lock(&mut conn, tx)?;

            if tx.status == TX_STATUS_COMPLETED && tx.confirmations >= confirmation_threshold {
                finalize(&mut conn, tx, logger)?;
                Transaction::mark_success(&tx.tx_id, &mut conn)?;
            }
            Ok(())
        }
        Some(row) => {
            if row.success {
                return Ok(()); // Already terminal; re-observation is a no-op.
            }

            if matches!(tx.status, TX_STATUS_CANCELLED | TX_STATUS_FAILED) && row.status != tx.status
            {
                Transaction::update_status(&tx.tx_id, tx.status, &tx.status_string, &mut conn)?;
                fail(&mut conn, tx, logger)?;
                Transaction::mark_success(&tx.tx_id, &mut conn)?;
            } else if tx.status == TX_STATUS_COMPLETED && tx.confirmations >= confirmation_threshold
            {
                if row.status != tx.status {
                    Transaction::update_status(&tx.tx_id, tx.status, &tx.status_string, &mut conn)?;
                }
                finalize(&mut conn, tx, logger)?;
                Transaction::mark_success(&tx.tx_id, &mut conn)?;
            } else if tx.confirmations != row.confirmations {
                Transaction::update_confirmations(&tx.tx_id, tx.confirmations, &mut conn)?;
            }
            Ok(())
        }
    }
}

/// Newly observed, non-terminal tx: commit funds out of the sender's
/// available balance and into both parties' locked balance (spec.md §4.5
/// LOCK).
fn lock(conn: &mut crate::db::Conn, tx: &NodeTransaction) -> Result<(), GatewayError> {
    let asset_id = tx.asset_id as i64;
    if Address::find(&tx.sender, conn)?.is_some() {
        Address::adjust_balance(&tx.sender, asset_id, -tx.value, tx.value, conn)?;
        Address::adjust_balance(&tx.sender, 0, -tx.fee, tx.fee, conn)?;
    }
    if Address::find(&tx.receiver, conn)?.is_some() {
        Address::adjust_balance(&tx.receiver, asset_id, 0, tx.value, conn)?;
    }
    Ok(())
}

/// Confirmation threshold reached: release the sender's lock (fee consumed)
/// and make the receiver's funds spendable (spec.md §4.5 FINALIZE).
fn finalize(conn: &mut crate::db::Conn, tx: &NodeTransaction, logger: &Logger) -> Result<(), GatewayError> {
    let asset_id = tx.asset_id as i64;
    if Address::find(&tx.sender, conn)?.is_some() {
        Address::adjust_balance(&tx.sender, asset_id, 0, -tx.value, conn)?;
        Address::adjust_balance(&tx.sender, 0, 0, -tx.fee, conn)?;
    }
    if Address::find(&tx.receiver, conn)?.is_some() {
        Address::adjust_balance(&tx.receiver, asset_id, tx.value, -tx.value, conn)?;
    }
    if let Some(withdrawal) = PendingWithdrawal::find_by_tx_id(&tx.tx_id, conn)? {
        PendingWithdrawal::mark_sent_confirmed(withdrawal.id, conn)?;
        slog::debug!(logger, "projector: withdrawal confirmed"; "withdrawal_id" => withdrawal.id, "tx_id" => &tx.tx_id);
    }
    Ok(())
}

/// Status moved to cancelled/failed: refund the sender's lock if this was a
/// withdrawal, or release the receiver's lock if it was a failed deposit
/// (spec.md §4.5 FAIL).
fn fail(conn: &mut crate::db::Conn, tx: &NodeTransaction, logger: &Logger) -> Result<(), GatewayError> {
    let asset_id = tx.asset_id as i64;
    if let Some(withdrawal) = PendingWithdrawal::find_by_tx_id(&tx.tx_id, conn)? {
        PendingWithdrawal::mark_failed(withdrawal.id, conn)?;
        Address::adjust_balance(&tx.sender, asset_id, tx.value, -tx.value, conn)?;
        Address::adjust_balance(&tx.sender, 0, tx.fee, -tx.fee, conn)?;
        slog::debug!(logger, "projector: withdrawal failed, refunded sender"; "withdrawal_id" => withdrawal.id, "tx_id" => &tx.tx_id);
    } else if Address::find(&tx.receiver, conn)?.is_some() {
        Address::adjust_balance(&tx.receiver, asset_id, 0, -tx.value, conn)?;
    }
    Ok(())
}
