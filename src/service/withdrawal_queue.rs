//! Withdrawal queue processor (spec.md §4.6). Cadence: fast loop, after the
//! projector.

use chrono::Utc;
use slog::{debug, error, warn, Logger};

use crate::{
    db::{
        Address, AddressModel, LedgerDb, NewTransaction, PendingWithdrawal,
        PendingWithdrawalModel, Transaction, TransactionModel, WITHDRAWAL_PENDING,
    },
    error::GatewayError,
    rpc::NodeClient,
    service::alert::AlertSink,
};

pub fn process_withdrawals(
    client: &dyn NodeClient,
    ledger: &LedgerDb,
    alert: &dyn AlertSink,
    logger: &Logger,
) -> Result<(), GatewayError> {
    let pending = {
        let mut conn = ledger.get_conn()?;
        PendingWithdrawal::list_by_status(WITHDRAWAL_PENDING, &mut conn)?
    };

    for withdrawal in pending {
        if let Err(e) = process_one(client, ledger, &withdrawal, alert, logger) {
            error!(logger, "withdrawal queue: skipping poisoned row"; "withdrawal_id" => withdrawal.id, "error" => %e);
        }
    }
    Ok(())
}

fn process_one(
    client: &dyn NodeClient,
    ledger: &LedgerDb,
    withdrawal: &PendingWithdrawal,
    alert: &dyn AlertSink,
    logger: &Logger,
) -> Result<(), GatewayError> {
    let mut conn = ledger.get_conn()?;

    // Spec.md's added "poisoned row" scenario: a sender absent from the
    // ledger is a data inconsistency that must never stall the queue.
    if Address::find(&withdrawal.sender, &mut conn)?.is_none() {
        error!(logger, "withdrawal queue: sender address not found, skipping"; "withdrawal_id" => withdrawal.id, "sender" => &withdrawal.sender);
        return Ok(());
    }

    let (_, locked_balance) = Address::get_balance(&withdrawal.sender, withdrawal.asset_id, &mut conn)?;
    let (_, locked_beam) = if withdrawal.asset_id == 0 {
        (0, locked_balance)
    } else {
        Address::get_balance(&withdrawal.sender, 0, &mut conn)?
    };

    let sent = PendingWithdrawal::list_sent_for_sender(&withdrawal.sender, &mut conn)?;

    let mut pending_beam_total = 0i64;
    let mut pending_asset_total = 0i64;
    for w in &sent {
        if w.asset_id == 0 {
            pending_beam_total += w.value + w.fee;
        } else {
            pending_beam_total += w.fee;
            if w.asset_id == withdrawal.asset_id {
                pending_asset_total += w.value;
            }
        }
    }
    if withdrawal.asset_id == 0 {
        pending_asset_total = pending_beam_total;
    }

    // Consistency gate (spec.md §4.6 step 3).
    if locked_beam != pending_beam_total || locked_balance != pending_asset_total {
        PendingWithdrawal::mark_admin_check(withdrawal.id, &mut conn)?;
        let message = format!(
            "consistency violation for sender {}: locked_beam={} pending_beam_total={} locked_balance={} pending_asset_total={}",
            withdrawal.sender, locked_beam, pending_beam_total, locked_balance, pending_asset_total
        );
        alert.alert(&message);
        warn!(logger, "{}", message);
        return Ok(());
    }

    // UTXO gate (spec.md §4.6 step 4).
    let asset_utxos = client.get_utxo(withdrawal.asset_id as u64)?;
    let asset_utxo_sum: i64 = asset_utxos.iter().filter(|u| u.status == 1).map(|u| u.amount).sum();
    let required_asset = withdrawal.value + if withdrawal.asset_id == 0 { withdrawal.fee } else { 0 };
    if asset_utxo_sum < required_asset {
        debug!(logger, "withdrawal queue: insufficient UTXOs, retrying next loop"; "withdrawal_id" => withdrawal.id);
        return Ok(());
    }
    if withdrawal.asset_id != 0 {
        let native_utxos = client.get_utxo(0)?;
        let native_sum: i64 = native_utxos.iter().filter(|u| u.status == 1).map(|u| u.amount).sum();
        if native_sum < withdrawal.fee {
            debug!(logger, "withdrawal queue: insufficient native UTXOs for fee, retrying next loop"; "withdrawal_id" => withdrawal.id);
            return Ok(());
        }
    }

    // Lease (spec.md §4.6 step 5, §9 submission-safety design note).
    if !PendingWithdrawal::lease_for_processing(withdrawal.id, &mut conn)? {
        debug!(logger, "withdrawal queue: lost the lease race, skipping"; "withdrawal_id" => withdrawal.id);
        return Ok(());
    }

    match client.tx_send(
        withdrawal.value,
        withdrawal.fee,
        &withdrawal.sender,
        &withdrawal.receiver,
        withdrawal.asset_id as u64,
        withdrawal.comment.as_deref().unwrap_or(""),
    ) {
        Ok(result) => {
            PendingWithdrawal::mark_sent(withdrawal.id, &result.tx_id, &mut conn)?;
            Transaction::insert(
                &NewTransaction {
                    tx_id: &result.tx_id,
                    status: 0,
                    status_string: "pending",
                    income: false,
                    tx_type: 0,
                    asset_id: withdrawal.asset_id,
                    value: withdrawal.value,
                    fee: withdrawal.fee,
                    sender: &withdrawal.sender,
                    receiver: &withdrawal.receiver,
                    sender_identity: None,
                    receiver_identity: None,
                    comment: withdrawal.comment.as_deref(),
                    create_time: Utc::now().timestamp(),
                    confirmations: 0,
                    kernel: None,
                    failure_reason: None,
                    success: false,
                },
                &mut conn,
            )?;
        }
        Err(e) => {
            PendingWithdrawal::revert_to_pending(withdrawal.id, &mut conn)?;
            let message = format!("tx_send failed for withdrawal {}: {e}", withdrawal.id);
            alert.alert(&message);
            error!(logger, "{}", message);
        }
    }
    Ok(())
}
