//! Withdrawal-request pre-check and creation (spec.md §9 second open
//! question): the API layer only validates and inserts a `pending` row; it
//! never mutates `available`/`locked` itself — only the projector owns that
//! transition (spec.md §4.5/§9). Callable directly by tests and by whatever
//! out-of-scope HTTP layer is eventually wired up.

use crate::{
    db::{Address, AddressModel, LedgerDb, NewPendingWithdrawal, PendingWithdrawal, WITHDRAWAL_PENDING},
    error::{GatewayError, ValidationError},
    rpc::NodeClient,
    service::fees::fee_for_receiver,
};

/// Validates and creates a `PendingWithdrawal`. The outer `Result` carries
/// infrastructure failures (RPC/ledger, propagated with `?`); the inner
/// `Result` carries the business outcome, a normal value per spec.md §7.
pub fn request_withdrawal(
    client: &dyn NodeClient,
    ledger: &LedgerDb,
    sender: &str,
    receiver: &str,
    asset_id: i64,
    value: i64,
    comment: Option<&str>,
    now: i64,
) -> Result<Result<PendingWithdrawal, ValidationError>, GatewayError> {
    if sender == receiver {
        return Ok(Err(ValidationError::SelfSend));
    }

    let validation = client.validate_address(receiver)?;
    if !validation.is_valid {
        return Ok(Err(ValidationError::InvalidReceiver(receiver.to_string())));
    }
    let fee = fee_for_receiver(validation.address_type.as_deref().unwrap_or("regular"));

    let mut conn = ledger.get_conn()?;
    if Address::find(sender, &mut conn)?.is_none() {
        return Ok(Err(ValidationError::UnknownSender(sender.to_string())));
    }

    let (available_asset, _) = Address::get_balance(sender, asset_id, &mut conn)?;
    let (available_beam, _) = if asset_id == 0 {
        (available_asset, 0)
    } else {
        Address::get_balance(sender, 0, &mut conn)?
    };

    let asset_needed = if asset_id == 0 { value + fee } else { value };
    if available_asset < asset_needed || (asset_id != 0 && available_beam < fee) {
        return Ok(Err(ValidationError::InsufficientFunds {
            asset_id: asset_id as u64,
            available: available_asset,
            requested: asset_needed,
        }));
    }

    let withdrawal = PendingWithdrawal::insert(
        &NewPendingWithdrawal {
            sender,
            receiver,
            asset_id,
            value,
            fee,
            comment,
            create_time: now,
            status: WITHDRAWAL_PENDING,
            tx_id: None,
        },
        &mut conn,
    )?;
    Ok(Ok(withdrawal))
}
