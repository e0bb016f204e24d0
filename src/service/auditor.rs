//! Balance auditor (spec.md §4.7). Cadence: slow loop, after address sync.

use slog::{warn, Logger};

use crate::{
    db::{Address, AddressModel, LedgerDb},
    error::GatewayError,
    rpc::NodeClient,
    service::alert::AlertSink,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discrepancy {
    pub asset_id: i64,
    pub db_available: i64,
    pub node_available: i64,
    pub db_locked: i64,
    pub node_locked: i64,
}

/// Cross-checks ledger sums against node totals; never mutates anything.
/// Returns the discrepancies found so callers (tests, the orchestrator) can
/// decide what "persistent across cycles" means.
pub fn audit_balances(
    client: &dyn NodeClient,
    ledger: &LedgerDb,
    alert: &dyn AlertSink,
    logger: &Logger,
) -> Result<Vec<Discrepancy>, GatewayError> {
    let status = client.wallet_status()?;
    let mut conn = ledger.get_conn()?;
    let ledger_totals = Address::aggregate_balances(&mut conn)?;

    let mut discrepancies = Vec::new();
    for total in &status.totals {
        let asset_id = total.asset_id as i64;
        let node_locked = total.locked + total.receiving_regular + total.sending_regular;
        let (db_available, db_locked) = ledger_totals
            .iter()
            .find(|(id, _, _)| *id == asset_id)
            .map(|(_, available, locked)| (*available, *locked))
            .unwrap_or((0, 0));

        if db_available != total.available || db_locked != node_locked {
            discrepancies.push(Discrepancy {
                asset_id,
                db_available,
                node_available: total.available,
                db_locked,
                node_locked,
            });
        }
    }

    for d in &discrepancies {
        let message = format!(
            "balance discrepancy for asset {}: db(available={}, locked={}) vs node(available={}, locked={})",
            d.asset_id, d.db_available, d.db_locked, d.node_available, d.node_locked
        );
        warn!(logger, "{}", message);
        alert.alert(&message);
    }

    Ok(discrepancies)
}
