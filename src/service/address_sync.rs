//! Address synchronizer (spec.md §4.4). Cadence: slow loop.

use slog::{debug, error, Logger};

use crate::{
    db::{Address, AddressModel, LedgerDb, NewAddress},
    error::GatewayError,
    rpc::NodeClient,
};

pub fn sync_addresses(
    client: &dyn NodeClient,
    ledger: &LedgerDb,
    logger: &Logger,
) -> Result<(), GatewayError> {
    let addresses = match client.addr_list(true) {
        Ok(addresses) => addresses,
        Err(e) => {
            error!(logger, "address sync: addr_list failed"; "error" => %e);
            return Ok(());
        }
    };

    let mut conn = ledger.get_conn()?;
    for node_address in addresses {
        match Address::find(&node_address.address, &mut conn)? {
            None => {
                Address::insert(
                    &NewAddress {
                        address_id: &node_address.address,
                        wallet_kind: node_address.wallet_type.as_deref().unwrap_or("regular"),
                        comment: node_address.comment.as_deref(),
                        create_time: node_address.create_time,
                        expired: node_address.expired,
                        identity: node_address.identity.as_deref(),
                        owner_wallet_id: node_address.own_id.as_deref(),
                    },
                    &mut conn,
                )?;
                debug!(logger, "address sync: inserted new address"; "address" => %node_address.address);
            }
            Some(existing) => {
                if existing.identity.is_none() {
                    if let Some(identity) = &node_address.identity {
                        Address::backfill_identity(&node_address.address, identity, &mut conn)?;
                    }
                }
                if node_address.expired {
                    if let Err(e) = client.edit_address(&node_address.address, "never") {
                        error!(logger, "address sync: failed to un-expire address"; "address" => %node_address.address, "error" => %e);
                    } else {
                        Address::set_expired(&node_address.address, false, &mut conn)?;
                    }
                }
            }
        }
    }
    Ok(())
}
