//! DB impl for the Address model (spec.md §3), mirroring the teacher's
//! `db::account::AccountModel for Account` (one trait per entity,
//! implemented for the plain queryable struct).

use diesel::prelude::*;

use super::{
    models::{Address, AddressBalance, NewAddress, NewAddressBalance},
    schema::{address_balances, addresses},
    Conn, LedgerError,
};

pub trait AddressModel {
    fn find(address_id: &str, conn: &mut Conn) -> Result<Option<Address>, LedgerError>;
    fn get(address_id: &str, conn: &mut Conn) -> Result<Address, LedgerError>;
    fn list_all(conn: &mut Conn) -> Result<Vec<Address>, LedgerError>;
    fn insert(new: &NewAddress, conn: &mut Conn) -> Result<(), LedgerError>;
    fn backfill_identity(
        address_id: &str,
        identity: &str,
        conn: &mut Conn,
    ) -> Result<(), LedgerError>;
    fn set_expired(address_id: &str, expired: bool, conn: &mut Conn) -> Result<(), LedgerError>;

    /// Current `(available, locked)` for one asset; `(0, 0)` if never touched.
    fn get_balance(address_id: &str, asset_id: i64, conn: &mut Conn) -> Result<(i64, i64), LedgerError>;

    /// All non-zero-touched balances for an address.
    fn balances(address_id: &str, conn: &mut Conn) -> Result<Vec<AddressBalance>, LedgerError>;

    /// Atomically add `delta_available`/`delta_locked` (either may be
    /// negative) to the address's balance for `asset_id`. This is the only
    /// way `available`/`locked` are ever mutated (spec.md §9 second open
    /// question: only the projector/queue-submission path calls this).
    fn adjust_balance(
        address_id: &str,
        asset_id: i64,
        delta_available: i64,
        delta_locked: i64,
        conn: &mut Conn,
    ) -> Result<(), LedgerError>;

    /// Sum of `available`/`locked` per asset across every address, for the
    /// balance auditor (spec.md §4.7).
    fn aggregate_balances(conn: &mut Conn) -> Result<Vec<(i64, i64, i64)>, LedgerError>;
}

impl AddressModel for Address {
    fn find(address_id: &str, conn: &mut Conn) -> Result<Option<Address>, LedgerError> {
        Ok(addresses::table
            .find(address_id)
            .first(conn)
            .optional()?)
    }

    fn get(address_id: &str, conn: &mut Conn) -> Result<Address, LedgerError> {
        Self::find(address_id, conn)?
            .ok_or_else(|| LedgerError::AddressNotFound(address_id.to_string()))
    }

    fn list_all(conn: &mut Conn) -> Result<Vec<Address>, LedgerError> {
        Ok(addresses::table.load(conn)?)
    }

    fn insert(new: &NewAddress, conn: &mut Conn) -> Result<(), LedgerError> {
        diesel::insert_into(addresses::table)
            .values(new)
            .execute(conn)?;
        Ok(())
    }

    fn backfill_identity(
        address_id: &str,
        identity: &str,
        conn: &mut Conn,
    ) -> Result<(), LedgerError> {
        diesel::update(addresses::table.find(address_id))
            .set(addresses::identity.eq(identity))
            .execute(conn)?;
        Ok(())
    }

    fn set_expired(address_id: &str, expired: bool, conn: &mut Conn) -> Result<(), LedgerError> {
        diesel::update(addresses::table.find(address_id))
            .set(addresses::expired.eq(expired))
            .execute(conn)?;
        Ok(())
    }

    fn get_balance(
        address_id: &str,
        asset_id: i64,
        conn: &mut Conn,
    ) -> Result<(i64, i64), LedgerError> {
        let row: Option<AddressBalance> = address_balances::table
            .find((address_id, asset_id))
            .first(conn)
            .optional()?;
        Ok(row.map(|b| (b.available, b.locked)).unwrap_or((0, 0)))
    }

    fn balances(address_id: &str, conn: &mut Conn) -> Result<Vec<AddressBalance>, LedgerError> {
        Ok(address_balances::table
            .filter(address_balances::address_id.eq(address_id))
            .load(conn)?)
    }

    fn adjust_balance(
        address_id: &str,
        asset_id: i64,
        delta_available: i64,
        delta_locked: i64,
        conn: &mut Conn,
    ) -> Result<(), LedgerError> {
        if delta_available == 0 && delta_locked == 0 {
            return Ok(());
        }
        let new_row = NewAddressBalance {
            address_id,
            asset_id,
            available: delta_available,
            locked: delta_locked,
        };
        diesel::insert_into(address_balances::table)
            .values(&new_row)
            .on_conflict((address_balances::address_id, address_balances::asset_id))
            .do_update()
            .set((
                address_balances::available
                    .eq(address_balances::available + delta_available),
                address_balances::locked.eq(address_balances::locked + delta_locked),
            ))
            .execute(conn)?;
        Ok(())
    }

    fn aggregate_balances(conn: &mut Conn) -> Result<Vec<(i64, i64, i64)>, LedgerError> {
        use diesel::dsl::sum;

        let rows: Vec<(i64, Option<i64>, Option<i64>)> = address_balances::table
            .group_by(address_balances::asset_id)
            .select((
                address_balances::asset_id,
                sum(address_balances::available),
                sum(address_balances::locked),
            ))
            .load(conn)?;
        Ok(rows
            .into_iter()
            .map(|(asset_id, available, locked)| {
                (asset_id, available.unwrap_or(0), locked.unwrap_or(0))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_ledger;

    fn new_address<'a>(id: &'a str) -> NewAddress<'a> {
        NewAddress {
            address_id: id,
            wallet_kind: "regular",
            comment: None,
            create_time: 0,
            expired: false,
            identity: None,
            owner_wallet_id: None,
        }
    }

    #[test]
    fn balances_default_to_zero_and_adjust_atomically() {
        let db = test_ledger();
        let mut conn = db.get_conn().unwrap();
        Address::insert(&new_address("addrA"), &mut conn).unwrap();

        assert_eq!(Address::get_balance("addrA", 0, &mut conn).unwrap(), (0, 0));

        Address::adjust_balance("addrA", 0, -100, 100, &mut conn).unwrap();
        assert_eq!(
            Address::get_balance("addrA", 0, &mut conn).unwrap(),
            (-100, 100)
        );

        Address::adjust_balance("addrA", 0, 100, -100, &mut conn).unwrap();
        assert_eq!(Address::get_balance("addrA", 0, &mut conn).unwrap(), (0, 0));
    }

    #[test]
    fn aggregate_balances_sums_across_addresses() {
        let db = test_ledger();
        let mut conn = db.get_conn().unwrap();
        Address::insert(&new_address("addrA"), &mut conn).unwrap();
        Address::insert(&new_address("addrB"), &mut conn).unwrap();

        Address::adjust_balance("addrA", 7, 500, 0, &mut conn).unwrap();
        Address::adjust_balance("addrB", 7, 250, 10, &mut conn).unwrap();

        let totals = Address::aggregate_balances(&mut conn).unwrap();
        assert_eq!(totals, vec![(7, 750, 10)]);
    }
}
