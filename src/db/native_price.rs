//! DB impl for the NativePrice model (spec.md §3), a single row keyed
//! `"beam_usd"`, grounded on `original_source`'s `db.price` collection.

use diesel::prelude::*;

use super::{
    models::{NativePrice, NewNativePrice},
    schema::native_price,
    Conn, LedgerError,
};

const BEAM_USD_ID: &str = "beam_usd";

pub trait NativePriceModel {
    fn get_beam_usd(conn: &mut Conn) -> Result<Option<NativePrice>, LedgerError>;
    fn set_beam_usd(price_usd: f64, last_updated: i64, conn: &mut Conn) -> Result<(), LedgerError>;
}

impl NativePriceModel for NativePrice {
    fn get_beam_usd(conn: &mut Conn) -> Result<Option<NativePrice>, LedgerError> {
        Ok(native_price::table
            .find(BEAM_USD_ID)
            .first(conn)
            .optional()?)
    }

    fn set_beam_usd(price_usd: f64, last_updated: i64, conn: &mut Conn) -> Result<(), LedgerError> {
        let new = NewNativePrice {
            id: BEAM_USD_ID,
            price_usd,
            last_updated,
        };
        diesel::insert_into(native_price::table)
            .values(&new)
            .on_conflict(native_price::id)
            .do_update()
            .set(&new)
            .execute(conn)?;
        Ok(())
    }
}
