//! DB impl for the Asset model (spec.md §3, §4.3).

use diesel::prelude::*;

use super::{
    models::{Asset, NewAsset},
    schema::assets,
    Conn, LedgerError,
};

pub trait AssetModel {
    fn find(asset_id: i64, conn: &mut Conn) -> Result<Option<Asset>, LedgerError>;
    fn list_all(conn: &mut Conn) -> Result<Vec<Asset>, LedgerError>;
    /// Insert or overwrite, matching spec.md §3 "metadata may be overwritten
    /// by sync."
    fn upsert(new: &NewAsset, conn: &mut Conn) -> Result<(), LedgerError>;
}

impl AssetModel for Asset {
    fn find(asset_id: i64, conn: &mut Conn) -> Result<Option<Asset>, LedgerError> {
        Ok(assets::table.find(asset_id).first(conn).optional()?)
    }

    fn list_all(conn: &mut Conn) -> Result<Vec<Asset>, LedgerError> {
        Ok(assets::table.load(conn)?)
    }

    fn upsert(new: &NewAsset, conn: &mut Conn) -> Result<(), LedgerError> {
        diesel::insert_into(assets::table)
            .values(new)
            .on_conflict(assets::asset_id)
            .do_update()
            .set(new)
            .execute(conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_ledger;

    #[test]
    fn upsert_overwrites_metadata() {
        let db = test_ledger();
        let mut conn = db.get_conn().unwrap();

        Asset::upsert(
            &NewAsset {
                asset_id: 7,
                metadata: "UN=Foo;SN=FOO",
                decimals: 8,
                is_verified: false,
                is_spam: false,
                rate_beam: None,
                rate_usd: None,
            },
            &mut conn,
        )
        .unwrap();
        Asset::upsert(
            &NewAsset {
                asset_id: 7,
                metadata: "UN=Bar;SN=BAR",
                decimals: 6,
                is_verified: true,
                is_spam: false,
                rate_beam: Some(1.5),
                rate_usd: Some(2.5),
            },
            &mut conn,
        )
        .unwrap();

        let asset = Asset::find(7, &mut conn).unwrap().unwrap();
        assert_eq!(asset.metadata, "UN=Bar;SN=BAR");
        assert_eq!(asset.decimals, 6);
        assert!(asset.is_verified);
    }
}
