//! Ledger store error type, mirroring the teacher's `WalletDbError`.

use displaydoc::Display;

#[derive(Display, Debug)]
pub enum LedgerError {
    /// diesel error: {0}
    Diesel(diesel::result::Error),

    /// connection pool error: {0}
    Pool(diesel::r2d2::Error),

    /// address `{0}` not found
    AddressNotFound(String),

    /// asset `{0}` not found
    AssetNotFound(i64),

    /// transaction `{0}` not found
    TransactionNotFound(String),

    /// pending withdrawal `{0}` not found
    PendingWithdrawalNotFound(i32),
}

impl From<diesel::result::Error> for LedgerError {
    fn from(src: diesel::result::Error) -> Self {
        Self::Diesel(src)
    }
}

impl From<diesel::r2d2::Error> for LedgerError {
    fn from(src: diesel::r2d2::Error) -> Self {
        Self::Pool(src)
    }
}
