//! Ledger store (spec.md §4.2): persistent keyed storage of addresses,
//! transactions, assets, pending withdrawals, and failed webhook deliveries,
//! with atomic per-field updates. Grounded on the teacher's `WalletDb`
//! (`db/wallet_db.rs`): an r2d2-pooled `SqliteConnection` with WAL/
//! foreign-key/busy-timeout pragmas applied on every connection acquire.

mod error;
pub mod models;
mod schema;

pub mod address;
pub mod asset;
pub mod failed_webhook;
pub mod native_price;
pub mod pending_withdrawal;
pub mod transaction;

use std::time::Duration;

use diesel::{
    connection::SimpleConnection,
    r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection},
    SqliteConnection,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub use address::AddressModel;
pub use asset::AssetModel;
pub use error::LedgerError;
pub use failed_webhook::FailedWebhookModel;
pub use models::{
    Address, AddressBalance, Asset, FailedWebhook, NativePrice, NewAddress, NewAddressBalance,
    NewAsset, NewFailedWebhook, NewNativePrice, NewPendingWithdrawal, NewTransaction,
    NewTransactionWebhookSent, PendingWithdrawal, Transaction, TransactionWebhookSent,
    TX_STATUS_CANCELLED, TX_STATUS_COMPLETED, TX_STATUS_FAILED, TX_STATUS_IN_PROGRESS,
    TX_STATUS_PENDING, TX_STATUS_REGISTERING, WITHDRAWAL_ADMIN_CHECK, WITHDRAWAL_FAILED,
    WITHDRAWAL_PENDING, WITHDRAWAL_PROCESSING, WITHDRAWAL_SENT, WITHDRAWAL_SENT_CONFIRMED,
};
pub use native_price::NativePriceModel;
pub use pending_withdrawal::PendingWithdrawalModel;
pub use transaction::TransactionModel;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type Conn = PooledConnection<ConnectionManager<SqliteConnection>>;

#[derive(Debug)]
struct ConnectionOptions {
    enable_wal: bool,
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        (|| -> diesel::QueryResult<()> {
            if self.enable_wal {
                conn.batch_execute(
                    "PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;",
                )?;
            }
            conn.batch_execute(&format!(
                "PRAGMA busy_timeout = {};",
                self.busy_timeout.as_millis()
            ))?;
            conn.batch_execute("PRAGMA foreign_keys = ON;")?;
            Ok(())
        })()
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// The ledger store. Cheap to clone (shares the underlying pool), matching
/// the teacher's `WalletDb`.
#[derive(Clone)]
pub struct LedgerDb {
    pool: Pool<ConnectionManager<SqliteConnection>>,
}

impl LedgerDb {
    pub fn new_from_url(database_url: &str, max_connections: u32) -> Result<Self, LedgerError> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(max_connections)
            .connection_customizer(Box::new(ConnectionOptions {
                enable_wal: true,
                busy_timeout: Duration::from_secs(30),
            }))
            .test_on_check_out(true)
            .build(manager)?;

        let db = Self { pool };
        db.get_conn()?
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| LedgerError::Diesel(diesel::result::Error::QueryBuilderError(e)))?;
        Ok(db)
    }

    pub fn get_conn(&self) -> Result<Conn, LedgerError> {
        Ok(self.pool.get()?)
    }
}

#[cfg(test)]
pub fn test_ledger() -> LedgerDb {
    LedgerDb::new_from_url(":memory:", 1).expect("failed constructing in-memory ledger")
}
