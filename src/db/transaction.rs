//! DB impl for the Transaction model (spec.md §3, §4.5, §4.8).

use std::collections::HashSet;

use diesel::prelude::*;

use super::{
    models::{NewTransaction, NewTransactionWebhookSent, Transaction},
    schema::{transaction_webhook_sent, transactions},
    Conn, LedgerError,
};

pub trait TransactionModel {
    fn find(tx_id: &str, conn: &mut Conn) -> Result<Option<Transaction>, LedgerError>;
    fn get(tx_id: &str, conn: &mut Conn) -> Result<Transaction, LedgerError>;
    fn list_all(conn: &mut Conn) -> Result<Vec<Transaction>, LedgerError>;
    fn insert(new: &NewTransaction, conn: &mut Conn) -> Result<(), LedgerError>;
    fn update_status(
        tx_id: &str,
        status: i32,
        status_string: &str,
        conn: &mut Conn,
    ) -> Result<(), LedgerError>;
    fn update_confirmations(
        tx_id: &str,
        confirmations: i32,
        conn: &mut Conn,
    ) -> Result<(), LedgerError>;
    fn mark_success(tx_id: &str, conn: &mut Conn) -> Result<(), LedgerError>;

    /// Kinds already emitted for this tx (the `webhook_sent.<kind>`
    /// idempotency boundary of spec.md §4.8).
    fn webhook_sent_kinds(tx_id: &str, conn: &mut Conn) -> Result<HashSet<String>, LedgerError>;

    /// Record that `kind` has been emitted. Idempotent: emitting the same
    /// kind twice is a no-op rather than an error, because a dispatcher
    /// crash between "send succeeded" and "mark sent" must not poison the
    /// next cycle's retry.
    fn mark_webhook_sent(
        tx_id: &str,
        kind: &str,
        sent_at: i64,
        conn: &mut Conn,
    ) -> Result<(), LedgerError>;
}

impl TransactionModel for Transaction {
    fn find(tx_id: &str, conn: &mut Conn) -> Result<Option<Transaction>, LedgerError> {
        Ok(transactions::table.find(tx_id).first(conn).optional()?)
    }

    fn get(tx_id: &str, conn: &mut Conn) -> Result<Transaction, LedgerError> {
        Self::find(tx_id, conn)?
            .ok_or_else(|| LedgerError::TransactionNotFound(tx_id.to_string()))
    }

    fn list_all(conn: &mut Conn) -> Result<Vec<Transaction>, LedgerError> {
        Ok(transactions::table
            .order(transactions::create_time.asc())
            .load(conn)?)
    }

    fn insert(new: &NewTransaction, conn: &mut Conn) -> Result<(), LedgerError> {
        diesel::insert_into(transactions::table)
            .values(new)
            .execute(conn)?;
        Ok(())
    }

    fn update_status(
        tx_id: &str,
        status: i32,
        status_string: &str,
        conn: &mut Conn,
    ) -> Result<(), LedgerError> {
        diesel::update(transactions::table.find(tx_id))
            .set((
                transactions::status.eq(status),
                transactions::status_string.eq(status_string),
            ))
            .execute(conn)?;
        Ok(())
    }

    fn update_confirmations(
        tx_id: &str,
        confirmations: i32,
        conn: &mut Conn,
    ) -> Result<(), LedgerError> {
        diesel::update(transactions::table.find(tx_id))
            .set(transactions::confirmations.eq(confirmations))
            .execute(conn)?;
        Ok(())
    }

    fn mark_success(tx_id: &str, conn: &mut Conn) -> Result<(), LedgerError> {
        diesel::update(transactions::table.find(tx_id))
            .set(transactions::success.eq(true))
            .execute(conn)?;
        Ok(())
    }

    fn webhook_sent_kinds(tx_id: &str, conn: &mut Conn) -> Result<HashSet<String>, LedgerError> {
        Ok(transaction_webhook_sent::table
            .filter(transaction_webhook_sent::tx_id.eq(tx_id))
            .select(transaction_webhook_sent::kind)
            .load::<String>(conn)?
            .into_iter()
            .collect())
    }

    fn mark_webhook_sent(
        tx_id: &str,
        kind: &str,
        sent_at: i64,
        conn: &mut Conn,
    ) -> Result<(), LedgerError> {
        diesel::insert_into(transaction_webhook_sent::table)
            .values(&NewTransactionWebhookSent {
                tx_id,
                kind,
                sent_at,
            })
            .on_conflict((transaction_webhook_sent::tx_id, transaction_webhook_sent::kind))
            .do_nothing()
            .execute(conn)?;
        Ok(())
    }
}
