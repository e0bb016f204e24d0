//! DB impl for the PendingWithdrawal model (spec.md §3, §4.6).

use diesel::prelude::*;

use super::{
    models::{
        NewPendingWithdrawal, PendingWithdrawal, WITHDRAWAL_PENDING, WITHDRAWAL_PROCESSING,
        WITHDRAWAL_SENT, WITHDRAWAL_SENT_CONFIRMED,
    },
    schema::pending_withdrawals,
    Conn, LedgerError,
};

pub trait PendingWithdrawalModel {
    fn insert(new: &NewPendingWithdrawal, conn: &mut Conn) -> Result<PendingWithdrawal, LedgerError>;
    fn get(id: i32, conn: &mut Conn) -> Result<PendingWithdrawal, LedgerError>;
    fn find_by_tx_id(tx_id: &str, conn: &mut Conn) -> Result<Option<PendingWithdrawal>, LedgerError>;
    fn list_by_status(status: &str, conn: &mut Conn) -> Result<Vec<PendingWithdrawal>, LedgerError>;

    /// Withdrawals for `sender` already submitted to the node (`sent`),
    /// ordered by `create_time` — these are the only non-terminal rows whose
    /// value the projector will have locked once it observes the mirrored
    /// transaction, so they are what the consistency gate (spec.md §4.6 step
    /// 2) checks the sender's locked balance against. A row still in
    /// `pending`/`processing` has not moved any balance yet under this
    /// spec's redesigned single-locker rule (spec.md §9 open question 2) and
    /// so contributes nothing to the expected lock.
    fn list_sent_for_sender(
        sender: &str,
        conn: &mut Conn,
    ) -> Result<Vec<PendingWithdrawal>, LedgerError>;

    /// Conditional `pending -> processing` transition (spec.md §4.6 step 5,
    /// §9 "lease"). Returns `true` iff this call performed the transition;
    /// `false` means another worker already claimed the row.
    fn lease_for_processing(id: i32, conn: &mut Conn) -> Result<bool, LedgerError>;

    fn revert_to_pending(id: i32, conn: &mut Conn) -> Result<(), LedgerError>;
    fn mark_sent(id: i32, tx_id: &str, conn: &mut Conn) -> Result<(), LedgerError>;
    fn mark_sent_confirmed(id: i32, conn: &mut Conn) -> Result<(), LedgerError>;
    fn mark_failed(id: i32, conn: &mut Conn) -> Result<(), LedgerError>;
    fn mark_admin_check(id: i32, conn: &mut Conn) -> Result<(), LedgerError>;
}

impl PendingWithdrawalModel for PendingWithdrawal {
    fn insert(
        new: &NewPendingWithdrawal,
        conn: &mut Conn,
    ) -> Result<PendingWithdrawal, LedgerError> {
        diesel::insert_into(pending_withdrawals::table)
            .values(new)
            .execute(conn)?;
        let id: i32 = diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>(
            "last_insert_rowid()",
        ))
        .get_result(conn)?;
        Self::get(id, conn)
    }

    fn get(id: i32, conn: &mut Conn) -> Result<PendingWithdrawal, LedgerError> {
        pending_withdrawals::table
            .find(id)
            .first(conn)
            .optional()?
            .ok_or(LedgerError::PendingWithdrawalNotFound(id))
    }

    fn find_by_tx_id(
        tx_id: &str,
        conn: &mut Conn,
    ) -> Result<Option<PendingWithdrawal>, LedgerError> {
        Ok(pending_withdrawals::table
            .filter(pending_withdrawals::tx_id.eq(tx_id))
            .first(conn)
            .optional()?)
    }

    fn list_by_status(status: &str, conn: &mut Conn) -> Result<Vec<PendingWithdrawal>, LedgerError> {
        Ok(pending_withdrawals::table
            .filter(pending_withdrawals::status.eq(status))
            .order(pending_withdrawals::create_time.asc())
            .load(conn)?)
    }

    fn list_sent_for_sender(
        sender: &str,
        conn: &mut Conn,
    ) -> Result<Vec<PendingWithdrawal>, LedgerError> {
        Ok(pending_withdrawals::table
            .filter(pending_withdrawals::sender.eq(sender))
            .filter(pending_withdrawals::status.eq(WITHDRAWAL_SENT))
            .order(pending_withdrawals::create_time.asc())
            .load(conn)?)
    }

    fn lease_for_processing(id: i32, conn: &mut Conn) -> Result<bool, LedgerError> {
        let affected = diesel::update(
            pending_withdrawals::table
                .filter(pending_withdrawals::id.eq(id))
                .filter(pending_withdrawals::status.eq(WITHDRAWAL_PENDING)),
        )
        .set(pending_withdrawals::status.eq(WITHDRAWAL_PROCESSING))
        .execute(conn)?;
        Ok(affected == 1)
    }

    fn revert_to_pending(id: i32, conn: &mut Conn) -> Result<(), LedgerError> {
        diesel::update(pending_withdrawals::table.find(id))
            .set(pending_withdrawals::status.eq(WITHDRAWAL_PENDING))
            .execute(conn)?;
        Ok(())
    }

    fn mark_sent(id: i32, tx_id: &str, conn: &mut Conn) -> Result<(), LedgerError> {
        diesel::update(pending_withdrawals::table.find(id))
            .set((
                pending_withdrawals::status.eq(WITHDRAWAL_SENT),
                pending_withdrawals::tx_id.eq(tx_id),
            ))
            .execute(conn)?;
        Ok(())
    }

    fn mark_sent_confirmed(id: i32, conn: &mut Conn) -> Result<(), LedgerError> {
        diesel::update(pending_withdrawals::table.find(id))
            .set(pending_withdrawals::status.eq(WITHDRAWAL_SENT_CONFIRMED))
            .execute(conn)?;
        Ok(())
    }

    fn mark_failed(id: i32, conn: &mut Conn) -> Result<(), LedgerError> {
        diesel::update(pending_withdrawals::table.find(id))
            .set(pending_withdrawals::status.eq(super::models::WITHDRAWAL_FAILED))
            .execute(conn)?;
        Ok(())
    }

    fn mark_admin_check(id: i32, conn: &mut Conn) -> Result<(), LedgerError> {
        diesel::update(pending_withdrawals::table.find(id))
            .set(pending_withdrawals::status.eq(super::models::WITHDRAWAL_ADMIN_CHECK))
            .execute(conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_ledger;

    fn new_withdrawal<'a>(sender: &'a str) -> NewPendingWithdrawal<'a> {
        NewPendingWithdrawal {
            sender,
            receiver: "receiver1",
            asset_id: 0,
            value: 100,
            fee: 0,
            comment: None,
            create_time: 0,
            status: WITHDRAWAL_PENDING,
            tx_id: None,
        }
    }

    #[test]
    fn lease_is_single_winner() {
        let db = test_ledger();
        let mut conn = db.get_conn().unwrap();
        let w = PendingWithdrawal::insert(&new_withdrawal("A"), &mut conn).unwrap();

        assert!(PendingWithdrawal::lease_for_processing(w.id, &mut conn).unwrap());
        // A second lease attempt on an already-processing row must fail.
        assert!(!PendingWithdrawal::lease_for_processing(w.id, &mut conn).unwrap());
    }
}
