//! DB impl for the FailedWebhook model (spec.md §4.8 replay queue).

use diesel::prelude::*;

use super::{
    models::{FailedWebhook, NewFailedWebhook},
    schema::failed_webhooks,
    Conn, LedgerError,
};

pub trait FailedWebhookModel {
    fn insert(new: &NewFailedWebhook, conn: &mut Conn) -> Result<(), LedgerError>;
    fn list_all(conn: &mut Conn) -> Result<Vec<FailedWebhook>, LedgerError>;
    fn bump_attempt(id: i32, last_attempt: i64, conn: &mut Conn) -> Result<(), LedgerError>;
    fn delete(id: i32, conn: &mut Conn) -> Result<(), LedgerError>;
}

impl FailedWebhookModel for FailedWebhook {
    fn insert(new: &NewFailedWebhook, conn: &mut Conn) -> Result<(), LedgerError> {
        diesel::insert_into(failed_webhooks::table)
            .values(new)
            .execute(conn)?;
        Ok(())
    }

    fn list_all(conn: &mut Conn) -> Result<Vec<FailedWebhook>, LedgerError> {
        Ok(failed_webhooks::table
            .order(failed_webhooks::last_attempt.asc())
            .load(conn)?)
    }

    fn bump_attempt(id: i32, last_attempt: i64, conn: &mut Conn) -> Result<(), LedgerError> {
        diesel::update(failed_webhooks::table.find(id))
            .set((
                failed_webhooks::last_attempt.eq(last_attempt),
                failed_webhooks::attempts.eq(failed_webhooks::attempts + 1),
            ))
            .execute(conn)?;
        Ok(())
    }

    fn delete(id: i32, conn: &mut Conn) -> Result<(), LedgerError> {
        diesel::delete(failed_webhooks::table.find(id)).execute(conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_ledger;

    #[test]
    fn replay_queue_drains_on_delete() {
        let db = test_ledger();
        let mut conn = db.get_conn().unwrap();

        FailedWebhook::insert(
            &NewFailedWebhook {
                url: "https://example.com/hook",
                event_kind: "withdrawal_sent",
                payload: "{}",
                last_attempt: 100,
                attempts: 1,
            },
            &mut conn,
        )
        .unwrap();

        let pending = FailedWebhook::list_all(&mut conn).unwrap();
        assert_eq!(pending.len(), 1);

        FailedWebhook::bump_attempt(pending[0].id, 200, &mut conn).unwrap();
        let bumped = FailedWebhook::list_all(&mut conn).unwrap();
        assert_eq!(bumped[0].attempts, 2);
        assert_eq!(bumped[0].last_attempt, 200);

        FailedWebhook::delete(bumped[0].id, &mut conn).unwrap();
        assert!(FailedWebhook::list_all(&mut conn).unwrap().is_empty());
    }
}
