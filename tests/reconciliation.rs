//! End-to-end scenarios from spec.md §8, driven against the real `db` layer
//! (a temp-file SQLite ledger) and a hand-rolled `NodeClient` double standing
//! in for the wallet node, the same shape as `httpmock` stands in for an
//! HTTP peer in the teacher's own `tests/`.

use std::cell::RefCell;
use std::collections::HashMap;

use beam_gateway::{
    db::{
        Address, AddressModel, LedgerDb, NewTransaction, PendingWithdrawal,
        PendingWithdrawalModel, Transaction, TransactionModel,
    },
    logging::create_app_logger,
    rpc::{
        error::NodeRpcError,
        types::{
            AddressValidation, NodeAddress, NodeAsset, NodeTransaction, TxSendResult, Utxo,
            WalletStatus,
        },
        NodeClient,
    },
    service::{
        alert::AlertSink, projector::project_transactions, webhook::dispatch_webhooks,
        withdrawal_queue::process_withdrawals, withdrawal_request::request_withdrawal,
    },
};
use httpmock::MockServer;
use serde_json::Value;
use slog::Logger;

fn ledger() -> LedgerDb {
    let file = tempfile::NamedTempFile::new().unwrap();
    let url = file.path().to_str().unwrap().to_string();
    // Leak the tempfile's path by leaking the handle: the file must outlive
    // the pooled connections that still hold it open.
    std::mem::forget(file);
    LedgerDb::new_from_url(&url, 4).unwrap()
}

fn logger() -> Logger {
    create_app_logger()
}

fn insert_address(ledger: &LedgerDb, id: &str) {
    use beam_gateway::db::NewAddress;
    let mut conn = ledger.get_conn().unwrap();
    Address::insert(
        &NewAddress {
            address_id: id,
            wallet_kind: "regular",
            comment: None,
            create_time: 0,
            expired: false,
            identity: None,
            owner_wallet_id: None,
        },
        &mut conn,
    )
    .unwrap();
}

struct RecordingAlert {
    messages: RefCell<Vec<String>>,
}

impl RecordingAlert {
    fn new() -> Self {
        Self {
            messages: RefCell::new(Vec::new()),
        }
    }
}

impl AlertSink for RecordingAlert {
    fn alert(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}

/// Minimal, fully-wired `NodeClient` double. Only the handful of methods the
/// withdrawal/projector paths actually call are given real behavior; the
/// rest panic if accidentally exercised, the same way `unimplemented!()`
/// marks an out-of-scope corner in the projector's own unit-test stub.
struct FakeNode {
    tx_pages: RefCell<Vec<Vec<NodeTransaction>>>,
    utxos: RefCell<HashMap<u64, Vec<Utxo>>>,
    next_tx_id: RefCell<u64>,
    sent: RefCell<Vec<NodeTransaction>>,
    tx_send_should_fail: bool,
}

impl FakeNode {
    fn new() -> Self {
        Self {
            tx_pages: RefCell::new(Vec::new()),
            utxos: RefCell::new(HashMap::new()),
            next_tx_id: RefCell::new(1),
            sent: RefCell::new(Vec::new()),
            tx_send_should_fail: false,
        }
    }
}

impl NodeClient for FakeNode {
    fn tx_list(&self, _skip: u64, _count: u64) -> Result<Vec<NodeTransaction>, NodeRpcError> {
        Ok(self.tx_pages.borrow_mut().pop().unwrap_or_default())
    }

    fn wallet_status(&self) -> Result<WalletStatus, NodeRpcError> {
        unimplemented!()
    }

    fn get_utxo(&self, asset_id: u64) -> Result<Vec<Utxo>, NodeRpcError> {
        Ok(self.utxos.borrow().get(&asset_id).cloned().unwrap_or_default())
    }

    fn validate_address(&self, _address: &str) -> Result<AddressValidation, NodeRpcError> {
        Ok(AddressValidation {
            is_valid: true,
            is_mine: false,
            address_type: Some("regular".to_string()),
        })
    }

    fn addr_list(&self, _own: bool) -> Result<Vec<NodeAddress>, NodeRpcError> {
        unimplemented!()
    }

    fn create_address(&self, _expiration: &str, _comment: &str) -> Result<NodeAddress, NodeRpcError> {
        unimplemented!()
    }

    fn edit_address(&self, _address: &str, _expiration: &str) -> Result<(), NodeRpcError> {
        unimplemented!()
    }

    fn tx_send(
        &self,
        value: i64,
        fee: i64,
        sender: &str,
        receiver: &str,
        asset_id: u64,
        comment: &str,
    ) -> Result<TxSendResult, NodeRpcError> {
        if self.tx_send_should_fail {
            return Err(NodeRpcError::Rpc {
                code: -32000,
                message: "node rejected the send".to_string(),
            });
        }
        let mut next = self.next_tx_id.borrow_mut();
        let tx_id = format!("W{next}");
        *next += 1;
        self.sent.borrow_mut().push(NodeTransaction {
            tx_id: tx_id.clone(),
            status: 1,
            status_string: "in_progress".to_string(),
            income: false,
            tx_type: 1,
            tx_type_string: "simple".to_string(),
            asset_id,
            value,
            fee,
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            sender_identity: None,
            receiver_identity: None,
            comment: Some(comment.to_string()),
            create_time: 0,
            confirmations: 0,
            kernel: None,
            failure_reason: None,
        });
        Ok(TxSendResult { tx_id })
    }

    fn tx_status(&self, _tx_id: &str) -> Result<NodeTransaction, NodeRpcError> {
        unimplemented!()
    }

    fn tx_cancel(&self, _tx_id: &str) -> Result<(), NodeRpcError> {
        unimplemented!()
    }

    fn assets_list(&self, _refresh: bool) -> Result<Vec<NodeAsset>, NodeRpcError> {
        unimplemented!()
    }

    fn invoke_contract(&self, _contract_id: &str, _args: &str) -> Result<Value, NodeRpcError> {
        unimplemented!()
    }

    fn block_details(&self, _height: u64) -> Result<Value, NodeRpcError> {
        unimplemented!()
    }
}

fn deposit_tx(tx_id: &str, status: i32, confirmations: i32, receiver: &str, value: i64) -> NodeTransaction {
    NodeTransaction {
        tx_id: tx_id.to_string(),
        status,
        status_string: "test".to_string(),
        income: true,
        tx_type: 0,
        tx_type_string: "simple".to_string(),
        asset_id: 0,
        value,
        fee: 0,
        sender: "external".to_string(),
        receiver: receiver.to_string(),
        sender_identity: None,
        receiver_identity: None,
        comment: None,
        create_time: 1,
        confirmations,
        kernel: None,
        failure_reason: None,
    }
}

/// spec.md §8 scenario: a deposit starts pending (locks the receiver's
/// balance), then crosses the confirmation threshold and becomes spendable.
#[test]
fn deposit_pending_then_confirmed() {
    let ledger = ledger();
    insert_address(&ledger, "addrA");
    let logger = logger();

    let node = FakeNode::new();
    node.tx_pages.borrow_mut().push(vec![deposit_tx("T1", 1, 0, "addrA", 1_000)]);
    project_transactions(&node, &ledger, 10, &logger).unwrap();

    let mut conn = ledger.get_conn().unwrap();
    assert_eq!(Address::get_balance("addrA", 0, &mut conn).unwrap(), (0, 1_000));

    let node = FakeNode::new();
    node.tx_pages.borrow_mut().push(vec![deposit_tx("T1", 3, 10, "addrA", 1_000)]);
    project_transactions(&node, &ledger, 10, &logger).unwrap();

    assert_eq!(Address::get_balance("addrA", 0, &mut conn).unwrap(), (1_000, 0));
    assert!(Transaction::get("T1", &mut conn).unwrap().success);
}

/// spec.md §8 scenario + §4.5 FAIL path: a pending deposit that later
/// cancels must release the receiver's lock rather than crediting it.
#[test]
fn failed_deposit_releases_receiver_lock() {
    let ledger = ledger();
    insert_address(&ledger, "addrA");
    let logger = logger();

    let node = FakeNode::new();
    node.tx_pages.borrow_mut().push(vec![deposit_tx("T2", 1, 0, "addrA", 750)]);
    project_transactions(&node, &ledger, 10, &logger).unwrap();

    let mut conn = ledger.get_conn().unwrap();
    assert_eq!(Address::get_balance("addrA", 0, &mut conn).unwrap(), (0, 750));

    let node = FakeNode::new();
    node.tx_pages.borrow_mut().push(vec![deposit_tx("T2", 4, 0, "addrA", 750)]);
    project_transactions(&node, &ledger, 10, &logger).unwrap();

    assert_eq!(Address::get_balance("addrA", 0, &mut conn).unwrap(), (0, 0));
    assert!(Transaction::get("T2", &mut conn).unwrap().success);
}

/// spec.md §8 scenario 2: a brand-new, already-finalized internal transfer
/// (both ends ledger-known) nets out to exactly the fee leaving the sender
/// and the value crediting the receiver, with both locks returning to zero.
#[test]
fn internal_transfer_finalization_balances() {
    let ledger = ledger();
    insert_address(&ledger, "addrA");
    insert_address(&ledger, "addrB");
    let logger = logger();

    let tx = NodeTransaction {
        tx_id: "T2".to_string(),
        status: 3,
        status_string: "completed".to_string(),
        income: false,
        tx_type: 0,
        tx_type_string: "simple".to_string(),
        asset_id: 0,
        value: 1_000_000,
        fee: 100_000,
        sender: "addrA".to_string(),
        receiver: "addrB".to_string(),
        sender_identity: None,
        receiver_identity: None,
        comment: None,
        create_time: 0,
        confirmations: 10,
        kernel: None,
        failure_reason: None,
    };
    project_transactions(&StaticPageClient(vec![tx]), &ledger, 10, &logger).unwrap();

    let mut conn = ledger.get_conn().unwrap();
    assert_eq!(Address::get_balance("addrA", 0, &mut conn).unwrap(), (-1_100_000, 0));
    assert_eq!(Address::get_balance("addrB", 0, &mut conn).unwrap(), (1_000_000, 0));
    assert!(Transaction::get("T2", &mut conn).unwrap().success);
}

/// spec.md §8 scenario 3: a submitted withdrawal whose node tx later
/// reports `status=4` is refunded — the sender gets both the withdrawn
/// value and the fee back, and the withdrawal moves to `failed`.
#[test]
fn withdrawal_failure_refunds_sender() {
    let ledger = ledger();
    insert_address(&ledger, "addrA");
    let logger = logger();

    {
        use beam_gateway::db::NewPendingWithdrawal;
        let mut conn = ledger.get_conn().unwrap();
        Address::adjust_balance("addrA", 7, 1_000, 0, &mut conn).unwrap();
        Address::adjust_balance("addrA", 0, 500_000, 0, &mut conn).unwrap();
        PendingWithdrawal::insert(
            &NewPendingWithdrawal {
                sender: "addrA",
                receiver: "external",
                asset_id: 7,
                value: 500,
                fee: 100_000,
                comment: None,
                create_time: 0,
                status: beam_gateway::db::WITHDRAWAL_SENT,
                tx_id: Some("T3"),
            },
            &mut conn,
        )
        .unwrap();
    }

    let in_progress = NodeTransaction {
        tx_id: "T3".to_string(),
        status: 1,
        status_string: "in_progress".to_string(),
        income: false,
        tx_type: 1,
        tx_type_string: "simple".to_string(),
        asset_id: 7,
        value: 500,
        fee: 100_000,
        sender: "addrA".to_string(),
        receiver: "external".to_string(),
        sender_identity: None,
        receiver_identity: None,
        comment: None,
        create_time: 0,
        confirmations: 0,
        kernel: None,
        failure_reason: None,
    };
    project_transactions(&StaticPageClient(vec![in_progress.clone()]), &ledger, 10, &logger).unwrap();

    let mut conn = ledger.get_conn().unwrap();
    assert_eq!(Address::get_balance("addrA", 7, &mut conn).unwrap(), (500, 500));
    assert_eq!(Address::get_balance("addrA", 0, &mut conn).unwrap(), (400_000, 100_000));

    let mut failed = in_progress;
    failed.status = 4;
    failed.status_string = "failed".to_string();
    failed.failure_reason = Some("expired".to_string());
    project_transactions(&StaticPageClient(vec![failed]), &ledger, 10, &logger).unwrap();

    assert_eq!(Address::get_balance("addrA", 7, &mut conn).unwrap(), (1_000, 0));
    assert_eq!(Address::get_balance("addrA", 0, &mut conn).unwrap(), (500_000, 0));
    assert!(Transaction::get("T3", &mut conn).unwrap().success);
    let withdrawal = PendingWithdrawal::find_by_tx_id("T3", &mut conn).unwrap().unwrap();
    assert_eq!(withdrawal.status, beam_gateway::db::WITHDRAWAL_FAILED);
}

/// spec.md §8 scenario: withdrawal request -> queue processing -> node
/// `tx_send` -> projector observes and finalizes the resulting tx, marking
/// the withdrawal `sent_confirmed` and releasing the sender's lock.
#[test]
fn withdrawal_full_lifecycle() {
    let ledger = ledger();
    insert_address(&ledger, "addrA");
    let logger = logger();

    {
        let mut conn = ledger.get_conn().unwrap();
        Address::adjust_balance("addrA", 0, 2_000_000, 0, &mut conn).unwrap();
    }

    let node = FakeNode::new();
    node.utxos
        .borrow_mut()
        .insert(0, vec![Utxo { asset_id: 0, amount: 2_000_000, status: 1 }]);

    let alert = RecordingAlert::new();

    let outcome = request_withdrawal(&node, &ledger, "addrA", "addrB", 0, 500_000, None, 0).unwrap();
    let withdrawal = outcome.expect("withdrawal request should validate");

    process_withdrawals(&node, &ledger, &alert, &logger).unwrap();

    let mut conn = ledger.get_conn().unwrap();
    let updated = PendingWithdrawal::get(withdrawal.id, &mut conn).unwrap();
    assert_eq!(updated.status, beam_gateway::db::WITHDRAWAL_SENT);
    let tx_id = updated.tx_id.clone().unwrap();

    // Nothing is locked yet at this point (spec.md §9 open question 2): the
    // projector is what actually moves available -> locked, once it
    // observes the node's tx_send result as a new transaction.
    let node_tx = node.sent.borrow()[0].clone();
    project_transactions(
        &StaticPageClient(vec![node_tx.clone()]),
        &ledger,
        10,
        &logger,
    )
    .unwrap();

    let (available, locked) = Address::get_balance("addrA", 0, &mut conn).unwrap();
    assert_eq!(locked, 500_000 + node_tx.fee);
    assert_eq!(available, 2_000_000 - 500_000 - node_tx.fee);

    // Confirm it; the withdrawal should become sent_confirmed.
    let mut confirmed = node_tx.clone();
    confirmed.status = 3;
    confirmed.confirmations = 10;
    project_transactions(&StaticPageClient(vec![confirmed]), &ledger, 10, &logger).unwrap();

    let finalized = PendingWithdrawal::get(withdrawal.id, &mut conn).unwrap();
    assert_eq!(finalized.status, beam_gateway::db::WITHDRAWAL_SENT_CONFIRMED);
    let _ = tx_id;
}

/// A `NodeClient` double that always returns the same fixed page once, then
/// an empty page — enough to drive one `project_transactions` pass.
struct StaticPageClient(Vec<NodeTransaction>);

impl NodeClient for StaticPageClient {
    fn tx_list(&self, skip: u64, _count: u64) -> Result<Vec<NodeTransaction>, NodeRpcError> {
        if skip == 0 {
            Ok(self.0.clone())
        } else {
            Ok(vec![])
        }
    }
    fn wallet_status(&self) -> Result<WalletStatus, NodeRpcError> {
        unimplemented!()
    }
    fn get_utxo(&self, _asset_id: u64) -> Result<Vec<Utxo>, NodeRpcError> {
        unimplemented!()
    }
    fn validate_address(&self, _address: &str) -> Result<AddressValidation, NodeRpcError> {
        unimplemented!()
    }
    fn addr_list(&self, _own: bool) -> Result<Vec<NodeAddress>, NodeRpcError> {
        unimplemented!()
    }
    fn create_address(&self, _expiration: &str, _comment: &str) -> Result<NodeAddress, NodeRpcError> {
        unimplemented!()
    }
    fn edit_address(&self, _address: &str, _expiration: &str) -> Result<(), NodeRpcError> {
        unimplemented!()
    }
    fn tx_send(
        &self,
        _value: i64,
        _fee: i64,
        _sender: &str,
        _receiver: &str,
        _asset_id: u64,
        _comment: &str,
    ) -> Result<TxSendResult, NodeRpcError> {
        unimplemented!()
    }
    fn tx_status(&self, _tx_id: &str) -> Result<NodeTransaction, NodeRpcError> {
        unimplemented!()
    }
    fn tx_cancel(&self, _tx_id: &str) -> Result<(), NodeRpcError> {
        unimplemented!()
    }
    fn assets_list(&self, _refresh: bool) -> Result<Vec<NodeAsset>, NodeRpcError> {
        unimplemented!()
    }
    fn invoke_contract(&self, _contract_id: &str, _args: &str) -> Result<Value, NodeRpcError> {
        unimplemented!()
    }
    fn block_details(&self, _height: u64) -> Result<Value, NodeRpcError> {
        unimplemented!()
    }
}

/// spec.md §8 scenario: a withdrawal whose node `tx_send` call fails must be
/// reverted to `pending`, not left stuck in `processing`, and must alert.
#[test]
fn withdrawal_send_failure_reverts_to_pending() {
    let ledger = ledger();
    insert_address(&ledger, "addrA");
    let logger = logger();

    {
        let mut conn = ledger.get_conn().unwrap();
        Address::adjust_balance("addrA", 0, 2_000_000, 0, &mut conn).unwrap();
    }

    let mut node = FakeNode::new();
    node.utxos
        .borrow_mut()
        .insert(0, vec![Utxo { asset_id: 0, amount: 2_000_000, status: 1 }]);
    node.tx_send_should_fail = true;

    let alert = RecordingAlert::new();
    let withdrawal = request_withdrawal(&node, &ledger, "addrA", "addrB", 0, 500_000, None, 0)
        .unwrap()
        .unwrap();

    process_withdrawals(&node, &ledger, &alert, &logger).unwrap();

    let mut conn = ledger.get_conn().unwrap();
    let updated = PendingWithdrawal::get(withdrawal.id, &mut conn).unwrap();
    assert_eq!(updated.status, beam_gateway::db::WITHDRAWAL_PENDING);
    assert_eq!(alert.messages.borrow().len(), 1);
}

/// spec.md §4.6 step 4: insufficient UTXOs must not fail the withdrawal —
/// it stays `pending` for a later retry once more UTXOs mature.
#[test]
fn insufficient_utxos_retries_later() {
    let ledger = ledger();
    insert_address(&ledger, "addrA");
    let logger = logger();

    {
        let mut conn = ledger.get_conn().unwrap();
        Address::adjust_balance("addrA", 0, 2_000_000, 0, &mut conn).unwrap();
    }

    let node = FakeNode::new();
    node.utxos
        .borrow_mut()
        .insert(0, vec![Utxo { asset_id: 0, amount: 100_000, status: 1 }]);

    let alert = RecordingAlert::new();
    let withdrawal = request_withdrawal(&node, &ledger, "addrA", "addrB", 0, 500_000, None, 0)
        .unwrap()
        .unwrap();

    process_withdrawals(&node, &ledger, &alert, &logger).unwrap();

    let mut conn = ledger.get_conn().unwrap();
    let updated = PendingWithdrawal::get(withdrawal.id, &mut conn).unwrap();
    assert_eq!(updated.status, beam_gateway::db::WITHDRAWAL_PENDING);
    assert!(alert.messages.borrow().is_empty());
}

/// spec.md §4.6 step 3: a sender whose locked balance doesn't match the
/// sum of its already-sent withdrawals is a data inconsistency — the row
/// goes to `admin_check` and an alert fires, rather than being submitted.
#[test]
fn consistency_violation_triggers_admin_check() {
    let ledger = ledger();
    insert_address(&ledger, "addrA");
    let logger = logger();

    {
        let mut conn = ledger.get_conn().unwrap();
        Address::adjust_balance("addrA", 0, 2_000_000, 0, &mut conn).unwrap();
        // Simulate an inconsistency: some locked balance with no
        // corresponding sent withdrawal to explain it.
        Address::adjust_balance("addrA", 0, -1, 1, &mut conn).unwrap();
    }

    let node = FakeNode::new();
    node.utxos
        .borrow_mut()
        .insert(0, vec![Utxo { asset_id: 0, amount: 2_000_000, status: 1 }]);

    let alert = RecordingAlert::new();
    let withdrawal = request_withdrawal(&node, &ledger, "addrA", "addrB", 0, 500_000, None, 0)
        .unwrap()
        .unwrap();

    process_withdrawals(&node, &ledger, &alert, &logger).unwrap();

    let mut conn = ledger.get_conn().unwrap();
    let updated = PendingWithdrawal::get(withdrawal.id, &mut conn).unwrap();
    assert_eq!(updated.status, beam_gateway::db::WITHDRAWAL_ADMIN_CHECK);
    assert_eq!(alert.messages.borrow().len(), 1);
}

/// The added "poisoned row" scenario (SPEC_FULL.md §8): a withdrawal whose
/// sender address has gone missing from the ledger must be skipped without
/// stalling the rest of the queue.
#[test]
fn poisoned_withdrawal_does_not_stall_the_queue() {
    let ledger = ledger();
    insert_address(&ledger, "addrGood");
    let logger = logger();

    {
        let mut conn = ledger.get_conn().unwrap();
        Address::adjust_balance("addrGood", 0, 2_000_000, 0, &mut conn).unwrap();
    }

    let node = FakeNode::new();
    node.utxos
        .borrow_mut()
        .insert(0, vec![Utxo { asset_id: 0, amount: 2_000_000, status: 1 }]);
    let alert = RecordingAlert::new();

    // Insert a withdrawal for a sender that was never registered as an
    // address (a data inconsistency, not something `request_withdrawal`
    // itself would ever produce).
    {
        use beam_gateway::db::NewPendingWithdrawal;
        let mut conn = ledger.get_conn().unwrap();
        PendingWithdrawal::insert(
            &NewPendingWithdrawal {
                sender: "ghost",
                receiver: "addrB",
                asset_id: 0,
                value: 100,
                fee: 0,
                comment: None,
                create_time: 0,
                status: beam_gateway::db::WITHDRAWAL_PENDING,
                tx_id: None,
            },
            &mut conn,
        )
        .unwrap();
    }

    let good = request_withdrawal(&node, &ledger, "addrGood", "addrB", 0, 500_000, None, 1)
        .unwrap()
        .unwrap();

    process_withdrawals(&node, &ledger, &alert, &logger).unwrap();

    let mut conn = ledger.get_conn().unwrap();
    let updated = PendingWithdrawal::get(good.id, &mut conn).unwrap();
    assert_eq!(updated.status, beam_gateway::db::WITHDRAWAL_SENT);
}

/// spec.md §4.8's event table, exercised end-to-end: a finalized tx between
/// two ledger-known addresses dispatches a single merged
/// `internal_transfer_confirmed` webhook, not a separate deposit/withdraw
/// pair, and the dispatch is idempotent across a second pass.
#[test]
fn internal_transfer_dispatches_merged_webhook() {
    let ledger = ledger();
    insert_address(&ledger, "addrA");
    insert_address(&ledger, "addrB");
    let logger = logger();

    {
        let mut conn = ledger.get_conn().unwrap();
        Transaction::insert(
            &NewTransaction {
                tx_id: "T9",
                status: 3,
                status_string: "completed",
                income: false,
                tx_type: 0,
                asset_id: 0,
                value: 250,
                fee: 0,
                sender: "addrA",
                receiver: "addrB",
                sender_identity: None,
                receiver_identity: None,
                comment: None,
                create_time: 0,
                confirmations: 10,
                kernel: None,
                failure_reason: None,
                success: true,
            },
            &mut conn,
        )
        .unwrap();
    }

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::POST).path("/webhook");
        then.status(200);
    });

    let http = reqwest::blocking::Client::new();
    let url: url::Url = server.url("/webhook").parse().unwrap();

    dispatch_webhooks(&http, &ledger, &[url.clone()], 10, 3, &logger).unwrap();
    mock.assert_hits(1);

    // Re-dispatching must not re-send: the kind is already recorded sent.
    dispatch_webhooks(&http, &ledger, &[url], 10, 3, &logger).unwrap();
    mock.assert_hits(1);

    let mut conn = ledger.get_conn().unwrap();
    let sent = Transaction::webhook_sent_kinds("T9", &mut conn).unwrap();
    assert!(sent.contains("internal_transfer_confirmed"));
    assert!(!sent.contains("deposit_confirmed"));
    assert!(!sent.contains("withdraw_confirmed"));
}

/// spec.md §8 scenario 6: a webhook endpoint that always errors exhausts its
/// retries and is persisted as a `FailedWebhook` instead of being marked
/// sent. `max_retries=1` keeps this to a single `10 * 2^0`s backoff sleep.
#[test]
fn webhook_retry_exhaustion_persists_failed_webhook() {
    let ledger = ledger();
    insert_address(&ledger, "addrA");
    let logger = logger();

    {
        let mut conn = ledger.get_conn().unwrap();
        Transaction::insert(
            &NewTransaction {
                tx_id: "T10",
                status: 3,
                status_string: "completed",
                income: true,
                tx_type: 0,
                asset_id: 0,
                value: 10,
                fee: 0,
                sender: "external",
                receiver: "addrA",
                sender_identity: None,
                receiver_identity: None,
                comment: None,
                create_time: 0,
                confirmations: 10,
                kernel: None,
                failure_reason: None,
                success: true,
            },
            &mut conn,
        )
        .unwrap();
    }

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::POST).path("/webhook");
        then.status(500);
    });

    let http = reqwest::blocking::Client::new();
    let url: url::Url = server.url("/webhook").parse().unwrap();

    beam_gateway::service::webhook::dispatch_webhooks(&http, &ledger, &[url], 10, 1, &logger).unwrap();
    mock.assert_hits(1);

    let mut conn = ledger.get_conn().unwrap();
    let sent = Transaction::webhook_sent_kinds("T10", &mut conn).unwrap();
    assert!(!sent.contains("deposit_confirmed"));

    use beam_gateway::db::FailedWebhookModel;
    let failed = beam_gateway::db::FailedWebhook::list_all(&mut conn).unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].event_kind, "deposit_confirmed");
}
