//! DB models: one `Queryable`/`Insertable` struct pair per entity, mirroring
//! the teacher's `db::models` (`Account`/`NewAccount`, `Txo`/`NewTxo`, ...).

use diesel::prelude::*;
use serde::Serialize;

use super::schema::{
    address_balances, addresses, assets, failed_webhooks, native_price, pending_withdrawals,
    transaction_webhook_sent, transactions,
};

// PendingWithdrawal.status values (spec.md §3). Kept as `&str` constants
// rather than a diesel-mapped enum, matching the teacher's
// `db::models::{TXO_UNSPENT, TX_PENDING, ...}` convention for sqlite, where a
// Rust enum round-tripping through `diesel-derive-enum` adds more friction
// than a handful of string constants.
pub const WITHDRAWAL_PENDING: &str = "pending";
pub const WITHDRAWAL_PROCESSING: &str = "processing";
pub const WITHDRAWAL_SENT: &str = "sent";
pub const WITHDRAWAL_SENT_CONFIRMED: &str = "sent_confirmed";
pub const WITHDRAWAL_FAILED: &str = "failed";
pub const WITHDRAWAL_ADMIN_CHECK: &str = "admin_check";

// Transaction.status values (spec.md §3).
pub const TX_STATUS_PENDING: i32 = 0;
pub const TX_STATUS_IN_PROGRESS: i32 = 1;
pub const TX_STATUS_CANCELLED: i32 = 2;
pub const TX_STATUS_COMPLETED: i32 = 3;
pub const TX_STATUS_FAILED: i32 = 4;
pub const TX_STATUS_REGISTERING: i32 = 5;

#[derive(Clone, Serialize, Identifiable, Queryable, PartialEq, Eq, Debug)]
#[diesel(table_name = addresses, primary_key(address_id))]
pub struct Address {
    pub address_id: String,
    pub wallet_kind: String,
    pub comment: Option<String>,
    pub create_time: i64,
    pub expired: bool,
    pub identity: Option<String>,
    pub owner_wallet_id: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = addresses)]
pub struct NewAddress<'a> {
    pub address_id: &'a str,
    pub wallet_kind: &'a str,
    pub comment: Option<&'a str>,
    pub create_time: i64,
    pub expired: bool,
    pub identity: Option<&'a str>,
    pub owner_wallet_id: Option<&'a str>,
}

#[derive(Clone, Serialize, Identifiable, Queryable, PartialEq, Eq, Debug)]
#[diesel(table_name = address_balances, primary_key(address_id, asset_id))]
pub struct AddressBalance {
    pub address_id: String,
    pub asset_id: i64,
    pub available: i64,
    pub locked: i64,
}

#[derive(Insertable)]
#[diesel(table_name = address_balances)]
pub struct NewAddressBalance<'a> {
    pub address_id: &'a str,
    pub asset_id: i64,
    pub available: i64,
    pub locked: i64,
}

#[derive(Clone, Serialize, Identifiable, Queryable, PartialEq, Debug)]
#[diesel(table_name = assets, primary_key(asset_id))]
pub struct Asset {
    pub asset_id: i64,
    pub metadata: String,
    pub decimals: i32,
    pub is_verified: bool,
    pub is_spam: bool,
    pub rate_beam: Option<f64>,
    pub rate_usd: Option<f64>,
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = assets)]
pub struct NewAsset<'a> {
    pub asset_id: i64,
    pub metadata: &'a str,
    pub decimals: i32,
    pub is_verified: bool,
    pub is_spam: bool,
    pub rate_beam: Option<f64>,
    pub rate_usd: Option<f64>,
}

#[derive(Clone, Serialize, Identifiable, Queryable, PartialEq, Eq, Debug)]
#[diesel(table_name = transactions, primary_key(tx_id))]
pub struct Transaction {
    pub tx_id: String,
    pub status: i32,
    pub status_string: String,
    pub income: bool,
    pub tx_type: i32,
    pub asset_id: i64,
    pub value: i64,
    pub fee: i64,
    pub sender: String,
    pub receiver: String,
    pub sender_identity: Option<String>,
    pub receiver_identity: Option<String>,
    pub comment: Option<String>,
    pub create_time: i64,
    pub confirmations: i32,
    pub kernel: Option<String>,
    pub failure_reason: Option<String>,
    pub success: bool,
}

#[derive(Insertable)]
#[diesel(table_name = transactions)]
pub struct NewTransaction<'a> {
    pub tx_id: &'a str,
    pub status: i32,
    pub status_string: &'a str,
    pub income: bool,
    pub tx_type: i32,
    pub asset_id: i64,
    pub value: i64,
    pub fee: i64,
    pub sender: &'a str,
    pub receiver: &'a str,
    pub sender_identity: Option<&'a str>,
    pub receiver_identity: Option<&'a str>,
    pub comment: Option<&'a str>,
    pub create_time: i64,
    pub confirmations: i32,
    pub kernel: Option<&'a str>,
    pub failure_reason: Option<&'a str>,
    pub success: bool,
}

#[derive(Clone, Serialize, Identifiable, Queryable, PartialEq, Eq, Debug)]
#[diesel(table_name = transaction_webhook_sent, primary_key(tx_id, kind))]
pub struct TransactionWebhookSent {
    pub tx_id: String,
    pub kind: String,
    pub sent_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = transaction_webhook_sent)]
pub struct NewTransactionWebhookSent<'a> {
    pub tx_id: &'a str,
    pub kind: &'a str,
    pub sent_at: i64,
}

#[derive(Clone, Serialize, Identifiable, Queryable, PartialEq, Eq, Debug)]
#[diesel(table_name = pending_withdrawals, primary_key(id))]
pub struct PendingWithdrawal {
    pub id: i32,
    pub sender: String,
    pub receiver: String,
    pub asset_id: i64,
    pub value: i64,
    pub fee: i64,
    pub comment: Option<String>,
    pub create_time: i64,
    pub status: String,
    pub tx_id: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = pending_withdrawals)]
pub struct NewPendingWithdrawal<'a> {
    pub sender: &'a str,
    pub receiver: &'a str,
    pub asset_id: i64,
    pub value: i64,
    pub fee: i64,
    pub comment: Option<&'a str>,
    pub create_time: i64,
    pub status: &'a str,
    pub tx_id: Option<&'a str>,
}

#[derive(Clone, Serialize, Identifiable, Queryable, PartialEq, Eq, Debug)]
#[diesel(table_name = failed_webhooks, primary_key(id))]
pub struct FailedWebhook {
    pub id: i32,
    pub url: String,
    pub event_kind: String,
    pub payload: String,
    pub last_attempt: i64,
    pub attempts: i32,
}

#[derive(Insertable)]
#[diesel(table_name = failed_webhooks)]
pub struct NewFailedWebhook<'a> {
    pub url: &'a str,
    pub event_kind: &'a str,
    pub payload: &'a str,
    pub last_attempt: i64,
    pub attempts: i32,
}

#[derive(Clone, Serialize, Identifiable, Queryable, PartialEq, Debug)]
#[diesel(table_name = native_price, primary_key(id))]
pub struct NativePrice {
    pub id: String,
    pub price_usd: f64,
    pub last_updated: i64,
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = native_price)]
pub struct NewNativePrice<'a> {
    pub id: &'a str,
    pub price_usd: f64,
    pub last_updated: i64,
}
