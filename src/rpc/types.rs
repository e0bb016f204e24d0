//! Wire contracts for the node's JSON-RPC surface (spec.md §6).

use serde::{Deserialize, Serialize};

/// Helper: the node sometimes encodes large integers as decimal strings and
/// sometimes as JSON numbers (spec.md §6 "Monetary values..."). This accepts
/// either.
pub fn deserialize_int_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Str(String),
    }
    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(i) => Ok(i),
        IntOrString::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

fn default_zero() -> i64 {
    0
}

/// The node's transaction record, as returned by `tx_list` (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTransaction {
    #[serde(rename = "txId")]
    pub tx_id: String,
    pub status: i32,
    pub status_string: String,
    #[serde(default)]
    pub income: bool,
    #[serde(default, rename = "tx_type")]
    pub tx_type: i32,
    #[serde(default, rename = "tx_type_string")]
    pub tx_type_string: String,
    pub asset_id: u64,
    #[serde(deserialize_with = "deserialize_int_or_string")]
    pub value: i64,
    #[serde(default = "default_zero")]
    pub fee: i64,
    pub sender: String,
    pub receiver: String,
    #[serde(default)]
    pub sender_identity: Option<String>,
    #[serde(default)]
    pub receiver_identity: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    pub create_time: i64,
    #[serde(default)]
    pub confirmations: i32,
    #[serde(default)]
    pub kernel: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

/// One row of `wallet_status.totals[]` (spec.md §6). Accepts either the
/// `_str` decimal-string fields or plain integers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetTotal {
    pub asset_id: u64,
    #[serde(default, deserialize_with = "deserialize_total_field")]
    pub available: i64,
    #[serde(default, deserialize_with = "deserialize_total_field")]
    pub locked: i64,
    #[serde(
        default,
        rename = "receiving_regular_str",
        deserialize_with = "deserialize_total_field"
    )]
    pub receiving_regular: i64,
    #[serde(
        default,
        rename = "sending_regular_str",
        deserialize_with = "deserialize_total_field"
    )]
    pub sending_regular: i64,
}

fn deserialize_total_field<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Field {
        Int(i64),
        Str(String),
        Missing,
    }
    match Option::<Field>::deserialize(deserializer)? {
        Some(Field::Int(i)) => Ok(i),
        Some(Field::Str(s)) => s.parse().map_err(serde::de::Error::custom),
        Some(Field::Missing) | None => Ok(0),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletStatus {
    pub current_height: u64,
    #[serde(default)]
    pub totals: Vec<AssetTotal>,
}

/// `get_utxo` response entry. `status == 1` means unlocked/spendable
/// (spec.md GLOSSARY).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utxo {
    pub asset_id: u64,
    #[serde(deserialize_with = "deserialize_int_or_string")]
    pub amount: i64,
    pub status: i32,
}

/// `addr_list`/`create_address` response entry (spec.md §3 Address).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeAddress {
    pub address: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub create_time: i64,
    #[serde(default)]
    pub expired: bool,
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub own_id: Option<String>,
    #[serde(default, rename = "wallet_type")]
    pub wallet_type: Option<String>,
}

/// `validate_address` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressValidation {
    pub is_valid: bool,
    #[serde(default)]
    pub is_mine: bool,
    #[serde(default, rename = "type")]
    pub address_type: Option<String>,
}

/// `assets_list` response entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeAsset {
    pub asset_id: u64,
    #[serde(default)]
    pub metadata: String,
    #[serde(default)]
    pub is_owned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxSendResult {
    #[serde(rename = "txId")]
    pub tx_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRpcRequest<'a, P: Serialize> {
    pub jsonrpc: &'a str,
    pub id: u64,
    pub method: &'a str,
    pub params: P,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse<R> {
    #[serde(default)]
    pub result: Option<R>,
    #[serde(default)]
    pub assets: Option<R>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}
