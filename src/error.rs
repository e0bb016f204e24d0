//! Top-level error type for the gateway.

use displaydoc::Display;

use crate::{config::ConfigError, db::LedgerError, rpc::NodeRpcError};

#[derive(Display, Debug)]
pub enum GatewayError {
    /// configuration error: {0}
    Config(ConfigError),

    /// ledger store error: {0}
    Ledger(LedgerError),

    /// node RPC error: {0}
    NodeRpc(NodeRpcError),

    /// validation error: {0}
    Validation(String),
}

impl From<ConfigError> for GatewayError {
    fn from(src: ConfigError) -> Self {
        Self::Config(src)
    }
}

impl From<LedgerError> for GatewayError {
    fn from(src: LedgerError) -> Self {
        Self::Ledger(src)
    }
}

impl From<NodeRpcError> for GatewayError {
    fn from(src: NodeRpcError) -> Self {
        Self::NodeRpc(src)
    }
}

/// Business-level failure surfaced synchronously to an API caller (spec.md §7).
///
/// Not part of `GatewayError`'s propagation chain: a `ValidationError` is a
/// normal return value, never logged-and-swallowed by a background loop.
#[derive(Display, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// sender and receiver address are the same
    SelfSend,

    /// receiver address `{0}` is not a valid node address
    InvalidReceiver(String),

    /// available balance {available} is less than the requested {requested} (asset {asset_id})
    InsufficientFunds {
        asset_id: u64,
        available: i64,
        requested: i64,
    },

    /// sender address `{0}` is not known to the ledger
    UnknownSender(String),
}
