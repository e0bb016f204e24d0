//! RPC error taxonomy (spec.md §7): `RpcError` (node returned a JSON-RPC
//! error object) vs. `TransportError` (network/HTTP/deserialization
//! failure). Mirrors the teacher's `WalletServiceError::Connection` /
//! `ProstDecode` split between "the peer rejected the call" and "we could
//! not even talk to the peer".

use displaydoc::Display;

#[derive(Display, Debug, Clone, PartialEq, Eq)]
pub enum NodeRpcError {
    /// node RPC error {code}: {message}
    Rpc { code: i64, message: String },

    /// transport error talking to the node: {0}
    Transport(String),

    /// malformed response from the node: {0}
    MalformedResponse(String),
}

impl From<reqwest::Error> for NodeRpcError {
    fn from(src: reqwest::Error) -> Self {
        Self::Transport(src.to_string())
    }
}

impl From<serde_json::Error> for NodeRpcError {
    fn from(src: serde_json::Error) -> Self {
        Self::MalformedResponse(src.to_string())
    }
}
