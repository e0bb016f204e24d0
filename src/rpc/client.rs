//! Thin synchronous JSON-RPC client for the wallet node (spec.md §4.1).
//!
//! Stateless: every call is an independent HTTP POST with a 5s timeout
//! (spec.md §5). No retries here — callers (the projector, the withdrawal
//! queue) decide whether and how to retry, exactly as spec.md §4.1 specifies.
//! Grounded on the teacher's pattern of keeping the node connection behind a
//! trait (`mc_connection`'s `Connection` trait / `ThickClient`) so the
//! engine can be exercised against a test double.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::{json, Value};
use url::Url;

use super::{
    error::NodeRpcError,
    types::{
        AddressValidation, JsonRpcRequest, JsonRpcResponse, NodeAddress, NodeAsset,
        NodeTransaction, TxSendResult, Utxo, WalletStatus,
    },
};

const RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything the gateway needs from the wallet node (spec.md §4.1, plus the
/// extra methods spec.md §6 lists as consumed).
pub trait NodeClient: Send + Sync {
    fn tx_list(&self, skip: u64, count: u64) -> Result<Vec<NodeTransaction>, NodeRpcError>;
    fn wallet_status(&self) -> Result<WalletStatus, NodeRpcError>;
    fn get_utxo(&self, asset_id: u64) -> Result<Vec<Utxo>, NodeRpcError>;
    fn validate_address(&self, address: &str) -> Result<AddressValidation, NodeRpcError>;
    fn addr_list(&self, own: bool) -> Result<Vec<NodeAddress>, NodeRpcError>;
    fn create_address(&self, expiration: &str, comment: &str)
        -> Result<NodeAddress, NodeRpcError>;
    fn edit_address(&self, address: &str, expiration: &str) -> Result<(), NodeRpcError>;
    fn tx_send(
        &self,
        value: i64,
        fee: i64,
        sender: &str,
        receiver: &str,
        asset_id: u64,
        comment: &str,
    ) -> Result<TxSendResult, NodeRpcError>;
    fn tx_status(&self, tx_id: &str) -> Result<NodeTransaction, NodeRpcError>;
    fn tx_cancel(&self, tx_id: &str) -> Result<(), NodeRpcError>;
    fn assets_list(&self, refresh: bool) -> Result<Vec<NodeAsset>, NodeRpcError>;
    fn invoke_contract(&self, contract_id: &str, args: &str) -> Result<Value, NodeRpcError>;
    fn block_details(&self, height: u64) -> Result<Value, NodeRpcError>;
}

/// Production implementation: one JSON-RPC 2.0 POST per call.
pub struct HttpNodeClient {
    url: Url,
    http: Client,
    next_id: AtomicU64,
}

impl HttpNodeClient {
    pub fn new(url: Url) -> Self {
        let http = Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .expect("failed constructing reqwest client");
        Self {
            url,
            http,
            next_id: AtomicU64::new(1),
        }
    }

    fn call<P: Serialize, R: for<'de> serde::Deserialize<'de>>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, NodeRpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let response: JsonRpcResponse<R> = self
            .http
            .post(self.url.clone())
            .json(&request)
            .send()?
            .json()?;

        if let Some(err) = response.error {
            return Err(NodeRpcError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        response
            .result
            .or(response.assets)
            .ok_or_else(|| NodeRpcError::MalformedResponse(format!("{method}: empty response")))
    }
}

impl NodeClient for HttpNodeClient {
    fn tx_list(&self, skip: u64, count: u64) -> Result<Vec<NodeTransaction>, NodeRpcError> {
        self.call("tx_list", json!({ "skip": skip, "count": count }))
    }

    fn wallet_status(&self) -> Result<WalletStatus, NodeRpcError> {
        self.call("wallet_status", json!({}))
    }

    fn get_utxo(&self, asset_id: u64) -> Result<Vec<Utxo>, NodeRpcError> {
        self.call(
            "get_utxo",
            json!({ "filter": { "asset_id": asset_id } }),
        )
    }

    fn validate_address(&self, address: &str) -> Result<AddressValidation, NodeRpcError> {
        self.call("validate_address", json!({ "address": address }))
    }

    fn addr_list(&self, own: bool) -> Result<Vec<NodeAddress>, NodeRpcError> {
        self.call("addr_list", json!({ "own": own }))
    }

    fn create_address(
        &self,
        expiration: &str,
        comment: &str,
    ) -> Result<NodeAddress, NodeRpcError> {
        self.call(
            "create_address",
            json!({ "expiration": expiration, "comment": comment }),
        )
    }

    fn edit_address(&self, address: &str, expiration: &str) -> Result<(), NodeRpcError> {
        let _: Value = self.call(
            "edit_address",
            json!({ "address": address, "expiration": expiration }),
        )?;
        Ok(())
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
        self.call(
            "tx_send",
            json!({
                "value": value,
                "fee": fee,
                "sender": sender,
                "receiver": receiver,
                "asset_id": asset_id,
                "comment": comment,
            }),
        )
    }

    fn tx_status(&self, tx_id: &str) -> Result<NodeTransaction, NodeRpcError> {
        self.call("tx_status", json!({ "txId": tx_id }))
    }

    fn tx_cancel(&self, tx_id: &str) -> Result<(), NodeRpcError> {
        let _: Value = self.call("tx_cancel", json!({ "txId": tx_id }))?;
        Ok(())
    }

    fn assets_list(&self, refresh: bool) -> Result<Vec<NodeAsset>, NodeRpcError> {
        self.call("assets_list", json!({ "refresh": refresh }))
    }

    fn invoke_contract(&self, contract_id: &str, args: &str) -> Result<Value, NodeRpcError> {
        self.call(
            "invoke_contract",
            json!({ "contract_id": contract_id, "args": args }),
        )
    }

    fn block_details(&self, height: u64) -> Result<Value, NodeRpcError> {
        self.call("block_details", json!({ "height": height }))
    }
}
