//! Node JSON-RPC client (spec.md §4.1, §6).

mod client;
mod error;
pub mod types;

pub use client::{HttpNodeClient, NodeClient};
pub use error::NodeRpcError;
