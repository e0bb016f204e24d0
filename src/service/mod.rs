//! Reconciliation and withdrawal engine (spec.md §1): the core this crate
//! implements. Each submodule corresponds to one row of spec.md §2's
//! component table.

pub mod address_sync;
pub mod alert;
pub mod asset_sync;
pub mod auditor;
pub mod events;
pub mod fees;
pub mod orchestrator;
pub mod projector;
pub mod withdrawal_queue;
pub mod withdrawal_request;
pub mod webhook;

pub use orchestrator::GatewayThreads;
