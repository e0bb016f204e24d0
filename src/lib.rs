//! BEAM custodial payment gateway: reconciliation/withdrawal engine core
//! (spec.md §1). See `SPEC_FULL.md` for the full requirements this crate
//! implements and `DESIGN.md` for the grounding ledger.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod rpc;
pub mod service;
