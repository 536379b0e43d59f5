//! The ledger interaction provider boundary.
//!
//! Everything that touches a target network goes through [`Ledger`]. The
//! orchestrators never see signing, gas, or wire protocol; they deploy
//! contracts, invoke functions, and repoint proxies, and wait for the
//! outcome. [`rpc::RpcLedger`] forwards to a relay endpoint over JSON-RPC;
//! [`memory::MemoryLedger`] is the in-process implementation backing the
//! test suite.

use std::str::FromStr;

use alloy_core::primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::artifacts::ContractDescriptor;

pub mod memory;
pub mod rpc;

pub use memory::MemoryLedger;
pub use rpc::RpcLedger;

/// Errors surfaced by a ledger implementation.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ledger rejected the request: {message}")]
    Rpc { message: String },

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("unexpected ledger response: {0}")]
    InvalidResponse(String),
}

/// Receipt for a mutating ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: String,
}

/// Remote execution surface used by every orchestrator.
///
/// Implementations must be usable behind a shared reference: orchestrators
/// run strictly sequentially but hold the ledger alongside the state store.
pub trait Ledger {
    /// Deploy a contract from its descriptor, returning its address.
    fn deploy_contract(
        &self,
        descriptor: &ContractDescriptor,
    ) -> impl Future<Output = Result<Address, LedgerError>>;

    /// Create a new distribution instance on the network.
    fn deploy_distribution(&self) -> impl Future<Output = Result<Address, LedgerError>>;

    /// Invoke `method(args)` on the contract at `address`.
    fn call(
        &self,
        address: Address,
        method: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<Value, LedgerError>>;

    /// Point `proxy` at a new implementation.
    fn upgrade_proxy(
        &self,
        proxy: Address,
        implementation: Address,
    ) -> impl Future<Output = Result<Receipt, LedgerError>>;
}

/// Parse an address out of a call result.
pub fn address_from_value(value: &Value) -> Result<Address, LedgerError> {
    let text = value
        .as_str()
        .ok_or_else(|| LedgerError::InvalidResponse(format!("expected an address, got {value}")))?;
    Address::from_str(text)
        .map_err(|e| LedgerError::InvalidResponse(format!("malformed address `{text}`: {e}")))
}
