//! In-process ledger.
//!
//! Deterministic stand-in for a real network: fresh addresses are handed out
//! sequentially, every operation is recorded for inspection, and failures
//! can be injected per method or after a number of proxy upgrades. Backs the
//! test suite and local experimentation; implements the same [`Ledger`]
//! surface as the RPC client.

use std::collections::BTreeSet;
use std::sync::Mutex;

use alloy_core::primitives::Address;
use serde_json::{Value, json};

use crate::artifacts::ContractDescriptor;
use crate::ledger::{Ledger, LedgerError, Receipt};

/// Methods that create an on-network entity and therefore answer with a
/// fresh address instead of a plain acknowledgement.
const CREATING_METHODS: &[&str] = &["newVersion", "createProxy"];

/// One recorded `call` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub address: Address,
    pub method: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Default)]
struct Inner {
    next_account: u64,
    tx_count: u64,
    deployed: Vec<(String, Address)>,
    calls: Vec<RecordedCall>,
    upgrades: Vec<(Address, Address)>,
    upgrades_before_failure: Option<usize>,
    failing_methods: BTreeSet<String>,
}

impl Inner {
    fn next_address(&mut self) -> Address {
        self.next_account += 1;
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&self.next_account.to_be_bytes());
        Address::from(bytes)
    }
}

#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: Mutex<Inner>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `count` more proxy upgrades succeed, then reject the rest.
    pub fn fail_upgrades_after(&self, count: usize) {
        self.inner.lock().unwrap().upgrades_before_failure = Some(count);
    }

    /// Reject every future invocation of `method`.
    pub fn fail_method(&self, method: &str) {
        self.inner.lock().unwrap().failing_methods.insert(method.to_string());
    }

    pub fn clear_failures(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.upgrades_before_failure = None;
        inner.failing_methods.clear();
    }

    /// Contracts deployed so far, as `(name, address)` in deployment order.
    pub fn deployed(&self) -> Vec<(String, Address)> {
        self.inner.lock().unwrap().deployed.clone()
    }

    /// Every `call` recorded so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Calls recorded against one address.
    pub fn calls_on(&self, address: Address) -> Vec<RecordedCall> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.address == address)
            .cloned()
            .collect()
    }

    /// Proxy upgrades performed so far, as `(proxy, implementation)`.
    pub fn upgrades(&self) -> Vec<(Address, Address)> {
        self.inner.lock().unwrap().upgrades.clone()
    }
}

impl Ledger for MemoryLedger {
    async fn deploy_contract(&self, descriptor: &ContractDescriptor) -> Result<Address, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let address = inner.next_address();
        inner.deployed.push((descriptor.name.clone(), address));
        Ok(address)
    }

    async fn deploy_distribution(&self) -> Result<Address, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let address = inner.next_address();
        inner.deployed.push(("Distribution".to_string(), address));
        Ok(address)
    }

    async fn call(
        &self,
        address: Address,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_methods.contains(method) {
            return Err(LedgerError::Execution(format!("`{method}` reverted")));
        }
        inner.calls.push(RecordedCall {
            address,
            method: method.to_string(),
            args,
        });
        if CREATING_METHODS.contains(&method) {
            let created = inner.next_address();
            return Ok(json!(created));
        }
        Ok(Value::Null)
    }

    async fn upgrade_proxy(
        &self,
        proxy: Address,
        implementation: Address,
    ) -> Result<Receipt, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.upgrades_before_failure {
            Some(0) => {
                return Err(LedgerError::Execution(format!(
                    "upgrade of {proxy} rejected"
                )));
            }
            Some(ref mut remaining) => *remaining -= 1,
            None => {}
        }
        inner.upgrades.push((proxy, implementation));
        inner.tx_count += 1;
        Ok(Receipt {
            transaction_hash: format!("0x{:064x}", inner.tx_count),
        })
    }
}
