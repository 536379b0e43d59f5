//! JSON-RPC ledger client.
//!
//! Talks to a relay endpoint that owns keys, gas, and transaction plumbing,
//! and exposes the ledger surface as `ledger_*` methods. The orchestrator
//! side stays protocol-free.

use std::time::Duration;

use alloy_core::primitives::Address;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use url::Url;

use crate::artifacts::ContractDescriptor;
use crate::ledger::{Ledger, LedgerError, Receipt};

/// Transport timeout for relay requests. Operation-level timeouts are the
/// relay's concern, not ours.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Ledger implementation backed by a JSON-RPC relay endpoint.
#[derive(Debug, Clone)]
pub struct RpcLedger {
    client: reqwest::Client,
    url: Url,
}

impl RpcLedger {
    pub fn new(url: Url) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(LedgerError::Transport)?;
        Ok(Self { client, url })
    }

    /// Make a JSON-RPC call and deserialize the result.
    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, LedgerError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&json!({
                "jsonrpc": "2.0",
                "method": method,
                "params": params,
                "id": 1
            }))
            .send()
            .await?;

        let body: Value = response.json().await?;

        if let Some(error) = body.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
                .to_string();
            return Err(LedgerError::Rpc { message });
        }

        let result = body
            .get("result")
            .ok_or_else(|| LedgerError::InvalidResponse(format!("no result in {method} response")))?
            .clone();

        serde_json::from_value(result).map_err(|e| {
            LedgerError::InvalidResponse(format!("failed to deserialize {method} result: {e}"))
        })
    }
}

impl Ledger for RpcLedger {
    async fn deploy_contract(&self, descriptor: &ContractDescriptor) -> Result<Address, LedgerError> {
        self.request(
            "ledger_deployContract",
            vec![json!({
                "name": descriptor.name,
                "bytecode": descriptor.bytecode,
            })],
        )
        .await
    }

    async fn deploy_distribution(&self) -> Result<Address, LedgerError> {
        self.request("ledger_deployDistribution", vec![]).await
    }

    async fn call(
        &self,
        address: Address,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, LedgerError> {
        self.request(
            "ledger_call",
            vec![json!(address), json!(method), Value::Array(args)],
        )
        .await
    }

    async fn upgrade_proxy(
        &self,
        proxy: Address,
        implementation: Address,
    ) -> Result<Receipt, LedgerError> {
        self.request("ledger_upgradeProxy", vec![json!(proxy), json!(implementation)])
            .await
    }
}
