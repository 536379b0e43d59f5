//! Proxy creation.
//!
//! New proxies are created through the network's active release endpoint and
//! start out at the package's current version, forwarding to the latest
//! implementation recorded for their alias. Created proxies are appended to
//! the registry; they are never removed or reindexed afterwards.

use serde_json::json;

use crate::Call;
use crate::error::{Error, Result};
use crate::ledger::{Ledger, address_from_value};
use crate::state::ProxyRecord;
use crate::store::StateStore;

/// Create a proxy for `alias` on `network`, optionally running an
/// initialization call on it, and record it.
pub async fn create_proxy<L: Ledger>(
    store: &StateStore,
    ledger: &L,
    network: &str,
    alias: &str,
    init: Option<&Call>,
) -> Result<ProxyRecord> {
    let _lock = store.lock(network)?;
    let package = store.load_package()?;
    let mut state = store.load_network(network)?;

    if !package.contracts.contains_key(alias) && !state.proxies.contains_key(alias) {
        return Err(Error::UnknownAlias {
            alias: alias.to_string(),
        });
    }
    let implementation = state
        .implementation(alias)
        .ok_or_else(|| Error::ImplementationNotFound {
            alias: alias.to_string(),
        })?;
    let provider = state.provider.ok_or_else(|| Error::NoActiveRelease {
        network: network.to_string(),
    })?;

    tracing::info!(alias, %implementation, "Creating proxy...");
    let result = ledger
        .call(
            provider.address,
            "createProxy",
            vec![json!(alias), json!(implementation)],
        )
        .await
        .map_err(|source| Error::remote(format!("createProxy {alias}"), source))?;
    let proxy = address_from_value(&result)
        .map_err(|source| Error::remote(format!("createProxy {alias}"), source))?;

    if let Some(call) = init {
        tracing::info!(%proxy, method = %call.method, "Initializing proxy...");
        ledger
            .call(proxy, &call.method, call.args.clone())
            .await
            .map_err(|source| Error::remote(format!("initialize {proxy}"), source))?;
    }

    let record = ProxyRecord {
        address: proxy,
        version: package.version.clone(),
        implementation,
    };
    state.append_proxy(alias, record.clone());
    store.save_network(network, &state)?;
    tracing::info!(alias, %proxy, version = %record.version, "Proxy created");
    Ok(record)
}
