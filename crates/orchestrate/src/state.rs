//! Package and network records, plus the proxy registry bookkeeping.
//!
//! The package definition declares intent (alias -> contract type) and is
//! network-independent; one network state exists per target network and
//! records what is actually live there. Both are owned on disk by
//! [`StateStore`](crate::store::StateStore); everything here is pure
//! in-memory bookkeeping with no remote calls.

use std::collections::BTreeMap;

use alloy_core::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A reference to an on-network instance, stored as `{ "address": "0x..." }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRef {
    pub address: Address,
}

impl From<Address> for AddressRef {
    fn from(address: Address) -> Self {
        Self { address }
    }
}

/// The package definition record (`rollout.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDefinition {
    pub name: String,
    /// Current semantic version; the version the next deploy publishes and
    /// the version proxies are upgraded to.
    pub version: String,
    /// Alias -> contract type name. Declares intended content, not yet
    /// deployed; aliases are unique by construction.
    #[serde(default)]
    pub contracts: BTreeMap<String, String>,
    /// Kernel registry the package's releases are published into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel: Option<AddressRef>,
}

impl PackageDefinition {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            contracts: BTreeMap::new(),
            kernel: None,
        }
    }

    /// Register (or re-point) a contract alias. Renaming an alias never
    /// retroactively changes already-deployed proxies.
    pub fn add_contract(&mut self, alias: impl Into<String>, contract_type: impl Into<String>) {
        self.contracts.insert(alias.into(), contract_type.into());
    }

    /// Move the package to a new current version. The next deploy publishes
    /// a release for it.
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }
}

/// One live proxy instance: where it is, which version it runs, and which
/// implementation it currently forwards to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRecord {
    pub address: Address,
    pub version: String,
    pub implementation: Address,
}

/// The per-network state record (`rollout.<network>.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkState {
    /// The on-network distribution instance backing this network.
    pub distribution: AddressRef,
    /// Active release endpoint used for new proxy creation; set once the
    /// first release is registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<AddressRef>,
    /// Alias -> implementation address at the latest published version.
    #[serde(default)]
    pub contracts: BTreeMap<String, AddressRef>,
    /// Alias -> append-only list of live proxies. Index is identity: proxies
    /// are never removed or reindexed.
    #[serde(default)]
    pub proxies: BTreeMap<String, Vec<ProxyRecord>>,
}

impl NetworkState {
    /// Seed a fresh network state around a newly deployed distribution.
    /// Package-only fields (name, version) are intentionally not carried.
    pub fn new(distribution: Address) -> Self {
        Self {
            distribution: distribution.into(),
            provider: None,
            contracts: BTreeMap::new(),
            proxies: BTreeMap::new(),
        }
    }

    /// Latest implementation address recorded for an alias.
    pub fn implementation(&self, alias: &str) -> Option<Address> {
        self.contracts.get(alias).map(|r| r.address)
    }

    /// Append a proxy record under an alias. Insertion order is stable.
    pub fn append_proxy(&mut self, alias: &str, record: ProxyRecord) {
        self.proxies.entry(alias.to_string()).or_default().push(record);
    }

    /// The `index`-th proxy of an alias, if registered.
    pub fn proxy(&self, alias: &str, index: usize) -> Option<&ProxyRecord> {
        self.proxies.get(alias).and_then(|list| list.get(index))
    }

    /// Reverse lookup: resolve a proxy address to `(alias, index, record)`.
    pub fn find_proxy(&self, address: Address) -> Option<(&str, usize, &ProxyRecord)> {
        self.proxies.iter().find_map(|(alias, list)| {
            list.iter()
                .position(|p| p.address == address)
                .map(|index| (alias.as_str(), index, &list[index]))
        })
    }

    /// Rewrite the version and implementation of an existing proxy record in
    /// place. The proxy's address and position never change.
    pub fn update_proxy(
        &mut self,
        alias: &str,
        index: usize,
        version: &str,
        implementation: Address,
    ) -> Result<()> {
        let list = self.proxies.get_mut(alias).ok_or_else(|| Error::UnknownAlias {
            alias: alias.to_string(),
        })?;
        let record = list.get_mut(index).ok_or_else(|| Error::ProxyIndexNotFound {
            alias: alias.to_string(),
            index,
        })?;
        record.version = version.to_string();
        record.implementation = implementation;
        Ok(())
    }

    /// All `(alias, index)` pairs currently registered, alias-sorted,
    /// indices in insertion order.
    pub fn proxy_ids(&self) -> Vec<(String, usize)> {
        self.proxies
            .iter()
            .flat_map(|(alias, list)| (0..list.len()).map(move |i| (alias.clone(), i)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    fn record(n: u8, version: &str) -> ProxyRecord {
        ProxyRecord {
            address: addr(n),
            version: version.to_string(),
            implementation: addr(n + 100),
        }
    }

    #[test]
    fn append_preserves_insertion_order() {
        let mut state = NetworkState::new(addr(1));
        state.append_proxy("Impl", record(10, "0.1.0"));
        state.append_proxy("Impl", record(11, "0.1.0"));
        state.append_proxy("Other", record(12, "0.1.0"));

        assert_eq!(state.proxy("Impl", 0).unwrap().address, addr(10));
        assert_eq!(state.proxy("Impl", 1).unwrap().address, addr(11));
        assert_eq!(state.proxy("Other", 0).unwrap().address, addr(12));
        assert!(state.proxy("Impl", 2).is_none());
    }

    #[test]
    fn find_proxy_resolves_alias_and_index() {
        let mut state = NetworkState::new(addr(1));
        state.append_proxy("Impl", record(10, "0.1.0"));
        state.append_proxy("Impl", record(11, "0.1.0"));

        let (alias, index, found) = state.find_proxy(addr(11)).unwrap();
        assert_eq!(alias, "Impl");
        assert_eq!(index, 1);
        assert_eq!(found.implementation, addr(111));

        assert!(state.find_proxy(addr(99)).is_none());
    }

    #[test]
    fn update_proxy_rewrites_in_place() {
        let mut state = NetworkState::new(addr(1));
        state.append_proxy("Impl", record(10, "0.1.0"));
        state.append_proxy("Impl", record(11, "0.1.0"));

        state.update_proxy("Impl", 0, "0.2.0", addr(42)).unwrap();

        let updated = state.proxy("Impl", 0).unwrap();
        assert_eq!(updated.address, addr(10));
        assert_eq!(updated.version, "0.2.0");
        assert_eq!(updated.implementation, addr(42));
        // Sibling untouched.
        assert_eq!(state.proxy("Impl", 1).unwrap(), &record(11, "0.1.0"));
    }

    #[test]
    fn update_proxy_rejects_unknown_targets() {
        let mut state = NetworkState::new(addr(1));
        state.append_proxy("Impl", record(10, "0.1.0"));

        assert!(matches!(
            state.update_proxy("Nope", 0, "0.2.0", addr(42)),
            Err(Error::UnknownAlias { .. })
        ));
        assert!(matches!(
            state.update_proxy("Impl", 5, "0.2.0", addr(42)),
            Err(Error::ProxyIndexNotFound { index: 5, .. })
        ));
    }
}
