//! Upgrade orchestrator.
//!
//! Resolves an upgrade request into a concrete set of proxies, then
//! processes them strictly sequentially: swap the implementation, persist
//! the record, run the optional migration. Each proxy's state is durable
//! before the next proxy is touched, so a failure partway through a batch
//! leaves already-processed proxies correctly upgraded and the rest
//! untouched.

use alloy_core::primitives::Address;

use crate::Call;
use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::state::{NetworkState, PackageDefinition};
use crate::store::StateStore;

/// What to upgrade. Selector modes are mutually exclusive and validated in
/// priority order: address, then alias, then all-with-confirmation.
#[derive(Debug, Clone, Default)]
pub struct UpgradeRequest {
    pub contract_alias: Option<String>,
    pub proxy_address: Option<Address>,
    /// Explicit confirmation for the unscoped mode.
    pub all: bool,
    /// Function to invoke on each proxy right after its swap.
    pub migration: Option<Call>,
}

/// One successfully upgraded proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradedProxy {
    pub alias: String,
    pub index: usize,
    pub address: Address,
    pub version: String,
    pub implementation: Address,
}

/// Runs upgrade requests against one network.
#[derive(Debug)]
pub struct Upgrader<'a, L> {
    store: &'a StateStore,
    ledger: &'a L,
    network: String,
}

impl<'a, L: Ledger> Upgrader<'a, L> {
    pub fn new(store: &'a StateStore, ledger: &'a L, network: impl Into<String>) -> Self {
        Self {
            store,
            ledger,
            network: network.into(),
        }
    }

    /// Execute `request`, returning the proxies that were upgraded.
    pub async fn upgrade(&self, request: &UpgradeRequest) -> Result<Vec<UpgradedProxy>> {
        let _lock = self.store.lock(&self.network)?;
        let package = self.store.load_package()?;
        let mut state = self.store.load_network(&self.network)?;

        // Proxies always move to the package's current version; the
        // implementation comes from the latest frozen release recorded for
        // their alias. All selection and target resolution happens before
        // any remote call.
        let targets = select_targets(&package, &state, request)?;
        for (alias, _) in &targets {
            if state.implementation(alias).is_none() {
                return Err(Error::ImplementationNotFound { alias: alias.clone() });
            }
        }

        let version = package.version.clone();
        let mut upgraded = Vec::with_capacity(targets.len());

        for (alias, index) in targets {
            let implementation =
                state
                    .implementation(&alias)
                    .ok_or_else(|| Error::ImplementationNotFound {
                        alias: alias.clone(),
                    })?;
            let proxy = state
                .proxy(&alias, index)
                .ok_or_else(|| Error::ProxyIndexNotFound {
                    alias: alias.clone(),
                    index,
                })?
                .address;

            tracing::info!(
                alias = %alias,
                index,
                %proxy,
                %implementation,
                version = %version,
                "Upgrading proxy..."
            );
            self.ledger
                .upgrade_proxy(proxy, implementation)
                .await
                .map_err(|source| Error::UpgradeFailed {
                    alias: alias.clone(),
                    address: proxy,
                    source,
                })?;

            // Commit the swap before the migration runs: a migration failure
            // must leave a durable record already pointing at the new
            // implementation.
            state.update_proxy(&alias, index, &version, implementation)?;
            self.store.save_network(&self.network, &state)?;

            if let Some(migration) = &request.migration {
                tracing::info!(alias = %alias, %proxy, method = %migration.method, "Running migration...");
                self.ledger
                    .call(proxy, &migration.method, migration.args.clone())
                    .await
                    .map_err(|source| Error::MigrationFailed {
                        alias: alias.clone(),
                        address: proxy,
                        method: migration.method.clone(),
                        source,
                    })?;
            }

            upgraded.push(UpgradedProxy {
                alias,
                index,
                address: proxy,
                version: version.clone(),
                implementation,
            });
        }

        tracing::info!(count = upgraded.len(), network = %self.network, "Upgrade complete");
        Ok(upgraded)
    }
}

/// Resolve the request into `(alias, index)` pairs without side effects.
fn select_targets(
    package: &PackageDefinition,
    state: &NetworkState,
    request: &UpgradeRequest,
) -> Result<Vec<(String, usize)>> {
    if let Some(address) = request.proxy_address {
        let (alias, index, _) = state
            .find_proxy(address)
            .ok_or(Error::ProxyNotFound { address })?;
        return Ok(vec![(alias.to_string(), index)]);
    }

    if let Some(alias) = &request.contract_alias {
        // Every proxy under the alias, including ones already at the target
        // version: re-upgrading is a ledger-level no-op but still re-runs
        // the migration, which is explicit user intent.
        return match state.proxies.get(alias) {
            Some(proxies) => Ok((0..proxies.len()).map(|i| (alias.clone(), i)).collect()),
            // Declared but nothing deployed behind it yet.
            None if package.contracts.contains_key(alias) => Ok(Vec::new()),
            None => Err(Error::UnknownAlias { alias: alias.clone() }),
        };
    }

    if !request.all {
        return Err(Error::MissingConfirmation);
    }
    Ok(state.proxy_ids())
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::Address;

    use super::*;
    use crate::state::ProxyRecord;

    fn package() -> PackageDefinition {
        let mut package = PackageDefinition::new("MyApp", "0.2.0");
        package.add_contract("Impl", "ImplV2");
        package.add_contract("Empty", "EmptyV2");
        package
    }

    fn state_with_proxies() -> NetworkState {
        let mut state = NetworkState::new(Address::repeat_byte(1));
        for n in [10u8, 11] {
            state.append_proxy(
                "Impl",
                ProxyRecord {
                    address: Address::repeat_byte(n),
                    version: "0.1.0".into(),
                    implementation: Address::repeat_byte(2),
                },
            );
        }
        state
    }

    #[test]
    fn address_mode_takes_priority_over_alias() {
        let state = state_with_proxies();
        let request = UpgradeRequest {
            contract_alias: Some("Impl".into()),
            proxy_address: Some(Address::repeat_byte(11)),
            ..Default::default()
        };
        assert_eq!(
            select_targets(&package(), &state, &request).unwrap(),
            vec![("Impl".to_string(), 1)]
        );
    }

    #[test]
    fn unknown_address_is_rejected() {
        let state = state_with_proxies();
        let request = UpgradeRequest {
            proxy_address: Some(Address::repeat_byte(99)),
            ..Default::default()
        };
        assert!(matches!(
            select_targets(&package(), &state, &request),
            Err(Error::ProxyNotFound { .. })
        ));
    }

    #[test]
    fn alias_mode_distinguishes_unknown_from_undeployed() {
        let state = state_with_proxies();
        let request = |alias: &str| UpgradeRequest {
            contract_alias: Some(alias.to_string()),
            ..Default::default()
        };

        assert!(matches!(
            select_targets(&package(), &state, &request("Nope")),
            Err(Error::UnknownAlias { .. })
        ));
        // Declared in the package but no proxies yet: a no-op, not an error.
        assert!(select_targets(&package(), &state, &request("Empty"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn unscoped_mode_requires_confirmation() {
        let state = state_with_proxies();
        assert!(matches!(
            select_targets(&package(), &state, &UpgradeRequest::default()),
            Err(Error::MissingConfirmation)
        ));

        let confirmed = UpgradeRequest {
            all: true,
            ..Default::default()
        };
        assert_eq!(select_targets(&package(), &state, &confirmed).unwrap().len(), 2);
    }
}
