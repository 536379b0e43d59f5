//! Distribution manager: releases and the kernel registry.
//!
//! A distribution is the on-network registry behind one package on one
//! network. The manager opens a release per version, fills it
//! implementation-by-implementation, freezes it, and publishes it into the
//! kernel. Releases are per-run constructs: created mutable, frozen once,
//! never mutated again.

use std::collections::BTreeMap;

use alloy_core::primitives::Address;
use serde_json::json;

use crate::artifacts::ContractDescriptor;
use crate::error::{Error, Result};
use crate::ledger::{Ledger, address_from_value};

/// An immutable-once-frozen mapping from contract alias to implementation
/// address for one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub address: Address,
    pub version: String,
    pub contracts: BTreeMap<String, Address>,
    pub frozen: bool,
}

/// Orchestrates release lifecycle against a distribution instance.
#[derive(Debug)]
pub struct DistributionManager<'a, L> {
    ledger: &'a L,
    address: Option<Address>,
    releases: BTreeMap<String, Release>,
}

impl<'a, L: Ledger> DistributionManager<'a, L> {
    pub fn new(ledger: &'a L) -> Self {
        Self {
            ledger,
            address: None,
            releases: BTreeMap::new(),
        }
    }

    /// Bind to an existing distribution. Trusts the persisted record; no
    /// validation beyond existence is performed here.
    pub fn connect(&mut self, address: Address) {
        self.address = Some(address);
    }

    pub fn address(&self) -> Option<Address> {
        self.address
    }

    fn require_address(&self) -> Result<Address> {
        self.address.ok_or(Error::NoDistribution)
    }

    /// Create a distribution instance. The caller decides whether one is
    /// needed by checking the network state; this must not be called twice
    /// for the same network.
    pub async fn deploy(&mut self) -> Result<Address> {
        let address = self
            .ledger
            .deploy_distribution()
            .await
            .map_err(|source| Error::remote("distribution deploy", source))?;
        tracing::info!(%address, "Distribution deployed");
        self.address = Some(address);
        Ok(address)
    }

    /// Open a new, unfrozen release for `version` and return its address.
    ///
    /// An unfrozen release for the same version is reopened as-is, so a
    /// failed deployment can be retried from scratch.
    pub async fn new_version(&mut self, version: &str) -> Result<Address> {
        let distribution = self.require_address()?;
        if let Some(existing) = self.releases.get(version) {
            if existing.frozen {
                return Err(Error::DuplicateVersion {
                    version: version.to_string(),
                });
            }
            return Ok(existing.address);
        }

        let result = self
            .ledger
            .call(distribution, "newVersion", vec![json!(version)])
            .await
            .map_err(|source| Error::remote(format!("newVersion {version}"), source))?;
        let address = address_from_value(&result)
            .map_err(|source| Error::remote(format!("newVersion {version}"), source))?;

        tracing::info!(version, release = %address, "Release opened");
        self.releases.insert(
            version.to_string(),
            Release {
                address,
                version: version.to_string(),
                contracts: BTreeMap::new(),
                frozen: false,
            },
        );
        Ok(address)
    }

    /// Deploy `descriptor` and associate it with `alias` inside the open
    /// release for `version`. The last write per alias wins, which is what
    /// makes redeploy-on-failure retries safe.
    pub async fn set_implementation(
        &mut self,
        version: &str,
        descriptor: &ContractDescriptor,
        alias: &str,
    ) -> Result<Address> {
        let distribution = self.require_address()?;
        let ledger = self.ledger;
        let release = self.releases.get_mut(version).ok_or_else(|| Error::ReleaseNotFound {
            version: version.to_string(),
        })?;
        if release.frozen {
            return Err(Error::AlreadyFrozen {
                version: version.to_string(),
            });
        }

        let implementation = ledger
            .deploy_contract(descriptor)
            .await
            .map_err(|source| Error::ImplementationDeploy {
                alias: alias.to_string(),
                source,
            })?;
        ledger
            .call(
                distribution,
                "setImplementation",
                vec![json!(version), json!(alias), json!(implementation)],
            )
            .await
            .map_err(|source| Error::remote(format!("setImplementation {alias}"), source))?;

        tracing::info!(alias, version, %implementation, "Implementation registered");
        release.contracts.insert(alias.to_string(), implementation);
        Ok(implementation)
    }

    /// Mark the release for `version` immutable.
    pub async fn freeze(&mut self, version: &str) -> Result<()> {
        let distribution = self.require_address()?;
        let ledger = self.ledger;
        let release = self.releases.get_mut(version).ok_or_else(|| Error::ReleaseNotFound {
            version: version.to_string(),
        })?;
        if release.frozen {
            return Err(Error::AlreadyFrozen {
                version: version.to_string(),
            });
        }

        ledger
            .call(distribution, "freeze", vec![json!(version)])
            .await
            .map_err(|source| Error::remote(format!("freeze {version}"), source))?;

        tracing::info!(version, "Release frozen");
        release.frozen = true;
        Ok(())
    }

    /// Publish a frozen release into the kernel registry.
    pub async fn register_into(&self, kernel: Address, release: Address) -> Result<()> {
        self.ledger
            .call(kernel, "register", vec![json!(release)])
            .await
            .map_err(|source| Error::remote("kernel register", source))?;
        tracing::info!(%kernel, %release, "Release registered into kernel");
        Ok(())
    }

    pub fn release(&self, version: &str) -> Option<&Release> {
        self.releases.get(version)
    }
}
