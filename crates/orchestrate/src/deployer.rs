//! Deployment orchestrator.
//!
//! Publishes one version of a package to one network: resolve or create the
//! distribution, open a release, deploy every aliased implementation into
//! it, freeze, register into the kernel, persist. Each step is gated on the
//! previous one succeeding; this workflow is the only path that creates new
//! implementations.

use crate::artifacts::ArtifactSource;
use crate::distribution::DistributionManager;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::state::NetworkState;
use crate::store::StateStore;

/// Runs the publish workflow for one network.
#[derive(Debug)]
pub struct Deployer<'a, L, A> {
    store: &'a StateStore,
    ledger: &'a L,
    artifacts: &'a A,
    network: String,
}

impl<'a, L: Ledger, A: ArtifactSource> Deployer<'a, L, A> {
    pub fn new(store: &'a StateStore, ledger: &'a L, artifacts: &'a A, network: impl Into<String>) -> Self {
        Self {
            store,
            ledger,
            artifacts,
            network: network.into(),
        }
    }

    /// Publish `version` and return the resulting network state.
    ///
    /// A failure before the final save leaves the persisted record
    /// untouched, except the first-run distribution checkpoint: the network
    /// file is created as soon as the distribution exists, so a retry
    /// connects instead of deploying a second distribution.
    pub async fn deploy(&self, version: &str) -> Result<NetworkState> {
        let _lock = self.store.lock(&self.network)?;
        let package = self.store.load_package()?;
        let mut distribution = DistributionManager::new(self.ledger);

        // 1. Resolve or create the distribution for this network.
        let mut state = match self.store.try_load_network(&self.network)? {
            Some(state) => {
                tracing::info!(network = %self.network, "Reading network record...");
                distribution.connect(state.distribution.address);
                state
            }
            None => {
                tracing::info!(
                    network = %self.network,
                    "No network record found, deploying new distribution..."
                );
                let address = distribution.deploy().await?;
                let state = NetworkState::new(address);
                // Durable checkpoint: a failed run resumes by connecting.
                self.store.save_network(&self.network, &state)?;
                state
            }
        };

        // 2. Open a release for the requested version.
        tracing::info!(version, "Creating release...");
        let release_address = distribution.new_version(version).await?;

        // 3. Deploy every aliased implementation into the release.
        for (alias, contract_type) in &package.contracts {
            tracing::info!(alias = %alias, contract = %contract_type, "Deploying implementation...");
            let descriptor = self.artifacts.load(contract_type)?;
            let implementation = distribution
                .set_implementation(version, &descriptor, alias)
                .await?;
            state.contracts.insert(alias.clone(), implementation.into());
        }

        // 4. Freeze the release.
        tracing::info!(version, "Freezing release...");
        distribution.freeze(version).await?;

        // 5. Register it into the package's kernel.
        match package.kernel {
            Some(kernel) => {
                tracing::info!(kernel = %kernel.address, "Registering release into kernel...");
                distribution.register_into(kernel.address, release_address).await?;
            }
            None => {
                tracing::warn!("Package has no kernel configured, skipping registration");
            }
        }

        // 6. Persist the updated record.
        state.provider = Some(release_address.into());
        self.store.save_network(&self.network, &state)?;
        tracing::info!(network = %self.network, version, "Deployment complete");
        Ok(state)
    }
}
