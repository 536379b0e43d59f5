//! rollout-orchestrate - Versioned deployment and proxy upgrade core.
//!
//! This crate maintains the package/network data model describing contracts,
//! releases, and proxies, and runs the deployment and upgrade workflows that
//! keep the on-disk record consistent with what is live on each network. All
//! remote effects go through the [`ledger::Ledger`] trait; all durable
//! effects go through the [`store::StateStore`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod artifacts;
pub mod deployer;
pub mod distribution;
pub mod error;
pub mod ledger;
pub mod proxy;
pub mod state;
pub mod store;
pub mod upgrade;

pub use artifacts::{ArtifactDir, ArtifactMap, ArtifactSource, ContractDescriptor};
pub use deployer::Deployer;
pub use distribution::{DistributionManager, Release};
pub use error::{Error, Result};
pub use ledger::{Ledger, LedgerError, MemoryLedger, Receipt, RpcLedger};
pub use proxy::create_proxy;
pub use state::{AddressRef, NetworkState, PackageDefinition, ProxyRecord};
pub use store::{StateLock, StateStore};
pub use upgrade::{UpgradeRequest, UpgradedProxy, Upgrader};

/// A function invocation run on a proxy right after it is created
/// (initialization) or upgraded (migration).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub method: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Call {
    pub fn new(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}
