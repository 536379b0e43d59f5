//! Error taxonomy for the orchestrator.
//!
//! Usage errors are raised before any remote or persisted side effect, state
//! errors before any partial mutation of the on-disk record. Remote errors
//! wrap a [`LedgerError`] with enough context (alias, proxy address, step) to
//! resume manually.

use std::path::PathBuf;

use alloy_core::primitives::Address;
use thiserror::Error;

use crate::ledger::LedgerError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    // Usage errors.
    #[error("unknown contract alias `{alias}`")]
    UnknownAlias { alias: String },

    #[error("no proxy registered at address {address}")]
    ProxyNotFound { address: Address },

    #[error("upgrading every proxy on the network requires the explicit `all` flag")]
    MissingConfirmation,

    // State errors.
    #[error("package file not found at {}", .path.display())]
    MissingPackageFile { path: PathBuf },

    #[error("a package file already exists at {}", .path.display())]
    PackageExists { path: PathBuf },

    #[error("nothing deployed to network `{network}` yet")]
    NetworkNotFound { network: String },

    #[error("no implementation recorded for `{alias}` on this network")]
    ImplementationNotFound { alias: String },

    #[error("no proxy with index {index} registered for `{alias}`")]
    ProxyIndexNotFound { alias: String, index: usize },

    #[error("not connected to a distribution")]
    NoDistribution,

    #[error("network `{network}` has no active release endpoint")]
    NoActiveRelease { network: String },

    #[error("release {version} already exists and is frozen")]
    DuplicateVersion { version: String },

    #[error("release {version} is already frozen")]
    AlreadyFrozen { version: String },

    #[error("no open release for version {version}")]
    ReleaseNotFound { version: String },

    #[error("no artifact for contract `{name}` at {}", .path.display())]
    ArtifactNotFound { name: String, path: PathBuf },

    // Remote errors.
    #[error("failed to deploy implementation for `{alias}`")]
    ImplementationDeploy {
        alias: String,
        #[source]
        source: LedgerError,
    },

    #[error("failed to upgrade proxy {address} of `{alias}`")]
    UpgradeFailed {
        alias: String,
        address: Address,
        #[source]
        source: LedgerError,
    },

    /// Migration-after-swap failure: the implementation swap succeeded and is
    /// already recorded, only the migration call must be re-run.
    #[error(
        "migration `{method}` failed on proxy {address} of `{alias}` \
         (implementation swap is committed; re-run the migration only)"
    )]
    MigrationFailed {
        alias: String,
        address: Address,
        method: String,
        #[source]
        source: LedgerError,
    },

    #[error("ledger call failed during {step}")]
    Remote {
        step: String,
        #[source]
        source: LedgerError,
    },

    // Store errors.
    #[error("failed to {action} {}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record at {}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn remote(step: impl Into<String>, source: LedgerError) -> Self {
        Self::Remote {
            step: step.into(),
            source,
        }
    }
}
