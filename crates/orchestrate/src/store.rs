//! File-backed persistence for package and network records.
//!
//! Records are pretty-printed JSON. Saves replace the whole record atomically
//! (write to a temp file in the same directory, then rename) so a crash
//! mid-write can never leave a torn record on disk. A missing network file is
//! a recoverable "first deploy to this network" condition; a missing package
//! file is not.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::state::{NetworkState, PackageDefinition};

/// Default file name for the package definition.
pub const DEFAULT_PACKAGE_FILE: &str = "rollout.json";

/// Store rooted at a project directory. Network records live next to the
/// package file as `<stem>.<network>.json`.
#[derive(Debug, Clone)]
pub struct StateStore {
    root: PathBuf,
    package_file: String,
}

impl StateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_package_file(root, DEFAULT_PACKAGE_FILE)
    }

    pub fn with_package_file(root: impl Into<PathBuf>, package_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            package_file: package_file.into(),
        }
    }

    pub fn package_path(&self) -> PathBuf {
        self.root.join(&self.package_file)
    }

    pub fn network_path(&self, network: &str) -> PathBuf {
        let stem = self.package_file.strip_suffix(".json").unwrap_or(&self.package_file);
        self.root.join(format!("{stem}.{network}.json"))
    }

    pub fn package_exists(&self) -> bool {
        self.package_path().exists()
    }

    pub fn network_exists(&self, network: &str) -> bool {
        self.network_path(network).exists()
    }

    pub fn load_package(&self) -> Result<PackageDefinition> {
        let path = self.package_path();
        if !path.exists() {
            return Err(Error::MissingPackageFile { path });
        }
        read_record(&path)
    }

    pub fn save_package(&self, package: &PackageDefinition) -> Result<()> {
        write_record(&self.package_path(), package)
    }

    /// Create the package file for a fresh project; refuses to clobber an
    /// existing one.
    pub fn init_package(&self, package: &PackageDefinition) -> Result<()> {
        let path = self.package_path();
        if path.exists() {
            return Err(Error::PackageExists { path });
        }
        self.save_package(package)
    }

    /// `Ok(None)` when nothing has been deployed to the network yet.
    pub fn try_load_network(&self, network: &str) -> Result<Option<NetworkState>> {
        let path = self.network_path(network);
        if !path.exists() {
            return Ok(None);
        }
        read_record(&path).map(Some)
    }

    pub fn load_network(&self, network: &str) -> Result<NetworkState> {
        self.try_load_network(network)?.ok_or_else(|| Error::NetworkNotFound {
            network: network.to_string(),
        })
    }

    pub fn save_network(&self, network: &str, state: &NetworkState) -> Result<()> {
        write_record(&self.network_path(network), state)
    }

    /// Take the advisory lock serializing orchestrator runs against one
    /// network. Blocks until the lock is available; released on drop.
    pub fn lock(&self, network: &str) -> Result<StateLock> {
        let path = self.root.join(format!(".rollout.{network}.lock"));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|source| Error::Io {
                action: "open lock file",
                path: path.clone(),
                source,
            })?;
        file.lock_exclusive().map_err(|source| Error::Io {
            action: "lock",
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Acquired network state lock");
        Ok(StateLock { file, path })
    }
}

/// Exclusive hold on a network's state; dropped when the operation finishes.
#[derive(Debug)]
pub struct StateLock {
    file: File,
    path: PathBuf,
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = fs2::FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to release state lock");
        }
    }
}

fn read_record<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        action: "read",
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| Error::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

fn write_record<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut content = serde_json::to_string_pretty(record).map_err(|source| Error::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    content.push('\n');

    // Whole-record replace: stage next to the target so the rename stays on
    // one filesystem.
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).map_err(|source| Error::Io {
        action: "write",
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| Error::Io {
        action: "rename into place",
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "Record saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::Address;
    use tempdir::TempDir;

    use super::*;
    use crate::state::ProxyRecord;

    fn store() -> (TempDir, StateStore) {
        let dir = TempDir::new("rollout-store").unwrap();
        let store = StateStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn missing_package_file_is_an_error() {
        let (_dir, store) = store();
        assert!(matches!(
            store.load_package(),
            Err(Error::MissingPackageFile { .. })
        ));
    }

    #[test]
    fn missing_network_file_is_recoverable() {
        let (_dir, store) = store();
        assert!(store.try_load_network("test").unwrap().is_none());
        assert!(matches!(
            store.load_network("test"),
            Err(Error::NetworkNotFound { .. })
        ));
    }

    #[test]
    fn package_round_trip() {
        let (_dir, store) = store();
        let mut package = PackageDefinition::new("MyApp", "0.1.0");
        package.add_contract("Impl", "ImplV1");
        store.save_package(&package).unwrap();

        assert_eq!(store.load_package().unwrap(), package);
    }

    #[test]
    fn init_refuses_to_clobber_an_existing_package() {
        let (_dir, store) = store();
        let package = PackageDefinition::new("MyApp", "0.1.0");
        store.init_package(&package).unwrap();
        assert!(matches!(
            store.init_package(&package),
            Err(Error::PackageExists { .. })
        ));
    }

    #[test]
    fn network_record_round_trip_and_naming() {
        let (dir, store) = store();
        let mut state = NetworkState::new(Address::repeat_byte(1));
        state.contracts.insert("Impl".into(), Address::repeat_byte(2).into());
        state.append_proxy(
            "Impl",
            ProxyRecord {
                address: Address::repeat_byte(3),
                version: "0.1.0".into(),
                implementation: Address::repeat_byte(2),
            },
        );
        store.save_network("test", &state).unwrap();

        assert!(dir.path().join("rollout.test.json").exists());
        assert_eq!(store.load_network("test").unwrap(), state);
    }

    #[test]
    fn save_leaves_no_staging_file_behind() {
        let (dir, store) = store();
        store.save_package(&PackageDefinition::new("MyApp", "0.1.0")).unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn lock_is_exclusive_per_network() {
        let (_dir, store) = store();
        let first = store.lock("test").unwrap();
        // A different network is unaffected.
        let _other = store.lock("staging").unwrap();
        drop(first);
        let _again = store.lock("test").unwrap();
    }
}
