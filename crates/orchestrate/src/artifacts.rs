//! Contract artifact loading.
//!
//! Compilation is an external concern; the orchestrator only needs a way to
//! turn a contract type name into a deployable descriptor. [`ArtifactDir`]
//! reads truffle-style JSON artifacts from a build directory;
//! [`ArtifactMap`] serves descriptors registered in memory.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use alloy_core::primitives::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A deployable contract: its type name and creation bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDescriptor {
    pub name: String,
    pub bytecode: Bytes,
}

impl ContractDescriptor {
    pub fn new(name: impl Into<String>, bytecode: Bytes) -> Self {
        Self {
            name: name.into(),
            bytecode,
        }
    }
}

/// Source of contract descriptors, injected into the deployment
/// orchestrator.
pub trait ArtifactSource {
    fn load(&self, contract_name: &str) -> Result<ContractDescriptor>;
}

/// On-disk artifact as emitted by the build pipeline.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Artifact {
    contract_name: String,
    #[serde(default)]
    bytecode: Bytes,
}

/// Loads `<dir>/<ContractName>.json` artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactDir {
    dir: PathBuf,
}

impl ArtifactDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ArtifactSource for ArtifactDir {
    fn load(&self, contract_name: &str) -> Result<ContractDescriptor> {
        let path = self.dir.join(format!("{contract_name}.json"));
        if !path.exists() {
            return Err(Error::ArtifactNotFound {
                name: contract_name.to_string(),
                path,
            });
        }
        let content = fs::read_to_string(&path).map_err(|source| Error::Io {
            action: "read",
            path: path.clone(),
            source,
        })?;
        let artifact: Artifact =
            serde_json::from_str(&content).map_err(|source| Error::Malformed { path, source })?;
        Ok(ContractDescriptor::new(artifact.contract_name, artifact.bytecode))
    }
}

/// Descriptors registered in memory; used by tests and embedders that carry
/// bytecode compiled elsewhere.
#[derive(Debug, Clone, Default)]
pub struct ArtifactMap {
    descriptors: BTreeMap<String, ContractDescriptor>,
}

impl ArtifactMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor: ContractDescriptor) {
        self.descriptors.insert(descriptor.name.clone(), descriptor);
    }
}

impl ArtifactSource for ArtifactMap {
    fn load(&self, contract_name: &str) -> Result<ContractDescriptor> {
        self.descriptors
            .get(contract_name)
            .cloned()
            .ok_or_else(|| Error::ArtifactNotFound {
                name: contract_name.to_string(),
                path: PathBuf::from("<memory>"),
            })
    }
}
