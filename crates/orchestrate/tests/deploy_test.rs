//! End-to-end deployment scenarios: publishing versions, the first-run
//! distribution checkpoint, kernel registration, and failure atomicity.

use alloy_core::primitives::{Address, Bytes};
use anyhow::Result;
use tempdir::TempDir;

use rollout_orchestrate::{
    ArtifactMap, ContractDescriptor, Deployer, Error, MemoryLedger, PackageDefinition, StateStore,
};

const NETWORK: &str = "test";

fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init()
        .ok();
}

fn artifacts(names: &[&str]) -> ArtifactMap {
    let mut map = ArtifactMap::new();
    for name in names {
        map.insert(ContractDescriptor::new(*name, Bytes::new()));
    }
    map
}

fn scaffold(kernel: Option<Address>) -> Result<(TempDir, StateStore, MemoryLedger)> {
    init_test_tracing();
    let dir = TempDir::new("rollout-deploy")?;
    let store = StateStore::new(dir.path());

    let mut package = PackageDefinition::new("MyApp", "0.1.0");
    package.add_contract("Impl", "ImplV1");
    package.add_contract("AnotherImpl", "AnotherImplV1");
    package.kernel = kernel.map(Into::into);
    store.save_package(&package)?;

    Ok((dir, store, MemoryLedger::new()))
}

#[tokio::test]
async fn first_deploy_creates_the_network_record() -> Result<()> {
    let (_dir, store, ledger) = scaffold(None)?;
    let artifacts = artifacts(&["ImplV1", "AnotherImplV1"]);

    let state = Deployer::new(&store, &ledger, &artifacts, NETWORK)
        .deploy("0.1.0")
        .await?;

    assert_eq!(store.load_network(NETWORK)?, state);
    assert!(state.provider.is_some());
    assert!(state.implementation("Impl").is_some());
    assert!(state.implementation("AnotherImpl").is_some());
    assert!(state.proxies.is_empty());

    let distributions: Vec<_> = ledger
        .deployed()
        .into_iter()
        .filter(|(name, _)| name == "Distribution")
        .collect();
    assert_eq!(distributions.len(), 1);
    assert_eq!(state.distribution.address, distributions[0].1);
    Ok(())
}

#[tokio::test]
async fn second_version_reuses_the_distribution() -> Result<()> {
    let (_dir, store, ledger) = scaffold(None)?;
    let artifacts = artifacts(&["ImplV1", "AnotherImplV1", "ImplV2", "AnotherImplV2"]);

    let first = Deployer::new(&store, &ledger, &artifacts, NETWORK)
        .deploy("0.1.0")
        .await?;

    let mut package = store.load_package()?;
    package.set_version("0.2.0");
    package.add_contract("Impl", "ImplV2");
    package.add_contract("AnotherImpl", "AnotherImplV2");
    store.save_package(&package)?;

    let second = Deployer::new(&store, &ledger, &artifacts, NETWORK)
        .deploy("0.2.0")
        .await?;

    assert_eq!(second.distribution, first.distribution);
    assert_ne!(second.provider, first.provider);
    assert_ne!(second.implementation("Impl"), first.implementation("Impl"));

    let distribution_count = ledger
        .deployed()
        .into_iter()
        .filter(|(name, _)| name == "Distribution")
        .count();
    assert_eq!(distribution_count, 1);
    Ok(())
}

#[tokio::test]
async fn registers_the_release_into_a_configured_kernel() -> Result<()> {
    let kernel = Address::repeat_byte(0xAB);
    let (_dir, store, ledger) = scaffold(Some(kernel))?;
    let artifacts = artifacts(&["ImplV1", "AnotherImplV1"]);

    let state = Deployer::new(&store, &ledger, &artifacts, NETWORK)
        .deploy("0.1.0")
        .await?;

    let registrations = ledger.calls_on(kernel);
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0].method, "register");
    assert_eq!(
        registrations[0].args,
        vec![serde_json::json!(state.provider.unwrap().address)]
    );
    Ok(())
}

#[tokio::test]
async fn deploy_without_a_package_file_fails() -> Result<()> {
    init_test_tracing();
    let dir = TempDir::new("rollout-deploy")?;
    let store = StateStore::new(dir.path());
    let ledger = MemoryLedger::new();
    let artifacts = artifacts(&[]);

    let result = Deployer::new(&store, &ledger, &artifacts, NETWORK)
        .deploy("0.1.0")
        .await;
    assert!(matches!(result, Err(Error::MissingPackageFile { .. })));
    Ok(())
}

#[tokio::test]
async fn failed_publish_leaves_the_record_unchanged() -> Result<()> {
    let (_dir, store, ledger) = scaffold(None)?;
    // ImplV2 is deliberately missing from the artifact set.
    let artifacts = artifacts(&["ImplV1", "AnotherImplV1", "AnotherImplV2"]);

    Deployer::new(&store, &ledger, &artifacts, NETWORK)
        .deploy("0.1.0")
        .await?;
    let before = store.load_network(NETWORK)?;

    let mut package = store.load_package()?;
    package.set_version("0.2.0");
    package.add_contract("Impl", "ImplV2");
    package.add_contract("AnotherImpl", "AnotherImplV2");
    store.save_package(&package)?;

    let result = Deployer::new(&store, &ledger, &artifacts, NETWORK)
        .deploy("0.2.0")
        .await;
    assert!(matches!(result, Err(Error::ArtifactNotFound { .. })));

    // Nothing was persisted by the failed run.
    assert_eq!(store.load_network(NETWORK)?, before);
    Ok(())
}

#[tokio::test]
async fn interrupted_first_deploy_resumes_from_the_distribution_checkpoint() -> Result<()> {
    let (_dir, store, ledger) = scaffold(None)?;
    let artifacts = artifacts(&["ImplV1", "AnotherImplV1"]);

    ledger.fail_method("newVersion");
    let result = Deployer::new(&store, &ledger, &artifacts, NETWORK)
        .deploy("0.1.0")
        .await;
    assert!(matches!(result, Err(Error::Remote { .. })));

    // The distribution checkpoint is durable even though the publish failed.
    let checkpoint = store.load_network(NETWORK)?;
    assert!(checkpoint.provider.is_none());
    assert!(checkpoint.contracts.is_empty());

    // The retry connects to the recorded distribution instead of deploying
    // another one.
    ledger.clear_failures();
    let state = Deployer::new(&store, &ledger, &artifacts, NETWORK)
        .deploy("0.1.0")
        .await?;
    assert_eq!(state.distribution, checkpoint.distribution);

    let distribution_count = ledger
        .deployed()
        .into_iter()
        .filter(|(name, _)| name == "Distribution")
        .count();
    assert_eq!(distribution_count, 1);
    Ok(())
}
