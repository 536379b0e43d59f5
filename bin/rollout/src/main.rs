//! rollout is a CLI tool for publishing versioned contract releases and
//! rolling proxies forward to them, one network at a time.

mod cli;
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use clap::{CommandFactory, Parser};
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;
use serde_json::Value;
use url::Url;

use cli::{Cli, Command, OutputFormat};
use config::RolloutConfig;
use rollout_orchestrate::store::DEFAULT_PACKAGE_FILE;
use rollout_orchestrate::{
    ArtifactDir, Call, Deployer, PackageDefinition, RpcLedger, StateStore, UpgradeRequest,
    Upgrader, create_proxy,
};

/// Default artifact directory, matching the usual build pipeline output.
const DEFAULT_ARTIFACTS_DIR: &str = "build/contracts";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let config = config::load().context("Failed to load configuration")?;

    let package_file = cli
        .package_file
        .clone()
        .or_else(|| config.package_file.clone())
        .unwrap_or_else(|| DEFAULT_PACKAGE_FILE.to_string());
    let store = StateStore::with_package_file(".", package_file);

    match cli.command.clone() {
        Command::Init { name, version, kernel } => {
            let mut package = PackageDefinition::new(&name, &version);
            package.kernel = kernel.map(Into::into);
            store.init_package(&package)?;
            tracing::info!(name, version, "Package initialized");
        }

        Command::Add { alias, contract } => {
            let mut package = store.load_package()?;
            package.add_contract(&alias, &contract);
            store.save_package(&package)?;
            tracing::info!(alias, contract, "Implementation registered");
        }

        Command::NewVersion { version } => {
            let mut package = store.load_package()?;
            if package.version == version {
                tracing::warn!(version, "Package is already at this version");
            }
            package.set_version(&version);
            store.save_package(&package)?;
            tracing::info!(version, "Package moved to new version");
        }

        Command::Deploy { network } => {
            let ledger = ledger(&cli, &config)?;
            let artifacts = ArtifactDir::new(artifacts_dir(&cli, &config));
            let package = store.load_package()?;

            let state = Deployer::new(&store, &ledger, &artifacts, network.as_str())
                .deploy(&package.version)
                .await?;
            tracing::info!(
                network,
                version = package.version,
                contracts = state.contracts.len(),
                "Deployment complete"
            );
        }

        Command::CreateProxy { network, alias, init, args } => {
            ensure!(init.is_some() || args.is_empty(), "--args requires --init");
            let ledger = ledger(&cli, &config)?;
            let init = init.map(|method| Call::new(method, parse_call_args(&args)));

            let record = create_proxy(&store, &ledger, &network, &alias, init.as_ref()).await?;
            tracing::info!(
                alias,
                address = %record.address,
                version = record.version,
                "Proxy created"
            );
        }

        Command::Upgrade { network, alias, address, all, method, args } => {
            ensure!(method.is_some() || args.is_empty(), "--args requires --method");
            let ledger = ledger(&cli, &config)?;
            let request = UpgradeRequest {
                contract_alias: alias,
                proxy_address: address,
                all,
                migration: method.map(|m| Call::new(m, parse_call_args(&args))),
            };

            let upgraded = Upgrader::new(&store, &ledger, network.as_str())
                .upgrade(&request)
                .await?;
            for proxy in &upgraded {
                tracing::info!(
                    alias = proxy.alias,
                    address = %proxy.address,
                    version = proxy.version,
                    implementation = %proxy.implementation,
                    "Proxy upgraded"
                );
            }
            tracing::info!(count = upgraded.len(), network, "Upgrade complete");
        }

        Command::Status { network, format } => {
            let state = store.load_network(&network)?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&state)?);
                }
                OutputFormat::Table => {
                    println!("Distribution: {}", state.distribution.address);
                    if let Some(provider) = state.provider {
                        println!("Provider:     {}", provider.address);
                    }

                    let mut table = Table::new();
                    table
                        .load_preset(UTF8_FULL)
                        .set_header(vec!["Alias", "#", "Proxy", "Version", "Implementation"]);
                    for (alias, proxies) in &state.proxies {
                        for (index, proxy) in proxies.iter().enumerate() {
                            table.add_row(vec![
                                alias.clone(),
                                index.to_string(),
                                proxy.address.to_string(),
                                proxy.version.clone(),
                                proxy.implementation.to_string(),
                            ]);
                        }
                    }
                    println!("{table}");
                }
            }
        }

        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "rollout", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Build the ledger client from flags, environment, or `Rollout.toml`.
fn ledger(cli: &Cli, config: &RolloutConfig) -> Result<RpcLedger> {
    let url = match (&cli.rpc_url, &config.rpc_url) {
        (Some(url), _) => url.clone(),
        (None, Some(raw)) => Url::parse(raw).context("Invalid rpc_url in configuration")?,
        (None, None) => anyhow::bail!(
            "no ledger endpoint configured; pass --rpc-url, set ROLLOUT_RPC_URL, \
             or add rpc_url to Rollout.toml"
        ),
    };
    RpcLedger::new(url).context("Failed to create ledger client")
}

fn artifacts_dir(cli: &Cli, config: &RolloutConfig) -> PathBuf {
    cli.artifacts_dir
        .clone()
        .or_else(|| config.artifacts_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACTS_DIR))
}

/// Parse call arguments: JSON literals pass through, bare words become
/// strings.
fn parse_call_args(raw: &[String]) -> Vec<Value> {
    raw.iter()
        .map(|arg| serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.clone())))
        .collect()
}
