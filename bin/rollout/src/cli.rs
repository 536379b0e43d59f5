use std::path::PathBuf;

use alloy_core::primitives::Address;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use tracing::level_filters::LevelFilter;
use url::Url;

/// Output format for the status command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Parser)]
#[command(name = "rollout")]
#[command(
    author,
    version,
    about = "Manage versioned contract deployments and roll proxies forward across networks"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "ROLLOUT_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// The package definition file.
    ///
    /// Network records are written next to it as `<stem>.<network>.json`.
    #[arg(long, env = "ROLLOUT_PACKAGE_FILE")]
    pub package_file: Option<String>,

    /// URL of the ledger relay endpoint used for all remote operations.
    #[arg(long, env = "ROLLOUT_RPC_URL")]
    pub rpc_url: Option<Url>,

    /// Directory holding compiled contract artifacts (`<Name>.json`).
    #[arg(long, env = "ROLLOUT_ARTIFACTS_DIR")]
    pub artifacts_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone)]
pub enum Command {
    /// Create a new package definition in the current directory.
    Init {
        /// The package name.
        name: String,

        /// The initial version.
        #[arg(long, default_value = "0.1.0")]
        version: String,

        /// Kernel registry to publish releases into.
        #[arg(long)]
        kernel: Option<Address>,
    },

    /// Register a contract implementation under an alias.
    Add {
        /// Stable logical name for the contract role.
        #[arg(long)]
        alias: String,

        /// Contract type name resolved through the artifacts directory.
        #[arg(long)]
        contract: String,
    },

    /// Move the package to a new current version.
    NewVersion {
        /// The version the next deploy publishes.
        version: String,
    },

    /// Publish the package's current version to a network.
    Deploy {
        /// Target network name.
        #[arg(short, long, env = "ROLLOUT_NETWORK")]
        network: String,
    },

    /// Create a new proxy for a contract alias.
    CreateProxy {
        /// Target network name.
        #[arg(short, long, env = "ROLLOUT_NETWORK")]
        network: String,

        /// Alias to create the proxy for.
        #[arg(long)]
        alias: String,

        /// Initialization function to invoke on the new proxy.
        #[arg(long)]
        init: Option<String>,

        /// Arguments for the initialization function (JSON literals; bare
        /// words are passed as strings). Repeat per argument.
        #[arg(long = "args", value_name = "ARG")]
        args: Vec<String>,
    },

    /// Upgrade proxies to the package's current version.
    Upgrade {
        /// Target network name.
        #[arg(short, long, env = "ROLLOUT_NETWORK")]
        network: String,

        /// Upgrade every proxy registered under this alias.
        #[arg(long)]
        alias: Option<String>,

        /// Upgrade exactly the proxy at this address.
        #[arg(long)]
        address: Option<Address>,

        /// Upgrade every proxy across every alias. Required for an unscoped
        /// upgrade; there is no default.
        #[arg(long)]
        all: bool,

        /// Migration function to invoke on each proxy after its swap.
        #[arg(long)]
        method: Option<String>,

        /// Arguments for the migration function (JSON literals; bare words
        /// are passed as strings). Repeat per argument.
        #[arg(long = "args", value_name = "ARG")]
        args: Vec<String>,
    },

    /// Show deployed contracts and proxies for a network.
    Status {
        /// Target network name.
        #[arg(short, long, env = "ROLLOUT_NETWORK")]
        network: String,

        /// Output format.
        #[arg(long, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Generate shell completions.
    Completions {
        /// The shell to generate completions for.
        shell: Shell,
    },
}
