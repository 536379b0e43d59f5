//! Configuration layer for the CLI.
//!
//! Defaults come from an optional `Rollout.toml` in the working directory,
//! overridden by `ROLLOUT_*` environment variables; explicit CLI flags win
//! over both.

use std::path::PathBuf;

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::Deserialize;

/// The default name for the rollout configuration file.
pub const CONFIG_FILENAME: &str = "Rollout.toml";

#[derive(Debug, Default, Deserialize)]
pub struct RolloutConfig {
    /// Package definition file name.
    pub package_file: Option<String>,
    /// Ledger relay endpoint.
    pub rpc_url: Option<String>,
    /// Compiled artifact directory.
    pub artifacts_dir: Option<PathBuf>,
}

pub fn load() -> Result<RolloutConfig, figment::Error> {
    Figment::new()
        .merge(Toml::file(CONFIG_FILENAME))
        .merge(Env::prefixed("ROLLOUT_"))
        .extract()
}
