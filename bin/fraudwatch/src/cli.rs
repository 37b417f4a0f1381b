use std::path::PathBuf;

use alloy_core::primitives::Address;
use clap::Parser;
use fraudwatch_deploy::{Checklist, ReportStyle, SignerSource};
use serde::Serialize;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "fraudwatch")]
#[command(
    author,
    version,
    about = "Deploy and verify the fraud detection contract"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "FRAUDWATCH_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a configuration file, or a directory containing `Fraudwatch.toml`.
    ///
    /// Environment variables prefixed with `FRAUDWATCH_` and the flags below take
    /// precedence over values from this file.
    #[arg(short, long, env = "FRAUDWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Hex-encoded private key of the deployer account.
    #[arg(
        long,
        env = "FRAUDWATCH_PRIVATE_KEY",
        hide_env_values = true,
        conflicts_with = "mnemonic"
    )]
    pub private_key: Option<String>,

    /// BIP-39 mnemonic of the deployer account.
    #[arg(long, env = "FRAUDWATCH_MNEMONIC", hide_env_values = true)]
    pub mnemonic: Option<String>,

    /// Derivation index of the deployer account within the mnemonic.
    #[arg(long, env = "FRAUDWATCH_MNEMONIC_INDEX", default_value_t = 0)]
    pub mnemonic_index: u32,

    /// The URL of the JSON-RPC endpoint of the target network.
    #[arg(long, alias = "rpc")]
    pub rpc_url: Option<String>,

    /// The name of the contract to deploy.
    #[arg(long)]
    pub contract: Option<String>,

    /// The directory holding compiled contract artifacts.
    #[arg(long)]
    pub artifacts_dir: Option<PathBuf>,

    /// The account granted the oracle role. Defaults to the deployer.
    #[arg(long, alias = "oracle")]
    pub oracle_address: Option<Address>,

    /// Explicit constructor arguments, replacing the oracle address.
    #[arg(long = "constructor-arg", value_name = "ARG")]
    pub constructor_args: Option<Vec<String>>,

    /// Checklists to run against the deployed contract.
    #[arg(long = "checklist", value_delimiter = ',')]
    pub checklists: Option<Vec<Checklist>>,

    /// The level of detail of the final report.
    #[arg(long)]
    pub report: Option<ReportStyle>,

    /// Seconds to wait for the deployment to be confirmed. `0` waits forever.
    #[arg(long, alias = "timeout")]
    pub timeout_secs: Option<u64>,

    /// Milliseconds between two receipt polls.
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Seconds to wait between confirmation and verification.
    #[arg(long)]
    pub grace_period_secs: Option<u64>,

    /// Print the resolved configuration as TOML and exit.
    #[arg(long)]
    pub dump_config: bool,
}

impl Cli {
    /// Where the deployer key comes from.
    pub fn signer_source(&self) -> anyhow::Result<SignerSource> {
        match (&self.private_key, &self.mnemonic) {
            (Some(key), _) => Ok(SignerSource::PrivateKey(key.clone())),
            (None, Some(phrase)) => Ok(SignerSource::Mnemonic {
                phrase: phrase.clone(),
                index: self.mnemonic_index,
            }),
            (None, None) => anyhow::bail!(
                "No deployer key provided: set --private-key (FRAUDWATCH_PRIVATE_KEY) or --mnemonic (FRAUDWATCH_MNEMONIC)"
            ),
        }
    }

    /// Configuration values set on the command line.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            rpc_url: self.rpc_url.clone(),
            contract: self.contract.clone(),
            artifacts_dir: self.artifacts_dir.clone(),
            oracle_address: self.oracle_address,
            constructor_args: self.constructor_args.clone(),
            checklists: self.checklists.clone(),
            report: self.report,
            confirmation: ConfirmationOverrides {
                poll_interval_ms: self.poll_interval_ms,
                timeout_secs: self.timeout_secs,
            },
            grace_period_secs: self.grace_period_secs,
        }
    }
}

/// Sparse mirror of `DeployConfig`: only flags that were passed are serialized.
#[derive(Debug, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    rpc_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    contract: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifacts_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    oracle_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    constructor_args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checklists: Option<Vec<Checklist>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<ReportStyle>,
    confirmation: ConfirmationOverrides,
    #[serde(skip_serializing_if = "Option::is_none")]
    grace_period_secs: Option<u64>,
}

#[derive(Debug, Default, Serialize)]
struct ConfirmationOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    poll_interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
}
