//! Layered configuration for a deployment run.
//!
//! Values are resolved from, in increasing priority: built-in defaults, an optional
//! TOML file, `FRAUDWATCH_*` environment variables (nested keys separated by `__`,
//! e.g. `FRAUDWATCH_CONFIRMATION__TIMEOUT_SECS`) and caller supplied overrides.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::{
    confirm::{ConfirmationWaiter, DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_POLL_INTERVAL},
    factory::DeploymentRequest,
    interface::FRAUD_DETECTION_CONTRACT,
    report::ReportStyle,
    verify::{Baseline, Checklist, DEFAULT_PROBE_ADDRESS},
};

/// The default name of the configuration file when a directory is given.
pub const CONFIG_FILENAME: &str = "Fraudwatch.toml";

/// Prefix of the environment variables read into [`DeployConfig`].
pub const ENV_PREFIX: &str = "FRAUDWATCH_";

/// Environment keys under [`ENV_PREFIX`] that belong to the CLI, not the config.
const CLI_ONLY_ENV_KEYS: &[&str] = &["private_key", "mnemonic", "mnemonic_index", "config", "verbosity"];

/// Receipt polling behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Interval between receipt polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Upper bound on the wait for finality, in seconds. `0` waits forever.
    pub timeout_secs: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT.as_secs(),
        }
    }
}

/// Deployment configuration, serializable to and from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// JSON-RPC endpoint of the target network.
    pub rpc_url: String,
    /// Name of the contract to deploy.
    pub contract: String,
    /// Directory holding compiled contract artifacts.
    pub artifacts_dir: PathBuf,
    /// Account granted the oracle role. Defaults to the deployer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oracle_address: Option<Address>,
    /// Explicit constructor arguments, replacing the default `[oracle_address]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constructor_args: Option<Vec<String>>,
    /// Checklists run against the deployed contract, in order.
    pub checklists: Vec<Checklist>,
    /// Address used to probe default reputation state.
    pub probe_address: Address,
    /// Detail level of the final report.
    pub report: ReportStyle,
    /// Pause between confirmation and verification, for networks with lagging reads.
    pub grace_period_secs: u64,
    /// Receipt polling behaviour.
    pub confirmation: ConfirmationConfig,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            contract: FRAUD_DETECTION_CONTRACT.to_string(),
            artifacts_dir: PathBuf::from("artifacts"),
            oracle_address: None,
            constructor_args: None,
            checklists: vec![Checklist::ContractInfo, Checklist::ReputationProbe],
            probe_address: DEFAULT_PROBE_ADDRESS,
            report: ReportStyle::default(),
            grace_period_secs: 0,
            confirmation: ConfirmationConfig::default(),
        }
    }
}

impl DeployConfig {
    /// Load the configuration from defaults, an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_overrides(path, &Overrides::default())
    }

    /// Like [`DeployConfig::load`], with `overrides` taking precedence over every other source.
    ///
    /// # Arguments
    /// * `path` - Optional config file, or a directory holding [`CONFIG_FILENAME`]
    /// * `overrides` - Highest priority values; unset fields should be skipped when serialized
    ///
    /// # Returns
    /// The merged configuration, or an error if the file is missing or a value has the wrong shape.
    pub fn load_with_overrides<T: Serialize>(path: Option<&Path>, overrides: &T) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            let config_path = resolve_config_path(path)?;
            tracing::debug!(path = %config_path.display(), "Reading configuration file");
            figment = figment.merge(Toml::file_exact(config_path));
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__").ignore(CLI_ONLY_ENV_KEYS))
            .merge(Serialized::defaults(overrides))
            .extract()
            .context("Failed to resolve deployment configuration")?;

        tracing::debug!(config = ?config, "Configuration loaded");
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Freeze the configuration for a single run by `deployer`.
    pub fn run_config(&self, deployer: Address) -> RunConfig {
        let oracle = self.oracle_address.unwrap_or(deployer);
        let constructor_args = self
            .constructor_args
            .clone()
            .unwrap_or_else(|| vec![oracle.to_string()]);

        RunConfig {
            rpc_url: self.rpc_url.clone(),
            contract_name: self.contract.clone(),
            deployer,
            oracle,
            constructor_args,
            checklists: self.checklists.clone(),
            probe_address: self.probe_address,
            poll_interval: Duration::from_millis(self.confirmation.poll_interval_ms),
            confirmation_timeout: (self.confirmation.timeout_secs > 0)
                .then(|| Duration::from_secs(self.confirmation.timeout_secs)),
            grace_period: Duration::from_secs(self.grace_period_secs),
        }
    }
}

/// Empty override set.
#[derive(Debug, Default, Serialize)]
struct Overrides {}

/// Accept either a config file or a directory containing [`CONFIG_FILENAME`].
fn resolve_config_path(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        anyhow::bail!("Configuration file or directory not found: {}", path.display());
    }

    Ok(if path.is_dir() {
        path.join(CONFIG_FILENAME)
    } else {
        path.to_path_buf()
    })
}

/// Immutable settings of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub rpc_url: String,
    pub contract_name: String,
    pub deployer: Address,
    pub oracle: Address,
    pub constructor_args: Vec<String>,
    pub checklists: Vec<Checklist>,
    pub probe_address: Address,
    pub poll_interval: Duration,
    pub confirmation_timeout: Option<Duration>,
    pub grace_period: Duration,
}

impl RunConfig {
    pub fn request(&self) -> DeploymentRequest {
        DeploymentRequest::new(&self.contract_name, self.constructor_args.clone())
    }

    pub fn baseline(&self) -> Baseline {
        Baseline {
            owner: self.deployer,
            oracle: self.oracle,
            probe_address: self.probe_address,
        }
    }

    pub fn waiter(&self) -> ConfirmationWaiter {
        ConfirmationWaiter::new(self.poll_interval, self.confirmation_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DEPLOYER, ORACLE, address};
    use figment::Jail;

    #[derive(Serialize)]
    struct RpcOverride {
        rpc_url: &'static str,
    }

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_jail| {
            let config = DeployConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config, DeployConfig::default());
            assert_eq!(config.contract, "FraudDetectionContractV2");
            assert_eq!(config.grace_period_secs, 0);
            Ok(())
        });
    }

    #[test]
    fn test_file_env_and_override_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILENAME,
                r#"
                rpc_url = "https://sepolia.example.org"
                oracle_address = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
                checklists = ["roles", "reputation-probe"]
                report = "minimal"
                grace_period_secs = 10

                [confirmation]
                poll_interval_ms = 500
                "#,
            )?;
            jail.set_env("FRAUDWATCH_CONFIRMATION__TIMEOUT_SECS", "0");
            jail.set_env("FRAUDWATCH_CONTRACT", "FraudDetectionContractV3");
            jail.set_env("FRAUDWATCH_PRIVATE_KEY", "0xdeadbeef");

            let config = DeployConfig::load_with_overrides(
                Some(Path::new(".")),
                &RpcOverride {
                    rpc_url: "http://127.0.0.1:8545",
                },
            )
            .map_err(|e| e.to_string())?;

            assert_eq!(config.rpc_url, "http://127.0.0.1:8545");
            assert_eq!(config.contract, "FraudDetectionContractV3");
            assert_eq!(config.oracle_address, Some(address(ORACLE)));
            assert_eq!(config.checklists, vec![Checklist::Roles, Checklist::ReputationProbe]);
            assert_eq!(config.report, ReportStyle::Minimal);
            assert_eq!(config.grace_period_secs, 10);
            assert_eq!(config.confirmation.poll_interval_ms, 500);
            assert_eq!(config.confirmation.timeout_secs, 0);
            Ok(())
        });
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        Jail::expect_with(|_jail| {
            assert!(DeployConfig::load(Some(Path::new("missing.toml"))).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_toml_roundtrip_of_defaults() {
        let rendered = DeployConfig::default().to_toml().unwrap();
        assert!(rendered.contains("rpc_url = \"http://localhost:8545\""));
        assert!(!rendered.contains("oracle_address"));
        let parsed: DeployConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, DeployConfig::default());
    }

    #[test]
    fn test_run_config_defaults_oracle_to_deployer() {
        let run = DeployConfig::default().run_config(address(DEPLOYER));

        assert_eq!(run.oracle, address(DEPLOYER));
        assert_eq!(run.constructor_args, vec![address(DEPLOYER).to_string()]);
        assert_eq!(run.confirmation_timeout, Some(DEFAULT_CONFIRMATION_TIMEOUT));
        assert_eq!(run.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(run.grace_period, Duration::ZERO);

        let baseline = run.baseline();
        assert_eq!(baseline.owner, address(DEPLOYER));
        assert_eq!(baseline.oracle, address(DEPLOYER));
        assert_eq!(baseline.probe_address, DEFAULT_PROBE_ADDRESS);
    }

    #[test]
    fn test_run_config_with_explicit_oracle_and_no_timeout() {
        let config = DeployConfig {
            oracle_address: Some(address(ORACLE)),
            confirmation: ConfirmationConfig {
                poll_interval_ms: 100,
                timeout_secs: 0,
            },
            ..DeployConfig::default()
        };
        let run = config.run_config(address(DEPLOYER));

        assert_eq!(run.oracle, address(ORACLE));
        assert_eq!(run.request().constructor_args, vec![address(ORACLE).to_string()]);
        assert_eq!(run.confirmation_timeout, None);
        assert_eq!(run.poll_interval, Duration::from_millis(100));
    }
}
