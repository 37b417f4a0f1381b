//! Operator-facing summary of a deployment run.

use std::fmt::Write;

use alloy_core::primitives::{Address, U256, utils::format_ether};
use comfy_table::Table;
use serde::{Deserialize, Serialize};

use crate::{confirm::DeployedContract, verify::VerificationOutcome};

/// How much detail the final report carries.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ReportStyle {
    /// Address, check totals, failed checks and environment hints.
    Minimal,
    /// Everything, including a table of every check and service next steps.
    #[default]
    Verbose,
}

/// Artifacts of a completed run.
#[derive(Debug, Clone)]
pub struct DeploymentReport {
    pub rpc_url: String,
    pub deployer: Address,
    pub deployer_balance: Option<U256>,
    pub oracle: Address,
    pub contract: DeployedContract,
    pub outcome: VerificationOutcome,
}

/// Renders [`DeploymentReport`]s in a given [`ReportStyle`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    style: ReportStyle,
}

impl Reporter {
    pub fn new(style: ReportStyle) -> Self {
        Self { style }
    }

    /// Print the report to stdout.
    pub fn emit(&self, report: &DeploymentReport) {
        println!("{}", self.render(report));
    }

    pub fn render(&self, report: &DeploymentReport) -> String {
        // Writing into a String cannot fail.
        let mut out = String::new();
        let _ = match self.style {
            ReportStyle::Minimal => render_minimal(&mut out, report),
            ReportStyle::Verbose => render_verbose(&mut out, report),
        };
        out
    }
}

fn render_minimal(out: &mut String, report: &DeploymentReport) -> std::fmt::Result {
    let address = report.contract.address_hex();

    writeln!(out, "{} deployed to: {}", report.contract.contract_name, address)?;
    render_verification_summary(out, &report.outcome)?;

    for check in report.outcome.failed() {
        writeln!(
            out,
            "  [FAIL] {}: expected {}, got {}",
            check.name, check.expected, check.actual
        )?;
    }

    writeln!(out)?;
    writeln!(out, "=== Next steps ===")?;
    writeln!(out, "1. Copy the contract address: {}", address)?;
    writeln!(out, "2. Update your environment variables:")?;
    render_env_block(out, report)?;
    writeln!(out, "3. Fund the oracle account ({}) if it will submit assessments", report.oracle)?;
    writeln!(out, "4. Exercise the contract against the target network")?;

    Ok(())
}

fn render_verbose(out: &mut String, report: &DeploymentReport) -> std::fmt::Result {
    let contract = &report.contract;
    let address = contract.address_hex();

    writeln!(out, "=== Deployment ===")?;
    writeln!(out, "Contract:         {}", contract.contract_name)?;
    writeln!(out, "Address:          {}", address)?;
    writeln!(out, "Transaction:      {}", contract.tx_hash)?;
    if let Some(block) = contract.block_number {
        writeln!(out, "Block:            {}", block)?;
    }
    writeln!(out, "Gas used:         {}", contract.gas_used)?;
    writeln!(out, "Deployer:         {}", report.deployer)?;
    if let Some(balance) = report.deployer_balance {
        writeln!(out, "Deployer balance: {} ETH", format_ether(balance))?;
    }
    writeln!(out, "Oracle:           {}", report.oracle)?;
    writeln!(out, "RPC endpoint:     {}", report.rpc_url)?;
    writeln!(out)?;

    writeln!(out, "=== Verification ===")?;
    if !report.outcome.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Check", "Expected", "Actual", "Result"]);
        for check in report.outcome.iter() {
            table.add_row(vec![
                check.name.to_string(),
                check.expected.clone(),
                check.actual.clone(),
                status_label(check.passed).to_string(),
            ]);
        }
        writeln!(out, "{}", table)?;
    }
    render_verification_summary(out, &report.outcome)?;
    writeln!(out)?;

    writeln!(out, "=== Next steps ===")?;
    writeln!(out, "1. Point the oracle service at the contract:")?;
    render_env_block(out, report)?;
    writeln!(out, "2. Start the fraud scoring API server")?;
    writeln!(out, "3. Start the oracle service so it can publish assessments")?;
    writeln!(out, "4. Test the integration with real wallet addresses")?;

    Ok(())
}

fn render_verification_summary(out: &mut String, outcome: &VerificationOutcome) -> std::fmt::Result {
    if outcome.is_empty() {
        return writeln!(out, "Verification: no checks configured");
    }

    let status = if outcome.all_passed() { "PASSED" } else { "FAILED" };
    writeln!(
        out,
        "Verification {}: {}/{} checks passed",
        status,
        outcome.passed(),
        outcome.len()
    )
}

fn render_env_block(out: &mut String, report: &DeploymentReport) -> std::fmt::Result {
    writeln!(out, "   CONTRACT_ADDRESS={}", report.contract.address_hex())?;
    writeln!(out, "   RPC_URL={}", report.rpc_url)?;
    writeln!(out, "   PRIVATE_KEY=<oracle private key>")
}

fn status_label(passed: bool) -> &'static str {
    if passed { "[ok]" } else { "[FAIL]" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        testing::{CONTRACT_NAME, DEPLOYER, FakeSession, address},
        verify::{Baseline, Checklist, DEFAULT_PROBE_ADDRESS, Verifier},
    };

    async fn report(session: &FakeSession) -> DeploymentReport {
        let contract = DeployedContract {
            address: session.contract_address(),
            contract_name: CONTRACT_NAME.to_string(),
            tx_hash: session.tx_hash(),
            block_number: Some(7),
            gas_used: 1_234_567,
        };
        let baseline = Baseline {
            owner: address(DEPLOYER),
            oracle: address(DEPLOYER),
            probe_address: DEFAULT_PROBE_ADDRESS,
        };
        let outcome = Verifier::new(session, baseline)
            .run(&contract, &[Checklist::ContractInfo, Checklist::ReputationProbe])
            .await;

        DeploymentReport {
            rpc_url: "http://localhost:8545".to_string(),
            deployer: address(DEPLOYER),
            deployer_balance: Some(U256::from(10u64).pow(U256::from(18u64))),
            oracle: address(DEPLOYER),
            contract,
            outcome,
        }
    }

    #[test]
    fn test_style_parsing() {
        assert_eq!("minimal".parse::<ReportStyle>().unwrap(), ReportStyle::Minimal);
        assert_eq!(ReportStyle::default(), ReportStyle::Verbose);
        assert_eq!(ReportStyle::Verbose.to_string(), "verbose");
    }

    #[tokio::test]
    async fn test_minimal_report() {
        let session = FakeSession::new().with_fresh_contract(DEPLOYER, DEPLOYER);
        let report = report(&session).await;
        let rendered = Reporter::new(ReportStyle::Minimal).render(&report);

        let address = session.contract_address().to_checksum(None);
        assert!(rendered.contains(&format!("{} deployed to: {}", CONTRACT_NAME, address)));
        assert!(rendered.contains("Verification PASSED: 11/11 checks passed"));
        assert!(rendered.contains(&format!("CONTRACT_ADDRESS={}", address)));
        assert!(rendered.contains("RPC_URL=http://localhost:8545"));
        assert!(!rendered.contains("[FAIL]"));
        assert!(!rendered.contains("Gas used"));
    }

    #[tokio::test]
    async fn test_minimal_report_lists_failures() {
        let session = FakeSession::new();
        let report = report(&session).await;
        let rendered = Reporter::new(ReportStyle::Minimal).render(&report);

        assert!(rendered.contains("Verification FAILED: 0/11 checks passed"));
        assert!(rendered.contains("[FAIL] contract-info.owner"));
        assert!(rendered.contains("error:"));
    }

    #[tokio::test]
    async fn test_verbose_report() {
        let session = FakeSession::new().with_fresh_contract(DEPLOYER, DEPLOYER);
        let report = report(&session).await;
        let rendered = Reporter::new(ReportStyle::Verbose).render(&report);

        assert!(rendered.contains("=== Deployment ==="));
        assert!(rendered.contains(&format!("Transaction:      {}", session.tx_hash())));
        assert!(rendered.contains("Block:            7"));
        assert!(rendered.contains("Deployer balance: 1."));
        assert!(rendered.contains("fraud-assessment.overall-risk"));
        assert!(rendered.contains("Verification PASSED: 11/11 checks passed"));
        assert!(rendered.contains("Start the oracle service"));
    }
}
