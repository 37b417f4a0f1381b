//! Post-deployment verifier.
//!
//! Runs fixed checklists of read-only calls against a freshly deployed contract and
//! compares each returned value with the baseline a new instance must expose. A
//! failing check, whether a value mismatch or an erroring call, is recorded and the
//! remaining checks still run.

use std::fmt::Display;

use alloy_core::{
    primitives::{Address, I256, U256},
    sol_types::SolCall,
};
use anyhow::{Context, Result};
use derive_more::Deref;
use serde::{Deserialize, Serialize};

use crate::{
    confirm::DeployedContract,
    interface::IFraudDetection::{
        getContractInfoCall, getFraudAssessmentCall, getReputationCall, oracleCall, ownerCall,
    },
    session::NetworkSession,
};

/// Address never interacted with, used to probe default reputation state.
pub const DEFAULT_PROBE_ADDRESS: Address = Address::with_last_byte(1);

/// A named group of post-deployment checks.
#[derive(
    Debug,
    Clone,
    Copy,
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
pub enum Checklist {
    /// The aggregate `getContractInfo()` call.
    ContractInfo,
    /// The individual `owner()` and `oracle()` getters.
    Roles,
    /// Reputation and fraud assessment of the probe address.
    ReputationProbe,
}

impl Checklist {
    /// Names of the checks this checklist produces, in order.
    pub fn check_names(&self) -> &'static [&'static str] {
        match self {
            Checklist::ContractInfo => &[
                "contract-info.owner",
                "contract-info.oracle",
                "contract-info.total-assessments",
            ],
            Checklist::Roles => &["owner", "oracle"],
            Checklist::ReputationProbe => &[
                "reputation",
                "fraud-assessment.has-ml-prediction",
                "fraud-assessment.ml-is-fraudulent",
                "fraud-assessment.ml-confidence",
                "fraud-assessment.ml-timestamp",
                "fraud-assessment.reputation-score",
                "fraud-assessment.report-count",
                "fraud-assessment.overall-risk",
            ],
        }
    }

    pub fn check_count(&self) -> usize {
        self.check_names().len()
    }
}

/// Values a freshly deployed instance is expected to expose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub owner: Address,
    pub oracle: Address,
    pub probe_address: Address,
}

/// Result of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub expected: String,
    pub actual: String,
    pub passed: bool,
}

impl CheckOutcome {
    fn compare<T: PartialEq + Display>(name: &'static str, expected: T, actual: T) -> Self {
        Self {
            name,
            passed: expected == actual,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    fn errored(name: &'static str, expected: String, err: &anyhow::Error) -> Self {
        Self {
            name,
            expected,
            actual: format!("error: {:#}", err),
            passed: false,
        }
    }
}

/// Ordered outcomes of every configured check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref)]
pub struct VerificationOutcome(Vec<CheckOutcome>);

impl VerificationOutcome {
    pub fn passed(&self) -> usize {
        self.0.iter().filter(|check| check.passed).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.0.iter().filter(|check| !check.passed)
    }

    pub fn all_passed(&self) -> bool {
        self.0.iter().all(|check| check.passed)
    }
}

/// Runs checklists against a deployed contract through a session.
pub struct Verifier<'a, S> {
    session: &'a S,
    baseline: Baseline,
}

impl<'a, S: NetworkSession> Verifier<'a, S> {
    pub fn new(session: &'a S, baseline: Baseline) -> Self {
        Self { session, baseline }
    }

    /// Run every checklist in order. Never fails: errors become failed outcomes.
    ///
    /// # Arguments
    /// * `contract` - The confirmed contract to read from
    /// * `checklists` - Checklists to run, in order
    ///
    /// # Returns
    /// One outcome per check, as many as the checklists declare.
    pub async fn run(&self, contract: &DeployedContract, checklists: &[Checklist]) -> VerificationOutcome {
        let mut outcomes = Vec::with_capacity(checklists.iter().map(Checklist::check_count).sum());

        for checklist in checklists {
            tracing::info!(checklist = %checklist, address = %contract.address, "Running checklist...");
            let before = outcomes.len();

            match checklist {
                Checklist::ContractInfo => self.contract_info(contract.address, &mut outcomes).await,
                Checklist::Roles => self.roles(contract.address, &mut outcomes).await,
                Checklist::ReputationProbe => {
                    self.reputation_probe(contract.address, &mut outcomes).await
                }
            }

            for check in &outcomes[before..] {
                if check.passed {
                    tracing::debug!(check = check.name, actual = %check.actual, "Check passed");
                } else {
                    tracing::warn!(
                        check = check.name,
                        expected = %check.expected,
                        actual = %check.actual,
                        "Check failed"
                    );
                }
            }
        }

        VerificationOutcome(outcomes)
    }

    async fn contract_info(&self, to: Address, out: &mut Vec<CheckOutcome>) {
        let names = Checklist::ContractInfo.check_names();
        let expected = (self.baseline.owner, self.baseline.oracle, U256::ZERO);

        match self.view(to, getContractInfoCall {}).await {
            Ok(info) => {
                out.push(CheckOutcome::compare(names[0], expected.0, info.contractOwner));
                out.push(CheckOutcome::compare(names[1], expected.1, info.oracleAddress));
                out.push(CheckOutcome::compare(names[2], expected.2, info.totalAssessments));
            }
            Err(e) => {
                out.push(CheckOutcome::errored(names[0], expected.0.to_string(), &e));
                out.push(CheckOutcome::errored(names[1], expected.1.to_string(), &e));
                out.push(CheckOutcome::errored(names[2], expected.2.to_string(), &e));
            }
        }
    }

    async fn roles(&self, to: Address, out: &mut Vec<CheckOutcome>) {
        let names = Checklist::Roles.check_names();
        let (owner, oracle) = (self.baseline.owner, self.baseline.oracle);

        out.push(match self.view(to, ownerCall {}).await {
            Ok(actual) => CheckOutcome::compare(names[0], owner, actual),
            Err(e) => CheckOutcome::errored(names[0], owner.to_string(), &e),
        });
        out.push(match self.view(to, oracleCall {}).await {
            Ok(actual) => CheckOutcome::compare(names[1], oracle, actual),
            Err(e) => CheckOutcome::errored(names[1], oracle.to_string(), &e),
        });
    }

    async fn reputation_probe(&self, to: Address, out: &mut Vec<CheckOutcome>) {
        let names = Checklist::ReputationProbe.check_names();
        let wallet = self.baseline.probe_address;

        out.push(match self.view(to, getReputationCall { wallet }).await {
            Ok(actual) => CheckOutcome::compare(names[0], I256::ZERO, actual),
            Err(e) => CheckOutcome::errored(names[0], I256::ZERO.to_string(), &e),
        });

        match self.view(to, getFraudAssessmentCall { wallet }).await {
            Ok(a) => out.extend([
                CheckOutcome::compare(names[1], false, a.hasMLPrediction),
                CheckOutcome::compare(names[2], false, a.mlIsFraudulent),
                CheckOutcome::compare(names[3], U256::ZERO, a.mlConfidence),
                CheckOutcome::compare(names[4], U256::ZERO, a.mlTimestamp),
                CheckOutcome::compare(names[5], I256::ZERO, a.reputationScore),
                CheckOutcome::compare(names[6], U256::ZERO, a.reportCount),
                CheckOutcome::compare(names[7], U256::ZERO, a.overallRisk),
            ]),
            Err(e) => {
                let no = false.to_string();
                let zero = U256::ZERO.to_string();
                let zero_int = I256::ZERO.to_string();
                let expected = [&no, &no, &zero, &zero, &zero_int, &zero, &zero];
                for (&name, expected) in names[1..].iter().zip(expected) {
                    out.push(CheckOutcome::errored(name, expected.clone(), &e));
                }
            }
        }
    }

    /// Execute a view call and decode its return data.
    async fn view<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return> {
        let output = self
            .session
            .call(to, call.abi_encode().into())
            .await
            .with_context(|| format!("{} failed", C::SIGNATURE))?;

        C::abi_decode_returns(&output)
            .with_context(|| format!("Failed to decode {} output", C::SIGNATURE))
    }
}
