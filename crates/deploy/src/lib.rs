//! fraudwatch-deploy - Deployment library for the fraud detection contract.
//!
//! This crate deploys `FraudDetectionContractV2` to an EVM network, waits for the
//! creation transaction to be finalized, verifies the initial on-chain state and
//! renders an operator-facing report.

mod error;
pub use error::DeployError;

pub mod config;
pub use config::{DeployConfig, RunConfig};

mod session;
pub use session::{DeploymentReceipt, NetworkSession, RpcSession, SignerSource};

mod factory;
pub use factory::{ContractFactory, DeploymentRequest};

pub mod interface;
pub use interface::FRAUD_DETECTION_CONTRACT;

mod submit;
pub use submit::{DeploymentSubmitter, PendingDeployment};

mod confirm;
pub use confirm::{
    ConfirmationWaiter, DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_POLL_INTERVAL, DeployedContract,
};

mod verify;
pub use verify::{
    Baseline, CheckOutcome, Checklist, DEFAULT_PROBE_ADDRESS, VerificationOutcome, Verifier,
};

mod report;
pub use report::{DeploymentReport, ReportStyle, Reporter};

mod pipeline;
pub use pipeline::{Pipeline, PipelineState};

#[cfg(test)]
mod testing;
