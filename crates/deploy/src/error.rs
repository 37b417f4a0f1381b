//! Fatal error taxonomy for the deployment pipeline.

use std::time::Duration;

use alloy_core::primitives::TxHash;

use crate::pipeline::PipelineState;

/// Errors that abort a deployment run.
///
/// Verification failures are never represented here: they are recorded in the
/// [`VerificationOutcome`](crate::VerificationOutcome) and the run still succeeds.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The deployment request does not match the contract interface.
    #[error("invalid deployment request: {0}")]
    InvalidArgument(String),

    /// The network rejected the deployment transaction or could not be reached.
    #[error("failed to submit deployment transaction")]
    Submission(#[source] anyhow::Error),

    /// The transaction was mined but contract construction failed.
    #[error(
        "deployment transaction {tx_hash} reverted: {}",
        .reason.as_deref().unwrap_or("no revert reason returned")
    )]
    Reverted {
        tx_hash: TxHash,
        reason: Option<String>,
    },

    /// The transaction was mined successfully but the receipt carries no contract address.
    #[error("deployment transaction {tx_hash} succeeded without creating a contract")]
    MissingContractAddress { tx_hash: TxHash },

    /// Finality was not observed within the configured bound.
    #[error("deployment transaction {tx_hash} not confirmed within {timeout:?}")]
    ConfirmationTimeout { tx_hash: TxHash, timeout: Duration },

    /// The run was aborted by an external signal after the transaction was broadcast.
    #[error("cancelled during {stage} of deployment transaction {tx_hash}")]
    Cancelled {
        tx_hash: TxHash,
        stage: PipelineState,
    },
}

impl DeployError {
    /// The pipeline stage this error aborts.
    pub fn stage(&self) -> PipelineState {
        match self {
            Self::InvalidArgument(_) | Self::Submission(_) => PipelineState::Submitting,
            Self::Reverted { .. }
            | Self::MissingContractAddress { .. }
            | Self::ConfirmationTimeout { .. } => PipelineState::PendingConfirmation,
            Self::Cancelled { stage, .. } => *stage,
        }
    }

    /// This error's message followed by every underlying cause, `: ` separated.
    pub fn with_causes(&self) -> String {
        anyhow::Chain::new(self)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(": ")
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
