//! Confirmation waiter: blocks until a pending deployment is mined.

use std::time::Duration;

use alloy_core::primitives::{Address, TxHash};
use tokio::sync::watch;

use crate::{
    error::DeployError, pipeline::PipelineState, session::NetworkSession, submit::PendingDeployment,
};

/// Default interval between receipt polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default upper bound on the wait for finality.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(300);

/// A contract whose creation transaction has a confirmed receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContract {
    pub address: Address,
    pub contract_name: String,
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

impl DeployedContract {
    /// The EIP-55 checksummed address.
    pub fn address_hex(&self) -> String {
        self.address.to_checksum(None)
    }
}

/// Waits for pending deployments to be finalized.
#[derive(Debug, Clone)]
pub struct ConfirmationWaiter {
    poll_interval: Duration,
    timeout: Option<Duration>,
    cancel: Option<watch::Receiver<bool>>,
}

impl ConfirmationWaiter {
    pub fn new(poll_interval: Duration, timeout: Option<Duration>) -> Self {
        Self {
            poll_interval,
            timeout,
            cancel: None,
        }
    }

    /// Abort the wait with [`DeployError::Cancelled`] once `cancel` turns `true`.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Block until `pending` is mined and return the deployed contract.
    ///
    /// The first successful resolution is cached in `pending`: later calls return
    /// the same contract without touching the network.
    pub async fn wait<S: NetworkSession>(
        &self,
        session: &S,
        pending: &PendingDeployment,
    ) -> Result<DeployedContract, DeployError> {
        pending
            .resolved
            .get_or_try_init(|| self.resolve(session, pending))
            .await
            .cloned()
    }

    async fn resolve<S: NetworkSession>(
        &self,
        session: &S,
        pending: &PendingDeployment,
    ) -> Result<DeployedContract, DeployError> {
        let tx_hash = pending.tx_hash;
        tracing::info!(tx_hash = %tx_hash, timeout = ?self.timeout, "Waiting for deployment confirmation...");

        let bounded = async {
            match self.timeout {
                Some(timeout) => tokio::time::timeout(timeout, self.poll(session, pending))
                    .await
                    .map_err(|_| DeployError::ConfirmationTimeout { tx_hash, timeout })?,
                None => self.poll(session, pending).await,
            }
        };

        let mut cancel = self.cancel.clone();
        tokio::select! {
            result = bounded => result,
            _ = cancelled(&mut cancel) => Err(DeployError::Cancelled {
                tx_hash,
                stage: PipelineState::PendingConfirmation,
            }),
        }
    }

    async fn poll<S: NetworkSession>(
        &self,
        session: &S,
        pending: &PendingDeployment,
    ) -> Result<DeployedContract, DeployError> {
        let tx_hash = pending.tx_hash;

        loop {
            match session.receipt(tx_hash).await {
                Ok(Some(receipt)) if !receipt.succeeded => {
                    return Err(DeployError::Reverted {
                        tx_hash,
                        reason: receipt.revert_reason,
                    });
                }
                Ok(Some(receipt)) => {
                    let address = receipt
                        .contract_address
                        .ok_or(DeployError::MissingContractAddress { tx_hash })?;

                    tracing::info!(
                        address = %address,
                        block = ?receipt.block_number,
                        gas_used = receipt.gas_used,
                        "Deployment confirmed"
                    );

                    return Ok(DeployedContract {
                        address,
                        contract_name: pending.contract_name.clone(),
                        tx_hash,
                        block_number: receipt.block_number,
                        gas_used: receipt.gas_used,
                    });
                }
                Ok(None) => {
                    tracing::trace!(tx_hash = %tx_hash, "Deployment not mined yet");
                }
                Err(e) => {
                    tracing::debug!(error = %e, tx_hash = %tx_hash, "Receipt poll failed, retrying...");
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Resolves once the cancel flag is raised; never resolves without a receiver
/// or after the sender is dropped.
pub(crate) async fn cancelled(cancel: &mut Option<watch::Receiver<bool>>) {
    if let Some(rx) = cancel
        && rx.wait_for(|cancelled| *cancelled).await.is_ok()
    {
        return;
    }
    std::future::pending::<()>().await
}
