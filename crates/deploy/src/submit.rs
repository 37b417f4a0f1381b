//! Deployment submitter: validates a request and broadcasts the creation transaction.

use alloy_core::primitives::{Address, TxHash, U256, utils::format_ether};
use tokio::sync::OnceCell;

use crate::{
    confirm::DeployedContract,
    error::DeployError,
    factory::{ContractFactory, DeploymentRequest},
    session::NetworkSession,
};

/// A creation transaction accepted by the network but not yet confirmed.
#[derive(Debug)]
pub struct PendingDeployment {
    pub tx_hash: TxHash,
    pub contract_name: String,
    /// Deployer balance observed right before broadcasting.
    pub deployer_balance: Option<U256>,
    pub(crate) resolved: OnceCell<DeployedContract>,
}

impl PendingDeployment {
    pub fn new(tx_hash: TxHash, contract_name: impl Into<String>) -> Self {
        Self {
            tx_hash,
            contract_name: contract_name.into(),
            deployer_balance: None,
            resolved: OnceCell::new(),
        }
    }

    fn with_deployer_balance(mut self, balance: Option<U256>) -> Self {
        self.deployer_balance = balance;
        self
    }

    /// The confirmed contract, if a waiter already resolved this deployment.
    pub fn resolved(&self) -> Option<&DeployedContract> {
        self.resolved.get()
    }
}

/// Broadcasts deployments of one contract through one session.
pub struct DeploymentSubmitter<'a, S> {
    session: &'a S,
    factory: &'a ContractFactory,
}

impl<'a, S: NetworkSession> DeploymentSubmitter<'a, S> {
    pub fn new(session: &'a S, factory: &'a ContractFactory) -> Self {
        Self { session, factory }
    }

    /// Submit `request` and return the pending deployment.
    ///
    /// The request is validated against the contract interface before any network
    /// interaction; broadcast failures are not retried.
    pub async fn submit(&self, request: &DeploymentRequest) -> Result<PendingDeployment, DeployError> {
        let init_code = self.factory.deploy_code(request)?;

        let deployer = self.session.deployer();
        let balance = self.fetch_balance(deployer).await;

        tracing::info!(
            contract = %request.contract_name,
            deployer = %deployer,
            args = ?request.constructor_args,
            init_code_len = init_code.len(),
            "Broadcasting deployment transaction..."
        );

        let tx_hash = self
            .session
            .broadcast_deployment(init_code)
            .await
            .map_err(DeployError::Submission)?;

        tracing::info!(tx_hash = %tx_hash, "Deployment transaction accepted");

        Ok(PendingDeployment::new(tx_hash, request.contract_name.clone()).with_deployer_balance(balance))
    }

    async fn fetch_balance(&self, deployer: Address) -> Option<U256> {
        match self.session.balance(deployer).await {
            Ok(balance) => {
                if balance.is_zero() {
                    tracing::warn!(deployer = %deployer, "Deployer account has no funds");
                } else {
                    tracing::info!(deployer = %deployer, balance = %format_ether(balance), "Deployer balance (ETH)");
                }
                Some(balance)
            }
            Err(err) => {
                tracing::warn!(deployer = %deployer, error = %err, "Could not fetch deployer balance");
                None
            }
        }
    }
}
