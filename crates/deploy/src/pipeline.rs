//! The deploy, confirm, verify sequence as a single state machine.

use tokio::sync::watch;

use crate::{
    config::RunConfig,
    confirm::{DeployedContract, cancelled},
    error::DeployError,
    factory::ContractFactory,
    report::DeploymentReport,
    session::NetworkSession,
    submit::{DeploymentSubmitter, PendingDeployment},
    verify::Verifier,
};

/// Stages of a deployment run.
///
/// `Idle -> Submitting -> PendingConfirmation -> Confirmed -> Verifying -> Done`, with
/// `Failed` reachable from `Submitting` and `PendingConfirmation`, and from `Confirmed`
/// when the run is cancelled during the grace period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum PipelineState {
    Idle,
    Submitting,
    PendingConfirmation,
    Confirmed,
    Verifying,
    Done,
    Failed,
}

/// Drives one deployment of one contract through one session.
pub struct Pipeline<'a, S> {
    session: &'a S,
    config: &'a RunConfig,
    cancel: Option<watch::Receiver<bool>>,
    state: PipelineState,
}

impl<'a, S: NetworkSession> Pipeline<'a, S> {
    pub fn new(session: &'a S, config: &'a RunConfig) -> Self {
        Self {
            session,
            config,
            cancel: None,
            state: PipelineState::Idle,
        }
    }

    /// Abort the confirmation wait or the grace period once `cancel` turns `true`.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Deploy, confirm and verify the contract built by `factory`.
    ///
    /// Submission and confirmation failures abort the run. Verification failures do
    /// not: they are part of the returned report.
    ///
    /// # Arguments
    /// * `factory` - Factory bound to the contract named in the run configuration
    ///
    /// # Returns
    /// The report of a run that reached [`PipelineState::Done`], or the fatal error
    /// that moved it to [`PipelineState::Failed`].
    pub async fn run(&mut self, factory: &ContractFactory) -> Result<DeploymentReport, DeployError> {
        let pending = self.submit(factory).await.map_err(|err| self.fail(err))?;
        let contract = self.confirm(&pending).await.map_err(|err| self.fail(err))?;

        self.settle(&contract).await.map_err(|err| self.fail(err))?;

        self.transition(PipelineState::Verifying);
        let outcome = Verifier::new(self.session, self.config.baseline())
            .run(&contract, &self.config.checklists)
            .await;

        if outcome.all_passed() {
            tracing::info!(checks = outcome.len(), "✓ All verification checks passed");
        } else {
            tracing::warn!(
                passed = outcome.passed(),
                total = outcome.len(),
                "Some verification checks failed"
            );
        }

        self.transition(PipelineState::Done);

        Ok(DeploymentReport {
            rpc_url: self.config.rpc_url.clone(),
            deployer: self.config.deployer,
            deployer_balance: pending.deployer_balance,
            oracle: self.config.oracle,
            contract,
            outcome,
        })
    }

    async fn submit(&mut self, factory: &ContractFactory) -> Result<PendingDeployment, DeployError> {
        self.transition(PipelineState::Submitting);
        DeploymentSubmitter::new(self.session, factory)
            .submit(&self.config.request())
            .await
    }

    async fn confirm(&mut self, pending: &PendingDeployment) -> Result<DeployedContract, DeployError> {
        self.transition(PipelineState::PendingConfirmation);

        let mut waiter = self.config.waiter();
        if let Some(cancel) = self.cancel.clone() {
            waiter = waiter.with_cancel(cancel);
        }
        let contract = waiter.wait(self.session, pending).await?;

        self.transition(PipelineState::Confirmed);
        tracing::info!(
            contract = %contract.contract_name,
            address = %contract.address_hex(),
            "✓ Contract deployed"
        );
        Ok(contract)
    }

    /// Sleep the post-confirmation grace period, unless cancelled first.
    async fn settle(&self, contract: &DeployedContract) -> Result<(), DeployError> {
        let grace_period = self.config.grace_period;
        if grace_period.is_zero() {
            return Ok(());
        }

        tracing::info!(grace_period = ?grace_period, "Waiting before verification...");
        let mut cancel = self.cancel.clone();
        tokio::select! {
            _ = tokio::time::sleep(grace_period) => Ok(()),
            _ = cancelled(&mut cancel) => Err(DeployError::Cancelled {
                tx_hash: contract.tx_hash,
                stage: self.state,
            }),
        }
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::debug!(from = %self.state, to = %next, "Pipeline transition");
        self.state = next;
    }

    fn fail(&mut self, err: DeployError) -> DeployError {
        tracing::error!(stage = %self.state, error = %err.with_causes(), "Deployment failed");
        self.transition(PipelineState::Failed);
        err
    }
}
