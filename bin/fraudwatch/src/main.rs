//! fraudwatch is a CLI tool to deploy the fraud detection contract and check it is ready to serve.

mod cli;

use std::{process::ExitCode, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;

use cli::Cli;
use fraudwatch_deploy::{
    ContractFactory, DeployConfig, DeployError, NetworkSession, Pipeline, Reporter, RpcSession,
};

/// How long an interrupted stage may take to wind down before the run is dropped.
const INTERRUPT_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Pipeline failures are already logged with their stage.
            if err.downcast_ref::<DeployError>().is_none() {
                tracing::error!(error = format!("{:#}", err), "fraudwatch failed");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = DeployConfig::load_with_overrides(cli.config.as_deref(), &cli.overrides())?;

    if cli.dump_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let signer = cli.signer_source()?.into_signer()?;
    let session = RpcSession::connect(&config.rpc_url, signer)?;
    let run_config = config.run_config(session.deployer());

    tracing::info!(
        rpc_url = %config.rpc_url,
        contract = %config.contract,
        deployer = %run_config.deployer,
        oracle = %run_config.oracle,
        "Starting deployment..."
    );

    let factory = ContractFactory::load(&config.artifacts_dir, &config.contract)
        .context("Failed to load contract artifact")?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling...");
            let _ = cancel_tx.send(true);
        }
    });

    let mut pipeline = Pipeline::new(&session, &run_config).with_cancel(cancel_rx.clone());
    let report = tokio::select! {
        result = pipeline.run(&factory) => result?,
        () = interrupted(cancel_rx) => {
            anyhow::bail!("Interrupted before the run finished, the deployment may still be mined")
        }
    };

    Reporter::new(config.report).emit(&report);

    Ok(())
}

/// Resolves [`INTERRUPT_GRACE`] after the cancel flag is raised.
///
/// Stages that watch the flag return first; anything else (a hung broadcast, a
/// stalled read) is dropped when this fires.
async fn interrupted(mut cancel: watch::Receiver<bool>) {
    if cancel.wait_for(|cancelled| *cancelled).await.is_err() {
        return std::future::pending().await;
    }
    tokio::time::sleep(INTERRUPT_GRACE).await;
}
