//! Network session: the authenticated connection the pipeline deploys through.

use std::future::Future;

use alloy_core::{
    primitives::{Address, Bytes, TxHash, U256},
    sol_types::decode_revert_reason,
};
use alloy_network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types_eth::{BlockId, TransactionRequest};
use alloy_signer_local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English};
use anyhow::{Context, Result};

/// Minimal view of a mined transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReceipt {
    /// Whether the transaction executed successfully.
    pub succeeded: bool,
    /// Address of the created contract, if any.
    pub contract_address: Option<Address>,
    /// Block the transaction was included in.
    pub block_number: Option<u64>,
    /// Gas consumed by the transaction.
    pub gas_used: u64,
    /// Revert reason recovered for a failed transaction.
    pub revert_reason: Option<String>,
}

/// An authenticated connection to a network, acting as a single deployer identity.
pub trait NetworkSession: Send + Sync {
    /// The signing identity that pays for and authors transactions.
    fn deployer(&self) -> Address;

    /// Balance of an account, in wei.
    fn balance(&self, address: Address) -> impl Future<Output = Result<U256>> + Send;

    /// Broadcast a contract creation transaction carrying `init_code`.
    ///
    /// Returns once the transaction is accepted into the pending pool.
    fn broadcast_deployment(&self, init_code: Bytes) -> impl Future<Output = Result<TxHash>> + Send;

    /// Fetch the receipt of a transaction, `None` while it is not mined yet.
    fn receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<Option<DeploymentReceipt>>> + Send;

    /// Execute a read-only call against `to`.
    fn call(&self, to: Address, input: Bytes) -> impl Future<Output = Result<Bytes>> + Send;
}

/// Signing material for the deployer identity.
#[derive(Debug, Clone)]
pub enum SignerSource {
    /// A hex-encoded secp256k1 private key.
    PrivateKey(String),
    /// A BIP-39 phrase and the derivation index of the account to use.
    Mnemonic { phrase: String, index: u32 },
}

impl SignerSource {
    /// Build the local signer.
    pub fn into_signer(self) -> Result<PrivateKeySigner> {
        match self {
            SignerSource::PrivateKey(key) => key
                .trim()
                .parse::<PrivateKeySigner>()
                .context("Failed to parse deployer private key"),
            SignerSource::Mnemonic { phrase, index } => MnemonicBuilder::<English>::default()
                .phrase(phrase)
                .index(index)
                .context("Invalid mnemonic derivation index")?
                .build()
                .context("Failed to derive deployer key from mnemonic"),
        }
    }
}

/// [`NetworkSession`] backed by a JSON-RPC HTTP endpoint and a local signer.
pub struct RpcSession {
    provider: DynProvider,
    deployer: Address,
}

impl RpcSession {
    /// Connect to `rpc_url`, signing with `signer`.
    pub fn connect(rpc_url: &str, signer: PrivateKeySigner) -> Result<Self> {
        let url: url::Url = rpc_url
            .parse()
            .with_context(|| format!("Invalid RPC URL: {}", rpc_url))?;
        let deployer = signer.address();

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        tracing::debug!(rpc_url = %rpc_url, deployer = %deployer, "Network session ready");

        Ok(Self::new(provider, deployer))
    }

    fn new(provider: DynProvider, deployer: Address) -> Self {
        Self { provider, deployer }
    }

    /// Replay a failed transaction against its parent block to recover the revert reason.
    async fn replay_revert_reason(&self, tx_hash: TxHash, block_number: Option<u64>) -> Option<String> {
        let tx = self
            .provider
            .get_transaction_by_hash(tx_hash)
            .await
            .ok()
            .flatten()?;
        let block = BlockId::number(block_number?.saturating_sub(1));

        match self.provider.call(tx.into_request()).block(block).await {
            Ok(_) => None,
            Err(err) => {
                let payload = err.as_error_resp()?;
                payload
                    .as_revert_data()
                    .and_then(|data| decode_revert_reason(&data))
                    .or_else(|| Some(payload.message.to_string()))
            }
        }
    }
}

impl NetworkSession for RpcSession {
    fn deployer(&self) -> Address {
        self.deployer
    }

    async fn balance(&self, address: Address) -> Result<U256> {
        self.provider
            .get_balance(address)
            .await
            .with_context(|| format!("Failed to fetch balance of {}", address))
    }

    async fn broadcast_deployment(&self, init_code: Bytes) -> Result<TxHash> {
        let tx = TransactionRequest::default()
            .with_from(self.deployer)
            .with_deploy_code(init_code);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .context("Failed to send deployment transaction")?;

        Ok(*pending.tx_hash())
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<DeploymentReceipt>> {
        let Some(receipt) = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .with_context(|| format!("Failed to fetch receipt for {}", tx_hash))?
        else {
            return Ok(None);
        };

        let succeeded = receipt.status();
        let block_number = receipt.block_number();
        let revert_reason = if succeeded {
            None
        } else {
            self.replay_revert_reason(tx_hash, block_number).await
        };

        Ok(Some(DeploymentReceipt {
            succeeded,
            contract_address: receipt.contract_address(),
            block_number,
            gas_used: receipt.gas_used(),
            revert_reason,
        }))
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes> {
        let tx = TransactionRequest::default().with_to(to).with_input(input);
        self.provider
            .call(tx)
            .await
            .with_context(|| format!("eth_call to {} failed", to))
    }
}
