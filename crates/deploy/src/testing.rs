//! In-memory network session and fixtures for unit tests.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, Bytes, I256, TxHash, U256},
    sol_types::SolCall,
};
use anyhow::Result;

use crate::{
    factory::ContractFactory,
    interface::IFraudDetection::{
        getContractInfoCall, getFraudAssessmentCall, getReputationCall, oracleCall, ownerCall,
    },
    session::{DeploymentReceipt, NetworkSession},
};

pub const CONTRACT_NAME: &str = "FraudDetectionContractV2";
pub const DEPLOYER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const ORACLE: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
const CONTRACT_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

/// Trimmed Hardhat artifact: real interface, placeholder bytecode.
pub const HARDHAT_ARTIFACT: &str = r#"{
  "_format": "hh-sol-artifact-1",
  "contractName": "FraudDetectionContractV2",
  "sourceName": "contracts/FraudDetectionContractV2.sol",
  "abi": [
    {
      "inputs": [{ "internalType": "address", "name": "_oracle", "type": "address" }],
      "stateMutability": "nonpayable",
      "type": "constructor"
    },
    {
      "inputs": [],
      "name": "getContractInfo",
      "outputs": [
        { "internalType": "address", "name": "contractOwner", "type": "address" },
        { "internalType": "address", "name": "oracleAddress", "type": "address" },
        { "internalType": "uint256", "name": "totalAssessments", "type": "uint256" }
      ],
      "stateMutability": "view",
      "type": "function"
    },
    {
      "inputs": [{ "internalType": "address", "name": "_wallet", "type": "address" }],
      "name": "getReputation",
      "outputs": [{ "internalType": "int256", "name": "", "type": "int256" }],
      "stateMutability": "view",
      "type": "function"
    }
  ],
  "bytecode": "0x60806040",
  "deployedBytecode": "0x6080",
  "linkReferences": {},
  "deployedLinkReferences": {}
}"#;

pub fn address(s: &str) -> Address {
    s.parse().expect("valid test address")
}

pub fn fraud_detection_factory() -> ContractFactory {
    ContractFactory::from_artifact_json(CONTRACT_NAME, HARDHAT_ARTIFACT).expect("valid artifact")
}

fn encode_returns(values: Vec<DynSolValue>) -> Vec<u8> {
    DynSolValue::Tuple(values).abi_encode_params()
}

/// A scripted [`NetworkSession`] that records every interaction.
pub struct FakeSession {
    deployer: Address,
    contract_address: Address,
    tx_hash: TxHash,
    /// Polls answering "not mined" before the receipt shows up; `None` never mines.
    mined_after: Option<usize>,
    /// Leading polls that fail with an RPC error.
    flaky_receipts: usize,
    revert: Option<Option<String>>,
    omit_contract_address: bool,
    broadcast_error: Option<String>,
    balance_error: bool,
    responses: Mutex<HashMap<[u8; 4], Vec<u8>>>,
    broadcasts: AtomicUsize,
    receipt_polls: AtomicUsize,
    network_calls: AtomicUsize,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            deployer: address(DEPLOYER),
            contract_address: address(CONTRACT_ADDRESS),
            tx_hash: TxHash::repeat_byte(0xab),
            mined_after: Some(0),
            flaky_receipts: 0,
            revert: None,
            omit_contract_address: false,
            broadcast_error: None,
            balance_error: false,
            responses: Mutex::new(HashMap::new()),
            broadcasts: AtomicUsize::new(0),
            receipt_polls: AtomicUsize::new(0),
            network_calls: AtomicUsize::new(0),
        }
    }

    pub fn mined_after(mut self, polls: usize) -> Self {
        self.mined_after = Some(polls);
        self
    }

    pub fn never_mined(mut self) -> Self {
        self.mined_after = None;
        self
    }

    pub fn flaky_receipts(mut self, polls: usize) -> Self {
        self.flaky_receipts = polls;
        self
    }

    pub fn reverting(mut self, reason: Option<&str>) -> Self {
        self.revert = Some(reason.map(String::from));
        self
    }

    pub fn without_contract_address(mut self) -> Self {
        self.omit_contract_address = true;
        self
    }

    pub fn failing_broadcast(mut self, message: &str) -> Self {
        self.broadcast_error = Some(message.to_string());
        self
    }

    pub fn failing_balance(mut self) -> Self {
        self.balance_error = true;
        self
    }

    /// Answer the view functions the way a just-constructed contract does.
    pub fn with_fresh_contract(self, owner: &str, oracle: &str) -> Self {
        let (owner, oracle) = (address(owner), address(oracle));
        let zero = || DynSolValue::Uint(U256::ZERO, 256);
        let zero_int = || DynSolValue::Int(I256::ZERO, 256);

        self.returning(
            getContractInfoCall::SELECTOR,
            encode_returns(vec![
                DynSolValue::Address(owner),
                DynSolValue::Address(oracle),
                zero(),
            ]),
        )
        .returning(
            ownerCall::SELECTOR,
            encode_returns(vec![DynSolValue::Address(owner)]),
        )
        .returning(
            oracleCall::SELECTOR,
            encode_returns(vec![DynSolValue::Address(oracle)]),
        )
        .returning(getReputationCall::SELECTOR, encode_returns(vec![zero_int()]))
        .returning(
            getFraudAssessmentCall::SELECTOR,
            encode_returns(vec![
                DynSolValue::Bool(false),
                DynSolValue::Bool(false),
                zero(),
                zero(),
                zero_int(),
                zero(),
                zero(),
            ]),
        )
    }

    pub fn returning(self, selector: [u8; 4], output: Vec<u8>) -> Self {
        self.responses
            .lock()
            .expect("responses lock")
            .insert(selector, output);
        self
    }

    pub fn without_function(self, selector: [u8; 4]) -> Self {
        self.responses
            .lock()
            .expect("responses lock")
            .remove(&selector);
        self
    }

    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    pub fn broadcasts(&self) -> usize {
        self.broadcasts.load(Ordering::SeqCst)
    }

    pub fn receipt_polls(&self) -> usize {
        self.receipt_polls.load(Ordering::SeqCst)
    }

    /// Every interaction with the network, reads included.
    pub fn network_calls(&self) -> usize {
        self.network_calls.load(Ordering::SeqCst)
    }
}

impl NetworkSession for FakeSession {
    fn deployer(&self) -> Address {
        self.deployer
    }

    async fn balance(&self, _address: Address) -> Result<U256> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        if self.balance_error {
            anyhow::bail!("connection refused");
        }
        Ok(U256::from(10u64).pow(U256::from(18u64)))
    }

    async fn broadcast_deployment(&self, _init_code: Bytes) -> Result<TxHash> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.broadcast_error {
            anyhow::bail!("{}", message);
        }
        Ok(self.tx_hash)
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<DeploymentReceipt>> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        let poll = self.receipt_polls.fetch_add(1, Ordering::SeqCst) + 1;
        assert_eq!(tx_hash, self.tx_hash, "unexpected transaction polled");

        if poll <= self.flaky_receipts {
            anyhow::bail!("request timed out");
        }
        match self.mined_after {
            Some(pending_polls) if poll > pending_polls => {}
            _ => return Ok(None),
        }

        let succeeded = self.revert.is_none();
        Ok(Some(DeploymentReceipt {
            succeeded,
            contract_address: (succeeded && !self.omit_contract_address)
                .then_some(self.contract_address),
            block_number: Some(poll as u64),
            gas_used: 1_234_567,
            revert_reason: self.revert.clone().flatten(),
        }))
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        if to != self.contract_address {
            anyhow::bail!("no contract deployed at {}", to);
        }

        let selector: [u8; 4] = input
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| anyhow::anyhow!("calldata too short"))?;

        self.responses
            .lock()
            .expect("responses lock")
            .get(&selector)
            .cloned()
            .map(Bytes::from)
            .ok_or_else(|| anyhow::anyhow!("execution reverted"))
    }
}
