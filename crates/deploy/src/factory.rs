//! Contract factory: binds a compiled contract artifact to deployment requests.

use std::path::{Path, PathBuf};

use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier},
    json_abi::JsonAbi,
    primitives::Bytes,
};
use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::DeployError;

/// A request to deploy one contract instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    /// Name of the contract, as it appears in the compiled artifact.
    pub contract_name: String,
    /// Textual constructor arguments, coerced against the constructor's declared types.
    pub constructor_args: Vec<String>,
}

impl DeploymentRequest {
    pub fn new(contract_name: impl Into<String>, constructor_args: Vec<String>) -> Self {
        Self {
            contract_name: contract_name.into(),
            constructor_args,
        }
    }
}

/// Bytecode as emitted by Hardhat (plain hex) or Foundry (`{ "object": "0x.." }`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArtifactBytecode {
    Hex(Bytes),
    Object { object: Bytes },
}

impl ArtifactBytecode {
    fn into_bytes(self) -> Bytes {
        match self {
            ArtifactBytecode::Hex(bytes) | ArtifactBytecode::Object { object: bytes } => bytes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Artifact {
    contract_name: Option<String>,
    abi: JsonAbi,
    bytecode: ArtifactBytecode,
}

/// A deployable contract: its name, interface and creation bytecode.
#[derive(Debug, Clone)]
pub struct ContractFactory {
    name: String,
    abi: JsonAbi,
    bytecode: Bytes,
}

impl ContractFactory {
    pub fn new(name: impl Into<String>, abi: JsonAbi, bytecode: Bytes) -> Self {
        Self {
            name: name.into(),
            abi,
            bytecode,
        }
    }

    /// Resolve the artifact for `name` under `artifacts_dir` and load it.
    ///
    /// # Arguments
    /// * `artifacts_dir` - Root of the compiler output (Hardhat `artifacts/` or Foundry `out/`)
    /// * `name` - Contract name; the artifact file is `<name>.json`
    ///
    /// # Returns
    /// The factory, or an error if no artifact is found or it cannot be parsed.
    pub fn load(artifacts_dir: &Path, name: &str) -> Result<Self> {
        let path = resolve_artifact(artifacts_dir, name)?;
        tracing::debug!(contract = %name, path = %path.display(), "Loading contract artifact");

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read artifact {}", path.display()))?;
        Self::from_artifact_json(name, &content)
            .with_context(|| format!("Failed to parse artifact {}", path.display()))
    }

    /// Parse an artifact JSON document for the contract `name`.
    pub fn from_artifact_json(name: &str, content: &str) -> Result<Self> {
        let artifact: Artifact = serde_json::from_str(content)?;

        if let Some(artifact_name) = &artifact.contract_name
            && artifact_name != name
        {
            anyhow::bail!(
                "Artifact describes contract '{}', expected '{}'",
                artifact_name,
                name
            );
        }

        Ok(Self::new(name, artifact.abi, artifact.bytecode.into_bytes()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    /// Number of parameters the constructor declares.
    pub fn constructor_arity(&self) -> usize {
        self.abi
            .constructor()
            .map(|constructor| constructor.inputs.len())
            .unwrap_or_default()
    }

    /// Validate `request` against the interface and build the creation code.
    ///
    /// The result is the contract bytecode followed by the ABI-encoded constructor arguments.
    pub fn deploy_code(&self, request: &DeploymentRequest) -> Result<Bytes, DeployError> {
        if request.contract_name != self.name {
            return Err(DeployError::invalid(format!(
                "request targets '{}' but the factory is bound to '{}'",
                request.contract_name, self.name
            )));
        }

        if self.bytecode.is_empty() {
            return Err(DeployError::invalid(format!(
                "'{}' has no creation bytecode (abstract contract or interface?)",
                self.name
            )));
        }

        let expected = self.constructor_arity();
        if request.constructor_args.len() != expected {
            return Err(DeployError::invalid(format!(
                "'{}' constructor takes {} argument(s), got {}",
                self.name,
                expected,
                request.constructor_args.len()
            )));
        }

        let Some(constructor) = self.abi.constructor() else {
            return Ok(self.bytecode.clone());
        };

        let values = constructor
            .inputs
            .iter()
            .zip(&request.constructor_args)
            .map(|(param, arg)| {
                let ty: DynSolType = param.resolve().map_err(|e| {
                    DeployError::invalid(format!("unsupported parameter type {}: {}", param.ty, e))
                })?;
                ty.coerce_str(arg).map_err(|e| {
                    DeployError::invalid(format!(
                        "argument '{}' is not a valid {} for parameter '{}': {}",
                        arg,
                        ty.sol_type_name(),
                        param.name,
                        e
                    ))
                })
            })
            .collect::<Result<Vec<DynSolValue>, _>>()?;

        let encoded = constructor
            .abi_encode_input(&values)
            .map_err(|e| DeployError::invalid(format!("failed to encode constructor: {}", e)))?;

        let mut code = self.bytecode.to_vec();
        code.extend_from_slice(&encoded);
        Ok(code.into())
    }
}

/// Find the artifact file for `name`.
///
/// Tries the Hardhat layout first, then searches `artifacts_dir` recursively.
fn resolve_artifact(artifacts_dir: &Path, name: &str) -> Result<PathBuf> {
    let file_name = format!("{}.json", name);
    let hardhat_path = artifacts_dir
        .join("contracts")
        .join(format!("{}.sol", name))
        .join(&file_name);
    if hardhat_path.is_file() {
        return Ok(hardhat_path);
    }

    find_file(artifacts_dir, &file_name)?.with_context(|| {
        format!(
            "No artifact named {} found under {}",
            file_name,
            artifacts_dir.display()
        )
    })
}

fn find_file(dir: &Path, file_name: &str) -> Result<Option<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read artifacts directory {}", dir.display()))?;

    let mut subdirs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if path.file_name().is_some_and(|n| n == file_name) {
            return Ok(Some(path));
        }
    }

    subdirs.sort();
    for subdir in subdirs {
        if let Some(found) = find_file(&subdir, file_name)? {
            return Ok(Some(found));
        }
    }

    Ok(None)
}
