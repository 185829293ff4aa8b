//! Withdraw circuit witness (`Prover.toml`) formatter.
//!
//! Gathers what a depositor keeps after depositing (the commitment fields),
//! the Merkle path of their leaf and the current time, and renders the
//! withdraw circuit's prover input.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commitment::Commitment;

#[derive(Debug, Error)]
pub enum WitnessError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0} is empty")]
    Empty(PathBuf),

    #[error("{path}: invalid path index '{value}'")]
    InvalidIndex { path: PathBuf, value: String },

    #[error("failed to render Prover.toml: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Private and public inputs of the withdraw circuit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawWitness {
    pub current_timestamp: u64,
    pub deposit_timestamp: String,
    pub asset: String,
    pub liquidity: String,
    pub root: String,
    pub secret: String,
    pub nullifier: String,
    pub nullifier_hash: String,
    pub proof_path_indices: Vec<u64>,
    pub proof_siblings: Vec<String>,
}

fn read_lines(path: &Path) -> Result<Vec<String>, WitnessError> {
    let text = fs::read_to_string(path).map_err(|source| WitnessError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text
        .lines()
        .map(|l| l.trim_end().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}

fn read_first_line(path: &Path) -> Result<String, WitnessError> {
    read_lines(path)?
        .into_iter()
        .next()
        .ok_or_else(|| WitnessError::Empty(path.to_path_buf()))
}

fn read_indices(path: &Path) -> Result<Vec<u64>, WitnessError> {
    read_lines(path)?
        .into_iter()
        .map(|line| {
            line.trim().parse().map_err(|_| WitnessError::InvalidIndex {
                path: path.to_path_buf(),
                value: line,
            })
        })
        .collect()
}

impl WithdrawWitness {
    /// Load a witness from a data directory.
    ///
    /// The directory holds one value per file (`root.txt`,
    /// `nullifier_hash.txt`) and one entry per line for the Merkle path
    /// (`proof_path_indices.txt`, `proof_siblings.txt`). The deposit fields
    /// come from `deposit` when given, otherwise from `deposit_timestamp.txt`,
    /// `deposit_asset.txt`, `deposit_liquidity.txt`, `secret.txt` and
    /// `nullifier.txt`.
    pub fn load(
        dir: &Path,
        deposit: Option<&Commitment>,
        current_timestamp: u64,
    ) -> Result<Self, WitnessError> {
        let (deposit_timestamp, asset, liquidity, secret, nullifier) = match deposit {
            Some(c) => (
                c.timestamp().to_string(),
                c.asset().to_string(),
                c.liquidity().to_string(),
                c.secret().to_string(),
                c.nullifier().to_string(),
            ),
            None => (
                read_first_line(&dir.join("deposit_timestamp.txt"))?,
                read_first_line(&dir.join("deposit_asset.txt"))?,
                read_first_line(&dir.join("deposit_liquidity.txt"))?,
                read_first_line(&dir.join("secret.txt"))?,
                read_first_line(&dir.join("nullifier.txt"))?,
            ),
        };

        Ok(WithdrawWitness {
            current_timestamp,
            deposit_timestamp,
            asset,
            liquidity,
            root: read_first_line(&dir.join("root.txt"))?,
            secret,
            nullifier,
            nullifier_hash: read_first_line(&dir.join("nullifier_hash.txt"))?,
            proof_path_indices: read_indices(&dir.join("proof_path_indices.txt"))?,
            proof_siblings: read_lines(&dir.join("proof_siblings.txt"))?,
        })
    }

    /// Render the withdraw circuit's `Prover.toml`.
    pub fn to_prover_toml(&self) -> Result<String, WitnessError> {
        Ok(toml::to_string(&WithdrawProverInput::from(self))?)
    }
}

/// Withdraw circuit input as written to `Prover.toml`. Field order is key order.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
struct WithdrawProverInput {
    current_timestamp: String,
    deposit_timestamp: String,
    asset: String,
    liquidity: String,
    root: String,
    secret: String,
    nullifier: String,
    nullifier_hash: String,
    proof_path_indices: Vec<u64>,
    proof_siblings: Vec<String>,
}

impl From<&WithdrawWitness> for WithdrawProverInput {
    fn from(w: &WithdrawWitness) -> Self {
        Self {
            current_timestamp: w.current_timestamp.to_string(),
            deposit_timestamp: w.deposit_timestamp.clone(),
            asset: w.asset.clone(),
            liquidity: w.liquidity.clone(),
            root: w.root.clone(),
            secret: w.secret.clone(),
            nullifier: w.nullifier.clone(),
            nullifier_hash: w.nullifier_hash.clone(),
            proof_path_indices: w.proof_path_indices.clone(),
            proof_siblings: w.proof_siblings.clone(),
        }
    }
}
