//! Deposit commitments.
//!
//! A commitment binds `(secret, nullifier, asset, liquidity, timestamp)`;
//! its leaf hash is computed by the vault contract's `generateLeaf` view so
//! the client never has to mirror the contract's hash function.
//!
//! The commitment is handed to the external prover as a `Prover.toml`:
//!
//! ```text
//! secret = "<decimal>"
//! nullifier = "<decimal>"
//! asset = "<decimal>"
//! liquidity = "<decimal wei>"
//! timestamp = "<unix seconds>"
//! leaf = "0x<64 hex digits>"
//! ```

use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::SolCall;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::wallet::{CallRequest, IVault, Wallet, WalletError};

/// Asset id of the chain's native currency.
pub const NATIVE_ASSET: u64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactError {
    #[error("artifact is missing field '{0}'")]
    MissingField(&'static str),

    #[error("artifact field '{field}' has invalid value '{value}'")]
    InvalidValue { field: &'static str, value: String },

    #[error("artifact is not valid TOML: {0}")]
    Malformed(String),
}

/// A deposit commitment with its contract-derived leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commitment {
    secret: U256,
    nullifier: U256,
    asset: u64,
    liquidity: U256,
    timestamp: u64,
    leaf: B256,
}

/// Draw a uniformly random 256-bit value.
fn random_u256<R: RngCore + CryptoRng>(rng: &mut R) -> U256 {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    U256::from_be_bytes(bytes)
}

/// Mint a fresh commitment.
///
/// Secret and nullifier are drawn independently from `rng`; the leaf comes
/// from the vault's `generateLeaf`. Any failure of that call aborts the
/// whole generation, nothing partial is returned.
pub async fn generate<W, R>(
    wallet: &W,
    vault: Address,
    rng: &mut R,
    asset: u64,
    liquidity: U256,
    timestamp: u64,
) -> Result<Commitment, WalletError>
where
    W: Wallet,
    R: RngCore + CryptoRng,
{
    let secret = random_u256(rng);
    let nullifier = random_u256(rng);

    let data = IVault::generateLeafCall {
        secret,
        nullifier,
        asset: U256::from(asset),
        liquidity,
        timestamp: U256::from(timestamp),
    }
    .abi_encode();

    let ret = wallet
        .call(&CallRequest {
            to: vault,
            data: data.into(),
            value: U256::ZERO,
        })
        .await?;

    // A single uint256 return is one ABI word.
    if ret.len() < 32 {
        return Err(WalletError::Rpc(format!(
            "generateLeaf returned {} bytes, expected 32",
            ret.len()
        )));
    }
    let leaf = B256::from_slice(&ret[..32]);
    debug!(%leaf, asset, %liquidity, timestamp, "leaf derived");

    Ok(Commitment {
        secret,
        nullifier,
        asset,
        liquidity,
        timestamp,
        leaf,
    })
}

impl Commitment {
    pub fn secret(&self) -> U256 {
        self.secret
    }

    pub fn nullifier(&self) -> U256 {
        self.nullifier
    }

    pub fn asset(&self) -> u64 {
        self.asset
    }

    /// Deposit amount in wei.
    pub fn liquidity(&self) -> U256 {
        self.liquidity
    }

    /// Unix seconds, fixed at generation.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn leaf(&self) -> B256 {
        self.leaf
    }

    /// Render the prover artifact. Key order is fixed.
    pub fn to_prover_toml(&self) -> Result<String, ArtifactError> {
        toml::to_string(&DepositProverInput::from(self))
            .map_err(|e| ArtifactError::Malformed(e.to_string()))
    }

    /// Parse a deposit artifact. Any valid TOML spelling of the six keys is
    /// accepted; unknown keys are ignored.
    pub fn from_prover_toml(text: &str) -> Result<Self, ArtifactError> {
        let artifact: DepositArtifact =
            toml::from_str(text).map_err(|e| ArtifactError::Malformed(e.message().to_string()))?;

        let leaf_hex = required(&artifact.leaf, "leaf")?;
        let leaf_digits = leaf_hex.strip_prefix("0x").unwrap_or(leaf_hex);
        let leaf_bytes = hex::decode(leaf_digits).map_err(|_| invalid("leaf", leaf_hex))?;
        if leaf_bytes.len() != 32 {
            return Err(invalid("leaf", leaf_hex));
        }

        Ok(Commitment {
            secret: uint_value("secret", required(&artifact.secret, "secret")?)?,
            nullifier: uint_value("nullifier", required(&artifact.nullifier, "nullifier")?)?,
            asset: small_value("asset", required(&artifact.asset, "asset")?)?,
            liquidity: uint_value("liquidity", required(&artifact.liquidity, "liquidity")?)?,
            timestamp: small_value("timestamp", required(&artifact.timestamp, "timestamp")?)?,
            leaf: B256::from_slice(&leaf_bytes),
        })
    }
}

/// Deposit circuit input as written to `Prover.toml`. Field order is key order.
#[derive(Serialize)]
struct DepositProverInput {
    secret: String,
    nullifier: String,
    asset: String,
    liquidity: String,
    timestamp: String,
    leaf: String,
}

impl From<&Commitment> for DepositProverInput {
    fn from(c: &Commitment) -> Self {
        Self {
            secret: c.secret.to_string(),
            nullifier: c.nullifier.to_string(),
            asset: c.asset.to_string(),
            liquidity: c.liquidity.to_string(),
            timestamp: c.timestamp.to_string(),
            leaf: format!("0x{}", hex::encode(c.leaf)),
        }
    }
}

/// Keys are optional so a missing one is reported by name.
#[derive(Deserialize)]
struct DepositArtifact {
    secret: Option<String>,
    nullifier: Option<String>,
    asset: Option<String>,
    liquidity: Option<String>,
    timestamp: Option<String>,
    leaf: Option<String>,
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ArtifactError> {
    value
        .as_deref()
        .map(str::trim)
        .ok_or(ArtifactError::MissingField(name))
}

fn invalid(field: &'static str, value: &str) -> ArtifactError {
    ArtifactError::InvalidValue {
        field,
        value: value.to_string(),
    }
}

fn uint_value(name: &'static str, v: &str) -> Result<U256, ArtifactError> {
    U256::from_str_radix(v, 10).map_err(|_| invalid(name, v))
}

fn small_value(name: &'static str, v: &str) -> Result<u64, ArtifactError> {
    v.parse().map_err(|_| invalid(name, v))
}
