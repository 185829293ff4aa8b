//! Proof artifact codec.
//!
//! A proof file produced by the external prover is laid out as
//!
//! ```text
//! [input_count × 32-byte big-endian public inputs][proof bytes ...]
//! ```
//!
//! The layout is not self-describing: the caller says how many words lead
//! the buffer (4 for deposit, 6 for withdraw).

use alloy::primitives::{Bytes, B256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::operation::Operation;

/// Size of one public input word in bytes.
pub const WORD_SIZE: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("proof file truncated: need at least {expected} bytes of public inputs, got {actual}")]
    TruncatedInput { expected: usize, actual: usize },

    #[error("malformed 32-byte word '{0}'")]
    MalformedWord(String),
}

/// Decoded proof artifact.
///
/// Words are kept in their rendered form (`0x` + 64 lowercase hex digits)
/// and only turned back into `B256` when a contract call is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofPackage {
    /// Public inputs in wire order.
    pub public_inputs: Vec<String>,
    /// Opaque proof blob, `0x`-prefixed.
    pub proof: String,
}

// =============================================================================
//                              DECODE / ENCODE
// =============================================================================

/// Split a proof artifact into `input_count` public input words and the
/// trailing proof bytes. Fails without a partial result when the buffer
/// cannot hold all words.
pub fn decode(buffer: &[u8], input_count: usize) -> Result<ProofPackage, CodecError> {
    let header_len = input_count * WORD_SIZE;
    if buffer.len() < header_len {
        return Err(CodecError::TruncatedInput {
            expected: header_len,
            actual: buffer.len(),
        });
    }

    let (header, proof) = buffer.split_at(header_len);
    let public_inputs = header
        .chunks_exact(WORD_SIZE)
        .map(|word| format!("0x{}", hex::encode(word)))
        .collect();

    Ok(ProofPackage {
        public_inputs,
        proof: format!("0x{}", hex::encode(proof)),
    })
}

/// Inverse of [`decode`]: concatenate the words and proof back into the
/// original artifact bytes.
pub fn encode(package: &ProofPackage) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(package.public_inputs.len() * WORD_SIZE);
    for word in &package.public_inputs {
        out.extend_from_slice(canonical_word(word)?.as_slice());
    }
    out.extend_from_slice(&package.proof_bytes()?);
    Ok(out)
}

/// Canonicalize a hex string into a zero-padded 32-byte big-endian word.
///
/// Accepts an optional `0x` prefix and up to 64 hex digits; shorter values
/// are left-padded, so `0x1` and `0x00..01` map to the same word.
pub fn canonical_word(value: &str) -> Result<B256, CodecError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    if digits.is_empty() || digits.len() > WORD_SIZE * 2 {
        return Err(CodecError::MalformedWord(value.to_string()));
    }
    let padded = format!("{digits:0>64}");
    let bytes = hex::decode(&padded).map_err(|_| CodecError::MalformedWord(value.to_string()))?;
    Ok(B256::from_slice(&bytes))
}

impl ProofPackage {
    /// Number of public input words.
    pub fn input_count(&self) -> usize {
        self.public_inputs.len()
    }

    /// Canonicalized public inputs, in order.
    pub fn words(&self) -> Result<Vec<B256>, CodecError> {
        self.public_inputs.iter().map(|w| canonical_word(w)).collect()
    }

    /// Raw proof bytes.
    pub fn proof_bytes(&self) -> Result<Bytes, CodecError> {
        let digits = self.proof.strip_prefix("0x").unwrap_or(&self.proof);
        hex::decode(digits)
            .map(Bytes::from)
            .map_err(|_| CodecError::MalformedWord(self.proof.clone()))
    }

    /// Pair every word with its positional label for `operation`.
    ///
    /// Labels follow position only. Extra words beyond the operation's
    /// layout are dropped, missing ones are simply absent.
    pub fn labelled(&self, operation: Operation) -> Vec<(&'static str, &str)> {
        operation
            .labels()
            .iter()
            .zip(&self.public_inputs)
            .map(|(label, word)| (*label, word.as_str()))
            .collect()
    }
}

// =============================================================================
//                              TESTS
// =============================================================================
