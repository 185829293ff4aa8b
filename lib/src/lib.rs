//! Client-side core of the shielded vault: commitment minting, proof
//! artifact decoding and the deposit/withdraw submission pipeline.
//!
//! Proving and the vault contract itself are external. This crate only
//! prepares what goes into the prover and maps what comes out of it onto
//! the vault's ABI.

pub mod clock;
pub mod codec;
pub mod commitment;
pub mod denomination;
pub mod operation;
pub mod pipeline;
pub mod rpc;
pub mod wallet;
pub mod window;
pub mod witness;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{canonical_word, decode, encode, CodecError, ProofPackage};
pub use commitment::{ArtifactError, Commitment, NATIVE_ASSET};
pub use denomination::{Denomination, DenominationError};
pub use operation::Operation;
pub use pipeline::{Phase, Pipeline, PipelineConfig, PipelineError, SubmissionState, TickOutcome};
pub use rpc::RpcWallet;
pub use wallet::{CallRequest, IVault, SignerHandle, TxReceipt, Wallet, WalletError};
pub use window::{Countdown, WindowState};
pub use witness::{WithdrawWitness, WitnessError};
