//! Submission pipeline: one deposit or withdraw cycle, from commitment to
//! confirmed transaction.
//!
//! All session state lives in a single [`SubmissionState`] owned by the
//! [`Pipeline`]. It changes only through `generate`, `parse_proof` /
//! `load_package`, `submit`, `tick` and `switch_operation`.
//!
//! Public inputs are forwarded to the vault in the order the proof file
//! carries them:
//!
//! ```text
//! deposit:  [asset, liquidity, timestamp, leaf]                  value = liquidity
//! withdraw: [recipient, current_timestamp, asset, liquidity, root, nullifier_hash]
//! ```

use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::SolCall;
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::codec::{self, CodecError, ProofPackage};
use crate::commitment::{self, Commitment};
use crate::operation::Operation;
use crate::wallet::{CallRequest, IVault, TxReceipt, Wallet, WalletError};
use crate::window::{Countdown, WindowState, DEFAULT_VALIDITY_SECS};

/// Everything that can stop a cycle. None of these are retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("leaf generation failed: {0}")]
    GenerationFailed(String),

    #[error("proof file truncated: need at least {expected} bytes of public inputs, got {actual}")]
    TruncatedInput { expected: usize, actual: usize },

    #[error("malformed public input: {0}")]
    MalformedWord(String),

    #[error("commitment expired before submission, generate a new one")]
    ExpiredCommitment,

    #[error("contract rejected the call: {0}")]
    ContractRejected(String),

    #[error("wallet provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("missing data: {0}")]
    MissingData(String),

    #[error("{action} is not available in {operation} mode")]
    WrongOperation {
        action: &'static str,
        operation: Operation,
    },

    #[error("a submission is already in flight")]
    Busy,
}

impl From<CodecError> for PipelineError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::TruncatedInput { expected, actual } => {
                PipelineError::TruncatedInput { expected, actual }
            }
            CodecError::MalformedWord(word) => PipelineError::MalformedWord(word),
        }
    }
}

/// Where the current cycle stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    CommitmentPending,
    PackageParsed,
    Submitting,
    Succeeded,
    Failed(PipelineError),
}

/// Outcome of advancing the validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No commitment is waiting.
    Inactive,
    Running { remaining: u64 },
    /// The pending commitment was just invalidated. Reported once.
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub vault: Address,
    /// Added to `now` when stamping a commitment, to absorb proving latency.
    pub grace_offset_secs: u64,
    pub validity_window_secs: u64,
    pub confirmations: u64,
}

impl PipelineConfig {
    pub fn new(vault: Address) -> Self {
        PipelineConfig {
            vault,
            grace_offset_secs: 0,
            validity_window_secs: DEFAULT_VALIDITY_SECS,
            confirmations: 1,
        }
    }
}

/// Session data for the active operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionState {
    operation: Operation,
    pending: Option<Commitment>,
    package: Option<ProofPackage>,
    window: Option<Countdown>,
    /// Set when the window ran out, until a new commitment or a switch.
    commitment_expired: bool,
}

impl SubmissionState {
    fn new(operation: Operation) -> Self {
        SubmissionState {
            operation,
            pending: None,
            package: None,
            window: None,
            commitment_expired: false,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn pending_commitment(&self) -> Option<&Commitment> {
        self.pending.as_ref()
    }

    pub fn package(&self) -> Option<&ProofPackage> {
        self.package.as_ref()
    }

    /// Seconds left on the validity window, if one is running.
    pub fn remaining_secs(&self) -> Option<u64> {
        self.window.map(|w| w.remaining())
    }
}

pub struct Pipeline<W, C> {
    wallet: W,
    clock: C,
    config: PipelineConfig,
    state: SubmissionState,
    phase: Phase,
}

impl<W: Wallet, C: Clock> Pipeline<W, C> {
    /// New pipeline in deposit mode.
    pub fn new(wallet: W, clock: C, config: PipelineConfig) -> Self {
        Pipeline {
            wallet,
            clock,
            config,
            state: SubmissionState::new(Operation::Deposit),
            phase: Phase::Idle,
        }
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn operation(&self) -> Operation {
        self.state.operation
    }

    fn ensure_not_submitting(&self) -> Result<(), PipelineError> {
        if self.phase == Phase::Submitting {
            return Err(PipelineError::Busy);
        }
        Ok(())
    }

    // =========================================================================
    //                              TRANSITIONS
    // =========================================================================

    /// Mint a commitment for `liquidity` wei of `asset` and start its
    /// validity window. Replaces any pending commitment.
    ///
    /// On failure the previous state is left as it was.
    pub async fn generate(
        &mut self,
        asset: u64,
        liquidity: U256,
    ) -> Result<&Commitment, PipelineError> {
        self.ensure_not_submitting()?;
        if self.state.operation != Operation::Deposit {
            return Err(PipelineError::WrongOperation {
                action: "commitment generation",
                operation: self.state.operation,
            });
        }

        let timestamp = self
            .clock
            .now()
            .checked_add(self.config.grace_offset_secs)
            .ok_or_else(|| {
                PipelineError::GenerationFailed(format!(
                    "grace offset of {}s overflows the commitment timestamp",
                    self.config.grace_offset_secs
                ))
            })?;
        let commitment = commitment::generate(
            &self.wallet,
            self.config.vault,
            &mut OsRng,
            asset,
            liquidity,
            timestamp,
        )
        .await
        .map_err(|e| {
            warn!(error = %e, "leaf derivation failed");
            PipelineError::GenerationFailed(e.to_string())
        })?;

        if self.state.pending.is_some() {
            info!("replacing pending commitment");
        }
        info!(
            leaf = %commitment.leaf(),
            timestamp = commitment.timestamp(),
            window_secs = self.config.validity_window_secs,
            "commitment generated"
        );

        self.state.package = None;
        self.state.commitment_expired = false;
        self.state.window = Some(Countdown::start(
            self.config.validity_window_secs,
            self.clock.now(),
        ));
        self.phase = Phase::CommitmentPending;
        Ok(self.state.pending.insert(commitment))
    }

    /// Decode a proof file for the active operation.
    ///
    /// A truncated file leaves the pipeline untouched.
    pub fn parse_proof(&mut self, buffer: &[u8]) -> Result<&ProofPackage, PipelineError> {
        self.ensure_not_submitting()?;
        let package = codec::decode(buffer, self.state.operation.input_count())?;
        self.load_package(package)
    }

    /// Attach an already decoded package. Its word count is checked at
    /// submission.
    pub fn load_package(&mut self, package: ProofPackage) -> Result<&ProofPackage, PipelineError> {
        self.ensure_not_submitting()?;
        self.phase = Phase::PackageParsed;
        Ok(self.state.package.insert(package))
    }

    /// Advance the validity window to the clock's current second.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(countdown) = self.state.window.take() else {
            return TickOutcome::Inactive;
        };

        match countdown.advance(self.clock.now()) {
            WindowState::Running(next) => {
                self.state.window = Some(next);
                TickOutcome::Running {
                    remaining: next.remaining(),
                }
            }
            WindowState::Expired => {
                warn!("commitment validity window elapsed, commitment discarded");
                self.state.pending = None;
                self.state.package = None;
                self.state.commitment_expired = true;
                self.phase = Phase::Failed(PipelineError::ExpiredCommitment);
                TickOutcome::Expired
            }
        }
    }

    /// Make `operation` active. Pending data of the other operation is
    /// discarded.
    pub fn switch_operation(&mut self, operation: Operation) -> Result<(), PipelineError> {
        self.ensure_not_submitting()?;
        if operation == self.state.operation {
            return Ok(());
        }
        info!(from = %self.state.operation, to = %operation, "switching operation");
        self.state = SubmissionState::new(operation);
        self.phase = Phase::Idle;
        Ok(())
    }

    /// Send the loaded package to the vault and wait for confirmation.
    ///
    /// Validation failures make no external call. A rejected call keeps the
    /// package loaded so it can be resubmitted by hand.
    pub async fn submit(&mut self) -> Result<TxReceipt, PipelineError> {
        self.ensure_not_submitting()?;
        self.tick();

        let request = self.prepare_call()?;
        let in_flight = InFlight::begin(&mut self.phase);

        match send(&self.wallet, &self.config, request).await {
            Ok(receipt) => {
                in_flight.settle(Phase::Succeeded);
                info!(
                    operation = %self.state.operation,
                    tx_hash = %receipt.tx_hash,
                    block = receipt.block_number,
                    "submission confirmed"
                );
                self.state.pending = None;
                self.state.package = None;
                self.state.window = None;
                Ok(receipt)
            }
            Err(err @ PipelineError::ProviderUnavailable(_)) => {
                warn!(error = %err, "no usable wallet session");
                in_flight.restore();
                Err(err)
            }
            Err(err) => {
                warn!(error = %err, "submission failed");
                in_flight.settle(Phase::Failed(err.clone()));
                Err(err)
            }
        }
    }

    /// Native balance held by the vault, in ether.
    pub async fn pool_balance(&self) -> Result<String, PipelineError> {
        let wei = self
            .wallet
            .get_balance(self.config.vault)
            .await
            .map_err(|e| PipelineError::ProviderUnavailable(e.to_string()))?;
        Ok(format_ether(wei))
    }

    // =========================================================================
    //                              CALL BUILDING
    // =========================================================================

    fn prepare_call(&self) -> Result<CallRequest, PipelineError> {
        let operation = self.state.operation;

        let pending = match operation {
            Operation::Deposit => match &self.state.pending {
                Some(commitment) => Some(commitment),
                None if self.state.commitment_expired => {
                    return Err(PipelineError::ExpiredCommitment)
                }
                None => {
                    return Err(PipelineError::MissingData(
                        "no pending commitment, generate one first".into(),
                    ))
                }
            },
            Operation::Withdraw => None,
        };

        let package = self
            .state
            .package
            .as_ref()
            .ok_or_else(|| PipelineError::MissingData("no proof package loaded".into()))?;
        let expected = operation.input_count();
        if package.input_count() != expected {
            return Err(PipelineError::MissingData(format!(
                "{operation} needs {expected} public inputs, package has {}",
                package.input_count()
            )));
        }

        let words = package.words()?;
        let proof = package.proof_bytes()?;

        let (data, value) = match (operation, pending) {
            (Operation::Deposit, Some(commitment)) => {
                let public_inputs: [B256; 4] = to_array(words)?;
                let call = IVault::depositCall {
                    proof,
                    publicInputs: public_inputs,
                };
                (call.abi_encode(), commitment.liquidity())
            }
            (Operation::Withdraw, _) => {
                let public_inputs: [B256; 6] = to_array(words)?;
                let call = IVault::withdrawCall {
                    proof,
                    publicInputs: public_inputs,
                };
                (call.abi_encode(), U256::ZERO)
            }
            (Operation::Deposit, None) => {
                return Err(PipelineError::MissingData("no pending commitment".into()))
            }
        };

        Ok(CallRequest {
            to: self.config.vault,
            data: data.into(),
            value,
        })
    }
}

/// Sign, send and confirm one vault call.
async fn send<W: Wallet>(
    wallet: &W,
    config: &PipelineConfig,
    request: CallRequest,
) -> Result<TxReceipt, PipelineError> {
    let signer = wallet
        .acquire_signer()
        .await
        .map_err(|e| PipelineError::ProviderUnavailable(e.to_string()))?;

    let code = wallet
        .get_code(config.vault)
        .await
        .map_err(|e| PipelineError::ProviderUnavailable(e.to_string()))?;
    if code.is_empty() {
        return Err(PipelineError::ProviderUnavailable(format!(
            "no vault contract deployed at {}",
            config.vault
        )));
    }

    let receipt = wallet
        .send_call(&signer, request, config.confirmations)
        .await
        .map_err(|e| match e {
            WalletError::NoSigner(reason) => PipelineError::ProviderUnavailable(reason),
            other => PipelineError::ContractRejected(other.to_string()),
        })?;

    if !receipt.success {
        return Err(PipelineError::ContractRejected(format!(
            "transaction {} reverted",
            receipt.tx_hash
        )));
    }
    Ok(receipt)
}

/// Holds the phase at `Submitting` for one submission. Dropping it without
/// settling, as happens when the submit future is cancelled, puts the
/// previous phase back.
struct InFlight<'a> {
    phase: &'a mut Phase,
    previous: Option<Phase>,
}

impl<'a> InFlight<'a> {
    fn begin(phase: &'a mut Phase) -> Self {
        let previous = std::mem::replace(phase, Phase::Submitting);
        InFlight {
            phase,
            previous: Some(previous),
        }
    }

    fn settle(mut self, next: Phase) {
        self.previous = None;
        *self.phase = next;
    }

    fn restore(mut self) {
        if let Some(previous) = self.previous.take() {
            *self.phase = previous;
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            warn!("submission abandoned before completion");
            *self.phase = previous;
        }
    }
}

fn to_array<const N: usize>(words: Vec<B256>) -> Result<[B256; N], PipelineError> {
    let len = words.len();
    words.try_into().map_err(|_| {
        PipelineError::MissingData(format!("expected {N} public inputs, got {len}"))
    })
}
