use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Contract bindings (calldata only, the wallet capability sends the bytes)
// ---------------------------------------------------------------------------

sol! {
    interface IVault {
        function generateLeaf(
            uint256 secret,
            uint256 nullifier,
            uint256 asset,
            uint256 liquidity,
            uint256 timestamp
        ) external view returns (uint256);

        function deposit(bytes calldata proof, bytes32[4] calldata publicInputs) external payable;

        function withdraw(bytes calldata proof, bytes32[6] calldata publicInputs) external;
    }
}

/// Errors raised by a wallet/provider implementation.
#[derive(Debug, Clone, Error)]
pub enum WalletError {
    #[error("no signer available: {0}")]
    NoSigner(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("transaction reverted: {0}")]
    Reverted(String),
}

/// Handle to the account that signs one submission. Holds no key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignerHandle {
    pub address: Address,
}

/// A contract call, read-only or state-changing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

/// Transaction receipt information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: u64,
    /// Whether the transaction succeeded
    pub success: bool,
}

/// Capability the pipeline needs from the user's wallet session.
///
/// The session (keys, connection, chain selection) belongs to the
/// implementation. The pipeline asks for a fresh [`SignerHandle`] on every
/// submission and never caches it.
pub trait Wallet {
    /// Acquire the account that will sign the next transaction.
    fn acquire_signer(
        &self,
    ) -> impl core::future::Future<Output = Result<SignerHandle, WalletError>>;

    /// Native balance of `account`, in wei.
    fn get_balance(
        &self,
        account: Address,
    ) -> impl core::future::Future<Output = Result<U256, WalletError>>;

    /// Deployed bytecode at `account` (empty when nothing is deployed).
    fn get_code(
        &self,
        account: Address,
    ) -> impl core::future::Future<Output = Result<Bytes, WalletError>>;

    /// Execute a `view` call and return the raw return data.
    fn call(
        &self,
        request: &CallRequest,
    ) -> impl core::future::Future<Output = Result<Bytes, WalletError>>;

    /// Sign and send a transaction, then wait for `confirmations` blocks.
    fn send_call(
        &self,
        signer: &SignerHandle,
        request: CallRequest,
        confirmations: u64,
    ) -> impl core::future::Future<Output = Result<TxReceipt, WalletError>>;
}
