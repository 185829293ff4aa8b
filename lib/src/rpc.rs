use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use tracing::debug;

use crate::wallet::{CallRequest, SignerHandle, TxReceipt, Wallet, WalletError};

/// JSON-RPC backed wallet session.
///
/// Without a private key the session is read-only: balance, code and view
/// calls work, `acquire_signer` fails.
pub struct RpcWallet {
    provider: DynProvider,
    signer: Option<Address>,
}

impl RpcWallet {
    /// Connect to `rpc_url`, optionally signing with `private_key`.
    pub fn connect(rpc_url: &str, private_key: Option<&str>) -> Result<Self, WalletError> {
        match private_key {
            Some(key) => {
                let signer: PrivateKeySigner = key.parse().map_err(|e| {
                    WalletError::NoSigner(format!("invalid private key: {e}"))
                })?;
                let address = signer.address();
                let provider = ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer))
                    .connect_http(rpc_url.parse().map_err(|e| {
                        WalletError::Rpc(format!("invalid RPC URL: {e}"))
                    })?);
                Ok(Self {
                    provider: DynProvider::new(provider),
                    signer: Some(address),
                })
            }
            None => {
                let provider = ProviderBuilder::new().connect_http(rpc_url.parse().map_err(
                    |e| WalletError::Rpc(format!("invalid RPC URL: {e}")),
                )?);
                Ok(Self {
                    provider: DynProvider::new(provider),
                    signer: None,
                })
            }
        }
    }

    /// Address of the configured signer, if any.
    pub fn signer_address(&self) -> Option<Address> {
        self.signer
    }
}

/// Node errors for a failed `eth_estimateGas`/`eth_sendRawTransaction`
/// carry the revert reason in the message.
fn classify_send_error(message: String) -> WalletError {
    if message.contains("revert") {
        WalletError::Reverted(message)
    } else {
        WalletError::Rpc(message)
    }
}

impl Wallet for RpcWallet {
    async fn acquire_signer(&self) -> Result<SignerHandle, WalletError> {
        self.signer
            .map(|address| SignerHandle { address })
            .ok_or_else(|| WalletError::NoSigner("no PRIVATE_KEY configured".into()))
    }

    async fn get_balance(&self, account: Address) -> Result<U256, WalletError> {
        self.provider
            .get_balance(account)
            .await
            .map_err(|e| WalletError::Rpc(e.to_string()))
    }

    async fn get_code(&self, account: Address) -> Result<Bytes, WalletError> {
        self.provider
            .get_code_at(account)
            .await
            .map_err(|e| WalletError::Rpc(e.to_string()))
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes, WalletError> {
        let tx = TransactionRequest::default()
            .to(request.to)
            .with_input(request.data.clone());
        self.provider
            .call(tx)
            .await
            .map_err(|e| classify_send_error(e.to_string()))
    }

    async fn send_call(
        &self,
        signer: &SignerHandle,
        request: CallRequest,
        confirmations: u64,
    ) -> Result<TxReceipt, WalletError> {
        let tx = TransactionRequest::default()
            .with_from(signer.address)
            .to(request.to)
            .with_input(request.data)
            .with_value(request.value);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| classify_send_error(e.to_string()))?;
        debug!(tx_hash = %pending.tx_hash(), confirmations, "transaction sent");

        let receipt = pending
            .with_required_confirmations(confirmations)
            .get_receipt()
            .await
            .map_err(|e| WalletError::Rpc(e.to_string()))?;

        Ok(TxReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.unwrap_or(0),
            success: receipt.status(),
        })
    }
}
