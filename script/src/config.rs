//! Environment configuration.
//!
//! Required env vars (from .env):
//!   RPC_URL                 JSON-RPC endpoint
//!
//! Optional env vars:
//!   PRIVATE_KEY             Signing key. Without it the session is read-only.
//!   VAULT_ADDRESS           Deployed vault (default: local devnet deployment)
//!   GRACE_OFFSET_SECS       Added to the commitment timestamp (default: 0)
//!   VALIDITY_WINDOW_SECS    Seconds a commitment stays submittable (default: 60)
//!   CONFIRMATIONS           Blocks to wait for (default: 1)

use std::env;
use std::str::FromStr;

use alloy::primitives::{address, Address};
use anyhow::{Context, Result};
use shielded_vault_lib::{PipelineConfig, RpcWallet};

pub const DEFAULT_VAULT_ADDRESS: Address = address!("Dc64a140Aa3E981100a9becA4E685f962f0cF6C9");

pub struct Config {
    pub rpc_url: String,
    pub private_key: Option<String>,
    pub pipeline: PipelineConfig,
}

fn optional<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => {
            let value = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid {name}: {raw}"))?;
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let rpc_url = env::var("RPC_URL").context("RPC_URL not set")?;
        let private_key = env::var("PRIVATE_KEY").ok().filter(|k| !k.is_empty());

        let mut pipeline =
            PipelineConfig::new(optional("VAULT_ADDRESS")?.unwrap_or(DEFAULT_VAULT_ADDRESS));
        if let Some(secs) = optional("GRACE_OFFSET_SECS")? {
            pipeline.grace_offset_secs = secs;
        }
        if let Some(secs) = optional("VALIDITY_WINDOW_SECS")? {
            pipeline.validity_window_secs = secs;
        }
        if let Some(n) = optional("CONFIRMATIONS")? {
            pipeline.confirmations = n;
        }

        Ok(Config {
            rpc_url,
            private_key,
            pipeline,
        })
    }

    pub fn connect(&self) -> Result<RpcWallet> {
        RpcWallet::connect(&self.rpc_url, self.private_key.as_deref())
            .with_context(|| format!("failed to connect to {}", self.rpc_url))
    }
}
