//! Shielded vault client CLI.
//!
//! Subcommands:
//!   generate         - Mint a commitment and write the prover artifact (no deposit)
//!   inspect          - Decode a proof file and print its labelled public inputs
//!   withdraw-inputs  - Build the withdraw circuit's Prover.toml
//!   withdraw         - Decode a withdraw proof and submit it
//!   balance          - Print the vault's native balance
//!   session          - Interactive deposit/withdraw session with a live countdown

mod config;
mod session;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shielded_vault_lib::{
    decode, Clock, Commitment, Denomination, Operation, Pipeline, ProofPackage, SystemClock,
    WithdrawWitness, NATIVE_ASSET,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "shielded-vault")]
#[command(about = "Client for the shielded vault: commitments, proof files and submissions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a deposit commitment for inspection only
    ///
    /// The validity window ends with this process, so a commitment minted
    /// here cannot be deposited. Use `session` to generate and deposit.
    Generate {
        /// Deposit amount in ETH (0.05, 0.1, 1, 10 or 100)
        #[arg(long)]
        amount: Denomination,
        /// Asset id
        #[arg(long, default_value_t = NATIVE_ASSET)]
        asset: u64,
        /// Path to write the prover artifact
        #[arg(long, default_value = "Prover.toml")]
        out: PathBuf,
    },
    /// Decode a proof file without submitting it
    Inspect {
        /// deposit or withdraw
        #[arg(long)]
        kind: Operation,
        /// Path to the prover's output file
        #[arg(long)]
        proof: PathBuf,
        /// Print the package as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },
    /// Write the withdraw circuit's Prover.toml
    WithdrawInputs {
        /// Directory with root.txt, nullifier_hash.txt and the Merkle path files
        #[arg(long)]
        data: PathBuf,
        /// Deposit artifact to take secret, nullifier and amounts from
        #[arg(long)]
        deposit: Option<PathBuf>,
        /// Path to write the withdraw Prover.toml
        #[arg(long)]
        out: PathBuf,
    },
    /// Submit a withdraw proof
    Withdraw {
        /// Path to the prover's output file
        #[arg(long)]
        proof: PathBuf,
    },
    /// Print the vault's balance
    Balance,
    /// Interactive session
    Session,
}

fn setup_logger() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { amount, asset, out } => generate(amount, asset, out).await,
        Commands::Inspect { kind, proof, json } => inspect(kind, proof, json),
        Commands::WithdrawInputs { data, deposit, out } => withdraw_inputs(data, deposit, out),
        Commands::Withdraw { proof } => withdraw(proof).await,
        Commands::Balance => balance().await,
        Commands::Session => session::run(Config::from_env()?).await,
    }
}

async fn generate(amount: Denomination, asset: u64, out: PathBuf) -> Result<()> {
    let config = Config::from_env()?;
    let mut pipeline = Pipeline::new(config.connect()?, SystemClock, config.pipeline.clone());

    let commitment = pipeline.generate(asset, amount.liquidity()).await?;
    fs::write(&out, commitment.to_prover_toml()?)
        .with_context(|| format!("failed to write {}", out.display()))?;

    println!("[deposit] {amount} commitment");
    println!("[deposit] Leaf:      {}", commitment.leaf());
    println!("[deposit] Timestamp: {}", commitment.timestamp());
    println!("[deposit] Artifact written to {}", out.display());
    println!(
        "[deposit] The {}s validity window closed with this command; use `session` to deposit",
        config.pipeline.validity_window_secs
    );
    Ok(())
}

fn read_package(kind: Operation, path: &Path) -> Result<ProofPackage> {
    let buffer = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let package = decode(&buffer, kind.input_count())
        .with_context(|| format!("{} is not a {kind} proof file", path.display()))?;
    Ok(package)
}

fn print_package(kind: Operation, package: &ProofPackage) {
    for (label, value) in package.labelled(kind) {
        println!("[{kind}] {label:<18} {value}");
    }
    println!("[{kind}] Proof size: {} bytes", package.proof.len().saturating_sub(2) / 2);
}

fn inspect(kind: Operation, proof: PathBuf, json: bool) -> Result<()> {
    let package = read_package(kind, &proof)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&package)?);
    } else {
        print_package(kind, &package);
    }
    Ok(())
}

fn withdraw_inputs(data: PathBuf, deposit: Option<PathBuf>, out: PathBuf) -> Result<()> {
    let commitment = match deposit {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Some(
                Commitment::from_prover_toml(&text)
                    .with_context(|| format!("invalid deposit artifact {}", path.display()))?,
            )
        }
        None => None,
    };

    let witness = WithdrawWitness::load(&data, commitment.as_ref(), SystemClock.now())?;
    fs::write(&out, witness.to_prover_toml()?)
        .with_context(|| format!("failed to write {}", out.display()))?;
    info!(
        path_len = witness.proof_path_indices.len(),
        "withdraw witness assembled"
    );
    println!("[withdraw] Prover input written to {}", out.display());
    Ok(())
}

async fn withdraw(proof: PathBuf) -> Result<()> {
    let config = Config::from_env()?;
    let mut pipeline = Pipeline::new(config.connect()?, SystemClock, config.pipeline.clone());
    pipeline.switch_operation(Operation::Withdraw)?;

    let buffer = fs::read(&proof).with_context(|| format!("failed to read {}", proof.display()))?;
    let package = pipeline.parse_proof(&buffer)?;
    print_package(Operation::Withdraw, package);

    let receipt = pipeline.submit().await?;
    println!("[withdraw] Confirmed in block {}", receipt.block_number);
    println!("[withdraw] Tx: {}", receipt.tx_hash);
    println!("[withdraw] Pool balance: {} ETH", pipeline.pool_balance().await?);
    Ok(())
}

async fn balance() -> Result<()> {
    let config = Config::from_env()?;
    let vault = config.pipeline.vault;
    let pipeline = Pipeline::new(config.connect()?, SystemClock, config.pipeline);
    println!("Vault {vault}: {} ETH", pipeline.pool_balance().await?);
    Ok(())
}
