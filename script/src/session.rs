//! Interactive session: stdin commands with the validity countdown ticking
//! once a second alongside them.

use std::fs;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use shielded_vault_lib::{
    Denomination, Operation, Phase, Pipeline, RpcWallet, SystemClock, TickOutcome, NATIVE_ASSET,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::Config;

const HELP: &str = "\
commands:
  generate <amount> [asset]   mint a deposit commitment (0.05, 0.1, 1, 10, 100 ETH)
  load <proof file>           decode a proof file for the active operation
  submit                      send the loaded proof to the vault
  switch deposit|withdraw     change the active operation
  balance                     vault balance
  status                      current phase and countdown
  quit";

enum Flow {
    Continue,
    Quit,
}

type Session = Pipeline<RpcWallet, SystemClock>;

pub async fn run(config: Config) -> Result<()> {
    let wallet = config.connect()?;
    match wallet.signer_address() {
        Some(address) => info!(%address, "signer loaded"),
        None => info!("no PRIVATE_KEY set, submissions are disabled"),
    }
    let mut pipeline = Pipeline::new(wallet, SystemClock, config.pipeline);

    println!("{HELP}");
    prompt(&pipeline);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => report_tick(pipeline.tick()),
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match handle(&mut pipeline, line.trim()).await {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {}
                    Err(err) => println!("error: {err:#}"),
                }
                prompt(&pipeline);
            }
        }
    }
    Ok(())
}

fn report_tick(outcome: TickOutcome) {
    match outcome {
        TickOutcome::Inactive => {}
        TickOutcome::Running { remaining } => {
            debug!(remaining, "countdown");
            if remaining % 15 == 0 || remaining <= 5 {
                println!("[deposit] {remaining}s left to submit");
            }
        }
        TickOutcome::Expired => {
            println!("[deposit] Commitment expired, generate a new one");
        }
    }
}

fn prompt(pipeline: &Session) {
    println!("[{}] >", pipeline.operation());
}

async fn handle(pipeline: &mut Session, line: &str) -> Result<Flow> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(Flow::Continue);
    };

    match command {
        "generate" => {
            let amount: Denomination = parts
                .next()
                .context("usage: generate <amount> [asset]")?
                .parse()?;
            let asset = match parts.next() {
                Some(raw) => raw.parse().with_context(|| format!("invalid asset id {raw}"))?,
                None => NATIVE_ASSET,
            };
            let commitment = pipeline.generate(asset, amount.liquidity()).await?;
            let artifact = commitment.to_prover_toml()?;
            println!("[deposit] {amount} commitment, leaf {}", commitment.leaf());
            fs::write("Prover.toml", artifact).context("failed to write Prover.toml")?;
            println!("[deposit] Artifact written to Prover.toml");
        }
        "load" => {
            let path = parts.next().context("usage: load <proof file>")?;
            let buffer = fs::read(path).with_context(|| format!("failed to read {path}"))?;
            let operation = pipeline.operation();
            let package = pipeline.parse_proof(&buffer)?;
            for (label, value) in package.labelled(operation) {
                println!("[{operation}] {label:<18} {value}");
            }
        }
        "submit" => {
            let operation = pipeline.operation();
            let receipt = pipeline.submit().await?;
            println!(
                "[{operation}] Confirmed in block {}, tx {}",
                receipt.block_number, receipt.tx_hash
            );
        }
        "switch" => {
            let operation: Operation = parts
                .next()
                .context("usage: switch deposit|withdraw")?
                .parse()
                .map_err(anyhow::Error::msg)?;
            pipeline.switch_operation(operation)?;
        }
        "balance" => {
            println!("Vault balance: {} ETH", pipeline.pool_balance().await?);
        }
        "status" => {
            let state = pipeline.state();
            match pipeline.phase() {
                Phase::Failed(err) => println!("phase: failed ({err})"),
                phase => println!("phase: {phase:?}"),
            }
            if let Some(commitment) = state.pending_commitment() {
                println!("pending leaf: {}", commitment.leaf());
            }
            if let Some(remaining) = state.remaining_secs() {
                println!("window: {remaining}s left");
            }
            if let Some(package) = state.package() {
                println!("package: {} public inputs", package.input_count());
            }
        }
        "help" => println!("{HELP}"),
        "quit" | "exit" => return Ok(Flow::Quit),
        other => bail!("unknown command '{other}', try 'help'"),
    }
    Ok(Flow::Continue)
}
