use alloy::primitives::{B256, U256};
use shielded_vault_lib::{
    Commitment, ManualClock, Operation, Phase, Pipeline, PipelineConfig, PipelineError,
    ProofPackage, TickOutcome, NATIVE_ASSET,
};

use crate::mock_vault::{proof_file, MockVault, VaultCall, SIGNER_ADDRESS, VAULT_ADDRESS};

const START: u64 = 1_700_000_000;

fn one_eth() -> U256 {
    U256::from(10u64).pow(U256::from(18u64))
}

fn pipeline(clock: &ManualClock) -> Pipeline<MockVault, &ManualClock> {
    Pipeline::new(MockVault::new(), clock, PipelineConfig::new(VAULT_ADDRESS))
}

fn word_hex(value: U256) -> String {
    format!("0x{}", hex::encode(B256::from(value)))
}

/// Proof file the external prover would emit for `commitment`.
fn deposit_file(commitment: &Commitment, proof: &[u8]) -> Vec<u8> {
    proof_file(
        &[
            B256::from(U256::from(commitment.asset())),
            B256::from(commitment.liquidity()),
            B256::from(U256::from(commitment.timestamp())),
            commitment.leaf(),
        ],
        proof,
    )
}

#[tokio::test]
async fn test_deposit_happy_path() {
    let clock = ManualClock::new(START);
    let mut p = pipeline(&clock);

    let commitment = p.generate(NATIVE_ASSET, one_eth()).await.unwrap().clone();
    assert_eq!(p.phase(), &Phase::CommitmentPending);
    assert_eq!(commitment.timestamp(), START);
    assert_eq!(p.state().remaining_secs(), Some(60));

    let toml = commitment.to_prover_toml().unwrap();
    let keys: Vec<&str> = toml
        .lines()
        .map(|l| l.split(" = ").next().unwrap())
        .collect();
    assert_eq!(keys, ["secret", "nullifier", "asset", "liquidity", "timestamp", "leaf"]);
    assert!(toml.contains("liquidity = \"1000000000000000000\""));

    clock.advance(20);
    assert_eq!(p.tick(), TickOutcome::Running { remaining: 40 });

    let proof = b"opaque-proof-bytes".to_vec();
    p.parse_proof(&deposit_file(&commitment, &proof)).unwrap();
    assert_eq!(p.phase(), &Phase::PackageParsed);

    let receipt = p.submit().await.unwrap();
    assert!(receipt.success);
    assert_eq!(p.phase(), &Phase::Succeeded);
    assert!(p.state().pending_commitment().is_none());
    assert!(p.state().package().is_none());
    assert_eq!(p.state().remaining_secs(), None);

    let calls = p.wallet().calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[1],
        VaultCall::Deposit {
            from: SIGNER_ADDRESS,
            proof: proof.into(),
            public_inputs: vec![
                B256::ZERO,
                B256::from(one_eth()),
                B256::from(U256::from(START)),
                commitment.leaf(),
            ],
            value: one_eth(),
        }
    );

    assert_eq!(p.pool_balance().await.unwrap(), "1.000000000000000000");

    // Timer was cancelled by the successful submission.
    clock.advance(120);
    assert_eq!(p.tick(), TickOutcome::Inactive);
    assert_eq!(p.phase(), &Phase::Succeeded);
}

#[tokio::test]
async fn test_leaf_derivation_receives_commitment_fields() {
    let clock = ManualClock::new(START);
    let mut p = pipeline(&clock);

    let commitment = p.generate(3, one_eth()).await.unwrap().clone();
    match &p.wallet().calls()[0] {
        VaultCall::GenerateLeaf {
            secret,
            nullifier,
            asset,
            liquidity,
            timestamp,
        } => {
            assert_eq!(*secret, commitment.secret());
            assert_eq!(*nullifier, commitment.nullifier());
            assert_eq!(*asset, U256::from(3u64));
            assert_eq!(*liquidity, one_eth());
            assert_eq!(*timestamp, U256::from(START));
        }
        other => panic!("unexpected call {other:?}"),
    }
    assert_ne!(commitment.secret(), commitment.nullifier());
}

#[tokio::test]
async fn test_grace_offset_shifts_timestamp() {
    let clock = ManualClock::new(START);
    let mut config = PipelineConfig::new(VAULT_ADDRESS);
    config.grace_offset_secs = 30;
    let mut p = Pipeline::new(MockVault::new(), &clock, config);

    let commitment = p.generate(NATIVE_ASSET, one_eth()).await.unwrap();
    assert_eq!(commitment.timestamp(), START + 30);
    // The window still counts from generation.
    assert_eq!(p.state().remaining_secs(), Some(60));
}

#[tokio::test]
async fn test_generation_failure_keeps_previous_commitment() {
    let clock = ManualClock::new(START);
    let mut p = pipeline(&clock);

    let first = p.generate(NATIVE_ASSET, one_eth()).await.unwrap().clone();
    p.wallet().fail_leaf_derivation(true);

    let err = p.generate(NATIVE_ASSET, one_eth()).await.unwrap_err();
    assert!(matches!(err, PipelineError::GenerationFailed(_)));
    assert_eq!(p.state().pending_commitment(), Some(&first));
    assert_eq!(p.phase(), &Phase::CommitmentPending);
}

#[tokio::test]
async fn test_new_commitment_replaces_pending_and_restarts_window() {
    let clock = ManualClock::new(START);
    let mut p = pipeline(&clock);

    let first = p.generate(NATIVE_ASSET, one_eth()).await.unwrap().clone();
    p.parse_proof(&deposit_file(&first, b"p1")).unwrap();

    clock.advance(50);
    let second = p.generate(NATIVE_ASSET, one_eth()).await.unwrap().clone();
    assert_ne!(first.secret(), second.secret());
    assert_ne!(first.leaf(), second.leaf());
    assert_eq!(p.state().pending_commitment(), Some(&second));
    // The package proved the old commitment.
    assert!(p.state().package().is_none());

    clock.advance(50);
    assert_eq!(p.tick(), TickOutcome::Running { remaining: 10 });
}

#[tokio::test]
async fn test_expiry_fires_once_and_blocks_submission() {
    let clock = ManualClock::new(START);
    let mut p = pipeline(&clock);

    let commitment = p.generate(NATIVE_ASSET, one_eth()).await.unwrap().clone();
    p.parse_proof(&deposit_file(&commitment, b"proof")).unwrap();

    let mut expiries = 0;
    for _ in 0..60 {
        clock.advance(1);
        if p.tick() == TickOutcome::Expired {
            expiries += 1;
        }
    }
    for _ in 0..10 {
        clock.advance(1);
        assert_eq!(p.tick(), TickOutcome::Inactive);
    }
    assert_eq!(expiries, 1);
    assert_eq!(p.phase(), &Phase::Failed(PipelineError::ExpiredCommitment));
    assert!(p.state().pending_commitment().is_none());
    assert!(p.state().package().is_none());

    // Re-supplying the proof does not revive the commitment.
    p.parse_proof(&deposit_file(&commitment, b"proof")).unwrap();
    assert_eq!(p.submit().await, Err(PipelineError::ExpiredCommitment));
    assert_eq!(p.wallet().deposit_calls(), 0);
}

#[tokio::test]
async fn test_submit_catches_up_on_missed_ticks() {
    let clock = ManualClock::new(START);
    let mut p = pipeline(&clock);

    let commitment = p.generate(NATIVE_ASSET, one_eth()).await.unwrap().clone();
    p.parse_proof(&deposit_file(&commitment, b"proof")).unwrap();

    // No tick delivered while the clock ran past the deadline.
    clock.advance(61);
    assert_eq!(p.submit().await, Err(PipelineError::ExpiredCommitment));
    assert_eq!(p.wallet().deposit_calls(), 0);
    assert_eq!(p.wallet().signers_acquired(), 0);
}

#[tokio::test]
async fn test_fewer_than_four_inputs_makes_no_call() {
    let clock = ManualClock::new(START);
    let mut p = pipeline(&clock);

    let commitment = p.generate(NATIVE_ASSET, one_eth()).await.unwrap().clone();
    let short = ProofPackage {
        public_inputs: vec![
            word_hex(U256::from(commitment.asset())),
            word_hex(commitment.liquidity()),
            word_hex(U256::from(commitment.timestamp())),
        ],
        proof: "0xdeadbeef".into(),
    };
    p.load_package(short).unwrap();

    let err = p.submit().await.unwrap_err();
    assert!(matches!(err, PipelineError::MissingData(_)), "{err}");
    assert_eq!(p.wallet().deposit_calls(), 0);
    assert_eq!(p.wallet().signers_acquired(), 0);
}

#[tokio::test]
async fn test_submit_without_commitment_or_package() {
    let clock = ManualClock::new(START);
    let mut p = pipeline(&clock);

    assert!(matches!(p.submit().await, Err(PipelineError::MissingData(_))));

    p.generate(NATIVE_ASSET, one_eth()).await.unwrap();
    assert!(matches!(p.submit().await, Err(PipelineError::MissingData(_))));
    assert_eq!(p.wallet().deposit_calls(), 0);
}

#[tokio::test]
async fn test_truncated_file_leaves_state_untouched() {
    let clock = ManualClock::new(START);
    let mut p = pipeline(&clock);

    let commitment = p.generate(NATIVE_ASSET, one_eth()).await.unwrap().clone();
    let file = deposit_file(&commitment, b"");
    let err = p.parse_proof(&file[..127]).unwrap_err();

    assert_eq!(
        err,
        PipelineError::TruncatedInput {
            expected: 128,
            actual: 127
        }
    );
    assert_eq!(p.phase(), &Phase::CommitmentPending);
    assert!(p.state().package().is_none());
    assert_eq!(p.state().pending_commitment(), Some(&commitment));
}

#[tokio::test]
async fn test_rejected_deposit_can_be_resubmitted() {
    let clock = ManualClock::new(START);
    let mut p = pipeline(&clock);

    let commitment = p.generate(NATIVE_ASSET, one_eth()).await.unwrap().clone();
    p.parse_proof(&deposit_file(&commitment, b"proof")).unwrap();

    p.wallet().revert_next("Vault: invalid proof");
    let err = p.submit().await.unwrap_err();
    match &err {
        PipelineError::ContractRejected(reason) => assert!(reason.contains("Vault: invalid proof")),
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(p.phase(), &Phase::Failed(err.clone()));
    assert!(p.state().package().is_some());
    assert!(p.state().pending_commitment().is_some());

    // Manual retry while the window is still open.
    clock.advance(10);
    p.submit().await.unwrap();
    assert_eq!(p.phase(), &Phase::Succeeded);
    assert_eq!(p.wallet().deposit_calls(), 2);
    // One fresh signer per attempt.
    assert_eq!(p.wallet().signers_acquired(), 2);
}

#[tokio::test]
async fn test_missing_signer_is_provider_unavailable() {
    let clock = ManualClock::new(START);
    let mut p = Pipeline::new(
        MockVault::new().without_signer(),
        &clock,
        PipelineConfig::new(VAULT_ADDRESS),
    );

    let commitment = p.generate(NATIVE_ASSET, one_eth()).await.unwrap().clone();
    p.parse_proof(&deposit_file(&commitment, b"proof")).unwrap();

    let err = p.submit().await.unwrap_err();
    assert!(matches!(err, PipelineError::ProviderUnavailable(_)));
    // Nothing advanced: the package is still ready for a later attempt.
    assert_eq!(p.phase(), &Phase::PackageParsed);
    assert!(p.state().package().is_some());
    assert_eq!(p.wallet().deposit_calls(), 0);
}

#[tokio::test]
async fn test_vault_without_code_is_provider_unavailable() {
    let clock = ManualClock::new(START);
    let mut p = Pipeline::new(
        MockVault::new().without_code(),
        &clock,
        PipelineConfig::new(VAULT_ADDRESS),
    );

    let commitment = p.generate(NATIVE_ASSET, one_eth()).await.unwrap().clone();
    p.parse_proof(&deposit_file(&commitment, b"proof")).unwrap();

    let err = p.submit().await.unwrap_err();
    assert!(matches!(err, PipelineError::ProviderUnavailable(_)));
    assert_eq!(p.wallet().deposit_calls(), 0);
}

#[tokio::test]
async fn test_generation_rejected_in_withdraw_mode() {
    let clock = ManualClock::new(START);
    let mut p = pipeline(&clock);
    p.switch_operation(Operation::Withdraw).unwrap();

    let err = p.generate(NATIVE_ASSET, one_eth()).await.unwrap_err();
    assert!(matches!(err, PipelineError::WrongOperation { .. }));
    assert!(p.wallet().calls().is_empty());
}
