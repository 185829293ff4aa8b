use core::fmt;
use core::str::FromStr;

/// Positional labels of the deposit circuit's public inputs.
pub const DEPOSIT_LABELS: [&str; 4] = ["Asset", "Liquidity", "Timestamp", "Leaf"];

/// Positional labels of the withdraw circuit's public inputs.
pub const WITHDRAW_LABELS: [&str; 6] = [
    "Recipient",
    "Current Timestamp",
    "Asset",
    "Liquidity",
    "Root",
    "Nullifier Hash",
];

/// The two vault operations. Each fixes the shape of its proof artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Deposit,
    Withdraw,
}

impl Operation {
    /// Number of 32-byte public inputs that lead the proof artifact.
    pub const fn input_count(self) -> usize {
        match self {
            Operation::Deposit => DEPOSIT_LABELS.len(),
            Operation::Withdraw => WITHDRAW_LABELS.len(),
        }
    }

    /// Labels in wire order. Part of the contract ABI; never reorder.
    pub const fn labels(self) -> &'static [&'static str] {
        match self {
            Operation::Deposit => &DEPOSIT_LABELS,
            Operation::Withdraw => &WITHDRAW_LABELS,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Deposit => f.write_str("deposit"),
            Operation::Withdraw => f.write_str("withdraw"),
        }
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deposit" => Ok(Operation::Deposit),
            "withdraw" => Ok(Operation::Withdraw),
            other => Err(format!("unknown operation '{other}' (expected deposit or withdraw)")),
        }
    }
}
