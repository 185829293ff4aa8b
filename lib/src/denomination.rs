use core::fmt;
use core::str::FromStr;

use alloy::primitives::utils::parse_ether;
use alloy::primitives::U256;
use thiserror::Error;

/// Deposit amounts the vault accepts, in ether.
pub const DENOMINATIONS: [&str; 5] = ["0.05", "0.1", "1", "10", "100"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported deposit amount '{0}' (choose one of 0.05, 0.1, 1, 10, 100 ETH)")]
pub struct DenominationError(pub String);

/// One of the fixed deposit amounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Denomination(&'static str);

impl Denomination {
    pub fn all() -> impl Iterator<Item = Denomination> {
        DENOMINATIONS.iter().copied().map(Denomination)
    }

    /// Amount in wei.
    pub fn liquidity(&self) -> U256 {
        // Menu entries are valid decimal ether amounts.
        parse_ether(self.0).unwrap_or_default()
    }

    pub fn ether(&self) -> &'static str {
        self.0
    }
}

impl FromStr for Denomination {
    type Err = DenominationError;

    /// Accepts any spelling of a menu amount (`1`, `1.0`, `.1`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wei = parse_ether(s.trim()).map_err(|_| DenominationError(s.to_string()))?;
        Denomination::all()
            .find(|d| d.liquidity() == wei)
            .ok_or_else(|| DenominationError(s.to_string()))
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ETH", self.0)
    }
}
