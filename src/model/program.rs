use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A unique identifier for a platform user.
pub type UserId = String;

/// The system-owned sink account. Receives payouts whose intended recipient
/// cannot be resolved, and funds the joining commission.
pub const MOTHER: &str = "mother";

/// The three parallel earning programs a user can activate slots in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Program {
    Binary,
    Matrix,
    Global,
}

impl Program {
    pub fn all() -> [Program; 3] {
        [Program::Binary, Program::Matrix, Program::Global]
    }

    /// Each program settles in a single currency.
    pub fn currency(&self) -> Currency {
        match self {
            Program::Binary => Currency::Bnb,
            Program::Matrix => Currency::Usdt,
            Program::Global => Currency::Usd,
        }
    }

    /// Highest slot number offered by the program catalog.
    pub fn max_slot(&self) -> u8 {
        match self {
            Program::Binary => 16,
            Program::Matrix => 15,
            Program::Global => 16,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Program::Binary => "binary",
            Program::Matrix => "matrix",
            Program::Global => "global",
        }
    }

    pub fn parse(s: &str) -> Option<Program> {
        match s {
            "binary" => Some(Program::Binary),
            "matrix" => Some(Program::Matrix),
            "global" => Some(Program::Global),
            _ => None,
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement currency. No conversion happens anywhere in the core; every
/// balance and pool is tracked per currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    Bnb,
    Usdt,
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Bnb => "BNB",
            Currency::Usdt => "USDT",
            Currency::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Global program phase. A user's phase tree fills by BFS; completing Phase 1
/// (4 members) moves them to Phase 2 (8 members), completing Phase 2 arms the
/// next slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    P1,
    P2,
}

impl Phase {
    /// Member capacity of a phase tree.
    pub fn capacity(&self) -> u32 {
        match self {
            Phase::P1 => 4,
            Phase::P2 => 8,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::P1 => f.write_str("P1"),
            Phase::P2 => f.write_str("P2"),
        }
    }
}
