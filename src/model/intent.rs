use serde::Serialize;

use super::ledger::{FundPool, ReasonCode};
use super::program::UserId;

/// A single planned value movement produced by the routing engine.
///
/// Routing is pure: it enumerates intents and never writes. The engine turns
/// each intent into ledger entries inside the event's commit boundary, in the
/// order the routing engine enumerated them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    /// Credit a user wallet.
    Wallet {
        user: UserId,
        amount: f64,
        reason: ReasonCode,
        #[serde(skip_serializing_if = "Option::is_none")]
        level: Option<u8>,
    },
    /// Credit a user's reserve toward `target_slot` in the event's program.
    Reserve {
        user: UserId,
        target_slot: u8,
        amount: f64,
    },
    /// Credit a named pool.
    Fund {
        pool: FundPool,
        amount: f64,
        reason: ReasonCode,
    },
    /// Credit an upline's per-user newcomer fund (the deferred NGS half).
    NewcomerUpline { user: UserId, amount: f64 },
    /// A level share whose recipient was ineligible; diverted to the
    /// leadership stipend pool.
    MissedProfit {
        #[serde(skip_serializing_if = "Option::is_none")]
        intended: Option<UserId>,
        level: u8,
        amount: f64,
    },
    /// A share whose recipient could not be resolved; credited to Mother.
    Mother {
        amount: f64,
        reason: ReasonCode,
        #[serde(skip_serializing_if = "Option::is_none")]
        level: Option<u8>,
    },
    /// A credit funded by the Mother sink (joining commission, dream matrix
    /// tranches). Emits a mother debit plus a payee credit; net zero against
    /// the event's amount.
    MotherFunded {
        payee: UserId,
        amount: f64,
        reason: ReasonCode,
    },
}

impl Intent {
    pub fn amount(&self) -> f64 {
        match self {
            Intent::Wallet { amount, .. }
            | Intent::Reserve { amount, .. }
            | Intent::Fund { amount, .. }
            | Intent::NewcomerUpline { amount, .. }
            | Intent::MissedProfit { amount, .. }
            | Intent::Mother { amount, .. }
            | Intent::MotherFunded { amount, .. } => *amount,
        }
    }

    /// Whether the intent consumes part of the event's inflow. Mother-funded
    /// credits are transfers out of the sink, not part of the inflow.
    pub fn consumes_inflow(&self) -> bool {
        !matches!(self, Intent::MotherFunded { .. })
    }
}

/// Sum of all intent amounts drawn from the event's inflow. The engine
/// asserts this equals the event amount before committing (conservation).
pub fn inflow_total(intents: &[Intent]) -> f64 {
    intents
        .iter()
        .filter(|i| i.consumes_inflow())
        .map(|i| i.amount())
        .sum()
}
