use serde::{Deserialize, Serialize};

use super::event::ActivationKind;
use super::program::{Program, UserId};

/// Platform user record. Program flags are implied by the activation map and
/// only ever turn on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    /// `None` only for the Mother account.
    pub referrer_id: Option<UserId>,
    pub joined_at: u64,
}

/// Append-only activation record; at most one per (user, program, slot)
/// except recycle re-entries, which repeat a slot in a new tree generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotActivation {
    pub user_id: UserId,
    pub program: Program,
    pub slot_no: u8,
    pub kind: ActivationKind,
    pub amount_paid: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    pub activated_at: u64,
    pub correlation_id: String,
}

/// Reporting category for a commission record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionCategory {
    Joining,
    Partner,
    Level,
    Mentorship,
    FullUpline,
    Newcomer,
    DreamMatrix,
}

/// Append-only commission attribution, one per wallet-bound payout. Kept
/// alongside the ledger for reporting; balances never read from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionRecord {
    pub event_id: String,
    pub payer_user_id: UserId,
    pub payee_user_id: UserId,
    pub program: Program,
    pub source_slot_no: u8,
    pub level: u8,
    pub amount: f64,
    pub category: CommissionCategory,
}
