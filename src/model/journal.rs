use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::program::{Program, UserId};

/// A named, replayable sequence of platform events. The `replay` subcommand
/// feeds one of these through a fresh engine; replaying the same journal twice
/// is a no-op for every balance (idempotency).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EventJournal {
    /// Human-readable name for this journal.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Events in submission order.
    pub events: Vec<JournalEvent>,
}

/// One externally-submitted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JournalEvent {
    /// First activation in a program.
    Join {
        user_id: UserId,
        referrer_id: UserId,
        program: Program,
        amount: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tx_hash: Option<String>,
        ts: u64,
    },
    /// A paid upgrade to `target_slot`.
    Upgrade {
        user_id: UserId,
        program: Program,
        target_slot: u8,
        amount: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tx_hash: Option<String>,
        ts: u64,
    },
    /// Idempotent global phase-completion tick.
    GlobalProgress { user_id: UserId, ts: u64 },
    /// Idempotent matrix 39-completion re-check.
    RecycleCheck { user_id: UserId, slot_no: u8, ts: u64 },
}

impl JournalEvent {
    pub fn user_id(&self) -> &str {
        match self {
            JournalEvent::Join { user_id, .. }
            | JournalEvent::Upgrade { user_id, .. }
            | JournalEvent::GlobalProgress { user_id, .. }
            | JournalEvent::RecycleCheck { user_id, .. } => user_id,
        }
    }
}
