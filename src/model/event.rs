use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::program::{Program, UserId};

/// How a slot activation came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivationKind {
    /// First activation in a program (a join).
    Initial,
    /// A paid upgrade to the next slot.
    Upgrade,
    /// A reserve-funded automatic upgrade.
    Auto,
    /// Matrix owner re-entering after a 39-member recycle.
    RecycleReentry,
}

impl ActivationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationKind::Initial => "initial",
            ActivationKind::Upgrade => "upgrade",
            ActivationKind::Auto => "auto",
            ActivationKind::RecycleReentry => "recycle_reentry",
        }
    }
}

/// A single slot-activation event — the unit of work the cascade engine
/// processes transactionally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActivationRequest {
    pub user_id: UserId,
    pub program: Program,
    pub slot_no: u8,
    pub kind: ActivationKind,
    /// Amount paid in the program currency. For auto activations this is the
    /// reserve debit; for recycle re-entries, the slot's catalog price.
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Unix timestamp supplied by the caller; the engine never reads the wall
    /// clock itself.
    pub ts: u64,
}

/// Build the deterministic correlation id for an event:
/// `{program}-{user_id}-{slot_no}-{event_kind}-{monotonic_ts}`.
pub fn correlation_id(
    program: Program,
    user_id: &str,
    slot_no: u8,
    kind: ActivationKind,
    ts: u64,
) -> String {
    format!("{program}-{user_id}-{slot_no}-{}-{ts}", kind.as_str())
}

impl ActivationRequest {
    pub fn correlation_id(&self) -> String {
        correlation_id(self.program, &self.user_id, self.slot_no, self.kind, self.ts)
    }
}
