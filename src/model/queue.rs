use serde::{Deserialize, Serialize};

use super::program::{Program, UserId};

/// Lifecycle of an auto-upgrade queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    /// The arming event was rolled back before processing.
    Voided,
}

/// What armed the upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Reserve balance reached the target slot's cost.
    ReserveThreshold,
    /// Binary: second counted partner arrived at the current slot.
    PartnerCount,
    /// Matrix: a middle-position level-2 member funded the reserve.
    MiddleThree,
    /// Global: phase 2 tree completed, next slot armed.
    PhaseCompletion,
}

/// One queued auto-upgrade job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub item_id: String,
    pub user_id: UserId,
    pub program: Program,
    pub current_slot: u8,
    pub target_slot: u8,
    /// Cost to activate the target slot (program upgrade convention).
    pub cost: f64,
    /// Reserve balance observed when the item was enqueued.
    pub available: f64,
    pub status: QueueStatus,
    pub retry_count: u32,
    pub trigger_kind: TriggerKind,
}
