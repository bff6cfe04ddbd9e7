//! Matrix recycle controller.
//!
//! When an owner's generation reaches 39 members the generation is frozen as
//! an immutable snapshot, the next generation opens empty, and the owner
//! re-enters their upline's current tree as a fresh placement event. The
//! engine runs the re-entry through the routing engine like any other matrix
//! activation.

use serde::Serialize;

use crate::catalog::MATRIX_TREE_CAPACITY;
use crate::model::UserId;
use crate::tree::MatrixTrees;

/// Audit record of one completed recycle.
#[derive(Debug, Clone, Serialize)]
pub struct RecycleRecord {
    pub owner: UserId,
    pub slot_no: u8,
    pub recycled_gen: u32,
    pub new_gen: u32,
    pub member_count: u32,
    pub ts: u64,
}

#[derive(Debug, Default)]
pub struct RecycleLog {
    records: Vec<RecycleRecord>,
}

impl RecycleLog {
    pub fn new() -> Self {
        RecycleLog::default()
    }

    pub fn records_for(&self, owner: &str, slot_no: u8) -> Vec<&RecycleRecord> {
        self.records
            .iter()
            .filter(|r| r.owner == owner && r.slot_no == slot_no)
            .collect()
    }
}

/// Whether the owner's current generation is due for recycling.
pub fn due(trees: &MatrixTrees, owner: &str, slot_no: u8) -> bool {
    trees.member_count(owner, slot_no) >= MATRIX_TREE_CAPACITY
}

/// Freeze the full generation and open the next one. Returns the audit
/// record; `None` when the tree is not at capacity (idempotent re-checks hit
/// this path).
pub fn complete_generation(
    trees: &mut MatrixTrees,
    log: &mut RecycleLog,
    owner: &str,
    slot_no: u8,
    ts: u64,
) -> Option<RecycleRecord> {
    if !due(trees, owner, slot_no) {
        return None;
    }
    let member_count = trees.member_count(owner, slot_no);
    let (recycled_gen, new_gen) = trees.recycle(owner, slot_no)?;
    println!(
        "[recycle] {owner} matrix slot {slot_no}: generation {recycled_gen} complete ({member_count} members), opening generation {new_gen}"
    );
    let record = RecycleRecord {
        owner: owner.to_string(),
        slot_no,
        recycled_gen,
        new_gen,
        member_count,
        ts,
    };
    log.records.push(record.clone());
    Some(record)
}
