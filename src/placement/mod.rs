//! Upline resolution and placement planning.
//!
//! Every placement starts from the joining user's direct referrer. If the
//! referrer has not activated the slot, the sweepover walk climbs the
//! referral chain — at most 60 levels — to the nearest ancestor who has, and
//! falls back to the Mother account past that. Falling back is a success,
//! not an error.

use std::collections::HashMap;

use serde::Serialize;

use crate::catalog::SWEEPOVER_MAX_LEVELS;
use crate::model::user::UserRecord;
use crate::model::{MOTHER, Program, UserId};
use crate::tree::BinaryTrees;

/// Whether `user` can host placements for `slot_no` of `program`.
/// Mother hosts everything.
pub fn has_slot_active(
    activations: &HashMap<(UserId, Program), u8>,
    user: &str,
    program: Program,
    slot_no: u8,
) -> bool {
    user == MOTHER
        || activations
            .get(&(user.to_string(), program))
            .is_some_and(|&highest| highest >= slot_no)
}

/// The resolved placement root and whether sweepover had to climb.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedUpline {
    pub root: UserId,
    pub swept: bool,
}

/// Resolve the placement root for `slot_no`, starting at the direct referrer.
pub fn resolve_upline(
    users: &HashMap<UserId, UserRecord>,
    activations: &HashMap<(UserId, Program), u8>,
    program: Program,
    slot_no: u8,
    referrer: &str,
) -> ResolvedUpline {
    if has_slot_active(activations, referrer, program, slot_no) {
        return ResolvedUpline {
            root: referrer.to_string(),
            swept: false,
        };
    }
    let mut current = referrer.to_string();
    for _ in 0..SWEEPOVER_MAX_LEVELS {
        let next = match users.get(&current).and_then(|u| u.referrer_id.clone()) {
            Some(r) => r,
            None => break,
        };
        if has_slot_active(activations, &next, program, slot_no) {
            return ResolvedUpline {
                root: next,
                swept: true,
            };
        }
        current = next;
    }
    ResolvedUpline {
        root: MOTHER.to_string(),
        swept: true,
    }
}

/// A planned binary placement: the BFS-open position under the resolved root,
/// plus everything the routing decision needs, computed before any write.
#[derive(Debug, Clone, Serialize)]
pub struct BinaryPlacement {
    pub slot_no: u8,
    pub root: UserId,
    pub parent_user: UserId,
    pub position: u8,
    pub swept: bool,
    /// The slot-depth ancestor of the new node (slot N → depth N), if the
    /// placement chain reaches that far.
    pub reserve_ancestor: Option<UserId>,
    /// Arrival index of the new node within the ancestor's depth-N level
    /// cohort: 0 and 1 are the reserve-routed members.
    pub index_under_ancestor: usize,
    /// Placement uplines L1..L16 of the new node (L1 = parent). Shorter when
    /// the chain tops out at Mother.
    pub level_uplines: Vec<UserId>,
}

/// Plan a binary placement for `slot_no` under `resolved`. Read-only; the
/// engine inserts the node only once the whole event is validated.
pub fn plan_binary(
    trees: &BinaryTrees,
    resolved: &ResolvedUpline,
    slot_no: u8,
) -> BinaryPlacement {
    let (parent_user, position) = trees.plan_place(slot_no, &resolved.root);

    // Uplines of the node-to-be: its parent, then the parent's ancestors.
    let mut level_uplines = vec![parent_user.clone()];
    level_uplines.extend(trees.ancestors(slot_no, &parent_user, 15));

    // The depth-N ancestor for the reserve-route test (slot N ≥ 2). The new
    // node lands at depth N under it; its arrival index is the size of that
    // level cohort so far.
    let reserve_ancestor = level_uplines.get(slot_no as usize - 1).cloned();
    let index_under_ancestor = reserve_ancestor
        .as_deref()
        .map(|a| trees.count_at_depth(slot_no, a, slot_no as u32))
        .unwrap_or(0);

    BinaryPlacement {
        slot_no,
        root: resolved.root.clone(),
        parent_user,
        position,
        swept: resolved.swept,
        reserve_ancestor,
        index_under_ancestor,
        level_uplines,
    }
}
