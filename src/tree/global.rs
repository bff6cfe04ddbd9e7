use std::collections::HashMap;

use serde::Serialize;

use crate::model::{Phase, UserId};

use super::TreeNode;

/// Global program placement: every participant owns a sequence of small phase
/// trees. New members BFS-fill the owner's *current* phase tree; completing
/// Phase 1 (4 members) opens Phase 2 (8 members), completing Phase 2 arms the
/// next slot.
#[derive(Debug, Default)]
pub struct GlobalTrees {
    states: HashMap<UserId, PhaseState>,
    trees: HashMap<(UserId, Phase, u8), PhaseTree>,
}

/// A user's position in the phase progression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseState {
    pub phase: Phase,
    pub slot_no: u8,
    pub members_in_phase: u32,
}

#[derive(Debug, Default)]
struct PhaseTree {
    nodes: Vec<GlobalNode>,
}

#[derive(Debug)]
struct GlobalNode {
    user_id: UserId,
    /// Parent member index; `None` when the parent is the owner.
    parent: Option<usize>,
    position: u8,
    placed_at: u64,
}

/// Result of placing a member into an owner's phase tree.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalPlacement {
    pub owner: UserId,
    pub phase: Phase,
    pub slot_no: u8,
    pub parent_user: UserId,
    pub position: u8,
    /// 0-based arrival index in the phase tree.
    pub member_index: u32,
    /// Whether this placement completed the phase tree.
    pub phase_complete: bool,
}

impl PhaseTree {
    /// First open position in the 2-ary BFS fill: members 0–1 under the
    /// owner, then pairs under earlier members.
    fn plan(&self) -> (Option<usize>, u8) {
        let root_kids = self.nodes.iter().filter(|n| n.parent.is_none()).count();
        if root_kids < 2 {
            return (None, root_kids as u8);
        }
        for idx in 0..self.nodes.len() {
            let kids = self
                .nodes
                .iter()
                .filter(|n| n.parent == Some(idx))
                .count();
            if kids < 2 {
                return (Some(idx), kids as u8);
            }
        }
        (None, 0)
    }
}

impl GlobalTrees {
    pub fn new() -> Self {
        GlobalTrees::default()
    }

    /// Initialize a user's phase progression at P1 / slot 1. Called when they
    /// activate the global program.
    pub fn ensure_state(&mut self, user: &str) {
        self.states.entry(user.to_string()).or_insert(PhaseState {
            phase: Phase::P1,
            slot_no: 1,
            members_in_phase: 0,
        });
    }

    pub fn state(&self, user: &str) -> Option<PhaseState> {
        self.states.get(user).copied()
    }

    pub fn has_state(&self, user: &str) -> bool {
        self.states.contains_key(user)
    }

    /// Place `user` into `owner`'s current phase tree by BFS.
    pub fn place(&mut self, owner: &str, user: &str, ts: u64) -> GlobalPlacement {
        self.ensure_state(owner);
        let state = self.states.get(owner).copied().expect("ensured");
        let key = (owner.to_string(), state.phase, state.slot_no);
        let tree = self.trees.entry(key).or_default();
        let (parent, position) = tree.plan();
        let member_index = tree.nodes.len() as u32;
        tree.nodes.push(GlobalNode {
            user_id: user.to_string(),
            parent,
            position,
            placed_at: ts,
        });
        let parent_user = match parent {
            Some(p) => tree.nodes[p].user_id.clone(),
            None => owner.to_string(),
        };
        let members = tree.nodes.len() as u32;
        let complete = members >= state.phase.capacity();

        let state = self.states.get_mut(owner).expect("ensured");
        state.members_in_phase = members;

        GlobalPlacement {
            owner: owner.to_string(),
            phase: state.phase,
            slot_no: state.slot_no,
            parent_user,
            position,
            member_index,
            phase_complete: complete,
        }
    }

    /// Whether the owner's current phase tree is at capacity.
    pub fn phase_complete(&self, owner: &str) -> bool {
        match self.states.get(owner) {
            Some(state) => state.members_in_phase >= state.phase.capacity(),
            None => false,
        }
    }

    /// Move the owner to a new (phase, slot) with a fresh, empty tree.
    pub fn advance_to(&mut self, owner: &str, phase: Phase, slot_no: u8) {
        let state = self.states.entry(owner.to_string()).or_insert(PhaseState {
            phase: Phase::P1,
            slot_no: 1,
            members_in_phase: 0,
        });
        state.phase = phase;
        state.slot_no = slot_no;
        let members = self
            .trees
            .get(&(owner.to_string(), phase, slot_no))
            .map(|t| t.nodes.len() as u32)
            .unwrap_or(0);
        state.members_in_phase = members;
    }

    /// Members of the owner's current phase tree, paginated in BFS order.
    pub fn subtree_page(&self, owner: &str, offset: usize, limit: usize) -> Vec<TreeNode> {
        let state = match self.states.get(owner) {
            Some(s) => *s,
            None => return Vec::new(),
        };
        let tree = match self.trees.get(&(owner.to_string(), state.phase, state.slot_no)) {
            Some(t) => t,
            None => return Vec::new(),
        };
        tree.nodes
            .iter()
            .skip(offset)
            .take(limit)
            .map(|n| TreeNode {
                user_id: n.user_id.clone(),
                parent_id: match n.parent {
                    Some(p) => tree.nodes[p].user_id.clone(),
                    None => owner.to_string(),
                },
                position: n.position,
                placed_at: n.placed_at,
            })
            .collect()
    }
}
