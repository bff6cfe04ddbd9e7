use std::collections::HashMap;

use serde::Serialize;

use crate::catalog::MATRIX_TREE_CAPACITY;
use crate::model::UserId;

use super::TreeNode;

/// Matrix placement store: one generation-versioned 3-ary tree per
/// (owner, slot). A generation holds at most 39 members (3 + 9 + 27); hitting
/// capacity freezes it as a snapshot and opens the next generation.
#[derive(Debug, Default)]
pub struct MatrixTrees {
    trees: HashMap<(UserId, u8), OwnerSlotTrees>,
}

#[derive(Debug)]
struct OwnerSlotTrees {
    generations: Vec<Generation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Active,
    Recycled,
}

/// One generation of an owner's matrix tree. Members are stored in arrival
/// order, which strict BFS fill keeps equal to level order. Recycled
/// generations are immutable snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct Generation {
    pub gen_no: u32,
    pub status: GenerationStatus,
    nodes: Vec<MatrixNode>,
}

#[derive(Debug, Clone, Serialize)]
struct MatrixNode {
    user_id: UserId,
    /// Index of the parent member; `None` when the parent is the owner.
    parent: Option<usize>,
    position: u8,
    depth: u8,
    placed_at: u64,
}

impl Generation {
    fn new(gen_no: u32) -> Self {
        Generation {
            gen_no,
            status: GenerationStatus::Active,
            nodes: Vec::new(),
        }
    }

    pub fn member_count(&self) -> u32 {
        self.nodes.len() as u32
    }

    fn children_count(&self, parent: Option<usize>) -> u8 {
        self.nodes.iter().filter(|n| n.parent == parent).count() as u8
    }

    /// Strict-BFS open position: level 1 (3 slots), then level 2 (9), then
    /// level 3 (27). `None` when the generation is at capacity.
    fn plan(&self) -> Option<(Option<usize>, u8, u8)> {
        if self.member_count() >= MATRIX_TREE_CAPACITY {
            return None;
        }
        let root_kids = self.children_count(None);
        if root_kids < 3 {
            return Some((None, root_kids, 1));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            if node.depth >= 3 {
                continue;
            }
            let kids = self.children_count(Some(idx));
            if kids < 3 {
                return Some((Some(idx), kids, node.depth + 1));
            }
        }
        None
    }

    /// Snapshot view with parent ids resolved; index order is placement order.
    pub fn members(&self, owner: &str) -> Vec<TreeNode> {
        self.nodes
            .iter()
            .map(|n| TreeNode {
                user_id: n.user_id.clone(),
                parent_id: match n.parent {
                    Some(p) => self.nodes[p].user_id.clone(),
                    None => owner.to_string(),
                },
                position: n.position,
                placed_at: n.placed_at,
            })
            .collect()
    }
}

/// The placement context routing needs, captured at insert time.
#[derive(Debug, Clone, Serialize)]
pub struct MatrixPlacement {
    pub owner: UserId,
    pub slot_no: u8,
    pub gen_no: u32,
    /// 0-based arrival index within the generation.
    pub member_index: usize,
    pub parent_user: UserId,
    pub position: u8,
    pub depth: u8,
    /// Placement grandparent: the owner for depth-2 members, a level-1 member
    /// for depth-3 members, absent for depth-1 members.
    pub grandparent_user: Option<UserId>,
    /// Placement uplines L1.. up to the owner (length == depth).
    pub level_uplines: Vec<UserId>,
    /// Members in the generation after this placement.
    pub member_count: u32,
}

impl MatrixTrees {
    pub fn new() -> Self {
        MatrixTrees::default()
    }

    /// Create the (owner, slot) tree with an empty generation 1 if missing.
    /// Called when the owner activates the slot.
    pub fn ensure_tree(&mut self, owner: &str, slot_no: u8) {
        self.trees
            .entry((owner.to_string(), slot_no))
            .or_insert_with(|| OwnerSlotTrees {
                generations: vec![Generation::new(1)],
            });
    }

    pub fn has_tree(&self, owner: &str, slot_no: u8) -> bool {
        self.trees.contains_key(&(owner.to_string(), slot_no))
    }

    pub fn current_generation(&self, owner: &str, slot_no: u8) -> Option<&Generation> {
        self.trees
            .get(&(owner.to_string(), slot_no))?
            .generations
            .last()
    }

    pub fn generation(&self, owner: &str, slot_no: u8, gen_no: u32) -> Option<&Generation> {
        self.trees
            .get(&(owner.to_string(), slot_no))?
            .generations
            .iter()
            .find(|g| g.gen_no == gen_no)
    }

    pub fn generations(&self, owner: &str, slot_no: u8) -> &[Generation] {
        self.trees
            .get(&(owner.to_string(), slot_no))
            .map(|t| t.generations.as_slice())
            .unwrap_or(&[])
    }

    /// Compute where the next member would land in the owner's current
    /// generation, without writing. Returns `None` when the generation is at
    /// capacity (the caller must recycle first). An owner without a tree yet
    /// previews against an empty generation 1.
    pub fn preview_place(&self, owner: &str, slot_no: u8) -> Option<MatrixPlacement> {
        match self.current_generation(owner, slot_no) {
            Some(generation) => {
                let plan = generation.plan()?;
                Some(describe(owner, slot_no, generation, plan))
            }
            None => {
                let empty = Generation::new(1);
                Some(describe(owner, slot_no, &empty, (None, 0, 1)))
            }
        }
    }

    /// Insert `user` at the position `preview_place` computed. The plan is
    /// recomputed from the same state, so preview and commit always agree
    /// within one event.
    pub fn commit_place(
        &mut self,
        owner: &str,
        slot_no: u8,
        user: &str,
        ts: u64,
    ) -> Option<MatrixPlacement> {
        self.ensure_tree(owner, slot_no);
        let tree = self
            .trees
            .get_mut(&(owner.to_string(), slot_no))
            .expect("ensured");
        let generation = tree.generations.last_mut().expect("always one generation");
        let plan = generation.plan()?;
        let placement = describe(owner, slot_no, generation, plan);
        let (parent, position, depth) = plan;
        generation.nodes.push(MatrixNode {
            user_id: user.to_string(),
            parent,
            position,
            depth,
            placed_at: ts,
        });
        Some(placement)
    }

    /// Member count of the owner's current generation.
    pub fn member_count(&self, owner: &str, slot_no: u8) -> u32 {
        self.current_generation(owner, slot_no)
            .map(|g| g.member_count())
            .unwrap_or(0)
    }

    /// Freeze the current generation as a recycled snapshot and open the next
    /// one. Returns (recycled_gen_no, new_gen_no).
    pub fn recycle(&mut self, owner: &str, slot_no: u8) -> Option<(u32, u32)> {
        let tree = self.trees.get_mut(&(owner.to_string(), slot_no))?;
        let current = tree.generations.last_mut()?;
        if current.status != GenerationStatus::Active {
            return None;
        }
        current.status = GenerationStatus::Recycled;
        let recycled = current.gen_no;
        let next = recycled + 1;
        tree.generations.push(Generation::new(next));
        Some((recycled, next))
    }

    /// BFS-order index (0-based) of `user_id` within the owner's current
    /// generation.
    pub fn member_index(&self, owner: &str, slot_no: u8, user_id: &str) -> Option<usize> {
        self.current_generation(owner, slot_no)?
            .nodes
            .iter()
            .position(|n| n.user_id == user_id)
    }

    /// Current-generation members for the tree view, paginated in BFS order.
    pub fn subtree_page(
        &self,
        owner: &str,
        slot_no: u8,
        offset: usize,
        limit: usize,
    ) -> Vec<TreeNode> {
        match self.current_generation(owner, slot_no) {
            Some(generation) => generation
                .members(owner)
                .into_iter()
                .skip(offset)
                .take(limit)
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Build the placement context for the open position `plan` in `generation`.
fn describe(
    owner: &str,
    slot_no: u8,
    generation: &Generation,
    plan: (Option<usize>, u8, u8),
) -> MatrixPlacement {
    let (parent, position, depth) = plan;
    let parent_user = match parent {
        Some(p) => generation.nodes[p].user_id.clone(),
        None => owner.to_string(),
    };
    let grandparent_user = match parent {
        None => None,
        Some(p) => match generation.nodes[p].parent {
            Some(gp) => Some(generation.nodes[gp].user_id.clone()),
            None => Some(owner.to_string()),
        },
    };

    // Placement chain up to the owner: L1 = parent, then upward.
    let mut level_uplines = Vec::with_capacity(depth as usize);
    let mut cursor = parent;
    loop {
        match cursor {
            Some(idx) => {
                level_uplines.push(generation.nodes[idx].user_id.clone());
                cursor = generation.nodes[idx].parent;
            }
            None => {
                level_uplines.push(owner.to_string());
                break;
            }
        }
    }

    MatrixPlacement {
        owner: owner.to_string(),
        slot_no,
        gen_no: generation.gen_no,
        member_index: generation.nodes.len(),
        parent_user,
        position,
        depth,
        grandparent_user,
        level_uplines,
        member_count: generation.nodes.len() as u32 + 1,
    }
}
