use std::collections::{HashMap, VecDeque};

use crate::model::{MOTHER, UserId};

use super::TreeNode;

/// One global 2-ary placement tree per binary slot, rooted at Mother.
/// Users enter a slot's tree when they activate that slot.
#[derive(Debug, Default)]
pub struct BinaryTrees {
    slots: HashMap<u8, SlotTree>,
}

#[derive(Debug, Default)]
struct SlotTree {
    nodes: HashMap<UserId, TreeNode>,
    children: HashMap<UserId, Vec<UserId>>,
    /// Arrival order; BFS fill keeps this level-ordered per subtree.
    order: Vec<UserId>,
}

impl BinaryTrees {
    pub fn new() -> Self {
        BinaryTrees::default()
    }

    pub fn contains(&self, slot_no: u8, user_id: &str) -> bool {
        user_id == MOTHER
            || self
                .slots
                .get(&slot_no)
                .is_some_and(|t| t.nodes.contains_key(user_id))
    }

    /// Find the first open left/right position under `root` by BFS, without
    /// mutating. Returns (parent, position).
    pub fn plan_place(&self, slot_no: u8, root: &str) -> (UserId, u8) {
        let tree = match self.slots.get(&slot_no) {
            Some(t) => t,
            None => return (root.to_string(), 0),
        };
        let mut frontier: VecDeque<UserId> = VecDeque::new();
        frontier.push_back(root.to_string());
        while let Some(current) = frontier.pop_front() {
            let kids = tree.children.get(&current).map(|v| v.as_slice()).unwrap_or(&[]);
            if kids.len() < 2 {
                return (current, kids.len() as u8);
            }
            for k in kids {
                frontier.push_back(k.clone());
            }
        }
        (root.to_string(), 0)
    }

    pub fn insert(&mut self, slot_no: u8, user_id: &str, parent_id: &str, position: u8, ts: u64) {
        let tree = self.slots.entry(slot_no).or_default();
        tree.nodes.insert(
            user_id.to_string(),
            TreeNode {
                user_id: user_id.to_string(),
                parent_id: parent_id.to_string(),
                position,
                placed_at: ts,
            },
        );
        tree.children
            .entry(parent_id.to_string())
            .or_default()
            .push(user_id.to_string());
        tree.order.push(user_id.to_string());
    }

    pub fn node(&self, slot_no: u8, user_id: &str) -> Option<&TreeNode> {
        self.slots.get(&slot_no)?.nodes.get(user_id)
    }

    /// The `depth`-th placement ancestor. Walking past Mother yields `None`.
    pub fn ancestor(&self, slot_no: u8, user_id: &str, depth: u32) -> Option<UserId> {
        let tree = self.slots.get(&slot_no)?;
        let mut current = user_id.to_string();
        for _ in 0..depth {
            match tree.nodes.get(&current) {
                Some(node) => current = node.parent_id.clone(),
                None => return None,
            }
        }
        Some(current)
    }

    /// Placement ancestors from level 1 (parent) up to `max` levels. The walk
    /// stops after Mother.
    pub fn ancestors(&self, slot_no: u8, user_id: &str, max: u32) -> Vec<UserId> {
        let mut out = Vec::new();
        let tree = match self.slots.get(&slot_no) {
            Some(t) => t,
            None => return out,
        };
        let mut current = user_id.to_string();
        for _ in 0..max {
            match tree.nodes.get(&current) {
                Some(node) => {
                    out.push(node.parent_id.clone());
                    current = node.parent_id.clone();
                }
                None => break,
            }
        }
        out
    }

    /// 1-based distance from `ancestor_id` down to `user_id`, if `ancestor_id`
    /// is on the placement path.
    pub fn level_of(&self, slot_no: u8, user_id: &str, ancestor_id: &str) -> Option<u32> {
        let tree = self.slots.get(&slot_no)?;
        let mut current = user_id.to_string();
        let mut level = 0;
        loop {
            let node = tree.nodes.get(&current)?;
            level += 1;
            if node.parent_id == ancestor_id {
                return Some(level);
            }
            current = node.parent_id.clone();
        }
    }

    /// Number of strict descendants of `root` in the slot tree.
    pub fn subtree_count(&self, slot_no: u8, root: &str) -> usize {
        let tree = match self.slots.get(&slot_no) {
            Some(t) => t,
            None => return 0,
        };
        let mut count = 0;
        let mut frontier: VecDeque<&str> = VecDeque::new();
        frontier.push_back(root);
        while let Some(current) = frontier.pop_front() {
            if let Some(kids) = tree.children.get(current) {
                count += kids.len();
                for k in kids {
                    frontier.push_back(k);
                }
            }
        }
        count
    }

    /// Number of members at exactly `depth` levels below `root`. The binary
    /// reserve rule counts arrivals within this level cohort.
    pub fn count_at_depth(&self, slot_no: u8, root: &str, depth: u32) -> usize {
        let tree = match self.slots.get(&slot_no) {
            Some(t) => t,
            None => return 0,
        };
        let mut count = 0;
        let mut frontier: VecDeque<(&str, u32)> = VecDeque::new();
        frontier.push_back((root, 0));
        while let Some((current, level)) = frontier.pop_front() {
            if level == depth {
                count += 1;
                continue;
            }
            if let Some(kids) = tree.children.get(current) {
                for k in kids {
                    frontier.push_back((k.as_str(), level + 1));
                }
            }
        }
        count
    }

    /// BFS-order index (0-based) of `user_id` within `root`'s strict
    /// subtree. Enumeration order for placement queries; the reserve rule
    /// counts the depth-N level cohort instead (`count_at_depth`).
    pub fn bfs_index_under(&self, slot_no: u8, root: &str, user_id: &str) -> Option<usize> {
        let tree = self.slots.get(&slot_no)?;
        let mut index = 0;
        let mut frontier: VecDeque<&str> = VecDeque::new();
        frontier.push_back(root);
        while let Some(current) = frontier.pop_front() {
            if let Some(kids) = tree.children.get(current) {
                for k in kids {
                    if k == user_id {
                        return Some(index);
                    }
                    index += 1;
                    frontier.push_back(k);
                }
            }
        }
        None
    }

    /// BFS enumeration of `root`'s strict subtree for the tree view, paginated.
    pub fn subtree_page(
        &self,
        slot_no: u8,
        root: &str,
        offset: usize,
        limit: usize,
    ) -> Vec<TreeNode> {
        let tree = match self.slots.get(&slot_no) {
            Some(t) => t,
            None => return Vec::new(),
        };
        let mut out = Vec::new();
        let mut seen = 0usize;
        let mut frontier: VecDeque<&str> = VecDeque::new();
        frontier.push_back(root);
        while let Some(current) = frontier.pop_front() {
            if let Some(kids) = tree.children.get(current) {
                for k in kids {
                    if seen >= offset && out.len() < limit {
                        if let Some(node) = tree.nodes.get(k) {
                            out.push(node.clone());
                        }
                    }
                    seen += 1;
                    frontier.push_back(k);
                }
            }
            if out.len() >= limit {
                break;
            }
        }
        out
    }
}
