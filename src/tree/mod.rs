//! Placement graphs for the three programs.
//!
//! All traversal is iterative with explicit frontiers; depth caps are visible
//! at the call sites (60 for sweepover, 16 for binary levels, 3 for matrix).

pub mod binary;
pub mod global;
pub mod matrix;

use serde::Serialize;

use crate::model::UserId;

/// A placed node as exposed to views and snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub user_id: UserId,
    pub parent_id: UserId,
    /// 0-based index among the parent's children. In a matrix tree, position
    /// 1 is the middle child.
    pub position: u8,
    pub placed_at: u64,
}

pub use binary::BinaryTrees;
pub use global::{GlobalPlacement, GlobalTrees, PhaseState};
pub use matrix::{Generation, GenerationStatus, MatrixPlacement, MatrixTrees};
