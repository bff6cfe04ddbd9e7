//! Rank engine: a pure threshold function over total active slots, with a
//! monotone stored rank and append-only history.

use std::collections::HashMap;

use serde::Serialize;

use crate::catalog::rank_for_total_slots;
use crate::model::UserId;

/// One history point; appended whenever the stored rank changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankEvent {
    pub rank: u8,
    pub ts: u64,
}

#[derive(Debug, Default)]
pub struct RankStore {
    current: HashMap<UserId, u8>,
    history: HashMap<UserId, Vec<RankEvent>>,
}

impl RankStore {
    pub fn new() -> Self {
        RankStore::default()
    }

    /// Recompute from the achievement snapshot. The stored rank only ever
    /// increases; a lower computed rank leaves it untouched.
    pub fn observe(&mut self, user: &str, total_active_slots: u32, ts: u64) -> Option<u8> {
        let computed = rank_for_total_slots(total_active_slots);
        let current = self.current.get(user).copied().unwrap_or(0);
        if computed <= current {
            return None;
        }
        self.current.insert(user.to_string(), computed);
        self.history
            .entry(user.to_string())
            .or_default()
            .push(RankEvent { rank: computed, ts });
        Some(computed)
    }

    pub fn rank_of(&self, user: &str) -> u8 {
        self.current.get(user).copied().unwrap_or(0)
    }

    pub fn history_of(&self, user: &str) -> &[RankEvent] {
        self.history.get(user).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Explicit operator reset — the one path that may lower a rank. History
    /// keeps the reset point.
    pub fn admin_reset(&mut self, user: &str, ts: u64) {
        self.current.insert(user.to_string(), 0);
        self.history
            .entry(user.to_string())
            .or_default()
            .push(RankEvent { rank: 0, ts });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_never_decreases() {
        let mut store = RankStore::new();
        assert_eq!(store.observe("ada", 1, 10), Some(1));
        assert_eq!(store.observe("ada", 6, 20), Some(6));
        // Fewer slots never lower the stored rank.
        assert_eq!(store.observe("ada", 2, 30), None);
        assert_eq!(store.rank_of("ada"), 6);
        assert_eq!(store.history_of("ada").len(), 2);
    }

    #[test]
    fn thresholds_follow_the_table() {
        let mut store = RankStore::new();
        store.observe("bo", 30, 1);
        assert_eq!(store.rank_of("bo"), 15);
        let mut s2 = RankStore::new();
        s2.observe("cy", 7, 1);
        assert_eq!(s2.rank_of("cy"), 6);
    }

    #[test]
    fn admin_reset_is_the_only_way_down() {
        let mut store = RankStore::new();
        store.observe("ada", 10, 1);
        assert_eq!(store.rank_of("ada"), 8);
        store.admin_reset("ada", 2);
        assert_eq!(store.rank_of("ada"), 0);
        // Re-observation climbs back from the reset point.
        assert_eq!(store.observe("ada", 10, 3), Some(8));
    }
}
