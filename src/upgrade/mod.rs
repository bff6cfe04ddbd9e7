//! Auto-upgrade manager.
//!
//! Reserve credits and partner-count changes arm upgrade jobs; the engine
//! drains the queue after each committed event, executing every job as its
//! own activation transaction (debit reserve, activate, route) with a bounded
//! chain depth. Items survive transient failures with a retry budget.

use std::collections::HashSet;

use crate::model::Program;
use crate::model::UserId;
use crate::model::queue::{QueueItem, QueueStatus, TriggerKind};

#[derive(Debug, Default)]
pub struct UpgradeManager {
    items: Vec<QueueItem>,
    /// (user, program, target) with a live (pending/processing) item, so the
    /// same target is never armed twice.
    live: HashSet<(UserId, Program, u8)>,
}

impl UpgradeManager {
    pub fn new() -> Self {
        UpgradeManager::default()
    }

    /// Enqueue an upgrade job unless one is already live for the same target.
    /// Returns the item id when a new job was enqueued.
    pub fn arm(
        &mut self,
        user: &str,
        program: Program,
        current_slot: u8,
        target_slot: u8,
        cost: f64,
        available: f64,
        trigger_kind: TriggerKind,
    ) -> Option<String> {
        let key = (user.to_string(), program, target_slot);
        if self.live.contains(&key) {
            return None;
        }
        let item_id = uuid::Uuid::new_v4().to_string();
        println!(
            "[queue] armed {user} {program} slot {target_slot} (cost {cost}, available {available}, trigger {trigger_kind:?})"
        );
        self.items.push(QueueItem {
            item_id: item_id.clone(),
            user_id: user.to_string(),
            program,
            current_slot,
            target_slot,
            cost,
            available,
            status: QueueStatus::Pending,
            retry_count: 0,
            trigger_kind,
        });
        self.live.insert(key);
        Some(item_id)
    }

    /// Claim the oldest pending item, marking it processing.
    pub fn claim_next(&mut self) -> Option<QueueItem> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.status == QueueStatus::Pending)?;
        item.status = QueueStatus::Processing;
        Some(item.clone())
    }

    pub fn complete(&mut self, item_id: &str) {
        self.finish(item_id, QueueStatus::Completed);
    }

    /// Void a live item whose arming event was rolled back.
    pub fn void(&mut self, item_id: &str) {
        self.finish(item_id, QueueStatus::Voided);
    }

    /// Record a transient failure. The item returns to pending until the
    /// retry budget is exhausted, then fails terminally.
    pub fn retry_or_fail(&mut self, item_id: &str, max_retries: u32) -> QueueStatus {
        let Some(item) = self.items.iter_mut().find(|i| i.item_id == item_id) else {
            return QueueStatus::Failed;
        };
        item.retry_count += 1;
        if item.retry_count > max_retries {
            item.status = QueueStatus::Failed;
            eprintln!(
                "[queue] item {item_id} failed after {} retries ({} {} slot {})",
                item.retry_count, item.user_id, item.program, item.target_slot
            );
        } else {
            item.status = QueueStatus::Pending;
        }
        let status = item.status;
        if status == QueueStatus::Failed {
            let key = (item.user_id.clone(), item.program, item.target_slot);
            self.live.remove(&key);
        }
        status
    }

    fn finish(&mut self, item_id: &str, status: QueueStatus) {
        if let Some(item) = self.items.iter_mut().find(|i| i.item_id == item_id) {
            item.status = status;
            let key = (item.user_id.clone(), item.program, item.target_slot);
            self.live.remove(&key);
        }
    }

    /// Live (pending/processing) items for a user in a program, for `/status`.
    pub fn pending_for(&self, user: &str, program: Program) -> Vec<QueueItem> {
        self.items
            .iter()
            .filter(|i| {
                i.user_id == user
                    && i.program == program
                    && matches!(i.status, QueueStatus::Pending | QueueStatus::Processing)
            })
            .cloned()
            .collect()
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }
}
