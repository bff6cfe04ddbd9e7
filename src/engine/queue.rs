use std::collections::{HashMap, VecDeque};

use crate::model::journal::JournalEvent;
use crate::model::{Program, UserId};

/// Durable-intake shape of the scheduling model: one FIFO per
/// (user, program) partition. Events in one partition are strictly ordered;
/// partitions drain round-robin, which is where cross-user parallelism would
/// attach in a multi-worker deployment.
#[derive(Debug, Default)]
pub struct WorkQueue {
    queues: HashMap<(UserId, Program), VecDeque<JournalEvent>>,
    rotation: VecDeque<(UserId, Program)>,
}

fn partition_of(event: &JournalEvent) -> (UserId, Program) {
    match event {
        JournalEvent::Join {
            user_id, program, ..
        }
        | JournalEvent::Upgrade {
            user_id, program, ..
        } => (user_id.clone(), *program),
        JournalEvent::GlobalProgress { user_id, .. } => (user_id.clone(), Program::Global),
        JournalEvent::RecycleCheck { user_id, .. } => (user_id.clone(), Program::Matrix),
    }
}

impl WorkQueue {
    pub fn new() -> Self {
        WorkQueue::default()
    }

    pub fn push(&mut self, event: JournalEvent) {
        let key = partition_of(&event);
        let queue = self.queues.entry(key.clone()).or_default();
        if queue.is_empty() && !self.rotation.contains(&key) {
            self.rotation.push_back(key);
        }
        queue.push_back(event);
    }

    /// Pop the head of the next non-empty partition, round-robin.
    pub fn pop_next(&mut self) -> Option<JournalEvent> {
        while let Some(key) = self.rotation.pop_front() {
            let Some(queue) = self.queues.get_mut(&key) else {
                continue;
            };
            let event = queue.pop_front();
            if queue.is_empty() {
                self.queues.remove(&key);
            } else {
                self.rotation.push_back(key);
            }
            if event.is_some() {
                return event;
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.queues.values().map(|q| q.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.values().all(|q| q.is_empty())
    }
}
