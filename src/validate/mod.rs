//! Structural validation of an event journal before replay: referral-graph
//! shape, duplicate joins, catalog bounds and amount checks. Pure read;
//! nothing here touches an engine.

mod graph;

use std::collections::HashSet;

use thiserror::Error;

use crate::catalog;
use crate::model::journal::{EventJournal, JournalEvent};
use crate::model::{MOTHER, Program};

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("user `{user_id}` joins with themselves as referrer")]
    SelfReferral { user_id: String },

    #[error("referral graph contains a cycle")]
    ReferralCycle,

    #[error("user `{user_id}` joins {program} more than once")]
    DuplicateJoin { user_id: String, program: Program },

    #[error("user `{user_id}` joins under unknown referrer `{referrer_id}`")]
    UnknownReferrer {
        user_id: String,
        referrer_id: String,
    },

    #[error("user `{user_id}` acts before joining any program")]
    UnknownUser { user_id: String },

    #[error("slot {slot_no} outside the {program} catalog")]
    UnknownSlot { program: Program, slot_no: u8 },

    #[error("{program} event for `{user_id}` carries {amount}, catalog says {expected}")]
    AmountMismatch {
        user_id: String,
        program: Program,
        amount: f64,
        expected: f64,
    },

    #[error("events are not in non-decreasing timestamp order at `{user_id}`")]
    TimestampRegression { user_id: String },
}

/// Validate a journal. Returns every error found, not just the first.
pub fn check_journal(journal: &EventJournal) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut known: HashSet<&str> = HashSet::new();
    known.insert(MOTHER);
    let mut joined: HashSet<(&str, Program)> = HashSet::new();
    let mut last_ts = 0u64;

    for event in &journal.events {
        match event {
            JournalEvent::Join {
                user_id,
                referrer_id,
                program,
                amount,
                ts,
                ..
            } => {
                if user_id == referrer_id {
                    errors.push(ValidationError::SelfReferral {
                        user_id: user_id.clone(),
                    });
                }
                if !known.contains(referrer_id.as_str()) {
                    errors.push(ValidationError::UnknownReferrer {
                        user_id: user_id.clone(),
                        referrer_id: referrer_id.clone(),
                    });
                }
                if !joined.insert((user_id.as_str(), *program)) {
                    errors.push(ValidationError::DuplicateJoin {
                        user_id: user_id.clone(),
                        program: *program,
                    });
                }
                let expected = catalog::join_price(*program);
                if (amount - expected).abs() > 1e-9 {
                    errors.push(ValidationError::AmountMismatch {
                        user_id: user_id.clone(),
                        program: *program,
                        amount: *amount,
                        expected,
                    });
                }
                known.insert(user_id.as_str());
                check_ts(&mut errors, &mut last_ts, *ts, user_id);
            }
            JournalEvent::Upgrade {
                user_id,
                program,
                target_slot,
                amount,
                ts,
                ..
            } => {
                if !known.contains(user_id.as_str()) {
                    errors.push(ValidationError::UnknownUser {
                        user_id: user_id.clone(),
                    });
                }
                match catalog::upgrade_cost(*program, *target_slot) {
                    None => errors.push(ValidationError::UnknownSlot {
                        program: *program,
                        slot_no: *target_slot,
                    }),
                    Some(expected) => {
                        if (amount - expected).abs() > 1e-9 {
                            errors.push(ValidationError::AmountMismatch {
                                user_id: user_id.clone(),
                                program: *program,
                                amount: *amount,
                                expected,
                            });
                        }
                    }
                }
                check_ts(&mut errors, &mut last_ts, *ts, user_id);
            }
            JournalEvent::GlobalProgress { user_id, ts } => {
                if !known.contains(user_id.as_str()) {
                    errors.push(ValidationError::UnknownUser {
                        user_id: user_id.clone(),
                    });
                }
                check_ts(&mut errors, &mut last_ts, *ts, user_id);
            }
            JournalEvent::RecycleCheck { user_id, slot_no, ts } => {
                if !known.contains(user_id.as_str()) {
                    errors.push(ValidationError::UnknownUser {
                        user_id: user_id.clone(),
                    });
                }
                if *slot_no == 0 || *slot_no > Program::Matrix.max_slot() {
                    errors.push(ValidationError::UnknownSlot {
                        program: Program::Matrix,
                        slot_no: *slot_no,
                    });
                }
                check_ts(&mut errors, &mut last_ts, *ts, user_id);
            }
        }
    }

    errors.extend(graph::check_referral_graph(journal));
    errors
}

fn check_ts(errors: &mut Vec<ValidationError>, last_ts: &mut u64, ts: u64, user_id: &str) {
    if ts < *last_ts {
        errors.push(ValidationError::TimestampRegression {
            user_id: user_id.to_string(),
        });
    }
    *last_ts = ts.max(*last_ts);
}
