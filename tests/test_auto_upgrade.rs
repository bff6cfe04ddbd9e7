mod common;

use bitgpt_core::model::queue::{QueueStatus, TriggerKind};
use bitgpt_core::model::{EntryKind, Program, ReasonCode};

use common::{Harness, approx};

// ── Scenario: reserve fills, manager debits and activates ───────────

#[test]
fn two_cohort_members_fund_and_chain_the_next_slot() {
    let mut h = Harness::new();
    h.join_binary("alice", "mother");
    h.join_binary("bella", "alice");

    h.join_binary("cara", "bella");
    let outcomes = h.join_binary("dana", "bella");

    // The second depth-2 member under Alice completed the 2 × 0.0044 reserve;
    // the manager debited 0.0088 and activated slot 3 inside the same event
    // chain.
    let slot2 = &outcomes[1];
    assert_eq!(slot2.chained.len(), 1);
    assert!(slot2.chained[0].contains("binary-alice-3-auto"));

    assert_eq!(h.engine.highest_slot("alice", Program::Binary), 3);
    assert!(approx(
        h.engine.ledger.reserve_balance("alice", Program::Binary, 3),
        0.0
    ));

    // The chained activation's ledger: the reserve debit leads, then the
    // slot-3 routing.
    let auto_entries = h.engine.ledger.entries_for(&slot2.chained[0]);
    assert_eq!(auto_entries[0].kind, EntryKind::ReserveDebit);
    assert_eq!(auto_entries[0].reason, ReasonCode::ReserveDebitAutoActivation);
    assert!(approx(auto_entries[0].amount, 0.0088));
    let credits: f64 = auto_entries
        .iter()
        .filter(|e| e.kind != EntryKind::WalletDebit && e.kind != EntryKind::ReserveDebit)
        .map(|e| e.amount)
        .sum();
    assert!(approx(credits, 0.0088), "the debited amount is fully re-routed");

    // Chain depth stays within the configured bound.
    assert!(slot2.chained.len() <= h.engine.config().max_chain_depth as usize);

    // Queue bookkeeping: the item completed.
    let items = h.engine.upgrades().items();
    assert!(items.iter().any(|i| {
        i.user_id == "alice" && i.target_slot == 3 && i.status == QueueStatus::Completed
    }));
}

// ── Matrix middle-three trigger ─────────────────────────────────────

#[test]
fn matrix_middles_trigger_upgrade_with_middle_three_trigger_kind() {
    let mut h = Harness::new();
    h.join_matrix("carol", "mother");
    for user in ["dan", "x1", "x2", "x3", "bob", "x4", "x5", "bob2"] {
        h.join_matrix(user, "carol");
    }

    assert_eq!(h.engine.highest_slot("carol", Program::Matrix), 2);
    let items = h.engine.upgrades().items();
    let item = items
        .iter()
        .find(|i| i.user_id == "carol" && i.target_slot == 2)
        .expect("queue item for carol");
    assert_eq!(item.status, QueueStatus::Completed);
    assert_eq!(item.trigger_kind, TriggerKind::MiddleThree);
    assert!(approx(item.cost, 22.0));
}

// ── Idempotent replay voids nothing and changes nothing ─────────────

#[test]
fn replayed_join_leaves_queue_and_ledger_untouched() {
    let mut h = Harness::new();
    h.join_binary("alice", "mother");
    h.join_binary("bella", "alice");
    h.join_binary("cara", "bella");

    let ts = h.ts();
    h.engine
        .join("dana", "bella", Program::Binary, common::BINARY_JOIN, None, ts)
        .expect("join");
    let entries_before = h.engine.ledger.len();
    let items_before = h.engine.upgrades().items().len();

    let replay = h
        .engine
        .join("dana", "bella", Program::Binary, common::BINARY_JOIN, None, ts)
        .expect("replay");
    assert!(replay.iter().all(|o| o.replayed));
    assert_eq!(h.engine.ledger.len(), entries_before);
    assert_eq!(h.engine.upgrades().items().len(), items_before);
}
