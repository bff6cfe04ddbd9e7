mod common;

use bitgpt_core::model::{EntryKind, Phase, Program, ReasonCode};

use common::{Harness, approx};

// ── Distribution shape: reserve-bound level share, owner profit ─────

#[test]
fn global_join_routes_level_to_owner_reserve_and_profit_to_wallet() {
    let mut h = Harness::new();
    h.join_global("erin", "mother");
    h.join_global("carol", "erin");

    let outcomes = h.join_global("bob", "carol");
    let entries = h.engine.ledger.entries_for(&outcomes[0].correlation_id);

    // Level 30% accumulates toward Carol's next progression slot.
    let reserve: Vec<_> = entries
        .iter()
        .filter(|e| e.kind == EntryKind::ReserveCredit)
        .collect();
    assert_eq!(reserve.len(), 1);
    assert_eq!(reserve[0].user_id, "carol");
    assert_eq!(reserve[0].target_slot, Some(2));
    assert!(approx(reserve[0].amount, 9.9));

    // Profit 30% is the owner's tree income.
    let profit: Vec<_> = entries
        .iter()
        .filter(|e| e.kind == EntryKind::WalletCredit && e.reason == ReasonCode::LevelDistribution)
        .collect();
    assert_eq!(profit.len(), 1);
    assert_eq!(profit[0].user_id, "carol");
    assert!(approx(profit[0].amount, 9.9));

    let partner: Vec<_> = entries
        .iter()
        .filter(|e| e.reason == ReasonCode::PartnerIncentive)
        .collect();
    assert_eq!(partner[0].user_id, "carol");
    assert!(approx(partner[0].amount, 3.3));

    let triple: Vec<_> = entries
        .iter()
        .filter(|e| e.reason == ReasonCode::TripleEntryFund)
        .collect();
    assert!(approx(triple[0].amount, 1.65));

    // Conservation: credits minus the commission's mother debit equals 33.
    let credits: f64 = entries
        .iter()
        .filter(|e| e.kind != EntryKind::WalletDebit)
        .map(|e| e.amount)
        .sum();
    let debits: f64 = entries
        .iter()
        .filter(|e| e.kind == EntryKind::WalletDebit)
        .map(|e| e.amount)
        .sum();
    assert!(approx(credits - debits, 33.0));
}

// ── Phase progression: P1 → P2 → next slot via reserve ──────────────

#[test]
fn phase_trees_fill_advance_and_reserve_funds_the_next_slot() {
    let mut h = Harness::new();
    h.join_global("carol", "mother");

    // Four members complete Carol's P1 tree.
    for i in 1..=4 {
        h.join_global(&format!("p{i}"), "carol");
    }
    let state = h.engine.global_trees.state("carol").expect("state");
    assert_eq!(state.phase, Phase::P2);
    assert_eq!(state.slot_no, 1);
    assert_eq!(state.members_in_phase, 0);

    // Eight more fill P2. Along the way the accumulated 30% level reserve
    // crosses the $66 slot-2 price and auto-activates it.
    for i in 5..=12 {
        h.join_global(&format!("p{i}"), "carol");
    }
    assert_eq!(h.engine.highest_slot("carol", Program::Global), 2);

    let state = h.engine.global_trees.state("carol").expect("state");
    assert_eq!(state.phase, Phase::P1);
    assert_eq!(state.slot_no, 2);

    // The idempotent tick finds nothing further to do.
    let ts = h.ts();
    let after = h.engine.progress_global("carol", ts).expect("tick").expect("state");
    assert_eq!(after.phase, Phase::P1);
    assert_eq!(after.slot_no, 2);
}
