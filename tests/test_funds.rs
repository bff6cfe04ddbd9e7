mod common;

use bitgpt_core::funds::FundsState;
use bitgpt_core::ledger::{Ledger, Write};
use bitgpt_core::model::user::CommissionCategory;
use bitgpt_core::model::{Currency, EntryKind, FundPool, Program, ReasonCode};

use common::{Harness, approx};

// ── Spark: 20% to triple-entry, 80% over level cohorts ──────────────

#[test]
fn spark_payout_splits_pool_across_matrix_levels() {
    let mut h = Harness::new();
    h.join_matrix("erin", "mother");
    h.join_matrix("carol", "erin");
    h.join_matrix("bob", "carol");

    let pool = h.engine.ledger.pool_balance(FundPool::Spark, Currency::Usdt);
    assert!(approx(pool, 3.0 * 0.88));

    let before: Vec<f64> = ["erin", "carol", "bob"]
        .iter()
        .map(|u| h.engine.ledger.wallet_balance(u, Currency::Usdt))
        .collect();

    let ts = h.ts();
    let paid = h.engine.payout_spark(ts).expect("spark payout");
    assert_eq!(paid, 3);

    let triple = h
        .engine
        .ledger
        .pool_balance(FundPool::TripleEntry, Currency::Usdt);
    assert!(approx(triple, pool * 0.20));

    // All three users sit at matrix slot 1: they share level 1's 15% of the
    // distributable 80%.
    let per_user = pool * 0.80 * 0.15 / 3.0;
    for (i, user) in ["erin", "carol", "bob"].iter().enumerate() {
        let after = h.engine.ledger.wallet_balance(user, Currency::Usdt);
        assert!(approx(after - before[i], per_user), "{user} spark share");
    }

    // Levels without qualifying users leave their share pooled.
    let remaining = h.engine.ledger.pool_balance(FundPool::Spark, Currency::Usdt);
    assert!(approx(remaining, pool * 0.80 * 0.85));
}

// ── Leadership stipend: solvency-capped daily run ───────────────────

#[test]
fn stipend_pays_twice_the_slot_price_capped_by_the_pool() {
    let mut ledger = Ledger::new();
    let mut seed = Write::new(
        0,
        "seed",
        Program::Binary,
        EntryKind::FundCredit,
        1.0,
        Currency::Bnb,
        ReasonCode::LeadershipStipendFund,
        "seed",
        "seed",
    );
    seed.pool = Some(FundPool::LeadershipStipend);
    ledger.append_batch(vec![seed]).expect("seed pool");

    let mut funds = FundsState::new();
    let eligible = vec![("lead".to_string(), Program::Binary, 10u8)];
    let paid = funds
        .payout_stipend(&mut ledger, &eligible, 86_400)
        .expect("stipend");
    assert_eq!(paid, 1);

    // Obligation is 2 × 1.1264 BNB but the pool held only 1.0: pro-rated.
    assert!(approx(ledger.wallet_balance("lead", Currency::Bnb), 1.0));
    assert!(approx(
        ledger.pool_balance(FundPool::LeadershipStipend, Currency::Bnb),
        0.0
    ));
}

// ── Newcomer: the deferred half splits over current directs ─────────

#[test]
fn newcomer_fund_distributes_equally_among_directs() {
    let mut h = Harness::new();
    h.join_matrix("carol", "mother");
    h.join_matrix("d1", "carol");
    h.join_matrix("d2", "carol");

    assert!(approx(h.engine.ledger.newcomer_upline_balance("carol"), 2.20));
    let d1_before = h.engine.ledger.wallet_balance("d1", Currency::Usdt);

    let ts = h.ts();
    let paid = h.engine.payout_newcomer(ts).expect("newcomer payout");
    assert_eq!(paid, 2);

    assert!(approx(h.engine.ledger.newcomer_upline_balance("carol"), 0.0));
    let d1_after = h.engine.ledger.wallet_balance("d1", Currency::Usdt);
    assert!(approx(d1_after - d1_before, 1.10));
}

// ── Triple entry: every-program users share the pool ────────────────

#[test]
fn triple_entry_pays_users_holding_all_three_programs() {
    let mut h = Harness::new();
    h.join_binary("carol", "mother");
    h.join_matrix("carol", "mother");
    h.join_global("carol", "mother");
    // A matrix-only user is not eligible.
    h.join_matrix("dan", "carol");

    let pool = h
        .engine
        .ledger
        .pool_balance(FundPool::TripleEntry, Currency::Usd);
    assert!(approx(pool, 1.65));

    let ts = h.ts();
    h.engine.payout_triple_entry(ts).expect("triple entry payout");

    assert!(approx(h.engine.ledger.wallet_balance("carol", Currency::Usd), 1.65));
    assert!(approx(h.engine.ledger.wallet_balance("dan", Currency::Usd), 0.0));
}

// ── Dream matrix: qualification and progressive tranches ────────────

#[test]
fn dream_matrix_pays_progressive_tranches_after_three_directs() {
    let mut h = Harness::new();
    h.join_matrix("carol", "mother");
    h.join_matrix("d1", "carol");
    h.join_matrix("d2", "carol");
    h.join_matrix("d3", "carol"); // qualifies and pays tranche 1
    h.join_matrix("d4", "carol"); // tranche 2
    h.join_matrix("d5", "carol"); // tranche 3

    let progress = h.engine.funds().dream_progress("carol");
    assert!(progress.qualified_at.is_some());
    assert_eq!(progress.tranches_paid, 3);

    let tranches: Vec<f64> = h
        .engine
        .ledger
        .commissions()
        .iter()
        .filter(|c| c.category == CommissionCategory::DreamMatrix && c.payee_user_id == "carol")
        .map(|c| c.amount)
        .collect();
    assert_eq!(tranches.len(), 3);
    assert!(approx(tranches[0], 89.10));
    assert!(approx(tranches[1], 89.10));
    assert!(approx(tranches[2], 133.65));
}

// ── Royal captain: tiers pay from the pool, solvency-gated ──────────

#[test]
fn royal_captain_awards_first_tier_at_qualification() {
    let mut h = Harness::new();
    h.join_matrix("carol", "mother");
    h.join_global("carol", "mother");

    // Seed the pool so the tier award clears solvency.
    let mut seed = Write::new(
        0,
        "seed",
        Program::Global,
        EntryKind::FundCredit,
        1000.0,
        Currency::Usd,
        ReasonCode::RoyalCaptainFund,
        "seed",
        "seed",
    );
    seed.pool = Some(FundPool::RoyalCaptain);
    h.engine.ledger.append_batch(vec![seed]).expect("seed pool");

    for i in 1..=5 {
        let name = format!("c{i}");
        h.join_matrix(&name, "carol");
        h.join_global(&name, "carol");
    }

    // Five directs each holding Matrix + Global: tier 1 pays $200.
    let usd = h.engine.ledger.wallet_balance("carol", Currency::Usd);
    assert!(usd >= 200.0, "tier award missing: carol holds {usd}");
    let award: Vec<_> = h
        .engine
        .ledger
        .entries()
        .iter()
        .filter(|e| {
            e.user_id == "carol"
                && e.kind == EntryKind::WalletCredit
                && e.reason == ReasonCode::RoyalCaptainFund
        })
        .collect();
    assert_eq!(award.len(), 1);
    assert!(approx(award[0].amount, 200.0));
    assert!(
        h.engine
            .funds()
            .eligibility_records()
            .iter()
            .any(|r| r.user_id == "carol")
    );
}
