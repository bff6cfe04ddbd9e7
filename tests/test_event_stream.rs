mod common;

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use bitgpt_core::catalog;
use bitgpt_core::engine::queue::WorkQueue;
use bitgpt_core::model::event::ActivationKind;
use bitgpt_core::model::journal::{EventJournal, JournalEvent};
use bitgpt_core::model::{Currency, EntryKind, Program, UserId};
use bitgpt_core::{Engine, EngineError, validate};

const SEED: u64 = 42;

/// Build a deterministic random stream of joins and upgrades.
fn random_journal(seed: u64, users: usize) -> EventJournal {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut events = Vec::new();
    let mut ts = 1_700_000_000u64;
    let mut known: Vec<UserId> = vec!["mother".to_string()];
    // (user, program) → highest slot, tracked so upgrades stay in sequence.
    let mut slots: HashMap<(UserId, Program), u8> = HashMap::new();

    for i in 0..users {
        let user = format!("u{i}");
        let referrer = known[rng.random_range(0..known.len())].clone();
        let mut joined_any = false;
        for program in Program::all() {
            if rng.random_range(0..100) < 55 {
                events.push(JournalEvent::Join {
                    user_id: user.clone(),
                    referrer_id: referrer.clone(),
                    program,
                    amount: catalog::join_price(program),
                    tx_hash: None,
                    ts,
                });
                ts += 60;
                let start = if program == Program::Binary { 2 } else { 1 };
                slots.insert((user.clone(), program), start);
                joined_any = true;
            }
        }
        if !joined_any {
            // Everyone joins at least one program.
            events.push(JournalEvent::Join {
                user_id: user.clone(),
                referrer_id: referrer.clone(),
                program: Program::Matrix,
                amount: catalog::join_price(Program::Matrix),
                tx_hash: None,
                ts,
            });
            ts += 60;
            slots.insert((user.clone(), Program::Matrix), 1);
        }
        known.push(user.clone());

        // Occasional paid upgrade by an earlier user.
        if rng.random_range(0..100) < 40 {
            let candidate = known[rng.random_range(1..known.len())].clone();
            for program in Program::all() {
                if let Some(&current) = slots.get(&(candidate.clone(), program)) {
                    let target = current + 1;
                    if target <= program.max_slot() && rng.random_range(0..100) < 50 {
                        events.push(JournalEvent::Upgrade {
                            user_id: candidate.clone(),
                            program,
                            target_slot: target,
                            amount: catalog::upgrade_cost(program, target).unwrap(),
                            tx_hash: None,
                            ts,
                        });
                        ts += 60;
                        slots.insert((candidate.clone(), program), target);
                    }
                    break;
                }
            }
        }
    }
    EventJournal {
        name: format!("random-{seed}"),
        description: None,
        events,
    }
}

fn apply_journal(engine: &mut Engine, journal: &EventJournal) {
    for event in &journal.events {
        match engine.apply_journal_event(event) {
            Ok(()) => {}
            // A reserve-funded auto-upgrade can beat a scripted upgrade to
            // the same slot; the conflict rejection is the correct outcome.
            Err(EngineError::AlreadyActive { .. }) => {}
            Err(err) => panic!("event rejected: {err}"),
        }
    }
}

#[test]
fn random_stream_preserves_all_invariants() {
    let journal = random_journal(SEED, 40);
    assert!(validate::check_journal(&journal).is_empty());

    let mut engine = Engine::default();
    apply_journal(&mut engine, &journal);

    // P1: per event, credits − debits equals the external inflow (zero for
    // auto-activations and re-entries, which are funded internally).
    for activation in engine.activation_log() {
        let entries = engine.ledger.entries_for(&activation.correlation_id);
        assert!(!entries.is_empty());
        let credits: f64 = entries
            .iter()
            .filter(|e| !matches!(e.kind, EntryKind::WalletDebit | EntryKind::ReserveDebit))
            .map(|e| e.amount)
            .sum();
        let debits: f64 = entries
            .iter()
            .filter(|e| matches!(e.kind, EntryKind::WalletDebit | EntryKind::ReserveDebit))
            .map(|e| e.amount)
            .sum();
        let expected = match activation.kind {
            ActivationKind::Initial | ActivationKind::Upgrade => activation.amount_paid,
            ActivationKind::Auto | ActivationKind::RecycleReentry => 0.0,
        };
        let diff = credits - debits;
        assert!(
            (diff - expected).abs() < 1e-6,
            "conservation broken for {}: {diff} vs {expected}",
            activation.correlation_id
        );
    }

    // P2: every user's activations form a contiguous prefix from slot 1
    // (binary from 1–2 in one join).
    let mut by_user: HashMap<(UserId, Program), Vec<u8>> = HashMap::new();
    for activation in engine.activation_log() {
        if activation.kind != ActivationKind::RecycleReentry {
            by_user
                .entry((activation.user_id.clone(), activation.program))
                .or_default()
                .push(activation.slot_no);
        }
    }
    for ((user, program), mut slots) in by_user {
        slots.sort_unstable();
        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(
                *slot as usize,
                i + 1,
                "{user} {program} has a gap in activations"
            );
        }
    }

    // P3: reserve balances stay non-negative at every ledger prefix.
    let mut reserves: HashMap<(UserId, Program, u8), f64> = HashMap::new();
    for entry in engine.ledger.entries() {
        match entry.kind {
            EntryKind::ReserveCredit => {
                *reserves
                    .entry((entry.user_id.clone(), entry.program, entry.target_slot.unwrap()))
                    .or_insert(0.0) += entry.amount;
            }
            EntryKind::ReserveDebit => {
                let balance = reserves
                    .entry((entry.user_id.clone(), entry.program, entry.target_slot.unwrap()))
                    .or_insert(0.0);
                *balance -= entry.amount;
                assert!(*balance > -1e-9, "reserve went negative at seq {}", entry.seq);
            }
            _ => {}
        }
    }

    // P5: rank history is non-decreasing.
    let mut seen_users: HashSet<UserId> = HashSet::new();
    for activation in engine.activation_log() {
        seen_users.insert(activation.user_id.clone());
    }
    for user in &seen_users {
        let history = engine.ranks().history_of(user);
        for pair in history.windows(2) {
            assert!(pair[0].rank <= pair[1].rank, "{user} rank decreased");
        }
        assert_eq!(
            engine.rank_of(user),
            catalog::rank_for_total_slots(engine.total_active_slots(user))
        );
    }

    // P6: no matrix generation ever exceeds 39 members.
    for user in &seen_users {
        for slot in 1..=Program::Matrix.max_slot() {
            for generation in engine.matrix_trees.generations(user, slot) {
                assert!(generation.member_count() <= catalog::MATRIX_TREE_CAPACITY);
            }
        }
    }
}

// ── P4: full-journal replay is a no-op ──────────────────────────────

#[test]
fn replaying_the_whole_journal_changes_nothing() {
    let journal = random_journal(SEED, 25);
    let mut engine = Engine::default();
    apply_journal(&mut engine, &journal);

    let entries = engine.ledger.len();
    let sample: Vec<f64> = (0..25)
        .map(|i| engine.ledger.wallet_balance(&format!("u{i}"), Currency::Usdt))
        .collect();

    apply_journal(&mut engine, &journal);

    assert_eq!(engine.ledger.len(), entries);
    for (i, before) in sample.iter().enumerate() {
        let after = engine.ledger.wallet_balance(&format!("u{i}"), Currency::Usdt);
        assert!((after - before).abs() < 1e-9);
    }
}

// ── Partition queue: per-(user, program) FIFO order ─────────────────

#[test]
fn work_queue_preserves_per_partition_order() {
    let mut queue = WorkQueue::new();
    let join = |user: &str, program: Program, ts: u64| JournalEvent::Join {
        user_id: user.to_string(),
        referrer_id: "mother".to_string(),
        program,
        amount: catalog::join_price(program),
        tx_hash: None,
        ts,
    };
    queue.push(join("a", Program::Binary, 1));
    queue.push(join("a", Program::Matrix, 2));
    queue.push(join("b", Program::Binary, 3));
    queue.push(JournalEvent::Upgrade {
        user_id: "a".to_string(),
        program: Program::Binary,
        target_slot: 3,
        amount: catalog::upgrade_cost(Program::Binary, 3).unwrap(),
        tx_hash: None,
        ts: 4,
    });

    let mut a_binary: Vec<u64> = Vec::new();
    while let Some(event) = queue.pop_next() {
        if event.user_id() == "a" {
            if let JournalEvent::Join { program: Program::Binary, ts, .. }
            | JournalEvent::Upgrade { program: Program::Binary, ts, .. } = event
            {
                a_binary.push(ts);
            }
        }
    }
    assert_eq!(a_binary, vec![1, 4], "partition order must be FIFO");
}
