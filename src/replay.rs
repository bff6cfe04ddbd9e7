use std::path::Path;

use anyhow::{Context, Result, bail};

use bitgpt_core::engine::queue::WorkQueue;
use bitgpt_core::model::{Currency, EventJournal};
use bitgpt_core::{Engine, EngineError, validate as journal_validate};

fn load(path: &Path) -> Result<EventJournal> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

pub fn validate(path: &Path) -> Result<()> {
    let journal = load(path)?;
    let errors = journal_validate::check_journal(&journal);
    if errors.is_empty() {
        println!("{}: {} events, valid", journal.name, journal.events.len());
        Ok(())
    } else {
        for err in &errors {
            eprintln!("  {err}");
        }
        bail!("{} validation error(s)", errors.len());
    }
}

pub fn run(path: &Path, twice: bool) -> Result<()> {
    let journal = load(path)?;
    let errors = journal_validate::check_journal(&journal);
    if !errors.is_empty() {
        for err in &errors {
            eprintln!("  {err}");
        }
        bail!("journal invalid, not replaying");
    }

    let mut engine = Engine::default();
    apply(&mut engine, &journal)?;
    println!(
        "applied {} events: {} ledger entries",
        journal.events.len(),
        engine.ledger.len()
    );

    if twice {
        let entries_before = engine.ledger.len();
        apply(&mut engine, &journal)?;
        if engine.ledger.len() != entries_before {
            bail!(
                "replay was not idempotent: {} entries grew to {}",
                entries_before,
                engine.ledger.len()
            );
        }
        println!("second pass: no new entries (idempotent)");
    }

    // Final wallet balances, one line per account seen in the ledger.
    let mut accounts: Vec<(String, Currency)> = engine
        .ledger
        .entries()
        .iter()
        .map(|e| (e.user_id.clone(), e.currency))
        .collect();
    accounts.sort();
    accounts.dedup();
    for (user, currency) in accounts {
        let balance = engine.ledger.wallet_balance(&user, currency);
        if balance.abs() > 1e-9 {
            println!("  {user:<24} {balance:>16.6} {currency}");
        }
    }
    Ok(())
}

/// Drain the journal through the per-(user, program) partition queue.
/// Cross-partition causality (a referrer joining before their directs) is
/// resolved by requeueing events whose dependencies have not landed yet.
fn apply(engine: &mut Engine, journal: &EventJournal) -> Result<()> {
    let mut queue = WorkQueue::new();
    for event in &journal.events {
        queue.push(event.clone());
    }

    let mut stalls = 0usize;
    while let Some(event) = queue.pop_next() {
        match engine.apply_journal_event(&event) {
            Ok(()) => stalls = 0,
            Err(EngineError::NotFound(_)) | Err(EngineError::OutOfSequence { .. })
                if stalls <= queue.len() =>
            {
                // Dependency still queued in another partition; retry later.
                stalls += 1;
                queue.push(event);
            }
            Err(err) => bail!("event for {} rejected: {err}", event.user_id()),
        }
    }
    Ok(())
}
