use anyhow::Result;

use bitgpt_core::Engine;
use bitgpt_core::engine::clock::EventClock;
use bitgpt_core::model::Program;

/// Scripted cascade: a short referral chain joins all three programs, one
/// paid upgrade lands, then the due payouts run. Prints the full ledger and
/// final balances.
pub fn run() -> Result<()> {
    let mut engine = Engine::default();
    let mut clock = EventClock::new(1_700_000_000, 60);

    engine.join("carol", "mother", Program::Binary, 0.0066, None, clock.next())?;
    engine.join("carol", "mother", Program::Matrix, 11.0, None, clock.next())?;
    engine.join("carol", "mother", Program::Global, 33.0, None, clock.next())?;

    engine.join("dan", "carol", Program::Binary, 0.0066, None, clock.next())?;
    engine.join("dan", "carol", Program::Matrix, 11.0, None, clock.next())?;

    engine.join("ada", "dan", Program::Binary, 0.0066, None, clock.next())?;
    engine.join("ada", "dan", Program::Matrix, 11.0, None, clock.next())?;
    engine.join("bob", "dan", Program::Matrix, 11.0, None, clock.next())?;
    engine.join("eve", "dan", Program::Matrix, 11.0, None, clock.next())?;

    engine.upgrade("dan", Program::Matrix, 2, 22.0, None, clock.next())?;

    engine.run_due_payouts(clock.next())?;

    println!();
    println!("{:>4}  {:<10} {:<16} {:>14}  {:<4}  {}", "seq", "user", "kind", "amount", "cur", "reason");
    for entry in engine.ledger.entries() {
        println!(
            "{:>4}  {:<10} {:<16} {:>14.6}  {:<4}  {}",
            entry.seq,
            entry.user_id,
            format!("{:?}", entry.kind),
            entry.amount,
            entry.currency,
            entry.reason,
        );
    }

    println!();
    for user in ["mother", "carol", "dan", "ada", "bob", "eve"] {
        for program in Program::all() {
            let balance = engine.ledger.wallet_balance(user, program.currency());
            if balance.abs() > 1e-9 {
                println!("  {user:<8} {balance:>14.6} {}", program.currency());
            }
        }
        let rank = engine.rank_of(user);
        if rank > 0 {
            println!("  {user:<8} rank {rank}");
        }
    }
    Ok(())
}
