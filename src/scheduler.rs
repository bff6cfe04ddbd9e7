//! Periodic payout worker: a single wall-clock tick loop that asks the
//! engine to run whatever payouts fell due (daily stipend, 30-day newcomer
//! distribution, spark and triple-entry runs). The engine tracks last-run
//! timestamps, so the tick cadence only bounds latency.

use std::time::Duration;

use crate::api::state::AppState;
use crate::engine::clock::wall_clock_ts;

/// Seconds between scheduler wake-ups.
pub const TICK_SECS: u64 = 3600;

pub fn spawn(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(TICK_SECS));
        loop {
            ticker.tick().await;
            let now = wall_clock_ts();
            let mut engine = state.engine.write().await;
            if let Err(err) = engine.run_due_payouts(now) {
                eprintln!("[scheduler] payout run failed: {err}");
            }
        }
    })
}
