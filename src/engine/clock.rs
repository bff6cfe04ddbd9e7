use chrono::Utc;

/// Monotonic timestamp source for scripted runs (demo, replay smoke data).
/// Every event needs a distinct timestamp because the correlation-id scheme
/// embeds it.
pub struct EventClock {
    current: u64,
    step: u64,
}

impl EventClock {
    pub fn new(start: u64, step: u64) -> Self {
        EventClock {
            current: start,
            step: step.max(1),
        }
    }

    /// Take the current timestamp and advance.
    pub fn next(&mut self) -> u64 {
        let ts = self.current;
        self.current += self.step;
        ts
    }

    pub fn current(&self) -> u64 {
        self.current
    }
}

/// Wall-clock unix timestamp for live (API/scheduler) callers. The engine
/// itself only ever receives timestamps as inputs.
pub fn wall_clock_ts() -> u64 {
    Utc::now().timestamp().max(0) as u64
}
