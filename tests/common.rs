#![allow(dead_code)]

use bitgpt_core::Engine;
use bitgpt_core::engine::EventOutcome;
use bitgpt_core::engine::clock::EventClock;
use bitgpt_core::model::Program;

pub const BINARY_JOIN: f64 = 0.0066;
pub const MATRIX_JOIN: f64 = 11.0;
pub const GLOBAL_JOIN: f64 = 33.0;

pub const EPS: f64 = 1e-9;

/// Engine plus a ticking clock; every event gets a distinct timestamp.
pub struct Harness {
    pub engine: Engine,
    pub clock: EventClock,
}

impl Harness {
    pub fn new() -> Self {
        Harness {
            engine: Engine::default(),
            clock: EventClock::new(1_700_000_000, 60),
        }
    }

    pub fn ts(&mut self) -> u64 {
        self.clock.next()
    }

    pub fn join_binary(&mut self, user: &str, referrer: &str) -> Vec<EventOutcome> {
        let ts = self.clock.next();
        self.engine
            .join(user, referrer, Program::Binary, BINARY_JOIN, None, ts)
            .expect("binary join")
    }

    pub fn join_matrix(&mut self, user: &str, referrer: &str) -> Vec<EventOutcome> {
        let ts = self.clock.next();
        self.engine
            .join(user, referrer, Program::Matrix, MATRIX_JOIN, None, ts)
            .expect("matrix join")
    }

    pub fn join_global(&mut self, user: &str, referrer: &str) -> Vec<EventOutcome> {
        let ts = self.clock.next();
        self.engine
            .join(user, referrer, Program::Global, GLOBAL_JOIN, None, ts)
            .expect("global join")
    }
}

pub fn approx(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-6
}
