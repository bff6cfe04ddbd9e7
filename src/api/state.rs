use std::sync::Arc;

use tokio::sync::RwLock;

use crate::engine::Engine;

/// Shared API state. The engine sits behind a write lock: one event, one
/// writer — the in-process stand-in for the per-(user, program) partition
/// serialization of a multi-worker deployment.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RwLock<Engine>>,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        AppState {
            engine: Arc::new(RwLock::new(engine)),
        }
    }
}
