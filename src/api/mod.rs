pub mod error;
pub mod handlers;
pub mod state;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use crate::engine::Engine;

use state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/join/{program}", post(handlers::join))
        .route("/upgrade/{program}", post(handlers::upgrade))
        .route("/status/{program}/{user_id}", get(handlers::status))
        .route("/progress/global/{user_id}", post(handlers::progress_global))
        .route("/tree/{program}/{user_id}/{slot_no}", get(handlers::tree))
        .route(
            "/recycle/matrix/evaluate/{user_id}/{slot_no}",
            post(handlers::recycle_evaluate),
        )
        .with_state(state)
}

pub async fn serve(host: &str, port: u16) -> Result<()> {
    let state = AppState::new(Engine::default());
    crate::scheduler::spawn(state.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = router(state).layer(cors);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    println!("[api] listening on {addr}");
    axum::serve(listener, app).await.context("serving api")?;
    Ok(())
}
