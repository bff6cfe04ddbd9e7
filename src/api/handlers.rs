use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::engine::clock::wall_clock_ts;
use crate::model::Program;

use super::error::ApiError;
use super::state::AppState;

fn parse_program(raw: &str) -> Result<Program, ApiError> {
    Program::parse(raw).ok_or_else(|| ApiError::not_found(format!("program {raw}")))
}

#[derive(Deserialize)]
pub struct JoinBody {
    pub user_id: String,
    pub referrer_id: String,
    #[serde(default)]
    pub tx_hash: Option<String>,
    pub currency: String,
    pub amount: f64,
    /// Test hook; live callers omit it and get the wall clock.
    #[serde(default)]
    pub ts: Option<u64>,
}

pub async fn join(
    State(state): State<AppState>,
    Path(program): Path<String>,
    Json(body): Json<JoinBody>,
) -> Result<Json<Value>, ApiError> {
    let program = parse_program(&program)?;
    if body.currency != program.currency().as_str() {
        return Err(ApiError::validation(format!(
            "{program} settles in {}, not {}",
            program.currency(),
            body.currency
        )));
    }
    let ts = body.ts.unwrap_or_else(wall_clock_ts);
    let mut engine = state.engine.write().await;
    let outcomes = engine.join(
        &body.user_id,
        &body.referrer_id,
        program,
        body.amount,
        body.tx_hash,
        ts,
    )?;
    Ok(Json(json!({ "outcomes": outcomes })))
}

#[derive(Deserialize)]
pub struct UpgradeBody {
    pub user_id: String,
    pub target_slot: u8,
    #[serde(default)]
    pub tx_hash: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub ts: Option<u64>,
}

pub async fn upgrade(
    State(state): State<AppState>,
    Path(program): Path<String>,
    Json(body): Json<UpgradeBody>,
) -> Result<Json<Value>, ApiError> {
    let program = parse_program(&program)?;
    let ts = body.ts.unwrap_or_else(wall_clock_ts);
    let mut engine = state.engine.write().await;
    let outcome = engine.upgrade(
        &body.user_id,
        program,
        body.target_slot,
        body.amount,
        body.tx_hash,
        ts,
    )?;
    Ok(Json(json!({ "outcome": outcome })))
}

pub async fn status(
    State(state): State<AppState>,
    Path((program, user_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let program = parse_program(&program)?;
    let engine = state.engine.read().await;
    let view = engine.status(program, &user_id)?;
    Ok(Json(json!(view)))
}

pub async fn progress_global(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let ts = wall_clock_ts();
    let mut engine = state.engine.write().await;
    let phase = engine.progress_global(&user_id, ts)?;
    Ok(Json(json!({ "user_id": user_id, "phase": phase })))
}

#[derive(Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

pub async fn tree(
    State(state): State<AppState>,
    Path((program, user_id, slot_no)): Path<(String, String, u8)>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let program = parse_program(&program)?;
    let engine = state.engine.read().await;
    let nodes = engine.tree_view(program, &user_id, slot_no, page.offset, page.limit.min(1000))?;
    let total = engine.tree_total(program, &user_id, slot_no)?;
    Ok(Json(json!({
        "user_id": user_id,
        "slot_no": slot_no,
        "offset": page.offset,
        "total": total,
        "nodes": nodes,
    })))
}

pub async fn recycle_evaluate(
    State(state): State<AppState>,
    Path((user_id, slot_no)): Path<(String, u8)>,
) -> Result<Json<Value>, ApiError> {
    let ts = wall_clock_ts();
    let mut engine = state.engine.write().await;
    let recycled = engine.evaluate_matrix_recycle(&user_id, slot_no, ts)?;
    Ok(Json(json!({ "user_id": user_id, "slot_no": slot_no, "recycled": recycled })))
}

pub async fn health() -> &'static str {
    "ok"
}
