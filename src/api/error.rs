use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::engine::EngineError;

/// Wire error: a stable code plus a free-text reason. Internal structure
/// never leaks past this point.
#[derive(Debug)]
pub struct ApiError {
    pub code: &'static str,
    pub status: StatusCode,
    pub reason: String,
}

impl ApiError {
    pub fn validation(reason: impl Into<String>) -> Self {
        ApiError {
            code: "VALIDATION",
            status: StatusCode::BAD_REQUEST,
            reason: reason.into(),
        }
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        ApiError {
            code: "NOT_FOUND",
            status: StatusCode::NOT_FOUND,
            reason: reason.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let code = err.wire_code();
        let status = match code {
            "VALIDATION" => StatusCode::BAD_REQUEST,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "CONFLICT_ALREADY_ACTIVE" | "OUT_OF_SEQUENCE" => StatusCode::CONFLICT,
            "INSUFFICIENT_FUNDS" => StatusCode::PAYMENT_REQUIRED,
            "TRANSIENT" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError {
            code,
            status,
            reason: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "code": self.code, "reason": self.reason });
        (self.status, axum::Json(body)).into_response()
    }
}
