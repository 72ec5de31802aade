use crate::envelope::{ApiError, ApiOk, ApiResult};
use crate::middleware::RequestId;
use crate::state::AppState;
use axum::extract::State;
use axum::Extension;
use axum::Json;
use serde_json::{json, Value};

fn snapshot(state: &AppState, request_id: &str) -> ApiResult<Value> {
    let entries = state
        .config
        .editable_snapshot()
        .map_err(|e| ApiError::new(e, request_id.to_string()))?;
    Ok(ApiOk::new(json!({"settings": entries}), request_id.to_string()))
}

pub async fn get_editable(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<Value> {
    snapshot(&state, &request_id.0)
}

pub async fn put_editable(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(patch): Json<Value>,
) -> ApiResult<Value> {
    state
        .config
        .apply_patch(patch)
        .map_err(|e| ApiError::new(e, request_id.0.clone()))?;
    snapshot(&state, &request_id.0)
}

pub async fn reset_editable(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<Value> {
    state.config.reset_to_defaults();
    snapshot(&state, &request_id.0)
}
