use super::parse_source;
use crate::envelope::{ApiError, ApiOk, ApiResult};
use crate::merge::{CommitOutcome, MergeCandidateGroup, MergePreview};
use crate::middleware::RequestId;
use crate::state::AppState;
use axum::extract::State;
use axum::Extension;
use axum::Json;
use midas_models::MidasError;
use serde::Deserialize;
use serde_json::{json, Value};

fn source_or_error(raw: &str, request_id: &str) -> Result<midas_models::Source, ApiError> {
    parse_source(raw).map_err(|e| ApiError::new(e, request_id.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub source: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub min_score: Option<f64>,
}

fn default_limit() -> u32 {
    20
}

pub async fn suggest(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<SuggestRequest>,
) -> ApiResult<Vec<MergeCandidateGroup>> {
    let source = source_or_error(&body.source, &request_id.0)?;
    let groups = state
        .merge_engine
        .suggest(source, body.limit, body.min_score)
        .await
        .map_err(|e| ApiError::new(e, request_id.0.clone()))?;
    Ok(ApiOk::new(groups, request_id.0))
}

#[derive(Debug, Deserialize)]
pub struct NoteIdsRequest {
    pub source: String,
    pub note_ids: Vec<String>,
}

pub async fn preview(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<NoteIdsRequest>,
) -> ApiResult<MergePreview> {
    let source = source_or_error(&body.source, &request_id.0)?;
    let preview = state
        .merge_engine
        .preview(source, &body.note_ids)
        .await
        .map_err(|e| ApiError::new(e, request_id.0.clone()))?;
    Ok(ApiOk::new(preview, request_id.0))
}

#[derive(Debug, Deserialize)]
pub struct CommitRequest {
    pub source: String,
    pub note_ids: Vec<String>,
    pub merged_title: String,
    pub merged_summary_markdown: String,
}

pub async fn commit(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<CommitRequest>,
) -> ApiResult<CommitOutcome> {
    let source = source_or_error(&body.source, &request_id.0)?;
    let outcome = state
        .merge_engine
        .commit(source, &body.note_ids, body.merged_title, body.merged_summary_markdown)
        .await
        .map_err(|e| ApiError::new(e, request_id.0.clone()))?;
    Ok(ApiOk::new(outcome, request_id.0))
}

#[derive(Debug, Deserialize)]
pub struct MergeIdRequest {
    pub source: String,
    pub merge_id: String,
    #[serde(default)]
    pub confirm_destructive: bool,
}

pub async fn rollback(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<MergeIdRequest>,
) -> ApiResult<Value> {
    let source = source_or_error(&body.source, &request_id.0)?;
    state
        .merge_engine
        .rollback(source, &body.merge_id)
        .await
        .map_err(|e| ApiError::new(e, request_id.0.clone()))?;
    Ok(ApiOk::new(json!({"ok": true}), request_id.0))
}

pub async fn finalize(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<MergeIdRequest>,
) -> ApiResult<Value> {
    if !body.confirm_destructive {
        return Err(ApiError::new(
            MidasError::invalid_input("confirm_destructive must be true"),
            request_id.0,
        ));
    }
    let source = source_or_error(&body.source, &request_id.0)?;
    let deleted_source_count = state
        .merge_engine
        .finalize(source, &body.merge_id)
        .await
        .map_err(|e| ApiError::new(e, request_id.0.clone()))?;
    Ok(ApiOk::new(json!({"deleted_source_count": deleted_source_count}), request_id.0))
}
