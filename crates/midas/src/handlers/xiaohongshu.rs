use crate::clients::load_initial_capture;
use crate::envelope::{ApiError, ApiOk, ApiResult};
use crate::jobs::CooldownStatus;
use crate::middleware::RequestId;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Extension;
use axum::Json;
use midas_models::{AuthCapture, Job, MidasError, SummaryArtifact};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct SummarizeUrlRequest {
    pub url: String,
}

pub async fn summarize_url(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<SummarizeUrlRequest>,
) -> ApiResult<SummaryArtifact> {
    let artifact = state
        .xiaohongshu_pipeline
        .summarize_url(&body.url)
        .await
        .map_err(|e| ApiError::new(e, request_id.0.clone()))?;
    Ok(ApiOk::new(artifact, request_id.0))
}

#[derive(Debug, Deserialize)]
pub struct SubmitSyncRequest {
    pub limit: Option<u32>,
}

pub async fn submit_sync(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<SubmitSyncRequest>,
) -> ApiResult<Value> {
    let tree = state.config.get();
    let requested_limit = body.limit.unwrap_or(tree.xiaohongshu.default_limit).min(tree.xiaohongshu.max_limit);

    let job_id = state
        .jobs
        .submit_xhs_collection_sync(
            requested_limit,
            tree.xiaohongshu.min_live_sync_interval_seconds,
            state.xiaohongshu_pipeline.clone(),
        )
        .await
        .map_err(|e| ApiError::new(e, request_id.0.clone()))?;

    Ok(ApiOk::new(
        json!({"job_id": job_id, "status": "pending", "requested_limit": requested_limit}),
        request_id.0,
    ))
}

pub async fn get_sync_job(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(job_id): Path<String>,
) -> ApiResult<Job> {
    let job = state
        .jobs
        .get(&job_id)
        .await
        .ok_or_else(|| ApiError::new(MidasError::invalid_input("job not found"), request_id.0.clone()))?;
    Ok(ApiOk::new(job, request_id.0))
}

pub async fn get_cooldown(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<CooldownStatus> {
    let tree = state.config.get();
    let status = state.jobs.cooldown_status(tree.xiaohongshu.min_live_sync_interval_seconds).await;
    Ok(ApiOk::new(status, request_id.0))
}

#[derive(Debug, Deserialize)]
pub struct AuthUpdateRequest {
    pub cookie: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub referer: String,
    #[serde(default)]
    pub extra_headers: std::collections::HashMap<String, String>,
}

pub async fn update_auth(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<AuthUpdateRequest>,
) -> ApiResult<Value> {
    let capture = AuthCapture {
        cookie: body.cookie,
        user_agent: body.user_agent,
        origin: body.origin,
        referer: body.referer,
        extra_headers: body.extra_headers,
    };
    state
        .xiaohongshu_fetcher
        .set_auth(capture.clone())
        .await
        .map_err(|e| ApiError::new(e, request_id.0.clone()))?;
    Ok(ApiOk::new(json!({"cookie_pairs": capture.cookie_pairs()}), request_id.0))
}

pub async fn refresh_capture(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<Value> {
    let tree = state.config.get();
    let har_path = state.config.resolve_path(&tree.xiaohongshu.har_capture_path);
    let curl_path = state.config.resolve_path(&tree.xiaohongshu.curl_capture_path);

    let (capture, report) = load_initial_capture(&har_path, &curl_path, &tree.xiaohongshu.allowed_hosts)
        .map_err(|e| ApiError::new(e, request_id.0.clone()))?;
    state
        .xiaohongshu_fetcher
        .set_auth(capture)
        .await
        .map_err(|e| ApiError::new(e, request_id.0.clone()))?;

    Ok(ApiOk::new(serde_json::to_value(report).unwrap_or(Value::Null), request_id.0))
}

pub async fn prune_synced(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<Value> {
    let candidate_count = state
        .dedupe
        .candidate_prune_count(midas_models::Source::Xiaohongshu)
        .await
        .map_err(|e| ApiError::new(e.into(), request_id.0.clone()))?;
    let deleted_count = state
        .dedupe
        .prune_unsaved(midas_models::Source::Xiaohongshu)
        .await
        .map_err(|e| ApiError::new(e.into(), request_id.0.clone()))?;

    Ok(ApiOk::new(
        json!({"candidate_count": candidate_count, "deleted_count": deleted_count}),
        request_id.0,
    ))
}
