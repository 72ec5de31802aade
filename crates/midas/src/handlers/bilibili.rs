use crate::envelope::{ApiError, ApiOk, ApiResult};
use crate::middleware::RequestId;
use crate::state::AppState;
use axum::extract::State;
use axum::Extension;
use axum::Json;
use midas_models::SummaryArtifact;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub video_url: String,
}

pub async fn summarize(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<SummarizeRequest>,
) -> ApiResult<SummaryArtifact> {
    let artifact = state
        .bilibili_pipeline
        .summarize(&body.video_url)
        .await
        .map_err(|e| ApiError::new(e, request_id.0.clone()))?;
    Ok(ApiOk::new(artifact, request_id.0))
}
