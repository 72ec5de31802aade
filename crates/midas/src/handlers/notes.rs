//! Shared note CRUD behind the `/api/notes/{bilibili,xiaohongshu}` routes
//! (spec §6). One set of handlers per source, both backed by the same
//! `NoteStore`.

use crate::envelope::{ApiError, ApiOk, ApiResult};
use crate::middleware::RequestId;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Extension;
use axum::Json;
use midas_db::NoteFilter;
use midas_models::{SavedNote, Source, SummaryArtifact};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClearRequest {
    #[serde(default)]
    pub confirm_destructive: bool,
}

async fn save(state: &AppState, request_id: &str, artifact: SummaryArtifact) -> ApiResult<SavedNote> {
    let note = state
        .notes
        .save(artifact)
        .await
        .map_err(|e| ApiError::new(e.into(), request_id.to_string()))?;
    Ok(ApiOk::new(note, request_id.to_string()))
}

async fn list(state: &AppState, request_id: &str, source: Source, query: ListQuery) -> ApiResult<Value> {
    let notes = state
        .notes
        .list(source, NoteFilter { query: query.query })
        .await
        .map_err(|e| ApiError::new(e.into(), request_id.to_string()))?;
    Ok(ApiOk::new(
        json!({"total": notes.len(), "items": notes}),
        request_id.to_string(),
    ))
}

async fn delete_one(state: &AppState, request_id: &str, source: Source, note_id: &str) -> ApiResult<Value> {
    state
        .notes
        .delete(source, note_id)
        .await
        .map_err(|e| ApiError::new(e.into(), request_id.to_string()))?;
    Ok(ApiOk::new(json!({"deleted_count": 1}), request_id.to_string()))
}

async fn clear(state: &AppState, request_id: &str, source: Source, confirm: bool) -> ApiResult<Value> {
    if !confirm {
        return Err(ApiError::new(
            midas_models::MidasError::invalid_input("confirm_destructive must be true"),
            request_id.to_string(),
        ));
    }
    let deleted = state
        .notes
        .clear(source)
        .await
        .map_err(|e| ApiError::new(e.into(), request_id.to_string()))?;
    Ok(ApiOk::new(json!({"deleted_count": deleted}), request_id.to_string()))
}

macro_rules! source_handlers {
    ($module:ident, $source:expr) => {
        pub mod $module {
            use super::*;

            pub async fn save(
                State(state): State<AppState>,
                Extension(request_id): Extension<RequestId>,
                Json(body): Json<SummaryArtifact>,
            ) -> ApiResult<SavedNote> {
                super::save(&state, &request_id.0, body).await
            }

            pub async fn list(
                State(state): State<AppState>,
                Extension(request_id): Extension<RequestId>,
                Query(query): Query<ListQuery>,
            ) -> ApiResult<Value> {
                super::list(&state, &request_id.0, $source, query).await
            }

            pub async fn delete_one(
                State(state): State<AppState>,
                Extension(request_id): Extension<RequestId>,
                Path(note_id): Path<String>,
            ) -> ApiResult<Value> {
                super::delete_one(&state, &request_id.0, $source, &note_id).await
            }

            pub async fn clear(
                State(state): State<AppState>,
                Extension(request_id): Extension<RequestId>,
                Json(body): Json<ClearRequest>,
            ) -> ApiResult<Value> {
                super::clear(&state, &request_id.0, $source, body.confirm_destructive).await
            }
        }
    };
}

source_handlers!(bilibili, Source::Bilibili);
source_handlers!(xiaohongshu, Source::Xiaohongshu);
