//! The unified HTTP response shape every handler returns through
//! (spec §4.12, §6): `{ok, code, message, data, request_id}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use midas_models::{ErrorKind, MidasError};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct Envelope<T> {
    ok: bool,
    code: &'static str,
    message: String,
    data: T,
    request_id: String,
}

/// A successful handler result, carrying the caller's request id
/// (injected by [`crate::middleware::request_id`]).
pub struct ApiOk<T> {
    pub data: T,
    pub request_id: String,
}

impl<T> ApiOk<T> {
    pub fn new(data: T, request_id: String) -> Self {
        Self { data, request_id }
    }
}

impl<T: Serialize> IntoResponse for ApiOk<T> {
    fn into_response(self) -> Response {
        Json(Envelope {
            ok: true,
            code: "OK",
            message: "ok".to_string(),
            data: self.data,
            request_id: self.request_id,
        })
        .into_response()
    }
}

/// A failed handler result. The HTTP Router maps unknown failures to
/// `INTERNAL_ERROR` and never leaks a stack trace (spec §7).
pub struct ApiError {
    pub error: MidasError,
    pub request_id: String,
}

impl ApiError {
    pub fn new(error: MidasError, request_id: String) -> Self {
        Self { error, request_id }
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::AuthExpired => StatusCode::UNAUTHORIZED,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::UpstreamError => StatusCode::BAD_GATEWAY,
        ErrorKind::DependencyMissing => StatusCode::FAILED_DEPENDENCY,
        ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.error.kind);
        let mut data = serde_json::Map::new();
        if let Some(retry_after) = self.error.retry_after_seconds {
            data.insert("retry_after_seconds".to_string(), Value::from(retry_after));
        }

        let body = Envelope {
            ok: false,
            code: self.error.kind.as_str(),
            message: self.error.message,
            data: Value::Object(data),
            request_id: self.request_id,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiOk<T>, ApiError>;
