use crate::envelope::{ApiOk, ApiResult};
use crate::middleware::RequestId;
use axum::Extension;
use serde_json::{json, Value};

pub async fn health(Extension(request_id): Extension<RequestId>) -> ApiResult<Value> {
    Ok(ApiOk::new(json!({"status": "ok"}), request_id.0))
}
