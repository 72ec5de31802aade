//! C12: the HTTP surface. One axum `Router`, nested per domain, with a
//! request-id middleware layer and permissive CORS (spec §1 Non-goals:
//! no multi-tenant auth, so no auth middleware here).

use crate::handlers::{bilibili, config, health, merge, notes, xiaohongshu};
use crate::middleware::request_id;
use crate::state::AppState;
use axum::routing::{get, post, put};
use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let bilibili_routes = Router::new().route("/summarize", post(bilibili::summarize));

    let bilibili_notes = Router::new()
        .route(
            "/",
            post(notes::bilibili::save).get(notes::bilibili::list).delete(notes::bilibili::clear),
        )
        .route("/:note_id", axum::routing::delete(notes::bilibili::delete_one));

    let xiaohongshu_routes = Router::new()
        .route("/summarize", post(xiaohongshu::summarize_url))
        .route("/sync/jobs", post(xiaohongshu::submit_sync))
        .route("/sync/jobs/:job_id", get(xiaohongshu::get_sync_job))
        .route("/sync/cooldown", get(xiaohongshu::get_cooldown))
        .route("/auth", put(xiaohongshu::update_auth))
        .route("/capture/refresh", post(xiaohongshu::refresh_capture))
        .route("/prune", post(xiaohongshu::prune_synced));

    let xiaohongshu_notes = Router::new()
        .route(
            "/",
            post(notes::xiaohongshu::save).get(notes::xiaohongshu::list).delete(notes::xiaohongshu::clear),
        )
        .route("/:note_id", axum::routing::delete(notes::xiaohongshu::delete_one));

    let merge_routes = Router::new()
        .route("/suggest", post(merge::suggest))
        .route("/preview", post(merge::preview))
        .route("/commit", post(merge::commit))
        .route("/rollback", post(merge::rollback))
        .route("/finalize", post(merge::finalize));

    let config_routes = Router::new()
        .route("/", get(config::get_editable).put(config::put_editable))
        .route("/reset", post(config::reset_editable));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/bilibili", bilibili_routes)
        .nest("/api/notes/bilibili", bilibili_notes)
        .nest("/api/xiaohongshu", xiaohongshu_routes)
        .nest("/api/notes/xiaohongshu", xiaohongshu_notes)
        .nest("/api/notes/merge", merge_routes)
        .nest("/api/config/editable", config_routes)
        .layer(middleware::from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
