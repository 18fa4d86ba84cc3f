// routes.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use tower_http::trace::TraceLayer;
use serde_json::json;

use crate::{
    handler::{
        engagements::engagements_handler,
        invoices::invoices_handler,
        points::points_handler,
        time_entries::time_entries_handler,
    },
    middleware::caller_identity,
    AppState
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let ledger_routes = Router::new()
        .nest("/time-entries", time_entries_handler())
        .nest("/engagements", engagements_handler())
        .nest("/invoices", invoices_handler())
        .nest("/points", points_handler())
        .layer(middleware::from_fn(caller_identity));

    let api_route = Router::new()
        .nest("/ledger", ledger_routes)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
}
