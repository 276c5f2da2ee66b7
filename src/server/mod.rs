pub mod handlers;
pub mod state;

use axum::{Router, routing::get};
use state::AppState;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the proxy router.
///
/// Every `GET` path is handled identically: the target travels in the
/// reserved query parameter, never in the path.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::proxy::serve_proxy))
        .route("/{*path}", get(handlers::proxy::serve_proxy))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
