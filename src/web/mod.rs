//! HTTP surface.
//!
//! Form posts answer with `303 See Other` redirects; reads answer with JSON.

pub mod error;
pub mod routes;
pub mod session;
pub mod state;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::AppState;

/// Assembles the router with every route and the tracing layer.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::auth::router())
        .merge(routes::notes::router())
        .merge(routes::attachments::router(state.config.max_upload_bytes))
        .merge(routes::cloud::router())
        .merge(routes::notifications::router())
        .merge(routes::prefs::router())
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
