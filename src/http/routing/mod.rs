use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower::ServiceBuilder;

use super::routes;
use super::types::AppState;
use crate::infrastructure::Backend;

pub const NOT_CONFIGURED_NOTICE: &str = "Connect a backend to get started";

pub fn app(state: AppState) -> Router {
    let backend = state.backend.clone();
    Router::new()
        .merge(routes::pages::router())
        .merge(routes::auth::router())
        .merge(routes::todos::router())
        .merge(routes::realtime::router())
        .with_state(state)
        .layer(ServiceBuilder::new().layer(middleware::from_fn_with_state(backend, require_backend)))
        .route("/health", get(|| async { "ok" }))
}

/// Without backend settings every page and action is replaced by the notice.
async fn require_backend(State(backend): State<Backend>, request: Request, next: Next) -> Response {
    if backend.is_configured() {
        return next.run(request).await;
    }
    (StatusCode::SERVICE_UNAVAILABLE, NOT_CONFIGURED_NOTICE).into_response()
}
