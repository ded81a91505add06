use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};
use crate::routes::{health, preferences, qloo, recommendations};

/// Assembles the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/qloo/cuisine-tags", get(qloo::cuisine_tags))
        .route("/qloo/audiences", get(qloo::audiences))
        .route("/qloo/insights", post(qloo::insights))
        .route("/qloo/validate", get(qloo::validate))
        .route("/user-preferences", post(preferences::save_preferences))
        .route("/user-preferences/:user_id", get(preferences::get_preferences))
        .route("/recommendations", post(recommendations::recommend))
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
