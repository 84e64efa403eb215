use axum::{
    Json, Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use parlor_types::api::HealthResponse;

use crate::service::AppState;
use crate::{messages, participants, status};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/participants", post(participants::register).get(participants::list))
        .route("/messages", post(messages::send_message).get(messages::get_messages))
        .route("/status", post(status::heartbeat))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
