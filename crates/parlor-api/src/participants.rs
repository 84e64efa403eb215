use axum::{Json, extract::State, http::StatusCode};

use parlor_types::api::RegisterRequest;
use parlor_types::models::Participant;

use crate::error::ChatError;
use crate::extract::JsonBody;
use crate::service::AppState;

/// POST /participants: join the room. 201 with no body.
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<StatusCode, ChatError> {
    state.register(&req).await?;
    Ok(StatusCode::CREATED)
}

/// GET /participants: everyone currently active, in join order.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Participant>>, ChatError> {
    Ok(Json(state.list_participants().await?))
}
