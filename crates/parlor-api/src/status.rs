use axum::{extract::State, http::StatusCode};

use crate::error::ChatError;
use crate::extract::Caller;
use crate::service::AppState;

/// POST /status: heartbeat. 404 tells the client to register again.
pub async fn heartbeat(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<StatusCode, ChatError> {
    state.heartbeat(caller.name()).await?;
    Ok(StatusCode::CREATED)
}
