use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use parlor_types::api::{MessageQuery, SendMessageRequest};
use parlor_types::models::Message;

use crate::error::ChatError;
use crate::extract::{Caller, JsonBody};
use crate::service::AppState;

/// POST /messages: post as the `user` header's participant.
pub async fn send_message(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(req): JsonBody<SendMessageRequest>,
) -> Result<StatusCode, ChatError> {
    state.post_message(caller.name(), &req).await?;
    Ok(StatusCode::CREATED)
}

/// GET /messages: what the `user` header's participant may see.
/// `?limit=N` keeps only the newest N.
pub async fn get_messages(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<MessageQuery>,
) -> Result<Json<Vec<Message>>, ChatError> {
    let messages = state.list_messages(caller.name(), query.limit()).await?;
    Ok(Json(messages))
}
