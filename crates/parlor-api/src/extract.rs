use std::convert::Infallible;

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::ChatError;

/// Header carrying the caller's display name.
pub const USER_HEADER: &str = "user";

/// The caller's display name from the `user` header, if present and UTF-8.
///
/// This is identification only; nothing is verified.
#[derive(Debug, Clone)]
pub struct Caller(pub Option<String>);

impl Caller {
    pub fn name(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let name = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string());
        Ok(Caller(name))
    }
}

/// JSON request body whose failures are reported as validation errors.
///
/// The `Content-Type` header is not checked. An empty body decodes as
/// `T::default()`, so every field comes out missing and validation names
/// each one.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ChatError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ChatError::InvalidInput(vec![e.body_text()]))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonBody(T::default()));
        }

        serde_json::from_slice(&bytes)
            .map(JsonBody)
            .map_err(|e| ChatError::InvalidInput(vec![format!("body is not valid JSON: {}", e)]))
    }
}
