//! Error types for the grocery API client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the item does not exist" from "the server returned an unexpected
//! status." All other non-2xx responses land in `HttpError` with the raw
//! status code and body. The enum is `Clone` so one settled fetch can be
//! handed to every subscriber sharing it.

use crate::validate::ValidationErrors;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The request never produced a response (connect, TLS, timeout, ...).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// Client-side checks rejected the input before any network call.
    #[error("invalid input: {0}")]
    Validation(ValidationErrors),
}

impl ApiError {
    /// Message suitable for showing to a user, if the error carries one.
    ///
    /// HTTP errors only yield a message when the body is a JSON object with a
    /// non-empty `message` field. Callers fall back to a fixed per-operation
    /// text when this returns `None`.
    pub fn user_message(&self) -> Option<String> {
        match self {
            ApiError::Transport(msg) => non_empty(msg),
            ApiError::HttpError { body, .. } => {
                let value: serde_json::Value = serde_json::from_str(body).ok()?;
                value.get("message")?.as_str().and_then(non_empty)
            }
            ApiError::Validation(errors) => Some(errors.to_string()),
            ApiError::NotFound
            | ApiError::DeserializationError(_)
            | ApiError::SerializationError(_) => None,
        }
    }
}

fn non_empty(msg: &str) -> Option<String> {
    let msg = msg.trim();
    (!msg.is_empty()).then(|| msg.to_string())
}
