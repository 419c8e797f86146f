//! Error taxonomy and the single response boundary.
//!
//! Failures are represented explicitly instead of as one generic exception: client errors
//! (missing field, wrong method), configuration errors (missing credential), and downstream
//! errors (network failure, non-JSON reply) are mapped to status codes exactly once, here.
//! Nothing escapes a handler unhandled; the user-visible body is always a JSON object with
//! at least an `error` key.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

/// Generic message for 5xx bodies; the failure text goes in the `message` field.
const PROXY_FAILURE_MESSAGE: &str = "proxy failed to process the upload request";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Required `file` field absent or empty
    #[error("request body must include a non-empty `file` field (base64-encoded content)")]
    MissingFile,

    /// Any method other than POST or OPTIONS
    #[error("only POST requests are accepted")]
    MethodNotAllowed,

    /// Request body could not be parsed as JSON
    #[error("malformed JSON request body: {message}")]
    InvalidBody { message: String },

    /// Server-side misconfiguration, e.g. the bearer credential is unset.
    /// Surfaced as a 5xx, never distinguished to the caller as a client error.
    #[error("server configuration error: {message}")]
    Configuration { message: String },

    /// The downstream request could not be completed
    #[error("downstream request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The downstream service replied with a body that is not JSON
    #[error("downstream service returned a non-JSON response: {0}")]
    NonJsonDownstream(#[from] serde_json::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MissingFile => StatusCode::BAD_REQUEST,
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::InvalidBody { .. } | Error::Configuration { .. } | Error::Network(_) | Error::NonJsonDownstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Build the user-visible JSON response.
    ///
    /// Client errors expose their own message under `error`. Internal failures get the
    /// generic `error` plus the failure text under `message`; `expose_details` additionally
    /// attaches the debug rendering under `details` (development runs only).
    pub fn into_error_response(self, expose_details: bool) -> Response {
        // Log full error details - different log levels based on severity
        match &self {
            Error::MissingFile | Error::MethodNotAllowed => {
                tracing::debug!("client error: {}", self);
            }
            Error::InvalidBody { .. } => {
                tracing::warn!("rejected request body: {}", self);
            }
            Error::Configuration { .. } => {
                tracing::error!("configuration error: {}", self);
            }
            Error::Network(_) | Error::NonJsonDownstream(_) => {
                tracing::error!("downstream failure: {}", self);
            }
        }

        let status = self.status_code();

        let body = if status.is_client_error() {
            json!({ "error": self.to_string() })
        } else {
            let mut body = json!({
                "error": PROXY_FAILURE_MESSAGE,
                "message": self.to_string(),
            });
            if expose_details {
                body["details"] = json!(format!("{self:?}"));
            }
            body
        };

        (status, axum::Json(body)).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.into_error_response(false)
    }
}

/// Type alias for upload relay results
pub type Result<T> = std::result::Result<T, Error>;
