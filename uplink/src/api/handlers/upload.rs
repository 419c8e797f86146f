//! The upload proxy handler.
//!
//! One linear pipeline per request: validate the payload shape, attach the bearer
//! credential, forward to the downstream endpoint, relay its reply verbatim. Every failure
//! is funneled through [`Error`] at this single boundary; nothing escapes to the runtime
//! unhandled.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{AppState, api::models::upload::UploadRequest, errors::Error, forward::UploadPayload};

/// Preflight short-circuit. The CORS layer answers real preflights itself; this keeps
/// plain OPTIONS probes at 200/empty as well.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Method-router fallback for anything other than POST or OPTIONS.
pub async fn method_not_allowed() -> Response {
    Error::MethodNotAllowed.into_response()
}

#[tracing::instrument(skip_all)]
pub async fn upload(
    State(state): State<AppState>,
    body: Result<Json<UploadRequest>, JsonRejection>,
) -> Response {
    tracing::info!("received upload request");

    match process(&state, body).await {
        Ok(response) => response,
        Err(err) => err.into_error_response(state.config.expose_error_details),
    }
}

async fn process(
    state: &AppState,
    body: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Response, Error> {
    let Json(request) = body.map_err(|rejection| Error::InvalidBody {
        message: rejection.body_text(),
    })?;

    // Local validation failure, never forwarded downstream
    let file = match request.file {
        Some(file) if !file.is_empty() => file,
        _ => {
            tracing::warn!("request body is missing the `file` field");
            return Err(Error::MissingFile);
        }
    };

    // A missing credential is a server misconfiguration, not a client error
    let token = state.config.api_token.as_deref().ok_or_else(|| {
        tracing::error!("api_token is not configured");
        Error::Configuration {
            message: "API token is not set".to_string(),
        }
    })?;

    let payload = UploadPayload {
        file,
        filename: request.filename,
        filetype: request.filetype,
    };

    let reply = state.forwarder.forward(&payload, token).await?;

    // Relay the downstream status and body verbatim, including non-2xx
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok((status, Json(reply.body)).into_response())
}
