//! Request models for the upload endpoint.

use serde::Deserialize;

/// Inbound upload request body.
///
/// `file` is required and must be non-empty base64-encoded content; `filename` and
/// `filetype` are passed through unvalidated. Presence is checked in the handler rather
/// than via serde so the error response shape stays ours.
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub filetype: Option<String>,
}
