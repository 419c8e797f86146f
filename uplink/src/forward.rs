//! Downstream forwarding.
//!
//! [`Forwarder`] owns the shared reqwest client and performs the single-attempt,
//! bearer-authenticated POST to the configured workflow endpoint. The reply is captured as
//! status plus parsed JSON so the handler can relay it verbatim - no field renaming, no
//! status remapping, no retries.

use serde_json::{Value, json};
use url::Url;

use crate::config::DownstreamConfig;
use crate::errors::Result;

/// Inbound payload extracted from a validated client request.
/// Scoped to a single request; nothing here outlives the response.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    /// Base64-encoded file content, guaranteed non-empty by the handler
    pub file: String,
    pub filename: Option<String>,
    pub filetype: Option<String>,
}

impl DownstreamConfig {
    /// The fixed endpoint for the selected contract.
    pub fn url(&self) -> &Url {
        match self {
            DownstreamConfig::Workflow { url, .. } => url,
            DownstreamConfig::Base64 { url } => url,
        }
    }

    /// Shape the outbound JSON body for the selected contract.
    ///
    /// The workflow contract fills omitted `filename`/`filetype` from the configured
    /// defaults; the base64 contract sends the file content and nothing else.
    pub fn outbound_body(&self, payload: &UploadPayload) -> Value {
        match self {
            DownstreamConfig::Workflow {
                default_filename,
                default_filetype,
                ..
            } => json!({
                "file": payload.file,
                "filename": payload.filename.as_deref().unwrap_or(default_filename),
                "filetype": payload.filetype.as_deref().unwrap_or(default_filetype),
            }),
            DownstreamConfig::Base64 { .. } => json!({ "base64_str": payload.file }),
        }
    }
}

/// Reply from the downstream service, relayed verbatim to the caller.
#[derive(Debug, Clone)]
pub struct DownstreamReply {
    /// Downstream HTTP status code
    pub status: u16,
    /// Downstream JSON body, untouched
    pub body: Value,
}

/// Forwards upload payloads to the configured downstream endpoint.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    downstream: DownstreamConfig,
}

impl Forwarder {
    pub fn new(downstream: DownstreamConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            downstream,
        }
    }

    /// Execute the single-attempt POST to the downstream endpoint.
    ///
    /// No timeout is imposed here; client and runtime defaults apply. A non-2xx downstream
    /// status is not an error - it is returned for verbatim relay. Errors are network
    /// failures and non-JSON reply bodies.
    #[tracing::instrument(skip_all, fields(url = %self.downstream.url()))]
    pub async fn forward(&self, payload: &UploadPayload, token: &str) -> Result<DownstreamReply> {
        let body = self.downstream.outbound_body(payload);

        tracing::info!(
            filename = payload.filename.as_deref(),
            content_len = payload.file.len(),
            "forwarding upload to downstream endpoint"
        );

        let response = self
            .client
            .post(self.downstream.url().clone())
            .header("Authorization", format!("Bearer {token}"))
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text)?;

        tracing::info!(status, "downstream endpoint responded");

        Ok(DownstreamReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn workflow_contract(url: &str) -> DownstreamConfig {
        DownstreamConfig::Workflow {
            url: Url::parse(url).unwrap(),
            default_filename: "upload.jpg".to_string(),
            default_filetype: "image/jpeg".to_string(),
        }
    }

    fn payload(file: &str) -> UploadPayload {
        UploadPayload {
            file: file.to_string(),
            filename: None,
            filetype: None,
        }
    }

    #[test]
    fn test_workflow_body_applies_defaults() {
        let contract = workflow_contract("https://example.com/run");
        let body = contract.outbound_body(&payload("aGVsbG8="));

        assert_eq!(
            body,
            json!({
                "file": "aGVsbG8=",
                "filename": "upload.jpg",
                "filetype": "image/jpeg",
            })
        );
    }

    #[test]
    fn test_workflow_body_keeps_client_fields() {
        let contract = workflow_contract("https://example.com/run");
        let body = contract.outbound_body(&UploadPayload {
            file: "aGVsbG8=".to_string(),
            filename: Some("cat.png".to_string()),
            filetype: Some("image/png".to_string()),
        });

        assert_eq!(body["filename"], "cat.png");
        assert_eq!(body["filetype"], "image/png");
    }

    #[test]
    fn test_base64_body_carries_only_the_content() {
        let contract = DownstreamConfig::Base64 {
            url: Url::parse("https://example.com/run").unwrap(),
        };
        let body = contract.outbound_body(&UploadPayload {
            file: "aGVsbG8=".to_string(),
            filename: Some("ignored.png".to_string()),
            filetype: Some("image/png".to_string()),
        });

        assert_eq!(body, json!({ "base64_str": "aGVsbG8=" }));
    }

    #[tokio::test]
    async fn test_forward_sends_bearer_and_relays_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .and(header("authorization", "Bearer sekrit"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "file": "aGVsbG8=",
                "filename": "upload.jpg",
                "filetype": "image/jpeg",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"url": "https://x/y.jpg"})))
            .expect(1)
            .mount(&server)
            .await;

        let forwarder = Forwarder::new(workflow_contract(&format!("{}/run", server.uri())));
        let reply = forwarder.forward(&payload("aGVsbG8="), "sekrit").await.unwrap();

        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, json!({"url": "https://x/y.jpg"}));
    }

    #[tokio::test]
    async fn test_forward_relays_downstream_errors_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "down"})))
            .mount(&server)
            .await;

        let forwarder = Forwarder::new(workflow_contract(&format!("{}/run", server.uri())));
        let reply = forwarder.forward(&payload("aGVsbG8="), "sekrit").await.unwrap();

        assert_eq!(reply.status, 503);
        assert_eq!(reply.body, json!({"error": "down"}));
    }

    #[tokio::test]
    async fn test_forward_rejects_non_json_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let forwarder = Forwarder::new(workflow_contract(&format!("{}/run", server.uri())));
        let result = forwarder.forward(&payload("aGVsbG8="), "sekrit").await;

        assert!(matches!(result, Err(Error::NonJsonDownstream(_))));
    }

    #[tokio::test]
    async fn test_forward_surfaces_network_failure() {
        // Point to a port that's not listening
        let forwarder = Forwarder::new(workflow_contract("http://127.0.0.1:1/run"));
        let result = forwarder.forward(&payload("aGVsbG8="), "sekrit").await;

        assert!(matches!(result, Err(Error::Network(_))));
    }
}
