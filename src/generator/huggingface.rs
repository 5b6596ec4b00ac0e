//! Hugging Face inference API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{GenerationError, TextGenerator};
use crate::config::Config;

/// Request body accepted by the inference endpoint.
#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

/// Client for a Hugging Face text-generation model.
pub struct HuggingFaceClient {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
}

impl HuggingFaceClient {
    /// Create a client for `endpoint`, optionally bounding every request by `timeout`.
    pub fn new(
        endpoint: impl Into<String>,
        api_token: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, GenerationError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            endpoint: endpoint.into(),
            api_token,
        })
    }

    /// Create a client from loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, GenerationError> {
        Self::new(
            config.endpoint.clone(),
            config.api_token.clone(),
            config.request_timeout,
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TextGenerator for HuggingFaceClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&InferenceRequest { inputs: prompt });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), "Generation request rejected");
            return Err(GenerationError::Status {
                code: status.as_u16(),
                body,
            });
        }

        response
            .text()
            .await
            .map_err(|e| GenerationError::Body(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionWorkflow;
    use crate::fields::{FallbackSet, FollowUpSource};
    use crate::task::CompletionContext;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// True once the headers and the `Content-Length` body have arrived.
    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        raw.len() >= end + 4 + length
    }

    /// Answer a single request with `status` and `body`, returning the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/models/stub", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request_complete(&request) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (url, handle)
    }

    fn client(url: &str, token: Option<&str>) -> HuggingFaceClient {
        let token = token.map(str::to_string);
        HuggingFaceClient::new(url, token, Some(Duration::from_secs(5))).unwrap()
    }

    async fn outcome_source(status: &'static str, body: &'static str) -> FollowUpSource {
        let (url, server) = serve_once(status, body).await;
        let workflow = CompletionWorkflow::new(Arc::new(client(&url, Some("hf_test"))));
        let outcome = workflow.run(CompletionContext::new(1, "Buy milk", None)).await;
        server.await.unwrap();
        outcome.source
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(InferenceRequest { inputs: "hello" }).unwrap();
        assert_eq!(body, serde_json::json!({ "inputs": "hello" }));
    }

    #[tokio::test]
    async fn test_success_body_returned_verbatim() {
        let body = r#"[{"generated_text":"X\nY"}]"#;
        let (url, server) = serve_once("200 OK", body).await;

        let text = client(&url, Some("hf_test")).generate("prompt").await.unwrap();
        assert_eq!(text, body);

        let request = server.await.unwrap();
        let lower = request.to_lowercase();
        assert!(request.starts_with("POST /models/stub HTTP/1.1"));
        assert!(lower.contains("authorization: bearer hf_test"));
        assert!(lower.contains("content-type: application/json"));
        assert!(request.ends_with(r#"{"inputs":"prompt"}"#));
    }

    #[tokio::test]
    async fn test_missing_token_sends_no_authorization() {
        let (url, server) = serve_once("200 OK", "{}").await;
        client(&url, None).generate("prompt").await.unwrap();
        let request = server.await.unwrap();
        assert!(!request.to_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn test_error_status_is_transport_error() {
        let (url, server) = serve_once("503 Service Unavailable", "model loading").await;
        let err = client(&url, None).generate("prompt").await.unwrap_err();
        server.await.unwrap();

        assert!(err.is_transport());
        match err {
            GenerationError::Status { code, body } => {
                assert_eq!(code, 503);
                assert_eq!(body, "model loading");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/models/none", listener.local_addr().unwrap());
        drop(listener);

        let err = client(&url, None).generate("prompt").await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_workflow_over_http_picks_fallback_by_response() {
        assert_eq!(
            outcome_source("503 Service Unavailable", "busy").await,
            FollowUpSource::Fallback(FallbackSet::Transport)
        );
        assert_eq!(
            outcome_source("200 OK", "not json").await,
            FollowUpSource::Fallback(FallbackSet::Unexpected)
        );
        assert_eq!(
            outcome_source("200 OK", r#"[{"generated_text":"X\nY"}]"#).await,
            FollowUpSource::Generated
        );
    }
}
