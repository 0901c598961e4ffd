use crate::error::classify_status;
use async_trait::async_trait;
use brain_core::embedding::EmbeddingProvider;
use brain_core::error::{BrainError, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Configuration for [`EmbeddingClient`]. Defaults mirror the cascade of
/// timeouts assigned to each layer: connect/request vs. health-check.
#[derive(Debug, Clone)]
pub struct EmbeddingClientConfig {
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub request_timeout: Duration,
    pub health_timeout: Duration,
}

impl Default for EmbeddingClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dimension: 768,
            request_timeout: Duration::from_secs(60),
            health_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    truncate: bool,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[allow(dead_code)]
    model: String,
    embeddings: Vec<Vec<f32>>,
}

/// Single-request and batch calls to the embedding service.
pub struct EmbeddingClient {
    http: reqwest::Client,
    config: EmbeddingClientConfig,
}

impl EmbeddingClient {
    pub fn new(config: EmbeddingClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BrainError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embed", self.config.base_url.trim_end_matches('/'))
    }

    async fn call(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let body = EmbedRequest {
            model: &self.config.model,
            input: texts,
            truncate: true,
        };

        let response = self
            .http
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let context = ErrorContext::new()
                    .with_elapsed_ms(elapsed_ms)
                    .with_deadline_ms(self.config.request_timeout.as_millis() as u64)
                    .with_chunk_count(texts.len());
                if e.is_timeout() {
                    BrainError::Transient {
                        message: format!("embedding request timed out: {e}"),
                        context,
                    }
                } else {
                    BrainError::Transient {
                        message: format!("embedding request failed: {e}"),
                        context,
                    }
                }
            })?;

        let status = response.status().as_u16();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let context = ErrorContext::new()
            .with_elapsed_ms(elapsed_ms)
            .with_deadline_ms(self.config.request_timeout.as_millis() as u64)
            .with_chunk_count(texts.len());

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(
                status,
                format!("embedding service returned {status}: {text}"),
                context,
            ));
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| BrainError::Protocol {
            message: format!("malformed embedding response: {e}"),
            context: context.clone(),
        })?;

        if parsed.embeddings.len() != texts.len() {
            return Err(BrainError::Protocol {
                message: format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    parsed.embeddings.len()
                ),
                context,
            });
        }

        Ok(parsed.embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingClient {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut result = self.call(&[text.to_string()]).await?;
        result.pop().ok_or_else(|| BrainError::Protocol {
            message: "embedding service returned no vectors".to_string(),
            context: ErrorContext::new(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!(count = texts.len(), "embedding batch");
        self.call(texts).await
    }

    async fn health(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url.trim_end_matches('/'));
        match tokio::time::timeout(self.config.health_timeout, self.http.get(url).send()).await {
            Ok(Ok(resp)) => resp.status().is_success(),
            Ok(Err(e)) => {
                warn!(error = %e, "embedding health check failed");
                false
            }
            Err(_) => {
                warn!("embedding health check timed out");
                false
            }
        }
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(base_url: String) -> EmbeddingClientConfig {
        EmbeddingClientConfig {
            base_url,
            model: "test-model".to_string(),
            dimension: 3,
            request_timeout: Duration::from_secs(5),
            health_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn empty_batch_performs_no_network_call() {
        let server = MockServer::start().await;
        let client = EmbeddingClient::new(config_for(server.uri())).unwrap();
        let result = client.embed_batch(&[]).await.unwrap();
        assert_eq!(result, Vec::<Vec<f32>>::new());
        assert_eq!(server.received_requests().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn embed_batch_preserves_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "test-model",
                "embeddings": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
            })))
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(config_for(server.uri())).unwrap();
        let result = client
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(result, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
    }

    #[tokio::test]
    async fn mismatched_length_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "test-model",
                "embeddings": [[1.0, 0.0, 0.0]]
            })))
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(config_for(server.uri())).unwrap();
        let err = client
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, BrainError::Protocol { .. }));
    }

    #[tokio::test]
    async fn server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(config_for(server.uri())).unwrap();
        let err = client.embed_batch(&["x".to_string()]).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn bad_request_is_not_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(config_for(server.uri())).unwrap();
        let err = client.embed_batch(&["x".to_string()]).await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn health_false_when_unreachable() {
        let client = EmbeddingClient::new(config_for("http://127.0.0.1:1".to_string())).unwrap();
        assert!(!client.health().await);
    }
}
