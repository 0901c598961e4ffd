//! Fuzzes `embed_batch` over random-length inputs to confirm its core
//! contract: output length always equals input length, with no mismatches
//! the client fails to catch.

use brain_core::embedding::EmbeddingProvider;
use brain_llm::{EmbeddingClient, EmbeddingClientConfig};
use proptest::prelude::*;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
}

fn config_for(base_url: String, dimension: usize) -> EmbeddingClientConfig {
    EmbeddingClientConfig {
        base_url,
        model: "fuzz-model".to_string(),
        dimension,
        request_timeout: Duration::from_secs(5),
        health_timeout: Duration::from_secs(1),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A well-behaved server always returns one embedding per input; the
    /// client must preserve length and order regardless of batch size.
    #[test]
    fn embed_batch_output_len_matches_input_len(texts in proptest::collection::vec("[a-z ]{0,40}", 0..20)) {
        let rt = runtime();
        rt.block_on(async {
            let server = MockServer::start().await;
            let dimension = 3;
            let embeddings: Vec<Vec<f32>> = texts.iter().map(|t| vec![t.len() as f32, 0.0, 0.0]).collect();
            Mock::given(method("POST"))
                .and(path("/api/embed"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "model": "fuzz-model",
                    "embeddings": embeddings,
                })))
                .mount(&server)
                .await;

            let client = EmbeddingClient::new(config_for(server.uri(), dimension)).unwrap();
            let result = client.embed_batch(&texts).await.unwrap();
            prop_assert_eq!(result.len(), texts.len());
            for (i, vector) in result.iter().enumerate() {
                prop_assert_eq!(vector[0], texts[i].len() as f32);
            }
            Ok(())
        }).unwrap();
    }

    /// A server that returns the wrong count must always surface a
    /// `Protocol` error, never silently truncated or padded output.
    #[test]
    fn embed_batch_length_mismatch_always_rejected(
        input_len in 1usize..10,
        returned_len in 0usize..10,
    ) {
        prop_assume!(input_len != returned_len);
        let rt = runtime();
        rt.block_on(async {
            let server = MockServer::start().await;
            let texts: Vec<String> = (0..input_len).map(|i| format!("text-{i}")).collect();
            let embeddings: Vec<Vec<f32>> = (0..returned_len).map(|_| vec![1.0, 0.0, 0.0]).collect();
            Mock::given(method("POST"))
                .and(path("/api/embed"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "model": "fuzz-model",
                    "embeddings": embeddings,
                })))
                .mount(&server)
                .await;

            let client = EmbeddingClient::new(config_for(server.uri(), 3)).unwrap();
            let err = client.embed_batch(&texts).await.unwrap_err();
            prop_assert!(matches!(err, brain_core::error::BrainError::Protocol { .. }));
            Ok(())
        }).unwrap();
    }
}
