//! OpenAI-compatible API client.
//!
//! Response envelopes are deserialized into typed structs here, once, so
//! callers only ever see plain text or plain vectors.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::errors::PipelineError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Point the client at a different OpenAI-compatible endpoint. Tests
    /// use this with an in-process server.
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }

    async fn check_status(
        &self,
        response: reqwest::Response,
        what: &str,
    ) -> Result<reqwest::Response, PipelineError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PipelineError::Auth {
                status: status.as_u16(),
            });
        }
        let body = response.text().await.unwrap_or_default();
        Err(PipelineError::Api(format!(
            "{} failed with status {}: {}",
            what, status, body
        )))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub(crate) choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub(crate) message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoiceMessage {
    pub(crate) content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingsResponse {
    pub(crate) data: Vec<EmbeddingObject>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingObject {
    pub(crate) index: usize,
    pub(crate) embedding: Vec<f32>,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, PipelineError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut body = json!({
            "model": model_id,
            "messages": request.messages,
        });
        if let Some(obj) = body.as_object_mut() {
            if let Some(max_tokens) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(max_tokens));
            }
            if let Some(temperature) = request.temperature {
                obj.insert("temperature".to_string(), json!(temperature));
            }
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = self.check_status(response, "chat completion").await?;

        let payload: ChatCompletionResponse = response.json().await?;
        let choice = payload
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::Api("chat completion returned no choices".to_string()))?;

        Ok(choice.message.content)
    }

    async fn embed(
        &self,
        inputs: &[String],
        model_id: &str,
    ) -> Result<Vec<Vec<f32>>, PipelineError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = self.check_status(response, "embeddings").await?;

        let payload: EmbeddingsResponse = response.json().await?;
        if payload.data.len() != inputs.len() {
            return Err(PipelineError::Api(format!(
                "embeddings returned {} vectors for {} inputs",
                payload.data.len(),
                inputs.len()
            )));
        }

        // The API may return entries out of order; the index field is
        // authoritative.
        let mut data = payload.data;
        data.sort_by_key(|obj| obj.index);
        Ok(data.into_iter().map(|obj| obj.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;

    use super::*;
    use crate::llm::types::ChatMessage;

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn rejected_credentials_map_to_auth() {
        let app = Router::new().route(
            "/v1/embeddings",
            post(|| async { (StatusCode::UNAUTHORIZED, "invalid api key") }),
        );
        let base = spawn(app).await;

        let provider = OpenAiProvider::with_base_url("bad-key".to_string(), base);
        let result = provider
            .embed(&["some text".to_string()], "text-embedding-ada-002")
            .await;

        assert!(matches!(result, Err(PipelineError::Auth { status: 401 })));
    }

    #[tokio::test]
    async fn server_failures_map_to_api() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded") }),
        );
        let base = spawn(app).await;

        let provider = OpenAiProvider::with_base_url("key".to_string(), base);
        let request = ChatRequest::new(vec![ChatMessage::user("hello")]);
        let result = provider.chat(request, "gpt-4").await;

        match result {
            Err(PipelineError::Api(message)) => assert!(message.contains("500")),
            other => panic!("expected Api error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn refused_connections_map_to_network() {
        // Bind then drop so the port is known to refuse connections.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider =
            OpenAiProvider::with_base_url("key".to_string(), format!("http://{}", addr));
        let result = provider
            .embed(&["some text".to_string()], "text-embedding-ada-002")
            .await;

        assert!(matches!(result, Err(PipelineError::Network(_))));
    }

    #[test]
    fn chat_envelope_unwraps_to_text() {
        let raw = r#"{
            "choices": [
                { "message": { "role": "assistant", "content": "the answer" } }
            ]
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "the answer");
    }

    #[test]
    fn embeddings_envelope_preserves_index() {
        let raw = r#"{
            "data": [
                { "index": 1, "embedding": [0.5, 0.5] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        }"#;
        let parsed: EmbeddingsResponse = serde_json::from_str(raw).unwrap();
        let mut data = parsed.data;
        data.sort_by_key(|obj| obj.index);
        assert_eq!(data[0].embedding, vec![1.0, 0.0]);
        assert_eq!(data[1].embedding, vec![0.5, 0.5]);
    }
}
