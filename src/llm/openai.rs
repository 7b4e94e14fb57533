use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

use crate::core::config::settings::LlmSettings;
use crate::core::errors::ApiError;
use super::provider::LlmProvider;
use super::types::{ChatRequest, EmbeddingKind};

/// Any server speaking the OpenAI `/v1/chat/completions` and
/// `/v1/embeddings` dialect (LM Studio, vLLM, llama.cpp server, ...).
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    base_url: String,
    api_key: Option<String>,
    chat_model: String,
    embedding_model: String,
    max_tokens: u32,
    temperature: Option<f64>,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, ApiError> {
        let base_url = settings.base_url.clone().ok_or_else(|| {
            ApiError::BadRequest("llm.base_url is required for the openai provider".to_string())
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            chat_model: settings.chat_model.clone(),
            embedding_model: settings.embedding_model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            client,
        })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let request = self.client.post(format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        let mut body = json!({
            "model": self.chat_model,
            "messages": request.messages,
            "stream": false,
            "max_tokens": self.max_tokens,
        });

        if let (Some(obj), Some(t)) = (body.as_object_mut(), self.temperature) {
            obj.insert("temperature".to_string(), json!(t));
        }

        let res = self
            .post("/v1/chat/completions")
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("Chat completion failed ({}): {}", status, text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ApiError::Internal("Chat completion returned no content".to_string()))
    }

    async fn embed(
        &self,
        inputs: &[String],
        _kind: EmbeddingKind,
    ) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.embedding_model,
            "input": inputs,
        });

        let res = self
            .post("/v1/embeddings")
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("Embedding request failed ({}): {}", status, text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        let embeddings = parse_embeddings(&payload);
        if embeddings.len() != inputs.len() {
            return Err(ApiError::Internal(format!(
                "Expected {} embeddings, got {}",
                inputs.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }
}

/// Reads `data[*].embedding`, honouring `index` when the server reorders.
fn parse_embeddings(payload: &Value) -> Vec<Vec<f32>> {
    let Some(data) = payload["data"].as_array() else {
        return Vec::new();
    };

    let mut indexed: Vec<(u64, Vec<f32>)> = data
        .iter()
        .enumerate()
        .filter_map(|(position, item)| {
            let values = item["embedding"].as_array()?;
            let vector = values
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect();
            let index = item["index"].as_u64().unwrap_or(position as u64);
            Some((index, vector))
        })
        .collect();
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, vector)| vector).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_embeddings_orders_by_index() {
        let payload = json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        });

        assert_eq!(
            parse_embeddings(&payload),
            vec![vec![1.0, 0.0], vec![0.0, 1.0]]
        );
    }

    #[test]
    fn requires_base_url() {
        let settings = LlmSettings::default();
        assert!(OpenAiCompatProvider::from_settings(&settings).is_err());
    }
}
