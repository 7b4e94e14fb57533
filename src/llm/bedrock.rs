//! Amazon Bedrock backend: Anthropic Claude for chat, Cohere (or Titan)
//! for embeddings, both through `InvokeModel`.

use async_trait::async_trait;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use serde_json::{json, Value};

use crate::core::aws::load_sdk_config;
use crate::core::config::settings::LlmSettings;
use crate::core::errors::ApiError;
use super::provider::LlmProvider;
use super::types::{ChatRequest, EmbeddingKind};

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
/// Cohere on Bedrock accepts at most this many texts per call.
const COHERE_MAX_TEXTS: usize = 96;

#[derive(Clone)]
pub struct BedrockProvider {
    client: Client,
    chat_model: String,
    embedding_model: String,
    max_tokens: u32,
    temperature: Option<f64>,
}

impl BedrockProvider {
    pub async fn from_settings(settings: &LlmSettings) -> Self {
        let sdk_config = load_sdk_config(Some(&settings.region), settings.max_attempts).await;
        Self {
            client: Client::new(&sdk_config),
            chat_model: settings.chat_model.clone(),
            embedding_model: settings.embedding_model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }

    async fn invoke(&self, model_id: &str, body: &Value) -> Result<Value, ApiError> {
        let bytes = serde_json::to_vec(body).map_err(ApiError::internal)?;
        let output = self
            .client
            .invoke_model()
            .model_id(model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(bytes))
            .send()
            .await
            .map_err(|e| {
                ApiError::Internal(format!(
                    "Bedrock invocation of {} failed: {}",
                    model_id,
                    DisplayErrorContext(&e)
                ))
            })?;

        serde_json::from_slice(output.body().as_ref()).map_err(ApiError::internal)
    }

    fn is_titan_embedding(&self) -> bool {
        self.embedding_model.starts_with("amazon.titan-embed")
    }

    async fn embed_cohere(
        &self,
        inputs: &[String],
        kind: EmbeddingKind,
    ) -> Result<Vec<Vec<f32>>, ApiError> {
        let input_type = match kind {
            EmbeddingKind::Document => "search_document",
            EmbeddingKind::Query => "search_query",
        };

        let mut embeddings = Vec::with_capacity(inputs.len());
        for batch in inputs.chunks(COHERE_MAX_TEXTS) {
            let body = json!({
                "texts": batch,
                "input_type": input_type,
                "embedding_types": ["float"],
            });
            let payload = self.invoke(&self.embedding_model, &body).await?;
            let vectors = parse_cohere_embeddings(&payload);
            if vectors.len() != batch.len() {
                return Err(ApiError::Internal(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            embeddings.extend(vectors);
        }
        Ok(embeddings)
    }

    async fn embed_titan(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let mut embeddings = Vec::with_capacity(inputs.len());
        for input in inputs {
            let payload = self
                .invoke(&self.embedding_model, &json!({ "inputText": input }))
                .await?;
            embeddings.push(to_vector(&payload["embedding"]).ok_or_else(|| {
                ApiError::Internal("Titan response has no embedding".to_string())
            })?);
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl LlmProvider for BedrockProvider {
    fn name(&self) -> &str {
        "bedrock"
    }

    fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        let body = anthropic_body(&request, self.max_tokens, self.temperature);
        let payload = self.invoke(&self.chat_model, &body).await?;
        parse_anthropic_text(&payload)
            .ok_or_else(|| ApiError::Internal("Model returned no text content".to_string()))
    }

    async fn embed(
        &self,
        inputs: &[String],
        kind: EmbeddingKind,
    ) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        if self.is_titan_embedding() {
            self.embed_titan(inputs).await
        } else {
            self.embed_cohere(inputs, kind).await
        }
    }
}

/// Anthropic messages body; `system` turns are hoisted out of the list.
fn anthropic_body(request: &ChatRequest, max_tokens: u32, temperature: Option<f64>) -> Value {
    let system: Vec<&str> = request
        .messages
        .iter()
        .filter(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .collect();
    let messages: Vec<Value> = request
        .messages
        .iter()
        .filter(|m| m.role != "system")
        .map(|m| json!({ "role": m.role, "content": m.content }))
        .collect();

    let mut body = json!({
        "anthropic_version": ANTHROPIC_VERSION,
        "max_tokens": max_tokens,
        "messages": messages,
    });
    if let Some(obj) = body.as_object_mut() {
        if !system.is_empty() {
            obj.insert("system".to_string(), json!(system.join("\n\n")));
        }
        if let Some(t) = temperature {
            obj.insert("temperature".to_string(), json!(t));
        }
    }
    body
}

fn parse_anthropic_text(payload: &Value) -> Option<String> {
    let blocks = payload["content"].as_array()?;
    let text: String = blocks
        .iter()
        .filter(|block| block["type"].as_str() == Some("text"))
        .filter_map(|block| block["text"].as_str())
        .collect();
    Some(text)
}

/// Cohere v4 nests vectors under `embeddings.float`; v3 returns a bare list.
fn parse_cohere_embeddings(payload: &Value) -> Vec<Vec<f32>> {
    let embeddings = &payload["embeddings"];
    let rows = embeddings["float"]
        .as_array()
        .or_else(|| embeddings.as_array());
    rows.map(|rows| rows.iter().filter_map(to_vector).collect())
        .unwrap_or_default()
}

fn to_vector(value: &Value) -> Option<Vec<f32>> {
    let values = value.as_array()?;
    Some(
        values
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;

    #[test]
    fn anthropic_body_hoists_system_prompt() {
        let request = ChatRequest::new(vec![
            ChatMessage {
                role: "system".to_string(),
                content: "Be brief.".to_string(),
            },
            ChatMessage::user("When is CS 6363 offered?"),
        ]);

        let body = anthropic_body(&request, 512, Some(0.0));

        assert_eq!(body["anthropic_version"], ANTHROPIC_VERSION);
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["system"], "Be brief.");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn parses_text_blocks() {
        let payload = json!({
            "content": [
                { "type": "text", "text": "CS 6363 is offered " },
                { "type": "text", "text": "every semester." }
            ]
        });
        assert_eq!(
            parse_anthropic_text(&payload).as_deref(),
            Some("CS 6363 is offered every semester.")
        );
        assert!(parse_anthropic_text(&json!({})).is_none());
    }

    #[test]
    fn parses_both_cohere_response_shapes() {
        let v4 = json!({ "embeddings": { "float": [[0.5, 0.25], [1.0, 0.0]] } });
        let v3 = json!({ "embeddings": [[0.5, 0.25]] });

        assert_eq!(parse_cohere_embeddings(&v4), vec![vec![0.5, 0.25], vec![1.0, 0.0]]);
        assert_eq!(parse_cohere_embeddings(&v3), vec![vec![0.5, 0.25]]);
        assert!(parse_cohere_embeddings(&json!({})).is_empty());
    }
}
