//! Typed view over the merged YAML config.
//!
//! Every field has a default, so an empty `config.yml` yields a working
//! Bedrock + S3 deployment reading from `./data`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub index: IndexSettings,
    pub storage: StorageSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub llm: LlmSettings,
    pub server: ServerSettings,
    pub chat: ChatSettings,
    pub enrollment_filter: FilterSettings,
    pub scraper: ScraperSettings,
}

impl Settings {
    pub fn from_value(config: &Value) -> Result<Self, ApiError> {
        let mut settings: Settings = serde_json::from_value(config.clone())
            .map_err(|e| ApiError::BadRequest(format!("Invalid config: {}", e)))?;
        if settings.data_dir.as_os_str().is_empty() {
            settings.data_dir = PathBuf::from("data");
        }
        Ok(settings)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Directory holding the persisted index.
    pub local_path: PathBuf,
    pub batch_size: usize,
    pub batch_pause_secs: u64,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            local_path: PathBuf::from("vector_store"),
            batch_size: 100,
            batch_pause_secs: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    S3,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub provider: StorageProvider,
    pub bucket: String,
    pub archive_key: String,
    pub region: Option<String>,
    pub max_attempts: u32,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: StorageProvider::S3,
            bucket: "utdca-vector-db".to_string(),
            archive_key: "vector_store.zip".to_string(),
            region: None,
            max_attempts: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 10 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    Bedrock,
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: LlmProviderKind,
    pub region: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    pub max_attempts: u32,
    /// OpenAI-compatible endpoints only.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::Bedrock,
            region: "us-east-1".to_string(),
            chat_model: "anthropic.claude-3-haiku-20240307-v1:0".to_string(),
            embedding_model: "cohere.embed-v4:0".to_string(),
            max_tokens: 1024,
            temperature: None,
            max_attempts: 10,
            base_url: None,
            api_key: None,
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub api_url: String,
    pub timeout_secs: u64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000/query".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub subject: String,
    pub min_catalog: f64,
    pub max_catalog: f64,
    pub files: Vec<String>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            subject: "CS".to_string(),
            min_catalog: 6000.0,
            max_catalog: 7000.0,
            files: [
                "Fall 2022.csv",
                "Fall 2023.csv",
                "Fall 2024.csv",
                "Spring 2022.csv",
                "Spring 2023.csv",
                "Spring 2024.csv",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    pub base_url: String,
    pub output: PathBuf,
    pub rating_class: String,
    pub feedback_class: String,
    pub name_class: String,
    pub timeout_secs: u64,
    /// Course number -> professor ids on the rating site.
    pub professors: BTreeMap<String, Vec<String>>,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        let professors = [
            ("6313", vec!["1377273", "2324103", "3105814"]),
            ("6350", vec!["2038564"]),
            ("6363", vec!["194919", "918305", "462041", "2092131", "2516353"]),
            ("6375", vec!["1837370", "2566277", "3103949", "2369676"]),
            ("6320", vec!["2844042", "3077846"]),
            ("6360", vec!["1530329", "1936866", "2712933"]),
        ]
        .into_iter()
        .map(|(course, ids)| {
            (
                course.to_string(),
                ids.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();

        Self {
            base_url: "https://www.ratemyprofessors.com/professor/".to_string(),
            output: PathBuf::from("data/course_to_prof.json"),
            rating_class: "RatingValue__Numerator-qw8sqy-2 duhvlP".to_string(),
            feedback_class: "FeedbackItem__FeedbackNumber-uof32n-1 ecFgca".to_string(),
            name_class: "NameTitle__NameWrapper-dowf0z-2 cSXRap".to_string(),
            timeout_secs: 30,
            professors,
        }
    }
}
