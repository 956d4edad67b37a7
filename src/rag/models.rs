//! Request and response models for prompt handling

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat profile selecting the system prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Profile {
    #[default]
    #[serde(rename = "Analyse CI logs")]
    CiLogs,

    #[serde(rename = "Chat with documentation and errata")]
    Documentation,

    #[serde(rename = "RCA for CI failures")]
    RcaFull,
}

impl Profile {
    pub const ALL: [Profile; 3] = [Profile::CiLogs, Profile::Documentation, Profile::RcaFull];

    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::CiLogs => "Analyse CI logs",
            Profile::Documentation => "Chat with documentation and errata",
            Profile::RcaFull => "RCA for CI failures",
        }
    }

    /// Look a profile up by its display name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }

    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|p| p.as_str().to_string()).collect()
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /prompt`; absent fields take the configured defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub similarity_threshold: Option<f64>,

    #[serde(default)]
    pub temperature: Option<f64>,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    #[serde(default)]
    pub profile_name: Option<String>,

    #[serde(default, alias = "vectordb_collection", alias = "collection_name")]
    pub collection: Option<String>,

    #[serde(default)]
    pub generative_model_name: Option<String>,

    #[serde(default)]
    pub embeddings_model_name: Option<String>,
}

impl PromptRequest {
    /// Request carrying only `content`
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }
}

/// A prompt with every parameter resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPrompt {
    pub content: String,
    pub similarity_threshold: f64,
    pub temperature: f64,
    pub max_tokens: u32,
    pub profile: Profile,
    pub collection: String,
    pub generative_model: String,
    pub embeddings_model: String,
}

/// What the backends currently serve
#[derive(Debug, Clone, Default)]
pub struct Availability {
    pub generative_models: Vec<String>,
    pub embeddings_models: Vec<String>,
    pub collections: Vec<String>,
}

/// Answer to a prompt: either the generated text with its sources, or an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptResponse {
    Answer { response: String, urls: Vec<String> },
    Failure { error: String },
}

impl PromptResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, PromptResponse::Failure { .. })
    }
}

/// Body of `POST /rca-from-tempest`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempestReportRequest {
    pub tempest_report_url: String,
}

/// Analysis of one failing Tempest test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RcaEntry {
    pub test_name: String,

    #[serde(flatten)]
    pub outcome: PromptResponse,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_names() {
        assert_eq!(Profile::from_name("RCA for CI failures"), Some(Profile::RcaFull));
        assert_eq!(Profile::from_name("rca"), None);
        assert_eq!(Profile::default().as_str(), "Analyse CI logs");
    }

    #[test]
    fn test_prompt_request_aliases() {
        let req: PromptRequest = serde_json::from_value(json!({
            "content": "boom",
            "vectordb_collection": "errata",
        }))
        .unwrap();
        assert_eq!(req.collection.as_deref(), Some("errata"));

        let req: PromptRequest = serde_json::from_value(json!({"collection_name": "docs"})).unwrap();
        assert_eq!(req.collection.as_deref(), Some("docs"));
        assert!(req.content.is_none());
    }

    #[test]
    fn test_response_shapes_are_exclusive() {
        let answer = PromptResponse::Answer {
            response: "root cause".to_string(),
            urls: vec!["https://issues.example.com/OSP-1".to_string()],
        };
        let value = serde_json::to_value(&answer).unwrap();
        assert!(value.get("error").is_none());
        assert_eq!(value["response"], "root cause");

        let failure = PromptResponse::Failure {
            error: "content must not be empty".to_string(),
        };
        let value = serde_json::to_value(&failure).unwrap();
        assert!(value.get("response").is_none());
        assert!(value.get("urls").is_none());
    }

    #[test]
    fn test_rca_entry_is_flat() {
        let entry = RcaEntry {
            test_name: "tempest.api.compute.test_boot".to_string(),
            outcome: PromptResponse::Failure {
                error: "backend down".to_string(),
            },
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"test_name": "tempest.api.compute.test_boot", "error": "backend down"})
        );
    }
}
