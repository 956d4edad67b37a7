//! Turns pipeline outcomes into client responses

use super::models::PromptResponse;
use crate::error::{ErrorCategory, GenerationError, RcaError};
use crate::vector_db::ScoredDocument;
use indexmap::IndexSet;

pub struct ResponseAssembler;

impl ResponseAssembler {
    /// Generated text plus the source URLs, deduplicated in document order
    pub fn success(response: String, documents: &[ScoredDocument]) -> PromptResponse {
        let urls: IndexSet<&str> = documents.iter().filter_map(|d| d.url.as_deref()).collect();

        PromptResponse::Answer {
            response,
            urls: urls.into_iter().map(str::to_string).collect(),
        }
    }

    /// Error payload for `err`
    pub fn failure(err: &RcaError) -> PromptResponse {
        let error = match (err, err.category()) {
            (RcaError::Generation(e @ GenerationError::ContextLengthExceeded), _) => e.to_string(),
            (_, ErrorCategory::Validation) | (_, ErrorCategory::ModelNotFound) => err.to_string(),
            (_, ErrorCategory::BackendUnavailable) => {
                format!("I encountered an error while generating a response: {}", err)
            }
            (_, ErrorCategory::Fetch) => err.to_string(),
            (_, ErrorCategory::Internal) => "Internal error, please try again later".to_string(),
        };

        PromptResponse::Failure { error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VectorDbError;
    use crate::middleware::ValidationError;

    fn doc(url: Option<&str>, score: f32) -> ScoredDocument {
        ScoredDocument {
            id: String::new(),
            score,
            url: url.map(str::to_string),
            kind: None,
            text: None,
            components: vec![],
            collection: "jira".to_string(),
        }
    }

    #[test]
    fn test_urls_deduplicated_in_order() {
        let docs = vec![
            doc(Some("https://a"), 0.9),
            doc(Some("https://b"), 0.85),
            doc(Some("https://a"), 0.8),
            doc(None, 0.78),
            doc(Some("https://c"), 0.76),
        ];

        assert_eq!(
            ResponseAssembler::success("answer".to_string(), &docs),
            PromptResponse::Answer {
                response: "answer".to_string(),
                urls: vec!["https://a".into(), "https://b".into(), "https://c".into()],
            }
        );
    }

    #[test]
    fn test_validation_failure_message() {
        let err = RcaError::from(ValidationError::EmptyInput);
        assert_eq!(
            ResponseAssembler::failure(&err),
            PromptResponse::Failure {
                error: "content must not be empty".to_string()
            }
        );
    }

    #[test]
    fn test_backend_failure_message() {
        let err = RcaError::from(VectorDbError::ServiceUnavailable("circuit breaker is open".into()));
        match ResponseAssembler::failure(&err) {
            PromptResponse::Failure { error } => assert!(error.contains("circuit breaker is open")),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_context_overflow_message() {
        let err = RcaError::from(GenerationError::ContextLengthExceeded);
        match ResponseAssembler::failure(&err) {
            PromptResponse::Failure { error } => assert!(error.contains("shorten the input")),
            other => panic!("unexpected response: {:?}", other),
        }
    }
}
