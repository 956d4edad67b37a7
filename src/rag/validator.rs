//! Default resolution and checking of prompt requests

use super::models::{Availability, Profile, PromptRequest, ResolvedPrompt};
use crate::config::Config;
use crate::middleware::{InputValidator, ValidationError};
use tracing::debug;

/// Resolves prompt requests against configuration and backend availability
pub struct RequestValidator;

impl RequestValidator {
    /// Fill absent fields with configured defaults and range-check the result
    pub fn resolve(request: PromptRequest, config: &Config) -> Result<ResolvedPrompt, ValidationError> {
        let content = request.content.unwrap_or_default();
        InputValidator::validate_content(&content)?;

        let similarity_threshold = request
            .similarity_threshold
            .unwrap_or(config.search.similarity_threshold);
        InputValidator::validate_similarity_threshold(similarity_threshold)?;

        let temperature = request.temperature.unwrap_or(config.model_defaults.temperature);
        InputValidator::validate_temperature(temperature)?;

        let max_tokens = request.max_tokens.unwrap_or(config.model_defaults.max_tokens);
        InputValidator::validate_max_tokens(max_tokens)?;

        let profile = match request.profile_name.as_deref() {
            None => Profile::default(),
            Some(name) => Profile::from_name(name).ok_or_else(|| ValidationError::InvalidProfile {
                available: Profile::names(),
            })?,
        };

        let resolved = ResolvedPrompt {
            content,
            similarity_threshold,
            temperature,
            max_tokens,
            profile,
            collection: request
                .collection
                .unwrap_or_else(|| config.vector_db.collection_name.clone()),
            generative_model: request
                .generative_model_name
                .unwrap_or_else(|| config.generation.model.clone()),
            embeddings_model: request
                .embeddings_model_name
                .unwrap_or_else(|| config.embedding.model.clone()),
        };

        debug!(
            "Resolved prompt: profile={} collection={} model={}",
            resolved.profile, resolved.collection, resolved.generative_model
        );
        Ok(resolved)
    }

    /// Check the resolved model and collection names against what the backends serve
    pub fn check_availability(
        resolved: &ResolvedPrompt,
        availability: &Availability,
    ) -> Result<(), ValidationError> {
        if !availability.generative_models.contains(&resolved.generative_model) {
            return Err(ValidationError::InvalidGenerativeModel {
                available: availability.generative_models.clone(),
            });
        }

        if !availability.embeddings_models.contains(&resolved.embeddings_model) {
            return Err(ValidationError::InvalidEmbeddingsModel {
                available: availability.embeddings_models.clone(),
            });
        }

        if !availability.collections.contains(&resolved.collection) {
            return Err(ValidationError::InvalidCollection {
                available: availability.collections.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn availability() -> Availability {
        let config = Config::default_config();
        Availability {
            generative_models: vec![config.generation.model.clone(), "granite".to_string()],
            embeddings_models: vec![config.embedding.model.clone()],
            collections: vec![config.vector_db.collection_name.clone(), "errata".to_string()],
        }
    }

    #[test]
    fn test_defaults_fill_absent_fields() {
        let config = Config::default_config();
        let resolved = RequestValidator::resolve(PromptRequest::with_content("job failed"), &config).unwrap();

        assert_eq!(resolved.content, "job failed");
        assert_eq!(resolved.similarity_threshold, config.search.similarity_threshold);
        assert_eq!(resolved.temperature, config.model_defaults.temperature);
        assert_eq!(resolved.max_tokens, config.model_defaults.max_tokens);
        assert_eq!(resolved.profile, Profile::CiLogs);
        assert_eq!(resolved.collection, config.vector_db.collection_name);
        assert_eq!(resolved.generative_model, config.generation.model);
        assert_eq!(resolved.embeddings_model, config.embedding.model);
    }

    #[test]
    fn test_valid_inputs_pass_unchanged() {
        let config = Config::default_config();
        let request = PromptRequest {
            content: Some("job failed".to_string()),
            similarity_threshold: Some(0.42),
            temperature: Some(0.1),
            max_tokens: Some(1),
            profile_name: Some("Chat with documentation and errata".to_string()),
            collection: Some("errata".to_string()),
            generative_model_name: Some("granite".to_string()),
            embeddings_model_name: Some("e5".to_string()),
        };

        let resolved = RequestValidator::resolve(request, &config).unwrap();
        assert_eq!(resolved.similarity_threshold, 0.42);
        assert_eq!(resolved.temperature, 0.1);
        assert_eq!(resolved.max_tokens, 1);
        assert_eq!(resolved.profile, Profile::Documentation);
        assert_eq!(resolved.collection, "errata");
        assert_eq!(resolved.generative_model, "granite");
        assert_eq!(resolved.embeddings_model, "e5");
    }

    #[test]
    fn test_content_kept_verbatim() {
        let config = Config::default_config();
        let log = "  \x1b[31mERROR\x1b[0m: nova boot failed\n";

        let resolved = RequestValidator::resolve(PromptRequest::with_content(log), &config).unwrap();
        assert_eq!(resolved.content, log);
    }

    #[test]
    fn test_values_just_outside_range_rejected() {
        let config = Config::default_config();
        let request: PromptRequest = serde_json::from_str(
            r#"{"content": "x", "similarity_threshold": 1.00000001}"#,
        )
        .unwrap();
        assert!(matches!(
            RequestValidator::resolve(request, &config),
            Err(ValidationError::ThresholdOutOfRange { .. })
        ));

        let request: PromptRequest =
            serde_json::from_str(r#"{"content": "x", "temperature": 1.00000001}"#).unwrap();
        assert!(matches!(
            RequestValidator::resolve(request, &config),
            Err(ValidationError::TemperatureOutOfRange { .. })
        ));
    }

    #[test]
    fn test_missing_content() {
        let config = Config::default_config();
        let err = RequestValidator::resolve(PromptRequest::default(), &config).unwrap_err();
        assert_eq!(err, ValidationError::EmptyInput);
    }

    #[test]
    fn test_range_boundaries() {
        let config = Config::default_config();
        let with = |f: fn(&mut PromptRequest)| {
            let mut req = PromptRequest::with_content("x");
            f(&mut req);
            RequestValidator::resolve(req, &config)
        };

        assert!(with(|r| r.similarity_threshold = Some(0.0)).is_err());
        assert!(with(|r| r.similarity_threshold = Some(1.01)).is_err());
        assert!(with(|r| r.similarity_threshold = Some(1.0)).is_ok());

        assert!(with(|r| r.temperature = Some(0.05)).is_err());
        assert!(with(|r| r.temperature = Some(1.5)).is_err());
        assert!(with(|r| r.temperature = Some(0.1)).is_ok());
        assert!(with(|r| r.temperature = Some(1.0)).is_ok());

        assert!(with(|r| r.max_tokens = Some(0)).is_err());
        assert!(with(|r| r.max_tokens = Some(1025)).is_err());
        assert!(with(|r| r.max_tokens = Some(1)).is_ok());
        assert!(with(|r| r.max_tokens = Some(1024)).is_ok());
    }

    #[test]
    fn test_unknown_profile_lists_alternatives() {
        let config = Config::default_config();
        let mut req = PromptRequest::with_content("x");
        req.profile_name = Some("Poetry".to_string());

        let err = RequestValidator::resolve(req, &config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid profile name. Available profiles are: (Analyse CI logs, \
             Chat with documentation and errata, RCA for CI failures)"
        );
    }

    #[test]
    fn test_availability_checks() {
        let config = Config::default_config();
        let resolved = RequestValidator::resolve(PromptRequest::with_content("x"), &config).unwrap();
        assert!(RequestValidator::check_availability(&resolved, &availability()).is_ok());

        let mut bad = resolved.clone();
        bad.collection = "nope".to_string();
        let err = RequestValidator::check_availability(&bad, &availability()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid collection name. Available collections are: (rca-knowledge-base, errata)"
        );

        let mut bad = resolved.clone();
        bad.generative_model = "gpt-x".to_string();
        assert!(matches!(
            RequestValidator::check_availability(&bad, &availability()),
            Err(ValidationError::InvalidGenerativeModel { .. })
        ));

        let mut bad = resolved;
        bad.embeddings_model = "e-x".to_string();
        assert!(matches!(
            RequestValidator::check_availability(&bad, &availability()),
            Err(ValidationError::InvalidEmbeddingsModel { .. })
        ));
    }
}
