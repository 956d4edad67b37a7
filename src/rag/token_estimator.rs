//! Character-based token estimation

/// Logs tokenize densely, so three characters per token rather than the usual four
pub const CHARS_PER_TOKEN: f32 = 3.0;

/// Share of the generation context the prompt may fill
pub const CONTEXT_FILL_RATIO: f32 = 0.75;

/// Token estimator for calculating token counts
#[derive(Debug, Clone, Copy)]
pub struct TokenEstimator {
    chars_per_token: f32,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(CHARS_PER_TOKEN)
    }
}

impl TokenEstimator {
    pub fn new(chars_per_token: f32) -> Self {
        Self { chars_per_token }
    }

    /// Estimate token count for text
    pub fn estimate(&self, text: &str) -> usize {
        let char_count = text.chars().count();
        (char_count as f32 / self.chars_per_token).ceil() as usize
    }

    /// Characters the prompt may use for a model with `max_context` tokens
    pub fn prompt_char_budget(&self, max_context: usize) -> usize {
        (max_context as f32 * self.chars_per_token * CONTEXT_FILL_RATIO) as usize
    }

    /// Approximate input limit shown to users, rounded to hundreds
    pub fn approx_max_chars(&self, max_context: usize) -> usize {
        let chars = (max_context as f32 * self.chars_per_token) as usize;
        (chars + 50) / 100 * 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_based_estimation() {
        let estimator = TokenEstimator::default();
        assert_eq!(estimator.estimate("Hello world"), 4); // 11 / 3 = 3.67 -> 4
        assert_eq!(estimator.estimate(""), 0);
    }

    #[test]
    fn test_prompt_budget() {
        let estimator = TokenEstimator::default();
        assert_eq!(estimator.prompt_char_budget(32000), 72000);
    }

    #[test]
    fn test_approx_max_chars_rounds_to_hundreds() {
        let estimator = TokenEstimator::default();
        assert_eq!(estimator.approx_max_chars(8192), 24600);
        assert_eq!(estimator.approx_max_chars(512), 1500);
    }
}
