use serde::Serialize;

use super::EngineError;

/// Sampling configuration for one model call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
    /// Ask the model for machine-parseable JSON only.
    pub structured_output: bool,
}

impl GenerationOptions {
    /// Near-deterministic JSON output for the diagnostic analysis.
    pub fn analysis() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.8,
            max_tokens: 4096,
            structured_output: true,
        }
    }

    /// Free-text output for diagnosis explanations.
    pub fn explanation() -> Self {
        Self {
            structured_output: false,
            ..Self::analysis()
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Reasoning model client abstraction (allows mocking)
pub trait LlmClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
        options: &GenerationOptions,
    ) -> Result<String, EngineError>;

    fn is_model_available(&self, model: &str) -> Result<bool, EngineError>;

    fn list_models(&self) -> Result<Vec<String>, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_options_are_low_temperature_json() {
        let options = GenerationOptions::analysis();
        assert_eq!(options.temperature, 0.2);
        assert_eq!(options.top_p, 0.8);
        assert_eq!(options.max_tokens, 4096);
        assert!(options.structured_output);
    }

    #[test]
    fn explanation_options_are_free_text() {
        let options = GenerationOptions::explanation().with_temperature(0.4);
        assert!(!options.structured_output);
        assert_eq!(options.temperature, 0.4);
        assert_eq!(options.max_tokens, 4096);
    }
}
