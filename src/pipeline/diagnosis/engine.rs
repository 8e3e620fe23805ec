use std::time::Duration;

use serde::Serialize;

use super::filter::apply_parameters;
use super::ollama::OllamaClient;
use super::parser::{parse_response, PARSE_FAILURE};
use super::prompt::{
    build_analysis_prompt, build_explanation_prompt, DIAGNOSTIC_SYSTEM_PROMPT,
    EXPLANATION_SYSTEM_PROMPT,
};
use super::repair::{enforce_invariants, repair, RepairStats};
use super::summary::{summarize, CategorizedSummary};
use super::types::{GenerationOptions, LlmClient};
use super::EngineError;
use crate::config::EngineConfig;
use crate::models::{AnalysisParameters, Diagnosis, DiagnosticResult, PatientRecordBatch};

/// Default number of model calls per analysis (one retry).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Per-call analysis state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    Idle,
    PromptBuilt,
    ModelInvoked,
    ResponseParsed,
    ResponseDegraded,
    Repaired,
    Filtered,
    Done,
}

impl AnalysisStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PromptBuilt => "prompt_built",
            Self::ModelInvoked => "model_invoked",
            Self::ResponseParsed => "response_parsed",
            Self::ResponseDegraded => "response_degraded",
            Self::Repaired => "repaired",
            Self::Filtered => "filtered",
            Self::Done => "done",
        }
    }
}

/// Everything one analysis produced, for dumping and reporting. Only
/// `result` is meant for persistence.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRun {
    pub result: DiagnosticResult,
    pub degraded: bool,
    pub attempts: u32,
    pub stages: Vec<AnalysisStage>,
    pub summary: CategorizedSummary,
    pub prompt: String,
    pub raw_response: String,
    /// Why the response was unusable, when it was.
    pub shape_error: Option<String>,
    #[serde(skip)]
    pub repair: Option<RepairStats>,
}

struct StageLog(Vec<AnalysisStage>);

impl StageLog {
    fn new() -> Self {
        tracing::info!(stage = AnalysisStage::Idle.as_str(), "Analysis stage");
        Self(vec![AnalysisStage::Idle])
    }

    fn advance(&mut self, stage: AnalysisStage) {
        tracing::info!(stage = stage.as_str(), "Analysis stage");
        self.0.push(stage);
    }
}

/// Diagnostic Analysis Engine: summary → prompt → model → parse/repair → filter.
pub struct DiagnosticEngine {
    llm: Box<dyn LlmClient + Send + Sync>,
    model: String,
    options: GenerationOptions,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl DiagnosticEngine {
    pub fn new(llm: Box<dyn LlmClient + Send + Sync>, model: &str) -> Self {
        Self {
            llm,
            model: model.to_string(),
            options: GenerationOptions::analysis(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Engine talking to the Ollama instance named in `config`.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        let client = OllamaClient::from_config(config)?;
        Ok(Self::new(Box::new(client), &config.model)
            .with_retry(config.max_attempts, Duration::from_millis(config.retry_backoff_ms))
            .with_temperature(config.temperature))
    }

    /// Total model calls allowed per request (at least one) and the pause
    /// between them.
    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_backoff = backoff;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.options = self.options.with_temperature(temperature);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_model_available(&self) -> Result<bool, EngineError> {
        self.llm.is_model_available(&self.model)
    }

    /// Call the model, retrying transport-class failures.
    fn invoke(
        &self,
        prompt: &str,
        system: &str,
        options: &GenerationOptions,
    ) -> Result<(String, u32), EngineError> {
        let mut attempt = 1;
        loop {
            match self.llm.generate(&self.model, prompt, system, options) {
                Ok(response) => return Ok((response, attempt)),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Model call failed, retrying"
                    );
                    std::thread::sleep(self.retry_backoff);
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(attempt, error = %e, "Model call failed");
                    return Err(e);
                }
            }
        }
    }

    /// Full analysis with its intermediate artifacts.
    pub fn run(
        &self,
        batch: &PatientRecordBatch,
        params: &AnalysisParameters,
    ) -> Result<AnalysisRun, EngineError> {
        let mut stages = StageLog::new();
        if batch.is_empty() {
            return Err(EngineError::NoPatientData);
        }
        let params = params.normalized();

        let summary = summarize(batch);
        let prompt = build_analysis_prompt(&summary.render(), &params);
        stages.advance(AnalysisStage::PromptBuilt);
        tracing::debug!(
            records = batch.len(),
            prompt_chars = prompt.chars().count(),
            model = %self.model,
            "Analysis prompt built"
        );

        let (raw_response, attempts) =
            self.invoke(&prompt, DIAGNOSTIC_SYSTEM_PROMPT, &self.options)?;
        stages.advance(AnalysisStage::ModelInvoked);
        if raw_response.trim().is_empty() {
            return Err(EngineError::EmptyResponse);
        }

        let (result, shape_error, repair_stats) = match parse_response(&raw_response) {
            Ok(parsed) => {
                stages.advance(AnalysisStage::ResponseParsed);
                let (result, stats) = repair(&parsed);
                (result, None, Some(stats))
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    response_chars = raw_response.chars().count(),
                    "Unusable model response, returning degraded result"
                );
                stages.advance(AnalysisStage::ResponseDegraded);
                let mut result = DiagnosticResult::degraded(PARSE_FAILURE);
                enforce_invariants(&mut result);
                (result, Some(e.to_string()), None)
            }
        };
        stages.advance(AnalysisStage::Repaired);

        let result = apply_parameters(result, &params);
        stages.advance(AnalysisStage::Filtered);
        stages.advance(AnalysisStage::Done);

        Ok(AnalysisRun {
            degraded: shape_error.is_some(),
            result,
            attempts,
            stages: stages.0,
            summary,
            prompt,
            raw_response,
            shape_error,
            repair: repair_stats,
        })
    }

    /// Analyze a batch and return the diagnostic result document.
    pub fn analyze(
        &self,
        batch: &PatientRecordBatch,
        params: &AnalysisParameters,
    ) -> Result<DiagnosticResult, EngineError> {
        self.run(batch, params).map(|run| run.result)
    }

    /// Free-text explanation of one diagnosis against the batch.
    pub fn explain_diagnosis(
        &self,
        diagnosis: &Diagnosis,
        batch: &PatientRecordBatch,
    ) -> Result<String, EngineError> {
        if batch.is_empty() {
            return Err(EngineError::NoPatientData);
        }
        let prompt = build_explanation_prompt(diagnosis, &summarize(batch).render());
        let options = GenerationOptions::explanation().with_temperature(self.options.temperature);
        let (text, attempts) = self.invoke(&prompt, EXPLANATION_SYSTEM_PROMPT, &options)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::EmptyResponse);
        }
        tracing::info!(attempts, chars = text.chars().count(), "Diagnosis explanation generated");
        Ok(text.to_string())
    }
}
