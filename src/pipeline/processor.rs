//! End-to-end analysis pipeline.
//!
//! ingest → assess → analyze → persist. Collaborators (text extraction,
//! reasoning model, storage) are injected so the whole flow runs against
//! mocks in tests.

use serde::Serialize;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::context::RequestContext;
use crate::db::{DatabaseError, DiagnosticStore, RecordSet, SavedAnalysis};
use crate::models::AnalysisParameters;
use crate::pipeline::diagnosis::{AnalysisRun, DiagnosticEngine, EngineError};
use crate::pipeline::dump;
use crate::pipeline::extraction::DocumentTextExtractor;
use crate::pipeline::import::{Artifact, IngestionCoordinator, IngestionFailure, IngestionReport};
use crate::pipeline::quality::{self, QualityReport, ValidationReport};

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("No usable patient data ({} artifact(s) failed)", failures.len())]
    NoUsableData { failures: Vec<IngestionFailure> },

    #[error("Analysis failed: {0}")]
    Engine(#[from] EngineError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub run_id: Uuid,
    pub ingestion: IngestionReport,
    pub quality: QualityReport,
    pub validation: ValidationReport,
    pub parameters: AnalysisParameters,
    pub analysis: AnalysisRun,
    /// One stored record set per contributing source, in input order.
    pub record_ids: Vec<Uuid>,
    /// Stored diagnostic result, linked to the first record set.
    pub result_id: Uuid,
}

/// Ingestion plus quality checks, without analysis.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionOutcome {
    pub ingestion: IngestionReport,
    pub quality: QualityReport,
    pub validation: ValidationReport,
}

pub struct AnalysisPipeline {
    coordinator: IngestionCoordinator,
    engine: DiagnosticEngine,
}

impl AnalysisPipeline {
    pub fn new(coordinator: IngestionCoordinator, engine: DiagnosticEngine) -> Self {
        Self {
            coordinator,
            engine,
        }
    }

    /// Production wiring: the given extractor and an Ollama-backed engine.
    pub fn from_config(
        extractor: Box<dyn DocumentTextExtractor>,
        config: &EngineConfig,
    ) -> Result<Self, ProcessingError> {
        let engine = DiagnosticEngine::from_config(config)?;
        tracing::info!(model = %config.model, base_url = %config.base_url, "Analysis pipeline ready");
        Ok(Self::new(IngestionCoordinator::new(extractor), engine))
    }

    pub fn engine(&self) -> &DiagnosticEngine {
        &self.engine
    }

    /// Ingest artifacts and assess the resulting batch.
    pub fn ingest(&self, artifacts: &[Artifact]) -> IngestionOutcome {
        let ingestion = self.coordinator.ingest(artifacts);
        let quality = quality::assess(&ingestion.batch);
        let validation = quality::validate_records(&ingestion.batch);
        tracing::info!(
            records = ingestion.batch.len(),
            failures = ingestion.failures.len(),
            quality_score = quality.quality_score,
            valid_records = validation.valid_records,
            "Ingestion assessed"
        );
        IngestionOutcome {
            ingestion,
            quality,
            validation,
        }
    }

    /// Full run. Nothing is persisted unless analysis produced a complete
    /// result.
    pub fn process(
        &self,
        ctx: &RequestContext,
        artifacts: &[Artifact],
        store: &dyn DiagnosticStore,
    ) -> Result<PipelineOutcome, ProcessingError> {
        let run_id = Uuid::new_v4();
        let dump_dir = dump::dump_dir_for(&run_id);

        let IngestionOutcome {
            ingestion,
            quality,
            validation,
        } = self.ingest(artifacts);
        if let Some(dir) = &dump_dir {
            dump::dump_json(dir, "00-ingestion.json", &ingestion);
            dump::dump_json(dir, "01-quality.json", &quality);
        }
        if ingestion.batch.is_empty() {
            tracing::warn!(
                run_id = %run_id,
                failures = ingestion.failures.len(),
                "No usable patient data"
            );
            return Err(ProcessingError::NoUsableData {
                failures: ingestion.failures,
            });
        }

        let parameters = ctx.resolve_parameters(store)?;
        let analysis = self.engine.run(&ingestion.batch, &parameters)?;
        if let Some(dir) = &dump_dir {
            dump::dump_analysis(dir, &analysis);
        }

        let SavedAnalysis {
            record_ids,
            result_id,
        } = store.save_analysis(
            &ctx.owner_id,
            &record_sets(&ingestion),
            &analysis.result,
            parameters.confidence_threshold,
            parameters.max_diagnoses,
        )?;

        tracing::info!(
            run_id = %run_id,
            result_id = %result_id,
            diagnoses = analysis.result.diagnoses.len(),
            red_flags = analysis.result.red_flags.len(),
            degraded = analysis.degraded,
            attempts = analysis.attempts,
            "Pipeline run complete"
        );

        Ok(PipelineOutcome {
            run_id,
            ingestion,
            quality,
            validation,
            parameters,
            analysis,
            record_ids,
            result_id,
        })
    }
}

/// One record set per contributing source, sliced from the merged batch.
fn record_sets(ingestion: &IngestionReport) -> Vec<RecordSet<'_>> {
    let mut offset = 0;
    ingestion
        .sources
        .iter()
        .map(|source| {
            let records = ingestion.batch.slice(offset..offset + source.records);
            offset += source.records;
            RecordSet {
                source_name: &source.name,
                source_type: source.kind,
                records,
            }
        })
        .collect()
}
