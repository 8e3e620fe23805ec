use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::json;

use clinsight_lib::config::{self, EngineConfig};
use clinsight_lib::context::RequestContext;
use clinsight_lib::db::{DiagnosticStore, SqliteStore};
use clinsight_lib::models::{AnalysisParameters, ArtifactKind};
use clinsight_lib::pipeline::diagnosis::group_by_specialty;
use clinsight_lib::pipeline::extraction::{
    DocumentTextExtractor, PdfiumTextExtractor, Utf8TextExtractor,
};
use clinsight_lib::pipeline::import::{declared_type_for_path, Artifact, IngestionCoordinator};
use clinsight_lib::pipeline::processor::AnalysisPipeline;
use clinsight_lib::pipeline::quality;

#[derive(Parser)]
#[command(name = "clinsight")]
#[command(version, about = "Patient-data normalization and diagnostic analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest files and report records, failures and data quality
    Ingest {
        /// Input files (.csv, .tsv, .json, .txt, .md, .pdf)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Ingest files, run the diagnostic analysis and store the result
    Analyze {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Owner the records and result are stored under
        #[arg(long, default_value = "local")]
        owner: String,
        /// Minimum confidence for a diagnosis to be kept (0.0-1.0)
        #[arg(long)]
        threshold: Option<f64>,
        /// Maximum number of diagnoses returned
        #[arg(long)]
        max_diagnoses: Option<usize>,
        /// Drop red flags from the result
        #[arg(long)]
        no_red_flags: bool,
        /// Also ask the model to explain the top diagnosis
        #[arg(long)]
        explain: bool,
        /// SQLite database path (defaults to ~/Clinsight/clinsight.db)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Show or change stored analysis preferences
    Preferences {
        #[command(subcommand)]
        action: PreferencesAction,
    },
}

#[derive(Subcommand)]
enum PreferencesAction {
    Show {
        #[arg(long, default_value = "local")]
        owner: String,
        #[arg(long)]
        db: Option<PathBuf>,
    },
    Set {
        #[arg(long, default_value = "local")]
        owner: String,
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        max_diagnoses: Option<usize>,
        /// Enable or disable red flag detection
        #[arg(long)]
        red_flags: Option<bool>,
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn read_artifacts(files: &[PathBuf]) -> CliResult<Vec<Artifact>> {
    let mut artifacts = Vec::with_capacity(files.len());
    for path in files {
        let bytes = std::fs::read(path)
            .map_err(|e| format!("Cannot read {}: {e}", path.display()))?;
        // Unknown extensions are passed through as-is and reported as unsupported.
        let declared = declared_type_for_path(path)
            .map(str::to_string)
            .or_else(|| path.extension().map(|e| e.to_string_lossy().into_owned()))
            .unwrap_or_default();
        artifacts.push(Artifact::new(&path.to_string_lossy(), declared, bytes));
    }
    Ok(artifacts)
}

fn is_document(path: &Path) -> bool {
    declared_type_for_path(path) == Some(ArtifactKind::Document.as_str())
}

fn extractor_for(files: &[PathBuf]) -> CliResult<Box<dyn DocumentTextExtractor>> {
    if files.iter().any(|p| is_document(p)) {
        Ok(Box::new(PdfiumTextExtractor::new()?))
    } else {
        Ok(Box::new(Utf8TextExtractor))
    }
}

fn open_store(db: Option<PathBuf>) -> CliResult<SqliteStore> {
    let path = db.unwrap_or_else(config::database_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(SqliteStore::open(&path)?)
}

fn print_json(value: &serde_json::Value) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn ingest(files: &[PathBuf]) -> CliResult<()> {
    let artifacts = read_artifacts(files)?;
    let coordinator = IngestionCoordinator::new(extractor_for(files)?);
    let report = coordinator.ingest(&artifacts);
    print_json(&json!({
        "sources": report.sources,
        "failures": report.failures,
        "quality": quality::assess(&report.batch),
        "validation": quality::validate_records(&report.batch),
        "statistics": quality::summarize_batch(&report.batch),
        "records": report.batch,
    }))
}

fn analyze(
    files: &[PathBuf],
    ctx: RequestContext,
    explain: bool,
    db: Option<PathBuf>,
) -> CliResult<()> {
    let store = open_store(db)?;
    let artifacts = read_artifacts(files)?;
    let engine_config = EngineConfig::from_env();
    let pipeline = AnalysisPipeline::from_config(extractor_for(files)?, &engine_config)?;

    let outcome = pipeline.process(&ctx, &artifacts, &store)?;
    let result = &outcome.analysis.result;

    let explanation = match (explain, result.top_diagnosis()) {
        (true, Some(top)) => Some(pipeline.engine().explain_diagnosis(top, &outcome.ingestion.batch)?),
        _ => None,
    };

    print_json(&json!({
        "result_id": outcome.result_id,
        "failures": outcome.ingestion.failures,
        "quality": outcome.quality,
        "parameters": outcome.parameters,
        "degraded": outcome.analysis.degraded,
        "specialties": group_by_specialty(&result.diagnoses),
        "analysis": result.to_export(),
        "explanation": explanation,
    }))
}

fn merge_parameters(
    base: AnalysisParameters,
    threshold: Option<f64>,
    max_diagnoses: Option<usize>,
    red_flags: Option<bool>,
) -> AnalysisParameters {
    AnalysisParameters::new(
        threshold.unwrap_or(base.confidence_threshold),
        max_diagnoses.unwrap_or(base.max_diagnoses),
        red_flags.unwrap_or(base.include_red_flags),
    )
}

fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Ingest { files } => ingest(&files),
        Commands::Analyze {
            files,
            owner,
            threshold,
            max_diagnoses,
            no_red_flags,
            explain,
            db,
        } => {
            let mut ctx = RequestContext::new(owner);
            if threshold.is_some() || max_diagnoses.is_some() || no_red_flags {
                // Command-line values override stored preferences field by field.
                let store = open_store(db.clone())?;
                let stored = store.get_preferences(&ctx.owner_id)?;
                let red_flags = no_red_flags.then_some(false);
                ctx = ctx.with_parameters(merge_parameters(stored, threshold, max_diagnoses, red_flags));
            }
            analyze(&files, ctx, explain, db)
        }
        Commands::Preferences { action } => match action {
            PreferencesAction::Show { owner, db } => {
                let store = open_store(db)?;
                print_json(&json!(store.get_preferences(&owner)?))
            }
            PreferencesAction::Set {
                owner,
                threshold,
                max_diagnoses,
                red_flags,
                db,
            } => {
                let store = open_store(db)?;
                let current = store.get_preferences(&owner)?;
                let updated = merge_parameters(current, threshold, max_diagnoses, red_flags);
                store.update_preferences(&owner, &updated)?;
                print_json(&json!(updated))
            }
        },
    }
}

fn main() {
    clinsight_lib::init_tracing();
    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);

    if let Err(e) = run(Cli::parse()) {
        tracing::error!(error = %e, "Command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
