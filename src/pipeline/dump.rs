//! Analysis dump: writes the artifacts of one pipeline run to disk.
//!
//! Disabled unless `CLINSIGHT_DUMP_DIR` is set. The dump contains patient
//! data, so it is only ever written on explicit request.
//!
//! **Output structure**:
//! ```text
//! {dump_dir}/{run_id}/
//!   00-ingestion.json
//!   01-quality.json
//!   02-summary.json
//!   03-analysis-prompt.txt
//!   04-raw-response.txt
//!   05-result.json
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

use crate::pipeline::diagnosis::AnalysisRun;

pub const DUMP_DIR_VAR: &str = "CLINSIGHT_DUMP_DIR";

/// Dump directory for a run, or `None` when dumping is disabled.
pub fn dump_dir_for(run_id: &Uuid) -> Option<PathBuf> {
    let base = std::env::var_os(DUMP_DIR_VAR)?;
    dump_dir_in(Path::new(&base), run_id)
}

/// Creates `{base}/{run_id}`. Returns `None` (with a warning) if directory
/// creation fails; never panics, never blocks the pipeline.
pub fn dump_dir_in(base: &Path, run_id: &Uuid) -> Option<PathBuf> {
    let dir = base.join(run_id.to_string());
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(
            path = %dir.display(),
            error = %e,
            "Analysis dump: failed to create directory"
        );
        return None;
    }
    Some(dir)
}

/// Write a pretty-printed JSON artifact. Never panics.
pub fn dump_json<T: Serialize>(dir: &Path, filename: &str, value: &T) {
    let path = dir.join(filename);
    match serde_json::to_string_pretty(value) {
        Ok(json) => write(&path, json.as_bytes(), "JSON"),
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "Analysis dump: failed to serialize JSON"
        ),
    }
}

/// Write a text artifact (prompt, raw model response). Never panics.
pub fn dump_text(dir: &Path, filename: &str, text: &str) {
    write(&dir.join(filename), text.as_bytes(), "text");
}

fn write(path: &Path, data: &[u8], kind: &str) {
    match std::fs::write(path, data) {
        Ok(()) => tracing::debug!(
            path = %path.display(),
            size = data.len(),
            kind,
            "Analysis dump: artifact written"
        ),
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            kind,
            "Analysis dump: failed to write artifact"
        ),
    }
}

/// Write the engine-side artifacts of one analysis.
pub fn dump_analysis(dir: &Path, run: &AnalysisRun) {
    dump_json(dir, "02-summary.json", &run.summary);
    dump_text(dir, "03-analysis-prompt.txt", &run.prompt);
    dump_text(dir, "04-raw-response.txt", &run.raw_response);
    dump_json(dir, "05-result.json", &run.result.to_export());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisParameters, PatientRecordBatch, RawFields};
    use crate::pipeline::diagnosis::{DiagnosticEngine, MockLlmClient};
    use crate::pipeline::normalize::normalize;

    #[test]
    fn dump_dir_in_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let run_id = Uuid::new_v4();
        let dir = dump_dir_in(tmp.path(), &run_id).unwrap();
        assert!(dir.exists());
        assert!(dir.ends_with(run_id.to_string()));
    }

    #[test]
    fn dump_dir_in_fails_softly() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        assert!(dump_dir_in(&file, &Uuid::new_v4()).is_none());
    }

    #[test]
    fn dump_json_writes_pretty_json() {
        let tmp = tempfile::tempdir().unwrap();
        dump_json(tmp.path(), "t.json", &serde_json::json!({"a": 1}));
        let content = std::fs::read_to_string(tmp.path().join("t.json")).unwrap();
        assert!(content.contains("\"a\": 1"));
    }

    #[test]
    fn dump_text_to_missing_dir_does_not_panic() {
        dump_text(Path::new("/nonexistent/clinsight/dump"), "x.txt", "hello");
    }

    #[test]
    fn dump_analysis_writes_all_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let raw: RawFields = [("age", "60"), ("symptoms", "cough")].into_iter().collect();
        let batch = PatientRecordBatch::new(vec![normalize(&raw)]);
        let engine = DiagnosticEngine::new(
            Box::new(MockLlmClient::new(r#"{"diagnoses":[{"condition":"Bronchitis","confidence_score":0.6}]}"#)),
            "medgemma",
        );
        let run = engine.run(&batch, &AnalysisParameters::default()).unwrap();

        dump_analysis(tmp.path(), &run);
        for name in ["02-summary.json", "03-analysis-prompt.txt", "04-raw-response.txt", "05-result.json"] {
            assert!(tmp.path().join(name).exists(), "{name}");
        }
        let result = std::fs::read_to_string(tmp.path().join("05-result.json")).unwrap();
        assert!(result.contains("Bronchitis"));
        assert!(result.contains("AI Medical Diagnostic Analysis"));
    }
}
