use serde::Serialize;

use super::format::{check_size, parse_declared_type, sanitize_artifact_name, TAB_SEPARATED_TAG};
use super::IngestError;
use crate::models::{ArtifactKind, PatientRecord, PatientRecordBatch};
use crate::pipeline::extraction::{
    DocumentAdapter, DocumentTextExtractor, FormatAdapter, FormatError, KeyValueTextAdapter,
    ObjectAdapter, TabularAdapter,
};
use crate::pipeline::normalize::normalize;

/// One uploaded artifact: a name, a declared type tag and its bytes.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub declared_type: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(name: &str, declared_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: sanitize_artifact_name(name),
            declared_type: declared_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// An artifact that contributed nothing, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestionFailure {
    pub name: String,
    pub reason: String,
}

/// An artifact that contributed records to the batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestedSource {
    pub name: String,
    pub kind: ArtifactKind,
    pub records: usize,
}

/// Outcome of one ingestion batch. The batch holds every successfully
/// normalized record in input order; failures sit alongside it.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub batch: PatientRecordBatch,
    pub failures: Vec<IngestionFailure>,
    pub sources: Vec<IngestedSource>,
}

impl IngestionReport {
    pub fn all_failed(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Dispatches artifacts to format adapters by declared type, normalizes their
/// records and isolates per-artifact failures.
pub struct IngestionCoordinator {
    tabular: TabularAdapter,
    tab_separated: TabularAdapter,
    object: ObjectAdapter,
    text: KeyValueTextAdapter,
    document: DocumentAdapter,
}

impl IngestionCoordinator {
    /// `extractor` is the text-extraction collaborator for document artifacts.
    pub fn new(extractor: Box<dyn DocumentTextExtractor>) -> Self {
        Self {
            tabular: TabularAdapter::new(),
            tab_separated: TabularAdapter::with_delimiter(b'\t'),
            object: ObjectAdapter,
            text: KeyValueTextAdapter,
            document: DocumentAdapter::new(extractor),
        }
    }

    fn adapter_for(&self, declared: &str, kind: ArtifactKind) -> &dyn FormatAdapter {
        match kind {
            ArtifactKind::Tabular if declared.trim().eq_ignore_ascii_case(TAB_SEPARATED_TAG) => {
                &self.tab_separated
            }
            ArtifactKind::Tabular => &self.tabular,
            ArtifactKind::StructuredObject => &self.object,
            ArtifactKind::PlainText => &self.text,
            ArtifactKind::Document => &self.document,
        }
    }

    /// Adapt and normalize a single artifact.
    pub fn ingest_one(
        &self,
        artifact: &Artifact,
    ) -> Result<(ArtifactKind, Vec<PatientRecord>), IngestError> {
        let kind = parse_declared_type(&artifact.declared_type)?;
        check_size(artifact.bytes.len())?;

        let adapter = self.adapter_for(&artifact.declared_type, kind);
        let raw = adapter.adapt(&artifact.name, &artifact.bytes)?;
        let records: Vec<PatientRecord> = raw
            .iter()
            .map(normalize)
            .filter(|record| !record.is_empty())
            .collect();

        if records.is_empty() {
            return Err(FormatError::NoRecords {
                artifact: artifact.name.clone(),
            }
            .into());
        }
        Ok((kind, records))
    }

    /// Ingest a batch. Never fails as a whole: if every artifact fails the
    /// batch is empty and the failures say why.
    pub fn ingest(&self, artifacts: &[Artifact]) -> IngestionReport {
        let mut records = Vec::new();
        let mut failures = Vec::new();
        let mut sources = Vec::new();

        for artifact in artifacts {
            match self.ingest_one(artifact) {
                Ok((kind, mut adapted)) => {
                    tracing::info!(
                        artifact = %artifact.name,
                        kind = kind.as_str(),
                        records = adapted.len(),
                        "Artifact ingested"
                    );
                    sources.push(IngestedSource {
                        name: artifact.name.clone(),
                        kind,
                        records: adapted.len(),
                    });
                    records.append(&mut adapted);
                }
                Err(e) => {
                    tracing::warn!(artifact = %artifact.name, error = %e, "Artifact skipped");
                    failures.push(IngestionFailure {
                        name: artifact.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            artifacts = artifacts.len(),
            records = records.len(),
            failed = failures.len(),
            "Ingestion batch complete"
        );

        IngestionReport {
            batch: PatientRecordBatch::new(records),
            failures,
            sources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CanonicalField, FieldValue};
    use crate::pipeline::extraction::Utf8TextExtractor;

    struct EmptyText;

    impl DocumentTextExtractor for EmptyText {
        fn extract_text(&self, _artifact: &str, _bytes: &[u8]) -> Result<String, FormatError> {
            Ok(String::new())
        }
    }

    fn coordinator() -> IngestionCoordinator {
        IngestionCoordinator::new(Box::new(Utf8TextExtractor))
    }

    #[test]
    fn scenario_a_csv_artifact_normalizes_row() {
        let report = coordinator().ingest(&[Artifact::new(
            "visit.csv",
            "tabular",
            "Age, Sex, CC\n45, Female, Chest pain\n",
        )]);
        assert!(report.failures.is_empty());
        assert_eq!(report.batch.len(), 1);
        let record = &report.batch.records()[0];
        assert_eq!(record.get_canonical(CanonicalField::Age), Some(&FieldValue::from(45)));
        assert_eq!(record.get("gender"), Some(&FieldValue::from("Female")));
        assert_eq!(record.get("chief_complaint"), Some(&FieldValue::from("Chest pain")));
    }

    #[test]
    fn scenario_b_empty_document_is_a_failure_and_batch_is_empty() {
        let report = IngestionCoordinator::new(Box::new(EmptyText))
            .ingest(&[Artifact::new("scan.pdf", "document", b"%PDF-1.7".to_vec())]);
        assert!(report.batch.is_empty());
        assert!(report.all_failed());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].name, "scan.pdf");
        assert!(report.failures[0].reason.contains("No text could be extracted"));
    }

    #[test]
    fn failures_do_not_abort_siblings_and_order_is_kept() {
        let report = coordinator().ingest(&[
            Artifact::new("a.csv", "csv", "age,sex\n30,M\n31,F\n"),
            Artifact::new("broken.json", "json", "{not json"),
            Artifact::new("scan.dcm", "dicom", vec![0u8, 1, 2]),
            Artifact::new("b.json", "structured-object", r#"{"records":[{"age":70}]}"#),
        ]);

        let ages: Vec<String> = report
            .batch
            .iter()
            .map(|r| r.get("age").map(ToString::to_string).unwrap_or_default())
            .collect();
        assert_eq!(ages, vec!["30", "31", "70"]);

        let failed: Vec<&str> = report.failures.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(failed, vec!["broken.json", "scan.dcm"]);
        assert!(report.failures[1].reason.contains("Unsupported declared type"));

        assert_eq!(report.sources.len(), 2);
        assert_eq!(report.sources[0].records, 2);
        assert_eq!(report.sources[1].kind, ArtifactKind::StructuredObject);
    }

    #[test]
    fn artifact_with_only_blank_rows_reports_no_records() {
        let err = coordinator()
            .ingest_one(&Artifact::new("blank.csv", "tabular", "age,sex\n,\nNA, \n"))
            .unwrap_err();
        assert!(matches!(err, IngestError::Format(FormatError::NoRecords { .. })));
    }

    #[test]
    fn blank_text_artifact_reports_no_records() {
        let report = coordinator().ingest(&[Artifact::new("empty.txt", "plain-text", "  \n")]);
        assert!(report.batch.is_empty());
        assert!(report.failures[0].reason.contains("no usable patient records"));
    }

    #[test]
    fn tab_separated_tag_uses_tab_delimiter() {
        let report = coordinator().ingest(&[Artifact::new(
            "export.tsv",
            "tsv",
            "Age\tGender\n52\tMale\n",
        )]);
        assert_eq!(report.batch.len(), 1);
        assert_eq!(report.batch.records()[0].get("gender"), Some(&FieldValue::from("Male")));
    }

    #[test]
    fn document_artifact_goes_through_extractor() {
        let report = coordinator().ingest(&[Artifact::new(
            "referral.txt",
            "document",
            "Chief complaint: syncope\nBP 92/60, pulse 48 bpm",
        )]);
        assert!(report.failures.is_empty(), "{:?}", report.failures);
        let record = &report.batch.records()[0];
        assert_eq!(record.get("chief_complaint"), Some(&FieldValue::from("syncope")));
        assert_eq!(record.get("blood_pressure"), Some(&FieldValue::from("92/60")));
        assert_eq!(record.get("heart_rate"), Some(&FieldValue::from(48)));
    }

    #[test]
    fn names_are_sanitized() {
        let artifact = Artifact::new("../../uploads/labs.csv", "csv", "x\n1\n");
        assert_eq!(artifact.name, "labs.csv");
    }

    #[test]
    fn empty_input_gives_empty_report() {
        let report = coordinator().ingest(&[]);
        assert!(report.batch.is_empty());
        assert!(report.failures.is_empty());
        assert!(report.all_failed());
    }
}
