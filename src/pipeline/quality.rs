//! Data quality assessment over a normalized record batch.
//!
//! Advisory only: nothing here blocks an analysis.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::models::{CanonicalField, FieldValue, PatientRecord, PatientRecordBatch};

/// Recommendation triggers.
pub mod thresholds {
    /// Below this completeness (%), suggest collecting more data.
    pub const LOW_COMPLETENESS: f64 = 70.0;

    /// Below this consistency (%), suggest standardizing formats.
    pub const LOW_CONSISTENCY: f64 = 60.0;

    /// Below this share of critical fields, warn about diagnostic accuracy.
    pub const MIN_CRITICAL_SHARE: f64 = 0.5;

    /// Above this score the data is called excellent.
    pub const EXCELLENT_SCORE: f64 = 80.0;
}

const WEIGHT_COMPLETENESS: f64 = 0.4;
const WEIGHT_CONSISTENCY: f64 = 0.3;
const WEIGHT_CRITICAL: f64 = 0.3;

/// Fields that matter most for a diagnosis, matched as substrings of field
/// names. `vital_signs` is also satisfied by any canonical vital sign.
pub const CRITICAL_FIELDS: &[&str] = &[
    "age",
    "gender",
    "symptoms",
    "chief_complaint",
    "medical_history",
    "vital_signs",
    "clinical_notes",
];

const VITAL_SIGNS: &str = "vital_signs";

pub const NO_DATA: &str = "No data available for analysis";
const MORE_DATA: &str = "Consider collecting additional patient information";
const MISSING_KEY_FIELDS: &str = "Key medical fields are missing - this may affect diagnostic accuracy";
const INCONSISTENT: &str = "Data format inconsistencies detected - standardization recommended";
const EXCELLENT: &str = "Data quality is excellent for AI analysis";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub completeness: f64,
    pub consistency: f64,
    pub critical_fields_present: usize,
    pub total_critical_fields: usize,
    pub quality_score: f64,
    pub recommendations: Vec<String>,
    pub total_records: usize,
    pub unique_fields: usize,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Non-blank values over all field slots, as a percentage. 0 for no slots.
pub fn completeness(batch: &PatientRecordBatch) -> f64 {
    let (filled, total) = batch.iter().fold((0usize, 0usize), |(filled, total), record| {
        let non_blank = record.iter().filter(|(_, v)| !v.is_blank()).count();
        (filled + non_blank, total + record.len())
    });
    if total == 0 {
        return 0.0;
    }
    filled as f64 / total as f64 * 100.0
}

/// Fields shared by every record over all fields seen, as a percentage.
/// 100 for batches of zero or one record.
pub fn consistency(batch: &PatientRecordBatch) -> f64 {
    if batch.len() <= 1 {
        return 100.0;
    }
    let sets: Vec<HashSet<&str>> = batch.iter().map(|r| r.field_names().collect()).collect();
    let union: HashSet<&str> = sets.iter().flatten().copied().collect();
    if union.is_empty() {
        return 100.0;
    }
    let common = union
        .iter()
        .filter(|name| sets.iter().all(|s| s.contains(*name)))
        .count();
    common as f64 / union.len() as f64 * 100.0
}

fn has_critical(record: &PatientRecord, critical: &str) -> bool {
    record.iter().any(|(key, _)| {
        key.as_str().contains(critical)
            || (critical == VITAL_SIGNS && key.canonical().is_some_and(|f| f.is_vital_sign()))
    })
}

/// Critical fields present in at least one record.
pub fn critical_fields_present(batch: &PatientRecordBatch) -> usize {
    CRITICAL_FIELDS
        .iter()
        .filter(|critical| batch.iter().any(|r| has_critical(r, critical)))
        .count()
}

/// Assess a batch. Metrics are rounded to one decimal.
pub fn assess(batch: &PatientRecordBatch) -> QualityReport {
    let total_critical = CRITICAL_FIELDS.len();
    if batch.is_empty() {
        return QualityReport {
            completeness: 0.0,
            consistency: 100.0,
            critical_fields_present: 0,
            total_critical_fields: total_critical,
            quality_score: 0.0,
            recommendations: vec![NO_DATA.to_string()],
            total_records: 0,
            unique_fields: 0,
        };
    }

    let completeness = completeness(batch);
    let consistency = consistency(batch);
    let critical = critical_fields_present(batch);
    let critical_pct = critical as f64 / total_critical as f64 * 100.0;
    let score = WEIGHT_COMPLETENESS * completeness
        + WEIGHT_CONSISTENCY * consistency
        + WEIGHT_CRITICAL * critical_pct;

    let mut recommendations = Vec::new();
    if completeness < thresholds::LOW_COMPLETENESS {
        recommendations.push(MORE_DATA.to_string());
    }
    if (critical as f64) < total_critical as f64 * thresholds::MIN_CRITICAL_SHARE {
        recommendations.push(MISSING_KEY_FIELDS.to_string());
    }
    if consistency < thresholds::LOW_CONSISTENCY {
        recommendations.push(INCONSISTENT.to_string());
    }
    if score > thresholds::EXCELLENT_SCORE {
        recommendations.push(EXCELLENT.to_string());
    }

    let unique_fields = batch
        .iter()
        .flat_map(|r| r.field_names())
        .collect::<HashSet<_>>()
        .len();

    tracing::debug!(
        records = batch.len(),
        completeness,
        consistency,
        critical,
        score,
        "Batch quality assessed"
    );

    QualityReport {
        completeness: round1(completeness),
        consistency: round1(consistency),
        critical_fields_present: critical,
        total_critical_fields: total_critical,
        quality_score: round1(score),
        recommendations,
        total_records: batch.len(),
        unique_fields,
    }
}

// ── Per-record validation ──────────────────────────────────────────

const ESSENTIAL_FIELDS: &[&str] = &["age", "gender", "chief_complaint", "symptoms"];
const IMPORTANT_FIELDS: &[&str] = &["patient_name", "medical_history", "medications", VITAL_SIGNS];
const ESSENTIAL_WEIGHT: usize = 2;
const IMPORTANT_WEIGHT: usize = 1;
const MAX_PLAUSIBLE_AGE: f64 = 150.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordIssues {
    pub record_index: usize,
    pub issues: Vec<String>,
    pub completeness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub total_records: usize,
    pub valid_records: usize,
    pub completeness_score: f64,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub issues: Vec<RecordIssues>,
}

fn has_value(record: &PatientRecord, field: &str) -> bool {
    if field == VITAL_SIGNS {
        return record.iter().any(|(key, value)| {
            !value.is_blank()
                && (key.as_str() == VITAL_SIGNS
                    || key.canonical().is_some_and(|f| f.is_vital_sign()))
        });
    }
    record.get(field).is_some_and(|v| !v.is_blank())
}

fn age_issue(value: &FieldValue) -> Option<&'static str> {
    match value.as_scalar().and_then(|s| s.as_f64()) {
        Some(age) if (0.0..=MAX_PLAUSIBLE_AGE).contains(&age) => None,
        Some(_) => Some("Age value seems unrealistic"),
        None => Some("Age is not a valid number"),
    }
}

/// Check each record for essential and important fields and a plausible age.
/// A record is valid when every essential field carries a value.
pub fn validate_records(batch: &PatientRecordBatch) -> ValidationReport {
    let mut report = ValidationReport {
        total_records: batch.len(),
        valid_records: 0,
        completeness_score: 0.0,
        warnings: Vec::new(),
        errors: Vec::new(),
        issues: Vec::new(),
    };
    if batch.is_empty() {
        report.errors.push("No patient records found".to_string());
        return report;
    }

    let max_score =
        ESSENTIAL_FIELDS.len() * ESSENTIAL_WEIGHT + IMPORTANT_FIELDS.len() * IMPORTANT_WEIGHT;
    let mut total_completeness = 0.0;

    for (index, record) in batch.iter().enumerate() {
        let missing_essential: Vec<&str> = ESSENTIAL_FIELDS
            .iter()
            .copied()
            .filter(|f| !has_value(record, f))
            .collect();
        let missing_important: Vec<&str> = IMPORTANT_FIELDS
            .iter()
            .copied()
            .filter(|f| !has_value(record, f))
            .collect();

        let score = (ESSENTIAL_FIELDS.len() - missing_essential.len()) * ESSENTIAL_WEIGHT
            + (IMPORTANT_FIELDS.len() - missing_important.len()) * IMPORTANT_WEIGHT;
        let record_completeness = score as f64 / max_score as f64 * 100.0;
        total_completeness += record_completeness;

        let mut issues = Vec::new();
        if missing_essential.is_empty() {
            report.valid_records += 1;
        } else {
            issues.push(format!(
                "Missing essential fields: {}",
                missing_essential.join(", ")
            ));
        }
        if !missing_important.is_empty() {
            issues.push(format!(
                "Missing important fields: {}",
                missing_important.join(", ")
            ));
        }
        if let Some(issue) = record.get_canonical(CanonicalField::Age).and_then(age_issue) {
            issues.push(issue.to_string());
        }

        if !issues.is_empty() {
            report.issues.push(RecordIssues {
                record_index: index,
                issues,
                completeness: round1(record_completeness),
            });
        }
    }

    report.completeness_score = round1(total_completeness / batch.len() as f64);

    let invalid = batch.len() - report.valid_records;
    if invalid > 0 {
        report
            .warnings
            .push(format!("{invalid} records have missing essential fields"));
    }
    if report.completeness_score < thresholds::LOW_COMPLETENESS {
        report.warnings.push(
            "Data completeness is below 70% - consider adding more patient information"
                .to_string(),
        );
    }
    report
}

// ── Batch statistics ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeRange {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchStatistics {
    pub total_records: usize,
    pub fields_present: Vec<String>,
    pub age_range: Option<AgeRange>,
    pub gender_distribution: BTreeMap<String, usize>,
}

/// Field inventory plus age range and gender distribution.
pub fn summarize_batch(batch: &PatientRecordBatch) -> BatchStatistics {
    let fields_present: BTreeSet<String> = batch
        .iter()
        .flat_map(|r| r.field_names())
        .map(str::to_string)
        .collect();

    let ages: Vec<f64> = batch
        .iter()
        .filter_map(|r| r.get_canonical(CanonicalField::Age))
        .filter_map(|v| v.as_scalar().and_then(|s| s.as_f64()))
        .collect();
    let age_range = (!ages.is_empty()).then(|| AgeRange {
        min: ages.iter().copied().fold(f64::INFINITY, f64::min),
        max: ages.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean: ages.iter().sum::<f64>() / ages.len() as f64,
    });

    let mut gender_distribution = BTreeMap::new();
    for value in batch.iter().filter_map(|r| r.get_canonical(CanonicalField::Gender)) {
        if value.is_blank() {
            continue;
        }
        *gender_distribution
            .entry(value.to_string().trim().to_lowercase())
            .or_insert(0) += 1;
    }

    BatchStatistics {
        total_records: batch.len(),
        fields_present: fields_present.into_iter().collect(),
        age_range,
        gender_distribution,
    }
}
