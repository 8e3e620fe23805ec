//! Categorized, bounded rendering of a record batch for the analysis prompt.
//!
//! Every field is routed to one of nine clinical categories by keyword
//! matching on its name. Fields that match nothing are left out of the
//! summary; the records themselves are never touched.

use serde::Serialize;

use super::sanitize::{sanitize_value_counted, MAX_VALUE_CHARS};
use crate::models::PatientRecordBatch;

/// Character budget for the rendered summary.
pub const MAX_SUMMARY_CHARS: usize = 24_000;

/// Narrative text one record may contribute. Clinical-notes fields share
/// this allowance; every other field is capped at `MAX_VALUE_CHARS`.
pub const MAX_NARRATIVE_CHARS: usize = MAX_SUMMARY_CHARS / 2;

/// Keywords shorter than this must equal a whole `_`-separated token of the
/// field name; longer ones match anywhere in it.
const MIN_SUBSTRING_KEYWORD: usize = 4;

/// Shared prefix length that counts as a partial keyword match.
const MIN_PARTIAL_PREFIX: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalCategory {
    Demographics,
    VitalSigns,
    Symptoms,
    History,
    Medications,
    Labs,
    Imaging,
    PhysicalExam,
    Notes,
}

impl ClinicalCategory {
    /// Fixed rendering and matching order.
    pub const ALL: [ClinicalCategory; 9] = [
        Self::Demographics,
        Self::VitalSigns,
        Self::Symptoms,
        Self::History,
        Self::Medications,
        Self::Labs,
        Self::Imaging,
        Self::PhysicalExam,
        Self::Notes,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Demographics => "Demographics",
            Self::VitalSigns => "Vital signs",
            Self::Symptoms => "Symptoms",
            Self::History => "Medical history",
            Self::Medications => "Medications",
            Self::Labs => "Laboratory results",
            Self::Imaging => "Imaging results",
            Self::PhysicalExam => "Physical examination",
            Self::Notes => "Clinical notes",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Demographics => &[
                "age", "gender", "sex", "race", "ethnicity", "birth", "dob", "demographic",
            ],
            Self::VitalSigns => &[
                "vital", "temperature", "temp", "blood_pressure", "bp", "heart_rate", "hr",
                "respiratory_rate", "rr", "oxygen", "o2", "spo2", "pulse", "weight", "height", "bmi",
            ],
            Self::Symptoms => &[
                "symptom", "complaint", "presenting", "pain", "ache", "discomfort",
            ],
            Self::History => &[
                "history", "past_medical", "pmh", "surgical", "allergy", "allergies",
            ],
            Self::Medications => &["medication", "meds", "drug", "prescription", "treatment"],
            Self::Labs => &[
                "lab", "blood", "urine", "glucose", "cholesterol", "hemoglobin", "hematocrit",
                "wbc", "rbc", "platelet",
            ],
            Self::Imaging => &["xray", "x_ray", "ct", "mri", "ultrasound", "imaging", "radiology"],
            Self::PhysicalExam => &[
                "exam", "physical", "auscultation", "palpation", "inspection", "findings",
            ],
            Self::Notes => &["note", "assessment", "plan", "impression", "observation"],
        }
    }

    fn matches(&self, key: &str) -> bool {
        self.keywords().iter().any(|kw| {
            if kw.len() >= MIN_SUBSTRING_KEYWORD {
                key.contains(kw)
            } else {
                key.split('_').any(|t| t == *kw)
            }
        })
    }

    fn partially_matches(&self, key: &str) -> bool {
        key.split('_').filter(|t| t.len() >= MIN_PARTIAL_PREFIX).any(|token| {
            self.keywords()
                .iter()
                .any(|kw| common_prefix(token, kw) >= MIN_PARTIAL_PREFIX)
        })
    }

    /// Category for a field name: first keyword hit in category order, else
    /// the first category sharing a long enough prefix with a name token.
    pub fn classify(field_name: &str) -> Option<Self> {
        let key = field_name.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.matches(&key))
            .or_else(|| Self::ALL.into_iter().find(|c| c.partially_matches(&key)))
    }
}

fn common_prefix(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryEntry {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySection {
    pub category: ClinicalCategory,
    pub entries: Vec<SummaryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSummary {
    /// Position of the record in the batch, from 1.
    pub record: usize,
    pub sections: Vec<CategorySection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorizedSummary {
    pub patient_count: usize,
    pub records: Vec<RecordSummary>,
    /// Fields no category claimed.
    pub uncategorized_fields: usize,
    /// Value lines dropped as prompt-injection attempts.
    pub removed_lines: usize,
}

/// Group every field of every record under its clinical category.
pub fn summarize(batch: &PatientRecordBatch) -> CategorizedSummary {
    let mut uncategorized = 0usize;
    let mut removed_lines = 0usize;
    let mut records = Vec::with_capacity(batch.len());

    for (index, record) in batch.iter().enumerate() {
        let mut buckets: Vec<Vec<SummaryEntry>> = vec![Vec::new(); ClinicalCategory::ALL.len()];
        let mut narrative_left = MAX_NARRATIVE_CHARS;
        for (key, value) in record.iter() {
            if value.is_blank() {
                continue;
            }
            let Some(category) = ClinicalCategory::classify(key.as_str()) else {
                uncategorized += 1;
                continue;
            };
            let cap = match category {
                ClinicalCategory::Notes => narrative_left.max(MAX_VALUE_CHARS),
                _ => MAX_VALUE_CHARS,
            };
            let (clean, removed) = sanitize_value_counted(&value.to_string(), cap);
            removed_lines += removed;
            if category == ClinicalCategory::Notes {
                narrative_left = narrative_left.saturating_sub(clean.chars().count());
            }
            if clean.is_empty() {
                continue;
            }
            let slot = ClinicalCategory::ALL
                .iter()
                .position(|c| *c == category)
                .unwrap_or_default();
            buckets[slot].push(SummaryEntry {
                field: key.as_str().to_string(),
                value: clean,
            });
        }

        let sections = ClinicalCategory::ALL
            .into_iter()
            .zip(buckets)
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(category, entries)| CategorySection { category, entries })
            .collect();
        records.push(RecordSummary {
            record: index + 1,
            sections,
        });
    }

    if removed_lines > 0 {
        tracing::warn!(removed_lines, "Injection patterns removed from record values");
    }
    tracing::debug!(
        records = records.len(),
        uncategorized_fields = uncategorized,
        "Batch summarized"
    );

    CategorizedSummary {
        patient_count: batch.len(),
        records,
        uncategorized_fields: uncategorized,
        removed_lines,
    }
}

impl RecordSummary {
    fn render(&self) -> String {
        let mut out = format!("Record {}\n", self.record);
        for section in &self.sections {
            out.push_str(&format!("  {}:\n", section.category.label()));
            for entry in &section.entries {
                out.push_str(&format!("    - {}: {}\n", entry.field, entry.value));
            }
        }
        out
    }
}

impl CategorizedSummary {
    /// Text rendering within `MAX_SUMMARY_CHARS`. Records that do not fit are
    /// left out whole and counted in a closing line.
    pub fn render(&self) -> String {
        self.render_within(MAX_SUMMARY_CHARS)
    }

    pub fn render_within(&self, budget: usize) -> String {
        let mut out = format!("Patient records: {}\n", self.patient_count);
        let mut omitted = 0usize;
        for record in &self.records {
            let block = record.render();
            if omitted > 0 || out.chars().count() + block.chars().count() + 1 > budget {
                omitted += 1;
                continue;
            }
            out.push('\n');
            out.push_str(&block);
        }
        if omitted > 0 {
            tracing::warn!(omitted, budget, "Summary budget reached, records omitted");
            out.push_str(&format!("\n[{omitted} more records omitted]\n"));
        }
        out
    }
}
