use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{EvidenceStrength, RiskLevel, Urgency};

pub const DEFAULT_SPECIALTY: &str = "General Medicine";
pub const DEFAULT_REASONING: &str = "Analysis pending";
pub const DEFAULT_NEXT_STEPS: &str = "Consult healthcare provider";

const EXPORT_ANALYSIS_TYPE: &str = "AI Medical Diagnostic Analysis";
const EXPORT_VERSION: &str = "1.0";
const EXPORT_DISCLAIMER: &str =
    "This analysis is for educational and clinical decision support purposes only";

/// One ranked differential diagnosis after repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub condition: String,
    pub confidence_score: f64,
    pub risk_level: RiskLevel,
    pub specialty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icd_10_code: Option<String>,
    pub clinical_reasoning: String,
    pub supporting_evidence: Vec<String>,
    pub next_steps: String,
}

impl Diagnosis {
    /// A diagnosis carrying every default except its condition and confidence.
    pub fn new(condition: impl Into<String>, confidence_score: f64) -> Self {
        Self {
            condition: condition.into(),
            confidence_score: confidence_score.clamp(0.0, 1.0),
            risk_level: RiskLevel::default(),
            specialty: DEFAULT_SPECIALTY.to_string(),
            icd_10_code: None,
            clinical_reasoning: DEFAULT_REASONING.to_string(),
            supporting_evidence: Vec::new(),
            next_steps: DEFAULT_NEXT_STEPS.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedFlag {
    pub condition: String,
    pub reasoning: String,
    pub action: String,
    pub urgency: Urgency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub overall_confidence: f64,
    pub evidence_strength: EvidenceStrength,
    pub recommendation_level: String,
    pub limitations: String,
}

impl ValidationSummary {
    pub fn insufficient(limitations: impl Into<String>) -> Self {
        Self {
            overall_confidence: 0.0,
            evidence_strength: EvidenceStrength::Insufficient,
            recommendation_level: "N/A".to_string(),
            limitations: limitations.into(),
        }
    }
}

/// The single output document of an analysis. Frozen once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    pub diagnoses: Vec<Diagnosis>,
    pub red_flags: Vec<RedFlag>,
    pub validation: ValidationSummary,
    pub reasoning: String,
}

impl DiagnosticResult {
    /// Standardized result for a model response that could not be used.
    pub fn degraded(reason: &str) -> Self {
        Self {
            diagnoses: Vec::new(),
            red_flags: Vec::new(),
            validation: ValidationSummary::insufficient(format!("Analysis failed: {reason}")),
            reasoning: format!(
                "Unable to complete diagnostic analysis due to: {reason}. \
                 Please consult with a healthcare professional for proper medical evaluation."
            ),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.diagnoses.is_empty()
            && self.red_flags.is_empty()
            && self.validation.evidence_strength == EvidenceStrength::Insufficient
            && self.validation.limitations.starts_with("Analysis failed:")
    }

    pub fn top_diagnosis(&self) -> Option<&Diagnosis> {
        self.diagnoses.first()
    }

    /// Wrap the result for JSON export.
    pub fn to_export(&self) -> ExportEnvelope<'_> {
        self.to_export_at(Utc::now())
    }

    pub fn to_export_at(&self, timestamp: DateTime<Utc>) -> ExportEnvelope<'_> {
        ExportEnvelope {
            timestamp,
            analysis_type: EXPORT_ANALYSIS_TYPE,
            version: EXPORT_VERSION,
            disclaimer: EXPORT_DISCLAIMER,
            diagnostic_results: self,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExportEnvelope<'a> {
    pub timestamp: DateTime<Utc>,
    pub analysis_type: &'static str,
    pub version: &'static str,
    pub disclaimer: &'static str,
    pub diagnostic_results: &'a DiagnosticResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_result_shape() {
        let result = DiagnosticResult::degraded("bad json");
        assert!(result.diagnoses.is_empty());
        assert!(result.red_flags.is_empty());
        assert_eq!(result.validation.evidence_strength, EvidenceStrength::Insufficient);
        assert_eq!(result.validation.recommendation_level, "N/A");
        assert_eq!(result.validation.limitations, "Analysis failed: bad json");
        assert!(result.reasoning.starts_with("Unable to complete diagnostic analysis due to: bad json."));
        assert!(result.reasoning.contains("healthcare professional"));
        assert!(result.is_degraded());
    }

    #[test]
    fn new_diagnosis_clamps_and_defaults() {
        let d = Diagnosis::new("Migraine", 1.7);
        assert_eq!(d.confidence_score, 1.0);
        assert_eq!(d.risk_level, RiskLevel::Medium);
        assert_eq!(d.specialty, "General Medicine");
        assert_eq!(d.next_steps, "Consult healthcare provider");
    }

    #[test]
    fn icd_code_omitted_when_absent() {
        let json = serde_json::to_value(Diagnosis::new("Migraine", 0.5)).unwrap();
        assert!(json.get("icd_10_code").is_none());
        assert_eq!(json["risk_level"], "Medium");
    }

    #[test]
    fn export_envelope_fields() {
        let result = DiagnosticResult::degraded("x");
        let ts = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let json = serde_json::to_value(result.to_export_at(ts)).unwrap();
        assert_eq!(json["analysis_type"], "AI Medical Diagnostic Analysis");
        assert_eq!(json["version"], "1.0");
        assert!(json["disclaimer"].as_str().unwrap().contains("decision support"));
        assert_eq!(json["diagnostic_results"]["validation"]["evidence_strength"], "Insufficient");
        assert!(json["timestamp"].as_str().unwrap().starts_with("2024-01-02T03:04:05"));
    }

    #[test]
    fn result_round_trips_through_storage_json() {
        let mut d = Diagnosis::new("Pneumonia", 0.8);
        d.icd_10_code = Some("J18.9".into());
        let result = DiagnosticResult {
            diagnoses: vec![d],
            red_flags: vec![RedFlag {
                condition: "Sepsis".into(),
                reasoning: "Fever and tachycardia".into(),
                action: "Escalate".into(),
                urgency: Urgency::High,
            }],
            validation: ValidationSummary {
                overall_confidence: 0.7,
                evidence_strength: EvidenceStrength::Moderate,
                recommendation_level: "B".into(),
                limitations: "Single visit".into(),
            },
            reasoning: "Respiratory picture".into(),
        };
        let text = serde_json::to_string(&result).unwrap();
        let back: DiagnosticResult = serde_json::from_str(&text).unwrap();
        assert_eq!(back, result);
        assert!(!back.is_degraded());
    }
}
