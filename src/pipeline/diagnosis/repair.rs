//! Repair of parsed model output into a well-formed `DiagnosticResult`.
//!
//! Every missing or malformed diagnosis field receives a default instead of
//! failing the analysis. Entries with no condition name carry no usable
//! content and are dropped.

use serde_json::{Map, Value};

use super::parser::ParsedResponse;
use crate::models::{
    Diagnosis, DiagnosticResult, EvidenceStrength, RedFlag, RiskLevel, Urgency, ValidationSummary,
    DEFAULT_NEXT_STEPS, DEFAULT_REASONING, DEFAULT_SPECIALTY,
};

pub const RED_FLAG_REASONING_MISSING: &str = "Not provided";
pub const VALIDATION_MISSING: &str = "Validation not provided by the model";
const LIMITATIONS_MISSING: &str = "No limitations reported";
const RECOMMENDATION_LEVELS: [&str; 4] = ["A", "B", "C", "D"];

/// Counters describing how much repair a response needed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RepairStats {
    pub dropped_diagnoses: usize,
    pub dropped_red_flags: usize,
    pub defaulted_fields: usize,
    pub coerced_risk_levels: usize,
}

/// Non-blank text content of a JSON scalar.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Confidence from a number or a numeric string ("0.8", "85%"), clamped to [0,1].
pub fn parse_confidence(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            match s.strip_suffix('%') {
                Some(pct) => pct.trim().parse::<f64>().ok()? / 100.0,
                None => s.parse::<f64>().ok()?,
            }
        }
        _ => return None,
    };
    Some(clamp_unit(raw))
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn evidence(value: Option<&Value>) -> Option<Vec<String>> {
    match value? {
        Value::Array(items) => Some(items.iter().filter_map(|v| text(Some(v))).collect()),
        single => text(Some(single)).map(|s| vec![s]),
    }
}

fn repair_diagnosis(obj: &Map<String, Value>, stats: &mut RepairStats) -> Option<Diagnosis> {
    let condition = text(obj.get("condition"))?;

    let mut defaulted = 0usize;
    let mut or_default = |value: Option<String>, default: &str| {
        value.unwrap_or_else(|| {
            defaulted += 1;
            default.to_string()
        })
    };

    let specialty = or_default(text(obj.get("specialty")), DEFAULT_SPECIALTY);
    let clinical_reasoning = or_default(text(obj.get("clinical_reasoning")), DEFAULT_REASONING);
    let next_steps = or_default(text(obj.get("next_steps")), DEFAULT_NEXT_STEPS);

    let confidence_score = match obj.get("confidence_score").and_then(parse_confidence) {
        Some(c) => c,
        None => {
            defaulted += 1;
            0.0
        }
    };

    let risk_level = match text(obj.get("risk_level")) {
        Some(raw) => RiskLevel::parse_lenient(&raw).unwrap_or_else(|| {
            stats.coerced_risk_levels += 1;
            RiskLevel::Medium
        }),
        None => {
            defaulted += 1;
            RiskLevel::Medium
        }
    };

    let supporting_evidence = evidence(obj.get("supporting_evidence")).unwrap_or_else(|| {
        defaulted += 1;
        Vec::new()
    });

    stats.defaulted_fields += defaulted;
    Some(Diagnosis {
        condition,
        confidence_score,
        risk_level,
        specialty,
        icd_10_code: text(obj.get("icd_10_code")),
        clinical_reasoning,
        supporting_evidence,
        next_steps,
    })
}

fn repair_red_flag(obj: &Map<String, Value>) -> Option<RedFlag> {
    let condition = text(obj.get("condition"))?;
    Some(RedFlag {
        condition,
        reasoning: text(obj.get("reasoning"))
            .unwrap_or_else(|| RED_FLAG_REASONING_MISSING.to_string()),
        action: text(obj.get("action")).unwrap_or_else(|| DEFAULT_NEXT_STEPS.to_string()),
        // An unreadable urgency on a red flag is treated as the higher one.
        urgency: text(obj.get("urgency"))
            .and_then(|u| Urgency::parse_lenient(&u))
            .unwrap_or(Urgency::High),
    })
}

fn repair_validation(value: Option<&Value>) -> ValidationSummary {
    let Some(Value::Object(obj)) = value else {
        return ValidationSummary::insufficient(VALIDATION_MISSING);
    };
    let recommendation_level = text(obj.get("recommendation_level"))
        .map(|l| l.to_uppercase())
        .filter(|l| RECOMMENDATION_LEVELS.contains(&l.as_str()))
        .unwrap_or_else(|| "N/A".to_string());

    ValidationSummary {
        overall_confidence: obj
            .get("overall_confidence")
            .and_then(parse_confidence)
            .unwrap_or(0.0),
        evidence_strength: text(obj.get("evidence_strength"))
            .and_then(|s| EvidenceStrength::parse_lenient(&s))
            .unwrap_or(EvidenceStrength::Insufficient),
        recommendation_level,
        limitations: text(obj.get("limitations"))
            .unwrap_or_else(|| LIMITATIONS_MISSING.to_string()),
    }
}

/// Build a result from parsed parts, defaulting everything that is missing.
pub fn repair(parsed: &ParsedResponse) -> (DiagnosticResult, RepairStats) {
    let mut stats = RepairStats::default();

    let mut diagnoses = Vec::with_capacity(parsed.diagnoses.len());
    for item in &parsed.diagnoses {
        match item.as_object().and_then(|obj| repair_diagnosis(obj, &mut stats)) {
            Some(d) => diagnoses.push(d),
            None => stats.dropped_diagnoses += 1,
        }
    }

    let mut red_flags = Vec::with_capacity(parsed.red_flags.len());
    for item in &parsed.red_flags {
        match item.as_object().and_then(repair_red_flag) {
            Some(f) => red_flags.push(f),
            None => stats.dropped_red_flags += 1,
        }
    }

    let mut result = DiagnosticResult {
        diagnoses,
        red_flags,
        validation: repair_validation(parsed.validation.as_ref()),
        reasoning: text(parsed.reasoning.as_ref())
            .unwrap_or_else(|| DEFAULT_REASONING.to_string()),
    };
    enforce_invariants(&mut result);

    tracing::info!(
        diagnoses = result.diagnoses.len(),
        red_flags = result.red_flags.len(),
        dropped_diagnoses = stats.dropped_diagnoses,
        dropped_red_flags = stats.dropped_red_flags,
        defaulted_fields = stats.defaulted_fields,
        coerced_risk_levels = stats.coerced_risk_levels,
        "Model response repaired"
    );
    (result, stats)
}

/// Numeric invariants every returned result holds, degraded or not.
pub fn enforce_invariants(result: &mut DiagnosticResult) {
    for d in &mut result.diagnoses {
        d.confidence_score = clamp_unit(d.confidence_score);
    }
    result.validation.overall_confidence = clamp_unit(result.validation.overall_confidence);
}
