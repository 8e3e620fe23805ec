use crate::models::{AnalysisParameters, Diagnosis, DiagnosticResult};

/// Order by confidence (highest first, ties keep response order), drop
/// entries below `threshold`, keep at most `max`.
pub fn filter_diagnoses(mut diagnoses: Vec<Diagnosis>, threshold: f64, max: usize) -> Vec<Diagnosis> {
    diagnoses.sort_by(|a, b| b.confidence_score.total_cmp(&a.confidence_score));
    diagnoses.retain(|d| d.confidence_score >= threshold);
    diagnoses.truncate(max);
    diagnoses
}

/// Apply the caller's analysis parameters to a repaired result.
pub fn apply_parameters(mut result: DiagnosticResult, params: &AnalysisParameters) -> DiagnosticResult {
    let before = result.diagnoses.len();
    result.diagnoses = filter_diagnoses(
        std::mem::take(&mut result.diagnoses),
        params.confidence_threshold,
        params.max_diagnoses,
    );
    if !params.include_red_flags {
        result.red_flags.clear();
    }
    tracing::info!(
        kept = result.diagnoses.len(),
        removed = before - result.diagnoses.len(),
        threshold = params.confidence_threshold,
        max = params.max_diagnoses,
        red_flags = result.red_flags.len(),
        "Diagnoses filtered"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RedFlag, Urgency};

    fn diagnoses(scores: &[(&str, f64)]) -> Vec<Diagnosis> {
        scores.iter().map(|(c, s)| Diagnosis::new(*c, *s)).collect()
    }

    fn conditions(list: &[Diagnosis]) -> Vec<&str> {
        list.iter().map(|d| d.condition.as_str()).collect()
    }

    #[test]
    fn threshold_then_sorted_truncation() {
        let out = filter_diagnoses(diagnoses(&[("a", 0.9), ("b", 0.2), ("c", 0.6)]), 0.3, 2);
        assert_eq!(conditions(&out), vec!["a", "c"]);
    }

    #[test]
    fn sorting_happens_before_truncation() {
        let out = filter_diagnoses(diagnoses(&[("low", 0.4), ("mid", 0.6), ("top", 0.95)]), 0.0, 2);
        assert_eq!(conditions(&out), vec!["top", "mid"]);
    }

    #[test]
    fn ties_keep_response_order() {
        let out = filter_diagnoses(
            diagnoses(&[("first", 0.5), ("higher", 0.7), ("second", 0.5), ("third", 0.5)]),
            0.0,
            3,
        );
        assert_eq!(conditions(&out), vec!["higher", "first", "second"]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let out = filter_diagnoses(diagnoses(&[("edge", 0.3)]), 0.3, 5);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn filtering_is_idempotent() {
        let input = diagnoses(&[("a", 0.31), ("b", 0.9), ("c", 0.29), ("d", 0.9), ("e", 0.5)]);
        let once = filter_diagnoses(input, 0.3, 3);
        let twice = filter_diagnoses(once.clone(), 0.3, 3);
        assert_eq!(once, twice);
        assert_eq!(conditions(&once), vec!["b", "d", "e"]);
    }

    #[test]
    fn disabled_red_flags_are_cleared() {
        let mut result = DiagnosticResult::degraded("x");
        result.red_flags = vec![
            RedFlag {
                condition: "Stroke".into(),
                reasoning: "focal deficit".into(),
                action: "CT now".into(),
                urgency: Urgency::High,
            };
            2
        ];
        let params = AnalysisParameters::new(0.3, 8, false);
        assert!(apply_parameters(result.clone(), &params).red_flags.is_empty());

        let params = AnalysisParameters::new(0.3, 8, true);
        assert_eq!(apply_parameters(result, &params).red_flags.len(), 2);
    }
}
