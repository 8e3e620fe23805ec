use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.3;
pub const DEFAULT_MAX_DIAGNOSES: usize = 8;

/// Per-request analysis knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParameters {
    pub confidence_threshold: f64,
    pub max_diagnoses: usize,
    pub include_red_flags: bool,
}

impl Default for AnalysisParameters {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_diagnoses: DEFAULT_MAX_DIAGNOSES,
            include_red_flags: true,
        }
    }
}

impl AnalysisParameters {
    /// Build parameters, pulling out-of-range values back into bounds.
    pub fn new(confidence_threshold: f64, max_diagnoses: usize, include_red_flags: bool) -> Self {
        Self {
            confidence_threshold,
            max_diagnoses,
            include_red_flags,
        }
        .normalized()
    }

    /// Threshold clamped to [0,1] (NaN becomes the default), max at least 1.
    pub fn normalized(self) -> Self {
        let confidence_threshold = if self.confidence_threshold.is_nan() {
            DEFAULT_CONFIDENCE_THRESHOLD
        } else {
            self.confidence_threshold.clamp(0.0, 1.0)
        };
        Self {
            confidence_threshold,
            max_diagnoses: self.max_diagnoses.max(1),
            include_red_flags: self.include_red_flags,
        }
    }
}
