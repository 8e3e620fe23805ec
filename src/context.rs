use crate::db::{DatabaseError, DiagnosticStore};
use crate::models::AnalysisParameters;

/// Per-request context threaded into `ingest`/`analyze` entry points.
/// Nothing in the pipeline reads process-wide session state.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub owner_id: String,
    /// Explicit parameters for this request; stored preferences otherwise.
    pub parameters: Option<AnalysisParameters>,
}

impl RequestContext {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            parameters: None,
        }
    }

    pub fn with_parameters(mut self, parameters: AnalysisParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Parameters for this request, falling back to the owner's stored
    /// preferences. Always normalized.
    pub fn resolve_parameters(
        &self,
        store: &dyn DiagnosticStore,
    ) -> Result<AnalysisParameters, DatabaseError> {
        let params = match self.parameters {
            Some(p) => p,
            None => store.get_preferences(&self.owner_id)?,
        };
        Ok(params.normalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;

    #[test]
    fn explicit_parameters_win() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ctx = RequestContext::new("dr-lee").with_parameters(AnalysisParameters::new(0.6, 3, false));
        let params = ctx.resolve_parameters(&store).unwrap();
        assert_eq!(params.confidence_threshold, 0.6);
        assert_eq!(params.max_diagnoses, 3);
    }

    #[test]
    fn stored_preferences_are_the_fallback() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .update_preferences("dr-lee", &AnalysisParameters::new(0.5, 4, true))
            .unwrap();
        let params = RequestContext::new("dr-lee").resolve_parameters(&store).unwrap();
        assert_eq!(params.confidence_threshold, 0.5);
        assert_eq!(params.max_diagnoses, 4);

        let fresh = RequestContext::new("someone-else").resolve_parameters(&store).unwrap();
        assert_eq!(fresh, AnalysisParameters::default());
    }
}
