use std::path::Path;

use rusqlite::Connection;
use uuid::Uuid;

use super::repository::{
    get_analysis_preferences, get_diagnostic_history, get_patient_records,
    insert_diagnostic_result, insert_patient_records, list_patient_records,
    set_analysis_preferences, StoredDiagnostic, StoredRecordSummary,
};
use super::{open_database, open_memory_database, DatabaseError};
use crate::models::{AnalysisParameters, ArtifactKind, DiagnosticResult, PatientRecordBatch};

/// Records from one source file, stored as one record set.
#[derive(Debug, Clone)]
pub struct RecordSet<'a> {
    pub source_name: &'a str,
    pub source_type: ArtifactKind,
    pub records: PatientRecordBatch,
}

/// Ids written by [`DiagnosticStore::save_analysis`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedAnalysis {
    pub record_ids: Vec<Uuid>,
    pub result_id: Uuid,
}

/// Persistence consumed by the analysis pipeline. The pipeline never opens
/// storage itself; callers hand it an implementation.
pub trait DiagnosticStore {
    fn save_records(
        &self,
        owner_id: &str,
        batch: &PatientRecordBatch,
        source_name: &str,
        source_type: ArtifactKind,
    ) -> Result<Uuid, DatabaseError>;

    fn save_diagnostic_result(
        &self,
        owner_id: &str,
        record_id: &Uuid,
        result: &DiagnosticResult,
        threshold_used: f64,
        max_used: usize,
    ) -> Result<Uuid, DatabaseError>;

    /// Store every record set plus the result, linked to the first set, as
    /// one unit. On error nothing from this call is left behind.
    fn save_analysis(
        &self,
        owner_id: &str,
        record_sets: &[RecordSet<'_>],
        result: &DiagnosticResult,
        threshold_used: f64,
        max_used: usize,
    ) -> Result<SavedAnalysis, DatabaseError>;

    fn get_preferences(&self, owner_id: &str) -> Result<AnalysisParameters, DatabaseError>;

    fn update_preferences(
        &self,
        owner_id: &str,
        prefs: &AnalysisParameters,
    ) -> Result<(), DatabaseError>;
}

/// SQLite-backed store owning one connection.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: open_database(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: open_memory_database()?,
        })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn load_records(&self, record_id: &Uuid) -> Result<PatientRecordBatch, DatabaseError> {
        get_patient_records(&self.conn, record_id)
    }

    pub fn list_patient_records(
        &self,
        owner_id: &str,
    ) -> Result<Vec<StoredRecordSummary>, DatabaseError> {
        list_patient_records(&self.conn, owner_id)
    }

    pub fn diagnostic_history(&self, owner_id: &str) -> Result<Vec<StoredDiagnostic>, DatabaseError> {
        get_diagnostic_history(&self.conn, owner_id)
    }
}

impl DiagnosticStore for SqliteStore {
    fn save_records(
        &self,
        owner_id: &str,
        batch: &PatientRecordBatch,
        source_name: &str,
        source_type: ArtifactKind,
    ) -> Result<Uuid, DatabaseError> {
        insert_patient_records(&self.conn, owner_id, batch, source_name, source_type)
    }

    fn save_diagnostic_result(
        &self,
        owner_id: &str,
        record_id: &Uuid,
        result: &DiagnosticResult,
        threshold_used: f64,
        max_used: usize,
    ) -> Result<Uuid, DatabaseError> {
        insert_diagnostic_result(&self.conn, owner_id, record_id, result, threshold_used, max_used)
    }

    fn save_analysis(
        &self,
        owner_id: &str,
        record_sets: &[RecordSet<'_>],
        result: &DiagnosticResult,
        threshold_used: f64,
        max_used: usize,
    ) -> Result<SavedAnalysis, DatabaseError> {
        if record_sets.is_empty() {
            return Err(DatabaseError::NoRecordSets);
        }

        let tx = self.conn.unchecked_transaction()?;
        let record_ids = record_sets
            .iter()
            .map(|set| {
                insert_patient_records(&tx, owner_id, &set.records, set.source_name, set.source_type)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let result_id = insert_diagnostic_result(
            &tx,
            owner_id,
            &record_ids[0],
            result,
            threshold_used,
            max_used,
        )?;
        tx.commit()?;

        Ok(SavedAnalysis {
            record_ids,
            result_id,
        })
    }

    fn get_preferences(&self, owner_id: &str) -> Result<AnalysisParameters, DatabaseError> {
        get_analysis_preferences(&self.conn, owner_id)
    }

    fn update_preferences(
        &self,
        owner_id: &str,
        prefs: &AnalysisParameters,
    ) -> Result<(), DatabaseError> {
        set_analysis_preferences(&self.conn, owner_id, prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldKey, PatientRecord};

    #[test]
    fn store_round_trip_through_trait() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut r = PatientRecord::new();
        r.insert(FieldKey::from_name("symptoms"), "headache".into());
        let batch = PatientRecordBatch::new(vec![r]);

        let record_id = store
            .save_records("owner-1", &batch, "intake.txt", ArtifactKind::PlainText)
            .unwrap();
        let prefs = store.get_preferences("owner-1").unwrap();
        store
            .save_diagnostic_result(
                "owner-1",
                &record_id,
                &DiagnosticResult::degraded("offline"),
                prefs.confidence_threshold,
                prefs.max_diagnoses,
            )
            .unwrap();

        assert_eq!(store.load_records(&record_id).unwrap(), batch);
        assert_eq!(store.list_patient_records("owner-1").unwrap().len(), 1);
        assert_eq!(store.diagnostic_history("owner-1").unwrap().len(), 1);
    }

    fn record_set<'a>(source_name: &'a str, symptom: &str) -> RecordSet<'a> {
        let mut r = PatientRecord::new();
        r.insert(FieldKey::from_name("symptoms"), symptom.into());
        RecordSet {
            source_name,
            source_type: ArtifactKind::PlainText,
            records: PatientRecordBatch::new(vec![r]),
        }
    }

    #[test]
    fn save_analysis_links_result_to_first_set() {
        let store = SqliteStore::open_in_memory().unwrap();
        let sets = [record_set("a.txt", "cough"), record_set("b.txt", "fever")];

        let saved = store
            .save_analysis("owner-1", &sets, &DiagnosticResult::degraded("offline"), 0.3, 5)
            .unwrap();

        assert_eq!(saved.record_ids.len(), 2);
        assert_eq!(store.load_records(&saved.record_ids[1]).unwrap(), sets[1].records);
        let history = store.diagnostic_history("owner-1").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, saved.result_id);
        assert_eq!(history[0].patient_record_id, saved.record_ids[0]);
        assert_eq!(history[0].source_name, "a.txt");
    }

    #[test]
    fn failed_result_write_rolls_back_record_sets() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.conn().execute_batch("DROP TABLE diagnostic_results").unwrap();
        let sets = [record_set("a.txt", "cough"), record_set("b.txt", "fever")];

        let err = store
            .save_analysis("owner-1", &sets, &DiagnosticResult::degraded("offline"), 0.3, 5)
            .unwrap_err();

        assert!(matches!(err, DatabaseError::Sqlite(_)));
        assert!(store.list_patient_records("owner-1").unwrap().is_empty());
    }

    #[test]
    fn save_analysis_without_record_sets_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .save_analysis("owner-1", &[], &DiagnosticResult::degraded("offline"), 0.3, 5)
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NoRecordSets));
    }

    #[test]
    fn on_disk_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .update_preferences("owner-1", &AnalysisParameters::new(0.7, 4, false))
                .unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let prefs = store.get_preferences("owner-1").unwrap();
        assert_eq!(prefs.max_diagnoses, 4);
        assert!(!prefs.include_red_flags);
    }
}
