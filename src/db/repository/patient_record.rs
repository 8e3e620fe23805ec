use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{ArtifactKind, CanonicalField, PatientRecordBatch};

/// Listing row for one stored source file (records themselves are loaded on demand).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecordSummary {
    pub id: Uuid,
    pub patient_name: Option<String>,
    pub record_count: usize,
    pub source_name: String,
    pub source_type: ArtifactKind,
    pub uploaded_at: NaiveDateTime,
}

/// Insert the records of one source file. Returns the new record-set id.
pub fn insert_patient_records(
    conn: &Connection,
    owner_id: &str,
    batch: &PatientRecordBatch,
    source_name: &str,
    source_type: ArtifactKind,
) -> Result<Uuid, DatabaseError> {
    let id = Uuid::new_v4();
    let patient_data = serde_json::to_string(batch)?;
    // First named patient labels the row in listings.
    let patient_name = batch
        .iter()
        .find_map(|r| r.get_canonical(CanonicalField::PatientName))
        .map(|v| v.to_string())
        .filter(|s| !s.trim().is_empty());

    conn.execute(
        "INSERT INTO patient_records (id, owner_id, patient_name, patient_data, record_count,
         source_name, source_type, uploaded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id.to_string(),
            owner_id,
            patient_name,
            patient_data,
            batch.len() as i64,
            source_name,
            source_type.as_str(),
            format_timestamp(&Utc::now().naive_utc()),
        ],
    )?;
    Ok(id)
}

/// Load the normalized records stored under a record-set id.
pub fn get_patient_records(
    conn: &Connection,
    record_id: &Uuid,
) -> Result<PatientRecordBatch, DatabaseError> {
    let data: Option<String> = conn
        .query_row(
            "SELECT patient_data FROM patient_records WHERE id = ?1",
            [record_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    match data {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Err(DatabaseError::NotFound {
            entity_type: "patient_records".into(),
            id: record_id.to_string(),
        }),
    }
}

/// All record sets of an owner, newest first.
pub fn list_patient_records(
    conn: &Connection,
    owner_id: &str,
) -> Result<Vec<StoredRecordSummary>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_name, record_count, source_name, source_type, uploaded_at
         FROM patient_records WHERE owner_id = ?1
         ORDER BY uploaded_at DESC, rowid DESC",
    )?;

    let rows = stmt.query_map([owner_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut summaries = Vec::new();
    for row in rows {
        let (id, patient_name, record_count, source_name, source_type, uploaded_at) = row?;
        summaries.push(StoredRecordSummary {
            id: parse_uuid("patient_records.id", &id)?,
            patient_name,
            record_count: record_count.max(0) as usize,
            source_name,
            source_type: source_type.parse()?,
            uploaded_at: parse_timestamp("patient_records.uploaded_at", &uploaded_at)?,
        });
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::models::{FieldKey, FieldValue, PatientRecord};

    fn batch() -> PatientRecordBatch {
        let mut r = PatientRecord::new();
        r.insert(FieldKey::Canonical(CanonicalField::PatientName), "Ada Lovelace".into());
        r.insert(FieldKey::Canonical(CanonicalField::Age), FieldValue::from(36));
        r.insert(FieldKey::Passthrough("ward".into()), "B2".into());
        PatientRecordBatch::new(vec![r])
    }

    #[test]
    fn insert_and_load_preserves_records() {
        let conn = open_memory_database().unwrap();
        let id = insert_patient_records(&conn, "owner-1", &batch(), "visit.csv", ArtifactKind::Tabular)
            .unwrap();
        let loaded = get_patient_records(&conn, &id).unwrap();
        assert_eq!(loaded, batch());
    }

    #[test]
    fn load_unknown_id_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = get_patient_records(&conn, &Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn listing_is_scoped_to_owner() {
        let conn = open_memory_database().unwrap();
        insert_patient_records(&conn, "owner-1", &batch(), "a.csv", ArtifactKind::Tabular).unwrap();
        insert_patient_records(&conn, "owner-1", &batch(), "b.json", ArtifactKind::StructuredObject)
            .unwrap();
        insert_patient_records(&conn, "owner-2", &batch(), "c.txt", ArtifactKind::PlainText).unwrap();

        let listed = list_patient_records(&conn, "owner-1").unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].source_name, "b.json");
        assert_eq!(listed[0].source_type, ArtifactKind::StructuredObject);
        assert_eq!(listed[0].patient_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(listed[0].record_count, 1);
    }
}
