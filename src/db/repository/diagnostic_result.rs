use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::DiagnosticResult;

/// A persisted analysis together with the parameters it ran under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredDiagnostic {
    pub id: Uuid,
    pub patient_record_id: Uuid,
    pub source_name: String,
    pub result: DiagnosticResult,
    pub confidence_threshold: f64,
    pub max_diagnoses: usize,
    pub created_at: NaiveDateTime,
}

/// Write a fully constructed result in a single statement.
pub fn insert_diagnostic_result(
    conn: &Connection,
    owner_id: &str,
    record_id: &Uuid,
    result: &DiagnosticResult,
    confidence_threshold: f64,
    max_diagnoses: usize,
) -> Result<Uuid, DatabaseError> {
    let id = Uuid::new_v4();
    let data = serde_json::to_string(result)?;
    conn.execute(
        "INSERT INTO diagnostic_results (id, owner_id, patient_record_id, diagnostic_data,
         confidence_threshold, max_diagnoses, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id.to_string(),
            owner_id,
            record_id.to_string(),
            data,
            confidence_threshold,
            max_diagnoses as i64,
            format_timestamp(&Utc::now().naive_utc()),
        ],
    )?;
    Ok(id)
}

/// Past analyses of an owner, newest first.
pub fn get_diagnostic_history(
    conn: &Connection,
    owner_id: &str,
) -> Result<Vec<StoredDiagnostic>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT d.id, d.patient_record_id, p.source_name, d.diagnostic_data,
                d.confidence_threshold, d.max_diagnoses, d.created_at
         FROM diagnostic_results d
         JOIN patient_records p ON p.id = d.patient_record_id
         WHERE d.owner_id = ?1
         ORDER BY d.created_at DESC, d.rowid DESC",
    )?;

    let rows = stmt.query_map([owner_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, f64>(4)?,
            row.get::<_, i64>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut history = Vec::new();
    for row in rows {
        let (id, record_id, source_name, data, threshold, max, created_at) = row?;
        history.push(StoredDiagnostic {
            id: parse_uuid("diagnostic_results.id", &id)?,
            patient_record_id: parse_uuid("diagnostic_results.patient_record_id", &record_id)?,
            source_name,
            result: serde_json::from_str(&data)?,
            confidence_threshold: threshold,
            max_diagnoses: max.max(0) as usize,
            created_at: parse_timestamp("diagnostic_results.created_at", &created_at)?,
        });
    }
    Ok(history)
}
