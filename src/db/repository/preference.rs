use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::AnalysisParameters;

/// Analysis defaults for an owner. A missing row is created with the
/// stock defaults and those are returned.
pub fn get_analysis_preferences(
    conn: &Connection,
    owner_id: &str,
) -> Result<AnalysisParameters, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT default_confidence_threshold, default_max_diagnoses, enable_red_flags
             FROM user_preferences WHERE owner_id = ?1",
            [owner_id],
            |row| {
                Ok((
                    row.get::<_, f64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, bool>(2)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((threshold, max, red_flags)) => Ok(AnalysisParameters::new(
            threshold,
            max.max(0) as usize,
            red_flags,
        )),
        None => {
            let defaults = AnalysisParameters::default();
            set_analysis_preferences(conn, owner_id, &defaults)?;
            tracing::debug!("Created default analysis preferences");
            Ok(defaults)
        }
    }
}

/// Upsert an owner's analysis defaults.
pub fn set_analysis_preferences(
    conn: &Connection,
    owner_id: &str,
    prefs: &AnalysisParameters,
) -> Result<(), DatabaseError> {
    let prefs = prefs.normalized();
    conn.execute(
        "INSERT INTO user_preferences (owner_id, default_confidence_threshold,
         default_max_diagnoses, enable_red_flags, updated_at)
         VALUES (?1, ?2, ?3, ?4, datetime('now'))
         ON CONFLICT(owner_id) DO UPDATE SET
            default_confidence_threshold = ?2,
            default_max_diagnoses = ?3,
            enable_red_flags = ?4,
            updated_at = datetime('now')",
        params![
            owner_id,
            prefs.confidence_threshold,
            prefs.max_diagnoses as i64,
            prefs.include_red_flags,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    #[test]
    fn missing_preferences_are_created_with_defaults() {
        let conn = open_memory_database().unwrap();
        let prefs = get_analysis_preferences(&conn, "owner-1").unwrap();
        assert_eq!(prefs, AnalysisParameters::default());
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM user_preferences", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn set_then_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let wanted = AnalysisParameters::new(0.55, 3, false);
        set_analysis_preferences(&conn, "owner-1", &wanted).unwrap();
        assert_eq!(get_analysis_preferences(&conn, "owner-1").unwrap(), wanted);
    }

    #[test]
    fn update_overwrites_existing_row() {
        let conn = open_memory_database().unwrap();
        get_analysis_preferences(&conn, "owner-1").unwrap();
        set_analysis_preferences(&conn, "owner-1", &AnalysisParameters::new(0.9, 2, true)).unwrap();
        let prefs = get_analysis_preferences(&conn, "owner-1").unwrap();
        assert_eq!(prefs.max_diagnoses, 2);
        assert_eq!(prefs.confidence_threshold, 0.9);
    }

    #[test]
    fn stored_out_of_range_values_are_normalized() {
        let conn = open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO user_preferences (owner_id, default_confidence_threshold, default_max_diagnoses)
             VALUES ('owner-1', 4.0, 0)",
            [],
        )
        .unwrap();
        let prefs = get_analysis_preferences(&conn, "owner-1").unwrap();
        assert_eq!(prefs.confidence_threshold, 1.0);
        assert_eq!(prefs.max_diagnoses, 1);
    }
}
