//! Repository layer: table-scoped database operations over a borrowed connection.

mod diagnostic_result;
mod patient_record;
mod preference;

pub use diagnostic_result::*;
pub use patient_record::*;
pub use preference::*;

use chrono::NaiveDateTime;
use uuid::Uuid;

use super::DatabaseError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub(crate) fn parse_uuid(column: &str, value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|e| DatabaseError::CorruptValue {
        column: column.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|e| DatabaseError::CorruptValue {
        column: column.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_round_trip_keeps_fraction() {
        let ts = chrono::Utc::now().naive_utc();
        let back = parse_timestamp("created_at", &format_timestamp(&ts)).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn corrupt_uuid_names_column() {
        let err = parse_uuid("patient_record_id", "not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("patient_record_id"));
    }
}
