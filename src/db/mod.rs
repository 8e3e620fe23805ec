pub mod repository;
pub mod sqlite;
pub mod store;

pub use repository::*;
pub use sqlite::*;
pub use store::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Corrupt stored value in {column}: {reason}")]
    CorruptValue { column: String, reason: String },

    #[error("Analysis result has no record set to link to")]
    NoRecordSets,

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },
}
