use super::types::{decode_utf8, FormatAdapter};
use super::FormatError;
use crate::models::{ArtifactKind, RawFields, Scalar};
use crate::pipeline::normalize::clean_key;

/// Cell contents treated as missing.
const NULL_MARKERS: &[&str] = &["na", "n/a", "#n/a", "nan", "null", "none", "nil"];

/// Delimited text (CSV with a header row), one record per data row.
pub struct TabularAdapter {
    delimiter: u8,
}

impl TabularAdapter {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl Default for TabularAdapter {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_null_cell(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.is_empty() || NULL_MARKERS.iter().any(|m| trimmed.eq_ignore_ascii_case(m))
}

impl FormatAdapter for TabularAdapter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Tabular
    }

    fn adapt(&self, artifact: &str, bytes: &[u8]) -> Result<Vec<RawFields>, FormatError> {
        let text = decode_utf8(artifact, bytes)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| FormatError::parse(artifact, e))?
            .iter()
            .map(clean_key)
            .collect();

        if headers.iter().all(String::is_empty) {
            return Err(FormatError::parse(artifact, "missing header row"));
        }

        let mut rows = Vec::new();
        let mut skipped = 0usize;
        let mut empty = 0usize;

        for (index, result) in reader.records().enumerate() {
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    skipped += 1;
                    // Header is line 1, so data row `index` sits on line index + 2.
                    tracing::warn!(artifact, line = index + 2, error = %e, "Skipping malformed row");
                    continue;
                }
            };

            let fields: RawFields = headers
                .iter()
                .zip(row.iter())
                .filter(|(_, cell)| !is_null_cell(cell))
                .map(|(header, cell)| (header.clone(), Scalar::infer(cell)))
                .collect();

            if fields.is_empty() {
                empty += 1;
            } else {
                rows.push(fields);
            }
        }

        tracing::debug!(
            artifact,
            columns = headers.len(),
            rows = rows.len(),
            skipped,
            empty,
            "Tabular artifact parsed"
        );
        Ok(rows)
    }
}
