use super::FormatError;
use crate::models::{ArtifactKind, RawFields};

/// Converts one input modality into raw field maps, one per record.
///
/// A malformed record inside an otherwise valid artifact is skipped with a
/// warning; only artifact-level problems are errors.
pub trait FormatAdapter {
    fn kind(&self) -> ArtifactKind;

    fn adapt(&self, artifact: &str, bytes: &[u8]) -> Result<Vec<RawFields>, FormatError>;
}

/// Text-extraction collaborator for document artifacts (allows mocking).
pub trait DocumentTextExtractor {
    fn extract_text(&self, artifact: &str, bytes: &[u8]) -> Result<String, FormatError>;
}

/// Decode UTF-8, dropping a leading byte-order mark.
pub fn decode_utf8<'a>(artifact: &str, bytes: &'a [u8]) -> Result<&'a str, FormatError> {
    let text = std::str::from_utf8(bytes).map_err(|e| FormatError::Encoding {
        artifact: artifact.to_string(),
        cause: e.to_string(),
    })?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_strips_bom() {
        let bytes = "\u{feff}age,sex".as_bytes();
        assert_eq!(decode_utf8("a.csv", bytes).unwrap(), "age,sex");
    }

    #[test]
    fn invalid_utf8_is_encoding_error() {
        let err = decode_utf8("a.csv", &[0x61, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, FormatError::Encoding { .. }));
        assert_eq!(err.artifact(), "a.csv");
    }
}
