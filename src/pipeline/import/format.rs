use std::path::Path;

use super::IngestError;
use crate::models::ArtifactKind;

pub const MAX_ARTIFACT_SIZE: u64 = 100 * 1024 * 1024; // 100MB

/// Tabular shorthand selecting a tab delimiter.
pub const TAB_SEPARATED_TAG: &str = "tsv";

/// Resolve a declared type tag. Accepts the canonical tags plus common
/// shorthand (`csv`, `json`, `txt`, `pdf`). Never looks at content.
pub fn parse_declared_type(declared: &str) -> Result<ArtifactKind, IngestError> {
    let tag = declared.trim().to_ascii_lowercase();
    let kind = match tag.as_str() {
        "tabular" | "csv" | "tsv" | "text/csv" => ArtifactKind::Tabular,
        "structured-object" | "json" | "application/json" => ArtifactKind::StructuredObject,
        "plain-text" | "txt" | "text" | "text/plain" => ArtifactKind::PlainText,
        "document" | "pdf" | "application/pdf" => ArtifactKind::Document,
        _ => return Err(IngestError::UnsupportedType(declared.to_string())),
    };
    Ok(kind)
}

/// Declared type for a file on disk, from its extension. Used by callers
/// that have paths rather than tagged uploads.
pub fn declared_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "csv" => Some(ArtifactKind::Tabular.as_str()),
        "tsv" => Some(TAB_SEPARATED_TAG),
        "json" => Some(ArtifactKind::StructuredObject.as_str()),
        "txt" | "text" | "md" => Some(ArtifactKind::PlainText.as_str()),
        "pdf" => Some(ArtifactKind::Document.as_str()),
        _ => None,
    }
}

pub fn check_size(len: usize) -> Result<(), IngestError> {
    let len = len as u64;
    if len > MAX_ARTIFACT_SIZE {
        return Err(IngestError::TooLarge {
            size_mb: len as f64 / (1024.0 * 1024.0),
            max_mb: MAX_ARTIFACT_SIZE / (1024 * 1024),
        });
    }
    Ok(())
}

/// Sanitize an artifact name: strip path components, limit length
pub fn sanitize_artifact_name(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("artifact");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .take(255)
        .collect();

    if clean.is_empty() {
        "artifact".to_string()
    } else {
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_tags_and_shorthand() {
        assert_eq!(parse_declared_type("tabular").unwrap(), ArtifactKind::Tabular);
        assert_eq!(parse_declared_type(" CSV ").unwrap(), ArtifactKind::Tabular);
        assert_eq!(parse_declared_type("json").unwrap(), ArtifactKind::StructuredObject);
        assert_eq!(parse_declared_type("plain-text").unwrap(), ArtifactKind::PlainText);
        assert_eq!(parse_declared_type("application/pdf").unwrap(), ArtifactKind::Document);
    }

    #[test]
    fn unknown_tag_is_unsupported() {
        let err = parse_declared_type("dicom").unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedType(ref t) if t == "dicom"));
        assert!(err.to_string().contains("dicom"));
    }

    #[test]
    fn extension_mapping() {
        assert_eq!(declared_type_for_path(Path::new("a/visits.CSV")), Some("tabular"));
        assert_eq!(declared_type_for_path(Path::new("p.json")), Some("structured-object"));
        assert_eq!(declared_type_for_path(Path::new("note.txt")), Some("plain-text"));
        assert_eq!(declared_type_for_path(Path::new("scan.pdf")), Some("document"));
        assert_eq!(declared_type_for_path(Path::new("export.tsv")), Some("tsv"));
        assert_eq!(declared_type_for_path(Path::new("image.png")), None);
        assert_eq!(declared_type_for_path(Path::new("README")), None);
    }

    #[test]
    fn size_limit() {
        assert!(check_size(10).is_ok());
        assert!(check_size(MAX_ARTIFACT_SIZE as usize).is_ok());
        let err = check_size(MAX_ARTIFACT_SIZE as usize + 1).unwrap_err();
        assert!(err.to_string().contains("100MB"));
    }

    #[test]
    fn sanitize_path_traversal() {
        assert_eq!(sanitize_artifact_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_artifact_name("labs (1).csv"), "labs (1).csv");
        assert_eq!(sanitize_artifact_name(""), "artifact");
        assert_eq!(sanitize_artifact_name("file\0name.pdf"), "filename.pdf");
    }
}
