use std::sync::LazyLock;

use regex::Regex;

use super::keyvalue::{scan_key_values, FREE_TEXT_KEY};
use super::sanitize::sanitize_extracted_text;
use super::types::{DocumentTextExtractor, FormatAdapter};
use super::FormatError;
use crate::models::{ArtifactKind, CanonicalField, FieldValue, RawFields};
use crate::pipeline::normalize::match_canonical;

/// Below this many recovered fields the document is kept as free text.
pub const MIN_DOCUMENT_FIELDS: usize = 2;

static BLOOD_PRESSURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{2,3})\s*/\s*(\d{2,3})\b").unwrap());

static TEMPERATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{2,3}(?:\.\d{1,2})?)\s*(°|deg(?:rees)?)?\s*([CF])\b").unwrap()
});

static HEART_RATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{2,3})\s*bpm\b|\b(?:heart\s*rate|hr|pulse)\s*[:=]?\s*(\d{2,3})\b")
        .unwrap()
});

static AGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3})\s*-?\s*(?:y/o|yo|years?[\s-]*old|yrs?[\s-]*old)\b").unwrap()
});

/// Vital-sign and age tokens found anywhere in free text, first plausible
/// match of each kind.
pub fn extract_vital_patterns(text: &str) -> Vec<(CanonicalField, FieldValue)> {
    let mut found = Vec::new();

    let bp = BLOOD_PRESSURE.captures_iter(text).find_map(|caps| {
        let whole = caps.get(0)?;
        // Part of a date such as 12/05/2024.
        if text[whole.end()..].starts_with('/') || text[..whole.start()].ends_with('/') {
            return None;
        }
        let systolic: u32 = caps[1].parse().ok()?;
        let diastolic: u32 = caps[2].parse().ok()?;
        let plausible = (60..=260).contains(&systolic)
            && (30..=160).contains(&diastolic)
            && systolic > diastolic;
        plausible.then(|| format!("{systolic}/{diastolic}"))
    });
    if let Some(bp) = bp {
        found.push((CanonicalField::BloodPressure, FieldValue::text(bp)));
    }

    let temp = TEMPERATURE.captures_iter(text).find_map(|caps| {
        let raw = caps.get(1)?.as_str();
        let marked = caps.get(2).is_some();
        if !marked && !raw.contains('.') {
            return None;
        }
        let value: f64 = raw.parse().ok()?;
        let unit = caps[3].to_ascii_uppercase();
        let plausible = match unit.as_str() {
            "C" => (30.0..=45.0).contains(&value),
            _ => (86.0..=113.0).contains(&value),
        };
        plausible.then(|| format!("{raw} °{unit}"))
    });
    if let Some(temp) = temp {
        found.push((CanonicalField::Temperature, FieldValue::text(temp)));
    }

    let hr = HEART_RATE.captures_iter(text).find_map(|caps| {
        let rate: i64 = caps.get(1).or_else(|| caps.get(2))?.as_str().parse().ok()?;
        (20..=250).contains(&rate).then_some(rate)
    });
    if let Some(hr) = hr {
        found.push((CanonicalField::HeartRate, FieldValue::from(hr)));
    }

    let age = AGE.captures_iter(text).find_map(|caps| {
        let years: i64 = caps[1].parse().ok()?;
        (0..=130).contains(&years).then_some(years)
    });
    if let Some(age) = age {
        found.push((CanonicalField::Age, FieldValue::from(age)));
    }

    found
}

/// Free-text clinical documents (PDF or already-extracted text).
///
/// Runs the key-value scan, then adds vital-sign tokens found by pattern. If
/// too little is recovered the whole text becomes one `clinical_notes` field.
pub struct DocumentAdapter {
    extractor: Box<dyn DocumentTextExtractor>,
}

impl DocumentAdapter {
    pub fn new(extractor: Box<dyn DocumentTextExtractor>) -> Self {
        Self { extractor }
    }
}

impl FormatAdapter for DocumentAdapter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Document
    }

    fn adapt(&self, artifact: &str, bytes: &[u8]) -> Result<Vec<RawFields>, FormatError> {
        let raw = self.extractor.extract_text(artifact, bytes)?;
        let text = sanitize_extracted_text(&raw);
        if text.is_empty() {
            return Err(FormatError::Extraction {
                artifact: artifact.to_string(),
            });
        }

        let scan = scan_key_values(&text);
        let mut fields = if scan.structured {
            scan.fields
        } else {
            RawFields::new()
        };

        for (field, value) in extract_vital_patterns(&text) {
            let present = fields.iter().any(|(k, _)| match_canonical(k) == Some(field));
            if !present {
                fields.push(field.as_str(), value);
            }
        }

        if fields.len() < MIN_DOCUMENT_FIELDS {
            tracing::debug!(
                artifact,
                recovered = fields.len(),
                "Too little structure, keeping document as free text"
            );
            let mut notes = RawFields::new();
            notes.push(FREE_TEXT_KEY, FieldValue::text(text));
            return Ok(vec![notes]);
        }

        tracing::debug!(artifact, fields = fields.len(), "Document parsed");
        Ok(vec![fields])
    }
}
