use super::sanitize::sanitize_extracted_text;
use super::types::{decode_utf8, FormatAdapter};
use super::FormatError;
use crate::models::{ArtifactKind, FieldValue, RawFields, Scalar};
use crate::pipeline::normalize::clean_key;

const MAX_KEY_WORDS: usize = 6;
const MAX_KEY_CHARS: usize = 48;
const MAX_HEADER_WORDS: usize = 4;

/// Key collecting colon-less lines seen outside any section.
const LOOSE_LINES_KEY: &str = "notes";
/// Key for input with no recognizable structure at all.
pub const FREE_TEXT_KEY: &str = "clinical_notes";

/// Recognized section headers of a clinical text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSection {
    Demographics,
    Vitals,
    Symptoms,
    History,
    Medications,
    Labs,
}

impl TextSection {
    pub const ALL: [TextSection; 6] = [
        Self::Demographics,
        Self::Vitals,
        Self::Symptoms,
        Self::History,
        Self::Medications,
        Self::Labs,
    ];

    /// Single words match as a word prefix, phrases as a substring.
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Demographics => &["demographic", "patient info", "patient details"],
            Self::Vitals => &["vital"],
            Self::Symptoms => &["symptom", "complaint", "presenting"],
            Self::History => &["history", "pmh"],
            Self::Medications => &["medication", "meds", "drug", "prescription"],
            Self::Labs => &["lab", "laboratory", "investigation"],
        }
    }

    /// Key under which anonymous lines of this section are collected.
    pub fn list_key(&self) -> &'static str {
        match self {
            Self::Demographics => "demographics",
            Self::Vitals => "vital_signs",
            Self::Symptoms => "symptoms",
            Self::History => "medical_history",
            Self::Medications => "medications",
            Self::Labs => "lab_results",
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            Self::Demographics => "demographics",
            Self::Vitals => "vitals",
            Self::Symptoms => "symptoms",
            Self::History => "history",
            Self::Medications => "medications",
            Self::Labs => "labs",
        }
    }

    /// Section a header label belongs to, if any.
    pub fn detect(label: &str) -> Option<Self> {
        let lower = label.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        Self::ALL.into_iter().find(|section| {
            section.keywords().iter().any(|kw| {
                if kw.contains(' ') {
                    lower.contains(kw)
                } else {
                    words.iter().any(|w| w.starts_with(kw))
                }
            })
        })
    }
}

/// Where colon-less lines currently go.
#[derive(Debug, Clone, PartialEq)]
enum ActiveList {
    Loose,
    Section(TextSection),
    Custom(String),
}

/// Result of scanning a text for `key: value` structure.
#[derive(Debug, Clone, Default)]
pub struct TextScan {
    pub fields: RawFields,
    /// Whether any key-value line or section header was found.
    pub structured: bool,
}

/// Scan text line by line for headers, `key: value` pairs and list entries.
pub fn scan_key_values(text: &str) -> TextScan {
    let mut entries: Vec<(String, FieldValue)> = Vec::new();
    let mut active = ActiveList::Loose;
    let mut structured = false;

    for line in text.lines() {
        let body = strip_bullet(line.trim());
        if body.is_empty() {
            continue;
        }

        if let Some((key, value)) = split_key_value(body) {
            structured = true;
            if value.is_empty() {
                active = match TextSection::detect(key) {
                    Some(section) => ActiveList::Section(section),
                    None => ActiveList::Custom(clean_key(key)),
                };
                continue;
            }
            let key = match (&active, find_entry(&entries, key)) {
                (ActiveList::Section(section), Some(_)) => format!("{} {key}", section.prefix()),
                _ => key.to_string(),
            };
            entries.push((key, FieldValue::Scalar(Scalar::infer(value))));
            continue;
        }

        if let Some(section) = colonless_header(body) {
            structured = true;
            active = ActiveList::Section(section);
            continue;
        }

        let list_key = match &active {
            ActiveList::Loose => LOOSE_LINES_KEY.to_string(),
            ActiveList::Section(section) => section.list_key().to_string(),
            ActiveList::Custom(key) => key.clone(),
        };
        append_list_item(&mut entries, &list_key, body);
    }

    TextScan {
        fields: entries.into_iter().collect(),
        structured,
    }
}

fn find_entry(entries: &[(String, FieldValue)], key: &str) -> Option<usize> {
    let wanted = clean_key(key);
    entries.iter().position(|(k, _)| clean_key(k) == wanted)
}

fn append_list_item(entries: &mut Vec<(String, FieldValue)>, key: &str, item: &str) {
    let item = Scalar::Text(item.to_string());
    match find_entry(entries, key) {
        Some(i) => {
            let slot = &mut entries[i].1;
            let mut items = match std::mem::replace(slot, FieldValue::List(Vec::new())) {
                FieldValue::List(items) => items,
                FieldValue::Scalar(existing) => vec![existing],
            };
            items.push(item);
            *slot = FieldValue::List(items);
        }
        None => entries.push((key.to_string(), FieldValue::List(vec![item]))),
    }
}

/// Remove a leading list marker: `-`, `*`, `•`, `1.` or `1)`.
fn strip_bullet(line: &str) -> &str {
    let trimmed = line.trim_start_matches(['-', '*', '•', '·']).trim_start();
    if trimmed.len() != line.len() {
        return trimmed;
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && digits <= 3 {
        let rest = &line[digits..];
        if let Some(after) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            if after.starts_with(char::is_whitespace) {
                return after.trim_start();
            }
        }
    }
    line
}

/// Split `key: value` when the key looks like a label rather than prose,
/// a clock time or a URL.
fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim().trim_start_matches('#').trim();
    let value = value.trim();
    if key.is_empty()
        || key.chars().count() > MAX_KEY_CHARS
        || key.split_whitespace().count() > MAX_KEY_WORDS
        || !key.chars().any(char::is_alphabetic)
        || key.starts_with(|c: char| c.is_ascii_digit())
        || value.starts_with("//")
    {
        return None;
    }
    Some((key, value))
}

/// A short, capitalized, colon-less line naming a known section.
fn colonless_header(line: &str) -> Option<TextSection> {
    let label = line.trim_matches(|c: char| c == '#' || c == '*' || c == '=' || c.is_whitespace());
    let words: Vec<&str> = label.split_whitespace().collect();
    if words.is_empty() || words.len() > MAX_HEADER_WORDS || label.ends_with('.') {
        return None;
    }
    let capitalized = words.iter().all(|w| {
        w.chars()
            .find(|c| c.is_alphabetic())
            .map_or(true, char::is_uppercase)
    });
    if !capitalized {
        return None;
    }
    TextSection::detect(label)
}

/// Structured key-value clinical text, one record per artifact.
///
/// Text without any structure becomes a single `clinical_notes` record.
pub struct KeyValueTextAdapter;

impl FormatAdapter for KeyValueTextAdapter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::PlainText
    }

    fn adapt(&self, artifact: &str, bytes: &[u8]) -> Result<Vec<RawFields>, FormatError> {
        let text = sanitize_extracted_text(decode_utf8(artifact, bytes)?);
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let scan = scan_key_values(&text);
        let fields = if scan.structured {
            scan.fields
        } else {
            let mut notes = RawFields::new();
            notes.push(FREE_TEXT_KEY, FieldValue::text(text));
            notes
        };

        tracing::debug!(
            artifact,
            fields = fields.len(),
            structured = scan.structured,
            "Text artifact parsed"
        );
        Ok(vec![fields])
    }
}
