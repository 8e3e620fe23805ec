// Sanitize record values before they are embedded in a model prompt.
// Removes invisible Unicode and prompt-injection lines, flattens to one line
// and caps the length.

use crate::pipeline::extraction::sanitize_extracted_text;

/// Maximum characters kept from a single field value.
pub const MAX_VALUE_CHARS: usize = 500;

const TRUNCATION_MARKER: &str = "…[TRUNCATED]";
const LINE_JOINER: &str = " | ";

/// Check if a line matches a role marker pattern.
fn is_role_marker(trimmed: &str) -> bool {
    const MARKERS: &[&str] = &[
        "system:",
        "assistant:",
        "user:",
        "[system]",
        "[assistant]",
        "[inst]",
        "[/inst]",
        "<<sys>>",
        "note to ai:",
        "system update:",
    ];
    MARKERS.iter().any(|m| trimmed.starts_with(m))
}

/// Check if a text fragment contains an instruction override attempt.
fn is_override_attempt(text: &str) -> bool {
    const OVERRIDES: &[&str] = &[
        "ignore previous instructions",
        "ignore all instructions",
        "ignore the above instructions",
        "disregard your instructions",
        "disregard all instructions",
        "forget your instructions",
        "forget all instructions",
        "new instructions:",
        "override:",
    ];
    OVERRIDES.iter().any(|o| text.contains(o))
}

/// Check if a line looks like an XML-like instruction tag.
fn is_xml_instruction_tag(trimmed: &str) -> bool {
    trimmed.starts_with("<instruction")
        || trimmed.starts_with("</instruction")
        || trimmed.starts_with("<system")
        || trimmed.starts_with("</system")
        || trimmed.starts_with("</patient_data")
}

fn is_injection_line(line: &str) -> bool {
    let lower = line.trim().to_lowercase();
    is_role_marker(&lower) || is_override_attempt(&lower) || is_xml_instruction_tag(&lower)
}

/// Sanitized value, truncated to `max_chars`, plus the number of lines
/// dropped as injection attempts.
pub fn sanitize_value_counted(raw: &str, max_chars: usize) -> (String, usize) {
    let cleaned = sanitize_extracted_text(raw);
    let mut removed = 0usize;
    let kept: Vec<&str> = cleaned
        .lines()
        .filter(|line| {
            let injection = is_injection_line(line);
            if injection {
                removed += 1;
            }
            !injection
        })
        .collect();
    let flat = kept
        .iter()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join(LINE_JOINER);
    (truncate_chars(&flat, max_chars), removed)
}

/// Sanitize a single field value for prompt embedding.
pub fn sanitize_value(raw: &str) -> String {
    sanitize_value_counted(raw, MAX_VALUE_CHARS).0
}

/// Truncate to `max_chars` characters, breaking at the last word boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };
    let head = &text[..cut];
    match head.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => format!("{}{TRUNCATION_MARKER}", &head[..pos]),
        _ => format!("{head}{TRUNCATION_MARKER}"),
    }
}
