use serde_json::{Map, Value};
use thiserror::Error;

/// Reason recorded on the degraded result when the response is unusable.
pub const PARSE_FAILURE: &str = "Failed to parse AI diagnostic response";

const TOP_LEVEL_KEYS: [&str; 4] = ["diagnoses", "red_flags", "validation", "reasoning"];

/// Response that does not match the demanded structure. Never leaves the
/// engine: it is turned into the degraded result.
#[derive(Error, Debug, PartialEq)]
pub enum ShapeError {
    #[error("No JSON object found in response")]
    NoJson,

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Top-level JSON value is not an object")]
    NotAnObject,

    #[error("Response has none of the expected keys")]
    MissingKeys,

    #[error("`diagnoses` is not an array")]
    DiagnosesNotArray,
}

/// Top-level pieces of a model response, before repair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    pub diagnoses: Vec<Value>,
    pub red_flags: Vec<Value>,
    pub validation: Option<Value>,
    pub reasoning: Option<Value>,
}

/// Locate the JSON payload: a ```json fenced block if present, otherwise the
/// span from the first `{` to the last `}`.
fn extract_json(response: &str) -> Option<&str> {
    if let Some(start) = response.find("```json") {
        let body = &response[start + 7..];
        if let Some(end) = body.find("```") {
            return Some(body[..end].trim());
        }
    }
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

fn take_array(map: &mut Map<String, Value>, key: &str) -> Option<Value> {
    map.remove(key).filter(|v| !v.is_null())
}

/// Parse a raw model response into its top-level parts.
pub fn parse_response(response: &str) -> Result<ParsedResponse, ShapeError> {
    let json = extract_json(response).ok_or(ShapeError::NoJson)?;
    let value: Value =
        serde_json::from_str(json).map_err(|e| ShapeError::InvalidJson(e.to_string()))?;
    let Value::Object(mut map) = value else {
        return Err(ShapeError::NotAnObject);
    };
    if !TOP_LEVEL_KEYS.iter().any(|k| map.contains_key(*k)) {
        return Err(ShapeError::MissingKeys);
    }

    let diagnoses = match take_array(&mut map, "diagnoses") {
        None => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ShapeError::DiagnosesNotArray),
    };
    // A red flag list of the wrong type carries nothing usable.
    let red_flags = match take_array(&mut map, "red_flags") {
        Some(Value::Array(items)) => items,
        Some(other) => {
            tracing::warn!(kind = json_kind(&other), "Ignoring non-array red_flags");
            Vec::new()
        }
        None => Vec::new(),
    };

    Ok(ParsedResponse {
        diagnoses,
        red_flags,
        validation: map.remove("validation").filter(|v| !v.is_null()),
        reasoning: map.remove("reasoning").filter(|v| !v.is_null()),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json_object() {
        let parsed = parse_response(
            r#"{"diagnoses":[{"condition":"Migraine"}],"red_flags":[],"validation":{"overall_confidence":0.5},"reasoning":"ok"}"#,
        )
        .unwrap();
        assert_eq!(parsed.diagnoses.len(), 1);
        assert!(parsed.red_flags.is_empty());
        assert!(parsed.validation.is_some());
        assert_eq!(parsed.reasoning, Some(Value::String("ok".into())));
    }

    #[test]
    fn parses_fenced_block_with_prose() {
        let response = "Here is the analysis:\n```json\n{\"diagnoses\": []}\n```\nStay safe.";
        let parsed = parse_response(response).unwrap();
        assert!(parsed.diagnoses.is_empty());
        assert!(parsed.validation.is_none());
    }

    #[test]
    fn finds_object_inside_surrounding_text() {
        let parsed = parse_response("Sure! {\"reasoning\": \"limited data\"} Hope this helps").unwrap();
        assert_eq!(parsed.reasoning, Some(Value::String("limited data".into())));
    }

    #[test]
    fn rejects_non_json() {
        assert_eq!(parse_response("I cannot help with that."), Err(ShapeError::NoJson));
        assert!(matches!(
            parse_response("{diagnoses: [oops"),
            Err(ShapeError::NoJson | ShapeError::InvalidJson(_))
        ));
        assert!(matches!(parse_response("{not json}"), Err(ShapeError::InvalidJson(_))));
    }

    #[test]
    fn rejects_objects_without_expected_keys() {
        assert_eq!(parse_response(r#"{"answer": 42}"#), Err(ShapeError::MissingKeys));
    }

    #[test]
    fn rejects_diagnoses_of_wrong_type() {
        assert_eq!(
            parse_response(r#"{"diagnoses": "pneumonia"}"#),
            Err(ShapeError::DiagnosesNotArray)
        );
    }

    #[test]
    fn tolerates_null_and_misshapen_red_flags() {
        let parsed = parse_response(r#"{"diagnoses": null, "red_flags": {"condition": "x"}}"#).unwrap();
        assert!(parsed.diagnoses.is_empty());
        assert!(parsed.red_flags.is_empty());
    }
}
