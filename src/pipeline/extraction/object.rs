use serde_json::{Map, Value};

use super::types::FormatAdapter;
use super::FormatError;
use crate::models::{ArtifactKind, FieldValue, RawFields, Scalar};

/// Container keys under which a top-level object may wrap its record array.
const WRAPPER_KEYS: &[&str] = &["records", "data", "patients"];

const EXPECTED_SHAPES: &str = "expected an array of objects, an object wrapping an array under \
     \"records\", \"data\" or \"patients\", or a single object";

/// JSON documents: arrays of objects, wrapped arrays, or one object.
///
/// Nested objects are flattened to `parent_child` keys; arrays become lists
/// of scalars (objects inside arrays are rendered as `key: value; ...` text).
pub struct ObjectAdapter;

impl FormatAdapter for ObjectAdapter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::StructuredObject
    }

    fn adapt(&self, artifact: &str, bytes: &[u8]) -> Result<Vec<RawFields>, FormatError> {
        let root: Value =
            serde_json::from_slice(bytes).map_err(|e| FormatError::parse(artifact, e))?;

        let items = match root {
            Value::Array(items) => items,
            Value::Object(mut map) => match take_wrapped_array(&mut map) {
                Some(items) => items,
                None => vec![Value::Object(map)],
            },
            other => {
                return Err(FormatError::parse(
                    artifact,
                    format!("{EXPECTED_SHAPES}; found {}", json_type(&other)),
                ))
            }
        };

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match item {
                Value::Object(map) => {
                    let mut fields = RawFields::new();
                    flatten_into(&mut fields, None, map);
                    if !fields.is_empty() {
                        records.push(fields);
                    }
                }
                other => {
                    tracing::warn!(
                        artifact,
                        index,
                        found = json_type(&other),
                        "Skipping non-object record"
                    );
                }
            }
        }

        tracing::debug!(artifact, records = records.len(), "Structured artifact parsed");
        Ok(records)
    }
}

fn take_wrapped_array(map: &mut Map<String, Value>) -> Option<Vec<Value>> {
    let key = WRAPPER_KEYS
        .iter()
        .find(|k| matches!(map.get(**k), Some(Value::Array(_))))?;
    match map.remove(*key) {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    }
}

fn flatten_into(fields: &mut RawFields, prefix: Option<&str>, map: Map<String, Value>) {
    for (key, value) in map {
        let key = match prefix {
            Some(p) => format!("{p}_{key}"),
            None => key,
        };
        match value {
            Value::Null => {}
            Value::Object(inner) => flatten_into(fields, Some(key.as_str()), inner),
            Value::Array(items) => {
                let list: Vec<Scalar> = items.iter().filter_map(scalar_from_json).collect();
                if !list.is_empty() {
                    fields.push(key, FieldValue::List(list));
                }
            }
            scalar => {
                if let Some(s) = scalar_from_json(&scalar) {
                    fields.push(key, s);
                }
            }
        }
    }
}

fn scalar_from_json(value: &Value) -> Option<Scalar> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(Scalar::Text(b.to_string())),
        Value::Number(n) => n
            .as_i64()
            .map(Scalar::Integer)
            .or_else(|| n.as_f64().map(Scalar::Number)),
        Value::String(s) => Some(Scalar::Text(s.trim().to_string())),
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .filter_map(|(k, v)| scalar_from_json(v).map(|s| format!("{k}: {s}")))
                .collect();
            (!parts.is_empty()).then(|| Scalar::Text(parts.join("; ")))
        }
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(scalar_from_json)
                .map(|s| s.to_string())
                .collect();
            (!parts.is_empty()).then(|| Scalar::Text(parts.join(", ")))
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
