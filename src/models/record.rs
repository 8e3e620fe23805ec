use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Canonical medical-record attributes that source fields are mapped onto.
///
/// Matching priority lives in the normalizer's variant table, not in
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    PatientId,
    PatientName,
    DateOfBirth,
    Age,
    Gender,
    ChiefComplaint,
    Symptoms,
    Temperature,
    BloodPressure,
    HeartRate,
    RespiratoryRate,
    OxygenSaturation,
    Allergies,
    Medications,
    MedicalHistory,
    LabResults,
    ImagingResults,
    ClinicalNotes,
}

impl CanonicalField {
    /// All canonical fields in declaration order.
    pub const ALL: [CanonicalField; 18] = [
        Self::PatientId,
        Self::PatientName,
        Self::DateOfBirth,
        Self::Age,
        Self::Gender,
        Self::ChiefComplaint,
        Self::Symptoms,
        Self::Temperature,
        Self::BloodPressure,
        Self::HeartRate,
        Self::RespiratoryRate,
        Self::OxygenSaturation,
        Self::Allergies,
        Self::Medications,
        Self::MedicalHistory,
        Self::LabResults,
        Self::ImagingResults,
        Self::ClinicalNotes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PatientId => "patient_id",
            Self::PatientName => "patient_name",
            Self::DateOfBirth => "date_of_birth",
            Self::Age => "age",
            Self::Gender => "gender",
            Self::ChiefComplaint => "chief_complaint",
            Self::Symptoms => "symptoms",
            Self::Temperature => "temperature",
            Self::BloodPressure => "blood_pressure",
            Self::HeartRate => "heart_rate",
            Self::RespiratoryRate => "respiratory_rate",
            Self::OxygenSaturation => "oxygen_saturation",
            Self::Allergies => "allergies",
            Self::Medications => "medications",
            Self::MedicalHistory => "medical_history",
            Self::LabResults => "lab_results",
            Self::ImagingResults => "imaging_results",
            Self::ClinicalNotes => "clinical_notes",
        }
    }

    /// Exact lookup by canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == name)
    }

    pub fn is_vital_sign(&self) -> bool {
        matches!(
            self,
            Self::Temperature
                | Self::BloodPressure
                | Self::HeartRate
                | Self::RespiratoryRate
                | Self::OxygenSaturation
        )
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional minus sign, then digits with at most a decimal point, and no
/// zero padding ahead of another digit.
fn is_plain_numeral(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let bytes = digits.as_bytes();
    if bytes.is_empty() || !bytes.iter().all(|b| b.is_ascii_digit() || *b == b'.') {
        return false;
    }
    !(bytes[0] == b'0' && bytes.get(1).is_some_and(u8::is_ascii_digit))
}

/// A single scalar value: whole number, decimal number or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Infer a scalar from a textual cell: plain integers and decimals become
    /// numbers, everything else stays text (trimmed). Identifier-shaped
    /// numerals ("00123", "+3312345678", "1e5") stay text so their exact
    /// spelling survives.
    pub fn infer(cell: &str) -> Self {
        let trimmed = cell.trim();
        if !is_plain_numeral(trimmed) {
            return Self::Text(trimmed.to_string());
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Self::Integer(i);
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return Self::Number(n);
            }
        }
        Self::Text(trimmed.to_string())
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(n) => n.is_nan(),
            Self::Integer(_) => false,
        }
    }

    /// Numeric view of the value, parsing text when it holds a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// A record value: one scalar or a flat list of scalars. Never nested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Scalar(Scalar::Text(s.into()))
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Scalar(s) => s.is_blank(),
            Self::List(items) => items.iter().all(Scalar::is_blank),
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::List(_) => None,
        }
    }

    /// Flattened list of non-blank items (a scalar yields itself).
    pub fn items(&self) -> Vec<&Scalar> {
        match self {
            Self::Scalar(s) if !s.is_blank() => vec![s],
            Self::Scalar(_) => vec![],
            Self::List(items) => items.iter().filter(|s| !s.is_blank()).collect(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{s}"),
            Self::List(items) => {
                let joined = items
                    .iter()
                    .filter(|s| !s.is_blank())
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                f.write_str(&joined)
            }
        }
    }
}

impl From<Scalar> for FieldValue {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Scalar(Scalar::Integer(i))
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Scalar(Scalar::Number(n))
    }
}

/// Raw key/value pairs as a format adapter extracted them, in source order.
/// Consumed immediately by the field normalizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFields(Vec<(String, FieldValue)>);

impl RawFields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.push((key.into(), value.into()));
    }

    /// Set a key, replacing the value of an existing identical key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for RawFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (k, v) in iter {
            fields.push(k, v);
        }
        fields
    }
}

/// Record key: a canonical field or a cleaned passthrough name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    Canonical(CanonicalField),
    Passthrough(String),
}

impl FieldKey {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Canonical(field) => field.as_str(),
            Self::Passthrough(name) => name,
        }
    }

    /// Resolve a stored name back to a key. Canonical names win; the
    /// normalizer never emits a passthrough that collides with one.
    pub fn from_name(name: &str) -> Self {
        match CanonicalField::from_name(name) {
            Some(field) => Self::Canonical(field),
            None => Self::Passthrough(name.to_string()),
        }
    }

    pub fn canonical(&self) -> Option<CanonicalField> {
        match self {
            Self::Canonical(field) => Some(*field),
            Self::Passthrough(_) => None,
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized unit of patient data (a CSV row, a JSON object, one parsed document).
///
/// Keys are unique; field order is the source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientRecord {
    fields: Vec<(FieldKey, FieldValue)>,
}

impl PatientRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field. Returns `false` (and leaves the record unchanged) if
    /// the key is already present.
    pub fn insert(&mut self, key: FieldKey, value: FieldValue) -> bool {
        if self.contains_key(key.as_str()) {
            return false;
        }
        self.fields.push((key, value));
        true
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.fields.iter().any(|(k, _)| k.as_str() == name)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
    }

    pub fn get_canonical(&self, field: CanonicalField) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(k, _)| k.canonical() == Some(field))
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k, v))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Number of field slots, blank or not.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// A record is empty when it carries no non-blank value.
    pub fn is_empty(&self) -> bool {
        self.fields.iter().all(|(_, v)| v.is_blank())
    }
}

impl Serialize for PatientRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key.as_str(), value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PatientRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = PatientRecord;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to scalar or list values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut record = PatientRecord::new();
                while let Some((name, value)) = access.next_entry::<String, FieldValue>()? {
                    record.insert(FieldKey::from_name(&name), value);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Ordered, immutable sequence of records from one ingestion.
///
/// Empty records are dropped on construction; there is no mutable access
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientRecordBatch {
    records: Vec<PatientRecord>,
}

impl PatientRecordBatch {
    pub fn new(records: Vec<PatientRecord>) -> Self {
        Self {
            records: records.into_iter().filter(|r| !r.is_empty()).collect(),
        }
    }

    pub fn records(&self) -> &[PatientRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PatientRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copy of a contiguous range of records, e.g. the records of one source file.
    pub fn slice(&self, range: std::ops::Range<usize>) -> Self {
        let end = range.end.min(self.records.len());
        let start = range.start.min(end);
        Self {
            records: self.records[start..end].to_vec(),
        }
    }
}

impl FromIterator<PatientRecord> for PatientRecordBatch {
    fn from_iter<I: IntoIterator<Item = PatientRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PatientRecordBatch {
    type Item = &'a PatientRecord;
    type IntoIter = std::slice::Iter<'a, PatientRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> PatientRecord {
        let mut record = PatientRecord::new();
        record.insert(FieldKey::Canonical(CanonicalField::Age), FieldValue::from(45));
        record.insert(FieldKey::Canonical(CanonicalField::Gender), FieldValue::from("Female"));
        record.insert(
            FieldKey::Passthrough("ward".into()),
            FieldValue::List(vec!["A".into(), "B".into()]),
        );
        record
    }

    #[test]
    fn scalar_inference_prefers_integers() {
        assert_eq!(Scalar::infer(" 45 "), Scalar::Integer(45));
        assert_eq!(Scalar::infer("38.5"), Scalar::Number(38.5));
        assert_eq!(Scalar::infer("120/80"), Scalar::Text("120/80".into()));
    }

    #[test]
    fn identifier_numerals_keep_their_spelling() {
        assert_eq!(Scalar::infer("00123"), Scalar::Text("00123".into()));
        assert_eq!(Scalar::infer("02139"), Scalar::Text("02139".into()));
        assert_eq!(Scalar::infer("0612345678"), Scalar::Text("0612345678".into()));
        assert_eq!(Scalar::infer("+3312345678"), Scalar::Text("+3312345678".into()));
        assert_eq!(Scalar::infer("1e5"), Scalar::Text("1e5".into()));
        assert_eq!(Scalar::infer("-007"), Scalar::Text("-007".into()));
    }

    #[test]
    fn zero_and_signed_values_are_still_numbers() {
        assert_eq!(Scalar::infer("0"), Scalar::Integer(0));
        assert_eq!(Scalar::infer("0.5"), Scalar::Number(0.5));
        assert_eq!(Scalar::infer("-3"), Scalar::Integer(-3));
        assert_eq!(Scalar::infer("-0.25"), Scalar::Number(-0.25));
    }

    #[test]
    fn nan_text_is_not_a_number() {
        assert_eq!(Scalar::infer("NaN"), Scalar::Text("NaN".into()));
        assert_eq!(Scalar::infer("inf"), Scalar::Text("inf".into()));
    }

    #[test]
    fn insert_rejects_duplicate_keys() {
        let mut record = sample_record();
        assert!(!record.insert(FieldKey::Canonical(CanonicalField::Age), FieldValue::from(50)));
        assert_eq!(record.get("age"), Some(&FieldValue::from(45)));
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn record_with_only_blank_values_is_empty() {
        let mut record = PatientRecord::new();
        record.insert(FieldKey::Passthrough("note".into()), FieldValue::text("   "));
        record.insert(FieldKey::Passthrough("tags".into()), FieldValue::List(vec![]));
        assert!(record.is_empty());
        assert!(PatientRecord::new().is_empty());
    }

    #[test]
    fn record_serializes_as_ordered_map() {
        let json = serde_json::to_string(&sample_record()).unwrap();
        assert_eq!(json, r#"{"age":45,"gender":"Female","ward":["A","B"]}"#);
    }

    #[test]
    fn record_deserializes_canonical_keys() {
        let record: PatientRecord =
            serde_json::from_str(r#"{"ward":"A","age":45,"heart_rate":88.5}"#).unwrap();
        let names: Vec<&str> = record.field_names().collect();
        assert_eq!(names, vec!["ward", "age", "heart_rate"]);
        assert_eq!(
            record.get_canonical(CanonicalField::HeartRate),
            Some(&FieldValue::from(88.5))
        );
        assert!(matches!(
            record.iter().next().unwrap().0,
            FieldKey::Passthrough(_)
        ));
    }

    #[test]
    fn batch_drops_empty_records() {
        let batch = PatientRecordBatch::new(vec![sample_record(), PatientRecord::new()]);
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn batch_slice_is_clamped() {
        let batch = PatientRecordBatch::new(vec![sample_record(), sample_record()]);
        assert_eq!(batch.slice(1..5).len(), 1);
        assert!(batch.slice(4..5).is_empty());
    }

    #[test]
    fn list_display_skips_blanks() {
        let value = FieldValue::List(vec!["fever".into(), "".into(), "cough".into()]);
        assert_eq!(value.to_string(), "fever; cough");
        assert_eq!(value.items().len(), 2);
    }

    #[test]
    fn vital_sign_classification() {
        assert!(CanonicalField::BloodPressure.is_vital_sign());
        assert!(!CanonicalField::Age.is_vital_sign());
        assert_eq!(CanonicalField::from_name("oxygen_saturation"), Some(CanonicalField::OxygenSaturation));
        assert_eq!(CanonicalField::from_name("spo2"), None);
    }
}
