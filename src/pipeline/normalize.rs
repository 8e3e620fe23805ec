//! Field normalizer: maps heterogeneous source keys onto the canonical
//! medical-record vocabulary.
//!
//! Matching is table-driven. The table order is the priority order: for each
//! canonical field in turn, the best unconsumed raw key is picked (the
//! canonical name itself, then an exact variant, then a partial match; source
//! order breaks ties). A raw key feeds at most one canonical field. Keys left
//! over keep their value under a cleaned passthrough name, so every raw key
//! appears in the output exactly once.

use std::collections::HashSet;

use crate::models::{CanonicalField, FieldKey, PatientRecord, RawFields};

/// Variants shorter than this only match a whole `_`-separated token of the
/// key; longer ones also match as a substring.
const MIN_SUBSTRING_VARIANT: usize = 4;

const UNNAMED_KEY: &str = "unnamed";

/// Canonical fields in matching-priority order with their recognized names.
///
/// Allergies precede medications ("medication_allergies"), oxygen saturation
/// precedes heart rate ("pulse_ox"), vitals and labs precede history and notes.
pub const FIELD_VARIANTS: &[(CanonicalField, &[&str])] = &[
    (CanonicalField::PatientId, &["patient_id", "patientid", "patient_number", "mrn", "id"]),
    (CanonicalField::PatientName, &["patient_name", "patientname", "full_name", "fullname", "name"]),
    (CanonicalField::DateOfBirth, &["date_of_birth", "birth_date", "birthdate", "dob"]),
    (CanonicalField::Age, &["age", "patient_age", "age_years"]),
    (CanonicalField::Gender, &["gender", "sex", "patient_gender", "patient_sex"]),
    (CanonicalField::ChiefComplaint, &["chief_complaint", "presenting_complaint", "complaint", "cc"]),
    (CanonicalField::Symptoms, &["symptoms", "symptom", "clinical_symptoms", "presenting_symptoms"]),
    (CanonicalField::Temperature, &["temperature", "body_temperature", "body_temp", "temp"]),
    (CanonicalField::BloodPressure, &["blood_pressure", "systolic_diastolic", "pressure", "bp"]),
    (CanonicalField::OxygenSaturation, &["oxygen_saturation", "oxygen_sat", "o2_sat", "spo2", "pulse_ox", "sat"]),
    (CanonicalField::HeartRate, &["heart_rate", "pulse_rate", "pulse", "bpm", "hr"]),
    (CanonicalField::RespiratoryRate, &["respiratory_rate", "breathing_rate", "resp_rate", "rr"]),
    (CanonicalField::Allergies, &["allergies", "drug_allergies", "medication_allergies", "allergy"]),
    (CanonicalField::Medications, &["medications", "current_medications", "medication", "prescriptions", "meds"]),
    (CanonicalField::MedicalHistory, &["medical_history", "past_medical_history", "history", "pmh"]),
    (CanonicalField::LabResults, &["lab_results", "laboratory_results", "laboratory", "labs", "lab"]),
    (CanonicalField::ImagingResults, &["imaging_results", "imaging", "radiology", "xray", "x_ray", "ultrasound", "mri", "ct"]),
    (CanonicalField::ClinicalNotes, &["clinical_notes", "clinical_note", "notes", "note"]),
];

/// Lower-case, trim, and turn whitespace runs and hyphens into `_`.
pub fn clean_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.trim().chars() {
        if ch.is_whitespace() || ch == '-' {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('_');
        }
        pending_sep = false;
        out.extend(ch.to_lowercase());
    }
    out
}

fn tokens(key: &str) -> impl Iterator<Item = &str> {
    key.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty())
}

/// How a cleaned key relates to a variant list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchKind {
    Canonical,
    Exact,
    Partial,
}

fn match_kind(key: &str, field: CanonicalField, variants: &[&str]) -> Option<MatchKind> {
    if key == field.as_str() {
        return Some(MatchKind::Canonical);
    }
    if variants.contains(&key) {
        return Some(MatchKind::Exact);
    }
    let partial = variants.iter().any(|v| {
        if v.len() >= MIN_SUBSTRING_VARIANT {
            key.contains(v)
        } else {
            tokens(key).any(|t| t == *v)
        }
    });
    partial.then_some(MatchKind::Partial)
}

/// First canonical field (in priority order) that a key would match in
/// isolation. Useful for callers that classify a single name.
pub fn match_canonical(raw_key: &str) -> Option<CanonicalField> {
    let key = clean_key(raw_key);
    FIELD_VARIANTS
        .iter()
        .find(|(field, variants)| match_kind(&key, *field, variants).is_some())
        .map(|(field, _)| *field)
}

/// Normalize one record's raw fields. Empty input gives an empty record.
pub fn normalize(raw: &RawFields) -> PatientRecord {
    let entries: Vec<_> = raw.iter().collect();
    let cleaned: Vec<String> = entries.iter().map(|(k, _)| clean_key(k)).collect();
    let mut assigned: Vec<Option<CanonicalField>> = vec![None; entries.len()];

    for (field, variants) in FIELD_VARIANTS {
        let best = cleaned
            .iter()
            .enumerate()
            .filter(|(i, _)| assigned[*i].is_none())
            .filter_map(|(i, key)| match_kind(key, *field, variants).map(|kind| (kind, i)))
            .min();
        if let Some((_, i)) = best {
            assigned[i] = Some(*field);
        }
    }

    let mut taken: HashSet<String> = assigned
        .iter()
        .flatten()
        .map(|f| f.as_str().to_string())
        .collect();

    let mut record = PatientRecord::new();
    for (i, (_, value)) in entries.iter().enumerate() {
        let key = match assigned[i] {
            Some(field) => FieldKey::Canonical(field),
            None => FieldKey::Passthrough(unique_passthrough(&cleaned[i], &mut taken)),
        };
        record.insert(key, value.clone());
    }

    tracing::trace!(
        raw_fields = entries.len(),
        canonical = assigned.iter().flatten().count(),
        "Normalized record"
    );
    record
}

/// Cleaned name, suffixed `_2`, `_3`, ... when it collides with a canonical
/// name or an earlier key.
fn unique_passthrough(cleaned: &str, taken: &mut HashSet<String>) -> String {
    let base = if cleaned.is_empty() { UNNAMED_KEY } else { cleaned };
    let mut candidate = base.to_string();
    let mut n = 2;
    while taken.contains(&candidate) || CanonicalField::from_name(&candidate).is_some() {
        candidate = format!("{base}_{n}");
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}
