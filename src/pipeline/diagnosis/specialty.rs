use serde::Serialize;

use crate::models::Diagnosis;

/// Conditions that share a specialty, for referral suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecialtyGroup {
    pub specialty: String,
    pub conditions: Vec<String>,
}

/// Group diagnoses by specialty. Groups appear in order of first mention and
/// keep diagnosis order inside each group.
pub fn group_by_specialty(diagnoses: &[Diagnosis]) -> Vec<SpecialtyGroup> {
    let mut groups: Vec<SpecialtyGroup> = Vec::new();
    for d in diagnoses {
        match groups.iter_mut().find(|g| g.specialty == d.specialty) {
            Some(group) => group.conditions.push(d.condition.clone()),
            None => groups.push(SpecialtyGroup {
                specialty: d.specialty.clone(),
                conditions: vec![d.condition.clone()],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_SPECIALTY;

    fn diagnosis(condition: &str, specialty: &str) -> Diagnosis {
        let mut d = Diagnosis::new(condition, 0.5);
        d.specialty = specialty.to_string();
        d
    }

    #[test]
    fn groups_in_first_mention_order() {
        let groups = group_by_specialty(&[
            diagnosis("Angina", "Cardiology"),
            diagnosis("GERD", "Gastroenterology"),
            diagnosis("Pericarditis", "Cardiology"),
            Diagnosis::new("Costochondritis", 0.4),
        ]);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].specialty, "Cardiology");
        assert_eq!(groups[0].conditions, vec!["Angina", "Pericarditis"]);
        assert_eq!(groups[1].conditions, vec!["GERD"]);
        assert_eq!(groups[2].specialty, DEFAULT_SPECIALTY);
    }

    #[test]
    fn empty_input_gives_no_groups() {
        assert!(group_by_specialty(&[]).is_empty());
    }
}
