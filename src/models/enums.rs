use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            /// Case-insensitive, whitespace-tolerant parse used when repairing model output.
            pub fn parse_lenient(s: &str) -> Option<Self> {
                let trimmed = s.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($s) {
                        return Some(Self::$variant);
                    }
                )+
                None
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(RiskLevel {
    High => "High",
    Medium => "Medium",
    Low => "Low",
});

str_enum!(Urgency {
    High => "HIGH",
    Medium => "MEDIUM",
});

str_enum!(EvidenceStrength {
    Strong => "Strong",
    Moderate => "Moderate",
    Weak => "Weak",
    Insufficient => "Insufficient",
});

str_enum!(ArtifactKind {
    Tabular => "tabular",
    StructuredObject => "structured-object",
    PlainText => "plain-text",
    Document => "document",
});

impl Default for RiskLevel {
    fn default() -> Self {
        Self::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn risk_level_round_trips_through_str() {
        for level in [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low] {
            assert_eq!(RiskLevel::from_str(level.as_str()).unwrap(), level);
        }
    }

    #[test]
    fn invalid_value_is_a_database_error() {
        let err = RiskLevel::from_str("Severe").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }

    #[test]
    fn lenient_parse_ignores_case_and_padding() {
        assert_eq!(RiskLevel::parse_lenient(" high "), Some(RiskLevel::High));
        assert_eq!(Urgency::parse_lenient("medium"), Some(Urgency::Medium));
        assert_eq!(EvidenceStrength::parse_lenient("WEAK"), Some(EvidenceStrength::Weak));
        assert_eq!(RiskLevel::parse_lenient("critical"), None);
    }

    #[test]
    fn serde_uses_wire_strings() {
        assert_eq!(serde_json::to_string(&Urgency::High).unwrap(), "\"HIGH\"");
        assert_eq!(serde_json::to_string(&RiskLevel::Low).unwrap(), "\"Low\"");
        let kind: ArtifactKind = serde_json::from_str("\"structured-object\"").unwrap();
        assert_eq!(kind, ArtifactKind::StructuredObject);
    }

    #[test]
    fn default_risk_level_is_medium() {
        assert_eq!(RiskLevel::default(), RiskLevel::Medium);
    }
}
