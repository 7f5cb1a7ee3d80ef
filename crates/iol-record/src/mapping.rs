use crate::extract::first_numeric_token;
use crate::record::ExportRecord;

/// How a form label sources its value from the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRule {
    /// Top-level scalar, passed through as-is.
    Scalar(&'static str),
    /// Measurement under `iolData.<group>`, reduced to its first numeric
    /// token.
    Measurement {
        group: &'static str,
        key: &'static str,
    },
}

/// Identity fields, typed before the measurement battery.
pub const IDENTITY_FIELDS: &[(&str, ValueRule)] = &[
    ("Surgeon", ValueRule::Scalar("surgeon")),
    ("Patient Initials", ValueRule::Scalar("patientInitials")),
    ("Id", ValueRule::Scalar("patientId")),
    ("Age", ValueRule::Scalar("age")),
];

/// Measurement battery. The export's `rightEye` block feeds the form's
/// Left Eye column.
pub const BIOMETRY_FIELDS: &[(&str, ValueRule)] = &[
    (
        "AL",
        ValueRule::Measurement {
            group: "rightEye",
            key: "AL",
        },
    ),
    (
        "ACD",
        ValueRule::Measurement {
            group: "rightEye",
            key: "ACD",
        },
    ),
    (
        "LT",
        ValueRule::Measurement {
            group: "rightEye",
            key: "LT",
        },
    ),
    (
        "CCT",
        ValueRule::Measurement {
            group: "rightEye",
            key: "CCT",
        },
    ),
    (
        "CD (WTW)",
        ValueRule::Measurement {
            group: "rightEye",
            key: "WTW",
        },
    ),
    (
        "K1",
        ValueRule::Measurement {
            group: "rightEye",
            key: "K1",
        },
    ),
    (
        "K2",
        ValueRule::Measurement {
            group: "rightEye",
            key: "K2",
        },
    ),
];

/// Ordered label-to-value mapping for one fill pass.
///
/// Order follows the rule table, not the page. An empty value means the
/// matching control is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(String, String)>,
}

impl FieldMap {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves a rule table against the record. Missing source fields map to
/// empty strings so the fill pass skips those controls.
pub fn build_field_map(record: &ExportRecord, rules: &[(&str, ValueRule)]) -> FieldMap {
    let entries = rules
        .iter()
        .map(|(label, rule)| {
            let value = match rule {
                ValueRule::Scalar(key) => record.scalar(key),
                ValueRule::Measurement { group, key } => {
                    first_numeric_token(&record.measurement(group, key))
                }
            };
            ((*label).to_owned(), value)
        })
        .collect();
    FieldMap { entries }
}

/// Dropdown value for the gender control. Only an absent key falls back to
/// `Female`; a present empty value passes through, and the select step
/// reports it as a no-match.
pub fn gender_choice(record: &ExportRecord) -> String {
    record
        .scalar_opt("gender")
        .unwrap_or_else(|| "Female".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(raw: &str) -> ExportRecord {
        ExportRecord::from_json(raw).unwrap()
    }

    #[test]
    fn identity_map_reads_scalars_directly() {
        let record = record(
            r#"{"surgeon":"Dr. X","patientInitials":"AB","patientId":"P-1","age":63}"#,
        );
        let map = build_field_map(&record, IDENTITY_FIELDS);
        assert_eq!(map.get("Surgeon"), Some("Dr. X"));
        assert_eq!(map.get("Patient Initials"), Some("AB"));
        assert_eq!(map.get("Id"), Some("P-1"));
        assert_eq!(map.get("Age"), Some("63"));
    }

    #[test]
    fn biometry_map_extracts_through_right_eye() {
        let record = record(
            r#"{"iolData":{"rightEye":{
                "AL":"23.50","ACD":"3.12 mm","K1":"44.20 @ 10","K2":"45.10 @ 100",
                "WTW":"11.9 / 12.1","CCT":"-"
            }}}"#,
        );
        let map = build_field_map(&record, BIOMETRY_FIELDS);
        assert_eq!(map.get("AL"), Some("23.50"));
        assert_eq!(map.get("ACD"), Some("3.12"));
        assert_eq!(map.get("K1"), Some("44.20"));
        assert_eq!(map.get("K2"), Some("45.10"));
        assert_eq!(map.get("CD (WTW)"), Some("11.9"));
        // No-data marker resolves to empty, not an error.
        assert_eq!(map.get("CCT"), Some(""));
        assert_eq!(map.get("LT"), Some(""));
    }

    #[test]
    fn missing_sources_never_fail_the_build() {
        let record = record("{}");
        let identity = build_field_map(&record, IDENTITY_FIELDS);
        let biometry = build_field_map(&record, BIOMETRY_FIELDS);
        assert_eq!(identity.len(), IDENTITY_FIELDS.len());
        assert_eq!(biometry.len(), BIOMETRY_FIELDS.len());
        assert!(identity.iter().all(|(_, v)| v.is_empty()));
        assert!(biometry.iter().all(|(_, v)| v.is_empty()));
    }

    #[test]
    fn map_preserves_rule_table_order() {
        let record = record(r#"{"surgeon":"Dr. X"}"#);
        let map = build_field_map(&record, IDENTITY_FIELDS);
        let labels: Vec<&str> = map.iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["Surgeon", "Patient Initials", "Id", "Age"]);
    }

    #[test]
    fn gender_defaults_only_when_absent() {
        assert_eq!(gender_choice(&record(r#"{"gender":"Male"}"#)), "Male");
        assert_eq!(gender_choice(&record("{}")), "Female");
        // A present empty value is not defaulted; the select step reports it.
        assert_eq!(gender_choice(&record(r#"{"gender":""}"#)), "");
    }
}
