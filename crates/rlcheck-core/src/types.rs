//! Core types for rlcheck

use serde::{Deserialize, Serialize};

/// Well-known column names
pub mod fields {
    /// Kind of indicator (`IP Address`, `Domain`, `URL`, ...)
    pub const THREAT_TYPE: &str = "ThreatType";

    /// The indicator value sent to the classifier
    pub const INDICATOR: &str = "Indicator";

    /// Risk level reported by the classifier
    pub const RISK_LEVEL: &str = "BC_RiskLevel";

    /// Comma-joined category names reported by the classifier
    pub const CATEGORY: &str = "BC_Category";

    /// Columns every input file must carry
    pub const REQUIRED: [&str; 2] = [THREAT_TYPE, INDICATOR];

    /// Columns appended to every output file
    pub const DERIVED: [&str; 2] = [RISK_LEVEL, CATEGORY];
}

/// One input row, kept as an ordered list of `(field, value)` pairs
///
/// The record is moved from stage to stage (ingestion, queue, worker, sink);
/// only the worker holding it mutates it, to add the derived fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorRecord {
    fields: Vec<(String, String)>,
}

impl IndicatorRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a header row and a value row
    ///
    /// Missing trailing values become empty strings; values without a header are dropped.
    pub fn from_row<H, V>(headers: &[H], values: &[V]) -> Self
    where
        H: AsRef<str>,
        V: AsRef<str>,
    {
        let fields = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let value = values.get(i).map(|v| v.as_ref()).unwrap_or_default();
                (header.as_ref().to_string(), value.to_string())
            })
            .collect();
        Self { fields }
    }

    /// Builder-style field setter
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Get a field value
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    /// Set a field, replacing it in place or appending it at the end
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    /// The indicator value, empty if the column is absent
    pub fn indicator(&self) -> &str {
        self.get(fields::INDICATOR).unwrap_or_default()
    }

    /// The threat type, empty if the column is absent
    pub fn threat_type(&self) -> &str {
        self.get(fields::THREAT_TYPE).unwrap_or_default()
    }

    /// All fields in order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Values laid out along `schema`; absent fields yield empty strings
    pub fn values_for<'a>(&'a self, schema: &'a [String]) -> impl Iterator<Item = &'a str> {
        schema
            .iter()
            .map(move |column| self.get(column).unwrap_or_default())
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Output schema for a given input header row: the input columns followed by
/// the derived classifier columns.
pub fn output_schema<H: AsRef<str>>(input_headers: &[H]) -> Vec<String> {
    let mut schema: Vec<String> = input_headers
        .iter()
        .map(|h| h.as_ref().to_string())
        .collect();
    for derived in fields::DERIVED {
        if !schema.iter().any(|column| column == derived) {
            schema.push(derived.to_string());
        }
    }
    schema
}

/// Outcome tag sent from a worker to the stats aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatEvent {
    /// Already covered by the existing policy
    Blocked,
    /// Needs to be added to the policy
    Policy,
    /// Could not be classified
    Error,
}

impl StatEvent {
    /// Lowercase tag, also used as the output file role
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocked => "blocked",
            Self::Policy => "policy",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for StatEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_row_pads_and_truncates() {
        let headers = ["ThreatType", "Indicator", "Source"];

        let short = IndicatorRecord::from_row(&headers, &["Domain", "example.org"]);
        assert_eq!(short.get("Source"), Some(""));
        assert_eq!(short.len(), 3);

        let long = IndicatorRecord::from_row(&headers, &["URL", "http://x", "feed", "extra"]);
        assert_eq!(long.len(), 3);
        assert_eq!(long.get("Source"), Some("feed"));
    }

    #[test]
    fn test_set_replaces_in_place_and_appends() {
        let mut record = IndicatorRecord::new()
            .with("ThreatType", "IP Address")
            .with("Indicator", "8.8.8.8");

        record.set("Indicator", "1.1.1.1");
        record.set(fields::RISK_LEVEL, "9");

        let names: Vec<&str> = record.fields().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["ThreatType", "Indicator", "BC_RiskLevel"]);
        assert_eq!(record.indicator(), "1.1.1.1");
        assert_eq!(record.threat_type(), "IP Address");
    }

    #[test]
    fn test_values_for_schema() {
        let record = IndicatorRecord::new()
            .with("Indicator", "example.org")
            .with("ThreatType", "Domain");
        let schema = output_schema(&["ThreatType", "Indicator"]);

        let values: Vec<&str> = record.values_for(&schema).collect();
        assert_eq!(values, vec!["Domain", "example.org", "", ""]);
    }

    #[test]
    fn test_output_schema_does_not_duplicate_derived_columns() {
        let schema = output_schema(&["Indicator", "ThreatType", "BC_Category"]);
        assert_eq!(
            schema,
            vec!["Indicator", "ThreatType", "BC_Category", "BC_RiskLevel"]
        );
    }

    #[test]
    fn test_stat_event_tags() {
        assert_eq!(StatEvent::Blocked.as_str(), "blocked");
        assert_eq!(StatEvent::Policy.to_string(), "policy");
        assert_eq!(StatEvent::Error.as_str(), "error");
    }
}
