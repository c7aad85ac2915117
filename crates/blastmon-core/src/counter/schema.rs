//! Schema descriptors for counter objects.
//!
//! A `SchemaDescriptor` is the static table that tells the engine which raw
//! counters of one counter object to read and under which names to export
//! them. Descriptors are plain data: they are built once at startup and shared
//! read-only between the counter collector and the metric descriptor set.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

/// Exposition kind of an exported field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Point-in-time value that may rise or fall.
    Gauge,
    /// Monotonically accumulating value, exported with a `_total` suffix.
    Counter,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Gauge => "gauge",
            ValueKind::Counter => "counter",
        }
    }
}

/// How values from several instances are folded into one under
/// `Aggregation::InstancesTotal`.
///
/// Every rule returns a single instance's value unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combine {
    /// Additive counters and bandwidth figures.
    #[default]
    Sum,
    /// Latency and ratio figures (RTT, jitter, loss, queueing time).
    Average,
    /// Categorical or worst-case figures.
    Max,
    /// Value of the last instance in instance-name order.
    Last,
}

impl Combine {
    /// Folds `values` according to the rule. Returns `None` for an empty slice.
    pub fn fold(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let folded = match self {
            Combine::Sum => values.iter().sum(),
            Combine::Average => values.iter().sum::<f64>() / values.len() as f64,
            Combine::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Combine::Last => values[values.len() - 1],
        };
        Some(folded)
    }
}

/// One exported field of a counter object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field part of the exported metric name, e.g. `received_bytes`.
    pub exported_name: &'static str,
    /// Raw counter label under the counter object, e.g. `Received Bytes`.
    pub raw_label: &'static str,
    /// Help text of the exported metric.
    pub help: &'static str,
    pub kind: ValueKind,
    pub combine: Combine,
}

impl FieldSpec {
    pub const fn gauge(
        exported_name: &'static str,
        raw_label: &'static str,
        help: &'static str,
    ) -> Self {
        Self {
            exported_name,
            raw_label,
            help,
            kind: ValueKind::Gauge,
            combine: Combine::Sum,
        }
    }

    pub const fn counter(
        exported_name: &'static str,
        raw_label: &'static str,
        help: &'static str,
    ) -> Self {
        Self {
            exported_name,
            raw_label,
            help,
            kind: ValueKind::Counter,
            combine: Combine::Sum,
        }
    }

    /// Overrides the multi-instance combination rule.
    pub const fn combine(mut self, combine: Combine) -> Self {
        self.combine = combine;
        self
    }
}

/// Error type for invalid schema tables.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// Counter object name is empty.
    EmptyCounterObject,
    /// Descriptor declares no fields.
    NoFields(String),
    /// Two fields read the same raw counter.
    DuplicateRawLabel { object: String, label: String },
    /// Two fields share an exported name.
    DuplicateField { object: String, field: String },
    /// Exported name is not a valid metric name component.
    InvalidFieldName { object: String, field: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::EmptyCounterObject => write!(f, "counter object name is empty"),
            SchemaError::NoFields(object) => write!(f, "schema for \"{}\" has no fields", object),
            SchemaError::DuplicateRawLabel { object, label } => {
                write!(f, "raw counter \"{}\" mapped twice in \"{}\"", label, object)
            }
            SchemaError::DuplicateField { object, field } => {
                write!(f, "field \"{}\" declared twice in \"{}\"", field, object)
            }
            SchemaError::InvalidFieldName { object, field } => {
                write!(f, "invalid field name \"{}\" in \"{}\"", field, object)
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// Checks `[a-z_][a-z0-9_]*`.
pub(crate) fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Validated mapping from exported fields to the raw counters of one object.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    counter_object: String,
    fields: Vec<FieldSpec>,
}

impl SchemaDescriptor {
    /// Creates a descriptor, rejecting empty, duplicate or malformed entries.
    pub fn new(
        counter_object: impl Into<String>,
        fields: impl Into<Vec<FieldSpec>>,
    ) -> Result<Self, SchemaError> {
        let counter_object = counter_object.into();
        let fields = fields.into();

        if counter_object.trim().is_empty() {
            return Err(SchemaError::EmptyCounterObject);
        }
        if fields.is_empty() {
            return Err(SchemaError::NoFields(counter_object));
        }

        let mut labels = HashSet::new();
        let mut names = HashSet::new();
        for field in &fields {
            if !is_valid_name(field.exported_name) {
                return Err(SchemaError::InvalidFieldName {
                    object: counter_object,
                    field: field.exported_name.to_string(),
                });
            }
            if !labels.insert(field.raw_label) {
                return Err(SchemaError::DuplicateRawLabel {
                    object: counter_object,
                    label: field.raw_label.to_string(),
                });
            }
            if !names.insert(field.exported_name) {
                return Err(SchemaError::DuplicateField {
                    object: counter_object,
                    field: field.exported_name.to_string(),
                });
            }
        }

        Ok(Self {
            counter_object,
            fields,
        })
    }

    pub fn counter_object(&self) -> &str {
        &self.counter_object
    }

    /// Fields in declared order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Index of a field by exported name.
    pub fn position(&self, exported_name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.exported_name == exported_name)
    }

    /// Raw counter labels in declared order.
    pub fn raw_labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.raw_label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION: &[FieldSpec] = &[
        FieldSpec::counter("received_bytes", "Received Bytes", "Received bytes"),
        FieldSpec::gauge("rtt_ms", "RTT", "Estimated RTT").combine(Combine::Average),
    ];

    #[test]
    fn test_schema_preserves_declared_order() {
        let schema = SchemaDescriptor::new("Blast Session", SESSION).unwrap();
        assert_eq!(schema.counter_object(), "Blast Session");
        assert_eq!(schema.len(), 2);
        let labels: Vec<_> = schema.raw_labels().collect();
        assert_eq!(labels, vec!["Received Bytes", "RTT"]);
        assert_eq!(schema.position("rtt_ms"), Some(1));
        assert_eq!(schema.position("missing"), None);
    }

    #[test]
    fn test_schema_rejects_duplicate_raw_label() {
        let fields = [
            FieldSpec::counter("received_bytes", "Received Bytes", ""),
            FieldSpec::counter("received_bytes_again", "Received Bytes", ""),
        ];
        let err = SchemaDescriptor::new("Blast Session", fields).unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateRawLabel {
                object: "Blast Session".into(),
                label: "Received Bytes".into(),
            }
        );
    }

    #[test]
    fn test_schema_rejects_duplicate_field() {
        let fields = [
            FieldSpec::counter("bytes", "Received Bytes", ""),
            FieldSpec::counter("bytes", "Transmitted Bytes", ""),
        ];
        let err = SchemaDescriptor::new("Blast USB", fields).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { .. }));
    }

    #[test]
    fn test_schema_rejects_bad_input() {
        assert_eq!(
            SchemaDescriptor::new("  ", SESSION).unwrap_err(),
            SchemaError::EmptyCounterObject
        );
        assert_eq!(
            SchemaDescriptor::new("Blast USB", Vec::<FieldSpec>::new()).unwrap_err(),
            SchemaError::NoFields("Blast USB".into())
        );
        let fields = [FieldSpec::gauge("Rtt-ms", "RTT", "")];
        assert!(matches!(
            SchemaDescriptor::new("Blast Session", fields).unwrap_err(),
            SchemaError::InvalidFieldName { .. }
        ));
    }

    #[test]
    fn test_is_valid_name() {
        assert!(is_valid_name("received_bytes"));
        assert!(is_valid_name("_x9"));
        assert!(!is_valid_name("9lives"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("Bytes"));
    }

    #[test]
    fn test_combine_rules() {
        let values = [100.0, 300.0, 200.0];
        assert_eq!(Combine::Sum.fold(&values), Some(600.0));
        assert_eq!(Combine::Average.fold(&values), Some(200.0));
        assert_eq!(Combine::Max.fold(&values), Some(300.0));
        assert_eq!(Combine::Last.fold(&values), Some(200.0));
        assert_eq!(Combine::Sum.fold(&[]), None);
    }

    #[test]
    fn test_combine_single_value_unchanged() {
        for rule in [Combine::Sum, Combine::Average, Combine::Max, Combine::Last] {
            assert_eq!(rule.fold(&[12.5]), Some(12.5));
        }
    }
}
