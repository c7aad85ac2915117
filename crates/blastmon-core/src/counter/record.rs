//! Typed records produced by one poll of a counter object.

use std::sync::Arc;

use super::schema::{FieldSpec, SchemaDescriptor};

/// Fixed-shape value set for one (possibly aggregated) counter instance.
///
/// Values are stored in the schema's declared field order, so iteration is
/// deterministic regardless of the order the provider reported instances in.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRecord {
    schema: Arc<SchemaDescriptor>,
    instance: String,
    instances: usize,
    values: Vec<f64>,
}

impl TypedRecord {
    pub(crate) fn new(
        schema: Arc<SchemaDescriptor>,
        instance: impl Into<String>,
        instances: usize,
        values: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(schema.len(), values.len());
        Self {
            schema,
            instance: instance.into(),
            instances,
            values,
        }
    }

    /// Instance name, `_Total` for an aggregated record.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Number of raw instances folded into this record.
    pub fn instances(&self) -> usize {
        self.instances
    }

    /// Sample for an exported field name.
    pub fn get(&self, exported_name: &str) -> Option<f64> {
        self.schema
            .position(exported_name)
            .and_then(|idx| self.values.get(idx).copied())
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Fields and samples in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldSpec, f64)> + '_ {
        self.schema
            .fields()
            .iter()
            .zip(self.values.iter().copied())
    }
}
