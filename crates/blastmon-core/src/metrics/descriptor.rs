//! Exported metric identities for one counter family.

use std::collections::HashMap;

use crate::counter::{SchemaDescriptor, ValueKind};

/// Suffix appended to counter-kind metric names.
const TOTAL_SUFFIX: &str = "_total";

/// Joins name parts with `_`, skipping empty ones, and appends `_total` to
/// counters that do not already carry it.
pub fn fq_name(
    namespace: &str,
    collector: &str,
    family: &str,
    field: &str,
    kind: ValueKind,
) -> String {
    let mut name = [namespace, collector, family, field]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_");

    if kind == ValueKind::Counter && !name.ends_with(TOTAL_SUFFIX) {
        name.push_str(TOTAL_SUFFIX);
    }
    name
}

/// Exported identity of one schema field.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub kind: ValueKind,
}

/// One `MetricDescriptor` per schema field, in declared order.
#[derive(Debug, Clone)]
pub struct DescriptorSet {
    family: String,
    descriptors: Vec<MetricDescriptor>,
    by_field: HashMap<&'static str, usize>,
}

impl DescriptorSet {
    pub fn new(namespace: &str, collector: &str, family: &str, schema: &SchemaDescriptor) -> Self {
        let descriptors: Vec<MetricDescriptor> = schema
            .fields()
            .iter()
            .map(|field| MetricDescriptor {
                name: fq_name(namespace, collector, family, field.exported_name, field.kind),
                help: field.help.to_string(),
                kind: field.kind,
            })
            .collect();

        let by_field = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(idx, field)| (field.exported_name, idx))
            .collect();

        Self {
            family: family.to_string(),
            descriptors,
            by_field,
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    /// Descriptor for an exported field name.
    pub fn get(&self, field: &str) -> Option<&MetricDescriptor> {
        self.by_field.get(field).map(|&idx| &self.descriptors[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::FieldSpec;

    #[test]
    fn test_fq_name() {
        assert_eq!(
            fq_name("windows", "vmware_blast", "session", "received_bytes", ValueKind::Counter),
            "windows_vmware_blast_session_received_bytes_total"
        );
        assert_eq!(
            fq_name("windows", "vmware_blast", "session", "rtt_ms", ValueKind::Gauge),
            "windows_vmware_blast_session_rtt_ms"
        );
    }

    #[test]
    fn test_fq_name_no_double_total() {
        assert_eq!(
            fq_name("windows", "vmware_blast", "imaging", "fbc_total", ValueKind::Counter),
            "windows_vmware_blast_imaging_fbc_total"
        );
    }

    #[test]
    fn test_fq_name_skips_empty_parts() {
        assert_eq!(
            fq_name("", "vmware_blast", "", "rtt_ms", ValueKind::Gauge),
            "vmware_blast_rtt_ms"
        );
    }

    #[test]
    fn test_descriptor_set_order_and_lookup() {
        let schema = SchemaDescriptor::new(
            "VMware Blast Session Counters",
            [
                FieldSpec::counter("received_bytes", "Received Bytes", "Received bytes"),
                FieldSpec::gauge("rtt_ms", "RTT", "Estimated RTT in Milliseconds"),
            ],
        )
        .unwrap();

        let set = DescriptorSet::new("windows", "vmware_blast", "session", &schema);
        assert_eq!(set.len(), 2);
        assert_eq!(set.family(), "session");

        let names: Vec<_> = set.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "windows_vmware_blast_session_received_bytes_total",
                "windows_vmware_blast_session_rtt_ms",
            ]
        );

        let rtt = set.get("rtt_ms").unwrap();
        assert_eq!(rtt.kind, ValueKind::Gauge);
        assert_eq!(rtt.help, "Estimated RTT in Milliseconds");
        assert!(set.get("jitter").is_none());
    }
}
