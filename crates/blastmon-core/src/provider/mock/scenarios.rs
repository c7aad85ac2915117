//! Pre-built mock provider scenarios for tests and demo mode.

use super::provider::MockProvider;
use crate::families::{BLAST_FAMILIES, FamilyDef};
use crate::provider::RawInstance;

/// Instance populated with a deterministic value per raw counter.
fn synthetic_instance(family: &FamilyDef, name: &str, scale: f64) -> RawInstance {
    family
        .fields
        .iter()
        .enumerate()
        .fold(RawInstance::new(name), |instance, (idx, field)| {
            instance.with(field.raw_label, scale * (idx + 1) as f64)
        })
}

impl MockProvider {
    /// A Horizon agent host with one active Blast session.
    ///
    /// Every Blast family is registered. Session has two instances (the
    /// primary connection and a reconnect), Printing has none, and every
    /// other family has a single channel instance.
    pub fn typical_blast_host() -> Self {
        let provider = Self::new();

        for family in BLAST_FAMILIES {
            let labels: Vec<&str> = family.fields.iter().map(|f| f.raw_label).collect();
            provider.add_object(family.counter_object, &labels);

            let instances = match family.name {
                "printing" => Vec::new(),
                "session" => vec![
                    synthetic_instance(family, "session-1", 10.0)
                        .with("Received Bytes", 1024.0)
                        .with("RTT", 12.5)
                        .with("Jitter (Uplink)", 2.0)
                        .with("Packet Loss (Uplink)", 0.5),
                    synthetic_instance(family, "session-2", 20.0)
                        .with("Received Bytes", 2048.0)
                        .with("RTT", 17.5)
                        .with("Jitter (Uplink)", 4.0)
                        .with("Packet Loss (Uplink)", 1.5),
                ],
                _ => vec![synthetic_instance(family, "channel-0", 100.0)],
            };
            provider.set_instances(family.counter_object, instances);
        }

        provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::CounterProvider;

    #[test]
    fn test_typical_blast_host_registers_all_families() {
        let provider = MockProvider::typical_blast_host();

        for family in BLAST_FAMILIES {
            let handle = provider.open_counter_object(family.counter_object).unwrap();
            let labels = provider.counter_labels(&handle).unwrap();
            assert_eq!(labels.len(), family.fields.len(), "{}", family.name);
            provider.close_counter_object(handle);
        }
        assert_eq!(provider.open_handles(), 0);
    }

    #[test]
    fn test_typical_blast_host_instances() {
        let provider = MockProvider::typical_blast_host();

        let session = provider
            .open_counter_object("VMware Blast Session Counters")
            .unwrap();
        let instances = provider.read_instances(&session, &["RTT"]).unwrap();
        assert_eq!(instances.len(), 2);
        provider.close_counter_object(session);

        let printing = provider
            .open_counter_object("VMware Blast Printing Counters")
            .unwrap();
        assert!(provider
            .read_instances(&printing, &["Received Bytes"])
            .unwrap()
            .is_empty());
        provider.close_counter_object(printing);
    }
}
