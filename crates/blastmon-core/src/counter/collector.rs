//! Generic polling engine binding one schema to one counter object.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use super::record::TypedRecord;
use super::schema::SchemaDescriptor;
use crate::provider::{CounterProvider, ProviderError, ProviderHandle, RawInstance};

/// Instance name providers use for a pre-computed total.
pub const TOTAL_INSTANCE: &str = "_Total";

/// How multi-instance samples are shaped into records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregation {
    /// Collapse all instances into one record named `_Total`.
    #[default]
    InstancesTotal,
    /// One record per instance, sorted by instance name.
    AllInstances,
}

/// Error type for counter collection failures.
#[derive(Debug, Clone, PartialEq)]
pub enum CounterError {
    /// Provider does not expose the counter object.
    CounterObjectNotFound(String),
    /// A raw counter label does not exist under the object.
    SchemaMismatch { object: String, label: String },
    /// The object currently has no instances (feature inactive).
    NoInstancesPresent(String),
    /// Transient read failure.
    QueryFailed { object: String, reason: String },
    /// Collector was used before `build`.
    NotBuilt,
    /// Collector was used after `close`.
    Closed,
}

impl CounterError {
    fn query_failed(object: &str, reason: impl fmt::Display) -> Self {
        CounterError::QueryFailed {
            object: object.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Expected condition that should not be alarmed on.
    pub fn is_no_instances(&self) -> bool {
        matches!(self, CounterError::NoInstancesPresent(_))
    }
}

impl fmt::Display for CounterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterError::CounterObjectNotFound(object) => {
                write!(f, "counter object \"{}\" not found", object)
            }
            CounterError::SchemaMismatch { object, label } => {
                write!(f, "raw counter \"{}\" not found under \"{}\"", label, object)
            }
            CounterError::NoInstancesPresent(object) => {
                write!(f, "no instances present for \"{}\"", object)
            }
            CounterError::QueryFailed { object, reason } => {
                write!(f, "query on \"{}\" failed: {}", object, reason)
            }
            CounterError::NotBuilt => write!(f, "collector not built"),
            CounterError::Closed => write!(f, "collector closed"),
        }
    }
}

impl std::error::Error for CounterError {}

/// Polls one counter object through a provider.
///
/// Owns its provider handle exclusively. The handle is released by `close`
/// or on drop, whichever comes first, and never twice.
pub struct CounterCollector<P: CounterProvider + ?Sized> {
    provider: Arc<P>,
    schema: Arc<SchemaDescriptor>,
    aggregation: Aggregation,
    handle: Option<ProviderHandle>,
}

impl<P: CounterProvider + ?Sized> CounterCollector<P> {
    /// Opens the schema's counter object and checks that every raw counter
    /// label resolves.
    pub fn build(
        provider: Arc<P>,
        schema: Arc<SchemaDescriptor>,
        aggregation: Aggregation,
    ) -> Result<Self, CounterError> {
        let object = schema.counter_object();

        let handle = provider
            .open_counter_object(object)
            .map_err(|e| match e {
                ProviderError::NotFound(_) => CounterError::CounterObjectNotFound(object.into()),
                other => CounterError::query_failed(object, other),
            })?;

        let labels = match provider.counter_labels(&handle) {
            Ok(labels) => labels,
            Err(e) => {
                provider.close_counter_object(handle);
                return Err(CounterError::query_failed(object, e));
            }
        };

        if let Some(missing) = schema
            .raw_labels()
            .find(|wanted| !labels.iter().any(|l| l == wanted))
        {
            provider.close_counter_object(handle);
            return Err(CounterError::SchemaMismatch {
                object: object.to_string(),
                label: missing.to_string(),
            });
        }

        debug!(object, fields = schema.len(), "counter object resolved");

        Ok(Self {
            provider,
            schema,
            aggregation,
            handle: Some(handle),
        })
    }

    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// Reads the instances present now and shapes them per the aggregation
    /// policy.
    ///
    /// Under `InstancesTotal` a successful poll always returns exactly one
    /// record.
    pub fn poll(&self) -> Result<Vec<TypedRecord>, CounterError> {
        let handle = self.handle.as_ref().ok_or(CounterError::Closed)?;
        let object = self.schema.counter_object();
        let labels: Vec<&str> = self.schema.raw_labels().collect();

        let mut instances = self
            .provider
            .read_instances(handle, &labels)
            .map_err(|e| CounterError::query_failed(object, e))?;
        instances.sort_by(|a, b| a.name.cmp(&b.name));

        trace!(object, instances = instances.len(), "instances read");

        match self.aggregation {
            Aggregation::InstancesTotal => self.collapse_to_total(&instances).map(|r| vec![r]),
            Aggregation::AllInstances => {
                let records = instances
                    .iter()
                    .filter(|i| i.name != TOTAL_INSTANCE)
                    .map(|i| {
                        self.extract(i)
                            .map(|values| self.record(i.name.as_str(), 1, values))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if records.is_empty() {
                    return Err(CounterError::NoInstancesPresent(object.to_string()));
                }
                Ok(records)
            }
        }
    }

    /// Releases the provider handle. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!(object = self.schema.counter_object(), "closing counter object");
            self.provider.close_counter_object(handle);
        }
    }

    fn collapse_to_total(&self, instances: &[RawInstance]) -> Result<TypedRecord, CounterError> {
        let object = self.schema.counter_object();
        if instances.is_empty() {
            return Err(CounterError::NoInstancesPresent(object.to_string()));
        }

        let members = instances
            .iter()
            .filter(|i| i.name != TOTAL_INSTANCE)
            .count();

        // Prefer the provider's own total when it reports one.
        if let Some(total) = instances.iter().find(|i| i.name == TOTAL_INSTANCE) {
            let values = self.extract(total)?;
            return Ok(self.record(TOTAL_INSTANCE, members, values));
        }

        let rows = instances
            .iter()
            .map(|i| self.extract(i))
            .collect::<Result<Vec<_>, _>>()?;

        let mut column = Vec::with_capacity(rows.len());
        let values = self
            .schema
            .fields()
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                column.clear();
                column.extend(rows.iter().map(|row| row[idx]));
                field.combine.fold(&column).unwrap_or_default()
            })
            .collect();

        Ok(self.record(TOTAL_INSTANCE, members, values))
    }

    /// Pulls the schema's raw counters out of one instance in declared order.
    fn extract(&self, instance: &RawInstance) -> Result<Vec<f64>, CounterError> {
        self.schema
            .fields()
            .iter()
            .map(|field| {
                instance.value(field.raw_label).ok_or_else(|| {
                    CounterError::query_failed(
                        self.schema.counter_object(),
                        format!(
                            "raw counter \"{}\" missing from instance \"{}\"",
                            field.raw_label, instance.name
                        ),
                    )
                })
            })
            .collect()
    }

    fn record(&self, instance: &str, instances: usize, values: Vec<f64>) -> TypedRecord {
        TypedRecord::new(self.schema.clone(), instance, instances, values)
    }
}

impl<P: CounterProvider + ?Sized> Drop for CounterCollector<P> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::schema::{Combine, FieldSpec};
    use crate::provider::MockProvider;

    fn bytes_schema() -> Arc<SchemaDescriptor> {
        Arc::new(
            SchemaDescriptor::new(
                "Blast USB",
                [FieldSpec::counter("bytes", "Bytes", "Bytes moved")],
            )
            .unwrap(),
        )
    }

    fn session_schema() -> Arc<SchemaDescriptor> {
        Arc::new(
            SchemaDescriptor::new(
                "Blast Session",
                [
                    FieldSpec::counter("received_bytes", "Received Bytes", ""),
                    FieldSpec::gauge("rtt_ms", "RTT", "").combine(Combine::Average),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_build_object_not_found() {
        let provider = Arc::new(MockProvider::new());
        let err =
            CounterCollector::build(provider.clone(), bytes_schema(), Aggregation::InstancesTotal)
                .err()
                .unwrap();
        assert_eq!(err, CounterError::CounterObjectNotFound("Blast USB".into()));
        assert_eq!(provider.open_handles(), 0);
    }

    #[test]
    fn test_build_schema_mismatch_releases_handle() {
        let provider = Arc::new(MockProvider::new());
        provider.add_object("Blast USB", &["Received Bytes"]);

        let err =
            CounterCollector::build(provider.clone(), bytes_schema(), Aggregation::InstancesTotal)
                .err()
                .unwrap();
        assert_eq!(
            err,
            CounterError::SchemaMismatch {
                object: "Blast USB".into(),
                label: "Bytes".into(),
            }
        );
        assert_eq!(provider.open_handles(), 0);
        assert_eq!(provider.close_calls(), 1);
    }

    #[test]
    fn test_instances_total_sums_instances() {
        let provider = Arc::new(MockProvider::new());
        provider.add_object("Blast USB", &["Bytes"]);
        provider.set_instances(
            "Blast USB",
            vec![
                RawInstance::new("b").with("Bytes", 200.0),
                RawInstance::new("a").with("Bytes", 100.0),
            ],
        );

        let collector =
            CounterCollector::build(provider, bytes_schema(), Aggregation::InstancesTotal).unwrap();
        let records = collector.poll().unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("bytes"), Some(300.0));
        assert_eq!(records[0].instance(), TOTAL_INSTANCE);
        assert_eq!(records[0].instances(), 2);
    }

    #[test]
    fn test_instances_total_single_instance_unchanged() {
        let provider = Arc::new(MockProvider::new());
        provider.add_object("Blast Session", &["Received Bytes", "RTT"]);
        provider.set_instances(
            "Blast Session",
            vec![
                RawInstance::new("session-1")
                    .with("Received Bytes", 1024.0)
                    .with("RTT", 12.5),
            ],
        );

        let collector =
            CounterCollector::build(provider, session_schema(), Aggregation::InstancesTotal)
                .unwrap();
        let records = collector.poll().unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].values(), &[1024.0, 12.5]);
    }

    #[test]
    fn test_instances_total_applies_field_rules() {
        let provider = Arc::new(MockProvider::new());
        provider.add_object("Blast Session", &["Received Bytes", "RTT"]);
        provider.set_instances(
            "Blast Session",
            vec![
                RawInstance::new("s1").with("Received Bytes", 10.0).with("RTT", 10.0),
                RawInstance::new("s2").with("Received Bytes", 30.0).with("RTT", 20.0),
            ],
        );

        let collector =
            CounterCollector::build(provider, session_schema(), Aggregation::InstancesTotal)
                .unwrap();
        let record = collector.poll().unwrap().remove(0);

        assert_eq!(record.get("received_bytes"), Some(40.0));
        assert_eq!(record.get("rtt_ms"), Some(15.0));
    }

    #[test]
    fn test_instances_total_prefers_provider_total() {
        let provider = Arc::new(MockProvider::new());
        provider.add_object("Blast USB", &["Bytes"]);
        provider.set_instances(
            "Blast USB",
            vec![
                RawInstance::new("a").with("Bytes", 100.0),
                RawInstance::new(TOTAL_INSTANCE).with("Bytes", 500.0),
                RawInstance::new("b").with("Bytes", 200.0),
            ],
        );

        let collector =
            CounterCollector::build(provider, bytes_schema(), Aggregation::InstancesTotal).unwrap();
        let record = collector.poll().unwrap().remove(0);

        assert_eq!(record.get("bytes"), Some(500.0));
        assert_eq!(record.instances(), 2);
    }

    #[test]
    fn test_poll_no_instances() {
        let provider = Arc::new(MockProvider::new());
        provider.add_object("Blast USB", &["Bytes"]);

        let collector =
            CounterCollector::build(provider, bytes_schema(), Aggregation::InstancesTotal).unwrap();
        let err = collector.poll().unwrap_err();

        assert!(err.is_no_instances());
        assert_eq!(err, CounterError::NoInstancesPresent("Blast USB".into()));
    }

    #[test]
    fn test_poll_query_failed() {
        let provider = Arc::new(MockProvider::new());
        provider.add_object("Blast USB", &["Bytes"]);
        provider.set_read_failure("Blast USB", Some("device busy"));

        let collector =
            CounterCollector::build(provider, bytes_schema(), Aggregation::InstancesTotal).unwrap();
        let err = collector.poll().unwrap_err();

        match err {
            CounterError::QueryFailed { object, reason } => {
                assert_eq!(object, "Blast USB");
                assert!(reason.contains("device busy"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_poll_missing_counter_in_instance() {
        let provider = Arc::new(MockProvider::new());
        provider.add_object("Blast USB", &["Bytes"]);
        provider.set_instances("Blast USB", vec![RawInstance::new("a")]);

        let collector =
            CounterCollector::build(provider, bytes_schema(), Aggregation::InstancesTotal).unwrap();
        let err = collector.poll().unwrap_err();

        assert!(matches!(err, CounterError::QueryFailed { .. }));
        assert!(err.to_string().contains("missing from instance \"a\""));
    }

    #[test]
    fn test_all_instances_sorted_without_total() {
        let provider = Arc::new(MockProvider::new());
        provider.add_object("Blast USB", &["Bytes"]);
        provider.set_instances(
            "Blast USB",
            vec![
                RawInstance::new("z").with("Bytes", 1.0),
                RawInstance::new(TOTAL_INSTANCE).with("Bytes", 3.0),
                RawInstance::new("m").with("Bytes", 2.0),
            ],
        );

        let collector =
            CounterCollector::build(provider, bytes_schema(), Aggregation::AllInstances).unwrap();
        let records = collector.poll().unwrap();

        let names: Vec<_> = records.iter().map(|r| r.instance()).collect();
        assert_eq!(names, vec!["m", "z"]);
        assert_eq!(records[0].get("bytes"), Some(2.0));
    }

    #[test]
    fn test_close_is_idempotent() {
        let provider = Arc::new(MockProvider::new());
        provider.add_object("Blast USB", &["Bytes"]);

        let mut collector =
            CounterCollector::build(provider.clone(), bytes_schema(), Aggregation::InstancesTotal)
                .unwrap();
        assert_eq!(provider.open_handles(), 1);

        collector.close();
        collector.close();

        assert!(collector.is_closed());
        assert_eq!(provider.open_handles(), 0);
        assert_eq!(provider.close_calls(), 1);
        assert_eq!(collector.poll().unwrap_err(), CounterError::Closed);

        drop(collector);
        assert_eq!(provider.close_calls(), 1);
    }

    #[test]
    fn test_drop_releases_handle() {
        let provider = Arc::new(MockProvider::new());
        provider.add_object("Blast USB", &["Bytes"]);

        {
            let _collector = CounterCollector::build(
                provider.clone(),
                bytes_schema(),
                Aggregation::InstancesTotal,
            )
            .unwrap();
            assert_eq!(provider.open_handles(), 1);
        }

        assert_eq!(provider.open_handles(), 0);
    }
}
