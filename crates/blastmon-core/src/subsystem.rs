//! One counter family: a counter collector plus its metric descriptors.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::counter::{Aggregation, CounterCollector, CounterError, SchemaDescriptor};
use crate::metrics::{DescriptorSet, MetricSink, Sample};
use crate::provider::CounterProvider;

enum State<P: CounterProvider + ?Sized> {
    Unbuilt,
    Built {
        counter: CounterCollector<P>,
        descriptors: DescriptorSet,
    },
    Closed,
}

/// Lifecycle state, as reported in status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Unbuilt,
    Built,
    Closed,
}

/// Collector for one logical counter family, e.g. `session`.
///
/// `Unbuilt --build--> Built --collect*--> Built --close--> Closed`
pub struct SubsystemCollector<P: CounterProvider + ?Sized = dyn CounterProvider> {
    family: String,
    namespace: String,
    collector: String,
    provider: Arc<P>,
    schema: Arc<SchemaDescriptor>,
    state: State<P>,
    last_instances: usize,
}

impl<P: CounterProvider + ?Sized> SubsystemCollector<P> {
    /// Creates an unbuilt collector. Metric names are
    /// `<namespace>_<collector>_<family>_<field>`.
    pub fn new(
        provider: Arc<P>,
        namespace: impl Into<String>,
        collector: impl Into<String>,
        family: impl Into<String>,
        schema: SchemaDescriptor,
    ) -> Self {
        Self {
            family: family.into(),
            namespace: namespace.into(),
            collector: collector.into(),
            provider,
            schema: Arc::new(schema),
            state: State::Unbuilt,
            last_instances: 0,
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn counter_object(&self) -> &str {
        self.schema.counter_object()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match self.state {
            State::Unbuilt => Lifecycle::Unbuilt,
            State::Built { .. } => Lifecycle::Built,
            State::Closed => Lifecycle::Closed,
        }
    }

    /// Raw instances folded into the last successful poll.
    pub fn last_instances(&self) -> usize {
        self.last_instances
    }

    /// Resolves the counter object and builds the metric descriptors.
    pub fn build(&mut self) -> Result<(), CounterError> {
        match self.state {
            State::Built { .. } => return Ok(()),
            State::Closed => return Err(CounterError::Closed),
            State::Unbuilt => {}
        }

        let counter = CounterCollector::build(
            self.provider.clone(),
            self.schema.clone(),
            Aggregation::InstancesTotal,
        )?;
        let descriptors =
            DescriptorSet::new(&self.namespace, &self.collector, &self.family, &self.schema);

        info!(
            family = %self.family,
            object = self.schema.counter_object(),
            metrics = descriptors.len(),
            "family built"
        );

        self.state = State::Built {
            counter,
            descriptors,
        };
        Ok(())
    }

    /// Polls once and emits every field in declared order.
    ///
    /// Emits nothing when the poll fails. Returns the number of samples
    /// emitted.
    pub fn collect(&mut self, sink: &mut dyn MetricSink) -> Result<usize, CounterError> {
        let (counter, descriptors) = match &self.state {
            State::Built {
                counter,
                descriptors,
            } => (counter, descriptors),
            State::Unbuilt => return Err(CounterError::NotBuilt),
            State::Closed => return Err(CounterError::Closed),
        };

        let records = counter.poll()?;

        let mut emitted = 0;
        let mut instances = 0;
        for record in &records {
            instances += record.instances();
            for ((field, value), descriptor) in record.iter().zip(descriptors.iter()) {
                debug_assert_eq!(field.kind, descriptor.kind);
                sink.emit(Sample::new(descriptor, value));
                emitted += 1;
            }
        }
        self.last_instances = instances;

        debug!(family = %self.family, samples = emitted, instances, "family collected");
        Ok(emitted)
    }

    /// Releases the counter handle. Safe to call in any state, repeatedly.
    pub fn close(&mut self) {
        if let State::Built { mut counter, .. } =
            std::mem::replace(&mut self.state, State::Closed)
        {
            counter.close();
            debug!(family = %self.family, "family closed");
        }
    }
}
