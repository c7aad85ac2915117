//! Metric sinks.

use serde::Serialize;

use super::descriptor::MetricDescriptor;
use crate::counter::ValueKind;

/// One exported value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub name: String,
    pub help: String,
    pub kind: ValueKind,
    pub value: f64,
}

impl Sample {
    pub fn new(descriptor: &MetricDescriptor, value: f64) -> Self {
        Self {
            name: descriptor.name.clone(),
            help: descriptor.help.clone(),
            kind: descriptor.kind,
            value,
        }
    }
}

/// Destination for samples produced by a scrape.
pub trait MetricSink {
    fn emit(&mut self, sample: Sample);
}

/// Buffers samples in emission order.
impl MetricSink for Vec<Sample> {
    fn emit(&mut self, sample: Sample) {
        self.push(sample);
    }
}

impl<S: MetricSink + ?Sized> MetricSink for &mut S {
    fn emit(&mut self, sample: Sample) {
        (**self).emit(sample);
    }
}
