//! Metric identities, sinks and exposition.

mod descriptor;
mod exposition;
mod sink;

pub use descriptor::{DescriptorSet, MetricDescriptor, fq_name};
pub use exposition::TextExposition;
pub use sink::{MetricSink, Sample};
