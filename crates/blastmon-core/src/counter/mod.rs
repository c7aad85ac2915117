//! Typed performance-counter engine.
//!
//! A `SchemaDescriptor` names a counter object and the raw counters to read
//! from it; a `CounterCollector` binds one descriptor to a provider handle and
//! turns each poll into `TypedRecord`s.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use blastmon_core::counter::{Aggregation, CounterCollector, FieldSpec, SchemaDescriptor};
//! use blastmon_core::provider::{MockProvider, RawInstance};
//!
//! let provider = Arc::new(MockProvider::new());
//! provider.add_object("Blast USB", &["Received Bytes"]);
//! provider.set_instances(
//!     "Blast USB",
//!     vec![RawInstance::new("usb-1").with("Received Bytes", 42.0)],
//! );
//!
//! let schema = SchemaDescriptor::new(
//!     "Blast USB",
//!     [FieldSpec::counter("received_bytes", "Received Bytes", "Received Bytes")],
//! )
//! .unwrap();
//!
//! let collector =
//!     CounterCollector::build(provider, Arc::new(schema), Aggregation::InstancesTotal).unwrap();
//! let records = collector.poll().unwrap();
//! assert_eq!(records[0].get("received_bytes"), Some(42.0));
//! ```

mod collector;
mod record;
mod schema;

pub use collector::{Aggregation, CounterCollector, CounterError, TOTAL_INSTANCE};
pub use record::TypedRecord;
pub use schema::{Combine, FieldSpec, SchemaDescriptor, SchemaError, ValueKind};
pub(crate) use schema::is_valid_name;
