//! Counter-query providers.
//!
//! A provider is the OS side of the engine: it opens counter objects by name,
//! lists the raw counters they expose, and reads the instances present right
//! now. The engine only ever talks to the `CounterProvider` trait, so tests
//! and demos can swap in the in-memory fake.
//!
//! ```text
//!            ┌──────────────────┐
//!            │ CounterCollector │
//!            └────────┬─────────┘
//!                     │
//!            ┌────────▼────────┐
//!            │ CounterProvider │ (trait)
//!            └────────┬────────┘
//!          ┌──────────┴───────────┐
//!   ┌──────▼────────────┐  ┌──────▼───────┐
//!   │ FsCounterProvider │  │ MockProvider │
//!   └──────┬────────────┘  └──────────────┘
//!   ┌──────▼─────┐
//!   │ FileSystem │ (RealFs / MockFs)
//!   └────────────┘
//! ```

pub mod fs;
pub mod mock;
mod parser;
pub mod traits;

use std::collections::HashMap;
use std::fmt;

pub use fs::FsCounterProvider;
pub use mock::{MockFs, MockProvider};
pub use traits::{FileSystem, RealFs};

/// Opaque handle to one opened counter object.
///
/// Not `Clone`: a handle has exactly one owner and is given back to the
/// provider by value on close.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ProviderHandle {
    id: u64,
    object: String,
}

impl ProviderHandle {
    pub fn new(id: u64, object: impl Into<String>) -> Self {
        Self {
            id,
            object: object.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Counter object this handle was opened for.
    pub fn object(&self) -> &str {
        &self.object
    }
}

/// One instance of a counter object as reported by the provider.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawInstance {
    pub name: String,
    /// Samples keyed by raw counter label.
    pub values: HashMap<String, f64>,
}

impl RawInstance {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: HashMap::new(),
        }
    }

    /// Builder-style setter for one raw counter.
    pub fn with(mut self, label: impl Into<String>, value: f64) -> Self {
        self.values.insert(label.into(), value);
        self
    }

    pub fn value(&self, label: &str) -> Option<f64> {
        self.values.get(label).copied()
    }
}

/// Error type for provider failures.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Counter object does not exist.
    NotFound(String),
    /// Handle is unknown or already closed.
    InvalidHandle(u64),
    /// I/O error talking to the counter source.
    Io(String),
    /// Counter data could not be parsed.
    Parse(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::NotFound(object) => write!(f, "counter object {} not found", object),
            ProviderError::InvalidHandle(id) => write!(f, "invalid handle {}", id),
            ProviderError::Io(msg) => write!(f, "I/O error: {}", msg),
            ProviderError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<std::io::Error> for ProviderError {
    fn from(e: std::io::Error) -> Self {
        ProviderError::Io(e.to_string())
    }
}

/// Source of performance-counter data.
pub trait CounterProvider: Send + Sync {
    /// Opens a counter object by name.
    fn open_counter_object(&self, name: &str) -> Result<ProviderHandle, ProviderError>;

    /// Lists the raw counter labels the object exposes, independent of
    /// whether any instance is currently present.
    fn counter_labels(&self, handle: &ProviderHandle) -> Result<Vec<String>, ProviderError>;

    /// Reads every instance currently present, restricted to `labels`.
    fn read_instances(
        &self,
        handle: &ProviderHandle,
        labels: &[&str],
    ) -> Result<Vec<RawInstance>, ProviderError>;

    /// Releases the handle.
    fn close_counter_object(&self, handle: ProviderHandle);
}
