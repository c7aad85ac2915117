//! blastmon-core: typed performance-counter collection for VMware Blast.
//!
//! Provides:
//! - `counter`: schema descriptors, typed records, the polling engine
//! - `provider`: counter-query providers (file tree, in-memory fake)
//! - `metrics`: metric descriptors, sinks, Prometheus text exposition
//! - `subsystem`: one counter family with its build/collect/close lifecycle
//! - `orchestrator`: all families per scrape, with per-family failure isolation
//! - `families`: the VMware Blast family tables
//! - `config`: collector configuration

pub mod config;
pub mod counter;
pub mod families;
pub mod metrics;
pub mod orchestrator;
pub mod provider;
pub mod subsystem;

pub use config::{CollectorConfig, ConfigError};
pub use metrics::{MetricSink, Sample, TextExposition};
pub use orchestrator::{FamilyError, FamilyStatus, MetricCollector, Orchestrator, ScrapeError};

/// Crate version, reported by the health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
