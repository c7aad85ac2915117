//! Drives every counter family on each scrape.
//!
//! Families are independent: a family that fails to build is skipped by later
//! scrapes, and a family that fails to collect never suppresses another
//! family's samples. All failures of one call are returned together as a
//! `ScrapeError`.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{CollectorConfig, ConfigError};
use crate::counter::CounterError;
use crate::metrics::{MetricSink, Sample};
use crate::provider::CounterProvider;
use crate::subsystem::{Lifecycle, SubsystemCollector};

/// Failure of one family, tagged with the family name.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyError {
    pub family: String,
    pub error: CounterError,
}

impl fmt::Display for FamilyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.family, self.error)
    }
}

impl std::error::Error for FamilyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// All family failures of one build or collect call.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeError {
    errors: Vec<FamilyError>,
}

impl ScrapeError {
    pub fn errors(&self) -> &[FamilyError] {
        &self.errors
    }

    /// Names of the families that failed.
    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.family.as_str())
    }

    /// True when every failure is an inactive feature rather than a fault.
    pub fn only_no_instances(&self) -> bool {
        self.errors.iter().all(|e| e.error.is_no_instances())
    }

    fn from_errors(errors: Vec<FamilyError>) -> Result<(), ScrapeError> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ScrapeError { errors })
        }
    }
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, e) in self.errors.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}

impl std::error::Error for ScrapeError {}

/// Timing of one scrape.
///
/// Used for debugging and performance monitoring.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeTiming {
    /// Total scrape time.
    pub total: Duration,
    /// Poll time per family, in registration order.
    pub families: Vec<(String, Duration)>,
}

/// Last known state of one family.
#[derive(Debug, Clone, Serialize)]
pub struct FamilyStatus {
    pub family: String,
    pub counter_object: String,
    pub state: Lifecycle,
    pub last_error: Option<String>,
    pub last_duration_ms: Option<f64>,
    pub instances: usize,
    pub samples: usize,
    pub last_success: Option<DateTime<Utc>>,
}

impl FamilyStatus {
    fn new(family: &SubsystemCollector) -> Self {
        Self {
            family: family.family().to_string(),
            counter_object: family.counter_object().to_string(),
            state: family.lifecycle(),
            last_error: None,
            last_duration_ms: None,
            instances: 0,
            samples: 0,
            last_success: None,
        }
    }
}

/// Host-facing collector lifecycle.
pub trait MetricCollector {
    fn name(&self) -> &str;
    fn build(&mut self) -> Result<(), ScrapeError>;
    fn collect(&mut self, sink: &mut dyn MetricSink) -> Result<(), ScrapeError>;
    fn close(&mut self);
}

/// Owns the family collectors and merges their outcomes.
pub struct Orchestrator {
    name: String,
    parallel: bool,
    slow_family_threshold: Duration,
    families: Vec<SubsystemCollector>,
    status: Vec<FamilyStatus>,
    last_timing: Option<ScrapeTiming>,
}

impl Orchestrator {
    /// Creates an orchestrator for the families selected by `config`.
    pub fn new(
        config: &CollectorConfig,
        provider: Arc<dyn CounterProvider>,
    ) -> Result<Self, ConfigError> {
        let families = config
            .selected_families()?
            .into_iter()
            .map(|def| -> Result<_, ConfigError> {
                Ok(SubsystemCollector::new(
                    provider.clone(),
                    config.namespace.as_str(),
                    config.collector_name.as_str(),
                    def.name,
                    def.schema()?,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::with_families(config, families))
    }

    /// Creates an orchestrator over pre-built family collectors, keeping
    /// their order.
    pub fn with_families(config: &CollectorConfig, families: Vec<SubsystemCollector>) -> Self {
        let status = families.iter().map(FamilyStatus::new).collect();
        Self {
            name: config.collector_name.clone(),
            parallel: config.parallel,
            slow_family_threshold: config.slow_family_threshold,
            families,
            status,
            last_timing: None,
        }
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Returns timing of the last scrape.
    pub fn last_timing(&self) -> Option<&ScrapeTiming> {
        self.last_timing.as_ref()
    }

    pub fn status(&self) -> &[FamilyStatus] {
        &self.status
    }

    /// Builds every unbuilt family.
    pub fn build(&mut self) -> Result<(), ScrapeError> {
        let mut errors = Vec::new();

        for (family, status) in self.families.iter_mut().zip(self.status.iter_mut()) {
            if let Err(error) = family.build() {
                warn!(family = family.family(), error = %error, "family build failed, skipping");
                status.last_error = Some(error.to_string());
                errors.push(FamilyError {
                    family: family.family().to_string(),
                    error,
                });
            } else {
                status.last_error = None;
            }
            status.state = family.lifecycle();
        }

        let built = self.status.iter().filter(|s| s.state == Lifecycle::Built).count();
        info!(built, failed = errors.len(), "collector built");
        ScrapeError::from_errors(errors)
    }

    /// Collects every built family into `sink`.
    pub fn collect(&mut self, sink: &mut dyn MetricSink) -> Result<(), ScrapeError> {
        let start = Instant::now();

        let outcomes: Vec<Option<(Result<usize, CounterError>, Duration)>> = if self.parallel {
            // Each family buffers privately; buffers reach the sink in
            // registration order once every family has finished.
            let buffered: Vec<_> = self
                .families
                .par_iter_mut()
                .map(|family| {
                    let mut buffer: Vec<Sample> = Vec::new();
                    let outcome = collect_family(family, &mut buffer);
                    (buffer, outcome)
                })
                .collect();

            buffered
                .into_iter()
                .map(|(buffer, outcome)| {
                    for sample in buffer {
                        sink.emit(sample);
                    }
                    outcome
                })
                .collect()
        } else {
            self.families
                .iter_mut()
                .map(|family| collect_family(family, &mut *sink))
                .collect()
        };

        let mut errors = Vec::new();
        let mut timing = ScrapeTiming::default();

        for ((family, status), outcome) in self
            .families
            .iter()
            .zip(self.status.iter_mut())
            .zip(outcomes)
        {
            let Some((result, elapsed)) = outcome else {
                continue;
            };

            timing.families.push((family.family().to_string(), elapsed));
            status.last_duration_ms = Some(elapsed.as_secs_f64() * 1000.0);
            status.state = family.lifecycle();

            if elapsed > self.slow_family_threshold {
                warn!(
                    family = family.family(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    threshold_ms = self.slow_family_threshold.as_millis() as u64,
                    "slow family"
                );
            }

            match result {
                Ok(samples) => {
                    status.last_error = None;
                    status.samples = samples;
                    status.instances = family.last_instances();
                    status.last_success = Some(Utc::now());
                }
                Err(error) => {
                    if error.is_no_instances() {
                        debug!(family = family.family(), "no instances present");
                    } else {
                        warn!(family = family.family(), error = %error, "family collect failed");
                    }
                    status.last_error = Some(error.to_string());
                    status.samples = 0;
                    status.instances = 0;
                    errors.push(FamilyError {
                        family: family.family().to_string(),
                        error,
                    });
                }
            }
        }

        timing.total = start.elapsed();
        debug!(
            total_ms = timing.total.as_millis() as u64,
            families = timing.families.len(),
            failed = errors.len(),
            "scrape finished"
        );
        self.last_timing = Some(timing);

        ScrapeError::from_errors(errors)
    }

    /// Closes every family. Never fails.
    pub fn close(&mut self) {
        for (family, status) in self.families.iter_mut().zip(self.status.iter_mut()) {
            family.close();
            status.state = family.lifecycle();
        }
        info!(families = self.families.len(), "collector closed");
    }
}

/// Collects one family if it is built. Families that failed to build are
/// skipped.
fn collect_family(
    family: &mut SubsystemCollector,
    sink: &mut dyn MetricSink,
) -> Option<(Result<usize, CounterError>, Duration)> {
    if family.lifecycle() != Lifecycle::Built {
        return None;
    }
    let start = Instant::now();
    let result = family.collect(sink);
    Some((result, start.elapsed()))
}

impl MetricCollector for Orchestrator {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(&mut self) -> Result<(), ScrapeError> {
        Orchestrator::build(self)
    }

    fn collect(&mut self, sink: &mut dyn MetricSink) -> Result<(), ScrapeError> {
        Orchestrator::collect(self, sink)
    }

    fn close(&mut self) {
        Orchestrator::close(self)
    }
}
