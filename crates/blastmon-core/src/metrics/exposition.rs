//! Prometheus text exposition of scrape samples.

use prometheus::{Counter, Gauge, Opts, Registry, TextEncoder};
use tracing::warn;

use super::sink::{MetricSink, Sample};
use crate::counter::ValueKind;

/// Sink that renders samples in the Prometheus text format.
///
/// A fresh `Registry` is built for every render, so values never leak from
/// one scrape into the next.
#[derive(Debug, Default)]
pub struct TextExposition {
    samples: Vec<Sample>,
}

impl TextExposition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let registry = Registry::new();

        for sample in &self.samples {
            let opts = Opts::new(sample.name.as_str(), sample.help.as_str());
            let registered = match sample.kind {
                ValueKind::Gauge => {
                    let gauge = Gauge::with_opts(opts)?;
                    gauge.set(sample.value);
                    registry.register(Box::new(gauge))
                }
                ValueKind::Counter => {
                    // Counters only accept finite, non-negative increments.
                    if !(sample.value >= 0.0) || sample.value.is_infinite() {
                        warn!(
                            metric = %sample.name,
                            value = sample.value,
                            "invalid counter value skipped"
                        );
                        continue;
                    }
                    let counter = Counter::with_opts(opts)?;
                    counter.inc_by(sample.value);
                    registry.register(Box::new(counter))
                }
            };

            match registered {
                Ok(()) => {}
                Err(prometheus::Error::AlreadyReg) => {
                    warn!(metric = %sample.name, "duplicate sample skipped");
                }
                Err(e) => return Err(e),
            }
        }

        TextEncoder::new().encode_to_string(&registry.gather())
    }
}

impl MetricSink for TextExposition {
    fn emit(&mut self, sample: Sample) {
        self.samples.push(sample);
    }
}
