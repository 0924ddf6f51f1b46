//! Collector lifecycle: the registry of running periodic fetch jobs.
//!
//! Each collector is an immutable identity plus a `CancellationToken`.
//! One scheduler task per collector fires ticks; every tick runs as its own
//! task and only ever logs its failures.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use stratus_core::ServiceError;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::pipeline::SamplePipeline;

pub const MISSING_PARAMETERS: &str = "Missing required parameters";
const INVALID_INTERVAL: &str = "Interval must be a positive integer (seconds)";
const COLLECTOR_NOT_FOUND: &str = "Collector not found";

/// Upper bound on a tick interval; larger periods overflow `Instant` arithmetic.
const MAX_INTERVAL_SECS: u64 = u32::MAX as u64;

/// Public metadata of an active collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collector {
    pub id: String,
    pub location: String,
    pub attribute: String,
    /// Seconds between ticks.
    pub interval: u64,
    pub start_time: DateTime<Utc>,
}

/// Collector metadata returned by a stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedCollector {
    #[serde(flatten)]
    pub collector: Collector,
    pub stop_time: DateTime<Utc>,
}

/// Body of a start request, as received.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    /// JSON number or numeric string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<serde_json::Value>,
}

/// A start request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidStart {
    pub location: String,
    pub attribute: String,
    pub interval: u64,
}

impl StartRequest {
    pub fn new(location: &str, attribute: &str, interval: u64) -> Self {
        Self {
            location: Some(location.to_string()),
            attribute: Some(attribute.to_string()),
            interval: Some(serde_json::Value::from(interval)),
        }
    }

    /// Whether all three fields are present and non-blank.
    pub fn is_complete(&self) -> bool {
        non_blank(self.location.as_deref()).is_some()
            && non_blank(self.attribute.as_deref()).is_some()
            && self.interval.as_ref().is_some_and(|v| !is_blank_value(v))
    }

    /// Check presence of all three fields and parse the interval.
    ///
    /// The attribute is not checked against the supported set here; an
    /// unsupported attribute fails on every tick instead.
    pub fn validate(&self) -> Result<ValidStart, ServiceError> {
        let location = non_blank(self.location.as_deref());
        let attribute = non_blank(self.attribute.as_deref());
        let interval = self.interval.as_ref().filter(|v| !is_blank_value(v));

        let (Some(location), Some(attribute), Some(interval)) = (location, attribute, interval)
        else {
            return Err(ServiceError::validation(MISSING_PARAMETERS));
        };

        let interval =
            parse_interval(interval).ok_or_else(|| ServiceError::validation(INVALID_INTERVAL))?;

        Ok(ValidStart {
            location: location.to_string(),
            attribute: attribute.to_string(),
            interval,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn is_blank_value(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn parse_interval(value: &serde_json::Value) -> Option<u64> {
    let secs = match value {
        serde_json::Value::Number(n) => match n.as_u64() {
            Some(secs) => secs,
            None => {
                let f = n.as_f64()?;
                if f.fract() != 0.0 || f < 1.0 || f > MAX_INTERVAL_SECS as f64 {
                    return None;
                }
                f as u64
            }
        },
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };

    (1..=MAX_INTERVAL_SECS).contains(&secs).then_some(secs)
}

struct ActiveCollector {
    info: Collector,
    cancel: CancellationToken,
}

/// Owns the registry of active collectors.
pub struct CollectorManager {
    pipeline: Arc<SamplePipeline>,
    discard_after_stop: bool,
    registry: Mutex<Vec<ActiveCollector>>,
}

impl CollectorManager {
    pub fn new(pipeline: Arc<SamplePipeline>, discard_after_stop: bool) -> Self {
        Self {
            pipeline,
            discard_after_stop,
            registry: Mutex::new(Vec::new()),
        }
    }

    pub fn pipeline(&self) -> &Arc<SamplePipeline> {
        &self.pipeline
    }

    /// Register a collector and start its ticks.
    ///
    /// Returns before the immediate first fetch completes. Must be called
    /// from within a tokio runtime.
    pub fn start(&self, request: &StartRequest) -> Result<Collector, ServiceError> {
        let valid = request.validate()?;

        let collector = Collector {
            id: Uuid::new_v4().to_string(),
            location: valid.location,
            attribute: valid.attribute,
            interval: valid.interval,
            start_time: Utc::now(),
        };
        let cancel = CancellationToken::new();

        self.registry.lock().push(ActiveCollector {
            info: collector.clone(),
            cancel: cancel.clone(),
        });

        tracing::info!(
            collector_id = %collector.id,
            location = %collector.location,
            attribute = %collector.attribute,
            interval = collector.interval,
            "Started collector"
        );

        let job = TickJob {
            collector: collector.clone(),
            pipeline: Arc::clone(&self.pipeline),
            cancel,
            discard_after_stop: self.discard_after_stop,
        };
        tokio::spawn(job.clone().run_tick());
        tokio::spawn(job.run_schedule());

        Ok(collector)
    }

    /// Cancel a collector's timer and remove it from the registry.
    pub fn stop(&self, id: &str) -> Result<StoppedCollector, ServiceError> {
        let removed = {
            let mut registry = self.registry.lock();
            registry
                .iter()
                .position(|c| c.info.id == id)
                .map(|idx| registry.remove(idx))
        };

        let Some(active) = removed else {
            return Err(ServiceError::not_found(COLLECTOR_NOT_FOUND));
        };
        active.cancel.cancel();

        tracing::info!(collector_id = %id, location = %active.info.location, "Stopped collector");

        let stop_time = Utc::now().max(active.info.start_time);
        Ok(StoppedCollector {
            collector: active.info,
            stop_time,
        })
    }

    /// Snapshot of active collectors in start order.
    pub fn list(&self) -> Vec<Collector> {
        self.registry.lock().iter().map(|c| c.info.clone()).collect()
    }

    /// Active collectors whose location equals `name`.
    pub fn active_for_location(&self, name: &str) -> Vec<Collector> {
        self.registry
            .lock()
            .iter()
            .filter(|c| c.info.location == name)
            .map(|c| c.info.clone())
            .collect()
    }

    /// Cancel every collector and clear the registry.
    pub fn shutdown(&self) {
        let drained: Vec<ActiveCollector> = self.registry.lock().drain(..).collect();
        for active in &drained {
            active.cancel.cancel();
        }
        if !drained.is_empty() {
            tracing::info!("Stopped {} collector(s) on shutdown", drained.len());
        }
    }
}

impl Drop for CollectorManager {
    fn drop(&mut self) {
        for active in self.registry.get_mut().iter() {
            active.cancel.cancel();
        }
    }
}

/// Everything one collector's ticks need, detached from the registry.
#[derive(Clone)]
struct TickJob {
    collector: Collector,
    pipeline: Arc<SamplePipeline>,
    cancel: CancellationToken,
    discard_after_stop: bool,
}

impl TickJob {
    /// One fetch-then-persist. Failures are logged, never returned.
    async fn run_tick(self) {
        let Collector {
            id,
            location,
            attribute,
            ..
        } = &self.collector;

        let sample = match self.pipeline.fetch(location, attribute).await {
            Ok(sample) => sample,
            Err(e) => {
                tracing::warn!(
                    collector_id = %id,
                    "Error collecting {} for {}: {}",
                    attribute,
                    location,
                    e
                );
                return;
            }
        };

        if self.discard_after_stop && self.cancel.is_cancelled() {
            tracing::debug!(collector_id = %id, "Collector stopped mid-tick, discarding sample");
            return;
        }

        if let Err(e) = self.pipeline.persist(&sample).await {
            tracing::warn!(
                collector_id = %id,
                "Error saving {} for {}: {}",
                attribute,
                location,
                e
            );
        }
    }

    /// Fire a tick every `interval` seconds until cancelled.
    async fn run_schedule(self) {
        let period = Duration::from_secs(self.collector.interval);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    tokio::spawn(self.clone().run_tick());
                }
            }
        }

        tracing::debug!(collector_id = %self.collector.id, "Scheduler exited");
    }
}
