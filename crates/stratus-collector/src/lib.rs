//! Stratus collector service.
//!
//! Runs periodic weather collectors that fetch one attribute for one
//! location and write each reading to the document store, and serves the
//! city management endpoints.

pub mod api;
pub mod manager;
pub mod pipeline;

pub use api::{routes, AppState};
pub use manager::{Collector, CollectorManager, StartRequest, StoppedCollector, MISSING_PARAMETERS};
pub use pipeline::SamplePipeline;
