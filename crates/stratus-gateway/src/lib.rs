//! Stratus gateway: a pass-through HTTP façade over the collector service
//! and the document store.

pub mod api;
pub mod client;

pub use api::{routes, GatewayState};
pub use client::{CollectorClientError, CollectorServiceClient, StopResponse};
