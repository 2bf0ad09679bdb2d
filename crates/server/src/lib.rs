//! HTTP front-end for the kaistream resolver.

pub mod api;
pub mod metrics;
pub mod state;
