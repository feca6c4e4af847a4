//! Network client for the ODL offline worker.
//!
//! This crate provides the HTTP fetch pipeline and the pure request
//! classifier shared by the worker and tests.

pub mod classify;
pub mod fetch;

pub use classify::{Classification, RoutingRules, classify};
pub use fetch::{FetchConfig, FetchedResponse, Fetcher, HttpFetcher};
