//! This crate provides an analysis server for NYC yellow taxi trip records. It loads the monthly
//! Parquet partitions of October to December 2019 and 2020, cleans the records and computes the
//! aggregate result sets behind an exploratory dashboard: temporal patterns, trip profile, fare
//! composition, payment mix, data quality and the change in behaviour during the pandemic.
//!
//! Results are cached per query and filter. Each cached result is tagged with the section of the
//! dashboard it belongs to, so that sections can be invalidated independently.
//!
//! The server is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team.
//! * [Serde](serde) performs serialisation of JSON request and response data.
//! * [parquet] and [Arrow](arrow_array) read the trip records into typed columns.
//! * [Rayon](rayon) scans record batches in parallel.

pub mod aggregate;
pub mod aggregation;
pub mod aggregations;
pub mod analysis;
pub mod app;
pub mod app_state;
pub mod cache;
pub mod cli;
pub mod error;
pub mod filter;
pub mod labels;
pub mod loader;
pub mod metrics;
pub mod models;
pub mod query;
pub mod resource_manager;
pub mod server;
pub mod table;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod trip;
pub mod validated_json;
