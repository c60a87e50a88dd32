//! This crate provides a query service for year-partitioned material volume data. Records are
//! read from a document store in which each year is a partition of loosely structured documents:
//! the field naming the material and the fields naming months are spelled differently from one
//! partition or record to the next. The service normalises those spellings and answers the
//! questions a charting frontend asks:
//!
//! * which years are available (`/api/options`)
//! * which materials a year contains (`/api/materials`)
//! * which month fields a material has (`/api/months`)
//! * monthly volume totals for a material or for all materials (`/api/data`)
//! * the percentage change between two month fields, per material (`/api/compare`)
//!
//! The service is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team, with middleware from
//!   [tower-http](tower_http) for tracing, timeouts, CORS and path normalisation.
//! * [Serde](serde) performs (de)serialisation of JSON documents and response data.
//! * [sled] is an embedded database; each partition is a sled tree.

pub mod app;
pub mod app_state;
pub mod cli;
pub mod collation;
pub mod error;
pub mod metrics;
pub mod models;
pub mod month;
pub mod operation;
pub mod operations;
pub mod schema;
pub mod server;
pub mod store;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod validated_query;
