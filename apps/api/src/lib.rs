//! CV completeness and submission readiness for the public job portal.
//!
//! The library is the in-process subsystem a UI layer consumes; the binary in
//! `main.rs` serves the same operations over HTTP.

pub mod activity;
pub mod attachments;
pub mod config;
pub mod curriculum;
pub mod errors;
pub mod facade;
pub mod models;
pub mod routes;
pub mod state;
pub mod submission;
pub mod tenure;
