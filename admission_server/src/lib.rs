//! # Admission Server
//!
//! HTTP surface of the admission platform: account endpoints, claim-based
//! authorization, announcements and blob files, plus the ambient server
//! concerns (configuration, structured logging, Prometheus metrics).
//!
//! The binary in `main.rs` wires these together; integration tests build the
//! same router over in-memory stores.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
