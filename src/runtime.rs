//! Runtime glue: backend endpoint configuration and telemetry.

pub mod config;
pub mod telemetry;
