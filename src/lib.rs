//! Library entry point for the Khaya marketplace core service.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
