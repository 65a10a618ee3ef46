//! Exam-hall seat allocation engine and its HTTP surface.

pub mod allocation;
pub mod config;
pub mod error;
pub mod telemetry;
