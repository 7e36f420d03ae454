//! # Observability
//!
//! Structured logging through `tracing`. The library itself never installs a
//! subscriber; applications call [`init_logging`] once at startup, usually
//! with the `logging` section of [`crate::config::PhasefitConfig`].

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
