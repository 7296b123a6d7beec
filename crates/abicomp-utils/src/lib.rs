//! # abicomp Utilities
//!
//! Shared utilities, logging, and configuration for abicomp.
//!
//! This crate provides the pieces of the command line tool that are not about
//! ABIs: `tracing` setup and the lookup of configuration files.

pub mod config;
pub mod logging;

// Re-export commonly used functions for convenience
pub use config::default_suppression_file;
pub use logging::{
    init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingConfig, LoggingError, LoggingGuard,
};
pub use tracing::{debug, error, info, trace, warn};
