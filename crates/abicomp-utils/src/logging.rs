//! # Logging Utilities
//!
//! Logging infrastructure for abicomp using `tracing`.
//!
//! Console output always goes to stderr: stdout carries reports and symbol
//! listings, and must stay clean enough to pipe into other tools.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use abicomp_utils::init_logging;
//!
//! // Keep the guard alive until exit, or buffered file logs are lost
//! let _guard = init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("comparison started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Log level filter (e.g., `RUST_LOG=debug`, `RUST_LOG=abicomp_core::suppression=trace`)
//! - `ABICOMP_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
//! - `ABICOMP_LOG_FILE`: Optional log file, rolled daily (if not set, logs only to stderr)

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fmt, io};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the output format
pub const LOG_FORMAT_ENV: &str = "ABICOMP_LOG_FORMAT";
/// Environment variable naming the log file
pub const LOG_FILE_ENV: &str = "ABICOMP_LOG_FILE";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Human-readable format (default)
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(format!("{s}. Use 'pretty' or 'json'"))),
        }
    }
}

impl fmt::Display for LogFormat
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    Error,
    Warn,
    Info,
    Debug,
    /// Most verbose: every suppression decision
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(format!(
                "{s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            ))),
        }
    }
}

/// Keeps the background file writer alive.
///
/// Dropping it flushes and stops file logging, so hold it for the lifetime
/// of the program.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard
{
    file: Option<WorkerGuard>,
}

impl fmt::Debug for LoggingGuard
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("LoggingGuard")
            .field("file_logging", &self.file.is_some())
            .finish()
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoggingConfig
{
    /// Explicit level (e.g. from `--log-level`); beats `RUST_LOG`
    pub level: Option<LogLevel>,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl LoggingConfig
{
    /// Settings from the process environment.
    ///
    /// ## Errors
    ///
    /// Returns an error if `ABICOMP_LOG_FORMAT` is set to an unknown format.
    pub fn from_env() -> Result<Self, LoggingError>
    {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Settings from any variable source.
    ///
    /// ## Errors
    ///
    /// Returns an error if the format variable holds an unknown format.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LoggingError>
    {
        let format = match lookup(LOG_FORMAT_ENV) {
            Some(value) => value.parse()?,
            None => LogFormat::default(),
        };
        let file = lookup(LOG_FILE_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Ok(Self {
            level: None,
            format,
            file,
        })
    }

    #[must_use]
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self
    {
        if level.is_some() {
            self.level = level;
        }
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self
    {
        self.format = format;
        self
    }

    /// Install the global subscriber.
    ///
    /// ## Errors
    ///
    /// Returns an error if a subscriber is already installed or the log
    /// file's directory cannot be created.
    pub fn init(self) -> Result<LoggingGuard, LoggingError>
    {
        let rust_log = env::var("RUST_LOG").ok();
        let console = console_layer(self.format, build_filter(self.level, rust_log.as_deref()));

        let mut guard = None;
        let mut layers: Vec<BoxedLayer> = vec![console];
        if let Some(path) = &self.file {
            let (layer, file_guard) = file_layer(path, self.format, build_filter(self.level, rust_log.as_deref()))?;
            layers.push(layer);
            guard = Some(file_guard);
        }

        Registry::default()
            .with(layers)
            .try_init()
            .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

        tracing::debug!(format = %self.format, file = ?self.file, "logging initialized");
        Ok(LoggingGuard { file: guard })
    }
}

/// Filter priority: explicit level, then `RUST_LOG` (module filters
/// allowed), then `warn`.
fn build_filter(explicit: Option<LogLevel>, rust_log: Option<&str>) -> EnvFilter
{
    if let Some(level) = explicit {
        return EnvFilter::new(Level::from(level).to_string());
    }
    match rust_log {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string())),
        None => EnvFilter::new(Level::WARN.to_string()),
    }
}

fn console_layer(format: LogFormat, filter: EnvFilter) -> BoxedLayer
{
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(io::stderr);
    match format {
        LogFormat::Pretty => layer.with_ansi(true).with_filter(filter).boxed(),
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    }
}

fn file_layer(path: &Path, format: LogFormat, filter: EnvFilter) -> Result<(BoxedLayer, WorkerGuard), LoggingError>
{
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&directory)?;
    let prefix = path
        .file_name()
        .ok_or_else(|| LoggingError::InvalidFile(path.display().to_string()))?;

    let appender = tracing_appender::rolling::daily(&directory, prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_ansi(false);
    let layer = match format {
        LogFormat::Pretty => layer.with_filter(filter).boxed(),
        LogFormat::Json => layer.json().with_span_list(true).with_filter(filter).boxed(),
    };
    Ok((layer, guard))
}

/// Initialize logging from the environment.
///
/// ## Errors
///
/// See [`LoggingConfig::from_env`] and [`LoggingConfig::init`].
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    LoggingConfig::from_env()?.init()
}

/// Initialize logging with an explicit level and format. The log file still
/// comes from `ABICOMP_LOG_FILE`.
///
/// ## Errors
///
/// See [`LoggingConfig::init`].
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    LoggingConfig::from_env()?
        .with_level(Some(level))
        .with_format(format)
        .init()
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// The log file path has no file name
    #[error("Invalid log file: {0}")]
    InvalidFile(String),

    /// A global subscriber is already installed
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests
{
    use tracing::level_filters::LevelFilter;

    use super::*;

    #[test]
    fn test_log_format_from_str()
    {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert!(matches!(LogFormat::from_str("xml"), Err(LoggingError::InvalidFormat(_))));
    }

    #[test]
    fn test_log_level_from_str()
    {
        assert_eq!(LogLevel::from_str("error").unwrap(), LogLevel::Error);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("dbg").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert!(matches!(LogLevel::from_str("loud"), Err(LoggingError::InvalidLevel(_))));
    }

    #[test]
    fn test_log_level_to_tracing_level()
    {
        assert_eq!(Level::from(LogLevel::Warn), Level::WARN);
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
    }

    #[test]
    fn test_config_from_lookup()
    {
        let config = LoggingConfig::from_lookup(|key| match key {
            LOG_FORMAT_ENV => Some(String::from("json")),
            LOG_FILE_ENV => Some(String::from("/var/log/abicomp.log")),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file, Some(PathBuf::from("/var/log/abicomp.log")));

        let config = LoggingConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, LoggingConfig::default());

        assert!(LoggingConfig::from_lookup(|_| Some(String::from("yaml"))).is_err());
    }

    #[test]
    fn test_explicit_level_wins()
    {
        let config = LoggingConfig::default().with_level(Some(LogLevel::Debug)).with_level(None);
        assert_eq!(config.level, Some(LogLevel::Debug));

        let hint = |filter: EnvFilter| filter.max_level_hint();
        assert_eq!(hint(build_filter(Some(LogLevel::Debug), Some("error"))), Some(LevelFilter::DEBUG));
        assert_eq!(hint(build_filter(None, Some("abicomp_core=trace"))), Some(LevelFilter::TRACE));
        assert_eq!(hint(build_filter(None, None)), Some(LevelFilter::WARN));
    }
}
