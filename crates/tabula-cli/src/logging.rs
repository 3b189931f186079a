//! Structured logging for the tabula CLI
//!
//! Human-readable console output for interactive use, JSON or rolling file
//! output for anything scripted. The engine crates never log; everything
//! observable happens at this boundary.

use tracing::Subscriber;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format for interactive use
    Pretty,
    /// JSON format (structured logging)
    Json,
    /// Compact format for testing
    Compact,
}

impl LogFormat {
    /// Parse from environment variable
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Log to stderr only
    Stderr,
    /// Log to file only
    File,
    /// Log to both stderr and file
    Both,
}

impl LogOutput {
    /// Parse from environment variable
    pub fn from_env() -> Self {
        match std::env::var("LOG_OUTPUT").as_deref() {
            Ok("file") => LogOutput::File,
            Ok("both") => LogOutput::Both,
            _ => LogOutput::Stderr,
        }
    }
}

/// Initialize the logging system.
///
/// Environment variables (set from config by `Config::apply_logging_env`):
/// - `RUST_LOG`: log level (e.g. "debug", "tabula=trace")
/// - `LOG_FORMAT`: "pretty", "json", "compact"
/// - `LOG_OUTPUT`: "stdout", "file", "both"
/// - `LOG_DIR`: directory for log files (default "./logs")
///
/// Console logs go to stderr so rendered tables on stdout stay pipeable.
pub fn init() {
    let format = LogFormat::from_env();
    let output = LogOutput::from_env();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap()
        // Filter out noisy third-party crates
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap())
        .add_directive("tokio=warn".parse().unwrap());

    let registry = tracing_subscriber::registry().with(env_filter);
    match output {
        LogOutput::Stderr => registry.with(stderr_layer(format)).init(),
        LogOutput::File => registry.with(file_layer()).init(),
        LogOutput::Both => registry
            .with(stderr_layer(format))
            .with(file_layer())
            .init(),
    }

    tracing::debug!(?format, ?output, "logging initialized");
}

fn stderr_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::Pretty => fmt::layer().with_writer(std::io::stderr).pretty().boxed(),
        LogFormat::Json => fmt::layer()
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().with_writer(std::io::stderr).compact().boxed(),
    }
}

fn file_layer<S>() -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
    std::fs::create_dir_all(&log_dir).ok();
    let appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "tabula.log");
    fmt::layer().with_writer(appender).with_ansi(false).boxed()
}
