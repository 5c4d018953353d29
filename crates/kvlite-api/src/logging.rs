//! Logging configuration for kvlite
//!
//! kvlite emits `tracing` events from every store operation: `info` for
//! lifecycle (open, close, backup, restore, flush), `debug` for writes and
//! reclamation, `trace` for reads. This module installs a subscriber for
//! applications that do not bring their own.

use kvlite_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable that overrides the configured level filter
pub const LOG_ENV_VAR: &str = "KVLITE_LOG";

/// Default log file name when the configured path has none
const DEFAULT_LOG_FILE: &str = "kvlite.log";

/// Log output destination
#[derive(Debug, Clone)]
pub enum LogOutput {
    /// Output to stdout
    Stdout,
    /// Output to a daily-rotated file
    File(PathBuf),
    /// Output to both stdout and file
    Both(PathBuf),
}

/// Log format style
#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    /// Human-readable multi-line format
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level filter directive, e.g. `info` or `kvlite=debug`
    pub level: String,
    /// Output destination
    pub output: LogOutput,
    /// Format style
    pub format: LogFormat,
    /// Log span close events with their elapsed time
    pub span_timing: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: LogOutput::Stdout,
            format: LogFormat::Compact,
            span_timing: false,
        }
    }
}

impl LogConfig {
    /// Info level to stdout
    pub fn info() -> Self {
        Self::default()
    }

    /// Debug level for kvlite crates, info for everything else
    pub fn debug() -> Self {
        Self {
            level: "info,kvlite=debug,kvlite_storage=debug,kvlite_snapshot=debug".to_string(),
            ..Default::default()
        }
    }

    /// Set log output to a rotated file
    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::File(path.into());
        self
    }

    /// Set log output to both stdout and a rotated file
    pub fn with_both<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::Both(path.into());
        self
    }

    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set log level filter
    pub fn with_level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }

    /// Enable span close timing
    pub fn with_span_timing(mut self, enabled: bool) -> Self {
        self.span_timing = enabled;
        self
    }

    fn filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_from_env(LOG_ENV_VAR)
            .or_else(|_| EnvFilter::try_new(&self.level))
            .map_err(|e| Error::Validation(format!("invalid log filter {:?}: {}", self.level, e)))
    }

    /// Install this configuration as the global subscriber.
    ///
    /// Returns a guard when logging to a file; keep it alive for as long as
    /// logs should be written. Fails if the level filter is invalid or a
    /// global subscriber is already installed.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use kvlite::logging::LogConfig;
    ///
    /// let _guard = LogConfig::debug().with_file("./logs/kvlite.log").init()?;
    /// # Ok::<(), kvlite::Error>(())
    /// ```
    pub fn init(self) -> Result<Option<WorkerGuard>> {
        let filter = self.filter()?;
        let spans = if self.span_timing {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let (to_stdout, file) = match &self.output {
            LogOutput::Stdout => (true, None),
            LogOutput::File(path) => (false, Some(path.as_path())),
            LogOutput::Both(path) => (true, Some(path.as_path())),
        };

        let (file_writer, guard) = match file {
            Some(path) => {
                let (dir, name) = split_log_path(path);
                let appender = tracing_appender::rolling::daily(dir, name);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                (Some(writer), Some(guard))
            }
            None => (None, None),
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(to_stdout.then(|| fmt_layer(self.format, spans.clone(), std::io::stdout, true)))
            .with(file_writer.map(|w| fmt_layer(self.format, spans, w, false)))
            .try_init()
            .map_err(|e| Error::Validation(format!("logging already initialized: {}", e)))?;

        Ok(guard)
    }
}

/// Splits a log path into the rotation directory and file name prefix.
fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    (dir, name)
}

fn fmt_layer<S, W>(
    format: LogFormat,
    spans: FmtSpan,
    writer: W,
    ansi: bool,
) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_span_events(spans);
    match format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}
