//! Subscriber construction.
//!
//! One console layer (or none) plus an optional daily log file, all sharing
//! a single format and one `EnvFilter`.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    filter::Directive,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{TelemetryError, TelemetryResult};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Event rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, colored.
    Pretty,
    /// One short line per event.
    #[default]
    Compact,
    /// Newline-delimited JSON.
    Json,
    /// One line per event with every span field.
    Full,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            "full" => Ok(Self::Full),
            other => Err(TelemetryError::InvalidFilter(format!(
                "unknown log format '{other}'"
            ))),
        }
    }
}

/// Where console output goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Standard output.
    Stdout,
    /// Standard error.
    #[default]
    Stderr,
    /// No console output; only the log file, if any.
    None,
}

impl FromStr for LogTarget {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdout" => Ok(Self::Stdout),
            "stderr" => Ok(Self::Stderr),
            "none" | "file" => Ok(Self::None),
            other => Err(TelemetryError::InvalidFilter(format!(
                "unknown log target '{other}'"
            ))),
        }
    }
}

/// Daily log files in `directory`, named `{prefix}.YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileLogConfig {
    /// Log directory, created on setup.
    pub directory: PathBuf,
    /// File name prefix.
    pub prefix: String,
}

/// Everything [`setup_logging`] needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Base filter (`warn`, `info`, `debug`, ...).
    pub level: String,
    /// Rendering for every output.
    #[serde(default)]
    pub format: LogFormat,
    /// Console output.
    #[serde(default)]
    pub target: LogTarget,
    /// File output, in addition to the console.
    #[serde(default)]
    pub file: Option<FileLogConfig>,
    /// Emit timestamps.
    #[serde(default = "default_true")]
    pub timestamps: bool,
    /// Extra directives such as `runway_fetch=trace`.
    #[serde(default)]
    pub directives: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new("warn")
    }
}

impl LogConfig {
    /// Compact stderr logging at `level`.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            file: None,
            timestamps: true,
            directives: Vec::new(),
        }
    }

    /// Replace the format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Replace the console target.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Also write `runway.YYYY-MM-DD` files into `directory`.
    #[must_use]
    pub fn with_file_logging(mut self, directory: impl Into<PathBuf>) -> Self {
        self.file = Some(FileLogConfig {
            directory: directory.into(),
            prefix: "runway".to_owned(),
        });
        self
    }

    /// Add a filter directive.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Drop timestamps from every output.
    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    fn build_filter(&self) -> TelemetryResult<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.level)
            .map_err(|e| TelemetryError::InvalidFilter(format!("{}: {e}", self.level)))?;
        for directive in &self.directives {
            let parsed = directive
                .parse::<Directive>()
                .map_err(|e| TelemetryError::InvalidFilter(format!("{directive}: {e}")))?;
            filter = filter.add_directive(parsed);
        }
        Ok(filter)
    }

    fn build_layers(&self) -> TelemetryResult<Vec<BoxedLayer>> {
        let mut layers = Vec::with_capacity(2);

        match self.target {
            LogTarget::Stdout => layers.push(self.fmt_layer(std::io::stdout, true)),
            LogTarget::Stderr => layers.push(self.fmt_layer(std::io::stderr, true)),
            LogTarget::None => {},
        }

        if let Some(file) = &self.file {
            std::fs::create_dir_all(&file.directory).map_err(|source| {
                TelemetryError::LogDirectory {
                    path: file.directory.clone(),
                    source,
                }
            })?;
            let appender = RollingFileAppender::new(Rotation::DAILY, &file.directory, &file.prefix);
            layers.push(self.fmt_layer(appender, false));
        }

        Ok(layers)
    }

    fn fmt_layer<W>(&self, writer: W, ansi: bool) -> BoxedLayer
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        let base = fmt::layer().with_writer(writer).with_ansi(ansi);

        match (self.format, self.timestamps) {
            (LogFormat::Json, true) => base.json().boxed(),
            (LogFormat::Json, false) => base.json().without_time().boxed(),
            (LogFormat::Pretty, true) => base.pretty().boxed(),
            (LogFormat::Pretty, false) => base.pretty().without_time().boxed(),
            (LogFormat::Compact, true) => base.compact().boxed(),
            (LogFormat::Compact, false) => base.compact().without_time().boxed(),
            (LogFormat::Full, true) => base.boxed(),
            (LogFormat::Full, false) => base.without_time().boxed(),
        }
    }
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Fails on an unparsable level or directive, an uncreatable log directory,
/// or when a subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.build_filter()?;
    let layers = config.build_layers()?;

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_quiet_compact_stderr() {
        let config = LogConfig::default();
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.target, LogTarget::Stderr);
        assert!(config.file.is_none());
        assert!(config.timestamps);
    }

    #[test]
    fn test_builder_chain() {
        let config = LogConfig::new("debug")
            .with_format(LogFormat::Json)
            .without_timestamps()
            .with_file_logging("/tmp/runway-logs")
            .with_directive("runway_fetch=trace");

        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.timestamps);
        assert_eq!(config.file.as_ref().unwrap().prefix, "runway");
        assert_eq!(config.directives, vec!["runway_fetch=trace"]);
    }

    #[test]
    fn test_format_and_target_parse_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());

        assert_eq!("Stdout".parse::<LogTarget>().unwrap(), LogTarget::Stdout);
        assert_eq!("file".parse::<LogTarget>().unwrap(), LogTarget::None);
        assert!("syslog".parse::<LogTarget>().is_err());
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = LogConfig::new("info").with_format(LogFormat::Full);

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"format\":\"full\""));

        let parsed: LogConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.format, LogFormat::Full);
        assert_eq!(parsed.target, LogTarget::Stderr);
    }

    #[test]
    fn test_bad_directive_names_itself() {
        let err = LogConfig::new("debug")
            .with_directive("[invalid=syntax")
            .build_filter()
            .unwrap_err();
        assert!(err.to_string().contains("[invalid=syntax"));
        assert!(LogConfig::new("debug").with_directive("runway=trace").build_filter().is_ok());
    }

    #[test]
    fn test_file_only_output_creates_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        let config = LogConfig::default()
            .with_target(LogTarget::None)
            .with_file_logging(&logs);

        let layers = config.build_layers().unwrap();
        assert_eq!(layers.len(), 1);
        assert!(logs.is_dir());
    }
}
