//! Structured logging setup

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    pub level: String,
    pub format: LogFormat,
    /// Include file and line
    pub include_location: bool,
    pub include_thread: bool,
    /// Append to this file instead of stdout
    pub log_file_path: Option<String>,
    /// Extra `EnvFilter` directives
    pub filter_directives: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_location: false,
            include_thread: false,
            log_file_path: None,
            filter_directives: vec![
                "indagate_kv=info".to_string(),
                "indagate_store=info".to_string(),
                "indagate_authorizer=info".to_string(),
            ],
        }
    }
}

impl LoggingConfig {
    fn filter(&self) -> Result<EnvFilter> {
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));
        for directive in &self.filter_directives {
            let directive = directive.parse().map_err(|e| {
                Error::invalid(format!("bad filter directive {:?}", directive))
                    .with_op("logging/init")
                    .with_source(e)
            })?;
            filter = filter.add_directive(directive);
        }
        Ok(filter)
    }

    fn writer(&self) -> Result<BoxMakeWriter> {
        match &self.log_file_path {
            Some(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| {
                        Error::invalid(format!("unable to open log file {}", path))
                            .with_op("logging/init")
                            .with_source(e)
                    })?;
                Ok(BoxMakeWriter::new(Arc::new(file)))
            }
            None => Ok(BoxMakeWriter::new(std::io::stdout)),
        }
    }
}

/// Install the global subscriber
///
/// Fails with `Invalid` on a bad directive or log file. A second call is a
/// no-op apart from a debug message, so tests may call it freely.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = config.filter()?;
    let writer = config.writer()?;

    let base = fmt::layer()
        .with_writer(writer)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread)
        .with_thread_names(config.include_thread);

    let layer = match config.format {
        LogFormat::Json => base.json().boxed(),
        LogFormat::Pretty => base.pretty().boxed(),
        LogFormat::Compact => base.compact().boxed(),
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
    {
        tracing::debug!(error = %e, "logging already initialized");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn init_twice_is_harmless() {
        let config = LoggingConfig {
            format: LogFormat::Compact,
            ..Default::default()
        };
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn bad_directive_is_rejected() {
        let config = LoggingConfig {
            filter_directives: vec!["indagate_kv=notalevel".to_string()],
            ..Default::default()
        };
        assert_eq!(init_logging(&config).unwrap_err().code(), ErrorCode::Invalid);
    }

    #[test]
    fn logs_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("indagate.log");
        let config = LoggingConfig {
            format: LogFormat::Json,
            log_file_path: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };
        assert!(init_logging(&config).is_ok());
        assert!(path.exists());
    }
}
