#![forbid(unsafe_code)]

//! Tracing subscriber setup for binaries and demos.
//!
//! Library crates only emit events; installing a subscriber is the
//! application's call. `RUST_LOG` overrides the configured directive.

use tracing_subscriber::EnvFilter;

use crate::Error;

/// Output format for [`init_tracing`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset, e.g. `"glassbite_perf=debug,info"`.
    pub default_directive: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            default_directive: "info".to_owned(),
        }
    }
}

impl LogConfig {
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_default_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    fn filter(&self) -> Result<EnvFilter, Error> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.default_directive).map_err(|err| {
                Error::Logging(format!("bad directive {:?}: {err}", self.default_directive))
            }),
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &LogConfig) -> Result<(), Error> {
    let filter = config.filter()?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_thread_names(true);
    let installed = match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| Error::Logging(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_directive_is_reported() {
        let config = LogConfig::default().with_default_directive("glassbite=notalevel");
        // RUST_LOG, when set, takes precedence; only check the fallback path.
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(matches!(config.filter(), Err(Error::Logging(_))));
        }
    }

    #[test]
    fn defaults() {
        let config = LogConfig::default();
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.default_directive, "info");
    }
}
