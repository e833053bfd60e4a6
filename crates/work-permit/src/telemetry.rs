use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// sqlx logs every statement at `info`; keep it to slow queries and failures.
const QUIET_DIRECTIVES: &str = "sqlx=warn";

#[derive(Debug)]
pub enum TelemetryError {
    Filter { directive: String, source: ParseError },
    AlreadyInstalled(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::Filter { directive, .. } => {
                write!(f, "log filter '{directive}' could not be parsed")
            }
            TelemetryError::AlreadyInstalled(err) => {
                write!(f, "global tracing subscriber already installed: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::Filter { source, .. } => Some(source),
            TelemetryError::AlreadyInstalled(err) => Some(&**err),
        }
    }
}

/// Filter from `RUST_LOG` when set, otherwise from the configured level.
pub fn filter_for(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directive = format!("{},{QUIET_DIRECTIVES}", config.log_level.trim());
    EnvFilter::try_new(&directive).map_err(|source| TelemetryError::Filter { directive, source })
}

/// Install the process-wide subscriber. Call once, before the server starts.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = filter_for(config)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::AlreadyInstalled)
}
