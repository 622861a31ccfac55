//! `tracing-subscriber` initialization.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::LoggingConfig;

/// Error type for logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The configured level is not a valid filter directive.
    #[error("invalid log level directive '{directive}': {message}")]
    InvalidDirective {
        /// The rejected directive.
        directive: String,
        /// Parser message.
        message: String,
    },
    /// A global subscriber was already installed.
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberError(String),
}

/// Install the global tracing subscriber.
///
/// Logs go to stderr. `RUST_LOG` takes precedence; otherwise
/// `options_analytics=<level>` is used.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let directive = format!("options_analytics={}", config.level);
    let default_directive = directive
        .parse()
        .map_err(|e: tracing_subscriber::filter::ParseError| LoggingError::InvalidDirective {
            directive: directive.clone(),
            message: e.to_string(),
        })?;

    let filter = EnvFilter::builder()
        .with_default_directive(default_directive)
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_span_events(span_events(config.include_spans));

    let result = if config.format == "pretty" {
        builder.pretty().try_init()
    } else {
        builder
            .json()
            .with_current_span(config.include_spans)
            .with_span_list(config.include_spans)
            .try_init()
    };

    result.map_err(|e| LoggingError::SubscriberError(e.to_string()))
}

/// Span lifecycle events to log: span closes (with timings) when enabled.
fn span_events(include_spans: bool) -> FmtSpan {
    if include_spans {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_events_follow_config() {
        assert_eq!(span_events(true), FmtSpan::CLOSE);
        assert_eq!(span_events(false), FmtSpan::NONE);
    }

    #[test]
    fn invalid_level_is_rejected() {
        let config = LoggingConfig {
            level: "not a level!!".to_string(),
            ..LoggingConfig::default()
        };
        let result = init_logging(&config);
        assert!(matches!(result, Err(LoggingError::InvalidDirective { .. })));
    }
}
