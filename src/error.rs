//! Error types for configuration and dispatch.

use core::fmt;

use thiserror::Error;

/// Error returned by a sink strategy.
pub type SinkError = Box<dyn core::error::Error + Send + Sync>;

/// Errors raised while configuring a [`Dispatcher`](crate::Dispatcher).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The option name is not one the dispatcher understands
    #[error("Unsupported option: {name}")]
    UnsupportedOption {
        /// Option name as given
        name: String,
    },

    /// The option exists but the value has the wrong type
    #[error("Invalid type for option {name}: expected {expected}")]
    InvalidOptionType {
        /// Option name
        name: &'static str,
        /// Name of the expected value type
        expected: &'static str,
    },
}

/// The three output channels of the dispatcher.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SinkKind {
    /// The log sink.
    Log,
    /// The display sink.
    Display,
    /// The forward sink.
    Forward,
}

impl SinkKind {
    /// Lowercase name of the sink.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SinkKind::Log => "log",
            SinkKind::Display => "display",
            SinkKind::Forward => "forward",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while dispatching a message.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A configured sink strategy failed; later sinks did not run
    #[error("The {sink} sink failed: {source}")]
    Sink {
        /// Which sink failed
        sink: SinkKind,
        /// Error returned by the strategy
        source: SinkError,
    },

    /// Writing to the output stream failed
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}

impl DispatchError {
    /// The sink that failed, if the error came from a sink strategy.
    #[must_use]
    pub fn sink(&self) -> Option<SinkKind> {
        match self {
            DispatchError::Sink { sink, .. } => Some(*sink),
            DispatchError::Output(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use core::error::Error as _;

    use super::*;

    #[test]
    fn test_config_error_messages() {
        let error = ConfigError::UnsupportedOption {
            name: "colour".into(),
        };
        assert_eq!(error.to_string(), "Unsupported option: colour");

        let error = ConfigError::InvalidOptionType {
            name: "display_html",
            expected: "bool",
        };
        assert_eq!(
            error.to_string(),
            "Invalid type for option display_html: expected bool"
        );
    }

    #[test]
    fn test_sink_error_keeps_source() {
        let error = DispatchError::Sink {
            sink: SinkKind::Forward,
            source: "redirect refused".into(),
        };
        assert_eq!(error.sink(), Some(SinkKind::Forward));
        assert_eq!(
            error.to_string(),
            "The forward sink failed: redirect refused"
        );
        assert_eq!(
            error.source().map(ToString::to_string).as_deref(),
            Some("redirect refused")
        );
    }

    #[test]
    fn test_output_error_from_io() {
        let error = DispatchError::from(std::io::Error::other("closed"));
        assert_eq!(error.sink(), None);
        assert_eq!(error.to_string(), "Output error: closed");
    }
}
