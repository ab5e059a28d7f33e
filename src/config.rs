//! Dispatcher configuration.
//!
//! [`Config`] is a plain typed struct. Loaders that only know option names
//! and loosely typed values go through [`Config::set`] and
//! [`Config::from_options`], which reject unknown names and mismatched value
//! types instead of coercing them.
//!
//! ```
//! use faultline::{Config, OptionName, OptionValue, Severity};
//!
//! let config = Config::from_options([
//!     ("display_level", OptionValue::from(Severity::ERROR.bits())),
//!     ("display_html", OptionValue::from(false)),
//! ])?;
//! assert_eq!(config.display_level(), Severity::ERROR);
//! assert!(!config.display_html());
//! assert_eq!(config.get(OptionName::LogLevel), OptionValue::Int(32767));
//!
//! assert!(Config::from_options([("display_html", OptionValue::from(1))]).is_err());
//! # Ok::<(), faultline::ConfigError>(())
//! ```

use core::{fmt, str::FromStr};

use crate::{error::ConfigError, severity::Severity};

/// Encoding assumed for output when none is configured.
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// The closed set of option names.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OptionName {
    /// `output_encoding`
    OutputEncoding,
    /// `log_level`
    LogLevel,
    /// `display_level`
    DisplayLevel,
    /// `forward_level`
    ForwardLevel,
    /// `display_html`
    DisplayHtml,
    /// `display_buffering`
    DisplayBuffering,
}

impl OptionName {
    /// Every option, in declaration order.
    pub const ALL: [OptionName; 6] = [
        OptionName::OutputEncoding,
        OptionName::LogLevel,
        OptionName::DisplayLevel,
        OptionName::ForwardLevel,
        OptionName::DisplayHtml,
        OptionName::DisplayBuffering,
    ];

    /// The option's configuration key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            OptionName::OutputEncoding => "output_encoding",
            OptionName::LogLevel => "log_level",
            OptionName::DisplayLevel => "display_level",
            OptionName::ForwardLevel => "forward_level",
            OptionName::DisplayHtml => "display_html",
            OptionName::DisplayBuffering => "display_buffering",
        }
    }

    const fn expected(self) -> &'static str {
        match self {
            OptionName::OutputEncoding => "string",
            OptionName::LogLevel | OptionName::DisplayLevel | OptionName::ForwardLevel => {
                "integer"
            }
            OptionName::DisplayHtml | OptionName::DisplayBuffering => "bool",
        }
    }
}

impl FromStr for OptionName {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        OptionName::ALL
            .into_iter()
            .find(|option| option.as_str() == name)
            .ok_or_else(|| ConfigError::UnsupportedOption {
                name: name.to_owned(),
            })
    }
}

impl fmt::Display for OptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loosely typed option value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionValue {
    /// A string.
    Str(String),
    /// An integer; bitmask options take these.
    Int(i64),
    /// A boolean.
    Bool(bool),
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u32> for OptionValue {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Severity> for OptionValue {
    fn from(value: Severity) -> Self {
        Self::Int(value.bits().into())
    }
}

/// Dispatcher settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    output_encoding: String,
    log_level: Severity,
    display_level: Severity,
    forward_level: Severity,
    display_html: bool,
    display_buffering: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_encoding: DEFAULT_ENCODING.to_owned(),
            log_level: Severity::ALL,
            display_level: Severity::ALL,
            forward_level: Severity::EXCEPTION | Severity::ERROR,
            display_html: true,
            display_buffering: false,
        }
    }
}

impl Config {
    /// Applies named options over the defaults, in order.
    ///
    /// # Errors
    ///
    /// Fails on the first unknown name or mistyped value.
    pub fn from_options<N, V>(options: impl IntoIterator<Item = (N, V)>) -> Result<Self, ConfigError>
    where
        N: AsRef<str>,
        V: Into<OptionValue>,
    {
        let mut config = Self::default();
        config.apply(options)?;
        Ok(config)
    }

    /// Applies named options to this configuration, in order.
    ///
    /// Options before the failing one stay applied.
    ///
    /// # Errors
    ///
    /// Fails on the first unknown name or mistyped value.
    pub fn apply<N, V>(&mut self, options: impl IntoIterator<Item = (N, V)>) -> Result<(), ConfigError>
    where
        N: AsRef<str>,
        V: Into<OptionValue>,
    {
        for (name, value) in options {
            let name = name.as_ref().parse::<OptionName>()?;
            self.set(name, value)?;
        }
        Ok(())
    }

    /// Reads an option by name.
    #[must_use]
    pub fn get(&self, name: OptionName) -> OptionValue {
        match name {
            OptionName::OutputEncoding => OptionValue::Str(self.output_encoding.clone()),
            OptionName::LogLevel => self.log_level.into(),
            OptionName::DisplayLevel => self.display_level.into(),
            OptionName::ForwardLevel => self.forward_level.into(),
            OptionName::DisplayHtml => OptionValue::Bool(self.display_html),
            OptionName::DisplayBuffering => OptionValue::Bool(self.display_buffering),
        }
    }

    /// Writes an option by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOptionType`] when the value kind does not
    /// match the option. Nothing is changed in that case.
    pub fn set(&mut self, name: OptionName, value: impl Into<OptionValue>) -> Result<(), ConfigError> {
        match (name, value.into()) {
            (OptionName::OutputEncoding, OptionValue::Str(value)) => self.output_encoding = value,
            (OptionName::LogLevel, OptionValue::Int(mask)) => {
                self.log_level = Severity::from_mask(mask);
            }
            (OptionName::DisplayLevel, OptionValue::Int(mask)) => {
                self.display_level = Severity::from_mask(mask);
            }
            (OptionName::ForwardLevel, OptionValue::Int(mask)) => {
                self.forward_level = Severity::from_mask(mask);
            }
            (OptionName::DisplayHtml, OptionValue::Bool(value)) => self.display_html = value,
            (OptionName::DisplayBuffering, OptionValue::Bool(value)) => {
                self.display_buffering = value;
            }
            (name, _) => {
                return Err(ConfigError::InvalidOptionType {
                    name: name.as_str(),
                    expected: name.expected(),
                });
            }
        }
        Ok(())
    }

    /// Encoding the output is meant for.
    #[must_use]
    pub fn output_encoding(&self) -> &str {
        &self.output_encoding
    }

    /// Sets the output encoding.
    pub fn set_output_encoding(&mut self, encoding: impl Into<String>) {
        self.output_encoding = encoding.into();
    }

    /// Severities the log sink fires for.
    #[must_use]
    pub fn log_level(&self) -> Severity {
        self.log_level
    }

    /// Sets the log sink mask.
    pub fn set_log_level(&mut self, level: Severity) {
        self.log_level = level;
    }

    /// Severities the display sink fires for.
    #[must_use]
    pub fn display_level(&self) -> Severity {
        self.display_level
    }

    /// Sets the display sink mask.
    pub fn set_display_level(&mut self, level: Severity) {
        self.display_level = level;
    }

    /// Severities the forward sink fires for.
    #[must_use]
    pub fn forward_level(&self) -> Severity {
        self.forward_level
    }

    /// Sets the forward sink mask.
    pub fn set_forward_level(&mut self, level: Severity) {
        self.forward_level = level;
    }

    /// Whether fallback display output is HTML.
    #[must_use]
    pub fn display_html(&self) -> bool {
        self.display_html
    }

    /// Switches fallback display output between HTML and plain text.
    pub fn set_display_html(&mut self, html: bool) {
        self.display_html = html;
    }

    /// Whether display output is buffered.
    #[must_use]
    pub fn display_buffering(&self) -> bool {
        self.display_buffering
    }

    /// Enables or disables display buffering.
    pub fn set_display_buffering(&mut self, buffering: bool) {
        self.display_buffering = buffering;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.output_encoding(), DEFAULT_ENCODING);
        assert_eq!(config.log_level(), Severity::ALL);
        assert_eq!(config.display_level(), Severity::ALL);
        assert_eq!(config.forward_level(), Severity::EXCEPTION | Severity::ERROR);
        assert!(config.display_html());
        assert!(!config.display_buffering());
    }

    #[test]
    fn test_option_names_round_trip() {
        for name in OptionName::ALL {
            assert_eq!(name.as_str().parse::<OptionName>(), Ok(name));
        }
    }

    #[test]
    fn test_unknown_option_fails() {
        assert_eq!(
            Config::from_options([("verbosity", 3)]),
            Err(ConfigError::UnsupportedOption {
                name: "verbosity".into()
            })
        );
    }

    #[test]
    fn test_wrong_type_fails_without_change() {
        let mut config = Config::default();
        assert_eq!(
            config.set(OptionName::DisplayBuffering, 1),
            Err(ConfigError::InvalidOptionType {
                name: "display_buffering",
                expected: "bool",
            })
        );
        assert_eq!(
            config.set(OptionName::LogLevel, "ALL"),
            Err(ConfigError::InvalidOptionType {
                name: "log_level",
                expected: "integer",
            })
        );
        assert_eq!(
            config.set(OptionName::OutputEncoding, true),
            Err(ConfigError::InvalidOptionType {
                name: "output_encoding",
                expected: "string",
            })
        );
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_set_and_get() {
        let mut config = Config::default();
        config.set(OptionName::ForwardLevel, Severity::WARNING).unwrap();
        config.set(OptionName::OutputEncoding, "ISO-8859-1").unwrap();
        config.set(OptionName::DisplayBuffering, true).unwrap();
        assert_eq!(config.forward_level(), Severity::WARNING);
        assert_eq!(config.get(OptionName::ForwardLevel), OptionValue::Int(4));
        assert_eq!(
            config.get(OptionName::OutputEncoding),
            OptionValue::Str("ISO-8859-1".into())
        );
        assert_eq!(config.get(OptionName::DisplayBuffering), OptionValue::Bool(true));
    }

    #[test]
    fn test_apply_keeps_earlier_options_on_failure() {
        let mut config = Config::default();
        let result = config.apply([
            ("display_html", OptionValue::Bool(false)),
            ("display_html", OptionValue::Int(0)),
        ]);
        assert!(result.is_err());
        assert!(!config.display_html());
    }

    #[test]
    fn test_mask_accepts_any_integer() {
        let config = Config::from_options([("log_level", OptionValue::Int(0))]).unwrap();
        assert_eq!(config.log_level(), Severity::NONE);
        let config = Config::from_options([("log_level", OptionValue::Int(-1))]).unwrap();
        assert!(config.log_level().contains(Severity::ALL));
    }
}
