//! Native error codes and their classification.
//!
//! The host runtime reports errors with an opaque integer code. A [`CodeTable`]
//! maps each code it knows to a human-readable label and a [`Severity`];
//! unknown codes fall back to `"Unknown error"` and [`Severity::UNKNOWN`], so
//! lookups never fail.
//!
//! ```
//! use faultline::{CodeTable, ErrorCode, Severity};
//!
//! let mut table = CodeTable::standard();
//! assert_eq!(table.label(ErrorCode::USER_WARNING), "User Warning");
//! assert_eq!(table.classify(ErrorCode(0)), Severity::UNKNOWN);
//!
//! // Hosts with their own codes can extend the table.
//! table.insert(ErrorCode(1 << 20), "Timeout", Severity::WARNING);
//! assert_eq!(table.classify(ErrorCode(1 << 20)), Severity::WARNING);
//! ```

use core::fmt;
use std::borrow::Cow;

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use crate::Severity;

/// Label used for every code missing from a table.
pub const UNKNOWN_LABEL: &str = "Unknown error";

/// An error code supplied by the host runtime.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// Fatal run-time error.
    pub const ERROR: Self = Self(1);
    /// Run-time warning.
    pub const WARNING: Self = Self(2);
    /// Compile-time parse error.
    pub const PARSE: Self = Self(4);
    /// Run-time notice.
    pub const NOTICE: Self = Self(8);
    /// Fatal error during startup.
    pub const CORE_ERROR: Self = Self(16);
    /// Warning during startup.
    pub const CORE_WARNING: Self = Self(32);
    /// Fatal compile-time error.
    pub const COMPILE_ERROR: Self = Self(64);
    /// Compile-time warning.
    pub const COMPILE_WARNING: Self = Self(128);
    /// User-triggered error.
    pub const USER_ERROR: Self = Self(256);
    /// User-triggered warning.
    pub const USER_WARNING: Self = Self(512);
    /// User-triggered notice.
    pub const USER_NOTICE: Self = Self(1024);
    /// Strict-standards suggestion.
    pub const STRICT: Self = Self(2048);
    /// Catchable fatal error.
    pub const RECOVERABLE_ERROR: Self = Self(4096);
    /// Deprecation notice.
    pub const DEPRECATED: Self = Self(8192);
    /// User-triggered deprecation notice.
    pub const USER_DEPRECATED: Self = Self(16384);
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

const STANDARD_CODES: [(ErrorCode, &str, Severity); 10] = [
    (ErrorCode::ERROR, "Fatal error", Severity::ERROR),
    (ErrorCode::WARNING, "Warning", Severity::WARNING),
    (ErrorCode::NOTICE, "Notice", Severity::NOTICE),
    (ErrorCode::STRICT, "Strict standards", Severity::INFO),
    (
        ErrorCode::RECOVERABLE_ERROR,
        "Catchable fatal error",
        Severity::ERROR,
    ),
    (ErrorCode::DEPRECATED, "Deprecated", Severity::INFO),
    (ErrorCode::USER_ERROR, "User Fatal error", Severity::ERROR),
    (ErrorCode::USER_WARNING, "User Warning", Severity::WARNING),
    (ErrorCode::USER_NOTICE, "User Notice", Severity::NOTICE),
    (ErrorCode::USER_DEPRECATED, "User Deprecated", Severity::INFO),
];

/// Classifies a code with the standard table.
///
/// Total over every code: anything unrecognized is [`Severity::UNKNOWN`].
#[must_use]
pub fn classify(code: ErrorCode) -> Severity {
    STANDARD_CODES
        .iter()
        .find(|(known, _, _)| *known == code)
        .map_or(Severity::UNKNOWN, |(_, _, severity)| *severity)
}

/// Returns the standard label of a code, or [`UNKNOWN_LABEL`].
#[must_use]
pub fn label(code: ErrorCode) -> &'static str {
    STANDARD_CODES
        .iter()
        .find(|(known, _, _)| *known == code)
        .map_or(UNKNOWN_LABEL, |(_, label, _)| *label)
}

/// What a [`CodeTable`] knows about one code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeEntry {
    /// Label printed in error headers.
    pub label: Cow<'static, str>,
    /// Severity the code is dispatched with.
    pub severity: Severity,
}

/// Lookup table from native codes to labels and severities.
#[derive(Clone, Debug)]
pub struct CodeTable {
    entries: HashMap<ErrorCode, CodeEntry, FxBuildHasher>,
}

impl CodeTable {
    /// Creates a table that knows no codes.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: HashMap::with_hasher(FxBuildHasher),
        }
    }

    /// Creates the table of standard host codes.
    #[must_use]
    pub fn standard() -> Self {
        let mut table = Self::empty();
        for (code, label, severity) in STANDARD_CODES {
            table.insert(code, label, severity);
        }
        table
    }

    /// Registers a code, returning the entry it replaced.
    pub fn insert(
        &mut self,
        code: ErrorCode,
        label: impl Into<Cow<'static, str>>,
        severity: Severity,
    ) -> Option<CodeEntry> {
        self.entries.insert(
            code,
            CodeEntry {
                label: label.into(),
                severity,
            },
        )
    }

    /// Removes a code from the table.
    pub fn remove(&mut self, code: ErrorCode) -> Option<CodeEntry> {
        self.entries.remove(&code)
    }

    /// Returns the entry for a code, if the table knows it.
    #[must_use]
    pub fn get(&self, code: ErrorCode) -> Option<&CodeEntry> {
        self.entries.get(&code)
    }

    /// Returns the label for a code, falling back to [`UNKNOWN_LABEL`].
    #[must_use]
    pub fn label(&self, code: ErrorCode) -> &str {
        self.get(code)
            .map_or(UNKNOWN_LABEL, |entry| entry.label.as_ref())
    }

    /// Returns the severity for a code, falling back to
    /// [`Severity::UNKNOWN`].
    #[must_use]
    pub fn classify(&self, code: ErrorCode) -> Severity {
        self.get(code)
            .map_or(Severity::UNKNOWN, |entry| entry.severity)
    }

    /// Number of known codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table knows no codes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the known codes in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (ErrorCode, &CodeEntry)> {
        self.entries.iter().map(|(code, entry)| (*code, entry))
    }
}

impl Default for CodeTable {
    fn default() -> Self {
        Self::standard()
    }
}
