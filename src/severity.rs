//! Severity levels and the per-sink severity masks.
//!
//! Every message that reaches the [`Dispatcher`] carries exactly one severity
//! bit. Each sink is configured with a mask, the union of the severities it
//! should receive, and fires iff the mask intersects the message severity.
//!
//! ```
//! use faultline::Severity;
//!
//! let mask = Severity::EXCEPTION | Severity::ERROR;
//! assert!(mask.admits(Some(Severity::ERROR)));
//! assert!(!mask.admits(Some(Severity::WARNING)));
//! // A message without a severity always passes.
//! assert!(Severity::NONE.admits(None));
//! ```
//!
//! [`Dispatcher`]: crate::Dispatcher

use core::fmt;

use bitflags::bitflags;

bitflags! {
    /// A single severity level, or a mask made of several.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Severity: u32 {
        /// An uncaught exception.
        const EXCEPTION = 1;
        /// A fatal or recoverable error.
        const ERROR = 2;
        /// A warning.
        const WARNING = 4;
        /// A notice.
        const NOTICE = 8;
        /// Strict-standards and deprecation messages.
        const INFO = 16;
        /// A native code that has no classification.
        const UNKNOWN = 32;
        /// Every severity, including bits reserved for future levels.
        const ALL = 32767;
    }
}

impl Severity {
    /// The empty mask. A sink configured with it never fires for a message
    /// that carries a severity.
    pub const NONE: Self = Self::empty();

    /// Returns whether a sink configured with this mask should fire for a
    /// message of the given severity.
    ///
    /// Messages without a severity are always admitted.
    #[inline]
    #[must_use]
    pub const fn admits(self, severity: Option<Severity>) -> bool {
        match severity {
            Some(severity) => self.bits() & severity.bits() != 0,
            None => true,
        }
    }

    /// Builds a mask from a raw integer, keeping bits that name no level.
    ///
    /// Negative and out-of-range values set every bit, so `-1` behaves like
    /// [`Severity::ALL`].
    #[must_use]
    pub const fn from_mask(mask: i64) -> Self {
        if mask < 0 || mask > u32::MAX as i64 {
            Self::from_bits_retain(u32::MAX)
        } else {
            Self::from_bits_retain(mask as u32)
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        if *self == Self::ALL {
            return f.write_str("ALL");
        }
        bitflags::parser::to_writer(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVELS: [Severity; 6] = [
        Severity::EXCEPTION,
        Severity::ERROR,
        Severity::WARNING,
        Severity::NOTICE,
        Severity::INFO,
        Severity::UNKNOWN,
    ];

    #[test]
    fn test_levels_are_distinct_bits() {
        for (i, a) in LEVELS.iter().enumerate() {
            assert_eq!(a.bits().count_ones(), 1);
            for b in &LEVELS[i + 1..] {
                assert!(!a.intersects(*b));
            }
        }
    }

    #[test]
    fn test_mask_gating_for_every_level() {
        for level in LEVELS {
            assert!(!Severity::NONE.admits(Some(level)));
            assert!(Severity::ALL.admits(Some(level)));
            assert!(level.admits(Some(level)));
            for other in LEVELS.into_iter().filter(|other| *other != level) {
                assert!(!level.admits(Some(other)));
                assert!((level | other).admits(Some(other)));
            }
        }
    }

    #[test]
    fn test_absent_severity_always_admitted() {
        assert!(Severity::NONE.admits(None));
        assert!(Severity::ERROR.admits(None));
    }

    #[test]
    fn test_from_mask() {
        assert_eq!(Severity::from_mask(0), Severity::NONE);
        assert_eq!(Severity::from_mask(3), Severity::EXCEPTION | Severity::ERROR);
        assert_eq!(Severity::from_mask(32767), Severity::ALL);
        assert!(Severity::from_mask(-1).contains(Severity::ALL));
    }

    #[test]
    fn test_display() {
        assert_eq!(Severity::NONE.to_string(), "NONE");
        assert_eq!(Severity::ALL.to_string(), "ALL");
        assert_eq!(
            (Severity::EXCEPTION | Severity::ERROR).to_string(),
            "EXCEPTION | ERROR"
        );
    }
}
