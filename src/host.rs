//! Capabilities the dispatcher queries from its host.
//!
//! A host decides which native codes are reported at all, and knows how to
//! capture the current call stack. Both are injected so they can be replaced
//! in tests and by companion crates such as `faultline-backtrace`.

use crate::{code::ErrorCode, trace::Trace};

/// The host's own reporting filter, consulted before a native error is
/// dispatched.
pub trait ReportingFilter {
    /// Returns whether errors with this code are reported.
    fn is_reported(&self, code: ErrorCode) -> bool;
}

impl<F> ReportingFilter for F
where
    F: Fn(ErrorCode) -> bool,
{
    fn is_reported(&self, code: ErrorCode) -> bool {
        self(code)
    }
}

/// Reports every code.
#[derive(Copy, Clone, Debug, Default)]
pub struct ReportAll;

impl ReportingFilter for ReportAll {
    fn is_reported(&self, _code: ErrorCode) -> bool {
        true
    }
}

/// Reports codes whose bits intersect the mask, like a host's active
/// error-reporting level.
///
/// ```
/// use faultline::{ErrorCode, ReportingFilter, ReportingMask};
///
/// let filter = ReportingMask(!ErrorCode::NOTICE.0);
/// assert!(filter.is_reported(ErrorCode::WARNING));
/// assert!(!filter.is_reported(ErrorCode::NOTICE));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReportingMask(pub i32);

impl ReportingFilter for ReportingMask {
    fn is_reported(&self, code: ErrorCode) -> bool {
        self.0 & code.0 != 0
    }
}

/// Captures the call stack at the point a native error is handled.
pub trait TraceSource {
    /// Captures the current stack, innermost frame first, without its
    /// `skip` innermost frames.
    fn capture(&self, skip: usize) -> Trace;
}

impl<F> TraceSource for F
where
    F: Fn(usize) -> Trace,
{
    fn capture(&self, skip: usize) -> Trace {
        self(skip)
    }
}

/// A source that never has any frames.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoTrace;

impl TraceSource for NoTrace {
    fn capture(&self, _skip: usize) -> Trace {
        Trace::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StackFrame;

    #[test]
    fn test_report_all() {
        assert!(ReportAll.is_reported(ErrorCode(0)));
        assert!(ReportAll.is_reported(ErrorCode::USER_DEPRECATED));
    }

    #[test]
    fn test_reporting_mask_zero_reports_nothing() {
        let filter = ReportingMask(0);
        assert!(!filter.is_reported(ErrorCode::ERROR));
        assert!(!filter.is_reported(ErrorCode(0)));
    }

    #[test]
    fn test_closure_filter() {
        let only_warnings = |code: ErrorCode| code == ErrorCode::WARNING;
        assert!(only_warnings.is_reported(ErrorCode::WARNING));
        assert!(!only_warnings.is_reported(ErrorCode::ERROR));
    }

    #[test]
    fn test_closure_source_sees_skip() {
        let source = |skip: usize| {
            (0..4)
                .map(|i| StackFrame::function(format!("f{i}")))
                .collect::<Trace>()
                .skip(skip)
        };
        let trace = source.capture(2);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].function.as_deref(), Some("f2"));
        assert!(NoTrace.capture(0).is_empty());
    }
}
