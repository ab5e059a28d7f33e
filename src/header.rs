//! One-line classification headers.
//!
//! Every dispatched message starts with a header naming what went wrong:
//! `"Warning[2]:"` for a native error, `"Uncaught Exception NotFound[404]:"`
//! for an exception.

use crate::{
    code::{self, CodeTable, ErrorCode},
    exception::Exception,
};

/// Strategy producing message headers.
pub trait HeaderBuilder {
    /// Header for a native error code, given the label the dispatcher's
    /// [`CodeTable`] resolved for it.
    fn error_header(&self, code: ErrorCode, label: &str) -> String;

    /// Header for an uncaught exception.
    fn exception_header(&self, exception: &dyn Exception) -> String;
}

/// Renders `"<Label>[<code>]:"` and `"Uncaught Exception <Type>[<code>]:"`.
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultHeaderBuilder;

impl HeaderBuilder for DefaultHeaderBuilder {
    fn error_header(&self, code: ErrorCode, label: &str) -> String {
        format!("{label}[{code}]:")
    }

    fn exception_header(&self, exception: &dyn Exception) -> String {
        format!(
            "Uncaught Exception {}[{}]:",
            exception.type_name(),
            exception.code()
        )
    }
}

/// Builds the default header for a code using the standard labels.
///
/// ```
/// use faultline::{header, ErrorCode};
///
/// assert_eq!(header::error_header(ErrorCode::WARNING), "Warning[2]:");
/// assert_eq!(header::error_header(ErrorCode(0)), "Unknown error[0]:");
/// ```
#[must_use]
pub fn error_header(code: ErrorCode) -> String {
    DefaultHeaderBuilder.error_header(code, code::label(code))
}

/// Builds the default header for an exception.
#[must_use]
pub fn exception_header(exception: &dyn Exception) -> String {
    DefaultHeaderBuilder.exception_header(exception)
}

/// Builds a header for `code` with `builder`, resolving the label in `table`.
pub(crate) fn error_header_with(
    builder: &dyn HeaderBuilder,
    table: &CodeTable,
    code: ErrorCode,
) -> String {
    builder.error_header(code, table.label(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExceptionRecord, Severity};

    #[test]
    fn test_error_header_ends_with_code() {
        let table = CodeTable::standard();
        for (code, _) in table.iter() {
            let header = error_header(code);
            assert!(header.ends_with(&format!("[{code}]:")), "{header}");
            assert!(header.starts_with(table.label(code)));
        }
        assert_eq!(error_header(ErrorCode(0)), "Unknown error[0]:");
    }

    #[test]
    fn test_error_header_known_labels() {
        assert_eq!(error_header(ErrorCode::ERROR), "Fatal error[1]:");
        assert_eq!(error_header(ErrorCode::USER_DEPRECATED), "User Deprecated[16384]:");
        assert_eq!(error_header(ErrorCode(-3)), "Unknown error[-3]:");
    }

    #[test]
    fn test_error_header_with_custom_table() {
        let mut table = CodeTable::empty();
        table.insert(ErrorCode(77), "Quota exceeded", Severity::WARNING);
        assert_eq!(
            error_header_with(&DefaultHeaderBuilder, &table, ErrorCode(77)),
            "Quota exceeded[77]:"
        );
        assert_eq!(
            error_header_with(&DefaultHeaderBuilder, &table, ErrorCode::WARNING),
            "Unknown error[2]:"
        );
    }

    #[test]
    fn test_exception_header() {
        let exception = ExceptionRecord::new("HttpException", "missing").with_code(404);
        assert_eq!(
            exception_header(&exception),
            "Uncaught Exception HttpException[404]:"
        );
        let unset = ExceptionRecord::new("LogicException", "bad");
        assert!(exception_header(&unset).ends_with("LogicException[0]:"));
    }
}
