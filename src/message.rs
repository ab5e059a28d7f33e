//! Final message composition.

use crate::{
    code::{CodeTable, ErrorCode},
    exception::Exception,
    header::{self, DefaultHeaderBuilder, HeaderBuilder as _},
};

/// Strategy combining the pieces of an error into the dispatched message.
///
/// The dispatcher only ever calls this trait, so the whole layout can be
/// replaced. Closures with the matching signature implement it:
///
/// ```
/// use faultline::MessageFormatter;
///
/// let terse = |header: &str, message: &str, _file: &str, _line: u32, _trace: &str| {
///     format!("{header} {message}")
/// };
/// assert_eq!(terse.format_message("Warning[2]:", "oops", "a.rs", 1, ""), "Warning[2]: oops");
/// ```
pub trait MessageFormatter {
    /// Builds the message from its header, raw text, source location and
    /// rendered trace.
    fn format_message(
        &self,
        header: &str,
        message: &str,
        file: &str,
        line: u32,
        trace: &str,
    ) -> String;
}

impl<F> MessageFormatter for F
where
    F: Fn(&str, &str, &str, u32, &str) -> String,
{
    fn format_message(
        &self,
        header: &str,
        message: &str,
        file: &str,
        line: u32,
        trace: &str,
    ) -> String {
        self(header, message, file, line, trace)
    }
}

/// Renders `<header> '<message>' in <file> on line <line><trace>`.
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultMessageFormatter;

impl MessageFormatter for DefaultMessageFormatter {
    fn format_message(
        &self,
        header: &str,
        message: &str,
        file: &str,
        line: u32,
        trace: &str,
    ) -> String {
        format!("{header} '{message}' in {file} on line {line}{trace}")
    }
}

/// Renders a native error as one line, without a trace.
///
/// ```
/// use faultline::{message::format_error_line, CodeTable, ErrorCode};
///
/// let line = format_error_line(&CodeTable::standard(), ErrorCode::NOTICE, "Undefined", "a.rs", 3);
/// assert_eq!(line, "Notice[8]: 'Undefined' in a.rs on line 3");
/// ```
#[must_use]
pub fn format_error_line(
    table: &CodeTable,
    code: ErrorCode,
    message: &str,
    file: &str,
    line: u32,
) -> String {
    let header = header::error_header_with(&DefaultHeaderBuilder, table, code);
    DefaultMessageFormatter.format_message(&header, message, file, line, "")
}

/// Renders an exception as one line, without its trace.
#[must_use]
pub fn format_exception_line(exception: &dyn Exception) -> String {
    DefaultMessageFormatter.format_message(
        &DefaultHeaderBuilder.exception_header(exception),
        exception.message(),
        exception.file(),
        exception.line(),
        "",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExceptionRecord, StackFrame};

    #[test]
    fn test_default_layout() {
        assert_eq!(
            DefaultMessageFormatter.format_message(
                "Notice[8]:",
                "Undefined index",
                "/srv/app.rs",
                17,
                ""
            ),
            "Notice[8]: 'Undefined index' in /srv/app.rs on line 17"
        );
    }

    #[test]
    fn test_trace_is_appended_verbatim() {
        let trace = "\nStack trace:\n#0 [internal function]: main()";
        let message = DefaultMessageFormatter.format_message("H:", "m", "f", 1, trace);
        assert_eq!(message, format!("H: 'm' in f on line 1{trace}"));
    }

    #[test]
    fn test_one_line_formats_skip_the_trace() {
        let exception = ExceptionRecord::new("RuntimeException", "boom")
            .with_code(3)
            .with_location("job.rs", 40)
            .with_trace(vec![StackFrame::function("run")]);
        assert_eq!(
            format_exception_line(&exception),
            "Uncaught Exception RuntimeException[3]: 'boom' in job.rs on line 40"
        );
        assert_eq!(
            format_error_line(&CodeTable::empty(), ErrorCode::WARNING, "w", "x.rs", 1),
            "Unknown error[2]: 'w' in x.rs on line 1"
        );
    }
}
