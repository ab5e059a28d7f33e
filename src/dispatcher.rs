//! The dispatcher: intake, formatting and gated fan-out.

use core::fmt;
use std::io;

use tracing::{debug, trace, warn};

use crate::{
    code::{CodeTable, ErrorCode},
    config::{Config, OptionName, OptionValue},
    error::{ConfigError, DispatchError, SinkKind},
    exception::Exception,
    header::{self, DefaultHeaderBuilder, HeaderBuilder},
    host::{NoTrace, ReportAll, ReportingFilter, TraceSource},
    html,
    message::{DefaultMessageFormatter, MessageFormatter},
    severity::Severity,
    sink::{DisplaySink, Sink},
    trace::{DefaultTraceFormatter, StackFrame, TraceFormatter},
};

/// Number of innermost frames dropped from a captured trace by default: the
/// handler's own frame and its caller.
pub const DEFAULT_FRAMES_TO_SKIP: usize = 2;

/// A signal raised by the host, as received by [`Dispatcher::handle`].
#[derive(Copy, Clone, Debug)]
pub enum Signal<'a> {
    /// An uncaught exception.
    Exception(&'a dyn Exception),
    /// A native error.
    Error {
        /// Native error code.
        code: ErrorCode,
        /// Error message.
        message: &'a str,
        /// File the error was raised in.
        file: &'a str,
        /// Line the error was raised on.
        line: u32,
    },
}

/// Routes errors and exceptions to the log, display and forward sinks.
///
/// Each intake call formats one message and hands it to the three sinks in
/// that fixed order. A sink fires when its configured mask admits the
/// message severity. A failing sink stops the ones after it and its error is
/// returned to the caller.
///
/// ```
/// use std::{cell::RefCell, rc::Rc};
///
/// use faultline::{sink, Dispatcher, ErrorCode, Severity};
///
/// let logged = Rc::new(RefCell::new(Vec::new()));
/// let mut dispatcher = Dispatcher::with_options([("display_level", Severity::NONE)])?;
/// dispatcher.set_logger(sink::from_fn({
///     let logged = Rc::clone(&logged);
///     move |message: &str, _exception| {
///         logged.borrow_mut().push(message.to_owned());
///         Ok(())
///     }
/// }));
///
/// assert!(dispatcher.handle_error(ErrorCode::WARNING, "careful", "main.rs", 9)?);
/// assert_eq!(
///     logged.borrow().as_slice(),
///     ["Warning[2]: 'careful' in main.rs on line 9"]
/// );
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Dispatcher {
    config: Config,
    header_builder: Box<dyn HeaderBuilder>,
    message_formatter: Box<dyn MessageFormatter>,
    trace_formatter: Box<dyn TraceFormatter>,
    logger: Option<Box<dyn Sink>>,
    display: Option<Box<dyn DisplaySink>>,
    forward: Option<Box<dyn Sink>>,
    reporting: Box<dyn ReportingFilter>,
    trace_source: Box<dyn TraceSource>,
    frames_to_skip: usize,
    codes: CodeTable,
    output: Box<dyn io::Write>,
    buffer: Vec<String>,
    closed: bool,
}

impl Dispatcher {
    /// Creates a dispatcher with the default configuration and strategies,
    /// writing fallback display output to stdout.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(Config::default())
    }

    /// Creates a dispatcher with named options applied over the defaults.
    ///
    /// # Errors
    ///
    /// Fails on the first unknown option name or mistyped value.
    pub fn with_options<N, V>(options: impl IntoIterator<Item = (N, V)>) -> Result<Self, ConfigError>
    where
        N: AsRef<str>,
        V: Into<OptionValue>,
    {
        Ok(Self::from_config(Config::from_options(options)?))
    }

    /// Creates a dispatcher from a prepared configuration.
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            header_builder: Box::new(DefaultHeaderBuilder),
            message_formatter: Box::new(DefaultMessageFormatter),
            trace_formatter: Box::new(DefaultTraceFormatter),
            logger: None,
            display: None,
            forward: None,
            reporting: Box::new(ReportAll),
            trace_source: Box::new(NoTrace),
            frames_to_skip: DEFAULT_FRAMES_TO_SKIP,
            codes: CodeTable::standard(),
            output: Box::new(io::stdout()),
            buffer: Vec::new(),
            closed: false,
        }
    }

    /// Resets configuration, formatters, sinks and buffer to their defaults,
    /// then applies `options`.
    ///
    /// The host capabilities (reporting filter, trace source, frames to
    /// skip, code table and output stream) are kept.
    ///
    /// # Errors
    ///
    /// Fails on the first unknown option name or mistyped value; earlier
    /// options stay applied.
    pub fn init<N, V>(&mut self, options: impl IntoIterator<Item = (N, V)>) -> Result<(), ConfigError>
    where
        N: AsRef<str>,
        V: Into<OptionValue>,
    {
        self.config = Config::default();
        self.header_builder = Box::new(DefaultHeaderBuilder);
        self.message_formatter = Box::new(DefaultMessageFormatter);
        self.trace_formatter = Box::new(DefaultTraceFormatter);
        self.logger = None;
        self.display = None;
        self.forward = None;
        self.buffer.clear();
        self.config.apply(options)
    }

    /// The current configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Reads an option by name.
    ///
    /// # Errors
    ///
    /// Fails if the name is not a known option.
    pub fn option(&self, name: &str) -> Result<OptionValue, ConfigError> {
        Ok(self.config.get(name.parse::<OptionName>()?))
    }

    /// Writes an option by name.
    ///
    /// # Errors
    ///
    /// Fails if the name is not a known option or the value has the wrong
    /// type.
    pub fn set_option(&mut self, name: &str, value: impl Into<OptionValue>) -> Result<(), ConfigError> {
        self.config.set(name.parse::<OptionName>()?, value)
    }

    /// Replaces the header builder.
    pub fn set_header_builder(&mut self, builder: impl HeaderBuilder + 'static) -> &mut Self {
        self.header_builder = Box::new(builder);
        self
    }

    /// Replaces the message formatter.
    pub fn set_message_formatter(&mut self, formatter: impl MessageFormatter + 'static) -> &mut Self {
        self.message_formatter = Box::new(formatter);
        self
    }

    /// Replaces the trace formatter.
    pub fn set_trace_formatter(&mut self, formatter: impl TraceFormatter + 'static) -> &mut Self {
        self.trace_formatter = Box::new(formatter);
        self
    }

    /// Installs the log sink.
    pub fn set_logger(&mut self, logger: impl Sink + 'static) -> &mut Self {
        self.logger = Some(Box::new(logger));
        self
    }

    /// Installs the display sink, replacing the fallback rendering.
    pub fn set_display(&mut self, display: impl DisplaySink + 'static) -> &mut Self {
        self.display = Some(Box::new(display));
        self
    }

    /// Installs the forward sink.
    pub fn set_forward(&mut self, forward: impl Sink + 'static) -> &mut Self {
        self.forward = Some(Box::new(forward));
        self
    }

    /// Removes every installed sink.
    pub fn clear_sinks(&mut self) -> &mut Self {
        self.logger = None;
        self.display = None;
        self.forward = None;
        self
    }

    /// Replaces the host reporting filter consulted by
    /// [`handle_error`](Self::handle_error).
    pub fn set_reporting_filter(&mut self, filter: impl ReportingFilter + 'static) -> &mut Self {
        self.reporting = Box::new(filter);
        self
    }

    /// Replaces the source of call stacks for native errors.
    pub fn set_trace_source(&mut self, source: impl TraceSource + 'static) -> &mut Self {
        self.trace_source = Box::new(source);
        self
    }

    /// Number of innermost frames dropped from captured traces.
    #[must_use]
    pub fn frames_to_skip(&self) -> usize {
        self.frames_to_skip
    }

    /// Sets how many innermost frames are dropped from captured traces.
    ///
    /// Raise it by one for every wrapper layer between the host and
    /// [`handle_error`](Self::handle_error).
    pub fn set_frames_to_skip(&mut self, frames: usize) -> &mut Self {
        self.frames_to_skip = frames;
        self
    }

    /// The table used to label and classify native codes.
    #[must_use]
    pub fn code_table(&self) -> &CodeTable {
        &self.codes
    }

    /// Mutable access to the code table.
    pub fn code_table_mut(&mut self) -> &mut CodeTable {
        &mut self.codes
    }

    /// Replaces the stream that fallback display output and buffer flushes
    /// are written to.
    pub fn set_output(&mut self, output: Box<dyn io::Write>) -> &mut Self {
        self.output = output;
        self
    }

    /// Dispatches an uncaught exception with severity
    /// [`EXCEPTION`](Severity::EXCEPTION).
    ///
    /// # Errors
    ///
    /// Returns the first sink or output failure.
    pub fn handle_exception(&mut self, exception: &dyn Exception) -> Result<(), DispatchError> {
        let message = self.format_exception(exception);
        self.dispatch(&message, Severity::EXCEPTION, Some(exception))
    }

    /// Formats an exception with its trace, as dispatched by
    /// [`handle_exception`](Self::handle_exception).
    #[must_use]
    pub fn format_exception(&self, exception: &dyn Exception) -> String {
        self.message_formatter.format_message(
            &self.build_exception_header(exception),
            exception.message(),
            exception.file(),
            exception.line(),
            &self.trace_formatter.format_trace(exception.trace()),
        )
    }

    /// Dispatches a native error.
    ///
    /// Returns `Ok(false)` without dispatching when the host reporting
    /// filter excludes `code`. Otherwise the current call stack is captured,
    /// the code is classified, and `Ok(true)` is returned once every gated
    /// sink has run.
    ///
    /// # Errors
    ///
    /// Returns the first sink or output failure.
    pub fn handle_error(
        &mut self,
        code: ErrorCode,
        message: &str,
        file: &str,
        line: u32,
    ) -> Result<bool, DispatchError> {
        if !self.reporting.is_reported(code) {
            debug!(code = code.0, "native error excluded by the reporting filter");
            return Ok(false);
        }
        let trace = self.trace_source.capture(self.frames_to_skip);
        let message = self.format_error(code, message, file, line, &trace);
        self.dispatch(&message, self.codes.classify(code), None)?;
        Ok(true)
    }

    /// Formats a native error with the given trace, as dispatched by
    /// [`handle_error`](Self::handle_error).
    #[must_use]
    pub fn format_error(
        &self,
        code: ErrorCode,
        message: &str,
        file: &str,
        line: u32,
        trace: &[StackFrame],
    ) -> String {
        self.message_formatter.format_message(
            &self.build_error_header(code),
            message,
            file,
            line,
            &self.trace_formatter.format_trace(trace),
        )
    }

    /// Routes a host signal to the matching intake.
    ///
    /// Exceptions always report `true`.
    ///
    /// # Errors
    ///
    /// Returns the first sink or output failure.
    pub fn handle(&mut self, signal: Signal<'_>) -> Result<bool, DispatchError> {
        match signal {
            Signal::Exception(exception) => self.handle_exception(exception).map(|()| true),
            Signal::Error {
                code,
                message,
                file,
                line,
            } => self.handle_error(code, message, file, line),
        }
    }

    /// Returns the exception intake as a closure, for host glue that
    /// registers handler functions.
    pub fn exception_handler(
        &mut self,
    ) -> impl FnMut(&dyn Exception) -> Result<(), DispatchError> + '_ {
        move |exception: &dyn Exception| self.handle_exception(exception)
    }

    /// Returns the native error intake as a closure.
    pub fn error_handler(
        &mut self,
    ) -> impl FnMut(ErrorCode, &str, &str, u32) -> Result<bool, DispatchError> + '_ {
        move |code: ErrorCode, message: &str, file: &str, line: u32| {
            self.handle_error(code, message, file, line)
        }
    }

    /// Header for a native code, using the configured builder and code table.
    #[must_use]
    pub fn build_error_header(&self, code: ErrorCode) -> String {
        header::error_header_with(self.header_builder.as_ref(), &self.codes, code)
    }

    /// Header for an exception, using the configured builder.
    #[must_use]
    pub fn build_exception_header(&self, exception: &dyn Exception) -> String {
        self.header_builder.exception_header(exception)
    }

    fn dispatch(
        &mut self,
        message: &str,
        severity: Severity,
        exception: Option<&dyn Exception>,
    ) -> Result<(), DispatchError> {
        self.log(message, Some(severity), exception)?;
        self.display(message, Some(severity), exception)?;
        self.forward(message, Some(severity), exception)
    }

    /// Sends a message to the log sink.
    ///
    /// Fires when `severity` is `None` or admitted by the log mask, and a
    /// logger is installed.
    ///
    /// # Errors
    ///
    /// Returns the logger's failure.
    pub fn log(
        &mut self,
        message: &str,
        severity: Option<Severity>,
        exception: Option<&dyn Exception>,
    ) -> Result<(), DispatchError> {
        emit(
            &mut self.logger,
            SinkKind::Log,
            self.config.log_level(),
            message,
            severity,
            exception,
        )
    }

    /// Sends a message to the display sink.
    ///
    /// Fires when `severity` is `None` or admitted by the display mask.
    /// Without an installed display sink the message is written to the
    /// output stream, HTML-escaped inside `<pre>` when `display_html` is set.
    /// With `display_buffering` set, the rendered output becomes a new buffer
    /// entry instead.
    ///
    /// # Errors
    ///
    /// Returns the display sink's failure, or the output stream's.
    pub fn display(
        &mut self,
        message: &str,
        severity: Option<Severity>,
        exception: Option<&dyn Exception>,
    ) -> Result<(), DispatchError> {
        if !self.config.display_level().admits(severity) {
            debug!(sink = %SinkKind::Display, ?severity, "message gated out");
            return Ok(());
        }
        let as_html = self.config.display_html();
        if self.config.display_buffering() {
            let mut captured = Vec::new();
            render(&mut self.display, as_html, &mut captured, message, exception)?;
            trace!(bytes = captured.len(), "buffered display output");
            self.buffer
                .push(String::from_utf8_lossy(&captured).into_owned());
            return Ok(());
        }
        render(&mut self.display, as_html, &mut *self.output, message, exception)?;
        self.output.flush()?;
        Ok(())
    }

    /// Sends a message to the forward sink.
    ///
    /// Fires when `severity` is `None` or admitted by the forward mask, and a
    /// forward sink is installed.
    ///
    /// # Errors
    ///
    /// Returns the forward sink's failure.
    pub fn forward(
        &mut self,
        message: &str,
        severity: Option<Severity>,
        exception: Option<&dyn Exception>,
    ) -> Result<(), DispatchError> {
        emit(
            &mut self.forward,
            SinkKind::Forward,
            self.config.forward_level(),
            message,
            severity,
            exception,
        )
    }

    /// Buffered display entries, in capture order.
    #[must_use]
    pub fn buffer(&self) -> &[String] {
        &self.buffer
    }

    /// Discards the buffered display entries.
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    /// Writes the buffered entries, joined by newlines, to the output stream.
    ///
    /// The buffer is left as is.
    ///
    /// # Errors
    ///
    /// Returns the output stream's failure.
    pub fn flush_buffer(&mut self) -> Result<(), DispatchError> {
        self.output.write_all(self.buffer.join("\n").as_bytes())?;
        self.output.flush()?;
        Ok(())
    }

    /// Ends the dispatcher's lifetime, flushing the buffer once if
    /// `display_buffering` is enabled.
    ///
    /// Dropping the dispatcher performs the same flush, but can only report
    /// a failure through `tracing`.
    ///
    /// # Errors
    ///
    /// Returns the output stream's failure.
    pub fn close(mut self) -> Result<(), DispatchError> {
        self.finish()
    }

    fn finish(&mut self) -> Result<(), DispatchError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.config.display_buffering() {
            debug!(entries = self.buffer.len(), "flushing display buffer");
            self.flush_buffer()?;
        }
        Ok(())
    }
}

fn emit(
    slot: &mut Option<Box<dyn Sink>>,
    kind: SinkKind,
    mask: Severity,
    message: &str,
    severity: Option<Severity>,
    exception: Option<&dyn Exception>,
) -> Result<(), DispatchError> {
    if !mask.admits(severity) {
        debug!(sink = %kind, ?severity, "message gated out");
        return Ok(());
    }
    let Some(sink) = slot.as_mut() else {
        debug!(sink = %kind, "no sink installed");
        return Ok(());
    };
    sink.emit(message, exception)
        .map_err(|source| DispatchError::Sink { sink: kind, source })
}

fn render(
    display: &mut Option<Box<dyn DisplaySink>>,
    as_html: bool,
    out: &mut dyn io::Write,
    message: &str,
    exception: Option<&dyn Exception>,
) -> Result<(), DispatchError> {
    match display {
        Some(display) => display
            .display(out, message, exception)
            .map_err(|source| DispatchError::Sink {
                sink: SinkKind::Display,
                source,
            }),
        None if as_html => Ok(out.write_all(html::preformatted(message).as_bytes())?),
        None => Ok(out.write_all(message.as_bytes())?),
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if let Err(error) = self.finish() {
            warn!(%error, "failed to flush the display buffer on drop");
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("logger", &self.logger.is_some())
            .field("display", &self.display.is_some())
            .field("forward", &self.forward.is_some())
            .field("frames_to_skip", &self.frames_to_skip)
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}
