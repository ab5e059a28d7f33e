//! Sink strategies.
//!
//! The log and forward slots take a [`Sink`]; the display slot takes a
//! [`DisplaySink`], which writes into the stream handed to it so that the
//! dispatcher can redirect the output into its buffer.
//!
//! Closures are wrapped with [`from_fn`] and [`display_fn`]:
//!
//! ```
//! use std::io::Write as _;
//!
//! use faultline::sink::{self, DisplaySink as _, Sink as _};
//!
//! let mut lines = Vec::new();
//! let mut logger = sink::from_fn(|message: &str, _exception| {
//!     lines.push(message.to_owned());
//!     Ok(())
//! });
//! logger.emit("first", None)?;
//! drop(logger);
//! assert_eq!(lines, ["first"]);
//!
//! let mut display = sink::display_fn(|out, message: &str, _exception| {
//!     write!(out, "<{message}>")?;
//!     Ok(())
//! });
//! let mut out = Vec::new();
//! display.display(&mut out, "second", None)?;
//! assert_eq!(out, b"<second>");
//! # Ok::<(), faultline::SinkError>(())
//! ```

use std::io;

use crate::{error::SinkError, exception::Exception};

/// A log or forward target.
pub trait Sink {
    /// Receives a formatted message and the exception it came from, if any.
    ///
    /// # Errors
    ///
    /// Errors are propagated to the intake caller and stop the sinks that
    /// would have run afterwards.
    fn emit(&mut self, message: &str, exception: Option<&dyn Exception>) -> Result<(), SinkError>;
}

/// A display target.
pub trait DisplaySink {
    /// Renders a formatted message into `out`.
    ///
    /// `out` is either the dispatcher's output stream or, while buffering,
    /// the next buffer entry.
    ///
    /// # Errors
    ///
    /// Errors are propagated to the intake caller and stop the forward sink.
    fn display(
        &mut self,
        out: &mut dyn io::Write,
        message: &str,
        exception: Option<&dyn Exception>,
    ) -> Result<(), SinkError>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn emit(&mut self, message: &str, exception: Option<&dyn Exception>) -> Result<(), SinkError> {
        (**self).emit(message, exception)
    }
}

impl<S: DisplaySink + ?Sized> DisplaySink for Box<S> {
    fn display(
        &mut self,
        out: &mut dyn io::Write,
        message: &str,
        exception: Option<&dyn Exception>,
    ) -> Result<(), SinkError> {
        (**self).display(out, message, exception)
    }
}

/// A [`Sink`] backed by a closure. Created by [`from_fn`].
#[derive(Clone, Debug)]
pub struct FnSink<F>(F);

/// Turns a closure into a [`Sink`].
pub fn from_fn<F>(f: F) -> FnSink<F>
where
    F: FnMut(&str, Option<&dyn Exception>) -> Result<(), SinkError>,
{
    FnSink(f)
}

impl<F> Sink for FnSink<F>
where
    F: FnMut(&str, Option<&dyn Exception>) -> Result<(), SinkError>,
{
    fn emit(&mut self, message: &str, exception: Option<&dyn Exception>) -> Result<(), SinkError> {
        (self.0)(message, exception)
    }
}

/// A [`DisplaySink`] backed by a closure. Created by [`display_fn`].
#[derive(Clone, Debug)]
pub struct FnDisplay<F>(F);

/// Turns a closure into a [`DisplaySink`].
pub fn display_fn<F>(f: F) -> FnDisplay<F>
where
    F: FnMut(&mut dyn io::Write, &str, Option<&dyn Exception>) -> Result<(), SinkError>,
{
    FnDisplay(f)
}

impl<F> DisplaySink for FnDisplay<F>
where
    F: FnMut(&mut dyn io::Write, &str, Option<&dyn Exception>) -> Result<(), SinkError>,
{
    fn display(
        &mut self,
        out: &mut dyn io::Write,
        message: &str,
        exception: Option<&dyn Exception>,
    ) -> Result<(), SinkError> {
        (self.0)(out, message, exception)
    }
}

/// Writes each message as one line to an [`io::Write`].
///
/// Usable in any slot; as a display sink it ignores its own writer and
/// renders into the stream the dispatcher provides.
#[derive(Debug)]
pub struct LineWriter<W> {
    writer: W,
}

impl<W: io::Write> LineWriter<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: io::Write> Sink for LineWriter<W> {
    fn emit(&mut self, message: &str, _exception: Option<&dyn Exception>) -> Result<(), SinkError> {
        writeln!(self.writer, "{message}")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W> DisplaySink for LineWriter<W> {
    fn display(
        &mut self,
        out: &mut dyn io::Write,
        message: &str,
        _exception: Option<&dyn Exception>,
    ) -> Result<(), SinkError> {
        writeln!(out, "{message}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExceptionRecord;

    #[test]
    fn test_fn_sink_receives_exception() {
        let mut seen = None;
        {
            let mut sink = from_fn(|_message: &str, exception: Option<&dyn Exception>| {
                seen = exception.map(|exception| exception.code());
                Ok(())
            });
            let exception = ExceptionRecord::new("E", "m").with_code(7);
            sink.emit("x", Some(&exception)).unwrap();
        }
        assert_eq!(seen, Some(7));
    }

    #[test]
    fn test_fn_sink_error_is_returned() {
        let mut sink = from_fn(|_message: &str, _exception| Err("refused".into()));
        let error = sink.emit("x", None).unwrap_err();
        assert_eq!(error.to_string(), "refused");
    }

    #[test]
    fn test_line_writer() {
        let mut sink = LineWriter::new(Vec::new());
        sink.emit("one", None).unwrap();
        sink.emit("two", None).unwrap();
        assert_eq!(sink.into_inner(), b"one\ntwo\n");
    }

    #[test]
    fn test_boxed_sinks_forward() {
        let mut boxed: Box<dyn DisplaySink> = Box::new(LineWriter::new(io::sink()));
        let mut out = Vec::new();
        boxed.display(&mut out, "shown", None).unwrap();
        assert_eq!(out, b"shown\n");
    }
}
