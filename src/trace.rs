//! Stack frames and their rendering.
//!
//! A [`Trace`] is an ordered sequence of [`StackFrame`]s, innermost call
//! first: frame `0` is where the error or exception was raised. The
//! [`TraceFormatter`] strategy turns a trace into the text appended to a
//! message; [`DefaultTraceFormatter`] produces
//!
//! ```text
//!
//! Stack trace:
//! #0 src/app.rs(12): Session->open(Int(3), 'rw')
//! #1 [internal function]: run()
//! ```
//!
//! and renders nothing at all for an empty trace.

use core::{fmt, ops::Deref};

use crate::value::Value;

/// How a frame's function was invoked.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CallType {
    /// A method called on an instance, rendered as `->`.
    Instance,
    /// A static or associated function, rendered as `::`.
    Static,
}

impl CallType {
    /// The symbol placed between class and function names.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            CallType::Instance => "->",
            CallType::Static => "::",
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One entry of a call stack. Every part is optional.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StackFrame {
    /// Source file of the call site.
    pub file: Option<String>,
    /// Line of the call site.
    pub line: Option<u32>,
    /// Class, type or module the function belongs to.
    pub class: Option<String>,
    /// Present only for method-like calls.
    pub call_type: Option<CallType>,
    /// Function or method name.
    pub function: Option<String>,
    /// Arguments the function was called with, when recorded.
    pub args: Option<Vec<Value>>,
}

impl StackFrame {
    /// A frame calling a free function.
    #[must_use]
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            function: Some(name.into()),
            ..Self::default()
        }
    }

    /// A frame calling a method on an instance of `class`.
    #[must_use]
    pub fn method(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            call_type: Some(CallType::Instance),
            function: Some(name.into()),
            ..Self::default()
        }
    }

    /// A frame calling an associated function of `class`.
    #[must_use]
    pub fn associated(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            call_type: Some(CallType::Static),
            function: Some(name.into()),
            ..Self::default()
        }
    }

    /// Sets the call site.
    #[must_use]
    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Records the call arguments.
    #[must_use]
    pub fn with_args<V: Into<Value>>(mut self, args: impl IntoIterator<Item = V>) -> Self {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }
}

/// An owned call stack, innermost frame first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trace(Vec<StackFrame>);

impl Trace {
    /// Creates an empty trace.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Drops the `count` innermost frames.
    #[must_use]
    pub fn skip(mut self, count: usize) -> Self {
        self.0.drain(..count.min(self.0.len()));
        self
    }

    /// Appends an outer frame.
    pub fn push(&mut self, frame: StackFrame) {
        self.0.push(frame);
    }

    /// Consumes the trace, returning its frames.
    #[must_use]
    pub fn into_frames(self) -> Vec<StackFrame> {
        self.0
    }

    /// Iterates over the frames together with their rendered parts.
    pub fn formatted<'a>(
        &'a self,
        formatter: &'a DefaultTraceFormatter,
    ) -> impl Iterator<Item = (usize, FrameParts)> + 'a {
        self.0
            .iter()
            .enumerate()
            .map(move |(index, frame)| (index, formatter.frame_parts(frame)))
    }
}

impl Deref for Trace {
    type Target = [StackFrame];

    fn deref(&self) -> &[StackFrame] {
        &self.0
    }
}

impl From<Vec<StackFrame>> for Trace {
    fn from(frames: Vec<StackFrame>) -> Self {
        Self(frames)
    }
}

impl FromIterator<StackFrame> for Trace {
    fn from_iter<I: IntoIterator<Item = StackFrame>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a StackFrame;
    type IntoIter = core::slice::Iter<'a, StackFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Strategy that renders a whole trace into the text appended to a message.
///
/// Implemented for closures taking the frames and returning a `String`:
///
/// ```
/// use faultline::{StackFrame, TraceFormatter};
///
/// let frame_count = |trace: &[StackFrame]| format!(" ({} frames)", trace.len());
/// assert_eq!(frame_count.format_trace(&[]), " (0 frames)");
/// ```
pub trait TraceFormatter {
    /// Renders the frames, innermost first.
    fn format_trace(&self, trace: &[StackFrame]) -> String;
}

impl<F> TraceFormatter for F
where
    F: Fn(&[StackFrame]) -> String,
{
    fn format_trace(&self, trace: &[StackFrame]) -> String {
        self(trace)
    }
}

/// The three rendered parts of a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameParts {
    /// `file(line)`, or `[internal function]`.
    pub location: String,
    /// Class, call-type symbol and function name, concatenated.
    pub function: String,
    /// Comma separated argument summaries.
    pub arguments: String,
}

impl fmt::Display for FrameParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}({})", self.location, self.function, self.arguments)
    }
}

/// The built-in [`TraceFormatter`].
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultTraceFormatter;

impl DefaultTraceFormatter {
    /// Renders one frame as `<location>: <function>(<arguments>)`.
    #[must_use]
    pub fn format_frame(&self, frame: &StackFrame) -> String {
        self.frame_parts(frame).to_string()
    }

    /// Splits one frame into its rendered parts.
    #[must_use]
    pub fn frame_parts(&self, frame: &StackFrame) -> FrameParts {
        FrameParts {
            location: self.format_location(frame.file.as_deref(), frame.line),
            function: self.format_function(
                frame.class.as_deref(),
                frame.call_type,
                frame.function.as_deref(),
            ),
            arguments: self.format_arguments(frame.args.as_deref()),
        }
    }

    /// `file(line)` when both are known, `[internal function]` otherwise.
    #[must_use]
    pub fn format_location(&self, file: Option<&str>, line: Option<u32>) -> String {
        match (file, line) {
            (Some(file), Some(line)) => format!("{file}({line})"),
            _ => String::from("[internal function]"),
        }
    }

    /// Concatenates the parts that are present, without separators.
    #[must_use]
    pub fn format_function(
        &self,
        class: Option<&str>,
        call_type: Option<CallType>,
        function: Option<&str>,
    ) -> String {
        let mut out = String::new();
        out.push_str(class.unwrap_or_default());
        out.push_str(call_type.map(CallType::symbol).unwrap_or_default());
        out.push_str(function.unwrap_or_default());
        out
    }

    /// Renders each argument, joined with `", "`.
    ///
    /// Array arguments are expanded one level as `[k=>v, ...]`; anything
    /// nested deeper is summarized by [`format_var`](Self::format_var).
    #[must_use]
    pub fn format_arguments(&self, args: Option<&[Value]>) -> String {
        let Some(args) = args else {
            return String::new();
        };
        let rendered: Vec<String> = args
            .iter()
            .map(|arg| match arg {
                Value::Array(entries) => {
                    let entries: Vec<String> = entries
                        .iter()
                        .map(|(key, value)| {
                            format!(
                                "{}=>{}",
                                self.format_var(&Value::from(key.clone())),
                                self.format_var(value)
                            )
                        })
                        .collect();
                    format!("[{}]", entries.join(", "))
                }
                other => self.format_var(other),
            })
            .collect();
        rendered.join(", ")
    }

    /// Type-tagged summary of a single value.
    #[must_use]
    pub fn format_var(&self, value: &Value) -> String {
        value.to_string()
    }
}

impl TraceFormatter for DefaultTraceFormatter {
    fn format_trace(&self, trace: &[StackFrame]) -> String {
        if trace.is_empty() {
            return String::new();
        }
        let frames: Vec<String> = trace
            .iter()
            .enumerate()
            .map(|(index, frame)| format!("#{index} {}", self.format_frame(frame)))
            .collect();
        format!("\nStack trace:\n{}", frames.join("\n"))
    }
}
