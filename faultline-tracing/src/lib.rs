#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! Tracing integration for faultline.
//!
//! Two independent pieces:
//!
//! - [`TracingSink`] turns dispatched messages into `tracing` events, so the
//!   log sink can feed whatever subscriber the application already runs.
//! - [`SpanTraceFormatter`] appends the active span scope to every rendered
//!   trace. It reads span field values captured by [`FaultlineLayer`].
//!
//! # Quick Start
//!
//! ```
//! use faultline::{DefaultTraceFormatter, Dispatcher};
//! use faultline_tracing::{FaultlineLayer, SpanTraceFormatter, TracingSink};
//! use tracing_subscriber::{Registry, layer::SubscriberExt};
//!
//! // 1. Set up tracing with FaultlineLayer (required for span fields)
//! let subscriber = Registry::default()
//!     .with(FaultlineLayer) // Captures span field values for messages
//!     .with(tracing_subscriber::fmt::layer()); // Your normal console output
//! tracing::subscriber::set_global_default(subscriber).expect("failed to set subscriber");
//!
//! // 2. Route the log sink to tracing and add spans to traces
//! let mut dispatcher = Dispatcher::new();
//! dispatcher
//!     .set_logger(TracingSink::new())
//!     .set_trace_formatter(SpanTraceFormatter::new(DefaultTraceFormatter));
//! ```
//!
//! With the error raised inside `#[tracing::instrument(fields(user_id = 42))]
//! fn checkout()`, the rendered trace ends with:
//!
//! ```text
//! Spans:
//! checkout{user_id=42}
//! ```

use std::fmt::{self, Write as _};

use faultline::{Exception, Sink, SinkError, StackFrame, TraceFormatter};
use tracing::{
    Level, Span,
    field::{Field, Visit},
};

/// Target of the events emitted by [`TracingSink`].
pub const TARGET: &str = "faultline";

/// A [`Sink`] that emits each message as a `tracing` event.
///
/// Messages carrying an exception are logged at `ERROR`; all others at the
/// configured level, `WARN` by default. Exception events carry the
/// `exception.type` and `exception.code` fields.
#[derive(Copy, Clone, Debug)]
pub struct TracingSink {
    /// Level for messages without an exception.
    pub level: Level,
}

impl TracingSink {
    /// Creates a sink logging plain messages at `WARN`.
    #[must_use]
    pub const fn new() -> Self {
        Self { level: Level::WARN }
    }

    /// Creates a sink logging plain messages at `level`.
    #[must_use]
    pub const fn with_level(level: Level) -> Self {
        Self { level }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for TracingSink {
    fn emit(&mut self, message: &str, exception: Option<&dyn Exception>) -> Result<(), SinkError> {
        if let Some(exception) = exception {
            tracing::event!(
                target: TARGET,
                Level::ERROR,
                {
                    "exception.type" = exception.type_name(),
                    "exception.code" = exception.code()
                },
                "{message}"
            );
        } else if self.level == Level::ERROR {
            tracing::error!(target: TARGET, "{message}");
        } else if self.level == Level::WARN {
            tracing::warn!(target: TARGET, "{message}");
        } else if self.level == Level::INFO {
            tracing::info!(target: TARGET, "{message}");
        } else if self.level == Level::DEBUG {
            tracing::debug!(target: TARGET, "{message}");
        } else {
            tracing::trace!(target: TARGET, "{message}");
        }
        Ok(())
    }
}

/// Captured field values for a span.
#[derive(Clone, Debug, Default)]
struct CapturedFields(String);

impl fmt::Display for CapturedFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct FieldVisitor<'a> {
    output: &'a mut String,
}

impl Visit for FieldVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if !self.output.is_empty() {
            self.output.push(' ');
        }
        let _ = write!(self.output, "{}={:?}", field.name(), value);
    }
}

/// A tracing layer that captures span field values for rendered traces.
///
/// **Required for [`SpanTraceFormatter`] to show field values.** Add it to
/// the subscriber next to the other layers; it does not affect them.
///
/// ```
/// use faultline_tracing::FaultlineLayer;
/// use tracing_subscriber::{Registry, layer::SubscriberExt};
///
/// let subscriber = Registry::default().with(FaultlineLayer);
/// tracing::subscriber::with_default(subscriber, || {
///     let _span = tracing::info_span!("job", id = 3).entered();
///     assert_eq!(
///         faultline_tracing::current_span_scope().as_deref(),
///         Some("job{id=3}")
///     );
/// });
/// ```
#[derive(Copy, Clone, Debug, Default)]
pub struct FaultlineLayer;

impl<S> tracing_subscriber::Layer<S> for FaultlineLayer
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = CapturedFields::default();
        attrs.record(&mut FieldVisitor {
            output: &mut fields.0,
        });
        span.extensions_mut().insert(fields);
    }

    fn on_record(
        &self,
        id: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<CapturedFields>() {
            values.record(&mut FieldVisitor {
                output: &mut fields.0,
            });
        } else {
            let mut fields = CapturedFields::default();
            values.record(&mut FieldVisitor {
                output: &mut fields.0,
            });
            extensions.insert(fields);
        }
    }
}

/// Renders the scope of the current span, innermost first, one
/// `name{fields}` line per span.
///
/// Returns `None` when there is no current span or the subscriber is not a
/// [`tracing_subscriber::Registry`].
#[must_use]
pub fn current_span_scope() -> Option<String> {
    render_span_scope(&Span::current())
}

fn render_span_scope(span: &Span) -> Option<String> {
    use tracing_subscriber::registry::LookupSpan;

    span.with_subscriber(|(span_id, dispatch)| {
        let subscriber = dispatch.downcast_ref::<tracing_subscriber::Registry>()?;
        let span_ref = subscriber.span(span_id)?;

        let mut out = String::new();
        for ancestor in span_ref.scope() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(ancestor.name());

            let extensions = ancestor.extensions();
            if let Some(fields) = extensions.get::<CapturedFields>()
                && !fields.0.is_empty()
            {
                let _ = write!(out, "{{{fields}}}");
            }
        }
        Some(out)
    })
    .flatten()
}

/// A [`TraceFormatter`] that appends the current span scope to the output of
/// another formatter.
///
/// Outside of any span the inner output is returned unchanged.
#[derive(Copy, Clone, Debug, Default)]
pub struct SpanTraceFormatter<F> {
    inner: F,
}

impl<F> SpanTraceFormatter<F> {
    /// Wraps a formatter.
    pub const fn new(inner: F) -> Self {
        Self { inner }
    }

    /// Returns the wrapped formatter.
    pub fn into_inner(self) -> F {
        self.inner
    }
}

impl<F: TraceFormatter> TraceFormatter for SpanTraceFormatter<F> {
    fn format_trace(&self, trace: &[StackFrame]) -> String {
        let mut out = self.inner.format_trace(trace);
        if let Some(scope) = current_span_scope() {
            out.push_str("\nSpans:\n");
            out.push_str(&scope);
        }
        out
    }
}
