#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Error and exception intake with severity-gated fan-out.
//!
//! ## Overview
//!
//! faultline sits between a host runtime that raises errors and the places
//! those errors should end up. Every signal the host raises, a native error
//! code with a message and source location or an uncaught [`Exception`], is
//! turned into one formatted message and handed to up to three sinks:
//!
//! - the **log** sink, for a logging backend,
//! - the **display** sink, for the user-facing output (plain text or HTML,
//!   optionally buffered until the end of the request),
//! - the **forward** sink, for redirecting the user to an error page.
//!
//! Each sink has its own [`Severity`] mask and fires only for messages whose
//! severity it admits.
//!
//! ## Quick Example
//!
//! ```
//! use faultline::{sink, Dispatcher, ErrorCode, ExceptionRecord, Severity};
//!
//! let mut dispatcher = Dispatcher::with_options([
//!     ("display_level", Severity::NONE),
//!     ("forward_level", Severity::EXCEPTION),
//! ])?;
//! dispatcher.set_forward(sink::from_fn(|message: &str, exception| {
//!     assert!(exception.is_some());
//!     assert!(message.starts_with("Uncaught Exception Oops[0]:"));
//!     Ok(())
//! }));
//!
//! // A notice is neither displayed nor forwarded.
//! dispatcher.handle_error(ErrorCode::NOTICE, "Undefined index", "app.rs", 3)?;
//! // An exception is forwarded.
//! dispatcher.handle_exception(&ExceptionRecord::new("Oops", "broken"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Pieces
//!
//! - [`code`]: native [`ErrorCode`]s, their labels and classification.
//! - [`header`], [`trace`] and [`message`]: the formatting strategies that
//!   compose a message. Each one can be replaced on the [`Dispatcher`].
//! - [`sink`]: the [`Sink`] and [`DisplaySink`] strategy traits.
//! - [`host`]: the host's reporting filter and call stack source.
//! - [`config`]: the typed [`Config`] with name-based access for loaders.
//!
//! ## Ecosystem
//!
//! - **`faultline-backtrace`** captures the live Rust call stack as the
//!   [`TraceSource`] for native errors.
//! - **`faultline-tracing`** logs messages as `tracing` events and adds the
//!   active span scope to rendered traces.

pub mod code;
pub mod config;
mod dispatcher;
mod error;
pub mod exception;
pub mod header;
pub mod host;
pub mod html;
pub mod message;
pub mod prelude;
mod severity;
pub mod sink;
pub mod trace;
pub mod value;

pub use self::{
    code::{CodeEntry, CodeTable, ErrorCode},
    config::{Config, OptionName, OptionValue},
    dispatcher::{DEFAULT_FRAMES_TO_SKIP, Dispatcher, Signal},
    error::{ConfigError, DispatchError, SinkError, SinkKind},
    exception::{Exception, ExceptionRecord},
    header::{DefaultHeaderBuilder, HeaderBuilder},
    host::{NoTrace, ReportAll, ReportingFilter, ReportingMask, TraceSource},
    message::{DefaultMessageFormatter, MessageFormatter},
    severity::Severity,
    sink::{DisplaySink, Sink},
    trace::{CallType, DefaultTraceFormatter, FrameParts, StackFrame, Trace, TraceFormatter},
    value::{ArrayKey, ArrayMap, Value},
};

#[doc(hidden)]
pub mod __private {
    /// Source directory of this crate, used by companion crates to recognize
    /// faultline's own frames in captured backtraces.
    pub const SOURCE_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src");
}

#[cfg(test)]
mod tests {
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(Severity: Copy, Send, Sync);
    assert_impl_all!(ErrorCode: Copy, Send, Sync);
    assert_impl_all!(Config: Clone, Send, Sync);
    assert_impl_all!(ExceptionRecord: Clone, Send, Sync, Exception);
    assert_impl_all!(ConfigError: std::error::Error, Send, Sync);
    assert_impl_all!(DispatchError: std::error::Error, Send, Sync);
    assert_not_impl_any!(Dispatcher: Send, Sync);
}
