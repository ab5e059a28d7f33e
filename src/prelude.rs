//! Commonly used items for convenient importing.
//!
//! ```
//! use faultline::prelude::*;
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.config_mut().set_display_level(Severity::NONE);
//! dispatcher.set_logger(sink::from_fn(|_message: &str, _exception| Ok(())));
//! assert!(dispatcher.handle_error(ErrorCode::DEPRECATED, "old api", "lib.rs", 1)?);
//! # Ok::<(), DispatchError>(())
//! ```

pub use crate::{
    Config, DispatchError, Dispatcher, DisplaySink, ErrorCode, Exception, ExceptionRecord,
    Severity, Signal, Sink, StackFrame, Trace, sink,
};
