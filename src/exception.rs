//! Exceptions handed to the exception intake.
//!
//! Anything implementing [`Exception`] can be dispatched. Sinks receive it as
//! `&dyn Exception` and can recover the concrete type:
//!
//! ```
//! use faultline::{Exception, ExceptionRecord};
//!
//! #[derive(Debug)]
//! struct NotFound;
//!
//! impl Exception for NotFound {
//!     fn message(&self) -> &str {
//!         "no such page"
//!     }
//!     fn file(&self) -> &str {
//!         "router.rs"
//!     }
//!     fn line(&self) -> u32 {
//!         10
//!     }
//!     fn code(&self) -> i64 {
//!         404
//!     }
//! }
//!
//! let exception: &dyn Exception = &NotFound;
//! assert!(exception.downcast_ref::<NotFound>().is_some());
//! assert!(exception.downcast_ref::<ExceptionRecord>().is_none());
//! ```

use core::{any::Any, fmt, panic::Location};
use std::{borrow::Cow, panic::PanicHookInfo};

use crate::trace::{StackFrame, Trace};

/// An exception-like value: a typed error with a source location and the
/// call stack it was raised from.
pub trait Exception: Any + fmt::Debug {
    /// Name of the exception type. Defaults to the Rust type name.
    fn type_name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// Human-readable message.
    fn message(&self) -> &str;

    /// File the exception was raised in.
    fn file(&self) -> &str;

    /// Line the exception was raised on.
    fn line(&self) -> u32;

    /// Attached integer code, `0` when unset.
    fn code(&self) -> i64 {
        0
    }

    /// Call stack at the raise site, innermost frame first.
    fn trace(&self) -> &[StackFrame] {
        &[]
    }
}

impl dyn Exception {
    /// Returns whether the exception is of type `T`.
    #[must_use]
    pub fn is<T: Exception>(&self) -> bool {
        (self as &dyn Any).is::<T>()
    }

    /// Returns the exception as a `T`, if that is its concrete type.
    #[must_use]
    pub fn downcast_ref<T: Exception>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }
}

/// An owned, general purpose [`Exception`].
#[derive(Clone, Debug, PartialEq)]
pub struct ExceptionRecord {
    type_name: Cow<'static, str>,
    message: String,
    file: String,
    line: u32,
    code: i64,
    trace: Trace,
}

impl ExceptionRecord {
    /// Creates a record raised at the caller's location.
    #[track_caller]
    pub fn new(type_name: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        let location = Location::caller();
        Self {
            type_name: type_name.into(),
            message: message.into(),
            file: location.file().to_owned(),
            line: location.line(),
            code: 0,
            trace: Trace::new(),
        }
    }

    /// Captures a Rust error, named after its type and raised at the
    /// caller's location.
    #[track_caller]
    pub fn from_error<E>(error: &E) -> Self
    where
        E: core::error::Error + ?Sized,
    {
        Self::new(core::any::type_name::<E>(), error.to_string())
    }

    /// Captures a panic from inside a panic hook.
    ///
    /// The type name is `"panic"` and the payload text, when it is a string,
    /// becomes the message.
    pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        let payload = info.payload();
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_owned()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            String::from("Box<dyn Any>")
        };
        let (file, line) = info
            .location()
            .map_or((String::new(), 0), |location| {
                (location.file().to_owned(), location.line())
            });
        Self {
            type_name: Cow::Borrowed("panic"),
            message,
            file,
            line,
            code: 0,
            trace: Trace::new(),
        }
    }

    /// Sets the attached code.
    #[must_use]
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    /// Overrides the raise location.
    #[must_use]
    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = file.into();
        self.line = line;
        self
    }

    /// Attaches the call stack.
    #[must_use]
    pub fn with_trace(mut self, trace: impl Into<Trace>) -> Self {
        self.trace = trace.into();
        self
    }
}

impl Exception for ExceptionRecord {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn file(&self) -> &str {
        &self.file
    }

    fn line(&self) -> u32 {
        self.line
    }

    fn code(&self) -> i64 {
        self.code
    }

    fn trace(&self) -> &[StackFrame] {
        &self.trace
    }
}

impl fmt::Display for ExceptionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults_to_caller_location() {
        let line = line!() + 1;
        let record = ExceptionRecord::new("RuntimeException", "boom");
        assert_eq!(record.file(), file!());
        assert_eq!(record.line(), line);
        assert_eq!(record.code(), 0);
        assert!(record.trace().is_empty());
    }

    #[test]
    fn test_record_builder() {
        let record = ExceptionRecord::new("HttpException", "gone")
            .with_code(410)
            .with_location("routes.rs", 3)
            .with_trace(vec![StackFrame::function("dispatch")]);
        assert_eq!(record.type_name(), "HttpException");
        assert_eq!(record.code(), 410);
        assert_eq!(record.file(), "routes.rs");
        assert_eq!(record.line(), 3);
        assert_eq!(record.trace().len(), 1);
        assert_eq!(record.to_string(), "HttpException: gone");
    }

    #[test]
    fn test_from_error_uses_type_name() {
        let error = std::io::Error::other("disk full");
        let record = ExceptionRecord::from_error(&error);
        assert_eq!(record.type_name(), "std::io::error::Error");
        assert_eq!(record.message(), "disk full");
        assert_eq!(record.file(), file!());
    }

    #[test]
    fn test_downcast_through_trait_object() {
        let record = ExceptionRecord::new("E", "m");
        let exception: &dyn Exception = &record;
        assert!(exception.is::<ExceptionRecord>());
        assert_eq!(
            exception
                .downcast_ref::<ExceptionRecord>()
                .map(ExceptionRecord::message),
            Some("m")
        );
    }

    #[test]
    fn test_default_type_name_is_rust_type() {
        #[derive(Debug)]
        struct Custom;

        impl Exception for Custom {
            fn message(&self) -> &str {
                ""
            }
            fn file(&self) -> &str {
                ""
            }
            fn line(&self) -> u32 {
                0
            }
        }

        let exception: &dyn Exception = &Custom;
        assert!(exception.type_name().ends_with("Custom"));
        assert_eq!(exception.code(), 0);
    }
}
