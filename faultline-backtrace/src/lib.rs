#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! Live call stack capture for faultline.
//!
//! [`BacktraceSource`] is a [`TraceSource`] that walks the current Rust call
//! stack with the `backtrace` crate and converts each resolved symbol into a
//! [`StackFrame`]. Paths such as `app::db::Pool::get` are split into the
//! owning type or module (`app::db::Pool`, with the `::` call type) and the
//! function name (`get`).
//!
//! ```rust
//! use faultline::Dispatcher;
//! use faultline_backtrace::BacktraceSource;
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.set_trace_source(BacktraceSource::new_from_env());
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_BACKTRACE=full` - Disables filtering and shows full paths
//! - `FAULTLINE_BACKTRACE` - Comma-separated options:
//!   - `full_paths` - Show full file paths in captured frames
//!
//! # Path privacy
//!
//! By default, paths inside the Rust standard library and the cargo registry
//! are shortened, but other paths are kept as they are and may expose private
//! file system structure. Use the `--remap-path-prefix` option of `rustc` to
//! remap source paths to generic placeholders:
//!
//! ```sh
//! export RUSTFLAGS="--remap-path-prefix=$HOME=/home/user --remap-path-prefix=$PWD=/build"
//! ```
//!
//! # Debugging symbols in release builds
//!
//! Frames only carry file and line information when debug symbols are
//! present:
//!
//! ```toml
//! [profile.release]
//! strip = false
//! debug = "line-tables-only"
//! ```

use std::{borrow::Cow, sync::OnceLock};

use backtrace::BytesOrWideString;
use faultline::{CallType, StackFrame, Trace, TraceSource};

/// Configuration for filtering frames from certain crates out of a captured
/// trace.
///
/// ```rust
/// use faultline_backtrace::FrameFilter;
///
/// let filter = FrameFilter {
///     // Hide runtime frames in the middle
///     skipped_middle_crates: &["tokio"],
///     // Keep at most 10 frames
///     max_frame_count: 10,
///     ..FrameFilter::DEFAULT
/// };
/// ```
#[derive(Copy, Clone, Debug)]
pub struct FrameFilter {
    /// Crates whose frames are dropped while they are the innermost ones.
    ///
    /// The skip count given to [`TraceSource::capture`] applies after these
    /// frames are gone.
    pub skipped_initial_crates: &'static [&'static str],
    /// Crates whose frames are dropped anywhere in the trace.
    pub skipped_middle_crates: &'static [&'static str],
    /// Crates whose frames are dropped while they are the outermost ones.
    pub skipped_final_crates: &'static [&'static str],
    /// Maximum number of frames to keep.
    pub max_frame_count: usize,
    /// Whether to keep full file paths instead of shortened ones.
    pub show_full_path: bool,
}

impl FrameFilter {
    /// Default filter settings.
    pub const DEFAULT: Self = Self {
        skipped_initial_crates: &[
            "backtrace",
            "faultline-backtrace",
            "core",
            "std",
            "alloc",
        ],
        skipped_middle_crates: &["std", "core", "alloc"],
        skipped_final_crates: &["std", "core", "alloc"],
        max_frame_count: 20,
        show_full_path: false,
    };

    /// Keeps every frame, with full paths.
    pub const UNFILTERED: Self = Self {
        skipped_initial_crates: &[],
        skipped_middle_crates: &[],
        skipped_final_crates: &[],
        max_frame_count: usize::MAX,
        show_full_path: true,
    };
}

impl Default for FrameFilter {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug)]
struct FaultlineEnvOptions {
    rust_backtrace_full: bool,
    show_full_path: bool,
}

impl FaultlineEnvOptions {
    fn get() -> &'static Self {
        static FAULTLINE_FLAGS: OnceLock<FaultlineEnvOptions> = OnceLock::new();

        FAULTLINE_FLAGS.get_or_init(|| {
            let rust_backtrace_full =
                std::env::var_os("RUST_BACKTRACE").is_some_and(|var| var == "full");
            let mut show_full_path = rust_backtrace_full;
            if let Some(var) = std::env::var_os("FAULTLINE_BACKTRACE") {
                for v in var.to_string_lossy().split(',') {
                    if v.eq_ignore_ascii_case("full_paths") {
                        show_full_path = true;
                    }
                }
            }
            FaultlineEnvOptions {
                rust_backtrace_full,
                show_full_path,
            }
        })
    }
}

/// A [`TraceSource`] backed by the live Rust call stack.
#[derive(Copy, Clone, Debug, Default)]
pub struct BacktraceSource {
    /// Which frames end up in the captured trace.
    pub filter: FrameFilter,
}

impl BacktraceSource {
    /// Creates a source with the given filter.
    #[must_use]
    pub const fn new(filter: FrameFilter) -> Self {
        Self { filter }
    }

    /// Creates a source configured by environment variables.
    ///
    /// `RUST_BACKTRACE=full` disables all filtering. `FAULTLINE_BACKTRACE`
    /// containing `full_paths` keeps full file paths.
    #[must_use]
    pub fn new_from_env() -> Self {
        let env_options = FaultlineEnvOptions::get();
        Self {
            filter: if env_options.rust_backtrace_full {
                FrameFilter {
                    show_full_path: env_options.show_full_path,
                    ..FrameFilter::UNFILTERED
                }
            } else {
                FrameFilter {
                    show_full_path: env_options.show_full_path,
                    ..FrameFilter::DEFAULT
                }
            },
        }
    }
}

impl TraceSource for BacktraceSource {
    fn capture(&self, skip: usize) -> Trace {
        capture(&self.filter, skip)
    }
}

struct CapturedFrame {
    frame: StackFrame,
    crate_name: Option<Cow<'static, str>>,
}

/// Captures the current call stack, innermost frame first.
///
/// Frames from `filter.skipped_initial_crates` are removed from the top,
/// then `skip` more frames.
pub fn capture(filter: &FrameFilter, skip: usize) -> Trace {
    let mut initial_filtering = !filter.skipped_initial_crates.is_empty();
    let mut remaining_skip = skip;
    let mut frames: Vec<CapturedFrame> = Vec::new();

    backtrace::trace(|frame| {
        backtrace::resolve_frame(frame, |symbol| {
            // Don't consider frames without symbol names.
            let Some(sym) = symbol.name() else {
                return;
            };
            if frames.len() >= filter.max_frame_count {
                return;
            }

            let frame_path = symbol.filename_raw().map(FramePath::new);
            let crate_name = frame_path
                .as_ref()
                .and_then(|path| path.crate_name.clone());

            if initial_filtering {
                if let Some(cur_crate_name) = &crate_name
                    && filter.skipped_initial_crates.contains(&&**cur_crate_name)
                {
                    return;
                }
                initial_filtering = false;
            }

            if remaining_skip > 0 {
                remaining_skip -= 1;
                return;
            }

            if let Some(cur_crate_name) = &crate_name
                && filter.skipped_middle_crates.contains(&&**cur_crate_name)
            {
                return;
            }

            let demangled = format!("{sym:#}");
            let (class, function) = split_symbol(&demangled);
            let file = frame_path.map(|path| path.display(filter.show_full_path));
            frames.push(CapturedFrame {
                frame: StackFrame {
                    line: file.as_ref().and(symbol.lineno()),
                    file,
                    class: class.map(str::to_owned),
                    call_type: class.map(|_| CallType::Static),
                    function: Some(function.to_owned()),
                    args: None,
                },
                crate_name,
            });
        });

        true
    });

    while let Some(last) = frames.last() {
        let is_final_crate = last
            .crate_name
            .as_ref()
            .is_some_and(|crate_name| filter.skipped_final_crates.contains(&&**crate_name));
        let is_libc_entry = matches!(
            last.frame.function.as_deref(),
            Some("__libc_start_call_main" | "__libc_start_main_impl" | "_start")
        );
        if is_final_crate || is_libc_entry {
            frames.pop();
        } else {
            break;
        }
    }

    frames.into_iter().map(|captured| captured.frame).collect()
}

/// Splits a demangled symbol into its owning path and function name.
///
/// The split happens at the last `::` outside of angle brackets, and only
/// when what follows is a plain identifier. Anything else, such as closures
/// or shims, is kept whole as the function name.
///
/// ```rust
/// use faultline_backtrace::split_symbol;
///
/// assert_eq!(split_symbol("app::db::Pool::get"), (Some("app::db::Pool"), "get"));
/// assert_eq!(split_symbol("main"), (None, "main"));
/// assert_eq!(split_symbol("app::run::{{closure}}"), (None, "app::run::{{closure}}"));
/// ```
#[must_use]
pub fn split_symbol(symbol: &str) -> (Option<&str>, &str) {
    let mut angle_nesting_level = 0u64;
    let mut previous = '\0';
    let mut split = None;

    for (i, c) in symbol.char_indices() {
        if c == '<' {
            angle_nesting_level = angle_nesting_level.saturating_add(1);
        } else if c == '>' && previous != '-' {
            angle_nesting_level = angle_nesting_level.saturating_sub(1);
        } else if c == ':' && previous == ':' && angle_nesting_level == 0 {
            split = Some(i - 1);
            // A third colon must not pair with this one.
            previous = '\0';
            continue;
        }
        previous = c;
    }

    match split {
        Some(split) if split > 0 && is_identifier(&symbol[split + 2..]) => {
            (Some(&symbol[..split]), &symbol[split + 2..])
        }
        _ => (None, symbol),
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || unicode_ident::is_xid_start(c))
        && chars.all(unicode_ident::is_xid_continue)
}

const OWN_SOURCE_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src");

/// File path information for a stack frame.
#[derive(Debug)]
struct FramePath {
    raw_path: String,
    crate_name: Option<Cow<'static, str>>,
    suffix: Option<String>,
}

impl FramePath {
    fn new(path: BytesOrWideString<'_>) -> Self {
        Self::from_path(&path.to_str_lossy())
    }

    fn from_path(path_str: &str) -> Self {
        static REGEXES: OnceLock<Option<[regex::Regex; 2]>> = OnceLock::new();
        let regexes = REGEXES.get_or_init(|| {
            Some([
                // Matches Rust standard library paths:
                // - /lib/rustlib/src/rust/library/{std|core|alloc}/src/...
                // - /rustc/{40-char-hash}/library/{std|core|alloc}/src/...
                regex::Regex::new(
                    r"(?:/lib/rustlib/src/rust|^/rustc/[0-9a-f]{40})/library/(std|core|alloc)/src/.*$",
                )
                .ok()?,
                // Matches Cargo registry paths:
                // - /.cargo/registry/src/{index}-{16-char-hash}/{crate}-{version}/src/...
                regex::Regex::new(
                    r"/\.cargo/registry/src/[^/]+-[0-9a-f]{16}/([^./]+)-[0-9]+\.[^/]*/src/.*$",
                )
                .ok()?,
            ])
        });

        let raw_path = path_str.to_owned();

        if let Some(regexes) = regexes {
            for regex in regexes {
                if let Some(crate_capture) = regex
                    .captures(path_str)
                    .and_then(|captures| captures.get(1))
                {
                    return Self {
                        crate_name: Some(Cow::Owned(crate_capture.as_str().to_owned())),
                        suffix: Some(path_str[crate_capture.start()..].to_owned()),
                        raw_path,
                    };
                }
            }
        }

        for (root, crate_name) in [
            (faultline::__private::SOURCE_ROOT, "faultline"),
            (OWN_SOURCE_ROOT, "faultline-backtrace"),
        ] {
            if let Some(rest) = path_str.strip_prefix(root) {
                return Self {
                    crate_name: Some(Cow::Borrowed(crate_name)),
                    suffix: Some(format!("{crate_name}/src{rest}")),
                    raw_path,
                };
            }
        }

        Self {
            raw_path,
            crate_name: None,
            suffix: None,
        }
    }

    fn display(self, show_full_path: bool) -> String {
        match self.suffix {
            Some(suffix) if !show_full_path => format!("[..]/{suffix}"),
            _ => self.raw_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_symbol_paths() {
        assert_eq!(
            split_symbol("faultline::dispatcher::Dispatcher::handle_error"),
            (Some("faultline::dispatcher::Dispatcher"), "handle_error")
        );
        assert_eq!(
            split_symbol("<faultline_backtrace::BacktraceSource as faultline::host::TraceSource>::capture"),
            (
                Some("<faultline_backtrace::BacktraceSource as faultline::host::TraceSource>"),
                "capture"
            )
        );
        assert_eq!(
            split_symbol("<F as core::ops::function::Fn<(A,)>>::call"),
            (Some("<F as core::ops::function::Fn<(A,)>>"), "call")
        );
    }

    #[test]
    fn test_split_symbol_keeps_non_identifiers_whole() {
        assert_eq!(
            split_symbol("core::ops::function::FnOnce::call_once{{vtable.shim}}"),
            (None, "core::ops::function::FnOnce::call_once{{vtable.shim}}")
        );
        assert_eq!(split_symbol("::f"), (None, "::f"));
        assert_eq!(split_symbol(""), (None, ""));
    }

    #[test]
    fn test_split_symbol_ignores_arrow_in_generics() {
        assert_eq!(
            split_symbol("<fn() -> u8 as app::Source>::read"),
            (Some("<fn() -> u8 as app::Source>"), "read")
        );
    }

    #[test]
    fn test_std_paths_are_recognized() {
        let path = FramePath::from_path(
            "/rustc/0123456789abcdef0123456789abcdef01234567/library/std/src/rt.rs",
        );
        assert_eq!(path.crate_name.as_deref(), Some("std"));
        assert_eq!(path.display(false), "[..]/std/src/rt.rs");
    }

    #[test]
    fn test_registry_paths_are_recognized() {
        let raw = "/home/dev/.cargo/registry/src/index.crates.io-1949cf8c6b5b557f/indexmap-2.12.1/src/map.rs";
        let path = FramePath::from_path(raw);
        assert_eq!(path.crate_name.as_deref(), Some("indexmap"));
        assert_eq!(path.display(true), raw);
    }

    #[test]
    fn test_own_paths_are_recognized() {
        let path = FramePath::from_path(&format!("{OWN_SOURCE_ROOT}/lib.rs"));
        assert_eq!(path.crate_name.as_deref(), Some("faultline-backtrace"));
        assert_eq!(path.display(false), "[..]/faultline-backtrace/src/lib.rs");

        let path = FramePath::from_path(&format!(
            "{}/dispatcher.rs",
            faultline::__private::SOURCE_ROOT
        ));
        assert_eq!(path.crate_name.as_deref(), Some("faultline"));
    }

    #[test]
    fn test_unknown_paths_are_kept() {
        let path = FramePath::from_path("/build/app/src/main.rs");
        assert_eq!(path.crate_name, None);
        assert_eq!(path.display(false), "/build/app/src/main.rs");
    }
}
