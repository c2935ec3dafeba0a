//! Profiling support via Tracy.
//!
//! Instrumentation for the frame scheduler using the
//! [Tracy profiler](https://github.com/wolfpld/tracy). Enabled with the
//! `profiling` Cargo feature:
//!
//! ```toml
//! [dependencies]
//! scopegraph-core = { version = "0.1", features = ["profiling"] }
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use scopegraph_core::profiling::{frame_mark, profile_function, profile_scope};
//!
//! fn end_frame() {
//!     profile_function!();
//!     {
//!         profile_scope!("topological_sort");
//!         // ...
//!     }
//!     frame_mark!();
//! }
//! ```
//!
//! Per-scope spans use [`profile_scope_dynamic!`] because scope names are
//! only known at runtime. Heap sizes and node counts can be plotted with
//! [`profile_plot!`].
//!
//! When profiling is disabled (the default), all macros compile to no-ops.

#[cfg(feature = "profiling")]
pub use tracy_client::{
    self, Client, Span, frame_mark as tracy_frame_mark, plot as tracy_plot, span,
};

/// Mark the end of a frame for Tracy's frame analysis.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! frame_mark {
    () => {
        $crate::profiling::tracy_frame_mark()
    };
}

/// Mark the end of a frame (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! frame_mark {
    () => {};
}

/// Create a profiling span for the current scope.
///
/// The span ends when the enclosing block exits.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_scope {
    ($name:expr) => {
        let _profile_span = $crate::profiling::span!($name);
    };
}

/// Create a profiling span (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_scope {
    ($name:expr) => {};
}

/// Create a profiling span covering the whole function.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_function {
    () => {
        let _profile_span = $crate::profiling::span!();
    };
}

/// Create a function span (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_function {
    () => {};
}

/// Create a profiling span with a runtime-determined name.
///
/// Heap-allocates the span name, so prefer [`profile_scope!`] for static names.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_scope_dynamic {
    ($name:expr) => {
        let _profile_span = $crate::profiling::Client::running()
            .map(|c| c.span_alloc(Some($name), "", file!(), line!(), 0));
    };
}

/// Dynamic span (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_scope_dynamic {
    ($name:expr) => {
        let _ = $name;
    };
}

/// Plot a value over time in Tracy.
///
/// ```ignore
/// profile_plot!("transient_heap_bytes", heap_size);
/// ```
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_plot {
    ($name:expr, $value:expr) => {
        $crate::profiling::tracy_plot!($name, $value as f64)
    };
}

/// Plot a value (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_plot {
    ($name:expr, $value:expr) => {
        let _ = $value;
    };
}

pub use frame_mark;
pub use profile_function;
pub use profile_plot;
pub use profile_scope;
pub use profile_scope_dynamic;
