//! Profiling support via Tracy.
//!
//! Re-exports the CPU profiling macros from [`scopegraph_core::profiling`].
//! With the `profiling` feature enabled, every frame phase opens a span,
//! each scope gets a span named after its id during Execute, and the
//! transient heap size is plotted as `transient_heap_bytes`.
//!
//! ```bash
//! cargo run -p scopegraph-demos --features profiling --bin sample_viewer
//! ```

pub use scopegraph_core::profiling::*;
