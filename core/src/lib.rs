//! # scopegraph core
//!
//! Utilities shared by the frame scheduler and its host: allocation reuse
//! across frames and optional Tracy instrumentation.

pub mod pool;
pub mod profiling;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the core library version.
pub fn init() {
    log::info!("scopegraph core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
