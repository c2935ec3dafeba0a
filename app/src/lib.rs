//! # scopegraph app
//!
//! Headless host for sample components built on the scopegraph frame
//! scheduler.
//!
//! ## Overview
//!
//! - [`SampleComponent`] - Trait for per-frame work driven by the host
//! - [`SampleRegistry`] - Named sample factories for `--sample` and `--list`
//! - [`AppArgs`] - Trait for host configuration
//! - [`App`] - Owns the frame graph system and runs the frame loop
//!
//! ## Example
//!
//! ```ignore
//! use scopegraph_app::{App, AppArgs, DefaultAppArgs, SampleRegistry};
//!
//! fn main() {
//!     let registry = SampleRegistry::new().with("my_sample", "Does things", MySample::default);
//!     std::process::exit(App::run(registry, DefaultAppArgs::parse()));
//! }
//! ```

mod app;
mod args;
mod context;
mod error;
mod sample;

pub use app::App;
pub use args::{AppArgs, DefaultAppArgs};
pub use context::{FrameStatistics, SampleContext};
pub use error::AppError;
pub use sample::{SampleComponent, SampleRegistry};

/// App library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the app library version.
pub fn init() {
    log::info!("scopegraph app v{} initialized", VERSION);
}
