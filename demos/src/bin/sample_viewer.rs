//! Headless sample viewer.
//!
//! Run with: `cargo run --bin sample_viewer -- --list`

use scopegraph_app::{App, AppArgs, DefaultAppArgs};

fn main() {
    std::process::exit(App::run(scopegraph_demos::registry(), DefaultAppArgs::parse()));
}
