//! # scopegraph demos
//!
//! Sample components showcasing the scopegraph frame scheduler.
//!
//! ## Available Samples
//!
//! - `async_compute` - Scene rendering overlapped with a compute-queue tonemapping chain
//! - `multi_gpu` - Two devices render halves of an image, composited through host staging
//! - `query` - Occlusion, timestamp and statistics queries, and predicated draws
//! - `subpass` - G-buffer written and read back as subpass inputs

use std::sync::Arc;

use scopegraph::{DeviceMask, Format, FrameGraphError, Image, ImageBindFlags, ImageDescriptor};
use scopegraph_app::{AppError, SampleContext, SampleRegistry};

pub mod async_compute;
pub mod multi_gpu;
pub mod query;
pub mod subpass;

pub use async_compute::AsyncComputeSample;
pub use multi_gpu::MultiGpuSample;
pub use query::{QueryMode, QuerySample};
pub use subpass::SubpassSample;

/// Demos library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Attachment id every sample presents into.
pub const OUTPUT_ATTACHMENT: &str = "output";

/// Size of the presented image.
pub const OUTPUT_WIDTH: u32 = 1280;
pub const OUTPUT_HEIGHT: u32 = 720;

/// Every sample in this crate.
pub fn registry() -> SampleRegistry {
    SampleRegistry::new()
        .with(
            "async_compute",
            "Scene rendering overlapped with compute-queue tonemapping",
            AsyncComputeSample::default,
        )
        .with(
            "multi_gpu",
            "Two devices composited through host staging (needs --devices 2)",
            MultiGpuSample::default,
        )
        .with(
            "query",
            "Occlusion, timestamp and statistics queries with predication",
            QuerySample::default,
        )
        .with(
            "subpass",
            "G-buffer read back as subpass inputs",
            SubpassSample::default,
        )
}

/// Create the persistent image a sample presents into.
pub(crate) fn create_output_image(
    context: &SampleContext,
    mask: DeviceMask,
) -> Result<Arc<Image>, AppError> {
    let descriptor = ImageDescriptor::new_2d(
        ImageBindFlags::COLOR | ImageBindFlags::COPY_READ,
        OUTPUT_WIDTH,
        OUTPUT_HEIGHT,
        Format::Bgra8Unorm,
    );
    Ok(context
        .device_group()
        .create_image("output", &descriptor, mask)?)
}

/// Log a failed attachment registration.
///
/// The frame graph also fails the frame, so the host skips it.
pub(crate) fn log_registration(sample: &str, result: Result<(), FrameGraphError>) {
    if let Err(err) = result {
        log::warn!("{sample}: {err}");
    }
}
