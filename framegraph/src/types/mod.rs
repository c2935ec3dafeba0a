//! Descriptors and value types for attachments and resources.
//!
//! This module contains formats, bind flags, descriptor structs and the
//! resource states the barrier pass tracks.

mod buffer;
mod common;
mod image;
mod state;

pub use buffer::{BufferBindFlags, BufferDescriptor};
pub use common::{ClearValue, Extent3d, Interval};
pub use image::{Format, ImageBindFlags, ImageDescriptor};
pub use state::ResourceState;
