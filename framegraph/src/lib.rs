//! # scopegraph
//!
//! A frame scheduler built around scope producers.
//!
//! Each frame, user code imports [`ScopeProducer`]s into a
//! [`FrameGraphBuilder`]. Producers declare the attachments they read and
//! write; the [`FrameGraphSystem`] derives the dependencies, orders the
//! scopes, places transient attachments in aliased heaps, inserts state
//! transitions and records command lists per queue and device.
//!
//! ## Architecture
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`device`] | Device groups and persistent resources |
//! | [`attachment`] | Per-frame attachment database and views |
//! | [`scope`] | Producers and their Prepare/Compile/Execute contexts |
//! | [`graph`] | Frame builder, validation, dependency edges |
//! | [`compiler`] | Ordering, lifetimes, transient heaps, barriers |
//! | [`executor`] | Command lists, semaphores, queue submission |
//!
//! ## Example
//!
//! ```
//! use scopegraph::{DeviceGroup, FrameGraphConfig, FrameGraphSystem};
//!
//! let group = DeviceGroup::new(1).unwrap();
//! let mut system = FrameGraphSystem::new(group, FrameGraphConfig::default());
//!
//! let builder = system.begin_frame();
//! let report = system.end_frame(builder).unwrap();
//! assert!(report.scopes().is_empty());
//! ```

pub mod attachment;
pub mod compiler;
pub mod config;
pub mod device;
pub mod error;
pub mod executor;
pub mod graph;
pub mod profiling;
pub mod report;
pub mod resources;
pub mod scope;
pub mod system;
pub mod types;

pub use attachment::{
    Attachment, AttachmentDatabase, AttachmentId, AttachmentKind, AttachmentLifetime, BufferView,
    HeapPlacement, ImageView,
};
pub use compiler::{Barrier, TransientHeapStatistics};
pub use config::{FrameGraphConfig, ValidationMode};
pub use device::{DeviceGroup, DeviceIndex, DeviceMask, MAX_DEVICES};
pub use error::FrameGraphError;
pub use executor::{
    Command, CommandList, Fence, FenceStatus, PredicationOp, QueueId, QueueSubmission, Semaphore,
};
pub use graph::{FrameGraphBuilder, NodeHandle};
pub use report::{FrameReport, ResolvedScopeAttachment, ScheduledDependency, ScheduledScope};
pub use resources::{Buffer, Image, PhysicalResourceId, QueryPool, QueryType};
pub use scope::{
    FrameGraphCompileContext, FrameGraphExecuteContext, FrameGraphInterface, HardwareQueueClass,
    LoadOp, QueryPoolAttachment, QueryPoolAttachmentKind, Scope, ScopeAttachment,
    ScopeAttachmentAccess, ScopeAttachmentDescriptor, ScopeAttachmentUsage, ScopeId,
    ScopeProducer, ScopeProducerFunction, StoreOp, empty_compile,
};
pub use system::FrameGraphSystem;
pub use types::{
    BufferBindFlags, BufferDescriptor, ClearValue, Extent3d, Format, ImageBindFlags,
    ImageDescriptor, Interval, ResourceState,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version.
pub fn init() {
    scopegraph_core::init();
    log::info!("scopegraph v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
