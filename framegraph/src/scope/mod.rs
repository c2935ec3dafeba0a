//! Scopes and scope producers.
//!
//! A scope is one unit of GPU work: it declares which attachments it reads
//! and writes, then records commands. User code implements
//! [`ScopeProducer`] (or wraps closures in [`ScopeProducerFunction`]) and
//! imports the producer into the frame each frame. The frame graph calls
//! three phases on it:
//!
//! | Phase | Context | Purpose |
//! |-------|---------|---------|
//! | Prepare | [`FrameGraphInterface`] | Declare attachments, queries, ordering |
//! | Compile | [`FrameGraphCompileContext`] | Bind resolved resources |
//! | Execute | [`FrameGraphExecuteContext`] | Record commands |

mod attachment;
mod context;
mod interface;
mod producer;

pub use attachment::{
    LoadOp, QueryPoolAttachment, QueryPoolAttachmentKind, ScopeAttachment, ScopeAttachmentAccess,
    ScopeAttachmentDescriptor, ScopeAttachmentUsage, StoreOp,
};
pub use context::{FrameGraphCompileContext, FrameGraphExecuteContext};
pub use interface::FrameGraphInterface;
pub use producer::{ScopeProducer, ScopeProducerFunction, empty_compile};

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::device::DeviceIndex;

/// Name of a scope, unique per device per frame.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(Arc<str>);

impl ScopeId {
    /// Create a scope id.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ScopeId {
    fn from(name: &str) -> Self {
        Self(Arc::from(name))
    }
}

impl From<String> for ScopeId {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&ScopeId> for ScopeId {
    fn from(id: &ScopeId) -> Self {
        id.clone()
    }
}

impl Deref for ScopeId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ScopeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeId({:?})", &*self.0)
    }
}

/// Hardware queue a scope is submitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum HardwareQueueClass {
    /// Graphics queue; can run any scope.
    #[default]
    Graphics,
    /// Async compute queue.
    Compute,
    /// Dedicated copy queue.
    Copy,
}

impl fmt::Display for HardwareQueueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graphics => write!(f, "graphics"),
            Self::Compute => write!(f, "compute"),
            Self::Copy => write!(f, "copy"),
        }
    }
}

/// Everything one producer declared for one device during Prepare.
#[derive(Debug, Clone)]
pub struct Scope {
    pub(crate) id: ScopeId,
    pub(crate) device: DeviceIndex,
    pub(crate) queue: HardwareQueueClass,
    pub(crate) estimated_item_count: u32,
    pub(crate) attachments: Vec<ScopeAttachment>,
    pub(crate) query_pools: Vec<QueryPoolAttachment>,
    pub(crate) execute_after: Vec<ScopeId>,
    pub(crate) execute_before: Vec<ScopeId>,
}

impl Scope {
    pub(crate) fn new(id: ScopeId, device: DeviceIndex) -> Self {
        Self {
            id,
            device,
            queue: HardwareQueueClass::Graphics,
            estimated_item_count: 0,
            attachments: Vec::new(),
            query_pools: Vec::new(),
            execute_after: Vec::new(),
            execute_before: Vec::new(),
        }
    }

    /// Scope id.
    pub fn id(&self) -> &ScopeId {
        &self.id
    }

    /// Device the scope runs on.
    pub fn device(&self) -> DeviceIndex {
        self.device
    }

    /// Queue the scope is submitted to.
    pub fn queue(&self) -> HardwareQueueClass {
        self.queue
    }

    /// Number of draw or dispatch items the scope expects to record.
    pub fn estimated_item_count(&self) -> u32 {
        self.estimated_item_count
    }

    /// Declared attachments in declaration order.
    pub fn attachments(&self) -> &[ScopeAttachment] {
        &self.attachments
    }

    /// Declared query pool ranges.
    pub fn query_pools(&self) -> &[QueryPoolAttachment] {
        &self.query_pools
    }

    /// Find the declaration for an attachment.
    pub fn attachment(&self, id: &str) -> Option<&ScopeAttachment> {
        self.attachments
            .iter()
            .find(|attachment| attachment.attachment().as_str() == id)
    }

    /// Check if the scope declares nothing.
    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty() && self.query_pools.is_empty()
    }
}
