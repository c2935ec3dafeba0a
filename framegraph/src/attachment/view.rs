//! Resolved attachment views handed to Compile and Execute.

use super::{AttachmentId, AttachmentLifetime};
use crate::device::DeviceIndex;
use crate::resources::PhysicalResourceId;
use crate::types::{BufferDescriptor, ImageDescriptor};

/// Byte range a transient attachment occupies in its device's transient heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapPlacement {
    /// Offset from the start of the heap.
    pub offset: u64,
    /// Size in bytes.
    pub size: u64,
}

impl HeapPlacement {
    /// One past the last byte.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// Check if two placements share any byte.
    pub fn overlaps(&self, other: &HeapPlacement) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// Read-only view of an image attachment resolved on one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageView {
    pub(crate) attachment: AttachmentId,
    pub(crate) device: DeviceIndex,
    pub(crate) resource: PhysicalResourceId,
    pub(crate) descriptor: ImageDescriptor,
    pub(crate) lifetime: AttachmentLifetime,
    pub(crate) placement: Option<HeapPlacement>,
}

impl ImageView {
    /// Attachment this view resolves.
    pub fn attachment(&self) -> &AttachmentId {
        &self.attachment
    }

    /// Device the view belongs to.
    pub fn device(&self) -> DeviceIndex {
        self.device
    }

    /// Physical image backing the attachment on this device.
    pub fn resource(&self) -> PhysicalResourceId {
        self.resource
    }

    /// Image descriptor.
    pub fn descriptor(&self) -> &ImageDescriptor {
        &self.descriptor
    }

    /// Transient or imported.
    pub fn lifetime(&self) -> AttachmentLifetime {
        self.lifetime
    }

    /// Heap range of a transient image; `None` for imported images.
    pub fn placement(&self) -> Option<HeapPlacement> {
        self.placement
    }
}

/// Read-only view of a buffer attachment resolved on one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferView {
    pub(crate) attachment: AttachmentId,
    pub(crate) device: DeviceIndex,
    pub(crate) resource: PhysicalResourceId,
    pub(crate) descriptor: BufferDescriptor,
    pub(crate) lifetime: AttachmentLifetime,
    pub(crate) placement: Option<HeapPlacement>,
}

impl BufferView {
    /// Attachment this view resolves.
    pub fn attachment(&self) -> &AttachmentId {
        &self.attachment
    }

    /// Device the view belongs to.
    pub fn device(&self) -> DeviceIndex {
        self.device
    }

    /// Physical buffer backing the attachment on this device.
    pub fn resource(&self) -> PhysicalResourceId {
        self.resource
    }

    /// Buffer descriptor.
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    /// Transient or imported.
    pub fn lifetime(&self) -> AttachmentLifetime {
        self.lifetime
    }

    /// Heap range of a transient buffer; `None` for imported buffers.
    pub fn placement(&self) -> Option<HeapPlacement> {
        self.placement
    }
}
