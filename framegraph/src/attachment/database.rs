//! Per-frame registry of attachments.

use std::collections::HashMap;
use std::sync::Arc;

use scopegraph_core::pool::Poolable;

use super::{AttachmentId, AttachmentKind, AttachmentLifetime, BufferView, HeapPlacement, ImageView};
use crate::device::DeviceIndex;
use crate::error::FrameGraphError;
use crate::resources::{Buffer, Image, PhysicalResourceId};
use crate::types::{BufferDescriptor, ImageDescriptor, ResourceState};

/// Where an attachment's backing comes from.
#[derive(Debug, Clone)]
enum AttachmentSource {
    TransientImage(ImageDescriptor),
    TransientBuffer(BufferDescriptor),
    ImportedImage(Arc<Image>),
    ImportedBuffer(Arc<Buffer>),
}

/// A registered attachment.
#[derive(Debug, Clone)]
pub struct Attachment {
    id: AttachmentId,
    source: AttachmentSource,
}

impl Attachment {
    /// Attachment id.
    pub fn id(&self) -> &AttachmentId {
        &self.id
    }

    /// Image or buffer.
    pub fn kind(&self) -> AttachmentKind {
        match self.source {
            AttachmentSource::TransientImage(_) | AttachmentSource::ImportedImage(_) => {
                AttachmentKind::Image
            }
            AttachmentSource::TransientBuffer(_) | AttachmentSource::ImportedBuffer(_) => {
                AttachmentKind::Buffer
            }
        }
    }

    /// Transient or imported.
    pub fn lifetime(&self) -> AttachmentLifetime {
        match self.source {
            AttachmentSource::TransientImage(_) | AttachmentSource::TransientBuffer(_) => {
                AttachmentLifetime::Transient
            }
            AttachmentSource::ImportedImage(_) | AttachmentSource::ImportedBuffer(_) => {
                AttachmentLifetime::Imported
            }
        }
    }

    /// Check if the attachment is transient.
    pub fn is_transient(&self) -> bool {
        self.lifetime() == AttachmentLifetime::Transient
    }

    /// Descriptor of an image attachment.
    pub fn image_descriptor(&self) -> Option<&ImageDescriptor> {
        match &self.source {
            AttachmentSource::TransientImage(desc) => Some(desc),
            AttachmentSource::ImportedImage(image) => Some(image.descriptor()),
            _ => None,
        }
    }

    /// Descriptor of a buffer attachment.
    pub fn buffer_descriptor(&self) -> Option<&BufferDescriptor> {
        match &self.source {
            AttachmentSource::TransientBuffer(desc) => Some(desc),
            AttachmentSource::ImportedBuffer(buffer) => Some(buffer.descriptor()),
            _ => None,
        }
    }

    /// The imported image, if any.
    pub fn imported_image(&self) -> Option<&Arc<Image>> {
        match &self.source {
            AttachmentSource::ImportedImage(image) => Some(image),
            _ => None,
        }
    }

    /// The imported buffer, if any.
    pub fn imported_buffer(&self) -> Option<&Arc<Buffer>> {
        match &self.source {
            AttachmentSource::ImportedBuffer(buffer) => Some(buffer),
            _ => None,
        }
    }

    /// Heap bytes a transient attachment needs; 0 for imported ones.
    pub(crate) fn transient_size(&self) -> u64 {
        match &self.source {
            // Registration rejects images whose size overflows.
            AttachmentSource::TransientImage(desc) => desc.byte_size().unwrap_or_default(),
            AttachmentSource::TransientBuffer(desc) => desc.size,
            _ => 0,
        }
    }

    /// Physical resource of an imported attachment on a device.
    pub(crate) fn imported_resource(&self, device: DeviceIndex) -> Option<PhysicalResourceId> {
        match &self.source {
            AttachmentSource::ImportedImage(image) => image.device_resource(device),
            AttachmentSource::ImportedBuffer(buffer) => buffer.device_resource(device),
            _ => None,
        }
    }

    /// State an imported resource was left in; transient attachments start undefined.
    pub(crate) fn initial_state(&self, device: DeviceIndex) -> ResourceState {
        match &self.source {
            AttachmentSource::ImportedImage(image) => image.state(device),
            AttachmentSource::ImportedBuffer(buffer) => buffer.state(device),
            _ => ResourceState::Undefined,
        }
    }

    /// Record the final state of an imported resource for the next frame.
    pub(crate) fn store_final_state(&self, device: DeviceIndex, state: ResourceState) {
        match &self.source {
            AttachmentSource::ImportedImage(image) => image.set_state(device, state),
            AttachmentSource::ImportedBuffer(buffer) => buffer.set_state(device, state),
            _ => {}
        }
    }
}

/// Physical backing assigned to an attachment on one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolvedResource {
    pub(crate) resource: PhysicalResourceId,
    pub(crate) placement: Option<HeapPlacement>,
}

/// Registry of the attachments used in one frame.
///
/// Scopes register transient attachments and import persistent resources
/// during Prepare. After the compiler has assigned backing resources, views
/// can be queried per device.
///
/// A failed registration is returned to the caller and also fails the
/// frame when it ends.
///
/// # Example
///
/// ```
/// use scopegraph::{AttachmentDatabase, Format, ImageBindFlags, ImageDescriptor};
///
/// let mut database = AttachmentDatabase::new();
/// let desc = ImageDescriptor::new_2d(ImageBindFlags::COLOR, 128, 128, Format::Rgba8Unorm);
/// database.create_transient_image("albedo", desc.clone()).unwrap();
///
/// assert!(database.create_transient_image("albedo", desc).is_err());
/// // Not resolved until the frame is compiled.
/// assert!(database.image_view("albedo", 0).is_err());
/// ```
#[derive(Debug, Default)]
pub struct AttachmentDatabase {
    attachments: Vec<Attachment>,
    lookup: HashMap<AttachmentId, usize>,
    resolved: HashMap<(usize, DeviceIndex), ResolvedResource>,
    /// First registration failure of the frame.
    failure: Option<FrameGraphError>,
}

impl AttachmentDatabase {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a frame-local image.
    ///
    /// # Errors
    ///
    /// Fails if the id is already registered this frame or the descriptor is invalid.
    pub fn create_transient_image(
        &mut self,
        id: impl Into<AttachmentId>,
        descriptor: ImageDescriptor,
    ) -> Result<(), FrameGraphError> {
        let id = id.into();
        self.check_unregistered(&id)?;
        descriptor.validate().map_err(|err| self.fail(err))?;
        log::trace!(
            "AttachmentDatabase: transient image '{}' {}x{} {:?}",
            id,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.format
        );
        self.insert(id, AttachmentSource::TransientImage(descriptor));
        Ok(())
    }

    /// Register a frame-local buffer.
    ///
    /// # Errors
    ///
    /// Fails if the id is already registered this frame or the size is zero.
    pub fn create_transient_buffer(
        &mut self,
        id: impl Into<AttachmentId>,
        descriptor: BufferDescriptor,
    ) -> Result<(), FrameGraphError> {
        let id = id.into();
        self.check_unregistered(&id)?;
        descriptor.validate().map_err(|err| self.fail(err))?;
        log::trace!(
            "AttachmentDatabase: transient buffer '{}' size={}",
            id,
            descriptor.size
        );
        self.insert(id, AttachmentSource::TransientBuffer(descriptor));
        Ok(())
    }

    /// Register an attachment backed by a persistent image.
    ///
    /// # Errors
    ///
    /// Fails if the id is already registered or the image has been shut down.
    pub fn import_image(
        &mut self,
        id: impl Into<AttachmentId>,
        image: &Arc<Image>,
    ) -> Result<(), FrameGraphError> {
        let id = id.into();
        self.check_unregistered(&id)?;
        if !image.is_valid() {
            return Err(self.fail(FrameGraphError::InvalidImport(id)));
        }
        log::trace!("AttachmentDatabase: imported image '{}' as '{}'", image.label(), id);
        self.insert(id, AttachmentSource::ImportedImage(Arc::clone(image)));
        Ok(())
    }

    /// Register an attachment backed by a persistent buffer.
    ///
    /// # Errors
    ///
    /// Fails if the id is already registered or the buffer has been shut down.
    pub fn import_buffer(
        &mut self,
        id: impl Into<AttachmentId>,
        buffer: &Arc<Buffer>,
    ) -> Result<(), FrameGraphError> {
        let id = id.into();
        self.check_unregistered(&id)?;
        if !buffer.is_valid() {
            return Err(self.fail(FrameGraphError::InvalidImport(id)));
        }
        log::trace!(
            "AttachmentDatabase: imported buffer '{}' as '{}'",
            buffer.label(),
            id
        );
        self.insert(id, AttachmentSource::ImportedBuffer(Arc::clone(buffer)));
        Ok(())
    }

    /// Check if an id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.lookup.contains_key(id)
    }

    /// Look up a registered attachment.
    pub fn attachment(&self, id: &str) -> Option<&Attachment> {
        self.lookup.get(id).map(|&index| &self.attachments[index])
    }

    /// Registered ids in registration order.
    pub fn attachment_ids(&self) -> impl Iterator<Item = &AttachmentId> {
        self.attachments.iter().map(|attachment| &attachment.id)
    }

    /// Number of registered attachments.
    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }

    /// View of an image attachment on a device.
    ///
    /// # Errors
    ///
    /// Fails for unknown ids, buffer attachments, and attachments the
    /// compiler has not resolved on `device`.
    pub fn image_view(&self, id: &str, device: DeviceIndex) -> Result<ImageView, FrameGraphError> {
        let (index, attachment) = self.lookup_attachment(id)?;
        let descriptor = attachment.image_descriptor().ok_or_else(|| {
            FrameGraphError::AttachmentKindMismatch {
                attachment: attachment.id.clone(),
                expected: AttachmentKind::Image,
            }
        })?;
        let resolved = self.resolved_resource(index, device)?;
        Ok(ImageView {
            attachment: attachment.id.clone(),
            device,
            resource: resolved.resource,
            descriptor: descriptor.clone(),
            lifetime: attachment.lifetime(),
            placement: resolved.placement,
        })
    }

    /// View of a buffer attachment on a device.
    ///
    /// # Errors
    ///
    /// Fails for unknown ids, image attachments, and attachments the
    /// compiler has not resolved on `device`.
    pub fn buffer_view(
        &self,
        id: &str,
        device: DeviceIndex,
    ) -> Result<BufferView, FrameGraphError> {
        let (index, attachment) = self.lookup_attachment(id)?;
        let descriptor = attachment.buffer_descriptor().ok_or_else(|| {
            FrameGraphError::AttachmentKindMismatch {
                attachment: attachment.id.clone(),
                expected: AttachmentKind::Buffer,
            }
        })?;
        let resolved = self.resolved_resource(index, device)?;
        Ok(BufferView {
            attachment: attachment.id.clone(),
            device,
            resource: resolved.resource,
            descriptor: descriptor.clone(),
            lifetime: attachment.lifetime(),
            placement: resolved.placement,
        })
    }

    /// Check if the attachment has backing on a device.
    pub fn is_resolved(&self, id: &str, device: DeviceIndex) -> bool {
        self.lookup
            .get(id)
            .is_some_and(|&index| self.resolved.contains_key(&(index, device)))
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<usize> {
        self.lookup.get(id).copied()
    }

    pub(crate) fn attachment_at(&self, index: usize) -> &Attachment {
        &self.attachments[index]
    }

    pub(crate) fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub(crate) fn resolved_at(
        &self,
        index: usize,
        device: DeviceIndex,
    ) -> Option<ResolvedResource> {
        self.resolved.get(&(index, device)).copied()
    }

    pub(crate) fn resolve(
        &mut self,
        index: usize,
        device: DeviceIndex,
        resolved: ResolvedResource,
    ) {
        self.resolved.insert((index, device), resolved);
    }

    fn lookup_attachment(&self, id: &str) -> Result<(usize, &Attachment), FrameGraphError> {
        self.lookup
            .get(id)
            .map(|&index| (index, &self.attachments[index]))
            .ok_or_else(|| FrameGraphError::UnknownAttachment(AttachmentId::from(id)))
    }

    fn resolved_resource(
        &self,
        index: usize,
        device: DeviceIndex,
    ) -> Result<ResolvedResource, FrameGraphError> {
        self.resolved
            .get(&(index, device))
            .copied()
            .ok_or_else(|| FrameGraphError::AttachmentNotResolved {
                attachment: self.attachments[index].id.clone(),
                device,
            })
    }

    /// Take the first registration failure of the frame, if any.
    pub(crate) fn take_failure(&mut self) -> Option<FrameGraphError> {
        self.failure.take()
    }

    fn fail(&mut self, err: FrameGraphError) -> FrameGraphError {
        log::error!("AttachmentDatabase: {err}");
        self.failure.get_or_insert_with(|| err.clone());
        err
    }

    fn check_unregistered(&mut self, id: &AttachmentId) -> Result<(), FrameGraphError> {
        if self.lookup.contains_key(id.as_str()) {
            return Err(self.fail(FrameGraphError::DuplicateAttachment(id.clone())));
        }
        Ok(())
    }

    fn insert(&mut self, id: AttachmentId, source: AttachmentSource) {
        self.lookup.insert(id.clone(), self.attachments.len());
        self.attachments.push(Attachment { id, source });
    }
}

impl Poolable for AttachmentDatabase {
    fn new_empty() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.attachments.clear();
        self.lookup.clear();
        self.resolved.clear();
        self.failure = None;
    }
}
