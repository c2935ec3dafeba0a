//! Persistent multi-device image.

use super::{DeviceResources, PhysicalResourceId};
use crate::device::{DeviceIndex, DeviceMask};
use crate::types::{Format, ImageDescriptor, ResourceState};

/// An image that outlives the frame, with one physical image per device.
///
/// Created through [`DeviceGroup::create_image`](crate::DeviceGroup::create_image).
pub struct Image {
    label: String,
    descriptor: ImageDescriptor,
    resources: DeviceResources,
}

impl Image {
    pub(crate) fn new(
        label: String,
        descriptor: ImageDescriptor,
        resources: DeviceResources,
    ) -> Self {
        Self {
            label,
            descriptor,
            resources,
        }
    }

    /// Get the debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Get the image descriptor.
    pub fn descriptor(&self) -> &ImageDescriptor {
        &self.descriptor
    }

    /// Get the image format.
    pub fn format(&self) -> Format {
        self.descriptor.format
    }

    /// Devices that hold a physical copy of this image.
    pub fn device_mask(&self) -> DeviceMask {
        self.resources.mask()
    }

    /// Physical image on the given device, if the image lives there.
    pub fn device_resource(&self, device: DeviceIndex) -> Option<PhysicalResourceId> {
        self.resources.handle(device)
    }

    /// Returns false once [`shutdown`](Self::shutdown) has been called.
    pub fn is_valid(&self) -> bool {
        self.resources.is_valid()
    }

    /// Release the physical images. Later imports fail.
    pub fn shutdown(&self) {
        log::trace!("Image '{}': shutdown", self.label);
        self.resources.shutdown();
    }

    /// State the image was left in on the given device by the last frame.
    pub fn state(&self, device: DeviceIndex) -> ResourceState {
        self.resources.state(device)
    }

    pub(crate) fn set_state(&self, device: DeviceIndex, state: ResourceState) {
        self.resources.set_state(device, state);
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("label", &self.label)
            .field("size", &self.descriptor.size)
            .field("format", &self.descriptor.format)
            .field("devices", &self.resources.mask())
            .finish()
    }
}

static_assertions::assert_impl_all!(Image: Send, Sync);
