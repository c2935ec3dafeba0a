//! Persistent multi-device buffer.

use parking_lot::Mutex;

use super::{DeviceResources, PhysicalResourceId};
use crate::device::{DeviceIndex, DeviceMask};
use crate::error::FrameGraphError;
use crate::types::{BufferDescriptor, ResourceState};

/// A buffer that outlives the frame, with one physical buffer per device.
///
/// Host-visible buffers (created with
/// [`DeviceGroup::create_host_buffer`](crate::DeviceGroup::create_host_buffer))
/// additionally expose their per-device memory to the CPU. This is how data
/// crosses devices: a copy scope on one device fills its staging copy, the
/// host moves the bytes between frames, and a scope on the other device
/// reads its own copy.
pub struct Buffer {
    label: String,
    descriptor: BufferDescriptor,
    resources: DeviceResources,
    host_memory: Option<Vec<(DeviceIndex, Mutex<Vec<u8>>)>>,
}

impl Buffer {
    pub(crate) fn new(
        label: String,
        descriptor: BufferDescriptor,
        resources: DeviceResources,
        host_visible: bool,
    ) -> Self {
        let host_memory = host_visible.then(|| {
            resources
                .mask()
                .iter()
                .map(|device| (device, Mutex::new(vec![0u8; descriptor.size as usize])))
                .collect()
        });
        Self {
            label,
            descriptor,
            resources,
            host_memory,
        }
    }

    /// Get the debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Get the buffer descriptor.
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// Get the buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    /// Devices that hold a physical copy of this buffer.
    pub fn device_mask(&self) -> DeviceMask {
        self.resources.mask()
    }

    /// Physical buffer on the given device, if the buffer lives there.
    pub fn device_resource(&self, device: DeviceIndex) -> Option<PhysicalResourceId> {
        self.resources.handle(device)
    }

    /// Check if the buffer memory is mappable by the host.
    pub fn is_host_visible(&self) -> bool {
        self.host_memory.is_some()
    }

    /// Returns false once [`shutdown`](Self::shutdown) has been called.
    pub fn is_valid(&self) -> bool {
        self.resources.is_valid()
    }

    /// Release the physical buffers. Later imports fail.
    pub fn shutdown(&self) {
        log::trace!("Buffer '{}': shutdown", self.label);
        self.resources.shutdown();
    }

    /// State the buffer was left in on the given device by the last frame.
    pub fn state(&self, device: DeviceIndex) -> ResourceState {
        self.resources.state(device)
    }

    pub(crate) fn set_state(&self, device: DeviceIndex, state: ResourceState) {
        self.resources.set_state(device, state);
    }

    /// Write bytes into the device's host-visible copy at `offset`.
    pub fn write_host(
        &self,
        device: DeviceIndex,
        offset: u64,
        data: &[u8],
    ) -> Result<(), FrameGraphError> {
        let memory = self.host_memory(device)?;
        let mut bytes = memory.lock();
        let start = offset as usize;
        let end = start + data.len();
        if end > bytes.len() {
            return Err(FrameGraphError::HostAccess(format!(
                "write of {} bytes at offset {} exceeds buffer '{}' size {}",
                data.len(),
                offset,
                self.label,
                bytes.len()
            )));
        }
        bytes[start..end].copy_from_slice(data);
        Ok(())
    }

    /// Read the device's host-visible copy.
    pub fn read_host(&self, device: DeviceIndex) -> Result<Vec<u8>, FrameGraphError> {
        Ok(self.host_memory(device)?.lock().clone())
    }

    fn host_memory(&self, device: DeviceIndex) -> Result<&Mutex<Vec<u8>>, FrameGraphError> {
        if !self.is_valid() {
            return Err(FrameGraphError::HostAccess(format!(
                "buffer '{}' has been shut down",
                self.label
            )));
        }
        let memory = self.host_memory.as_ref().ok_or_else(|| {
            FrameGraphError::HostAccess(format!("buffer '{}' is not host visible", self.label))
        })?;
        memory
            .iter()
            .find(|(index, _)| *index == device)
            .map(|(_, bytes)| bytes)
            .ok_or_else(|| {
                FrameGraphError::HostAccess(format!(
                    "buffer '{}' has no memory on device {}",
                    self.label, device
                ))
            })
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("label", &self.label)
            .field("size", &self.descriptor.size)
            .field("devices", &self.resources.mask())
            .field("host_visible", &self.is_host_visible())
            .finish()
    }
}

static_assertions::assert_impl_all!(Buffer: Send, Sync);
