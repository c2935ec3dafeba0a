//! Device group and device masks.
//!
//! A [`DeviceGroup`] stands for the set of physical GPUs the frame graph
//! schedules onto. It creates persistent multi-device resources and hands
//! out physical resource handles for transient attachments. It is passed to
//! the [`FrameGraphSystem`](crate::FrameGraphSystem) and to sample
//! components as an explicit service handle.
//!
//! # Example
//!
//! ```
//! use scopegraph::{BufferBindFlags, BufferDescriptor, DeviceGroup, DeviceMask};
//!
//! let group = DeviceGroup::new(2).unwrap();
//! let staging = group
//!     .create_host_buffer(
//!         "staging",
//!         &BufferDescriptor::new(BufferBindFlags::COPY_WRITE, 64),
//!         DeviceMask::single(1),
//!     )
//!     .unwrap();
//! assert!(staging.device_resource(1).is_some());
//! assert!(staging.device_resource(0).is_none());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::error::FrameGraphError;
use crate::resources::{Buffer, DeviceResources, Image, PhysicalResourceId, QueryPool, QueryType};
use crate::types::{BufferDescriptor, ImageDescriptor};

/// Index of a physical device inside a [`DeviceGroup`].
pub type DeviceIndex = u32;

/// Maximum number of devices a mask can address.
pub const MAX_DEVICES: u32 = 32;

/// Set of devices, one bit per device index.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceMask(u32);

impl DeviceMask {
    /// Mask with no devices.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Mask from raw bits (bit `i` selects device `i`).
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Mask selecting a single device. Out-of-range indices give an empty mask.
    pub const fn single(device: DeviceIndex) -> Self {
        match 1u32.checked_shl(device) {
            Some(bits) => Self(bits),
            None => Self(0),
        }
    }

    /// Mask selecting devices `0..count`.
    pub fn all(count: u32) -> Self {
        if count >= MAX_DEVICES {
            Self(u32::MAX)
        } else {
            Self((1u32 << count) - 1)
        }
    }

    /// Get the raw bits.
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Check if the mask selects the device.
    pub fn contains(&self, device: DeviceIndex) -> bool {
        device < MAX_DEVICES && self.0 & (1 << device) != 0
    }

    /// Check if no device is selected.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of selected devices.
    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }

    /// Lowest selected device.
    pub fn first(&self) -> Option<DeviceIndex> {
        (!self.is_empty()).then(|| self.0.trailing_zeros())
    }

    /// Selected devices in ascending order.
    pub fn iter(self) -> impl Iterator<Item = DeviceIndex> {
        (0..MAX_DEVICES).filter(move |&device| self.contains(device))
    }
}

impl Default for DeviceMask {
    fn default() -> Self {
        Self::single(0)
    }
}

impl std::fmt::Debug for DeviceMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// The set of devices frames are scheduled onto.
pub struct DeviceGroup {
    device_count: u32,
    next_resource_id: AtomicU64,
    // Weak references for leak tracking and debugging
    images: RwLock<Vec<Weak<Image>>>,
    buffers: RwLock<Vec<Weak<Buffer>>>,
    query_pools: RwLock<Vec<Weak<QueryPool>>>,
}

impl DeviceGroup {
    /// Create a group of `device_count` devices.
    ///
    /// # Errors
    ///
    /// Fails if the count is zero or exceeds [`MAX_DEVICES`].
    pub fn new(device_count: u32) -> Result<Arc<Self>, FrameGraphError> {
        if device_count == 0 || device_count > MAX_DEVICES {
            return Err(FrameGraphError::InvalidDeviceCount(device_count));
        }
        log::info!("DeviceGroup: created with {device_count} device(s)");
        Ok(Arc::new(Self {
            device_count,
            next_resource_id: AtomicU64::new(1),
            images: RwLock::new(Vec::new()),
            buffers: RwLock::new(Vec::new()),
            query_pools: RwLock::new(Vec::new()),
        }))
    }

    /// Number of devices in the group.
    pub fn device_count(&self) -> u32 {
        self.device_count
    }

    /// Mask selecting every device in the group.
    pub fn all_devices(&self) -> DeviceMask {
        DeviceMask::all(self.device_count)
    }

    /// Check if the device index exists in this group.
    pub fn has_device(&self, device: DeviceIndex) -> bool {
        device < self.device_count
    }

    /// Check that a mask is non-empty and only selects existing devices.
    pub(crate) fn validate_mask(&self, mask: DeviceMask) -> Result<(), FrameGraphError> {
        match mask.iter().find(|&device| !self.has_device(device)) {
            Some(device) => Err(FrameGraphError::InvalidDevice {
                device,
                device_count: self.device_count,
            }),
            None if mask.is_empty() => Err(FrameGraphError::InvalidDescriptor(
                "device mask selects no device".to_string(),
            )),
            None => Ok(()),
        }
    }

    /// Allocate a fresh physical resource handle.
    pub(crate) fn allocate_resource_id(&self) -> PhysicalResourceId {
        PhysicalResourceId::new(self.next_resource_id.fetch_add(1, Ordering::Relaxed))
    }

    fn allocate_device_resources(&self, mask: DeviceMask) -> DeviceResources {
        let handles = mask
            .iter()
            .map(|device| (device, self.allocate_resource_id()))
            .collect();
        DeviceResources::new(mask, handles)
    }

    /// Create a persistent image on every device in `mask`.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor is invalid or the mask selects
    /// devices outside the group. Nothing is created in that case.
    pub fn create_image(
        &self,
        label: impl Into<String>,
        descriptor: &ImageDescriptor,
        mask: DeviceMask,
    ) -> Result<Arc<Image>, FrameGraphError> {
        descriptor.validate()?;
        self.validate_mask(mask)?;

        let label = label.into();
        log::trace!(
            "DeviceGroup: created image '{}', {}x{} {:?} on {:?}",
            label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.format,
            mask
        );
        let image = Arc::new(Image::new(
            label,
            descriptor.clone(),
            self.allocate_device_resources(mask),
        ));
        self.images.write().push(Arc::downgrade(&image));
        Ok(image)
    }

    /// Create a persistent device-local buffer on every device in `mask`.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is zero or the mask is invalid.
    pub fn create_buffer(
        &self,
        label: impl Into<String>,
        descriptor: &BufferDescriptor,
        mask: DeviceMask,
    ) -> Result<Arc<Buffer>, FrameGraphError> {
        self.create_buffer_inner(label.into(), descriptor, mask, false)
    }

    /// Create a persistent host-visible (staging) buffer on every device in `mask`.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is zero or the mask is invalid.
    pub fn create_host_buffer(
        &self,
        label: impl Into<String>,
        descriptor: &BufferDescriptor,
        mask: DeviceMask,
    ) -> Result<Arc<Buffer>, FrameGraphError> {
        self.create_buffer_inner(label.into(), descriptor, mask, true)
    }

    fn create_buffer_inner(
        &self,
        label: String,
        descriptor: &BufferDescriptor,
        mask: DeviceMask,
        host_visible: bool,
    ) -> Result<Arc<Buffer>, FrameGraphError> {
        descriptor.validate()?;
        self.validate_mask(mask)?;

        log::trace!(
            "DeviceGroup: created buffer '{}', size={}, host_visible={} on {:?}",
            label,
            descriptor.size,
            host_visible,
            mask
        );
        let buffer = Arc::new(Buffer::new(
            label,
            descriptor.clone(),
            self.allocate_device_resources(mask),
            host_visible,
        ));
        self.buffers.write().push(Arc::downgrade(&buffer));
        Ok(buffer)
    }

    /// Create a query pool with `query_count` slots on every device in `mask`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool is empty or the mask is invalid.
    pub fn create_query_pool(
        &self,
        label: impl Into<String>,
        query_type: QueryType,
        query_count: u32,
        mask: DeviceMask,
    ) -> Result<Arc<QueryPool>, FrameGraphError> {
        if query_count == 0 {
            return Err(FrameGraphError::InvalidDescriptor(
                "query pool needs at least one query".to_string(),
            ));
        }
        self.validate_mask(mask)?;

        let label = label.into();
        log::trace!(
            "DeviceGroup: created {:?} query pool '{}' with {} queries",
            query_type,
            label,
            query_count
        );
        let pool = Arc::new(QueryPool::new(
            label,
            query_type,
            query_count,
            self.allocate_device_resources(mask),
        ));
        self.query_pools.write().push(Arc::downgrade(&pool));
        Ok(pool)
    }

    /// Number of live images created by this group.
    pub fn image_count(&self) -> usize {
        self.images
            .read()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Number of live buffers created by this group.
    pub fn buffer_count(&self) -> usize {
        self.buffers
            .read()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Number of live query pools created by this group.
    pub fn query_pool_count(&self) -> usize {
        self.query_pools
            .read()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Drop weak references to released resources.
    pub fn cleanup_dead_resources(&self) {
        self.images.write().retain(|w| w.strong_count() > 0);
        self.buffers.write().retain(|w| w.strong_count() > 0);
        self.query_pools.write().retain(|w| w.strong_count() > 0);
    }
}

impl std::fmt::Debug for DeviceGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceGroup")
            .field("device_count", &self.device_count)
            .finish()
    }
}

static_assertions::assert_impl_all!(DeviceGroup: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BufferBindFlags, Format, ImageBindFlags};

    #[test]
    fn test_device_mask_single_and_all() {
        assert_eq!(DeviceMask::single(1).bits(), 0b10);
        assert_eq!(DeviceMask::all(3).bits(), 0b111);
        assert_eq!(DeviceMask::all(32).bits(), u32::MAX);
        assert!(DeviceMask::single(40).is_empty());
        assert_eq!(DeviceMask::default(), DeviceMask::single(0));
    }

    #[test]
    fn test_device_mask_iter_ascending() {
        let mask = DeviceMask::from_bits(0b1010_0001);
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![0, 5, 7]);
        assert_eq!(mask.count(), 3);
        assert_eq!(mask.first(), Some(0));
        assert_eq!(DeviceMask::empty().first(), None);
    }

    #[test]
    fn test_new_rejects_zero_devices() {
        assert!(matches!(
            DeviceGroup::new(0),
            Err(FrameGraphError::InvalidDeviceCount(0))
        ));
    }

    #[test]
    fn test_create_image_per_device_handles() {
        let group = DeviceGroup::new(2).unwrap();
        let image = group
            .create_image(
                "history",
                &ImageDescriptor::new_2d(ImageBindFlags::COLOR, 64, 64, Format::Rgba8Unorm),
                group.all_devices(),
            )
            .unwrap();

        let first = image.device_resource(0).unwrap();
        let second = image.device_resource(1).unwrap();
        assert_ne!(first, second);
        assert_eq!(group.image_count(), 1);
    }

    #[test]
    fn test_create_image_rejects_device_outside_group() {
        let group = DeviceGroup::new(1).unwrap();
        let result = group.create_image(
            "bad",
            &ImageDescriptor::new_2d(ImageBindFlags::COLOR, 4, 4, Format::Rgba8Unorm),
            DeviceMask::single(1),
        );
        assert!(matches!(
            result,
            Err(FrameGraphError::InvalidDevice { device: 1, .. })
        ));
        assert_eq!(group.image_count(), 0);
    }

    #[test]
    fn test_create_buffer_zero_size_fails() {
        let group = DeviceGroup::new(1).unwrap();
        let result = group.create_buffer(
            "empty",
            &BufferDescriptor::new(BufferBindFlags::COPY_READ, 0),
            DeviceMask::single(0),
        );
        assert!(result.is_err());
        assert_eq!(group.buffer_count(), 0);
    }

    #[test]
    fn test_host_buffer_read_write() {
        let group = DeviceGroup::new(2).unwrap();
        let buffer = group
            .create_host_buffer(
                "staging",
                &BufferDescriptor::new(BufferBindFlags::COPY_WRITE, 8),
                group.all_devices(),
            )
            .unwrap();

        buffer.write_host(1, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(buffer.read_host(1).unwrap(), vec![0, 0, 0, 0, 1, 2, 3, 4]);
        assert_eq!(buffer.read_host(0).unwrap(), vec![0; 8]);
        assert!(buffer.write_host(1, 6, &[0; 4]).is_err());
    }

    #[test]
    fn test_device_local_buffer_is_not_mappable() {
        let group = DeviceGroup::new(1).unwrap();
        let buffer = group
            .create_buffer(
                "local",
                &BufferDescriptor::new(BufferBindFlags::SHADER_READ, 16),
                DeviceMask::single(0),
            )
            .unwrap();
        assert!(!buffer.is_host_visible());
        assert!(matches!(
            buffer.read_host(0),
            Err(FrameGraphError::HostAccess(_))
        ));
    }

    #[test]
    fn test_cleanup_dead_resources() {
        let group = DeviceGroup::new(1).unwrap();
        let pool = group
            .create_query_pool("occlusion", QueryType::Occlusion, 4, DeviceMask::single(0))
            .unwrap();
        assert_eq!(group.query_pool_count(), 1);

        drop(pool);
        group.cleanup_dead_resources();
        assert_eq!(group.query_pool_count(), 0);
    }
}
