//! Persistent multi-device resources.
//!
//! Resources here outlive a single frame: swap chain stand-ins, history
//! buffers, staging buffers and query pools. Each one holds a physical
//! resource per device in its [`DeviceMask`] under a single logical
//! handle. They enter a frame through
//! [`AttachmentDatabase::import_image`](crate::AttachmentDatabase::import_image)
//! and friends.
//!
//! Resources are created by [`DeviceGroup`](crate::DeviceGroup) and shared
//! through `Arc`. Calling `shutdown()` invalidates the resource; importing an
//! invalid resource fails.

mod buffer;
mod image;
mod query;

pub use buffer::Buffer;
pub use image::Image;
pub use query::{QueryPool, QueryType};

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::device::{DeviceIndex, DeviceMask};
use crate::types::ResourceState;

/// Handle of one physical (single-device) resource.
///
/// Transient attachments receive fresh handles every frame; imported
/// resources keep theirs for their whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhysicalResourceId(u64);

impl PhysicalResourceId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw handle value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PhysicalResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-device physical handles plus the state each one was left in.
#[derive(Debug)]
pub(crate) struct DeviceResources {
    mask: DeviceMask,
    handles: Vec<(DeviceIndex, PhysicalResourceId)>,
    states: Mutex<Vec<(DeviceIndex, ResourceState)>>,
    valid: AtomicBool,
}

impl DeviceResources {
    pub(crate) fn new(mask: DeviceMask, handles: Vec<(DeviceIndex, PhysicalResourceId)>) -> Self {
        let states = handles
            .iter()
            .map(|&(device, _)| (device, ResourceState::Undefined))
            .collect();
        Self {
            mask,
            handles,
            states: Mutex::new(states),
            valid: AtomicBool::new(true),
        }
    }

    pub(crate) fn mask(&self) -> DeviceMask {
        self.mask
    }

    pub(crate) fn handle(&self, device: DeviceIndex) -> Option<PhysicalResourceId> {
        self.handles
            .iter()
            .find(|(index, _)| *index == device)
            .map(|&(_, handle)| handle)
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    pub(crate) fn shutdown(&self) {
        self.valid.store(false, Ordering::Release);
    }

    pub(crate) fn state(&self, device: DeviceIndex) -> ResourceState {
        self.states
            .lock()
            .iter()
            .find(|(index, _)| *index == device)
            .map(|&(_, state)| state)
            .unwrap_or_default()
    }

    pub(crate) fn set_state(&self, device: DeviceIndex, state: ResourceState) {
        let mut states = self.states.lock();
        match states.iter_mut().find(|(index, _)| *index == device) {
            Some(entry) => entry.1 = state,
            None => states.push((device, state)),
        }
    }
}
