//! Queue synchronization primitives.
//!
//! Semaphores order command lists submitted to different queues or
//! devices within a frame. The frame fence lets the host wait for the
//! whole frame to finish before reusing its resources.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::device::DeviceIndex;
use crate::scope::HardwareQueueClass;

/// A queue endpoint: one hardware queue on one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueId {
    /// Device index.
    pub device: DeviceIndex,
    /// Queue class on that device.
    pub class: HardwareQueueClass,
}

impl QueueId {
    /// Create a queue id.
    pub fn new(device: DeviceIndex, class: HardwareQueueClass) -> Self {
        Self { device, class }
    }
}

impl std::fmt::Display for QueueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.class, self.device)
    }
}

/// GPU semaphore signalled by one command list and waited on by another.
///
/// Semaphores cannot be waited on from the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Semaphore {
    id: u64,
    signal: QueueId,
    wait: QueueId,
}

impl Semaphore {
    pub(crate) fn new(id: u64, signal: QueueId, wait: QueueId) -> Self {
        Self { id, signal, wait }
    }

    /// Frame-unique id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Queue that signals the semaphore.
    pub fn signal_queue(&self) -> QueueId {
        self.signal
    }

    /// Queue that waits on the semaphore.
    pub fn wait_queue(&self) -> QueueId {
        self.wait
    }

    /// Check if the semaphore crosses a device boundary.
    pub fn is_cross_device(&self) -> bool {
        self.signal.device != self.wait.device
    }
}

/// Status of a fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceStatus {
    /// The fence has not yet been signaled.
    Unsignaled,
    /// The fence has been signaled (GPU work complete).
    Signaled,
}

/// Host-GPU synchronization primitive.
///
/// Signalled once every command list of a frame has completed.
///
/// # Example
///
/// ```ignore
/// let report = system.end_frame(builder)?;
///
/// // Later, before reusing frame resources:
/// report.fence().wait();
/// ```
#[derive(Debug)]
pub struct Fence {
    signaled: Arc<AtomicBool>,
}

impl Fence {
    /// Create a new fence in the unsignaled state.
    pub(crate) fn new_unsignaled() -> Self {
        Self {
            signaled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check the current status of the fence.
    pub fn status(&self) -> FenceStatus {
        if self.signaled.load(Ordering::Acquire) {
            FenceStatus::Signaled
        } else {
            FenceStatus::Unsignaled
        }
    }

    /// Check if the fence is signaled (non-blocking).
    pub fn is_signaled(&self) -> bool {
        self.status() == FenceStatus::Signaled
    }

    /// Wait for the fence to be signaled (blocking).
    pub fn wait(&self) {
        while !self.signaled.load(Ordering::Acquire) {
            std::hint::spin_loop();
        }
    }

    /// Wait for the fence with a timeout.
    ///
    /// Returns `true` if the fence was signaled, `false` if timeout elapsed.
    pub fn wait_timeout(&self, timeout: std::time::Duration) -> bool {
        let start = std::time::Instant::now();
        while !self.signaled.load(Ordering::Acquire) {
            if start.elapsed() >= timeout {
                return false;
            }
            std::hint::spin_loop();
        }
        true
    }

    /// Signal the fence.
    ///
    /// Submission is synchronous in this executor, so the frame fence is
    /// signalled right after the last queue is submitted.
    pub(crate) fn signal(&self) {
        self.signaled.store(true, Ordering::Release);
    }
}

impl Clone for Fence {
    fn clone(&self) -> Self {
        Self {
            signaled: Arc::clone(&self.signaled),
        }
    }
}

impl Default for Fence {
    fn default() -> Self {
        Self::new_unsignaled()
    }
}
