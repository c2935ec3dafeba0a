//! Context handed to sample components.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use scopegraph::{DeviceGroup, FrameReport};

/// Running totals kept by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStatistics {
    /// Frames whose graph was built and executed.
    pub frames_executed: u64,
    /// Frames dropped because the graph failed to build.
    pub frames_skipped: u64,
    /// Frames spent waiting for the sample to become ready.
    pub frames_deferred: u64,
    /// Nodes executed in the last executed frame.
    pub last_scope_count: usize,
    /// Barriers recorded in the last executed frame.
    pub last_barrier_count: usize,
    /// Transient heap bytes of the last executed frame, summed over devices.
    pub last_heap_bytes: u64,
}

impl FrameStatistics {
    pub(crate) fn record(&mut self, report: &FrameReport) {
        self.frames_executed += 1;
        self.last_scope_count = report.scopes().len();
        self.last_barrier_count = report.barriers().count();
        self.last_heap_bytes = report
            .heap_statistics()
            .iter()
            .map(|stats| stats.heap_size)
            .sum();
    }
}

/// Services and frame timing available to a sample.
///
/// Cloning is cheap; clones share the device group and statistics.
#[derive(Debug, Clone)]
pub struct SampleContext {
    pub(crate) device_group: Arc<DeviceGroup>,
    pub(crate) statistics: Arc<Mutex<FrameStatistics>>,
    pub(crate) frame_number: u64,
    pub(crate) delta_time: Duration,
    pub(crate) elapsed_time: Duration,
}

impl SampleContext {
    /// Create a context for a device group.
    pub fn new(device_group: Arc<DeviceGroup>) -> Self {
        Self {
            device_group,
            statistics: Arc::new(Mutex::new(FrameStatistics::default())),
            frame_number: 0,
            delta_time: Duration::ZERO,
            elapsed_time: Duration::ZERO,
        }
    }

    /// The device group persistent resources are created on.
    pub fn device_group(&self) -> &Arc<DeviceGroup> {
        &self.device_group
    }

    /// Number of devices in the group.
    pub fn device_count(&self) -> u32 {
        self.device_group.device_count()
    }

    /// Current frame number.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Time since the previous frame.
    pub fn delta_time(&self) -> Duration {
        self.delta_time
    }

    /// Time since the host started.
    pub fn elapsed_time(&self) -> Duration {
        self.elapsed_time
    }

    /// Snapshot of the host's frame statistics.
    pub fn statistics(&self) -> FrameStatistics {
        *self.statistics.lock()
    }
}
