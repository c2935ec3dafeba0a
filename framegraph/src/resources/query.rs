//! Multi-device query pools.

use super::{DeviceResources, PhysicalResourceId};
use crate::device::{DeviceIndex, DeviceMask};
use crate::types::Interval;

/// Kind of queries stored in a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    /// Samples passing the depth test.
    Occlusion,
    /// GPU timestamps.
    Timestamp,
    /// Pipeline statistics counters.
    PipelineStatistics,
}

/// A pool of query slots, one physical pool per device.
///
/// Scopes reserve slot ranges with
/// [`FrameGraphInterface::use_query_pool`](crate::FrameGraphInterface::use_query_pool).
pub struct QueryPool {
    label: String,
    query_type: QueryType,
    query_count: u32,
    resources: DeviceResources,
}

impl QueryPool {
    pub(crate) fn new(
        label: String,
        query_type: QueryType,
        query_count: u32,
        resources: DeviceResources,
    ) -> Self {
        Self {
            label,
            query_type,
            query_count,
            resources,
        }
    }

    /// Get the debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Get the query type.
    pub fn query_type(&self) -> QueryType {
        self.query_type
    }

    /// Number of query slots.
    pub fn query_count(&self) -> u32 {
        self.query_count
    }

    /// Check if the interval addresses existing slots.
    pub fn contains(&self, interval: Interval) -> bool {
        interval.max < self.query_count
    }

    /// Devices that hold a physical pool.
    pub fn device_mask(&self) -> DeviceMask {
        self.resources.mask()
    }

    /// Physical pool on the given device.
    pub fn device_resource(&self, device: DeviceIndex) -> Option<PhysicalResourceId> {
        self.resources.handle(device)
    }

    /// Returns false once [`shutdown`](Self::shutdown) has been called.
    pub fn is_valid(&self) -> bool {
        self.resources.is_valid()
    }

    /// Release the physical pools.
    pub fn shutdown(&self) {
        self.resources.shutdown();
    }
}

impl std::fmt::Debug for QueryPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryPool")
            .field("label", &self.label)
            .field("query_type", &self.query_type)
            .field("query_count", &self.query_count)
            .finish()
    }
}

static_assertions::assert_impl_all!(QueryPool: Send, Sync);
