//! What happened in a frame.

use std::ops::Range;

use crate::attachment::{AttachmentId, AttachmentLifetime, HeapPlacement};
use crate::compiler::{Barrier, TransientHeapStatistics};
use crate::device::DeviceIndex;
use crate::executor::{CommandList, Fence, QueueSubmission, Semaphore};
use crate::resources::PhysicalResourceId;
use crate::scope::{HardwareQueueClass, ScopeAttachmentAccess, ScopeAttachmentUsage, ScopeId};

/// An attachment as one scope saw it, after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScopeAttachment {
    pub attachment: AttachmentId,
    pub usage: ScopeAttachmentUsage,
    pub access: ScopeAttachmentAccess,
    pub lifetime: AttachmentLifetime,
    pub resource: PhysicalResourceId,
    /// Heap range for transients.
    pub placement: Option<HeapPlacement>,
}

/// One executed node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledScope {
    pub scope: ScopeId,
    pub device: DeviceIndex,
    pub queue: HardwareQueueClass,
    pub attachments: Vec<ResolvedScopeAttachment>,
    /// Transitions recorded before the scope.
    pub barriers: Vec<Barrier>,
    /// Indices of the scope's command lists.
    pub command_lists: Range<usize>,
}

/// A dependency between two executed nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScheduledDependency {
    /// Node that runs first.
    pub before: (ScopeId, DeviceIndex),
    /// Node that waits for it.
    pub after: (ScopeId, DeviceIndex),
}

/// Result of [`FrameGraphSystem::end_frame`](crate::FrameGraphSystem::end_frame).
///
/// Lists every node in execution order with its resolved attachments and
/// barriers, the dependency edges, the recorded command lists and their
/// queue submissions, and the transient heap statistics.
#[derive(Debug)]
pub struct FrameReport {
    pub(crate) frame_index: u64,
    pub(crate) scopes: Vec<ScheduledScope>,
    pub(crate) dependencies: Vec<ScheduledDependency>,
    pub(crate) command_lists: Vec<CommandList>,
    pub(crate) submissions: Vec<QueueSubmission>,
    pub(crate) semaphores: Vec<Semaphore>,
    pub(crate) heap_statistics: Vec<TransientHeapStatistics>,
    pub(crate) fence: Fence,
}

impl FrameReport {
    /// Index of the frame.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Executed nodes in execution order.
    pub fn scopes(&self) -> &[ScheduledScope] {
        &self.scopes
    }

    /// (scope, device) pairs in execution order.
    pub fn execution_order(&self) -> impl Iterator<Item = (&ScopeId, DeviceIndex)> {
        self.scopes.iter().map(|scheduled| (&scheduled.scope, scheduled.device))
    }

    /// Scope ids in execution order.
    pub fn scope_names(&self) -> Vec<&str> {
        self.scopes
            .iter()
            .map(|scheduled| scheduled.scope.as_str())
            .collect()
    }

    /// Find a node.
    pub fn scope(&self, scope: &str, device: DeviceIndex) -> Option<&ScheduledScope> {
        self.scopes
            .iter()
            .find(|scheduled| scheduled.scope.as_str() == scope && scheduled.device == device)
    }

    /// Execution position of a node.
    pub fn position(&self, scope: &str, device: DeviceIndex) -> Option<usize> {
        self.scopes
            .iter()
            .position(|scheduled| scheduled.scope.as_str() == scope && scheduled.device == device)
    }

    /// Dependency edges between nodes.
    pub fn dependencies(&self) -> &[ScheduledDependency] {
        &self.dependencies
    }

    /// Check for a direct edge from `before` to `after` on any device.
    pub fn has_dependency(&self, before: &str, after: &str) -> bool {
        self.dependencies
            .iter()
            .any(|edge| edge.before.0.as_str() == before && edge.after.0.as_str() == after)
    }

    /// All barriers in execution order.
    pub fn barriers(&self) -> impl Iterator<Item = &Barrier> {
        self.scopes.iter().flat_map(|scheduled| scheduled.barriers.iter())
    }

    /// Recorded command lists.
    pub fn command_lists(&self) -> &[CommandList] {
        &self.command_lists
    }

    /// Command lists of one node.
    pub fn scope_command_lists(&self, scope: &str, device: DeviceIndex) -> &[CommandList] {
        match self.scope(scope, device) {
            Some(scheduled) => &self.command_lists[scheduled.command_lists.clone()],
            None => &[],
        }
    }

    /// Per-queue submissions.
    pub fn submissions(&self) -> &[QueueSubmission] {
        &self.submissions
    }

    /// Semaphores linking queues and devices.
    pub fn semaphores(&self) -> &[Semaphore] {
        &self.semaphores
    }

    /// Transient heap statistics per device.
    pub fn heap_statistics(&self) -> &[TransientHeapStatistics] {
        &self.heap_statistics
    }

    /// Fence signalled when the frame has completed.
    pub fn fence(&self) -> &Fence {
        &self.fence
    }

    pub(crate) fn into_command_lists(self) -> Vec<CommandList> {
        self.command_lists
    }
}
