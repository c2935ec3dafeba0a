//! Recorded command lists.
//!
//! There is no GPU behind the executor: commands are recorded as plain
//! values so submission order, barriers and semaphores can be inspected
//! after the frame. Each command is also traced through `log` when
//! recorded.

use std::ops::Range;

use scopegraph_core::pool::Poolable;

use super::sync::{QueueId, Semaphore};
use crate::attachment::{AttachmentId, BufferView, ImageView};
use crate::compiler::Barrier;
use crate::device::DeviceIndex;
use crate::resources::{PhysicalResourceId, QueryPool};
use crate::scope::{HardwareQueueClass, ScopeId};
use crate::types::{ClearValue, Interval};

/// Condition under which predicated work is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicationOp {
    /// Skip when the predicate value is zero.
    EqualZero,
    /// Skip when the predicate value is not zero.
    NotEqualZero,
}

/// One recorded command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Start of a scope's work in this list.
    BeginScope { scope: ScopeId },
    /// End of a scope's work in this list.
    EndScope { scope: ScopeId },
    /// Resource state transition.
    Barrier(Barrier),
    /// Clear issued for a `Clear` load action.
    Clear {
        attachment: AttachmentId,
        resource: PhysicalResourceId,
        value: ClearValue,
    },
    /// Non-indexed draw.
    Draw { vertex_count: u32, instance_count: u32 },
    /// Draw with arguments read from a buffer.
    DrawIndirect {
        buffer: PhysicalResourceId,
        offset: u64,
    },
    /// Compute dispatch.
    Dispatch { x: u32, y: u32, z: u32 },
    /// Buffer to buffer copy.
    CopyBuffer {
        source: PhysicalResourceId,
        destination: PhysicalResourceId,
        size: u64,
    },
    /// Image to image copy.
    CopyImage {
        source: PhysicalResourceId,
        destination: PhysicalResourceId,
    },
    /// Buffer to image copy.
    CopyBufferToImage {
        source: PhysicalResourceId,
        destination: PhysicalResourceId,
    },
    /// Image to buffer copy.
    CopyImageToBuffer {
        source: PhysicalResourceId,
        destination: PhysicalResourceId,
    },
    /// Ray tracing acceleration structure build.
    BuildAccelerationStructure { label: String },
    /// Start predicated rendering.
    BeginPredication {
        buffer: PhysicalResourceId,
        offset: u64,
        op: PredicationOp,
    },
    /// End predicated rendering.
    EndPredication,
    /// Start a query.
    BeginQuery {
        pool: PhysicalResourceId,
        index: u32,
    },
    /// End a query.
    EndQuery {
        pool: PhysicalResourceId,
        index: u32,
    },
    /// Write a timestamp query.
    WriteTimestamp {
        pool: PhysicalResourceId,
        index: u32,
    },
    /// Copy query results into a buffer.
    ResolveQueries {
        pool: PhysicalResourceId,
        interval: Interval,
        destination: PhysicalResourceId,
        offset: u64,
    },
}

impl Command {
    /// Check if the command is a work item counted against the estimate.
    pub fn is_item(&self) -> bool {
        matches!(
            self,
            Self::Draw { .. }
                | Self::DrawIndirect { .. }
                | Self::Dispatch { .. }
                | Self::CopyBuffer { .. }
                | Self::CopyImage { .. }
                | Self::CopyBufferToImage { .. }
                | Self::CopyImageToBuffer { .. }
                | Self::BuildAccelerationStructure { .. }
        )
    }
}

/// Commands recorded for one scope on one queue.
///
/// A scope with many items may be split across several lists; each list
/// covers its [`submit_range`](Self::submit_range) of the scope's items.
#[derive(Debug)]
pub struct CommandList {
    queue: QueueId,
    scope: ScopeId,
    submit_range: Range<u32>,
    commands: Vec<Command>,
    item_count: u32,
    wait_semaphores: Vec<Semaphore>,
    signal_semaphores: Vec<Semaphore>,
}

impl CommandList {
    pub(crate) fn begin(&mut self, queue: QueueId, scope: &ScopeId, submit_range: Range<u32>) {
        self.queue = queue;
        self.scope = scope.clone();
        self.commands.reserve(submit_range.len() + 2);
        self.submit_range = submit_range;
    }

    /// Queue the list is submitted to.
    pub fn queue(&self) -> QueueId {
        self.queue
    }

    /// Device the list is submitted to.
    pub fn device(&self) -> DeviceIndex {
        self.queue.device
    }

    /// Queue class the list is submitted to.
    pub fn queue_class(&self) -> HardwareQueueClass {
        self.queue.class
    }

    /// Scope that recorded the list.
    pub fn scope(&self) -> &ScopeId {
        &self.scope
    }

    /// Range of the scope's items this list covers.
    pub fn submit_range(&self) -> Range<u32> {
        self.submit_range.clone()
    }

    /// Recorded commands.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of work items recorded.
    pub fn item_count(&self) -> u32 {
        self.item_count
    }

    /// Semaphores waited on before the list runs.
    pub fn wait_semaphores(&self) -> &[Semaphore] {
        &self.wait_semaphores
    }

    /// Semaphores signalled after the list completes.
    pub fn signal_semaphores(&self) -> &[Semaphore] {
        &self.signal_semaphores
    }

    /// Barriers recorded in the list.
    pub fn barriers(&self) -> impl Iterator<Item = &Barrier> {
        self.commands.iter().filter_map(|command| match command {
            Command::Barrier(barrier) => Some(barrier),
            _ => None,
        })
    }

    /// Record a draw.
    pub fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        self.record(Command::Draw {
            vertex_count,
            instance_count,
        });
    }

    /// Record an indirect draw.
    pub fn draw_indirect(&mut self, arguments: &BufferView, offset: u64) {
        self.record(Command::DrawIndirect {
            buffer: arguments.resource(),
            offset,
        });
    }

    /// Record a compute dispatch.
    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.record(Command::Dispatch { x, y, z });
    }

    /// Record a buffer copy.
    pub fn copy_buffer(&mut self, source: &BufferView, destination: &BufferView, size: u64) {
        self.record(Command::CopyBuffer {
            source: source.resource(),
            destination: destination.resource(),
            size,
        });
    }

    /// Record an image copy.
    pub fn copy_image(&mut self, source: &ImageView, destination: &ImageView) {
        self.record(Command::CopyImage {
            source: source.resource(),
            destination: destination.resource(),
        });
    }

    /// Record a buffer to image copy.
    pub fn copy_buffer_to_image(&mut self, source: &BufferView, destination: &ImageView) {
        self.record(Command::CopyBufferToImage {
            source: source.resource(),
            destination: destination.resource(),
        });
    }

    /// Record an image to buffer copy.
    pub fn copy_image_to_buffer(&mut self, source: &ImageView, destination: &BufferView) {
        self.record(Command::CopyImageToBuffer {
            source: source.resource(),
            destination: destination.resource(),
        });
    }

    /// Record an acceleration structure build.
    pub fn build_acceleration_structure(&mut self, label: impl Into<String>) {
        self.record(Command::BuildAccelerationStructure {
            label: label.into(),
        });
    }

    /// Start predicated rendering driven by a buffer value.
    pub fn begin_predication(&mut self, predicate: &BufferView, offset: u64, op: PredicationOp) {
        self.record(Command::BeginPredication {
            buffer: predicate.resource(),
            offset,
            op,
        });
    }

    /// End predicated rendering.
    pub fn end_predication(&mut self) {
        self.record(Command::EndPredication);
    }

    /// Start query `index` of a pool.
    pub fn begin_query(&mut self, pool: &QueryPool, index: u32) {
        if let Some(pool) = self.pool_resource(pool) {
            self.record(Command::BeginQuery { pool, index });
        }
    }

    /// End query `index` of a pool.
    pub fn end_query(&mut self, pool: &QueryPool, index: u32) {
        if let Some(pool) = self.pool_resource(pool) {
            self.record(Command::EndQuery { pool, index });
        }
    }

    /// Write a timestamp into query `index` of a pool.
    pub fn write_timestamp(&mut self, pool: &QueryPool, index: u32) {
        if let Some(pool) = self.pool_resource(pool) {
            self.record(Command::WriteTimestamp { pool, index });
        }
    }

    /// Copy query results into a buffer.
    pub fn resolve_queries(
        &mut self,
        pool: &QueryPool,
        interval: Interval,
        destination: &BufferView,
        offset: u64,
    ) {
        if let Some(pool) = self.pool_resource(pool) {
            self.record(Command::ResolveQueries {
                pool,
                interval,
                destination: destination.resource(),
                offset,
            });
        }
    }

    /// Record a command.
    pub(crate) fn record(&mut self, command: Command) {
        log::trace!("CommandList [{} '{}']: {:?}", self.queue, self.scope, command);
        if command.is_item() {
            self.item_count += 1;
        }
        self.commands.push(command);
    }

    pub(crate) fn push_wait(&mut self, semaphore: Semaphore) {
        self.wait_semaphores.push(semaphore);
    }

    pub(crate) fn push_signal(&mut self, semaphore: Semaphore) {
        self.signal_semaphores.push(semaphore);
    }

    fn pool_resource(&self, pool: &QueryPool) -> Option<PhysicalResourceId> {
        let resource = pool.device_resource(self.queue.device);
        if resource.is_none() {
            log::error!(
                "Scope '{}': query pool '{}' does not exist on device {}, skipping query",
                self.scope,
                pool.label(),
                self.queue.device
            );
        }
        resource
    }
}

impl Poolable for CommandList {
    fn new_empty() -> Self {
        Self {
            queue: QueueId::new(0, HardwareQueueClass::Graphics),
            scope: ScopeId::from(""),
            submit_range: 0..0,
            commands: Vec::new(),
            item_count: 0,
            wait_semaphores: Vec::new(),
            signal_semaphores: Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.submit_range = 0..0;
        self.commands.clear();
        self.item_count = 0;
        self.wait_semaphores.clear();
        self.signal_semaphores.clear();
    }
}
