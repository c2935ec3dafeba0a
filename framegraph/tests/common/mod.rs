//! Common utilities for frame graph integration tests.
//!
//! [`TestScope`] is a declarative producer: tests describe what a scope
//! creates and uses, run a frame and inspect the [`FrameReport`].

#![allow(dead_code)]

use std::ops::Range;
use std::sync::Arc;

use scopegraph::{
    AttachmentDatabase, BufferBindFlags, BufferDescriptor, DeviceGroup, DeviceIndex, DeviceMask,
    Format, FrameGraphCompileContext, FrameGraphConfig, FrameGraphError, FrameGraphExecuteContext,
    FrameGraphInterface, FrameGraphSystem, FrameReport, HardwareQueueClass, HeapPlacement,
    ImageBindFlags, ImageDescriptor, Interval, LoadOp, QueryPool, QueryPoolAttachmentKind,
    ScopeAttachmentAccess, ScopeAttachmentDescriptor, ScopeAttachmentUsage, ScopeId,
    ScopeProducer,
};

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Descriptors
// ============================================================================

/// A sampled color target.
pub fn color_target(width: u32, height: u32) -> ImageDescriptor {
    ImageDescriptor::new_2d(
        ImageBindFlags::COLOR | ImageBindFlags::SHADER_READ | ImageBindFlags::COPY_READ,
        width,
        height,
        Format::Rgba8Unorm,
    )
}

/// A storage buffer usable for copies.
pub fn storage_buffer(size: u64) -> BufferDescriptor {
    BufferDescriptor::new(
        BufferBindFlags::SHADER_READ_WRITE
            | BufferBindFlags::COPY_READ
            | BufferBindFlags::COPY_WRITE,
        size,
    )
}

// ============================================================================
// Test Producer
// ============================================================================

/// How a [`TestScope`] uses an attachment.
#[derive(Debug, Clone, Copy)]
pub enum Use {
    Color(&'static str, LoadOp),
    Shader(&'static str, ScopeAttachmentAccess),
    Copy(&'static str, ScopeAttachmentAccess),
    Other(&'static str, ScopeAttachmentUsage, ScopeAttachmentAccess),
}

/// A scope producer configured declaratively.
///
/// Transients are created while preparing the first device of the mask,
/// so a multi-device scope registers each id once. Execute records one
/// draw per item of its submit range.
pub struct TestScope {
    id: ScopeId,
    mask: DeviceMask,
    images: Vec<(&'static str, ImageDescriptor)>,
    buffers: Vec<(&'static str, BufferDescriptor)>,
    uses: Vec<Use>,
    queries: Vec<(Arc<QueryPool>, Interval, QueryPoolAttachmentKind)>,
    after: Vec<&'static str>,
    before: Vec<&'static str>,
    queue: HardwareQueueClass,
    items: u32,
    /// Devices this scope was compiled for, in call order.
    pub compiled: Vec<DeviceIndex>,
    /// (device, submit range) of every execute call.
    pub executed: Vec<(DeviceIndex, Range<u32>)>,
    /// Declared attachments whose view could not be obtained at compile time.
    pub unresolved_views: usize,
}

impl TestScope {
    pub fn new(id: &str) -> Self {
        Self {
            id: ScopeId::from(id),
            mask: DeviceMask::single(0),
            images: Vec::new(),
            buffers: Vec::new(),
            uses: Vec::new(),
            queries: Vec::new(),
            after: Vec::new(),
            before: Vec::new(),
            queue: HardwareQueueClass::Graphics,
            items: 1,
            compiled: Vec::new(),
            executed: Vec::new(),
            unresolved_views: 0,
        }
    }

    pub fn on_devices(mut self, mask: DeviceMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn on_queue(mut self, queue: HardwareQueueClass) -> Self {
        self.queue = queue;
        self
    }

    pub fn items(mut self, items: u32) -> Self {
        self.items = items;
        self
    }

    pub fn create_image(mut self, id: &'static str, descriptor: ImageDescriptor) -> Self {
        self.images.push((id, descriptor));
        self
    }

    pub fn create_buffer(mut self, id: &'static str, descriptor: BufferDescriptor) -> Self {
        self.buffers.push((id, descriptor));
        self
    }

    pub fn uses(mut self, usage: Use) -> Self {
        self.uses.push(usage);
        self
    }

    pub fn query(
        mut self,
        pool: &Arc<QueryPool>,
        interval: Interval,
        kind: QueryPoolAttachmentKind,
    ) -> Self {
        self.queries.push((Arc::clone(pool), interval, kind));
        self
    }

    pub fn after(mut self, scope: &'static str) -> Self {
        self.after.push(scope);
        self
    }

    pub fn before(mut self, scope: &'static str) -> Self {
        self.before.push(scope);
        self
    }

    fn declared_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.uses.iter().map(|usage| match *usage {
            Use::Color(id, _) | Use::Shader(id, _) | Use::Copy(id, _) | Use::Other(id, _, _) => id,
        })
    }
}

impl ScopeProducer for TestScope {
    fn scope_id(&self) -> &ScopeId {
        &self.id
    }

    fn device_mask(&self) -> DeviceMask {
        self.mask
    }

    fn prepare(&mut self, frame_graph: &mut FrameGraphInterface<'_>) {
        if Some(frame_graph.device_index()) == self.mask.first() {
            for (id, descriptor) in &self.images {
                let _ = frame_graph
                    .attachment_database()
                    .create_transient_image(*id, descriptor.clone());
            }
            for (id, descriptor) in &self.buffers {
                let _ = frame_graph
                    .attachment_database()
                    .create_transient_buffer(*id, descriptor.clone());
            }
        }

        for usage in &self.uses {
            match *usage {
                Use::Color(id, load_op) => frame_graph
                    .use_color_attachment(ScopeAttachmentDescriptor::new(id).with_load_op(load_op)),
                Use::Shader(id, access) => frame_graph.use_shader_attachment(id, access),
                Use::Copy(id, access) => frame_graph.use_copy_attachment(id, access),
                Use::Other(id, usage, access) => frame_graph.use_attachment(id, usage, access),
            }
        }
        for (pool, interval, kind) in &self.queries {
            frame_graph.use_query_pool(pool, *interval, *kind, ScopeAttachmentAccess::Write);
        }
        for scope in &self.after {
            frame_graph.execute_after(*scope);
        }
        for scope in &self.before {
            frame_graph.execute_before(*scope);
        }
        frame_graph.set_hardware_queue_class(self.queue);
        frame_graph.set_estimated_item_count(self.items);
    }

    fn compile(&mut self, context: &FrameGraphCompileContext<'_>) {
        self.compiled.push(context.device_index());
        let unresolved = self
            .declared_ids()
            .filter(|id| context.image_view(id).is_err() && context.buffer_view(id).is_err())
            .count();
        self.unresolved_views += unresolved;
    }

    fn execute(&mut self, context: &mut FrameGraphExecuteContext<'_>) {
        let range = context.submit_range();
        for _ in range.clone() {
            context.command_list().draw(3, 1);
        }
        self.executed.push((context.device_index(), range));
    }
}

// ============================================================================
// Frame Helpers
// ============================================================================

/// A system over `device_count` devices.
pub fn system(device_count: u32, config: FrameGraphConfig) -> FrameGraphSystem {
    init_logging();
    let group = DeviceGroup::new(device_count).expect("valid device count");
    FrameGraphSystem::new(group, config)
}

/// Run one frame with the given scopes in import order.
pub fn run_frame(
    system: &mut FrameGraphSystem,
    scopes: &mut [TestScope],
) -> Result<FrameReport, FrameGraphError> {
    run_frame_with(system, scopes, |_| {})
}

/// Run one frame, letting the host register attachments first.
pub fn run_frame_with(
    system: &mut FrameGraphSystem,
    scopes: &mut [TestScope],
    host: impl FnOnce(&mut AttachmentDatabase),
) -> Result<FrameReport, FrameGraphError> {
    let mut builder = system.begin_frame();
    host(builder.attachment_database());
    for scope in scopes.iter_mut() {
        builder.import_scope_producer(scope);
    }
    system.end_frame(builder)
}

/// Execution order and transient placements of a frame, without the
/// per-frame resource ids.
pub fn schedule_fingerprint(
    report: &FrameReport,
) -> Vec<(String, DeviceIndex, Vec<(String, Option<HeapPlacement>)>)> {
    report
        .scopes()
        .iter()
        .map(|scheduled| {
            let attachments = scheduled
                .attachments
                .iter()
                .map(|attachment| (attachment.attachment.to_string(), attachment.placement))
                .collect();
            (scheduled.scope.to_string(), scheduled.device, attachments)
        })
        .collect()
}
