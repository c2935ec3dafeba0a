//! The scope producer trait and its closure-based implementation.

use super::{FrameGraphCompileContext, FrameGraphExecuteContext, FrameGraphInterface, ScopeId};
use crate::device::{DeviceIndex, DeviceMask};

/// User code that declares and records one scope per frame.
///
/// Producers are imported into the frame with
/// [`FrameGraphBuilder::import_scope_producer`](crate::FrameGraphBuilder::import_scope_producer).
/// A producer whose [`device_mask`](Self::device_mask) selects several
/// devices is prepared, compiled and executed once per device; the context
/// reports which one.
pub trait ScopeProducer {
    /// Scope id, unique per device per frame.
    fn scope_id(&self) -> &ScopeId;

    /// Devices the scope runs on. Defaults to device 0.
    fn device_mask(&self) -> DeviceMask {
        DeviceMask::default()
    }

    /// Declare attachments, queries and ordering for the scope.
    fn prepare(&mut self, frame_graph: &mut FrameGraphInterface<'_>);

    /// Bind resolved resources. Called before any scope executes.
    fn compile(&mut self, _context: &FrameGraphCompileContext<'_>) {}

    /// Record commands.
    fn execute(&mut self, context: &mut FrameGraphExecuteContext<'_>);
}

/// A [`ScopeProducer`] built from three closures sharing a piece of user data.
///
/// # Example
///
/// ```
/// use scopegraph::{
///     FrameGraphInterface, ScopeAttachmentAccess, ScopeProducerFunction, empty_compile,
/// };
///
/// struct Dispatch {
///     groups: u32,
/// }
///
/// let producer = ScopeProducerFunction::new(
///     "cull",
///     Dispatch { groups: 64 },
///     |frame_graph: &mut FrameGraphInterface<'_>, _data: &mut Dispatch| {
///         frame_graph.use_shader_attachment("visibility", ScopeAttachmentAccess::Write);
///         frame_graph.set_estimated_item_count(1);
///     },
///     empty_compile,
///     |context, data| context.command_list().dispatch(data.groups, 1, 1),
/// );
/// assert_eq!(producer.data().groups, 64);
/// ```
pub struct ScopeProducerFunction<D, P, C, E> {
    scope_id: ScopeId,
    device_mask: DeviceMask,
    data: D,
    prepare: P,
    compile: C,
    execute: E,
}

impl<D, P, C, E> ScopeProducerFunction<D, P, C, E>
where
    P: FnMut(&mut FrameGraphInterface<'_>, &mut D),
    C: FnMut(&FrameGraphCompileContext<'_>, &mut D),
    E: FnMut(&mut FrameGraphExecuteContext<'_>, &D),
{
    /// Create a producer running on device 0.
    pub fn new(scope_id: impl Into<ScopeId>, data: D, prepare: P, compile: C, execute: E) -> Self {
        Self {
            scope_id: scope_id.into(),
            device_mask: DeviceMask::default(),
            data,
            prepare,
            compile,
            execute,
        }
    }
}

impl<D, P, C, E> ScopeProducerFunction<D, P, C, E> {
    /// Run on a single device.
    pub fn with_device_index(mut self, device: DeviceIndex) -> Self {
        self.device_mask = DeviceMask::single(device);
        self
    }

    /// Run on every device in `mask`.
    pub fn with_device_mask(mut self, mask: DeviceMask) -> Self {
        self.device_mask = mask;
        self
    }

    /// Shared user data.
    pub fn data(&self) -> &D {
        &self.data
    }

    /// Shared user data, mutably.
    pub fn data_mut(&mut self) -> &mut D {
        &mut self.data
    }
}

impl<D, P, C, E> ScopeProducer for ScopeProducerFunction<D, P, C, E>
where
    P: FnMut(&mut FrameGraphInterface<'_>, &mut D),
    C: FnMut(&FrameGraphCompileContext<'_>, &mut D),
    E: FnMut(&mut FrameGraphExecuteContext<'_>, &D),
{
    fn scope_id(&self) -> &ScopeId {
        &self.scope_id
    }

    fn device_mask(&self) -> DeviceMask {
        self.device_mask
    }

    fn prepare(&mut self, frame_graph: &mut FrameGraphInterface<'_>) {
        (self.prepare)(frame_graph, &mut self.data);
    }

    fn compile(&mut self, context: &FrameGraphCompileContext<'_>) {
        (self.compile)(context, &mut self.data);
    }

    fn execute(&mut self, context: &mut FrameGraphExecuteContext<'_>) {
        (self.execute)(context, &self.data);
    }
}

/// Compile callback for producers with nothing to bind.
pub fn empty_compile<D>(_context: &FrameGraphCompileContext<'_>, _data: &mut D) {}
