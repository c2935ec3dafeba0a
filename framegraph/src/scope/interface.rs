//! Prepare-phase interface handed to scope producers.

use std::sync::Arc;

use super::{
    HardwareQueueClass, QueryPoolAttachment, QueryPoolAttachmentKind, Scope, ScopeAttachment,
    ScopeAttachmentAccess, ScopeAttachmentDescriptor, ScopeAttachmentUsage, ScopeId,
};
use crate::attachment::AttachmentDatabase;
use crate::device::DeviceIndex;
use crate::resources::QueryPool;
use crate::scope::LoadOp;
use crate::types::Interval;

/// Interface a producer uses during Prepare to declare what its scope needs.
///
/// Declarations are recorded as-is and validated when the frame is built,
/// so a bad declaration surfaces as a [`FrameGraphError`](crate::FrameGraphError)
/// from [`FrameGraphSystem::end_frame`](crate::FrameGraphSystem::end_frame).
///
/// # Example
///
/// ```ignore
/// fn prepare(&mut self, frame_graph: &mut FrameGraphInterface<'_>) {
///     frame_graph
///         .attachment_database()
///         .create_transient_image("hdr", hdr_desc)?;
///     frame_graph.use_color_attachment(
///         ScopeAttachmentDescriptor::new("hdr")
///             .with_load_op(LoadOp::clear_color(0.0, 0.0, 0.0, 1.0)),
///     );
///     frame_graph.set_estimated_item_count(1);
/// }
/// ```
pub struct FrameGraphInterface<'a> {
    scope: &'a mut Scope,
    database: &'a mut AttachmentDatabase,
}

impl<'a> FrameGraphInterface<'a> {
    pub(crate) fn new(scope: &'a mut Scope, database: &'a mut AttachmentDatabase) -> Self {
        Self { scope, database }
    }

    /// Id of the scope being prepared.
    pub fn scope_id(&self) -> &ScopeId {
        &self.scope.id
    }

    /// Device the scope is being prepared for.
    pub fn device_index(&self) -> DeviceIndex {
        self.scope.device
    }

    /// The frame's attachment database, for creating transients and importing resources.
    pub fn attachment_database(&mut self) -> &mut AttachmentDatabase {
        self.database
    }

    /// Use an image as a color target.
    ///
    /// With [`LoadOp::Load`] the previous contents are read, so the access is
    /// read-write; any other load action only writes.
    pub fn use_color_attachment(&mut self, descriptor: impl Into<ScopeAttachmentDescriptor>) {
        let descriptor = descriptor.into();
        let access = match descriptor.load_op {
            LoadOp::Load => ScopeAttachmentAccess::ReadWrite,
            LoadOp::Clear(_) | LoadOp::DontCare => ScopeAttachmentAccess::Write,
        };
        self.use_attachment(descriptor, ScopeAttachmentUsage::Color, access);
    }

    /// Use an image as the depth-stencil target.
    pub fn use_depth_stencil_attachment(
        &mut self,
        descriptor: impl Into<ScopeAttachmentDescriptor>,
        access: ScopeAttachmentAccess,
    ) {
        self.use_attachment(descriptor, ScopeAttachmentUsage::DepthStencil, access);
    }

    /// Use an image or buffer as a shader resource.
    pub fn use_shader_attachment(
        &mut self,
        descriptor: impl Into<ScopeAttachmentDescriptor>,
        access: ScopeAttachmentAccess,
    ) {
        self.use_attachment(descriptor, ScopeAttachmentUsage::Shader, access);
    }

    /// Read an image written earlier in the same render pass.
    pub fn use_subpass_input_attachment(
        &mut self,
        descriptor: impl Into<ScopeAttachmentDescriptor>,
    ) {
        self.use_attachment(
            descriptor,
            ScopeAttachmentUsage::SubpassInput,
            ScopeAttachmentAccess::Read,
        );
    }

    /// Use an image or buffer as a copy source (`Read`) or destination (`Write`).
    pub fn use_copy_attachment(
        &mut self,
        descriptor: impl Into<ScopeAttachmentDescriptor>,
        access: ScopeAttachmentAccess,
    ) {
        self.use_attachment(descriptor, ScopeAttachmentUsage::Copy, access);
    }

    /// Use an image as a multisample resolve destination.
    pub fn use_resolve_attachment(&mut self, descriptor: impl Into<ScopeAttachmentDescriptor>) {
        self.use_attachment(
            descriptor,
            ScopeAttachmentUsage::Resolve,
            ScopeAttachmentAccess::Write,
        );
    }

    /// Use a buffer as a predication source.
    pub fn use_predication_attachment(&mut self, descriptor: impl Into<ScopeAttachmentDescriptor>) {
        self.use_attachment(
            descriptor,
            ScopeAttachmentUsage::Predication,
            ScopeAttachmentAccess::Read,
        );
    }

    /// Use a buffer as indirect draw or dispatch arguments.
    pub fn use_indirect_attachment(&mut self, descriptor: impl Into<ScopeAttachmentDescriptor>) {
        self.use_attachment(
            descriptor,
            ScopeAttachmentUsage::Indirect,
            ScopeAttachmentAccess::Read,
        );
    }

    /// Declare an attachment with an explicit usage and access.
    pub fn use_attachment(
        &mut self,
        descriptor: impl Into<ScopeAttachmentDescriptor>,
        usage: ScopeAttachmentUsage,
        access: ScopeAttachmentAccess,
    ) {
        let declared = ScopeAttachment::new(descriptor.into(), usage, access);
        log::trace!(
            "Scope '{}' (device {}): uses '{}' as {:?} {:?}",
            self.scope.id,
            self.scope.device,
            declared.attachment(),
            usage,
            access
        );
        self.scope.attachments.push(declared);
    }

    /// Reserve query slots of a pool.
    ///
    /// [`QueryPoolAttachmentKind::Local`] results are consumed within the
    /// frame, so scopes sharing overlapping local slots are ordered like
    /// attachment users.
    pub fn use_query_pool(
        &mut self,
        pool: &Arc<QueryPool>,
        interval: Interval,
        kind: QueryPoolAttachmentKind,
        access: ScopeAttachmentAccess,
    ) {
        self.scope.query_pools.push(QueryPoolAttachment {
            pool: Arc::clone(pool),
            interval,
            kind,
            access,
        });
    }

    /// Number of draw or dispatch items the scope expects to record.
    ///
    /// Used to size and split command lists. Recording more only costs a
    /// reallocation.
    pub fn set_estimated_item_count(&mut self, count: u32) {
        self.scope.estimated_item_count = count;
    }

    /// Queue the scope is submitted to. Defaults to graphics.
    pub fn set_hardware_queue_class(&mut self, queue: HardwareQueueClass) {
        self.scope.queue = queue;
    }

    /// Run this scope after another scope.
    ///
    /// Matches the scope on the same device; if it does not run on this
    /// device, every device running it is matched.
    pub fn execute_after(&mut self, scope: impl Into<ScopeId>) {
        self.scope.execute_after.push(scope.into());
    }

    /// Run this scope before another scope. Matched like [`execute_after`](Self::execute_after).
    pub fn execute_before(&mut self, scope: impl Into<ScopeId>) {
        self.scope.execute_before.push(scope.into());
    }
}
