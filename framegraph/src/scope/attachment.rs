//! Scope attachment declarations.
//!
//! A scope attachment ties a scope to an attachment with an access mode, a
//! usage and load/store actions. The usage and access together decide the
//! [`ResourceState`] the scope expects, which drives barrier insertion.

use std::sync::Arc;

use crate::attachment::{AttachmentId, AttachmentKind};
use crate::resources::QueryPool;
use crate::types::{BufferBindFlags, ClearValue, ImageBindFlags, Interval, ResourceState};

/// How a scope accesses an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeAttachmentAccess {
    /// Read only.
    Read,
    /// Write only.
    Write,
    /// Read and write.
    ReadWrite,
}

impl ScopeAttachmentAccess {
    /// Check if this access mode reads.
    pub fn reads(&self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    /// Check if this access mode writes.
    pub fn writes(&self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// What the scope uses the attachment for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeAttachmentUsage {
    /// Color render target.
    Color,
    /// Depth-stencil target.
    DepthStencil,
    /// Shader resource (sampled, storage, or structured buffer).
    Shader,
    /// Subpass input read inside the render pass.
    SubpassInput,
    /// Copy source or destination.
    Copy,
    /// Predication buffer.
    Predication,
    /// Multisample resolve destination.
    Resolve,
    /// Indirect argument buffer.
    Indirect,
}

impl ScopeAttachmentUsage {
    /// Check if the usage is valid for an attachment kind.
    pub fn supports(&self, kind: AttachmentKind) -> bool {
        match self {
            Self::Color | Self::DepthStencil | Self::SubpassInput | Self::Resolve => {
                kind == AttachmentKind::Image
            }
            Self::Predication | Self::Indirect => kind == AttachmentKind::Buffer,
            Self::Shader | Self::Copy => true,
        }
    }
}

/// Operation performed on an attachment when a scope begins.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LoadOp {
    /// Clear the attachment with a value.
    Clear(ClearValue),
    /// Keep the existing contents.
    #[default]
    Load,
    /// Existing contents may be discarded.
    DontCare,
}

impl LoadOp {
    /// Clear with a color value.
    pub fn clear_color(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::Clear(ClearValue::color(r, g, b, a))
    }

    /// Clear with a depth value.
    pub fn clear_depth(depth: f32) -> Self {
        Self::Clear(ClearValue::depth(depth))
    }
}

/// Operation performed on an attachment when a scope ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoreOp {
    /// Keep the contents for later scopes.
    #[default]
    Store,
    /// Contents may be discarded.
    DontCare,
}

/// Describes which attachment a scope uses and how it is loaded and stored.
///
/// ```
/// use scopegraph::{LoadOp, ScopeAttachmentDescriptor};
///
/// let desc = ScopeAttachmentDescriptor::new("gbuffer_albedo")
///     .with_load_op(LoadOp::clear_color(0.0, 0.0, 0.0, 1.0));
/// assert_eq!(desc.attachment.as_str(), "gbuffer_albedo");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeAttachmentDescriptor {
    /// Attachment to use.
    pub attachment: AttachmentId,
    /// Load action.
    pub load_op: LoadOp,
    /// Store action.
    pub store_op: StoreOp,
}

impl ScopeAttachmentDescriptor {
    /// Use an attachment with `Load` / `Store`.
    pub fn new(attachment: impl Into<AttachmentId>) -> Self {
        Self {
            attachment: attachment.into(),
            load_op: LoadOp::Load,
            store_op: StoreOp::Store,
        }
    }

    /// Set the load action.
    pub fn with_load_op(mut self, load_op: LoadOp) -> Self {
        self.load_op = load_op;
        self
    }

    /// Set the store action.
    pub fn with_store_op(mut self, store_op: StoreOp) -> Self {
        self.store_op = store_op;
        self
    }
}

impl From<&str> for ScopeAttachmentDescriptor {
    fn from(attachment: &str) -> Self {
        Self::new(attachment)
    }
}

impl From<AttachmentId> for ScopeAttachmentDescriptor {
    fn from(attachment: AttachmentId) -> Self {
        Self::new(attachment)
    }
}

impl From<&AttachmentId> for ScopeAttachmentDescriptor {
    fn from(attachment: &AttachmentId) -> Self {
        Self::new(attachment.clone())
    }
}

/// One attachment declared by a scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeAttachment {
    attachment: AttachmentId,
    usage: ScopeAttachmentUsage,
    access: ScopeAttachmentAccess,
    load_op: LoadOp,
    store_op: StoreOp,
}

impl ScopeAttachment {
    pub(crate) fn new(
        descriptor: ScopeAttachmentDescriptor,
        usage: ScopeAttachmentUsage,
        access: ScopeAttachmentAccess,
    ) -> Self {
        Self {
            attachment: descriptor.attachment,
            usage,
            access,
            load_op: descriptor.load_op,
            store_op: descriptor.store_op,
        }
    }

    /// Attachment id.
    pub fn attachment(&self) -> &AttachmentId {
        &self.attachment
    }

    /// Usage.
    pub fn usage(&self) -> ScopeAttachmentUsage {
        self.usage
    }

    /// Access mode.
    pub fn access(&self) -> ScopeAttachmentAccess {
        self.access
    }

    /// Load action.
    pub fn load_op(&self) -> LoadOp {
        self.load_op
    }

    /// Store action.
    pub fn store_op(&self) -> StoreOp {
        self.store_op
    }

    /// State the resource must be in while the scope runs.
    pub fn expected_state(&self) -> ResourceState {
        let writes = self.access.writes();
        match self.usage {
            ScopeAttachmentUsage::Color => ResourceState::ColorAttachment,
            ScopeAttachmentUsage::DepthStencil if writes => ResourceState::DepthStencilWrite,
            ScopeAttachmentUsage::DepthStencil => ResourceState::DepthStencilRead,
            ScopeAttachmentUsage::Shader if writes => ResourceState::ShaderReadWrite,
            ScopeAttachmentUsage::Shader => ResourceState::ShaderRead,
            ScopeAttachmentUsage::SubpassInput => ResourceState::SubpassInput,
            ScopeAttachmentUsage::Copy if writes => ResourceState::CopyDestination,
            ScopeAttachmentUsage::Copy => ResourceState::CopySource,
            ScopeAttachmentUsage::Resolve => ResourceState::ResolveDestination,
            ScopeAttachmentUsage::Predication => ResourceState::Predication,
            ScopeAttachmentUsage::Indirect => ResourceState::IndirectArgument,
        }
    }

    /// Image bind flags an imported image needs for this usage.
    pub fn required_image_flags(&self) -> ImageBindFlags {
        match self.usage {
            ScopeAttachmentUsage::Color | ScopeAttachmentUsage::Resolve => ImageBindFlags::COLOR,
            ScopeAttachmentUsage::DepthStencil => ImageBindFlags::DEPTH_STENCIL,
            ScopeAttachmentUsage::SubpassInput => ImageBindFlags::SUBPASS_INPUT,
            ScopeAttachmentUsage::Shader => access_flags(
                self.access,
                ImageBindFlags::SHADER_READ,
                ImageBindFlags::SHADER_WRITE,
            ),
            ScopeAttachmentUsage::Copy => access_flags(
                self.access,
                ImageBindFlags::COPY_READ,
                ImageBindFlags::COPY_WRITE,
            ),
            ScopeAttachmentUsage::Predication | ScopeAttachmentUsage::Indirect => {
                ImageBindFlags::empty()
            }
        }
    }

    /// Buffer bind flags an imported buffer needs for this usage.
    pub fn required_buffer_flags(&self) -> BufferBindFlags {
        match self.usage {
            ScopeAttachmentUsage::Shader => access_flags(
                self.access,
                BufferBindFlags::SHADER_READ,
                BufferBindFlags::SHADER_WRITE,
            ),
            ScopeAttachmentUsage::Copy => access_flags(
                self.access,
                BufferBindFlags::COPY_READ,
                BufferBindFlags::COPY_WRITE,
            ),
            ScopeAttachmentUsage::Predication => BufferBindFlags::PREDICATION,
            ScopeAttachmentUsage::Indirect => BufferBindFlags::INDIRECT,
            _ => BufferBindFlags::empty(),
        }
    }
}

fn access_flags<F: bitflags::Flags + Copy>(access: ScopeAttachmentAccess, read: F, write: F) -> F {
    match access {
        ScopeAttachmentAccess::Read => read,
        ScopeAttachmentAccess::Write => write,
        ScopeAttachmentAccess::ReadWrite => read.union(write),
    }
}

/// Whether query results stay inside the frame graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryPoolAttachmentKind {
    /// Results are consumed by later scopes of the same frame (e.g. predication).
    /// Scopes sharing local queries are ordered like attachment users.
    Local,
    /// Results are read back by the host; no ordering between scopes.
    Global,
}

/// A query slot range declared by a scope.
#[derive(Debug, Clone)]
pub struct QueryPoolAttachment {
    pub(crate) pool: Arc<QueryPool>,
    pub(crate) interval: Interval,
    pub(crate) kind: QueryPoolAttachmentKind,
    pub(crate) access: ScopeAttachmentAccess,
}

impl QueryPoolAttachment {
    /// The query pool.
    pub fn pool(&self) -> &Arc<QueryPool> {
        &self.pool
    }

    /// Inclusive slot range.
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Local or global.
    pub fn kind(&self) -> QueryPoolAttachmentKind {
        self.kind
    }

    /// Access mode.
    pub fn access(&self) -> ScopeAttachmentAccess {
        self.access
    }

    /// Check if both declarations target the same pool slots.
    pub(crate) fn overlaps(&self, other: &QueryPoolAttachment) -> bool {
        Arc::ptr_eq(&self.pool, &other.pool) && self.interval.overlaps(&other.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared(usage: ScopeAttachmentUsage, access: ScopeAttachmentAccess) -> ScopeAttachment {
        ScopeAttachment::new(ScopeAttachmentDescriptor::new("x"), usage, access)
    }

    #[test]
    fn test_access_modes() {
        assert!(ScopeAttachmentAccess::Read.reads());
        assert!(!ScopeAttachmentAccess::Read.writes());
        assert!(ScopeAttachmentAccess::ReadWrite.reads());
        assert!(ScopeAttachmentAccess::ReadWrite.writes());
    }

    #[test]
    fn test_expected_states() {
        use ScopeAttachmentAccess::*;
        use ScopeAttachmentUsage::*;

        assert_eq!(
            declared(Color, Write).expected_state(),
            ResourceState::ColorAttachment
        );
        assert_eq!(
            declared(Shader, Read).expected_state(),
            ResourceState::ShaderRead
        );
        assert_eq!(
            declared(Shader, ReadWrite).expected_state(),
            ResourceState::ShaderReadWrite
        );
        assert_eq!(
            declared(Copy, Read).expected_state(),
            ResourceState::CopySource
        );
        assert_eq!(
            declared(DepthStencil, Read).expected_state(),
            ResourceState::DepthStencilRead
        );
    }

    #[test]
    fn test_usage_kind_support() {
        assert!(ScopeAttachmentUsage::Color.supports(AttachmentKind::Image));
        assert!(!ScopeAttachmentUsage::Color.supports(AttachmentKind::Buffer));
        assert!(ScopeAttachmentUsage::Predication.supports(AttachmentKind::Buffer));
        assert!(ScopeAttachmentUsage::Copy.supports(AttachmentKind::Buffer));
    }

    #[test]
    fn test_required_flags() {
        let copy = declared(ScopeAttachmentUsage::Copy, ScopeAttachmentAccess::ReadWrite);
        assert_eq!(
            copy.required_buffer_flags(),
            BufferBindFlags::COPY_READ | BufferBindFlags::COPY_WRITE
        );
        let shader = declared(ScopeAttachmentUsage::Shader, ScopeAttachmentAccess::Read);
        assert_eq!(shader.required_image_flags(), ImageBindFlags::SHADER_READ);
    }
}
