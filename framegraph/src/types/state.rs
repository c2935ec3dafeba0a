//! Resource states tracked across scope boundaries.

/// The state a scope expects a resource to be in while it runs.
///
/// For images this doubles as the layout; buffers only use the access
/// states (shader, copy, predication, indirect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceState {
    /// Contents undefined (freshly allocated or discarded).
    #[default]
    Undefined,
    /// Bound as a color render target.
    ColorAttachment,
    /// Bound as a writable depth-stencil target.
    DepthStencilWrite,
    /// Bound as a read-only depth-stencil target.
    DepthStencilRead,
    /// Sampled or loaded in shaders.
    ShaderRead,
    /// Read and written in shaders (storage).
    ShaderReadWrite,
    /// Read as a subpass input inside a render pass.
    SubpassInput,
    /// Source of a copy.
    CopySource,
    /// Destination of a copy.
    CopyDestination,
    /// Destination of a multisample resolve.
    ResolveDestination,
    /// Read by the predication unit.
    Predication,
    /// Read as indirect draw or dispatch arguments.
    IndirectArgument,
}

impl ResourceState {
    /// Returns true if a scope in this state may write the resource.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::ColorAttachment
                | Self::DepthStencilWrite
                | Self::ShaderReadWrite
                | Self::CopyDestination
                | Self::ResolveDestination
        )
    }
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
