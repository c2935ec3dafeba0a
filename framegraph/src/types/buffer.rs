//! Buffer bind flags and descriptors.

use bitflags::bitflags;

use crate::error::FrameGraphError;

bitflags! {
    /// How a buffer may be bound by scopes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferBindFlags: u32 {
        /// Read from a shader.
        const SHADER_READ = 1 << 0;
        /// Written from a shader.
        const SHADER_WRITE = 1 << 1;
        /// Source of a copy.
        const COPY_READ = 1 << 2;
        /// Destination of a copy.
        const COPY_WRITE = 1 << 3;
        /// Predication source for conditional rendering.
        const PREDICATION = 1 << 4;
        /// Indirect draw or dispatch arguments.
        const INDIRECT = 1 << 5;
        /// Constant (uniform) data.
        const CONSTANT = 1 << 6;
        /// Vertex or index data.
        const INPUT_ASSEMBLY = 1 << 7;
        /// Shader read and write.
        const SHADER_READ_WRITE = Self::SHADER_READ.bits() | Self::SHADER_WRITE.bits();
    }
}

impl Default for BufferBindFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for a transient or persistent buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Size in bytes.
    pub size: u64,
    /// Allowed bindings.
    pub bind_flags: BufferBindFlags,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(bind_flags: BufferBindFlags, size: u64) -> Self {
        Self { size, bind_flags }
    }

    pub(crate) fn validate(&self) -> Result<(), FrameGraphError> {
        if self.size == 0 {
            return Err(FrameGraphError::InvalidDescriptor(
                "buffer size cannot be zero".to_string(),
            ));
        }
        Ok(())
    }
}
