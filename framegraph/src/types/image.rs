//! Image formats, bind flags and descriptors.

use bitflags::bitflags;

use super::Extent3d;
use crate::error::FrameGraphError;

/// Image format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum Format {
    /// 8-bit red channel, unsigned normalized.
    R8Unorm,
    /// 16-bit red channel, float.
    R16Float,
    /// 32-bit red channel, float.
    R32Float,
    /// 32-bit red channel, unsigned integer.
    R32Uint,
    /// 16-bit RG channels, float.
    Rg16Float,
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA channels, sRGB.
    Rgba8UnormSrgb,
    /// 8-bit BGRA channels, unsigned normalized.
    Bgra8Unorm,
    /// 16-bit RGBA channels, float.
    Rgba16Float,
    /// 32-bit RGBA channels, float.
    Rgba32Float,
    /// 32-bit depth, float.
    Depth32Float,
    /// 24-bit depth with 8-bit stencil.
    Depth24PlusStencil8,
    /// 32-bit depth float with 8-bit stencil.
    Depth32FloatStencil8,
}

impl Format {
    /// Returns true if this is a depth or stencil format.
    pub fn is_depth_stencil(&self) -> bool {
        matches!(
            self,
            Self::Depth32Float | Self::Depth24PlusStencil8 | Self::Depth32FloatStencil8
        )
    }

    /// Returns true if this format has a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::Depth24PlusStencil8 | Self::Depth32FloatStencil8)
    }

    /// Returns the size in bytes per texel.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::R8Unorm => 1,
            Self::R16Float => 2,
            Self::R32Float
            | Self::R32Uint
            | Self::Rg16Float
            | Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Bgra8Unorm
            | Self::Depth32Float
            | Self::Depth24PlusStencil8 => 4,
            Self::Rgba16Float | Self::Depth32FloatStencil8 => 8,
            Self::Rgba32Float => 16,
        }
    }
}

bitflags! {
    /// How an image may be bound by scopes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageBindFlags: u32 {
        /// Color render target.
        const COLOR = 1 << 0;
        /// Depth-stencil render target.
        const DEPTH_STENCIL = 1 << 1;
        /// Sampled or loaded in a shader.
        const SHADER_READ = 1 << 2;
        /// Written from a shader (storage image).
        const SHADER_WRITE = 1 << 3;
        /// Source of a copy.
        const COPY_READ = 1 << 4;
        /// Destination of a copy.
        const COPY_WRITE = 1 << 5;
        /// Read as a subpass input inside a render pass.
        const SUBPASS_INPUT = 1 << 6;
        /// Shader read and write.
        const SHADER_READ_WRITE = Self::SHADER_READ.bits() | Self::SHADER_WRITE.bits();
    }
}

impl Default for ImageBindFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for a transient or persistent image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageDescriptor {
    /// Size of mip 0.
    pub size: Extent3d,
    /// Texel format.
    pub format: Format,
    /// Mip level count.
    pub mip_levels: u32,
    /// Array layer count.
    pub array_layers: u32,
    /// Sample count for multisampling.
    pub sample_count: u32,
    /// Allowed bindings.
    pub bind_flags: ImageBindFlags,
}

impl ImageDescriptor {
    /// Create a 2D image descriptor with one mip, one layer and one sample.
    pub fn new_2d(bind_flags: ImageBindFlags, width: u32, height: u32, format: Format) -> Self {
        Self {
            size: Extent3d::new_2d(width, height),
            format,
            mip_levels: 1,
            array_layers: 1,
            sample_count: 1,
            bind_flags,
        }
    }

    /// Create a 3D image descriptor.
    pub fn new_3d(
        bind_flags: ImageBindFlags,
        width: u32,
        height: u32,
        depth: u32,
        format: Format,
    ) -> Self {
        Self {
            size: Extent3d::new_3d(width, height, depth),
            ..Self::new_2d(bind_flags, width, height, format)
        }
    }

    /// Set the mip level count.
    pub fn with_mip_levels(mut self, count: u32) -> Self {
        self.mip_levels = count;
        self
    }

    /// Set the array layer count.
    pub fn with_array_layers(mut self, count: u32) -> Self {
        self.array_layers = count;
        self
    }

    /// Set the sample count for multisampling.
    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }

    /// Backing memory required for every mip, layer and sample.
    ///
    /// Returns `None` when the total does not fit in 64 bits.
    pub fn byte_size(&self) -> Option<u64> {
        let per_layer = (0..self.mip_levels).try_fold(0u64, |total, level| {
            total.checked_add(self.size.mip_level(level).texel_count())
        })?;
        per_layer
            .checked_mul(self.format.block_size() as u64)?
            .checked_mul(self.array_layers as u64)?
            .checked_mul(self.sample_count as u64)
    }

    /// Length of the full mip chain down to a 1x1x1 level.
    pub fn max_mip_levels(&self) -> u32 {
        let largest = self.size.width.max(self.size.height).max(self.size.depth);
        u32::BITS - largest.leading_zeros()
    }

    pub(crate) fn validate(&self) -> Result<(), FrameGraphError> {
        if self.size.is_empty() {
            return Err(FrameGraphError::InvalidDescriptor(
                "image extent cannot be zero".to_string(),
            ));
        }
        if self.mip_levels == 0 || self.array_layers == 0 {
            return Err(FrameGraphError::InvalidDescriptor(
                "image needs at least one mip level and one array layer".to_string(),
            ));
        }
        if self.mip_levels > self.max_mip_levels() {
            return Err(FrameGraphError::InvalidDescriptor(format!(
                "image requests {} mip levels but its extent allows {}",
                self.mip_levels,
                self.max_mip_levels()
            )));
        }
        if !self.sample_count.is_power_of_two() {
            return Err(FrameGraphError::InvalidDescriptor(format!(
                "image sample count {} is not a power of two",
                self.sample_count
            )));
        }
        if self.format.is_depth_stencil() && self.bind_flags.contains(ImageBindFlags::COLOR) {
            return Err(FrameGraphError::InvalidDescriptor(format!(
                "depth format {:?} cannot be bound as a color target",
                self.format
            )));
        }
        if !self.format.is_depth_stencil()
            && self.bind_flags.contains(ImageBindFlags::DEPTH_STENCIL)
        {
            return Err(FrameGraphError::InvalidDescriptor(format!(
                "color format {:?} cannot be bound as a depth-stencil target",
                self.format
            )));
        }
        if self.byte_size().is_none() {
            return Err(FrameGraphError::InvalidDescriptor(format!(
                "image {}x{}x{} overflows the addressable size",
                self.size.width, self.size.height, self.size.depth
            )));
        }
        Ok(())
    }
}

impl Default for ImageDescriptor {
    fn default() -> Self {
        Self::new_2d(ImageBindFlags::empty(), 1, 1, Format::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_size_counts_mips_layers_samples() {
        let desc = ImageDescriptor::new_2d(ImageBindFlags::COLOR, 4, 4, Format::Rgba8Unorm)
            .with_mip_levels(3)
            .with_array_layers(2);
        // (16 + 4 + 1) texels * 4 bytes * 2 layers
        assert_eq!(desc.byte_size(), Some(168));

        let msaa = ImageDescriptor::new_2d(ImageBindFlags::COLOR, 8, 8, Format::Rgba16Float)
            .with_sample_count(4);
        assert_eq!(msaa.byte_size(), Some(8 * 8 * 8 * 4));
    }

    #[test]
    fn test_validate_rejects_oversized_image() {
        let huge =
            ImageDescriptor::new_2d(ImageBindFlags::COLOR, u32::MAX, u32::MAX, Format::Rgba32Float);
        assert_eq!(huge.byte_size(), None);
        assert!(matches!(
            huge.validate(),
            Err(FrameGraphError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_validate_caps_mip_levels() {
        let full_chain =
            ImageDescriptor::new_2d(ImageBindFlags::COLOR, 256, 64, Format::Rgba8Unorm)
                .with_mip_levels(9);
        assert_eq!(full_chain.max_mip_levels(), 9);
        assert!(full_chain.validate().is_ok());

        let too_deep = full_chain.with_mip_levels(10);
        assert!(matches!(
            too_deep.validate(),
            Err(FrameGraphError::InvalidDescriptor(_))
        ));

        let point = ImageDescriptor::new_2d(ImageBindFlags::COLOR, 1, 1, Format::Rgba8Unorm);
        assert_eq!(point.max_mip_levels(), 1);
        assert!(point.with_mip_levels(2).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_extent() {
        let desc = ImageDescriptor::new_2d(ImageBindFlags::COLOR, 0, 16, Format::Rgba8Unorm);
        assert!(matches!(
            desc.validate(),
            Err(FrameGraphError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_validate_rejects_mismatched_format() {
        let depth_as_color =
            ImageDescriptor::new_2d(ImageBindFlags::COLOR, 16, 16, Format::Depth32Float);
        assert!(depth_as_color.validate().is_err());

        let color_as_depth =
            ImageDescriptor::new_2d(ImageBindFlags::DEPTH_STENCIL, 16, 16, Format::Rgba8Unorm);
        assert!(color_as_depth.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_odd_sample_count() {
        let desc = ImageDescriptor::new_2d(ImageBindFlags::COLOR, 16, 16, Format::Rgba8Unorm)
            .with_sample_count(3);
        assert!(desc.validate().is_err());
    }

    #[test]
    fn test_depth_format_queries() {
        assert!(Format::Depth24PlusStencil8.is_depth_stencil());
        assert!(Format::Depth24PlusStencil8.has_stencil());
        assert!(!Format::Depth32Float.has_stencil());
        assert!(!Format::Rgba8Unorm.is_depth_stencil());
    }
}
