//! Common value types shared by descriptors and scope declarations.

// ============================================================================
// Extent
// ============================================================================

/// 3D extent for images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3d {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Depth in pixels (1 for 2D images).
    pub depth: u32,
}

impl Extent3d {
    /// Create a new 2D extent.
    pub fn new_2d(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 1,
        }
    }

    /// Create a new 3D extent.
    pub fn new_3d(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Check if any dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }

    /// Number of texels covered by the extent.
    pub fn texel_count(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.depth as u64
    }

    /// Extent of the given mip level, clamped to 1 in every dimension.
    pub fn mip_level(&self, level: u32) -> Self {
        Self {
            width: (self.width >> level).max(1),
            height: (self.height >> level).max(1),
            depth: (self.depth >> level).max(1),
        }
    }
}

// ============================================================================
// Clear Value
// ============================================================================

/// Value written by a `Clear` load action.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ClearValue {
    /// No clear value supplied.
    #[default]
    None,
    /// Clear a color attachment with RGBA values.
    Color { r: f32, g: f32, b: f32, a: f32 },
    /// Clear the depth aspect.
    Depth(f32),
    /// Clear the stencil aspect.
    Stencil(u32),
    /// Clear depth and stencil aspects.
    DepthStencil { depth: f32, stencil: u32 },
    /// Fill a buffer with a repeated 32-bit value.
    Uint(u32),
}

impl ClearValue {
    /// Create a color clear value.
    pub fn color(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::Color { r, g, b, a }
    }

    /// Create a depth clear value.
    pub fn depth(value: f32) -> Self {
        Self::Depth(value)
    }

    /// Create a depth-stencil clear value.
    pub fn depth_stencil(depth: f32, stencil: u32) -> Self {
        Self::DepthStencil { depth, stencil }
    }

    /// Opaque black, the default clear for color targets.
    pub fn black() -> Self {
        Self::color(0.0, 0.0, 0.0, 1.0)
    }
}

// ============================================================================
// Interval
// ============================================================================

/// Inclusive index range, used for query slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    /// First index.
    pub min: u32,
    /// Last index (inclusive).
    pub max: u32,
}

impl Interval {
    /// Create an inclusive interval. `min` and `max` are swapped if reversed.
    pub fn new(min: u32, max: u32) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Interval covering a single index.
    pub fn single(index: u32) -> Self {
        Self {
            min: index,
            max: index,
        }
    }

    /// Number of indices covered.
    pub fn len(&self) -> u32 {
        self.max - self.min + 1
    }

    /// Always false; an interval covers at least one index.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Check if two intervals share any index.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.min <= other.max && other.min <= self.max
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}
