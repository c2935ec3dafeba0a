//! Frame graph configuration.

/// Default alignment of transient heap placements, in bytes.
pub const DEFAULT_HEAP_ALIGNMENT: u64 = 256;

/// Default number of items recorded per command list before a scope is split.
pub const DEFAULT_ITEMS_PER_COMMAND_LIST: u32 = 128;

/// How configuration errors in a frame are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValidationMode {
    /// Log the error, skip the frame and return the error.
    #[default]
    Release,
    /// Log the error and panic. Meant for debug builds and tests.
    Strict,
}

/// Settings of a [`FrameGraphSystem`](crate::FrameGraphSystem).
///
/// # Example
///
/// ```
/// use scopegraph::{FrameGraphConfig, ValidationMode};
///
/// let config = FrameGraphConfig::default()
///     .with_validation(ValidationMode::Strict)
///     .with_aliasing(false);
/// assert!(!config.aliasing);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGraphConfig {
    /// Error handling mode.
    pub validation: ValidationMode,
    /// Let transients with disjoint lifetimes share heap memory.
    pub aliasing: bool,
    /// Alignment of transient placements in bytes.
    pub heap_alignment: u64,
    /// Items per command list; scopes estimating more are split. 0 disables splitting.
    pub items_per_command_list: u32,
}

impl Default for FrameGraphConfig {
    fn default() -> Self {
        Self {
            validation: ValidationMode::Release,
            aliasing: true,
            heap_alignment: DEFAULT_HEAP_ALIGNMENT,
            items_per_command_list: DEFAULT_ITEMS_PER_COMMAND_LIST,
        }
    }
}

impl FrameGraphConfig {
    /// Set the validation mode.
    pub fn with_validation(mut self, validation: ValidationMode) -> Self {
        self.validation = validation;
        self
    }

    /// Enable or disable transient aliasing.
    pub fn with_aliasing(mut self, aliasing: bool) -> Self {
        self.aliasing = aliasing;
        self
    }

    /// Set the transient heap alignment. Values below 1 are treated as 1.
    pub fn with_heap_alignment(mut self, alignment: u64) -> Self {
        self.heap_alignment = alignment.max(1);
        self
    }

    /// Set how many items go into one command list.
    pub fn with_items_per_command_list(mut self, items: u32) -> Self {
        self.items_per_command_list = items;
        self
    }
}
