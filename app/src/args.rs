//! Command line arguments trait and default implementation.
//!
//! Uses clap for CLI parsing with:
//! - Help text (`--help`)
//! - Validation and clear error messages

use scopegraph::{FrameGraphConfig, ValidationMode};

/// Trait for host configuration.
///
/// Implement this trait to customize how the host is configured. Every
/// method has a default, so implementations only override what they need.
///
/// # Example
///
/// ```
/// use scopegraph_app::AppArgs;
///
/// struct CiArgs;
///
/// impl AppArgs for CiArgs {
///     fn parse() -> Self {
///         CiArgs
///     }
///
///     fn sample(&self) -> Option<&str> {
///         Some("async_compute")
///     }
///
///     fn max_frames(&self) -> Option<u64> {
///         Some(10)
///     }
/// }
///
/// assert_eq!(CiArgs.device_count(), 1);
/// ```
pub trait AppArgs: Sized {
    /// Parse command line arguments.
    fn parse() -> Self;

    /// Name of the sample to run.
    ///
    /// Default: `None` (the first registered sample)
    fn sample(&self) -> Option<&str> {
        None
    }

    /// Maximum number of frames to run before exiting.
    ///
    /// Default: `None` (run indefinitely)
    fn max_frames(&self) -> Option<u64> {
        None
    }

    /// Number of devices in the device group.
    ///
    /// Default: 1
    fn device_count(&self) -> u32 {
        1
    }

    /// Whether transient attachments may share heap memory.
    ///
    /// Default: true
    fn aliasing(&self) -> bool {
        true
    }

    /// How frame graph configuration errors are surfaced.
    ///
    /// Default: [`ValidationMode::Release`]
    fn validation(&self) -> ValidationMode {
        ValidationMode::Release
    }

    /// Print the registered samples and exit.
    ///
    /// Default: false
    fn list_samples(&self) -> bool {
        false
    }

    /// Frame graph configuration derived from the arguments.
    fn frame_graph_config(&self) -> FrameGraphConfig {
        FrameGraphConfig::default()
            .with_aliasing(self.aliasing())
            .with_validation(self.validation())
    }
}

// ============================================================================
// Default App Args
// ============================================================================

/// Default command line arguments implementation.
///
/// # Examples
///
/// ```bash
/// # Show help
/// ./sample_viewer --help
///
/// # List samples
/// ./sample_viewer --list
///
/// # Run the multi-GPU sample on two devices for 100 frames
/// ./sample_viewer --sample multi_gpu --devices 2 --max-frames 100
///
/// # Fail loudly on any frame graph error
/// ./sample_viewer --strict-validation
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultAppArgs {
    sample: Option<String>,
    max_frames: Option<u64>,
    device_count: u32,
    aliasing: bool,
    validation: ValidationMode,
    list_samples: bool,
}

impl Default for DefaultAppArgs {
    fn default() -> Self {
        Self {
            sample: None,
            max_frames: None,
            device_count: 1,
            aliasing: true,
            validation: ValidationMode::Release,
            list_samples: false,
        }
    }
}

impl DefaultAppArgs {
    /// Create default args selecting a sample.
    pub fn with_sample(sample: impl Into<String>) -> Self {
        Self {
            sample: Some(sample.into()),
            ..Default::default()
        }
    }

    /// Set the maximum number of frames.
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Set the device count.
    pub fn with_device_count(mut self, device_count: u32) -> Self {
        self.device_count = device_count;
        self
    }

    /// Enable or disable transient aliasing.
    pub fn with_aliasing(mut self, aliasing: bool) -> Self {
        self.aliasing = aliasing;
        self
    }

    /// Set the validation mode.
    pub fn with_validation(mut self, validation: ValidationMode) -> Self {
        self.validation = validation;
        self
    }
}

// ============================================================================
// Native implementation using clap
// ============================================================================

mod native {
    use super::*;
    use clap::Parser;

    /// scopegraph sample viewer arguments.
    #[derive(Parser, Debug)]
    #[command(
        name = "sample_viewer",
        about = "Run scopegraph sample components headlessly",
        long_about = "Runs a sample component against the scopegraph frame scheduler.\n\n\
            Command lists are recorded into an inspectable stream instead of a GPU,\n\
            so every sample runs anywhere.\n\
            \n\
            EXAMPLES:\n\
              # List samples\n\
              ./sample_viewer --list\n\
            \n\
              # Run the multi-GPU sample on two devices\n\
              ./sample_viewer --sample multi_gpu --devices 2 --max-frames 10",
        version
    )]
    pub(super) struct ClapArgs {
        /// Sample to run (see --list).
        #[arg(long)]
        pub sample: Option<String>,

        /// Exit after N frames (useful for testing).
        #[arg(long)]
        pub max_frames: Option<u64>,

        /// Number of devices in the device group.
        #[arg(long, default_value = "1")]
        pub devices: u32,

        /// Give every transient attachment its own memory.
        #[arg(long)]
        pub no_aliasing: bool,

        /// Panic on frame graph errors instead of skipping the frame.
        #[arg(long)]
        pub strict_validation: bool,

        /// List the registered samples and exit.
        #[arg(long)]
        pub list: bool,
    }

    impl From<ClapArgs> for DefaultAppArgs {
        fn from(args: ClapArgs) -> Self {
            Self {
                sample: args.sample,
                max_frames: args.max_frames,
                device_count: args.devices,
                aliasing: !args.no_aliasing,
                validation: if args.strict_validation {
                    ValidationMode::Strict
                } else {
                    ValidationMode::Release
                },
                list_samples: args.list,
            }
        }
    }
}

impl AppArgs for DefaultAppArgs {
    fn parse() -> Self {
        use clap::Parser;
        native::ClapArgs::parse().into()
    }

    fn sample(&self) -> Option<&str> {
        self.sample.as_deref()
    }

    fn max_frames(&self) -> Option<u64> {
        self.max_frames
    }

    fn device_count(&self) -> u32 {
        self.device_count
    }

    fn aliasing(&self) -> bool {
        self.aliasing
    }

    fn validation(&self) -> ValidationMode {
        self.validation
    }

    fn list_samples(&self) -> bool {
        self.list_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_clap_flags() {
        let args: DefaultAppArgs = native::ClapArgs::parse_from([
            "sample_viewer",
            "--sample",
            "multi_gpu",
            "--devices",
            "2",
            "--no-aliasing",
            "--strict-validation",
            "--max-frames",
            "5",
        ])
        .into();

        assert_eq!(args.sample(), Some("multi_gpu"));
        assert_eq!(args.device_count(), 2);
        assert_eq!(args.max_frames(), Some(5));
        let config = args.frame_graph_config();
        assert!(!config.aliasing);
        assert_eq!(config.validation, ValidationMode::Strict);
    }

    #[test]
    fn test_defaults() {
        let args: DefaultAppArgs = native::ClapArgs::parse_from(["sample_viewer"]).into();
        assert_eq!(args, DefaultAppArgs::default());
        assert!(!args.list_samples());
    }
}
