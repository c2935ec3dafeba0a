//! Host error types.

use std::fmt;

use scopegraph::FrameGraphError;

/// Errors that stop the sample host.
///
/// Frame graph errors during a frame only skip that frame; these are the
/// errors the host cannot run past.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// No sample with this name is registered.
    UnknownSample(String),
    /// No sample was selected and the registry is empty.
    NoSamples,
    /// A sample failed to activate.
    ActivationFailed { sample: String, reason: String },
    /// Setting up the device group or a persistent resource failed.
    FrameGraph(FrameGraphError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSample(name) => write!(f, "unknown sample '{name}'"),
            Self::NoSamples => write!(f, "no samples registered"),
            Self::ActivationFailed { sample, reason } => {
                write!(f, "sample '{sample}' failed to activate: {reason}")
            }
            Self::FrameGraph(err) => write!(f, "frame graph error: {err}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FrameGraph(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FrameGraphError> for AppError {
    fn from(err: FrameGraphError) -> Self {
        Self::FrameGraph(err)
    }
}
