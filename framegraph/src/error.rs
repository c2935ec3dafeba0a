//! Frame graph error types.

use std::fmt;

use crate::attachment::{AttachmentId, AttachmentKind};
use crate::device::DeviceIndex;
use crate::scope::{ScopeAttachmentUsage, ScopeId};
use crate::types::Interval;

/// Errors reported by the attachment database, graph build and compile.
///
/// Configuration errors abort the frame they occur in; see
/// [`ValidationMode`](crate::ValidationMode) for how they are surfaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameGraphError {
    /// An attachment id was registered twice in one frame.
    DuplicateAttachment(AttachmentId),
    /// A scope or lookup referenced an attachment that was never registered.
    UnknownAttachment(AttachmentId),
    /// An imported resource has been shut down.
    InvalidImport(AttachmentId),
    /// A descriptor or creation parameter is invalid.
    InvalidDescriptor(String),
    /// A view was requested before the attachment was resolved on that device.
    AttachmentNotResolved {
        attachment: AttachmentId,
        device: DeviceIndex,
    },
    /// An image view was requested for a buffer or the other way round.
    AttachmentKindMismatch {
        attachment: AttachmentId,
        expected: AttachmentKind,
    },
    /// A compile or execute context asked for an attachment its scope never declared.
    UndeclaredScopeAttachment {
        scope: ScopeId,
        attachment: AttachmentId,
    },
    /// A scope declared the same attachment twice.
    DuplicateScopeAttachment {
        scope: ScopeId,
        attachment: AttachmentId,
    },
    /// A producer selected no device.
    EmptyDeviceMask(ScopeId),
    /// The same scope id was imported twice for one device.
    DuplicateScope { scope: ScopeId, device: DeviceIndex },
    /// An ordering request named a scope that is not part of the frame.
    UnknownScope { scope: ScopeId, referenced: ScopeId },
    /// The usage does not apply to the attachment kind.
    InvalidUsage {
        scope: ScopeId,
        attachment: AttachmentId,
        usage: ScopeAttachmentUsage,
    },
    /// An imported resource lacks the bind flags the usage needs.
    IncompatibleBindFlags {
        scope: ScopeId,
        attachment: AttachmentId,
        usage: ScopeAttachmentUsage,
    },
    /// A transient attachment is read before any scope wrote it.
    ReadBeforeWrite {
        scope: ScopeId,
        attachment: AttachmentId,
        device: DeviceIndex,
    },
    /// The scope dependencies contain a cycle.
    ///
    /// Holds the scopes that could not be ordered.
    CyclicDependency(Vec<ScopeId>),
    /// A device index outside the device group.
    InvalidDevice {
        device: DeviceIndex,
        device_count: u32,
    },
    /// A device group size of zero or above the supported maximum.
    InvalidDeviceCount(u32),
    /// A query interval outside the pool.
    InvalidQueryInterval {
        scope: ScopeId,
        pool: String,
        interval: Interval,
        query_count: u32,
    },
    /// Host access to a buffer failed.
    HostAccess(String),
}

impl fmt::Display for FrameGraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateAttachment(id) => {
                write!(f, "attachment '{id}' is already registered this frame")
            }
            Self::UnknownAttachment(id) => write!(f, "attachment '{id}' is not registered"),
            Self::InvalidImport(id) => {
                write!(f, "cannot import '{id}': resource is invalid or shut down")
            }
            Self::InvalidDescriptor(msg) => write!(f, "invalid descriptor: {msg}"),
            Self::AttachmentNotResolved { attachment, device } => write!(
                f,
                "attachment '{attachment}' is not resolved on device {device}"
            ),
            Self::AttachmentKindMismatch {
                attachment,
                expected,
            } => write!(f, "attachment '{attachment}' is not {expected}"),
            Self::UndeclaredScopeAttachment { scope, attachment } => write!(
                f,
                "scope '{scope}' did not declare attachment '{attachment}'"
            ),
            Self::DuplicateScopeAttachment { scope, attachment } => write!(
                f,
                "scope '{scope}' declares attachment '{attachment}' more than once"
            ),
            Self::EmptyDeviceMask(scope) => write!(f, "scope '{scope}' selects no device"),
            Self::DuplicateScope { scope, device } => {
                write!(f, "scope '{scope}' imported twice on device {device}")
            }
            Self::UnknownScope { scope, referenced } => write!(
                f,
                "scope '{scope}' orders itself against unknown scope '{referenced}'"
            ),
            Self::InvalidUsage {
                scope,
                attachment,
                usage,
            } => write!(
                f,
                "scope '{scope}' uses '{attachment}' as {usage:?}, which its kind does not support"
            ),
            Self::IncompatibleBindFlags {
                scope,
                attachment,
                usage,
            } => write!(
                f,
                "scope '{scope}' uses '{attachment}' as {usage:?} without matching bind flags"
            ),
            Self::ReadBeforeWrite {
                scope,
                attachment,
                device,
            } => write!(
                f,
                "scope '{scope}' reads transient '{attachment}' on device {device} before a write"
            ),
            Self::CyclicDependency(scopes) => {
                write!(f, "frame graph contains cyclic dependency between: ")?;
                for (i, scope) in scopes.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{scope}'")?;
                }
                Ok(())
            }
            Self::InvalidDevice {
                device,
                device_count,
            } => write!(
                f,
                "device {device} is outside the device group of {device_count}"
            ),
            Self::InvalidDeviceCount(count) => write!(f, "invalid device count: {count}"),
            Self::InvalidQueryInterval {
                scope,
                pool,
                interval,
                query_count,
            } => write!(
                f,
                "scope '{scope}' uses queries {interval} of '{pool}' ({query_count} queries)"
            ),
            Self::HostAccess(msg) => write!(f, "host access failed: {msg}"),
        }
    }
}

impl std::error::Error for FrameGraphError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FrameGraphError::DuplicateAttachment(AttachmentId::from("gbuffer"));
        assert_eq!(
            err.to_string(),
            "attachment 'gbuffer' is already registered this frame"
        );

        let err = FrameGraphError::CyclicDependency(vec![ScopeId::from("a"), ScopeId::from("b")]);
        assert_eq!(
            err.to_string(),
            "frame graph contains cyclic dependency between: 'a', 'b'"
        );
    }
}
