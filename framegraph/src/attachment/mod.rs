//! Attachments: named images and buffers referenced by scopes.
//!
//! An attachment is either **transient** (created for one frame, backing
//! memory assigned by the compiler and possibly aliased) or **imported**
//! (backed by a persistent [`Image`](crate::Image) or
//! [`Buffer`](crate::Buffer)). Attachments are registered in the
//! [`AttachmentDatabase`] and referenced by scopes through their
//! [`AttachmentId`].

mod database;
mod view;

pub use database::{Attachment, AttachmentDatabase};
pub use view::{BufferView, HeapPlacement, ImageView};

pub(crate) use database::ResolvedResource;

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Name of an attachment, unique per frame.
///
/// Cheap to clone; dereferences to `&str` so lookups accept either form.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttachmentId(Arc<str>);

impl AttachmentId {
    /// Create an attachment id.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AttachmentId {
    fn from(name: &str) -> Self {
        Self(Arc::from(name))
    }
}

impl From<String> for AttachmentId {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&AttachmentId> for AttachmentId {
    fn from(id: &AttachmentId) -> Self {
        id.clone()
    }
}

impl Deref for AttachmentId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for AttachmentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttachmentId({:?})", &*self.0)
    }
}

/// Whether an attachment is an image or a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    /// An image attachment.
    Image,
    /// A buffer attachment.
    Buffer,
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "an image"),
            Self::Buffer => write!(f, "a buffer"),
        }
    }
}

/// Whether an attachment lives for one frame or is imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentLifetime {
    /// Created and destroyed within the frame; memory may alias.
    Transient,
    /// Backed by a resource that outlives the frame.
    Imported,
}
