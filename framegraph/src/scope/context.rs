//! Compile and execute contexts.
//!
//! Both contexts only expose attachments the scope declared during
//! Prepare, already resolved to physical resources for the scope's device.

use std::ops::Range;

use super::{HardwareQueueClass, QueryPoolAttachment, Scope, ScopeAttachment, ScopeId};
use crate::attachment::{AttachmentDatabase, BufferView, ImageView};
use crate::device::DeviceIndex;
use crate::error::FrameGraphError;
use crate::executor::CommandList;

fn declared<'s>(scope: &'s Scope, id: &str) -> Result<&'s ScopeAttachment, FrameGraphError> {
    scope
        .attachment(id)
        .ok_or_else(|| FrameGraphError::UndeclaredScopeAttachment {
            scope: scope.id.clone(),
            attachment: id.into(),
        })
}

/// Context passed to [`ScopeProducer::compile`](super::ScopeProducer::compile).
///
/// Runs once per scope per device after transient resources have been
/// assigned, in execution order.
pub struct FrameGraphCompileContext<'a> {
    scope: &'a Scope,
    database: &'a AttachmentDatabase,
}

impl<'a> FrameGraphCompileContext<'a> {
    pub(crate) fn new(scope: &'a Scope, database: &'a AttachmentDatabase) -> Self {
        Self { scope, database }
    }

    /// Id of the scope being compiled.
    pub fn scope_id(&self) -> &ScopeId {
        &self.scope.id
    }

    /// Device the scope runs on.
    pub fn device_index(&self) -> DeviceIndex {
        self.scope.device
    }

    /// Queue the scope is submitted to.
    pub fn hardware_queue_class(&self) -> HardwareQueueClass {
        self.scope.queue
    }

    /// Estimated item count declared during Prepare.
    pub fn estimated_item_count(&self) -> u32 {
        self.scope.estimated_item_count
    }

    /// Declaration of an attachment used by this scope.
    pub fn scope_attachment(&self, id: &str) -> Option<&ScopeAttachment> {
        self.scope.attachment(id)
    }

    /// Query ranges declared by this scope.
    pub fn query_pools(&self) -> &[QueryPoolAttachment] {
        &self.scope.query_pools
    }

    /// Resolved view of a declared image attachment.
    ///
    /// # Errors
    ///
    /// Fails if the scope did not declare `id` or `id` is not an image.
    pub fn image_view(&self, id: &str) -> Result<ImageView, FrameGraphError> {
        declared(self.scope, id)?;
        self.database.image_view(id, self.scope.device)
    }

    /// Resolved view of a declared buffer attachment.
    ///
    /// # Errors
    ///
    /// Fails if the scope did not declare `id` or `id` is not a buffer.
    pub fn buffer_view(&self, id: &str) -> Result<BufferView, FrameGraphError> {
        declared(self.scope, id)?;
        self.database.buffer_view(id, self.scope.device)
    }
}

/// Context passed to [`ScopeProducer::execute`](super::ScopeProducer::execute).
///
/// A scope whose estimated item count exceeds the configured items per
/// command list is executed once per command list; each call should only
/// record the items in [`submit_range`](Self::submit_range).
pub struct FrameGraphExecuteContext<'a> {
    scope: &'a Scope,
    database: &'a AttachmentDatabase,
    command_list: &'a mut CommandList,
    command_list_index: u32,
    command_list_count: u32,
}

impl<'a> FrameGraphExecuteContext<'a> {
    pub(crate) fn new(
        scope: &'a Scope,
        database: &'a AttachmentDatabase,
        command_list: &'a mut CommandList,
        command_list_index: u32,
        command_list_count: u32,
    ) -> Self {
        Self {
            scope,
            database,
            command_list,
            command_list_index,
            command_list_count,
        }
    }

    /// Id of the scope being executed.
    pub fn scope_id(&self) -> &ScopeId {
        &self.scope.id
    }

    /// Device the scope runs on.
    pub fn device_index(&self) -> DeviceIndex {
        self.scope.device
    }

    /// Command list to record into.
    pub fn command_list(&mut self) -> &mut CommandList {
        self.command_list
    }

    /// Items of the scope this command list should record.
    pub fn submit_range(&self) -> Range<u32> {
        self.command_list.submit_range()
    }

    /// Index of this command list among the scope's lists.
    pub fn command_list_index(&self) -> u32 {
        self.command_list_index
    }

    /// Number of command lists the scope was split into.
    pub fn command_list_count(&self) -> u32 {
        self.command_list_count
    }

    /// Declaration of an attachment used by this scope.
    pub fn scope_attachment(&self, id: &str) -> Option<&ScopeAttachment> {
        self.scope.attachment(id)
    }

    /// Query ranges declared by this scope.
    pub fn query_pools(&self) -> &[QueryPoolAttachment] {
        &self.scope.query_pools
    }

    /// Resolved view of a declared image attachment.
    ///
    /// # Errors
    ///
    /// Fails if the scope did not declare `id` or `id` is not an image.
    pub fn image_view(&self, id: &str) -> Result<ImageView, FrameGraphError> {
        declared(self.scope, id)?;
        self.database.image_view(id, self.scope.device)
    }

    /// Resolved view of a declared buffer attachment.
    ///
    /// # Errors
    ///
    /// Fails if the scope did not declare `id` or `id` is not a buffer.
    pub fn buffer_view(&self, id: &str) -> Result<BufferView, FrameGraphError> {
        declared(self.scope, id)?;
        self.database.buffer_view(id, self.scope.device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Format, ImageBindFlags, ImageDescriptor};

    #[test]
    fn test_undeclared_attachment_is_rejected() {
        let mut database = AttachmentDatabase::new();
        database
            .create_transient_image(
                "shadow_map",
                ImageDescriptor::new_2d(
                    ImageBindFlags::DEPTH_STENCIL,
                    64,
                    64,
                    Format::Depth32Float,
                ),
            )
            .unwrap();
        let scope = Scope::new(ScopeId::from("forward"), 0);
        let context = FrameGraphCompileContext::new(&scope, &database);

        assert_eq!(
            context.image_view("shadow_map"),
            Err(FrameGraphError::UndeclaredScopeAttachment {
                scope: ScopeId::from("forward"),
                attachment: "shadow_map".into(),
            })
        );
    }
}
