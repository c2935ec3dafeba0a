//! Per-frame builder that collects scope producers.

use std::collections::HashSet;

use super::FrameGraph;
use crate::attachment::AttachmentDatabase;
use crate::device::{DeviceGroup, DeviceIndex};
use crate::error::FrameGraphError;
use crate::scope::{FrameGraphInterface, Scope, ScopeId, ScopeProducer};

/// Collects the scope producers of one frame.
///
/// Obtained from [`FrameGraphSystem::begin_frame`](crate::FrameGraphSystem::begin_frame)
/// and consumed by [`FrameGraphSystem::end_frame`](crate::FrameGraphSystem::end_frame).
/// Producers are borrowed for the frame; their import order is the
/// submission order used to break scheduling ties.
///
/// The attachment database is available before any producer is prepared,
/// so hosts can import persistent resources (the swapchain image, history
/// buffers) up front.
pub struct FrameGraphBuilder<'p> {
    database: AttachmentDatabase,
    producers: Vec<&'p mut dyn ScopeProducer>,
    frame_index: u64,
}

impl<'p> FrameGraphBuilder<'p> {
    pub(crate) fn new(database: AttachmentDatabase, frame_index: u64) -> Self {
        Self {
            database,
            producers: Vec::new(),
            frame_index,
        }
    }

    /// The frame's attachment database.
    pub fn attachment_database(&mut self) -> &mut AttachmentDatabase {
        &mut self.database
    }

    /// Add a producer to the frame.
    pub fn import_scope_producer(&mut self, producer: &'p mut dyn ScopeProducer) {
        log::trace!(
            "FrameGraphBuilder: import '{}' ({:?})",
            producer.scope_id(),
            producer.device_mask()
        );
        self.producers.push(producer);
    }

    /// Number of imported producers.
    pub fn producer_count(&self) -> usize {
        self.producers.len()
    }

    /// Index of the frame being built.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Split the builder into its database and producers.
    pub(crate) fn into_parts(self) -> (AttachmentDatabase, Vec<&'p mut dyn ScopeProducer>) {
        (self.database, self.producers)
    }
}

/// Run Prepare on every producer for every device it selects.
///
/// Nodes are added in submission order: producer import order, then
/// ascending device index.
pub(crate) fn prepare_scopes(
    producers: &mut [&mut dyn ScopeProducer],
    database: &mut AttachmentDatabase,
    device_group: &DeviceGroup,
    graph: &mut FrameGraph,
) -> Result<(), FrameGraphError> {
    scopegraph_core::profile_scope!("prepare_scopes");

    let mut seen: HashSet<(ScopeId, DeviceIndex)> = HashSet::new();
    for (index, producer) in producers.iter_mut().enumerate() {
        let scope_id = producer.scope_id().clone();
        let mask = producer.device_mask();
        if mask.is_empty() {
            return Err(FrameGraphError::EmptyDeviceMask(scope_id));
        }
        device_group.validate_mask(mask)?;

        for device in mask.iter() {
            if !seen.insert((scope_id.clone(), device)) {
                return Err(FrameGraphError::DuplicateScope {
                    scope: scope_id,
                    device,
                });
            }
            let mut scope = Scope::new(scope_id.clone(), device);
            producer.prepare(&mut FrameGraphInterface::new(&mut scope, database));
            graph.add_node(scope, index);
        }
    }
    match database.take_failure() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
