//! Resource state transitions between scopes.

use std::collections::{HashMap, HashSet};

use crate::attachment::{AttachmentDatabase, AttachmentId};
use crate::device::DeviceIndex;
use crate::graph::{FrameGraph, NodeHandle};
use crate::resources::PhysicalResourceId;
use crate::scope::HardwareQueueClass;
use crate::types::ResourceState;

/// A state transition recorded before a scope runs.
///
/// `before == after` is a pure memory dependency: the previous user wrote
/// the resource, or this scope writes it, without a layout change.
/// `before == Undefined` on a transient marks memory taken over from an
/// aliased attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Barrier {
    /// Attachment being transitioned.
    pub attachment: AttachmentId,
    /// Device the transition happens on.
    pub device: DeviceIndex,
    /// Physical resource on that device.
    pub resource: PhysicalResourceId,
    /// State left by the previous user.
    pub before: ResourceState,
    /// State the scope expects.
    pub after: ResourceState,
    /// Queue ownership transfer, as (source, destination).
    pub queue_transfer: Option<(HardwareQueueClass, HardwareQueueClass)>,
}

impl std::fmt::Display for Barrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}'@{}: {} -> {}",
            self.attachment, self.device, self.before, self.after
        )?;
        if let Some((source, destination)) = self.queue_transfer {
            write!(f, " ({source} -> {destination})")?;
        }
        Ok(())
    }
}

/// Barriers to record before each node, plus the final state of every
/// imported attachment.
#[derive(Debug, Default)]
pub(crate) struct BarrierPlan {
    /// Indexed by node submission index.
    pub(crate) per_node: Vec<Vec<Barrier>>,
    /// (attachment index, device, state) of imported attachments after the frame.
    pub(crate) final_states: Vec<(usize, DeviceIndex, ResourceState)>,
}

struct Tracked {
    state: ResourceState,
    queue: Option<HardwareQueueClass>,
    written: bool,
}

/// Walk the execution order and emit a barrier wherever an attachment's
/// state or queue changes, or a write is involved (RAW, WAW, WAR).
///
/// Only consecutive reads in the same state and queue share a resource
/// without one. The first use of a transient (and of an imported resource
/// whose state is unknown) only initializes it, unless `aliased` lists the
/// transient as reusing another attachment's memory on that device.
pub(crate) fn plan_barriers(
    graph: &FrameGraph,
    order: &[NodeHandle],
    database: &AttachmentDatabase,
    aliased: &HashSet<(usize, DeviceIndex)>,
) -> BarrierPlan {
    scopegraph_core::profile_scope!("plan_barriers");

    let mut plan = BarrierPlan {
        per_node: vec![Vec::new(); graph.len()],
        final_states: Vec::new(),
    };
    let mut tracked: HashMap<(usize, DeviceIndex), Tracked> = HashMap::new();
    let mut touched: Vec<(usize, DeviceIndex)> = Vec::new();

    for &handle in order {
        let scope = &graph.node(handle).scope;
        let device = scope.device;
        for scope_attachment in scope.attachments() {
            let Some(index) = database.index_of(scope_attachment.attachment()) else {
                continue;
            };
            let Some(resolved) = database.resolved_at(index, device) else {
                continue;
            };
            let entry = tracked.entry((index, device)).or_insert_with(|| {
                touched.push((index, device));
                let state = database.attachment_at(index).initial_state(device);
                Tracked {
                    state,
                    queue: None,
                    written: state.is_write(),
                }
            });

            let after = scope_attachment.expected_state();
            let writes = scope_attachment.access().writes();
            let queue_transfer = entry
                .queue
                .filter(|&previous| previous != scope.queue)
                .map(|previous| (previous, scope.queue));

            // Undefined only before the first use.
            let needed = if entry.state == ResourceState::Undefined {
                aliased.contains(&(index, device))
            } else {
                entry.state != after || queue_transfer.is_some() || entry.written || writes
            };
            if needed {
                let barrier = Barrier {
                    attachment: scope_attachment.attachment().clone(),
                    device,
                    resource: resolved.resource,
                    before: entry.state,
                    after,
                    queue_transfer,
                };
                log::trace!("Barrier before '{}': {}", scope.id, barrier);
                plan.per_node[handle.index()].push(barrier);
            }
            entry.state = after;
            entry.queue = Some(scope.queue);
            entry.written = writes;
        }
    }

    for (index, device) in touched {
        if database.attachment_at(index).is_transient() {
            continue;
        }
        if let Some(entry) = tracked.get(&(index, device)) {
            plan.final_states.push((index, device, entry.state));
        }
    }
    plan
}
