//! Transient attachment lifetimes.

use std::collections::HashMap;

use crate::attachment::AttachmentDatabase;
use crate::device::DeviceIndex;
use crate::graph::{FrameGraph, NodeHandle};
use crate::scope::HardwareQueueClass;

/// Inclusive range of execution positions that use an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Lifetime {
    pub(crate) first: usize,
    pub(crate) last: usize,
}

/// A transient attachment used on one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TransientUsage {
    pub(crate) attachment: usize,
    pub(crate) device: DeviceIndex,
    pub(crate) lifetime: Lifetime,
    /// Execution positions of every scope using the attachment, ascending.
    pub(crate) users: Vec<usize>,
    pub(crate) size: u64,
}

impl TransientUsage {
    /// True if every user of `self` has finished before any user of
    /// `later` starts.
    pub(crate) fn retires_before(
        &self,
        later: &TransientUsage,
        ordering: &ExecutionOrdering,
    ) -> bool {
        later.users.iter().all(|&after| {
            self.users
                .iter()
                .all(|&before| ordering.precedes(before, after))
        })
    }
}

/// Happens-before relation between execution positions.
///
/// Position `a` precedes `b` when a dependency path leads from `a` to `b`,
/// or when both run on the same device queue with `a` submitted first.
/// Queues run in parallel, so execution order alone orders nothing across
/// them.
#[derive(Debug, Default)]
pub(crate) struct ExecutionOrdering {
    /// `preceded[b][a]` is set when `a` completes before `b` starts.
    preceded: Vec<Vec<bool>>,
}

impl ExecutionOrdering {
    pub(crate) fn new(graph: &FrameGraph, order: &[NodeHandle]) -> Self {
        let count = order.len();
        let mut position = vec![0; graph.len()];
        for (at, handle) in order.iter().enumerate() {
            position[handle.index()] = at;
        }
        let mut dependencies: Vec<Vec<usize>> = vec![Vec::new(); count];
        for &(dependent, dependency) in graph.edges() {
            dependencies[position[dependent.index()]].push(position[dependency.index()]);
        }

        let mut last_on_queue: HashMap<(DeviceIndex, HardwareQueueClass), usize> = HashMap::new();
        let mut preceded = vec![vec![false; count]; count];
        for (at, &handle) in order.iter().enumerate() {
            let scope = &graph.node(handle).scope;
            let mut before = std::mem::take(&mut dependencies[at]);
            if let Some(previous) = last_on_queue.insert((scope.device, scope.queue), at) {
                before.push(previous);
            }
            // Everything in `before` sits earlier in the order.
            let (done, current) = preceded.split_at_mut(at);
            let current = &mut current[0];
            for earlier in before {
                current[earlier] = true;
                for (other, &flag) in done[earlier].iter().enumerate() {
                    current[other] |= flag;
                }
            }
        }
        Self { preceded }
    }

    /// Every position precedes all later ones, as on a single queue.
    #[cfg(test)]
    pub(crate) fn serial(count: usize) -> Self {
        let preceded = (0..count)
            .map(|after| (0..count).map(|before| before < after).collect())
            .collect();
        Self { preceded }
    }

    pub(crate) fn precedes(&self, before: usize, after: usize) -> bool {
        self.preceded
            .get(after)
            .and_then(|set| set.get(before))
            .copied()
            .unwrap_or(false)
    }
}

/// Collect the lifetime of every transient attachment per device.
///
/// Results are ordered by first use, then attachment registration order.
/// Transients no scope uses on a device get no entry for it.
pub(crate) fn transient_lifetimes(
    graph: &FrameGraph,
    order: &[NodeHandle],
    database: &AttachmentDatabase,
) -> Vec<TransientUsage> {
    let mut lookup: HashMap<(usize, DeviceIndex), usize> = HashMap::new();
    let mut usages: Vec<TransientUsage> = Vec::new();

    for (position, &handle) in order.iter().enumerate() {
        let scope = &graph.node(handle).scope;
        for scope_attachment in scope.attachments() {
            let Some(index) = database.index_of(scope_attachment.attachment()) else {
                continue;
            };
            let attachment = database.attachment_at(index);
            if !attachment.is_transient() {
                continue;
            }
            match lookup.get(&(index, scope.device)) {
                Some(&slot) => {
                    usages[slot].lifetime.last = position;
                    usages[slot].users.push(position);
                }
                None => {
                    lookup.insert((index, scope.device), usages.len());
                    usages.push(TransientUsage {
                        attachment: index,
                        device: scope.device,
                        lifetime: Lifetime {
                            first: position,
                            last: position,
                        },
                        users: vec![position],
                        size: attachment.transient_size(),
                    });
                }
            }
        }
    }

    usages.sort_by_key(|usage| (usage.lifetime.first, usage.attachment, usage.device));
    for usage in &usages {
        log::trace!(
            "Lifetime: '{}' device {} [{}, {}]",
            database.attachment_at(usage.attachment).id(),
            usage.device,
            usage.lifetime.first,
            usage.lifetime.last
        );
    }
    usages
}
