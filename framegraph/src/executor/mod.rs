//! Frame execution.
//!
//! The executor walks the compiled order and, for every node, records one
//! or more command lists: the scope's barriers and clears first, then
//! whatever the producer records in Execute. Dependencies between scopes
//! on different queues or devices become semaphores; every list is then
//! grouped into per-queue submissions and the frame fence is signalled.

mod command_list;
mod sync;

pub use command_list::{Command, CommandList, PredicationOp};
pub use sync::{Fence, FenceStatus, QueueId, Semaphore};

use std::ops::Range;

use scopegraph_core::pool::FramePool;

use crate::attachment::AttachmentDatabase;
use crate::compiler::Barrier;
use crate::graph::{FrameGraph, NodeHandle};
use crate::scope::{FrameGraphExecuteContext, LoadOp, Scope, ScopeProducer};

/// Command lists submitted to one queue, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSubmission {
    /// Target queue.
    pub queue: QueueId,
    /// Indices into the frame's command lists.
    pub command_lists: Vec<usize>,
}

/// Output of executing one frame.
#[derive(Debug, Default)]
pub(crate) struct ExecutedFrame {
    pub(crate) command_lists: Vec<CommandList>,
    /// Command list range of every node, indexed by submission index.
    pub(crate) node_lists: Vec<Range<usize>>,
    pub(crate) submissions: Vec<QueueSubmission>,
    pub(crate) semaphores: Vec<Semaphore>,
    pub(crate) fence: Fence,
}

/// Split `item_count` items into per-command-list ranges.
///
/// Always returns at least one range, so empty scopes still get a list.
pub(crate) fn split_items(item_count: u32, items_per_list: u32) -> Vec<Range<u32>> {
    if item_count == 0 || items_per_list == 0 || item_count <= items_per_list {
        return vec![0..item_count];
    }
    (0..item_count.div_ceil(items_per_list))
        .map(|i| {
            let start = i * items_per_list;
            start..(start + items_per_list).min(item_count)
        })
        .collect()
}

fn queue_of(scope: &Scope) -> QueueId {
    QueueId::new(scope.device, scope.queue)
}

/// Records and submits command lists, reusing their allocations across frames.
#[derive(Debug, Default)]
pub(crate) struct Executor {
    command_lists: FramePool<CommandList>,
    next_semaphore_id: u64,
}

impl Executor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Run Execute for every node in `order`.
    pub(crate) fn execute(
        &mut self,
        graph: &FrameGraph,
        order: &[NodeHandle],
        barriers: &[Vec<Barrier>],
        producers: &mut [&mut dyn ScopeProducer],
        database: &AttachmentDatabase,
        items_per_command_list: u32,
    ) -> ExecutedFrame {
        scopegraph_core::profile_scope!("execute_frame");

        let mut frame = ExecutedFrame {
            node_lists: vec![0..0; graph.len()],
            ..Default::default()
        };

        for &handle in order {
            let node = graph.node(handle);
            let scope = &node.scope;
            scopegraph_core::profile_scope_dynamic!(scope.id.as_str());

            let ranges = split_items(scope.estimated_item_count, items_per_command_list);
            let count = ranges.len() as u32;
            let start = frame.command_lists.len();
            let mut recorded = 0;

            for (i, range) in ranges.into_iter().enumerate() {
                let mut list = self.command_lists.acquire();
                list.begin(queue_of(scope), &scope.id, range);
                list.record(Command::BeginScope {
                    scope: scope.id.clone(),
                });
                if i == 0 {
                    for barrier in &barriers[handle.index()] {
                        list.record(Command::Barrier(barrier.clone()));
                    }
                    record_clears(scope, database, &mut list);
                }
                {
                    let mut context =
                        FrameGraphExecuteContext::new(scope, database, &mut list, i as u32, count);
                    producers[node.producer].execute(&mut context);
                }
                list.record(Command::EndScope {
                    scope: scope.id.clone(),
                });
                recorded += list.item_count();
                frame.command_lists.push(list);
            }

            if recorded > scope.estimated_item_count {
                log::warn!(
                    "Scope '{}' recorded {} items but estimated {}",
                    scope.id,
                    recorded,
                    scope.estimated_item_count
                );
            }
            frame.node_lists[handle.index()] = start..frame.command_lists.len();
        }

        self.link_queues(graph, &mut frame);
        self.submit(&mut frame);
        frame
    }

    /// Return command lists for reuse in later frames.
    pub(crate) fn recycle(&mut self, command_lists: Vec<CommandList>) {
        self.command_lists.recycle_all(command_lists);
    }

    /// Add a semaphore for every dependency that crosses a queue or device.
    fn link_queues(&mut self, graph: &FrameGraph, frame: &mut ExecutedFrame) {
        for &(dependent, dependency) in graph.edges() {
            let signal = queue_of(&graph.node(dependency).scope);
            let wait = queue_of(&graph.node(dependent).scope);
            if signal == wait {
                continue;
            }
            let signal_lists = frame.node_lists[dependency.index()].clone();
            let wait_lists = frame.node_lists[dependent.index()].clone();
            if signal_lists.is_empty() || wait_lists.is_empty() {
                continue;
            }

            let semaphore = Semaphore::new(self.next_semaphore_id, signal, wait);
            self.next_semaphore_id += 1;
            log::trace!(
                "Executor: semaphore {} '{}' ({}) -> '{}' ({})",
                semaphore.id(),
                graph.scope_id(dependency),
                signal,
                graph.scope_id(dependent),
                wait
            );
            frame.command_lists[signal_lists.end - 1].push_signal(semaphore.clone());
            frame.command_lists[wait_lists.start].push_wait(semaphore.clone());
            frame.semaphores.push(semaphore);
        }
    }

    fn submit(&mut self, frame: &mut ExecutedFrame) {
        for (index, list) in frame.command_lists.iter().enumerate() {
            match frame
                .submissions
                .iter_mut()
                .find(|submission| submission.queue == list.queue())
            {
                Some(submission) => submission.command_lists.push(index),
                None => frame.submissions.push(QueueSubmission {
                    queue: list.queue(),
                    command_lists: vec![index],
                }),
            }
        }
        for submission in &frame.submissions {
            log::trace!(
                "Executor: submit {} command lists to {}",
                submission.command_lists.len(),
                submission.queue
            );
        }
        frame.fence.signal();
        log::debug!(
            "Executor: {} command lists on {} queues, {} semaphores",
            frame.command_lists.len(),
            frame.submissions.len(),
            frame.semaphores.len()
        );
    }
}

/// Record a clear for every attachment loaded with [`LoadOp::Clear`].
fn record_clears(scope: &Scope, database: &AttachmentDatabase, list: &mut CommandList) {
    for scope_attachment in scope.attachments() {
        let LoadOp::Clear(value) = scope_attachment.load_op() else {
            continue;
        };
        let resolved = database
            .index_of(scope_attachment.attachment())
            .and_then(|index| database.resolved_at(index, scope.device));
        if let Some(resolved) = resolved {
            list.record(Command::Clear {
                attachment: scope_attachment.attachment().clone(),
                resource: resolved.resource,
                value,
            });
        }
    }
}
