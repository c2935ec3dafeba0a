//! The per-frame driver.

use std::collections::HashSet;
use std::sync::Arc;

use scopegraph_core::pool::{FramePool, Poolable};

use crate::attachment::{AttachmentDatabase, ResolvedResource};
use crate::compiler::{
    CompiledSchedule, ExecutionOrdering, TransientAllocator, compile_into, plan_barriers,
    transient_lifetimes,
};
use crate::config::{FrameGraphConfig, ValidationMode};
use crate::device::DeviceGroup;
use crate::error::FrameGraphError;
use crate::executor::Executor;
use crate::graph::{FrameGraph, FrameGraphBuilder, build_dependencies, prepare_scopes};
use crate::report::{FrameReport, ResolvedScopeAttachment, ScheduledDependency, ScheduledScope};
use crate::scope::{FrameGraphCompileContext, ScopeProducer};

/// Builds, compiles and executes one frame graph per frame.
///
/// # Frame Flow
///
/// 1. [`begin_frame`](Self::begin_frame) hands out a [`FrameGraphBuilder`]
/// 2. The host imports resources and scope producers into it
/// 3. [`end_frame`](Self::end_frame) runs, in order:
///    Prepare, validation and dependency derivation, scheduling,
///    transient allocation, barrier planning, Compile, Execute
///
/// A configuration error aborts the frame before any scope executes. In
/// [`ValidationMode::Release`] the error is logged and returned; in
/// [`ValidationMode::Strict`] it panics.
///
/// # Example
///
/// ```
/// use scopegraph::{
///     DeviceGroup, FrameGraphConfig, FrameGraphInterface, FrameGraphSystem,
///     ScopeAttachmentAccess, ScopeProducerFunction, empty_compile, BufferBindFlags,
///     BufferDescriptor,
/// };
///
/// let group = DeviceGroup::new(1).unwrap();
/// let mut system = FrameGraphSystem::new(group, FrameGraphConfig::default());
///
/// let mut fill = ScopeProducerFunction::new(
///     "fill",
///     (),
///     |frame_graph: &mut FrameGraphInterface<'_>, _: &mut ()| {
///         frame_graph
///             .attachment_database()
///             .create_transient_buffer(
///                 "scratch",
///                 BufferDescriptor::new(BufferBindFlags::SHADER_READ_WRITE, 1024),
///             )
///             .unwrap();
///         frame_graph.use_shader_attachment("scratch", ScopeAttachmentAccess::Write);
///         frame_graph.set_estimated_item_count(1);
///     },
///     empty_compile,
///     |context, _| context.command_list().dispatch(4, 1, 1),
/// );
///
/// let mut builder = system.begin_frame();
/// builder.import_scope_producer(&mut fill);
/// let report = system.end_frame(builder).unwrap();
/// assert_eq!(report.scope_names(), vec!["fill"]);
/// ```
#[derive(Debug)]
pub struct FrameGraphSystem {
    device_group: Arc<DeviceGroup>,
    config: FrameGraphConfig,
    frame_index: u64,
    databases: FramePool<AttachmentDatabase>,
    graph: FrameGraph,
    schedule: CompiledSchedule,
    executor: Executor,
}

impl FrameGraphSystem {
    /// Create a system scheduling work for a device group.
    pub fn new(device_group: Arc<DeviceGroup>, config: FrameGraphConfig) -> Self {
        log::info!(
            "FrameGraphSystem: {} device(s), aliasing {}, {:?} validation",
            device_group.device_count(),
            if config.aliasing { "on" } else { "off" },
            config.validation
        );
        Self {
            device_group,
            config,
            frame_index: 0,
            databases: FramePool::new(),
            graph: FrameGraph::default(),
            schedule: CompiledSchedule::default(),
            executor: Executor::new(),
        }
    }

    /// The device group.
    pub fn device_group(&self) -> &Arc<DeviceGroup> {
        &self.device_group
    }

    /// Current configuration.
    pub fn config(&self) -> &FrameGraphConfig {
        &self.config
    }

    /// Replace the configuration; takes effect on the next frame.
    pub fn set_config(&mut self, config: FrameGraphConfig) {
        self.config = config;
    }

    /// Index of the next frame.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Start a frame.
    pub fn begin_frame<'p>(&mut self) -> FrameGraphBuilder<'p> {
        self.device_group.cleanup_dead_resources();
        FrameGraphBuilder::new(self.databases.acquire(), self.frame_index)
    }

    /// Build, compile and execute the frame.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error found. Nothing is executed
    /// and imported resource states are left untouched in that case.
    ///
    /// # Panics
    ///
    /// Panics on error when the validation mode is [`ValidationMode::Strict`].
    pub fn end_frame(
        &mut self,
        builder: FrameGraphBuilder<'_>,
    ) -> Result<FrameReport, FrameGraphError> {
        scopegraph_core::profile_function!();

        let frame_index = builder.frame_index();
        let (mut database, mut producers) = builder.into_parts();
        self.graph.reset();
        self.schedule.reset();

        let result = self.run_frame(frame_index, &mut database, &mut producers);
        self.databases.recycle(database);
        self.frame_index = frame_index + 1;
        scopegraph_core::frame_mark!();

        match result {
            Ok(report) => Ok(report),
            Err(err) => {
                log::error!("Frame {frame_index} skipped: {err}");
                if self.config.validation == ValidationMode::Strict {
                    panic!("frame graph validation failed: {err}");
                }
                Err(err)
            }
        }
    }

    /// Return a finished frame's command lists for reuse.
    ///
    /// Waits for the frame's fence first.
    pub fn recycle(&mut self, report: FrameReport) {
        report.fence().wait();
        self.executor.recycle(report.into_command_lists());
    }

    fn run_frame(
        &mut self,
        frame_index: u64,
        database: &mut AttachmentDatabase,
        producers: &mut [&mut dyn ScopeProducer],
    ) -> Result<FrameReport, FrameGraphError> {
        let Self {
            device_group,
            config,
            graph,
            schedule,
            executor,
            ..
        } = self;

        prepare_scopes(producers, database, device_group, graph)?;
        build_dependencies(graph, database)?;
        compile_into(graph, schedule)?;
        let order = schedule.order();

        // Transient allocation
        let usages = transient_lifetimes(graph, order, database);
        let ordering = ExecutionOrdering::new(graph, order);
        let allocator = TransientAllocator::new(config.aliasing, config.heap_alignment);
        let (placements, heap_statistics) = allocator.allocate(&usages, &ordering);
        let aliased: HashSet<_> = placements
            .iter()
            .filter(|placement| placement.aliased)
            .map(|placement| (placement.attachment, placement.device))
            .collect();
        for placement in &placements {
            database.resolve(
                placement.attachment,
                placement.device,
                ResolvedResource {
                    resource: device_group.allocate_resource_id(),
                    placement: Some(placement.placement),
                },
            );
        }
        for index in 0..database.len() {
            let attachment = database.attachment_at(index);
            if attachment.is_transient() {
                continue;
            }
            let resources: Vec<_> = (0..device_group.device_count())
                .filter_map(|device| {
                    attachment
                        .imported_resource(device)
                        .map(|resource| (device, resource))
                })
                .collect();
            for (device, resource) in resources {
                database.resolve(
                    index,
                    device,
                    ResolvedResource {
                        resource,
                        placement: None,
                    },
                );
            }
        }
        for stats in &heap_statistics {
            log::debug!(
                "Transient heap device {}: {} bytes for {} attachments ({} bytes without aliasing)",
                stats.device,
                stats.heap_size,
                stats.attachment_count,
                stats.unaliased_size
            );
            scopegraph_core::profile_plot!("transient_heap_bytes", stats.heap_size);
        }

        let barriers = plan_barriers(graph, order, database, &aliased);

        {
            scopegraph_core::profile_scope!("compile_scopes");
            for &handle in order {
                let node = graph.node(handle);
                let context = FrameGraphCompileContext::new(&node.scope, database);
                producers[node.producer].compile(&context);
            }
        }

        let executed = executor.execute(
            graph,
            order,
            &barriers.per_node,
            producers,
            database,
            config.items_per_command_list,
        );

        for &(index, device, state) in &barriers.final_states {
            database.attachment_at(index).store_final_state(device, state);
        }

        let mut scopes = Vec::with_capacity(order.len());
        for &handle in order {
            let scope = &graph.node(handle).scope;
            let attachments = scope
                .attachments()
                .iter()
                .filter_map(|scope_attachment| {
                    let index = database.index_of(scope_attachment.attachment())?;
                    let resolved = database.resolved_at(index, scope.device)?;
                    Some(ResolvedScopeAttachment {
                        attachment: scope_attachment.attachment().clone(),
                        usage: scope_attachment.usage(),
                        access: scope_attachment.access(),
                        lifetime: database.attachment_at(index).lifetime(),
                        resource: resolved.resource,
                        placement: resolved.placement,
                    })
                })
                .collect();
            scopes.push(ScheduledScope {
                scope: scope.id.clone(),
                device: scope.device,
                queue: scope.queue,
                attachments,
                barriers: barriers.per_node[handle.index()].clone(),
                command_lists: executed.node_lists[handle.index()].clone(),
            });
        }

        let dependencies = graph
            .edges()
            .iter()
            .map(|&(dependent, dependency)| {
                let before = &graph.node(dependency).scope;
                let after = &graph.node(dependent).scope;
                ScheduledDependency {
                    before: (before.id.clone(), before.device),
                    after: (after.id.clone(), after.device),
                }
            })
            .collect();

        log::debug!(
            "Frame {}: executed {} scopes, {} barriers",
            frame_index,
            scopes.len(),
            barriers.per_node.iter().map(Vec::len).sum::<usize>()
        );

        Ok(FrameReport {
            frame_index,
            scopes,
            dependencies,
            command_lists: executed.command_lists,
            submissions: executed.submissions,
            semaphores: executed.semaphores,
            heap_statistics,
            fence: executed.fence,
        })
    }
}
