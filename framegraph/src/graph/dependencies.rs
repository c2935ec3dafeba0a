//! Declaration validation and dependency derivation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{FrameGraph, NodeHandle};
use crate::attachment::{AttachmentDatabase, AttachmentKind};
use crate::device::DeviceIndex;
use crate::error::FrameGraphError;
use crate::scope::{QueryPoolAttachmentKind, ScopeAttachmentAccess, ScopeId};
use crate::types::Interval;

/// Access history of one attachment on one device.
#[derive(Default)]
struct AccessHistory {
    last_writer: Option<NodeHandle>,
    readers: Vec<NodeHandle>,
}

impl AccessHistory {
    /// Record an access by `node` and return the nodes it must run after.
    fn access(
        &mut self,
        node: NodeHandle,
        access: ScopeAttachmentAccess,
        out: &mut Vec<NodeHandle>,
    ) {
        if let Some(writer) = self.last_writer {
            out.push(writer);
        }
        if access.writes() {
            out.extend(self.readers.drain(..).filter(|&reader| reader != node));
            self.last_writer = Some(node);
        } else {
            self.readers.push(node);
        }
    }
}

/// Validate every node's declarations and derive the dependency edges.
pub(crate) fn build_dependencies(
    graph: &mut FrameGraph,
    database: &AttachmentDatabase,
) -> Result<(), FrameGraphError> {
    scopegraph_core::profile_scope!("build_dependencies");

    validate(graph, database)?;

    let mut edges: Vec<(NodeHandle, NodeHandle)> = Vec::new();
    attachment_edges(graph, database, &mut edges)?;
    query_edges(graph, &mut edges);
    explicit_edges(graph, &mut edges)?;

    for (dependent, dependency) in edges {
        graph.add_dependency(dependent, dependency);
    }
    log::debug!(
        "FrameGraph: {} nodes, {} edges",
        graph.len(),
        graph.edges().len()
    );
    Ok(())
}

fn validate(graph: &FrameGraph, database: &AttachmentDatabase) -> Result<(), FrameGraphError> {
    for node in graph.nodes() {
        let scope = &node.scope;
        let mut declared = HashSet::new();

        for scope_attachment in scope.attachments() {
            let id = scope_attachment.attachment();
            let attachment = database
                .attachment(id)
                .ok_or_else(|| FrameGraphError::UnknownAttachment(id.clone()))?;

            if !declared.insert(id.as_str()) {
                return Err(FrameGraphError::DuplicateScopeAttachment {
                    scope: scope.id.clone(),
                    attachment: id.clone(),
                });
            }

            let usage = scope_attachment.usage();
            if !usage.supports(attachment.kind()) {
                return Err(FrameGraphError::InvalidUsage {
                    scope: scope.id.clone(),
                    attachment: id.clone(),
                    usage,
                });
            }

            if attachment.is_transient() {
                continue;
            }
            let compatible = match attachment.kind() {
                AttachmentKind::Image => attachment.image_descriptor().is_some_and(|desc| {
                    desc.bind_flags
                        .contains(scope_attachment.required_image_flags())
                }),
                AttachmentKind::Buffer => attachment.buffer_descriptor().is_some_and(|desc| {
                    desc.bind_flags
                        .contains(scope_attachment.required_buffer_flags())
                }),
            };
            if !compatible {
                return Err(FrameGraphError::IncompatibleBindFlags {
                    scope: scope.id.clone(),
                    attachment: id.clone(),
                    usage,
                });
            }
            if attachment.imported_resource(scope.device).is_none() {
                return Err(FrameGraphError::AttachmentNotResolved {
                    attachment: id.clone(),
                    device: scope.device,
                });
            }
        }

        for query in scope.query_pools() {
            let pool = query.pool();
            if !pool.contains(query.interval()) {
                return Err(FrameGraphError::InvalidQueryInterval {
                    scope: scope.id.clone(),
                    pool: pool.label().to_string(),
                    interval: query.interval(),
                    query_count: pool.query_count(),
                });
            }
            if pool.device_resource(scope.device).is_none() {
                return Err(FrameGraphError::InvalidDevice {
                    device: scope.device,
                    device_count: pool.device_mask().count(),
                });
            }
        }
    }
    Ok(())
}

fn attachment_edges(
    graph: &FrameGraph,
    database: &AttachmentDatabase,
    edges: &mut Vec<(NodeHandle, NodeHandle)>,
) -> Result<(), FrameGraphError> {
    let mut history: HashMap<(usize, DeviceIndex), AccessHistory> = HashMap::new();
    let mut dependencies = Vec::new();

    for handle in graph.handles() {
        let scope = &graph.node(handle).scope;
        for scope_attachment in scope.attachments() {
            let id = scope_attachment.attachment();
            let index = database
                .index_of(id)
                .ok_or_else(|| FrameGraphError::UnknownAttachment(id.clone()))?;
            let access = scope_attachment.access();
            let entry = history.entry((index, scope.device)).or_default();

            // Loading or read-modify-write of fresh memory reads garbage too.
            if access.reads()
                && entry.last_writer.is_none()
                && database.attachment_at(index).is_transient()
            {
                return Err(FrameGraphError::ReadBeforeWrite {
                    scope: scope.id.clone(),
                    attachment: id.clone(),
                    device: scope.device,
                });
            }

            dependencies.clear();
            entry.access(handle, access, &mut dependencies);
            edges.extend(dependencies.iter().map(|&dependency| (handle, dependency)));
        }
    }
    Ok(())
}

fn query_edges(graph: &FrameGraph, edges: &mut Vec<(NodeHandle, NodeHandle)>) {
    struct QueryUse {
        node: NodeHandle,
        interval: Interval,
        writes: bool,
    }

    let mut uses: HashMap<(usize, DeviceIndex), Vec<QueryUse>> = HashMap::new();
    for handle in graph.handles() {
        let scope = &graph.node(handle).scope;
        for query in scope.query_pools() {
            if query.kind() == QueryPoolAttachmentKind::Global {
                continue;
            }
            let key = (Arc::as_ptr(query.pool()) as usize, scope.device);
            let previous = uses.entry(key).or_default();
            let writes = query.access().writes();
            for earlier in previous.iter() {
                if earlier.node != handle
                    && (earlier.writes || writes)
                    && earlier.interval.overlaps(&query.interval())
                {
                    edges.push((handle, earlier.node));
                }
            }
            previous.push(QueryUse {
                node: handle,
                interval: query.interval(),
                writes,
            });
        }
    }
}

/// Nodes named by an ordering request from a scope on `device`.
///
/// A scope running on the same device is preferred; otherwise every
/// device running it is matched.
fn resolve_ordering(
    graph: &FrameGraph,
    scope: &ScopeId,
    referenced: &ScopeId,
    device: DeviceIndex,
) -> Result<Vec<NodeHandle>, FrameGraphError> {
    let matches: Vec<(NodeHandle, DeviceIndex)> = graph.find_scope(referenced).collect();
    if matches.is_empty() {
        return Err(FrameGraphError::UnknownScope {
            scope: scope.clone(),
            referenced: referenced.clone(),
        });
    }
    let same_device: Vec<NodeHandle> = matches
        .iter()
        .filter(|(_, other)| *other == device)
        .map(|(handle, _)| *handle)
        .collect();
    if same_device.is_empty() {
        Ok(matches.into_iter().map(|(handle, _)| handle).collect())
    } else {
        Ok(same_device)
    }
}

fn explicit_edges(
    graph: &FrameGraph,
    edges: &mut Vec<(NodeHandle, NodeHandle)>,
) -> Result<(), FrameGraphError> {
    for handle in graph.handles() {
        let scope = &graph.node(handle).scope;
        for after in &scope.execute_after {
            for other in resolve_ordering(graph, &scope.id, after, scope.device)? {
                edges.push((handle, other));
            }
        }
        for before in &scope.execute_before {
            for other in resolve_ordering(graph, &scope.id, before, scope.device)? {
                edges.push((other, handle));
            }
        }
    }
    Ok(())
}
