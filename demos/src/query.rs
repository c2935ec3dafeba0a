//! Occlusion, timestamp and pipeline statistics queries.
//!
//! `Occlusion` draws a possibly hidden quad, an occluding quad and a
//! bounding box wrapped in an occlusion query, bracketed by timestamps and
//! a statistics query. In [`QueryMode::Predication`] the occlusion result
//! is first copied into a predication buffer by `CopyPredicationBuffer`,
//! and the hidden quad is drawn under predication.
//!
//! Outside predication mode `CopyPredicationBuffer` declares nothing and
//! stays in the graph as an empty scope.

use std::sync::Arc;

use scopegraph::{
    Buffer, BufferBindFlags, BufferDescriptor, Format, FrameGraphBuilder,
    FrameGraphExecuteContext, FrameGraphInterface, Image, ImageBindFlags, ImageDescriptor,
    Interval, LoadOp, PredicationOp, QueryPool, QueryPoolAttachmentKind, QueryType,
    ScopeAttachmentAccess, ScopeAttachmentDescriptor, ScopeId, ScopeProducer,
};
use scopegraph_app::{AppError, SampleComponent, SampleContext};

use crate::{OUTPUT_ATTACHMENT, OUTPUT_HEIGHT, OUTPUT_WIDTH, create_output_image, log_registration};

const PREDICATION_BUFFER: &str = "QueryPredicationBuffer";
const DEPTH: &str = "QueryDepthStencil";

const OCCLUSION_QUERY_COUNT: u32 = 3;
/// Two timestamps per frame.
const TIMESTAMP_QUERY_COUNT: u32 = 6;
const STATISTICS_QUERY_COUNT: u32 = 3;

/// How the occlusion query result is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    /// Results are read back by the host a few frames later.
    #[default]
    Occlusion,
    /// Results drive predicated rendering within the frame.
    Predication,
}

impl QueryMode {
    fn next(self) -> Self {
        match self {
            Self::Occlusion => Self::Predication,
            Self::Predication => Self::Occlusion,
        }
    }
}

/// Query slots used by one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct FrameQueries {
    mode: QueryMode,
    occlusion: u32,
    timestamp: u32,
    statistics: Option<u32>,
    timestamps: bool,
}

struct QueryPools {
    occlusion: Arc<QueryPool>,
    timestamp: Arc<QueryPool>,
    statistics: Arc<QueryPool>,
}

struct CopyPredicationScope {
    id: ScopeId,
    occlusion: Arc<QueryPool>,
    predication_buffer: Arc<Buffer>,
    queries: FrameQueries,
}

impl ScopeProducer for CopyPredicationScope {
    fn scope_id(&self) -> &ScopeId {
        &self.id
    }

    fn prepare(&mut self, frame_graph: &mut FrameGraphInterface<'_>) {
        if self.queries.mode != QueryMode::Predication {
            return;
        }

        log_registration(
            "query",
            frame_graph
                .attachment_database()
                .import_buffer(PREDICATION_BUFFER, &self.predication_buffer),
        );
        frame_graph.use_query_pool(
            &self.occlusion,
            Interval::single(self.queries.occlusion),
            QueryPoolAttachmentKind::Local,
            ScopeAttachmentAccess::Read,
        );
        frame_graph.use_copy_attachment(PREDICATION_BUFFER, ScopeAttachmentAccess::Write);
        frame_graph.set_estimated_item_count(1);
    }

    fn execute(&mut self, context: &mut FrameGraphExecuteContext<'_>) {
        if self.queries.mode != QueryMode::Predication {
            return;
        }
        match context.buffer_view(PREDICATION_BUFFER) {
            Ok(destination) => context.command_list().resolve_queries(
                &self.occlusion,
                Interval::single(self.queries.occlusion),
                &destination,
                0,
            ),
            Err(err) => log::error!("{}: {err}", self.id),
        }
    }
}

struct OcclusionScope {
    id: ScopeId,
    pools: QueryPools,
    queries: FrameQueries,
}

impl ScopeProducer for OcclusionScope {
    fn scope_id(&self) -> &ScopeId {
        &self.id
    }

    fn prepare(&mut self, frame_graph: &mut FrameGraphInterface<'_>) {
        frame_graph.use_color_attachment(
            ScopeAttachmentDescriptor::new(OUTPUT_ATTACHMENT).with_load_op(LoadOp::Load),
        );

        let depth = ImageDescriptor::new_2d(
            ImageBindFlags::DEPTH_STENCIL,
            OUTPUT_WIDTH,
            OUTPUT_HEIGHT,
            Format::Depth32Float,
        );
        log_registration(
            "query",
            frame_graph
                .attachment_database()
                .create_transient_image(DEPTH, depth),
        );
        frame_graph.use_depth_stencil_attachment(
            ScopeAttachmentDescriptor::new(DEPTH).with_load_op(LoadOp::clear_depth(1.0)),
            ScopeAttachmentAccess::Write,
        );

        let occlusion_kind = match self.queries.mode {
            QueryMode::Predication => QueryPoolAttachmentKind::Local,
            QueryMode::Occlusion => QueryPoolAttachmentKind::Global,
        };
        frame_graph.use_query_pool(
            &self.pools.occlusion,
            Interval::single(self.queries.occlusion),
            occlusion_kind,
            ScopeAttachmentAccess::Write,
        );
        if self.queries.timestamps {
            frame_graph.use_query_pool(
                &self.pools.timestamp,
                Interval::new(self.queries.timestamp, self.queries.timestamp + 1),
                QueryPoolAttachmentKind::Global,
                ScopeAttachmentAccess::Write,
            );
        }
        if let Some(index) = self.queries.statistics {
            frame_graph.use_query_pool(
                &self.pools.statistics,
                Interval::single(index),
                QueryPoolAttachmentKind::Global,
                ScopeAttachmentAccess::Write,
            );
        }

        if self.queries.mode == QueryMode::Predication {
            frame_graph.use_predication_attachment(PREDICATION_BUFFER);
        }

        // Hidden quad, occluding quad, bounding box.
        frame_graph.set_estimated_item_count(3);
    }

    fn execute(&mut self, context: &mut FrameGraphExecuteContext<'_>) {
        let queries = self.queries;
        let predicate = match queries.mode {
            QueryMode::Predication => match context.buffer_view(PREDICATION_BUFFER) {
                Ok(view) => Some(view),
                Err(err) => {
                    log::error!("{}: {err}", self.id);
                    None
                }
            },
            QueryMode::Occlusion => None,
        };

        let pools = &self.pools;
        let commands = context.command_list();
        if queries.timestamps {
            commands.write_timestamp(&pools.timestamp, queries.timestamp);
        }
        if let Some(index) = queries.statistics {
            commands.begin_query(&pools.statistics, index);
        }

        match &predicate {
            Some(predicate) => {
                commands.begin_predication(predicate, 0, PredicationOp::EqualZero);
                commands.draw(6, 1);
                commands.end_predication();
            }
            None => commands.draw(6, 1),
        }

        if let Some(index) = queries.statistics {
            commands.end_query(&pools.statistics, index);
        }
        if queries.timestamps {
            commands.write_timestamp(&pools.timestamp, queries.timestamp + 1);
        }

        commands.draw(6, 1);

        commands.begin_query(&pools.occlusion, queries.occlusion);
        commands.draw(6, 1);
        commands.end_query(&pools.occlusion, queries.occlusion);
    }
}

struct Scopes {
    output: Arc<Image>,
    copy: CopyPredicationScope,
    occlusion: OcclusionScope,
}

/// Query pools used as local and global scope attachments.
pub struct QuerySample {
    mode: QueryMode,
    /// Frames between mode switches; `None` keeps the mode fixed.
    mode_period: Option<u64>,
    timestamps: bool,
    pipeline_statistics: bool,
    frame: u64,
    queries: FrameQueries,
    scopes: Option<Scopes>,
}

impl Default for QuerySample {
    fn default() -> Self {
        Self::new(QueryMode::Occlusion).with_mode_period(120)
    }
}

impl QuerySample {
    /// Create the sample in a fixed mode, with timestamps and statistics on.
    pub fn new(mode: QueryMode) -> Self {
        Self {
            mode,
            mode_period: None,
            timestamps: true,
            pipeline_statistics: true,
            frame: 0,
            queries: FrameQueries::default(),
            scopes: None,
        }
    }

    /// Switch mode every `frames` frames.
    pub fn with_mode_period(mut self, frames: u64) -> Self {
        self.mode_period = Some(frames.max(1));
        self
    }

    /// Enable or disable the timestamp pair around the hidden quad.
    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    /// Enable or disable the pipeline statistics query.
    pub fn with_pipeline_statistics(mut self, enabled: bool) -> Self {
        self.pipeline_statistics = enabled;
        self
    }

    /// Current mode.
    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    /// Pick this frame's mode and query slots.
    fn advance(&mut self) -> FrameQueries {
        if let Some(period) = self.mode_period
            && self.frame > 0
            && self.frame % period == 0
        {
            self.mode = self.mode.next();
            log::info!("query: switching to {:?}", self.mode);
        }

        let previous = self.queries;
        let occlusion = match self.mode {
            QueryMode::Occlusion => (previous.occlusion + 1) % OCCLUSION_QUERY_COUNT,
            // Predication consumes the result in the same frame; one slot is enough.
            QueryMode::Predication => 0,
        };
        let timestamp = if self.frame == 0 {
            0
        } else {
            (previous.timestamp + 2) % TIMESTAMP_QUERY_COUNT
        };
        let statistics = self.pipeline_statistics.then(|| {
            previous
                .statistics
                .map_or(0, |index| (index + 1) % STATISTICS_QUERY_COUNT)
        });

        self.frame += 1;
        self.queries = FrameQueries {
            mode: self.mode,
            occlusion,
            timestamp,
            statistics,
            timestamps: self.timestamps,
        };
        self.queries
    }
}

impl SampleComponent for QuerySample {
    fn name(&self) -> &str {
        "query"
    }

    fn activate(&mut self, context: &SampleContext) -> Result<(), AppError> {
        let group = context.device_group();
        let mask = group.all_devices();
        let pools = QueryPools {
            occlusion: group.create_query_pool(
                "QueryOcclusion",
                QueryType::Occlusion,
                OCCLUSION_QUERY_COUNT,
                mask,
            )?,
            timestamp: group.create_query_pool(
                "QueryTimestamp",
                QueryType::Timestamp,
                TIMESTAMP_QUERY_COUNT,
                mask,
            )?,
            statistics: group.create_query_pool(
                "QueryStatistics",
                QueryType::PipelineStatistics,
                STATISTICS_QUERY_COUNT,
                mask,
            )?,
        };
        let predication_buffer = group.create_buffer(
            "QueryPredicationBuffer",
            &BufferDescriptor::new(BufferBindFlags::PREDICATION | BufferBindFlags::COPY_WRITE, 8),
            mask,
        )?;

        self.frame = 0;
        self.queries = FrameQueries::default();
        self.scopes = Some(Scopes {
            output: create_output_image(context, mask)?,
            copy: CopyPredicationScope {
                id: ScopeId::from("CopyPredicationBuffer"),
                occlusion: Arc::clone(&pools.occlusion),
                predication_buffer,
                queries: FrameQueries::default(),
            },
            occlusion: OcclusionScope {
                id: ScopeId::from("Occlusion"),
                pools,
                queries: FrameQueries::default(),
            },
        });
        Ok(())
    }

    fn frame_begin<'p>(
        &'p mut self,
        _context: &SampleContext,
        builder: &mut FrameGraphBuilder<'p>,
    ) {
        scopegraph_core::profile_scope!("QuerySample::frame_begin");

        if self.scopes.is_none() {
            return;
        }
        let queries = self.advance();
        let Some(scopes) = &mut self.scopes else {
            return;
        };

        log_registration(
            "query",
            builder
                .attachment_database()
                .import_image(OUTPUT_ATTACHMENT, &scopes.output),
        );

        scopes.copy.queries = queries;
        scopes.occlusion.queries = queries;
        builder.import_scope_producer(&mut scopes.copy);
        builder.import_scope_producer(&mut scopes.occlusion);
    }

    fn deactivate(&mut self) {
        self.scopes = None;
    }
}
