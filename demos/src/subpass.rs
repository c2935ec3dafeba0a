//! Deferred shading with the G-buffer read back as subpass inputs.
//!
//! `GBufferScope` renders the meshes into three transient color targets and
//! a transient depth buffer. `CompositionScope` reads them as subpass inputs
//! and writes the lit result into the output image.

use std::sync::Arc;

use scopegraph::{
    Format, FrameGraphBuilder, Image, ImageBindFlags, ImageDescriptor, ImageView, LoadOp,
    ScopeAttachmentAccess, ScopeAttachmentDescriptor, ScopeProducer, ScopeProducerFunction,
    empty_compile,
};
use scopegraph_app::{AppError, SampleComponent, SampleContext};

use crate::{OUTPUT_ATTACHMENT, OUTPUT_HEIGHT, OUTPUT_WIDTH, create_output_image, log_registration};

const POSITION: &str = "SubpassPosition";
const NORMAL: &str = "SubpassNormal";
const ALBEDO: &str = "SubpassAlbedo";
const DEPTH: &str = "SubpassDepth";

/// Vertices of one mesh draw.
const MESH_VERTEX_COUNT: u32 = 36;

/// G-buffer written by one scope and consumed by the next as subpass inputs.
pub struct SubpassSample {
    mesh_count: u32,
    output: Option<Arc<Image>>,
    producers: Vec<Box<dyn ScopeProducer>>,
}

impl Default for SubpassSample {
    fn default() -> Self {
        Self::new(5)
    }
}

impl SubpassSample {
    /// Create the sample drawing `mesh_count` meshes into the G-buffer.
    pub fn new(mesh_count: u32) -> Self {
        Self {
            mesh_count,
            output: None,
            producers: Vec::new(),
        }
    }

    fn gbuffer_scope(mesh_count: u32) -> Box<dyn ScopeProducer> {
        Box::new(ScopeProducerFunction::new(
            "GBufferScope",
            mesh_count,
            |frame_graph, mesh_count: &mut u32| {
                for target in [POSITION, NORMAL, ALBEDO] {
                    frame_graph.use_color_attachment(
                        ScopeAttachmentDescriptor::new(target)
                            .with_load_op(LoadOp::clear_color(0.0, 0.0, 0.0, 0.0)),
                    );
                }
                frame_graph.use_depth_stencil_attachment(
                    ScopeAttachmentDescriptor::new(DEPTH).with_load_op(LoadOp::clear_depth(1.0)),
                    ScopeAttachmentAccess::Write,
                );
                frame_graph.set_estimated_item_count(*mesh_count);
            },
            empty_compile,
            |context, _mesh_count: &u32| {
                for _ in context.submit_range() {
                    context.command_list().draw(MESH_VERTEX_COUNT, 1);
                }
            },
        ))
    }

    fn composition_scope() -> Box<dyn ScopeProducer> {
        Box::new(ScopeProducerFunction::new(
            "CompositionScope",
            Vec::<ImageView>::new(),
            |frame_graph, _inputs: &mut Vec<ImageView>| {
                for input in [POSITION, NORMAL, ALBEDO] {
                    frame_graph.use_subpass_input_attachment(input);
                }
                frame_graph.use_depth_stencil_attachment(DEPTH, ScopeAttachmentAccess::Read);
                frame_graph.use_color_attachment(
                    ScopeAttachmentDescriptor::new(OUTPUT_ATTACHMENT)
                        .with_load_op(LoadOp::DontCare),
                );
                frame_graph.set_estimated_item_count(1);
            },
            |context, inputs: &mut Vec<ImageView>| {
                inputs.clear();
                for input in [POSITION, NORMAL, ALBEDO] {
                    match context.image_view(input) {
                        Ok(view) => inputs.push(view),
                        Err(err) => log::error!("CompositionScope: {err}"),
                    }
                }
            },
            |context, inputs: &Vec<ImageView>| {
                log::trace!(
                    "CompositionScope: shading from {} subpass inputs",
                    inputs.len()
                );
                context.command_list().draw(3, 1);
            },
        ))
    }
}

impl SampleComponent for SubpassSample {
    fn name(&self) -> &str {
        "subpass"
    }

    fn activate(&mut self, context: &SampleContext) -> Result<(), AppError> {
        self.output = Some(create_output_image(context, context.device_group().all_devices())?);
        self.producers = vec![Self::gbuffer_scope(self.mesh_count), Self::composition_scope()];
        Ok(())
    }

    fn frame_begin<'p>(
        &'p mut self,
        _context: &SampleContext,
        builder: &mut FrameGraphBuilder<'p>,
    ) {
        scopegraph_core::profile_scope!("SubpassSample::frame_begin");

        let Some(output) = &self.output else {
            return;
        };
        let database = builder.attachment_database();
        log_registration(self.name(), database.import_image(OUTPUT_ATTACHMENT, output));

        let color_flags = ImageBindFlags::COLOR | ImageBindFlags::SUBPASS_INPUT;
        let targets = [
            (POSITION, Format::Rgba16Float, color_flags),
            (NORMAL, Format::Rgba16Float, color_flags),
            (ALBEDO, Format::Rgba8Unorm, color_flags),
            (
                DEPTH,
                Format::Depth32Float,
                ImageBindFlags::DEPTH_STENCIL | ImageBindFlags::SUBPASS_INPUT,
            ),
        ];
        for (id, format, flags) in targets {
            let descriptor = ImageDescriptor::new_2d(flags, OUTPUT_WIDTH, OUTPUT_HEIGHT, format);
            log_registration(self.name(), database.create_transient_image(id, descriptor));
        }

        for producer in &mut self.producers {
            builder.import_scope_producer(producer.as_mut());
        }
    }

    fn deactivate(&mut self) {
        self.producers.clear();
        self.output = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::run_sample;
    use scopegraph::{ResourceState, ScopeAttachmentUsage};

    #[test]
    fn test_composition_reads_gbuffer_as_subpass_inputs() {
        let mut sample = SubpassSample::new(3);
        let reports = run_sample(&mut sample, 1, 2);

        for report in &reports {
            assert_eq!(report.scope_names(), ["GBufferScope", "CompositionScope"]);
            assert!(report.has_dependency("GBufferScope", "CompositionScope"));

            let composition = report.scope("CompositionScope", 0).unwrap();
            let inputs = composition
                .attachments
                .iter()
                .filter(|used| used.usage == ScopeAttachmentUsage::SubpassInput)
                .count();
            assert_eq!(inputs, 3);

            let transitions: Vec<_> = composition
                .barriers
                .iter()
                .map(|barrier| (barrier.attachment.as_str(), barrier.after))
                .collect();
            assert!(transitions.contains(&(ALBEDO, ResourceState::SubpassInput)));
            assert!(transitions.contains(&(DEPTH, ResourceState::DepthStencilRead)));
        }
    }

    #[test]
    fn test_gbuffer_draws_every_mesh() {
        let mut sample = SubpassSample::new(4);
        let reports = run_sample(&mut sample, 1, 1);

        let draws: u32 = reports[0]
            .scope_command_lists("GBufferScope", 0)
            .iter()
            .map(|list| list.item_count())
            .sum();
        assert_eq!(draws, 4);
        assert_eq!(reports[0].heap_statistics()[0].attachment_count, 4);
    }
}
