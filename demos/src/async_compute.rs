//! Scene rendering overlapped with a compute-queue tonemapping chain.
//!
//! Two scene images alternate every frame. While the graphics queue
//! renders shadows and the forward pass into the current scene image, the
//! compute queue builds a luminance pyramid from the previous one and
//! tonemaps it in place; the result is then copied to the output.
//!
//! | Scope | Queue | Reads | Writes |
//! |-------|-------|-------|--------|
//! | `LuminanceMapScope` | graphics | previous scene | luminance map |
//! | `ShadowScope` | graphics | | shadow map |
//! | `LuminanceReduceN` | compute | previous level | level N |
//! | `TonemappingScope` | compute | average luminance | previous scene |
//! | `ForwardScope` | graphics | shadow map | current scene, depth |
//! | `CopyTextureScope` | graphics | previous scene | output |

use std::sync::Arc;

use scopegraph::{
    AttachmentId, Format, FrameGraphBuilder, HardwareQueueClass, Image, ImageBindFlags,
    ImageDescriptor, LoadOp, ScopeAttachmentAccess, ScopeAttachmentDescriptor, ScopeProducer,
    ScopeProducerFunction, empty_compile,
};
use scopegraph_app::{AppError, SampleComponent, SampleContext};

use crate::{OUTPUT_ATTACHMENT, OUTPUT_HEIGHT, OUTPUT_WIDTH, create_output_image, log_registration};

const SCENE_CURRENT: &str = "SceneCurrent";
const SCENE_PREVIOUS: &str = "ScenePrevious";
const SHADOW_MAP: &str = "ShadowMap";
const FORWARD_DEPTH: &str = "ForwardDepthStencil";
const LUMINANCE_MAP: &str = "LuminanceMap";

const SHADOW_MAP_SIZE: u32 = 1024;
const LUMINANCE_MAP_SIZE: u32 = 1024;
/// Threads per group along each axis of the reduce and tonemap shaders.
const THREAD_GROUP_SIZE: u32 = 16;

/// One level of the luminance pyramid.
#[derive(Debug, Clone)]
struct ReduceStep {
    input: AttachmentId,
    output: AttachmentId,
    size: u32,
}

/// Levels from the luminance map down to a single texel.
fn reduce_chain() -> Vec<ReduceStep> {
    let mut steps = Vec::new();
    let mut input = AttachmentId::from(LUMINANCE_MAP);
    let mut input_size = LUMINANCE_MAP_SIZE;
    while input_size > 1 {
        let size = (input_size / (THREAD_GROUP_SIZE * 2)).max(1);
        let output = AttachmentId::new(format!("LuminanceReduce{size}"));
        steps.push(ReduceStep {
            input: input.clone(),
            output: output.clone(),
            size,
        });
        input = output;
        input_size = size;
    }
    steps
}

/// Shadows and forward rendering on graphics, tonemapping on compute.
pub struct AsyncComputeSample {
    async_compute: bool,
    mesh_count: u32,
    scenes: Vec<Arc<Image>>,
    output: Option<Arc<Image>>,
    current_scene: usize,
    producers: Vec<Box<dyn ScopeProducer>>,
}

impl Default for AsyncComputeSample {
    fn default() -> Self {
        Self::new(true)
    }
}

impl AsyncComputeSample {
    /// Create the sample. Without `async_compute` every scope runs on graphics.
    pub fn new(async_compute: bool) -> Self {
        Self {
            async_compute,
            mesh_count: 4,
            scenes: Vec::new(),
            output: None,
            current_scene: 0,
            producers: Vec::new(),
        }
    }

    fn compute_queue(&self) -> HardwareQueueClass {
        if self.async_compute {
            HardwareQueueClass::Compute
        } else {
            HardwareQueueClass::Graphics
        }
    }

    fn luminance_map_scope() -> Box<dyn ScopeProducer> {
        Box::new(ScopeProducerFunction::new(
            "LuminanceMapScope",
            (),
            |frame_graph, _: &mut ()| {
                frame_graph.use_color_attachment(
                    ScopeAttachmentDescriptor::new(LUMINANCE_MAP).with_load_op(LoadOp::DontCare),
                );
                frame_graph.use_shader_attachment(SCENE_PREVIOUS, ScopeAttachmentAccess::Read);
                frame_graph.set_estimated_item_count(1);
            },
            empty_compile,
            |context, _: &()| context.command_list().draw(3, 1),
        ))
    }

    fn shadow_scope(mesh_count: u32) -> Box<dyn ScopeProducer> {
        Box::new(ScopeProducerFunction::new(
            "ShadowScope",
            mesh_count,
            |frame_graph, mesh_count: &mut u32| {
                frame_graph.use_depth_stencil_attachment(
                    ScopeAttachmentDescriptor::new(SHADOW_MAP)
                        .with_load_op(LoadOp::clear_depth(1.0)),
                    ScopeAttachmentAccess::Write,
                );
                frame_graph.set_estimated_item_count(*mesh_count);
            },
            empty_compile,
            |context, _: &u32| {
                for _ in context.submit_range() {
                    context.command_list().draw(36, 1);
                }
            },
        ))
    }

    fn reduce_scope(step: ReduceStep, queue: HardwareQueueClass) -> Box<dyn ScopeProducer> {
        Box::new(ScopeProducerFunction::new(
            step.output.to_string(),
            step,
            move |frame_graph, step: &mut ReduceStep| {
                let flags = ImageBindFlags::SHADER_READ
                    | ImageBindFlags::SHADER_WRITE
                    | ImageBindFlags::COLOR;
                let descriptor =
                    ImageDescriptor::new_2d(flags, step.size, step.size, Format::R32Float);
                log_registration(
                    "async_compute",
                    frame_graph
                        .attachment_database()
                        .create_transient_image(&step.output, descriptor),
                );
                frame_graph.use_shader_attachment(&step.input, ScopeAttachmentAccess::Read);
                frame_graph.use_shader_attachment(&step.output, ScopeAttachmentAccess::Write);
                frame_graph.set_estimated_item_count(1);
                frame_graph.set_hardware_queue_class(queue);
            },
            |context, step: &mut ReduceStep| {
                if let Err(err) = context.image_view(&step.input) {
                    log::error!("{}: {err}", context.scope_id());
                }
            },
            |context, step: &ReduceStep| context.command_list().dispatch(step.size, step.size, 1),
        ))
    }

    fn tonemapping_scope(
        average: AttachmentId,
        queue: HardwareQueueClass,
    ) -> Box<dyn ScopeProducer> {
        Box::new(ScopeProducerFunction::new(
            "TonemappingScope",
            average,
            move |frame_graph, average: &mut AttachmentId| {
                frame_graph.use_shader_attachment(
                    ScopeAttachmentDescriptor::new(SCENE_PREVIOUS).with_load_op(LoadOp::Load),
                    ScopeAttachmentAccess::ReadWrite,
                );
                frame_graph.use_shader_attachment(&*average, ScopeAttachmentAccess::Read);
                frame_graph.set_estimated_item_count(1);
                frame_graph.set_hardware_queue_class(queue);
            },
            empty_compile,
            |context, _: &AttachmentId| {
                context.command_list().dispatch(
                    OUTPUT_WIDTH.div_ceil(THREAD_GROUP_SIZE),
                    OUTPUT_HEIGHT.div_ceil(THREAD_GROUP_SIZE),
                    1,
                )
            },
        ))
    }

    fn forward_scope(mesh_count: u32) -> Box<dyn ScopeProducer> {
        Box::new(ScopeProducerFunction::new(
            "ForwardScope",
            mesh_count,
            |frame_graph, mesh_count: &mut u32| {
                frame_graph.use_color_attachment(
                    ScopeAttachmentDescriptor::new(SCENE_CURRENT)
                        .with_load_op(LoadOp::clear_color(0.0, 0.0, 0.0, 0.0)),
                );
                frame_graph.use_shader_attachment(SHADOW_MAP, ScopeAttachmentAccess::Read);
                frame_graph.use_depth_stencil_attachment(
                    ScopeAttachmentDescriptor::new(FORWARD_DEPTH)
                        .with_load_op(LoadOp::clear_depth(1.0)),
                    ScopeAttachmentAccess::Write,
                );
                frame_graph.set_estimated_item_count(*mesh_count);
            },
            empty_compile,
            |context, _: &u32| {
                for _ in context.submit_range() {
                    context.command_list().draw(36, 1);
                }
            },
        ))
    }

    fn copy_texture_scope() -> Box<dyn ScopeProducer> {
        Box::new(ScopeProducerFunction::new(
            "CopyTextureScope",
            (),
            |frame_graph, _: &mut ()| {
                frame_graph.use_color_attachment(
                    ScopeAttachmentDescriptor::new(OUTPUT_ATTACHMENT).with_load_op(LoadOp::Load),
                );
                frame_graph.use_shader_attachment(SCENE_PREVIOUS, ScopeAttachmentAccess::Read);
                frame_graph.set_estimated_item_count(1);
            },
            empty_compile,
            |context, _: &()| context.command_list().draw(3, 1),
        ))
    }
}

impl SampleComponent for AsyncComputeSample {
    fn name(&self) -> &str {
        "async_compute"
    }

    fn activate(&mut self, context: &SampleContext) -> Result<(), AppError> {
        let group = context.device_group();
        let mask = group.all_devices();
        let scene = ImageDescriptor::new_2d(
            ImageBindFlags::COLOR | ImageBindFlags::SHADER_READ | ImageBindFlags::SHADER_WRITE,
            OUTPUT_WIDTH,
            OUTPUT_HEIGHT,
            Format::Rgba16Float,
        );
        self.scenes = vec![
            group.create_image("Scene0", &scene, mask)?,
            group.create_image("Scene1", &scene, mask)?,
        ];
        self.output = Some(create_output_image(context, mask)?);
        self.current_scene = 0;

        let queue = self.compute_queue();
        let steps = reduce_chain();
        let average = steps
            .last()
            .map_or_else(|| AttachmentId::from(LUMINANCE_MAP), |step| step.output.clone());

        let mut producers = vec![
            Self::luminance_map_scope(),
            Self::shadow_scope(self.mesh_count),
        ];
        producers.extend(steps.into_iter().map(|step| Self::reduce_scope(step, queue)));
        producers.push(Self::tonemapping_scope(average, queue));
        producers.push(Self::forward_scope(self.mesh_count));
        producers.push(Self::copy_texture_scope());
        self.producers = producers;

        log::info!(
            "async_compute: {} scopes, tonemapping on {:?}",
            self.producers.len(),
            queue
        );
        Ok(())
    }

    fn frame_begin<'p>(
        &'p mut self,
        _context: &SampleContext,
        builder: &mut FrameGraphBuilder<'p>,
    ) {
        scopegraph_core::profile_scope!("AsyncComputeSample::frame_begin");

        let Some(output) = &self.output else {
            return;
        };
        let previous_scene = 1 - self.current_scene;

        let database = builder.attachment_database();
        log_registration("async_compute", database.import_image(OUTPUT_ATTACHMENT, output));
        log_registration(
            "async_compute",
            database.import_image(SCENE_CURRENT, &self.scenes[self.current_scene]),
        );
        log_registration(
            "async_compute",
            database.import_image(SCENE_PREVIOUS, &self.scenes[previous_scene]),
        );

        let transients = [
            (
                SHADOW_MAP,
                ImageDescriptor::new_2d(
                    ImageBindFlags::DEPTH_STENCIL | ImageBindFlags::SHADER_READ,
                    SHADOW_MAP_SIZE,
                    SHADOW_MAP_SIZE,
                    Format::Depth32Float,
                ),
            ),
            (
                FORWARD_DEPTH,
                ImageDescriptor::new_2d(
                    ImageBindFlags::DEPTH_STENCIL,
                    OUTPUT_WIDTH,
                    OUTPUT_HEIGHT,
                    Format::Depth24PlusStencil8,
                ),
            ),
            (
                LUMINANCE_MAP,
                ImageDescriptor::new_2d(
                    ImageBindFlags::COLOR | ImageBindFlags::SHADER_READ,
                    LUMINANCE_MAP_SIZE,
                    LUMINANCE_MAP_SIZE,
                    Format::R32Float,
                ),
            ),
        ];
        for (id, descriptor) in transients {
            log_registration("async_compute", database.create_transient_image(id, descriptor));
        }

        // The scene rendered this frame is tonemapped next frame.
        self.current_scene = previous_scene;

        for producer in &mut self.producers {
            builder.import_scope_producer(producer.as_mut());
        }
    }

    fn deactivate(&mut self) {
        self.producers.clear();
        self.scenes.clear();
        self.output = None;
    }
}
