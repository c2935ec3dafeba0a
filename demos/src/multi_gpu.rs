//! Two devices each render half of an image; device 1's half reaches
//! device 0 through a pair of host-visible staging buffers.
//!
//! Per frame:
//!
//! 1. `MultiGPUTriangle0` (device 0) and `MultiGPUTriangle1` (device 1)
//!    render into their own copy of the render target.
//! 2. `MultiGPUCopyToCPU` (device 1) copies its render target into the
//!    device 1 staging buffer.
//! 3. At the start of the next frame the host copies that staging buffer
//!    into the device 0 staging buffer.
//! 4. `MultiGPUCopyToGPU` (device 0) uploads it into the transfer image.
//! 5. `MultiGPUComposite` (device 0) combines the render target and the
//!    transfer image into the output.
//!
//! Nothing orders device 1 work against device 0 work inside a frame; the
//! host copy between frames is the only link.

use std::sync::Arc;

use scopegraph::{
    Buffer, BufferBindFlags, BufferDescriptor, DeviceMask, Format, FrameGraphBuilder,
    FrameGraphError, Image, ImageBindFlags, ImageDescriptor, LoadOp, ScopeAttachmentAccess,
    ScopeAttachmentDescriptor, ScopeProducer, ScopeProducerFunction, empty_compile,
};
use scopegraph_app::{AppError, SampleComponent, SampleContext};

use crate::{OUTPUT_ATTACHMENT, OUTPUT_HEIGHT, OUTPUT_WIDTH, create_output_image, log_registration};

const RENDER_TARGET: &str = "MultiGPURenderTarget";
const TRANSFER_IMAGE: &str = "MultiGPUTransferImage";
const STAGING_TO_GPU: &str = "MultiGPUStagingToGPU";
const STAGING_TO_CPU: &str = "MultiGPUStagingToCPU";

/// Color the device 0 staging buffer starts out with.
const INITIAL_STAGING_TEXEL: u32 = 0xFFFF_00FF;

struct Resources {
    render_target: Arc<Image>,
    transfer_image: Arc<Image>,
    staging_to_gpu: Arc<Buffer>,
    staging_to_cpu: Arc<Buffer>,
    output: Arc<Image>,
}

/// Split-screen rendering across two devices.
#[derive(Default)]
pub struct MultiGpuSample {
    resources: Option<Resources>,
    producers: Vec<Box<dyn ScopeProducer>>,
    host_transfers: u64,
}

impl MultiGpuSample {
    /// Number of staging copies the host has performed.
    pub fn host_transfers(&self) -> u64 {
        self.host_transfers
    }

    fn create_resources(context: &SampleContext) -> Result<Resources, AppError> {
        let group = context.device_group();
        let both = DeviceMask::all(2);
        let first = DeviceMask::single(0);
        let second = DeviceMask::single(1);

        let render_target = group.create_image(
            "MultiGPURenderTarget",
            &ImageDescriptor::new_2d(
                ImageBindFlags::COLOR | ImageBindFlags::SHADER_READ | ImageBindFlags::COPY_READ,
                OUTPUT_WIDTH,
                OUTPUT_HEIGHT,
                Format::Rgba8Unorm,
            ),
            both,
        )?;
        let transfer_image = group.create_image(
            "MultiGPUTransferImage",
            &ImageDescriptor::new_2d(
                ImageBindFlags::SHADER_READ | ImageBindFlags::COPY_WRITE,
                OUTPUT_WIDTH,
                OUTPUT_HEIGHT,
                Format::Rgba8Unorm,
            ),
            first,
        )?;

        let staging_size = u64::from(OUTPUT_WIDTH) * u64::from(OUTPUT_HEIGHT) * 4;
        let staging = BufferDescriptor::new(
            BufferBindFlags::COPY_READ | BufferBindFlags::COPY_WRITE,
            staging_size,
        );
        let staging_to_gpu = group.create_host_buffer("MultiGPUStagingToGPU", &staging, first)?;
        let staging_to_cpu = group.create_host_buffer("MultiGPUStagingToCPU", &staging, second)?;

        let initial: Vec<u8> = INITIAL_STAGING_TEXEL
            .to_le_bytes()
            .into_iter()
            .cycle()
            .take(staging_size as usize)
            .collect();
        staging_to_gpu.write_host(0, 0, &initial)?;

        Ok(Resources {
            render_target,
            transfer_image,
            staging_to_gpu,
            staging_to_cpu,
            output: create_output_image(context, first)?,
        })
    }

    fn triangle_scope(device: u32) -> Box<dyn ScopeProducer> {
        Box::new(
            ScopeProducerFunction::new(
                format!("MultiGPUTriangle{device}"),
                (),
                |frame_graph, _: &mut ()| {
                    frame_graph.use_color_attachment(
                        ScopeAttachmentDescriptor::new(RENDER_TARGET)
                            .with_load_op(LoadOp::clear_color(0.0, 0.0, 0.0, 0.0)),
                    );
                    frame_graph.set_estimated_item_count(1);
                },
                empty_compile,
                |context, _: &()| context.command_list().draw(3, 1),
            )
            .with_device_index(device),
        )
    }

    fn copy_to_cpu_scope() -> Box<dyn ScopeProducer> {
        Box::new(
            ScopeProducerFunction::new(
                "MultiGPUCopyToCPU",
                (),
                |frame_graph, _: &mut ()| {
                    frame_graph.use_copy_attachment(STAGING_TO_CPU, ScopeAttachmentAccess::Write);
                    frame_graph.use_copy_attachment(RENDER_TARGET, ScopeAttachmentAccess::Read);
                    frame_graph.execute_after("MultiGPUTriangle1");
                    frame_graph.set_estimated_item_count(1);
                },
                empty_compile,
                |context, _: &()| {
                    let views = context
                        .image_view(RENDER_TARGET)
                        .and_then(|source| Ok((source, context.buffer_view(STAGING_TO_CPU)?)));
                    match views {
                        Ok((source, destination)) => {
                            context.command_list().copy_image_to_buffer(&source, &destination)
                        }
                        Err(err) => log::error!("MultiGPUCopyToCPU: {err}"),
                    }
                },
            )
            .with_device_index(1),
        )
    }

    fn copy_to_gpu_scope() -> Box<dyn ScopeProducer> {
        Box::new(
            ScopeProducerFunction::new(
                "MultiGPUCopyToGPU",
                (),
                |frame_graph, _: &mut ()| {
                    frame_graph.use_copy_attachment(TRANSFER_IMAGE, ScopeAttachmentAccess::Write);
                    frame_graph.use_copy_attachment(STAGING_TO_GPU, ScopeAttachmentAccess::Read);
                    frame_graph.set_estimated_item_count(1);
                },
                empty_compile,
                |context, _: &()| {
                    let views = context
                        .buffer_view(STAGING_TO_GPU)
                        .and_then(|source| Ok((source, context.image_view(TRANSFER_IMAGE)?)));
                    match views {
                        Ok((source, destination)) => {
                            context.command_list().copy_buffer_to_image(&source, &destination)
                        }
                        Err(err) => log::error!("MultiGPUCopyToGPU: {err}"),
                    }
                },
            )
            .with_device_index(0),
        )
    }

    fn composite_scope() -> Box<dyn ScopeProducer> {
        Box::new(
            ScopeProducerFunction::new(
                "MultiGPUComposite",
                (),
                |frame_graph, _: &mut ()| {
                    frame_graph.use_shader_attachment(RENDER_TARGET, ScopeAttachmentAccess::Read);
                    frame_graph.use_shader_attachment(TRANSFER_IMAGE, ScopeAttachmentAccess::Read);
                    frame_graph.use_color_attachment(
                        ScopeAttachmentDescriptor::new(OUTPUT_ATTACHMENT)
                            .with_load_op(LoadOp::DontCare),
                    );
                    frame_graph.execute_after("MultiGPUTriangle0");
                    frame_graph.execute_after("MultiGPUCopyToGPU");
                    frame_graph.set_estimated_item_count(1);
                },
                empty_compile,
                |context, _: &()| context.command_list().draw(3, 1),
            )
            .with_device_index(0),
        )
    }

    /// Move last frame's device 1 readback into the device 0 upload buffer.
    fn transfer_staging(resources: &Resources) -> Result<(), FrameGraphError> {
        let bytes = resources.staging_to_cpu.read_host(1)?;
        resources.staging_to_gpu.write_host(0, 0, &bytes)
    }
}

impl SampleComponent for MultiGpuSample {
    fn name(&self) -> &str {
        "multi_gpu"
    }

    fn activate(&mut self, context: &SampleContext) -> Result<(), AppError> {
        if context.device_count() < 2 {
            return Err(AppError::ActivationFailed {
                sample: self.name().to_string(),
                reason: format!("needs 2 devices, found {}", context.device_count()),
            });
        }

        self.resources = Some(Self::create_resources(context)?);
        // Import order follows the data flow: readback before upload before composite.
        self.producers = vec![
            Self::triangle_scope(0),
            Self::triangle_scope(1),
            Self::copy_to_cpu_scope(),
            Self::copy_to_gpu_scope(),
            Self::composite_scope(),
        ];
        self.host_transfers = 0;
        Ok(())
    }

    fn frame_begin<'p>(
        &'p mut self,
        _context: &SampleContext,
        builder: &mut FrameGraphBuilder<'p>,
    ) {
        scopegraph_core::profile_scope!("MultiGpuSample::frame_begin");

        let Some(resources) = &self.resources else {
            return;
        };

        match Self::transfer_staging(resources) {
            Ok(()) => self.host_transfers += 1,
            Err(err) => log::warn!("multi_gpu: host staging copy failed: {err}"),
        }

        let database = builder.attachment_database();
        let registrations = [
            database.import_image(RENDER_TARGET, &resources.render_target),
            database.import_image(TRANSFER_IMAGE, &resources.transfer_image),
            database.import_buffer(STAGING_TO_GPU, &resources.staging_to_gpu),
            database.import_buffer(STAGING_TO_CPU, &resources.staging_to_cpu),
            database.import_image(OUTPUT_ATTACHMENT, &resources.output),
        ];
        for result in registrations {
            log_registration("multi_gpu", result);
        }

        for producer in &mut self.producers {
            builder.import_scope_producer(producer.as_mut());
        }
    }

    fn deactivate(&mut self) {
        self.producers.clear();
        self.resources = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::run_sample;
    use scopegraph::{DeviceGroup, Semaphore};

    #[test]
    fn test_devices_only_meet_through_host_staging() {
        let mut sample = MultiGpuSample::default();
        let reports = run_sample(&mut sample, 2, 3);

        for report in &reports {
            assert_eq!(
                report.scope_names(),
                [
                    "MultiGPUTriangle0",
                    "MultiGPUTriangle1",
                    "MultiGPUCopyToCPU",
                    "MultiGPUCopyToGPU",
                    "MultiGPUComposite"
                ]
            );
            assert!(report.has_dependency("MultiGPUTriangle1", "MultiGPUCopyToCPU"));
            assert!(report.has_dependency("MultiGPUCopyToGPU", "MultiGPUComposite"));
            assert!(report.has_dependency("MultiGPUTriangle0", "MultiGPUComposite"));
            assert!(!report.has_dependency("MultiGPUTriangle1", "MultiGPUComposite"));
            assert!(!report.semaphores().iter().any(Semaphore::is_cross_device));

            assert!(report
                .scope_command_lists("MultiGPUCopyToCPU", 1)
                .iter()
                .all(|list| list.device() == 1));
        }
        assert_eq!(sample.host_transfers(), 3);
    }

    #[test]
    fn test_render_target_has_a_copy_per_device() {
        let mut sample = MultiGpuSample::default();
        let reports = run_sample(&mut sample, 2, 1);

        let resource_on = |scope: &str, device| {
            reports[0]
                .scope(scope, device)
                .and_then(|scheduled| {
                    scheduled
                        .attachments
                        .iter()
                        .find(|used| used.attachment.as_str() == RENDER_TARGET)
                })
                .map(|used| used.resource)
        };
        assert!(resource_on("MultiGPUTriangle0", 0).is_some());
        assert_ne!(
            resource_on("MultiGPUTriangle0", 0),
            resource_on("MultiGPUTriangle1", 1)
        );
    }

    #[test]
    fn test_host_copy_overwrites_upload_buffer() {
        let group = DeviceGroup::new(2).unwrap();
        let context = SampleContext::new(group);
        let resources = MultiGpuSample::create_resources(&context).unwrap();

        let before = resources.staging_to_gpu.read_host(0).unwrap();
        assert_eq!(&before[..4], &INITIAL_STAGING_TEXEL.to_le_bytes());

        resources.staging_to_cpu.write_host(1, 0, &[7, 7, 7, 7]).unwrap();
        MultiGpuSample::transfer_staging(&resources).unwrap();
        assert_eq!(&resources.staging_to_gpu.read_host(0).unwrap()[..4], &[7, 7, 7, 7]);
    }

    #[test]
    fn test_single_device_fails_to_activate() {
        let group = DeviceGroup::new(1).unwrap();
        let context = SampleContext::new(group);
        let mut sample = MultiGpuSample::default();

        assert!(matches!(
            sample.activate(&context),
            Err(AppError::ActivationFailed { .. })
        ));
    }
}
