//! The headless host loop.

use std::time::Instant;

use scopegraph::{DeviceGroup, FrameGraphSystem};

use crate::args::AppArgs;
use crate::context::{FrameStatistics, SampleContext};
use crate::error::AppError;
use crate::sample::{SampleComponent, SampleRegistry};

/// Runs one sample component frame after frame.
///
/// The host owns the [`FrameGraphSystem`]. Every frame it waits for the
/// sample to become ready, lets it import its scope producers, ends the
/// frame, waits for the frame fence and recycles the command lists. A frame
/// whose graph fails to build is skipped and the host keeps running.
///
/// # Example
///
/// ```ignore
/// use scopegraph_app::{App, AppArgs, DefaultAppArgs, SampleRegistry};
///
/// fn main() {
///     let registry = SampleRegistry::new().with("my_sample", "Does things", MySample::default);
///     let args = DefaultAppArgs::parse();
///     std::process::exit(App::run(registry, args));
/// }
/// ```
pub struct App<A: AppArgs> {
    args: A,
    system: FrameGraphSystem,
    context: SampleContext,
    sample: Box<dyn SampleComponent>,
    start_time: Instant,
    last_frame_time: Instant,
    active: bool,
}

impl<A: AppArgs> App<A> {
    /// Create the device group, the frame graph system and the selected sample.
    ///
    /// # Errors
    ///
    /// Fails if the device count is invalid or the sample is unknown.
    pub fn new(registry: &SampleRegistry, args: A) -> Result<Self, AppError> {
        let device_group = DeviceGroup::new(args.device_count())?;
        let system = FrameGraphSystem::new(device_group.clone(), args.frame_graph_config());
        let sample = registry.create(args.sample())?;
        let now = Instant::now();
        Ok(Self {
            args,
            system,
            context: SampleContext::new(device_group),
            sample,
            start_time: now,
            last_frame_time: now,
            active: false,
        })
    }

    /// Init logging and run the selected sample to completion.
    ///
    /// Returns the process exit code.
    pub fn run(registry: SampleRegistry, args: A) -> i32 {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

        scopegraph_core::init();
        scopegraph::init();
        crate::init();

        if args.list_samples() {
            for (name, description) in registry.samples() {
                println!("{name:<20} {description}");
            }
            return 0;
        }

        let result = Self::new(&registry, args).and_then(|mut app| {
            let result = app.run_frames();
            app.shutdown();
            result
        });
        match result {
            Ok(statistics) => {
                log::info!(
                    "Finished: {} frames executed, {} skipped, {} deferred",
                    statistics.frames_executed,
                    statistics.frames_skipped,
                    statistics.frames_deferred
                );
                0
            }
            Err(err) => {
                log::error!("{err}");
                1
            }
        }
    }

    /// Activate the sample and run frames until `max_frames` is reached.
    ///
    /// # Errors
    ///
    /// Fails if the sample cannot be activated.
    pub fn run_frames(&mut self) -> Result<FrameStatistics, AppError> {
        self.activate()?;
        let max_frames = self.args.max_frames();
        while max_frames.is_none_or(|max| self.context.frame_number < max) {
            self.frame();
        }
        log::info!("Reached max frames limit, exiting");
        Ok(self.context.statistics())
    }

    /// Run a single frame.
    pub fn frame(&mut self) {
        scopegraph_core::profile_function!();

        let now = Instant::now();
        self.context.delta_time = now.duration_since(self.last_frame_time);
        self.context.elapsed_time = now.duration_since(self.start_time);
        self.last_frame_time = now;

        if !self.sample.is_ready() {
            log::debug!(
                "Frame {}: '{}' not ready, deferring",
                self.context.frame_number,
                self.sample.name()
            );
            self.context.statistics.lock().frames_deferred += 1;
            self.context.frame_number += 1;
            return;
        }

        let mut builder = self.system.begin_frame();
        self.sample.frame_begin(&self.context, &mut builder);
        match self.system.end_frame(builder) {
            Ok(report) => {
                report.fence().wait();
                self.context.statistics.lock().record(&report);
                self.system.recycle(report);
            }
            Err(err) => {
                log::warn!("Frame {} skipped: {err}", self.context.frame_number);
                self.context.statistics.lock().frames_skipped += 1;
            }
        }
        self.context.frame_number += 1;
    }

    /// Deactivate the sample.
    pub fn shutdown(&mut self) {
        if self.active {
            log::info!("Deactivating '{}'", self.sample.name());
            self.sample.deactivate();
            self.active = false;
        }
    }

    /// The sample context.
    pub fn context(&self) -> &SampleContext {
        &self.context
    }

    /// The frame graph system.
    pub fn system(&self) -> &FrameGraphSystem {
        &self.system
    }

    fn activate(&mut self) -> Result<(), AppError> {
        if self.active {
            return Ok(());
        }
        log::info!(
            "Activating '{}' on {} device(s)",
            self.sample.name(),
            self.context.device_count()
        );
        self.sample.activate(&self.context)?;
        self.active = true;
        Ok(())
    }
}

impl<A: AppArgs> Drop for App<A> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DefaultAppArgs;
    use scopegraph::{
        FrameGraphBuilder, FrameGraphExecuteContext, FrameGraphInterface, ScopeAttachmentAccess,
        ScopeId, ScopeProducer,
    };

    struct ReadMissing {
        id: ScopeId,
        broken: bool,
    }

    impl ScopeProducer for ReadMissing {
        fn scope_id(&self) -> &ScopeId {
            &self.id
        }

        fn prepare(&mut self, frame_graph: &mut FrameGraphInterface<'_>) {
            if self.broken {
                frame_graph.use_shader_attachment("missing", ScopeAttachmentAccess::Read);
            }
        }

        fn execute(&mut self, _context: &mut FrameGraphExecuteContext<'_>) {}
    }

    /// Ready after two frames; breaks its graph on frame 3.
    struct Flaky {
        scope: ReadMissing,
        polls: std::cell::Cell<u32>,
    }

    impl Flaky {
        fn new() -> Self {
            Self {
                scope: ReadMissing {
                    id: ScopeId::from("flaky"),
                    broken: false,
                },
                polls: std::cell::Cell::new(0),
            }
        }
    }

    impl SampleComponent for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        fn activate(&mut self, _context: &SampleContext) -> Result<(), AppError> {
            Ok(())
        }

        fn is_ready(&self) -> bool {
            self.polls.set(self.polls.get() + 1);
            self.polls.get() > 2
        }

        fn frame_begin<'p>(
            &'p mut self,
            context: &SampleContext,
            builder: &mut FrameGraphBuilder<'p>,
        ) {
            self.scope.broken = context.frame_number() == 3;
            builder.import_scope_producer(&mut self.scope);
        }
    }

    #[test]
    fn test_deferred_and_skipped_frames() {
        let registry = SampleRegistry::new().with("flaky", "Fails one frame", Flaky::new);
        let mut app = App::new(&registry, DefaultAppArgs::default().with_max_frames(6)).unwrap();

        let statistics = app.run_frames().unwrap();

        assert_eq!(statistics.frames_deferred, 2);
        assert_eq!(statistics.frames_skipped, 1);
        assert_eq!(statistics.frames_executed, 3);
        assert_eq!(statistics.last_scope_count, 1);
        assert_eq!(app.context().frame_number(), 6);
    }

    #[test]
    fn test_unknown_sample() {
        let registry = SampleRegistry::new().with("flaky", "Fails one frame", Flaky::new);
        let result = App::new(&registry, DefaultAppArgs::with_sample("bloom"));
        assert_eq!(result.err(), Some(AppError::UnknownSample("bloom".into())));
    }

    #[test]
    fn test_invalid_device_count() {
        let registry = SampleRegistry::new().with("flaky", "Fails one frame", Flaky::new);
        let result = App::new(&registry, DefaultAppArgs::default().with_device_count(0));
        assert!(matches!(result, Err(AppError::FrameGraph(_))));
    }

    #[test]
    fn test_empty_registry() {
        let registry = SampleRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(
            App::new(&registry, DefaultAppArgs::default()).err(),
            Some(AppError::NoSamples)
        );
    }
}
