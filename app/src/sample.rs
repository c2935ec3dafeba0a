//! Sample component trait and registry.

use scopegraph::FrameGraphBuilder;

use crate::context::SampleContext;
use crate::error::AppError;

/// A self-contained piece of per-frame GPU work driven by the host.
///
/// # Lifecycle
///
/// 1. `activate` - Called once; create persistent resources and producers
/// 2. `is_ready` - Polled every frame; `frame_begin` is deferred until true
/// 3. `frame_begin` - Called every frame to import scope producers
/// 4. `deactivate` - Called once when the host stops
///
/// # Example
///
/// ```
/// use scopegraph::{
///     FrameGraphBuilder, FrameGraphExecuteContext, FrameGraphInterface, ScopeId, ScopeProducer,
/// };
/// use scopegraph_app::{AppError, SampleComponent, SampleContext};
///
/// struct ClearScope {
///     id: ScopeId,
/// }
///
/// impl ScopeProducer for ClearScope {
///     fn scope_id(&self) -> &ScopeId {
///         &self.id
///     }
///
///     fn prepare(&mut self, frame_graph: &mut FrameGraphInterface<'_>) {
///         frame_graph.set_estimated_item_count(1);
///     }
///
///     fn execute(&mut self, context: &mut FrameGraphExecuteContext<'_>) {
///         context.command_list().draw(3, 1);
///     }
/// }
///
/// struct Clear {
///     scope: Option<ClearScope>,
/// }
///
/// impl SampleComponent for Clear {
///     fn name(&self) -> &str {
///         "clear"
///     }
///
///     fn activate(&mut self, _context: &SampleContext) -> Result<(), AppError> {
///         self.scope = Some(ClearScope { id: ScopeId::from("clear") });
///         Ok(())
///     }
///
///     fn frame_begin<'p>(
///         &'p mut self,
///         _context: &SampleContext,
///         builder: &mut FrameGraphBuilder<'p>,
///     ) {
///         if let Some(scope) = &mut self.scope {
///             builder.import_scope_producer(scope);
///         }
///     }
/// }
/// ```
pub trait SampleComponent {
    /// Name shown by `--list` and used by `--sample`.
    fn name(&self) -> &str;

    /// Create persistent resources and scope producers.
    ///
    /// # Errors
    ///
    /// An error stops the host before the first frame.
    fn activate(&mut self, context: &SampleContext) -> Result<(), AppError>;

    /// Whether the sample has everything it needs to render.
    ///
    /// Until this returns true the host skips `frame_begin`.
    fn is_ready(&self) -> bool {
        true
    }

    /// Import this frame's scope producers.
    fn frame_begin<'p>(&'p mut self, context: &SampleContext, builder: &mut FrameGraphBuilder<'p>);

    /// Release persistent resources.
    fn deactivate(&mut self) {}
}

type SampleFactory = Box<dyn Fn() -> Box<dyn SampleComponent>>;

struct SampleEntry {
    name: &'static str,
    description: &'static str,
    factory: SampleFactory,
}

/// Named sample factories, in registration order.
#[derive(Default)]
pub struct SampleRegistry {
    entries: Vec<SampleEntry>,
}

impl SampleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sample factory.
    pub fn register<S, F>(&mut self, name: &'static str, description: &'static str, factory: F)
    where
        S: SampleComponent + 'static,
        F: Fn() -> S + 'static,
    {
        if self.entries.iter().any(|entry| entry.name == name) {
            log::warn!("SampleRegistry: '{name}' registered twice, keeping the first");
            return;
        }
        self.entries.push(SampleEntry {
            name,
            description,
            factory: Box::new(move || Box::new(factory())),
        });
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<S, F>(mut self, name: &'static str, description: &'static str, factory: F) -> Self
    where
        S: SampleComponent + 'static,
        F: Fn() -> S + 'static,
    {
        self.register(name, description, factory);
        self
    }

    /// (name, description) of every sample.
    pub fn samples(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.entries.iter().map(|entry| (entry.name, entry.description))
    }

    /// Number of registered samples.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no sample is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Instantiate a sample, or the first one when `name` is `None`.
    ///
    /// # Errors
    ///
    /// Fails if the name is unknown or the registry is empty.
    pub fn create(&self, name: Option<&str>) -> Result<Box<dyn SampleComponent>, AppError> {
        let entry = match name {
            Some(name) => self
                .entries
                .iter()
                .find(|entry| entry.name == name)
                .ok_or_else(|| AppError::UnknownSample(name.to_string()))?,
            None => self.entries.first().ok_or(AppError::NoSamples)?,
        };
        Ok((entry.factory)())
    }
}

impl std::fmt::Debug for SampleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| entry.name))
            .finish()
    }
}
