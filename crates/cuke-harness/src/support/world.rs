//! Per-scenario world construction and teardown.

use std::any::Any;
use std::sync::Arc;

/// The opaque per-scenario state bag.
///
/// The engine never inspects a world's contents; it only threads it through
/// to hook and step functions, which downcast it to their concrete type.
pub type World = Box<dyn Any>;

/// Creates a fresh world for one test case.
pub type WorldCreator = Arc<dyn Fn() -> World + Send + Sync>;

/// Tears a world down after a test case's after hooks have run.
pub type WorldDestroyer = Arc<dyn Fn(World) + Send + Sync>;

/// Creates and destroys one world per test case.
///
/// The default factory produces a unit world; scenarios that share state
/// between steps register a custom creator producing their own type.
///
/// # Examples
/// ```
/// use cuke_harness::WorldFactory;
///
/// struct Belly {
///     cukes: u32,
/// }
///
/// let factory = WorldFactory::from_fn(|| Belly { cukes: 0 });
/// let world = factory.create();
/// assert!(world.downcast_ref::<Belly>().is_some());
/// factory.destroy(world);
/// ```
#[derive(Clone)]
pub struct WorldFactory {
    creator: WorldCreator,
    destroyer: Option<WorldDestroyer>,
}

impl WorldFactory {
    /// Create a factory with a creator and no destroyer.
    #[must_use]
    pub fn new(creator: WorldCreator) -> Self {
        Self {
            creator,
            destroyer: None,
        }
    }

    /// Create a factory from a plain function returning a concrete world
    /// type; the boxing happens here.
    #[must_use]
    pub fn from_fn<T, F>(creator: F) -> Self
    where
        T: Any,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new(Arc::new(move || Box::new(creator()) as World))
    }

    /// Attach a destroyer invoked with each world at teardown.
    #[must_use]
    pub fn with_destroyer(mut self, destroyer: WorldDestroyer) -> Self {
        self.destroyer = Some(destroyer);
        self
    }

    /// Create a fresh world. Each call yields an independent instance;
    /// worlds are never shared or reused across test cases.
    #[must_use]
    pub fn create(&self) -> World {
        (self.creator)()
    }

    /// Destroy a world after its test case has finished.
    pub fn destroy(&self, world: World) {
        if let Some(destroyer) = &self.destroyer {
            destroyer(world);
        }
    }
}

impl Default for WorldFactory {
    fn default() -> Self {
        Self::from_fn(|| ())
    }
}

impl std::fmt::Debug for WorldFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldFactory")
            .field("has_destroyer", &self.destroyer.is_some())
            .finish_non_exhaustive()
    }
}
