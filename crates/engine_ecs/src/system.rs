//! The [`System`] trait and the context handed to its callbacks.

use engine_component::{ComponentStore, Entity, Filter};

use crate::commands::Commands;
use crate::entities::SystemEntities;

/// Identifies a system for the lifetime of the world that issued it.
///
/// IDs are allocated when a system is queued and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(pub u64);

impl std::fmt::Display for SystemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "System({})", self.0)
    }
}

/// Everything a callback may touch while the world is busy.
///
/// `components` is the caller's data; `commands` queues structural changes
/// that the world applies on its next flush.
pub struct SystemContext<'a> {
    /// Delta time of the current tick, passed through unmodified.
    ///
    /// `0.0` during flushes that are not part of a tick
    /// ([`World::refresh`](crate::World::refresh) and construction). For
    /// systems with an [`interval`](System::interval) it is the interval.
    pub dt: f64,
    /// The world's component data.
    pub components: &'a mut ComponentStore,
    /// Deferred add/remove queues.
    pub commands: &'a mut Commands,
}

impl<'a> SystemContext<'a> {
    /// Create a context over the given store and queues.
    #[must_use]
    pub fn new(dt: f64, components: &'a mut ComponentStore, commands: &'a mut Commands) -> Self {
        Self {
            dt,
            components,
            commands,
        }
    }
}

/// An execution unit with a filter and lifecycle callbacks.
///
/// Every method is optional. A system with no [`filter`](Self::filter)
/// never receives entities; a system that overrides only
/// [`update`](Self::update) runs once per tick. See
/// [`processing_system`](crate::processing_system) and
/// [`sorted_system`](crate::sorted_system) for per-entity processing.
///
/// The entity list handed to `update` is read-only. Adding or removing
/// entities from within a callback goes through `ctx.commands` and takes
/// effect on the next flush, never mid-iteration.
#[allow(unused_variables)]
pub trait System: 'static {
    /// A human-readable name, used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// The filter selecting this system's entities.
    fn filter(&self) -> Option<&Filter> {
        None
    }

    /// Whether the system starts active when admitted to a world.
    fn initially_active(&self) -> bool {
        true
    }

    /// Run [`update`](Self::update) in fixed steps of this many time units
    /// instead of once per tick.
    fn interval(&self) -> Option<f64> {
        None
    }

    /// Called once when the system is admitted, before any entity is matched.
    fn on_add_to_world(&mut self, ctx: &mut SystemContext<'_>) {}

    /// Called once when the system is removed, after `on_remove` has run for
    /// each of its entities.
    fn on_remove_from_world(&mut self, ctx: &mut SystemContext<'_>) {}

    /// Called when `entity` joins this system's list.
    fn on_add(&mut self, entity: Entity, ctx: &mut SystemContext<'_>) {}

    /// Called when `entity` leaves this system's list, including when the
    /// system itself is removed.
    fn on_remove(&mut self, entity: Entity, ctx: &mut SystemContext<'_>) {}

    /// Called at the start of a tick in which the entity list changed since
    /// the system last ran.
    fn on_modify(&mut self, entities: &mut SystemEntities, ctx: &mut SystemContext<'_>) {}

    /// Called before any system updates, in reverse execution order.
    fn pre_wrap(&mut self, ctx: &mut SystemContext<'_>) {}

    /// The per-tick body.
    fn update(&mut self, entities: &SystemEntities, ctx: &mut SystemContext<'_>) {}

    /// Called after every system has updated, in reverse execution order.
    fn post_wrap(&mut self, ctx: &mut SystemContext<'_>) {}
}
