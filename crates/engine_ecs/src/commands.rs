//! Deferred mutation queues.
//!
//! [`Commands`] holds the four pending queues: entities to add, entities to
//! remove, systems to add, and systems to remove. The world drains them during
//! a flush. Callbacks get the same queues through
//! [`SystemContext::commands`](crate::SystemContext), so anything enqueued
//! while a flush or tick is in progress waits for the next flush.

use engine_component::Entity;
use tracing::trace;

use crate::system::{System, SystemId};

/// Something that can be added to a world.
pub enum Item {
    /// An entity handle.
    Entity(Entity),
    /// A system, not yet admitted.
    System(Box<dyn System>),
}

impl Item {
    /// Wrap a system value.
    #[must_use]
    pub fn system(system: impl System) -> Self {
        Item::System(Box::new(system))
    }
}

impl From<Entity> for Item {
    fn from(entity: Entity) -> Self {
        Item::Entity(entity)
    }
}

impl From<Box<dyn System>> for Item {
    fn from(system: Box<dyn System>) -> Self {
        Item::System(system)
    }
}

impl std::fmt::Debug for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Item::Entity(entity) => f.debug_tuple("Entity").field(entity).finish(),
            Item::System(system) => f.debug_tuple("System").field(&system.name()).finish(),
        }
    }
}

/// Something that can be removed from a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    /// An entity handle.
    Entity(Entity),
    /// A system ID issued by [`Commands::add_system`].
    System(SystemId),
}

impl From<Entity> for Handle {
    fn from(entity: Entity) -> Self {
        Handle::Entity(entity)
    }
}

impl From<SystemId> for Handle {
    fn from(id: SystemId) -> Self {
        Handle::System(id)
    }
}

/// The world's pending add/remove queues.
#[derive(Default)]
pub struct Commands {
    next_system_id: u64,
    pub(crate) entities_to_add: Vec<Entity>,
    pub(crate) entities_to_remove: Vec<Entity>,
    pub(crate) systems_to_add: Vec<(SystemId, Box<dyn System>)>,
    pub(crate) systems_to_remove: Vec<SystemId>,
}

impl Commands {
    /// Create empty queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `entity` for insertion.
    ///
    /// If the entity is already resident when the queue is flushed, it is
    /// removed and re-inserted, so every system re-evaluates its filter.
    pub fn add_entity(&mut self, entity: Entity) {
        trace!(%entity, "queued entity add");
        self.entities_to_add.push(entity);
    }

    /// Queue `entity` for removal. Removing a non-resident entity is a no-op.
    pub fn remove_entity(&mut self, entity: Entity) {
        trace!(%entity, "queued entity remove");
        self.entities_to_remove.push(entity);
    }

    /// Queue a system for admission and return the ID it will be known by.
    pub fn add_system(&mut self, system: impl System) -> SystemId {
        self.add_boxed_system(Box::new(system))
    }

    /// Queue an already boxed system for admission.
    pub fn add_boxed_system(&mut self, system: Box<dyn System>) -> SystemId {
        self.next_system_id += 1;
        let id = SystemId(self.next_system_id);
        trace!(%id, name = system.name(), "queued system add");
        self.systems_to_add.push((id, system));
        id
    }

    /// Queue a system for removal. Removing a non-resident system is a no-op.
    pub fn remove_system(&mut self, id: SystemId) {
        trace!(%id, "queued system remove");
        self.systems_to_remove.push(id);
    }

    /// Queue each item for insertion, returning a handle for each in order.
    pub fn add<I>(&mut self, items: I) -> Vec<Handle>
    where
        I: IntoIterator<Item = Item>,
    {
        items
            .into_iter()
            .map(|item| match item {
                Item::Entity(entity) => {
                    self.add_entity(entity);
                    Handle::Entity(entity)
                }
                Item::System(system) => Handle::System(self.add_boxed_system(system)),
            })
            .collect()
    }

    /// Queue each handle for removal.
    pub fn remove<I>(&mut self, handles: I)
    where
        I: IntoIterator<Item = Handle>,
    {
        for handle in handles {
            match handle {
                Handle::Entity(entity) => self.remove_entity(entity),
                Handle::System(id) => self.remove_system(id),
            }
        }
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities_to_add.is_empty()
            && self.entities_to_remove.is_empty()
            && self.systems_to_add.is_empty()
            && self.systems_to_remove.is_empty()
    }

    /// Returns `(adds, removes)` queued for entities.
    #[must_use]
    pub fn pending_entities(&self) -> (usize, usize) {
        (self.entities_to_add.len(), self.entities_to_remove.len())
    }

    /// Returns `(adds, removes)` queued for systems.
    #[must_use]
    pub fn pending_systems(&self) -> (usize, usize) {
        (self.systems_to_add.len(), self.systems_to_remove.len())
    }
}

impl std::fmt::Debug for Commands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Commands")
            .field("next_system_id", &self.next_system_id)
            .field("entities_to_add", &self.entities_to_add)
            .field("entities_to_remove", &self.entities_to_remove)
            .field("systems_to_add", &self.systems_to_add.len())
            .field("systems_to_remove", &self.systems_to_remove)
            .finish()
    }
}
