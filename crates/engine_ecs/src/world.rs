//! The world: resident entities, ordered systems, and the update tick.
//!
//! Structural changes are two-phase. Enqueueing only touches the
//! [`Commands`] queues; a flush applies them:
//!
//! 1. **System flush**: removals (each removed system sees `on_remove` for
//!    every entity it held), then additions (each new system is matched
//!    against every resident entity).
//! 2. **Entity flush**: removals (swap-removed from every system holding
//!    them), then additions (appended to every system whose filter matches).
//!
//! Systems are flushed first so that systems and entities queued together
//! meet in the same tick.

use std::collections::{HashMap, HashSet};

use engine_component::{ComponentStore, Entity};
use tracing::{debug, trace};

use crate::commands::{Commands, Handle, Item};
use crate::entities::SystemEntities;
use crate::error::WorldError;
use crate::system::{System, SystemContext, SystemId};

/// Bookkeeping for one admitted system.
struct SystemSlot {
    id: SystemId,
    system: Box<dyn System>,
    entities: SystemEntities,
    active: bool,
    /// The entity list changed since the system last ran.
    modified: bool,
    /// Time carried over between ticks for interval systems.
    buffered_time: f64,
    /// Picked by the selector for the tick in progress.
    selected: bool,
}

/// Queue buffers swapped in while a flush drains the live queues, so that
/// callbacks can keep enqueueing without touching what is being drained.
#[derive(Default)]
struct Drain {
    entities_to_add: Vec<Entity>,
    entities_to_remove: Vec<Entity>,
    systems_to_add: Vec<(SystemId, Box<dyn System>)>,
    systems_to_remove: Vec<SystemId>,
}

/// A container of entities and the systems that process them.
///
/// See the [module docs](self) for the flush protocol.
#[derive(Default)]
pub struct World {
    /// Systems in execution order.
    systems: Vec<SystemSlot>,
    /// Maps each admitted system to its position in `systems`.
    system_indices: HashMap<SystemId, usize>,
    /// Resident entities, as of the last entity flush.
    entities: HashSet<Entity>,
    /// Caller-owned component data.
    components: ComponentStore,
    /// Pending structural changes.
    commands: Commands,
    drain: Drain,
}

impl World {
    /// Create an empty world over the given component data.
    #[must_use]
    pub fn new(components: ComponentStore) -> Self {
        Self {
            components,
            ..Self::default()
        }
    }

    /// Create a world, enqueue `items`, and flush once so the world is fully
    /// populated before first use.
    ///
    /// System IDs are available afterwards from [`system_ids`](Self::system_ids)
    /// in the order the systems were given.
    #[must_use]
    pub fn with_items<I>(components: ComponentStore, items: I) -> Self
    where
        I: IntoIterator<Item = Item>,
    {
        let mut world = Self::new(components);
        world.add(items);
        world.refresh();
        world
    }

    // -- Queueing --

    /// Queue `entity` for insertion. Re-adding a resident entity removes and
    /// re-inserts it, re-evaluating every system's filter.
    pub fn add_entity(&mut self, entity: Entity) {
        self.commands.add_entity(entity);
    }

    /// Queue a system for admission and return its ID.
    pub fn add_system(&mut self, system: impl System) -> SystemId {
        self.commands.add_system(system)
    }

    /// Queue an already boxed system for admission and return its ID.
    pub fn add_boxed_system(&mut self, system: Box<dyn System>) -> SystemId {
        self.commands.add_boxed_system(system)
    }

    /// Queue a mix of entities and systems, returning a handle for each.
    pub fn add<I>(&mut self, items: I) -> Vec<Handle>
    where
        I: IntoIterator<Item = Item>,
    {
        self.commands.add(items)
    }

    /// Queue `entity` for removal.
    pub fn remove_entity(&mut self, entity: Entity) {
        self.commands.remove_entity(entity);
    }

    /// Queue a system for removal.
    pub fn remove_system(&mut self, id: SystemId) {
        self.commands.remove_system(id);
    }

    /// Queue a mix of entities and systems for removal.
    pub fn remove<I>(&mut self, handles: I)
    where
        I: IntoIterator<Item = Handle>,
    {
        self.commands.remove(handles);
    }

    /// Queue every resident entity for removal.
    pub fn clear_entities(&mut self) {
        for &entity in &self.entities {
            self.commands.remove_entity(entity);
        }
    }

    /// Queue every admitted system for removal, last to first.
    pub fn clear_systems(&mut self) {
        for slot in self.systems.iter().rev() {
            self.commands.remove_system(slot.id);
        }
    }

    // -- Flushing --

    /// Apply all pending changes without running a tick.
    ///
    /// Callbacks see `dt == 0.0`.
    pub fn refresh(&mut self) {
        self.flush(0.0);
    }

    fn flush(&mut self, dt: f64) {
        self.flush_systems(dt);
        self.flush_entities(dt);
    }

    fn flush_systems(&mut self, dt: f64) {
        if self.commands.systems_to_add.is_empty() && self.commands.systems_to_remove.is_empty() {
            return;
        }

        let Self {
            systems,
            system_indices,
            entities,
            components,
            commands,
            drain,
        } = self;
        std::mem::swap(&mut commands.systems_to_remove, &mut drain.systems_to_remove);
        std::mem::swap(&mut commands.systems_to_add, &mut drain.systems_to_add);
        let mut ctx = SystemContext::new(dt, components, commands);

        let mut removed = 0usize;
        for id in drain.systems_to_remove.drain(..) {
            let Some(index) = system_indices.remove(&id) else {
                continue;
            };

            let slot = &mut systems[index];
            for &entity in &slot.entities {
                slot.system.on_remove(entity, &mut ctx);
            }
            slot.system.on_remove_from_world(&mut ctx);

            let slot = systems.remove(index);
            for (position, later) in systems.iter().enumerate().skip(index) {
                system_indices.insert(later.id, position);
            }
            trace!(%id, name = slot.system.name(), "removed system");
            removed += 1;
        }

        let mut added = 0usize;
        for (id, system) in drain.systems_to_add.drain(..) {
            if system_indices.contains_key(&id) {
                continue;
            }

            let index = systems.len();
            system_indices.insert(id, index);
            systems.push(SystemSlot {
                id,
                active: system.initially_active(),
                system,
                entities: SystemEntities::new(),
                modified: true,
                buffered_time: 0.0,
                selected: false,
            });

            let slot = &mut systems[index];
            slot.system.on_add_to_world(&mut ctx);

            let matched: Vec<Entity> = match slot.system.filter() {
                Some(filter) => entities
                    .iter()
                    .copied()
                    .filter(|&entity| filter.matches(entity, ctx.components))
                    .collect(),
                None => Vec::new(),
            };
            for entity in matched {
                if slot.entities.push(entity) {
                    slot.system.on_add(entity, &mut ctx);
                }
            }
            trace!(
                %id,
                name = slot.system.name(),
                index,
                entities = slot.entities.len(),
                "admitted system"
            );
            added += 1;
        }

        debug!(added, removed, systems = systems.len(), "flushed systems");
    }

    fn flush_entities(&mut self, dt: f64) {
        if self.commands.entities_to_add.is_empty() && self.commands.entities_to_remove.is_empty()
        {
            return;
        }

        let Self {
            systems,
            entities,
            components,
            commands,
            drain,
            ..
        } = self;
        std::mem::swap(&mut commands.entities_to_remove, &mut drain.entities_to_remove);
        std::mem::swap(&mut commands.entities_to_add, &mut drain.entities_to_add);
        let to_add = &mut drain.entities_to_add;
        let to_remove = &mut drain.entities_to_remove;

        // Re-adding a resident entity refreshes it: out first, then back in.
        to_remove.extend(to_add.iter().copied().filter(|e| entities.contains(e)));

        let mut ctx = SystemContext::new(dt, components, commands);

        let mut removed = 0usize;
        for entity in to_remove.drain(..) {
            if !entities.remove(&entity) {
                continue;
            }
            for slot in systems.iter_mut() {
                if slot.entities.swap_remove(entity) {
                    slot.modified = true;
                    slot.system.on_remove(entity, &mut ctx);
                }
            }
            removed += 1;
        }

        let mut added = 0usize;
        for entity in to_add.drain(..) {
            if !entities.insert(entity) {
                continue;
            }
            for slot in systems.iter_mut() {
                let matches = slot
                    .system
                    .filter()
                    .is_some_and(|filter| filter.matches(entity, ctx.components));
                if matches && slot.entities.push(entity) {
                    slot.modified = true;
                    slot.system.on_add(entity, &mut ctx);
                }
            }
            added += 1;
        }

        debug!(added, removed, entities = entities.len(), "flushed entities");
    }

    // -- Ticking --

    /// Flush pending changes, then run one tick of every active system.
    pub fn update(&mut self, dt: f64) {
        self.update_selected(dt, |_, _| true);
    }

    /// Like [`update`](Self::update), but only systems for which `selector`
    /// returns `true` take part in the tick.
    ///
    /// The selector is consulted once per active system per tick. Systems left
    /// out keep their modified state and see `on_modify` on the next tick they
    /// run.
    pub fn update_selected<F>(&mut self, dt: f64, mut selector: F)
    where
        F: FnMut(SystemId, &dyn System) -> bool,
    {
        self.flush(dt);

        let Self {
            systems,
            components,
            commands,
            ..
        } = self;
        let mut ctx = SystemContext::new(dt, components, commands);

        for slot in systems.iter_mut() {
            slot.selected = slot.active && selector(slot.id, slot.system.as_ref());
        }

        for slot in systems.iter_mut().rev().filter(|slot| slot.selected) {
            slot.system.pre_wrap(&mut ctx);
        }

        for slot in systems.iter_mut().filter(|slot| slot.selected) {
            if slot.modified {
                slot.system.on_modify(&mut slot.entities, &mut ctx);
            }

            match slot.system.interval() {
                Some(interval) if interval > 0.0 => {
                    slot.buffered_time += dt;
                    ctx.dt = interval;
                    while slot.buffered_time >= interval {
                        slot.buffered_time -= interval;
                        slot.system.update(&slot.entities, &mut ctx);
                    }
                    ctx.dt = dt;
                }
                _ => slot.system.update(&slot.entities, &mut ctx),
            }

            slot.modified = false;
        }

        for slot in systems.iter_mut().rev().filter(|slot| slot.selected) {
            slot.system.post_wrap(&mut ctx);
        }
    }

    // -- Ordering --

    /// Returns the execution index of a system.
    #[must_use]
    pub fn system_index(&self, id: SystemId) -> Option<usize> {
        self.system_indices.get(&id).copied()
    }

    /// Move a system to execution index `index`, shifting the systems in
    /// between. Returns the system's previous index.
    ///
    /// # Errors
    ///
    /// [`WorldError::UnknownSystem`] if `id` is not admitted (systems still in
    /// the queue have no index yet), [`WorldError::IndexOutOfRange`] if
    /// `index >= system_count()`.
    pub fn set_system_index(&mut self, id: SystemId, index: usize) -> Result<usize, WorldError> {
        let old = self
            .system_index(id)
            .ok_or(WorldError::UnknownSystem(id))?;
        let len = self.systems.len();
        if index >= len {
            return Err(WorldError::IndexOutOfRange { index, len });
        }

        if old != index {
            let slot = self.systems.remove(old);
            self.systems.insert(index, slot);
            for position in old.min(index)..=old.max(index) {
                self.system_indices.insert(self.systems[position].id, position);
            }
            trace!(%id, from = old, to = index, "moved system");
        }
        Ok(old)
    }

    // -- Queries --

    /// Returns the number of resident entities, as of the last flush.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Returns the number of admitted systems, as of the last flush.
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Returns `true` if `entity` is resident.
    #[must_use]
    pub fn contains_entity(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    /// Returns `true` if the system is admitted.
    #[must_use]
    pub fn contains_system(&self, id: SystemId) -> bool {
        self.system_indices.contains_key(&id)
    }

    /// Iterate over resident entities, in no particular order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter().copied()
    }

    /// Iterate over admitted system IDs in execution order.
    pub fn system_ids(&self) -> impl Iterator<Item = SystemId> + '_ {
        self.systems.iter().map(|slot| slot.id)
    }

    /// Returns the name of a system.
    #[must_use]
    pub fn system_name(&self, id: SystemId) -> Option<&str> {
        self.slot(id).map(|slot| slot.system.name())
    }

    /// Returns the entities currently matching a system.
    #[must_use]
    pub fn system_entities(&self, id: SystemId) -> Option<&SystemEntities> {
        self.slot(id).map(|slot| &slot.entities)
    }

    /// Returns whether a system is active.
    #[must_use]
    pub fn is_active(&self, id: SystemId) -> Option<bool> {
        self.slot(id).map(|slot| slot.active)
    }

    /// Activate or deactivate a system. Inactive systems keep receiving
    /// entities but are skipped by [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// [`WorldError::UnknownSystem`] if `id` is not admitted.
    pub fn set_active(&mut self, id: SystemId, active: bool) -> Result<(), WorldError> {
        let index = self
            .system_index(id)
            .ok_or(WorldError::UnknownSystem(id))?;
        self.systems[index].active = active;
        Ok(())
    }

    fn slot(&self, id: SystemId) -> Option<&SystemSlot> {
        self.system_index(id).map(|index| &self.systems[index])
    }

    // -- Data --

    /// Allocate a fresh entity in the component store. It is not resident
    /// until added.
    pub fn spawn(&mut self) -> Entity {
        self.components.spawn()
    }

    /// The world's component data.
    #[must_use]
    pub fn components(&self) -> &ComponentStore {
        &self.components
    }

    /// Mutable access to the world's component data.
    ///
    /// Changing an entity's components does not re-run filters; re-submit it
    /// with [`add_entity`](Self::add_entity) for that.
    pub fn components_mut(&mut self) -> &mut ComponentStore {
        &mut self.components
    }

    /// The pending queues.
    #[must_use]
    pub fn commands(&self) -> &Commands {
        &self.commands
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let systems: Vec<(&str, usize)> = self
            .systems
            .iter()
            .map(|slot| (slot.system.name(), slot.entities.len()))
            .collect();
        f.debug_struct("World")
            .field("systems", &systems)
            .field("entities", &self.entities.len())
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}
