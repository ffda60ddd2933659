//! Caller-owned component storage.
//!
//! The store is a plain data bag: one column per [`ComponentTypeId`], each
//! mapping entities to a boxed value. It makes no attempt at packed layouts;
//! the world never iterates it, it only asks [`ComponentStore::has_key`]
//! through filters.

use std::any::Any;
use std::collections::HashMap;

use crate::component::{Component, ComponentTypeId};
use crate::entity::{Entity, EntityAllocator};

type Column = HashMap<Entity, Box<dyn Any>>;

/// Type-erased component data keyed by component type, then entity.
#[derive(Default)]
pub struct ComponentStore {
    allocator: EntityAllocator,
    columns: HashMap<ComponentTypeId, Column>,
}

impl ComponentStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh entity with no components.
    ///
    /// The entity is not resident in any world until it is added to one.
    pub fn spawn(&mut self) -> Entity {
        self.allocator.allocate()
    }

    /// Attach `component` to `entity`, returning the previous value of the
    /// same type if there was one.
    pub fn insert<T: Component>(&mut self, entity: Entity, component: T) -> Option<T> {
        self.columns
            .entry(T::component_type_id())
            .or_default()
            .insert(entity, Box::new(component))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    /// Builder-style [`insert`](Self::insert) for spawning entities.
    pub fn with<T: Component>(&mut self, entity: Entity, component: T) -> &mut Self {
        self.insert(entity, component);
        self
    }

    /// Detach and return the component of type `T` from `entity`.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        let column = self.columns.get_mut(&T::component_type_id())?;
        column
            .remove(&entity)
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    /// Detach whatever component is stored under `key` from `entity`.
    ///
    /// Returns `true` if something was removed.
    pub fn remove_key(&mut self, entity: Entity, key: ComponentTypeId) -> bool {
        self.columns
            .get_mut(&key)
            .is_some_and(|column| column.remove(&entity).is_some())
    }

    /// Returns a reference to the component of type `T` on `entity`.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.columns
            .get(&T::component_type_id())?
            .get(&entity)?
            .downcast_ref::<T>()
    }

    /// Returns a mutable reference to the component of type `T` on `entity`.
    #[must_use]
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.columns
            .get_mut(&T::component_type_id())?
            .get_mut(&entity)?
            .downcast_mut::<T>()
    }

    /// Returns `true` if `entity` has a component of type `T`.
    #[must_use]
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.has_key(entity, T::component_type_id())
    }

    /// Returns `true` if `entity` has a component stored under `key`.
    #[must_use]
    pub fn has_key(&self, entity: Entity, key: ComponentTypeId) -> bool {
        self.columns
            .get(&key)
            .is_some_and(|column| column.contains_key(&entity))
    }

    /// Drop every component attached to `entity`.
    ///
    /// Returns the number of components removed.
    pub fn despawn(&mut self, entity: Entity) -> usize {
        self.columns
            .values_mut()
            .filter_map(|column| column.remove(&entity))
            .count()
    }

    /// Returns the number of components attached to `entity`.
    #[must_use]
    pub fn component_count(&self, entity: Entity) -> usize {
        self.columns
            .values()
            .filter(|column| column.contains_key(&entity))
            .count()
    }

    /// Returns the number of entity IDs handed out by [`spawn`](Self::spawn).
    #[must_use]
    pub fn spawned(&self) -> u64 {
        self.allocator.count()
    }
}

impl std::fmt::Debug for ComponentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentStore")
            .field("allocator", &self.allocator)
            .field("columns", &self.columns.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position(f32);

    impl Component for Position {
        fn type_name() -> &'static str {
            "position"
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity(f32);

    impl Component for Velocity {
        fn type_name() -> &'static str {
            "velocity"
        }
    }

    #[test]
    fn test_spawn_allocates_distinct_entities() {
        let mut store = ComponentStore::new();
        let a = store.spawn();
        let b = store.spawn();
        assert_ne!(a, b);
        assert_eq!(store.spawned(), 2);
    }

    #[test]
    fn test_insert_get_and_replace() {
        let mut store = ComponentStore::new();
        let e = store.spawn();
        assert_eq!(store.insert(e, Position(1.0)), None);
        assert_eq!(store.get::<Position>(e), Some(&Position(1.0)));
        assert_eq!(store.insert(e, Position(2.0)), Some(Position(1.0)));

        store.get_mut::<Position>(e).unwrap().0 += 1.0;
        assert_eq!(store.get::<Position>(e), Some(&Position(3.0)));
    }

    #[test]
    fn test_has_by_type_and_key() {
        let mut store = ComponentStore::new();
        let e = store.spawn();
        store.with(e, Position(0.0));
        assert!(store.has::<Position>(e));
        assert!(store.has_key(e, ComponentTypeId::from_name("position")));
        assert!(!store.has::<Velocity>(e));
        assert!(!store.has_key(e, ComponentTypeId::from_name("velocity")));
    }

    #[test]
    fn test_remove_and_remove_key() {
        let mut store = ComponentStore::new();
        let e = store.spawn();
        store.with(e, Position(4.0)).with(e, Velocity(1.0));

        assert_eq!(store.remove::<Position>(e), Some(Position(4.0)));
        assert_eq!(store.remove::<Position>(e), None);
        assert!(store.remove_key(e, ComponentTypeId::from_name("velocity")));
        assert!(!store.remove_key(e, ComponentTypeId::from_name("velocity")));
        assert_eq!(store.component_count(e), 0);
    }

    #[test]
    fn test_despawn_drops_all_components() {
        let mut store = ComponentStore::new();
        let a = store.spawn();
        let b = store.spawn();
        store.with(a, Position(0.0)).with(a, Velocity(0.0));
        store.with(b, Position(1.0));

        assert_eq!(store.despawn(a), 2);
        assert_eq!(store.component_count(a), 0);
        assert_eq!(store.despawn(a), 0);
        assert!(!store.has::<Velocity>(a));
        assert_eq!(store.get::<Position>(b), Some(&Position(1.0)));
    }
}
