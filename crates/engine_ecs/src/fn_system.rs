//! Closure-backed systems.
//!
//! [`FnSystem`] assembles a system from closures instead of a dedicated type.
//! Setting [`process`](FnSystemBuilder::process) gives it the per-entity
//! processing loop; setting [`compare`](FnSystemBuilder::compare) makes it
//! re-sort its entities whenever they changed.
//!
//! ```rust
//! use engine_component::require_any;
//! use engine_ecs::FnSystem;
//!
//! let system = FnSystem::builder("debug_draw")
//!     .filter(require_any(["sprite", "mesh"]))
//!     .process(|entity, _ctx| println!("draw {entity}"))
//!     .build();
//! # let _ = system;
//! ```

use std::cmp::Ordering;

use engine_component::{ComponentStore, Entity, Filter};

use crate::entities::SystemEntities;
use crate::system::{System, SystemContext};

type EntityFn = Box<dyn FnMut(Entity, &mut SystemContext<'_>)>;
type TickFn = Box<dyn FnMut(&mut SystemContext<'_>)>;
type ListFn = Box<dyn FnMut(&SystemEntities, &mut SystemContext<'_>)>;
type CompareFn = Box<dyn Fn(Entity, Entity, &ComponentStore) -> Ordering>;

/// A system whose behaviour is a set of optional closures.
pub struct FnSystem {
    name: String,
    filter: Option<Filter>,
    active: bool,
    interval: Option<f64>,
    on_add_to_world: Option<TickFn>,
    on_remove_from_world: Option<TickFn>,
    on_add: Option<EntityFn>,
    on_remove: Option<EntityFn>,
    on_modify: Option<ListFn>,
    pre_process: Option<TickFn>,
    process: Option<EntityFn>,
    post_process: Option<TickFn>,
    update: Option<ListFn>,
    compare: Option<CompareFn>,
}

impl FnSystem {
    /// Start building a system with the given name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> FnSystemBuilder {
        FnSystemBuilder {
            system: FnSystem {
                name: name.into(),
                filter: None,
                active: true,
                interval: None,
                on_add_to_world: None,
                on_remove_from_world: None,
                on_add: None,
                on_remove: None,
                on_modify: None,
                pre_process: None,
                process: None,
                post_process: None,
                update: None,
                compare: None,
            },
        }
    }
}

impl std::fmt::Debug for FnSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSystem")
            .field("name", &self.name)
            .field("filter", &self.filter)
            .field("active", &self.active)
            .field("interval", &self.interval)
            .field("sorted", &self.compare.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`FnSystem`].
#[must_use]
pub struct FnSystemBuilder {
    system: FnSystem,
}

impl FnSystemBuilder {
    /// Select entities with `filter`.
    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.system.filter = Some(filter.into());
        self
    }

    /// Start inactive (`false`) or active (`true`, the default).
    pub fn active(mut self, active: bool) -> Self {
        self.system.active = active;
        self
    }

    /// Update in fixed steps of `interval`.
    pub fn interval(mut self, interval: f64) -> Self {
        self.system.interval = Some(interval);
        self
    }

    /// Called once when the system is admitted to a world.
    pub fn on_add_to_world(mut self, f: impl FnMut(&mut SystemContext<'_>) + 'static) -> Self {
        self.system.on_add_to_world = Some(Box::new(f));
        self
    }

    /// Called once when the system leaves a world, after `on_remove` for each
    /// of its entities.
    pub fn on_remove_from_world(
        mut self,
        f: impl FnMut(&mut SystemContext<'_>) + 'static,
    ) -> Self {
        self.system.on_remove_from_world = Some(Box::new(f));
        self
    }

    /// Called when an entity joins the system.
    pub fn on_add(mut self, f: impl FnMut(Entity, &mut SystemContext<'_>) + 'static) -> Self {
        self.system.on_add = Some(Box::new(f));
        self
    }

    /// Called when an entity leaves the system.
    pub fn on_remove(mut self, f: impl FnMut(Entity, &mut SystemContext<'_>) + 'static) -> Self {
        self.system.on_remove = Some(Box::new(f));
        self
    }

    /// Called when the entity list changed since the last tick, after sorting.
    pub fn on_modify(
        mut self,
        f: impl FnMut(&SystemEntities, &mut SystemContext<'_>) + 'static,
    ) -> Self {
        self.system.on_modify = Some(Box::new(f));
        self
    }

    /// Called once per tick before processing.
    pub fn pre_process(mut self, f: impl FnMut(&mut SystemContext<'_>) + 'static) -> Self {
        self.system.pre_process = Some(Box::new(f));
        self
    }

    /// Called once per tick per entity.
    pub fn process(mut self, f: impl FnMut(Entity, &mut SystemContext<'_>) + 'static) -> Self {
        self.system.process = Some(Box::new(f));
        self
    }

    /// Called once per tick after processing.
    pub fn post_process(mut self, f: impl FnMut(&mut SystemContext<'_>) + 'static) -> Self {
        self.system.post_process = Some(Box::new(f));
        self
    }

    /// Replace the processing loop with a custom per-tick body.
    pub fn update(
        mut self,
        f: impl FnMut(&SystemEntities, &mut SystemContext<'_>) + 'static,
    ) -> Self {
        self.system.update = Some(Box::new(f));
        self
    }

    /// Keep the entity list sorted by `compare`.
    pub fn compare(
        mut self,
        f: impl Fn(Entity, Entity, &ComponentStore) -> Ordering + 'static,
    ) -> Self {
        self.system.compare = Some(Box::new(f));
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> FnSystem {
        self.system
    }
}

impl System for FnSystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    fn initially_active(&self) -> bool {
        self.active
    }

    fn interval(&self) -> Option<f64> {
        self.interval
    }

    fn on_add_to_world(&mut self, ctx: &mut SystemContext<'_>) {
        if let Some(f) = &mut self.on_add_to_world {
            f(ctx);
        }
    }

    fn on_remove_from_world(&mut self, ctx: &mut SystemContext<'_>) {
        if let Some(f) = &mut self.on_remove_from_world {
            f(ctx);
        }
    }

    fn on_add(&mut self, entity: Entity, ctx: &mut SystemContext<'_>) {
        if let Some(f) = &mut self.on_add {
            f(entity, ctx);
        }
    }

    fn on_remove(&mut self, entity: Entity, ctx: &mut SystemContext<'_>) {
        if let Some(f) = &mut self.on_remove {
            f(entity, ctx);
        }
    }

    fn on_modify(&mut self, entities: &mut SystemEntities, ctx: &mut SystemContext<'_>) {
        if let Some(compare) = &self.compare {
            let components = &*ctx.components;
            entities.sort_by(|a, b| compare(*a, *b, components));
        }
        if let Some(f) = &mut self.on_modify {
            f(entities, ctx);
        }
    }

    fn update(&mut self, entities: &SystemEntities, ctx: &mut SystemContext<'_>) {
        if let Some(f) = &mut self.update {
            f(entities, ctx);
            return;
        }
        if let Some(f) = &mut self.pre_process {
            f(ctx);
        }
        if let Some(f) = &mut self.process {
            for &entity in entities {
                f(entity, ctx);
            }
        }
        if let Some(f) = &mut self.post_process {
            f(ctx);
        }
    }
}
