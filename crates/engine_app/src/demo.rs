//! The demo world: drifting bodies with a limited lifetime.
//!
//! Three systems run in order each tick:
//!
//! 1. `movement` integrates velocity into position.
//! 2. `expiry` counts lifetimes down and queues expired bodies for removal.
//! 3. `depth_order` walks bodies front to back along the z axis.

use std::cmp::Ordering;

use engine_component::{Component, ComponentStore, Entity, Filter, require_all};
use engine_ecs::{
    Item, Processor, SortedProcessor, SystemContext, World, processing_system, sorted_system,
};
use glam::Vec3;
use tracing::{debug, trace};

/// World-space position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position(pub Vec3);

impl Component for Position {
    fn type_name() -> &'static str {
        "position"
    }
}

/// Units per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity(pub Vec3);

impl Component for Velocity {
    fn type_name() -> &'static str {
        "velocity"
    }
}

/// Seconds left before the body is removed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lifetime {
    pub remaining: f64,
}

impl Component for Lifetime {
    fn type_name() -> &'static str {
        "lifetime"
    }
}

/// Moves every body with a velocity.
pub struct Movement {
    filter: Filter,
}

impl Movement {
    fn new() -> Self {
        Self {
            filter: require_all([Filter::with::<Position>(), Filter::with::<Velocity>()]),
        }
    }
}

impl Processor for Movement {
    fn name(&self) -> &str {
        "movement"
    }

    fn filter(&self) -> Option<&Filter> {
        Some(&self.filter)
    }

    fn process(&mut self, entity: Entity, ctx: &mut SystemContext<'_>) {
        let Some(Velocity(velocity)) = ctx.components.get::<Velocity>(entity).copied() else {
            return;
        };
        if let Some(Position(position)) = ctx.components.get_mut::<Position>(entity) {
            *position += velocity * ctx.dt as f32;
        }
    }
}

/// Removes bodies whose lifetime ran out.
///
/// Expired bodies are queued for removal during the tick they expire and
/// their components are dropped at the start of the next one, once the flush
/// has taken them out of every system.
pub struct Expiry {
    filter: Filter,
    expired: Vec<Entity>,
}

impl Expiry {
    fn new() -> Self {
        Self {
            filter: Filter::with::<Lifetime>(),
            expired: Vec::new(),
        }
    }
}

impl Processor for Expiry {
    fn name(&self) -> &str {
        "expiry"
    }

    fn filter(&self) -> Option<&Filter> {
        Some(&self.filter)
    }

    fn pre_process(&mut self, ctx: &mut SystemContext<'_>) {
        for entity in self.expired.drain(..) {
            ctx.components.despawn(entity);
        }
    }

    fn process(&mut self, entity: Entity, ctx: &mut SystemContext<'_>) {
        let Some(lifetime) = ctx.components.get_mut::<Lifetime>(entity) else {
            return;
        };
        lifetime.remaining -= ctx.dt;
        if lifetime.remaining <= 0.0 {
            trace!(%entity, "body expired");
            ctx.commands.remove_entity(entity);
            self.expired.push(entity);
        }
    }
}

/// Visits bodies nearest first.
pub struct DepthOrder {
    filter: Filter,
    visited: usize,
    nearest: Option<Entity>,
}

impl DepthOrder {
    fn new() -> Self {
        Self {
            filter: Filter::with::<Position>(),
            visited: 0,
            nearest: None,
        }
    }
}

fn depth(entity: Entity, components: &ComponentStore) -> f32 {
    components
        .get::<Position>(entity)
        .map_or(f32::INFINITY, |p| p.0.z)
}

impl Processor for DepthOrder {
    fn name(&self) -> &str {
        "depth_order"
    }

    fn filter(&self) -> Option<&Filter> {
        Some(&self.filter)
    }

    fn pre_process(&mut self, _ctx: &mut SystemContext<'_>) {
        self.visited = 0;
        self.nearest = None;
    }

    fn process(&mut self, entity: Entity, _ctx: &mut SystemContext<'_>) {
        if self.nearest.is_none() {
            self.nearest = Some(entity);
        }
        self.visited += 1;
    }

    fn post_process(&mut self, _ctx: &mut SystemContext<'_>) {
        if let Some(nearest) = self.nearest {
            trace!(visited = self.visited, %nearest, "depth pass");
        }
    }
}

impl SortedProcessor for DepthOrder {
    fn compare(&self, a: Entity, b: Entity, components: &ComponentStore) -> Ordering {
        depth(a, components).total_cmp(&depth(b, components))
    }
}

/// Build the demo world with `bodies` bodies. Every second body is mortal.
pub fn build_world(bodies: usize) -> World {
    let mut components = ComponentStore::new();
    let mut items = vec![
        Item::system(processing_system(Movement::new())),
        Item::system(processing_system(Expiry::new())),
        Item::system(sorted_system(DepthOrder::new())),
    ];

    for i in 0..bodies {
        let entity = components.spawn();
        let t = i as f32;
        components
            .with(entity, Position(Vec3::new(t, 0.0, (t * 7.0) % 11.0)))
            .with(entity, Velocity(Vec3::new(0.0, 1.0, -0.5)));
        if i % 2 == 1 {
            components.insert(
                entity,
                Lifetime {
                    remaining: 0.5 + i as f64 * 0.25,
                },
            );
        }
        items.push(Item::from(entity));
    }

    let world = World::with_items(components, items);
    debug!(
        entities = world.entity_count(),
        systems = world.system_count(),
        "built demo world"
    );
    world
}

#[cfg(test)]
mod tests {
    use engine_ecs::SystemId;

    use super::*;

    fn systems(world: &World) -> Vec<SystemId> {
        world.system_ids().collect()
    }

    #[test]
    fn test_build_world_admits_bodies() {
        let world = build_world(6);
        let ids = systems(&world);

        assert_eq!(world.entity_count(), 6);
        assert_eq!(ids.len(), 3);
        assert_eq!(world.system_name(ids[0]), Some("movement"));
        assert_eq!(world.system_entities(ids[0]).map(|s| s.len()), Some(6));
        assert_eq!(world.system_entities(ids[1]).map(|s| s.len()), Some(3));
        assert_eq!(world.system_entities(ids[2]).map(|s| s.len()), Some(6));
    }

    #[test]
    fn test_movement_integrates_velocity() {
        let mut world = build_world(1);
        let body = world.entities().next().expect("one body");

        world.update(0.5);

        let position = world.components().get::<Position>(body).map(|p| p.0);
        assert_eq!(position, Some(Vec3::new(0.0, 0.5, -0.25)));
    }

    #[test]
    fn test_depth_order_is_nearest_first() {
        let mut world = build_world(8);
        world.update(0.0);

        let ids = systems(&world);
        let list = world.system_entities(ids[2]).expect("depth system");
        let depths: Vec<f32> = list.iter().map(|e| depth(e, world.components())).collect();
        assert!(depths.windows(2).all(|w| w[0] <= w[1]), "{depths:?}");
    }

    #[test]
    fn test_expired_bodies_are_removed_and_despawned() {
        let mut world = build_world(2);
        let mortal: Vec<Entity> = world
            .entities()
            .filter(|&e| world.components().has::<Lifetime>(e))
            .collect();
        assert_eq!(mortal.len(), 1);
        let body = mortal[0];

        world.update(0.5);
        assert!(world.contains_entity(body));

        world.update(0.5);
        assert!(world.contains_entity(body));
        assert_eq!(world.commands().pending_entities(), (0, 1));

        world.update(0.0);
        assert!(!world.contains_entity(body));
        assert_eq!(world.components().component_count(body), 0);
        assert_eq!(world.entity_count(), 1);
    }
}
