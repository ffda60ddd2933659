//! # engine_ecs
//!
//! The world: a container of opaque entities and an ordered list of systems
//! that keeps every system's view of matching entities correct as entities and
//! systems come and go.
//!
//! Nothing is applied immediately. [`World::add_entity`], [`World::add_system`]
//! and their removal counterparts only enqueue; the queues are flushed (systems
//! first, then entities) at the start of [`World::update`] or on
//! [`World::refresh`]. Callbacks receive a [`SystemContext`] whose
//! [`Commands`] feed the same queues, so mutating the world from inside a
//! system is always safe and takes effect on the next flush.
//!
//! ```rust
//! use engine_component::{Component, ComponentStore, require_all};
//! use engine_ecs::{FnSystem, World};
//!
//! struct Position(f32);
//! impl Component for Position {
//!     fn type_name() -> &'static str { "position" }
//! }
//!
//! struct Velocity(f32);
//! impl Component for Velocity {
//!     fn type_name() -> &'static str { "velocity" }
//! }
//!
//! let mut world = World::new(ComponentStore::new());
//! let movement = world.add_system(
//!     FnSystem::builder("movement")
//!         .filter(require_all(["position", "velocity"]))
//!         .process(|entity, ctx| {
//!             let v = ctx.components.get::<Velocity>(entity).map_or(0.0, |v| v.0);
//!             if let Some(p) = ctx.components.get_mut::<Position>(entity) {
//!                 p.0 += v * ctx.dt as f32;
//!             }
//!         })
//!         .build(),
//! );
//!
//! let e = world.spawn();
//! world.components_mut().insert(e, Position(0.0));
//! world.components_mut().insert(e, Velocity(2.0));
//! world.add_entity(e);
//!
//! world.update(0.5);
//! assert_eq!(world.system_entities(movement).map(|s| s.len()), Some(1));
//! assert_eq!(world.components().get::<Position>(e).map(|p| p.0), Some(1.0));
//! ```

pub mod commands;
pub mod entities;
pub mod error;
pub mod fn_system;
pub mod processing;
pub mod system;
pub mod world;

pub use commands::{Commands, Handle, Item};
pub use entities::SystemEntities;
pub use error::WorldError;
pub use fn_system::{FnSystem, FnSystemBuilder};
pub use processing::{Processing, Processor, Sorted, SortedProcessor, processing_system, sorted_system};
pub use system::{System, SystemContext, SystemId};
pub use world::World;
