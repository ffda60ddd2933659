//! Per-entity processing systems.
//!
//! Most systems do the same thing every tick: some setup, one call per
//! matching entity, some teardown. Implement [`Processor`] and wrap it with
//! [`processing_system`] to get that loop as the system's
//! [`update`](System::update). [`sorted_system`] does the same and also keeps
//! the entity list ordered by [`SortedProcessor::compare`].

use std::cmp::Ordering;

use engine_component::{ComponentStore, Entity, Filter};

use crate::entities::SystemEntities;
use crate::system::{System, SystemContext};

/// A system body that runs once per matching entity.
///
/// Only [`process`](Self::process) is required. The remaining methods mirror
/// the optional callbacks of [`System`].
#[allow(unused_variables)]
pub trait Processor: 'static {
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

    /// See [`System::interval`].
    fn interval(&self) -> Option<f64> {
        None
    }

    /// See [`System::on_add_to_world`].
    fn on_add_to_world(&mut self, ctx: &mut SystemContext<'_>) {}

    /// See [`System::on_remove_from_world`].
    fn on_remove_from_world(&mut self, ctx: &mut SystemContext<'_>) {}

    /// See [`System::on_add`].
    fn on_add(&mut self, entity: Entity, ctx: &mut SystemContext<'_>) {}

    /// See [`System::on_remove`].
    fn on_remove(&mut self, entity: Entity, ctx: &mut SystemContext<'_>) {}

    /// See [`System::on_modify`]. Sorted systems call this after sorting.
    fn on_modify(&mut self, entities: &SystemEntities, ctx: &mut SystemContext<'_>) {}

    /// Called once per tick before the first entity.
    fn pre_process(&mut self, ctx: &mut SystemContext<'_>) {}

    /// Called once per tick for each entity in the list.
    fn process(&mut self, entity: Entity, ctx: &mut SystemContext<'_>);

    /// Called once per tick after the last entity.
    fn post_process(&mut self, ctx: &mut SystemContext<'_>) {}
}

/// A [`Processor`] whose entities are kept in a defined order.
pub trait SortedProcessor: Processor {
    /// Order two entities. Called with the world's component data.
    fn compare(&self, a: Entity, b: Entity, components: &ComponentStore) -> Ordering;
}

/// Run `pre_process`, `process` for each entity, then `post_process`.
///
/// `entities` is borrowed for the whole loop, so the set processed this tick
/// is exactly the set present when the loop began.
fn run<P: Processor>(processor: &mut P, entities: &SystemEntities, ctx: &mut SystemContext<'_>) {
    processor.pre_process(ctx);
    for &entity in entities {
        processor.process(entity, ctx);
    }
    processor.post_process(ctx);
}

/// A [`System`] driving a [`Processor`]. Build with [`processing_system`].
#[derive(Debug)]
pub struct Processing<P>(P);

/// Turn a [`Processor`] into a system whose update processes every entity.
pub fn processing_system<P: Processor>(processor: P) -> Processing<P> {
    Processing(processor)
}

impl<P> Processing<P> {
    /// The wrapped processor.
    pub fn inner(&self) -> &P {
        &self.0
    }

    /// Unwrap the processor.
    pub fn into_inner(self) -> P {
        self.0
    }
}

impl<P: Processor> System for Processing<P> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn filter(&self) -> Option<&Filter> {
        self.0.filter()
    }

    fn initially_active(&self) -> bool {
        self.0.initially_active()
    }

    fn interval(&self) -> Option<f64> {
        self.0.interval()
    }

    fn on_add_to_world(&mut self, ctx: &mut SystemContext<'_>) {
        self.0.on_add_to_world(ctx);
    }

    fn on_remove_from_world(&mut self, ctx: &mut SystemContext<'_>) {
        self.0.on_remove_from_world(ctx);
    }

    fn on_add(&mut self, entity: Entity, ctx: &mut SystemContext<'_>) {
        self.0.on_add(entity, ctx);
    }

    fn on_remove(&mut self, entity: Entity, ctx: &mut SystemContext<'_>) {
        self.0.on_remove(entity, ctx);
    }

    fn on_modify(&mut self, entities: &mut SystemEntities, ctx: &mut SystemContext<'_>) {
        self.0.on_modify(entities, ctx);
    }

    fn update(&mut self, entities: &SystemEntities, ctx: &mut SystemContext<'_>) {
        run(&mut self.0, entities, ctx);
    }
}

/// A [`System`] driving a [`SortedProcessor`]. Build with [`sorted_system`].
#[derive(Debug)]
pub struct Sorted<P>(P);

/// Turn a [`SortedProcessor`] into a processing system that re-sorts its
/// entity list whenever the list changed since the last tick.
pub fn sorted_system<P: SortedProcessor>(processor: P) -> Sorted<P> {
    Sorted(processor)
}

impl<P> Sorted<P> {
    /// The wrapped processor.
    pub fn inner(&self) -> &P {
        &self.0
    }

    /// Unwrap the processor.
    pub fn into_inner(self) -> P {
        self.0
    }
}

impl<P: SortedProcessor> System for Sorted<P> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn filter(&self) -> Option<&Filter> {
        self.0.filter()
    }

    fn initially_active(&self) -> bool {
        self.0.initially_active()
    }

    fn interval(&self) -> Option<f64> {
        self.0.interval()
    }

    fn on_add_to_world(&mut self, ctx: &mut SystemContext<'_>) {
        self.0.on_add_to_world(ctx);
    }

    fn on_remove_from_world(&mut self, ctx: &mut SystemContext<'_>) {
        self.0.on_remove_from_world(ctx);
    }

    fn on_add(&mut self, entity: Entity, ctx: &mut SystemContext<'_>) {
        self.0.on_add(entity, ctx);
    }

    fn on_remove(&mut self, entity: Entity, ctx: &mut SystemContext<'_>) {
        self.0.on_remove(entity, ctx);
    }

    fn on_modify(&mut self, entities: &mut SystemEntities, ctx: &mut SystemContext<'_>) {
        let processor = &self.0;
        let components = &*ctx.components;
        entities.sort_by(|a, b| processor.compare(*a, *b, components));
        self.0.on_modify(entities, ctx);
    }

    fn update(&mut self, entities: &SystemEntities, ctx: &mut SystemContext<'_>) {
        run(&mut self.0, entities, ctx);
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::Commands;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Processor for Recorder {
        fn pre_process(&mut self, ctx: &mut SystemContext<'_>) {
            self.calls.push(format!("pre {}", ctx.dt));
        }

        fn process(&mut self, entity: Entity, _ctx: &mut SystemContext<'_>) {
            self.calls.push(format!("process {}", entity.id()));
        }

        fn post_process(&mut self, _ctx: &mut SystemContext<'_>) {
            self.calls.push("post".to_string());
        }
    }

    struct Descending;

    impl Processor for Descending {
        fn process(&mut self, _entity: Entity, _ctx: &mut SystemContext<'_>) {}
    }

    impl SortedProcessor for Descending {
        fn compare(&self, a: Entity, b: Entity, _components: &ComponentStore) -> Ordering {
            b.cmp(&a)
        }
    }

    fn list(ids: &[u64]) -> SystemEntities {
        let mut entities = SystemEntities::new();
        for &id in ids {
            entities.push(Entity::from_raw(id));
        }
        entities
    }

    #[test]
    fn test_processing_update_runs_pre_each_post() {
        let mut system = processing_system(Recorder::default());
        let mut components = ComponentStore::new();
        let mut commands = Commands::new();
        let mut ctx = SystemContext::new(0.5, &mut components, &mut commands);

        system.update(&list(&[3, 1]), &mut ctx);

        assert_eq!(
            system.inner().calls,
            vec!["pre 0.5", "process 3", "process 1", "post"]
        );
    }

    #[test]
    fn test_processing_name_comes_from_processor() {
        let system = processing_system(Recorder::default());
        assert!(System::name(&system).ends_with("Recorder"));
    }

    #[test]
    fn test_sorted_on_modify_sorts_and_reindexes() {
        let mut system = sorted_system(Descending);
        let mut components = ComponentStore::new();
        let mut commands = Commands::new();
        let mut ctx = SystemContext::new(0.0, &mut components, &mut commands);
        let mut entities = list(&[2, 5, 1, 4]);

        system.on_modify(&mut entities, &mut ctx);

        let ids: Vec<u64> = entities.iter().map(Entity::id).collect();
        assert_eq!(ids, vec![5, 4, 2, 1]);
        assert!(entities.is_consistent());
    }
}
