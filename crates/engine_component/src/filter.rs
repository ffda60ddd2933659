//! Entity filters.
//!
//! A [`Filter`] decides whether a system is interested in an entity. Filters
//! are built from component-presence tests and the four combinators
//! [`require_all`], [`require_any`], [`reject_all`] and [`reject_any`], each
//! of which accepts component names, [`ComponentTypeId`]s, or nested filters.
//!
//! ```rust
//! use engine_component::{ComponentStore, Filter, require_all, reject_any};
//!
//! let movable = require_all(["position", "velocity"]);
//! let visible_movable = require_all([movable, reject_any(["hidden"])]);
//!
//! let store = ComponentStore::new();
//! let e = engine_component::Entity::from_raw(1);
//! assert!(!visible_movable.matches(e, &store));
//! # let _ = Filter::from("position");
//! ```

use std::sync::Arc;

use crate::component::{Component, ComponentTypeId};
use crate::entity::Entity;
use crate::pattern::{self, FilterParseError};
use crate::store::ComponentStore;

/// A user-supplied filter predicate.
pub type Predicate = Arc<dyn Fn(Entity, &ComponentStore) -> bool + Send + Sync>;

/// A pure predicate selecting the entities a system processes.
///
/// Filters hold no mutable state, so one instance can be cloned into any
/// number of systems.
#[derive(Clone)]
pub enum Filter {
    /// The entity has a component stored under this key.
    Has(ComponentTypeId),
    /// Every item matches. Short-circuits on the first miss.
    RequireAll(Vec<Filter>),
    /// At least one item matches. Short-circuits on the first hit.
    RequireAny(Vec<Filter>),
    /// At least one item misses.
    RejectAll(Vec<Filter>),
    /// Every item misses.
    RejectAny(Vec<Filter>),
    /// The inner filter misses.
    Not(Box<Filter>),
    /// An arbitrary predicate over the entity and its components.
    Predicate(Predicate),
}

impl Filter {
    /// Test `entity` against this filter.
    #[must_use]
    pub fn matches(&self, entity: Entity, components: &ComponentStore) -> bool {
        match self {
            Filter::Has(key) => components.has_key(entity, *key),
            Filter::RequireAll(items) => items.iter().all(|f| f.matches(entity, components)),
            Filter::RequireAny(items) => items.iter().any(|f| f.matches(entity, components)),
            Filter::RejectAll(items) => !items.iter().all(|f| f.matches(entity, components)),
            Filter::RejectAny(items) => !items.iter().any(|f| f.matches(entity, components)),
            Filter::Not(inner) => !inner.matches(entity, components),
            Filter::Predicate(predicate) => predicate(entity, components),
        }
    }

    /// Match entities that have a component of type `T`.
    #[must_use]
    pub fn with<T: Component>() -> Self {
        Filter::Has(T::component_type_id())
    }

    /// Match entities that do not have a component of type `T`.
    #[must_use]
    pub fn without<T: Component>() -> Self {
        Filter::not(Filter::with::<T>())
    }

    /// Invert a filter.
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn not(filter: impl Into<Filter>) -> Self {
        Filter::Not(Box::new(filter.into()))
    }

    /// Wrap an arbitrary predicate.
    #[must_use]
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(Entity, &ComponentStore) -> bool + Send + Sync + 'static,
    {
        Filter::Predicate(Arc::new(f))
    }

    /// Build a filter from a pattern string.
    ///
    /// Tokens are component names made of alphanumerics and `_`. They can be
    /// joined with `&` (and) or `|` (or), prefixed with `!` (not), and
    /// grouped with parentheses. `!` binds tightest, then `&`, then `|`.
    ///
    /// ```rust
    /// use engine_component::Filter;
    ///
    /// let filter = Filter::parse("position & (velocity | !frozen)").unwrap();
    /// # let _ = filter;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a [`FilterParseError`] if the pattern is empty or malformed.
    pub fn parse(pattern: &str) -> Result<Self, FilterParseError> {
        pattern::parse(pattern)
    }
}

impl From<&str> for Filter {
    fn from(name: &str) -> Self {
        Filter::Has(ComponentTypeId::from_name(name))
    }
}

impl From<ComponentTypeId> for Filter {
    fn from(key: ComponentTypeId) -> Self {
        Filter::Has(key)
    }
}

impl std::str::FromStr for Filter {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::parse(s)
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::Has(key) => f.debug_tuple("Has").field(key).finish(),
            Filter::RequireAll(items) => f.debug_tuple("RequireAll").field(items).finish(),
            Filter::RequireAny(items) => f.debug_tuple("RequireAny").field(items).finish(),
            Filter::RejectAll(items) => f.debug_tuple("RejectAll").field(items).finish(),
            Filter::RejectAny(items) => f.debug_tuple("RejectAny").field(items).finish(),
            Filter::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
            Filter::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

fn collect<I>(items: I) -> Vec<Filter>
where
    I: IntoIterator,
    I::Item: Into<Filter>,
{
    items.into_iter().map(Into::into).collect()
}

/// A filter that matches when every item matches.
#[must_use]
pub fn require_all<I>(items: I) -> Filter
where
    I: IntoIterator,
    I::Item: Into<Filter>,
{
    Filter::RequireAll(collect(items))
}

/// A filter that matches when at least one item matches.
#[must_use]
pub fn require_any<I>(items: I) -> Filter
where
    I: IntoIterator,
    I::Item: Into<Filter>,
{
    Filter::RequireAny(collect(items))
}

/// A filter that matches when at least one item does not match.
#[must_use]
pub fn reject_all<I>(items: I) -> Filter
where
    I: IntoIterator,
    I::Item: Into<Filter>,
{
    Filter::RejectAll(collect(items))
}

/// A filter that matches when no item matches.
#[must_use]
pub fn reject_any<I>(items: I) -> Filter
where
    I: IntoIterator,
    I::Item: Into<Filter>,
{
    Filter::RejectAny(collect(items))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct A;
    struct B;

    impl Component for A {
        fn type_name() -> &'static str {
            "a"
        }
    }

    impl Component for B {
        fn type_name() -> &'static str {
            "b"
        }
    }

    struct Fixture {
        store: ComponentStore,
        /// has a, b
        ab: Entity,
        /// has a
        a: Entity,
        /// has nothing
        none: Entity,
    }

    fn fixture() -> Fixture {
        let mut store = ComponentStore::new();
        let ab = store.spawn();
        let a = store.spawn();
        let none = store.spawn();
        store.with(ab, A).with(ab, B);
        store.with(a, A);
        Fixture { store, ab, a, none }
    }

    #[test]
    fn test_has_by_name_and_key() {
        let fx = fixture();
        assert!(Filter::from("a").matches(fx.a, &fx.store));
        assert!(Filter::from(ComponentTypeId::of::<B>()).matches(fx.ab, &fx.store));
        assert!(!Filter::from("b").matches(fx.a, &fx.store));
        assert!(!Filter::from("a").matches(fx.none, &fx.store));
    }

    #[test]
    fn test_require_all() {
        let fx = fixture();
        let f = require_all(["a", "b"]);
        assert!(f.matches(fx.ab, &fx.store));
        assert!(!f.matches(fx.a, &fx.store));
        assert!(!f.matches(fx.none, &fx.store));
    }

    #[test]
    fn test_require_any() {
        let fx = fixture();
        let f = require_any(["a", "b"]);
        assert!(f.matches(fx.ab, &fx.store));
        assert!(f.matches(fx.a, &fx.store));
        assert!(!f.matches(fx.none, &fx.store));
    }

    #[test]
    fn test_reject_all_is_true_when_any_item_misses() {
        let fx = fixture();
        let f = reject_all(["a", "b"]);
        assert!(!f.matches(fx.ab, &fx.store));
        assert!(f.matches(fx.a, &fx.store));
        assert!(f.matches(fx.none, &fx.store));
    }

    #[test]
    fn test_reject_any_is_true_when_every_item_misses() {
        let fx = fixture();
        let f = reject_any(["a", "b"]);
        assert!(!f.matches(fx.ab, &fx.store));
        assert!(!f.matches(fx.a, &fx.store));
        assert!(f.matches(fx.none, &fx.store));
    }

    #[test]
    fn test_empty_item_lists() {
        let fx = fixture();
        let no_items: [&str; 0] = [];
        assert!(require_all(no_items).matches(fx.none, &fx.store));
        assert!(!require_any(no_items).matches(fx.none, &fx.store));
        assert!(!reject_all(no_items).matches(fx.none, &fx.store));
        assert!(reject_any(no_items).matches(fx.none, &fx.store));
    }

    #[test]
    fn test_nested_filters() {
        let fx = fixture();
        // a AND NOT b
        let f = require_all([Filter::from("a"), reject_any(["b"])]);
        assert!(f.matches(fx.a, &fx.store));
        assert!(!f.matches(fx.ab, &fx.store));
        assert!(!f.matches(fx.none, &fx.store));
    }

    #[test]
    fn test_with_and_without() {
        let fx = fixture();
        assert!(Filter::with::<A>().matches(fx.a, &fx.store));
        assert!(Filter::without::<B>().matches(fx.a, &fx.store));
        assert!(!Filter::without::<B>().matches(fx.ab, &fx.store));
    }

    #[test]
    fn test_require_all_short_circuits() {
        let fx = fixture();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let f = require_all([
            Filter::from("b"),
            Filter::predicate(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            }),
        ]);
        assert!(!f.matches(fx.a, &fx.store));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(f.matches(fx.ab, &fx.store));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_require_any_short_circuits() {
        let fx = fixture();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let f = require_any([
            Filter::from("a"),
            Filter::predicate(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                false
            }),
        ]);
        assert!(f.matches(fx.a, &fx.store));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!f.matches(fx.none, &fx.store));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_filter_is_shareable_across_threads() {
        let fx = fixture();
        let f = require_all(["a", "b"]);
        let cloned = f.clone();
        let handle = std::thread::spawn(move || format!("{cloned:?}"));
        let rendered = handle.join().unwrap();
        assert!(rendered.starts_with("RequireAll"));
        assert!(f.matches(fx.ab, &fx.store));
    }
}
