//! # engine_component
//!
//! The "E" and "C" in ECS. Everything the world needs to know about an entity
//! lives here, and nothing more.
//!
//! This crate provides:
//!
//! - [`Entity`]: lightweight `u64` entity identifiers.
//! - [`EntityAllocator`]: monotonically increasing ID allocator.
//! - [`Component`] trait and [`ComponentTypeId`]: the keys filters test for.
//! - [`ComponentStore`]: caller-owned, type-erased component data.
//! - [`Filter`]: composable predicates that select entities for systems,
//!   built from combinators or parsed from a pattern string.

pub mod component;
pub mod entity;
pub mod filter;
pub mod pattern;
pub mod store;

pub use component::{Component, ComponentTypeId};
pub use entity::{Entity, EntityAllocator};
pub use filter::{Filter, reject_all, reject_any, require_all, require_any};
pub use pattern::FilterParseError;
pub use store::ComponentStore;
