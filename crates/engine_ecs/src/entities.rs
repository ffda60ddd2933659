//! A system's list of matching entities.
//!
//! [`SystemEntities`] pairs the ordered entity list with a reverse index
//! (entity → position). The two are kept exact inverses of each other, which
//! is what makes removal O(1): the removed slot is filled with the last entity
//! and only that entity's index entry changes.

use std::cmp::Ordering;
use std::collections::HashMap;

use engine_component::Entity;

/// The ordered entities currently matching a system, with a reverse index.
///
/// Order is insertion order until a removal swaps the last entity into the
/// freed slot, or until [`sort_by`](Self::sort_by) reorders the list.
#[derive(Debug, Clone, Default)]
pub struct SystemEntities {
    entities: Vec<Entity>,
    index: HashMap<Entity, usize>,
}

impl SystemEntities {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if no entity matches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The entities in list order.
    #[must_use]
    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    /// Iterate over the entities in list order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter().copied()
    }

    /// Returns the entity at `position`.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<Entity> {
        self.entities.get(position).copied()
    }

    /// Returns `true` if `entity` is in the list.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.index.contains_key(&entity)
    }

    /// Returns the position of `entity` in the list.
    #[must_use]
    pub fn position(&self, entity: Entity) -> Option<usize> {
        self.index.get(&entity).copied()
    }

    /// Append `entity`. Returns `false` (and changes nothing) if it is
    /// already present.
    pub(crate) fn push(&mut self, entity: Entity) -> bool {
        if self.index.contains_key(&entity) {
            return false;
        }
        self.index.insert(entity, self.entities.len());
        self.entities.push(entity);
        true
    }

    /// Remove `entity` by moving the last entity into its slot.
    ///
    /// Returns `false` if it was not present.
    pub(crate) fn swap_remove(&mut self, entity: Entity) -> bool {
        let Some(position) = self.index.remove(&entity) else {
            return false;
        };
        self.entities.swap_remove(position);
        if let Some(&moved) = self.entities.get(position) {
            self.index.insert(moved, position);
        }
        true
    }

    /// Sort the list with `compare` and rebuild the reverse index to match.
    ///
    /// The sort is stable.
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&Entity, &Entity) -> Ordering,
    {
        self.entities.sort_by(compare);
        for (position, entity) in self.entities.iter().enumerate() {
            self.index.insert(*entity, position);
        }
    }

    /// Check that the list and the reverse index are exact inverses.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.entities.len() == self.index.len()
            && self
                .entities
                .iter()
                .enumerate()
                .all(|(position, entity)| self.index.get(entity) == Some(&position))
    }
}

impl<'a> IntoIterator for &'a SystemEntities {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn entities(n: u64) -> Vec<Entity> {
        (1..=n).map(Entity::from_raw).collect()
    }

    fn list_of(items: &[Entity]) -> SystemEntities {
        let mut list = SystemEntities::new();
        for &e in items {
            assert!(list.push(e));
        }
        list
    }

    #[test]
    fn test_push_keeps_insertion_order() {
        let items = entities(4);
        let list = list_of(&items);
        assert_eq!(list.as_slice(), items.as_slice());
        assert_eq!(list.position(items[2]), Some(2));
        assert!(list.is_consistent());
    }

    #[test]
    fn test_push_rejects_duplicates() {
        let items = entities(2);
        let mut list = list_of(&items);
        assert!(!list.push(items[0]));
        assert_eq!(list.len(), 2);
        assert!(list.is_consistent());
    }

    #[test]
    fn test_swap_remove_moves_last_into_slot() {
        let items = entities(3);
        let mut list = list_of(&items);
        assert!(list.swap_remove(items[0]));
        assert_eq!(list.as_slice(), &[items[2], items[1]]);
        assert_eq!(list.position(items[2]), Some(0));
        assert!(!list.contains(items[0]));
        assert!(list.is_consistent());
    }

    #[test]
    fn test_swap_remove_last_and_missing() {
        let items = entities(2);
        let mut list = list_of(&items);
        assert!(list.swap_remove(items[1]));
        assert!(!list.swap_remove(items[1]));
        assert!(!list.swap_remove(Entity::from_raw(99)));
        assert_eq!(list.as_slice(), &[items[0]]);
        assert!(list.swap_remove(items[0]));
        assert!(list.is_empty());
        assert!(list.is_consistent());
    }

    #[test]
    fn test_swap_remove_any_position_leaves_the_rest() {
        let n = 6;
        let items = entities(n);
        for k in 0..items.len() {
            let mut list = list_of(&items);
            assert!(list.swap_remove(items[k]));

            let remaining: BTreeSet<Entity> = list.iter().collect();
            let expected: BTreeSet<Entity> =
                items.iter().copied().filter(|&e| e != items[k]).collect();
            assert_eq!(remaining, expected, "removing position {k}");
            assert_eq!(list.len(), items.len() - 1);
            assert!(list.is_consistent(), "removing position {k}");
        }
    }

    #[test]
    fn test_sort_by_rebuilds_index() {
        let items = entities(5);
        let mut list = list_of(&items);
        list.swap_remove(items[1]);
        list.sort_by(|a, b| b.cmp(a));
        assert_eq!(
            list.as_slice(),
            &[items[4], items[3], items[2], items[0]]
        );
        assert_eq!(list.position(items[4]), Some(0));
        assert!(list.is_consistent());
    }
}
