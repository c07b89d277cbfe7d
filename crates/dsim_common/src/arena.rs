//! Dense, ID-indexed storage for signals and processes.
//!
//! Elaboration allocates every signal and process exactly once, so an
//! append-only [`Arena`] gives stable IDs for the whole run. Unlike a bare
//! `Vec`, lookups through [`Arena::try_get`] let the kernel turn a stale or
//! foreign ID into a diagnosable error instead of a panic.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Trait for opaque ID types used as arena keys.
///
/// Implementors must provide a bijection between `u32` indices and the ID type.
pub trait ArenaId: Copy {
    /// Creates an ID from a raw `u32` index.
    fn from_raw(index: u32) -> Self;

    /// Returns the raw `u32` index.
    fn as_raw(self) -> u32;
}

/// An append-only container addressed by typed IDs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena<I: ArenaId, T> {
    items: Vec<T>,
    #[serde(skip)]
    _marker: PhantomData<I>,
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Creates a new, empty arena.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Allocates a new item and returns its ID.
    pub fn alloc(&mut self, item: T) -> I {
        let id = I::from_raw(self.items.len() as u32);
        self.items.push(item);
        id
    }

    /// Returns a reference to the item with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    pub fn get(&self, id: I) -> &T {
        &self.items[id.as_raw() as usize]
    }

    /// Returns a mutable reference to the item with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    pub fn get_mut(&mut self, id: I) -> &mut T {
        &mut self.items[id.as_raw() as usize]
    }

    /// Returns the item with the given ID, or `None` if it was never allocated here.
    pub fn try_get(&self, id: I) -> Option<&T> {
        self.items.get(id.as_raw() as usize)
    }

    /// Mutable counterpart of [`try_get`](Self::try_get).
    pub fn try_get_mut(&mut self, id: I) -> Option<&mut T> {
        self.items.get_mut(id.as_raw() as usize)
    }

    /// Returns `true` if `id` addresses an allocated item.
    pub fn contains(&self, id: I) -> bool {
        (id.as_raw() as usize) < self.items.len()
    }

    /// Returns the number of items in the arena.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the arena contains no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over `(ID, &T)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (I::from_raw(i as u32), item))
    }

    /// Iterates over `(ID, &mut T)` pairs in allocation order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (I, &mut T)> {
        self.items
            .iter_mut()
            .enumerate()
            .map(|(i, item)| (I::from_raw(i as u32), item))
    }

    /// Iterates over all IDs in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = I> {
        (0..self.items.len() as u32).map(I::from_raw)
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        self.get(id)
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        self.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct SlotId(u32);

    impl ArenaId for SlotId {
        fn from_raw(index: u32) -> Self {
            Self(index)
        }

        fn as_raw(self) -> u32 {
            self.0
        }
    }

    #[test]
    fn alloc_and_index() {
        let mut arena: Arena<SlotId, &str> = Arena::new();
        let a = arena.alloc("clk");
        let b = arena.alloc("rst");
        assert_eq!(arena[a], "clk");
        assert_eq!(arena[b], "rst");
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn get_mut_modifies() {
        let mut arena: Arena<SlotId, u32> = Arena::new();
        let id = arena.alloc(1);
        *arena.get_mut(id) += 41;
        assert_eq!(arena[id], 42);
    }

    #[test]
    fn try_get_rejects_foreign_ids() {
        let mut arena: Arena<SlotId, u32> = Arena::new();
        let id = arena.alloc(7);
        assert_eq!(arena.try_get(id), Some(&7));
        assert!(arena.try_get(SlotId(5)).is_none());
        assert!(!arena.contains(SlotId(1)));
        assert!(arena.try_get_mut(SlotId(1)).is_none());
    }

    #[test]
    fn ids_are_sequential() {
        let mut arena: Arena<SlotId, u32> = Arena::new();
        arena.alloc(100);
        arena.alloc(200);
        let ids: Vec<u32> = arena.ids().map(|id| id.as_raw()).collect();
        assert_eq!(ids, vec![0, 1]);
        let pairs: Vec<_> = arena.iter().map(|(id, v)| (id.0, *v)).collect();
        assert_eq!(pairs, vec![(0, 100), (1, 200)]);
    }

    #[test]
    fn default_is_empty() {
        let arena: Arena<SlotId, u32> = Arena::default();
        assert!(arena.is_empty());
    }
}
