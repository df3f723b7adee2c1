//! Array-backed binary heap with in-place removal by id
//!
//! Besides the backing array, the heap keeps an id -> position map so that
//! `remove_by_id` does not need a linear scan. Each id appears at most once.
//!
//! Ties on the key are broken by insertion order: of two items with equal
//! keys, the one inserted first surfaces first.

use std::collections::HashMap;
use std::hash::Hash;

/// An element that can be ordered by the heap
pub trait HeapItem {
    type Id: Clone + Eq + Hash + std::fmt::Debug;

    fn heap_id(&self) -> Self::Id;

    fn heap_key(&self) -> i64;
}

/// Which end of the key range surfaces at the root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapOrder {
    /// Largest key first
    Max,
    /// Smallest key first
    Min,
}

#[derive(Debug, Clone)]
struct Slot<T> {
    item: T,
    key: i64,
    seq: u64,
}

/// Binary heap over `HeapItem`s
#[derive(Debug, Clone)]
pub struct PriorityHeap<T: HeapItem> {
    order: HeapOrder,
    slots: Vec<Slot<T>>,
    positions: HashMap<T::Id, usize>,
    next_seq: u64,
}

impl<T: HeapItem> PriorityHeap<T> {
    pub fn new(order: HeapOrder) -> Self {
        Self {
            order,
            slots: Vec::new(),
            positions: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Highest key first
    pub fn max() -> Self {
        Self::new(HeapOrder::Max)
    }

    /// Lowest key first
    pub fn min() -> Self {
        Self::new(HeapOrder::Min)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.positions.contains_key(id)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.positions.clear();
    }

    /// Insert an item, replacing (and returning) any item with the same id
    pub fn insert(&mut self, item: T) -> Option<T> {
        let id = item.heap_id();
        let replaced = self.remove_by_id(&id);

        let slot = Slot {
            key: item.heap_key(),
            item,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        self.slots.push(slot);
        let index = self.slots.len() - 1;
        self.positions.insert(id, index);
        self.sift_up(index);

        replaced
    }

    /// Root element without removing it
    pub fn peek(&self) -> Option<&T> {
        self.slots.first().map(|slot| &slot.item)
    }

    /// Remove and return the root element
    pub fn extract_top(&mut self) -> Option<T> {
        if self.slots.is_empty() {
            return None;
        }
        Some(self.remove_at(0))
    }

    /// Remove the item with the given id, if present
    pub fn remove_by_id(&mut self, id: &T::Id) -> Option<T> {
        let index = *self.positions.get(id)?;
        Some(self.remove_at(index))
    }

    /// Items in backing-array order; only the root position is meaningful
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.slots.iter().map(|slot| slot.item.clone()).collect()
    }

    /// Items in priority order, leaving this heap untouched
    pub fn drain_ordered(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.clone().into_sorted_vec()
    }

    /// Consume the heap, yielding items in priority order
    pub fn into_sorted_vec(mut self) -> Vec<T> {
        let mut sorted = Vec::with_capacity(self.slots.len());
        while let Some(item) = self.extract_top() {
            sorted.push(item);
        }
        sorted
    }

    fn remove_at(&mut self, index: usize) -> T {
        let removed = self.slots.swap_remove(index).item;
        self.positions.remove(&removed.heap_id());

        if index < self.slots.len() {
            self.positions.insert(self.slots[index].item.heap_id(), index);
            // The element moved into `index` may belong above or below it
            let index = self.sift_up(index);
            self.sift_down(index);
        }

        removed
    }

    /// Whether the slot at `a` should sit above the slot at `b`
    fn outranks(&self, a: usize, b: usize) -> bool {
        let (a, b) = (&self.slots[a], &self.slots[b]);
        if a.key == b.key {
            return a.seq < b.seq;
        }
        match self.order {
            HeapOrder::Max => a.key > b.key,
            HeapOrder::Min => a.key < b.key,
        }
    }

    fn sift_up(&mut self, mut index: usize) -> usize {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.outranks(index, parent) {
                break;
            }
            self.swap(index, parent);
            index = parent;
        }
        index
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.slots.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut best = index;

            if left < len && self.outranks(left, best) {
                best = left;
            }
            if right < len && self.outranks(right, best) {
                best = right;
            }
            if best == index {
                break;
            }
            self.swap(index, best);
            index = best;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.slots.swap(a, b);
        self.positions.insert(self.slots[a].item.heap_id(), a);
        self.positions.insert(self.slots[b].item.heap_id(), b);
    }
}

impl<T: HeapItem> Extend<T> for PriorityHeap<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item);
        }
    }
}
