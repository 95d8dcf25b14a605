//! Recency order backed by `SlotArena`.
//!
//! Nodes live in a [`SlotArena`] and are linked by [`SlotId`], giving O(1)
//! splice operations without pointer cycles. Each node carries the access
//! timestamp it was last stamped with.
//!
//! ## Architecture
//!
//! ```text
//!   arena (SlotArena<Node<T>>)
//!   ┌────────┬──────────────────────────────────────────────────────┐
//!   │ SlotId │ Node { value, prev, next, timestamp }                │
//!   ├────────┼──────────────────────────────────────────────────────┤
//!   │ id_1   │ { value: C, prev: None,       next: id_2, ts: 3 }    │
//!   │ id_2   │ { value: B, prev: Some(id_1), next: id_3, ts: 2 }    │
//!   │ id_3   │ { value: A, prev: Some(id_2), next: None, ts: 1 }    │
//!   └────────┴──────────────────────────────────────────────────────┘
//!
//!   head ─► [id_1] ◄──► [id_2] ◄──► [id_3] ◄── tail
//!    (MRU)                                      (LRU)
//! ```
//!
//! ## Operations
//! - `insert_at_head(value, ts)`: O(1)
//! - `remove(id)`: detach + free slot, O(1)
//! - `promote(id, ts)`: detach + attach at head unless already head, O(1)
//! - `iter` / `iter_rev`: O(n)

use crate::ds::slot_arena::{SlotArena, SlotId};

#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    prev: Option<SlotId>,
    next: Option<SlotId>,
    timestamp: u64,
}

/// Doubly linked most-recent → least-recent order over arena slots.
#[derive(Debug, Clone)]
pub struct RecencyQueue<T> {
    arena: SlotArena<Node<T>>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
}

impl<T> RecencyQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            arena: SlotArena::new(),
            head: None,
            tail: None,
        }
    }

    /// Creates an empty queue with reserved node capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: SlotArena::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.arena.contains(id)
    }

    /// Returns the SlotId at the head (MRU) of the queue.
    pub fn front_id(&self) -> Option<SlotId> {
        self.head
    }

    /// Returns the SlotId at the tail (LRU) of the queue.
    pub fn back_id(&self) -> Option<SlotId> {
        self.tail
    }

    /// Returns the neighbour of `id` towards the head.
    pub fn prev_id(&self, id: SlotId) -> Option<SlotId> {
        self.arena.get(id).and_then(|node| node.prev)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.arena.get(id).map(|node| &node.value)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.arena.get_mut(id).map(|node| &mut node.value)
    }

    /// Returns the timestamp recorded for `id`, if present.
    pub fn timestamp(&self, id: SlotId) -> Option<u64> {
        self.arena.get(id).map(|node| node.timestamp)
    }

    /// Sets the timestamp for `id`; returns `false` if `id` is not present.
    pub fn set_timestamp(&mut self, id: SlotId, timestamp: u64) -> bool {
        if let Some(node) = self.arena.get_mut(id) {
            node.timestamp = timestamp;
            true
        } else {
            false
        }
    }

    /// Links a new node at the head and returns its `SlotId`.
    pub fn insert_at_head(&mut self, value: T, timestamp: u64) -> SlotId {
        let id = self.arena.insert(Node {
            value,
            prev: None,
            next: self.head,
            timestamp,
        });
        if let Some(head) = self.head {
            if let Some(node) = self.arena.get_mut(head) {
                node.prev = Some(id);
            }
        } else {
            self.tail = Some(id);
        }
        self.head = Some(id);
        id
    }

    /// Unlinks `id` and returns its value.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        self.detach(id)?;
        self.arena.remove(id).map(|node| node.value)
    }

    /// Moves `id` to the head and restamps it; returns `false` if absent.
    pub fn promote(&mut self, id: SlotId, timestamp: u64) -> bool {
        if !self.set_timestamp(id, timestamp) {
            return false;
        }
        if Some(id) == self.head {
            return true;
        }
        self.detach(id);
        self.attach_front(id);
        true
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.head = None;
        self.tail = None;
    }

    /// Iterates `(SlotId, &T)` from head (MRU) to tail (LRU).
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            queue: self,
            current: self.head,
        }
    }

    /// Iterates `(SlotId, &T)` from tail (LRU) to head (MRU).
    pub fn iter_rev(&self) -> IterRev<'_, T> {
        IterRev {
            queue: self,
            current: self.tail,
        }
    }

    fn detach(&mut self, id: SlotId) -> Option<()> {
        let (prev, next) = {
            let node = self.arena.get(id)?;
            (node.prev, node.next)
        };

        if let Some(prev_id) = prev {
            if let Some(prev_node) = self.arena.get_mut(prev_id) {
                prev_node.next = next;
            }
        } else {
            self.head = next;
        }

        if let Some(next_id) = next {
            if let Some(next_node) = self.arena.get_mut(next_id) {
                next_node.prev = prev;
            }
        } else {
            self.tail = prev;
        }

        if let Some(node) = self.arena.get_mut(id) {
            node.prev = None;
            node.next = None;
        }

        Some(())
    }

    fn attach_front(&mut self, id: SlotId) -> Option<()> {
        let old_head = self.head;
        let node = self.arena.get_mut(id)?;
        node.prev = None;
        node.next = old_head;
        if let Some(old_head) = old_head {
            if let Some(head_node) = self.arena.get_mut(old_head) {
                head_node.prev = Some(id);
            }
        } else {
            self.tail = Some(id);
        }
        self.head = Some(id);
        Some(())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        if self.head.is_none() || self.tail.is_none() {
            assert!(self.head.is_none());
            assert!(self.tail.is_none());
            assert_eq!(self.len(), 0);
            return;
        }

        let mut count = 0usize;
        let mut current = self.head;
        let mut prev = None;

        while let Some(id) = current {
            let node = self.arena.get(id).expect("node missing");
            assert_eq!(node.prev, prev);
            if node.next.is_none() {
                assert_eq!(self.tail, Some(id));
            }
            prev = Some(id);
            current = node.next;
            count += 1;
            assert!(count <= self.len(), "cycle detected in recency queue");
        }

        assert_eq!(count, self.len());
    }
}

impl<T> Default for RecencyQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator from head to tail.
pub struct Iter<'a, T> {
    queue: &'a RecencyQueue<T>,
    current: Option<SlotId>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (SlotId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = self.queue.arena.get(id)?;
        self.current = node.next;
        Some((id, &node.value))
    }
}

/// Iterator from tail to head.
pub struct IterRev<'a, T> {
    queue: &'a RecencyQueue<T>,
    current: Option<SlotId>,
}

impl<'a, T> Iterator for IterRev<'a, T> {
    type Item = (SlotId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = self.queue.arena.get(id)?;
        self.current = node.prev;
        Some((id, &node.value))
    }
}
