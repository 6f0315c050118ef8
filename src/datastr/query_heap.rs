//! A priority queue for table queries, implemented with a 4-ary heap.
//!
//! Keys are tentative weights, elements are node ids, and each node carries a
//! payload that relaxation may overwrite. Keys and payloads of popped nodes
//! stay readable until the next `clear`, and `was_inserted` keeps answering
//! true for them, so the searches can tell "never seen" from "already
//! settled" without a second set. `clear` is O(queue length) through a
//! generation stamp rather than touching every node slot.
//!
//! # Examples
//!
//! ```
//! use rust_road_tables::datastr::query_heap::QueryHeap;
//!
//! let mut heap = QueryHeap::<u32>::new(3);
//! heap.insert(0, 42, 100);
//! heap.insert(1, 23, 200);
//! heap.decrease_key(0, 1);
//! assert_eq!(heap.pop(), Some(0));
//! assert_eq!(heap.key(0), 1);
//! assert!(heap.was_inserted(0));
//! assert!(!heap.was_inserted(2));
//! ```

use crate::datastr::graph::{NodeId, Weight};
use std::{cmp::min, mem::swap};

#[derive(Debug, Clone, Copy)]
struct State {
    key: Weight,
    node: NodeId,
}

const TREE_ARITY: usize = 4;
const INVALID_POSITION: usize = usize::MAX;

/// Addressable min-heap over node ids `[0, max_id)` with per-node payloads.
#[derive(Debug, Clone)]
pub struct QueryHeap<T> {
    heap: Vec<State>,
    positions: Vec<usize>,
    inserted: Vec<u32>,
    generation: u32,
    keys: Vec<Weight>,
    data: Vec<T>,
}

impl<T: Clone + Default> QueryHeap<T> {
    pub fn new(max_id: usize) -> QueryHeap<T> {
        QueryHeap {
            heap: Vec::new(),
            positions: vec![INVALID_POSITION; max_id],
            inserted: vec![0; max_id],
            generation: 1,
            keys: vec![0; max_id],
            data: vec![T::default(); max_id],
        }
    }

    /// The `max_id` this heap was sized for.
    pub fn num_ids(&self) -> usize {
        self.positions.len()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Forget all insertions. Keys and payloads become inaccessible until
    /// nodes are inserted again.
    pub fn clear(&mut self) {
        for state in self.heap.drain(..) {
            self.positions[state.node as usize] = INVALID_POSITION;
        }
        let (next, overflow) = self.generation.overflowing_add(1);
        self.generation = next;
        // on wraparound stale stamps could match again, so reset them all once
        if overflow {
            for stamp in &mut self.inserted {
                *stamp = 0;
            }
            self.generation = 1;
        }
    }

    /// True for every node inserted since the last `clear`, including nodes
    /// already popped.
    pub fn was_inserted(&self, node: NodeId) -> bool {
        self.inserted[node as usize] == self.generation
    }

    /// Is the node currently queued (inserted and not yet popped)?
    pub fn contains(&self, node: NodeId) -> bool {
        self.positions[node as usize] != INVALID_POSITION
    }

    /// Key of an inserted node. For popped nodes this is the final key.
    pub fn key(&self, node: NodeId) -> Weight {
        debug_assert!(self.was_inserted(node));
        self.keys[node as usize]
    }

    /// Payload of an inserted node.
    pub fn data(&self, node: NodeId) -> &T {
        debug_assert!(self.was_inserted(node));
        &self.data[node as usize]
    }

    /// Mutable payload access, used to overwrite on decrease-key.
    pub fn data_mut(&mut self, node: NodeId) -> &mut T {
        debug_assert!(self.was_inserted(node));
        &mut self.data[node as usize]
    }

    /// Queue a node. Panics in debug builds if it was already inserted since
    /// the last `clear`.
    pub fn insert(&mut self, node: NodeId, key: Weight, data: T) {
        debug_assert!(!self.was_inserted(node));
        self.inserted[node as usize] = self.generation;
        self.keys[node as usize] = key;
        self.data[node as usize] = data;
        let position = self.heap.len();
        self.positions[node as usize] = position;
        self.heap.push(State { key, node });
        self.move_up_in_tree(position);
    }

    /// Lower the key of a queued node. The new key must not exceed the old one.
    pub fn decrease_key(&mut self, node: NodeId, key: Weight) {
        debug_assert!(key <= self.keys[node as usize]);
        let position = self.positions[node as usize];
        debug_assert!(position != INVALID_POSITION);
        self.keys[node as usize] = key;
        self.heap[position].key = key;
        self.move_up_in_tree(position);
    }

    /// Remove and return the node with the minimum key, or `None` if the
    /// queue is empty. Key and payload of the popped node remain readable.
    pub fn pop(&mut self) -> Option<NodeId> {
        self.heap.pop().map(|mut item| {
            if !self.heap.is_empty() {
                swap(&mut item, &mut self.heap[0]);
                self.positions[self.heap[0].node as usize] = 0;
                self.move_down_in_tree(0);
            }
            self.positions[item.node as usize] = INVALID_POSITION;
            item.node
        })
    }

    fn move_up_in_tree(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / TREE_ARITY;
            if self.heap[parent].key <= self.heap[position].key {
                break;
            }
            self.positions.swap(self.heap[parent].node as usize, self.heap[position].node as usize);
            self.heap.swap(parent, position);
            position = parent;
        }
    }

    fn move_down_in_tree(&mut self, mut position: usize) {
        loop {
            let first_child = TREE_ARITY * position + 1;
            if first_child >= self.heap.len() {
                return;
            }
            let last_child = min(first_child + TREE_ARITY, self.heap.len());
            let mut smallest = position;
            for child in first_child..last_child {
                if self.heap[child].key < self.heap[smallest].key {
                    smallest = child;
                }
            }
            if smallest == position {
                return;
            }
            self.positions.swap(self.heap[position].node as usize, self.heap[smallest].node as usize);
            self.heap.swap(position, smallest);
            position = smallest;
        }
    }
}
