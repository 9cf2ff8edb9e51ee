//! Index-addressable binary min-heap used by every search in the engine.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Unseen,
    Queued(usize),
    Settled,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    node: usize,
    cost: f64,
    seq: u64,
}

impl Entry {
    #[inline]
    fn precedes(&self, other: &Entry) -> bool {
        match self.cost.total_cmp(&other.cost) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => self.seq < other.seq,
        }
    }
}

/// A binary min-heap over node indices keyed by a mutable cost.
///
/// A position map tracks, for every node, whether it is unseen, queued at a given heap slot,
/// or already settled (popped). Equal costs pop in insertion order; lowering a node's cost
/// keeps its original insertion sequence.
#[derive(Debug, Clone, Default)]
pub struct NodeHeap {
    entries: Vec<Entry>,
    slots: Vec<Slot>,
    next_seq: u64,
}

impl NodeHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a heap sized for node indices `0..nodes`.
    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            entries: Vec::with_capacity(nodes),
            slots: vec![Slot::Unseen; nodes],
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empties the heap and forgets every node's state, keeping allocations.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.slots.fill(Slot::Unseen);
        self.next_seq = 0;
    }

    /// Cost of a queued node.
    pub fn cost_of(&self, node: usize) -> Option<f64> {
        match self.slot(node) {
            Slot::Queued(i) => Some(self.entries[i].cost),
            _ => None,
        }
    }

    pub fn is_queued(&self, node: usize) -> bool {
        matches!(self.slot(node), Slot::Queued(_))
    }

    pub fn is_settled(&self, node: usize) -> bool {
        self.slot(node) == Slot::Settled
    }

    /// Inserts `node`. A node that is already queued is given the lower of the two costs;
    /// a settled node is ignored.
    pub fn push(&mut self, node: usize, cost: f64) {
        match self.slot(node) {
            Slot::Unseen => self.insert(node, cost),
            Slot::Queued(_) => self.decrease_key(node, cost),
            Slot::Settled => {}
        }
    }

    /// Lowers the cost of `node`.
    ///
    /// No-op when the new cost is not lower or the node is settled; an unseen node is pushed.
    pub fn decrease_key(&mut self, node: usize, cost: f64) {
        match self.slot(node) {
            Slot::Unseen => self.insert(node, cost),
            Slot::Queued(i) => {
                if cost < self.entries[i].cost {
                    self.entries[i].cost = cost;
                    self.sift_up(i);
                }
            }
            Slot::Settled => {}
        }
    }

    /// Removes the minimum-cost node and marks it settled.
    pub fn pop_min(&mut self) -> Option<(usize, f64)> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        self.swap(0, last);
        let top = self.entries.pop()?;
        self.slots[top.node] = Slot::Settled;
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Some((top.node, top.cost))
    }

    fn slot(&self, node: usize) -> Slot {
        self.slots.get(node).copied().unwrap_or(Slot::Unseen)
    }

    fn insert(&mut self, node: usize, cost: f64) {
        if node >= self.slots.len() {
            self.slots.resize(node + 1, Slot::Unseen);
        }
        let index = self.entries.len();
        self.entries.push(Entry {
            node,
            cost,
            seq: self.next_seq,
        });
        self.next_seq += 1;
        self.slots[node] = Slot::Queued(index);
        self.sift_up(index);
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.entries.swap(a, b);
        self.slots[self.entries[a].node] = Slot::Queued(a);
        self.slots[self.entries[b].node] = Slot::Queued(b);
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.entries[i].precedes(&self.entries[parent]) {
                self.swap(i, parent);
                i = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.entries.len();
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            let mut best = i;
            if left < n && self.entries[left].precedes(&self.entries[best]) {
                best = left;
            }
            if right < n && self.entries[right].precedes(&self.entries[best]) {
                best = right;
            }
            if best == i {
                break;
            }
            self.swap(i, best);
            i = best;
        }
    }
}
