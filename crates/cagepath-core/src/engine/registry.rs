use super::pathfinder::{Pair, Path};
use crate::core::models::ids::{PairId, PathId};
use slotmap::{Key, SlotMap};

#[derive(Debug, Clone)]
struct Slot<T> {
    value: T,
    priority: f64,
}

/// Arena-backed collection with stable keys and two traversal orders.
///
/// Insertion order is FIFO. Priority order is ascending; entries added without a priority
/// sort last, and an entry added with [`add_in_order`](Self::add_in_order) goes after every
/// existing entry of equal priority.
#[derive(Debug, Clone)]
pub struct Registry<K: Key, T> {
    items: SlotMap<K, Slot<T>>,
    insertion: Vec<K>,
    priority: Vec<K>,
}

pub type PairRegistry = Registry<PairId, Pair>;
pub type PathRegistry = Registry<PathId, Path>;

impl<K: Key, T> Default for Registry<K, T> {
    fn default() -> Self {
        Self {
            items: SlotMap::with_key(),
            insertion: Vec::new(),
            priority: Vec::new(),
        }
    }
}

impl<K: Key, T> Registry<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: K) -> bool {
        self.items.contains_key(id)
    }

    /// Appends `value` to both orders with priority +∞.
    pub fn add(&mut self, value: T) -> K {
        let id = self.items.insert(Slot {
            value,
            priority: f64::INFINITY,
        });
        self.insertion.push(id);
        self.priority.push(id);
        id
    }

    /// Inserts `value` into the priority order after all entries whose priority is not greater.
    pub fn add_in_order(&mut self, value: T, priority: f64) -> K {
        let position = self
            .priority
            .iter()
            .position(|&k| priority.total_cmp(&self.items[k].priority).is_lt())
            .unwrap_or(self.priority.len());
        let id = self.items.insert(Slot { value, priority });
        self.insertion.push(id);
        self.priority.insert(position, id);
        id
    }

    pub fn get(&self, id: K) -> Option<&T> {
        self.items.get(id).map(|s| &s.value)
    }

    pub fn get_mut(&mut self, id: K) -> Option<&mut T> {
        self.items.get_mut(id).map(|s| &mut s.value)
    }

    pub fn priority(&self, id: K) -> Option<f64> {
        self.items.get(id).map(|s| s.priority)
    }

    pub fn first(&self) -> Option<(K, &T)> {
        let id = *self.priority.first()?;
        self.get(id).map(|v| (id, v))
    }

    /// Removes the head of the priority order.
    pub fn remove_first(&mut self) -> Option<(K, T)> {
        let id = *self.priority.first()?;
        self.remove(id).map(|v| (id, v))
    }

    pub fn remove(&mut self, id: K) -> Option<T> {
        let slot = self.items.remove(id)?;
        self.insertion.retain(|&k| k != id);
        self.priority.retain(|&k| k != id);
        Some(slot.value)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.insertion.clear();
        self.priority.clear();
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> + '_ {
        self.insertion
            .iter()
            .filter_map(|&k| self.items.get(k).map(|s| (k, &s.value)))
    }

    /// Entries in ascending priority order.
    pub fn iter_by_priority(&self) -> impl Iterator<Item = (K, &T)> + '_ {
        self.priority
            .iter()
            .filter_map(|&k| self.items.get(k).map(|s| (k, &s.value)))
    }

    pub fn ids(&self) -> impl Iterator<Item = K> + '_ {
        self.insertion.iter().copied()
    }
}
