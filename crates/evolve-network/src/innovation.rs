//! Historical marking of structural genes.
//!
//! Every connection gene carries an innovation number assigned the first time its
//! `(source, target)` pair appears. Two genomes holding the same innovation number
//! hold homologous genes, which is what makes crossover between different
//! topologies well-defined.
//!
//! The tracker keeps two run-lifetime counters (innovations and node ids) and a
//! per-generation cache that deduplicates identical structural mutations made by
//! different genomes within the same generation. Only the cache is reset between
//! generations; both counters are monotonic for the whole run.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::gene::{Innovation, NodeId};

/// Persistent part of an [`InnovationTracker`].
///
/// This is what gets written alongside a saved population and shipped between
/// islands. The per-generation cache is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InnovationCounters {
    pub next_innovation: Innovation,
    pub next_node_id: NodeId,
}

/// Allocator for innovation numbers and hidden node ids.
///
/// The tracker is an explicit value owned by the evolution manager and passed by
/// `&mut` to every structural mutation.
///
/// # Example
///
/// ```
/// use evolve_network::innovation::InnovationTracker;
///
/// let mut tracker = InnovationTracker::for_shape(3, 2);
/// let a = tracker.get_innovation(0, 3);
/// assert_eq!(tracker.get_innovation(0, 3), a);
///
/// tracker.reset_generation_cache();
/// assert!(tracker.get_innovation(0, 3) > a);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InnovationTracker {
    counters: InnovationCounters,
    generation_cache: HashMap<(NodeId, NodeId), Innovation>,
}

impl InnovationTracker {
    /// Creates a tracker whose node ids start after the fixed input and output nodes.
    ///
    /// Input nodes use ids `0..input_count` and output nodes use
    /// `input_count..input_count + output_count`.
    #[must_use]
    pub fn for_shape(input_count: usize, output_count: usize) -> Self {
        let io = u32::try_from(input_count + output_count).unwrap_or(NodeId::MAX);
        Self::from_counters(InnovationCounters {
            next_innovation: 0,
            next_node_id: io,
        })
    }

    #[must_use]
    pub fn from_counters(counters: InnovationCounters) -> Self {
        Self {
            counters,
            generation_cache: HashMap::new(),
        }
    }

    #[must_use]
    pub fn counters(&self) -> InnovationCounters {
        self.counters
    }

    /// Returns the innovation number for a connection from `in_id` to `out_id`.
    ///
    /// If the same pair was already requested since the last
    /// [`reset_generation_cache`](Self::reset_generation_cache), the cached number is
    /// returned. Otherwise a new number is allocated.
    pub fn get_innovation(&mut self, in_id: NodeId, out_id: NodeId) -> Innovation {
        *self
            .generation_cache
            .entry((in_id, out_id))
            .or_insert_with(|| {
                let innovation = self.counters.next_innovation;
                self.counters.next_innovation += 1;
                innovation
            })
    }

    /// Allocates a fresh hidden node id. Never deduplicated.
    pub fn allocate_node_id(&mut self) -> NodeId {
        let id = self.counters.next_node_id;
        self.counters.next_node_id += 1;
        id
    }

    /// Clears the pair → innovation cache, leaving both counters untouched.
    pub fn reset_generation_cache(&mut self) {
        self.generation_cache.clear();
    }

    /// Raises both counters so they exceed the given ids.
    ///
    /// Used when genomes from another population (an island, a saved file) enter
    /// this run: new allocations must never collide with ids they already use.
    pub fn reseed_past(&mut self, max_node_id: Option<NodeId>, max_innovation: Option<Innovation>) {
        if let Some(id) = max_node_id {
            self.counters.next_node_id = self.counters.next_node_id.max(id.saturating_add(1));
        }
        if let Some(innovation) = max_innovation {
            self.counters.next_innovation = self.counters.next_innovation.max(innovation.saturating_add(1));
        }
    }

    /// Merges counters coming from another tracker, keeping the larger of each.
    pub fn merge_counters(&mut self, other: InnovationCounters) {
        self.counters.next_node_id = self.counters.next_node_id.max(other.next_node_id);
        self.counters.next_innovation = self.counters.next_innovation.max(other.next_innovation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_pair_same_generation_is_deduplicated() {
        let mut tracker = InnovationTracker::for_shape(2, 1);
        let first = tracker.get_innovation(0, 2);
        let other = tracker.get_innovation(1, 2);
        assert_ne!(first, other);
        assert_eq!(tracker.get_innovation(0, 2), first);
        assert_eq!(tracker.counters().next_innovation, 2);
    }

    #[test]
    fn test_reset_allocates_strictly_greater_number() {
        let mut tracker = InnovationTracker::for_shape(2, 1);
        let before = tracker.get_innovation(0, 2);
        tracker.reset_generation_cache();
        let after = tracker.get_innovation(0, 2);
        assert!(after > before);
    }

    #[test]
    fn test_node_ids_are_never_deduplicated() {
        let mut tracker = InnovationTracker::for_shape(3, 2);
        assert_eq!(tracker.allocate_node_id(), 5);
        assert_eq!(tracker.allocate_node_id(), 6);
        tracker.reset_generation_cache();
        assert_eq!(tracker.allocate_node_id(), 7);
    }

    #[test]
    fn test_reseed_only_moves_forward() {
        let mut tracker = InnovationTracker::for_shape(2, 2);
        tracker.reseed_past(Some(10), Some(3));
        assert_eq!(tracker.counters().next_node_id, 11);
        assert_eq!(tracker.counters().next_innovation, 4);

        tracker.reseed_past(Some(1), Some(0));
        assert_eq!(tracker.counters().next_node_id, 11);
        assert_eq!(tracker.counters().next_innovation, 4);

        tracker.merge_counters(InnovationCounters {
            next_innovation: 20,
            next_node_id: 5,
        });
        assert_eq!(tracker.counters().next_innovation, 20);
        assert_eq!(tracker.counters().next_node_id, 11);
    }
}
