//! The memory-bounded node-id → location cache.
//!
//! Two storage strategies, optionally combined:
//!
//! * **Dense**: a two-level radix — blocks of `PER_BLOCK` contiguous slots
//!   indexed by the high bits of the id. A block is materialized the first
//!   time any of its ids is set.
//! * **Sparse**: an append-only array of `(id, location)` pairs, strictly
//!   increasing in id, probed by binary search.
//!
//! In combined mode, writes go to Dense. Dense keeps a min-heap of
//! materialized blocks keyed by fill count; once the configured budget is
//! exhausted, the least-populated block is evicted (flushed into Sparse
//! when combined, discarded otherwise) and its slab reused for the new
//! block.

use crate::errors::{InputError, ResourceError};
use crate::location::{check_id, Identifier, Location, MAX_ABS_ID};
use std::collections::HashMap;

/// 2^13 contiguous slots per dense block.
const BLOCK_SHIFT: u32 = 13;
const PER_BLOCK: i64 = 1 << BLOCK_SHIFT;
const BLOCK_MASK: i64 = PER_BLOCK - 1;

fn id_to_block(id: Identifier) -> i64 {
    id >> BLOCK_SHIFT
}

fn id_to_offset(id: Identifier) -> usize {
    (id & BLOCK_MASK) as usize
}

/// Which allocation strategy (or combination) backs the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStrategy {
    Dense,
    Sparse,
    /// Same on-disk/in-memory shape as `Dense`; the original system's
    /// distinction between one-big-allocation and chunk-at-a-time dense
    /// storage is a low-level allocator concern that doesn't translate to
    /// safe Rust, where each block is already its own heap allocation.
    Chunk,
    /// Dense combined with Sparse as an eviction target.
    Optimized,
}

struct Block {
    slots: Vec<Location>,
    used: u32,
    last_written_id: Option<Identifier>,
}

impl Block {
    fn new() -> Block {
        Block {
            slots: vec![Location::UNDEFINED; PER_BLOCK as usize],
            used: 0,
            last_written_id: None,
        }
    }
}

/// A minimal indexed min-heap over block ids, keyed by fill count.
#[derive(Default)]
struct EvictionHeap {
    heap: Vec<i64>,
    position: HashMap<i64, usize>,
}

impl EvictionHeap {
    fn len(&self) -> usize {
        self.heap.len()
    }

    fn key(blocks: &HashMap<i64, Block>, block_id: i64) -> u32 {
        blocks[&block_id].used
    }

    fn push(&mut self, block_id: i64, blocks: &HashMap<i64, Block>) {
        self.heap.push(block_id);
        let pos = self.heap.len() - 1;
        self.position.insert(block_id, pos);
        self.sift_up(pos, blocks);
    }

    fn peek_min(&self) -> Option<i64> {
        self.heap.first().copied()
    }

    fn touch(&mut self, block_id: i64, blocks: &HashMap<i64, Block>) {
        if let Some(&pos) = self.position.get(&block_id) {
            self.sift_down(pos, blocks);
        }
    }

    /// Replaces the block sitting at the heap root with `new_id`, restoring
    /// the heap property. Used when the evicted block's slab is reused.
    fn replace_root(&mut self, old_id: i64, new_id: i64, blocks: &HashMap<i64, Block>) {
        self.position.remove(&old_id);
        self.heap[0] = new_id;
        self.position.insert(new_id, 0);
        self.sift_down(0, blocks);
    }

    fn sift_up(&mut self, mut pos: usize, blocks: &HashMap<i64, Block>) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if Self::key(blocks, self.heap[pos]) < Self::key(blocks, self.heap[parent]) {
                self.swap(pos, parent);
                pos = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut pos: usize, blocks: &HashMap<i64, Block>) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            let right = 2 * pos + 2;
            let mut smallest = pos;
            if left < len && Self::key(blocks, self.heap[left]) < Self::key(blocks, self.heap[smallest]) {
                smallest = left;
            }
            if right < len && Self::key(blocks, self.heap[right]) < Self::key(blocks, self.heap[smallest]) {
                smallest = right;
            }
            if smallest == pos {
                break;
            }
            self.swap(pos, smallest);
            pos = smallest;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.position.insert(self.heap[a], a);
        self.position.insert(self.heap[b], b);
    }
}

struct Dense {
    blocks: HashMap<i64, Block>,
    heap: EvictionHeap,
    max_blocks: usize,
}

impl Dense {
    fn new(max_blocks: usize) -> Dense {
        Dense {
            blocks: HashMap::new(),
            heap: EvictionHeap::default(),
            max_blocks,
        }
    }

    fn get(&self, id: Identifier) -> Location {
        let block_id = id_to_block(id);
        match self.blocks.get(&block_id) {
            Some(block) => block.slots[id_to_offset(id)],
            None => Location::UNDEFINED,
        }
    }

    /// Sets `id`, possibly evicting the least-populated block. If a block
    /// is evicted, returns its surviving (id, location) pairs so the caller
    /// can flush them to Sparse.
    fn set(&mut self, id: Identifier, loc: Location, warn_once: &mut bool) -> Option<Vec<(Identifier, Location)>> {
        if self.max_blocks == 0 {
            return None;
        }

        let block_id = id_to_block(id);
        let offset = id_to_offset(id);
        let mut evicted = None;

        if !self.blocks.contains_key(&block_id) {
            if self.heap.len() < self.max_blocks {
                self.blocks.insert(block_id, Block::new());
                self.heap.push(block_id, &self.blocks);
            } else {
                let victim = self.heap.peek_min().expect("heap non-empty when at capacity");
                let mut victim_block = self.blocks.remove(&victim).expect("victim present");
                evicted = Some(drain_valid(&mut victim_block, victim));
                self.blocks.insert(block_id, Block::new());
                self.heap.replace_root(victim, block_id, &self.blocks);
            }
        }

        let block = self.blocks.get_mut(&block_id).expect("just inserted");
        let is_new_insertion_point = block.last_written_id.is_none() || offset_is_expected(block, id);
        if !is_new_insertion_point {
            if *warn_once {
                log::warn!(
                    "found out-of-order node {} in an already-materialized block; dropping to preserve cache efficiency",
                    id
                );
                *warn_once = false;
            }
            return evicted;
        }

        block.slots[offset] = loc;
        block.used += 1;
        block.last_written_id = Some(id);
        self.heap.touch(block_id, &self.blocks);

        evicted
    }
}

fn offset_is_expected(block: &Block, id: Identifier) -> bool {
    match block.last_written_id {
        Some(prev) => id >= prev,
        None => true,
    }
}

fn drain_valid(block: &mut Block, victim_block_id: i64) -> Vec<(Identifier, Location)> {
    let mut out = Vec::new();
    for (offset, loc) in block.slots.iter().enumerate() {
        if loc.is_defined() {
            let id = (victim_block_id << BLOCK_SHIFT) + offset as i64;
            out.push((id, *loc));
        }
    }
    out
}

struct Sparse {
    entries: Vec<(Identifier, Location)>,
    max_tuples: Option<usize>,
}

impl Sparse {
    fn new(max_tuples: Option<usize>) -> Sparse {
        Sparse { entries: Vec::new(), max_tuples }
    }

    fn get(&self, id: Identifier) -> Location {
        match self.entries.binary_search_by_key(&id, |&(i, _)| i) {
            Ok(pos) => self.entries[pos].1,
            Err(_) => Location::UNDEFINED,
        }
    }

    /// Strictly-increasing append. `lossy` controls whether violations and
    /// capacity overflows are silently dropped or reported as errors.
    fn try_append(&mut self, id: Identifier, loc: Location, lossy: bool) -> Result<(), ResourceError> {
        if let Some(&(last_id, _)) = self.entries.last() {
            if id < last_id {
                if lossy {
                    return Ok(());
                }
                return Err(ResourceError::CapacityExceeded);
            }
            if id == last_id {
                return Ok(());
            }
        }
        if let Some(max) = self.max_tuples {
            if self.entries.len() >= max {
                if lossy {
                    return Ok(());
                }
                return Err(ResourceError::CapacityExceeded);
            }
        }
        self.entries.push((id, loc));
        Ok(())
    }
}

const LOCATION_BYTES: usize = 8;
const BLOCK_BYTES: usize = PER_BLOCK as usize * LOCATION_BYTES;
const SPARSE_TUPLE_BYTES: usize = 8 + LOCATION_BYTES;

enum Backing {
    Dense(Dense),
    Sparse(Sparse),
    Both(Dense, Sparse),
}

impl Backing {
    fn stored_count(&self) -> u64 {
        match self {
            Backing::Dense(dense) => dense.blocks.values().map(|b| b.used as u64).sum(),
            Backing::Sparse(sparse) => sparse.entries.len() as u64,
            Backing::Both(dense, sparse) => {
                dense.blocks.values().map(|b| b.used as u64).sum::<u64>() + sparse.entries.len() as u64
            }
        }
    }
}

/// `NodeStore::set`/`get` counters, surfaced for the final run summary.
#[derive(Debug, Default, Clone, Copy)]
pub struct NodeStoreCounters {
    pub total_nodes: u64,
    pub stored_nodes: u64,
    pub lookups: u64,
    pub hits: u64,
}

pub struct NodeStore {
    backing: Backing,
    lossy: bool,
    warn_node_order: bool,
    counters: NodeStoreCounters,
}

impl NodeStore {
    pub fn new(strategy: CacheStrategy, cache_size_mb: u64, lossy: bool) -> NodeStore {
        let budget_bytes = cache_size_mb.saturating_mul(1024 * 1024) as usize;
        let max_blocks = budget_bytes / BLOCK_BYTES;
        let max_sparse_tuples = budget_bytes / SPARSE_TUPLE_BYTES;

        let backing = match strategy {
            CacheStrategy::Dense | CacheStrategy::Chunk => Backing::Dense(Dense::new(max_blocks)),
            CacheStrategy::Sparse => Backing::Sparse(Sparse::new(Some(max_sparse_tuples))),
            CacheStrategy::Optimized => {
                Backing::Both(Dense::new(max_blocks), Sparse::new(Some(max_sparse_tuples)))
            }
        };

        NodeStore {
            backing,
            lossy,
            warn_node_order: true,
            counters: NodeStoreCounters::default(),
        }
    }

    /// Inserts `(id, loc)`. Fails loudly with `IdTooLarge` if `|id| >= 2^42`.
    pub fn set(&mut self, id: Identifier, loc: Location) -> Result<(), NodeStoreError> {
        check_id(id).map_err(NodeStoreError::Input)?;
        self.counters.total_nodes += 1;

        match &mut self.backing {
            Backing::Dense(dense) => {
                dense.set(id, loc, &mut self.warn_node_order);
            }
            Backing::Sparse(sparse) => {
                sparse.try_append(id, loc, self.lossy).map_err(|e| {
                    if let Some(&(last_id, _)) = sparse.entries.last() {
                        if id < last_id {
                            return NodeStoreError::Input(InputError::OutOfOrder(id, last_id));
                        }
                    }
                    NodeStoreError::Resource(e)
                })?;
            }
            Backing::Both(dense, sparse) => {
                if let Some(evicted) = dense.set(id, loc, &mut self.warn_node_order) {
                    for (eid, eloc) in evicted {
                        sparse.try_append(eid, eloc, self.lossy).map_err(NodeStoreError::Resource)?;
                    }
                }
            }
        }

        self.counters.stored_nodes = self.backing.stored_count();

        Ok(())
    }

    /// Reads the location of `id`, or `None` if it was never set, evicted,
    /// or stored as invalid. Never fails.
    pub fn get(&mut self, id: Identifier) -> Option<Location> {
        self.counters.lookups += 1;
        let found = match &self.backing {
            Backing::Dense(dense) => dense.get(id),
            Backing::Sparse(sparse) => sparse.get(id),
            Backing::Both(dense, sparse) => {
                let loc = dense.get(id);
                if loc.is_defined() {
                    loc
                } else {
                    sparse.get(id)
                }
            }
        };

        if found.is_defined() {
            self.counters.hits += 1;
            Some(found)
        } else {
            None
        }
    }

    pub fn counters(&self) -> NodeStoreCounters {
        self.counters
    }

    /// Logs a one-line summary, mirroring the original cache's destructor
    /// log line.
    pub fn log_summary(&self) {
        let c = self.counters;
        let hit_rate = if c.lookups == 0 { 0.0 } else { 100.0 * c.hits as f64 / c.lookups as f64 };
        let stored_pct = if c.total_nodes == 0 { 0.0 } else { 100.0 * c.stored_nodes as f64 / c.total_nodes as f64 };
        log::info!(
            "node cache: stored {} of {} nodes ({:.2}%), hit rate {:.2}%",
            c.stored_nodes,
            c.total_nodes,
            stored_pct,
            hit_rate
        );
    }
}

#[derive(Debug)]
pub enum NodeStoreError {
    Input(InputError),
    Resource(ResourceError),
}

impl std::fmt::Display for NodeStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStoreError::Input(e) => write!(f, "{e}"),
            NodeStoreError::Resource(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for NodeStoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips_without_eviction() {
        let mut store = NodeStore::new(CacheStrategy::Optimized, 800, false);
        for id in 0..10_000i64 {
            store.set(id, Location::new(id as i32, -id as i32)).unwrap();
        }
        for id in 0..10_000i64 {
            assert_eq!(store.get(id), Some(Location::new(id as i32, -id as i32)));
        }
    }

    #[test]
    fn id_too_large_is_fatal() {
        let mut store = NodeStore::new(CacheStrategy::Dense, 10, false);
        assert!(matches!(
            store.set(MAX_ABS_ID, Location::new(0, 0)),
            Err(NodeStoreError::Input(InputError::IdTooLarge(_)))
        ));
    }

    #[test]
    fn sparse_only_out_of_order_is_rejected_in_non_lossy_mode() {
        let mut store = NodeStore::new(CacheStrategy::Sparse, 10, false);
        store.set(100, Location::new(1, 1)).unwrap();
        let err = store.set(50, Location::new(2, 2));
        assert!(matches!(err, Err(NodeStoreError::Input(InputError::OutOfOrder(50, 100)))));
    }

    #[test]
    fn sparse_only_out_of_order_is_dropped_in_lossy_mode() {
        let mut store = NodeStore::new(CacheStrategy::Sparse, 10, true);
        store.set(100, Location::new(1, 1)).unwrap();
        store.set(50, Location::new(2, 2)).unwrap();
        assert_eq!(store.get(50), None);
        assert_eq!(store.get(100), Some(Location::new(1, 1)));
    }

    #[test]
    fn get_of_unset_id_is_undefined() {
        let mut store = NodeStore::new(CacheStrategy::Optimized, 800, false);
        assert_eq!(store.get(42), None);
    }

    #[test]
    fn lossy_combined_cache_survives_huge_sparse_clusters() {
        // 1 MB budget forces heavy eviction; lossy mode must never fail,
        // and a tight, recently-written cluster should mostly hit.
        let mut store = NodeStore::new(CacheStrategy::Optimized, 1, true);

        for id in 0..200_000i64 {
            store.set(id, Location::new(id as i32, id as i32)).unwrap();
        }
        // A second, disjoint, far-away cluster.
        for id in 10_000_000..10_001_000i64 {
            store.set(id, Location::new(id as i32, id as i32)).unwrap();
        }

        let mut hits = 0;
        let dense_cluster_size = 1000;
        for id in (10_000_000..10_001_000i64).rev() {
            if store.get(id).is_some() {
                hits += 1;
            }
        }
        assert!(
            hits * 2 >= dense_cluster_size,
            "expected at least 50% hit rate on the most recent cluster, got {hits}/{dense_cluster_size}"
        );
    }

    #[test]
    fn zero_budget_cache_is_a_silent_no_op() {
        // With Dense-only and zero budget, every write simply no-ops rather
        // than erroring, matching a zero-sized cache acting as a dummy.
        let mut store = NodeStore::new(CacheStrategy::Dense, 0, false);
        store.set(1, Location::new(1, 1)).unwrap();
        assert_eq!(store.get(1), None);
    }
}
