//! Persists the node-id list and tags of ways that may be referenced by a
//! later multipolygon relation, so relation assembly doesn't need to
//! re-read the input.

use crate::location::Identifier;
use crate::tags::TagList;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct StoredWay {
    pub node_ids: Vec<Identifier>,
    pub tags: TagList,
}

/// Conservatively stores every way seen during the way pass. When
/// `max_ways_in_ram` is set, the store evicts the least-recently-inserted
/// way once the budget is reached (an Open Question resolution: spec.md
/// leaves the exact eviction bound unspecified and explicitly allows
/// "store everything" as a valid conservative policy).
pub struct WayStore {
    by_id: HashMap<Identifier, StoredWay>,
    insertion_order: Vec<Identifier>,
    max_ways_in_ram: Option<usize>,
}

impl WayStore {
    pub fn new(max_ways_in_ram: Option<usize>) -> WayStore {
        WayStore {
            by_id: HashMap::new(),
            insertion_order: Vec::new(),
            max_ways_in_ram,
        }
    }

    pub fn insert(&mut self, id: Identifier, node_ids: Vec<Identifier>, tags: TagList) {
        if let Some(max) = self.max_ways_in_ram {
            while self.insertion_order.len() >= max {
                let oldest = self.insertion_order.remove(0);
                self.by_id.remove(&oldest);
            }
        }
        self.by_id.insert(id, StoredWay { node_ids, tags });
        self.insertion_order.push(id);
    }

    pub fn get(&self, id: Identifier) -> Option<&StoredWay> {
        self.by_id.get(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
