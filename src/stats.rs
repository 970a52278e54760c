//! Run-wide counters and the streaming input-order checker.
//!
//! `Counters` mirrors the final summary spec section 7 requires on exit;
//! `OrderChecker` is a supplemented feature grounded on osm2pgsql's
//! `check-order.{hpp,cpp}` (warn, don't abort, on out-of-order/duplicate
//! ids within a primitive kind).

use std::fmt;

use log::warn;

use crate::geometry::AssemblyStats;
use crate::location::Identifier;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub nodes: u64,
    pub ways: u64,
    pub relations: u64,
    pub short_ways: u64,
    pub invalid_locations: u64,
    pub duplicate_nodes: u64,
    pub duplicate_ways: u64,
    pub duplicate_segments: u64,
    pub open_rings: u64,
    pub self_intersections: u64,
    pub role_mismatches: u64,
    pub no_way_in_mp_relation: u64,
    pub single_way_in_mp_relation: u64,
    pub out_of_order_ids: u64,
    pub duplicate_ids: u64,
}

impl Counters {
    pub fn new() -> Counters {
        Counters::default()
    }

    /// Folds one assembly run's local stats into the run-wide totals.
    pub fn record_assembly(&mut self, stats: &AssemblyStats) {
        self.invalid_locations += u64::from(stats.invalid_locations);
        self.duplicate_nodes += u64::from(stats.duplicate_nodes);
        self.duplicate_segments += u64::from(stats.duplicate_segments);
        self.open_rings += u64::from(stats.open_rings);
        self.self_intersections += u64::from(stats.self_intersections);
        self.role_mismatches += u64::from(stats.role_mismatches);
    }

    pub fn log_summary(&self) {
        log::info!(
            "done: {} nodes, {} ways ({} short), {} relations — \
             {} invalid locations, {} duplicate nodes, {} duplicate ways, \
             {} open rings, {} self-intersections, {} role mismatches, \
             {} empty-member relations, {} single-way relations",
            self.nodes,
            self.ways,
            self.short_ways,
            self.relations,
            self.invalid_locations,
            self.duplicate_nodes,
            self.duplicate_ways,
            self.open_rings,
            self.self_intersections,
            self.role_mismatches,
            self.no_way_in_mp_relation,
            self.single_way_in_mp_relation,
        );
    }
}

impl fmt::Display for Counters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nodes={} ways={} relations={} short_ways={} invalid_locations={} \
             duplicate_nodes={} duplicate_ways={} open_rings={} self_intersections={}",
            self.nodes,
            self.ways,
            self.relations,
            self.short_ways,
            self.invalid_locations,
            self.duplicate_nodes,
            self.duplicate_ways,
            self.open_rings,
            self.self_intersections,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Node,
    Way,
    Relation,
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveKind::Node => "node",
            PrimitiveKind::Way => "way",
            PrimitiveKind::Relation => "relation",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderOutcome {
    InOrder,
    OutOfOrder,
    Duplicate,
}

/// Tracks the last-seen id per primitive kind and flags out-of-order or
/// duplicate ids. Per spec section 6, input MUST already be in canonical
/// (ascending, per-kind) order; this only adds observability on top —
/// it warns, it does not reorder or reject.
#[derive(Debug, Default)]
pub struct OrderChecker {
    last_node_id: Option<Identifier>,
    last_way_id: Option<Identifier>,
    last_relation_id: Option<Identifier>,
}

impl OrderChecker {
    pub fn new() -> OrderChecker {
        OrderChecker::default()
    }

    pub fn check(&mut self, kind: PrimitiveKind, id: Identifier) -> OrderOutcome {
        let last = match kind {
            PrimitiveKind::Node => &mut self.last_node_id,
            PrimitiveKind::Way => &mut self.last_way_id,
            PrimitiveKind::Relation => &mut self.last_relation_id,
        };

        let outcome = match *last {
            None => OrderOutcome::InOrder,
            Some(prev) if id == prev => OrderOutcome::Duplicate,
            Some(prev) if id < prev => OrderOutcome::OutOfOrder,
            Some(_) => OrderOutcome::InOrder,
        };

        match outcome {
            OrderOutcome::OutOfOrder => warn!("{} id {} is out of order (previous max was {})", kind, id, last.unwrap()),
            OrderOutcome::Duplicate => warn!("{} id {} appeared twice", kind, id),
            OrderOutcome::InOrder => {}
        }

        if outcome != OrderOutcome::OutOfOrder {
            *last = Some(id);
        }

        outcome
    }
}
