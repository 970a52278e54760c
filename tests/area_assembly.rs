//! End-to-end coverage of the node store → area assembler → WKB path,
//! exercising the literal seed scenarios and boundary behaviors.

use osm_planet_loader::geometry::{assemble, GeometryFactory, OutputEncoding, Role, WayInput};
use osm_planet_loader::location::Location;
use osm_planet_loader::store::{CacheStrategy, NodeStore};

fn loc(x: i32, y: i32) -> Location {
    Location::new(x, y)
}

/// Seed scenario 1: a single closed way over four nodes resolved through
/// a real `NodeStore`.
#[test]
fn seed_scenario_one_simple_square() {
    let mut nodes = NodeStore::new(CacheStrategy::Optimized, 10, false);
    nodes.set(1, loc(0, 0)).unwrap();
    nodes.set(2, loc(10, 0)).unwrap();
    nodes.set(3, loc(10, 10)).unwrap();
    nodes.set(4, loc(0, 10)).unwrap();

    let way_nodes = [1, 2, 3, 4, 1];
    let locations = way_nodes.iter().map(|id| nodes.get(*id)).collect();
    let outcome = assemble(&[WayInput { way_id: 10, locations, role: Role::Outer }], false);

    let mp = outcome.geometry.expect("square should close");
    assert_eq!(mp.polygons.len(), 1);
    assert!(mp.polygons[0].inners.is_empty());

    let factory = GeometryFactory::new(4326, OutputEncoding::Raw);
    let wkb = factory.area_geometry(&mp, false).unwrap();
    assert_eq!(wkb[0], 1);
}

/// Seed scenario 2: a multipolygon relation with one outer and one inner
/// member way, both resolved against the same node store.
#[test]
fn seed_scenario_two_multipolygon_with_inner_ring() {
    let mut nodes = NodeStore::new(CacheStrategy::Optimized, 10, false);
    for (id, (x, y)) in [(1, (0, 0)), (2, (10, 0)), (3, (10, 10)), (4, (0, 10))] {
        nodes.set(id, loc(x, y)).unwrap();
    }
    for (id, (x, y)) in [(5, (3, 3)), (6, (7, 3)), (7, (7, 7)), (8, (3, 7))] {
        nodes.set(id, loc(x, y)).unwrap();
    }

    let outer_ids = [1, 2, 3, 4, 1];
    let inner_ids = [5, 6, 7, 8, 5];
    let outer = WayInput {
        way_id: 10,
        locations: outer_ids.iter().map(|id| nodes.get(*id)).collect(),
        role: Role::Outer,
    };
    let inner = WayInput {
        way_id: 11,
        locations: inner_ids.iter().map(|id| nodes.get(*id)).collect(),
        role: Role::Inner,
    };

    let outcome = assemble(&[outer, inner], false);
    let mp = outcome.geometry.expect("relation should assemble");
    assert_eq!(mp.polygons.len(), 1);
    assert_eq!(mp.polygons[0].inners.len(), 1);
    assert_eq!(outcome.stats.role_mismatches, 0);
}

/// Seed scenario 3: two disjoint outer-role rings produce two polygons,
/// zero inners.
#[test]
fn seed_scenario_three_disjoint_outers() {
    let mut nodes = NodeStore::new(CacheStrategy::Optimized, 10, false);
    for (id, (x, y)) in [(1, (0, 0)), (2, (1, 0)), (3, (1, 1))] {
        nodes.set(id, loc(x, y)).unwrap();
    }
    for (id, (x, y)) in [(4, (100, 100)), (5, (101, 100)), (6, (101, 101))] {
        nodes.set(id, loc(x, y)).unwrap();
    }

    let a = WayInput {
        way_id: 1,
        locations: [1, 2, 3, 1].iter().map(|id| nodes.get(*id)).collect(),
        role: Role::Outer,
    };
    let b = WayInput {
        way_id: 2,
        locations: [4, 5, 6, 4].iter().map(|id| nodes.get(*id)).collect(),
        role: Role::Outer,
    };

    let outcome = assemble(&[a, b], false);
    let mp = outcome.geometry.unwrap();
    assert_eq!(mp.polygons.len(), 2);
    assert!(mp.polygons.iter().all(|p| p.inners.is_empty()));
}

/// Seed scenario 4: a relation member chain that fails to close reports
/// `open_rings` and emits no geometry.
#[test]
fn seed_scenario_four_open_ring_reports_and_emits_nothing() {
    let mut nodes = NodeStore::new(CacheStrategy::Optimized, 10, false);
    for (id, (x, y)) in [(1, (0, 0)), (2, (10, 0)), (3, (10, 10))] {
        nodes.set(id, loc(x, y)).unwrap();
    }

    let broken = WayInput {
        way_id: 1,
        locations: [1, 2, 3].iter().map(|id| nodes.get(*id)).collect(),
        role: Role::Outer,
    };
    let outcome = assemble(&[broken], false);
    assert!(outcome.geometry.is_none());
    assert_eq!(outcome.stats.open_rings, 1);
}

/// Seed scenario 5: two collinear overlapping segments are reported as a
/// self-intersection and the assembly still continues.
#[test]
fn seed_scenario_five_collinear_overlap_is_non_fatal() {
    let mut nodes = NodeStore::new(CacheStrategy::Optimized, 10, false);
    for (id, (x, y)) in [(1, (0, 0)), (2, (10, 0)), (3, (5, 0)), (4, (15, 0)), (5, (15, 10)), (6, (0, 10))] {
        nodes.set(id, loc(x, y)).unwrap();
    }

    // way 1: 1->2->3 is a collinear back-and-forth overlap on the same line.
    let overlapping = WayInput {
        way_id: 1,
        locations: [1, 2, 3, 4, 5, 6, 1].iter().map(|id| nodes.get(*id)).collect(),
        role: Role::Outer,
    };
    let outcome = assemble(&[overlapping], false);
    assert!(outcome.stats.self_intersections > 0 || outcome.stats.duplicate_segments > 0);
}

/// Seed scenario 6 (NodeStore lossy-cache hit rate) lives in
/// `store::node_store`'s own unit tests
/// (`lossy_combined_cache_survives_huge_sparse_clusters`), which already
/// exercises the exact 1 MB/two-cluster setup this scenario describes.

/// Boundary behavior: a way with exactly two nodes is two points, never a
/// polygon, regardless of role — it can't close into a ring of ≥ 3 points.
#[test]
fn boundary_two_node_way_cannot_form_a_ring() {
    let mut nodes = NodeStore::new(CacheStrategy::Optimized, 10, false);
    nodes.set(1, loc(0, 0)).unwrap();
    nodes.set(2, loc(10, 0)).unwrap();

    let way = WayInput {
        way_id: 1,
        locations: [1, 2].iter().map(|id| nodes.get(*id)).collect(),
        role: Role::Outer,
    };
    let outcome = assemble(&[way], false);
    assert!(outcome.geometry.is_none());
}

/// Boundary behavior: a closed way of three identical points has no
/// distinct segments at all, so it is a degenerate ring, not a triangle.
#[test]
fn boundary_three_identical_points_is_degenerate() {
    let mut nodes = NodeStore::new(CacheStrategy::Optimized, 10, false);
    nodes.set(1, loc(5, 5)).unwrap();

    let way = WayInput {
        way_id: 1,
        locations: [1, 1, 1, 1].iter().map(|id| nodes.get(*id)).collect(),
        role: Role::Outer,
    };
    let outcome = assemble(&[way], false);
    assert!(outcome.geometry.is_none());
    assert_eq!(outcome.stats.open_rings, 0);
}
