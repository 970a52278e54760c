//! Ring assembly: turns a bag of way segments into oriented, nested
//! polygon rings.
//!
//! The control flow (pick an unplaced segment, walk from shared vertex to
//! shared vertex until the chain closes or dies) is grounded on the
//! teacher's `geodata/find_polygons.rs`, which solves exactly this problem
//! for renderer multipolygons. The per-step geometry (the sort order, the
//! det-based winding sum, the integer intersection test) is grounded on
//! osm2pgsql's `node_ref_segment.hpp` and `assembler.hpp`.

use crate::errors::GeometryError;
use crate::location::{Identifier, Location};

use super::segment::{calculate_intersection, segment_order, Role, Segment};

/// One way's worth of segment input: its resolved node locations in way
/// order, and the role it plays within the enclosing relation (`Outer` for
/// a standalone area way).
pub struct WayInput {
    pub way_id: Identifier,
    /// `None` entries are unresolved locations (missing from the node
    /// store); they break the chain at that point but don't necessarily
    /// abort the whole assembly.
    pub locations: Vec<Option<Location>>,
    pub role: Role,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub invalid_locations: u32,
    /// Set by the caller before assembly when a way's first/last node id
    /// matches but its resolved locations don't — `assemble` itself only
    /// sees locations, not node ids, so it can't detect this on its own.
    pub duplicate_nodes: u32,
    pub duplicate_segments: u32,
    pub self_intersections: u32,
    pub open_rings: u32,
    pub role_mismatches: u32,
}

/// A single closed, oriented ring: a closed point list (first == last).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    pub points: Vec<Location>,
}

impl Ring {
    /// Twice the signed area (shoelace sum), using the convention that a
    /// clockwise ring has positive sign (this system's "inner" winding).
    fn signed_area_x2(&self) -> i64 {
        let mut acc = 0i64;
        for w in self.points.windows(2) {
            let (p, q) = (w[0], w[1]);
            acc += i64::from(p.x()) * i64::from(q.y()) - i64::from(q.x()) * i64::from(p.y());
        }
        acc
    }

    fn is_clockwise(&self) -> bool {
        self.signed_area_x2() > 0
    }

    fn abs_area(&self) -> i64 {
        self.signed_area_x2().abs()
    }

    fn reversed(&self) -> Ring {
        let mut points = self.points.clone();
        points.reverse();
        Ring { points }
    }

    /// Standard ray-casting point-in-polygon test against this ring's
    /// boundary.
    fn contains_point(&self, p: Location) -> bool {
        let mut inside = false;
        for w in self.points.windows(2) {
            let (a, b) = (w[0], w[1]);
            let (ax, ay) = (i64::from(a.x()), i64::from(a.y()));
            let (bx, by) = (i64::from(b.x()), i64::from(b.y()));
            let (px, py) = (i64::from(p.x()), i64::from(p.y()));
            if (ay > py) != (by > py) {
                let x_at_p = ax + (bx - ax) * (py - ay) / (by - ay);
                if px < x_at_p {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

#[derive(Debug, Clone)]
pub struct Polygon {
    pub outer: Ring,
    pub inners: Vec<Ring>,
}

#[derive(Debug, Clone)]
pub struct MultiPolygon {
    pub polygons: Vec<Polygon>,
}

pub struct AssemblyOutcome {
    pub geometry: Option<MultiPolygon>,
    pub stats: AssemblyStats,
    pub failure: Option<GeometryError>,
}

/// Extracts, sorts, closes and nests rings out of the given ways.
///
/// `ignore_invalid_locations`: when false, any unresolved location aborts
/// the whole assembly once extraction finishes (`GeometryError` is not
/// produced here directly — callers see `failure = Some(..)` and an empty
/// geometry).
pub fn assemble(ways: &[WayInput], ignore_invalid_locations: bool) -> AssemblyOutcome {
    let mut stats = AssemblyStats::default();
    let mut segments = Vec::new();

    for way in ways {
        for pair in way.locations.windows(2) {
            let (p, q) = (pair[0], pair[1]);
            match (p, q) {
                (Some(p), Some(q)) => {
                    if let Some(seg) = Segment::new(p, q, way.way_id, way.role) {
                        segments.push(seg);
                    }
                }
                _ => stats.invalid_locations += 1,
            }
        }
    }

    if !ignore_invalid_locations && stats.invalid_locations > 0 {
        return AssemblyOutcome { geometry: None, stats, failure: Some(GeometryError::OpenRing) };
    }

    segments.sort_by(segment_order);

    // Collapse exact-duplicate segments (same unordered endpoints),
    // counting but keeping only the first occurrence.
    let mut deduped: Vec<Segment> = Vec::with_capacity(segments.len());
    for seg in segments {
        if deduped.last().map_or(false, |prev: &Segment| prev.same_endpoints(&seg)) {
            stats.duplicate_segments += 1;
            continue;
        }
        deduped.push(seg);
    }
    let mut segments = deduped;

    detect_self_intersections(&segments, &mut stats);

    let rings = build_rings(&mut segments, &mut stats);

    if rings.is_empty() {
        return AssemblyOutcome { geometry: None, stats, failure: None };
    }

    let polygons = nest_rings(rings, &mut stats);

    AssemblyOutcome {
        geometry: Some(MultiPolygon { polygons }),
        stats,
        failure: None,
    }
}

/// Reports (but does not structurally alter rings for) segment
/// self-intersections: a single adjacent-pair sweep over the sorted
/// segment list, per spec section 4.3.3.
fn detect_self_intersections(segments: &[Segment], stats: &mut AssemblyStats) {
    for i in 0..segments.len() {
        for j in (i + 1)..segments.len() {
            if segments[j].a > segments[i].b {
                break;
            }
            if calculate_intersection(&segments[i], &segments[j]).is_some() {
                stats.self_intersections += 1;
            }
        }
    }
}

/// Walks shared vertices to close chains of segments into rings, grounded
/// on the teacher's `find_next_segment`/`find_ring_from` control flow:
/// start an unplaced segment, repeatedly look up an unplaced segment of
/// the same role touching the current endpoint, and stop when the chain
/// returns to its start or can't continue.
fn build_rings(segments: &mut [Segment], stats: &mut AssemblyStats) -> Vec<(Ring, Role)> {
    use std::collections::HashMap;

    let mut by_vertex: HashMap<Location, Vec<usize>> = HashMap::new();
    for (idx, seg) in segments.iter().enumerate() {
        by_vertex.entry(seg.a).or_default().push(idx);
        by_vertex.entry(seg.b).or_default().push(idx);
    }

    let mut rings = Vec::new();

    for start_idx in 0..segments.len() {
        if segments[start_idx].ring.is_some() {
            continue;
        }

        let ring_id = rings.len();
        let role = segments[start_idx].role;
        let start_point = segments[start_idx].a;
        let mut chain: Vec<(usize, bool)> = vec![(start_idx, false)];
        segments[start_idx].ring = Some(ring_id);
        let mut current = segments[start_idx].b;
        let mut visited: std::collections::HashSet<Location> = std::collections::HashSet::new();
        visited.insert(start_point);
        visited.insert(current);
        let mut closed = current == start_point;

        while !closed {
            let candidates = by_vertex.get(&current).cloned().unwrap_or_default();
            let next = candidates.into_iter().find(|&idx| {
                segments[idx].ring.is_none()
                    && segments[idx].role == role
                    && (segments[idx].a == current || segments[idx].b == current)
            });

            let next_idx = match next {
                Some(idx) => idx,
                None => break,
            };

            let traversed_reverse = segments[next_idx].b == current;
            let other_end = if traversed_reverse { segments[next_idx].a } else { segments[next_idx].b };

            segments[next_idx].ring = Some(ring_id);
            chain.push((next_idx, traversed_reverse));
            current = other_end;

            if current == start_point {
                closed = true;
            } else if !visited.insert(current) {
                // Revisiting an interior vertex without closing: dead end.
                break;
            }
        }

        if !closed {
            stats.open_rings += 1;
            continue;
        }

        if chain.len() < 3 {
            stats.open_rings += 1;
            continue;
        }

        let det_sum: i64 = chain
            .iter()
            .map(|&(idx, rev)| {
                let seg = &segments[idx];
                let (start, stop) = if rev { (seg.b, seg.a) } else { (seg.a, seg.b) };
                i64::from(start.x()) * i64::from(stop.y()) - i64::from(start.y()) * i64::from(stop.x())
            })
            .sum();

        let mut points = Vec::with_capacity(chain.len() + 1);
        let (first_idx, first_rev) = chain[0];
        points.push(if first_rev { segments[first_idx].b } else { segments[first_idx].a });
        for &(idx, rev) in &chain {
            let seg = &segments[idx];
            points.push(if rev { seg.a } else { seg.b });
        }

        let tentative = Ring { points };
        let ring = if det_sum > 0 { tentative.reversed() } else { tentative };
        rings.push((ring, role));
    }

    rings
}

/// Assigns each ring a containment count against every other ring,
/// groups inner rings under their tightest enclosing outer, and
/// reorients every ring to its canonical winding (outer = CCW, inner =
/// CW, matching this system's convention once nesting is known).
///
/// If a ring's supplied member role disagrees with the role nesting
/// computed for it, the computed role wins and `stats.role_mismatches`
/// is incremented (spec section 4.3.6).
fn nest_rings(tagged_rings: Vec<(Ring, Role)>, stats: &mut AssemblyStats) -> Vec<Polygon> {
    let rings: Vec<Ring> = tagged_rings.iter().map(|(r, _)| r.clone()).collect();
    let supplied_roles: Vec<Role> = tagged_rings.iter().map(|(_, role)| *role).collect();

    let n = rings.len();
    let mut containment = vec![0usize; n];
    for i in 0..n {
        let probe = rings[i].points[0];
        for j in 0..n {
            if i == j {
                continue;
            }
            if rings[j].contains_point(probe) {
                containment[i] += 1;
            }
        }
    }

    let mut outers: Vec<usize> = Vec::new();
    let mut inners: Vec<usize> = Vec::new();
    for i in 0..n {
        let computed_outer = containment[i] % 2 == 0;
        match supplied_roles[i] {
            Role::Outer if !computed_outer => stats.role_mismatches += 1,
            Role::Inner if computed_outer => stats.role_mismatches += 1,
            _ => {}
        }
        if computed_outer {
            outers.push(i);
        } else {
            inners.push(i);
        }
    }

    let canonicalize = |ring: &Ring, want_outer: bool| -> Ring {
        let is_cw = ring.is_clockwise();
        // Outer rings are canonically CCW (sign < 0); inner rings CW (sign > 0).
        if want_outer == is_cw {
            ring.reversed()
        } else {
            ring.clone()
        }
    };

    let mut polygons: Vec<Polygon> = outers
        .iter()
        .map(|&idx| Polygon { outer: canonicalize(&rings[idx], true), inners: Vec::new() })
        .collect();

    for &inner_idx in &inners {
        let probe = rings[inner_idx].points[0];
        let mut best: Option<(usize, i64)> = None;
        for (poly_pos, &outer_idx) in outers.iter().enumerate() {
            if rings[outer_idx].contains_point(probe) {
                let area = rings[outer_idx].abs_area();
                if best.map_or(true, |(_, best_area)| area < best_area) {
                    best = Some((poly_pos, area));
                }
            }
        }
        let ring = canonicalize(&rings[inner_idx], false);
        match best {
            Some((poly_pos, _)) => polygons[poly_pos].inners.push(ring),
            None => polygons.push(Polygon { outer: ring, inners: Vec::new() }),
        }
    }

    polygons
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(x: i32, y: i32) -> Location {
        Location::new(x, y)
    }

    fn way(id: Identifier, points: &[(i32, i32)], role: Role) -> WayInput {
        WayInput {
            way_id: id,
            locations: points.iter().map(|&(x, y)| Some(loc(x, y))).collect(),
            role,
        }
    }

    #[test]
    fn simple_square_closes_into_one_outer_ring() {
        let square = way(
            1,
            &[(0, 0), (10, 0), (10, 10), (0, 10), (0, 0)],
            Role::Outer,
        );
        let outcome = assemble(&[square], false);
        assert!(outcome.failure.is_none());
        let mp = outcome.geometry.unwrap();
        assert_eq!(mp.polygons.len(), 1);
        assert!(mp.polygons[0].inners.is_empty());
        assert_eq!(outcome.stats.open_rings, 0);
    }

    #[test]
    fn multipolygon_with_inner_ring_nests_correctly() {
        let outer = way(
            1,
            &[(0, 0), (100, 0), (100, 100), (0, 100), (0, 0)],
            Role::Outer,
        );
        let inner = way(
            2,
            &[(10, 10), (20, 10), (20, 20), (10, 20), (10, 10)],
            Role::Inner,
        );
        let outcome = assemble(&[outer, inner], false);
        let mp = outcome.geometry.unwrap();
        assert_eq!(mp.polygons.len(), 1);
        assert_eq!(mp.polygons[0].inners.len(), 1);
    }

    #[test]
    fn two_disjoint_outer_rings_become_two_polygons() {
        let a = way(1, &[(0, 0), (10, 0), (10, 10), (0, 10), (0, 0)], Role::Outer);
        let b = way(2, &[(100, 100), (110, 100), (110, 110), (100, 110), (100, 100)], Role::Outer);
        let outcome = assemble(&[a, b], false);
        let mp = outcome.geometry.unwrap();
        assert_eq!(mp.polygons.len(), 2);
    }

    #[test]
    fn open_ring_is_reported_and_discarded() {
        let broken = way(1, &[(0, 0), (10, 0), (10, 10)], Role::Outer);
        let outcome = assemble(&[broken], false);
        assert!(outcome.geometry.is_none());
        assert_eq!(outcome.stats.open_rings, 1);
    }

    #[test]
    fn self_intersecting_collinear_segments_are_counted_non_fatally() {
        let bowtie = way(1, &[(0, 0), (10, 10), (10, 0), (0, 10), (0, 0)], Role::Outer);
        let outcome = assemble(&[bowtie], false);
        assert!(outcome.stats.self_intersections > 0);
    }

    #[test]
    fn non_lossy_mode_aborts_on_unresolved_location() {
        let mut w = way(1, &[(0, 0), (10, 0), (10, 10), (0, 10), (0, 0)], Role::Outer);
        w.locations[1] = None;
        let outcome = assemble(&[w], false);
        assert!(outcome.geometry.is_none());
        assert!(outcome.failure.is_some());
        assert_eq!(outcome.stats.invalid_locations, 1);
    }

    #[test]
    fn ignore_invalid_locations_proceeds_with_remaining_segments() {
        let a = way(1, &[(0, 0), (10, 0), (10, 10), (0, 10), (0, 0)], Role::Outer);
        let mut b = way(2, &[(100, 100), (110, 100), (110, 110)], Role::Outer);
        b.locations.push(None);
        let outcome = assemble(&[a, b], true);
        assert!(outcome.failure.is_none());
        assert_eq!(outcome.stats.invalid_locations, 1);
        let mp = outcome.geometry.unwrap();
        assert_eq!(mp.polygons.len(), 1);
    }
}
