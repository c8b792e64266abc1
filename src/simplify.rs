//! Topology-preserving vertex reduction.
//!
//! Douglas-Peucker per line or ring, followed by a simplicity check. A result
//! that would self-intersect, open a ring, or invalidate a polygon is thrown
//! away and the original geometry is kept.

use crate::config::check_tolerance;
use crate::error::Result;
use crate::geometry::Shape;
use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Coord, Line, LineString, MultiLineString, MultiPolygon, Polygon, Simplify, Validation};
use rstar::{AABB, RTree, RTreeObject};
use tracing::debug;

/// Simplify every line, keeping the original wherever the simplified version
/// crosses itself more often than the original did.
pub fn simplify_lines(lines: Vec<LineString>, tolerance: f64) -> Result<Vec<LineString>> {
    check_tolerance(tolerance)?;
    if tolerance == 0.0 {
        return Ok(lines);
    }

    let before: usize = lines.iter().map(|l| l.0.len()).sum();
    let simplified: Vec<LineString> = lines.iter().map(|l| simplify_line(l, tolerance)).collect();
    let after: usize = simplified.iter().map(|l| l.0.len()).sum();
    debug!("Simplified {} lines: {} -> {} vertices", lines.len(), before, after);

    Ok(simplified)
}

pub fn simplify_shape(shape: &Shape, tolerance: f64) -> Result<Shape> {
    check_tolerance(tolerance)?;
    if tolerance == 0.0 {
        return Ok(shape.clone());
    }

    Ok(match shape {
        Shape::LineString(ls) => Shape::LineString(simplify_line(ls, tolerance)),
        Shape::MultiLineString(mls) => Shape::MultiLineString(MultiLineString::new(
            mls.0.iter().map(|ls| simplify_line(ls, tolerance)).collect(),
        )),
        Shape::Polygon(p) => Shape::Polygon(simplify_polygon(p, tolerance)),
        Shape::MultiPolygon(mp) => {
            let simplified = MultiPolygon::new(
                mp.0.iter().map(|p| simplify_polygon(p, tolerance)).collect(),
            );
            // members may now overlap each other
            if mp.is_valid() && !simplified.is_valid() {
                Shape::MultiPolygon(mp.clone())
            } else {
                Shape::MultiPolygon(simplified)
            }
        }
    })
}

pub fn simplify_line(line: &LineString, tolerance: f64) -> LineString {
    if line.is_closed() && line.0.len() >= 4 {
        return simplify_ring(line, tolerance);
    }
    let simplified = line.simplify(tolerance);
    // an already tangled line may stay tangled, but no worse
    if crossing_pairs(&simplified) <= crossing_pairs(line) {
        simplified
    } else {
        debug!("Simplified line adds self-intersections, keeping original");
        line.clone()
    }
}

pub fn simplify_ring(ring: &LineString, tolerance: f64) -> LineString {
    let simplified = ring.simplify(tolerance);
    if simplified.is_closed() && simplified.0.len() >= 4 && is_simple(&simplified) {
        simplified
    } else {
        debug!("Simplified ring collapsed or self-intersects, keeping original");
        ring.clone()
    }
}

pub fn simplify_polygon(polygon: &Polygon, tolerance: f64) -> Polygon {
    let simplified = Polygon::new(
        simplify_ring(polygon.exterior(), tolerance),
        polygon
            .interiors()
            .iter()
            .map(|ring| simplify_ring(ring, tolerance))
            .collect(),
    );
    // a hole can end up crossing the shell even if both rings are simple
    if polygon.is_valid() && !simplified.is_valid() {
        polygon.clone()
    } else {
        simplified
    }
}

struct Segment {
    idx: usize,
    line: Line,
}

impl RTreeObject for Segment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.line.start.x, self.line.start.y],
            [self.line.end.x, self.line.end.y],
        )
    }
}

/// True if the line never touches itself except at shared vertices of
/// consecutive segments (and the closing vertex of a ring).
pub fn is_simple(line: &LineString) -> bool {
    crossing_pairs(line) == 0
}

/// Number of segment pairs that touch where they should not: any contact
/// between non-consecutive segments, or consecutive segments overlapping.
pub fn crossing_pairs(line: &LineString) -> usize {
    let mut coords: Vec<Coord> = Vec::with_capacity(line.0.len());
    for &c in &line.0 {
        if coords.last() != Some(&c) {
            coords.push(c);
        }
    }
    if coords.len() < 3 {
        return 0;
    }

    let segments: Vec<Segment> = coords
        .windows(2)
        .enumerate()
        .map(|(idx, w)| Segment {
            idx,
            line: Line::new(w[0], w[1]),
        })
        .collect();
    let n = segments.len();
    let closed = coords.first() == coords.last() && n > 2;
    let adjacent = |i: usize, j: usize| j == i + 1 || (closed && i == 0 && j == n - 1);

    let tree = RTree::bulk_load(segments);
    let mut count = 0;
    for segment in tree.iter() {
        for candidate in tree.locate_in_envelope_intersecting(&segment.envelope()) {
            if candidate.idx <= segment.idx {
                continue;
            }
            let Some(hit) = line_intersection(segment.line, candidate.line) else {
                continue;
            };
            // consecutive segments may only share their vertex, not double back
            if !adjacent(segment.idx, candidate.idx)
                || matches!(hit, LineIntersection::Collinear { .. })
            {
                count += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use geo::{line_string, polygon};

    #[test]
    fn test_collinear_vertices_removed() {
        let line = line_string![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0005),
            (x: 2.0, y: 0.0),
            (x: 3.0, y: 0.0),
        ];
        let out = simplify_lines(vec![line], 0.001).unwrap();
        assert_eq!(
            out[0],
            line_string![(x: 0.0, y: 0.0), (x: 3.0, y: 0.0)]
        );
    }

    #[test]
    fn test_zero_tolerance_is_identity() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 0.0)];
        let shape = Shape::LineString(line.clone());
        assert_eq!(simplify_shape(&shape, 0.0).unwrap(), shape);
        assert_eq!(simplify_lines(vec![line.clone()], 0.0).unwrap(), vec![line]);
    }

    #[test]
    fn test_negative_tolerance_is_config_error() {
        let shape = Shape::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)]);
        assert!(matches!(
            simplify_shape(&shape, -1.0),
            Err(PipelineError::Configuration { .. })
        ));
        assert!(simplify_lines(Vec::new(), f64::NAN).is_err());
    }

    #[test]
    fn test_never_adds_vertices_and_keeps_endpoints() {
        let line = line_string![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 2.0),
            (x: 2.0, y: -1.0),
            (x: 3.0, y: 3.0),
            (x: 4.0, y: 0.0),
        ];
        let out = simplify_lines(vec![line.clone()], 0.5).unwrap();
        assert!(out[0].0.len() <= line.0.len());
        assert_eq!(out[0].0.first(), line.0.first());
        assert_eq!(out[0].0.last(), line.0.last());
    }

    #[test]
    fn test_self_intersection_is_refused() {
        // dropping (5, 0.5) leaves the chord (0,0)-(10,0) crossed by the
        // final segment climbing to (5, 0.2)
        let line = line_string![
            (x: 0.0, y: 0.0),
            (x: 5.0, y: 0.5),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: -5.0),
            (x: 5.0, y: -5.0),
            (x: 5.0, y: 0.2),
        ];
        assert!(is_simple(&line));
        let out = simplify_lines(vec![line.clone()], 1.0).unwrap();
        assert_eq!(out[0], line);
    }

    #[test]
    fn test_tangled_line_gets_no_new_crossings() {
        // the (-5,-20)-(-5,20) leg crosses (-10,0)-(0,0) already; dropping
        // (0,0) and (5,0.5) would add a second crossing with the last leg
        let line = line_string![
            (x: -5.0, y: -20.0),
            (x: -5.0, y: 20.0),
            (x: -10.0, y: 0.0),
            (x: 0.0, y: 0.0),
            (x: 5.0, y: 0.5),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: -5.0),
            (x: 5.0, y: -5.0),
            (x: 5.0, y: 0.2),
        ];
        assert_eq!(crossing_pairs(&line), 1);

        let reduced = line.simplify(1.0);
        assert!(crossing_pairs(&reduced) > 1, "reduction should tangle: {:?}", reduced);

        let out = simplify_lines(vec![line.clone()], 1.0).unwrap();
        assert_eq!(out[0], line);
    }

    #[test]
    fn test_tangled_line_may_still_lose_vertices() {
        // figure-eight with a near-collinear vertex far from the crossing
        let line = line_string![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 10.0, y: 0.0),
            (x: 5.0, y: 0.0001),
            (x: 0.0, y: 0.0001),
            (x: 0.0, y: 10.0),
        ];
        let out = simplify_lines(vec![line.clone()], 0.001).unwrap();
        assert!(out[0].0.len() < line.0.len());
        assert!(crossing_pairs(&out[0]) <= crossing_pairs(&line));
    }

    #[test]
    fn test_ring_reduction_that_crosses_itself_is_refused() {
        // dropping (5, 0.5) turns the top edge into a chord crossed by the
        // notch reaching up to (5, 0.2)
        let ring = line_string![
            (x: 0.0, y: 0.0),
            (x: 5.0, y: 0.5),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: -5.0),
            (x: 5.0, y: -5.0),
            (x: 5.0, y: 0.2),
            (x: 4.0, y: 0.2),
            (x: 0.0, y: 0.0),
        ];
        assert!(is_simple(&ring));
        assert!(!is_simple(&ring.simplify(1.0)));

        assert_eq!(simplify_ring(&ring, 1.0), ring);
        assert_eq!(simplify_lines(vec![ring.clone()], 1.0).unwrap(), vec![ring]);
    }

    #[test]
    fn test_is_simple() {
        let zigzag = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0), (x: 2.0, y: 0.0)];
        assert!(is_simple(&zigzag));

        let crossing = line_string![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: 2.0),
        ];
        assert!(!is_simple(&crossing));

        let backtrack = line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 1.0, y: 0.0)];
        assert!(!is_simple(&backtrack));

        let ring = line_string![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];
        assert!(is_simple(&ring));
    }

    #[test]
    fn test_ring_stays_closed_or_falls_back() {
        let ring = line_string![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 0.0004),
            (x: 0.0, y: 0.0),
        ];
        // would collapse to 3 coordinates
        let out = simplify_lines(vec![ring.clone()], 0.001).unwrap();
        assert_eq!(out[0], ring);

        let square = line_string![
            (x: 0.0, y: 0.0),
            (x: 5.0, y: 0.0001),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0),
        ];
        let out = simplify_lines(vec![square], 0.001).unwrap();
        assert!(out[0].is_closed());
        assert_eq!(out[0].0.len(), 5);
    }

    #[test]
    fn test_polygon_stays_valid() {
        let p = polygon![
            (x: 0.0, y: 0.0),
            (x: 5.0, y: 0.0002),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
        ];
        match simplify_shape(&Shape::Polygon(p), 0.001).unwrap() {
            Shape::Polygon(out) => {
                assert!(out.is_valid());
                assert_eq!(out.exterior().0.len(), 5);
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }
}
