use crate::geometry::Footprint;
use geo::LineString;
use tracing::debug;

/// Outer silhouette of a dissolved footprint: one closed LineString per member
/// polygon's exterior ring.
///
/// Interior rings are dropped. Inside a dissolved road corridor they are
/// islands between carriageways, not features of the road.
pub fn extract_boundary(footprint: &Footprint) -> Vec<LineString> {
    let polygons = footprint.polygons();
    let holes: usize = polygons.iter().map(|p| p.interiors().len()).sum();
    if holes > 0 {
        debug!("Discarding {} interior ring(s) from corridor", holes);
    }

    polygons
        .into_iter()
        .map(|polygon| {
            let mut ring = polygon.exterior().clone();
            ring.close();
            ring
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{MultiPolygon, Polygon, line_string, polygon};

    fn square(x0: f64, y0: f64, size: f64) -> Polygon {
        polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
        ]
    }

    #[test]
    fn test_polygon_exterior_only() {
        let shell = square(0.0, 0.0, 10.0).exterior().clone();
        let hole = line_string![
            (x: 4.0, y: 4.0),
            (x: 6.0, y: 4.0),
            (x: 6.0, y: 6.0),
            (x: 4.0, y: 4.0),
        ];
        let footprint = Footprint::Polygon(Polygon::new(shell.clone(), vec![hole]));

        let rings = extract_boundary(&footprint);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0], shell);
        assert!(rings[0].is_closed());
    }

    #[test]
    fn test_multi_polygon_one_ring_per_member() {
        let footprint = Footprint::MultiPolygon(MultiPolygon::new(vec![
            square(0.0, 0.0, 1.0),
            square(5.0, 5.0, 1.0),
            square(9.0, 0.0, 1.0),
        ]));
        let rings = extract_boundary(&footprint);
        assert_eq!(rings.len(), 3);
        assert!(rings.iter().all(|r| r.is_closed() && r.0.len() == 5));
        assert_eq!(rings[1].0[0], square(5.0, 5.0, 1.0).exterior().0[0]);
    }
}
