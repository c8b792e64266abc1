use crate::config::check_buffer_distance;
use crate::error::{PipelineError, Result, Stage};
use crate::geometry::{Footprint, geometry_kind};
use crate::kernel::GeometryKernel;
use geo::{Geometry, LineString, MultiPolygon, Polygon};
use tracing::info;

/// Buffer every line with flat caps and dissolve the buffers into one footprint.
///
/// `distance` must be strictly positive; this is checked before the kernel is
/// touched. Any union result other than Polygon/MultiPolygon is fatal.
pub fn build_corridor<K: GeometryKernel + ?Sized>(
    lines: &[LineString],
    distance: f64,
    kernel: &K,
) -> Result<Footprint> {
    check_buffer_distance(distance)?;

    let buffered: Vec<MultiPolygon> = lines
        .iter()
        .map(|line| kernel.buffer_line(line, distance))
        .collect();
    info!("Buffered geometries created: {}", buffered.len());

    dissolve(kernel, &buffered)
}

/// Buffer every polygon outward and dissolve overlaps, e.g. to turn scattered
/// land-use parcels into one built-up-area footprint.
pub fn dissolve_areas<K: GeometryKernel + ?Sized>(
    polygons: &[Polygon],
    distance: f64,
    kernel: &K,
) -> Result<Footprint> {
    check_buffer_distance(distance)?;

    let buffered: Vec<MultiPolygon> = polygons
        .iter()
        .map(|polygon| kernel.buffer_polygon(polygon, distance))
        .collect();
    info!("Buffered areas created: {}", buffered.len());

    dissolve(kernel, &buffered)
}

fn dissolve<K: GeometryKernel + ?Sized>(kernel: &K, parts: &[MultiPolygon]) -> Result<Footprint> {
    let footprint = match kernel.union(parts) {
        Geometry::Polygon(p) => Footprint::Polygon(p),
        Geometry::MultiPolygon(mp) => Footprint::MultiPolygon(mp),
        other => {
            return Err(PipelineError::UnexpectedDissolveResult {
                stage: Stage::Corridor,
                geometry_type: geometry_kind(&other),
            });
        }
    };
    info!(
        "Geometries dissolved into {} ({} part(s))",
        footprint.kind(),
        footprint.polygons().len()
    );
    Ok(footprint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::GeoKernel;
    use geo::{Area, Contains, GeometryCollection, line_string, point, polygon};
    use std::cell::Cell;

    /// Kernel double: counts calls, optionally returns a bogus union.
    #[derive(Default)]
    struct CountingKernel {
        calls: Cell<usize>,
        broken_union: bool,
    }

    impl GeometryKernel for CountingKernel {
        fn buffer_line(&self, line: &LineString, distance: f64) -> MultiPolygon {
            self.calls.set(self.calls.get() + 1);
            GeoKernel.buffer_line(line, distance)
        }

        fn buffer_polygon(&self, polygon: &Polygon, distance: f64) -> MultiPolygon {
            self.calls.set(self.calls.get() + 1);
            GeoKernel.buffer_polygon(polygon, distance)
        }

        fn union(&self, parts: &[MultiPolygon]) -> Geometry {
            self.calls.set(self.calls.get() + 1);
            if self.broken_union {
                Geometry::GeometryCollection(GeometryCollection(Vec::new()))
            } else {
                GeoKernel.union(parts)
            }
        }
    }

    #[test]
    fn test_non_positive_distance_is_config_error_before_kernel() {
        let kernel = CountingKernel::default();
        let lines = vec![line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]];

        for distance in [0.0, -6.0] {
            let err = build_corridor(&lines, distance, &kernel).unwrap_err();
            assert!(matches!(err, PipelineError::Configuration { .. }));
        }
        assert_eq!(kernel.calls.get(), 0, "kernel must not be touched");
    }

    #[test]
    fn test_unexpected_union_type_is_fatal() {
        let kernel = CountingKernel {
            broken_union: true,
            ..Default::default()
        };
        let lines = vec![line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]];
        match build_corridor(&lines, 2.0, &kernel) {
            Err(PipelineError::UnexpectedDissolveResult {
                stage,
                geometry_type,
            }) => {
                assert_eq!(stage, Stage::Corridor);
                assert_eq!(geometry_type, "GeometryCollection");
            }
            other => panic!("expected UnexpectedDissolveResult, got {:?}", other),
        }
    }

    #[test]
    fn test_parallel_carriageways_dissolve_to_one_polygon() {
        let lines = vec![
            line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)],
            line_string![(x: 0.0, y: 10.0), (x: 100.0, y: 10.0)],
        ];
        let footprint = build_corridor(&lines, 6.0, &GeoKernel).unwrap();
        match footprint {
            Footprint::Polygon(p) => {
                assert!(p.contains(&point!(x: 50.0, y: 5.0)));
                assert!(p.contains(&point!(x: 50.0, y: 0.0)));
                assert!(p.contains(&point!(x: 50.0, y: 10.0)));
            }
            other => panic!("expected a single polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_far_apart_lines_stay_separate() {
        let lines = vec![
            line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)],
            line_string![(x: 0.0, y: 500.0), (x: 100.0, y: 500.0)],
        ];
        let footprint = build_corridor(&lines, 6.0, &GeoKernel).unwrap();
        assert_eq!(footprint.kind(), "MultiPolygon");
        assert_eq!(footprint.polygons().len(), 2);
    }

    #[test]
    fn test_dissolve_areas_merges_neighbours() {
        let a = polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)];
        let b = polygon![(x: 14.0, y: 0.0), (x: 24.0, y: 0.0), (x: 24.0, y: 10.0), (x: 14.0, y: 10.0)];
        let footprint = dissolve_areas(&[a.clone(), b], 3.0, &GeoKernel).unwrap();
        match footprint {
            Footprint::Polygon(p) => assert!(p.unsigned_area() > 2.0 * a.unsigned_area()),
            other => panic!("expected one dissolved polygon, got {:?}", other),
        }
    }
}
