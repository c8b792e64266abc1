// ===========================================================================
// Planar geometry kernel seam
// ===========================================================================
//
// Buffering and polygon union are not reimplemented here. The corridor stage
// only talks to this trait; `GeoKernel` is the production implementation on
// top of the `geo` crate.

use geo::algorithm::bool_ops::unary_union;
use geo::algorithm::buffer::{Buffer, BufferStyle, LineCap};
use geo::{Geometry, GeometryCollection, LineString, MultiPolygon, Polygon};

pub trait GeometryKernel {
    /// Buffer a line by `distance` with flat (butt) caps: the corridor ends
    /// exactly at the line's endpoints.
    fn buffer_line(&self, line: &LineString, distance: f64) -> MultiPolygon;

    /// Buffer a polygon outward by `distance`.
    fn buffer_polygon(&self, polygon: &Polygon, distance: f64) -> MultiPolygon;

    /// Dissolve all parts into one geometry.
    fn union(&self, parts: &[MultiPolygon]) -> Geometry;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GeoKernel;

impl GeometryKernel for GeoKernel {
    fn buffer_line(&self, line: &LineString, distance: f64) -> MultiPolygon {
        line.buffer_with_style(BufferStyle::new(distance).line_cap(LineCap::Butt))
    }

    fn buffer_polygon(&self, polygon: &Polygon, distance: f64) -> MultiPolygon {
        polygon.buffer(distance)
    }

    /// A single surviving polygon is returned as `Polygon`, several as
    /// `MultiPolygon`. Nothing at all is an empty `GeometryCollection`.
    fn union(&self, parts: &[MultiPolygon]) -> Geometry {
        let mut merged = unary_union(parts.iter());
        match merged.0.len() {
            0 => Geometry::GeometryCollection(GeometryCollection(Vec::new())),
            1 => match merged.0.pop() {
                Some(polygon) => Geometry::Polygon(polygon),
                None => Geometry::MultiPolygon(merged),
            },
            _ => Geometry::MultiPolygon(merged),
        }
    }
}
