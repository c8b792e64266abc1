// ===========================================================================
// Feature / geometry data model shared by every pipeline stage
// ===========================================================================
use geo::{Coord, Geometry, LineString, MultiLineString, MultiPolygon, Polygon};
use serde_json::{Map, Value, json};

/// Coordinate equality tolerance in working units.
/// Prior stages are floating point, so exact equality is never used for endpoints.
pub const COORD_EPSILON: f64 = 1e-9;

pub type Properties = Map<String, Value>;

/// True if `a` and `b` are within `epsilon` of each other.
pub fn coords_eq(a: Coord, b: Coord, epsilon: f64) -> bool {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy <= epsilon * epsilon
}

/// Number of distinct coordinates in a run (consecutive duplicates collapse).
pub fn distinct_coord_count(coords: &[Coord], epsilon: f64) -> usize {
    let mut count = 0;
    let mut last: Option<Coord> = None;
    for &c in coords {
        match last {
            Some(prev) if coords_eq(prev, c, epsilon) => {}
            _ => count += 1,
        }
        last = Some(c);
    }
    // a closed run counts its shared first/last vertex once
    if count > 1 {
        if let (Some(first), Some(last)) = (coords.first(), coords.last()) {
            if coords_eq(*first, *last, epsilon) {
                count -= 1;
            }
        }
    }
    count
}

/// Geometry type name as it appears in GeoJSON, used in error context.
pub fn geometry_kind(geometry: &Geometry) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// The geometry variants the pipeline accepts. Every stage matches on this
/// exhaustively instead of inspecting `geo::Geometry` at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    LineString(LineString),
    MultiLineString(MultiLineString),
    Polygon(Polygon),
    MultiPolygon(MultiPolygon),
}

impl Shape {
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::LineString(_) => "LineString",
            Shape::MultiLineString(_) => "MultiLineString",
            Shape::Polygon(_) => "Polygon",
            Shape::MultiPolygon(_) => "MultiPolygon",
        }
    }

    pub fn to_geometry(&self) -> Geometry {
        match self {
            Shape::LineString(ls) => Geometry::LineString(ls.clone()),
            Shape::MultiLineString(mls) => Geometry::MultiLineString(mls.clone()),
            Shape::Polygon(p) => Geometry::Polygon(p.clone()),
            Shape::MultiPolygon(mp) => Geometry::MultiPolygon(mp.clone()),
        }
    }

    /// Line members of a line-typed shape; polygonal shapes have none.
    pub fn line_parts(&self) -> Vec<&LineString> {
        match self {
            Shape::LineString(ls) => vec![ls],
            Shape::MultiLineString(mls) => mls.0.iter().collect(),
            Shape::Polygon(_) | Shape::MultiPolygon(_) => Vec::new(),
        }
    }

    /// Polygon members of a polygonal shape; line shapes have none.
    pub fn polygon_parts(&self) -> Vec<&Polygon> {
        match self {
            Shape::Polygon(p) => vec![p],
            Shape::MultiPolygon(mp) => mp.0.iter().collect(),
            Shape::LineString(_) | Shape::MultiLineString(_) => Vec::new(),
        }
    }

    pub fn coord_count(&self) -> usize {
        match self {
            Shape::LineString(ls) => ls.0.len(),
            Shape::MultiLineString(mls) => mls.0.iter().map(|ls| ls.0.len()).sum(),
            Shape::Polygon(p) => polygon_coord_count(p),
            Shape::MultiPolygon(mp) => mp.0.iter().map(polygon_coord_count).sum(),
        }
    }
}

fn polygon_coord_count(polygon: &Polygon) -> usize {
    polygon.exterior().0.len() + polygon.interiors().iter().map(|r| r.0.len()).sum::<usize>()
}

impl TryFrom<Geometry> for Shape {
    /// The unsupported geometry's type name.
    type Error = &'static str;

    fn try_from(geometry: Geometry) -> Result<Self, Self::Error> {
        match geometry {
            Geometry::LineString(ls) => Ok(Shape::LineString(ls)),
            Geometry::MultiLineString(mls) => Ok(Shape::MultiLineString(mls)),
            Geometry::Polygon(p) => Ok(Shape::Polygon(p)),
            Geometry::MultiPolygon(mp) => Ok(Shape::MultiPolygon(mp)),
            other => Err(geometry_kind(&other)),
        }
    }
}

impl From<Footprint> for Shape {
    fn from(footprint: Footprint) -> Self {
        match footprint {
            Footprint::Polygon(p) => Shape::Polygon(p),
            Footprint::MultiPolygon(mp) => Shape::MultiPolygon(mp),
        }
    }
}

/// Dissolved corridor: always exactly a Polygon or a MultiPolygon.
#[derive(Debug, Clone, PartialEq)]
pub enum Footprint {
    Polygon(Polygon),
    MultiPolygon(MultiPolygon),
}

impl Footprint {
    pub fn polygons(&self) -> Vec<&Polygon> {
        match self {
            Footprint::Polygon(p) => vec![p],
            Footprint::MultiPolygon(mp) => mp.0.iter().collect(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Footprint::Polygon(_) => "Polygon",
            Footprint::MultiPolygon(_) => "MultiPolygon",
        }
    }
}

/// Opaque CRS metadata. Carried through untouched; never interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct Crs(pub Value);

impl Crs {
    /// GeoJSON 2008 named CRS member, e.g. `urn:ogc:def:crs:EPSG::3857`.
    pub fn named(name: &str) -> Self {
        Crs(json!({
            "type": "name",
            "properties": { "name": name }
        }))
    }

    pub fn epsg(code: u32) -> Self {
        Self::named(&format!("urn:ogc:def:crs:EPSG::{}", code))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub shape: Shape,
    pub properties: Properties,
}

impl Feature {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            properties: Properties::new(),
        }
    }

    pub fn with_properties(shape: Shape, properties: Properties) -> Self {
        Self { shape, properties }
    }

    /// String value of a property, if present and a string.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    pub crs: Option<Crs>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>, crs: Option<Crs>) -> Self {
        Self { features, crs }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Replace the features, keeping the CRS token.
    pub fn with_features(&self, features: Vec<Feature>) -> Self {
        Self {
            features,
            crs: self.crs.clone(),
        }
    }
}
