// ===========================================================================
// Coordinate transforms (EPSG:4326 lon/lat in, planar metres out)
// ===========================================================================
use crate::config::Projection;
use crate::geometry::{Crs, Feature, FeatureCollection, Shape};
use geo::{Coord, MapCoords};
use tracing::info;

pub const EARTH_RADIUS: f64 = 6378137.0;

/// A pure per-coordinate transform plus the CRS it produces.
pub trait CoordTransform {
    fn transform(&self, coord: Coord) -> Coord;

    /// CRS token written on reprojected collections. `None` drops the token.
    fn crs(&self) -> Option<Crs>;
}

/// Spherical Web Mercator (EPSG:3857).
#[derive(Debug, Default, Clone, Copy)]
pub struct WebMercator;

impl WebMercator {
    /// (lon, lat) degrees -> (x, y) metres
    pub fn lat_lng_to_web_merc(lon: f64, lat: f64) -> (f64, f64) {
        let x = EARTH_RADIUS * lon.to_radians();
        let y = EARTH_RADIUS * ((std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan()).ln();
        (x, y)
    }

    /// (x, y) metres -> (lon, lat) degrees
    pub fn web_merc_to_lat_lng(x: f64, y: f64) -> (f64, f64) {
        let lon = (x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
        (lon, lat)
    }
}

impl CoordTransform for WebMercator {
    fn transform(&self, coord: Coord) -> Coord {
        let (x, y) = Self::lat_lng_to_web_merc(coord.x, coord.y);
        Coord { x, y }
    }

    fn crs(&self) -> Option<Crs> {
        Some(Crs::epsg(3857))
    }
}

/// Equirectangular projection around an origin, metres east/north of it.
/// Accurate to well under a metre within a few tens of kilometres.
#[derive(Debug, Clone, Copy)]
pub struct LocalTangentPlane {
    origin_lon_rad: f64,
    origin_lat_rad: f64,
    cos_lat0: f64,
    radius: f64,
}

impl LocalTangentPlane {
    const EARTH_RADIUS: f64 = 6_371_007.2;

    pub fn new(lon0: f64, lat0: f64) -> Self {
        let origin_lon_rad = lon0.to_radians();
        let origin_lat_rad = lat0.to_radians();
        Self {
            origin_lon_rad,
            origin_lat_rad,
            cos_lat0: origin_lat_rad.cos(),
            radius: Self::EARTH_RADIUS,
        }
    }

    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let dlon = lon.to_radians() - self.origin_lon_rad;
        let dlat = lat.to_radians() - self.origin_lat_rad;
        (self.radius * self.cos_lat0 * dlon, self.radius * dlat)
    }

    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        let lon_rad = self.origin_lon_rad + x / (self.radius * self.cos_lat0);
        let lat_rad = self.origin_lat_rad + y / self.radius;
        (lon_rad.to_degrees(), lat_rad.to_degrees())
    }
}

impl CoordTransform for LocalTangentPlane {
    fn transform(&self, coord: Coord) -> Coord {
        let (x, y) = self.project(coord.x, coord.y);
        Coord { x, y }
    }

    // no registered code for an ad hoc origin
    fn crs(&self) -> Option<Crs> {
        None
    }
}

pub fn reproject_shape<T: CoordTransform + ?Sized>(shape: &Shape, transform: &T) -> Shape {
    let f = |c: Coord| transform.transform(c);
    match shape {
        Shape::LineString(ls) => Shape::LineString(ls.map_coords(f)),
        Shape::MultiLineString(mls) => Shape::MultiLineString(mls.map_coords(f)),
        Shape::Polygon(p) => Shape::Polygon(p.map_coords(f)),
        Shape::MultiPolygon(mp) => Shape::MultiPolygon(mp.map_coords(f)),
    }
}

/// Transform every coordinate, keep properties, replace the CRS token.
pub fn reproject_collection<T: CoordTransform + ?Sized>(
    collection: &FeatureCollection,
    transform: &T,
) -> FeatureCollection {
    let features = collection
        .features
        .iter()
        .map(|feature| {
            Feature::with_properties(
                reproject_shape(&feature.shape, transform),
                feature.properties.clone(),
            )
        })
        .collect();
    FeatureCollection::new(features, transform.crs())
}

/// Apply a configured projection. `Identity` returns the collection as is.
pub fn apply_projection(collection: &FeatureCollection, projection: Projection) -> FeatureCollection {
    let out = match projection {
        Projection::Identity => return collection.clone(),
        Projection::WebMercator => reproject_collection(collection, &WebMercator),
        Projection::LocalTangentPlane { lon0, lat0 } => {
            reproject_collection(collection, &LocalTangentPlane::new(lon0, lat0))
        }
    };
    info!("Reprojected {} features ({:?})", out.len(), projection);
    out
}
