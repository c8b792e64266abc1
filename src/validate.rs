//! Structural validity filter. Features are passed through or dropped, never repaired.

use crate::error::{PipelineError, Result, Stage};
use crate::geometry::{COORD_EPSILON, Feature, Shape, coords_eq, distinct_coord_count};
use geo::{LineString, Polygon, Validation};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub kept: Vec<Feature>,
    pub dropped: usize,
}

/// Keep only structurally valid features.
///
/// Invalid features are counted and logged. The batch only fails when
/// `require_non_empty` is set and nothing survives.
pub fn validate_features(features: Vec<Feature>, require_non_empty: bool) -> Result<ValidationReport> {
    let total = features.len();
    let mut kept = Vec::with_capacity(total);
    let mut dropped = 0;

    for (index, feature) in features.into_iter().enumerate() {
        match check_shape(&feature.shape) {
            Ok(()) => kept.push(feature),
            Err(reason) => {
                let err = PipelineError::InvalidGeometry {
                    stage: Stage::Validate,
                    index,
                    geometry_type: feature.shape.kind(),
                    reason,
                };
                debug!("{}", err);
                dropped += 1;
            }
        }
    }

    if dropped > 0 {
        warn!("Dropped {} of {} features with invalid geometry", dropped, total);
    }
    info!("Valid geometries count: {}", kept.len());

    if require_non_empty && kept.is_empty() {
        return Err(PipelineError::EmptyResult {
            stage: Stage::Validate,
            dropped,
        });
    }

    Ok(ValidationReport { kept, dropped })
}

pub fn is_structurally_valid(shape: &Shape) -> bool {
    check_shape(shape).is_ok()
}

/// Returns the reason a shape is rejected.
fn check_shape(shape: &Shape) -> std::result::Result<(), &'static str> {
    match shape {
        Shape::LineString(ls) => check_line(ls)?,
        Shape::MultiLineString(mls) => {
            if mls.0.is_empty() {
                return Err("multi line string has no members");
            }
            for ls in &mls.0 {
                check_line(ls)?;
            }
        }
        Shape::Polygon(p) => check_polygon(p)?,
        Shape::MultiPolygon(mp) => {
            if mp.0.is_empty() {
                return Err("multi polygon has no members");
            }
            for p in &mp.0 {
                check_polygon(p)?;
            }
        }
    }

    // Self-intersection, ring nesting and member overlap are the kernel's call.
    if !shape.to_geometry().is_valid() {
        return Err("rejected by kernel validity check");
    }
    Ok(())
}

fn check_line(ls: &LineString) -> std::result::Result<(), &'static str> {
    if ls.0.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err("non-finite coordinate");
    }
    if distinct_coord_count(&ls.0, COORD_EPSILON) < 2 {
        return Err("fewer than two distinct coordinates");
    }
    if has_zero_length_segment(ls) {
        return Err("zero-length segment");
    }
    Ok(())
}

fn has_zero_length_segment(ls: &LineString) -> bool {
    ls.0.windows(2)
        .any(|w| coords_eq(w[0], w[1], COORD_EPSILON))
}

fn check_ring(ring: &LineString) -> std::result::Result<(), &'static str> {
    if ring.0.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err("non-finite coordinate");
    }
    if !ring.is_closed() {
        return Err("ring is not closed");
    }
    if ring.0.len() < 4 || distinct_coord_count(&ring.0, COORD_EPSILON) < 3 {
        return Err("ring has fewer than three distinct vertices");
    }
    if has_zero_length_segment(ring) {
        return Err("zero-length segment");
    }
    Ok(())
}

fn check_polygon(polygon: &Polygon) -> std::result::Result<(), &'static str> {
    check_ring(polygon.exterior())?;
    for interior in polygon.interiors() {
        check_ring(interior)?;
    }
    Ok(())
}
