// ===========================================================================
// Stage orchestration
// ===========================================================================
//
// centerline:  validate -> corridor -> boundary -> merge -> simplify
// consolidate: validate -> merge -> simplify
// urban area:  validate -> buffer polygons -> dissolve
// separate:    classify -> reproject (per class, in parallel)
//
// Every entry point checks its configuration before any geometry or kernel
// work. Outputs are new collections; inputs are never mutated.
// ===========================================================================

use crate::boundary::extract_boundary;
use crate::classify::classify_features;
use crate::config::{ClassificationConfig, PipelineConfig, Projection, check_buffer_distance};
use crate::corridor::{build_corridor, dissolve_areas};
use crate::error::{PipelineError, Result, Stage};
use crate::geometry::{Feature, FeatureCollection, Shape};
use crate::kernel::GeometryKernel;
use crate::linemerge::merge_lines;
use crate::reproject::apply_projection;
use crate::simplify::simplify_lines;
use crate::validate::validate_features;
use geo::{LineString, Polygon};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub input_features: usize,
    pub invalid_dropped: usize,
    /// Valid features that carried no line geometry.
    pub non_line_skipped: usize,
    pub corridor_parts: usize,
    pub boundary_rings: usize,
    pub degenerate_dropped: usize,
    pub merge_joins: usize,
    pub output_lines: usize,
}

/// Outline of the dissolved corridor around a bundle of parallel lines,
/// merged and simplified. One output feature per line.
pub fn centerline<K: GeometryKernel + ?Sized>(
    collection: &FeatureCollection,
    config: &PipelineConfig,
    kernel: &K,
) -> Result<(FeatureCollection, PipelineStats)> {
    config.validate()?;

    let mut stats = PipelineStats::default();
    let Some(lines) = valid_line_parts(collection, config, &mut stats)? else {
        return Ok((collection.with_features(Vec::new()), stats));
    };

    let footprint = build_corridor(&lines, config.buffer_distance, kernel)?;
    stats.corridor_parts = footprint.polygons().len();

    let rings = extract_boundary(&footprint);
    stats.boundary_rings = rings.len();

    finish(collection, config, &rings, stats)
}

/// Stitch a raw line network into maximal paths, then simplify.
pub fn consolidate_network(
    collection: &FeatureCollection,
    config: &PipelineConfig,
) -> Result<(FeatureCollection, PipelineStats)> {
    config.validate_merge()?;

    let mut stats = PipelineStats::default();
    let Some(lines) = valid_line_parts(collection, config, &mut stats)? else {
        return Ok((collection.with_features(Vec::new()), stats));
    };

    finish(collection, config, &lines, stats)
}

/// Built-up-area footprint: every polygon grown by `buffer_distance` and
/// dissolved into a single Polygon/MultiPolygon feature.
pub fn urban_area<K: GeometryKernel + ?Sized>(
    collection: &FeatureCollection,
    config: &PipelineConfig,
    kernel: &K,
) -> Result<(FeatureCollection, PipelineStats)> {
    check_buffer_distance(config.buffer_distance)?;

    let mut stats = PipelineStats {
        input_features: collection.len(),
        ..Default::default()
    };
    let report = validate_features(collection.features.clone(), config.require_non_empty)?;
    stats.invalid_dropped = report.dropped;

    let mut polygons: Vec<Polygon> = Vec::new();
    let mut lines_skipped = 0;
    for feature in &report.kept {
        let parts = feature.shape.polygon_parts();
        if parts.is_empty() {
            lines_skipped += 1;
            continue;
        }
        polygons.extend(parts.into_iter().cloned());
    }
    if lines_skipped > 0 {
        warn!("Skipped {} line features, expected polygons", lines_skipped);
    }

    if polygons.is_empty() {
        if config.require_non_empty {
            return Err(PipelineError::EmptyResult {
                stage: Stage::Validate,
                dropped: stats.invalid_dropped + lines_skipped,
            });
        }
        info!("No polygon geometries to process");
        return Ok((collection.with_features(Vec::new()), stats));
    }

    let footprint = dissolve_areas(&polygons, config.buffer_distance, kernel)?;
    stats.corridor_parts = footprint.polygons().len();
    info!("Urban area footprint has {} part(s)", stats.corridor_parts);

    let features = vec![Feature::new(Shape::from(footprint))];
    Ok((collection.with_features(features), stats))
}

/// Split by class and reproject each class. Classes are independent, so
/// they are transformed in parallel; the ordered map keeps output stable.
pub fn separate(
    collection: &FeatureCollection,
    classification: &ClassificationConfig,
    projection: Projection,
) -> BTreeMap<String, FeatureCollection> {
    let classified = classify_features(collection, classification);
    classified
        .classes
        .into_par_iter()
        .map(|(class, features)| {
            let projected = apply_projection(&features, projection);
            (class, projected)
        })
        .collect()
}

/// Validated line members of every feature. `None` means there is nothing
/// to process and an empty result is acceptable.
fn valid_line_parts(
    collection: &FeatureCollection,
    config: &PipelineConfig,
    stats: &mut PipelineStats,
) -> Result<Option<Vec<LineString>>> {
    stats.input_features = collection.len();
    let report = validate_features(collection.features.clone(), config.require_non_empty)?;
    stats.invalid_dropped = report.dropped;

    let mut lines = Vec::new();
    for feature in &report.kept {
        let parts = feature.shape.line_parts();
        if parts.is_empty() {
            stats.non_line_skipped += 1;
            continue;
        }
        lines.extend(parts.into_iter().cloned());
    }
    if stats.non_line_skipped > 0 {
        warn!("Skipped {} polygonal features, expected lines", stats.non_line_skipped);
    }

    if lines.is_empty() {
        if config.require_non_empty {
            return Err(PipelineError::EmptyResult {
                stage: Stage::Validate,
                dropped: stats.invalid_dropped + stats.non_line_skipped,
            });
        }
        info!("No line geometries to process");
        return Ok(None);
    }
    Ok(Some(lines))
}

fn finish(
    collection: &FeatureCollection,
    config: &PipelineConfig,
    lines: &[LineString],
    mut stats: PipelineStats,
) -> Result<(FeatureCollection, PipelineStats)> {
    let merged = merge_lines(lines, config.merge_epsilon);
    stats.degenerate_dropped = merged.degenerate;
    stats.merge_joins = merged.joins;

    let simplified = simplify_lines(merged.lines, config.simplify_tolerance)?;
    stats.output_lines = simplified.len();

    let features = simplified
        .into_iter()
        .map(|line| Feature::new(Shape::LineString(line)))
        .collect();
    info!("Pipeline produced {} lines", stats.output_lines);

    Ok((collection.with_features(features), stats))
}
