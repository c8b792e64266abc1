use crate::geometry::{Crs, Feature, FeatureCollection, Shape};
use anyhow::{Context, bail};
use geojson::{GeoJson, JsonObject};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

const CRS_MEMBER: &str = "crs";

/// Convert a parsed GeoJSON FeatureCollection.
///
/// Features with no geometry or with a geometry the pipeline does not handle
/// (points, collections) are skipped and counted in the log.
pub fn from_geojson(collection: geojson::FeatureCollection) -> FeatureCollection {
    let crs = collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get(CRS_MEMBER))
        .map(|value| Crs(value.clone()));

    let total = collection.features.len();
    let mut features = Vec::with_capacity(total);
    let mut skipped = 0;

    for feature in collection.features {
        let Some(geometry) = feature.geometry else {
            skipped += 1;
            continue;
        };
        let shape = match geo_types::Geometry::<f64>::try_from(geometry) {
            Ok(geometry) => Shape::try_from(geometry),
            Err(e) => {
                warn!("Unreadable geometry: {}", e);
                skipped += 1;
                continue;
            }
        };
        match shape {
            Ok(shape) => features.push(Feature::with_properties(
                shape,
                feature.properties.unwrap_or_default(),
            )),
            Err(kind) => {
                warn!("Skipping unsupported {} feature", kind);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} of {} features without a line or polygon geometry", skipped, total);
    }
    FeatureCollection::new(features, crs)
}

pub fn to_geojson(collection: &FeatureCollection) -> geojson::FeatureCollection {
    let features = collection
        .features
        .iter()
        .map(|feature| geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(
                &feature.shape.to_geometry(),
            ))),
            id: None,
            properties: Some(feature.properties.clone()),
            foreign_members: None,
        })
        .collect();

    let foreign_members = collection.crs.as_ref().map(|crs| {
        let mut members = JsonObject::new();
        members.insert(CRS_MEMBER.to_string(), crs.0.clone());
        members
    });

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    }
}

pub fn parse_feature_collection(text: &str) -> anyhow::Result<FeatureCollection> {
    let geojson: GeoJson = text.parse().context("Invalid GeoJSON")?;
    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(from_geojson(collection)),
        GeoJson::Feature(_) => bail!("Expected a FeatureCollection, found a single Feature"),
        GeoJson::Geometry(_) => bail!("Expected a FeatureCollection, found a bare Geometry"),
    }
}

pub fn read_feature_collection(path: &Path) -> anyhow::Result<FeatureCollection> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let collection = parse_feature_collection(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    info!("Read {} features from {}", collection.len(), path.display());
    Ok(collection)
}

/// Write a collection as pretty-printed GeoJSON, creating parent directories.
pub fn write_feature_collection(path: &Path, collection: &FeatureCollection) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &GeoJson::from(to_geojson(collection)))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    writer.flush()?;

    info!("Data saved to {} with {} features", path.display(), collection.len());
    Ok(())
}
