use crate::config::ClassificationConfig;
use crate::geometry::{Feature, FeatureCollection};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Class every feature lands in when no mapping is configured.
pub const ALL_CLASS: &str = "all";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classified {
    /// Class -> features, ordered by class name.
    pub classes: BTreeMap<String, FeatureCollection>,
    /// Features without a usable class property.
    pub unclassified: usize,
    /// Features whose class is not in the mapping.
    pub unmapped: usize,
}

/// Split a collection by the value of `config.property_key`.
///
/// Link classes fold into their parent (`motorway_link` -> `motorway`).
/// Every output collection keeps the input's CRS token.
pub fn classify_features(collection: &FeatureCollection, config: &ClassificationConfig) -> Classified {
    let mut out = Classified::default();

    if config.feature_mapping.is_empty() {
        out.classes
            .insert(ALL_CLASS.to_string(), collection.clone());
        info!("No feature mapping, {} features kept as '{}'", collection.len(), ALL_CLASS);
        return out;
    }

    let mut buckets: BTreeMap<String, Vec<Feature>> = BTreeMap::new();
    for feature in &collection.features {
        let Some(raw) = feature.property_str(&config.property_key) else {
            out.unclassified += 1;
            continue;
        };
        let class = config
            .link_mapping
            .get(raw)
            .map(String::as_str)
            .unwrap_or(raw);
        if !config.feature_mapping.contains_key(class) {
            out.unmapped += 1;
            continue;
        }
        buckets
            .entry(class.to_string())
            .or_default()
            .push(feature.clone());
    }

    for (class, features) in buckets {
        info!("Feature type: {}, count: {}", class, features.len());
        out.classes.insert(class, collection.with_features(features));
    }
    debug!(
        "{} features without '{}', {} with an unmapped class",
        out.unclassified, config.property_key, out.unmapped
    );
    out
}

impl ClassificationConfig {
    /// File name a class is written to.
    pub fn output_file_name(&self, class: &str) -> String {
        self.feature_mapping
            .get(class)
            .cloned()
            .unwrap_or_else(|| format!("{}.geojson", class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Crs, Properties, Shape};
    use geo::line_string;
    use serde_json::json;

    fn road(kind: serde_json::Value) -> Feature {
        let mut props = Properties::new();
        props.insert("highway".to_string(), kind);
        Feature::with_properties(
            Shape::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)]),
            props,
        )
    }

    #[test]
    fn test_links_fold_into_parent() {
        let collection = FeatureCollection::new(
            vec![
                road(json!("motorway")),
                road(json!("motorway_link")),
                road(json!("trunk")),
                road(json!("residential")),
                road(json!(7)),
                Feature::new(Shape::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)])),
            ],
            Some(Crs::epsg(4326)),
        );
        let out = classify_features(&collection, &ClassificationConfig::osm_roads());

        assert_eq!(
            out.classes.keys().collect::<Vec<_>>(),
            vec!["motorway", "trunk"]
        );
        assert_eq!(out.classes["motorway"].len(), 2);
        assert_eq!(out.classes["trunk"].len(), 1);
        assert_eq!(out.classes["motorway"].crs, Some(Crs::epsg(4326)));
        assert_eq!(out.unmapped, 1);
        assert_eq!(out.unclassified, 2);
    }

    #[test]
    fn test_empty_mapping_keeps_everything() {
        let collection = FeatureCollection::new(vec![road(json!("anything")), road(json!(1))], None);
        let out = classify_features(&collection, &ClassificationConfig::default());
        assert_eq!(out.classes.len(), 1);
        assert_eq!(out.classes[ALL_CLASS], collection);
    }

    #[test]
    fn test_output_file_names() {
        let config = ClassificationConfig::osm_roads();
        assert_eq!(config.output_file_name("motorway"), "motorways.geojson");
        assert_eq!(config.output_file_name("all"), "all.geojson");
    }
}
