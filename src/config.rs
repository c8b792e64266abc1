use crate::error::{PipelineError, Result};
use crate::geometry::COORD_EPSILON;
use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Tunables for the centerline, consolidation and urban area pipelines.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Corridor half-width, in working units (metres for projected data).
    pub buffer_distance: f64,
    /// Maximum deviation allowed when dropping vertices. 0 disables simplification.
    pub simplify_tolerance: f64,
    /// Endpoint equality tolerance used by the merger.
    pub merge_epsilon: f64,
    /// Fail with `EmptyResult` if validation drops every feature.
    pub require_non_empty: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_distance: 10.0,
            simplify_tolerance: 0.001,
            merge_epsilon: COORD_EPSILON,
            require_non_empty: true,
        }
    }
}

impl PipelineConfig {
    /// Every field, as used by the centerline pipeline.
    pub fn validate(&self) -> Result<()> {
        check_buffer_distance(self.buffer_distance)?;
        self.validate_merge()
    }

    /// Only the fields merging and simplification read; `buffer_distance`
    /// is irrelevant to a network without a corridor step.
    pub fn validate_merge(&self) -> Result<()> {
        check_tolerance(self.simplify_tolerance)?;
        if !(self.merge_epsilon.is_finite() && self.merge_epsilon > 0.0) {
            return Err(PipelineError::Configuration {
                field: "merge_epsilon",
                value: self.merge_epsilon,
                reason: "must be a positive finite number",
            });
        }
        Ok(())
    }
}

pub(crate) fn check_buffer_distance(distance: f64) -> Result<()> {
    if distance.is_finite() && distance > 0.0 {
        Ok(())
    } else {
        Err(PipelineError::Configuration {
            field: "buffer_distance",
            value: distance,
            reason: "must be strictly positive",
        })
    }
}

pub(crate) fn check_tolerance(tolerance: f64) -> Result<()> {
    if tolerance.is_finite() && tolerance >= 0.0 {
        Ok(())
    } else {
        Err(PipelineError::Configuration {
            field: "simplify_tolerance",
            value: tolerance,
            reason: "must be non-negative",
        })
    }
}

/// How raw features are split into per-class outputs.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Property holding the feature class (`highway` for OSM roads, `railway` for rail).
    pub property_key: String,
    /// Class -> output file name. Empty means "keep everything in one class".
    pub feature_mapping: BTreeMap<String, String>,
    /// Link class -> parent class, e.g. `motorway_link` -> `motorway`.
    pub link_mapping: BTreeMap<String, String>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            property_key: "highway".to_string(),
            feature_mapping: BTreeMap::new(),
            link_mapping: BTreeMap::new(),
        }
    }
}

impl ClassificationConfig {
    /// OSM road hierarchy with `_link` ways folded into their parent class.
    pub fn osm_roads() -> Self {
        let classes = ["motorway", "trunk", "primary", "secondary", "tertiary"];
        let feature_mapping = classes
            .iter()
            .map(|c| {
                let file = match *c {
                    "motorway" => "motorways.geojson".to_string(),
                    "trunk" => "trunks.geojson".to_string(),
                    other => format!("{}.geojson", other),
                };
                (c.to_string(), file)
            })
            .collect();
        let link_mapping = classes
            .iter()
            .map(|c| (format!("{}_link", c), c.to_string()))
            .collect();
        Self {
            property_key: "highway".to_string(),
            feature_mapping,
            link_mapping,
        }
    }
}

/// Coordinate transform applied by the `separate` pipeline.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Default)]
pub enum Projection {
    #[default]
    Identity,
    WebMercator,
    LocalTangentPlane { lon0: f64, lat0: f64 },
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    pub pipeline: PipelineConfig,
    pub classification: ClassificationConfig,
    pub projection: Projection,
}

/// Parse settings from RON text. Missing fields take their defaults.
///
/// Values are range-checked by each pipeline for the fields it reads, so one
/// file can serve every subcommand.
pub fn parse_config(text: &str) -> anyhow::Result<Settings> {
    let settings: Settings = ron::from_str(text).context("Failed to parse RON settings")?;
    Ok(settings)
}

pub fn load_config(path: &Path) -> anyhow::Result<Settings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    parse_config(&text).with_context(|| format!("Invalid config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer_distance, 10.0);
        assert_eq!(config.merge_epsilon, 1e-9);
    }

    #[test]
    fn test_non_positive_buffer_distance_rejected() {
        for bad in [0.0, -1.0, f64::NAN] {
            let config = PipelineConfig {
                buffer_distance: bad,
                ..Default::default()
            };
            match config.validate() {
                Err(PipelineError::Configuration { field, .. }) => {
                    assert_eq!(field, "buffer_distance")
                }
                other => panic!("expected configuration error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_negative_tolerance_rejected_zero_allowed() {
        let zero = PipelineConfig {
            simplify_tolerance: 0.0,
            ..Default::default()
        };
        assert!(zero.validate().is_ok());

        let negative = PipelineConfig {
            simplify_tolerance: -0.5,
            ..Default::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(PipelineError::Configuration {
                field: "simplify_tolerance",
                ..
            })
        ));
    }

    #[test]
    fn test_parse_ron_settings() {
        let text = r#"(
            pipeline: (buffer_distance: 6.0, simplify_tolerance: 0.5),
            classification: (
                property_key: "railway",
                feature_mapping: {"rail": "rail.geojson"},
            ),
            projection: WebMercator,
        )"#;
        let settings = parse_config(text).unwrap();
        assert_eq!(settings.pipeline.buffer_distance, 6.0);
        assert_eq!(settings.pipeline.merge_epsilon, COORD_EPSILON);
        assert!(settings.pipeline.require_non_empty);
        assert_eq!(settings.classification.property_key, "railway");
        assert!(settings.classification.link_mapping.is_empty());
        assert_eq!(settings.projection, Projection::WebMercator);
    }

    #[test]
    fn test_zero_distance_only_matters_for_buffering() {
        let settings = parse_config("(pipeline: (buffer_distance: 0.0))").unwrap();
        assert!(settings.pipeline.validate().is_err());
        assert!(settings.pipeline.validate_merge().is_ok());

        assert!(parse_config("(pipeline: (buffer_distance: \"wide\"))").is_err());
    }

    #[test]
    fn test_osm_roads_mapping() {
        let config = ClassificationConfig::osm_roads();
        assert_eq!(config.feature_mapping["motorway"], "motorways.geojson");
        assert_eq!(config.feature_mapping["tertiary"], "tertiary.geojson");
        assert_eq!(config.link_mapping["trunk_link"], "trunk");
    }
}
