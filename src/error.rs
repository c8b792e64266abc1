use std::fmt;
use thiserror::Error;

/// Pipeline stage reported with data errors, so a failure can be placed
/// without re-running. Configuration errors name the offending field instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Validate,
    Corridor,
    Merge,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::Corridor => "corridor",
            Stage::Merge => "merge",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Structurally malformed input geometry. Recovered by dropping the feature.
    #[error("[{stage}] invalid {geometry_type} (feature #{index}): {reason}")]
    InvalidGeometry {
        stage: Stage,
        index: usize,
        geometry_type: &'static str,
        reason: &'static str,
    },
    /// Line with fewer than two distinct coordinates. Recovered by dropping the line.
    #[error("[{stage}] degenerate edge (line #{index}) with {distinct} distinct coordinate(s)")]
    DegenerateEdge {
        stage: Stage,
        index: usize,
        distinct: usize,
    },
    /// Union step returned something other than Polygon/MultiPolygon.
    #[error("[{stage}] unexpected geometry type after dissolving buffers: {geometry_type}")]
    UnexpectedDissolveResult {
        stage: Stage,
        geometry_type: &'static str,
    },
    #[error("configuration error: {field} = {value} ({reason})")]
    Configuration {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },
    #[error("[{stage}] no features left to process ({dropped} dropped)")]
    EmptyResult { stage: Stage, dropped: usize },
}

impl PipelineError {
    /// Per-dataset errors abort the whole operation; per-feature errors never do.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            PipelineError::InvalidGeometry { .. } | PipelineError::DegenerateEdge { .. }
        )
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
