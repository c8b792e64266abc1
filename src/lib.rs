// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::cmp_null,
    clippy::op_ref
)]

//! Road and rail network cleanup: corridor outlines of parallel carriageways,
//! endpoint stitching of split line networks, and topology-preserving
//! simplification.

pub mod boundary;
pub mod classify;
pub mod config;
pub mod corridor;
pub mod error;
pub mod geometry;
pub mod io;
pub mod kernel;
pub mod linemerge;
pub mod pipeline;
pub mod reproject;
pub mod simplify;
pub mod validate;


pub use config::{ClassificationConfig, PipelineConfig, Projection, Settings};
pub use error::{PipelineError, Stage};
pub use geometry::{Crs, Feature, FeatureCollection, Footprint, Shape};
pub use kernel::{GeoKernel, GeometryKernel};
