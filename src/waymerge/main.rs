// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use waymerge::config::{Projection, Settings, load_config};
use waymerge::io::{read_feature_collection, write_feature_collection};
use waymerge::kernel::GeoKernel;
use waymerge::pipeline::{centerline, consolidate_network, separate, urban_area};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// RON settings file; flags override individual values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Outline the dissolved corridor around parallel lines
    Centerline {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        buffer_distance: Option<f64>,
        #[arg(long)]
        tolerance: Option<f64>,
    },
    /// Stitch a split line network into maximal paths and simplify
    Consolidate {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        tolerance: Option<f64>,
    },
    /// Grow and dissolve land-use polygons into one built-up-area footprint
    UrbanArea {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        buffer_distance: Option<f64>,
    },
    /// Split features by class and reproject, one file per class
    Separate {
        input: PathBuf,
        output_dir: PathBuf,
        #[arg(long, value_enum)]
        projection: Option<ProjectionArg>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ProjectionArg {
    Identity,
    WebMercator,
}

impl From<ProjectionArg> for Projection {
    fn from(arg: ProjectionArg) -> Self {
        match arg {
            ProjectionArg::Identity => Projection::Identity,
            ProjectionArg::WebMercator => Projection::WebMercator,
        }
    }
}

fn settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => load_config(path),
        None => Ok(Settings::default()),
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let mut settings = settings(args.config.as_deref())?;

    match args.cmd {
        Command::Centerline {
            input,
            output,
            buffer_distance,
            tolerance,
        } => {
            if let Some(d) = buffer_distance {
                settings.pipeline.buffer_distance = d;
            }
            if let Some(t) = tolerance {
                settings.pipeline.simplify_tolerance = t;
            }
            let collection = read_feature_collection(&input)?;
            let (result, stats) = centerline(&collection, &settings.pipeline, &GeoKernel)
                .context("Centerline pipeline failed")?;
            info!("{:?}", stats);
            write_feature_collection(&output, &result)?;
        }
        Command::Consolidate {
            input,
            output,
            tolerance,
        } => {
            if let Some(t) = tolerance {
                settings.pipeline.simplify_tolerance = t;
            }
            let collection = read_feature_collection(&input)?;
            let (result, stats) = consolidate_network(&collection, &settings.pipeline)
                .context("Consolidation pipeline failed")?;
            info!("{:?}", stats);
            write_feature_collection(&output, &result)?;
        }
        Command::UrbanArea {
            input,
            output,
            buffer_distance,
        } => {
            if let Some(d) = buffer_distance {
                settings.pipeline.buffer_distance = d;
            }
            let collection = read_feature_collection(&input)?;
            let (result, stats) = urban_area(&collection, &settings.pipeline, &GeoKernel)
                .context("Urban area pipeline failed")?;
            info!("{:?}", stats);
            write_feature_collection(&output, &result)?;
        }
        Command::Separate {
            input,
            output_dir,
            projection,
        } => {
            if let Some(p) = projection {
                settings.projection = p.into();
            }
            let collection = read_feature_collection(&input)?;
            let classes = separate(&collection, &settings.classification, settings.projection);
            for (class, features) in &classes {
                let path = output_dir.join(settings.classification.output_file_name(class));
                write_feature_collection(&path, features)?;
            }
            info!("Wrote {} class file(s) to {}", classes.len(), output_dir.display());
        }
    }

    Ok(())
}
