use canopy::{CanopyCommand, Crs, RasterGrid, SegmentationPipeline};
use canopy_cli::SegmentationJob;
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment tree canopies described by a job file
    Segment {
        /// Path to the TOML or JSON job file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the raster intensity under a point
    Sample {
        /// Path to the TOML or JSON job file
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
        /// CRS of the point (defaults to the raster CRS)
        #[arg(long)]
        crs: Option<String>,
    },
    /// Write a skeleton job file
    Init {
        /// Where to write it (.toml or .json)
        #[arg(short, long, default_value = "canopy.toml")]
        output: PathBuf,
    },
    /// Print the JSON schema of the session commands
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Segment { config } => segment(&config).await?,
        Commands::Sample { config, x, y, crs } => sample(&config, x, y, crs)?,
        Commands::Init { output } => {
            SegmentationJob::skeleton().to_file(&output)?;
            info!("Skeleton job written to {:?}", output);
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&CanopyCommand::schema())?);
        }
    }

    Ok(())
}

async fn segment(config_path: &Path) -> Result<()> {
    let job = SegmentationJob::from_file(config_path)?;
    info!("Segmentation job: {:?}", job);

    // The pipeline is CPU-bound and synchronous.
    let result = tokio::task::spawn_blocking(move || job.run()).await??;

    if result.is_empty() {
        warn!("No canopies found inside the area of interest");
    }
    info!(
        polygons = result.len(),
        threshold = result.threshold,
        total_area_px = result.total_area_px(),
        "Segmentation completed"
    );
    Ok(())
}

fn sample(config_path: &Path, x: f64, y: f64, crs: Option<String>) -> Result<()> {
    let job = SegmentationJob::from_file(config_path)?;
    let grid = RasterGrid::from_path(&job.raster, job.extent, job.raster_crs())?;
    let crs = crs.map(Crs::new).unwrap_or_else(|| grid.crs().clone());

    match SegmentationPipeline::default().sample(&grid, x, y, &crs)? {
        Some(sample) => println!("{}", serde_json::to_string_pretty(&sample)?),
        None => warn!("Point ({x}, {y}) in {crs} lies outside the raster"),
    }
    Ok(())
}
