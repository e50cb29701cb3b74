//! Quantatlas Application
//!
//! Headless driver for the subcortical atlas viewer pipeline. Loads the
//! exported mesh and prediction assets from a local directory or an HTTP
//! base URL and reports per-region statistics.
//!
//! # Usage
//!
//! ```bash
//! # Load every region from a local export
//! quantatlas load --data-dir ./public/data
//!
//! # A subset over HTTP, myelin at age 55, single hemisphere
//! quantatlas load --base-url https://atlas.example.org/data \
//!     --regions STN,SN,RN --prediction myelin_median --age 55 --bilateral false
//!
//! # Inspect the catalogs
//! quantatlas regions
//! quantatlas predictions
//! ```

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use quantatlas_core::catalog::{AtlasCatalog, AGE_MAX, AGE_MIN};
use quantatlas_core::ColorMap;
use quantatlas_viewer::{
    AssetFetcher, AssetSource, ColorMode, DirAssetSource, HttpAssetSource, ViewerController,
};

/// Quantatlas viewer pipeline
#[derive(Parser, Debug)]
#[command(name = "quantatlas")]
#[command(author, version, about = "Subcortical quantitative atlas loader", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a progressive load cycle and report what was loaded
    Load {
        /// Local directory containing exported_meshes/ and exported_predictions/
        #[arg(long, conflicts_with = "base_url")]
        data_dir: Option<String>,

        /// HTTP base URL serving the exported assets
        #[arg(long)]
        base_url: Option<String>,

        /// Age in years (19-80)
        #[arg(short, long, default_value = "30")]
        age: u8,

        /// Prediction type identifier
        #[arg(short, long, default_value = "iron_median")]
        prediction: String,

        /// Comma-separated region identifiers, or "all"
        #[arg(short, long, default_value = "all")]
        regions: String,

        /// Display bilateral structures on both hemispheres
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        bilateral: bool,

        /// Heatmap palette: white-red or hsl; "anatomical" for flat colors
        #[arg(long, default_value = "white-red")]
        colormap: String,
    },

    /// List the region catalog
    Regions,

    /// List the prediction types
    Predictions,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Quantatlas v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Load {
            data_dir,
            base_url,
            age,
            prediction,
            regions,
            bilateral,
            colormap,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_load(
                data_dir, base_url, age, prediction, regions, bilateral, colormap,
            ))?;
        }
        Commands::Regions => list_regions(),
        Commands::Predictions => list_predictions(),
    }

    Ok(())
}

/// Drive one full progressive load and print a summary.
#[allow(clippy::too_many_arguments)]
async fn run_load(
    data_dir: Option<String>,
    base_url: Option<String>,
    age: u8,
    prediction: String,
    regions: String,
    bilateral: bool,
    colormap: String,
) -> anyhow::Result<()> {
    let source: Arc<dyn AssetSource> = match (data_dir, base_url) {
        (Some(dir), _) => Arc::new(DirAssetSource::new(dir)),
        (None, Some(url)) => Arc::new(HttpAssetSource::new(url)),
        (None, None) => anyhow::bail!("either --data-dir or --base-url is required"),
    };

    let catalog = Arc::new(AtlasCatalog::standard());
    if catalog.predictions().get(&prediction).is_none() {
        anyhow::bail!("unknown prediction type: {prediction} (see `quantatlas predictions`)");
    }
    if !(AGE_MIN..=AGE_MAX).contains(&age) {
        anyhow::bail!("age {age} outside the prediction range {AGE_MIN}-{AGE_MAX}");
    }

    let selected: Vec<String> = if regions == "all" {
        catalog.regions().ids().map(str::to_string).collect()
    } else {
        regions.split(',').map(|s| s.trim().to_string()).collect()
    };
    for id in &selected {
        if catalog.regions().get(id).is_none() {
            warn!(region = %id, "unknown region identifier, skipping");
        }
    }

    let color_mode = match colormap.as_str() {
        "anatomical" => ColorMode::Anatomical,
        name => match ColorMap::from_name(name) {
            Some(map) => ColorMode::Heatmap(map),
            None => anyhow::bail!("unknown colormap: {name}"),
        },
    };

    let mut fetcher = AssetFetcher::new(source, Arc::clone(&catalog));
    let mut controller = ViewerController::new(Arc::clone(&catalog));
    controller.set_age(age);
    controller.set_prediction_type(&prediction);
    controller.set_color_mode(color_mode);
    controller.set_bilateral(bilateral);
    controller.set_selected_regions(selected);

    info!(
        pairs = controller.fetch_list().len(),
        prediction = %prediction,
        age,
        "starting load"
    );

    controller.reload(&mut fetcher).await;

    if controller.failed_pairs() > 0 {
        warn!(
            failed = controller.failed_pairs(),
            "some regions failed to load; the rest render normally"
        );
    }

    // Per-frame centering would happen in the render loop; one tick
    // suffices here because every geometry is already built.
    let centering = controller.scene_mut().tick();
    let translation = controller.scene().translation();

    let scale = controller.color_scale();
    let prediction_info = catalog.predictions().get(&prediction);
    match (scale.min, scale.max) {
        (Some(min), Some(max)) => {
            let unit = prediction_info.map(|p| p.unit).unwrap_or_default();
            info!("color scale: {min:.3} - {max:.3} {unit}");
        }
        _ => info!("color scale unresolved (no values loaded)"),
    }
    info!(?centering, tx = translation.x, ty = translation.y, tz = translation.z, "scene");

    println!(
        "{:<8} {:<32} {:>9} {:>10} {:>12}",
        "KEY", "REGION", "VERTICES", "TRIANGLES", "MEAN"
    );
    let mut keys: Vec<_> = controller.entries().keys().cloned().collect();
    keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    for key in keys {
        let Some(entry) = controller.entries().get(&key) else {
            continue;
        };
        let Some(geometry) = controller.colorized(&key) else {
            println!("{:<8} {:<32} {:>9} {:>10} {:>12}", key, entry.display_name(), "-", "-", "not ready");
            continue;
        };
        let mean = geometry
            .mean_value
            .map_or_else(|| "-".to_string(), |m| format!("{m:.3}"));
        println!(
            "{:<8} {:<32} {:>9} {:>10} {:>12}",
            key,
            entry.display_name(),
            geometry.vertex_count(),
            geometry.indices.len() / 3,
            mean
        );
    }

    info!(
        loaded = controller.ready_entries().count(),
        failed = controller.failed_pairs(),
        progress = controller.progress(),
        "done"
    );

    Ok(())
}

/// Print the region catalog.
fn list_regions() {
    let catalog = AtlasCatalog::standard();
    println!("{:<6} {:<32} {:<10} {}", "ID", "NAME", "BILATERAL", "MESH FILE");
    for region in catalog.regions().all() {
        println!(
            "{:<6} {:<32} {:<10} {}",
            region.id,
            region.name,
            if region.bilateral { "L/R" } else { "-" },
            region.mesh_file
        );
    }
}

/// Print the prediction-type catalog.
fn list_predictions() {
    let catalog = AtlasCatalog::standard();
    println!("{:<20} {:<24} {}", "ID", "NAME", "UNIT");
    for prediction in catalog.predictions().all() {
        println!(
            "{:<20} {:<24} {}",
            prediction.id, prediction.name, prediction.unit
        );
    }
}
