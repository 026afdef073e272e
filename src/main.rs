use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use pixelkeeper::denoise::{self, Region};
use pixelkeeper::{
    load_zones, mirror, CanvasApi, Config, Reconciler, ReconcilerOptions, RestCanvas,
    TemplateRegistry,
};

const DEFAULT_SNAPSHOT_PATH: &str = "images/ignore/canvas.png";

#[derive(Parser, Debug)]
#[command(name = "pixelkeeper", version)]
struct Cli {
    /// Configuration file.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load zones and defend them until interrupted (the default).
    Run,
    /// Fetch the canvas once and save it as a PNG.
    Snapshot(SnapshotArgs),
    /// Keep a Discord webhook message updated with the canvas.
    Mirror,
    /// Majority-vote smoothing over one region of the canvas.
    Denoise(DenoiseArgs),
}

#[derive(Parser, Debug)]
struct SnapshotArgs {
    /// Output PNG path.
    #[arg(long, default_value = DEFAULT_SNAPSHOT_PATH)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct DenoiseArgs {
    #[arg(long)]
    x: u32,
    #[arg(long)]
    y: u32,
    #[arg(long)]
    width: u32,
    #[arg(long)]
    height: u32,
    /// How many of a pixel's eight neighbours must agree before it is
    /// repainted.
    #[arg(long, default_value_t = denoise::DEFAULT_NEIGHBOUR_THRESHOLD)]
    threshold: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    log::info!("loaded config from {}", cli.config.display());

    log::info!("getting canvas size");
    let api = RestCanvas::connect(&config)
        .await
        .context("failed to connect to canvas backend")?;
    let size = api.get_size().await?;
    log::info!("canvas size: {}x{}", size.width, size.height);

    match cli.cmd.unwrap_or(Command::Run) {
        Command::Run => cmd_run(api, &config).await,
        Command::Snapshot(args) => save_snapshot(&api, &args.out).await,
        Command::Mirror => cmd_mirror(api, &config).await,
        Command::Denoise(args) => cmd_denoise(api, args).await,
    }
}

/// Cancelled when the process receives ctrl-c, so loops can finish the zone
/// they are on before exiting.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("interrupt received, finishing the current zone");
            signal_token.cancel();
        }
    });
    token
}

async fn cmd_run(api: RestCanvas, config: &Config) -> Result<()> {
    log::info!("loading zones from {}", config.zones_dir.display());
    let mut registry = TemplateRegistry::new();
    let zones = load_zones(&config.zones_dir, &mut registry)?;
    if zones.is_empty() {
        log::warn!("no zone definitions found in {}", config.zones_dir.display());
        return Ok(());
    }

    let total_area: u64 = zones.iter().map(|zone| zone.area_opaque).sum();
    log::info!("total area: {total_area} pixels");
    let canvas_area = api.get_size().await?.area();
    if canvas_area > 0 {
        let percent = total_area as f64 / canvas_area as f64 * 100.0;
        log::info!("total area: {percent:.2}% of canvas");
    }

    // One snapshot on disk before the loop starts, handy for eyeballing.
    if let Err(err) = save_snapshot(&api, Path::new(DEFAULT_SNAPSHOT_PATH)).await {
        log::warn!("could not save startup snapshot: {err:?}");
    }

    let options = ReconcilerOptions {
        refresh_stride: config.refresh_stride,
        protected_colour: config.protected_colour,
    };
    let reconciler = Reconciler::new(api, zones, options);
    reconciler.run(shutdown_token()).await;
    Ok(())
}

async fn save_snapshot(api: &RestCanvas, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let canvas = api.get_pixels().await?;
    canvas
        .to_image()
        .save(path)
        .with_context(|| format!("failed to save {}", path.display()))?;
    log::info!("saved canvas snapshot to {}", path.display());
    Ok(())
}

async fn cmd_mirror(api: RestCanvas, config: &Config) -> Result<()> {
    let mirror_config = config
        .mirror
        .as_ref()
        .context("config has no mirror section")?;
    mirror::run(&api, mirror_config, shutdown_token()).await
}

async fn cmd_denoise(api: RestCanvas, args: DenoiseArgs) -> Result<()> {
    let region = Region {
        x: args.x,
        y: args.y,
        width: args.width,
        height: args.height,
    };
    let mut canvas = api.get_pixels().await?;
    let repainted = denoise::denoise_region(&api, &mut canvas, region, args.threshold).await?;
    log::info!("denoise repainted {repainted} pixels");
    Ok(())
}
