use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use backdrop::{
    AssetSlot, Backdrop, BackdropConfig, CpuSurface, DrawSurface, FxMode, HostSignals,
    LayoutCache, ManualScheduler, RecordingSurface, SceneId, SurfaceSize,
};

#[derive(Parser, Debug)]
#[command(name = "backdrop", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a sequence of frames as PNG files.
    Render(RenderArgs),
    /// Dump the draw operations of one frame as JSON.
    Trace(TraceArgs),
    /// List the available scenes.
    Scenes,
}

#[derive(Args, Debug)]
struct SceneArgs {
    /// JSON configuration file; flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scene id.
    #[arg(long)]
    scene: Option<SceneId>,

    /// Layout seed (defaults to the scene's canonical seed).
    #[arg(long)]
    seed: Option<u64>,

    /// Visual intensity: clear, cinematic or max.
    #[arg(long)]
    fx: Option<FxMode>,

    /// Entity density multiplier.
    #[arg(long)]
    detail: Option<f64>,

    /// Viewport width in CSS pixels.
    #[arg(long)]
    width: Option<f64>,

    /// Viewport height in CSS pixels.
    #[arg(long)]
    height: Option<f64>,

    /// Device pixel ratio.
    #[arg(long)]
    dpr: Option<f64>,

    /// Image used by scenes with an image stage.
    #[arg(long)]
    asset: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Number of frames.
    #[arg(long, default_value_t = 1)]
    frames: u64,

    /// Simulated display refresh rate.
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Output directory; frames are written as frame_00000.png, frame_00001.png, ...
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct TraceArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Frame index (0-based) to dump.
    #[arg(long, default_value_t = 0)]
    frame: u64,

    /// Simulated display refresh rate.
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Output JSON path; stdout when absent.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Trace(args) => cmd_trace(args),
        Command::Scenes => {
            for id in SceneId::ALL {
                println!("{:<12} seed {:<4} {}", id.as_str(), id.default_seed(), id.describe());
            }
            Ok(())
        }
    }
}

fn build_config(args: &SceneArgs) -> anyhow::Result<BackdropConfig> {
    let mut cfg = match &args.config {
        Some(path) => BackdropConfig::load(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => BackdropConfig::default(),
    };
    if let Some(scene) = args.scene {
        cfg.scene = scene;
    }
    if args.seed.is_some() {
        cfg.seed = args.seed;
    }
    if let Some(fx) = args.fx {
        cfg.fx = fx;
    }
    if let Some(detail) = args.detail {
        cfg.detail = detail;
    }
    if let Some(w) = args.width {
        cfg.viewport.width = w;
    }
    if let Some(h) = args.height {
        cfg.viewport.height = h;
    }
    if let Some(dpr) = args.dpr {
        cfg.viewport.device_pixel_ratio = dpr;
    }
    if args.asset.is_some() {
        cfg.asset = args.asset.clone();
    }
    cfg.validate().context("invalid configuration")?;
    Ok(cfg)
}

/// Offline rendering must not race the decoder, so the asset is decoded up front.
fn load_asset(cfg: &BackdropConfig) -> anyhow::Result<AssetSlot> {
    let Some(path) = &cfg.asset else {
        return Ok(AssetSlot::empty());
    };
    let bytes = std::fs::read(path).with_context(|| format!("read asset '{}'", path.display()))?;
    let image = backdrop::assets::decode_image(&bytes)
        .with_context(|| format!("decode asset '{}'", path.display()))?;
    Ok(AssetSlot::ready(image))
}

fn frame_interval_ms(fps: f64) -> anyhow::Result<f64> {
    if !(fps.is_finite() && fps > 0.0) {
        anyhow::bail!("fps must be finite and > 0, got {fps}");
    }
    Ok(1000.0 / fps)
}

/// Mount `surface` and deliver `frames` callbacks at a fixed interval, calling `after` after each.
fn run_frames(
    cfg: BackdropConfig,
    surface: Box<dyn DrawSurface>,
    frames: u64,
    fps: f64,
    mut after: impl FnMut(u64, &mut Backdrop) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    let interval = frame_interval_ms(fps)?;
    let asset = load_asset(&cfg)?;
    let signals = HostSignals::from_config(&cfg);
    let scheduler = ManualScheduler::new();

    let mut backdrop = Backdrop::new(cfg, Rc::new(LayoutCache::new()))?.with_asset(asset);
    backdrop.mount(Some(surface), &signals, Box::new(scheduler.clone()))?;

    for i in 0..frames {
        let req = scheduler
            .take_pending()
            .context("frame loop stopped unexpectedly")?;
        backdrop.on_frame(req, i as f64 * interval);
        after(i, &mut backdrop)?;
    }
    backdrop.teardown();
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let cfg = build_config(&args.scene)?;
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create output dir '{}'", args.out.display()))?;

    let surface = CpuSurface::new(SurfaceSize::new(1, 1))?;
    let out = args.out.clone();
    run_frames(cfg, Box::new(surface), args.frames, args.fps, |i, backdrop| {
        let mut frame = backdrop
            .snapshot()
            .context("surface cannot be read back")?;
        frame.unpremultiply();
        let path = out.join(format!("frame_{i:05}.png"));
        write_png(&path, &frame)
    })?;

    eprintln!("wrote {} frame(s) to {}", args.frames, args.out.display());
    Ok(())
}

fn write_png(path: &Path, frame: &backdrop::FrameRGBA) -> anyhow::Result<()> {
    image::save_buffer_with_format(
        path,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))
}

fn cmd_trace(args: TraceArgs) -> anyhow::Result<()> {
    let cfg = build_config(&args.scene)?;
    let surface = RecordingSurface::new(SurfaceSize::new(1, 1));
    let log = surface.log();
    let target = args.frame;
    let mut ops = Vec::new();
    run_frames(cfg, Box::new(surface), target + 1, args.fps, |i, _| {
        let frame_ops = log.take();
        if i == target {
            ops = frame_ops;
        }
        Ok(())
    })?;

    let json = serde_json::to_string_pretty(&ops).context("serialize draw trace")?;
    match &args.out {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("write trace '{}'", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
