use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use glaze_field::gpu::{GpuContext, WgpuFluidSurface, WgpuPointSurface};
use glaze_field::{
    ActivityTap, FixedRateScheduler, FluidField, FluidFieldConfig, FrameClock, FrameLoop,
    LocalSignalBus, LoopStats, Palette, PointField, PointFieldConfig, Renderer, Theme, Viewport,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Field {
    Points,
    Fluid,
}

#[derive(Parser)]
#[command(name = "glaze-preview")]
#[command(about = "Drive a glaze field headlessly with synthetic terminal activity")]
#[command(version)]
struct Cli {
    /// Which renderer to mount
    #[arg(short, long, value_enum, default_value_t = Field::Fluid)]
    field: Field,

    /// Number of frames to render
    #[arg(short = 'n', long, default_value_t = 240)]
    frames: u64,

    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Built-in theme id (default, deep-space, nebula)
    #[arg(short, long, default_value = "default")]
    theme: String,

    /// JSON palette file, overrides --theme
    #[arg(long)]
    palette: Option<PathBuf>,

    /// Frames between synthetic keystrokes (0 = never type)
    #[arg(long, default_value_t = 6)]
    typing_every: u64,

    /// Frame at which the session prints an error
    #[arg(long)]
    error_at: Option<u64>,

    #[arg(long, default_value_t = 1280.0)]
    width: f32,

    #[arg(long, default_value_t = 720.0)]
    height: f32,

    #[arg(long, default_value_t = 1.0)]
    pixel_ratio: f32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_palette(cli: &Cli) -> Result<Palette> {
    if let Some(path) = &cli.palette {
        let source = std::fs::read_to_string(path)?;
        return Ok(Palette::from_json(&source)?);
    }
    Theme::by_id(&cli.theme)
        .map(|theme| theme.palette)
        .ok_or_else(|| anyhow!("unknown theme '{}'", cli.theme))
}

/// Feed the tap what a shell session would produce on `frame`.
fn feed(tap: &ActivityTap<LocalSignalBus>, cli: &Cli, frame: u64) {
    if cli.typing_every > 0 && frame % cli.typing_every == 0 {
        tap.on_user_input(b"l");
    }
    if cli.error_at == Some(frame) {
        tap.on_process_output(b"zsh: command not found: sl\r\n");
    } else if frame % 30 == 0 {
        tap.on_process_output(b"total 48\r\ndrwxr-xr-x  6 user staff  192 .\r\n");
    }
}

fn drive<R: Renderer>(
    renderer: R,
    tap: &ActivityTap<LocalSignalBus>,
    cli: &Cli,
) -> LoopStats {
    let mut frame_loop = FrameLoop::mount(renderer, FixedRateScheduler::new(cli.fps));
    let mut clock = FrameClock::start();

    for frame in 0..cli.frames {
        feed(tap, cli, frame);
        let Some(request) = frame_loop.scheduler_mut().wait() else {
            break;
        };
        frame_loop.run_frame(request, clock.tick());
    }

    let stats = frame_loop.stats();
    frame_loop.unmount();
    stats
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        "glaze_field=debug"
    } else {
        "glaze_field=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let palette = load_palette(&cli)?;
    let viewport = Viewport::new(cli.width, cli.height).with_pixel_ratio(cli.pixel_ratio);
    let ctx = GpuContext::headless(wgpu::PowerPreference::LowPower)?;
    let bus = LocalSignalBus::new();
    let tap = ActivityTap::new(bus.clone());

    info!(field = ?cli.field, frames = cli.frames, adapter = %ctx.adapter_name, "preview starting");

    let stats = match cli.field {
        Field::Points => {
            let config = PointFieldConfig::default();
            let surface = WgpuPointSurface::new(ctx.clone(), config.point_count())?;
            let field = PointField::mount(config, &bus, surface, viewport)?;
            drive(field, &tap, &cli)
        }
        Field::Fluid => {
            let surface = WgpuFluidSurface::new(ctx.clone())?;
            let field =
                FluidField::mount(FluidFieldConfig::default(), &palette, &bus, surface, viewport)?;
            drive(field, &tap, &cli)
        }
    };

    info!(
        rendered = stats.rendered,
        skipped = stats.skipped,
        ignored = stats.ignored,
        listeners = bus.listener_count(),
        "preview finished"
    );
    Ok(())
}
