use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use apng_player::{
    EndBehavior, ImageDecoder as _, PlaybackEvent, Player, PlayerOpts, PngDecoder, Resource,
    SpeedRatio,
};
use clap::{ArgAction, Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;

#[derive(Parser, Debug)]
#[command(name = "apng-player", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print canvas geometry and the frame table.
    Info(InfoArgs),
    /// Composite every frame and write them as PNG files.
    Extract(ExtractArgs),
    /// Play an animation in real time, logging each event.
    Play(PlayArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input PNG/APNG.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Speed multiplier applied to the printed delays.
    #[arg(long, default_value_t = 1.0)]
    speed: f64,
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Input PNG/APNG.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory.
    #[arg(long)]
    out: PathBuf,

    /// Speed multiplier applied to the reported delays.
    #[arg(long, default_value_t = 1.0)]
    speed: f64,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    /// Input PNG/APNG.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Player options JSON. Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Loop until cancelled.
    #[arg(long, default_value_t = false)]
    repeat: bool,

    /// Speed multiplier.
    #[arg(long)]
    speed: Option<f64>,

    /// Drop the image when playback ends.
    #[arg(long, default_value_t = false)]
    unload_on_end: bool,

    /// Stop playback after this many seconds.
    #[arg(long)]
    max_secs: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();

    match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Extract(args) => cmd_extract(args),
        Command::Play(args) => cmd_play(args),
    }
}

fn decode(path: &std::path::Path) -> anyhow::Result<apng_player::DecodedImage> {
    PngDecoder::new()
        .decode(&Resource::path(path))
        .with_context(|| format!("decode '{}'", path.display()))
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let image = decode(&args.in_path)?;
    let speed = SpeedRatio::new(args.speed);
    let canvas = image.canvas();

    println!("canvas: {}x{}", canvas.width, canvas.height);
    if image.is_single_frame() {
        println!("still image");
        return Ok(());
    }
    let plays = match image.num_plays() {
        0 => "infinite".to_string(),
        n => n.to_string(),
    };
    println!("frames: {} (plays: {plays})", image.frame_count());
    for f in image.frames() {
        let r = f.region();
        let d = f.delay();
        println!(
            "  #{:<4} {}x{}+{}+{} blend={:?} dispose={:?} delay={}/{} ({} ms)",
            f.sequence_index(),
            r.width,
            r.height,
            r.x,
            r.y,
            f.blend_op(),
            f.dispose_op(),
            d.num,
            d.den,
            d.to_duration(speed).as_millis()
        );
    }
    println!("total: {} ms", image.total_duration(speed).as_millis());
    Ok(())
}

fn cmd_extract(args: ExtractArgs) -> anyhow::Result<()> {
    let image = Arc::new(decode(&args.in_path)?);
    let speed = SpeedRatio::new(args.speed);
    let frames = apng_player::composite_all(image.clone())?;

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create output dir '{}'", args.out.display()))?;

    for (frame, desc) in frames.iter().zip(image.frames()) {
        let path = args.out.join(format!("frame_{:04}.png", frame.index()));
        image::save_buffer_with_format(
            &path,
            frame.data(),
            frame.width(),
            frame.height(),
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        eprintln!(
            "wrote {} ({} ms)",
            path.display(),
            desc.delay().to_duration(speed).as_millis()
        );
    }
    Ok(())
}

fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    let mut opts = match &args.config {
        Some(path) => PlayerOpts::from_path(path)?,
        None => PlayerOpts::default(),
    };
    if args.repeat {
        opts.repeat = true;
    }
    if let Some(speed) = args.speed {
        opts = opts.with_speed_ratio(speed);
    }
    if args.unload_on_end {
        opts.end_behavior = EndBehavior::UnloadOnEnd;
    }

    let (tx, rx) = crossbeam_channel::unbounded::<PlaybackEvent>();
    let player = Player::with_png(tx, opts);
    player
        .load(Resource::path(&args.in_path))
        .with_context(|| format!("load '{}'", args.in_path.display()))?;

    if player.is_still_image()? {
        let frame = player.default_frame()?;
        tracing::info!(width = frame.width(), height = frame.height(), "still image");
        return Ok(());
    }

    let deadline = args
        .max_secs
        .filter(|s| s.is_finite() && *s > 0.0)
        .map(|s| Instant::now() + Duration::from_secs_f64(s));
    loop {
        let timeout = deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::from_secs(3600));
        match rx.recv_timeout(timeout) {
            Ok(PlaybackEvent::Frame(frame)) => tracing::info!(frame = frame.index(), "frame"),
            Ok(PlaybackEvent::Failed(msg)) => anyhow::bail!("playback failed: {msg}"),
            Ok(PlaybackEvent::Ended) => {
                tracing::info!("ended");
                break;
            }
            Ok(event) => tracing::info!(event = event.kind()),
            Err(RecvTimeoutError::Timeout) => {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    tracing::info!("time limit reached");
                    player.unload();
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}
