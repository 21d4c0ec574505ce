use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "reelstitch", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stitch a project into one movie (requires `ffmpeg` and `ffprobe` on PATH).
    Render(RenderArgs),
    /// Render the composited frame at a timeline time as a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output movie path.
    #[arg(long)]
    out: PathBuf,

    /// Replace an existing output file.
    #[arg(long)]
    overwrite: bool,

    /// Override the project's resolution tier.
    #[arg(long, value_enum)]
    tier: Option<TierChoice>,

    /// Override the project's container preference.
    #[arg(long, value_enum)]
    format: Option<FormatChoice>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Timeline time in seconds.
    #[arg(long)]
    at: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TierChoice {
    Low,
    High,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Mp4,
    Webm,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut project = reelstitch::StitchProject::from_path(&args.in_path)?;
    if let Some(tier) = args.tier {
        project.options.resolution = match tier {
            TierChoice::Low => reelstitch::ResolutionTier::Low,
            TierChoice::High => reelstitch::ResolutionTier::High,
        };
    }
    if let Some(format) = args.format {
        project.options.format = match format {
            FormatChoice::Mp4 => reelstitch::ContainerFormat::Mp4,
            FormatChoice::Webm => reelstitch::ContainerFormat::Webm,
        };
    }

    let provider = reelstitch::FfmpegProvider::new();
    let mut sink = reelstitch::FfmpegSink::new(&args.out, args.overwrite);
    let cancel = reelstitch::CancelToken::new();
    let mut on_progress = |p: &reelstitch::Progress| {
        eprintln!("[{:>3}%] {}", p.percent, p.message);
    };

    let artifact = reelstitch::stitch(
        &project.clips,
        &project.options,
        &provider,
        &mut sink,
        &mut on_progress,
        &cancel,
    )?;

    match &artifact.location {
        reelstitch::ArtifactRef::File(p) => eprintln!(
            "wrote {} ({:.2}s, {} frames, {})",
            p.display(),
            artifact.stats.duration_secs,
            artifact.stats.total_frames,
            artifact.codec
        ),
        reelstitch::ArtifactRef::InMemory => eprintln!("stitch finished in memory"),
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let project = reelstitch::StitchProject::from_path(&args.in_path)?;
    let provider = reelstitch::FfmpegProvider::new();
    let frame = reelstitch::render_still(&project.clips, &project.options, &provider, args.at)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    // The compositor output is opaque, so premultiplied and straight RGBA coincide.
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
