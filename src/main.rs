//! vidmark: burn annotation boxes into a video

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, eyre::WrapErr, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vidmark::annotations::{load_labels, AnnotationIndex};
use vidmark::capture::open_source;
use vidmark::output::{open_sink, save_png};
use vidmark::pipeline::{render_snapshot, CancellationToken, PrefetchSource, SyncPipeline};
use vidmark::{Config, FrameRenderer, FrameSource};

#[derive(Parser, Debug)]
#[command(name = "vidmark", version, about = "Overlay time-coded detection boxes onto a video")]
struct Cli {
    /// TOML configuration file (defaults to ./vidmark.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Re-encode a video with every annotation box burned in
    Run {
        #[arg(long)]
        video: PathBuf,
        #[arg(long)]
        labels: PathBuf,
        /// Video file, or a directory for a PNG sequence
        #[arg(long)]
        output: PathBuf,
        /// Overrides `annotations.video_name`
        #[arg(long)]
        video_name: Option<String>,
    },
    /// Print frame count, resolution and frame rate
    Probe {
        #[arg(long)]
        video: PathBuf,
    },
    /// Render a single playback frame to a PNG
    Snapshot {
        #[arg(long)]
        video: PathBuf,
        #[arg(long)]
        labels: PathBuf,
        #[arg(long)]
        frame: u64,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        video_name: Option<String>,
        /// Draw only records placed on this exact frame, without hold
        #[arg(long)]
        exact: bool,
    },
    /// Count annotation records per category
    Labels {
        #[arg(long)]
        labels: PathBuf,
        #[arg(long)]
        video_name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vidmark=info")),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).wrap_err("Failed to load configuration")?;

    match cli.command {
        Command::Run {
            video,
            labels,
            output,
            video_name,
        } => {
            if let Some(name) = video_name {
                config.annotations.video_name = name;
            }
            run(config, video, labels, output).await
        }
        Command::Probe { video } => probe(&config, &video),
        Command::Snapshot {
            video,
            labels,
            frame,
            output,
            video_name,
            exact,
        } => {
            if let Some(name) = video_name {
                config.annotations.video_name = name;
            }
            snapshot(&config, &video, &labels, frame, &output, exact)
        }
        Command::Labels { labels, video_name } => {
            if let Some(name) = video_name {
                config.annotations.video_name = name;
            }
            count_labels(&config, &labels)
        }
    }
}

fn build_index(config: &Config, labels: &Path) -> Result<AnnotationIndex> {
    let loaded = load_labels(labels, &config.annotations.video_name)?;
    let conversion = config.annotations.rate_conversion()?;
    info!("Label rate ratio: {}", conversion.ratio());
    Ok(AnnotationIndex::build_with(loaded.records, conversion))
}

fn scale_to(config: &Config) -> Option<(u32, u32)> {
    config
        .input
        .scale_to_output
        .then_some((config.output.width, config.output.height))
}

async fn run(config: Config, video: PathBuf, labels: PathBuf, output: PathBuf) -> Result<()> {
    info!("vidmark launching...");

    let cancel = CancellationToken::new();
    let worker_cancel = cancel.clone();

    // Decode, draw and encode are blocking; keep them off the async workers
    let mut job = tokio::task::spawn_blocking(move || -> Result<_> {
        let index = build_index(&config, &labels)?;
        for (category, count) in index.category_counts() {
            info!("{:>16}: {}", category, count);
        }

        let source = open_source(&video, config.input.sequence_fps, scale_to(&config))?;
        let sink = open_sink(&output, &config.output)?;
        let renderer = FrameRenderer::from_config(&config.render);
        let mut pipeline = SyncPipeline::new(&index, renderer).with_cancellation(worker_cancel);

        let report = if config.pipeline.prefetch_depth > 0 {
            let source = PrefetchSource::spawn(source, config.pipeline.prefetch_depth)?;
            pipeline.run(source, sink)?
        } else {
            pipeline.run(source, sink)?
        };
        Ok(report)
    });

    let finished = tokio::select! {
        joined = &mut job => Some(joined),
        _ = tokio::signal::ctrl_c() => None,
    };
    let report = match finished {
        Some(joined) => joined??,
        None => {
            warn!("Interrupt received, stopping after the current frame");
            cancel.cancel();
            job.await??
        }
    };

    info!(
        "Done: {} frames, {} boxes drawn, {} skipped, {:.2?}",
        report.frames_written,
        report.boxes.drawn,
        report.boxes.skipped_unknown + report.boxes.skipped_malformed,
        report.elapsed
    );
    Ok(())
}

fn probe(config: &Config, video: &Path) -> Result<()> {
    let source = open_source(video, config.input.sequence_fps, None)?;
    let info = source.info();
    match info.frame_count {
        Some(n) => println!("Number of Frames: {n}"),
        None => println!("Number of Frames: unknown"),
    }
    println!("Height {}, Width {}", info.height, info.width);
    println!("FPS: {:.2}", info.frame_rate);
    Ok(())
}

fn snapshot(
    config: &Config,
    video: &Path,
    labels: &Path,
    frame: u64,
    output: &Path,
    exact: bool,
) -> Result<()> {
    let index = build_index(config, labels)?;
    let source = open_source(video, config.input.sequence_fps, scale_to(config))?;
    let mut renderer = FrameRenderer::from_config(&config.render);

    let rendered = render_snapshot(source, &index, &mut renderer, frame, exact)?
        .ok_or_else(|| eyre!("{} has fewer than {} frames", video.display(), frame + 1))?;
    save_png(&rendered, output)?;
    info!("Saved frame {} to {}", frame, output.display());
    Ok(())
}

fn count_labels(config: &Config, labels: &Path) -> Result<()> {
    let index = build_index(config, labels)?;
    let mut counts: Vec<_> = index.category_counts().into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (category, count) in counts {
        println!("{category:<16} {count}");
    }
    println!("{} records in {} playback groups", index.record_count(), index.group_count());
    Ok(())
}
