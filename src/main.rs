//! Hullview live camera viewer with optional SDL2 window

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hullview::capture::{FetchWorker, RosterHandle, RosterPoller};
use hullview::display::{self, FrameConsumer, HeadlessPresenter, LoopExit, RenderLoop, Viewer};
use hullview::source::{CameraSource, GrpcSource, SyntheticSource};
use hullview::{pipeline, shutdown, Config, DisplayConfig};

#[derive(Debug, Parser)]
#[command(version, about = "Live viewer for up to six remote camera feeds")]
struct Args {
    /// Settings file (TOML). Missing or unreadable files fall back to defaults.
    #[arg(short, long, default_value = "hullview.toml")]
    config: PathBuf,

    /// Serve N generated feeds instead of connecting to the camera source.
    #[arg(long, value_name = "N")]
    synthetic: Option<usize>,

    /// Do not open a window.
    #[arg(long)]
    headless: bool,
}

fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hullview=info")),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    let args = Args::parse();
    info!("Hullview launching...");

    // Load configuration
    let config = Config::load_or_default(&args.config);
    hullview::CONFIG.store(Arc::new(config.clone()));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("hullview-worker")
        .build()?;

    let source: Arc<dyn CameraSource> = match args.synthetic {
        Some(cameras) => {
            info!("Serving {} synthetic feed(s)", cameras);
            Arc::new(SyntheticSource::new(cameras, 640, 360))
        }
        None => {
            let _guard = runtime.enter();
            Arc::new(GrpcSource::connect_lazy(&config.source)?)
        }
    };

    // Set up the hand-off channels
    let (trigger, shutdown) = shutdown::channel();
    let trigger = Arc::new(trigger);
    let (ui, commands) = display::ui::channel(4);
    let (frames_tx, frames_rx) = pipeline::bounded(config.pipeline.queue_capacity);
    let roster = RosterHandle::new();

    // Spawn background loops
    let poller = RosterPoller::new(
        source.clone(),
        roster.clone(),
        ui.clone(),
        config.pipeline.roster_refresh,
        config.pipeline.roster_interval(),
        shutdown.clone(),
    );
    let worker = FetchWorker::new(
        source,
        roster,
        frames_tx,
        config.pipeline.fetch_interval(),
        shutdown.clone(),
    );
    let consumer = FrameConsumer::new(frames_rx, ui, shutdown);

    let poller_task = runtime.spawn(poller.run());
    let worker_task = runtime.spawn(worker.run());
    let consumer_task = runtime.spawn(consumer.run());

    let ctrl_c_trigger = trigger.clone();
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            ctrl_c_trigger.trigger();
        }
    });

    // The render context lives on the main thread
    let viewer = Viewer::new(config.display.width, config.display.height);
    let exit = run_render_loop(viewer, commands, &config.display, args.headless)?;
    info!("Render context finished: {:?}", exit);
    trigger.trigger();

    runtime.block_on(async {
        let joined = tokio::time::timeout(Duration::from_secs(5), async {
            let _ = poller_task.await;
            (worker_task.await, consumer_task.await)
        })
        .await;
        match joined {
            Ok((Ok(stats), Ok(forwarded))) => {
                info!("Fetch stats: {:?}; {} frame(s) forwarded", stats, forwarded)
            }
            Ok(_) => warn!("A background loop panicked"),
            Err(_) => warn!("Background loops did not stop in time"),
        }
    });
    runtime.shutdown_timeout(Duration::from_secs(1));

    info!("Hullview shutting down");
    Ok(())
}

fn run_render_loop(
    viewer: Viewer,
    commands: display::UiReceiver,
    config: &DisplayConfig,
    headless: bool,
) -> Result<LoopExit> {
    #[cfg(feature = "sdl-display")]
    if !headless {
        let presenter = display::Sdl2Presenter::new(config)?;
        let (_, exit) = RenderLoop::new(viewer, commands, presenter, config.frame_interval()).run();
        return Ok(exit);
    }

    #[cfg(not(feature = "sdl-display"))]
    if !headless {
        warn!("Built without the sdl-display feature, running headless");
    }

    let presenter = HeadlessPresenter::new();
    let (_, exit) = RenderLoop::new(viewer, commands, presenter, config.frame_interval()).run();
    Ok(exit)
}
