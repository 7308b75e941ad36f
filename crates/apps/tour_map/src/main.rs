use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use markers::{pin_library_loader, HeadlessSurface, MapEvent, SharedSurface};
use parking_lot::Mutex;
use session::{MapSession, SessionConfig, SessionHandle};
use streaming::{HttpPlaceSource, MemoryPlaceSource, Place, PlaceSource};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod script;

use script::{load_script, Step};

type Surface = SharedSurface<HeadlessSurface>;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay map interactions against a place source")]
#[command(group(ArgGroup::new("source").required(true).args(["endpoint", "fixture"])))]
struct Args {
    /// Interaction script (JSON array of steps)
    script: PathBuf,

    /// Base URL of the place API (serves /places/detailed)
    #[arg(long)]
    endpoint: Option<String>,

    /// Serve places from a local JSON fixture instead of HTTP
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Quiet period before a viewport counts as settled (ms)
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Request timeout (ms)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Render places that have no category
    #[arg(long)]
    show_uncategorized: bool,

    /// Extra time to let the session settle after the last step (ms)
    #[arg(long, default_value_t = 800)]
    settle_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = session_config(&args);
    let steps = load_script(&args.script).await?;
    let source = place_source(&args, &config).await?;

    let surface: Surface = Arc::new(Mutex::new(HeadlessSurface::new()));
    let (session, handle, mut events) =
        MapSession::new(config, source, surface.clone(), pin_library_loader());
    let task = session.spawn();

    let printer = {
        let surface = surface.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                print_event(&event, &surface);
            }
        })
    };

    info!(steps = steps.len(), "replaying script");
    for step in &steps {
        run_step(step, &handle, &surface).await;
    }
    tokio::time::sleep(Duration::from_millis(args.settle_ms)).await;

    let stats = handle
        .stats()
        .await
        .context("session stopped before the script finished")?;
    handle.shutdown();
    task.await.context("session task panicked")?;
    printer.await.context("event printer panicked")?;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn session_config(args: &Args) -> SessionConfig {
    let mut config = SessionConfig::from_env();
    if let Some(ms) = args.debounce_ms {
        config.debounce_ms = ms;
    }
    if let Some(ms) = args.timeout_ms {
        config.fetch.request_timeout_ms = ms;
    }
    if args.show_uncategorized {
        config.show_uncategorized = true;
    }
    config
}

async fn place_source(args: &Args, config: &SessionConfig) -> Result<Arc<dyn PlaceSource>> {
    if let Some(endpoint) = &args.endpoint {
        let timeout = Duration::from_millis(config.fetch.request_timeout_ms);
        let source = HttpPlaceSource::new(endpoint.clone(), timeout)?;
        info!(endpoint = %source.endpoint(), "using HTTP place source");
        return Ok(Arc::new(source));
    }
    if let Some(path) = &args.fixture {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading fixture {}", path.display()))?;
        let places: Vec<Place> = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing fixture {}", path.display()))?;
        info!(count = places.len(), "using fixture place source");
        return Ok(Arc::new(MemoryPlaceSource::new(places)));
    }
    bail!("either --endpoint or --fixture is required")
}

async fn run_step(step: &Step, handle: &SessionHandle, surface: &Surface) {
    match step {
        Step::View { viewport, zoom } => {
            handle.viewport_changed(*viewport, *zoom);
        }
        Step::Click { place_id } => {
            if !surface.lock().click(place_id) {
                warn!(%place_id, "no clickable marker for place");
            }
        }
        Step::Select { place_id } => {
            handle.set_active(place_id.clone());
        }
        Step::Categories { ids } => {
            handle.set_categories(ids.clone());
        }
        Step::Refresh => {
            handle.refresh();
        }
        Step::Clear => {
            handle.clear();
        }
        Step::Wait { ms } => {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
    }
}

fn print_event(event: &MapEvent, surface: &Surface) {
    match event {
        MapEvent::MarkersUpdated(places) => {
            let attached = surface.lock().attached();
            let attached: Vec<&str> = attached.iter().map(|id| id.as_str()).collect();
            println!(
                "markers-updated places={} attached=[{}]",
                places.len(),
                attached.join(", ")
            );
        }
        MapEvent::MarkerClick(place_id) => println!("marker-click {place_id}"),
    }
}
