use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use image::{RgbaImage, imageops};
use log::{LevelFilter, debug, info, warn};
use simplelog::{Config, WriteLogger};

use pagestrip::acquire::{FileFetcher, FolderServer};
use pagestrip::page::{FolderPages, PageProvider, Rect, Size, SourceId};
use pagestrip::panic_handler::initialize_panic_handler;
use pagestrip::render::{CanvasId, Capabilities, Presenter, probe_capabilities};
use pagestrip::settings;
use pagestrip::viewport::{Placeholder, SurfaceContext, SurfaceStatus};
use pagestrip::{
    FitMode, LayoutMode, ReadingDirection, ViewAction, ViewState, ViewportComposer, group_pages,
};

const LOAD_TIMEOUT: Duration = Duration::from_secs(30);
const FRAME_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "pagestrip", version, about = "Lay out and render page images from a folder")]
struct Args {
    /// Folder containing page images
    dir: PathBuf,

    /// single, double or vertical
    #[arg(long)]
    layout: Option<LayoutMode>,

    /// fit_width, fit_height, fit_contain, original or fill
    #[arg(long)]
    fit: Option<FitMode>,

    /// Page to open (0-based)
    #[arg(long, default_value_t = 0)]
    page: usize,

    #[arg(long)]
    zoom: Option<f32>,

    /// Rotation in degrees, snapped to quarter turns
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    rotate: f32,

    /// Right-to-left reading order
    #[arg(long)]
    rtl: bool,

    #[arg(long, default_value_t = 1200)]
    width: u32,

    #[arg(long, default_value_t = 900)]
    height: u32,

    /// Device pixel ratio
    #[arg(long, default_value_t = 1.0)]
    dpr: f32,

    /// Never paint on a render thread
    #[arg(long)]
    main_thread: bool,

    #[arg(short, long, default_value = "page.png")]
    out: PathBuf,

    /// Print the page groups as JSON and exit
    #[arg(long)]
    list: bool,

    /// Settings file instead of the one in the config directory
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let args = Args::parse();

    WriteLogger::init(args.log_level, Config::default(), File::create("pagestrip.log")?)?;
    initialize_panic_handler();
    info!("Starting pagestrip on {:?}", args.dir);

    match &args.config {
        Some(path) => settings::load_settings_from_path(path)?,
        None => settings::load_settings(),
    }
    let settings = settings::current();
    let limits = settings.zoom_limits();

    let source_id = SourceId::new(
        args.dir
            .file_name()
            .map_or_else(|| args.dir.to_string_lossy(), |name| name.to_string_lossy()),
    );
    let pages = FolderPages::new(&args.dir)
        .list_pages(&source_id)
        .with_context(|| format!("Failed to list pages in {:?}", args.dir))?;
    if pages.is_empty() {
        bail!("No images found in {:?}", args.dir);
    }

    let layout = args.layout.unwrap_or(settings.layout_mode);
    if args.list {
        let groups = group_pages(&pages, layout);
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    let direction = if args.rtl {
        ReadingDirection::RightToLeft
    } else {
        settings.reading_direction
    };

    let mut view = ViewState::with_fit(args.fit.unwrap_or(settings.fit_mode));
    if let Some(zoom) = args.zoom {
        view = view.reduce(ViewAction::SetZoom(zoom), &limits);
    }
    view = view.reduce(ViewAction::SetRotation(args.rotate), &limits);

    let capabilities = if args.main_thread {
        Capabilities::main_thread_only()
    } else {
        probe_capabilities(settings.prefer_render_thread)
    };

    let (presenter, frames) = Presenter::channel();
    let context = SurfaceContext {
        server: Arc::new(FolderServer::new(&args.dir, &pages)),
        fetcher: Arc::new(FileFetcher),
        capabilities,
        limits,
        presenter,
    };

    let mut composer = ViewportComposer::new(context, pages, layout, direction, view, limits);
    composer.set_active_page(args.page);
    composer.set_viewport(Size::new(args.width as f32, args.height as f32), args.dpr);

    if !composer.settle(LOAD_TIMEOUT) {
        warn!("Some pages did not finish loading within {LOAD_TIMEOUT:?}");
    }

    let mut targets: Vec<(CanvasId, Rect)> = Vec::new();
    for (rect, surface) in composer.surfaces() {
        let index = surface.page().map(|p| p.index());
        match surface.placeholder() {
            Some(Placeholder::Error(text)) => eprintln!("page {index:?}: {text}"),
            Some(Placeholder::Loading) => eprintln!("page {index:?}: still loading"),
            None => {}
        }
        if surface.status() == &SurfaceStatus::Ready {
            targets.push((surface.canvas_id(), rect));
        }
    }

    let latest = collect_frames(&frames, &targets);
    let output = compose(&latest, &targets, &args);
    output
        .save(&args.out)
        .with_context(|| format!("Failed to write {:?}", args.out))?;

    composer.dispose();
    info!("Wrote {:?}", args.out);
    println!("Wrote {}", args.out.display());
    Ok(())
}

/// Wait until every painted canvas has presented a frame, keeping the newest
fn collect_frames(
    frames: &flume::Receiver<pagestrip::render::PresentedFrame>,
    targets: &[(CanvasId, Rect)],
) -> HashMap<CanvasId, RgbaImage> {
    let deadline = Instant::now() + FRAME_TIMEOUT;
    let mut latest = HashMap::new();
    while targets.iter().any(|(id, _)| !latest.contains_key(id)) {
        match frames.recv_deadline(deadline) {
            Ok(frame) => {
                latest.insert(frame.canvas, frame.image);
            }
            Err(_) => {
                warn!("Timed out waiting for frames");
                break;
            }
        }
    }
    for frame in frames.try_iter() {
        latest.insert(frame.canvas, frame.image);
    }
    debug!("Collected {} frames for {} surfaces", latest.len(), targets.len());
    latest
}

fn compose(latest: &HashMap<CanvasId, RgbaImage>, targets: &[(CanvasId, Rect)], args: &Args) -> RgbaImage {
    let scale = |v: f32| (v * args.dpr).floor();
    let mut output = RgbaImage::new(
        scale(args.width as f32) as u32,
        scale(args.height as f32) as u32,
    );
    for (id, rect) in targets {
        if let Some(image) = latest.get(id) {
            imageops::overlay(&mut output, image, scale(rect.x) as i64, scale(rect.y) as i64);
        }
    }
    output
}
