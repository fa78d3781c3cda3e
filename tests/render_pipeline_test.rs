use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use tempfile::TempDir;

use pagestrip::acquire::{
    AcquireError, CancellationToken, Fetch, FileFetcher, FolderServer, ImageAcquisition, Locator,
};
use pagestrip::page::{FolderPages, PageMeta, PageProvider, Size, SourceId};
use pagestrip::render::{Canvas, Capabilities, PresentedFrame, Presenter, RendererKind};
use pagestrip::viewport::{RenderSurface, SurfaceContext, SurfaceFactory, SurfaceStatus};
use pagestrip::{LayoutMode, ReadingDirection, ViewAction, ViewState, ViewportComposer, ZoomLimits};

const RED: Rgba<u8> = Rgba([220, 20, 20, 255]);

/// Folder with pages of the given sizes, all solid red
fn book(sizes: &[(u32, u32)]) -> (TempDir, Vec<PageMeta>) {
    let dir = tempfile::tempdir().unwrap();
    for (i, &(w, h)) in sizes.iter().enumerate() {
        RgbaImage::from_pixel(w, h, RED)
            .save(dir.path().join(format!("{i:03}.png")))
            .unwrap();
    }
    let pages = FolderPages::new(dir.path())
        .list_pages(&SourceId::new("book"))
        .unwrap();
    (dir, pages)
}

/// Delays locators that mention `slow_name`
struct SlowFetcher {
    slow_name: String,
    delay: Duration,
}

impl Fetch for SlowFetcher {
    fn fetch(&self, locator: &Locator, token: &CancellationToken) -> Result<Vec<u8>, AcquireError> {
        if locator.as_str().contains(&self.slow_name) {
            std::thread::sleep(self.delay);
        }
        FileFetcher.fetch(locator, token)
    }
}

fn context(
    root: &Path,
    pages: &[PageMeta],
    fetcher: Arc<dyn Fetch>,
    caps: Capabilities,
) -> (SurfaceContext, flume::Receiver<PresentedFrame>) {
    let (presenter, frames) = Presenter::channel();
    let context = SurfaceContext {
        server: Arc::new(FolderServer::new(root, pages)),
        fetcher,
        capabilities: caps,
        limits: ZoomLimits::default(),
        presenter,
    };
    (context, frames)
}

#[test]
fn second_canvas_transfer_falls_back_to_main_thread() {
    let (dir, pages) = book(&[(10, 10)]);
    let (ctx, _frames) = context(dir.path(), &pages, Arc::new(FileFetcher), Capabilities::full());

    let mut canvas = Canvas::new(ctx.presenter.clone());
    let original = canvas.id();
    let _elsewhere = canvas.transfer_control().unwrap();

    let surface = RenderSurface::new(
        canvas,
        Capabilities::full(),
        ImageAcquisition::new(ctx.server.clone(), ctx.fetcher.clone()),
        ZoomLimits::default(),
    );
    assert_eq!(surface.renderer_kind(), RendererKind::MainThread);
    assert_ne!(surface.canvas_id(), original);
}

#[test]
fn slow_then_fast_only_applies_fast_result() {
    let (dir, pages) = book(&[(30, 10), (12, 40)]);
    let fetcher = Arc::new(SlowFetcher {
        slow_name: "000.png".into(),
        delay: Duration::from_millis(300),
    });
    let (ctx, _frames) = context(dir.path(), &pages, fetcher, Capabilities::main_thread_only());

    let mut surface = ctx.create_surface();
    surface.resize(Size::new(200.0, 200.0), 1.0);
    surface.set_page(Some(pages[0].clone()));
    surface.set_page(Some(pages[1].clone()));

    assert!(surface.wait(Duration::from_secs(5)));
    assert_eq!(surface.bitmap_size(), Some((12, 40)));

    std::thread::sleep(Duration::from_millis(500));
    assert!(!surface.poll());
    assert_eq!(surface.bitmap_size(), Some((12, 40)));
    assert_eq!(surface.status(), &SurfaceStatus::Ready);
}

#[test]
fn main_thread_paints_once_per_refresh() {
    let (dir, pages) = book(&[(20, 20)]);
    let (ctx, frames) = context(dir.path(), &pages, Arc::new(FileFetcher), Capabilities::main_thread_only());

    let mut surface = ctx.create_surface();
    surface.resize(Size::new(40.0, 40.0), 1.0);
    surface.set_page(Some(pages[0].clone()));
    assert!(surface.wait(Duration::from_secs(5)));

    surface.begin_pan(1, pagestrip::view::Point::new(0.0, 0.0));
    for step in 1..=5 {
        surface.update_pan(1, pagestrip::view::Point::new(step as f32, 0.0));
    }
    surface.end_pan(1);

    assert!(surface.on_frame());
    assert!(!surface.on_frame());
    assert_eq!(frames.try_iter().count(), 1);
}

#[test]
fn off_thread_surface_presents_painted_frames() {
    let (dir, pages) = book(&[(50, 50)]);
    let (ctx, frames) = context(dir.path(), &pages, Arc::new(FileFetcher), Capabilities::full());

    let mut surface = ctx.create_surface();
    assert_eq!(surface.renderer_kind(), RendererKind::OffThread);
    surface.resize(Size::new(100.0, 80.0), 2.0);
    surface.set_page(Some(pages[0].clone()));
    assert!(surface.wait(Duration::from_secs(5)));

    let frame = frames
        .recv_timeout(Duration::from_secs(5))
        .expect("render thread never presented");
    assert_eq!(frame.canvas, surface.canvas_id());
    assert_eq!(frame.image.dimensions(), (200, 160));
    assert_eq!(*frame.image.get_pixel(100, 80), RED);
    assert_eq!(frame.image.get_pixel(2, 80).0[3], 0);

    surface.dispose();
    assert_eq!(surface.status(), &SurfaceStatus::Idle);
}

#[test]
fn composer_loads_both_pages_of_a_spread_pair() {
    let (dir, pages) = book(&[(30, 40), (30, 40), (30, 40)]);
    let (ctx, frames) = context(dir.path(), &pages, Arc::new(FileFetcher), Capabilities::main_thread_only());

    let mut composer = ViewportComposer::new(
        ctx,
        pages,
        LayoutMode::Double,
        ReadingDirection::RightToLeft,
        ViewState::default(),
        ZoomLimits::default(),
    );
    composer.set_viewport(Size::new(300.0, 200.0), 1.0);
    composer.next_group();
    assert!(composer.settle(Duration::from_secs(5)));

    let mounted: Vec<_> = composer
        .surfaces()
        .map(|(rect, s)| (s.page().unwrap().index(), rect.x, s.status().clone()))
        .collect();
    assert_eq!(
        mounted,
        vec![
            (1, 150.0, SurfaceStatus::Ready),
            (2, 0.0, SurfaceStatus::Ready),
        ]
    );
    let canvases: Vec<_> = composer.surfaces().map(|(_, s)| s.canvas_id()).collect();
    let painted = frames
        .try_iter()
        .filter(|f| canvases.contains(&f.canvas))
        .inspect(|f| assert_eq!(f.image.dimensions(), (150, 200)))
        .count();
    assert_eq!(painted, 2);

    assert!(composer.apply(ViewAction::SetZoom(2.0)));
    assert!(composer.surfaces().all(|(_, s)| s.is_loading()));
    assert!(composer.settle(Duration::from_secs(5)));
    assert!(composer.surfaces().all(|(_, s)| s.view().zoom == 2.0));
}
