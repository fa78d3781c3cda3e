//! One displayed page: view transform, acquisition and renderer together

use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::acquire::{AcquisitionEvent, Fetch, ImageAcquisition, ImageServer, RenderParams};
use crate::page::{PageId, PageMeta, Size};
use crate::render::{
    Canvas, CanvasId, Capabilities, Presenter, RenderRequest, Renderer, RendererKind,
    select_renderer,
};
use crate::view::{
    FitMode, Offset, PanSession, Point, PointerId, Rotation, ViewAction, ViewState, ZoomLimits,
    base_scale, focal_zoom_offset, natural_size, rotated_size,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceStatus {
    /// No page, or nothing to show it in
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// What the host shows instead of (or over) the canvas
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Placeholder {
    Loading,
    Error(String),
}

/// Everything a surface needs from its environment
#[derive(Clone)]
pub struct SurfaceContext {
    pub server: Arc<dyn ImageServer>,
    pub fetcher: Arc<dyn Fetch>,
    pub capabilities: Capabilities,
    pub limits: ZoomLimits,
    pub presenter: Presenter,
}

/// Builds surfaces for newly displayed slots
pub trait SurfaceFactory {
    fn create_surface(&self) -> RenderSurface;
}

impl<F: Fn() -> RenderSurface> SurfaceFactory for F {
    fn create_surface(&self) -> RenderSurface {
        self()
    }
}

impl SurfaceFactory for SurfaceContext {
    fn create_surface(&self) -> RenderSurface {
        RenderSurface::new(
            Canvas::new(self.presenter.clone()),
            self.capabilities,
            ImageAcquisition::new(Arc::clone(&self.server), Arc::clone(&self.fetcher)),
            self.limits,
        )
    }
}

/// Inputs of the last acquisition; any change means a new fetch
#[derive(Clone, Debug, PartialEq)]
struct AcquireKey {
    page: PageId,
    fit_mode: FitMode,
    rotation: Rotation,
    zoom: f32,
    viewport: (u32, u32),
}

pub struct RenderSurface {
    renderer: Box<dyn Renderer>,
    acquisition: ImageAcquisition,
    limits: ZoomLimits,
    page: Option<PageMeta>,
    view: ViewState,
    viewport: Size,
    device_pixel_ratio: f32,
    offset: Offset,
    pan: Option<PanSession>,
    bitmap_size: Option<(u32, u32)>,
    status: SurfaceStatus,
    acquired_for: Option<AcquireKey>,
    disposed: bool,
}

impl RenderSurface {
    /// Probes nothing itself: `capabilities` decide the renderer once, here.
    pub fn new(
        canvas: Canvas,
        capabilities: Capabilities,
        acquisition: ImageAcquisition,
        limits: ZoomLimits,
    ) -> Self {
        Self {
            renderer: select_renderer(canvas, capabilities),
            acquisition,
            limits,
            page: None,
            view: ViewState::default(),
            viewport: Size::default(),
            device_pixel_ratio: 1.0,
            offset: Offset::ZERO,
            pan: None,
            bitmap_size: None,
            status: SurfaceStatus::Idle,
            acquired_for: None,
            disposed: false,
        }
    }

    pub fn page(&self) -> Option<&PageMeta> {
        self.page.as_ref()
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn status(&self) -> &SurfaceStatus {
        &self.status
    }

    pub fn bitmap_size(&self) -> Option<(u32, u32)> {
        self.bitmap_size
    }

    pub fn renderer_kind(&self) -> RendererKind {
        self.renderer.kind()
    }

    pub fn canvas_id(&self) -> CanvasId {
        self.renderer.canvas_id()
    }

    pub fn is_loading(&self) -> bool {
        self.acquisition.is_pending()
    }

    /// Neutral placeholder while nothing is painted yet, inline text on failure
    pub fn placeholder(&self) -> Option<Placeholder> {
        match &self.status {
            SurfaceStatus::Failed(text) => Some(Placeholder::Error(text.clone())),
            SurfaceStatus::Loading if !self.renderer.has_bitmap() => Some(Placeholder::Loading),
            _ => None,
        }
    }

    pub fn set_page(&mut self, page: Option<PageMeta>) {
        if self.page.as_ref().map(|p| &p.id) == page.as_ref().map(|p| &p.id) {
            return;
        }
        self.page = page;
        self.bitmap_size = None;
        self.offset = Offset::ZERO;
        self.end_pan_any();
        if self.renderer.has_bitmap() {
            self.renderer.clear();
        }
        self.status = SurfaceStatus::Idle;
        self.refresh();
    }

    pub fn set_view(&mut self, view: ViewState) {
        if view == self.view {
            return;
        }
        if view.fit_mode != self.view.fit_mode || view.rotation != self.view.rotation {
            self.offset = Offset::ZERO;
        }
        self.view = view;
        self.refresh();
    }

    /// Reduce `action` against this surface's own state
    pub fn apply(&mut self, action: ViewAction) -> ViewState {
        let next = self.view.reduce(action, &self.limits);
        self.set_view(next);
        self.view
    }

    pub fn resize(&mut self, viewport: Size, device_pixel_ratio: f32) {
        if viewport == self.viewport && device_pixel_ratio == self.device_pixel_ratio {
            return;
        }
        self.viewport = viewport;
        self.device_pixel_ratio = device_pixel_ratio;
        if self.renderer.resize(viewport, device_pixel_ratio) {
            debug!("Canvas {} backing store resized", self.renderer.canvas_id());
        }
        self.refresh();
    }

    /// One wheel tick at `pointer` (surface-local). Returns the new view,
    /// or `None` when zoom is already at the bound and nothing changed.
    pub fn wheel(&mut self, pointer: Point, delta_y: f32) -> Option<ViewState> {
        let next = self.view.wheel_zoom(delta_y, &self.limits)?;
        self.zoom_to(pointer, next);
        Some(next)
    }

    /// Zoom to `zoom` keeping the content under `pointer` fixed (pinch, double-click)
    pub fn zoom_at(&mut self, pointer: Point, zoom: f32) -> Option<ViewState> {
        let next = self.view.reduce(ViewAction::SetZoom(zoom), &self.limits);
        if next == self.view {
            return None;
        }
        self.zoom_to(pointer, next);
        Some(next)
    }

    fn zoom_to(&mut self, pointer: Point, next: ViewState) {
        let base = self.base_scale();
        self.offset = focal_zoom_offset(
            pointer,
            self.viewport,
            self.offset,
            base * self.view.zoom,
            base * next.zoom,
            self.view.rotation,
        );
        self.view = next;
        self.refresh();
    }

    pub fn begin_pan(&mut self, pointer: PointerId, at: Point) {
        self.pan = Some(PanSession::begin(pointer, at, self.offset));
    }

    /// Returns false if `pointer` does not own the drag
    pub fn update_pan(&mut self, pointer: PointerId, at: Point) -> bool {
        let Some(session) = self.pan.filter(|s| s.pointer() == pointer) else {
            return false;
        };
        self.offset = session.offset_at(at);
        self.schedule_paint();
        true
    }

    /// Pointer up, cancel or leave
    pub fn end_pan(&mut self, pointer: PointerId) {
        if self.pan.is_some_and(|s| s.pointer() == pointer) {
            self.end_pan_any();
        }
    }

    pub fn is_panning(&self) -> bool {
        self.pan.is_some_and(|s| s.has_capture())
    }

    fn end_pan_any(&mut self) {
        if let Some(mut session) = self.pan.take() {
            let released = session.release();
            debug!("Released pointer {released}");
        }
    }

    /// Apply any finished acquisition. Returns true if visible state changed.
    pub fn poll(&mut self) -> bool {
        match self.acquisition.poll() {
            Some(event) => {
                self.apply_event(event);
                true
            }
            None => false,
        }
    }

    /// Like [`poll`](Self::poll) but blocks up to `timeout` for the current acquisition
    pub fn wait(&mut self, timeout: Duration) -> bool {
        match self.acquisition.wait(timeout) {
            Some(event) => {
                self.apply_event(event);
                true
            }
            None => false,
        }
    }

    fn apply_event(&mut self, event: AcquisitionEvent) {
        match event {
            AcquisitionEvent::Loaded(bitmap) => {
                self.bitmap_size = Some(bitmap.dimensions());
                self.renderer.set_bitmap(bitmap);
                self.status = SurfaceStatus::Ready;
                self.schedule_paint();
            }
            AcquisitionEvent::Failed(text) => {
                self.bitmap_size = None;
                self.renderer.clear();
                self.status = SurfaceStatus::Failed(text);
            }
        }
    }

    /// Display refresh tick
    pub fn on_frame(&mut self) -> bool {
        self.renderer.on_frame()
    }

    fn base_scale(&self) -> f32 {
        let Some(page) = self.page.as_ref() else {
            return 1.0;
        };
        let content = rotated_size(natural_size(self.bitmap_size, page), self.view.rotation);
        base_scale(self.view.fit_mode, self.viewport, content)
    }

    /// Paint parameters for the current state; `None` with no page or no area
    pub fn paint_request(&self) -> Option<RenderRequest> {
        if self.page.is_none() || self.viewport.is_empty() {
            return None;
        }
        Some(RenderRequest {
            viewport_width: self.viewport.width,
            viewport_height: self.viewport.height,
            base_scale: self.base_scale(),
            scale: self.view.zoom,
            offset: self.offset,
            rotation: self.view.rotation,
            device_pixel_ratio: self.device_pixel_ratio,
        })
    }

    fn schedule_paint(&mut self) {
        if !self.renderer.has_bitmap() {
            return;
        }
        if let Some(request) = self.paint_request() {
            self.renderer.render(request);
        }
    }

    fn acquire_key(&self) -> Option<AcquireKey> {
        let page = self.page.as_ref()?;
        if self.viewport.is_empty() {
            return None;
        }
        Some(AcquireKey {
            page: page.id.clone(),
            fit_mode: self.view.fit_mode,
            rotation: self.view.rotation,
            zoom: self.view.zoom,
            viewport: (self.viewport.width.round() as u32, self.viewport.height.round() as u32),
        })
    }

    fn refresh(&mut self) {
        if self.disposed {
            return;
        }
        let Some(key) = self.acquire_key() else {
            self.acquisition.cancel();
            if self.acquired_for.take().is_some() || self.renderer.has_bitmap() {
                self.renderer.clear();
            }
            self.bitmap_size = None;
            self.status = SurfaceStatus::Idle;
            return;
        };

        if self.acquired_for.as_ref() != Some(&key) {
            let params = RenderParams {
                fit: key.fit_mode,
                viewport_w: key.viewport.0,
                viewport_h: key.viewport.1,
                scale: key.zoom,
                rotation: key.rotation,
                dpi: self.device_pixel_ratio,
            };
            self.acquisition.start(&key.page, params);
            self.acquired_for = Some(key);
            if self.status != SurfaceStatus::Ready {
                self.status = SurfaceStatus::Loading;
            }
        }
        self.schedule_paint();
    }

    /// Cancel acquisition, clear and tear down the renderer. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.acquisition.cancel();
        self.end_pan_any();
        self.renderer.clear();
        self.renderer.dispose();
        self.status = SurfaceStatus::Idle;
        debug!("Surface on canvas {} disposed", self.renderer.canvas_id());
    }
}

impl Drop for RenderSurface {
    fn drop(&mut self) {
        self.dispose();
    }
}
