//! The two painting strategies and their selection

use std::thread::JoinHandle;

use flume::{Receiver, Sender};
use log::{debug, trace, warn};

use super::bitmap::Bitmap;
use super::canvas::{Canvas, CanvasId, OffscreenCanvas, SurfaceError};
use super::probe::Capabilities;
use super::request::{RenderRequest, WorkerLog, WorkerMessage};
use super::worker::render_worker;
use crate::page::Size;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendererKind {
    MainThread,
    OffThread,
}

/// Painting strategy for one surface. Callers never care which one they hold.
pub trait Renderer {
    fn kind(&self) -> RendererKind;

    /// Canvas currently showing this renderer's output
    fn canvas_id(&self) -> CanvasId;

    /// Take ownership of a new bitmap, releasing the previous one first
    fn set_bitmap(&mut self, bitmap: Bitmap);

    fn has_bitmap(&self) -> bool;

    /// Request a paint with these parameters
    fn render(&mut self, request: RenderRequest);

    /// Release the bitmap and blank the canvas
    fn clear(&mut self);

    /// Container resized. Returns true if a backing store was reallocated.
    fn resize(&mut self, display: Size, device_pixel_ratio: f32) -> bool;

    /// Display refresh tick. Returns true if a paint happened here.
    fn on_frame(&mut self) -> bool;

    /// Release everything; the renderer is unusable afterwards
    fn dispose(&mut self);
}

/// Paints on the owner thread, at most once per display refresh
#[derive(Debug)]
pub struct MainThreadRenderer {
    canvas: Canvas,
    bitmap: Option<Bitmap>,
    pending: Option<RenderRequest>,
}

impl MainThreadRenderer {
    #[must_use]
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            bitmap: None,
            pending: None,
        }
    }

    #[must_use]
    pub fn has_pending_frame(&self) -> bool {
        self.pending.is_some()
    }

    fn release_bitmap(&mut self) {
        if let Some(previous) = self.bitmap.take() {
            previous.close();
        }
    }
}

impl Renderer for MainThreadRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::MainThread
    }

    fn canvas_id(&self) -> CanvasId {
        self.canvas.id()
    }

    fn set_bitmap(&mut self, bitmap: Bitmap) {
        self.release_bitmap();
        self.bitmap = Some(bitmap);
    }

    fn has_bitmap(&self) -> bool {
        self.bitmap.is_some()
    }

    fn render(&mut self, request: RenderRequest) {
        if self.pending.replace(request).is_some() {
            trace!("Coalesced paint on canvas {}", self.canvas.id());
        }
    }

    fn clear(&mut self) {
        self.pending = None;
        self.release_bitmap();
        self.canvas.blank();
    }

    fn resize(&mut self, display: Size, device_pixel_ratio: f32) -> bool {
        self.canvas.resize(display, device_pixel_ratio)
    }

    fn on_frame(&mut self) -> bool {
        match self.pending.take() {
            Some(request) => {
                self.canvas.draw(self.bitmap.as_ref(), &request);
                true
            }
            None => false,
        }
    }

    fn dispose(&mut self) {
        self.pending = None;
        self.release_bitmap();
    }
}

/// Forwards every operation as a one-way message to a render thread
#[derive(Debug)]
pub struct OffThreadRenderer {
    canvas_id: CanvasId,
    tx: Sender<WorkerMessage>,
    logs: Receiver<WorkerLog>,
    handle: Option<JoinHandle<()>>,
    has_bitmap: bool,
}

impl OffThreadRenderer {
    /// Start a render thread and hand it the canvas
    pub fn spawn(canvas: OffscreenCanvas) -> Result<Self, SurfaceError> {
        let canvas_id = canvas.id();
        let (tx, rx) = flume::unbounded();
        let (log_tx, logs) = flume::unbounded();

        let handle = std::thread::Builder::new()
            .name(format!("render-{canvas_id}"))
            .spawn(move || render_worker(rx, log_tx))?;

        let renderer = Self {
            canvas_id,
            tx,
            logs,
            handle: Some(handle),
            has_bitmap: false,
        };
        renderer.send(WorkerMessage::Init { canvas });
        Ok(renderer)
    }

    fn send(&self, message: WorkerMessage) {
        let kind = message.kind();
        if self.tx.send(message).is_err() {
            warn!("Render thread for canvas {} is gone, dropped {kind}", self.canvas_id);
        }
    }

    /// Re-emit diagnostics from the render thread through `log`
    pub fn drain_logs(&self) {
        for entry in self.logs.try_iter() {
            log::log!(
                target: "pagestrip::render_worker",
                entry.level,
                "[canvas {}] {}",
                self.canvas_id,
                entry.payload
            );
        }
    }
}

impl Renderer for OffThreadRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::OffThread
    }

    fn canvas_id(&self) -> CanvasId {
        self.canvas_id
    }

    fn set_bitmap(&mut self, bitmap: Bitmap) {
        let (width, height) = bitmap.dimensions();
        self.has_bitmap = true;
        self.send(WorkerMessage::SetBitmap {
            bitmap,
            width,
            height,
        });
    }

    fn has_bitmap(&self) -> bool {
        self.has_bitmap
    }

    fn render(&mut self, request: RenderRequest) {
        self.send(WorkerMessage::Render(request));
    }

    fn clear(&mut self) {
        self.has_bitmap = false;
        self.send(WorkerMessage::Clear);
    }

    fn resize(&mut self, _display: Size, _device_pixel_ratio: f32) -> bool {
        // The render thread sizes its backing store from each render request.
        false
    }

    fn on_frame(&mut self) -> bool {
        self.drain_logs();
        false
    }

    fn dispose(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.has_bitmap = false;
        self.send(WorkerMessage::Dispose);
        if handle.join().is_err() {
            warn!("Render thread for canvas {} panicked", self.canvas_id);
        }
        self.drain_logs();
        debug!("Render thread for canvas {} stopped", self.canvas_id);
    }
}

impl Drop for OffThreadRenderer {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Pick the painting strategy for a new surface.
///
/// Off-thread painting needs both capabilities and an untransferred canvas.
/// Any failure on the way (second transfer, thread spawn) falls back to the
/// main thread on a fresh canvas, since a transferred canvas is spent.
pub fn select_renderer(mut canvas: Canvas, caps: Capabilities) -> Box<dyn Renderer> {
    if caps.supports_off_thread() {
        match canvas.transfer_control() {
            Ok(offscreen) => match OffThreadRenderer::spawn(offscreen) {
                Ok(renderer) => {
                    debug!("Canvas {} paints off-thread", renderer.canvas_id());
                    return Box::new(renderer);
                }
                Err(e) => warn!("{e}; painting on the main thread"),
            },
            Err(e) => warn!("{e}; painting on the main thread"),
        }
    }

    if canvas.is_transferred() {
        canvas = canvas.recreate();
    }
    Box::new(MainThreadRenderer::new(canvas))
}

#[cfg(test)]
mod tests {
    use image::RgbaImage;

    use super::*;
    use crate::render::canvas::Presenter;
    use crate::view::{Offset, Rotation};

    fn request(zoom: f32) -> RenderRequest {
        RenderRequest {
            viewport_width: 4.0,
            viewport_height: 4.0,
            base_scale: 1.0,
            scale: zoom,
            offset: Offset::ZERO,
            rotation: Rotation::Deg0,
            device_pixel_ratio: 1.0,
        }
    }

    #[test]
    fn main_thread_coalesces_to_one_paint_per_frame() {
        let (presenter, frames) = Presenter::channel();
        let mut renderer = MainThreadRenderer::new(Canvas::new(presenter));
        renderer.render(request(1.0));
        renderer.render(request(2.0));
        renderer.render(request(3.0));
        assert!(renderer.has_pending_frame());

        assert!(renderer.on_frame());
        assert!(!renderer.on_frame());
        assert_eq!(frames.try_iter().count(), 1);
    }

    #[test]
    fn main_thread_releases_bitmaps() {
        let (presenter, _frames) = Presenter::channel();
        let mut renderer = MainThreadRenderer::new(Canvas::new(presenter));
        let first = Bitmap::new(RgbaImage::new(1, 1));
        let second = Bitmap::new(RgbaImage::new(1, 1));
        let (w1, w2) = (first.watch(), second.watch());

        renderer.set_bitmap(first);
        renderer.set_bitmap(second);
        assert!(w1.is_released());
        assert!(!w2.is_released());

        renderer.dispose();
        assert!(w2.is_released());
    }

    #[test]
    fn clear_drops_pending_paint() {
        let (presenter, _frames) = Presenter::channel();
        let mut renderer = MainThreadRenderer::new(Canvas::new(presenter));
        renderer.render(request(1.0));
        renderer.clear();
        assert!(!renderer.on_frame());
        assert!(!renderer.has_bitmap());
    }

    #[test]
    fn capabilities_pick_strategy() {
        let (presenter, _frames) = Presenter::channel();
        let mut off = select_renderer(Canvas::new(presenter.clone()), Capabilities::full());
        assert_eq!(off.kind(), RendererKind::OffThread);
        off.dispose();

        let main = select_renderer(Canvas::new(presenter), Capabilities::main_thread_only());
        assert_eq!(main.kind(), RendererKind::MainThread);
    }

    #[test]
    fn transferred_canvas_falls_back_on_fresh_element() {
        let (presenter, _frames) = Presenter::channel();
        let mut canvas = Canvas::new(presenter);
        let original_id = canvas.id();
        let _spent = canvas.transfer_control().unwrap();

        let renderer = select_renderer(canvas, Capabilities::full());
        assert_eq!(renderer.kind(), RendererKind::MainThread);
        assert_ne!(renderer.canvas_id(), original_id);
    }
}
