//! Drawing surfaces
//!
//! A [`Canvas`] paints on the owning thread until its painting control is
//! transferred into an [`OffscreenCanvas`]. The transfer happens at most
//! once per canvas; afterwards the only way back to local painting is a
//! fresh canvas from [`Canvas::recreate`].

use std::sync::atomic::{AtomicU64, Ordering};

use flume::{Receiver, Sender};
use image::{Rgba, RgbaImage};
use log::debug;

use super::bitmap::Bitmap;
use super::paint::paint;
use super::request::{RenderRequest, device_pixels};
use crate::page::Size;

pub type CanvasId = u64;

static NEXT_CANVAS_ID: AtomicU64 = AtomicU64::new(1);

fn next_canvas_id() -> CanvasId {
    NEXT_CANVAS_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("canvas {0} has already been transferred")]
    AlreadyTransferred(CanvasId),

    #[error("failed to start render thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

/// A finished frame as shown on screen
#[derive(Clone, Debug)]
pub struct PresentedFrame {
    pub canvas: CanvasId,
    pub image: RgbaImage,
}

/// Sink for finished frames (the compositor side of a canvas)
#[derive(Clone, Debug)]
pub struct Presenter {
    tx: Sender<PresentedFrame>,
}

impl Presenter {
    #[must_use]
    pub fn channel() -> (Self, Receiver<PresentedFrame>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }

    fn present(&self, canvas: CanvasId, image: &RgbaImage) {
        // Nobody watching is fine: the host may have gone away first.
        let _ = self.tx.send(PresentedFrame {
            canvas,
            image: image.clone(),
        });
    }
}

/// Device-pixel buffer behind a canvas
#[derive(Debug)]
pub struct BackingStore {
    image: RgbaImage,
}

impl Default for BackingStore {
    fn default() -> Self {
        Self {
            image: RgbaImage::new(0, 0),
        }
    }
}

impl BackingStore {
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Reallocate for `display * dpr`; returns false when the size is unchanged
    pub fn resize(&mut self, display: Size, device_pixel_ratio: f32) -> bool {
        self.reallocate(device_pixels(display, device_pixel_ratio))
    }

    fn reallocate(&mut self, (width, height): (u32, u32)) -> bool {
        if (width, height) == self.size() {
            return false;
        }
        self.image = RgbaImage::new(width, height);
        true
    }

    pub fn clear(&mut self) {
        for px in self.image.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
    }

    fn paint(&mut self, bitmap: Option<&Bitmap>, request: &RenderRequest) {
        self.reallocate(request.device_size());
        paint(&mut self.image, bitmap, request);
    }

    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// The on-screen drawing element
#[derive(Debug)]
pub struct Canvas {
    id: CanvasId,
    store: Option<BackingStore>,
    presenter: Presenter,
}

impl Canvas {
    #[must_use]
    pub fn new(presenter: Presenter) -> Self {
        Self {
            id: next_canvas_id(),
            store: Some(BackingStore::default()),
            presenter,
        }
    }

    #[must_use]
    pub fn id(&self) -> CanvasId {
        self.id
    }

    #[must_use]
    pub fn is_transferred(&self) -> bool {
        self.store.is_none()
    }

    /// Hand painting control to an offscreen canvas. Fails on a second call.
    pub fn transfer_control(&mut self) -> Result<OffscreenCanvas, SurfaceError> {
        let store = self
            .store
            .take()
            .ok_or(SurfaceError::AlreadyTransferred(self.id))?;
        debug!("Canvas {} transferred offscreen", self.id);
        Ok(OffscreenCanvas {
            id: self.id,
            store,
            presenter: self.presenter.clone(),
        })
    }

    /// A fresh, untransferred element that presents to the same place
    #[must_use]
    pub fn recreate(&self) -> Self {
        let fresh = Self::new(self.presenter.clone());
        debug!("Canvas {} replaced by {}", self.id, fresh.id);
        fresh
    }

    /// Resize the backing store; a transferred canvas is resized by its owner
    pub fn resize(&mut self, display: Size, device_pixel_ratio: f32) -> bool {
        match self.store.as_mut() {
            Some(store) => store.resize(display, device_pixel_ratio),
            None => false,
        }
    }

    #[must_use]
    pub fn backing_size(&self) -> Option<(u32, u32)> {
        self.store.as_ref().map(BackingStore::size)
    }

    /// Paint and present. No-op once transferred.
    pub fn draw(&mut self, bitmap: Option<&Bitmap>, request: &RenderRequest) {
        if let Some(store) = self.store.as_mut() {
            store.paint(bitmap, request);
            self.presenter.present(self.id, store.image());
        }
    }

    pub fn blank(&mut self) {
        if let Some(store) = self.store.as_mut() {
            store.clear();
            self.presenter.present(self.id, store.image());
        }
    }
}

/// Painting control that lives on the render thread
#[derive(Debug)]
pub struct OffscreenCanvas {
    id: CanvasId,
    store: BackingStore,
    presenter: Presenter,
}

impl OffscreenCanvas {
    #[must_use]
    pub fn id(&self) -> CanvasId {
        self.id
    }

    pub fn draw(&mut self, bitmap: Option<&Bitmap>, request: &RenderRequest) {
        self.store.paint(bitmap, request);
        self.presenter.present(self.id, self.store.image());
    }

    pub fn blank(&mut self) {
        self.store.clear();
        self.presenter.present(self.id, self.store.image());
    }

    #[must_use]
    pub fn backing_size(&self) -> (u32, u32) {
        self.store.size()
    }
}
