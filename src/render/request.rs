//! Render request and render-thread message types

use super::bitmap::Bitmap;
use super::canvas::OffscreenCanvas;
use crate::page::Size;
use crate::view::{Offset, Rotation};

/// Everything needed for one paint. Built per paint and discarded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderRequest {
    /// Viewport size in display units
    pub viewport_width: f32,
    pub viewport_height: f32,
    /// Fit-mode derived scale
    pub base_scale: f32,
    /// User zoom on top of the base scale
    pub scale: f32,
    pub offset: Offset,
    pub rotation: Rotation,
    pub device_pixel_ratio: f32,
}

impl RenderRequest {
    #[must_use]
    pub fn viewport(&self) -> Size {
        Size::new(self.viewport_width, self.viewport_height)
    }

    #[must_use]
    pub fn total_scale(&self) -> f32 {
        self.base_scale * self.scale
    }

    /// Backing store size in device pixels
    #[must_use]
    pub fn device_size(&self) -> (u32, u32) {
        device_pixels(self.viewport(), self.device_pixel_ratio)
    }
}

/// `floor(display size * dpr)`, zero for degenerate input
#[must_use]
pub fn device_pixels(display: Size, device_pixel_ratio: f32) -> (u32, u32) {
    let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio
    } else {
        1.0
    };
    let to_px = |v: f32| {
        if v.is_finite() && v > 0.0 {
            (v * dpr).floor() as u32
        } else {
            0
        }
    };
    (to_px(display.width), to_px(display.height))
}

/// One-way messages to the render thread, processed in send order
#[derive(Debug)]
pub enum WorkerMessage {
    /// Hand over the transferred canvas
    Init { canvas: OffscreenCanvas },
    /// Transfer bitmap ownership; the previous bitmap is released first
    SetBitmap {
        bitmap: Bitmap,
        width: u32,
        height: u32,
    },
    Render(RenderRequest),
    /// Release the bitmap and blank the canvas
    Clear,
    /// Release everything and stop
    Dispose,
}

impl WorkerMessage {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerMessage::Init { .. } => "init",
            WorkerMessage::SetBitmap { .. } => "set-bitmap",
            WorkerMessage::Render(_) => "render",
            WorkerMessage::Clear => "clear",
            WorkerMessage::Dispose => "dispose",
        }
    }
}

/// Diagnostic message sent back from the render thread.
///
/// The only reply the render thread ever produces; paint completion is not
/// reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerLog {
    pub level: log::Level,
    pub payload: String,
}

impl WorkerLog {
    pub fn new(level: log::Level, payload: impl Into<String>) -> Self {
        Self {
            level,
            payload: payload.into(),
        }
    }
}

/// Errors raised inside the render thread
#[derive(Debug, thiserror::Error)]
pub enum WorkerFault {
    #[error("received {0} before init")]
    NotInitialized(&'static str),
}
