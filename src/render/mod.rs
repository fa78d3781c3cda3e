//! Painting a page bitmap onto a surface, on or off the owner thread

pub mod bitmap;
pub mod canvas;
mod paint;
pub mod probe;
pub mod renderer;
pub mod request;
mod worker;

pub use bitmap::{Bitmap, BitmapWatch};
pub use canvas::{Canvas, CanvasId, OffscreenCanvas, PresentedFrame, Presenter, SurfaceError};
pub use paint::paint;
pub use probe::{Capabilities, DISABLE_RENDER_THREAD_ENV, probe_capabilities};
pub use renderer::{MainThreadRenderer, OffThreadRenderer, Renderer, RendererKind, select_renderer};
pub use request::{RenderRequest, WorkerFault, WorkerLog, WorkerMessage, device_pixels};
pub use worker::render_worker;
