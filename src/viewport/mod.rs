//! Surfaces for displayed pages and their arrangement per layout mode

pub mod composer;
pub mod surface;

pub use composer::{ReadingDirection, Slot, ViewportComposer};
pub use surface::{Placeholder, RenderSurface, SurfaceContext, SurfaceFactory, SurfaceStatus};
