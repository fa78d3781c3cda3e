//! View transform: fit mode, zoom, rotation, pan

pub mod geometry;
pub mod pan;
mod state;
mod zoom;

pub use geometry::{Offset, Point, base_scale, focal_zoom_offset, natural_size, rotated_size};
pub use pan::{PanSession, PointerId};
pub use state::{FitMode, RotateDirection, Rotation, ViewAction, ViewState};
pub use zoom::ZoomLimits;
