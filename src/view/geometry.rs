//! Fit/scale math and focal-point-preserving zoom
//!
//! Paint order is translate-then-rotate: the content center sits at
//! `viewport_center + offset`, the bitmap is rotated about that point, then
//! drawn centered at `natural_size * total_scale`. [`focal_zoom_offset`]
//! inverts exactly that transform, so the two must change together.

use serde::{Deserialize, Serialize};

use super::state::{FitMode, Rotation};
use crate::page::{PageMeta, Size};

/// A position in viewport space
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Pan vector: translation of the content center from the viewport center,
/// in unrotated viewport space
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub x: f32,
    pub y: f32,
}

impl Offset {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: f32) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

/// Intrinsic content size: decoded bitmap if present, else the declared page size
#[must_use]
pub fn natural_size(bitmap: Option<(u32, u32)>, page: &PageMeta) -> Size {
    match bitmap {
        Some((w, h)) => Size::new(w as f32, h as f32),
        None => Size::new(page.width as f32, page.height as f32),
    }
}

/// Content size as laid out after rotation
#[must_use]
pub fn rotated_size(natural: Size, rotation: Rotation) -> Size {
    if rotation.is_sideways() {
        natural.swapped()
    } else {
        natural
    }
}

/// Fit-mode scale before user zoom.
///
/// `content` must already be rotated. Degenerate sizes yield 1.
#[must_use]
pub fn base_scale(fit_mode: FitMode, viewport: Size, content: Size) -> f32 {
    if viewport.is_empty() || content.is_empty() {
        return 1.0;
    }

    let width_ratio = viewport.width / content.width;
    let height_ratio = viewport.height / content.height;

    match fit_mode {
        FitMode::FitWidth => width_ratio,
        FitMode::FitHeight => height_ratio,
        FitMode::Fill => width_ratio.max(height_ratio),
        FitMode::Original => 1.0,
        FitMode::FitContain => width_ratio.min(height_ratio),
    }
}

#[must_use]
pub fn viewport_center(viewport: Size) -> Point {
    Point::new(viewport.width / 2.0, viewport.height / 2.0)
}

/// Rotate a vector by `angle` radians (clockwise on screen, y pointing down)
#[must_use]
pub fn rotate_vec(x: f32, y: f32, angle: f32) -> (f32, f32) {
    let (sin, cos) = angle.sin_cos();
    (x * cos - y * sin, x * sin + y * cos)
}

/// New pan offset that keeps the content pixel under `pointer` fixed
/// while the total scale changes from `old_scale` to `new_scale`.
#[must_use]
pub fn focal_zoom_offset(
    pointer: Point,
    viewport: Size,
    offset: Offset,
    old_scale: f32,
    new_scale: f32,
    rotation: Rotation,
) -> Offset {
    if !(old_scale.is_finite() && new_scale.is_finite()) || old_scale <= 0.0 {
        return offset;
    }

    let center = viewport_center(viewport);
    let current_x = center.x + offset.x;
    let current_y = center.y + offset.y;

    let d_x = pointer.x - current_x;
    let d_y = pointer.y - current_y;

    let theta = rotation.radians();
    let (local_x, local_y) = rotate_vec(d_x, d_y, -theta);

    let ratio = new_scale / old_scale;
    let (scaled_x, scaled_y) = (local_x * ratio, local_y * ratio);

    let (new_d_x, new_d_y) = rotate_vec(scaled_x, scaled_y, theta);

    let new_center_x = pointer.x - new_d_x;
    let new_center_y = pointer.y - new_d_y;

    Offset::new(new_center_x - center.x, new_center_y - center.y)
}
