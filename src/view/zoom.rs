//! Zoom limits and wheel stepping
//!
//! Zoom is a multiplier on top of the fit-mode base scale. Limits come from
//! settings; the wheel multiplies or divides by `1 + zoom_step` per tick.

use serde::{Deserialize, Serialize};

/// Bounds and step size for user zoom
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoomLimits {
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min_zoom: Self::MIN_ZOOM,
            max_zoom: Self::MAX_ZOOM,
            zoom_step: Self::ZOOM_STEP,
        }
    }
}

impl ZoomLimits {
    /// Default minimum zoom factor
    pub const MIN_ZOOM: f32 = 0.1;
    /// Default maximum zoom factor
    pub const MAX_ZOOM: f32 = 8.0;
    /// Default wheel step - 10%
    pub const ZOOM_STEP: f32 = 0.1;

    /// Zoom values are rounded to this many steps per unit
    pub const PRECISION: f32 = 1000.0;
    /// Changes smaller than this are ignored
    pub const EPSILON: f32 = 1e-4;

    /// Smallest minimum zoom accepted from settings
    pub const MIN_ZOOM_FLOOR: f32 = 0.01;

    /// Build limits from possibly bogus overrides, falling back per field.
    ///
    /// A minimum so small that one wheel step from it rounds back onto it
    /// is raised until the step lands on a distinct grid value.
    #[must_use]
    pub fn sanitized(min_zoom: f32, max_zoom: f32, zoom_step: f32) -> Self {
        let defaults = Self::default();
        let zoom_step = if zoom_step.is_finite() && zoom_step > 0.0 {
            zoom_step
        } else {
            defaults.zoom_step
        };
        let floor = (1.0 / (Self::PRECISION * zoom_step)).max(Self::MIN_ZOOM_FLOOR);
        let min_zoom = if min_zoom.is_finite() && min_zoom > 0.0 {
            min_zoom.max(floor)
        } else {
            defaults.min_zoom.max(floor)
        };
        let max_zoom = if max_zoom.is_finite() && max_zoom >= min_zoom {
            max_zoom
        } else {
            defaults.max_zoom.max(min_zoom)
        };
        Self {
            min_zoom,
            max_zoom,
            zoom_step,
        }
    }

    /// Multiplier applied per wheel tick
    #[must_use]
    pub fn wheel_factor(&self) -> f32 {
        1.0 + self.zoom_step
    }

    /// Clamp into bounds and round away float jitter.
    ///
    /// Returns `None` for non-finite input.
    #[must_use]
    pub fn clamp(&self, zoom: f32) -> Option<f32> {
        if !zoom.is_finite() {
            return None;
        }
        let clamped = zoom.clamp(self.min_zoom, self.max_zoom);
        let quantized = (clamped * Self::PRECISION).round() / Self::PRECISION;
        // Rounding may step just outside a bound that is not on the grid.
        Some(quantized.clamp(self.min_zoom, self.max_zoom))
    }

    /// Zoom after one wheel tick; negative delta zooms in
    #[must_use]
    pub fn wheel_target(&self, current: f32, delta_y: f32) -> Option<f32> {
        if !delta_y.is_finite() || delta_y == 0.0 {
            return None;
        }
        let factor = self.wheel_factor();
        let target = if delta_y < 0.0 {
            current * factor
        } else {
            current / factor
        };
        self.clamp(target)
    }

    #[must_use]
    pub fn differs(a: f32, b: f32) -> bool {
        (a - b).abs() >= Self::EPSILON
    }
}
