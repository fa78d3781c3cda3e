//! View transform state
//!
//! `ViewState` is an immutable value; every user action goes through
//! [`ViewState::reduce`], which returns the next state (equal to the input
//! when the action is a no-op or carries invalid numbers).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::zoom::ZoomLimits;

/// Strategy for deriving the base (pre-zoom) scale
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    FitWidth,
    FitHeight,
    #[default]
    FitContain,
    Original,
    Fill,
}

impl FitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitMode::FitWidth => "fit_width",
            FitMode::FitHeight => "fit_height",
            FitMode::FitContain => "fit_contain",
            FitMode::Original => "original",
            FitMode::Fill => "fill",
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "fit_width" | "width" => Ok(Self::FitWidth),
            "fit_height" | "height" => Ok(Self::FitHeight),
            "fit_contain" | "contain" => Ok(Self::FitContain),
            "original" => Ok(Self::Original),
            "fill" => Ok(Self::Fill),
            other => Err(format!("unknown fit mode: {other}")),
        }
    }
}

/// Quarter-turn rotation, clockwise
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Snap any angle to the nearest quarter turn.
    ///
    /// Returns `None` for non-finite input.
    #[must_use]
    pub fn from_degrees(degrees: f32) -> Option<Self> {
        if !degrees.is_finite() {
            return None;
        }
        let quarters = (degrees / 90.0).round() as i64;
        Some(match quarters.rem_euclid(4) {
            0 => Self::Deg0,
            1 => Self::Deg90,
            2 => Self::Deg180,
            _ => Self::Deg270,
        })
    }

    #[must_use]
    pub fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    #[must_use]
    pub fn radians(self) -> f32 {
        f32::from(self.degrees()).to_radians()
    }

    /// True when width and height trade places
    #[must_use]
    pub fn is_sideways(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }

    #[must_use]
    pub fn step(self, direction: RotateDirection) -> Self {
        let delta = match direction {
            RotateDirection::Clockwise => 90.0,
            RotateDirection::CounterClockwise => -90.0,
        };
        Self::from_degrees(f32::from(self.degrees()) + delta).unwrap_or(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotateDirection {
    Clockwise,
    CounterClockwise,
}

/// Fit mode, zoom and rotation for the viewing session
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub fit_mode: FitMode,
    pub zoom: f32,
    pub rotation: Rotation,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            fit_mode: FitMode::default(),
            zoom: 1.0,
            rotation: Rotation::Deg0,
        }
    }
}

/// Transitions accepted by [`ViewState::reduce`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewAction {
    SetFitMode(FitMode),
    SetZoom(f32),
    ZoomBy(f32),
    SetRotation(f32),
    Rotate(RotateDirection),
    ResetView,
}

impl ViewState {
    #[must_use]
    pub fn with_fit(fit_mode: FitMode) -> Self {
        Self {
            fit_mode,
            ..Self::default()
        }
    }

    /// Apply an action and return the resulting state
    #[must_use]
    pub fn reduce(self, action: ViewAction, limits: &ZoomLimits) -> Self {
        match action {
            ViewAction::SetFitMode(fit_mode) => {
                if fit_mode == self.fit_mode {
                    self
                } else {
                    Self {
                        fit_mode,
                        zoom: 1.0,
                        ..self
                    }
                }
            }

            ViewAction::SetZoom(value) => self.with_zoom(value, limits),

            ViewAction::ZoomBy(delta) => self.with_zoom(self.zoom + delta, limits),

            ViewAction::SetRotation(degrees) => match Rotation::from_degrees(degrees) {
                Some(rotation) => Self { rotation, ..self },
                None => self,
            },

            ViewAction::Rotate(direction) => Self {
                rotation: self.rotation.step(direction),
                ..self
            },

            ViewAction::ResetView => Self {
                zoom: limits.clamp(1.0).unwrap_or(1.0),
                rotation: Rotation::Deg0,
                ..self
            },
        }
    }

    fn with_zoom(self, value: f32, limits: &ZoomLimits) -> Self {
        match limits.clamp(value) {
            Some(zoom) if ZoomLimits::differs(zoom, self.zoom) => Self { zoom, ..self },
            _ => self,
        }
    }

    /// One wheel tick. `None` when the clamped zoom would not change,
    /// in which case the caller must not touch the offset or repaint.
    #[must_use]
    pub fn wheel_zoom(self, delta_y: f32, limits: &ZoomLimits) -> Option<Self> {
        let zoom = limits.wheel_target(self.zoom, delta_y)?;
        ZoomLimits::differs(zoom, self.zoom).then_some(Self { zoom, ..self })
    }

    /// True when a change from `other` requires fetching a new image
    #[must_use]
    pub fn needs_reacquire(&self, other: &Self) -> bool {
        self.fit_mode != other.fit_mode
            || self.rotation != other.rotation
            || ZoomLimits::differs(self.zoom, other.zoom)
    }
}
