//! Core page types shared by grouping, acquisition and layout

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identifier for an opened source (folder, archive, etc.)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(String);

impl SourceId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Page identifier: parent source plus position within it
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId {
    pub source_id: SourceId,
    pub index: u32,
}

impl PageId {
    #[must_use]
    pub fn new(source_id: SourceId, index: u32) -> Self {
        Self { source_id, index }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.source_id, self.index)
    }
}

/// Metadata about a single page, owned by the metadata provider.
///
/// `width`/`height` are the declared pixel dimensions and are used for
/// layout until the decoded bitmap reports its real size.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub id: PageId,
    pub rel_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub is_double_spread: bool,
}

impl PageMeta {
    /// Position of the page in its source
    #[must_use]
    pub fn index(&self) -> usize {
        self.id.index as usize
    }
}

/// Width/height pair in viewport (CSS-like) units
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// True when either side is zero, negative or not a number
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }

    #[must_use]
    pub fn swapped(self) -> Self {
        Self::new(self.height, self.width)
    }
}

/// Axis-aligned rectangle in viewport units
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[must_use]
    pub fn intersects_rows(&self, top: f32, bottom: f32) -> bool {
        self.y < bottom && self.bottom() > top
    }

    #[must_use]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.bottom()
    }
}
