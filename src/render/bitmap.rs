//! Decoded page bitmaps with single ownership
//!
//! A `Bitmap` is never cloned: handing it to a renderer (or into a worker
//! message) moves it. Dropping or closing it releases the pixels.

use std::sync::{Arc, Weak};

use image::RgbaImage;
use log::debug;

/// Exclusively owned RGBA pixels
#[derive(Debug)]
pub struct Bitmap {
    image: RgbaImage,
    alive: Arc<()>,
}

impl Bitmap {
    #[must_use]
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image,
            alive: Arc::new(()),
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Handle that reports whether this bitmap has been released
    #[must_use]
    pub fn watch(&self) -> BitmapWatch {
        BitmapWatch {
            alive: Arc::downgrade(&self.alive),
        }
    }

    /// Release the pixel memory now
    pub fn close(self) {
        let (w, h) = self.dimensions();
        debug!("Releasing bitmap {w}x{h}");
    }
}

/// Observes a bitmap without owning it
#[derive(Clone, Debug)]
pub struct BitmapWatch {
    alive: Weak<()>,
}

impl BitmapWatch {
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.alive.strong_count() == 0
    }
}
