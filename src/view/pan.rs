//! Drag-to-pan sessions

use super::geometry::{Offset, Point};

/// Identifier of the pointer that owns a drag
pub type PointerId = u32;

/// An active drag: offset follows the pointer relative to where it started
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanSession {
    pointer: PointerId,
    start_pointer: Point,
    start_offset: Offset,
    captured: bool,
}

impl PanSession {
    /// Start a drag and capture `pointer`
    #[must_use]
    pub fn begin(pointer: PointerId, at: Point, offset: Offset) -> Self {
        Self {
            pointer,
            start_pointer: at,
            start_offset: offset,
            captured: true,
        }
    }

    #[must_use]
    pub fn pointer(&self) -> PointerId {
        self.pointer
    }

    #[must_use]
    pub fn has_capture(&self) -> bool {
        self.captured
    }

    /// Offset for the current pointer position
    #[must_use]
    pub fn offset_at(&self, at: Point) -> Offset {
        Offset::new(
            self.start_offset.x + (at.x - self.start_pointer.x),
            self.start_offset.y + (at.y - self.start_pointer.y),
        )
    }

    /// End the drag (pointer up, cancel or leave), releasing capture
    pub fn release(&mut self) -> PointerId {
        self.captured = false;
        self.pointer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_tracks_pointer_delta() {
        let session = PanSession::begin(1, Point::new(100.0, 100.0), Offset::new(10.0, -5.0));
        assert_eq!(session.offset_at(Point::new(130.0, 90.0)), Offset::new(40.0, -15.0));
    }

    #[test]
    fn release_drops_capture() {
        let mut session = PanSession::begin(7, Point::default(), Offset::ZERO);
        assert!(session.has_capture());
        assert_eq!(session.release(), 7);
        assert!(!session.has_capture());
    }
}
