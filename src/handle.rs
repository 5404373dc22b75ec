// Window handle vocabulary shared by every other module.

use std::fmt;

/// Opaque identifier for a top-level OS window.
///
/// Handles are compared by identity only. The window behind a handle is not
/// owned here and may disappear at any time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(isize);

impl WindowHandle {
    pub const fn from_raw(raw: isize) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> isize {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowHandle({:#x})", self.0)
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Screen-space rectangle in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Build a rectangle from two opposite corners given in any order.
    pub fn from_corners(a: (i32, i32), b: (i32, i32)) -> Self {
        let left = a.0.min(b.0);
        let top = a.1.min(b.1);
        Self {
            left,
            top,
            width: (a.0 - b.0).abs(),
            height: (a.1 - b.1).abs(),
        }
    }

    pub const fn right(&self) -> i32 {
        self.left + self.width
    }

    pub const fn bottom(&self) -> i32 {
        self.top + self.height
    }

    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_compare_by_identity() {
        assert_eq!(WindowHandle::from_raw(0x10), WindowHandle::from_raw(0x10));
        assert_ne!(WindowHandle::from_raw(0x10), WindowHandle::from_raw(0x11));
        assert!(WindowHandle::from_raw(0).is_null());
    }

    #[test]
    fn corners_normalize_to_top_left() {
        let r = Rect::from_corners((300, 40), (100, 240));
        assert_eq!(r, Rect::new(100, 40, 200, 200));
        assert_eq!(r.right(), 300);
        assert_eq!(r.bottom(), 240);
    }

    #[test]
    fn zero_area_rect_is_empty() {
        assert!(Rect::from_corners((5, 5), (5, 90)).is_empty());
        assert!(!Rect::new(0, 0, 1, 1).is_empty());
    }
}
