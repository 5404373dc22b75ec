// OS-facing seams. The coordination core only talks to the desktop through
// these traits; `crate::win32` provides the native implementation.

use crate::error::PlatformError;
use crate::handle::{Rect, WindowHandle};

/// Where `set_stack_position` should move a window in the global z-order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackPosition {
    /// Directly below the given window.
    Below(WindowHandle),
    Top,
    Bottom,
    /// Into the always-on-top band.
    Topmost,
    /// Out of the always-on-top band, to the top of the normal band.
    NotTopmost,
}

/// Window class of the system taskbar.
pub const TASKBAR_CLASS: &str = "Shell_TrayWnd";

/// Queries and stacking requests against windows we do not own.
///
/// Implementations must be callable from any thread: delayed stacking
/// requests are issued from the background worker.
pub trait WindowSystem: Send + Sync {
    fn foreground_window(&self) -> Option<WindowHandle>;

    fn set_foreground_window(&self, window: WindowHandle) -> Result<(), PlatformError>;

    /// Reorder `window` without moving, resizing or activating it.
    fn set_stack_position(
        &self,
        window: WindowHandle,
        position: StackPosition,
    ) -> Result<(), PlatformError>;

    /// Top-level window with a caption that is not a tool window.
    fn is_standard_window(&self, window: WindowHandle) -> bool;

    fn has_visible_owner(&self, window: WindowHandle) -> bool;

    fn find_window_by_class(&self, class_name: &str) -> Option<WindowHandle>;

    /// Screen rectangle of the window's caption strip.
    fn title_bar_rect(&self, window: WindowHandle) -> Option<Rect>;

    /// Bounds of every attached display, in enumeration order.
    fn display_surfaces(&self) -> Vec<Rect>;
}

/// Which kind of overlay surface to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Dim,
    Shade { target: WindowHandle },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlaySpec {
    pub kind: OverlayKind,
    pub bounds: Rect,
    pub opacity: f64,
}

/// Native resources behind overlay windows.
///
/// Only the coordination thread calls into this trait; overlay windows are
/// bound to the thread that created them.
pub trait OverlayHost {
    fn create_overlay(&self, spec: &OverlaySpec) -> Result<WindowHandle, PlatformError>;

    fn set_overlay_opacity(&self, overlay: WindowHandle, opacity: f64)
        -> Result<(), PlatformError>;

    fn destroy_overlay(&self, overlay: WindowHandle);

    /// Drain pending native messages for overlays owned by this thread.
    fn pump(&self) {}
}
