// Native Windows backend for the coordination core.

pub mod hooks;
pub mod host;
pub mod hotkeys;
pub mod overlay;
pub mod picker;
pub mod tray;

use crate::error::PlatformError;
use crate::handle::{Rect, WindowHandle};
use crate::platform::{StackPosition, WindowSystem};
use std::ffi::c_void;
use windows::core::{BOOL, PCWSTR};
use windows::Win32::Foundation::{HWND, LPARAM, RECT};
use windows::Win32::Graphics::Gdi::{
    EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFO,
};
use windows::Win32::System::Threading::{
    CreateMutexW, OpenMutexW, SYNCHRONIZATION_ACCESS_RIGHTS,
};
use windows::Win32::UI::WindowsAndMessaging::{
    FindWindowW, GetForegroundWindow, GetSystemMetrics, GetWindow, GetWindowLongW, GetWindowRect,
    IsWindow, IsWindowVisible, SetForegroundWindow, SetWindowPos, GWL_EXSTYLE, GWL_STYLE,
    GW_OWNER, HWND_BOTTOM, HWND_NOTOPMOST, HWND_TOP, HWND_TOPMOST, SM_CXPADDEDBORDER,
    SM_CYCAPTION, SM_CYFRAME, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, WS_CAPTION,
    WS_EX_TOOLWINDOW,
};

const SINGLE_INSTANCE_MUTEX: &str = "FocusDimMutex";

pub(crate) fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

pub(crate) fn to_hwnd(window: WindowHandle) -> HWND {
    HWND(window.raw() as *mut c_void)
}

pub(crate) fn from_hwnd(hwnd: HWND) -> WindowHandle {
    WindowHandle::from_raw(hwnd.0 as isize)
}

/// Check if another instance is already running
pub fn is_already_running() -> bool {
    let name = wide(SINGLE_INSTANCE_MUTEX);

    unsafe {
        let existing = OpenMutexW(
            SYNCHRONIZATION_ACCESS_RIGHTS(0x001F0001), // MUTEX_ALL_ACCESS
            false,
            PCWSTR(name.as_ptr()),
        );
        if existing.is_ok() {
            return true;
        }

        // Owned by this process until it exits
        let _ = CreateMutexW(None, true, PCWSTR(name.as_ptr()));
        false
    }
}

/// The live Windows desktop. Stateless, so it can be shared with the
/// background worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32Desktop;

impl WindowSystem for Win32Desktop {
    fn foreground_window(&self) -> Option<WindowHandle> {
        let hwnd = unsafe { GetForegroundWindow() };
        (!hwnd.is_invalid()).then(|| from_hwnd(hwnd))
    }

    fn set_foreground_window(&self, window: WindowHandle) -> Result<(), PlatformError> {
        if unsafe { SetForegroundWindow(to_hwnd(window)) }.as_bool() {
            Ok(())
        } else {
            Err(PlatformError::os("SetForegroundWindow", format!("refused for {window}")))
        }
    }

    fn set_stack_position(
        &self,
        window: WindowHandle,
        position: StackPosition,
    ) -> Result<(), PlatformError> {
        let hwnd = to_hwnd(window);
        if !unsafe { IsWindow(Some(hwnd)) }.as_bool() {
            return Err(PlatformError::StaleHandle(window));
        }
        let insert_after = match position {
            StackPosition::Below(anchor) => to_hwnd(anchor),
            StackPosition::Top => HWND_TOP,
            StackPosition::Bottom => HWND_BOTTOM,
            StackPosition::Topmost => HWND_TOPMOST,
            StackPosition::NotTopmost => HWND_NOTOPMOST,
        };
        unsafe {
            SetWindowPos(
                hwnd,
                Some(insert_after),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
            )
        }
        .map_err(|e| PlatformError::os("SetWindowPos", e.to_string()))
    }

    fn is_standard_window(&self, window: WindowHandle) -> bool {
        let hwnd = to_hwnd(window);
        let style = unsafe { GetWindowLongW(hwnd, GWL_STYLE) } as u32;
        let ex_style = unsafe { GetWindowLongW(hwnd, GWL_EXSTYLE) } as u32;
        style & WS_CAPTION.0 == WS_CAPTION.0 && ex_style & WS_EX_TOOLWINDOW.0 == 0
    }

    fn has_visible_owner(&self, window: WindowHandle) -> bool {
        match unsafe { GetWindow(to_hwnd(window), GW_OWNER) } {
            Ok(owner) if !owner.is_invalid() => unsafe { IsWindowVisible(owner) }.as_bool(),
            _ => false,
        }
    }

    fn find_window_by_class(&self, class_name: &str) -> Option<WindowHandle> {
        let class = wide(class_name);
        unsafe { FindWindowW(PCWSTR(class.as_ptr()), PCWSTR::null()) }
            .ok()
            .filter(|hwnd| !hwnd.is_invalid())
            .map(from_hwnd)
    }

    fn title_bar_rect(&self, window: WindowHandle) -> Option<Rect> {
        let mut rect = RECT::default();
        unsafe { GetWindowRect(to_hwnd(window), &mut rect) }.ok()?;
        let caption = unsafe {
            GetSystemMetrics(SM_CYCAPTION)
                + GetSystemMetrics(SM_CYFRAME)
                + GetSystemMetrics(SM_CXPADDEDBORDER)
        };
        Some(Rect::new(rect.left, rect.top, rect.right - rect.left, caption))
    }

    fn display_surfaces(&self) -> Vec<Rect> {
        let mut surfaces: Vec<Rect> = Vec::new();
        unsafe {
            let _ = EnumDisplayMonitors(
                None,
                None,
                Some(collect_monitor),
                LPARAM(&mut surfaces as *mut Vec<Rect> as isize),
            );
        }
        surfaces
    }
}

/// EnumDisplayMonitors callback: records each monitor's bounds
unsafe extern "system" fn collect_monitor(
    hmonitor: HMONITOR,
    _hdc: HDC,
    _lprect: *mut RECT,
    lparam: LPARAM,
) -> BOOL {
    let surfaces = &mut *(lparam.0 as *mut Vec<Rect>);
    let mut mi = MONITORINFO {
        cbSize: std::mem::size_of::<MONITORINFO>() as u32,
        ..Default::default()
    };
    if GetMonitorInfoW(hmonitor, &mut mi).as_bool() {
        let r = mi.rcMonitor;
        surfaces.push(Rect::new(r.left, r.top, r.right - r.left, r.bottom - r.top));
    }
    BOOL::from(true)
}
