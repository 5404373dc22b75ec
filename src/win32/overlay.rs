// Layered overlay windows.
//
// Dim overlays cover a whole display, are click-through and never take
// focus. Their z-order is driven by the coordinator, so unlike a plain
// screen dimmer they are NOT created in the topmost band.
//
// Shade overlays cover a target's title bar (or a picked rectangle). They
// swallow clicks but still never activate.

use super::{from_hwnd, to_hwnd, wide, Win32Desktop};
use crate::error::PlatformError;
use crate::handle::WindowHandle;
use crate::platform::{OverlayHost, OverlayKind, OverlaySpec};
use log::warn;
use std::sync::OnceLock;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::Graphics::Gdi::CreateSolidBrush;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, PeekMessageW,
    RegisterClassW, SetLayeredWindowAttributes, ShowWindow, TranslateMessage, CS_HREDRAW,
    CS_VREDRAW, LWA_ALPHA, MSG, PM_REMOVE, SW_HIDE, WINDOW_EX_STYLE, WINDOW_STYLE, WM_MOUSEACTIVATE,
    WNDCLASSW, WS_DISABLED, WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TRANSPARENT,
    WS_POPUP, WS_VISIBLE,
};

const DIM_CLASS: &str = "FocusDimOverlay";
const SHADE_CLASS: &str = "FocusDimShade";

const DIM_COLOR: COLORREF = COLORREF(0x0000_0000);
const SHADE_COLOR: COLORREF = COLORREF(0x0020_2020);

const MA_NOACTIVATE: isize = 3;

static CLASSES_REGISTERED: OnceLock<bool> = OnceLock::new();

unsafe extern "system" fn overlay_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_MOUSEACTIVATE => LRESULT(MA_NOACTIVATE),
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

fn register_class(name: &str, color: COLORREF) -> bool {
    unsafe {
        let hinstance = GetModuleHandleW(PCWSTR::null()).unwrap_or_default();
        let class_name = wide(name);

        let wc = WNDCLASSW {
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(overlay_proc),
            hInstance: hinstance.into(),
            lpszClassName: PCWSTR(class_name.as_ptr()),
            hbrBackground: CreateSolidBrush(color),
            ..Default::default()
        };

        RegisterClassW(&wc) != 0
    }
}

fn ensure_classes() -> bool {
    *CLASSES_REGISTERED.get_or_init(|| {
        let ok = register_class(DIM_CLASS, DIM_COLOR) && register_class(SHADE_CLASS, SHADE_COLOR);
        if !ok {
            warn!("overlay window classes could not be registered");
        }
        ok
    })
}

fn alpha(opacity: f64) -> u8 {
    (opacity.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn set_alpha(hwnd: HWND, opacity: f64) -> Result<(), PlatformError> {
    unsafe { SetLayeredWindowAttributes(hwnd, COLORREF(0), alpha(opacity), LWA_ALPHA) }
        .map_err(|e| PlatformError::os("SetLayeredWindowAttributes", e.to_string()))
}

fn styles(kind: OverlayKind) -> (&'static str, WINDOW_EX_STYLE, WINDOW_STYLE) {
    match kind {
        OverlayKind::Dim => (
            DIM_CLASS,
            WS_EX_LAYERED | WS_EX_TRANSPARENT | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE,
            WS_POPUP | WS_VISIBLE | WS_DISABLED,
        ),
        OverlayKind::Shade { .. } => (
            SHADE_CLASS,
            WS_EX_LAYERED | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE,
            WS_POPUP | WS_VISIBLE,
        ),
    }
}

impl OverlayHost for Win32Desktop {
    fn create_overlay(&self, spec: &OverlaySpec) -> Result<WindowHandle, PlatformError> {
        if !ensure_classes() {
            return Err(PlatformError::os("RegisterClassW", "overlay classes unavailable"));
        }

        let (class, ex_style, style) = styles(spec.kind);
        let class_name = wide(class);
        let b = spec.bounds;

        let hwnd = unsafe {
            let hinstance = GetModuleHandleW(PCWSTR::null()).unwrap_or_default();
            CreateWindowExW(
                ex_style,
                PCWSTR(class_name.as_ptr()),
                PCWSTR::null(),
                style,
                b.left,
                b.top,
                b.width,
                b.height,
                None,
                None,
                Some(hinstance.into()),
                None,
            )
        }
        .map_err(|e| PlatformError::os("CreateWindowExW", e.to_string()))?;

        if let Err(e) = set_alpha(hwnd, spec.opacity) {
            unsafe {
                let _ = DestroyWindow(hwnd);
            }
            return Err(e);
        }
        Ok(from_hwnd(hwnd))
    }

    fn set_overlay_opacity(&self, overlay: WindowHandle, opacity: f64) -> Result<(), PlatformError> {
        set_alpha(to_hwnd(overlay), opacity)
    }

    fn destroy_overlay(&self, overlay: WindowHandle) {
        let hwnd = to_hwnd(overlay);
        unsafe {
            let _ = ShowWindow(hwnd, SW_HIDE);
            let _ = DestroyWindow(hwnd);
        }
    }

    fn pump(&self) {
        unsafe {
            let mut msg = MSG::default();
            while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }
}
