// Rectangle picker for custom shades.
//
// A translucent window covers the virtual screen; the user drags out a
// rectangle with the left button. Escape or a right click cancels. The
// result is posted to the bridge as a `CustomShade` command and focus goes
// back to the window being shaded.

use super::{to_hwnd, wide};
use crate::bridge::{Command, EventSender};
use crate::handle::{Rect, WindowHandle};
use log::{debug, warn};
use std::cell::RefCell;
use std::sync::OnceLock;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, CreateSolidBrush, DeleteObject, EndPaint, FillRect, InvalidateRect, HGDIOBJ,
    PAINTSTRUCT,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::KeyboardAndMouse::{ReleaseCapture, SetCapture, VK_ESCAPE};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, GetSystemMetrics, LoadCursorW, RegisterClassW,
    SetForegroundWindow, SetLayeredWindowAttributes, IDC_CROSS, LWA_ALPHA, SM_CXVIRTUALSCREEN,
    SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN, SM_YVIRTUALSCREEN, WM_DESTROY, WM_KEYDOWN,
    WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MOUSEMOVE, WM_PAINT, WM_RBUTTONUP, WNDCLASSW, WS_EX_LAYERED,
    WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP, WS_VISIBLE,
};

const PICKER_CLASS: &str = "FocusDimPicker";
const PICKER_ALPHA: u8 = 90;
const SELECTION_COLOR: COLORREF = COLORREF(0x00FF_FFFF);

static CLASS_REGISTERED: OnceLock<bool> = OnceLock::new();

struct Pick {
    target: WindowHandle,
    events: EventSender,
    /// Screen position of the picker's client origin.
    origin: (i32, i32),
    anchor: Option<(i32, i32)>,
    current: (i32, i32),
}

impl Pick {
    /// Current selection in client coordinates.
    fn selection(&self) -> Option<Rect> {
        Some(Rect::from_corners(self.anchor?, self.current))
    }

    /// Current selection in screen coordinates.
    fn screen_selection(&self) -> Option<Rect> {
        let r = self.selection()?;
        Some(Rect::new(
            r.left + self.origin.0,
            r.top + self.origin.1,
            r.width,
            r.height,
        ))
    }
}

thread_local! {
    static PICK: RefCell<Option<Pick>> = const { RefCell::new(None) };
}

fn point(lparam: LPARAM) -> (i32, i32) {
    let x = (lparam.0 & 0xFFFF) as i16 as i32;
    let y = ((lparam.0 >> 16) & 0xFFFF) as i16 as i32;
    (x, y)
}

fn register_class() -> bool {
    *CLASS_REGISTERED.get_or_init(|| unsafe {
        let hinstance = GetModuleHandleW(PCWSTR::null()).unwrap_or_default();
        let class_name = wide(PICKER_CLASS);

        let wc = WNDCLASSW {
            lpfnWndProc: Some(picker_proc),
            hInstance: hinstance.into(),
            lpszClassName: PCWSTR(class_name.as_ptr()),
            hCursor: LoadCursorW(None, IDC_CROSS).unwrap_or_default(),
            hbrBackground: CreateSolidBrush(COLORREF(0)),
            ..Default::default()
        };

        RegisterClassW(&wc) != 0
    })
}

/// Start picking a rectangle for `target`. Returns false if a pick is
/// already in progress or the picker window cannot be created.
pub fn begin(target: WindowHandle, events: EventSender) -> bool {
    if PICK.with(|p| p.borrow().is_some()) {
        debug!("picker already open");
        return false;
    }
    if !register_class() {
        warn!("picker window class could not be registered");
        return false;
    }

    let (x, y, width, height) = unsafe {
        (
            GetSystemMetrics(SM_XVIRTUALSCREEN),
            GetSystemMetrics(SM_YVIRTUALSCREEN),
            GetSystemMetrics(SM_CXVIRTUALSCREEN),
            GetSystemMetrics(SM_CYVIRTUALSCREEN),
        )
    };

    PICK.with(|p| {
        *p.borrow_mut() = Some(Pick {
            target,
            events,
            origin: (x, y),
            anchor: None,
            current: (0, 0),
        })
    });

    let class_name = wide(PICKER_CLASS);
    let created = unsafe {
        let hinstance = GetModuleHandleW(PCWSTR::null()).unwrap_or_default();
        CreateWindowExW(
            WS_EX_LAYERED | WS_EX_TOPMOST | WS_EX_TOOLWINDOW,
            PCWSTR(class_name.as_ptr()),
            PCWSTR::null(),
            WS_POPUP | WS_VISIBLE,
            x,
            y,
            width,
            height,
            None,
            None,
            Some(hinstance.into()),
            None,
        )
    };

    match created {
        Ok(hwnd) => unsafe {
            let _ = SetLayeredWindowAttributes(hwnd, COLORREF(0), PICKER_ALPHA, LWA_ALPHA);
            let _ = SetForegroundWindow(hwnd);
            true
        },
        Err(e) => {
            warn!("picker window not created: {e}");
            PICK.with(|p| p.borrow_mut().take());
            false
        }
    }
}

/// Close the picker, posting the selection unless cancelled.
fn finish(hwnd: HWND, commit: bool) {
    let pick = PICK.with(|p| p.borrow_mut().take());
    unsafe {
        let _ = DestroyWindow(hwnd);
    }
    let Some(pick) = pick else {
        return;
    };

    if commit {
        match pick.screen_selection().filter(|r| !r.is_empty()) {
            Some(rect) => {
                pick.events.post(Command::CustomShade {
                    target: pick.target,
                    rect,
                });
            }
            None => debug!("empty selection, no shade"),
        }
    }
    unsafe {
        let _ = SetForegroundWindow(to_hwnd(pick.target));
    }
}

fn paint(hwnd: HWND) {
    let selection = PICK.with(|p| p.borrow().as_ref().and_then(Pick::selection));
    unsafe {
        let mut ps = PAINTSTRUCT::default();
        let hdc = BeginPaint(hwnd, &mut ps);
        if let Some(r) = selection {
            let rect = RECT {
                left: r.left,
                top: r.top,
                right: r.right(),
                bottom: r.bottom(),
            };
            let brush = CreateSolidBrush(SELECTION_COLOR);
            FillRect(hdc, &rect, brush);
            let _ = DeleteObject(HGDIOBJ::from(brush));
        }
        let _ = EndPaint(hwnd, &ps);
    }
}

unsafe extern "system" fn picker_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_LBUTTONDOWN => {
            let at = point(lparam);
            PICK.with(|p| {
                if let Some(pick) = p.borrow_mut().as_mut() {
                    pick.anchor = Some(at);
                    pick.current = at;
                }
            });
            let _ = SetCapture(hwnd);
            LRESULT(0)
        }
        WM_MOUSEMOVE => {
            let at = point(lparam);
            let dragging = PICK.with(|p| match p.borrow_mut().as_mut() {
                Some(pick) if pick.anchor.is_some() => {
                    pick.current = at;
                    true
                }
                _ => false,
            });
            if dragging {
                let _ = InvalidateRect(Some(hwnd), None, true);
            }
            LRESULT(0)
        }
        WM_LBUTTONUP => {
            let at = point(lparam);
            PICK.with(|p| {
                if let Some(pick) = p.borrow_mut().as_mut() {
                    pick.current = at;
                }
            });
            let _ = ReleaseCapture();
            finish(hwnd, true);
            LRESULT(0)
        }
        WM_RBUTTONUP => {
            finish(hwnd, false);
            LRESULT(0)
        }
        WM_KEYDOWN if wparam.0 == VK_ESCAPE.0 as usize => {
            finish(hwnd, false);
            LRESULT(0)
        }
        WM_PAINT => {
            paint(hwnd);
            LRESULT(0)
        }
        WM_DESTROY => {
            // Closed from outside (e.g. Alt+F4): treat as cancel.
            PICK.with(|p| p.borrow_mut().take());
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}
