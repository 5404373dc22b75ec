// Hidden host window on the main thread: owns the tray icon and receives
// WM_HOTKEY. Everything it learns is forwarded to the bridge.

use super::{tray, wide, Win32Desktop};
use crate::bridge::{BridgeEvent, Command, EventSender};
use crate::config::Settings;
use crate::error::PlatformError;
use crate::hotkeys::{binding_by_id, HotkeyAction, HotkeyBinding};
use crate::platform::WindowSystem;
use crate::session::SettingChange;
use log::debug;
use std::cell::RefCell;
use std::sync::mpsc::Receiver;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW, PeekMessageW,
    PostQuitMessage, PostThreadMessageW, RegisterClassW, TranslateMessage, MSG, PM_NOREMOVE,
    WINDOW_STYLE, WM_COMMAND, WM_DESTROY, WM_DISPLAYCHANGE, WM_HOTKEY, WM_LBUTTONUP, WM_QUIT,
    WM_RBUTTONUP, WNDCLASSW, WS_EX_TOOLWINDOW,
};

const HOST_CLASS: &str = "FocusDimHost";

/// Main-thread state behind the host window.
pub struct HostState {
    pub events: EventSender,
    pub bindings: Vec<HotkeyBinding>,
    /// Snapshot used for tray check marks and gating the picker.
    pub settings: Settings,
    pub updates: Receiver<SettingChange>,
}

impl HostState {
    /// Fold in setting changes published by the coordination thread.
    fn refresh(&mut self) {
        for change in self.updates.try_iter() {
            change.apply_to(&mut self.settings);
        }
    }
}

thread_local! {
    static HOST: RefCell<Option<HostState>> = const { RefCell::new(None) };
}

/// Run `f` against the host state. Re-entrant calls (a nested message loop
/// inside a handler) see `None`.
fn with_host<R>(f: impl FnOnce(&mut HostState) -> R) -> Option<R> {
    HOST.with(|cell| {
        let mut guard = cell.try_borrow_mut().ok()?;
        let state = guard.as_mut()?;
        state.refresh();
        Some(f(state))
    })
}

/// What a menu item or hotkey resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Post(BridgeEvent),
    Pick,
    Quit,
    None,
}

fn menu_action(id: u32, settings: &Settings) -> Action {
    match id {
        tray::IDM_TOGGLE => Action::Post(Command::ToggleDimming.into()),
        tray::IDM_DIM_TASKBAR => Action::Post(Command::SetDimTaskbar(!settings.dim_taskbar).into()),
        tray::IDM_SHADE => {
            Action::Post(Command::SetShadeEnabled(!settings.window_shade_enabled).into())
        }
        tray::IDM_QUIT => Action::Quit,
        _ => Action::None,
    }
}

fn hotkey_action(state: &HostState, id: i32) -> Action {
    match binding_by_id(&state.bindings, id).map(|b| b.action) {
        Some(HotkeyAction::Command(command)) => Action::Post(command.into()),
        Some(HotkeyAction::PickCustomShade) if state.settings.window_shade_enabled => Action::Pick,
        Some(HotkeyAction::PickCustomShade) => {
            debug!("custom shade ignored: window shade disabled");
            Action::None
        }
        None => Action::None,
    }
}

/// Monitors were attached, removed or resized.
fn display_change_action(state: &HostState) -> Action {
    if state.settings.dimming_enabled {
        Action::Post(Command::RefreshDisplays.into())
    } else {
        Action::None
    }
}

fn perform(action: Action) {
    let Some(events) = with_host(|h| h.events.clone()) else {
        return;
    };
    match action {
        Action::Post(event) => {
            events.post(event);
        }
        Action::Pick => {
            if let Some(target) = Win32Desktop.foreground_window() {
                super::picker::begin(target, events);
            }
        }
        Action::Quit => unsafe { PostQuitMessage(0) },
        Action::None => {}
    }
}

unsafe extern "system" fn host_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_HOTKEY => {
            let id = wparam.0 as i32;
            if let Some(action) = with_host(|h| hotkey_action(h, id)) {
                perform(action);
            }
            LRESULT(0)
        }
        tray::WM_TRAY_ICON => {
            let event = (lparam.0 & 0xFFFF) as u32;
            if event == WM_RBUTTONUP || event == WM_LBUTTONUP {
                // Snapshot first: the menu runs a nested message loop.
                if let Some(settings) = with_host(|h| h.settings.clone()) {
                    tray::show_context_menu(hwnd, &settings);
                }
            }
            LRESULT(0)
        }
        WM_COMMAND => {
            let id = (wparam.0 & 0xFFFF) as u32;
            if let Some(action) = with_host(|h| menu_action(id, &h.settings)) {
                perform(action);
            }
            LRESULT(0)
        }
        WM_DISPLAYCHANGE => {
            if let Some(action) = with_host(|h| display_change_action(h)) {
                perform(action);
            }
            LRESULT(0)
        }
        WM_DESTROY => {
            PostQuitMessage(0);
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

/// Create the hidden host window and install its state on this thread.
pub fn create_host_window(state: HostState) -> Result<HWND, PlatformError> {
    HOST.with(|cell| *cell.borrow_mut() = Some(state));

    let class_name = wide(HOST_CLASS);
    unsafe {
        let hinstance = GetModuleHandleW(PCWSTR::null()).unwrap_or_default();
        let wc = WNDCLASSW {
            lpfnWndProc: Some(host_proc),
            hInstance: hinstance.into(),
            lpszClassName: PCWSTR(class_name.as_ptr()),
            ..Default::default()
        };
        if RegisterClassW(&wc) == 0 {
            return Err(PlatformError::os("RegisterClassW", "host window class"));
        }

        CreateWindowExW(
            WS_EX_TOOLWINDOW,
            PCWSTR(class_name.as_ptr()),
            PCWSTR(class_name.as_ptr()),
            WINDOW_STYLE(0),
            0,
            0,
            0,
            0,
            None,
            None,
            Some(hinstance.into()),
            None,
        )
        .map_err(|e| PlatformError::os("CreateWindowExW", e.to_string()))
    }
}

pub fn destroy_host_window(hwnd: HWND) {
    unsafe {
        let _ = DestroyWindow(hwnd);
    }
    HOST.with(|cell| cell.borrow_mut().take());
}

/// Id of the calling thread, with its message queue created so that other
/// threads can post to it before any window exists.
pub fn message_thread_id() -> u32 {
    let mut msg = MSG::default();
    unsafe {
        let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
        GetCurrentThreadId()
    }
}

/// Make the message loop running on `thread_id` return. Safe to call from
/// any thread.
pub fn post_quit(thread_id: u32) {
    if let Err(e) = unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
        debug!("could not post WM_QUIT to thread {thread_id}: {e}");
    }
}

/// Standard Win32 message loop. Returns when WM_QUIT arrives.
pub fn message_loop() {
    unsafe {
        let mut msg = MSG::default();
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}
