// System tray icon with context menu and balloon notifications

use super::wide;
use crate::config::Settings;
use crate::hotkeys::Notifier;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{HWND, POINT};
use windows::Win32::UI::Shell::{
    Shell_NotifyIconW, NIF_ICON, NIF_INFO, NIF_MESSAGE, NIF_TIP, NIIF_WARNING, NIM_ADD,
    NIM_DELETE, NIM_MODIFY, NOTIFYICONDATAW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    AppendMenuW, CreatePopupMenu, DestroyMenu, GetCursorPos, LoadIconW, SetForegroundWindow,
    TrackPopupMenu, HMENU, IDI_APPLICATION, MENU_ITEM_FLAGS, MF_CHECKED, MF_SEPARATOR, MF_STRING,
    MF_UNCHECKED, TPM_BOTTOMALIGN, TPM_LEFTALIGN,
};

/// Custom message ID for tray icon callbacks
pub const WM_TRAY_ICON: u32 = 0x0401; // WM_APP + 1

/// Menu item IDs
pub const IDM_TOGGLE: u32 = 1001;
pub const IDM_DIM_TASKBAR: u32 = 1002;
pub const IDM_SHADE: u32 = 1003;
pub const IDM_QUIT: u32 = 1004;

const TRAY_ID: u32 = 1;
const TOOLTIP: &str = "FocusDim";

fn base_data(hwnd: HWND) -> NOTIFYICONDATAW {
    NOTIFYICONDATAW {
        cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
        hWnd: hwnd,
        uID: TRAY_ID,
        ..Default::default()
    }
}

/// Copy `text` into a fixed-size, NUL-terminated buffer, truncating.
fn fill(buffer: &mut [u16], text: &str) {
    let encoded = wide(text);
    let len = encoded.len().min(buffer.len());
    buffer[..len].copy_from_slice(&encoded[..len]);
    if let Some(last) = buffer.last_mut() {
        if len == buffer.len() {
            *last = 0;
        }
    }
}

/// Add the system tray icon
pub fn add_tray_icon(hwnd: HWND) -> bool {
    unsafe {
        let mut nid = NOTIFYICONDATAW {
            uFlags: NIF_ICON | NIF_MESSAGE | NIF_TIP,
            uCallbackMessage: WM_TRAY_ICON,
            ..base_data(hwnd)
        };

        if let Ok(icon) = LoadIconW(None, IDI_APPLICATION) {
            nid.hIcon = icon;
        }
        fill(&mut nid.szTip, TOOLTIP);

        Shell_NotifyIconW(NIM_ADD, &nid).as_bool()
    }
}

/// Remove the system tray icon
pub fn remove_tray_icon(hwnd: HWND) {
    unsafe {
        let nid = base_data(hwnd);
        let _ = Shell_NotifyIconW(NIM_DELETE, &nid);
    }
}

/// Show a balloon notification from the tray icon
pub fn show_balloon(hwnd: HWND, title: &str, text: &str) -> bool {
    unsafe {
        let mut nid = NOTIFYICONDATAW {
            uFlags: NIF_INFO,
            dwInfoFlags: NIIF_WARNING,
            ..base_data(hwnd)
        };
        fill(&mut nid.szInfoTitle, title);
        fill(&mut nid.szInfo, text);

        Shell_NotifyIconW(NIM_MODIFY, &nid).as_bool()
    }
}

/// Balloon notifier bound to the tray icon of `hwnd`.
pub struct TrayNotifier {
    hwnd: HWND,
}

impl TrayNotifier {
    pub fn new(hwnd: HWND) -> Self {
        Self { hwnd }
    }
}

impl Notifier for TrayNotifier {
    fn notify(&self, title: &str, text: &str) {
        if !show_balloon(self.hwnd, title, text) {
            log::warn!("could not show tray balloon: {title}");
        }
    }
}

fn check(on: bool) -> MENU_ITEM_FLAGS {
    if on {
        MF_CHECKED
    } else {
        MF_UNCHECKED
    }
}

unsafe fn append(menu: HMENU, flags: MENU_ITEM_FLAGS, id: u32, text: &str) {
    let text = wide(text);
    let _ = AppendMenuW(menu, MF_STRING | flags, id as usize, PCWSTR(text.as_ptr()));
}

/// Show the tray context menu. Check marks reflect `settings`; the choice
/// arrives as WM_COMMAND.
pub fn show_context_menu(hwnd: HWND, settings: &Settings) {
    unsafe {
        let Ok(menu) = CreatePopupMenu() else {
            return;
        };

        append(menu, check(settings.dimming_enabled), IDM_TOGGLE, "Toggle dimming");
        append(menu, check(settings.dim_taskbar), IDM_DIM_TASKBAR, "Dim taskbar");
        append(menu, check(settings.window_shade_enabled), IDM_SHADE, "Window shade");
        let _ = AppendMenuW(menu, MF_SEPARATOR, 0, PCWSTR::null());
        append(menu, MF_UNCHECKED, IDM_QUIT, "Quit");

        let mut pt = POINT::default();
        let _ = GetCursorPos(&mut pt);

        // Required for TrackPopupMenu to work correctly with tray icons
        let _ = SetForegroundWindow(hwnd);

        let _ = TrackPopupMenu(
            menu,
            TPM_LEFTALIGN | TPM_BOTTOMALIGN,
            pt.x,
            pt.y,
            Some(0),
            hwnd,
            None,
        );

        let _ = DestroyMenu(menu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_text_is_truncated_and_terminated() {
        let mut buffer = [0xFFFFu16; 8];
        fill(&mut buffer, "FocusDim hotkey conflict");
        assert_eq!(buffer[7], 0);
        assert_eq!(String::from_utf16_lossy(&buffer[..7]), "FocusDi");
    }

    #[test]
    fn short_text_keeps_its_terminator() {
        let mut buffer = [0xFFFFu16; 8];
        fill(&mut buffer, "Dim");
        assert_eq!(&buffer[..4], &[b'D' as u16, b'i' as u16, b'm' as u16, 0]);
    }
}
