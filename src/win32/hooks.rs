// WinEvent hooks feeding the coordination thread.
//
// The callback runs on the thread that installed the hooks (the main message
// loop). It does no work of its own: events are filtered down to top-level
// window notifications and posted to the bridge queue.

use super::from_hwnd;
use crate::bridge::{BridgeEvent, EventSender};
use crate::error::PlatformError;
use log::{debug, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::Accessibility::{SetWinEventHook, UnhookWinEvent, HWINEVENTHOOK};

// WinEvent constants
const EVENT_SYSTEM_FOREGROUND: u32 = 0x0003;
const EVENT_OBJECT_DESTROY: u32 = 0x8001;
const WINEVENT_OUTOFCONTEXT: u32 = 0x0000;
const WINEVENT_SKIPOWNPROCESS: u32 = 0x0002;
const OBJID_WINDOW: i32 = 0;
const CHILDID_SELF: i32 = 0;

static EVENT_SENDER: OnceLock<EventSender> = OnceLock::new();

/// Installed hooks. Dropping the guard unhooks them.
pub struct EventHooks {
    hooks: Vec<HWINEVENTHOOK>,
}

impl EventHooks {
    /// Install the foreground and destroy hooks. Only one set may exist per
    /// process.
    pub fn install(sender: EventSender) -> Result<Self, PlatformError> {
        if EVENT_SENDER.set(sender).is_err() {
            return Err(PlatformError::os("SetWinEventHook", "hooks already installed"));
        }

        let mut guard = Self { hooks: Vec::new() };
        for event in [EVENT_SYSTEM_FOREGROUND, EVENT_OBJECT_DESTROY] {
            let hook = unsafe {
                SetWinEventHook(
                    event,
                    event,
                    None,
                    Some(win_event_proc),
                    0,
                    0,
                    WINEVENT_OUTOFCONTEXT | WINEVENT_SKIPOWNPROCESS,
                )
            };
            if hook.is_invalid() {
                // `guard` unhooks whatever was installed so far
                return Err(PlatformError::os(
                    "SetWinEventHook",
                    format!("event {event:#06x} rejected"),
                ));
            }
            guard.hooks.push(hook);
        }
        debug!("installed {} WinEvent hooks", guard.hooks.len());
        Ok(guard)
    }
}

impl Drop for EventHooks {
    fn drop(&mut self) {
        for hook in self.hooks.drain(..) {
            unsafe {
                let _ = UnhookWinEvent(hook);
            }
        }
    }
}

/// Translate a raw WinEvent into a bridge event, if it concerns a window.
fn translate(event: u32, hwnd: HWND, id_object: i32, id_child: i32) -> Option<BridgeEvent> {
    if id_object != OBJID_WINDOW || id_child != CHILDID_SELF || hwnd.is_invalid() {
        return None;
    }
    let window = from_hwnd(hwnd);
    match event {
        EVENT_SYSTEM_FOREGROUND => Some(BridgeEvent::ForegroundChanged(window)),
        EVENT_OBJECT_DESTROY => Some(BridgeEvent::WindowDestroyed(window)),
        _ => None,
    }
}

unsafe extern "system" fn win_event_proc(
    _hook: HWINEVENTHOOK,
    event: u32,
    hwnd: HWND,
    id_object: i32,
    id_child: i32,
    _id_event_thread: u32,
    _event_time: u32,
) {
    // Never unwind into the OS.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        if let (Some(event), Some(sender)) = (
            translate(event, hwnd, id_object, id_child),
            EVENT_SENDER.get(),
        ) {
            sender.post(event);
        }
    }));
    if outcome.is_err() {
        warn!("WinEvent callback panicked; event dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::WindowHandle;

    fn hwnd(raw: isize) -> HWND {
        HWND(raw as *mut std::ffi::c_void)
    }

    #[test]
    fn only_whole_window_events_are_forwarded() {
        assert_eq!(
            translate(EVENT_SYSTEM_FOREGROUND, hwnd(0x10), OBJID_WINDOW, CHILDID_SELF),
            Some(BridgeEvent::ForegroundChanged(WindowHandle::from_raw(0x10)))
        );
        assert_eq!(
            translate(EVENT_OBJECT_DESTROY, hwnd(0x10), OBJID_WINDOW, CHILDID_SELF),
            Some(BridgeEvent::WindowDestroyed(WindowHandle::from_raw(0x10)))
        );
        // caret, cursor and child elements
        assert_eq!(translate(EVENT_OBJECT_DESTROY, hwnd(0x10), -8, 0), None);
        assert_eq!(translate(EVENT_OBJECT_DESTROY, hwnd(0x10), OBJID_WINDOW, 3), None);
        assert_eq!(translate(EVENT_SYSTEM_FOREGROUND, hwnd(0), OBJID_WINDOW, 0), None);
        assert_eq!(translate(0x8002, hwnd(0x10), OBJID_WINDOW, 0), None);
    }
}
