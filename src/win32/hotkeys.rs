// Global hotkeys using Win32 RegisterHotKey API

use crate::error::HotkeyError;
use crate::hotkeys::{HotkeyBinding, HotkeyRegistrar, Key, Modifiers};
use windows::Win32::Foundation::{ERROR_HOTKEY_ALREADY_REGISTERED, HWND};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    RegisterHotKey, UnregisterHotKey, HOT_KEY_MODIFIERS, MOD_ALT, MOD_CONTROL, MOD_NOREPEAT,
    MOD_SHIFT, MOD_WIN, VK_DOWN, VK_UP,
};

fn native_modifiers(binding: &HotkeyBinding) -> HOT_KEY_MODIFIERS {
    let mut bits = 0;
    for (ours, native) in [
        (Modifiers::CTRL, MOD_CONTROL),
        (Modifiers::SHIFT, MOD_SHIFT),
        (Modifiers::ALT, MOD_ALT),
        (Modifiers::WIN, MOD_WIN),
    ] {
        if binding.modifiers.contains(ours) {
            bits |= native.0;
        }
    }
    if binding.no_repeat {
        bits |= MOD_NOREPEAT.0;
    }
    HOT_KEY_MODIFIERS(bits)
}

fn virtual_key(key: Key) -> u32 {
    match key {
        // Letter and digit virtual-key codes equal their uppercase ASCII
        Key::Char(c) => c.to_ascii_uppercase() as u32,
        Key::Up => VK_UP.0 as u32,
        Key::Down => VK_DOWN.0 as u32,
    }
}

/// Hotkeys bound to a window; WM_HOTKEY carries the binding id.
/// Everything registered here is released on drop.
pub struct Win32Hotkeys {
    hwnd: HWND,
    registered: Vec<i32>,
}

impl Win32Hotkeys {
    pub fn new(hwnd: HWND) -> Self {
        Self {
            hwnd,
            registered: Vec::new(),
        }
    }

    pub fn unregister_all(&mut self) {
        for id in self.registered.drain(..) {
            unsafe {
                let _ = UnregisterHotKey(Some(self.hwnd), id);
            }
        }
    }
}

impl HotkeyRegistrar for Win32Hotkeys {
    fn register(&mut self, binding: &HotkeyBinding) -> Result<(), HotkeyError> {
        let result = unsafe {
            RegisterHotKey(
                Some(self.hwnd),
                binding.id,
                native_modifiers(binding),
                virtual_key(binding.key),
            )
        };
        match result {
            Ok(()) => {
                self.registered.push(binding.id);
                Ok(())
            }
            Err(e) if e.code() == ERROR_HOTKEY_ALREADY_REGISTERED.to_hresult() => {
                Err(HotkeyError::AlreadyRegistered(binding.combo()))
            }
            Err(e) => Err(HotkeyError::Os {
                combo: binding.combo(),
                message: e.to_string(),
            }),
        }
    }
}

impl Drop for Win32Hotkeys {
    fn drop(&mut self) {
        self.unregister_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkeys::{binding_by_id, default_bindings};

    #[test]
    fn toggle_dimming_uses_ctrl_alt_win_d() {
        let bindings = default_bindings();
        let toggle = binding_by_id(&bindings, 1).expect("binding 1");
        let mods = native_modifiers(toggle);
        assert_eq!(
            mods.0,
            MOD_CONTROL.0 | MOD_ALT.0 | MOD_WIN.0 | MOD_NOREPEAT.0
        );
        assert_eq!(virtual_key(toggle.key), 'D' as u32);
    }

    #[test]
    fn arrow_keys_map_to_virtual_keys() {
        assert_eq!(virtual_key(Key::Up), VK_UP.0 as u32);
        assert_eq!(virtual_key(Key::Down), VK_DOWN.0 as u32);
        assert_eq!(virtual_key(Key::Char('s')), 'S' as u32);
    }
}
