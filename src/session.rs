// Process-wide mutable state, owned by the coordination thread.

use crate::config::Settings;
use crate::handle::WindowHandle;
use std::collections::BTreeSet;
use std::sync::mpsc::{channel, Receiver, Sender};

/// A user-visible setting changed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingChange {
    DimmingEnabled(bool),
    Brightness(u8),
    DimTaskbar(bool),
    ShadeEnabled(bool),
}

impl SettingChange {
    /// Write the new value into a settings snapshot.
    pub fn apply_to(self, settings: &mut Settings) {
        match self {
            Self::DimmingEnabled(v) => settings.dimming_enabled = v,
            Self::Brightness(v) => settings.brightness = i32::from(v),
            Self::DimTaskbar(v) => settings.dim_taskbar = v,
            Self::ShadeEnabled(v) => settings.window_shade_enabled = v,
        }
    }
}

/// Overlay opacity for a brightness percentage: 100 means no dimming.
pub fn brightness_to_opacity(brightness: u8) -> f64 {
    1.0 - f64::from(brightness.min(100)) / 100.0
}

#[derive(Debug)]
pub struct Session {
    active_on_launch: bool,
    dimming_enabled: bool,
    shade_enabled: bool,
    brightness: u8,
    dim_taskbar: bool,
    foreground: Option<WindowHandle>,
    /// Ordered so reflow visits pinned windows deterministically.
    pinned: BTreeSet<WindowHandle>,
    subscribers: Vec<Sender<SettingChange>>,
}

impl Session {
    /// Build the session from loaded settings. Dimming starts disabled; the
    /// bridge turns it on at startup when `active_on_launch` is set.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            active_on_launch: settings.active_on_launch,
            dimming_enabled: false,
            shade_enabled: settings.window_shade_enabled,
            brightness: settings.brightness.clamp(0, 100) as u8,
            dim_taskbar: settings.dim_taskbar,
            foreground: None,
            pinned: BTreeSet::new(),
            subscribers: Vec::new(),
        }
    }

    /// Receive every future setting change.
    pub fn subscribe(&mut self) -> Receiver<SettingChange> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, change: SettingChange) {
        self.subscribers.retain(|tx| tx.send(change).is_ok());
    }

    pub fn active_on_launch(&self) -> bool {
        self.active_on_launch
    }

    pub fn dimming_enabled(&self) -> bool {
        self.dimming_enabled
    }

    pub fn shade_enabled(&self) -> bool {
        self.shade_enabled
    }

    pub fn dim_taskbar(&self) -> bool {
        self.dim_taskbar
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn opacity(&self) -> f64 {
        brightness_to_opacity(self.brightness)
    }

    pub fn foreground(&self) -> Option<WindowHandle> {
        self.foreground
    }

    pub fn set_foreground(&mut self, window: WindowHandle) {
        self.foreground = Some(window);
    }

    /// Returns true when the value changed.
    pub fn set_dimming_enabled(&mut self, enabled: bool) -> bool {
        if self.dimming_enabled == enabled {
            return false;
        }
        self.dimming_enabled = enabled;
        self.notify(SettingChange::DimmingEnabled(enabled));
        true
    }

    pub fn set_shade_enabled(&mut self, enabled: bool) -> bool {
        if self.shade_enabled == enabled {
            return false;
        }
        self.shade_enabled = enabled;
        self.notify(SettingChange::ShadeEnabled(enabled));
        true
    }

    pub fn set_dim_taskbar(&mut self, enabled: bool) -> bool {
        if self.dim_taskbar == enabled {
            return false;
        }
        self.dim_taskbar = enabled;
        self.notify(SettingChange::DimTaskbar(enabled));
        true
    }

    /// Clamp into 0..=100 and store. Returns true when the value changed.
    pub fn set_brightness(&mut self, value: i64) -> bool {
        let value = value.clamp(0, 100) as u8;
        if self.brightness == value {
            return false;
        }
        self.brightness = value;
        self.notify(SettingChange::Brightness(value));
        true
    }

    pub fn pinned(&self) -> impl Iterator<Item = WindowHandle> + '_ {
        self.pinned.iter().copied()
    }

    pub fn is_pinned(&self, window: WindowHandle) -> bool {
        self.pinned.contains(&window)
    }

    /// Pin if absent, unpin if present. Returns true when now pinned.
    pub fn toggle_pin(&mut self, window: WindowHandle) -> bool {
        if self.pinned.remove(&window) {
            false
        } else {
            self.pinned.insert(window);
            true
        }
    }

    pub fn unpin(&mut self, window: WindowHandle) -> bool {
        self.pinned.remove(&window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::from_settings(&Settings::default())
    }

    #[test]
    fn opacity_is_inverse_of_brightness() {
        assert_eq!(brightness_to_opacity(0), 1.0);
        assert_eq!(brightness_to_opacity(50), 0.5);
        assert_eq!(brightness_to_opacity(100), 0.0);
        for b in 0..=100u8 {
            assert!((brightness_to_opacity(b) - (1.0 - f64::from(b) / 100.0)).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn brightness_is_clamped() {
        let mut s = session();
        assert!(s.set_brightness(400));
        assert_eq!(s.brightness(), 100);
        assert!(s.set_brightness(-3));
        assert_eq!(s.brightness(), 0);
    }

    #[test]
    fn session_clamps_loaded_brightness() {
        let settings = Settings {
            brightness: 130,
            ..Settings::default()
        };
        assert_eq!(Session::from_settings(&settings).brightness(), 100);
    }

    #[test]
    fn subscribers_see_only_real_changes() {
        let mut s = session();
        let rx = s.subscribe();

        assert!(!s.set_brightness(50));
        assert!(s.set_brightness(40));
        assert!(s.set_dimming_enabled(true));
        assert!(!s.set_dimming_enabled(true));
        assert!(s.set_shade_enabled(false));

        let changes: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            changes,
            vec![
                SettingChange::Brightness(40),
                SettingChange::DimmingEnabled(true),
                SettingChange::ShadeEnabled(false),
            ]
        );
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut s = session();
        drop(s.subscribe());
        let live = s.subscribe();
        s.set_dim_taskbar(false);
        assert_eq!(s.subscribers.len(), 1);
        assert_eq!(live.try_recv(), Ok(SettingChange::DimTaskbar(false)));
    }

    #[test]
    fn toggle_pin_round_trips() {
        let mut s = session();
        let h = WindowHandle::from_raw(7);
        assert!(s.toggle_pin(h));
        assert!(s.is_pinned(h));
        assert!(!s.toggle_pin(h));
        assert_eq!(s.pinned().count(), 0);
    }

    #[test]
    fn change_applies_to_settings_snapshot() {
        let mut settings = Settings::default();
        SettingChange::Brightness(15).apply_to(&mut settings);
        SettingChange::ShadeEnabled(false).apply_to(&mut settings);
        assert_eq!(settings.brightness, 15);
        assert!(!settings.window_shade_enabled);
    }
}
