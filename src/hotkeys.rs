// Global hotkey bindings and conflict-tolerant registration.

use crate::bridge::{Command, BRIGHTNESS_STEP};
use crate::error::HotkeyError;
use log::{info, warn};
use std::fmt;
use std::ops::BitOr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const CTRL: Self = Self(1);
    pub const SHIFT: Self = Self(1 << 1);
    pub const ALT: Self = Self(1 << 2);
    pub const WIN: Self = Self(1 << 3);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Modifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A letter or digit key.
    Char(char),
    Up,
    Down,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            Self::Up => f.write_str("Up"),
            Self::Down => f.write_str("Down"),
        }
    }
}

/// What a hotkey does when pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    Command(Command),
    /// Open the rectangle picker for the foreground window.
    PickCustomShade,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyBinding {
    /// Unique within the application
    pub id: i32,
    pub name: &'static str,
    pub modifiers: Modifiers,
    pub key: Key,
    pub no_repeat: bool,
    pub action: HotkeyAction,
}

impl HotkeyBinding {
    pub fn combo(&self) -> String {
        format_hotkey(self.modifiers, self.key)
    }
}

/// Human-readable combo, e.g. `Ctrl+Alt+Win+D`.
pub fn format_hotkey(modifiers: Modifiers, key: Key) -> String {
    let mut parts = Vec::new();
    if modifiers.contains(Modifiers::CTRL) {
        parts.push("Ctrl".to_string());
    }
    if modifiers.contains(Modifiers::SHIFT) {
        parts.push("Shift".to_string());
    }
    if modifiers.contains(Modifiers::ALT) {
        parts.push("Alt".to_string());
    }
    if modifiers.contains(Modifiers::WIN) {
        parts.push("Win".to_string());
    }
    parts.push(key.to_string());
    parts.join("+")
}

pub fn default_bindings() -> Vec<HotkeyBinding> {
    use Modifiers as M;
    vec![
        HotkeyBinding {
            id: 1,
            name: "toggle-dimming",
            modifiers: M::WIN | M::CTRL | M::ALT,
            key: Key::Char('D'),
            no_repeat: true,
            action: HotkeyAction::Command(Command::ToggleDimming),
        },
        HotkeyBinding {
            id: 2,
            name: "toggle-pin",
            modifiers: M::WIN | M::SHIFT,
            key: Key::Char('D'),
            no_repeat: true,
            action: HotkeyAction::Command(Command::TogglePin),
        },
        HotkeyBinding {
            id: 3,
            name: "toggle-shade",
            modifiers: M::WIN | M::ALT,
            key: Key::Char('S'),
            no_repeat: true,
            action: HotkeyAction::Command(Command::ToggleShade),
        },
        HotkeyBinding {
            id: 4,
            name: "custom-shade",
            modifiers: M::WIN | M::ALT,
            key: Key::Char('A'),
            no_repeat: true,
            action: HotkeyAction::PickCustomShade,
        },
        HotkeyBinding {
            id: 5,
            name: "brightness-up",
            modifiers: M::CTRL | M::ALT,
            key: Key::Up,
            no_repeat: true,
            action: HotkeyAction::Command(Command::AdjustBrightness(BRIGHTNESS_STEP)),
        },
        HotkeyBinding {
            id: 6,
            name: "brightness-down",
            modifiers: M::CTRL | M::ALT,
            key: Key::Down,
            no_repeat: true,
            action: HotkeyAction::Command(Command::AdjustBrightness(-BRIGHTNESS_STEP)),
        },
    ]
}

pub fn binding_by_id(bindings: &[HotkeyBinding], id: i32) -> Option<&HotkeyBinding> {
    bindings.iter().find(|b| b.id == id)
}

pub trait HotkeyRegistrar {
    fn register(&mut self, binding: &HotkeyBinding) -> Result<(), HotkeyError>;
}

/// Transient user-facing message surface (tray balloon).
pub trait Notifier {
    fn notify(&self, title: &str, text: &str);
}

pub const CONFLICT_TITLE: &str = "FocusDim hotkey conflict";

pub fn conflict_text(combo: &str) -> String {
    format!("{combo} is already registered by another app. FocusDim will continue without that hotkey.")
}

/// Register every binding. A combo owned by another process is skipped and
/// reported to the user; the rest keep working. Returns the ids registered.
pub fn register_all(
    registrar: &mut dyn HotkeyRegistrar,
    bindings: &[HotkeyBinding],
    notifier: &dyn Notifier,
) -> Vec<i32> {
    let mut registered = Vec::new();
    for binding in bindings {
        match registrar.register(binding) {
            Ok(()) => {
                info!("hotkey {} -> {}", binding.combo(), binding.name);
                registered.push(binding.id);
            }
            Err(HotkeyError::AlreadyRegistered(combo)) => {
                warn!("hotkey {} ({}) is taken by another app", combo, binding.name);
                notifier.notify(CONFLICT_TITLE, &conflict_text(&combo));
            }
            Err(e) => warn!("hotkey {} not registered: {e}", binding.name),
        }
    }
    registered
}
