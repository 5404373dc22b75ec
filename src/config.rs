use crate::error::SettingsError;
use crate::session::SettingChange;
use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

const APP_DIR: &str = "FocusDim";
const SETTINGS_FILE: &str = "settings.json";

/// User settings stored in JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub active_on_launch: bool,
    pub dimming_enabled: bool,
    pub dim_taskbar: bool,
    /// 0 = fully dimmed, 100 = no dimming
    #[serde(deserialize_with = "saturating_brightness")]
    pub brightness: i32,
    pub window_shade_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            active_on_launch: true,
            dimming_enabled: false,
            dim_taskbar: true,
            brightness: 50,
            window_shade_enabled: true,
        }
    }
}

impl Settings {
    /// Clamp values that may have been hand-edited out of range.
    pub fn normalize(&mut self) {
        self.brightness = self.brightness.clamp(0, 100);
    }
}

/// Accept any JSON number and saturate it into 0..=100, so a wild
/// hand-edited value does not make the whole file malformed.
fn saturating_brightness<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Ok(value.clamp(0.0, 100.0).round() as i32)
}

/// Directory holding settings and the log file.
pub fn app_dir() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join(APP_DIR)
}

pub fn settings_path() -> PathBuf {
    app_dir().join(SETTINGS_FILE)
}

/// Read settings from `path`. `Ok(None)` when the file does not exist yet.
pub fn read_settings(path: &Path) -> Result<Option<Settings>, SettingsError> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path)?;
    let settings = serde_json::from_str(&data)?;
    Ok(Some(settings))
}

/// Load and normalize settings. A malformed file is replaced with defaults.
pub fn load_settings_from(path: &Path) -> Settings {
    let mut settings = match read_settings(path) {
        Ok(Some(settings)) => settings,
        Ok(None) => {
            debug!("no settings at {}, using defaults", path.display());
            Settings::default()
        }
        Err(e) => {
            warn!("{e}; resetting {} to defaults", path.display());
            let defaults = Settings::default();
            if let Err(e) = save_settings_to(path, &defaults) {
                warn!("could not rewrite settings: {e}");
            }
            defaults
        }
    };
    settings.normalize();
    settings
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(settings)?;
    fs::write(path, data)?;
    Ok(())
}

/// Write `settings` to `path` after every published change. The thread ends
/// when the session (the sending side) is dropped.
pub fn spawn_writer(
    mut settings: Settings,
    path: PathBuf,
    changes: Receiver<SettingChange>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("settings".into())
        .spawn(move || {
            for change in changes {
                change.apply_to(&mut settings);
                if let Err(e) = save_settings_to(&path, &settings) {
                    warn!("failed to save settings: {e}");
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn keys_are_camel_case_and_partial_files_fill_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "dimTaskbar": false, "brightness": 70 }"#).unwrap();

        let settings = load_settings_from(&path);
        assert!(!settings.dim_taskbar);
        assert_eq!(settings.brightness, 70);
        assert!(settings.active_on_launch);
        assert!(settings.window_shade_enabled);
    }

    #[test]
    fn out_of_range_brightness_is_clamped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        fs::write(&path, r#"{ "brightness": 250 }"#).unwrap();
        assert_eq!(load_settings_from(&path).brightness, 100);

        fs::write(&path, r#"{ "brightness": -12 }"#).unwrap();
        assert_eq!(load_settings_from(&path).brightness, 0);
    }

    #[test]
    fn huge_brightness_is_clamped_and_other_keys_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        fs::write(
            &path,
            r#"{"brightness":5000000000,"dimTaskbar":false,"activeOnLaunch":false}"#,
        )
        .unwrap();
        let settings = load_settings_from(&path);
        assert_eq!(settings.brightness, 100);
        assert!(!settings.dim_taskbar);
        assert!(!settings.active_on_launch);

        fs::write(&path, r#"{"brightness":-1e40,"windowShadeEnabled":false}"#).unwrap();
        let settings = load_settings_from(&path);
        assert_eq!(settings.brightness, 0);
        assert!(!settings.window_shade_enabled);
    }

    #[test]
    fn malformed_file_is_reset_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(load_settings_from(&path), Settings::default());
        let rewritten = read_settings(&path).unwrap().unwrap();
        assert_eq!(rewritten, Settings::default());
    }

    #[test]
    fn saved_settings_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            brightness: 20,
            window_shade_enabled: false,
            ..Settings::default()
        };
        save_settings_to(&path, &settings).unwrap();
        assert_eq!(read_settings(&path).unwrap(), Some(settings));
    }

    #[test]
    fn writer_persists_each_change_and_stops_with_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let (tx, rx) = std::sync::mpsc::channel();

        let writer = spawn_writer(Settings::default(), path.clone(), rx).unwrap();
        tx.send(SettingChange::Brightness(30)).unwrap();
        tx.send(SettingChange::DimmingEnabled(true)).unwrap();
        drop(tx);
        writer.join().unwrap();

        let saved = read_settings(&path).unwrap().unwrap();
        assert_eq!(saved.brightness, 30);
        assert!(saved.dimming_enabled);
        assert!(saved.dim_taskbar);
    }
}
