// Durable log: everything goes to focusdim.log next to the settings, and
// panics are recorded there before the default hook runs.

use log::error;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOG_FILE: &str = "focusdim.log";

pub fn log_path() -> PathBuf {
    crate::config::app_dir().join(LOG_FILE)
}

fn open_log(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialise the global logger. `RUST_LOG` overrides the default `info`
/// filter. Falls back to stderr when the log file cannot be opened.
pub fn init() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();

    let path = log_path();
    let file_error = match open_log(&path) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
            None
        }
        Err(e) => Some(e),
    };

    // Another logger may already be installed (tests); keep it.
    let _ = builder.try_init();

    if let Some(e) = file_error {
        log::warn!("cannot open {}: {e}; logging to stderr", path.display());
    }

    install_panic_hook();
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let thread = std::thread::current();
        let name = thread.name().unwrap_or("<unnamed>");
        error!("panic on thread '{name}': {info}");
        default_hook(info);
    }));
}
