use crate::handle::WindowHandle;
use thiserror::Error;

/// Failures reported by the OS window subsystem.
///
/// These are expected in normal operation: the window behind a handle can
/// close between the moment we learn about it and the moment we touch it.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("window {0} no longer exists")]
    StaleHandle(WindowHandle),

    #[error("{call} failed: {message}")]
    Os {
        call: &'static str,
        message: String,
    },
}

impl PlatformError {
    pub fn os(call: &'static str, message: impl Into<String>) -> Self {
        Self::Os {
            call,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum HotkeyError {
    #[error("{0} is already registered by another process")]
    AlreadyRegistered(String),

    #[error("failed to register {combo}: {message}")]
    Os { combo: String, message: String },
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("could not spawn coordination thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("coordination thread failed while applying the launch state")]
    Failed,
}
