//! FocusDim: dims every window except the one you are working in.
//!
//! The coordination core (session state, overlay bookkeeping, z-order
//! planning and the event bridge) is platform independent and talks to the
//! desktop through [`platform::WindowSystem`] and [`platform::OverlayHost`].
//! The native backend lives in [`win32`].

pub mod bridge;
pub mod config;
pub mod deferred;
pub mod error;
pub mod handle;
pub mod hotkeys;
pub mod logging;
pub mod overlay;
pub mod platform;
pub mod session;
pub mod zorder;

#[cfg(windows)]
pub mod win32;

#[cfg(test)]
mod testing;
