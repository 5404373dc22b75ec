// Prevents console window in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use log::error;

#[cfg(windows)]
fn main() {
    focusdim::logging::init();

    match std::panic::catch_unwind(app::run) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("fatal: {e:#}");
            std::process::exit(1);
        }
        // Already recorded by the panic hook
        Err(_) => std::process::exit(1),
    }
}

#[cfg(not(windows))]
fn main() {
    focusdim::logging::init();
    error!("focusdim only runs on Windows");
    std::process::exit(1);
}

#[cfg(windows)]
mod app {
    use anyhow::{anyhow, Context, Result};
    use focusdim::bridge::{self, BridgeEvent, EventBridge, EventSender};
    use focusdim::config::{self, Settings};
    use focusdim::deferred::DeferredRunner;
    use focusdim::hotkeys;
    use focusdim::session::{Session, SettingChange};
    use focusdim::win32::hooks::EventHooks;
    use focusdim::win32::host::{self, HostState};
    use focusdim::win32::hotkeys::Win32Hotkeys;
    use focusdim::win32::tray::{self, TrayNotifier};
    use focusdim::win32::{self, Win32Desktop};
    use log::{info, warn};
    use std::sync::mpsc::Receiver;
    use std::sync::Arc;
    use windows::Win32::Foundation::HWND;

    pub fn run() -> Result<()> {
        // Single-instance check
        if win32::is_already_running() {
            info!("another instance is running; exiting");
            return Ok(());
        }

        let settings = config::load_settings();
        let mut session = Session::from_settings(&settings);
        let persisted = session.subscribe();
        let tray_updates = session.subscribe();

        let writer = config::spawn_writer(settings.clone(), config::settings_path(), persisted)
            .context("starting settings writer")?;

        let (events, queue) = bridge::event_queue();
        let defer = DeferredRunner::spawn().context("starting deferred worker")?;
        // If the coordinator goes away on its own, stop the message loop
        // instead of running without anyone owning the overlays.
        let main_thread = host::message_thread_id();
        let coordinator = bridge::spawn_coordinator(
            move || EventBridge::new(Arc::new(Win32Desktop), Box::new(defer), session),
            queue,
            move || host::post_quit(main_thread),
        )
        .context("starting coordination thread")?;

        // The coordination thread publishes the launch state itself.
        let mut snapshot = settings;
        snapshot.dimming_enabled = false;

        let shell = Shell::open(events.clone(), snapshot, tray_updates);
        if shell.is_ok() {
            info!("running");
            host::message_loop();
        }

        // Stop the coordinator first: it owns every overlay.
        events.post(BridgeEvent::Shutdown);
        let coordinated = coordinator
            .join()
            .map_err(|_| anyhow!("coordination thread panicked"));
        let outcome = shell.map(drop).and(coordinated);
        drop(events);
        if writer.join().is_err() {
            warn!("settings writer panicked");
        }
        info!("shut down");
        outcome
    }

    /// Main-thread collaborators: host window, tray icon, hotkeys and
    /// WinEvent hooks. Released in reverse order on drop.
    struct Shell {
        hwnd: HWND,
        hotkeys: Win32Hotkeys,
        hooks: Option<EventHooks>,
    }

    impl Shell {
        fn open(
            events: EventSender,
            settings: Settings,
            updates: Receiver<SettingChange>,
        ) -> Result<Self> {
            let bindings = hotkeys::default_bindings();
            let hwnd = host::create_host_window(HostState {
                events: events.clone(),
                bindings: bindings.clone(),
                settings,
                updates,
            })
            .context("creating host window")?;

            if !tray::add_tray_icon(hwnd) {
                warn!("tray icon could not be added");
            }

            let mut shell = Self {
                hwnd,
                hotkeys: Win32Hotkeys::new(hwnd),
                hooks: None,
            };
            hotkeys::register_all(&mut shell.hotkeys, &bindings, &TrayNotifier::new(hwnd));
            shell.hooks = Some(EventHooks::install(events).context("installing WinEvent hooks")?);
            Ok(shell)
        }
    }

    impl Drop for Shell {
        fn drop(&mut self) {
            self.hooks.take();
            self.hotkeys.unregister_all();
            tray::remove_tray_icon(self.hwnd);
            host::destroy_host_window(self.hwnd);
        }
    }
}
