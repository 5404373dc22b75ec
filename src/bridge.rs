// Event bridge: turns OS notifications and user commands into session
// updates, overlay lifecycle changes and reflows.
//
// All events go through one bounded queue and are handled in arrival order
// by a single coordination thread that exclusively owns the session and the
// overlays. Producers never block: OS callbacks must return quickly.

use crate::deferred::Defer;
use crate::error::StartupError;
use crate::handle::{Rect, WindowHandle};
use crate::overlay::OverlayManager;
use crate::platform::{OverlayHost, WindowSystem};
use crate::session::Session;
use crate::zorder::{self, SHADE_DEMOTE_DELAY};
use log::{debug, error, info, warn};
use std::ops::ControlFlow;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{
    channel, sync_channel, Receiver, RecvTimeoutError, SyncSender, TrySendError,
};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const EVENT_QUEUE_CAPACITY: usize = 1024;

/// How often the coordination thread wakes up to pump overlay messages.
const PUMP_INTERVAL: Duration = Duration::from_millis(50);

/// Brightness step for the increase / decrease hotkeys.
pub const BRIGHTNESS_STEP: i64 = 10;

/// User-triggered commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleDimming,
    /// Pin or unpin the current foreground window.
    TogglePin,
    /// Shade or unshade the current foreground window.
    ToggleShade,
    /// Shade `target` with an explicitly picked rectangle.
    CustomShade { target: WindowHandle, rect: Rect },
    SetBrightness(i64),
    AdjustBrightness(i64),
    SetDimTaskbar(bool),
    SetShadeEnabled(bool),
    /// The monitor layout changed; rebuild the dim overlays.
    RefreshDisplays,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeEvent {
    ForegroundChanged(WindowHandle),
    WindowDestroyed(WindowHandle),
    Command(Command),
    Shutdown,
}

impl From<Command> for BridgeEvent {
    fn from(command: Command) -> Self {
        Self::Command(command)
    }
}

/// Producer side of the event queue. Cheap to clone, never blocks.
#[derive(Debug, Clone)]
pub struct EventSender(SyncSender<BridgeEvent>);

impl EventSender {
    /// Enqueue an event. Returns false if it was dropped.
    pub fn post(&self, event: impl Into<BridgeEvent>) -> bool {
        match self.0.try_send(event.into()) {
            Ok(()) => true,
            // A lost destroy notification leaves a dead window pinned or
            // shaded until the next reflow notices it.
            Err(TrySendError::Full(event @ BridgeEvent::WindowDestroyed(_))) => {
                error!("event queue full, dropping {event:?}");
                false
            }
            Err(TrySendError::Full(event)) => {
                warn!("event queue full, dropping {event:?}");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

pub fn event_queue() -> (EventSender, Receiver<BridgeEvent>) {
    let (tx, rx) = sync_channel(EVENT_QUEUE_CAPACITY);
    (EventSender(tx), rx)
}

pub struct EventBridge<D>
where
    D: WindowSystem + OverlayHost + 'static,
{
    desktop: Arc<D>,
    defer: Box<dyn Defer>,
    session: Session,
    overlays: OverlayManager,
}

impl<D> EventBridge<D>
where
    D: WindowSystem + OverlayHost + 'static,
{
    pub fn new(desktop: Arc<D>, defer: Box<dyn Defer>, session: Session) -> Self {
        Self {
            desktop,
            defer,
            session,
            overlays: OverlayManager::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn overlays(&self) -> &OverlayManager {
        &self.overlays
    }

    /// Record the initial foreground window and apply the launch state.
    pub fn start(&mut self) {
        if let Some(fg) = self.desktop.foreground_window() {
            self.session.set_foreground(fg);
        }
        if self.session.active_on_launch() {
            self.set_dimming(true);
        }
    }

    /// Handle one event. `Break` means the bridge should stop.
    pub fn handle(&mut self, event: BridgeEvent) -> ControlFlow<()> {
        match event {
            BridgeEvent::ForegroundChanged(window) => self.on_foreground_changed(window),
            BridgeEvent::WindowDestroyed(window) => self.on_window_destroyed(window),
            BridgeEvent::Command(command) => self.execute(command),
            BridgeEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    pub fn execute(&mut self, command: Command) {
        debug!("command {command:?}");
        match command {
            Command::ToggleDimming => self.toggle_dimming(),
            Command::TogglePin => self.toggle_pin(),
            Command::ToggleShade => self.toggle_shade(),
            Command::CustomShade { target, rect } => self.create_custom_shade(target, rect),
            Command::SetBrightness(value) => self.set_brightness(value),
            Command::AdjustBrightness(delta) => {
                let value = i64::from(self.session.brightness()) + delta;
                self.set_brightness(value);
            }
            Command::SetDimTaskbar(enabled) => self.set_dim_taskbar(enabled),
            Command::SetShadeEnabled(enabled) => self.set_shade_enabled(enabled),
            Command::RefreshDisplays => self.refresh_displays(),
        }
    }

    /// Only standard top-level windows without a visible owner become the
    /// dimming target; dialogs and popups leave the chain alone.
    fn is_dimming_target(&self, window: WindowHandle) -> bool {
        !window.is_null()
            && self.desktop.is_standard_window(window)
            && !self.desktop.has_visible_owner(window)
    }

    pub fn on_foreground_changed(&mut self, window: WindowHandle) {
        if self.session.dimming_enabled() && self.is_dimming_target(window) {
            self.session.set_foreground(window);
            self.reflow();
        }

        if self.session.shade_enabled() {
            let current = self.desktop.foreground_window();
            let shade = current
                .and_then(|fg| self.overlays.shade_for(fg))
                .map(|overlay| overlay.handle());
            if let Some(shade) = shade {
                zorder::flash_shade(&self.desktop, self.defer.as_ref(), shade, SHADE_DEMOTE_DELAY);
            }
        }
    }

    pub fn on_window_destroyed(&mut self, window: WindowHandle) {
        if self.session.unpin(window) {
            debug!("unpinned destroyed window {window}");
        }
        if self.overlays.destroy_shade(&*self.desktop, window) {
            debug!("released shade of destroyed window {window}");
        }
        // A closing window can make the shell resurface the taskbar.
        if self.session.dim_taskbar() {
            zorder::sink_taskbar(&*self.desktop);
        }
    }

    pub fn toggle_dimming(&mut self) {
        let enabled = !self.session.dimming_enabled();
        self.set_dimming(enabled);
    }

    pub fn set_dimming(&mut self, enabled: bool) {
        if !self.session.set_dimming_enabled(enabled) {
            return;
        }

        if enabled {
            if let Some(fg) = self.desktop.foreground_window() {
                if self.is_dimming_target(fg) {
                    self.session.set_foreground(fg);
                }
            }
            let surfaces = self.desktop.display_surfaces();
            let created =
                self.overlays
                    .create_dims(&*self.desktop, &surfaces, self.session.opacity());
            info!("dimming on ({created} displays)");
            self.reflow();
        } else {
            self.overlays.destroy_dims(&*self.desktop);
            // Removing the overlays can shift focus; put it back.
            if let Some(fg) = self.session.foreground() {
                if let Err(e) = self.desktop.set_foreground_window(fg) {
                    debug!("could not restore foreground: {e}");
                }
            }
            info!("dimming off");
        }
    }

    pub fn toggle_pin(&mut self) {
        if !self.session.dimming_enabled() {
            return;
        }
        let Some(window) = self.desktop.foreground_window() else {
            return;
        };
        let pinned = self.session.toggle_pin(window);
        info!("{} {window}", if pinned { "pinned" } else { "unpinned" });
        self.reflow();
    }

    pub fn toggle_shade(&mut self) {
        if !self.session.shade_enabled() {
            return;
        }
        let Some(target) = self.desktop.foreground_window() else {
            return;
        };
        if self.overlays.destroy_shade(&*self.desktop, target) {
            info!("unshaded {target}");
            return;
        }
        match self.desktop.title_bar_rect(target) {
            Some(rect) => self.shade(target, rect),
            None => warn!("no title bar found for {target}"),
        }
    }

    pub fn create_custom_shade(&mut self, target: WindowHandle, rect: Rect) {
        if !self.session.shade_enabled() {
            return;
        }
        if self.overlays.destroy_shade(&*self.desktop, target) {
            info!("unshaded {target}");
            return;
        }
        if rect.is_empty() {
            debug!("ignoring empty custom shade for {target}");
            return;
        }
        self.shade(target, rect);
    }

    fn shade(&mut self, target: WindowHandle, rect: Rect) {
        let opacity = self.session.opacity();
        match self
            .overlays
            .create_shade(&*self.desktop, target, rect, opacity)
        {
            Ok(shade) => info!("shaded {target} with {shade}"),
            Err(e) => warn!("could not shade {target}: {e}"),
        }
    }

    pub fn set_brightness(&mut self, value: i64) {
        self.session.set_brightness(value);
        let opacity = self.session.opacity();
        self.overlays.set_opacity(&*self.desktop, opacity);
    }

    pub fn set_dim_taskbar(&mut self, enabled: bool) {
        if self.session.set_dim_taskbar(enabled) && enabled && self.session.dimming_enabled() {
            self.reflow();
        }
    }

    pub fn set_shade_enabled(&mut self, enabled: bool) {
        if self.session.set_shade_enabled(enabled) && !enabled {
            self.overlays.destroy_shades(&*self.desktop);
        }
    }

    /// Cover the current set of displays. Only meaningful while dimming.
    pub fn refresh_displays(&mut self) {
        if !self.session.dimming_enabled() {
            return;
        }
        let surfaces = self.desktop.display_surfaces();
        let created =
            self.overlays
                .create_dims(&*self.desktop, &surfaces, self.session.opacity());
        info!("display layout changed ({created} displays)");
        self.reflow();
    }

    /// Recompute and apply the dim chain.
    ///
    /// Windows that turn out to be gone are forgotten here as well, in case
    /// their destroy notification never arrived.
    pub fn reflow(&mut self) {
        let ws = &*self.desktop;
        let taskbar = if self.session.dim_taskbar() {
            zorder::find_taskbar(ws)
        } else {
            None
        };
        let plan = zorder::plan_reflow(
            self.session.foreground(),
            self.session.pinned(),
            &self.overlays.dim_handles(),
            taskbar,
        );
        for gone in zorder::apply(ws, &plan) {
            if self.session.unpin(gone) {
                debug!("unpinned vanished window {gone}");
            }
            if self.overlays.destroy_shade(ws, gone) {
                debug!("released shade of vanished window {gone}");
            }
        }
    }

    /// Release every overlay.
    pub fn shutdown(&mut self) {
        self.overlays.destroy_all(&*self.desktop);
    }

    /// Process events until `Shutdown` arrives or every sender is gone.
    ///
    /// A panic inside a handler is logged and the loop keeps going, so one
    /// bad event cannot take the session down.
    pub fn run(mut self, events: Receiver<BridgeEvent>) {
        info!("event bridge running");
        loop {
            self.desktop.pump();
            let event = match events.recv_timeout(PUMP_INTERVAL) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };
            match catch_unwind(AssertUnwindSafe(|| self.handle(event))) {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => break,
                Err(_) => error!("handler for {event:?} panicked; continuing"),
            }
        }
        self.shutdown();
        info!("event bridge stopped");
    }
}

/// Runs `on_exit` when dropped, even while unwinding.
struct OnExit<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> Drop for OnExit<F> {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

/// Build and start a bridge on its own thread, then run it on `events`.
///
/// Returns once the launch state has been applied. A panic while building
/// or starting is reported as [`StartupError::Failed`]. `on_exit` runs when
/// the thread ends for any reason, so the caller can stop waiting on a
/// bridge that is gone.
pub fn spawn_coordinator<D, B, X>(
    build: B,
    events: Receiver<BridgeEvent>,
    on_exit: X,
) -> Result<JoinHandle<()>, StartupError>
where
    D: WindowSystem + OverlayHost + 'static,
    B: FnOnce() -> EventBridge<D> + Send + 'static,
    X: FnOnce() + Send + 'static,
{
    let (ready_tx, ready_rx) = channel();
    let handle = thread::Builder::new()
        .name("coordinator".into())
        .spawn(move || {
            let _exit = OnExit(Some(on_exit));
            let started = catch_unwind(AssertUnwindSafe(|| {
                let mut bridge = build();
                bridge.start();
                bridge
            }));
            match started {
                Ok(bridge) => {
                    let _ = ready_tx.send(true);
                    bridge.run(events);
                }
                Err(_) => {
                    error!("event bridge failed to start");
                    let _ = ready_tx.send(false);
                }
            }
        })?;

    // A dropped sender without a message also means the thread died.
    if ready_rx.recv().unwrap_or(false) {
        Ok(handle)
    } else {
        let _ = handle.join();
        Err(StartupError::Failed)
    }
}

impl<D> Drop for EventBridge<D>
where
    D: WindowSystem + OverlayHost + 'static,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}
