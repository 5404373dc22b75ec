// In-memory desktop used by unit tests: a simulated z-order stack plus
// overlay bookkeeping.

use crate::deferred::{Defer, Job};
use crate::error::PlatformError;
use crate::handle::{Rect, WindowHandle};
use crate::platform::{OverlayHost, OverlaySpec, StackPosition, WindowSystem};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) const TASKBAR: WindowHandle = WindowHandle::from_raw(0xBA5E);

#[derive(Default)]
struct State {
    /// Index 0 is the top of the z-order.
    stack: Vec<WindowHandle>,
    topmost: HashSet<WindowHandle>,
    foreground: Option<WindowHandle>,
    foreground_requests: Vec<WindowHandle>,
    displays: Vec<Rect>,
    non_standard: HashSet<WindowHandle>,
    owned: HashSet<WindowHandle>,
    title_bars: HashMap<WindowHandle, Rect>,
    taskbar: bool,
    overlays: BTreeMap<WindowHandle, OverlaySpec>,
    destroyed_overlays: Vec<WindowHandle>,
    stack_requests: Vec<(WindowHandle, StackPosition)>,
    next_overlay: isize,
    panic_on_foreground_query: bool,
    panic_on_display_query: bool,
}

pub(crate) struct FakeDesktop {
    state: Mutex<State>,
}

impl FakeDesktop {
    pub(crate) fn new(displays: Vec<Rect>) -> Self {
        Self {
            state: Mutex::new(State {
                displays,
                next_overlay: 0x1000,
                ..State::default()
            }),
        }
    }

    pub(crate) fn one_display() -> Self {
        Self::new(vec![Rect::new(0, 0, 1920, 1080)])
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Open an application window at the top of the stack.
    pub(crate) fn open(&self, raw: isize) -> WindowHandle {
        let h = WindowHandle::from_raw(raw);
        let mut s = self.lock();
        s.stack.insert(0, h);
        s.title_bars.insert(h, Rect::new(raw as i32, 10, 800, 30));
        h
    }

    pub(crate) fn close(&self, h: WindowHandle) {
        self.lock().stack.retain(|w| *w != h);
    }

    pub(crate) fn with_taskbar(&self) {
        let mut s = self.lock();
        s.taskbar = true;
        s.stack.insert(0, TASKBAR);
    }

    pub(crate) fn mark_tool_window(&self, h: WindowHandle) {
        self.lock().non_standard.insert(h);
    }

    pub(crate) fn mark_owned(&self, h: WindowHandle) {
        self.lock().owned.insert(h);
    }

    pub(crate) fn focus(&self, h: WindowHandle) {
        self.lock().foreground = Some(h);
    }

    pub(crate) fn order(&self) -> Vec<WindowHandle> {
        self.lock().stack.clone()
    }

    pub(crate) fn is_topmost(&self, h: WindowHandle) -> bool {
        self.lock().topmost.contains(&h)
    }

    pub(crate) fn live_overlays(&self) -> Vec<(WindowHandle, OverlaySpec)> {
        self.lock().overlays.iter().map(|(h, s)| (*h, *s)).collect()
    }

    pub(crate) fn destroyed_overlays(&self) -> Vec<WindowHandle> {
        self.lock().destroyed_overlays.clone()
    }

    pub(crate) fn foreground_requests(&self) -> Vec<WindowHandle> {
        self.lock().foreground_requests.clone()
    }

    pub(crate) fn stack_requests(&self) -> Vec<(WindowHandle, StackPosition)> {
        self.lock().stack_requests.clone()
    }

    pub(crate) fn clear_requests(&self) {
        self.lock().stack_requests.clear();
    }

    /// Simulate attaching or removing monitors.
    pub(crate) fn set_displays(&self, displays: Vec<Rect>) {
        self.lock().displays = displays;
    }

    /// Make the next `foreground_window` call panic (once).
    pub(crate) fn panic_on_next_foreground_query(&self) {
        self.lock().panic_on_foreground_query = true;
    }

    /// Make every `display_surfaces` call panic.
    pub(crate) fn panic_on_display_query(&self) {
        self.lock().panic_on_display_query = true;
    }
}

impl WindowSystem for FakeDesktop {
    fn foreground_window(&self) -> Option<WindowHandle> {
        // Take the flag in its own statement so the lock is released before
        // panicking and the mutex is not poisoned.
        let armed = std::mem::take(&mut self.lock().panic_on_foreground_query);
        if armed {
            panic!("simulated fault in foreground_window");
        }
        self.lock().foreground
    }

    fn set_foreground_window(&self, window: WindowHandle) -> Result<(), PlatformError> {
        let mut s = self.lock();
        s.foreground_requests.push(window);
        if !s.stack.contains(&window) {
            return Err(PlatformError::StaleHandle(window));
        }
        s.foreground = Some(window);
        Ok(())
    }

    fn set_stack_position(
        &self,
        window: WindowHandle,
        position: StackPosition,
    ) -> Result<(), PlatformError> {
        let mut s = self.lock();
        s.stack_requests.push((window, position));
        if !s.stack.contains(&window) {
            return Err(PlatformError::StaleHandle(window));
        }
        if let StackPosition::Below(anchor) = position {
            if anchor == window || !s.stack.contains(&anchor) {
                return Err(PlatformError::StaleHandle(anchor));
            }
        }
        s.stack.retain(|w| *w != window);
        match position {
            StackPosition::Top => s.stack.insert(0, window),
            StackPosition::Bottom => s.stack.push(window),
            StackPosition::Topmost => {
                s.topmost.insert(window);
                s.stack.insert(0, window);
            }
            StackPosition::NotTopmost => {
                s.topmost.remove(&window);
                s.stack.insert(0, window);
            }
            StackPosition::Below(anchor) => {
                let i = s.stack.iter().position(|w| *w == anchor).unwrap_or(0);
                s.stack.insert(i + 1, window);
            }
        }
        Ok(())
    }

    fn is_standard_window(&self, window: WindowHandle) -> bool {
        !self.lock().non_standard.contains(&window)
    }

    fn has_visible_owner(&self, window: WindowHandle) -> bool {
        self.lock().owned.contains(&window)
    }

    fn find_window_by_class(&self, class_name: &str) -> Option<WindowHandle> {
        let s = self.lock();
        (s.taskbar && class_name == crate::platform::TASKBAR_CLASS).then_some(TASKBAR)
    }

    fn title_bar_rect(&self, window: WindowHandle) -> Option<Rect> {
        let s = self.lock();
        if !s.stack.contains(&window) {
            return None;
        }
        s.title_bars.get(&window).copied()
    }

    fn display_surfaces(&self) -> Vec<Rect> {
        let armed = self.lock().panic_on_display_query;
        if armed {
            panic!("simulated fault in display_surfaces");
        }
        self.lock().displays.clone()
    }
}

impl OverlayHost for FakeDesktop {
    fn create_overlay(&self, spec: &OverlaySpec) -> Result<WindowHandle, PlatformError> {
        let mut s = self.lock();
        s.next_overlay += 1;
        let h = WindowHandle::from_raw(s.next_overlay);
        s.overlays.insert(h, *spec);
        s.stack.insert(0, h);
        Ok(h)
    }

    fn set_overlay_opacity(
        &self,
        overlay: WindowHandle,
        opacity: f64,
    ) -> Result<(), PlatformError> {
        let mut s = self.lock();
        match s.overlays.get_mut(&overlay) {
            Some(spec) => {
                spec.opacity = opacity;
                Ok(())
            }
            None => Err(PlatformError::StaleHandle(overlay)),
        }
    }

    fn destroy_overlay(&self, overlay: WindowHandle) {
        let mut s = self.lock();
        s.overlays.remove(&overlay);
        s.stack.retain(|w| *w != overlay);
        s.destroyed_overlays.push(overlay);
    }
}

/// Collects deferred jobs so a test decides when they run.
#[derive(Clone, Default)]
pub(crate) struct ManualDefer {
    jobs: Arc<Mutex<Vec<(Duration, Job)>>>,
}

impl ManualDefer {
    pub(crate) fn pending(&self) -> Vec<Duration> {
        self.jobs.lock().unwrap().iter().map(|(d, _)| *d).collect()
    }

    pub(crate) fn run_all(&self) {
        let jobs: Vec<_> = self.jobs.lock().unwrap().drain(..).collect();
        for (_, job) in jobs {
            job();
        }
    }
}

impl Defer for ManualDefer {
    fn defer(&self, delay: Duration, job: Job) {
        self.jobs.lock().unwrap().push((delay, job));
    }
}
