// Z-order coordination.
//
// Dim chain (top to bottom):
//   • foreground window
//   • pinned windows, each placed just below the foreground
//   • dim overlays, placed below the anchor (first pinned window placed, or
//     the foreground window when nothing is pinned)
//   • everything else
//   • taskbar, forced to the bottom when it is dimmed
//
// Shade overlays live outside the chain. When their target comes back to the
// foreground they are raised into the topmost band, then demoted after a
// delay. Some window managers re-assert their own topmost window right after
// a direct topmost request, so an immediate demotion would be undone.

use crate::deferred::Defer;
use crate::error::PlatformError;
use crate::handle::WindowHandle;
use crate::platform::{StackPosition, WindowSystem, TASKBAR_CLASS};
use log::debug;
use std::sync::Arc;
use std::time::Duration;

/// How long a raised shade stays in the topmost band.
pub const SHADE_DEMOTE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackRequest {
    pub window: WindowHandle,
    pub position: StackPosition,
}

impl StackRequest {
    const fn new(window: WindowHandle, position: StackPosition) -> Self {
        Self { window, position }
    }
}

/// Compute the stacking requests for one reflow, in application order.
///
/// Without a foreground window there is nothing to anchor the chain to, so
/// only the taskbar request (if any) is produced.
pub fn plan_reflow(
    foreground: Option<WindowHandle>,
    pinned: impl IntoIterator<Item = WindowHandle>,
    dim_overlays: &[WindowHandle],
    taskbar: Option<WindowHandle>,
) -> Vec<StackRequest> {
    let mut plan = Vec::new();

    if let Some(fg) = foreground {
        plan.push(StackRequest::new(fg, StackPosition::Top));

        let mut anchor = None;
        for pin in pinned {
            if pin == fg {
                continue;
            }
            plan.push(StackRequest::new(pin, StackPosition::Below(fg)));
            anchor.get_or_insert(pin);
        }

        let anchor = anchor.unwrap_or(fg);
        for &overlay in dim_overlays {
            plan.push(StackRequest::new(overlay, StackPosition::Below(anchor)));
        }
    }

    if let Some(taskbar) = taskbar {
        plan.push(StackRequest::new(taskbar, StackPosition::Bottom));
    }

    plan
}

/// Issue every request. Failures mean a window went away in the meantime
/// and do not stop the rest of the plan; the windows found gone are
/// returned so the caller can forget them.
pub fn apply(ws: &dyn WindowSystem, plan: &[StackRequest]) -> Vec<WindowHandle> {
    let mut stale = Vec::new();
    for request in plan {
        match ws.set_stack_position(request.window, request.position) {
            Ok(()) => {}
            Err(PlatformError::StaleHandle(gone)) => {
                debug!("stacking {} skipped: {gone} is gone", request.window);
                if !stale.contains(&gone) {
                    stale.push(gone);
                }
            }
            Err(e) => debug!("stacking {} skipped: {e}", request.window),
        }
    }
    stale
}

pub fn find_taskbar(ws: &dyn WindowSystem) -> Option<WindowHandle> {
    ws.find_window_by_class(TASKBAR_CLASS)
}

/// Push the taskbar back to the bottom of the stack.
pub fn sink_taskbar(ws: &dyn WindowSystem) {
    if let Some(taskbar) = find_taskbar(ws) {
        let _ = apply(ws, &[StackRequest::new(taskbar, StackPosition::Bottom)]);
    }
}

/// Raise a shade into the topmost band now and schedule its demotion.
///
/// The demotion may run after the shade was destroyed; the stale request is
/// then a silent no-op.
pub fn flash_shade<W>(ws: &Arc<W>, defer: &dyn Defer, shade: WindowHandle, delay: Duration)
where
    W: WindowSystem + 'static,
{
    let _ = apply(&**ws, &[StackRequest::new(shade, StackPosition::Topmost)]);
    let ws = Arc::clone(ws);
    defer.defer(
        delay,
        Box::new(move || {
            let _ = apply(&*ws, &[StackRequest::new(shade, StackPosition::NotTopmost)]);
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDesktop, ManualDefer, TASKBAR};

    fn h(raw: isize) -> WindowHandle {
        WindowHandle::from_raw(raw)
    }

    #[test]
    fn plan_without_pins_anchors_on_foreground() {
        let plan = plan_reflow(Some(h(1)), std::iter::empty(), &[h(100), h(101)], None);
        assert_eq!(
            plan,
            vec![
                StackRequest::new(h(1), StackPosition::Top),
                StackRequest::new(h(100), StackPosition::Below(h(1))),
                StackRequest::new(h(101), StackPosition::Below(h(1))),
            ]
        );
    }

    #[test]
    fn first_placed_pin_becomes_anchor() {
        let plan = plan_reflow(Some(h(1)), [h(1), h(5), h(6)], &[h(100)], Some(h(9)));
        assert_eq!(
            plan,
            vec![
                StackRequest::new(h(1), StackPosition::Top),
                StackRequest::new(h(5), StackPosition::Below(h(1))),
                StackRequest::new(h(6), StackPosition::Below(h(1))),
                StackRequest::new(h(100), StackPosition::Below(h(5))),
                StackRequest::new(h(9), StackPosition::Bottom),
            ]
        );
    }

    #[test]
    fn pinned_foreground_is_skipped() {
        let plan = plan_reflow(Some(h(3)), [h(3)], &[h(100)], None);
        assert_eq!(
            plan,
            vec![
                StackRequest::new(h(3), StackPosition::Top),
                StackRequest::new(h(100), StackPosition::Below(h(3))),
            ]
        );
    }

    #[test]
    fn missing_foreground_only_sinks_taskbar() {
        let plan = plan_reflow(None, [h(5)], &[], Some(h(9)));
        assert_eq!(plan, vec![StackRequest::new(h(9), StackPosition::Bottom)]);
    }

    #[test]
    fn applied_chain_orders_the_stack() {
        let desktop = FakeDesktop::one_display();
        let fg = desktop.open(0x10);
        let pinned = desktop.open(0x20);
        let other = desktop.open(0x30);
        desktop.with_taskbar();
        let dim = WindowHandle::from_raw(0xD1);

        // The dim overlay is not a window the fake knows about: its request
        // fails without stopping the rest of the plan.
        let plan = plan_reflow(Some(fg), [pinned], &[dim], find_taskbar(&desktop));
        let stale = apply(&desktop, &plan);

        assert_eq!(desktop.order(), vec![fg, pinned, other, TASKBAR]);
        assert_eq!(stale, vec![dim]);
    }

    #[test]
    fn shade_flash_raises_then_demotes_later() {
        let desktop = Arc::new(FakeDesktop::one_display());
        let defer = ManualDefer::default();
        let shade = desktop.open(0x40);

        flash_shade(&desktop, &defer, shade, SHADE_DEMOTE_DELAY);
        assert!(desktop.is_topmost(shade));
        assert_eq!(defer.pending(), vec![SHADE_DEMOTE_DELAY]);

        defer.run_all();
        assert!(!desktop.is_topmost(shade));
    }

    #[test]
    fn demotion_of_destroyed_shade_is_harmless() {
        let desktop = Arc::new(FakeDesktop::one_display());
        let defer = ManualDefer::default();
        let shade = desktop.open(0x40);

        flash_shade(&desktop, &defer, shade, SHADE_DEMOTE_DELAY);
        desktop.close(shade);
        defer.run_all();

        assert!(!desktop.order().contains(&shade));
    }
}
