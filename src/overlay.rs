// Overlay lifecycle: creates and releases the dim overlays (one per display)
// and the shade overlays (one per target window).
//
// Native resources are always released through the host before an overlay
// leaves its collection, so nothing leaks for the rest of the session.

use crate::error::PlatformError;
use crate::handle::{Rect, WindowHandle};
use crate::platform::{OverlayHost, OverlayKind, OverlaySpec};
use log::{debug, warn};
use std::collections::BTreeMap;

/// An overlay window owned by this process.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    handle: WindowHandle,
    kind: OverlayKind,
    bounds: Rect,
    opacity: f64,
}

impl Overlay {
    pub fn handle(&self) -> WindowHandle {
        self.handle
    }

    pub fn kind(&self) -> OverlayKind {
        self.kind
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// The shaded window, for shade overlays.
    pub fn target(&self) -> Option<WindowHandle> {
        match self.kind {
            OverlayKind::Shade { target } => Some(target),
            OverlayKind::Dim => None,
        }
    }

    fn create(host: &impl OverlayHost, spec: OverlaySpec) -> Result<Self, PlatformError> {
        let handle = host.create_overlay(&spec)?;
        Ok(Self {
            handle,
            kind: spec.kind,
            bounds: spec.bounds,
            opacity: spec.opacity,
        })
    }
}

#[derive(Debug, Default)]
pub struct OverlayManager {
    dims: Vec<Overlay>,
    /// Keyed by target, so a window can never carry two shades.
    shades: BTreeMap<WindowHandle, Overlay>,
}

impl OverlayManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dims(&self) -> &[Overlay] {
        &self.dims
    }

    pub fn dim_handles(&self) -> Vec<WindowHandle> {
        self.dims.iter().map(Overlay::handle).collect()
    }

    pub fn shades(&self) -> impl Iterator<Item = &Overlay> {
        self.shades.values()
    }

    pub fn shade_count(&self) -> usize {
        self.shades.len()
    }

    pub fn shade_for(&self, target: WindowHandle) -> Option<&Overlay> {
        self.shades.get(&target)
    }

    /// Create one dim overlay per display surface, replacing any existing
    /// batch. Returns how many were created.
    pub fn create_dims(&mut self, host: &impl OverlayHost, surfaces: &[Rect], opacity: f64) -> usize {
        self.destroy_dims(host);
        for &bounds in surfaces {
            let spec = OverlaySpec {
                kind: OverlayKind::Dim,
                bounds,
                opacity,
            };
            match Overlay::create(host, spec) {
                Ok(overlay) => {
                    debug!("dim overlay {} covers {:?}", overlay.handle, bounds);
                    self.dims.push(overlay);
                }
                Err(e) => warn!("could not create dim overlay for {bounds:?}: {e}"),
            }
        }
        self.dims.len()
    }

    pub fn destroy_dims(&mut self, host: &impl OverlayHost) {
        for overlay in self.dims.drain(..) {
            host.destroy_overlay(overlay.handle);
        }
    }

    /// Shade `target` with an overlay covering `bounds`.
    ///
    /// An existing shade for the same target is released first.
    pub fn create_shade(
        &mut self,
        host: &impl OverlayHost,
        target: WindowHandle,
        bounds: Rect,
        opacity: f64,
    ) -> Result<WindowHandle, PlatformError> {
        self.destroy_shade(host, target);
        let spec = OverlaySpec {
            kind: OverlayKind::Shade { target },
            bounds,
            opacity,
        };
        let overlay = Overlay::create(host, spec)?;
        let handle = overlay.handle;
        self.shades.insert(target, overlay);
        Ok(handle)
    }

    /// Release the shade targeting `target`. Returns false if there was none.
    pub fn destroy_shade(&mut self, host: &impl OverlayHost, target: WindowHandle) -> bool {
        match self.shades.remove(&target) {
            Some(overlay) => {
                host.destroy_overlay(overlay.handle);
                true
            }
            None => false,
        }
    }

    pub fn destroy_shades(&mut self, host: &impl OverlayHost) {
        while let Some((_, overlay)) = self.shades.pop_first() {
            host.destroy_overlay(overlay.handle);
        }
    }

    /// Apply a new opacity to every live overlay, dim and shade alike.
    pub fn set_opacity(&mut self, host: &impl OverlayHost, opacity: f64) {
        for overlay in self.dims.iter_mut().chain(self.shades.values_mut()) {
            overlay.opacity = opacity;
            if let Err(e) = host.set_overlay_opacity(overlay.handle, opacity) {
                debug!("opacity update skipped: {e}");
            }
        }
    }

    pub fn destroy_all(&mut self, host: &impl OverlayHost) {
        self.destroy_dims(host);
        self.destroy_shades(host);
    }
}
