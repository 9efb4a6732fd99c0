//! Interactive move/resize state machine
//!
//! The cursor is either in passthrough mode, where pointer events go to
//! clients, or holds a [`Grab`] on one view, in which case motion is consumed
//! by the compositor to move or resize that view. A grab only ever exists
//! together with a non-passthrough mode; both live in one `Option<Grab>`.

use crate::backend::{CursorBackend, SeatBackend, ShellBackend};
use crate::error::{KwmError, KwmResult};
use crate::view::{Rectangle, ViewId, ViewRegistry};
use bitflags::bitflags;
use log::{debug, trace};

bitflags! {
    /// Window edges being dragged during a resize.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResizeEdges: u32 {
        const TOP = 1;
        const BOTTOM = 2;
        const LEFT = 4;
        const RIGHT = 8;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorMode {
    #[default]
    Passthrough,
    Move,
    Resize,
}

/// Kind of interactive gesture a grab drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabKind {
    Move,
    Resize,
}

/// Live state of a move or resize gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct Grab {
    pub view: ViewId,
    pub kind: GrabKind,
    /// Move: cursor offset from the view origin.
    /// Resize: cursor position plus the geometry offset at grab time.
    pub grab_x: f64,
    pub grab_y: f64,
    /// Window geometry captured when the grab began.
    pub geometry: Rectangle,
    pub edges: ResizeEdges,
    /// View position when the grab began.
    pub origin: (i32, i32),
}

impl Grab {
    pub fn grab_width(&self) -> u32 {
        self.geometry.width
    }

    pub fn grab_height(&self) -> u32 {
        self.geometry.height
    }
}

#[derive(Debug)]
pub struct CursorState {
    grab: Option<Grab>,
    min_width: u32,
    min_height: u32,
}

impl Default for CursorState {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl CursorState {
    /// `min_width`/`min_height` bound the size a resize can shrink a view to.
    pub fn new(min_width: u32, min_height: u32) -> Self {
        Self {
            grab: None,
            min_width: min_width.max(1),
            min_height: min_height.max(1),
        }
    }

    pub fn mode(&self) -> CursorMode {
        match self.grab.as_ref().map(|g| g.kind) {
            None => CursorMode::Passthrough,
            Some(GrabKind::Move) => CursorMode::Move,
            Some(GrabKind::Resize) => CursorMode::Resize,
        }
    }

    pub fn grab(&self) -> Option<&Grab> {
        self.grab.as_ref()
    }

    pub fn grabbed_view(&self) -> Option<ViewId> {
        self.grab.as_ref().map(|g| g.view)
    }

    /// Start a move or resize of `view`.
    ///
    /// Only a view whose toplevel surface currently holds pointer focus may
    /// start a grab; anything else is rejected without touching the state.
    pub fn begin_interactive<B>(
        &mut self,
        registry: &ViewRegistry,
        backend: &B,
        view: ViewId,
        kind: GrabKind,
        edges: ResizeEdges,
    ) -> KwmResult<()>
    where
        B: ShellBackend + SeatBackend + CursorBackend + ?Sized,
    {
        let Some(v) = registry.get(view) else {
            return Err(KwmError::UnknownView(view));
        };
        if backend.pointer_focus() != Some(v.surface()) {
            return Err(KwmError::UnauthorizedGrab(view));
        }

        let (cx, cy) = backend.position();
        let geometry = backend.geometry(v.surface());
        let (grab_x, grab_y) = match kind {
            GrabKind::Move => (cx - v.x as f64, cy - v.y as f64),
            GrabKind::Resize => (cx + geometry.x as f64, cy + geometry.y as f64),
        };

        self.grab = Some(Grab {
            view,
            kind,
            grab_x,
            grab_y,
            geometry,
            edges,
            origin: v.position(),
        });
        debug!(
            "Began {:?} grab of {} at ({:.1}, {:.1}) edges={:?}",
            kind, view, cx, cy, edges
        );
        Ok(())
    }

    /// Feed a cursor position to the active grab.
    ///
    /// Returns false in passthrough mode, meaning the caller routes the motion
    /// to clients instead.
    pub fn motion<B>(&mut self, registry: &mut ViewRegistry, backend: &mut B, cx: f64, cy: f64) -> bool
    where
        B: ShellBackend + ?Sized,
    {
        let Some(grab) = self.grab.as_ref() else {
            return false;
        };
        let Some(view) = registry.get_mut(grab.view) else {
            // The registry and the grab are updated together on destroy, so
            // this only happens if a caller bypassed `cancel_for`.
            self.grab = None;
            return false;
        };

        match grab.kind {
            GrabKind::Move => {
                let x = (cx - grab.grab_x) as i32;
                let y = (cy - grab.grab_y) as i32;
                view.set_position(x, y);
                trace!("Moved {} to ({}, {})", grab.view, x, y);
            }
            GrabKind::Resize => {
                let (rect, surface) = (self.resize_geometry(grab, cx, cy), view.surface());
                view.set_position(rect.x, rect.y);
                backend.set_size(surface, rect.width, rect.height);
                trace!("Resized {} to {:?}", grab.view, rect);
            }
        }
        true
    }

    /// New view position and size for a resize grab with the cursor at
    /// `(cx, cy)`. The edges opposite the dragged ones stay fixed.
    fn resize_geometry(&self, grab: &Grab, cx: f64, cy: f64) -> Rectangle {
        let dx = cx - (grab.grab_x - grab.geometry.x as f64);
        let dy = cy - (grab.grab_y - grab.geometry.y as f64);
        let (w0, h0) = (grab.geometry.width as f64, grab.geometry.height as f64);
        let (x0, y0) = grab.origin;

        let width = if grab.edges.contains(ResizeEdges::RIGHT) {
            w0 + dx
        } else if grab.edges.contains(ResizeEdges::LEFT) {
            w0 - dx
        } else {
            w0
        };
        let height = if grab.edges.contains(ResizeEdges::BOTTOM) {
            h0 + dy
        } else if grab.edges.contains(ResizeEdges::TOP) {
            h0 - dy
        } else {
            h0
        };

        let width = width.round().max(self.min_width as f64) as u32;
        let height = height.round().max(self.min_height as f64) as u32;

        let x = if grab.edges.contains(ResizeEdges::LEFT) && !grab.edges.contains(ResizeEdges::RIGHT) {
            x0 + grab.geometry.width as i32 - width as i32
        } else {
            x0
        };
        let y = if grab.edges.contains(ResizeEdges::TOP) && !grab.edges.contains(ResizeEdges::BOTTOM) {
            y0 + grab.geometry.height as i32 - height as i32
        } else {
            y0
        };

        Rectangle::new(x, y, width, height)
    }

    /// Leave any interactive mode. Called on every button release.
    pub fn end(&mut self) {
        if let Some(grab) = self.grab.take() {
            debug!("Ended {:?} grab of {}", grab.kind, grab.view);
        }
    }

    /// Drop the grab if it targets `view`. Returns true if a grab was dropped.
    pub fn cancel_for(&mut self, view: ViewId) -> bool {
        if self.grabbed_view() == Some(view) {
            self.grab = None;
            debug!("Cancelled grab of destroyed {}", view);
            return true;
        }
        false
    }
}
