//! View registry and stacking order
//!
//! Views live in an arena addressed by generation-checked [`ViewId`]s. Removing
//! a view bumps its slot's generation, so any id still held elsewhere simply
//! stops resolving instead of pointing at a reused or freed view.
//!
//! The stacking order is kept front-to-back: the first entry is the topmost
//! view. Hit testing walks it front to back; painting walks it back to front.

use crate::backend::{OutputId, ShellBackend, SurfaceHit, SurfaceId};
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Axis-aligned rectangle in layout coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rectangle {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Half-open containment: the right and bottom edges are outside.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x as f64
            && py >= self.y as f64
            && px < self.x as f64 + self.width as f64
            && py < self.y as f64 + self.height as f64
    }

    pub fn union(&self, other: &Rectangle) -> Rectangle {
        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = (self.x + self.width as i32).max(other.x + other.width as i32);
        let y2 = (self.y + self.height as i32).max(other.y + other.height as i32);
        Rectangle::new(x1, y1, (x2 - x1) as u32, (y2 - y1) as u32)
    }

    /// Nearest point inside the rectangle.
    pub fn closest_point(&self, px: f64, py: f64) -> (f64, f64) {
        let max_x = (self.x as f64 + self.width as f64 - 1.0).max(self.x as f64);
        let max_y = (self.y as f64 + self.height as f64 - 1.0).max(self.y as f64);
        (px.clamp(self.x as f64, max_x), py.clamp(self.y as f64, max_y))
    }
}

/// Stable handle to a view in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId {
    index: u32,
    generation: u32,
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}.{}", self.index, self.generation)
    }
}

/// One application window.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    surface: SurfaceId,
    /// Position of the surface origin in layout coordinates.
    pub x: i32,
    pub y: i32,
    mapped: bool,
    /// Output the view was last mapped on. Informational only.
    pub output: Option<OutputId>,
    pub server_side_decoration: bool,
}

impl View {
    fn new(surface: SurfaceId) -> Self {
        Self {
            surface,
            x: 0,
            y: 0,
            mapped: false,
            output: None,
            server_side_decoration: false,
        }
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    pub fn set_mapped(&mut self, mapped: bool) {
        self.mapped = mapped;
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn set_position(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
    }
}

/// A view under a layout point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewHit {
    pub view: ViewId,
    pub surface: SurfaceId,
    pub sx: f64,
    pub sy: f64,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    view: Option<View>,
}

#[derive(Debug, Default)]
pub struct ViewRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    /// Front-to-back; index 0 is the topmost view.
    stacking: VecDeque<ViewId>,
    by_surface: HashMap<SurfaceId, ViewId>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unmapped view for `surface` at the front of the stacking
    /// order. A surface that already has a view returns the existing id.
    pub fn register(&mut self, surface: SurfaceId) -> ViewId {
        if let Some(&id) = self.by_surface.get(&surface) {
            return id;
        }

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.view = Some(View::new(surface));
                ViewId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    view: Some(View::new(surface)),
                });
                ViewId {
                    index,
                    generation: 0,
                }
            }
        };

        self.stacking.push_front(id);
        self.by_surface.insert(surface, id);
        debug!("Registered {} for {}", id, surface);
        id
    }

    /// Remove a view and invalidate its id. Unknown ids are ignored.
    pub fn unregister(&mut self, id: ViewId) -> Option<View> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let view = slot.view.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.stacking.retain(|&other| other != id);
        self.by_surface.remove(&view.surface);
        debug!("Unregistered {} ({})", id, view.surface);
        Some(view)
    }

    /// Move a view to the front. Returns false for unknown ids.
    pub fn raise(&mut self, id: ViewId) -> bool {
        if !self.contains(id) {
            return false;
        }
        if self.stacking.front() != Some(&id) {
            self.stacking.retain(|&other| other != id);
            self.stacking.push_front(id);
        }
        true
    }

    pub fn contains(&self, id: ViewId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: ViewId) -> Option<&View> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.view.as_ref())
    }

    pub fn get_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.view.as_mut())
    }

    /// View owning the given toplevel surface.
    pub fn lookup(&self, surface: SurfaceId) -> Option<ViewId> {
        self.by_surface.get(&surface).copied()
    }

    pub fn len(&self) -> usize {
        self.stacking.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacking.is_empty()
    }

    pub fn front(&self) -> Option<ViewId> {
        self.stacking.front().copied()
    }

    /// Ids front-to-back (topmost first).
    pub fn stacking_order(&self) -> Vec<ViewId> {
        self.stacking.iter().copied().collect()
    }

    /// Mapped views back-to-front; the last one is painted on top.
    pub fn paint_order(&self) -> Vec<ViewId> {
        self.stacking
            .iter()
            .rev()
            .copied()
            .filter(|&id| self.get(id).map_or(false, View::is_mapped))
            .collect()
    }

    /// Find the topmost mapped view with a surface under the layout point.
    pub fn hit_test<S: ShellBackend + ?Sized>(
        &self,
        shell: &S,
        lx: f64,
        ly: f64,
    ) -> Option<ViewHit> {
        self.stacking.iter().find_map(|&id| {
            let view = self.get(id)?;
            if !view.mapped {
                return None;
            }
            let SurfaceHit { surface, sx, sy } =
                shell.surface_at(view.surface, lx - view.x as f64, ly - view.y as f64)?;
            Some(ViewHit {
                view: id,
                surface,
                sx,
                sy,
            })
        })
    }
}
