//! In-memory backend
//!
//! Implements every collaborator trait without a display server. Surfaces are
//! plain rectangles, the seat records what it would have sent to clients, and
//! the cursor is clamped to an [`OutputLayout`]. Used by the binary when
//! replaying recorded event streams and throughout the test suite.

use super::{
    AxisOrientation, Backend, ButtonState, ClientId, CursorBackend, DeviceId, KeyState,
    OutputId, OutputLayout, SeatBackend, SeatCapabilities, ShellBackend, SurfaceHit, SurfaceId,
};
use crate::bindings::ModifierMask;
use crate::view::Rectangle;
use log::{debug, trace, warn};
use std::collections::BTreeMap;

/// Something the seat delivered to a client.
#[derive(Debug, Clone, PartialEq)]
pub enum SeatNotification {
    KeyboardEnter(SurfaceId),
    Key {
        surface: Option<SurfaceId>,
        keycode: u32,
        state: KeyState,
    },
    Modifiers(ModifierMask),
    PointerEnter {
        surface: SurfaceId,
        sx: f64,
        sy: f64,
    },
    PointerMotion {
        surface: Option<SurfaceId>,
        sx: f64,
        sy: f64,
    },
    PointerButton {
        surface: Option<SurfaceId>,
        button: u32,
        state: ButtonState,
    },
    PointerAxis {
        surface: Option<SurfaceId>,
        orientation: AxisOrientation,
        delta: f64,
    },
    PointerFrame,
    PointerClear,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CursorImage {
    Named(String),
    Surface {
        surface: SurfaceId,
        hotspot: (i32, i32),
    },
    Hidden,
}

#[derive(Debug, Clone)]
struct HeadlessSurface {
    client: ClientId,
    /// Toplevels: window geometry relative to the surface origin.
    /// Popups: placement relative to the parent toplevel's origin.
    geometry: Rectangle,
    parent: Option<SurfaceId>,
    activated: bool,
    server_side_decoration: bool,
    close_requested: bool,
}

#[derive(Debug)]
pub struct HeadlessBackend {
    next_id: u64,
    socket_name: String,
    surfaces: BTreeMap<SurfaceId, HeadlessSurface>,
    layout: OutputLayout,

    cursor: (f64, f64),
    cursor_image: CursorImage,
    cursor_devices: Vec<DeviceId>,
    cursor_theme_size: Option<u32>,

    keyboard: Option<DeviceId>,
    keyboard_repeat: Option<(u32, u32)>,
    capabilities: SeatCapabilities,
    keyboard_focus: Option<SurfaceId>,
    pointer_focus: Option<SurfaceId>,
    modifiers: ModifierMask,
    notifications: Vec<SeatNotification>,

    terminate_requests: usize,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new("wayland-headless")
    }
}

impl HeadlessBackend {
    pub fn new(socket_name: &str) -> Self {
        Self {
            next_id: 1,
            socket_name: socket_name.to_string(),
            surfaces: BTreeMap::new(),
            layout: OutputLayout::new(),
            cursor: (0.0, 0.0),
            cursor_image: CursorImage::Hidden,
            cursor_devices: Vec::new(),
            cursor_theme_size: None,
            keyboard: None,
            keyboard_repeat: None,
            capabilities: SeatCapabilities::empty(),
            keyboard_focus: None,
            pointer_focus: None,
            modifiers: ModifierMask::empty(),
            notifications: Vec::new(),
            terminate_requests: 0,
        }
    }

    /// A backend with a single output already in the layout.
    pub fn with_output(width: u32, height: u32) -> Self {
        let mut backend = Self::default();
        backend.add_output(OutputId(0), width, height);
        backend
    }

    fn mint(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Create a toplevel surface owned by a fresh client.
    pub fn create_toplevel(&mut self, width: u32, height: u32) -> SurfaceId {
        let client = ClientId(self.mint());
        self.create_toplevel_for(client, width, height)
    }

    pub fn create_toplevel_for(&mut self, client: ClientId, width: u32, height: u32) -> SurfaceId {
        let surface = SurfaceId(self.mint());
        self.insert_toplevel(surface, client, width, height);
        surface
    }

    /// Register a toplevel under a caller-chosen id, as a replayed stream does.
    pub fn insert_toplevel(&mut self, surface: SurfaceId, client: ClientId, width: u32, height: u32) {
        self.next_id = self.next_id.max(surface.0 + 1).max(client.0 + 1);
        self.surfaces.insert(
            surface,
            HeadlessSurface {
                client,
                geometry: Rectangle::new(0, 0, width, height),
                parent: None,
                activated: false,
                server_side_decoration: false,
                close_requested: false,
            },
        );
    }

    /// Attach a popup to `parent`, placed relative to the parent's origin.
    pub fn create_popup(&mut self, parent: SurfaceId, placement: Rectangle) -> Option<SurfaceId> {
        let client = self.surfaces.get(&parent)?.client;
        let surface = SurfaceId(self.mint());
        self.surfaces.insert(
            surface,
            HeadlessSurface {
                client,
                geometry: placement,
                parent: Some(parent),
                activated: false,
                server_side_decoration: false,
                close_requested: false,
            },
        );
        Some(surface)
    }

    /// Forget a surface and its popups, dropping any focus they held.
    pub fn destroy_surface(&mut self, surface: SurfaceId) {
        let doomed: Vec<SurfaceId> = self
            .surfaces
            .iter()
            .filter(|(id, s)| **id == surface || s.parent == Some(surface))
            .map(|(id, _)| *id)
            .collect();
        for id in doomed {
            self.surfaces.remove(&id);
            if self.keyboard_focus == Some(id) {
                self.keyboard_focus = None;
            }
            if self.pointer_focus == Some(id) {
                self.pointer_focus = None;
            }
        }
    }

    pub fn surface_client(&self, surface: SurfaceId) -> Option<ClientId> {
        self.surfaces.get(&surface).map(|s| s.client)
    }

    pub fn is_activated(&self, surface: SurfaceId) -> bool {
        self.surfaces.get(&surface).map_or(false, |s| s.activated)
    }

    pub fn is_server_side_decorated(&self, surface: SurfaceId) -> bool {
        self.surfaces
            .get(&surface)
            .map_or(false, |s| s.server_side_decoration)
    }

    pub fn close_requested(&self, surface: SurfaceId) -> bool {
        self.surfaces.get(&surface).map_or(false, |s| s.close_requested)
    }

    /// Keyboard device state, as the device would report it.
    pub fn set_modifiers(&mut self, modifiers: ModifierMask) {
        self.modifiers = modifiers;
    }

    /// Place the cursor directly, clamped to the layout.
    pub fn warp_to(&mut self, x: f64, y: f64) {
        self.cursor = self.layout.clamp(x, y);
    }

    pub fn notifications(&self) -> &[SeatNotification] {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<SeatNotification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn keyboard_enter_count(&self, surface: SurfaceId) -> usize {
        self.notifications
            .iter()
            .filter(|n| **n == SeatNotification::KeyboardEnter(surface))
            .count()
    }

    pub fn cursor_image(&self) -> &CursorImage {
        &self.cursor_image
    }

    pub fn cursor_devices(&self) -> &[DeviceId] {
        &self.cursor_devices
    }

    /// Size the cursor theme was loaded at, once `load_theme` ran.
    pub fn cursor_theme_size(&self) -> Option<u32> {
        self.cursor_theme_size
    }

    pub fn capabilities(&self) -> SeatCapabilities {
        self.capabilities
    }

    pub fn keyboard_device(&self) -> Option<DeviceId> {
        self.keyboard
    }

    pub fn keyboard_repeat(&self) -> Option<(u32, u32)> {
        self.keyboard_repeat
    }

    pub fn terminate_requests(&self) -> usize {
        self.terminate_requests
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }
}

impl ShellBackend for HeadlessBackend {
    fn surface_at(&self, toplevel: SurfaceId, sx: f64, sy: f64) -> Option<SurfaceHit> {
        // Popups sit above their parent; newest first.
        let popup = self
            .surfaces
            .iter()
            .rev()
            .filter(|(_, s)| s.parent == Some(toplevel))
            .find(|(_, s)| s.geometry.contains(sx, sy));
        if let Some((id, s)) = popup {
            return Some(SurfaceHit {
                surface: *id,
                sx: sx - s.geometry.x as f64,
                sy: sy - s.geometry.y as f64,
            });
        }

        let s = self.surfaces.get(&toplevel)?;
        let bounds = Rectangle::new(0, 0, s.geometry.width, s.geometry.height);
        bounds.contains(sx, sy).then_some(SurfaceHit {
            surface: toplevel,
            sx,
            sy,
        })
    }

    fn geometry(&self, toplevel: SurfaceId) -> Rectangle {
        self.surfaces
            .get(&toplevel)
            .map(|s| s.geometry)
            .unwrap_or_default()
    }

    fn set_activated(&mut self, toplevel: SurfaceId, activated: bool) {
        if let Some(s) = self.surfaces.get_mut(&toplevel) {
            s.activated = activated;
            trace!("{} activated={}", toplevel, activated);
        }
    }

    fn set_size(&mut self, toplevel: SurfaceId, width: u32, height: u32) {
        if let Some(s) = self.surfaces.get_mut(&toplevel) {
            s.geometry.width = width;
            s.geometry.height = height;
        }
    }

    fn set_server_side_decoration(&mut self, toplevel: SurfaceId, server_side: bool) {
        if let Some(s) = self.surfaces.get_mut(&toplevel) {
            s.server_side_decoration = server_side;
        }
    }

    fn send_close(&mut self, toplevel: SurfaceId) {
        match self.surfaces.get_mut(&toplevel) {
            Some(s) => s.close_requested = true,
            None => warn!("close requested for unknown {}", toplevel),
        }
    }
}

impl SeatBackend for HeadlessBackend {
    fn keyboard_focus(&self) -> Option<SurfaceId> {
        self.keyboard_focus
    }

    fn pointer_focus(&self) -> Option<SurfaceId> {
        self.pointer_focus
    }

    fn pointer_focus_client(&self) -> Option<ClientId> {
        self.pointer_focus.and_then(|s| self.surface_client(s))
    }

    fn modifiers(&self) -> ModifierMask {
        self.modifiers
    }

    fn set_keyboard(&mut self, device: DeviceId) {
        self.keyboard = Some(device);
    }

    fn set_keyboard_repeat(&mut self, _device: DeviceId, rate: u32, delay: u32) {
        self.keyboard_repeat = Some((rate, delay));
    }

    fn set_capabilities(&mut self, capabilities: SeatCapabilities) {
        self.capabilities = capabilities;
    }

    fn keyboard_notify_enter(&mut self, surface: SurfaceId) {
        self.keyboard_focus = Some(surface);
        self.notifications.push(SeatNotification::KeyboardEnter(surface));
    }

    fn keyboard_notify_key(&mut self, _time_msec: u32, keycode: u32, state: KeyState) {
        self.notifications.push(SeatNotification::Key {
            surface: self.keyboard_focus,
            keycode,
            state,
        });
    }

    fn keyboard_notify_modifiers(&mut self, modifiers: ModifierMask) {
        self.modifiers = modifiers;
        self.notifications.push(SeatNotification::Modifiers(modifiers));
    }

    fn pointer_notify_enter(&mut self, surface: SurfaceId, sx: f64, sy: f64) {
        if self.pointer_focus == Some(surface) {
            return;
        }
        self.pointer_focus = Some(surface);
        self.notifications
            .push(SeatNotification::PointerEnter { surface, sx, sy });
    }

    fn pointer_notify_motion(&mut self, _time_msec: u32, sx: f64, sy: f64) {
        self.notifications.push(SeatNotification::PointerMotion {
            surface: self.pointer_focus,
            sx,
            sy,
        });
    }

    fn pointer_notify_button(&mut self, _time_msec: u32, button: u32, state: ButtonState) {
        self.notifications.push(SeatNotification::PointerButton {
            surface: self.pointer_focus,
            button,
            state,
        });
    }

    fn pointer_notify_axis(&mut self, _time_msec: u32, orientation: AxisOrientation, delta: f64) {
        self.notifications.push(SeatNotification::PointerAxis {
            surface: self.pointer_focus,
            orientation,
            delta,
        });
    }

    fn pointer_notify_frame(&mut self) {
        self.notifications.push(SeatNotification::PointerFrame);
    }

    fn pointer_clear_focus(&mut self) {
        if self.pointer_focus.take().is_some() {
            self.notifications.push(SeatNotification::PointerClear);
        }
    }
}

impl CursorBackend for HeadlessBackend {
    fn position(&self) -> (f64, f64) {
        self.cursor
    }

    fn move_relative(&mut self, _device: DeviceId, dx: f64, dy: f64) {
        let (x, y) = self.cursor;
        self.cursor = self.layout.clamp(x + dx, y + dy);
    }

    fn warp_absolute(&mut self, _device: DeviceId, x: f64, y: f64) {
        let extents = self.layout.extents();
        let lx = extents.x as f64 + x.clamp(0.0, 1.0) * extents.width as f64;
        let ly = extents.y as f64 + y.clamp(0.0, 1.0) * extents.height as f64;
        self.cursor = self.layout.clamp(lx, ly);
    }

    fn load_theme(&mut self, size: u32) {
        debug!("Headless cursor theme at {}px", size);
        self.cursor_theme_size = Some(size);
    }

    fn set_image(&mut self, name: &str) {
        self.cursor_image = CursorImage::Named(name.to_string());
    }

    fn set_surface(&mut self, surface: Option<SurfaceId>, hotspot_x: i32, hotspot_y: i32) {
        self.cursor_image = match surface {
            Some(surface) => CursorImage::Surface {
                surface,
                hotspot: (hotspot_x, hotspot_y),
            },
            None => CursorImage::Hidden,
        };
    }

    fn attach_device(&mut self, device: DeviceId) {
        if !self.cursor_devices.contains(&device) {
            self.cursor_devices.push(device);
        }
    }
}

impl Backend for HeadlessBackend {
    fn add_output(&mut self, output: OutputId, width: u32, height: u32) {
        let rect = self.layout.add_auto(output, width, height);
        debug!("Headless output {:?} at {:?}", output, rect);
    }

    fn output_at(&self, x: f64, y: f64) -> Option<OutputId> {
        self.layout.output_at(x, y)
    }

    fn socket_name(&self) -> &str {
        &self.socket_name
    }

    fn terminate(&mut self) {
        self.terminate_requests += 1;
    }
}
