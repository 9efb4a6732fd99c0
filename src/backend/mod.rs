//! Backend collaborator interfaces
//!
//! The core never talks to a display server, renderer or input stack directly.
//! A backend adapter implements the traits below and turns whatever callbacks
//! its stack produces into [`BackendEvent`]s, which are handed to
//! [`Compositor::dispatch`](crate::compositor::Compositor::dispatch) one at a
//! time on the event loop thread.

pub mod headless;
pub mod layout;
pub mod replay;

pub use headless::HeadlessBackend;
pub use layout::OutputLayout;

use crate::bindings::ModifierMask;
use crate::cursor::ResizeEdges;
use crate::view::Rectangle;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use xkbcommon::xkb::Keysym;

/// Opaque handle to a client surface, minted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// Opaque handle to a connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub u64);

/// Opaque handle to a display output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputId(pub u64);

/// Opaque handle to an input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyState {
    Released,
    Pressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonState {
    Released,
    Pressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisOrientation {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputDeviceKind {
    Keyboard,
    Pointer,
    Touch,
    Tablet,
    Switch,
}

bitflags! {
    /// `wl_seat` capabilities advertised to clients.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SeatCapabilities: u32 {
        const POINTER = 1;
        const KEYBOARD = 2;
    }
}

/// Result of a surface-tree hit test, relative to the hit surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub surface: SurfaceId,
    pub sx: f64,
    pub sy: f64,
}

/// Window-shell side of the protocol (xdg-shell in a Wayland backend).
pub trait ShellBackend {
    /// Hit test a toplevel's surface tree, including popups, at
    /// toplevel-relative coordinates.
    fn surface_at(&self, toplevel: SurfaceId, sx: f64, sy: f64) -> Option<SurfaceHit>;

    /// Window geometry of a toplevel, relative to its surface origin.
    fn geometry(&self, toplevel: SurfaceId) -> Rectangle;

    /// Mark a toplevel (de)activated so the client repaints its decorations.
    fn set_activated(&mut self, toplevel: SurfaceId, activated: bool);

    /// Send a configure with a new size.
    fn set_size(&mut self, toplevel: SurfaceId, width: u32, height: u32);

    fn set_server_side_decoration(&mut self, toplevel: SurfaceId, server_side: bool);

    /// Politely ask the client to close the toplevel.
    fn send_close(&mut self, toplevel: SurfaceId);
}

/// Input seat: one keyboard and one pointer focus.
pub trait SeatBackend {
    fn keyboard_focus(&self) -> Option<SurfaceId>;
    fn pointer_focus(&self) -> Option<SurfaceId>;
    fn pointer_focus_client(&self) -> Option<ClientId>;

    /// Modifiers currently held on the seat keyboard.
    fn modifiers(&self) -> ModifierMask;

    fn set_keyboard(&mut self, device: DeviceId);
    fn set_keyboard_repeat(&mut self, device: DeviceId, rate: u32, delay: u32);
    fn set_capabilities(&mut self, capabilities: SeatCapabilities);

    /// Move keyboard focus, replaying pressed keys and modifier state.
    fn keyboard_notify_enter(&mut self, surface: SurfaceId);
    fn keyboard_notify_key(&mut self, time_msec: u32, keycode: u32, state: KeyState);
    fn keyboard_notify_modifiers(&mut self, modifiers: ModifierMask);

    fn pointer_notify_enter(&mut self, surface: SurfaceId, sx: f64, sy: f64);
    fn pointer_notify_motion(&mut self, time_msec: u32, sx: f64, sy: f64);
    fn pointer_notify_button(&mut self, time_msec: u32, button: u32, state: ButtonState);
    fn pointer_notify_axis(&mut self, time_msec: u32, orientation: AxisOrientation, delta: f64);
    fn pointer_notify_frame(&mut self);
    fn pointer_clear_focus(&mut self);
}

/// On-screen cursor, constrained to the output layout.
pub trait CursorBackend {
    /// Cursor position in layout coordinates.
    fn position(&self) -> (f64, f64);

    /// Apply a relative delta, clamped to the layout.
    fn move_relative(&mut self, device: DeviceId, dx: f64, dy: f64);

    /// Warp to a normalized `[0, 1]` position across the layout.
    fn warp_absolute(&mut self, device: DeviceId, x: f64, y: f64);

    /// Load the cursor theme at `size` pixels. Named images come from it.
    fn load_theme(&mut self, size: u32);

    /// Show a named image from the cursor theme.
    fn set_image(&mut self, name: &str);

    /// Show a client-provided cursor surface, or hide the cursor with `None`.
    fn set_surface(&mut self, surface: Option<SurfaceId>, hotspot_x: i32, hotspot_y: i32);

    fn attach_device(&mut self, device: DeviceId);
}

/// Everything the compositor core drives.
pub trait Backend: ShellBackend + SeatBackend + CursorBackend {
    /// Add an output to the right of the existing ones.
    fn add_output(&mut self, output: OutputId, width: u32, height: u32);

    /// Output containing the layout point, if any.
    fn output_at(&self, x: f64, y: f64) -> Option<OutputId>;

    /// Name of the listening socket, exported to children as `WAYLAND_DISPLAY`.
    fn socket_name(&self) -> &str;

    /// Ask the event loop to stop after the current event.
    fn terminate(&mut self);
}

/// Events produced by the backend adapter, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    NewOutput {
        output: OutputId,
        width: u32,
        height: u32,
    },
    NewInput {
        device: DeviceId,
        kind: InputDeviceKind,
    },
    NewToplevel {
        surface: SurfaceId,
    },
    Map {
        surface: SurfaceId,
    },
    Unmap {
        surface: SurfaceId,
    },
    Destroy {
        surface: SurfaceId,
    },
    NewDecoration {
        surface: SurfaceId,
    },
    RequestMove {
        surface: SurfaceId,
    },
    RequestResize {
        surface: SurfaceId,
        edges: ResizeEdges,
    },
    RequestSetCursor {
        client: ClientId,
        surface: Option<SurfaceId>,
        hotspot_x: i32,
        hotspot_y: i32,
    },
    PointerMotion {
        device: DeviceId,
        time_msec: u32,
        dx: f64,
        dy: f64,
    },
    PointerMotionAbsolute {
        device: DeviceId,
        time_msec: u32,
        x: f64,
        y: f64,
    },
    PointerButton {
        time_msec: u32,
        button: u32,
        state: ButtonState,
    },
    PointerAxis {
        time_msec: u32,
        orientation: AxisOrientation,
        delta: f64,
    },
    PointerFrame,
    KeyboardKey {
        device: DeviceId,
        time_msec: u32,
        keycode: u32,
        state: KeyState,
        /// Symbols the keymap resolves for this keycode.
        syms: Vec<Keysym>,
    },
    KeyboardModifiers {
        device: DeviceId,
        modifiers: ModifierMask,
    },
}
