//! Core compositor implementation
//!
//! `Compositor` owns the view registry, the cursor state machine and the key
//! binding table, and drives a [`Backend`]. Every backend event goes through
//! [`Compositor::dispatch`], which runs to completion before the next event is
//! looked at.
//!
//! Keyboard events are offered to the binding table first and forwarded to the
//! focused client when nothing matches. Pointer events go to the active grab
//! if there is one, otherwise to the view under the cursor.

use anyhow::Result;
use log::{debug, info, trace, warn};

use crate::backend::{
    AxisOrientation, Backend, BackendEvent, ButtonState, ClientId, DeviceId, InputDeviceKind,
    KeyState, OutputId, SeatCapabilities, SurfaceId,
};
use crate::bindings::{Action, KeybindingTable, ModifierMask};
use crate::config::KwmConfig;
use crate::cursor::{CursorState, GrabKind, ResizeEdges};
use crate::error::{KwmError, KwmResult};
use crate::focus;
use crate::launcher::{Launcher, ProcessLauncher};
use crate::view::{ViewId, ViewRegistry};
use xkbcommon::xkb::Keysym;

/// Policy knobs taken from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositorSettings {
    /// Held modifier that turns key presses into binding lookups and button
    /// presses into move grabs.
    pub intercept: ModifierMask,
    pub default_cursor: String,
    /// Cursor theme size in pixels.
    pub cursor_size: u32,
    pub server_side_decorations: bool,
    pub keyboard_repeat_rate: u32,
    pub keyboard_repeat_delay: u32,
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self::from_config(&KwmConfig::default())
    }
}

impl CompositorSettings {
    pub fn from_config(config: &KwmConfig) -> Self {
        Self {
            intercept: config.intercept_modifier(),
            default_cursor: config.cursor.default_image.clone(),
            cursor_size: config.cursor.size,
            server_side_decorations: config.window.server_side_decorations,
            keyboard_repeat_rate: config.input.keyboard_repeat_rate,
            keyboard_repeat_delay: config.input.keyboard_repeat_delay,
            min_width: config.window.min_width,
            min_height: config.window.min_height,
        }
    }
}

/// Main compositor struct that owns all window-management state
pub struct Compositor<B: Backend, L: Launcher = ProcessLauncher> {
    backend: B,
    launcher: L,
    settings: CompositorSettings,
    bindings: KeybindingTable,

    views: ViewRegistry,
    cursor: CursorState,

    keyboards: Vec<DeviceId>,
    outputs: Vec<OutputId>,
    shutdown_requested: bool,
}

impl<B: Backend, L: Launcher> Compositor<B, L> {
    pub fn new(backend: B, launcher: L, bindings: KeybindingTable, settings: CompositorSettings) -> Self {
        let cursor = CursorState::new(settings.min_width, settings.min_height);
        Self {
            backend,
            launcher,
            settings,
            bindings,
            views: ViewRegistry::new(),
            cursor,
            keyboards: Vec::new(),
            outputs: Vec::new(),
            shutdown_requested: false,
        }
    }

    /// Build a compositor from a validated configuration.
    pub fn from_config(backend: B, launcher: L, config: &KwmConfig) -> Result<Self> {
        let bindings = config.keybinding_table()?;
        Ok(Self::new(
            backend,
            launcher,
            bindings,
            CompositorSettings::from_config(config),
        ))
    }

    /// Finish startup once outputs have been announced: fail if there is
    /// nothing to display on, load the cursor theme, then run the startup
    /// command.
    pub fn start(&mut self, startup_command: Option<&str>) -> KwmResult<()> {
        if self.outputs.is_empty() {
            return Err(KwmError::Initialization(
                "backend reported no outputs".to_string(),
            ));
        }

        self.backend.load_theme(self.settings.cursor_size);

        if let Some(command) = startup_command {
            let argv = ["/bin/sh", "-c", command].map(String::from);
            if let Err(e) = self.launcher.spawn(&argv) {
                warn!("⚠️ Startup command failed: {}", e);
            }
        }

        info!(
            "Running compositor on WAYLAND_DISPLAY={}",
            self.backend.socket_name()
        );
        Ok(())
    }

    /// Process one backend event to completion.
    pub fn dispatch(&mut self, event: BackendEvent) {
        trace!("Dispatching {:?}", event);
        match event {
            BackendEvent::NewOutput {
                output,
                width,
                height,
            } => self.handle_new_output(output, width, height),
            BackendEvent::NewInput { device, kind } => self.handle_new_input(device, kind),
            BackendEvent::NewToplevel { surface } => {
                self.views.register(surface);
            }
            BackendEvent::Map { surface } => self.handle_map(surface),
            BackendEvent::Unmap { surface } => self.handle_unmap(surface),
            BackendEvent::Destroy { surface } => self.handle_destroy(surface),
            BackendEvent::NewDecoration { surface } => self.handle_new_decoration(surface),
            BackendEvent::RequestMove { surface } => {
                self.handle_grab_request(surface, GrabKind::Move, ResizeEdges::empty())
            }
            BackendEvent::RequestResize { surface, edges } => {
                self.handle_grab_request(surface, GrabKind::Resize, edges)
            }
            BackendEvent::RequestSetCursor {
                client,
                surface,
                hotspot_x,
                hotspot_y,
            } => self.handle_request_set_cursor(client, surface, hotspot_x, hotspot_y),
            BackendEvent::PointerMotion {
                device,
                time_msec,
                dx,
                dy,
            } => {
                self.backend.move_relative(device, dx, dy);
                self.process_cursor_motion(time_msec);
            }
            BackendEvent::PointerMotionAbsolute {
                device,
                time_msec,
                x,
                y,
            } => {
                self.backend.warp_absolute(device, x, y);
                self.process_cursor_motion(time_msec);
            }
            BackendEvent::PointerButton {
                time_msec,
                button,
                state,
            } => self.handle_cursor_button(time_msec, button, state),
            BackendEvent::PointerAxis {
                time_msec,
                orientation,
                delta,
            } => self.handle_cursor_axis(time_msec, orientation, delta),
            BackendEvent::PointerFrame => self.backend.pointer_notify_frame(),
            BackendEvent::KeyboardKey {
                device,
                time_msec,
                keycode,
                state,
                syms,
            } => self.handle_keyboard_key(device, time_msec, keycode, state, &syms),
            BackendEvent::KeyboardModifiers { device, modifiers } => {
                self.backend.set_keyboard(device);
                self.backend.keyboard_notify_modifiers(modifiers);
            }
        }
        self.launcher.reap();
    }

    fn handle_new_output(&mut self, output: OutputId, width: u32, height: u32) {
        if self.outputs.contains(&output) {
            return;
        }
        self.backend.add_output(output, width, height);
        self.outputs.push(output);
        info!("🖥️ New output {:?} {}x{}", output, width, height);
    }

    fn handle_new_input(&mut self, device: DeviceId, kind: InputDeviceKind) {
        match kind {
            InputDeviceKind::Keyboard => {
                self.backend.set_keyboard_repeat(
                    device,
                    self.settings.keyboard_repeat_rate,
                    self.settings.keyboard_repeat_delay,
                );
                self.backend.set_keyboard(device);
                if !self.keyboards.contains(&device) {
                    self.keyboards.push(device);
                }
                debug!("New keyboard {:?}", device);
            }
            InputDeviceKind::Pointer => {
                self.backend.attach_device(device);
                debug!("New pointer {:?}", device);
            }
            other => debug!("Ignoring {:?} device {:?}", other, device),
        }

        // There is always a cursor, even without a pointer device.
        let mut capabilities = SeatCapabilities::POINTER;
        if !self.keyboards.is_empty() {
            capabilities |= SeatCapabilities::KEYBOARD;
        }
        self.backend.set_capabilities(capabilities);
    }

    fn handle_map(&mut self, surface: SurfaceId) {
        let Some(id) = self.views.lookup(surface) else {
            debug!("Map for unknown {}", surface);
            return;
        };
        let output = self
            .views
            .get(id)
            .and_then(|v| self.backend.output_at(v.x as f64, v.y as f64));
        if let Some(view) = self.views.get_mut(id) {
            view.set_mapped(true);
            view.output = output;
        }
        self.focus(Some(id));
    }

    fn handle_unmap(&mut self, surface: SurfaceId) {
        if let Some(view) = self
            .views
            .lookup(surface)
            .and_then(|id| self.views.get_mut(id))
        {
            view.set_mapped(false);
        }
    }

    fn handle_destroy(&mut self, surface: SurfaceId) {
        if let Some(id) = self.views.lookup(surface) {
            self.destroy_view(id);
        }
    }

    /// Remove a view, cancelling any grab on it in the same step.
    pub fn destroy_view(&mut self, id: ViewId) {
        self.cursor.cancel_for(id);
        self.views.unregister(id);
    }

    fn handle_new_decoration(&mut self, surface: SurfaceId) {
        let server_side = self.settings.server_side_decorations;
        if let Some(view) = self
            .views
            .lookup(surface)
            .and_then(|id| self.views.get_mut(id))
        {
            view.server_side_decoration = server_side;
            self.backend.set_server_side_decoration(surface, server_side);
        }
    }

    fn handle_grab_request(&mut self, surface: SurfaceId, kind: GrabKind, edges: ResizeEdges) {
        let Some(id) = self.views.lookup(surface) else {
            return;
        };
        if let Err(e) = self.begin_interactive(id, kind, edges) {
            debug!("{}", e);
        }
    }

    fn handle_request_set_cursor(
        &mut self,
        client: ClientId,
        surface: Option<SurfaceId>,
        hotspot_x: i32,
        hotspot_y: i32,
    ) {
        // Any client may send this; only the one under the pointer is obeyed.
        if self.backend.pointer_focus_client() == Some(client) {
            self.backend.set_surface(surface, hotspot_x, hotspot_y);
        }
    }

    fn process_cursor_motion(&mut self, time_msec: u32) {
        let (cx, cy) = self.backend.position();
        if self.cursor.motion(&mut self.views, &mut self.backend, cx, cy) {
            return;
        }

        match self.views.hit_test(&self.backend, cx, cy) {
            Some(hit) => {
                let focus_changed = self.backend.pointer_focus() != Some(hit.surface);
                self.backend.pointer_notify_enter(hit.surface, hit.sx, hit.sy);
                // Enter already carries the position.
                if !focus_changed {
                    self.backend.pointer_notify_motion(time_msec, hit.sx, hit.sy);
                }
            }
            None => {
                self.backend.set_image(&self.settings.default_cursor);
                self.backend.pointer_clear_focus();
            }
        }
    }

    fn handle_cursor_button(&mut self, time_msec: u32, button: u32, state: ButtonState) {
        let (cx, cy) = self.backend.position();
        let hit = self.views.hit_test(&self.backend, cx, cy);

        if state == ButtonState::Pressed
            && self.backend.modifiers().holds_intercept(self.settings.intercept)
        {
            if let Some(hit) = hit {
                if let Err(e) = self.begin_interactive(hit.view, GrabKind::Move, ResizeEdges::empty()) {
                    debug!("{}", e);
                }
            }
            return;
        }

        self.backend.pointer_notify_button(time_msec, button, state);

        match state {
            ButtonState::Released => self.cursor.end(),
            ButtonState::Pressed => {
                self.focus(hit.map(|h| h.view));
            }
        }
    }

    fn handle_cursor_axis(&mut self, time_msec: u32, orientation: AxisOrientation, delta: f64) {
        self.backend.pointer_notify_axis(time_msec, orientation, delta);
    }

    fn handle_keyboard_key(
        &mut self,
        device: DeviceId,
        time_msec: u32,
        keycode: u32,
        state: KeyState,
        syms: &[Keysym],
    ) {
        let modifiers = self.backend.modifiers();
        let action = self
            .bindings
            .dispatch(
                self.settings.intercept,
                modifiers,
                state == KeyState::Pressed,
                syms,
            )
            .cloned();

        match action {
            Some(action) => {
                debug!("⌨️ {:?}+{:?} -> {}", modifiers, syms, action);
                self.run_action(&action);
            }
            None => {
                self.backend.set_keyboard(device);
                self.backend.keyboard_notify_key(time_msec, keycode, state);
            }
        }
    }

    /// Execute a compositor command.
    pub fn run_action(&mut self, action: &Action) {
        match action {
            Action::Spawn(argv) => {
                if let Err(e) = self.launcher.spawn(argv) {
                    warn!("⚠️ {}", e);
                }
            }
            Action::Shutdown => self.shutdown(),
            Action::CloseFocused => match self.focused_view() {
                Some(id) => {
                    if let Some(surface) = self.views.get(id).map(|v| v.surface()) {
                        info!("Closing {}", id);
                        self.backend.send_close(surface);
                    }
                }
                None => debug!("No focused view to close"),
            },
        }
    }

    /// Give keyboard focus to a view, raising and activating it.
    pub fn focus(&mut self, view: Option<ViewId>) -> bool {
        focus::focus_view(&mut self.views, &mut self.backend, view)
    }

    /// Start an interactive move or resize on behalf of `view`.
    pub fn begin_interactive(&mut self, view: ViewId, kind: GrabKind, edges: ResizeEdges) -> KwmResult<()> {
        self.cursor
            .begin_interactive(&self.views, &self.backend, view, kind, edges)
    }

    /// Signal the event loop to stop. Only the first call reaches the backend.
    pub fn shutdown(&mut self) {
        if self.shutdown_requested {
            return;
        }
        self.shutdown_requested = true;
        info!("👋 Exiting kwm");
        self.backend.terminate();
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown_requested
    }

    pub fn focused_view(&self) -> Option<ViewId> {
        focus::focused_view(&self.views, &self.backend)
    }

    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    /// Direct access for placement policies and tests.
    pub fn views_mut(&mut self) -> &mut ViewRegistry {
        &mut self.views
    }

    pub fn view_for(&self, surface: SurfaceId) -> Option<ViewId> {
        self.views.lookup(surface)
    }

    /// Mapped views back to front, for the renderer.
    pub fn paint_order(&self) -> Vec<ViewId> {
        self.views.paint_order()
    }

    pub fn cursor(&self) -> &CursorState {
        &self.cursor
    }

    pub fn settings(&self) -> &CompositorSettings {
        &self.settings
    }

    pub fn bindings(&self) -> &KeybindingTable {
        &self.bindings
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }
}
