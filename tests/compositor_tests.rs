//! End-to-end tests for the kwm compositor core
//!
//! These drive `Compositor` through backend events only, using the headless
//! backend, and check what clients would have observed.

use kwm::backend::headless::{CursorImage, SeatNotification};
use kwm::backend::{
    BackendEvent, ButtonState, CursorBackend, DeviceId, HeadlessBackend, InputDeviceKind,
    KeyState, OutputId, SeatBackend, ShellBackend, SurfaceId,
};
use kwm::bindings::{KeybindingTable, ModifierMask};
use kwm::config::BindingConfig;
use kwm::cursor::{CursorMode, ResizeEdges};
use kwm::{Compositor, CompositorSettings, KwmConfig, KwmError, KwmResult, Launcher, ViewId};
use xkbcommon::xkb::Keysym;

const BTN_LEFT: u32 = 0x110;
const BTN_RIGHT: u32 = 0x111;
const KEYBOARD: DeviceId = DeviceId(1);
const POINTER: DeviceId = DeviceId(2);

#[derive(Debug, Default)]
struct RecordingLauncher {
    spawned: Vec<Vec<String>>,
    fail: bool,
}

impl Launcher for RecordingLauncher {
    fn spawn(&mut self, argv: &[String]) -> KwmResult<()> {
        self.spawned.push(argv.to_vec());
        if self.fail {
            return Err(KwmError::Spawn {
                program: argv[0].clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }
        Ok(())
    }
}

type TestCompositor = Compositor<HeadlessBackend, RecordingLauncher>;

fn boot(mut compositor: TestCompositor) -> TestCompositor {
    compositor.dispatch(BackendEvent::NewOutput {
        output: OutputId(0),
        width: 1920,
        height: 1080,
    });
    compositor.dispatch(BackendEvent::NewInput {
        device: KEYBOARD,
        kind: InputDeviceKind::Keyboard,
    });
    compositor.dispatch(BackendEvent::NewInput {
        device: POINTER,
        kind: InputDeviceKind::Pointer,
    });
    compositor.start(None).unwrap();
    compositor
}

fn compositor() -> TestCompositor {
    boot(Compositor::new(
        HeadlessBackend::default(),
        RecordingLauncher::default(),
        KeybindingTable::with_defaults(),
        CompositorSettings::default(),
    ))
}

/// Create, place and map a toplevel.
fn open_window(c: &mut TestCompositor, x: i32, y: i32, width: u32, height: u32) -> (ViewId, SurfaceId) {
    let surface = c.backend_mut().create_toplevel(width, height);
    c.dispatch(BackendEvent::NewToplevel { surface });
    let id = c.view_for(surface).unwrap();
    c.views_mut().get_mut(id).unwrap().set_position(x, y);
    c.dispatch(BackendEvent::Map { surface });
    (id, surface)
}

fn pointer_to(c: &mut TestCompositor, x: f64, y: f64) {
    let (cx, cy) = c.backend().position();
    c.dispatch(BackendEvent::PointerMotion {
        device: POINTER,
        time_msec: 0,
        dx: x - cx,
        dy: y - cy,
    });
}

fn button(c: &mut TestCompositor, button: u32, state: ButtonState) {
    c.dispatch(BackendEvent::PointerButton {
        time_msec: 0,
        button,
        state,
    });
}

fn modifiers(c: &mut TestCompositor, modifiers: ModifierMask) {
    c.dispatch(BackendEvent::KeyboardModifiers {
        device: KEYBOARD,
        modifiers,
    });
}

fn key(c: &mut TestCompositor, keycode: u32, state: KeyState, syms: &[Keysym]) {
    c.dispatch(BackendEvent::KeyboardKey {
        device: KEYBOARD,
        time_msec: 0,
        keycode,
        state,
        syms: syms.to_vec(),
    });
}

fn forwarded_keys(c: &TestCompositor) -> usize {
    c.backend()
        .notifications()
        .iter()
        .filter(|n| matches!(n, SeatNotification::Key { .. }))
        .count()
}

#[test]
fn test_new_views_stack_front_to_back() {
    let mut c = compositor();
    let (v1, _) = open_window(&mut c, 0, 0, 100, 100);
    let (v2, _) = open_window(&mut c, 50, 50, 100, 100);
    let (v3, s3) = open_window(&mut c, 100, 100, 100, 100);

    assert_eq!(c.views().stacking_order(), vec![v3, v2, v1]);
    assert_eq!(c.paint_order(), vec![v1, v2, v3]);
    assert_eq!(c.focused_view(), Some(v3));
    assert!(c.backend().is_activated(s3));
}

#[test]
fn test_click_focuses_and_raises() {
    let mut c = compositor();
    let (v1, s1) = open_window(&mut c, 0, 0, 400, 300);
    let (v2, s2) = open_window(&mut c, 200, 100, 400, 300);
    assert_eq!(c.focused_view(), Some(v2));

    pointer_to(&mut c, 50.0, 50.0);
    button(&mut c, BTN_LEFT, ButtonState::Pressed);

    assert_eq!(c.focused_view(), Some(v1));
    assert_eq!(c.views().stacking_order(), vec![v1, v2]);
    assert!(c.backend().is_activated(s1));
    assert!(!c.backend().is_activated(s2));
    assert!(c.backend().notifications().contains(&SeatNotification::PointerButton {
        surface: Some(s1),
        button: BTN_LEFT,
        state: ButtonState::Pressed,
    }));

    // Release is forwarded but does not move focus.
    pointer_to(&mut c, 500.0, 350.0);
    button(&mut c, BTN_LEFT, ButtonState::Released);
    assert_eq!(c.focused_view(), Some(v1));
}

#[test]
fn test_click_on_empty_space_keeps_focus() {
    let mut c = compositor();
    let (v1, _) = open_window(&mut c, 0, 0, 100, 100);
    pointer_to(&mut c, 1000.0, 1000.0);
    button(&mut c, BTN_LEFT, ButtonState::Pressed);
    assert_eq!(c.focused_view(), Some(v1));
}

#[test]
fn test_overlap_hits_topmost() {
    let mut c = compositor();
    let (_, s1) = open_window(&mut c, 0, 0, 400, 300);
    let (_, s2) = open_window(&mut c, 200, 100, 400, 300);

    pointer_to(&mut c, 250.0, 150.0);
    assert_eq!(c.backend().pointer_focus(), Some(s2));

    pointer_to(&mut c, 100.0, 150.0);
    assert_eq!(c.backend().pointer_focus(), Some(s1));
}

#[test]
fn test_enter_then_motion_then_clear() {
    let mut c = compositor();
    let (_, s1) = open_window(&mut c, 100, 100, 200, 200);
    c.backend_mut().take_notifications();

    pointer_to(&mut c, 110.0, 120.0);
    assert_eq!(
        c.backend_mut().take_notifications(),
        vec![SeatNotification::PointerEnter {
            surface: s1,
            sx: 10.0,
            sy: 20.0
        }]
    );

    pointer_to(&mut c, 150.0, 150.0);
    assert_eq!(
        c.backend_mut().take_notifications(),
        vec![SeatNotification::PointerMotion {
            surface: Some(s1),
            sx: 50.0,
            sy: 50.0
        }]
    );

    pointer_to(&mut c, 1000.0, 900.0);
    assert_eq!(
        c.backend_mut().take_notifications(),
        vec![SeatNotification::PointerClear]
    );
    assert_eq!(c.backend().pointer_focus(), None);
    assert_eq!(
        c.backend().cursor_image(),
        &CursorImage::Named("left_ptr".to_string())
    );
}

#[test]
fn test_cursor_is_clamped_to_layout() {
    let mut c = compositor();
    pointer_to(&mut c, -50.0, 5000.0);
    assert_eq!(c.backend().position(), (0.0, 1079.0));
}

#[test]
fn test_modifier_drag_moves_view() {
    let mut c = compositor();
    let (v, s) = open_window(&mut c, 50, 30, 400, 300);

    pointer_to(&mut c, 100.0, 80.0);
    modifiers(&mut c, ModifierMask::ALT);
    c.backend_mut().take_notifications();

    button(&mut c, BTN_LEFT, ButtonState::Pressed);
    assert_eq!(c.cursor().mode(), CursorMode::Move);
    let grab = c.cursor().grab().unwrap();
    assert_eq!((grab.grab_x, grab.grab_y), (50.0, 50.0));
    // The press is consumed by the compositor.
    assert!(c.backend().notifications().is_empty());

    pointer_to(&mut c, 130.0, 80.0);
    assert_eq!(c.views().get(v).unwrap().position(), (80, 30));
    assert!(c.backend().notifications().is_empty());

    button(&mut c, BTN_LEFT, ButtonState::Released);
    assert_eq!(c.cursor().mode(), CursorMode::Passthrough);
    assert!(c.cursor().grab().is_none());
    assert_eq!(
        c.backend().notifications(),
        &[SeatNotification::PointerButton {
            surface: Some(s),
            button: BTN_LEFT,
            state: ButtonState::Released,
        }]
    );
}

#[test]
fn test_modifier_press_on_empty_space_does_nothing() {
    let mut c = compositor();
    open_window(&mut c, 0, 0, 100, 100);
    pointer_to(&mut c, 1500.0, 900.0);
    modifiers(&mut c, ModifierMask::ALT);
    button(&mut c, BTN_LEFT, ButtonState::Pressed);
    assert_eq!(c.cursor().mode(), CursorMode::Passthrough);
}

#[test]
fn test_empty_intercept_never_starts_a_grab() {
    let mut c = boot(Compositor::new(
        HeadlessBackend::default(),
        RecordingLauncher::default(),
        KeybindingTable::with_defaults(),
        CompositorSettings {
            intercept: ModifierMask::empty(),
            ..CompositorSettings::default()
        },
    ));
    let (_, s) = open_window(&mut c, 0, 0, 400, 300);
    pointer_to(&mut c, 100.0, 100.0);
    c.backend_mut().take_notifications();

    button(&mut c, BTN_LEFT, ButtonState::Pressed);
    assert_eq!(c.cursor().mode(), CursorMode::Passthrough);
    assert!(c.cursor().grab().is_none());
    assert!(c.backend().notifications().contains(&SeatNotification::PointerButton {
        surface: Some(s),
        button: BTN_LEFT,
        state: ButtonState::Pressed,
    }));
}

#[test]
fn test_request_move_requires_pointer_focus() {
    let mut c = compositor();
    let (_, s1) = open_window(&mut c, 0, 0, 300, 300);
    let (_, s2) = open_window(&mut c, 800, 0, 300, 300);

    pointer_to(&mut c, 10.0, 10.0);
    c.dispatch(BackendEvent::RequestMove { surface: s2 });
    assert_eq!(c.cursor().mode(), CursorMode::Passthrough);
    assert!(c.cursor().grab().is_none());

    c.dispatch(BackendEvent::RequestMove { surface: s1 });
    assert_eq!(c.cursor().mode(), CursorMode::Move);
}

#[test]
fn test_client_resize_bottom_right() {
    let mut c = compositor();
    let (v, s) = open_window(&mut c, 100, 100, 400, 300);

    pointer_to(&mut c, 499.0, 399.0);
    c.dispatch(BackendEvent::RequestResize {
        surface: s,
        edges: ResizeEdges::BOTTOM | ResizeEdges::RIGHT,
    });
    assert_eq!(c.cursor().mode(), CursorMode::Resize);

    pointer_to(&mut c, 549.0, 449.0);
    let geometry = c.backend().geometry(s);
    assert_eq!((geometry.width, geometry.height), (450, 350));
    assert_eq!(c.views().get(v).unwrap().position(), (100, 100));

    button(&mut c, BTN_LEFT, ButtonState::Released);
    assert_eq!(c.cursor().mode(), CursorMode::Passthrough);
}

#[test]
fn test_client_resize_left_keeps_right_edge() {
    let mut c = compositor();
    let (v, s) = open_window(&mut c, 100, 100, 400, 300);

    pointer_to(&mut c, 101.0, 150.0);
    c.dispatch(BackendEvent::RequestResize {
        surface: s,
        edges: ResizeEdges::LEFT,
    });

    pointer_to(&mut c, 151.0, 150.0);
    assert_eq!(c.backend().geometry(s).width, 350);
    assert_eq!(c.views().get(v).unwrap().position(), (150, 100));

    // Shrinking past the minimum width clamps; the right edge stays at 500.
    pointer_to(&mut c, 700.0, 150.0);
    assert_eq!(c.backend().geometry(s).width, 100);
    assert_eq!(c.views().get(v).unwrap().position(), (400, 100));
    assert_eq!(c.backend().geometry(s).height, 300);
}

#[test]
fn test_any_release_ends_grab() {
    let mut c = compositor();
    let (_, s) = open_window(&mut c, 0, 0, 300, 300);
    pointer_to(&mut c, 10.0, 10.0);
    c.dispatch(BackendEvent::RequestMove { surface: s });
    assert_eq!(c.cursor().mode(), CursorMode::Move);

    button(&mut c, BTN_RIGHT, ButtonState::Released);
    assert_eq!(c.cursor().mode(), CursorMode::Passthrough);

    button(&mut c, BTN_RIGHT, ButtonState::Released);
    assert_eq!(c.cursor().mode(), CursorMode::Passthrough);
}

#[test]
fn test_destroying_grabbed_view_cancels_grab() {
    let mut c = compositor();
    let (v, s) = open_window(&mut c, 0, 0, 300, 300);
    pointer_to(&mut c, 10.0, 10.0);
    c.dispatch(BackendEvent::RequestMove { surface: s });
    assert_eq!(c.cursor().grabbed_view(), Some(v));

    c.backend_mut().destroy_surface(s);
    c.dispatch(BackendEvent::Destroy { surface: s });
    assert_eq!(c.cursor().mode(), CursorMode::Passthrough);
    assert!(!c.views().contains(v));

    // Later events never see the dead view.
    pointer_to(&mut c, 20.0, 20.0);
    assert!(c.views().is_empty());
    assert!(!c.focus(Some(v)));
}

#[test]
fn test_destroy_preserves_remaining_order() {
    let mut c = compositor();
    let (v1, _) = open_window(&mut c, 0, 0, 100, 100);
    let (_, s2) = open_window(&mut c, 0, 0, 100, 100);
    let (v3, _) = open_window(&mut c, 0, 0, 100, 100);

    c.dispatch(BackendEvent::Destroy { surface: s2 });
    assert_eq!(c.views().stacking_order(), vec![v3, v1]);
}

#[test]
fn test_spawn_binding_fires_once_per_press() {
    let mut c = compositor();
    let (_, s) = open_window(&mut c, 0, 0, 100, 100);
    modifiers(&mut c, ModifierMask::ALT);

    key(&mut c, 36, KeyState::Pressed, &[Keysym::Return, Keysym::Return]);
    assert_eq!(c.launcher().spawned, vec![vec!["alacritty".to_string()]]);

    key(&mut c, 36, KeyState::Released, &[Keysym::Return]);
    assert_eq!(c.launcher().spawned.len(), 1);

    // The press was consumed; the release was forwarded.
    let keys: Vec<_> = c
        .backend()
        .notifications()
        .iter()
        .filter(|n| matches!(n, SeatNotification::Key { .. }))
        .cloned()
        .collect();
    assert_eq!(
        keys,
        vec![SeatNotification::Key {
            surface: Some(s),
            keycode: 36,
            state: KeyState::Released,
        }]
    );
}

#[test]
fn test_unbound_keys_are_forwarded() {
    let mut c = compositor();
    let (_, s) = open_window(&mut c, 0, 0, 100, 100);

    key(&mut c, 36, KeyState::Pressed, &[Keysym::Return]);
    assert_eq!(forwarded_keys(&c), 1);

    modifiers(&mut c, ModifierMask::ALT);
    key(&mut c, 53, KeyState::Pressed, &[Keysym::x]);
    assert_eq!(forwarded_keys(&c), 2);

    modifiers(&mut c, ModifierMask::CTRL);
    key(&mut c, 36, KeyState::Pressed, &[Keysym::Return]);
    assert_eq!(forwarded_keys(&c), 3);

    assert!(c.launcher().spawned.is_empty());
    assert_eq!(c.backend().keyboard_focus(), Some(s));
}

#[test]
fn test_shutdown_binding_signals_once() {
    let mut c = compositor();
    modifiers(&mut c, ModifierMask::ALT | ModifierMask::SHIFT);

    key(&mut c, 26, KeyState::Pressed, &[Keysym::E]);
    assert!(!c.is_running());
    assert_eq!(c.backend().terminate_requests(), 1);

    key(&mut c, 26, KeyState::Pressed, &[Keysym::E]);
    assert_eq!(c.backend().terminate_requests(), 1);
    assert_eq!(forwarded_keys(&c), 0);
}

#[test]
fn test_spawn_failure_is_not_fatal() {
    let mut c = boot(Compositor::new(
        HeadlessBackend::default(),
        RecordingLauncher {
            fail: true,
            ..Default::default()
        },
        KeybindingTable::with_defaults(),
        CompositorSettings::default(),
    ));
    modifiers(&mut c, ModifierMask::ALT);
    key(&mut c, 36, KeyState::Pressed, &[Keysym::Return]);

    assert_eq!(c.launcher().spawned.len(), 1);
    assert!(c.is_running());
    assert_eq!(forwarded_keys(&c), 0);
}

#[test]
fn test_configured_bindings_and_intercept() {
    let mut config = KwmConfig::default();
    config.input.intercept_modifier = "Super".to_string();
    config.bindings = vec![BindingConfig {
        modifiers: "Super".to_string(),
        key: "q".to_string(),
        action: "close".to_string(),
        command: vec![],
    }];
    config.validate().unwrap();

    let mut c = boot(
        Compositor::from_config(HeadlessBackend::default(), RecordingLauncher::default(), &config)
            .unwrap(),
    );
    let (_, s) = open_window(&mut c, 0, 0, 100, 100);

    // Alt no longer intercepts.
    modifiers(&mut c, ModifierMask::ALT);
    key(&mut c, 24, KeyState::Pressed, &[Keysym::q]);
    assert!(!c.backend().close_requested(s));

    modifiers(&mut c, ModifierMask::LOGO);
    key(&mut c, 24, KeyState::Pressed, &[Keysym::q]);
    assert!(c.backend().close_requested(s));
}

#[test]
fn test_refocus_reactivates() {
    let mut c = compositor();
    let (v, s) = open_window(&mut c, 0, 0, 100, 100);
    assert_eq!(c.backend().keyboard_enter_count(s), 1);

    assert!(c.focus(Some(v)));
    assert_eq!(c.backend().keyboard_enter_count(s), 2);
    assert!(c.backend().is_activated(s));
}

#[test]
fn test_popup_receives_pointer() {
    let mut c = compositor();
    let (v, s) = open_window(&mut c, 100, 100, 300, 300);
    let popup = c
        .backend_mut()
        .create_popup(s, kwm::view::Rectangle::new(250, 10, 100, 50))
        .unwrap();

    pointer_to(&mut c, 360.0, 120.0);
    assert_eq!(c.backend().pointer_focus(), Some(popup));

    // Clicking the popup focuses its toplevel.
    let (_, s2) = open_window(&mut c, 1000, 600, 100, 100);
    assert!(c.backend().is_activated(s2));
    button(&mut c, BTN_LEFT, ButtonState::Pressed);
    assert_eq!(c.focused_view(), Some(v));
    assert_eq!(c.backend().keyboard_focus(), Some(s));
}
