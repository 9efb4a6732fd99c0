//! Recorded event streams for the headless backend
//!
//! One JSON object per line, tagged by `type`:
//!
//! ```text
//! {"type":"new_output","output":0,"width":1920,"height":1080}
//! {"type":"new_toplevel","surface":10,"client":1,"width":640,"height":480}
//! {"type":"map","surface":10}
//! {"type":"keyboard_modifiers","device":2,"modifiers":"Alt"}
//! {"type":"keyboard_key","device":2,"time_msec":5,"keycode":36,"state":"pressed","syms":["Return"]}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Applying an event
//! first updates the headless surface store the way a real client would,
//! then yields the [`BackendEvent`] the compositor should see.

use super::{
    AxisOrientation, BackendEvent, ButtonState, ClientId, DeviceId, HeadlessBackend,
    InputDeviceKind, KeyState, OutputId, SurfaceId,
};
use crate::bindings::{parse_keysym, ModifierMask};
use crate::cursor::ResizeEdges;
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayEvent {
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
        client: ClientId,
        width: u32,
        height: u32,
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
        /// `ResizeEdges` bits: top 1, bottom 2, left 4, right 8.
        edges: u32,
    },
    RequestSetCursor {
        client: ClientId,
        #[serde(default)]
        surface: Option<SurfaceId>,
        #[serde(default)]
        hotspot_x: i32,
        #[serde(default)]
        hotspot_y: i32,
    },
    PointerMotion {
        device: DeviceId,
        #[serde(default)]
        time_msec: u32,
        dx: f64,
        dy: f64,
    },
    PointerMotionAbsolute {
        device: DeviceId,
        #[serde(default)]
        time_msec: u32,
        x: f64,
        y: f64,
    },
    PointerButton {
        #[serde(default)]
        time_msec: u32,
        button: u32,
        state: ButtonState,
    },
    PointerAxis {
        #[serde(default)]
        time_msec: u32,
        orientation: AxisOrientation,
        delta: f64,
    },
    PointerFrame,
    KeyboardKey {
        device: DeviceId,
        #[serde(default)]
        time_msec: u32,
        keycode: u32,
        state: KeyState,
        /// xkb keysym names.
        #[serde(default)]
        syms: Vec<String>,
    },
    KeyboardModifiers {
        device: DeviceId,
        /// Modifier chord, e.g. "Alt+Shift"; empty for none.
        #[serde(default)]
        modifiers: String,
    },
}

/// Parse one line of a recording. `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<ReplayEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let event = serde_json::from_str(line).with_context(|| format!("Invalid event: {}", line))?;
    Ok(Some(event))
}

impl ReplayEvent {
    /// Update the headless surface store and produce the compositor event.
    pub fn apply(self, backend: &mut HeadlessBackend) -> Result<BackendEvent> {
        let event = match self {
            ReplayEvent::NewOutput {
                output,
                width,
                height,
            } => BackendEvent::NewOutput {
                output,
                width,
                height,
            },
            ReplayEvent::NewInput { device, kind } => BackendEvent::NewInput { device, kind },
            ReplayEvent::NewToplevel {
                surface,
                client,
                width,
                height,
            } => {
                backend.insert_toplevel(surface, client, width, height);
                BackendEvent::NewToplevel { surface }
            }
            ReplayEvent::Map { surface } => BackendEvent::Map { surface },
            ReplayEvent::Unmap { surface } => BackendEvent::Unmap { surface },
            ReplayEvent::Destroy { surface } => {
                backend.destroy_surface(surface);
                BackendEvent::Destroy { surface }
            }
            ReplayEvent::NewDecoration { surface } => BackendEvent::NewDecoration { surface },
            ReplayEvent::RequestMove { surface } => BackendEvent::RequestMove { surface },
            ReplayEvent::RequestResize { surface, edges } => BackendEvent::RequestResize {
                surface,
                edges: ResizeEdges::from_bits_truncate(edges),
            },
            ReplayEvent::RequestSetCursor {
                client,
                surface,
                hotspot_x,
                hotspot_y,
            } => BackendEvent::RequestSetCursor {
                client,
                surface,
                hotspot_x,
                hotspot_y,
            },
            ReplayEvent::PointerMotion {
                device,
                time_msec,
                dx,
                dy,
            } => BackendEvent::PointerMotion {
                device,
                time_msec,
                dx,
                dy,
            },
            ReplayEvent::PointerMotionAbsolute {
                device,
                time_msec,
                x,
                y,
            } => BackendEvent::PointerMotionAbsolute {
                device,
                time_msec,
                x,
                y,
            },
            ReplayEvent::PointerButton {
                time_msec,
                button,
                state,
            } => BackendEvent::PointerButton {
                time_msec,
                button,
                state,
            },
            ReplayEvent::PointerAxis {
                time_msec,
                orientation,
                delta,
            } => BackendEvent::PointerAxis {
                time_msec,
                orientation,
                delta,
            },
            ReplayEvent::PointerFrame => BackendEvent::PointerFrame,
            ReplayEvent::KeyboardKey {
                device,
                time_msec,
                keycode,
                state,
                syms,
            } => BackendEvent::KeyboardKey {
                device,
                time_msec,
                keycode,
                state,
                syms: syms
                    .iter()
                    .map(|name| parse_keysym(name))
                    .collect::<Result<_, _>>()?,
            },
            ReplayEvent::KeyboardModifiers { device, modifiers } => BackendEvent::KeyboardModifiers {
                device,
                modifiers: ModifierMask::parse(&modifiers)?,
            },
        };
        Ok(event)
    }
}

/// Stream a recording into `tx`, one event per line, tagged with its line
/// number. Stops early if the receiver goes away.
pub async fn read_events<P: AsRef<Path>>(
    path: P,
    tx: mpsc::Sender<(usize, ReplayEvent)>,
) -> Result<()> {
    let path = path.as_ref();
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open replay file: {}", path.display()))?;
    info!("📼 Replaying events from {}", path.display());

    let mut lines = BufReader::new(file).lines();
    let mut lineno = 0;
    while let Some(line) = lines.next_line().await? {
        lineno += 1;
        let Some(event) = parse_line(&line).with_context(|| format!("{}:{}", path.display(), lineno))?
        else {
            continue;
        };
        if tx.send((lineno, event)).await.is_err() {
            debug!("Replay receiver closed at line {}", lineno);
            break;
        }
    }
    Ok(())
}
