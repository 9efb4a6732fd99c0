//! # kwm Wayland Compositor Library
//!
//! A minimal stacking compositor core: floating windows, click-to-focus,
//! interactive move and resize, and a modifier-gated key binding table.
//!
//! ## Architecture
//!
//! kwm is split into the policy core and the collaborators it drives:
//! - `compositor`: Event dispatch and the pointer/keyboard pipelines
//! - `view`: View registry, stacking order and hit testing
//! - `focus`: Keyboard focus and raise
//! - `cursor`: Passthrough/move/resize state machine
//! - `bindings`: Modifier masks, keysyms and the binding table
//! - `backend`: Collaborator traits, the headless backend and event replay
//! - `launcher`: Spawning external programs
//! - `config`: Configuration parsing and management
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kwm::backend::{BackendEvent, HeadlessBackend, OutputId};
//! use kwm::{Compositor, KwmConfig, ProcessLauncher};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = KwmConfig::default();
//!     let backend = HeadlessBackend::default();
//!     let mut compositor = Compositor::from_config(backend, ProcessLauncher::new(), &config)?;
//!     compositor.dispatch(BackendEvent::NewOutput {
//!         output: OutputId(0),
//!         width: 1920,
//!         height: 1080,
//!     });
//!     compositor.start(None)?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod bindings;
pub mod compositor;
pub mod config;
pub mod cursor;
pub mod error;
pub mod focus;
pub mod launcher;
pub mod view;

// Re-export main types for easy access
pub use compositor::{Compositor, CompositorSettings};
pub use config::KwmConfig;
pub use error::{KwmError, KwmResult};
pub use launcher::{Launcher, ProcessLauncher};
pub use view::{ViewId, ViewRegistry};

// Re-export common error types
pub use anyhow::{Context, Error, Result};

/// Version information for kwm
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
