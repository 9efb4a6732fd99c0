//! Error types for the kwm core
//!
//! The state machines return `KwmError` for the failures a caller may want to
//! distinguish. Configuration loading and the binary wrap these in
//! `anyhow::Error` with context.

use crate::view::ViewId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KwmError {
    /// A move/resize was requested by a view whose surface does not hold
    /// pointer focus. Callers log this at debug level and otherwise ignore it.
    #[error("grab request from view {0} denied: surface does not hold pointer focus")]
    UnauthorizedGrab(ViewId),

    /// The id refers to a view that was already destroyed.
    #[error("view {0} no longer exists")]
    UnknownView(ViewId),

    /// An external program could not be launched.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A spawn command with no program name.
    #[error("spawn command is empty")]
    EmptyCommand,

    /// Backend, display or socket setup failed. Fatal.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// A keybinding entry could not be parsed.
    #[error("invalid keybinding: {0}")]
    InvalidBinding(String),
}

pub type KwmResult<T> = std::result::Result<T, KwmError>;
