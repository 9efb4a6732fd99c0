//! Launching external programs for `spawn` bindings
//!
//! Children run in their own process group so they outlive a compositor that
//! exits without waiting for them. Handles are kept so exited children can be
//! reaped instead of lingering as zombies; running children are never killed.

use crate::error::{KwmError, KwmResult};
use log::{debug, info, warn};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};

pub trait Launcher {
    /// Start `argv[0]` with the remaining arguments. Does not wait.
    fn spawn(&mut self, argv: &[String]) -> KwmResult<()>;

    /// Collect exit statuses of finished children.
    fn reap(&mut self) {}
}

#[derive(Debug, Default)]
pub struct ProcessLauncher {
    /// Environment passed to every child on top of the inherited one.
    env: Vec<(String, String)>,
    children: Vec<Child>,
}

impl ProcessLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an environment variable for children, e.g. `WAYLAND_DISPLAY`.
    pub fn set_env(&mut self, key: &str, value: &str) {
        self.env.retain(|(k, _)| k != key);
        self.env.push((key.to_string(), value.to_string()));
    }

    pub fn running(&self) -> usize {
        self.children.len()
    }
}

impl Launcher for ProcessLauncher {
    fn spawn(&mut self, argv: &[String]) -> KwmResult<()> {
        self.reap();

        let (program, args) = argv.split_first().ok_or(KwmError::EmptyCommand)?;
        debug!("exec: {} {:?}", program, args);

        let child = Command::new(program)
            .args(args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .process_group(0)
            .spawn()
            .map_err(|source| KwmError::Spawn {
                program: program.clone(),
                source,
            })?;

        info!("🚀 Spawned {} (pid {})", program, child.id());
        self.children.push(child);
        Ok(())
    }

    fn reap(&mut self) {
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                debug!("Child {} exited with {}", child.id(), status);
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!("Failed to poll child {}: {}", child.id(), e);
                false
            }
        });
    }
}

impl Drop for ProcessLauncher {
    fn drop(&mut self) {
        self.reap();
        if !self.children.is_empty() {
            info!("Leaving {} spawned process(es) running", self.children.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command_is_rejected() {
        let mut launcher = ProcessLauncher::new();
        assert!(matches!(launcher.spawn(&[]), Err(KwmError::EmptyCommand)));
    }

    #[test]
    fn test_missing_program_is_a_spawn_error() {
        let mut launcher = ProcessLauncher::new();
        let argv = vec!["/nonexistent/kwm-test-binary".to_string()];
        match launcher.spawn(&argv) {
            Err(KwmError::Spawn { program, .. }) => assert_eq!(program, argv[0]),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(launcher.running(), 0);
    }

    #[test]
    fn test_spawn_and_reap() {
        let mut launcher = ProcessLauncher::new();
        launcher.set_env("WAYLAND_DISPLAY", "wayland-test");
        launcher.spawn(&["true".to_string()]).unwrap();
        assert_eq!(launcher.running(), 1);

        for _ in 0..200 {
            launcher.reap();
            if launcher.running() == 0 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(launcher.running(), 0);
    }
}
