//! Configuration management for kwm
//!
//! This module handles loading, parsing, and validating configuration
//! from TOML files: input handling, cursor theme, window constraints,
//! headless outputs and the ordered key binding table.

use crate::bindings::{parse_keysym, Action, Keybinding, KeybindingTable, ModifierMask};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration struct containing all kwm settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KwmConfig {
    /// General compositor settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input handling
    #[serde(default)]
    pub input: InputConfig,

    /// Cursor theme settings
    #[serde(default)]
    pub cursor: CursorConfig,

    /// Window constraints and decorations
    #[serde(default)]
    pub window: WindowConfig,

    /// Outputs created by the headless backend
    #[serde(default = "KwmConfig::default_outputs")]
    pub outputs: Vec<OutputConfig>,

    /// Key bindings, matched in order
    #[serde(default = "KwmConfig::default_bindings")]
    pub bindings: Vec<BindingConfig>,
}

/// General compositor settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable debug logging
    pub debug: bool,

    /// Shell command run once the backend has started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startup_command: Option<String>,
}

/// Input configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    /// Modifier(s) that route key presses and button presses to the compositor
    pub intercept_modifier: String,

    /// Keyboard repeat rate (per second)
    pub keyboard_repeat_rate: u32,

    /// Keyboard repeat delay (milliseconds)
    pub keyboard_repeat_delay: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CursorConfig {
    /// Theme image shown when the pointer is over no window
    pub default_image: String,

    /// Cursor size (pixels)
    pub size: u32,
}

/// Window management configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Smallest width an interactive resize may produce (pixels)
    pub min_width: u32,

    /// Smallest height an interactive resize may produce (pixels)
    pub min_height: u32,

    /// Answer decoration negotiation with server-side mode
    pub server_side_decorations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// One `[[bindings]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BindingConfig {
    /// Modifier chord, e.g. "Alt" or "Alt+Shift"
    pub modifiers: String,

    /// xkb keysym name, e.g. "Return" or "E"
    pub key: String,

    /// "spawn", "exit" or "close"
    pub action: String,

    /// Program and arguments for "spawn"
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
}

impl Default for KwmConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            input: InputConfig::default(),
            cursor: CursorConfig::default(),
            window: WindowConfig::default(),
            outputs: Self::default_outputs(),
            bindings: Self::default_bindings(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            intercept_modifier: "Alt".to_string(),
            keyboard_repeat_rate: 25,
            keyboard_repeat_delay: 600,
        }
    }
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            default_image: "left_ptr".to_string(),
            size: 24,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            min_width: 100,
            min_height: 50,
            server_side_decorations: true,
        }
    }
}

impl BindingConfig {
    fn new(modifiers: &str, key: &str, action: &str, command: &[&str]) -> Self {
        Self {
            modifiers: modifiers.to_string(),
            key: key.to_string(),
            action: action.to_string(),
            command: command.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Resolve names into a typed binding.
    pub fn to_keybinding(&self) -> Result<Keybinding> {
        let modifiers = ModifierMask::parse(&self.modifiers)?;
        let keysym = parse_keysym(&self.key)?;
        let action = match self.action.to_ascii_lowercase().as_str() {
            "spawn" => {
                if self.command.is_empty() {
                    anyhow::bail!("Binding {}+{}: spawn needs a command", self.modifiers, self.key);
                }
                Action::Spawn(self.command.clone())
            }
            "exit" | "quit" | "shutdown" => Action::Shutdown,
            "close" | "kill" => Action::CloseFocused,
            other => anyhow::bail!("Binding {}+{}: unknown action `{}`", self.modifiers, self.key, other),
        };
        Ok(Keybinding::new(modifiers, keysym, action))
    }
}

impl KwmConfig {
    fn default_outputs() -> Vec<OutputConfig> {
        vec![OutputConfig {
            name: "HEADLESS-1".to_string(),
            width: 1920,
            height: 1080,
        }]
    }

    fn default_bindings() -> Vec<BindingConfig> {
        vec![
            BindingConfig::new("Alt", "Return", "spawn", &["alacritty"]),
            BindingConfig::new("Alt+Shift", "E", "exit", &[]),
        ]
    }

    /// Expand a leading `~` to `$HOME`.
    pub fn expand_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
        let path = path.as_ref();
        if let Ok(rest) = path.strip_prefix("~") {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            return Ok(Path::new(&home).join(rest));
        }
        Ok(path.to_path_buf())
    }

    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = Self::expand_path(path)?;

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: KwmConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let intercept = ModifierMask::parse(&self.input.intercept_modifier)
            .context("Invalid intercept_modifier")?;
        if intercept.is_empty() {
            anyhow::bail!("Invalid intercept_modifier: must name at least one modifier");
        }

        if self.window.min_width == 0 || self.window.min_height == 0 {
            anyhow::bail!("Invalid minimum window size: must be greater than zero");
        }

        if self.outputs.is_empty() {
            anyhow::bail!("At least one output must be configured");
        }
        for output in &self.outputs {
            if output.width == 0 || output.height == 0 {
                anyhow::bail!("Invalid output {}: dimensions must be non-zero", output.name);
            }
        }

        for binding in &self.bindings {
            binding.to_keybinding()?;
        }

        Ok(())
    }

    /// Intercept modifier mask. Falls back to Alt if the name is invalid.
    pub fn intercept_modifier(&self) -> ModifierMask {
        ModifierMask::parse(&self.input.intercept_modifier)
            .ok()
            .filter(|mask| !mask.is_empty())
            .unwrap_or(ModifierMask::ALT)
    }

    /// Build the ordered binding table.
    pub fn keybinding_table(&self) -> Result<KeybindingTable> {
        let entries = self
            .bindings
            .iter()
            .map(BindingConfig::to_keybinding)
            .collect::<Result<Vec<_>>>()?;
        Ok(KeybindingTable::new(entries))
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests;
