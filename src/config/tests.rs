//! Unit tests for configuration module
//!
//! Tests configuration parsing, validation, serialization/deserialization,
//! and conversion of binding entries into the dispatch table.

use super::*;
use anyhow::Result;
use std::fs;
use tempfile::tempdir;
use xkbcommon::xkb::Keysym;

#[test]
fn test_default_configuration_is_valid() {
    let config = KwmConfig::default();
    assert!(config.validate().is_ok());

    assert_eq!(config.intercept_modifier(), ModifierMask::ALT);
    assert_eq!(config.cursor.default_image, "left_ptr");
    assert_eq!(config.outputs.len(), 1);
    assert!(config.window.min_width > 0);
    assert!(config.input.keyboard_repeat_delay > 0);
}

#[test]
fn test_default_bindings_match_builtin_table() -> Result<()> {
    let config = KwmConfig::default();
    let table = config.keybinding_table()?;
    assert_eq!(table.len(), 2);
    assert_eq!(
        table.lookup(ModifierMask::ALT, Keysym::Return),
        Some(&Action::Spawn(vec!["alacritty".to_string()]))
    );
    assert_eq!(
        table.lookup(ModifierMask::ALT | ModifierMask::SHIFT, Keysym::E),
        Some(&Action::Shutdown)
    );
    Ok(())
}

#[test]
fn test_configuration_serialization_roundtrip() -> Result<()> {
    let original_config = KwmConfig::default();

    let toml_string = toml::to_string(&original_config)?;
    let deserialized_config: KwmConfig = toml::from_str(&toml_string)?;

    assert_eq!(original_config, deserialized_config);
    Ok(())
}

#[test]
fn test_configuration_from_file() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("kwm.toml");

    let test_config = r#"
[general]
debug = true
startup_command = "foot --server"

[input]
intercept_modifier = "Super"
keyboard_repeat_rate = 30
keyboard_repeat_delay = 400

[window]
min_width = 64
min_height = 32

[[outputs]]
name = "HEADLESS-1"
width = 1280
height = 720

[[outputs]]
name = "HEADLESS-2"
width = 1920
height = 1080

[[bindings]]
modifiers = "Super"
key = "Return"
action = "spawn"
command = ["foot"]

[[bindings]]
modifiers = "Super+Shift"
key = "Q"
action = "close"

[[bindings]]
modifiers = "Super+Shift"
key = "E"
action = "exit"
"#;

    fs::write(&file_path, test_config)?;

    let config = KwmConfig::load(&file_path)?;

    assert!(config.general.debug);
    assert_eq!(config.general.startup_command.as_deref(), Some("foot --server"));
    assert_eq!(config.intercept_modifier(), ModifierMask::LOGO);
    assert_eq!(config.input.keyboard_repeat_rate, 30);
    assert_eq!(config.window.min_width, 64);
    // Unspecified fields keep their defaults.
    assert!(config.window.server_side_decorations);
    assert_eq!(config.cursor.size, 24);
    assert_eq!(config.outputs.len(), 2);

    let table = config.keybinding_table()?;
    assert_eq!(table.len(), 3);
    assert_eq!(
        table.lookup(ModifierMask::LOGO | ModifierMask::SHIFT, Keysym::Q),
        Some(&Action::CloseFocused)
    );

    Ok(())
}

#[test]
fn test_empty_file_uses_defaults() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("empty.toml");
    fs::write(&file_path, "")?;

    let config = KwmConfig::load(&file_path)?;
    assert_eq!(config, KwmConfig::default());
    Ok(())
}

#[test]
fn test_malformed_toml_handling() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("malformed_config.toml");

    let malformed_config = r#"
[input
intercept_modifier = "Alt"

[window]
min_width = "not a number"
"#;

    fs::write(&file_path, malformed_config).unwrap();

    assert!(KwmConfig::load(&file_path).is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    assert!(KwmConfig::load(dir.path().join("nope.toml")).is_err());
}

#[test]
fn test_configuration_validation() {
    let config = KwmConfig::default();

    let mut invalid = config.clone();
    invalid.input.intercept_modifier = "Hyper".to_string();
    assert!(invalid.validate().is_err());

    let mut invalid = config.clone();
    invalid.input.intercept_modifier = String::new();
    assert!(invalid.validate().is_err());

    let mut invalid = config.clone();
    invalid.window.min_height = 0;
    assert!(invalid.validate().is_err());

    let mut invalid = config.clone();
    invalid.outputs.clear();
    assert!(invalid.validate().is_err());

    let mut invalid = config.clone();
    invalid.outputs[0].width = 0;
    assert!(invalid.validate().is_err());
}

#[test]
fn test_binding_validation() {
    let mut binding = BindingConfig::new("Alt", "Return", "spawn", &[]);
    assert!(binding.to_keybinding().is_err());

    binding.command = vec!["foot".to_string()];
    assert!(binding.to_keybinding().is_ok());

    binding.key = "NoSuchKey".to_string();
    assert!(binding.to_keybinding().is_err());

    let binding = BindingConfig::new("Alt", "q", "maximize", &[]);
    assert!(binding.to_keybinding().is_err());

    let binding = BindingConfig::new("Alt+Meta", "q", "close", &[]);
    assert!(binding.to_keybinding().is_err());
}

#[test]
fn test_save_and_reload() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("saved.toml");

    let mut config = KwmConfig::default();
    config.general.startup_command = Some("swaybg -c '#333333'".to_string());
    config.bindings.push(BindingConfig::new("Alt", "q", "close", &[]));
    config.save(&file_path)?;

    let reloaded = KwmConfig::load(&file_path)?;
    assert_eq!(reloaded, config);
    Ok(())
}

#[test]
fn test_expand_home() -> Result<()> {
    let home = std::env::var("HOME")?;
    let expanded = KwmConfig::expand_path("~/.config/kwm/kwm.toml")?;
    assert_eq!(expanded, Path::new(&home).join(".config/kwm/kwm.toml"));
    assert_eq!(KwmConfig::expand_path("/etc/kwm.toml")?, PathBuf::from("/etc/kwm.toml"));
    Ok(())
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_min_size_bounds(width in 0u32..5000u32, height in 0u32..5000u32) {
            let mut config = KwmConfig::default();
            config.window.min_width = width;
            config.window.min_height = height;

            let result = config.validate();
            if width > 0 && height > 0 {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(result.is_err());
            }
        }

        #[test]
        fn test_output_dimensions(width in 0u32..8000u32, height in 0u32..8000u32) {
            let mut config = KwmConfig::default();
            config.outputs[0].width = width;
            config.outputs[0].height = height;
            prop_assert_eq!(config.validate().is_ok(), width > 0 && height > 0);
        }
    }
}
