//! Compositor key bindings
//!
//! A binding table is an ordered list of `(modifiers, keysym, action)` entries
//! supplied by configuration. Dispatch scans the table in declaration order and
//! the first exact match wins, so a later entry with the same chord is never
//! reached.

use crate::error::{KwmError, KwmResult};
use bitflags::bitflags;
use log::debug;
use std::fmt;
use xkbcommon::xkb::{self, Keysym};

bitflags! {
    /// Held keyboard modifiers, using the wlroots bit assignment.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModifierMask: u32 {
        const SHIFT = 1 << 0;
        const CAPS = 1 << 1;
        const CTRL = 1 << 2;
        const ALT = 1 << 3;
        const MOD2 = 1 << 4;
        const MOD3 = 1 << 5;
        const LOGO = 1 << 6;
        const MOD5 = 1 << 7;
    }
}

impl ModifierMask {
    /// Parse a `+`-separated chord of modifier names such as `"Alt+Shift"`.
    /// An empty string yields the empty mask.
    pub fn parse(chord: &str) -> KwmResult<Self> {
        let mut mask = ModifierMask::empty();
        for name in chord.split('+').map(str::trim).filter(|s| !s.is_empty()) {
            mask |= Self::from_chord_name(name)
                .ok_or_else(|| KwmError::InvalidBinding(format!("unknown modifier `{}`", name)))?;
        }
        Ok(mask)
    }

    fn from_chord_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "shift" => Some(Self::SHIFT),
            "caps" | "lock" => Some(Self::CAPS),
            "ctrl" | "control" => Some(Self::CTRL),
            "alt" | "mod1" => Some(Self::ALT),
            "mod2" => Some(Self::MOD2),
            "mod3" => Some(Self::MOD3),
            "logo" | "super" | "mod4" => Some(Self::LOGO),
            "mod5" => Some(Self::MOD5),
            _ => None,
        }
    }

    /// True when every modifier of a non-empty `intercept` mask is held.
    pub fn holds_intercept(self, intercept: ModifierMask) -> bool {
        !intercept.is_empty() && self.contains(intercept)
    }
}

/// Parse a keysym by its xkb name (`"Return"`, `"E"`, `"space"`).
/// Names are case-sensitive: with Shift held xkb resolves letters to upper case.
pub fn parse_keysym(name: &str) -> KwmResult<Keysym> {
    let sym = xkb::keysym_from_name(name, xkb::KEYSYM_NO_FLAGS);
    if sym == Keysym::NoSymbol {
        return Err(KwmError::InvalidBinding(format!("unknown key `{}`", name)));
    }
    Ok(sym)
}

/// A compositor command with its typed argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Launch an external program; `argv[0]` is looked up in `PATH`.
    Spawn(Vec<String>),
    /// Stop the event loop.
    Shutdown,
    /// Ask the keyboard-focused view to close.
    CloseFocused,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Spawn(argv) => write!(f, "spawn {}", argv.join(" ")),
            Action::Shutdown => write!(f, "shutdown"),
            Action::CloseFocused => write!(f, "close-focused"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keybinding {
    pub modifiers: ModifierMask,
    pub keysym: Keysym,
    pub action: Action,
}

impl Keybinding {
    pub fn new(modifiers: ModifierMask, keysym: Keysym, action: Action) -> Self {
        Self {
            modifiers,
            keysym,
            action,
        }
    }

    fn matches(&self, modifiers: ModifierMask, keysym: Keysym) -> bool {
        self.modifiers == modifiers && self.keysym == keysym
    }
}

/// Immutable, ordered binding table.
#[derive(Debug, Clone, Default)]
pub struct KeybindingTable {
    entries: Vec<Keybinding>,
}

impl KeybindingTable {
    pub fn new(entries: Vec<Keybinding>) -> Self {
        debug!("🔑 Loaded {} key bindings", entries.len());
        Self { entries }
    }

    /// The built-in table: `Alt+Return` spawns a terminal, `Alt+Shift+E` exits.
    pub fn with_defaults() -> Self {
        Self::new(vec![
            Keybinding::new(
                ModifierMask::ALT,
                Keysym::Return,
                Action::Spawn(vec!["alacritty".to_string()]),
            ),
            Keybinding::new(ModifierMask::ALT | ModifierMask::SHIFT, Keysym::E, Action::Shutdown),
        ])
    }

    /// First entry whose chord exactly matches.
    pub fn lookup(&self, modifiers: ModifierMask, keysym: Keysym) -> Option<&Action> {
        self.entries
            .iter()
            .find(|binding| binding.matches(modifiers, keysym))
            .map(|binding| &binding.action)
    }

    /// Resolve one physical key press to at most one action.
    ///
    /// The table is only consulted for presses while `intercept` is held.
    /// Symbols are tried in order and the search stops at the first match.
    pub fn dispatch(
        &self,
        intercept: ModifierMask,
        modifiers: ModifierMask,
        pressed: bool,
        syms: &[Keysym],
    ) -> Option<&Action> {
        if !pressed || !modifiers.holds_intercept(intercept) {
            return None;
        }
        syms.iter().find_map(|&sym| self.lookup(modifiers, sym))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keybinding> {
        self.entries.iter()
    }
}
