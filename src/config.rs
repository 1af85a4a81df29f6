//! Configuration file support for bebop.
//!
//! Loads settings from ~/.config/bebop/config.toml if it exists,
//! otherwise uses the built-in defaults. The file is only ever read.
//!
//! Also turns the keybinding strings into the static lookup table the
//! dispatcher consults on every key press.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::focus::Direction;
use crate::registry::DEFAULT_CAPACITY;

/// Top-level configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub keybindings: KeybindingConfig,
}

/// General settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Maximum number of managed windows
    pub capacity: usize,
    /// Command for the terminal binding
    pub terminal: String,
    /// Command for the browser binding
    pub browser: String,
    /// Commands launched once after startup
    pub autostart: Vec<String>,
    /// Reap exited child processes between events
    pub reap_children: bool,
}

/// Keybinding configuration (strings like "Mod4+Return")
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct KeybindingConfig {
    pub quit: Option<String>,
    pub spawn_terminal: Option<String>,
    pub spawn_browser: Option<String>,
    pub focus_next: Option<String>,
    pub focus_prev: Option<String>,
}

/// Parsed keybinding (ready for X11 grab)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParsedBinding {
    pub keysym: u32,
    pub modifiers: u16,
}

/// Window manager action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WmAction {
    Quit,
    Spawn(String),
    CycleFocus(Direction),
}

/// Key combination -> action lookup table
#[derive(Debug, Default)]
pub struct KeyBindings {
    table: HashMap<ParsedBinding, WmAction>,
}

impl KeyBindings {
    pub fn insert(&mut self, binding: ParsedBinding, action: WmAction) {
        if let Some(previous) = self.table.insert(binding, action) {
            log::warn!("Keybinding {:?} was bound to {:?}, overriding", binding, previous);
        }
    }

    /// Find the action bound to an exact keysym + modifier combination
    pub fn lookup(&self, keysym: u32, modifiers: u16) -> Option<&WmAction> {
        self.table.get(&ParsedBinding { keysym, modifiers })
    }

    /// All bound combinations, for grabbing
    pub fn bindings(&self) -> impl Iterator<Item = (&ParsedBinding, &WmAction)> {
        self.table.iter()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Config {
    /// Load config from default path (~/.config/bebop/config.toml)
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bebop")
            .join("config.toml")
    }

    /// Load config from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse config: {}", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Build the keybinding table. Unparseable entries are skipped.
    pub fn parse_keybindings(&self) -> KeyBindings {
        let mut bindings = KeyBindings::default();
        let general = &self.general;

        let mut insert = |action: WmAction, key_str: &Option<String>| {
            if let Some(s) = key_str {
                if let Some(parsed) = parse_key_binding(s) {
                    bindings.insert(parsed, action);
                } else {
                    log::warn!("Failed to parse keybinding: {}", s);
                }
            }
        };

        insert(WmAction::Quit, &self.keybindings.quit);
        insert(
            WmAction::Spawn(general.terminal.clone()),
            &self.keybindings.spawn_terminal,
        );
        insert(
            WmAction::Spawn(general.browser.clone()),
            &self.keybindings.spawn_browser,
        );
        insert(
            WmAction::CycleFocus(Direction::Forward),
            &self.keybindings.focus_next,
        );
        insert(
            WmAction::CycleFocus(Direction::Backward),
            &self.keybindings.focus_prev,
        );

        bindings
    }
}

// X11 modifier masks
pub const SHIFT_MASK: u16 = 1;
pub const CONTROL_MASK: u16 = 4;
pub const MOD1_MASK: u16 = 8; // Alt
pub const MOD4_MASK: u16 = 64; // Super/Win

/// Parse a key binding string like "Mod4+Shift+Tab" into keysym and modifiers
pub fn parse_key_binding(s: &str) -> Option<ParsedBinding> {
    let parts: Vec<&str> = s.split('+').map(str::trim).collect();
    let (key_part, modifier_parts) = parts.split_last()?;

    let mut modifiers: u16 = 0;
    for part in modifier_parts {
        match part.to_lowercase().as_str() {
            "mod4" | "super" | "win" => modifiers |= MOD4_MASK,
            "shift" => modifiers |= SHIFT_MASK,
            "control" | "ctrl" => modifiers |= CONTROL_MASK,
            "mod1" | "alt" => modifiers |= MOD1_MASK,
            _ => {
                log::warn!("Unknown modifier: {}", part);
                return None;
            }
        }
    }

    let keysym = key_to_keysym(key_part)?;
    Some(ParsedBinding { keysym, modifiers })
}

/// Convert key name to X11 keysym
fn key_to_keysym(key: &str) -> Option<u32> {
    let lower = key.to_lowercase();

    // Latin-1 letters and digits map to their own code point
    let mut chars = lower.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            return Some(c as u32);
        }
    }

    match lower.as_str() {
        "return" | "enter" => Some(0xff0d),
        "tab" => Some(0xff09),
        "escape" | "esc" => Some(0xff1b),
        "space" => Some(0x20),
        "backspace" => Some(0xff08),
        "delete" => Some(0xffff),
        "left" => Some(0xff51),
        "up" => Some(0xff52),
        "right" => Some(0xff53),
        "down" => Some(0xff54),
        _ => {
            // F1-F12 are contiguous from 0xffbe
            if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u32>().ok()) {
                if (1..=12).contains(&n) {
                    return Some(0xffbe + n - 1);
                }
            }
            log::warn!("Unknown key: {}", key);
            None
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            terminal: "kitty".to_string(),
            browser: "firefox".to_string(),
            autostart: vec!["kitty".to_string()],
            reap_children: true,
        }
    }
}

impl Default for KeybindingConfig {
    fn default() -> Self {
        Self {
            quit: Some("Control+q".to_string()),
            spawn_terminal: Some("Mod4+Return".to_string()),
            spawn_browser: Some("Mod4+b".to_string()),
            focus_next: Some("Mod4+Tab".to_string()),
            focus_prev: Some("Mod4+Shift+Tab".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_key_binding() {
        let binding = parse_key_binding("Mod4+Return").unwrap();
        assert_eq!(binding.keysym, 0xff0d);
        assert_eq!(binding.modifiers, MOD4_MASK);

        let binding = parse_key_binding("Mod4+Shift+Tab").unwrap();
        assert_eq!(binding.keysym, 0xff09);
        assert_eq!(binding.modifiers, MOD4_MASK | SHIFT_MASK);

        let binding = parse_key_binding("Control+q").unwrap();
        assert_eq!(binding.keysym, 0x71);
        assert_eq!(binding.modifiers, CONTROL_MASK);
    }

    #[test]
    fn test_parse_key_binding_rejects_garbage() {
        assert!(parse_key_binding("").is_none());
        assert!(parse_key_binding("Hyper+q").is_none());
        assert!(parse_key_binding("Mod4+nosuchkey").is_none());
    }

    #[test]
    fn test_key_to_keysym() {
        assert_eq!(key_to_keysym("return"), Some(0xff0d));
        assert_eq!(key_to_keysym("Return"), Some(0xff0d));
        assert_eq!(key_to_keysym("tab"), Some(0xff09));
        assert_eq!(key_to_keysym("B"), Some(0x62));
        assert_eq!(key_to_keysym("1"), Some(0x31));
        assert_eq!(key_to_keysym("F1"), Some(0xffbe));
        assert_eq!(key_to_keysym("f12"), Some(0xffc9));
        assert_eq!(key_to_keysym("f13"), None);
    }

    #[test]
    fn test_default_keybindings() {
        let config = Config::default();
        let bindings = config.parse_keybindings();

        assert_eq!(bindings.len(), 5);
        assert_eq!(bindings.lookup(0x71, CONTROL_MASK), Some(&WmAction::Quit));
        assert_eq!(
            bindings.lookup(0xff0d, MOD4_MASK),
            Some(&WmAction::Spawn("kitty".to_string()))
        );
        assert_eq!(
            bindings.lookup(0x62, MOD4_MASK),
            Some(&WmAction::Spawn("firefox".to_string()))
        );
        assert_eq!(
            bindings.lookup(0xff09, MOD4_MASK),
            Some(&WmAction::CycleFocus(Direction::Forward))
        );
        assert_eq!(
            bindings.lookup(0xff09, MOD4_MASK | SHIFT_MASK),
            Some(&WmAction::CycleFocus(Direction::Backward))
        );
        // Same key, different modifiers: no match
        assert_eq!(bindings.lookup(0x71, MOD4_MASK), None);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let toml = r#"
[general]
terminal = "alacritty"
capacity = 8

[keybindings]
quit = "Mod4+Shift+e"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.general.capacity, 8);
        assert_eq!(config.general.browser, "firefox");
        assert!(config.general.reap_children);

        let bindings = config.parse_keybindings();
        assert_eq!(
            bindings.lookup(0x65, MOD4_MASK | SHIFT_MASK),
            Some(&WmAction::Quit)
        );
        assert_eq!(
            bindings.lookup(0xff0d, MOD4_MASK),
            Some(&WmAction::Spawn("alacritty".to_string()))
        );
    }

    #[test]
    fn test_invalid_binding_skipped() {
        let toml = r#"
[keybindings]
spawn_browser = "Mod4+notakey"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let bindings = config.parse_keybindings();
        assert_eq!(bindings.len(), 4);
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[general]\nautostart = []\nreap_children = false").unwrap();

        let config = Config::load_from_path(file.path().to_path_buf());
        assert!(config.general.autostart.is_empty());
        assert!(!config.general.reap_children);
        assert_eq!(config.general.capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn test_load_missing_or_broken_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_path(dir.path().join("absent.toml"));
        assert_eq!(config.general.terminal, "kitty");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[general\ncapacity = ").unwrap();
        let config = Config::load_from_path(file.path().to_path_buf());
        assert_eq!(config.general.autostart, vec!["kitty".to_string()]);
    }
}
