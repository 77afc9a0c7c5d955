/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD, or the
/// per-user data directory). Falls back to sensible defaults if the file is
/// missing or incomplete.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};

/// Application directory name under the data roots.
pub const APP_DIR: &str = "ballroll";

/// File name of the scene-classification override document.
pub const OVERRIDE_FILE: &str = "scene_classification.toml";

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub speed: SpeedConfig,
    pub ui: UiConfig,
    pub gamepad: GamepadConfig,
    /// Where the classification override is looked for.
    pub override_path: PathBuf,
    /// Resolved progression file, if one was found.
    pub progression_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct SpeedConfig {
    pub tick_rate_ms: u64,
    /// How long a UI transition holds the guard.
    pub transition_ms: u64,
    /// Ticks between ball steps while a roll key is held.
    pub roll_rate: u32,
}

#[derive(Clone, Debug)]
pub struct UiConfig {
    /// Lifetime used when a notification asks for none (or a nonsense one).
    pub notification_seconds: f32,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub pause: Vec<String>,
}

impl SpeedConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }

    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    ui: TomlUi,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    paths: TomlPaths,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_transition")]
    transition_ms: u64,
    #[serde(default = "default_roll_rate")]
    roll_rate: u32,
}

#[derive(Deserialize, Debug)]
struct TomlUi {
    #[serde(default = "default_notification_seconds")]
    notification_seconds: f32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_pause")]
    pause: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlPaths {
    #[serde(default)]
    classification_override: Option<String>,
    #[serde(default = "default_progression")]
    progression: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 50 }
fn default_transition() -> u64 { 250 }
fn default_roll_rate() -> u32 { 2 }
fn default_notification_seconds() -> f32 { 3.0 }

fn default_confirm() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_cancel() -> Vec<String> { vec!["B".into(), "Select".into()] }
fn default_pause() -> Vec<String> { vec!["Start".into()] }
fn default_progression() -> String { "progression.toml".into() }

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed {
            tick_rate_ms: default_tick_rate(),
            transition_ms: default_transition(),
            roll_rate: default_roll_rate(),
        }
    }
}

impl Default for TomlUi {
    fn default() -> Self {
        TomlUi { notification_seconds: default_notification_seconds() }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            confirm: default_confirm(),
            cancel: default_cancel(),
            pause: default_pause(),
        }
    }
}

impl Default for TomlPaths {
    fn default() -> Self {
        TomlPaths {
            classification_override: None,
            progression: default_progression(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: exe directory, CWD, user data dir, system data dir.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse a config document directly. Used by tests and tools that
    /// already hold the text; search dirs only resolve relative paths.
    #[allow(dead_code)]
    pub fn from_str_in(text: &str, search_dirs: &[PathBuf]) -> Self {
        let toml_cfg = match toml::from_str::<TomlConfig>(text) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("config parse error: {e}; using default settings");
                TomlConfig::default()
            }
        };
        Self::from_toml(toml_cfg, search_dirs)
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let override_path = match toml_cfg.paths.classification_override {
            Some(p) if !p.trim().is_empty() => PathBuf::from(p),
            _ => user_data_dir().join(OVERRIDE_FILE),
        };

        let progression_path = resolve_in(search_dirs, &toml_cfg.paths.progression);

        let notification_seconds = if toml_cfg.ui.notification_seconds.is_finite()
            && toml_cfg.ui.notification_seconds > 0.0
        {
            toml_cfg.ui.notification_seconds
        } else {
            warn!(
                "ui.notification_seconds = {} is not usable; using {}",
                toml_cfg.ui.notification_seconds,
                default_notification_seconds()
            );
            default_notification_seconds()
        };

        GameConfig {
            speed: SpeedConfig {
                tick_rate_ms: toml_cfg.speed.tick_rate_ms.max(1),
                transition_ms: toml_cfg.speed.transition_ms,
                roll_rate: toml_cfg.speed.roll_rate.max(1),
            },
            ui: UiConfig { notification_seconds },
            gamepad: GamepadConfig {
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
                pause: toml_cfg.gamepad.pause,
            },
            override_path,
            progression_path,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), &[])
    }
}

/// Absolute paths are taken as-is; relative ones must exist in a search dir.
fn resolve_in(search_dirs: &[PathBuf], name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    if path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }
    search_dirs.iter().map(|d| d.join(name)).find(|p| p.is_file())
}

/// Per-user writable data directory (`$XDG_DATA_HOME/ballroll` or
/// `~/.local/share/ballroll`). Falls back to CWD.
pub fn user_data_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join(APP_DIR);
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/share").join(APP_DIR);
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Candidate directories to search: exe dir + CWD + data paths (deduplicated).
pub fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = vec![];

    // Resolve symlinks so a linked binary still finds data next to the real one.
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    let user = user_data_dir();
    if user.is_dir() && !dirs.iter().any(|d| d == &user) {
        dirs.push(user);
    }

    let sys = PathBuf::from("/usr/share").join(APP_DIR);
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => {
                    info!("loaded {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    warn!("config.toml parse error: {e}; using default settings");
                    return TomlConfig::default();
                }
            },
            Err(e) => warn!("could not read {}: {e}", path.display()),
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = GameConfig::from_str_in("", &[]);
        assert_eq!(cfg.speed.tick_rate_ms, 50);
        assert_eq!(cfg.speed.transition_ms, 250);
        assert_eq!(cfg.ui.notification_seconds, 3.0);
        assert_eq!(cfg.gamepad.pause, vec!["Start".to_string()]);
        assert!(cfg.progression_path.is_none());
        assert!(cfg.override_path.ends_with(OVERRIDE_FILE));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::from_str_in("[speed]\ntransition_ms = 0\n", &[]);
        assert_eq!(cfg.speed.transition_ms, 0);
        assert_eq!(cfg.speed.tick_rate_ms, 50);
        assert_eq!(cfg.speed.roll_rate, 2);
    }

    #[test]
    fn malformed_document_falls_back() {
        let cfg = GameConfig::from_str_in("[speed\ntick_rate_ms = ", &[]);
        assert_eq!(cfg.speed.tick_rate_ms, 50);
    }

    #[test]
    fn unusable_notification_lifetime_is_replaced() {
        let cfg = GameConfig::from_str_in("[ui]\nnotification_seconds = -1.0\n", &[]);
        assert_eq!(cfg.ui.notification_seconds, 3.0);
    }

    #[test]
    fn explicit_override_path_is_used() {
        let cfg = GameConfig::from_str_in(
            "[paths]\nclassification_override = \"/tmp/x/override.toml\"\n",
            &[],
        );
        assert_eq!(cfg.override_path, PathBuf::from("/tmp/x/override.toml"));
    }

    #[test]
    fn progression_file_resolved_from_search_dirs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("progression.toml"), "").unwrap();
        let cfg = GameConfig::from_str_in("", &[dir.path().to_path_buf()]);
        assert_eq!(cfg.progression_path, Some(dir.path().join("progression.toml")));
    }
}
