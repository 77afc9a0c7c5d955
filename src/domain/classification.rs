/// Scene classification: may a scene run procedural content generation?
///
/// ## Sources (per field, priority order):
///   1. Override document `scene_classification.toml` (non-empty arrays only)
///   2. Compiled-in defaults
///
/// ## Override format:
///   ```toml
///   procedural_scenes = ["Level_OSM", "Level_Forest"]
///   static_scenes = ["Level1"]
///   ```
///   camelCase keys (`proceduralScenes`, `staticScenes`) are accepted too.
///
/// The merged result is computed once per store and cached; the override is
/// never re-read during a session. Names compare case-insensitively.

use std::cell::OnceCell;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Deserialize;

pub const DEFAULT_PROCEDURAL: &[&str] = &["Level_OSM", "Level_Procedural", "Level_Endless"];
pub const DEFAULT_STATIC: &[&str] = &["MainMenu", "Level1", "Level2", "Level3"];

// ══════════════════════════════════════════════════════════════
// Data
// ══════════════════════════════════════════════════════════════

/// Case-insensitive set of scene names that remembers authoring order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SceneSet {
    names: Vec<String>,
    folded: HashSet<String>,
}

impl SceneSet {
    /// Blank names are skipped; case-insensitive duplicates keep the first spelling.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = SceneSet::default();
        for name in names {
            let name: String = name.into();
            let trimmed = name.trim();
            if trimmed.is_empty() {
                continue;
            }
            if set.folded.insert(fold(trimmed)) {
                set.names.push(trimmed.to_string());
            }
        }
        set
    }

    pub fn contains(&self, name: &str) -> bool {
        self.folded.contains(&fold(name.trim()))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn fold(name: &str) -> String {
    name.to_lowercase()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneClassificationConfig {
    procedural: SceneSet,
    statics: SceneSet,
}

impl SceneClassificationConfig {
    pub fn new(procedural: SceneSet, statics: SceneSet) -> Self {
        SceneClassificationConfig { procedural, statics }
    }

    /// The compiled-in classification.
    pub fn defaults() -> Self {
        Self::new(
            SceneSet::from_names(DEFAULT_PROCEDURAL.iter().copied()),
            SceneSet::from_names(DEFAULT_STATIC.iter().copied()),
        )
    }

    pub fn procedural(&self) -> &SceneSet {
        &self.procedural
    }

    pub fn statics(&self) -> &SceneSet {
        &self.statics
    }

    /// Names listed in both sets. They classify as procedural.
    pub fn overlaps(&self) -> Vec<&str> {
        self.procedural
            .names()
            .iter()
            .filter(|n| self.statics.contains(n))
            .map(String::as_str)
            .collect()
    }

    /// Each non-empty override array replaces its field wholesale.
    fn apply(mut self, doc: OverrideDoc) -> Self {
        let procedural = SceneSet::from_names(doc.procedural_scenes);
        if !procedural.is_empty() {
            self.procedural = procedural;
        }
        let statics = SceneSet::from_names(doc.static_scenes);
        if !statics.is_empty() {
            self.statics = statics;
        }
        self
    }
}

impl Default for SceneClassificationConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

#[derive(Deserialize, Debug, Default)]
struct OverrideDoc {
    #[serde(default, alias = "proceduralScenes")]
    procedural_scenes: Vec<String>,
    #[serde(default, alias = "staticScenes")]
    static_scenes: Vec<String>,
}

// ══════════════════════════════════════════════════════════════
// Errors (recovered locally, never returned by `load`)
// ══════════════════════════════════════════════════════════════

#[derive(Debug)]
pub enum OverrideError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
}

impl fmt::Display for OverrideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverrideError::Io(path, e) => write!(f, "could not read {}: {e}", path.display()),
            OverrideError::Parse(path, e) => write!(f, "malformed {}: {e}", path.display()),
        }
    }
}

impl std::error::Error for OverrideError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OverrideError::Io(_, e) => Some(e),
            OverrideError::Parse(_, e) => Some(e),
        }
    }
}

/// `Ok(None)` when the file simply isn't there.
fn read_override(path: &Path) -> Result<Option<OverrideDoc>, OverrideError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(OverrideError::Io(path.to_path_buf(), e)),
    };
    toml::from_str::<OverrideDoc>(&text)
        .map(Some)
        .map_err(|e| OverrideError::Parse(path.to_path_buf(), e))
}

// ══════════════════════════════════════════════════════════════
// ConfigStore
// ══════════════════════════════════════════════════════════════

pub struct ConfigStore {
    override_path: Option<PathBuf>,
    cache: OnceCell<SceneClassificationConfig>,
}

impl ConfigStore {
    /// Store backed by defaults plus the override at `path` (if it exists).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ConfigStore {
            override_path: Some(path.into()),
            cache: OnceCell::new(),
        }
    }

    /// Store that never touches the filesystem.
    #[allow(dead_code)]
    pub fn defaults_only() -> Self {
        ConfigStore { override_path: None, cache: OnceCell::new() }
    }

    /// Store pre-seeded with an already merged config.
    #[allow(dead_code)]
    pub fn with_config(config: SceneClassificationConfig) -> Self {
        ConfigStore {
            override_path: None,
            cache: OnceCell::from(config),
        }
    }

    /// Merged classification. The first call reads the override; later calls
    /// return the cached value.
    pub fn load(&self) -> &SceneClassificationConfig {
        self.cache.get_or_init(|| self.read_merged())
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.get().is_some()
    }

    pub fn override_path(&self) -> Option<&Path> {
        self.override_path.as_deref()
    }

    fn read_merged(&self) -> SceneClassificationConfig {
        let defaults = SceneClassificationConfig::defaults();
        let Some(path) = self.override_path.as_deref() else {
            return defaults;
        };

        let merged = match read_override(path) {
            Ok(None) => {
                info!("no classification override at {}", path.display());
                defaults
            }
            Ok(Some(doc)) => {
                info!("applying classification override from {}", path.display());
                defaults.apply(doc)
            }
            Err(e) => {
                warn!("{e}; keeping built-in scene classification");
                defaults
            }
        };

        for name in merged.overlaps() {
            warn!("scene {name:?} is both procedural and static; treating as procedural");
        }
        merged
    }
}

// ══════════════════════════════════════════════════════════════
// SceneClassifier
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SceneKind {
    Procedural,
    Static,
    Unknown,
}

impl SceneKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SceneKind::Procedural => "procedural",
            SceneKind::Static => "static",
            SceneKind::Unknown => "unknown",
        }
    }

    /// Only procedural scenes may generate content at runtime.
    pub fn allows_generation(self) -> bool {
        matches!(self, SceneKind::Procedural)
    }
}

pub struct SceneClassifier {
    store: ConfigStore,
}

impl SceneClassifier {
    pub fn new(store: ConfigStore) -> Self {
        SceneClassifier { store }
    }

    pub fn is_procedural(&self, scene: &str) -> bool {
        self.store.load().procedural().contains(scene)
    }

    pub fn is_static(&self, scene: &str) -> bool {
        self.store.load().statics().contains(scene)
    }

    /// Procedural is checked first, so a name in both sets is procedural.
    pub fn classify(&self, scene: &str) -> SceneKind {
        if self.is_procedural(scene) {
            SceneKind::Procedural
        } else if self.is_static(scene) {
            SceneKind::Static
        } else {
            SceneKind::Unknown
        }
    }
}
