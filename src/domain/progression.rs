/// Level progression: the ordered sequence of levels and "what comes next".
///
/// ## Source (priority order):
///   1. `progression.toml` (array of `[[level]]` tables)
///   2. Built-in default sequence
///
/// ## File format:
///   ```toml
///   [[level]]
///   scene_name = "Level1"
///   display_name = "Meadow Run"
///   level_index = 1
///   next_scene_name = "Level2"
///
///   [[level]]
///   scene_name = "Level_OSM"
///   display_name = "Open Streets"
///   next_scene_name = "Level_OSM"
///   is_endless_mode = true
///   ```
///
/// An empty `next_scene_name` marks the end of content. Lookups are by exact
/// scene name through an index built once at construction.

use std::collections::HashMap;
use std::path::Path;

use log::{info, warn};
use serde::Deserialize;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LevelEntry {
    pub scene_name: String,
    #[serde(default)]
    pub display_name: String,
    /// Ordering hint only; need not be contiguous.
    #[serde(default)]
    pub level_index: i32,
    #[serde(default)]
    pub next_scene_name: String,
    #[serde(default)]
    pub is_endless_mode: bool,
    #[serde(default)]
    pub requires_previous_completion: bool,
    #[serde(default)]
    pub minimum_score: u32,
}

impl LevelEntry {
    pub fn new(scene: &str, display: &str, index: i32, next: &str) -> Self {
        LevelEntry {
            scene_name: scene.to_string(),
            display_name: display.to_string(),
            level_index: index,
            next_scene_name: next.to_string(),
            is_endless_mode: false,
            requires_previous_completion: false,
            minimum_score: 0,
        }
    }

    pub fn requiring(mut self, minimum_score: u32) -> Self {
        self.requires_previous_completion = true;
        self.minimum_score = minimum_score;
        self
    }

    pub fn endless(mut self) -> Self {
        self.is_endless_mode = true;
        self
    }

    /// Display name, or the scene name when none was authored.
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.scene_name
        } else {
            &self.display_name
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next_scene_name.is_empty()
    }

    pub fn is_self_loop(&self) -> bool {
        self.next_scene_name == self.scene_name
    }
}

/// Structural findings that do not, on their own, fail validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressionIssue {
    /// Second (or later) entry with an already indexed scene name.
    DuplicateScene { scene: String, kept: usize, ignored: usize },
    /// `next_scene_name` names a scene that has no entry.
    DanglingNext { scene: String, next: String },
    /// Endless entry whose next scene is not itself.
    EndlessWithoutSelfLoop { scene: String },
}

#[derive(Deserialize, Debug, Default)]
struct ProgressionDoc {
    #[serde(default, rename = "level")]
    levels: Vec<LevelEntry>,
}

pub struct ProgressionGraph {
    entries: Vec<LevelEntry>,
    index: HashMap<String, usize>,
    issues: Vec<ProgressionIssue>,
}

// ── Construction ──

impl ProgressionGraph {
    pub fn new(entries: Vec<LevelEntry>) -> Self {
        let mut graph = ProgressionGraph {
            entries: vec![],
            index: HashMap::new(),
            issues: vec![],
        };
        graph.replace_all(entries);
        graph
    }

    /// The built-in sequence.
    pub fn defaults() -> Self {
        Self::new(default_entries())
    }

    /// Parse a progression document.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let doc: ProgressionDoc = toml::from_str(text)?;
        Ok(Self::new(doc.levels))
    }

    /// Load from `path` when given and readable; otherwise the built-in sequence.
    /// A malformed file is logged and ignored.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::defaults();
        };
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("could not read {}: {e}; using built-in levels", path.display());
                return Self::defaults();
            }
        };
        match Self::from_toml_str(&text) {
            Ok(graph) => {
                info!("loaded {} levels from {}", graph.len(), path.display());
                graph
            }
            Err(e) => {
                warn!("malformed {}: {e}; using built-in levels", path.display());
                Self::defaults()
            }
        }
    }

    /// Bulk replace of the whole sequence (authoring tool / fixtures).
    pub fn replace_all(&mut self, entries: Vec<LevelEntry>) {
        self.entries = entries;
        self.reindex();
    }

    /// Overwrite everything with the built-in sequence.
    #[allow(dead_code)]
    pub fn reset_to_defaults(&mut self) {
        self.replace_all(default_entries());
    }

    fn reindex(&mut self) {
        self.index.clear();
        self.issues.clear();

        for (i, entry) in self.entries.iter().enumerate() {
            if entry.scene_name.is_empty() {
                continue;
            }
            match self.index.get(&entry.scene_name) {
                Some(&kept) => {
                    warn!(
                        "duplicate level {:?} at position {i}; keeping position {kept}",
                        entry.scene_name
                    );
                    self.issues.push(ProgressionIssue::DuplicateScene {
                        scene: entry.scene_name.clone(),
                        kept,
                        ignored: i,
                    });
                }
                None => {
                    self.index.insert(entry.scene_name.clone(), i);
                }
            }
        }

        for entry in &self.entries {
            if !entry.next_scene_name.is_empty() && !self.index.contains_key(&entry.next_scene_name) {
                self.issues.push(ProgressionIssue::DanglingNext {
                    scene: entry.scene_name.clone(),
                    next: entry.next_scene_name.clone(),
                });
            }
            if entry.is_endless_mode && !entry.is_self_loop() {
                self.issues.push(ProgressionIssue::EndlessWithoutSelfLoop {
                    scene: entry.scene_name.clone(),
                });
            }
        }
    }
}

// ── Queries ──

impl ProgressionGraph {
    /// Next scene for `current`, or `""` when `current` is unknown or terminal.
    pub fn get_next_scene(&self, current: &str) -> &str {
        self.get_entry(current)
            .map(|e| e.next_scene_name.as_str())
            .unwrap_or("")
    }

    /// Like `get_next_scene`, with "no further progression" as `None`.
    pub fn next_scene(&self, current: &str) -> Option<&str> {
        Some(self.get_next_scene(current)).filter(|s| !s.is_empty())
    }

    pub fn get_entry(&self, scene: &str) -> Option<&LevelEntry> {
        self.index.get(scene).map(|&i| &self.entries[i])
    }

    pub fn has_level(&self, scene: &str) -> bool {
        self.get_entry(scene).is_some()
    }

    /// Scene names in authoring order.
    pub fn all_scene_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.scene_name.as_str()).collect()
    }

    pub fn first_scene(&self) -> Option<&str> {
        self.entries
            .iter()
            .map(|e| e.scene_name.as_str())
            .find(|s| !s.is_empty())
    }

    pub fn entries(&self) -> &[LevelEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn issues(&self) -> &[ProgressionIssue] {
        &self.issues
    }

    /// Structural precondition: non-empty, and every entry has a scene name.
    /// A graph that fails this must not be used for navigation.
    pub fn validate(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|e| !e.scene_name.is_empty())
    }

    /// Entry policy. `from` is the scene being left (if any) and
    /// `prior_score` the player's recorded score for it.
    ///
    /// Replaying an endless level from itself is never gated.
    pub fn can_enter(&self, scene: &str, from: Option<&str>, prior_score: Option<u32>) -> bool {
        let Some(entry) = self.get_entry(scene) else {
            return false;
        };
        if entry.is_endless_mode && from == Some(scene) {
            return true;
        }
        if !entry.requires_previous_completion {
            return true;
        }
        prior_score.is_some_and(|score| score >= entry.minimum_score)
    }
}

impl Default for ProgressionGraph {
    fn default() -> Self {
        Self::defaults()
    }
}

// ══════════════════════════════════════════════════════════════
// Built-in sequence
// ══════════════════════════════════════════════════════════════

pub fn default_entries() -> Vec<LevelEntry> {
    vec![
        LevelEntry::new("Level1", "Meadow Run", 1, "Level2"),
        LevelEntry::new("Level2", "Canyon Drop", 2, "Level3").requiring(300),
        LevelEntry::new("Level3", "Sky Bridge", 3, "Level_OSM").requiring(500),
        LevelEntry::new("Level_OSM", "Open Streets", 10, "Level_OSM").endless(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> ProgressionGraph {
        ProgressionGraph::new(vec![
            LevelEntry::new("Level1", "Level 1", 1, "Level2"),
            LevelEntry::new("Level2", "Level 2", 2, "Level3"),
            LevelEntry::new("Level3", "Level 3", 3, "Level_OSM"),
            LevelEntry::new("Level_OSM", "Open Streets", 4, "Level_OSM").endless(),
        ])
    }

    // ── Next-scene resolution ──

    #[test]
    fn next_scene_follows_sequence() {
        let g = fixture();
        assert_eq!(g.get_next_scene("Level1"), "Level2");
        assert_eq!(g.get_next_scene("Level3"), "Level_OSM");
    }

    #[test]
    fn endless_level_loops_to_itself() {
        let g = fixture();
        assert_eq!(g.get_next_scene("Level_OSM"), "Level_OSM");
        assert!(g.get_entry("Level_OSM").unwrap().is_self_loop());
    }

    #[test]
    fn unknown_scene_has_no_next() {
        let g = fixture();
        assert_eq!(g.get_next_scene("NoSuchScene"), "");
        assert_eq!(g.next_scene("NoSuchScene"), None);
        assert!(!g.has_level("NoSuchScene"));
    }

    #[test]
    fn terminal_entry_has_no_next() {
        let g = ProgressionGraph::new(vec![LevelEntry::new("Finale", "", 1, "")]);
        assert_eq!(g.get_next_scene("Finale"), "");
        assert_eq!(g.next_scene("Finale"), None);
        assert!(g.get_entry("Finale").unwrap().is_terminal());
        assert_eq!(g.get_entry("Finale").unwrap().label(), "Finale");
    }

    #[test]
    fn lookup_is_exact_match() {
        let g = fixture();
        assert!(g.has_level("Level1"));
        assert!(!g.has_level("level1"));
    }

    #[test]
    fn all_scene_names_keep_authoring_order() {
        let g = fixture();
        assert_eq!(g.all_scene_names(), vec!["Level1", "Level2", "Level3", "Level_OSM"]);
        assert_eq!(g.first_scene(), Some("Level1"));
    }

    // ── Validation ──

    #[test]
    fn validate_rejects_empty_sequence() {
        assert!(!ProgressionGraph::new(vec![]).validate());
    }

    #[test]
    fn validate_rejects_blank_scene_name() {
        let g = ProgressionGraph::new(vec![
            LevelEntry::new("Level1", "", 1, "Level2"),
            LevelEntry::new("", "Nameless", 2, ""),
        ]);
        assert!(!g.validate());
    }

    #[test]
    fn validate_accepts_fixture() {
        let g = fixture();
        assert!(g.validate());
        assert!(g.issues().is_empty());
    }

    #[test]
    fn duplicates_are_reported_and_first_wins() {
        let g = ProgressionGraph::new(vec![
            LevelEntry::new("Level1", "First", 1, ""),
            LevelEntry::new("Level1", "Second", 2, ""),
        ]);
        assert!(g.validate());
        assert_eq!(g.get_entry("Level1").unwrap().display_name, "First");
        assert_eq!(
            g.issues(),
            &[ProgressionIssue::DuplicateScene { scene: "Level1".into(), kept: 0, ignored: 1 }]
        );
    }

    #[test]
    fn dangling_and_broken_endless_are_reported() {
        let g = ProgressionGraph::new(vec![
            LevelEntry::new("Level1", "", 1, "Nowhere"),
            LevelEntry::new("Loop", "", 2, "Level1").endless(),
        ]);
        assert!(g.validate());
        assert!(g.issues().contains(&ProgressionIssue::DanglingNext {
            scene: "Level1".into(),
            next: "Nowhere".into()
        }));
        assert!(g
            .issues()
            .contains(&ProgressionIssue::EndlessWithoutSelfLoop { scene: "Loop".into() }));
    }

    // ── Entry policy ──

    #[test]
    fn entry_policy_checks_minimum_score() {
        let g = ProgressionGraph::defaults();
        assert!(g.can_enter("Level1", None, None));
        assert!(!g.can_enter("Level2", Some("Level1"), None));
        assert!(!g.can_enter("Level2", Some("Level1"), Some(299)));
        assert!(g.can_enter("Level2", Some("Level1"), Some(300)));
        assert!(!g.can_enter("Nowhere", None, Some(1_000)));
    }

    #[test]
    fn endless_replay_is_not_gated() {
        let g = ProgressionGraph::new(vec![
            LevelEntry::new("Loop", "", 1, "Loop").endless().requiring(900),
        ]);
        assert!(g.can_enter("Loop", Some("Loop"), Some(0)));
        assert!(!g.can_enter("Loop", Some("Elsewhere"), Some(0)));
    }

    // ── Authoring / loading ──

    #[test]
    fn reset_to_defaults_replaces_everything() {
        let mut g = ProgressionGraph::new(vec![LevelEntry::new("Only", "", 1, "")]);
        g.reset_to_defaults();
        assert!(!g.has_level("Only"));
        assert_eq!(g.all_scene_names(), vec!["Level1", "Level2", "Level3", "Level_OSM"]);
        assert!(g.issues().is_empty());
    }

    #[test]
    fn parses_progression_document() {
        let text = r#"
            [[level]]
            scene_name = "Level1"
            display_name = "Meadow Run"
            next_scene_name = "Level_OSM"

            [[level]]
            scene_name = "Level_OSM"
            next_scene_name = "Level_OSM"
            is_endless_mode = true
            requires_previous_completion = true
            minimum_score = 200
        "#;
        let g = ProgressionGraph::from_toml_str(text).unwrap();
        assert!(g.validate());
        assert_eq!(g.get_next_scene("Level1"), "Level_OSM");
        let osm = g.get_entry("Level_OSM").unwrap();
        assert!(osm.is_endless_mode);
        assert_eq!(osm.minimum_score, 200);
        assert_eq!(osm.label(), "Level_OSM");
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progression.toml");
        std::fs::write(&path, "[[level]]\nscene_name = 5\n").unwrap();
        let g = ProgressionGraph::load_or_default(Some(&path));
        assert_eq!(g.all_scene_names(), ProgressionGraph::defaults().all_scene_names());
    }

    #[test]
    fn empty_file_loads_an_invalid_graph() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progression.toml");
        std::fs::write(&path, "").unwrap();
        let g = ProgressionGraph::load_or_default(Some(&path));
        assert!(!g.validate());
    }
}
