/// Session: the single owner of every orchestration service.
///
/// Holds the classifier, the progression graph, the UI state machine, the
/// session-wide notification channel and the course for the active scene.
/// There are no globals; the front end drives everything through this type.
///
/// ## Scene flow
///   MainMenu → (new game) first level → (complete) LevelComplete
///     → (advance) next level ... → end of content → MainMenu
///
/// The course only steps in `GamePlay` with no UI transition in flight, so a
/// completion can never arrive while the transition guard would drop it.

use std::collections::HashMap;
use std::time::Duration;

use log::{info, warn};

use crate::domain::classification::{SceneClassifier, SceneKind};
use crate::domain::progression::ProgressionGraph;
use crate::domain::track::Roll;
use crate::ui::state::{UiState, UiStateMachine, UI_SUBSCRIBER};
use super::course::{Course, LevelManager};
use super::event::{CourseEvent, EventChannel, LevelEvent, NotificationRequest, SceneLoaded};

pub const MAIN_MENU_SCENE: &str = "MainMenu";

pub struct Session {
    classifier: SceneClassifier,
    progression: ProgressionGraph,
    ui: UiStateMachine,
    notifications: EventChannel<NotificationRequest>,
    course: Option<Course>,
    scene: String,
    scene_kind: SceneKind,
    /// Best completed score per scene.
    best_scores: HashMap<String, u32>,
    /// Times each scene has been loaded; seeds procedural layouts.
    rounds: HashMap<String, u32>,
    roll_rate: u32,
}

impl Session {
    pub fn new(
        classifier: SceneClassifier,
        progression: ProgressionGraph,
        ui: UiStateMachine,
        roll_rate: u32,
    ) -> Self {
        for issue in progression.issues() {
            warn!("progression: {issue:?}");
        }
        let mut notifications = EventChannel::new();
        notifications.subscribe(UI_SUBSCRIBER);
        let mut session = Session {
            classifier,
            progression,
            ui,
            notifications,
            course: None,
            scene: String::new(),
            scene_kind: SceneKind::Unknown,
            best_scores: HashMap::new(),
            rounds: HashMap::new(),
            roll_rate,
        };
        session.load_scene(MAIN_MENU_SCENE);
        session
    }

    // ── Navigation ──

    /// Start from the first level with a clean score sheet.
    pub fn new_game(&mut self) -> bool {
        if self.ui.is_transitioning() {
            return false;
        }
        if !self.progression.validate() {
            warn!("progression is empty or malformed; cannot start");
            self.notify("No levels available", None);
            return false;
        }
        let Some(first) = self.progression.first_scene().map(str::to_string) else {
            return false;
        };
        self.best_scores.clear();
        info!("new game from {first}");
        self.load_scene(&first);
        self.ui.show_game_ui()
    }

    /// Make `name` the active scene. Tears down the previous course, builds a
    /// new one when `name` is a level, and tells the UI which manager to
    /// listen to.
    pub fn load_scene(&mut self, name: &str) -> SceneKind {
        if let Some(mut old) = self.course.take() {
            self.ui.unbind(&mut old);
        }

        let kind = self.classifier.classify(name);
        let round = self.rounds.entry(name.to_string()).or_insert(0);
        let this_round = *round;
        *round += 1;

        self.course = self
            .progression
            .get_entry(name)
            .cloned()
            .map(|entry| Course::new(entry, kind, this_round, self.roll_rate));
        self.scene = name.to_string();
        self.scene_kind = kind;
        info!("loaded scene {name} ({}, round {this_round})", kind.as_str());

        let loaded = SceneLoaded { scene_name: name.to_string(), kind };
        let manager = self.course.as_mut().map(|c| c as &mut dyn LevelManager);
        self.ui.on_scene_loaded(&loaded, manager);
        kind
    }

    /// Leave whatever is running and show the main menu.
    pub fn return_to_main_menu(&mut self) {
        self.load_scene(MAIN_MENU_SCENE);
        self.ui.reset();
    }

    /// Gameplay ⇄ pause menu. Ignored elsewhere.
    pub fn toggle_pause(&mut self) -> bool {
        match self.ui.state() {
            UiState::GamePlay => self.ui.show_pause_menu(),
            UiState::PauseMenu => self.ui.show_game_ui(),
            _ => false,
        }
    }

    /// From the completion screen, move to the next scene in the progression.
    /// At the end of content the player goes back to the main menu.
    pub fn advance_level(&mut self) -> bool {
        if self.ui.is_transitioning() || self.ui.state() != UiState::LevelComplete {
            return false;
        }
        if !self.progression.validate() {
            warn!("progression is empty or malformed; returning to main menu");
            self.return_to_main_menu();
            self.notify("Level data unavailable", None);
            return false;
        }

        let current = self.scene.clone();
        let Some(next) = self.progression.next_scene(&current).map(str::to_string) else {
            info!("{current} is the last level");
            self.return_to_main_menu();
            self.notify("All levels complete!", None);
            return true;
        };

        if !self.progression.has_level(&next) {
            warn!("{current} points at {next}, which has no entry; treating as end of content");
            self.return_to_main_menu();
            self.notify("All levels complete!", None);
            return true;
        }

        let prior = self.best_scores.get(&current).copied();
        if !self.progression.can_enter(&next, Some(&current), prior) {
            let needed = self
                .progression
                .get_entry(&next)
                .map(|e| e.minimum_score)
                .unwrap_or(0);
            info!("{next} locked: needs {needed}, have {prior:?}");
            self.notify(format!("Score {needed} needed to continue"), None);
            return false;
        }

        self.load_scene(&next);
        self.ui.show_game_ui()
    }

    /// Replay the current level (new round) from pause or the completion screen.
    pub fn retry(&mut self) -> bool {
        if self.ui.is_transitioning() || self.course.is_none() {
            return false;
        }
        if !matches!(self.ui.state(), UiState::PauseMenu | UiState::LevelComplete) {
            return false;
        }
        let scene = self.scene.clone();
        self.load_scene(&scene);
        self.ui.show_game_ui()
    }

    /// Goal-trigger shortcut: complete the running level now.
    pub fn force_complete(&mut self) -> bool {
        if self.ui.state() != UiState::GamePlay || self.ui.is_transitioning() {
            return false;
        }
        match self.course.as_mut() {
            Some(course) => {
                course.force_complete();
                true
            }
            None => false,
        }
    }

    /// Queue a transient message; shown on the next update.
    pub fn notify(&mut self, message: impl Into<String>, duration: Option<f32>) {
        self.notifications.publish(NotificationRequest::new(message, duration));
    }

    // ── Tick ──

    /// One frame: step the course, deliver level events and notifications to
    /// the UI, then advance scheduled UI effects by `dt`.
    pub fn update(&mut self, dt: Duration, roll: Option<Roll>) -> Vec<CourseEvent> {
        let mut out = Vec::new();
        let live = self.ui.state() == UiState::GamePlay && !self.ui.is_transitioning();

        if let Some(course) = self.course.as_mut() {
            if live {
                out = course.step(roll);
            }
            let score = course.score();
            let events = self.ui.pump_level_events(course);
            for event in &events {
                if let LevelEvent::LevelCompleted(level) = event {
                    let best = self.best_scores.entry(level.scene_name.clone()).or_insert(0);
                    *best = (*best).max(score);
                    let hint = next_hint(&self.progression, &level.scene_name);
                    self.ui.set_next_hint(&hint);
                    info!("completed {} with {score}", level.scene_name);
                }
            }
        }

        self.ui.pump_notifications(&mut self.notifications);
        self.ui.tick(dt);
        out
    }

    // ── Accessors ──

    pub fn ui(&self) -> &UiStateMachine {
        &self.ui
    }

    pub fn course(&self) -> Option<&Course> {
        self.course.as_ref()
    }

    pub fn scene(&self) -> &str {
        &self.scene
    }

    pub fn scene_kind(&self) -> SceneKind {
        self.scene_kind
    }

    pub fn progression(&self) -> &ProgressionGraph {
        &self.progression
    }

    pub fn classifier(&self) -> &SceneClassifier {
        &self.classifier
    }

    pub fn best_score(&self, scene: &str) -> Option<u32> {
        self.best_scores.get(scene).copied()
    }

    /// Sum of best scores across every completed level.
    pub fn total_score(&self) -> u32 {
        self.best_scores.values().sum()
    }
}

fn next_hint(progression: &ProgressionGraph, scene: &str) -> String {
    let Some(next) = progression.next_scene(scene).filter(|n| progression.has_level(n)) else {
        return "Final level - [Enter] Main menu".to_string();
    };
    if next == scene {
        return "[Enter] Play again".to_string();
    }
    let label = progression.get_entry(next).map_or(next, |e| e.label());
    format!("Next: {label} - [Enter] Continue")
}
