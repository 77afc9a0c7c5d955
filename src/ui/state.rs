/// UI presentation state machine.
///
/// Four mutually exclusive screens; exactly one is current and at most one
/// panel is visible. Every transition hides all panels and then shows the
/// target.
///
/// ## Transition guard
///
/// A transition holds `is_transitioning` until its pop-in settles (a
/// scheduled continuation `transition` after it started, or immediately when
/// that window is zero). Requests that arrive while the guard is held are
/// dropped, not queued.
///
/// ## Inputs
///   - navigation: `show_main_menu` / `show_game_ui` / `show_pause_menu`
///   - level events (scene-scoped subscription): completion, collectible counts
///   - notification requests (session-wide channel)
///   - scene loads: re-bind to the new level manager and resync counts

use std::time::Duration;

use log::{debug, info};

use crate::domain::progression::LevelEntry;
use crate::sim::course::LevelManager;
use crate::sim::event::{EventChannel, LevelEvent, NotificationRequest, SceneLoaded, SubscriberId};
use crate::sim::scheduler::{OwnerId, Scheduler};
use super::notification::{self, Notification, NotificationId};
use super::panel::{self, Labels, Panels, POP_START_SCALE};

/// Subscriber id the UI uses on every channel.
pub const UI_SUBSCRIBER: SubscriberId = SubscriberId(1);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum UiState {
    MainMenu,
    GamePlay,
    PauseMenu,
    LevelComplete,
}

impl UiState {
    pub const ALL: [UiState; 4] = [
        UiState::MainMenu,
        UiState::GamePlay,
        UiState::PauseMenu,
        UiState::LevelComplete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UiState::MainMenu => "main menu",
            UiState::GamePlay => "gameplay",
            UiState::PauseMenu => "pause menu",
            UiState::LevelComplete => "level complete",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum UiTask {
    Settle,
    Expire(NotificationId),
}

pub struct UiStateMachine {
    state: UiState,
    is_transitioning: bool,
    panels: Panels,
    labels: Labels,

    // ── Scheduled effects ──
    scheduler: Scheduler<UiTask>,
    transition_owner: OwnerId,
    transition: Duration,
    transition_started: Duration,

    // ── Notifications ──
    notifications: Vec<Notification>,
    next_notification: u32,
    default_notification_secs: f32,

    // ── Derived display values ──
    counts: Option<(u32, u32)>,
    completion_message: Option<String>,

    // ── Subscriptions ──
    bound_scene: Option<String>,
    dropped_requests: u32,
}

// ── Construction ──

impl UiStateMachine {
    pub fn new(panels: Panels, labels: Labels, transition: Duration, default_notification_secs: f32) -> Self {
        let mut scheduler = Scheduler::new();
        let transition_owner = scheduler.owner();
        let mut ui = UiStateMachine {
            state: UiState::MainMenu,
            is_transitioning: false,
            panels,
            labels,
            scheduler,
            transition_owner,
            transition,
            transition_started: Duration::ZERO,
            notifications: Vec::new(),
            next_notification: 0,
            default_notification_secs,
            counts: None,
            completion_message: None,
            bound_scene: None,
            dropped_requests: 0,
        };
        ui.panels.hide_all();
        ui.panels.show(UiState::MainMenu, 1.0);
        ui
    }

    /// Every panel and label attached.
    pub fn with_full_display(transition: Duration, default_notification_secs: f32) -> Self {
        Self::new(Panels::full(), Labels::full(), transition, default_notification_secs)
    }

    /// No panels or labels; display updates are no-ops.
    #[allow(dead_code)]
    pub fn headless(transition: Duration, default_notification_secs: f32) -> Self {
        Self::new(Panels::none(), Labels::none(), transition, default_notification_secs)
    }
}

// ── Queries ──

impl UiStateMachine {
    pub fn state(&self) -> UiState {
        self.state
    }

    pub fn is_transitioning(&self) -> bool {
        self.is_transitioning
    }

    pub fn panels(&self) -> &Panels {
        &self.panels
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Scheduler time, for effects that scale with age.
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// `total - remaining`, once any counts are known.
    pub fn collected(&self) -> Option<u32> {
        self.counts.map(|(collected, _)| collected)
    }

    /// `(collected, total)`, once any counts are known.
    pub fn counts(&self) -> Option<(u32, u32)> {
        self.counts
    }

    pub fn completion_message(&self) -> Option<&str> {
        self.completion_message.as_deref()
    }

    pub fn bound_scene(&self) -> Option<&str> {
        self.bound_scene.as_deref()
    }

    /// How many transition requests the guard has dropped so far.
    pub fn dropped_requests(&self) -> u32 {
        self.dropped_requests
    }
}

// ── Transitions ──

impl UiStateMachine {
    pub fn show_main_menu(&mut self) -> bool {
        self.transition_to(UiState::MainMenu)
    }

    pub fn show_game_ui(&mut self) -> bool {
        self.transition_to(UiState::GamePlay)
    }

    pub fn show_pause_menu(&mut self) -> bool {
        self.transition_to(UiState::PauseMenu)
    }

    /// Level-completed event: show the completion screen and its message.
    /// A completion the guard drops leaves the previous message in place.
    pub fn on_level_completed(&mut self, level: &LevelEntry) -> bool {
        if !self.transition_to(UiState::LevelComplete) {
            return false;
        }
        let message = format!("{} Complete!", level.label());
        panel::set_text(&mut self.labels.completion, message.as_str());
        self.completion_message = Some(message);
        true
    }

    /// Hint shown on the completion screen about what comes next.
    pub fn set_next_hint(&mut self, hint: &str) {
        panel::set_text(&mut self.labels.next_hint, hint);
    }

    fn transition_to(&mut self, target: UiState) -> bool {
        if self.is_transitioning {
            self.dropped_requests += 1;
            debug!(
                "dropped transition to {} while entering {}",
                target.as_str(),
                self.state.as_str()
            );
            return false;
        }

        self.is_transitioning = true;
        self.panels.hide_all();
        let start_scale = if self.transition.is_zero() { 1.0 } else { POP_START_SCALE };
        self.panels.show(target, start_scale);
        self.state = target;
        self.transition_started = self.scheduler.now();

        if self.transition.is_zero() {
            self.settle();
        } else {
            self.scheduler.schedule(self.transition_owner, self.transition, UiTask::Settle);
        }
        true
    }

    fn settle(&mut self) {
        self.is_transitioning = false;
        if let Some(panel) = self.panels.get_mut(self.state) {
            panel.set_scale(1.0);
        }
    }

    /// Main-menu re-entry: drop pending effects and notifications and show
    /// the main menu regardless of the guard.
    pub fn reset(&mut self) {
        self.scheduler.clear();
        self.notifications.clear();
        self.is_transitioning = false;
        self.completion_message = None;
        panel::set_text(&mut self.labels.completion, "");
        panel::set_text(&mut self.labels.next_hint, "");
        self.panels.hide_all();
        self.panels.show(UiState::MainMenu, 1.0);
        self.state = UiState::MainMenu;
    }

    /// Advance scheduled effects by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        for task in self.scheduler.advance(dt) {
            match task {
                UiTask::Settle => self.settle(),
                UiTask::Expire(id) => self.remove_notification(id),
            }
        }

        if self.is_transitioning && !self.transition.is_zero() {
            let elapsed = self.scheduler.now().saturating_sub(self.transition_started);
            let t = (elapsed.as_secs_f32() / self.transition.as_secs_f32()).min(1.0);
            let scale = POP_START_SCALE + (1.0 - POP_START_SCALE) * t;
            if let Some(panel) = self.panels.get_mut(self.state) {
                panel.set_scale(scale);
            }
        }
    }
}

// ── Non-transition events ──

impl UiStateMachine {
    pub fn on_collectibles_changed(&mut self, remaining: u32, total: u32) {
        let collected = total.saturating_sub(remaining);
        self.counts = Some((collected, total));
        panel::set_text(&mut self.labels.collected, format!("Collected: {collected}/{total}"));
    }

    /// Show a notification now and schedule its teardown.
    pub fn on_notification_requested(&mut self, request: &NotificationRequest) -> NotificationId {
        self.next_notification += 1;
        let id = NotificationId(self.next_notification);
        let lifetime = notification::lifetime(request.duration, self.default_notification_secs);
        let owner = self.scheduler.owner();
        self.scheduler.schedule(owner, lifetime, UiTask::Expire(id));

        self.notifications.push(Notification {
            id,
            message: request.message.clone(),
            lifetime,
            shown_at: self.scheduler.now(),
            owner,
        });
        id
    }

    /// Remove a notification early; its pending teardown is cancelled.
    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        let Some(pos) = self.notifications.iter().position(|n| n.id == id) else {
            return false;
        };
        let n = self.notifications.remove(pos);
        let cancelled = self.scheduler.cancel_owner(n.owner);
        debug!("dismissed notification {} ({cancelled} pending)", n.id.0);
        true
    }

    fn remove_notification(&mut self, id: NotificationId) {
        self.notifications.retain(|n| n.id != id);
    }

    /// Apply queued notification requests from the session-wide channel.
    pub fn pump_notifications(&mut self, channel: &mut EventChannel<NotificationRequest>) {
        channel.subscribe(UI_SUBSCRIBER);
        for request in channel.drain(UI_SUBSCRIBER) {
            self.on_notification_requested(&request);
        }
    }
}

// ── Level-manager binding ──

impl UiStateMachine {
    /// Scene-load signal. Drops the subscription to the previous scene's
    /// manager (it may already be gone), subscribes to the new one and
    /// re-reads its counts. Without a manager the counts are cleared and
    /// updates wait for the next scene that has one.
    pub fn on_scene_loaded(&mut self, scene: &SceneLoaded, manager: Option<&mut dyn LevelManager>) {
        self.bound_scene = None;
        let Some(manager) = manager else {
            debug!("scene {} has no level manager; display updates deferred", scene.scene_name);
            self.counts = None;
            panel::set_text(&mut self.labels.collected, "");
            return;
        };

        if manager.events().subscribe(UI_SUBSCRIBER) {
            debug!("ui subscribed to {}", scene.scene_name);
        }
        self.bound_scene = Some(scene.scene_name.clone());
        self.on_collectibles_changed(manager.collectibles_remaining(), manager.collectibles_total());
        info!(
            "ui bound to {} ({}), {}/{} collected",
            scene.scene_name,
            scene.kind.as_str(),
            self.collected().unwrap_or(0),
            manager.collectibles_total()
        );
    }

    /// Leave a manager's channel (before the manager is torn down).
    pub fn unbind(&mut self, manager: &mut dyn LevelManager) {
        manager.events().unsubscribe(UI_SUBSCRIBER);
        self.bound_scene = None;
    }

    /// Handle everything queued from the bound manager. Returns the events
    /// so the owner can react to them too.
    pub fn pump_level_events(&mut self, manager: &mut dyn LevelManager) -> Vec<LevelEvent> {
        let events = manager.events().drain(UI_SUBSCRIBER);
        for event in &events {
            match event {
                LevelEvent::LevelCompleted(level) => {
                    self.on_level_completed(level);
                }
                LevelEvent::CollectiblesChanged { remaining, total } => {
                    self.on_collectibles_changed(*remaining, *total);
                }
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::classification::SceneKind;
    use crate::sim::course::Course;
    use crate::ui::panel::text;

    const WINDOW: Duration = Duration::from_millis(250);

    fn level(scene: &str, display: &str) -> LevelEntry {
        LevelEntry::new(scene, display, 1, "")
    }

    fn instant() -> UiStateMachine {
        UiStateMachine::with_full_display(Duration::ZERO, 3.0)
    }

    fn guarded() -> UiStateMachine {
        UiStateMachine::with_full_display(WINDOW, 3.0)
    }

    fn loaded(scene: &str) -> SceneLoaded {
        SceneLoaded { scene_name: scene.into(), kind: SceneKind::Static }
    }

    // ── States and panels ──

    #[test]
    fn starts_in_main_menu() {
        let ui = instant();
        assert_eq!(ui.state(), UiState::MainMenu);
        assert_eq!(ui.panels().visible(), Some(UiState::MainMenu));
        assert_eq!(ui.panels().visible_count(), 1);
        assert!(!ui.is_transitioning());
    }

    #[test]
    fn game_then_level_complete() {
        let mut ui = instant();
        assert!(ui.show_game_ui());
        assert!(ui.on_level_completed(&level("Level1", "Meadow Run")));
        assert_eq!(ui.state(), UiState::LevelComplete);
        assert_eq!(ui.panels().visible(), Some(UiState::LevelComplete));
        assert_eq!(ui.panels().visible_count(), 1);
        assert_eq!(ui.completion_message(), Some("Meadow Run Complete!"));
        assert_eq!(text(&ui.labels().completion), Some("Meadow Run Complete!"));
    }

    #[test]
    fn every_transition_leaves_one_visible_panel() {
        let mut ui = instant();
        ui.show_game_ui();
        ui.show_pause_menu();
        ui.show_game_ui();
        ui.on_level_completed(&level("Level1", ""));
        ui.show_main_menu();
        assert_eq!(ui.state(), UiState::MainMenu);
        assert_eq!(ui.panels().visible_count(), 1);
        assert_eq!(ui.completion_message(), Some("Level1 Complete!"));
    }

    // ── Guard ──

    #[test]
    fn request_during_transition_is_dropped() {
        let mut ui = guarded();
        assert!(ui.show_game_ui());
        assert!(ui.is_transitioning());

        assert!(!ui.show_pause_menu());
        assert_eq!(ui.state(), UiState::GamePlay);
        assert_eq!(ui.panels().visible(), Some(UiState::GamePlay));
        assert_eq!(ui.dropped_requests(), 1);

        // Dropped, not queued: settling does not replay it.
        ui.tick(WINDOW);
        assert!(!ui.is_transitioning());
        assert_eq!(ui.state(), UiState::GamePlay);
    }

    #[test]
    fn guard_releases_exactly_at_window() {
        let mut ui = guarded();
        ui.show_game_ui();
        ui.tick(WINDOW - Duration::from_millis(1));
        assert!(ui.is_transitioning());
        ui.tick(Duration::from_millis(1));
        assert!(!ui.is_transitioning());
        assert!(ui.on_level_completed(&level("Level1", "Meadow Run")));
        assert_eq!(ui.state(), UiState::LevelComplete);
    }

    #[test]
    fn panel_scales_in_during_transition() {
        let mut ui = guarded();
        ui.show_pause_menu();
        let start = ui.panels().get(UiState::PauseMenu).unwrap().scale();
        assert_eq!(start, POP_START_SCALE);
        ui.tick(WINDOW / 2);
        let mid = ui.panels().get(UiState::PauseMenu).unwrap().scale();
        assert!(mid > start && mid < 1.0);
        ui.tick(WINDOW);
        assert_eq!(ui.panels().get(UiState::PauseMenu).unwrap().scale(), 1.0);
    }

    #[test]
    fn dropped_level_complete_keeps_old_message() {
        let mut ui = guarded();
        ui.show_game_ui();
        ui.tick(WINDOW);
        assert!(ui.on_level_completed(&level("Level1", "Meadow Run")));
        ui.tick(WINDOW);
        ui.show_pause_menu();
        assert!(!ui.on_level_completed(&level("Level2", "Canyon Drop")));
        assert_eq!(ui.state(), UiState::PauseMenu);
        assert_eq!(ui.completion_message(), Some("Meadow Run Complete!"));
        assert_eq!(text(&ui.labels().completion), Some("Meadow Run Complete!"));
    }

    #[test]
    fn reset_ignores_guard_and_clears_effects() {
        let mut ui = guarded();
        ui.show_game_ui();
        ui.on_notification_requested(&NotificationRequest::new("hi", Some(5.0)));
        ui.reset();
        assert_eq!(ui.state(), UiState::MainMenu);
        assert!(!ui.is_transitioning());
        assert!(ui.notifications().is_empty());
        assert_eq!(ui.panels().visible(), Some(UiState::MainMenu));
        // Nothing left to fire.
        ui.tick(Duration::from_secs(10));
        assert_eq!(ui.state(), UiState::MainMenu);
    }

    // ── Optional display ──

    #[test]
    fn headless_machine_tracks_state_without_panels() {
        let mut ui = UiStateMachine::headless(Duration::ZERO, 3.0);
        ui.show_game_ui();
        ui.on_collectibles_changed(1, 4);
        ui.on_level_completed(&level("Level1", "Meadow Run"));
        assert_eq!(ui.state(), UiState::LevelComplete);
        assert_eq!(ui.panels().visible_count(), 0);
        assert_eq!(text(&ui.labels().collected), None);
        assert_eq!(ui.collected(), Some(3));
    }

    // ── Collectibles ──

    #[test]
    fn collected_is_total_minus_remaining() {
        let mut ui = instant();
        ui.on_collectibles_changed(3, 10);
        assert_eq!(ui.collected(), Some(7));
        assert_eq!(text(&ui.labels().collected), Some("Collected: 7/10"));
        assert_eq!(ui.state(), UiState::MainMenu);
    }

    #[test]
    fn bogus_counts_saturate() {
        let mut ui = instant();
        ui.on_collectibles_changed(12, 10);
        assert_eq!(ui.collected(), Some(0));
    }

    // ── Notifications ──

    #[test]
    fn notification_lives_for_its_duration() {
        let mut ui = instant();
        let id = ui.on_notification_requested(&NotificationRequest::new("Checkpoint", Some(2.0)));
        assert_eq!(ui.notifications().len(), 1);
        assert_eq!(ui.notifications()[0].id, id);

        ui.tick(Duration::from_millis(1999));
        assert_eq!(ui.notifications().len(), 1);
        ui.tick(Duration::from_millis(1));
        assert!(ui.notifications().is_empty());
        assert_eq!(ui.state(), UiState::MainMenu);
    }

    #[test]
    fn notification_without_duration_uses_fallback() {
        let mut ui = instant();
        ui.on_notification_requested(&NotificationRequest::new("Hello", None));
        ui.tick(Duration::from_millis(2999));
        assert_eq!(ui.notifications().len(), 1);
        ui.tick(Duration::from_millis(1));
        assert!(ui.notifications().is_empty());
    }

    #[test]
    fn oversized_duration_falls_back() {
        let mut ui = UiStateMachine::headless(Duration::ZERO, 3.0);
        ui.on_notification_requested(&NotificationRequest::new("far future", Some(1.0e20)));
        assert_eq!(ui.notifications()[0].lifetime, Duration::from_secs(3));
        ui.tick(Duration::from_secs(3));
        assert!(ui.notifications().is_empty());
    }

    #[test]
    fn unusable_configured_fallback_uses_default() {
        let mut ui = UiStateMachine::headless(Duration::ZERO, f32::INFINITY);
        ui.on_notification_requested(&NotificationRequest::new("hi", None));
        assert_eq!(ui.notifications()[0].lifetime, notification::DEFAULT_LIFETIME);
    }

    #[test]
    fn dismiss_cancels_teardown() {
        let mut ui = instant();
        let a = ui.on_notification_requested(&NotificationRequest::new("a", Some(1.0)));
        let b = ui.on_notification_requested(&NotificationRequest::new("b", Some(1.0)));
        assert!(ui.dismiss(a));
        assert!(!ui.dismiss(a));
        assert_eq!(ui.notifications().len(), 1);
        ui.tick(Duration::from_secs(1));
        assert!(ui.notifications().iter().all(|n| n.id != b));
    }

    #[test]
    fn notification_channel_is_pumped_in_order() {
        let mut ui = instant();
        let mut channel = EventChannel::new();
        ui.pump_notifications(&mut channel);
        channel.publish(NotificationRequest::new("one", None));
        channel.publish(NotificationRequest::new("two", None));
        ui.pump_notifications(&mut channel);
        let messages: Vec<&str> = ui.notifications().iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["one", "two"]);
    }

    // ── Scene binding ──

    #[test]
    fn scene_load_resyncs_counts_immediately() {
        let mut ui = instant();
        let mut course = Course::new(level("Level1", ""), SceneKind::Static, 0, 1);
        ui.on_scene_loaded(&loaded("Level1"), Some(&mut course));
        assert_eq!(ui.bound_scene(), Some("Level1"));
        assert_eq!(ui.counts(), Some((0, course.collectibles_total())));
    }

    #[test]
    fn rebinding_same_manager_does_not_double_deliver() {
        let mut ui = instant();
        let mut course = Course::new(level("Level1", ""), SceneKind::Static, 0, 1);
        ui.on_scene_loaded(&loaded("Level1"), Some(&mut course));
        ui.on_scene_loaded(&loaded("Level1"), Some(&mut course));
        assert_eq!(course.events().subscriber_count(), 1);

        course.force_complete();
        let events = ui.pump_level_events(&mut course);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn missing_manager_defers_updates() {
        let mut ui = instant();
        ui.on_scene_loaded(&loaded("MainMenu"), None);
        assert_eq!(ui.bound_scene(), None);
        assert_eq!(ui.counts(), None);
    }

    #[test]
    fn missing_manager_clears_previous_counts() {
        let mut ui = instant();
        let mut course = Course::new(level("Level1", ""), SceneKind::Static, 0, 1);
        ui.on_scene_loaded(&loaded("Level1"), Some(&mut course));
        ui.on_collectibles_changed(1, 4);
        ui.on_scene_loaded(&loaded("MainMenu"), None);
        assert_eq!(ui.counts(), None);
        assert_eq!(ui.collected(), None);
        assert_eq!(text(&ui.labels().collected), Some(""));
    }

    #[test]
    fn pumped_events_drive_the_machine() {
        let mut ui = instant();
        let mut course = Course::new(level("Level1", "Meadow Run"), SceneKind::Static, 0, 1);
        ui.on_scene_loaded(&loaded("Level1"), Some(&mut course));
        ui.show_game_ui();

        course.events().publish(LevelEvent::CollectiblesChanged { remaining: 1, total: 4 });
        course.force_complete();
        ui.pump_level_events(&mut course);

        assert_eq!(ui.collected(), Some(3));
        assert_eq!(ui.state(), UiState::LevelComplete);
        assert_eq!(ui.completion_message(), Some("Meadow Run Complete!"));
    }

    #[test]
    fn unbind_stops_delivery() {
        let mut ui = instant();
        let mut course = Course::new(level("Level1", ""), SceneKind::Static, 0, 1);
        ui.on_scene_loaded(&loaded("Level1"), Some(&mut course));
        ui.unbind(&mut course);
        course.force_complete();
        assert!(ui.pump_level_events(&mut course).is_empty());
        assert_eq!(ui.state(), UiState::MainMenu);
    }
}
