/// Events and the channels that carry them.
///
/// Collaborators publish into an `EventChannel`; each subscriber owns an
/// inbox and drains it on its own tick. Subscribing twice is a no-op, so a
/// scene reload can never double-deliver.

use std::collections::VecDeque;

use crate::domain::classification::SceneKind;
use crate::domain::progression::LevelEntry;

/// Raised by the level-management collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LevelEvent {
    LevelCompleted(LevelEntry),
    CollectiblesChanged { remaining: u32, total: u32 },
}

/// Transient on-screen message; `None` duration means "use the default".
#[derive(Clone, Debug, PartialEq)]
pub struct NotificationRequest {
    pub message: String,
    pub duration: Option<f32>,
}

impl NotificationRequest {
    pub fn new(message: impl Into<String>, duration: Option<f32>) -> Self {
        NotificationRequest { message: message.into(), duration }
    }
}

/// Fired once per scene load with the newly active scene.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneLoaded {
    pub scene_name: String,
    pub kind: SceneKind,
}

/// Per-step events from a course. The presentation layer consumes these for sound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CourseEvent {
    Rolled { x: usize },
    Collected { x: usize },
    GoalOpened,
    GoalReached,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SubscriberId(pub u32);

pub struct EventChannel<E> {
    inboxes: Vec<(SubscriberId, VecDeque<E>)>,
}

impl<E: Clone> EventChannel<E> {
    pub fn new() -> Self {
        EventChannel { inboxes: Vec::new() }
    }

    /// Returns `false` if `id` was already subscribed.
    pub fn subscribe(&mut self, id: SubscriberId) -> bool {
        if self.is_subscribed(id) {
            return false;
        }
        self.inboxes.push((id, VecDeque::new()));
        true
    }

    /// Drops the inbox along with anything still queued in it.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.inboxes.len();
        self.inboxes.retain(|(sub, _)| *sub != id);
        self.inboxes.len() != before
    }

    pub fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.inboxes.iter().any(|(sub, _)| *sub == id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inboxes.len()
    }

    /// Events published with no subscriber are dropped.
    pub fn publish(&mut self, event: E) {
        for (_, inbox) in &mut self.inboxes {
            inbox.push_back(event.clone());
        }
    }

    /// Queued events for `id`, oldest first. Empty when not subscribed.
    pub fn drain(&mut self, id: SubscriberId) -> Vec<E> {
        self.inboxes
            .iter_mut()
            .find(|(sub, _)| *sub == id)
            .map(|(_, inbox)| inbox.drain(..).collect())
            .unwrap_or_default()
    }
}

impl<E: Clone> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UI: SubscriberId = SubscriberId(1);
    const HUD: SubscriberId = SubscriberId(2);

    #[test]
    fn subscribe_is_idempotent() {
        let mut ch: EventChannel<u32> = EventChannel::new();
        assert!(ch.subscribe(UI));
        assert!(!ch.subscribe(UI));
        ch.publish(7);
        assert_eq!(ch.drain(UI), vec![7]);
        assert_eq!(ch.subscriber_count(), 1);
    }

    #[test]
    fn every_subscriber_gets_its_own_copy_in_order() {
        let mut ch = EventChannel::new();
        ch.subscribe(UI);
        ch.subscribe(HUD);
        ch.publish("a");
        ch.publish("b");
        assert_eq!(ch.drain(UI), vec!["a", "b"]);
        assert!(ch.drain(UI).is_empty());
        assert_eq!(ch.drain(HUD), vec!["a", "b"]);
    }

    #[test]
    fn unsubscribe_discards_pending_events() {
        let mut ch = EventChannel::new();
        ch.subscribe(UI);
        ch.publish(1);
        assert!(ch.unsubscribe(UI));
        assert!(!ch.unsubscribe(UI));
        assert!(ch.drain(UI).is_empty());
        ch.subscribe(UI);
        assert!(ch.drain(UI).is_empty());
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let mut ch = EventChannel::new();
        ch.publish(LevelEvent::CollectiblesChanged { remaining: 1, total: 2 });
        ch.subscribe(UI);
        assert!(ch.drain(UI).is_empty());
    }
}
