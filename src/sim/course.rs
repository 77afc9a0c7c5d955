/// Level-management collaborator.
///
/// `LevelManager` is what the UI and session need from whatever runs a level:
/// collectible counts, the current level entry, the two level events, and a
/// way for goal triggers to force completion.
///
/// `Course` is the built-in implementation: a ball on a rolling track.
/// Rolling onto a pickup collects it; once everything is collected the goal
/// opens, and rolling onto an open goal completes the level.

use crate::domain::classification::SceneKind;
use crate::domain::progression::LevelEntry;
use crate::domain::track::{layout_seed, Roll, Track};
use super::event::{CourseEvent, EventChannel, LevelEvent};

pub const PICKUP_SCORE: u32 = 100;

pub trait LevelManager {
    fn collectibles_remaining(&self) -> u32;
    fn collectibles_total(&self) -> u32;
    fn current_level(&self) -> &LevelEntry;
    /// Complete the level now. Publishes `LevelCompleted` at most once.
    fn force_complete(&mut self);
    fn events(&mut self) -> &mut EventChannel<LevelEvent>;
}

pub struct Course {
    level: LevelEntry,
    kind: SceneKind,
    track: Track,
    ball_x: usize,
    total: u32,
    remaining: u32,
    score: u32,
    goal_open: bool,
    completed: bool,
    roll_rate: u32,
    roll_cooldown: u32,
    events: EventChannel<LevelEvent>,
}

impl Course {
    /// Build the course for `level`. Only procedural scenes get a generated layout.
    pub fn new(level: LevelEntry, kind: SceneKind, round: u32, roll_rate: u32) -> Self {
        let track = if kind.allows_generation() {
            Track::generated(layout_seed(&level.scene_name, round))
        } else {
            Track::hand_built(level.level_index)
        };
        let total = track.pickup_count();
        Course {
            level,
            kind,
            track,
            ball_x: 0,
            total,
            remaining: total,
            score: 0,
            goal_open: total == 0,
            completed: false,
            roll_rate: roll_rate.max(1),
            roll_cooldown: 0,
            events: EventChannel::new(),
        }
    }

    /// Advance one tick with the held roll direction.
    pub fn step(&mut self, roll: Option<Roll>) -> Vec<CourseEvent> {
        let mut out = Vec::new();
        if self.completed {
            return out;
        }
        if self.roll_cooldown > 0 {
            self.roll_cooldown -= 1;
            return out;
        }
        let Some(dir) = roll else {
            return out;
        };

        let next = match dir {
            Roll::Left => self.ball_x.checked_sub(1),
            Roll::Right => Some(self.ball_x + 1).filter(|&x| x < self.track.width()),
        };
        let Some(x) = next else {
            return out;
        };

        self.ball_x = x;
        self.roll_cooldown = self.roll_rate - 1;
        out.push(CourseEvent::Rolled { x });

        let tile = self.track.at(x);
        if tile.is_pickup() {
            self.collect(x, &mut out);
        } else if tile.is_goal() && self.goal_open {
            out.push(CourseEvent::GoalReached);
            self.force_complete();
        }
        out
    }

    fn collect(&mut self, x: usize, out: &mut Vec<CourseEvent>) {
        self.track.clear(x);
        self.remaining = self.remaining.saturating_sub(1);
        self.score += PICKUP_SCORE;
        out.push(CourseEvent::Collected { x });
        self.events.publish(LevelEvent::CollectiblesChanged {
            remaining: self.remaining,
            total: self.total,
        });
        if self.remaining == 0 && !self.goal_open {
            self.goal_open = true;
            out.push(CourseEvent::GoalOpened);
        }
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn ball_x(&self) -> usize {
        self.ball_x
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn goal_open(&self) -> bool {
        self.goal_open
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn kind(&self) -> SceneKind {
        self.kind
    }
}

impl LevelManager for Course {
    fn collectibles_remaining(&self) -> u32 {
        self.remaining
    }

    fn collectibles_total(&self) -> u32 {
        self.total
    }

    fn current_level(&self) -> &LevelEntry {
        &self.level
    }

    fn force_complete(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;
        self.events.publish(LevelEvent::LevelCompleted(self.level.clone()));
    }

    fn events(&mut self) -> &mut EventChannel<LevelEvent> {
        &mut self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::event::SubscriberId;

    const SUB: SubscriberId = SubscriberId(9);

    fn level1() -> LevelEntry {
        LevelEntry::new("Level1", "Meadow Run", 1, "Level2")
    }

    /// Roll right until the course completes (or a step budget runs out).
    fn roll_to_end(course: &mut Course) -> Vec<CourseEvent> {
        let mut all = vec![];
        for _ in 0..1_000 {
            all.extend(course.step(Some(Roll::Right)));
            if course.is_complete() {
                break;
            }
        }
        all
    }

    #[test]
    fn static_scene_uses_hand_built_layout() {
        let c = Course::new(level1(), SceneKind::Static, 0, 1);
        assert_eq!(c.track(), &Track::hand_built(1));
        assert_eq!(c.collectibles_total(), 4);
        assert_eq!(c.collectibles_remaining(), 4);
    }

    #[test]
    fn procedural_scene_uses_generated_layout() {
        let entry = LevelEntry::new("Level_OSM", "", 10, "Level_OSM").endless();
        let c = Course::new(entry, SceneKind::Procedural, 2, 1);
        assert_eq!(c.track(), &Track::generated(layout_seed("Level_OSM", 2)));
    }

    #[test]
    fn unknown_scene_is_not_generated() {
        let entry = LevelEntry::new("Mystery", "", 0, "");
        let c = Course::new(entry, SceneKind::Unknown, 7, 1);
        assert_eq!(c.track(), &Track::hand_built(0));
    }

    #[test]
    fn collecting_publishes_counts() {
        let mut c = Course::new(level1(), SceneKind::Static, 0, 1);
        c.events().subscribe(SUB);
        for _ in 0..3 {
            c.step(Some(Roll::Right));
        }
        assert_eq!(c.ball_x(), 3);
        assert_eq!(c.score(), PICKUP_SCORE);
        assert_eq!(
            c.events().drain(SUB),
            vec![LevelEvent::CollectiblesChanged { remaining: 3, total: 4 }]
        );
    }

    #[test]
    fn roll_rate_throttles_steps() {
        let mut c = Course::new(level1(), SceneKind::Static, 0, 3);
        for _ in 0..6 {
            c.step(Some(Roll::Right));
        }
        assert_eq!(c.ball_x(), 2);
    }

    #[test]
    fn cannot_roll_off_either_end() {
        let mut c = Course::new(level1(), SceneKind::Static, 0, 1);
        assert!(c.step(Some(Roll::Left)).is_empty());
        assert_eq!(c.ball_x(), 0);
    }

    #[test]
    fn goal_completes_once_everything_is_collected() {
        let mut c = Course::new(level1(), SceneKind::Static, 0, 1);
        c.events().subscribe(SUB);
        let events = roll_to_end(&mut c);

        assert!(c.is_complete());
        assert!(events.contains(&CourseEvent::GoalOpened));
        assert_eq!(events.last(), Some(&CourseEvent::GoalReached));
        assert_eq!(c.score(), 4 * PICKUP_SCORE);

        let published = c.events().drain(SUB);
        assert_eq!(published.last(), Some(&LevelEvent::LevelCompleted(level1())));
        // Completion is terminal: further input is ignored.
        assert!(c.step(Some(Roll::Left)).is_empty());
    }

    #[test]
    fn force_complete_publishes_once() {
        let mut c = Course::new(level1(), SceneKind::Static, 0, 1);
        c.events().subscribe(SUB);
        c.force_complete();
        c.force_complete();
        assert_eq!(c.events().drain(SUB), vec![LevelEvent::LevelCompleted(level1())]);
    }
}
