/// Keyboard input.
///
/// Tracks held keys (for continuous rolling) and fresh presses (for one-shot
/// navigation), then maps both onto `Nav` actions the game loop dispatches
/// by UI state.
///
/// Terminals that report key releases get exact hold tracking; the rest fall
/// back to a timeout since the last press/repeat.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::track::Roll;

/// Without release events, a key counts as held this long after its last repeat.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

// ── Key map ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_CANCEL: &[KeyCode] = &[KeyCode::Esc];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P')];
const KEYS_RETRY: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];
const KEYS_FINISH: &[KeyCode] = &[KeyCode::Char('f'), KeyCode::Char('F')];

/// One-shot navigation intents, independent of the device that raised them.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Nav {
    Confirm,
    Cancel,
    Pause,
    Retry,
    Quit,
    Finish,
}

pub struct InputState {
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from released to held during the last drain.
    fresh_presses: Vec<KeyCode>,
    raw_events: Vec<KeyEvent>,
    /// Honor Release events (only when the terminal is known to send them).
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Read every pending terminal event without blocking. Once per frame.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            let Ok(Event::Key(key)) = event::read() else {
                continue;
            };
            self.record(key, Instant::now());
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn record(&mut self, key: KeyEvent, at: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held_at(key.code, at);
                self.last_active.insert(key.code, at);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        let now = Instant::now();
        codes.iter().any(|c| self.is_held_at(*c, now))
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_presses.contains(c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        })
    }

    /// Held roll direction; left wins when both are held.
    pub fn roll(&self) -> Option<Roll> {
        if self.any_held(KEYS_LEFT) || self.any_pressed(KEYS_LEFT) {
            Some(Roll::Left)
        } else if self.any_held(KEYS_RIGHT) || self.any_pressed(KEYS_RIGHT) {
            Some(Roll::Right)
        } else {
            None
        }
    }

    /// Navigation intents pressed this frame, in a fixed priority order.
    pub fn nav(&self) -> Vec<Nav> {
        let table: [(&[KeyCode], Nav); 6] = [
            (KEYS_CONFIRM, Nav::Confirm),
            (KEYS_CANCEL, Nav::Cancel),
            (KEYS_PAUSE, Nav::Pause),
            (KEYS_RETRY, Nav::Retry),
            (KEYS_QUIT, Nav::Quit),
            (KEYS_FINISH, Nav::Finish),
        ];
        table
            .iter()
            .filter(|(keys, _)| self.any_pressed(keys))
            .map(|&(_, nav)| nav)
            .collect()
    }

    fn is_held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active
            .get(&code)
            .is_some_and(|t| now.duration_since(*t) < HOLD_TIMEOUT)
    }
}
