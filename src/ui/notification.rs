/// Transient notifications.
///
/// A notification is created, shown immediately, and torn down by a
/// scheduled continuation once its lifetime has elapsed. Each one has its own
/// scheduler owner so it can be dismissed (and its continuation cancelled)
/// without touching anything else.

use std::time::Duration;

use crate::sim::scheduler::OwnerId;

/// Pop-in time for the scale effect.
pub const POP_IN: Duration = Duration::from_millis(150);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NotificationId(pub u32);

#[derive(Clone, Debug)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub lifetime: Duration,
    pub shown_at: Duration,
    pub(crate) owner: OwnerId,
}

impl Notification {
    /// Scale for the pop-in effect at scheduler time `now` (0..=1).
    pub fn scale(&self, now: Duration) -> f32 {
        let age = now.saturating_sub(self.shown_at);
        if age >= POP_IN {
            return 1.0;
        }
        let t = age.as_secs_f32() / POP_IN.as_secs_f32();
        // ease-out
        1.0 - (1.0 - t) * (1.0 - t)
    }

    /// Time left at scheduler time `now`.
    pub fn remaining(&self, now: Duration) -> Duration {
        (self.shown_at + self.lifetime).saturating_sub(now)
    }
}

/// Used when neither the request nor the configured fallback is usable.
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(3);

/// Longest a notification may stay up.
pub const MAX_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Requested seconds, or `fallback` when missing, non-positive, not finite or
/// too large for a `Duration`. Capped at `MAX_LIFETIME`.
pub fn lifetime(requested: Option<f32>, fallback: f32) -> Duration {
    [requested, Some(fallback)]
        .into_iter()
        .flatten()
        .filter(|s| s.is_finite() && *s > 0.0)
        .find_map(|s| Duration::try_from_secs_f32(s).ok())
        .unwrap_or(DEFAULT_LIFETIME)
        .min(MAX_LIFETIME)
}
