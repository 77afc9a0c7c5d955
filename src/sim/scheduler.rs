/// Single-threaded scheduler for delayed continuations.
///
/// Time only moves when `advance()` is called from the owning loop, so a
/// continuation always runs on a later tick, never concurrently. Every task
/// belongs to an owner; cancelling the owner discards its tasks, and dropping
/// the scheduler discards everything still pending.
///
/// A task scheduled with delay `d` at time `t` is due once `now >= t + d`.
/// It is never handed back earlier than that.

use std::time::Duration;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TaskId(u64);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct OwnerId(u64);

struct Task<T> {
    id: TaskId,
    owner: OwnerId,
    due: Duration,
    payload: T,
}

pub struct Scheduler<T> {
    now: Duration,
    next_task: u64,
    next_owner: u64,
    tasks: Vec<Task<T>>,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Scheduler {
            now: Duration::ZERO,
            next_task: 0,
            next_owner: 0,
            tasks: Vec::new(),
        }
    }

    /// Allocate a fresh owner id.
    pub fn owner(&mut self) -> OwnerId {
        self.next_owner += 1;
        OwnerId(self.next_owner)
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, owner: OwnerId, delay: Duration, payload: T) -> TaskId {
        self.next_task += 1;
        let id = TaskId(self.next_task);
        self.tasks.push(Task {
            id,
            owner,
            due: self.now + delay,
            payload,
        });
        id
    }

    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    /// Drop every task belonging to `owner`. Returns how many were dropped.
    pub fn cancel_owner(&mut self, owner: OwnerId) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.owner != owner);
        before - self.tasks.len()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_scheduled(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    /// Time left before `id` is due (zero if already due but not yet drained).
    #[allow(dead_code)]
    pub fn time_until(&self, id: TaskId) -> Option<Duration> {
        self.tasks
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.due.saturating_sub(self.now))
    }

    /// Move the clock forward and hand back every payload that became due,
    /// earliest first (schedule order on ties).
    pub fn advance(&mut self, dt: Duration) -> Vec<T> {
        self.now += dt;
        let now = self.now;

        let (mut ready, waiting): (Vec<Task<T>>, Vec<Task<T>>) =
            self.tasks.drain(..).partition(|t| t.due <= now);
        self.tasks = waiting;

        ready.sort_by_key(|t| (t.due, t.id.0));
        ready.into_iter().map(|t| t.payload).collect()
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn fires_at_due_time_not_before() {
        let mut s = Scheduler::new();
        let owner = s.owner();
        s.schedule(owner, ms(2000), "expire");

        assert!(s.advance(ms(1999)).is_empty());
        assert_eq!(s.advance(ms(1)), vec!["expire"]);
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn zero_delay_fires_on_next_advance() {
        let mut s = Scheduler::new();
        let owner = s.owner();
        s.schedule(owner, Duration::ZERO, 1);
        assert_eq!(s.advance(Duration::ZERO), vec![1]);
    }

    #[test]
    fn due_order_then_schedule_order() {
        let mut s = Scheduler::new();
        let owner = s.owner();
        s.schedule(owner, ms(30), "c");
        s.schedule(owner, ms(10), "a");
        s.schedule(owner, ms(10), "b");
        assert_eq!(s.advance(ms(50)), vec!["a", "b", "c"]);
    }

    #[test]
    fn cancel_single_task() {
        let mut s = Scheduler::new();
        let owner = s.owner();
        let keep = s.schedule(owner, ms(10), "keep");
        let doomed = s.schedule(owner, ms(10), "doomed");
        assert!(s.cancel(doomed));
        assert!(!s.cancel(doomed));
        assert!(s.is_scheduled(keep));
        assert_eq!(s.time_until(keep), Some(ms(10)));
        assert_eq!(s.advance(ms(10)), vec!["keep"]);
    }

    #[test]
    fn cancel_owner_discards_its_continuations() {
        let mut s = Scheduler::new();
        let gone = s.owner();
        let alive = s.owner();
        s.schedule(gone, ms(5), "gone-1");
        s.schedule(gone, ms(6), "gone-2");
        s.schedule(alive, ms(7), "alive");
        assert_eq!(s.cancel_owner(gone), 2);
        assert_eq!(s.advance(ms(100)), vec!["alive"]);
    }

    proptest! {
        #[test]
        fn never_fires_early(delay in 0u64..5_000, steps in proptest::collection::vec(0u64..400, 1..40)) {
            let mut s = Scheduler::new();
            let owner = s.owner();
            s.schedule(owner, ms(delay), ());
            let mut elapsed = 0;
            let mut fired_at = None;
            for step in steps {
                elapsed += step;
                if !s.advance(ms(step)).is_empty() && fired_at.is_none() {
                    fired_at = Some(elapsed);
                }
            }
            match fired_at {
                Some(at) => prop_assert!(at >= delay),
                None => prop_assert!(elapsed < delay),
            }
        }
    }
}
