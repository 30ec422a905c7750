use std::time::Duration;

/// Handle to a scheduled task; cancelling or firing consumes its slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CancelToken(u64);

/// Single-threaded timer queue driven by virtual time.
///
/// Nothing fires on its own: the owner advances the clock with
/// [`TimerQueue::advance`] and receives the tokens whose deadlines passed,
/// in deadline order. The terminal loop advances by wall-clock time between
/// steps; tests advance by exact amounts.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now: Duration,
    next_id: u64,
    pending: Vec<(Duration, CancelToken)>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_after(&mut self, delay: Duration) -> CancelToken {
        let token = CancelToken(self.next_id);
        self.next_id += 1;
        self.pending.push((self.now + delay, token));
        token
    }

    /// Returns true if the token was still pending
    pub fn cancel(&mut self, token: CancelToken) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(_, t)| *t != token);
        self.pending.len() != before
    }

    pub fn is_pending(&self, token: CancelToken) -> bool {
        self.pending.iter().any(|(_, t)| *t == token)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Time until the earliest pending deadline
    pub fn next_due_in(&self) -> Option<Duration> {
        self.pending
            .iter()
            .map(|(deadline, _)| deadline.saturating_sub(self.now))
            .min()
    }

    /// Move the clock forward and return every token that came due
    pub fn advance(&mut self, elapsed: Duration) -> Vec<CancelToken> {
        self.now += elapsed;
        let now = self.now;

        let mut due: Vec<(Duration, CancelToken)> = Vec::new();
        self.pending.retain(|entry| {
            if entry.0 <= now {
                due.push(*entry);
                false
            } else {
                true
            }
        });
        due.sort();
        due.into_iter().map(|(_, token)| token).collect()
    }
}
