use chrono::{DateTime, Duration, Utc};

/// Remaining-time computation for a timed attempt.
///
/// The countdown is anchored to the persisted start timestamp, never to a
/// local running counter, so a process restart cannot extend the limit: a
/// resumed attempt started `E` seconds ago with limit `L` minutes has
/// `max(0, L*60 - E)` seconds left, possibly zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    started_at: DateTime<Utc>,
    time_limit: Duration,
}

impl Countdown {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>, limit_minutes: u32) -> Self {
        Self {
            started_at,
            time_limit: Duration::minutes(i64::from(limit_minutes)),
        }
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The instant at which the attempt runs out of time.
    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.started_at + self.time_limit
    }

    /// Whole seconds left at `now`, saturating at zero once overdue and at
    /// `u32::MAX` for limits too large to count down in `u32` seconds.
    #[must_use]
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u32 {
        let left = (self.deadline() - now).num_seconds();
        if left <= 0 {
            0
        } else {
            u32::try_from(left).unwrap_or(u32::MAX)
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining_seconds(now) == 0
    }
}

/// Outcome of a single countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Time left; keep ticking.
    Running { remaining_seconds: u32 },
    /// The limit was just crossed. Emitted exactly once per timer.
    Expired,
    /// The timer already fired (or was stopped); nothing further happens.
    Stopped,
}

/// One-shot wrapper around [`Countdown`] for driving auto-submission.
///
/// The `fired` latch, not tick cancellation, is what guarantees the expiry
/// side effect happens at most once: a scheduling callback that outlives a
/// single tick still observes the latch and gets [`Tick::Stopped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTimer {
    countdown: Countdown,
    fired: bool,
}

impl CountdownTimer {
    #[must_use]
    pub fn new(countdown: Countdown) -> Self {
        Self {
            countdown,
            fired: false,
        }
    }

    #[must_use]
    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    /// Returns true once the timer has expired or been stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.fired
    }

    /// Stop the timer without expiring it, e.g. on manual submission.
    pub fn stop(&mut self) {
        self.fired = true;
    }

    /// Advance the timer by observing the clock at `now`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        if self.fired {
            return Tick::Stopped;
        }
        let remaining_seconds = self.countdown.remaining_seconds(now);
        if remaining_seconds == 0 {
            self.fired = true;
            Tick::Expired
        } else {
            Tick::Running { remaining_seconds }
        }
    }
}
