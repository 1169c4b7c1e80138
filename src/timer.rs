use crate::session::{AttemptSession, SubmitReason};

/// Seconds added to the elapsed counter per tick
pub const TICK_SECS: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No questions loaded yet; nothing to time
    Idle,
    Running { elapsed_secs: u64 },
    /// This tick exhausted the budget and submitted the session
    Expired { elapsed_secs: u64 },
    /// The session is already submitted; the engine no longer ticks
    Halted,
}

/// Advances attempt time one tick at a time and submits on exhaustion
#[derive(Debug, Default)]
pub struct TimerEngine {
    halted: bool,
}

impl TimerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Re-arm for a fresh session
    pub fn reset(&mut self) {
        self.halted = false;
    }

    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn tick(&mut self, session: &mut AttemptSession) -> TickOutcome {
        if self.halted {
            return TickOutcome::Halted;
        }
        if session.is_submitted() {
            // submitted by another path (manual or cheat limit)
            self.halted = true;
            return TickOutcome::Halted;
        }
        if session.questions().is_empty() {
            return TickOutcome::Idle;
        }

        session.increment_elapsed(TICK_SECS);

        // exhaustion is judged on the post-tick value
        let elapsed_secs = session.elapsed_secs();
        if elapsed_secs >= session.duration_secs() {
            self.halted = true;
            if session.submit(SubmitReason::TimeUp) {
                return TickOutcome::Expired { elapsed_secs };
            }
            return TickOutcome::Halted;
        }

        TickOutcome::Running { elapsed_secs }
    }
}
