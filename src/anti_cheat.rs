//! Turns "the student left the test" signals into counted cheat events.
//!
//! Every signal counts on its own by default. One alt-tab out of a fullscreen
//! test can raise both a fullscreen exit and a blur, which then counts twice.
//! Setting a coalescing window folds signals arriving within it of the last
//! counted one into a single event.

use std::time::{Duration, Instant};

use crate::notice::{Notice, Notifier};
use crate::session::{AttemptSession, SubmitReason};

pub const CHEAT_LIMIT_MESSAGE: &str =
    "Maximum cheat attempts reached. The test will be submitted automatically.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum CheatSignal {
    FullscreenExit,
    VisibilityHidden,
    WindowBlur,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheatOutcome {
    /// Monitor detached or session already submitted
    Ignored,
    /// Folded into the previous event by the coalescing window
    Coalesced,
    Counted { count: u32 },
    /// This event reached the limit and submitted the session
    LimitReached { count: u32 },
}

#[derive(Debug, Clone, Default)]
pub struct AntiCheatMonitor {
    coalesce_window: Option<Duration>,
    attached: bool,
    last_counted_at: Option<Instant>,
}

impl AntiCheatMonitor {
    pub fn new(coalesce_window: Option<Duration>) -> Self {
        Self {
            coalesce_window: coalesce_window.filter(|w| !w.is_zero()),
            attached: false,
            last_counted_at: None,
        }
    }

    pub fn attach(&mut self) {
        self.attached = true;
        self.last_counted_at = None;
    }

    pub fn detach(&mut self) {
        self.attached = false;
        self.last_counted_at = None;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn report(
        &mut self,
        signal: CheatSignal,
        at: Instant,
        session: &mut AttemptSession,
        notifier: &mut dyn Notifier,
    ) -> CheatOutcome {
        if !self.attached || session.is_submitted() {
            log::debug!("ignoring {} signal", signal);
            return CheatOutcome::Ignored;
        }

        if let (Some(window), Some(last)) = (self.coalesce_window, self.last_counted_at) {
            if at.saturating_duration_since(last) < window {
                log::debug!("coalesced {} signal", signal);
                return CheatOutcome::Coalesced;
            }
        }
        self.last_counted_at = Some(at);

        let count = session.increment_cheat_count();
        log::info!(
            "cheat event {} ({}/{})",
            signal,
            count,
            session.max_cheat_attempts()
        );

        if count >= session.max_cheat_attempts() && session.submit(SubmitReason::CheatLimit) {
            log::warn!("cheat limit reached, forcing submission");
            notifier.notify(Notice::warning(CHEAT_LIMIT_MESSAGE));
            return CheatOutcome::LimitReached { count };
        }

        CheatOutcome::Counted { count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::{Notice, NoticeLevel};
    use crate::question::Question;
    use assert_matches::assert_matches;

    fn session(max: u32) -> AttemptSession {
        let mut s = AttemptSession::new(max);
        s.initialize(vec![Question::mcq("q1", "?", &["A", "B"], "A")], 60);
        s
    }

    fn attached(window: Option<Duration>) -> AntiCheatMonitor {
        let mut m = AntiCheatMonitor::new(window);
        m.attach();
        m
    }

    #[test]
    fn third_event_forces_submission_once() {
        let mut s = session(3);
        let mut m = attached(None);
        let mut notices: Vec<Notice> = Vec::new();
        let now = Instant::now();

        assert_eq!(
            m.report(CheatSignal::WindowBlur, now, &mut s, &mut notices),
            CheatOutcome::Counted { count: 1 }
        );
        assert_eq!(
            m.report(CheatSignal::VisibilityHidden, now, &mut s, &mut notices),
            CheatOutcome::Counted { count: 2 }
        );
        assert_eq!(
            m.report(CheatSignal::FullscreenExit, now, &mut s, &mut notices),
            CheatOutcome::LimitReached { count: 3 }
        );
        assert!(s.is_submitted());
        assert_eq!(s.submit_reason(), Some(SubmitReason::CheatLimit));

        // a fourth event changes nothing and raises no second warning
        assert_eq!(
            m.report(CheatSignal::WindowBlur, now, &mut s, &mut notices),
            CheatOutcome::Ignored
        );
        assert_eq!(s.cheat_count(), 3);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
        assert_eq!(notices[0].message, CHEAT_LIMIT_MESSAGE);
    }

    #[test]
    fn simultaneous_signals_count_separately_by_default() {
        let mut s = session(5);
        let mut m = attached(None);
        let mut notices: Vec<Notice> = Vec::new();
        let now = Instant::now();

        m.report(CheatSignal::FullscreenExit, now, &mut s, &mut notices);
        m.report(CheatSignal::WindowBlur, now, &mut s, &mut notices);
        assert_eq!(s.cheat_count(), 2);
    }

    #[test]
    fn coalescing_window_folds_bursts() {
        let mut s = session(5);
        let mut m = attached(Some(Duration::from_millis(250)));
        let mut notices: Vec<Notice> = Vec::new();
        let t0 = Instant::now();

        assert_eq!(
            m.report(CheatSignal::FullscreenExit, t0, &mut s, &mut notices),
            CheatOutcome::Counted { count: 1 }
        );
        assert_eq!(
            m.report(CheatSignal::WindowBlur, t0 + Duration::from_millis(40), &mut s, &mut notices),
            CheatOutcome::Coalesced
        );
        assert_matches!(
            m.report(CheatSignal::WindowBlur, t0 + Duration::from_millis(300), &mut s, &mut notices),
            CheatOutcome::Counted { count: 2 }
        );
    }

    #[test]
    fn zero_window_means_no_coalescing() {
        let mut s = session(5);
        let mut m = attached(Some(Duration::ZERO));
        let mut notices: Vec<Notice> = Vec::new();
        let now = Instant::now();

        m.report(CheatSignal::WindowBlur, now, &mut s, &mut notices);
        m.report(CheatSignal::WindowBlur, now, &mut s, &mut notices);
        assert_eq!(s.cheat_count(), 2);
    }

    #[test]
    fn detached_monitor_ignores_signals() {
        let mut s = session(3);
        let mut m = AntiCheatMonitor::new(None);
        let mut notices: Vec<Notice> = Vec::new();

        assert_eq!(
            m.report(CheatSignal::WindowBlur, Instant::now(), &mut s, &mut notices),
            CheatOutcome::Ignored
        );
        m.attach();
        m.detach();
        assert!(!m.is_attached());
        assert_eq!(
            m.report(CheatSignal::WindowBlur, Instant::now(), &mut s, &mut notices),
            CheatOutcome::Ignored
        );
        assert_eq!(s.cheat_count(), 0);
    }

    #[test]
    fn timer_submission_wins_race_without_warning() {
        let mut s = session(1);
        let mut m = attached(None);
        let mut notices: Vec<Notice> = Vec::new();

        s.submit(SubmitReason::TimeUp);
        assert_eq!(
            m.report(CheatSignal::WindowBlur, Instant::now(), &mut s, &mut notices),
            CheatOutcome::Ignored
        );
        assert!(notices.is_empty());
        assert_eq!(s.submit_reason(), Some(SubmitReason::TimeUp));
    }
}
