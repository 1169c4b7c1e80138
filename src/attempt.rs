use chrono::Local;
use std::time::Instant;

use crate::anti_cheat::{AntiCheatMonitor, CheatOutcome, CheatSignal};
use crate::config::Config;
use crate::error::Result;
use crate::notice::Notice;
use crate::question::QuestionSet;
use crate::scorer::{self, ResultRecord, ReviewEntry};
use crate::session::{AttemptSession, NavigationError, SubmitReason};
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::timer::{TickOutcome, TimerEngine};

/// One test being attempted: the session store plus the timer and monitor
/// wired to it, and whatever happens once it is submitted.
pub struct Attempt {
    title: String,
    session: AttemptSession,
    timer: TimerEngine,
    monitor: AntiCheatMonitor,
    notices: Vec<Notice>,
    result: Option<ResultRecord>,
    snapshots: Option<Box<dyn SnapshotStore>>,
}

impl std::fmt::Debug for Attempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attempt")
            .field("title", &self.title)
            .field("session", &self.session)
            .field("result", &self.result)
            .field("persisting", &self.snapshots.is_some())
            .finish()
    }
}

impl Attempt {
    pub fn new(config: &Config) -> Self {
        Self {
            title: String::new(),
            session: AttemptSession::new(config.max_cheat_attempts),
            timer: TimerEngine::new(),
            monitor: AntiCheatMonitor::new(config.coalesce_window()),
            notices: Vec::new(),
            result: None,
            snapshots: None,
        }
    }

    pub fn with_snapshot_store(mut self, store: Box<dyn SnapshotStore>) -> Self {
        self.snapshots = Some(store);
        self
    }

    /// Begin a fresh attempt. Any stored snapshot is cleared first so a
    /// previous attempt can never leak into this one.
    pub fn start(&mut self, set: QuestionSet) -> Result<()> {
        if let Some(store) = &self.snapshots {
            store.clear()?;
        }

        self.title = set.title;
        self.result = None;
        self.notices.clear();
        self.timer.reset();

        if set.questions.is_empty() {
            log::warn!("question set '{}' has no questions", self.title);
            self.session = AttemptSession::new(self.session.max_cheat_attempts());
            self.monitor.detach();
            return Ok(());
        }

        self.session.initialize(set.questions, set.duration_secs);
        self.monitor.attach();
        self.show_current();
        Ok(())
    }

    /// Pick up a stored attempt. Returns false when there was nothing to resume.
    ///
    /// The clock does not run while the program is closed, so leaving an open
    /// attempt is counted as one `VisibilityHidden` cheat event on resume.
    pub fn resume(&mut self) -> Result<bool> {
        let snapshot = match &self.snapshots {
            Some(store) => store.load()?,
            None => None,
        };
        let Some(snapshot) = snapshot else {
            return Ok(false);
        };

        log::info!(
            "resuming '{}' saved at {}",
            snapshot.title,
            snapshot.saved_at.to_rfc3339()
        );
        self.title = snapshot.title;
        self.notices.clear();
        self.session.restore(snapshot.state);

        if self.session.is_submitted() {
            self.timer.halt();
            self.monitor.detach();
            self.result = Some(self.compute_result());
        } else {
            self.timer.reset();
            self.result = None;
            self.monitor.attach();
            self.show_current();
            log::info!("counting the interrupted attempt as a cheat event");
            self.on_cheat_signal(CheatSignal::VisibilityHidden, Instant::now());
        }
        Ok(true)
    }

    /// Stop reacting to signals and ticks. The attempt state is kept as is.
    pub fn teardown(&mut self) {
        self.monitor.detach();
        self.timer.halt();
        log::debug!("attempt '{}' torn down", self.title);
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn session(&self) -> &AttemptSession {
        &self.session
    }

    pub fn has_questions(&self) -> bool {
        !self.session.questions().is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.session.is_submitted()
    }

    pub fn result(&self) -> Option<&ResultRecord> {
        self.result.as_ref()
    }

    pub fn review(&self) -> Vec<ReviewEntry<'_>> {
        let state = self.session.state();
        scorer::review(&state.questions, &state.attempted_answers)
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn on_tick(&mut self) -> TickOutcome {
        let outcome = self.timer.tick(&mut self.session);
        match outcome {
            TickOutcome::Expired { .. } => self.finish(),
            TickOutcome::Running { .. } => self.persist(),
            TickOutcome::Idle | TickOutcome::Halted => {}
        }
        outcome
    }

    pub fn on_cheat_signal(&mut self, signal: CheatSignal, at: Instant) -> CheatOutcome {
        let outcome = self
            .monitor
            .report(signal, at, &mut self.session, &mut self.notices);
        match outcome {
            CheatOutcome::LimitReached { .. } => self.finish(),
            CheatOutcome::Counted { .. } => self.persist(),
            CheatOutcome::Ignored | CheatOutcome::Coalesced => {}
        }
        outcome
    }

    /// Answer the current question with its option at `option_idx`
    pub fn select_option(&mut self, option_idx: usize) -> bool {
        let Some(question) = self.session.current_question() else {
            return false;
        };
        let Some(option) = question.options.get(option_idx) else {
            return false;
        };
        if self.session.is_submitted() {
            return false;
        }
        let (id, option) = (question.id.clone(), option.clone());
        self.session.record_answer(&id, option);
        self.persist();
        true
    }

    /// Whether the current question takes a typed value instead of an option
    pub fn current_takes_text(&self) -> bool {
        self.session
            .current_question()
            .is_some_and(|q| q.options.is_empty())
    }

    /// Append to the typed answer of the current option-less question
    pub fn push_answer_char(&mut self, c: char) -> bool {
        if !self.current_takes_text() || self.session.is_submitted() {
            return false;
        }
        let Some(id) = self.session.current_question().map(|q| q.id.clone()) else {
            return false;
        };
        let mut value = self.session.answer_for(&id).cloned().unwrap_or_default();
        value.push(c);
        self.session.record_answer(&id, value);
        self.persist();
        true
    }

    /// Drop the last typed character; an emptied answer counts as not attempted
    pub fn pop_answer_char(&mut self) -> bool {
        if !self.current_takes_text() || self.session.is_submitted() {
            return false;
        }
        let Some(id) = self.session.current_question().map(|q| q.id.clone()) else {
            return false;
        };
        let Some(mut value) = self.session.answer_for(&id).cloned() else {
            return false;
        };
        value.pop();
        if value.is_empty() {
            self.session.clear_answer(&id);
        } else {
            self.session.record_answer(&id, value);
        }
        self.persist();
        true
    }

    pub fn clear_current_answer(&mut self) {
        if let Some(id) = self.session.current_question().map(|q| q.id.clone()) {
            self.session.clear_answer(&id);
            self.persist();
        }
    }

    /// Navigate and mark the question shown
    pub fn go_to(&mut self, index: usize) -> std::result::Result<(), NavigationError> {
        self.session.set_current_index(index)?;
        self.show_current();
        Ok(())
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.session.current_index() + 1).is_ok()
    }

    pub fn previous(&mut self) -> bool {
        match self.session.current_index().checked_sub(1) {
            Some(idx) => self.go_to(idx).is_ok(),
            None => false,
        }
    }

    /// Manual submission. Returns false when the attempt was already closed.
    pub fn submit(&mut self) -> bool {
        if !self.has_questions() || !self.session.submit(SubmitReason::Manual) {
            return false;
        }
        self.notices.push(Notice::success("Test submitted successfully"));
        self.finish();
        true
    }

    fn show_current(&mut self) {
        if let Some(id) = self.session.current_question().map(|q| q.id.clone()) {
            self.session.mark_visited(&id);
            self.persist();
        }
    }

    fn compute_result(&self) -> ResultRecord {
        let state = self.session.state();
        scorer::score(&state.questions, &state.attempted_answers, state.elapsed_secs)
    }

    // runs once, right after whichever path performed the submission
    fn finish(&mut self) {
        self.timer.halt();
        self.monitor.detach();
        let result = self.compute_result();
        log::info!(
            "'{}' finished: {} correct, {} wrong, {} marks",
            self.title,
            result.correct_answers,
            result.wrong_answers,
            result.total_marks
        );
        self.result = Some(result);
        self.persist();
    }

    fn persist(&self) {
        let Some(store) = &self.snapshots else {
            return;
        };
        let snapshot = Snapshot {
            title: self.title.clone(),
            saved_at: Local::now(),
            state: self.session.state().clone(),
        };
        if let Err(e) = store.save(&snapshot) {
            log::warn!("failed to persist attempt snapshot: {}", e);
        }
    }
}
