use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::question::{Answer, Question};

/// Why a session stopped accepting input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum SubmitReason {
    Manual,
    TimeUp,
    CheatLimit,
}

impl SubmitReason {
    pub fn is_forced(&self) -> bool {
        !matches!(self, SubmitReason::Manual)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("question index {index} is out of range for {len} questions")]
    OutOfRange { index: usize, len: usize },
}

/// Plain data of one attempt. This is also the persisted snapshot shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub questions: Vec<Question>,
    pub current_index: usize,
    pub attempted_answers: HashMap<String, Option<Answer>>,
    pub visited: HashSet<String>,
    pub duration_secs: u64,
    pub elapsed_secs: u64,
    pub cheat_count: u32,
    pub max_cheat_attempts: u32,
    pub submitted: bool,
    pub submit_reason: Option<SubmitReason>,
}

impl SessionState {
    fn empty(max_cheat_attempts: u32) -> Self {
        Self {
            questions: Vec::new(),
            current_index: 0,
            attempted_answers: HashMap::new(),
            visited: HashSet::new(),
            duration_secs: 0,
            elapsed_secs: 0,
            cheat_count: 0,
            max_cheat_attempts,
            submitted: false,
            submit_reason: None,
        }
    }

    fn has_question(&self, question_id: &str) -> bool {
        self.questions.iter().any(|q| q.id == question_id)
    }
}

/// Read-only counters the presentation layer renders.
///
/// Implementors only supply the three raw counts; the derived values are
/// computed here so every source agrees on the arithmetic.
pub trait AttemptProgress {
    fn attempted_count(&self) -> usize;
    fn visited_count(&self) -> usize;
    fn question_count(&self) -> usize;

    fn visited_but_not_attempted_count(&self) -> usize {
        self.visited_count().saturating_sub(self.attempted_count())
    }

    fn not_attempted_count(&self) -> usize {
        self.question_count().saturating_sub(self.attempted_count())
    }

    /// Share of questions answered, clamped to `[0, 100]`
    fn progress_percentage(&self) -> f64 {
        let total = self.question_count();
        if total == 0 {
            return 0.0;
        }
        let pct = self.attempted_count() as f64 / total as f64 * 100.0;
        pct.clamp(0.0, 100.0)
    }
}

/// The attempt session store: the only place attempt state is mutated.
#[derive(Debug, Clone)]
pub struct AttemptSession {
    state: SessionState,
}

impl AttemptSession {
    pub fn new(max_cheat_attempts: u32) -> Self {
        Self {
            state: SessionState::empty(max_cheat_attempts),
        }
    }

    /// Hard reset onto a new question set. An empty set leaves the session untouched.
    pub fn initialize(&mut self, questions: Vec<Question>, duration_secs: u64) {
        if questions.is_empty() {
            log::debug!("initialize called without questions; keeping previous state");
            return;
        }

        let max_cheat_attempts = self.state.max_cheat_attempts;
        self.state = SessionState {
            questions,
            duration_secs,
            ..SessionState::empty(max_cheat_attempts)
        };
        log::info!(
            "session initialized with {} questions, {}s allotted",
            self.state.questions.len(),
            duration_secs
        );
    }

    /// Adopt a previously persisted state. Entries for ids outside the question
    /// list are dropped and a stale index falls back to the first question.
    /// The cheat limit stays the one this session was configured with.
    pub fn restore(&mut self, mut state: SessionState) {
        let known: HashSet<String> = state.questions.iter().map(|q| q.id.clone()).collect();
        state.attempted_answers.retain(|id, _| known.contains(id));
        state.visited.retain(|id| known.contains(id));
        if state.current_index >= state.questions.len() {
            state.current_index = 0;
        }
        state.max_cheat_attempts = self.state.max_cheat_attempts;
        self.state = state;
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn questions(&self) -> &[Question] {
        &self.state.questions
    }

    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.state.questions.get(self.state.current_index)
    }

    pub fn is_last_question(&self) -> bool {
        !self.state.questions.is_empty()
            && self.state.current_index == self.state.questions.len() - 1
    }

    /// Answer on record for `question_id`; absent and cleared entries both read as `None`
    pub fn answer_for(&self, question_id: &str) -> Option<&Answer> {
        self.state
            .attempted_answers
            .get(question_id)
            .and_then(|a| a.as_ref())
    }

    pub fn is_visited(&self, question_id: &str) -> bool {
        self.state.visited.contains(question_id)
    }

    pub fn duration_secs(&self) -> u64 {
        self.state.duration_secs
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.state.elapsed_secs
    }

    pub fn cheat_count(&self) -> u32 {
        self.state.cheat_count
    }

    pub fn max_cheat_attempts(&self) -> u32 {
        self.state.max_cheat_attempts
    }

    pub fn is_submitted(&self) -> bool {
        self.state.submitted
    }

    pub fn submit_reason(&self) -> Option<SubmitReason> {
        self.state.submit_reason
    }

    pub fn mark_visited(&mut self, question_id: &str) {
        if self.state.submitted {
            return;
        }
        if !self.state.has_question(question_id) {
            log::debug!("ignoring visit of unknown question '{}'", question_id);
            return;
        }
        self.state.visited.insert(question_id.to_string());
    }

    /// Store (or overwrite) the answer for a question. Does not mark it visited.
    pub fn record_answer(&mut self, question_id: &str, answer: Answer) {
        self.write_answer(question_id, Some(answer));
    }

    pub fn clear_answer(&mut self, question_id: &str) {
        self.write_answer(question_id, None);
    }

    fn write_answer(&mut self, question_id: &str, answer: Option<Answer>) {
        if self.state.submitted {
            return;
        }
        if !self.state.has_question(question_id) {
            log::debug!("ignoring answer for unknown question '{}'", question_id);
            return;
        }
        self.state
            .attempted_answers
            .insert(question_id.to_string(), answer);
    }

    /// Move the question pointer. Out-of-range targets are rejected, not clamped.
    pub fn set_current_index(&mut self, index: usize) -> Result<(), NavigationError> {
        let len = self.state.questions.len();
        if index >= len {
            log::debug!("rejected navigation to {} of {}", index, len);
            return Err(NavigationError::OutOfRange { index, len });
        }
        self.state.current_index = index;
        Ok(())
    }

    pub fn increment_elapsed(&mut self, delta_secs: u64) {
        if self.state.submitted {
            return;
        }
        self.state.elapsed_secs = self.state.elapsed_secs.saturating_add(delta_secs);
    }

    /// Count one cheat event and return the resulting total
    pub fn increment_cheat_count(&mut self) -> u32 {
        if !self.state.submitted {
            self.state.cheat_count += 1;
        }
        self.state.cheat_count
    }

    /// Close the session. Returns `true` only for the call that performed the
    /// transition, so submit side effects can run exactly once.
    pub fn submit(&mut self, reason: SubmitReason) -> bool {
        if self.state.submitted {
            return false;
        }
        self.state.submitted = true;
        self.state.submit_reason = Some(reason);
        log::info!(
            "session submitted ({}) after {}s with {} cheat events",
            reason,
            self.state.elapsed_secs,
            self.state.cheat_count
        );
        true
    }

    /// Remaining time as `(minutes, seconds)`, never negative
    pub fn remaining_time(&self) -> (u64, u64) {
        let remaining = self
            .state
            .duration_secs
            .saturating_sub(self.state.elapsed_secs);
        (remaining / 60, remaining % 60)
    }
}

impl AttemptProgress for AttemptSession {
    fn attempted_count(&self) -> usize {
        self.state
            .attempted_answers
            .values()
            .filter(|a| a.is_some())
            .count()
    }

    fn visited_count(&self) -> usize {
        self.state.visited.len()
    }

    fn question_count(&self) -> usize {
        self.state.questions.len()
    }
}
