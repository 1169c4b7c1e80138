use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Instant;

use crate::attempt::Attempt;
use crate::history::{HistoryDb, HistoryEntry};
use crate::notice::Notice;
use crate::runtime::{AttemptEvent, RepeatingTick};
use crate::session::SubmitReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Attempting,
    ConfirmSubmit,
    ConfirmQuit,
    Results,
    Review { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Continue,
    Quit,
}

/// Terminal front end state around one [`Attempt`]
#[derive(Debug)]
pub struct App {
    pub attempt: Attempt,
    pub state: AppState,
    pub notice: Option<Notice>,
    history: Option<HistoryDb>,
    recorded: bool,
    tick: Option<RepeatingTick>,
}

impl App {
    /// An attempt that is already finished (a resumed, submitted snapshot) was
    /// recorded by the run that finished it.
    pub fn new(attempt: Attempt) -> Self {
        let recorded = attempt.is_finished();
        let mut app = Self {
            attempt,
            state: AppState::Attempting,
            notice: None,
            history: None,
            recorded,
            tick: None,
        };
        app.sync();
        app
    }

    pub fn with_history(mut self, history: HistoryDb) -> Self {
        self.history = Some(history);
        self.sync();
        self
    }

    /// Hand over the tick producer driving this attempt. It is stopped as soon
    /// as the attempt is submitted.
    pub fn set_ticker(&mut self, tick: RepeatingTick) {
        self.tick = Some(tick);
        self.sync();
    }

    pub fn is_ticking(&self) -> bool {
        self.tick.as_ref().is_some_and(RepeatingTick::is_running)
    }

    /// Stop the tick producer and detach the attempt, keeping its state
    pub fn teardown(&mut self) {
        self.stop_ticker();
        self.attempt.teardown();
    }

    fn stop_ticker(&mut self) {
        if let Some(mut tick) = self.tick.take() {
            tick.stop();
        }
    }

    pub fn handle_event(&mut self, event: AttemptEvent, now: Instant) -> AppAction {
        let action = match event {
            AttemptEvent::Tick => {
                self.attempt.on_tick();
                AppAction::Continue
            }
            AttemptEvent::Signal(signal) => {
                self.attempt.on_cheat_signal(signal, now);
                AppAction::Continue
            }
            AttemptEvent::Key(key) => self.on_key(key),
            AttemptEvent::Resize | AttemptEvent::FocusGained => AppAction::Continue,
        };
        self.sync();
        action
    }

    fn on_key(&mut self, key: KeyEvent) -> AppAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return AppAction::Quit;
        }

        match self.state {
            AppState::Attempting if self.attempt.current_takes_text() => match key.code {
                KeyCode::Char(c) if is_numeric_input(c) => {
                    self.attempt.push_answer_char(c);
                }
                KeyCode::Backspace => {
                    self.attempt.pop_answer_char();
                }
                _ => return self.on_attempt_key(key),
            },
            AppState::Attempting => return self.on_attempt_key(key),
            AppState::ConfirmQuit => match key.code {
                KeyCode::Char('y') => return AppAction::Quit,
                KeyCode::Char('n') | KeyCode::Esc => self.state = AppState::Attempting,
                _ => {}
            },
            AppState::ConfirmSubmit => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    self.attempt.submit();
                }
                KeyCode::Char('n') | KeyCode::Esc => self.state = AppState::Attempting,
                _ => {}
            },
            AppState::Results => match key.code {
                KeyCode::Char('r') if self.attempt.has_questions() => {
                    self.state = AppState::Review { index: 0 };
                }
                KeyCode::Char('q') | KeyCode::Esc => return AppAction::Quit,
                _ => {}
            },
            AppState::Review { index } => {
                let last = self.attempt.session().questions().len().saturating_sub(1);
                match key.code {
                    KeyCode::Right | KeyCode::Char('n') => {
                        self.state = AppState::Review {
                            index: (index + 1).min(last),
                        };
                    }
                    KeyCode::Left | KeyCode::Char('p') => {
                        self.state = AppState::Review {
                            index: index.saturating_sub(1),
                        };
                    }
                    KeyCode::Char('b') | KeyCode::Esc => self.state = AppState::Results,
                    KeyCode::Char('q') => return AppAction::Quit,
                    _ => {}
                }
            }
        }
        AppAction::Continue
    }

    fn on_attempt_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Esc if !self.attempt.has_questions() => return AppAction::Quit,
            KeyCode::Esc => self.state = AppState::ConfirmQuit,
            KeyCode::Char(c @ '1'..='9') => {
                let idx = c as usize - '1' as usize;
                self.attempt.select_option(idx);
            }
            KeyCode::Char('0') | KeyCode::Backspace | KeyCode::Delete => {
                self.attempt.clear_current_answer();
            }
            KeyCode::Right | KeyCode::Char('n') => {
                self.attempt.next();
            }
            KeyCode::Left | KeyCode::Char('p') => {
                self.attempt.previous();
            }
            KeyCode::Enter => {
                if self.attempt.session().is_last_question() {
                    self.state = AppState::ConfirmSubmit;
                } else {
                    self.attempt.next();
                }
            }
            _ => {}
        }
        AppAction::Continue
    }

    /// Pull notices and follow the attempt into the results once it closes
    fn sync(&mut self) {
        if let Some(notice) = self.attempt.take_notices().pop() {
            self.notice = Some(notice);
        }

        if self.attempt.is_finished() {
            self.stop_ticker();
        }

        if self.attempt.is_finished()
            && matches!(
                self.state,
                AppState::Attempting | AppState::ConfirmSubmit | AppState::ConfirmQuit
            )
        {
            self.state = AppState::Results;
        }

        if self.attempt.is_finished() && !self.recorded {
            self.record_history();
        }
    }

    fn record_history(&mut self) {
        let (Some(history), Some(result)) = (&self.history, self.attempt.result()) else {
            return;
        };
        let entry = HistoryEntry {
            title: self.attempt.title().to_string(),
            result: result.clone(),
            cheat_count: self.attempt.session().cheat_count(),
            submit_reason: self
                .attempt
                .session()
                .submit_reason()
                .unwrap_or(SubmitReason::Manual),
            finished_at: Local::now(),
        };
        if let Err(e) = history.record(&entry) {
            log::warn!("failed to record attempt history: {}", e);
        }
        self.recorded = true;
    }
}

/// Characters accepted when typing a numerical answer
fn is_numeric_input(c: char) -> bool {
    c.is_ascii_digit() || c == '.' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anti_cheat::CheatSignal;
    use crate::config::Config;
    use crate::notice::NoticeLevel;
    use crate::question::{Question, QuestionSet};

    fn key(code: KeyCode) -> AttemptEvent {
        AttemptEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn app(config: &Config) -> App {
        let mut attempt = Attempt::new(config);
        attempt
            .start(QuestionSet::new(
                "Exercise 4.1",
                60,
                vec![
                    Question::mcq("q1", "7 x 8", &["54", "56"], "56"),
                    Question::mcq("q2", "9 x 9", &["81", "72"], "81"),
                ],
            ))
            .unwrap();
        App::new(attempt).with_history(HistoryDb::open_in_memory().unwrap())
    }

    #[test]
    fn answer_and_submit_through_keys() {
        let mut app = app(&Config::default());
        let now = Instant::now();

        app.handle_event(key(KeyCode::Char('2')), now);
        app.handle_event(key(KeyCode::Enter), now);
        assert_eq!(app.state, AppState::Attempting);
        app.handle_event(key(KeyCode::Char('1')), now);
        app.handle_event(key(KeyCode::Enter), now);
        assert_eq!(app.state, AppState::ConfirmSubmit);

        app.handle_event(key(KeyCode::Char('n')), now);
        assert_eq!(app.state, AppState::Attempting);
        app.handle_event(key(KeyCode::Enter), now);
        app.handle_event(key(KeyCode::Char('y')), now);

        assert_eq!(app.state, AppState::Results);
        assert_eq!(app.attempt.result().unwrap().total_marks, 10);
        assert_eq!(app.notice.as_ref().unwrap().level, NoticeLevel::Success);
        assert_eq!(app.history.as_ref().unwrap().count().unwrap(), 1);

        // further events never record twice
        app.handle_event(AttemptEvent::Tick, now);
        assert_eq!(app.history.as_ref().unwrap().count().unwrap(), 1);
    }

    #[test]
    fn focus_loss_limit_lands_on_results_with_warning() {
        let mut app = app(&Config {
            max_cheat_attempts: 2,
            ..Config::default()
        });
        let now = Instant::now();

        app.handle_event(AttemptEvent::Signal(CheatSignal::WindowBlur), now);
        assert_eq!(app.state, AppState::Attempting);
        app.handle_event(AttemptEvent::Signal(CheatSignal::WindowBlur), now);

        assert_eq!(app.state, AppState::Results);
        assert_eq!(app.notice.as_ref().unwrap().level, NoticeLevel::Warning);
        let history = app.history.as_ref().unwrap().recent(1).unwrap();
        assert_eq!(history[0].submit_reason, SubmitReason::CheatLimit);
        assert_eq!(history[0].cheat_count, 2);
    }

    #[test]
    fn review_navigation_stays_in_bounds() {
        let mut app = app(&Config::default());
        let now = Instant::now();
        app.handle_event(key(KeyCode::Right), now);
        app.handle_event(key(KeyCode::Enter), now);
        app.handle_event(key(KeyCode::Enter), now);
        assert_eq!(app.state, AppState::Results);

        app.handle_event(key(KeyCode::Char('r')), now);
        assert_eq!(app.state, AppState::Review { index: 0 });
        app.handle_event(key(KeyCode::Left), now);
        assert_eq!(app.state, AppState::Review { index: 0 });
        app.handle_event(key(KeyCode::Right), now);
        app.handle_event(key(KeyCode::Right), now);
        assert_eq!(app.state, AppState::Review { index: 1 });
        app.handle_event(key(KeyCode::Char('b')), now);
        assert_eq!(app.state, AppState::Results);
        assert_eq!(app.handle_event(key(KeyCode::Char('q')), now), AppAction::Quit);
    }

    #[test]
    fn resumed_finished_attempt_is_not_recorded_again() {
        use crate::snapshot::FileSnapshotStore;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attempt.json");
        let mut first = Attempt::new(&Config::default())
            .with_snapshot_store(Box::new(FileSnapshotStore::with_path(&path)));
        first
            .start(QuestionSet::new(
                "Exercise 4.2",
                60,
                vec![Question::mcq("q1", "6 x 7", &["42", "48"], "42")],
            ))
            .unwrap();
        first.submit();

        let mut resumed = Attempt::new(&Config::default())
            .with_snapshot_store(Box::new(FileSnapshotStore::with_path(&path)));
        assert!(resumed.resume().unwrap());
        let app = App::new(resumed).with_history(HistoryDb::open_in_memory().unwrap());

        assert_eq!(app.state, AppState::Results);
        assert_eq!(app.history.as_ref().unwrap().count().unwrap(), 0);
    }

    #[test]
    fn esc_asks_before_leaving_an_open_attempt() {
        let mut app = app(&Config::default());
        let now = Instant::now();

        assert_eq!(app.handle_event(key(KeyCode::Esc), now), AppAction::Continue);
        assert_eq!(app.state, AppState::ConfirmQuit);
        app.handle_event(key(KeyCode::Char('n')), now);
        assert_eq!(app.state, AppState::Attempting);

        app.handle_event(key(KeyCode::Esc), now);
        assert_eq!(app.handle_event(key(KeyCode::Char('y')), now), AppAction::Quit);
        assert!(!app.attempt.is_finished());
    }

    #[test]
    fn time_up_while_confirming_quit_shows_results() {
        let mut attempt = Attempt::new(&Config::default());
        attempt
            .start(QuestionSet::new(
                "Exercise 4.3",
                1,
                vec![Question::mcq("q1", "2 + 2", &["4", "5"], "4")],
            ))
            .unwrap();
        let mut app = App::new(attempt);
        let now = Instant::now();
        app.handle_event(key(KeyCode::Esc), now);
        app.handle_event(AttemptEvent::Tick, now);
        assert_eq!(app.state, AppState::Results);
    }

    #[test]
    fn numerical_answer_typed_through_keys() {
        let mut q = Question::mcq("q1", "3 x 3", &[], "9");
        q.question_type = crate::question::QuestionType::Numerical;
        let mut attempt = Attempt::new(&Config::default());
        attempt
            .start(QuestionSet::new("Numbers", 60, vec![q]))
            .unwrap();
        let mut app = App::new(attempt);
        let now = Instant::now();

        for c in ['9', '0'] {
            app.handle_event(key(KeyCode::Char(c)), now);
        }
        app.handle_event(key(KeyCode::Backspace), now);
        assert_eq!(
            app.attempt.session().answer_for("q1"),
            Some(&"9".to_string())
        );

        app.handle_event(key(KeyCode::Enter), now);
        app.handle_event(key(KeyCode::Char('y')), now);
        let result = app.attempt.result().unwrap();
        assert_eq!(result.correct_answers, 1);
        assert_eq!(result.total_marks, 5);
    }

    #[test]
    fn ticker_stops_once_submitted() {
        let mut app = app(&Config::default());
        let (tx, _rx) = std::sync::mpsc::channel();
        app.set_ticker(RepeatingTick::spawn(
            crate::runtime::FixedTicker::new(std::time::Duration::from_millis(5)),
            tx,
        ));
        assert!(app.is_ticking());

        let now = Instant::now();
        app.handle_event(key(KeyCode::Right), now);
        app.handle_event(key(KeyCode::Enter), now);
        app.handle_event(key(KeyCode::Char('y')), now);
        assert!(!app.is_ticking());
    }

    #[test]
    fn ctrl_c_quits_anywhere() {
        let mut app = app(&Config::default());
        let ev = AttemptEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(app.handle_event(ev, Instant::now()), AppAction::Quit);
        assert!(!app.attempt.is_finished());
    }
}
