use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableFocusChange, EnableFocusChange},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use itertools::Itertools;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    time::{Duration, Instant},
};
use time_humanize::HumanTime;

use pariksha::{
    app::{App, AppAction},
    app_dirs::AppDirs,
    attempt::Attempt,
    config::{Config, ConfigStore, FileConfigStore},
    history::{HistoryDb, HistoryEntry},
    question::{FileQuestionSetLoader, QuestionSetLoader},
    runtime::{CrosstermEventSource, FixedTicker, RepeatingTick, Runner},
    snapshot::FileSnapshotStore,
};

const POLL_INTERVAL_MS: u64 = 100;
const HISTORY_LIMIT: usize = 20;

/// timed multiple-choice test attempts in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Attempt a timed multiple-choice test in the terminal. Leaving the terminal counts as a cheat attempt and the test is submitted automatically once the limit is reached or the time runs out."
)]
pub struct Cli {
    /// question set to attempt (JSON)
    #[clap(required_unless_present_any = ["history", "resume"])]
    questions: Option<PathBuf>,

    /// override the duration of the question set, in seconds
    #[clap(short = 'd', long, value_parser = clap::value_parser!(u64).range(1..))]
    duration_secs: Option<u64>,

    /// cheat attempts allowed before the test is submitted automatically
    #[clap(short = 'c', long, value_parser = clap::value_parser!(u32).range(1..))]
    max_cheat_attempts: Option<u32>,

    /// count focus signals arriving within this many milliseconds as one attempt (0 counts each)
    #[clap(long)]
    coalesce_ms: Option<u64>,

    /// continue the attempt saved by a previous run
    #[clap(short = 'r', long)]
    resume: bool,

    /// list recently finished attempts and exit
    #[clap(long)]
    history: bool,

    /// do not save the attempt to disk while it runs
    #[clap(long)]
    no_persist: bool,
}

impl Cli {
    /// Layer command line overrides on top of the stored config
    fn apply(&self, config: &mut Config) {
        if let Some(max) = self.max_cheat_attempts {
            config.max_cheat_attempts = max;
        }
        if let Some(ms) = self.coalesce_ms {
            config.signal_coalesce_ms = ms;
        }
        if self.no_persist {
            config.persist_snapshots = false;
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    if cli.history {
        return print_history();
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut config = FileConfigStore::new().load();
    cli.apply(&mut config);

    let mut app = App::new(prepare_attempt(&cli, &config)?);
    match AppDirs::history_db_path().map(HistoryDb::open) {
        Some(Ok(db)) => app = app.with_history(db),
        Some(Err(e)) => log::warn!("attempt history unavailable: {}", e),
        None => {}
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = start_tui(&mut terminal, &mut app, &config);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    res
}

fn prepare_attempt(cli: &Cli, config: &Config) -> Result<Attempt, Box<dyn Error>> {
    let mut attempt = Attempt::new(config);
    if config.persist_snapshots {
        if let Some(path) = AppDirs::snapshot_path() {
            attempt = attempt.with_snapshot_store(Box::new(FileSnapshotStore::with_path(path)));
        }
    }

    if cli.resume && attempt.resume()? {
        return Ok(attempt);
    }

    let Some(path) = &cli.questions else {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::InvalidValue, "there is no saved attempt to resume")
            .exit();
    };

    let mut set = FileQuestionSetLoader::with_path(path).load()?;
    if let Some(secs) = cli.duration_secs {
        set.duration_secs = secs;
    }
    attempt.start(set)?;
    Ok(attempt)
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    config: &Config,
) -> Result<(), Box<dyn Error>> {
    let events = CrosstermEventSource::new();
    // the app stops the tick itself once the attempt is submitted
    app.set_ticker(RepeatingTick::spawn(
        FixedTicker::new(config.tick_interval()),
        events.sender(),
    ));
    let runner = Runner::new(events, Duration::from_millis(POLL_INTERVAL_MS));

    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        let Some(event) = runner.step() else {
            continue;
        };
        let action = app.handle_event(event, Instant::now());
        if action == AppAction::Quit {
            break;
        }
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    }

    app.teardown();
    Ok(())
}

/// Log to a file; the terminal belongs to the TUI
fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
}

fn print_history() -> Result<(), Box<dyn Error>> {
    let entries = match AppDirs::history_db_path() {
        Some(path) if path.exists() => HistoryDb::open(path)?.recent(HISTORY_LIMIT)?,
        _ => Vec::new(),
    };

    if entries.is_empty() {
        println!("no attempts recorded yet");
        return Ok(());
    }

    println!("{}", entries.iter().map(format_history_entry).join("\n"));
    Ok(())
}

fn format_history_entry(entry: &HistoryEntry) -> String {
    let age_secs = Local::now()
        .signed_duration_since(entry.finished_at)
        .num_seconds()
        .max(0);
    format!(
        "{:<24} {:>3}/{:<3} marks  {} correct  {} wrong  {:>6}  cheats {}  {}  ({})",
        entry.title,
        entry.result.total_marks,
        entry.result.max_marks(),
        entry.result.correct_answers,
        entry.result.wrong_answers,
        entry.result.time_spent(),
        entry.cheat_count,
        entry.submit_reason,
        HumanTime::from_seconds(-age_secs),
    )
}
