use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent};

use crate::anti_cheat::CheatSignal;

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum AttemptEvent {
    Key(KeyEvent),
    Resize,
    Signal(CheatSignal),
    FocusGained,
    Tick,
}

/// Source of attempt events (keyboard, focus, ticks, ...)
pub trait AttemptEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<AttemptEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<AttemptEvent>,
    rx: Receiver<AttemptEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let reader_tx = tx.clone();

        std::thread::spawn(move || loop {
            let ev = match event::read() {
                Ok(CtEvent::Key(key)) => AttemptEvent::Key(key),
                Ok(CtEvent::Resize(_, _)) => AttemptEvent::Resize,
                // the terminal equivalent of the window losing focus
                Ok(CtEvent::FocusLost) => AttemptEvent::Signal(CheatSignal::WindowBlur),
                Ok(CtEvent::FocusGained) => AttemptEvent::FocusGained,
                Ok(_) => continue,
                Err(_) => break,
            };
            if reader_tx.send(ev).is_err() {
                break;
            }
        });

        Self { tx, rx }
    }

    /// Sender feeding the same queue, used to attach a [`RepeatingTick`]
    pub fn sender(&self) -> Sender<AttemptEvent> {
        self.tx.clone()
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AttemptEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AttemptEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// A recurring `Tick` producer on its own thread.
///
/// Ticks are scheduled against fixed deadlines so key traffic on the shared
/// queue cannot stretch the clock. `stop` (or dropping the handle) ends the
/// thread before returning.
#[derive(Debug)]
pub struct RepeatingTick {
    stopped: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RepeatingTick {
    pub fn spawn<T: Ticker>(ticker: T, tx: Sender<AttemptEvent>) -> Self {
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopped);

        let handle = thread::spawn(move || {
            let interval = ticker.interval();
            let mut deadline = Instant::now() + interval;
            loop {
                loop {
                    if flag.load(Ordering::Acquire) {
                        return;
                    }
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    thread::park_timeout(deadline - now);
                }
                if tx.send(AttemptEvent::Tick).is_err() {
                    return;
                }
                deadline += interval;
            }
        });

        Self {
            stopped,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn stop(&mut self) {
        self.stopped.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
            log::debug!("tick thread stopped");
        }
    }
}

impl Drop for RepeatingTick {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<AttemptEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<AttemptEvent>) -> Self {
        Self { rx }
    }
}

impl AttemptEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AttemptEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that hands the application one event at a time
pub struct Runner<E: AttemptEventSource> {
    event_source: E,
    poll_interval: Duration,
}

impl<E: AttemptEventSource> Runner<E> {
    pub fn new(event_source: E, poll_interval: Duration) -> Self {
        Self {
            event_source,
            poll_interval,
        }
    }

    /// Blocks up to the poll interval; None when nothing arrived
    pub fn step(&self) -> Option<AttemptEvent> {
        match self.event_source.recv_timeout(self.poll_interval) {
            Ok(ev) => Some(ev),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}
