// Library surface for the binary and for headless/integration tests.
pub mod anti_cheat;
pub mod app;
pub mod app_dirs;
pub mod attempt;
pub mod config;
pub mod error;
pub mod history;
pub mod notice;
pub mod question;
pub mod runtime;
pub mod scorer;
pub mod session;
pub mod snapshot;
pub mod timer;
pub mod ui;
