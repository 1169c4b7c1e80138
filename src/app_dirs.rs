use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("pariksha"),
            )
        } else {
            ProjectDirs::from("", "", "pariksha").map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "pariksha").map(|pd| pd.config_dir().join("config.json"))
    }

    pub fn snapshot_path() -> Option<PathBuf> {
        Self::state_dir().map(|d| d.join("attempt.json"))
    }

    pub fn history_db_path() -> Option<PathBuf> {
        Self::state_dir().map(|d| d.join("history.db"))
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|d| d.join("pariksha.log"))
    }
}
