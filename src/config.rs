use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "DOUBLING_TRACKER_DATA_DIR";
const DEFAULT_DIR_NAME: &str = ".doubling-tracker";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    /// Keep state in memory only; nothing is read from or written to disk.
    pub ephemeral: bool,
}

impl AppConfig {
    /// Explicit directory wins, then the environment, then the per-user default.
    pub fn resolve(explicit: Option<PathBuf>, ephemeral: bool) -> Self {
        let env_dir = std::env::var_os(DATA_DIR_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        let data_dir = explicit
            .or(env_dir)
            .unwrap_or_else(default_data_dir);
        Self { data_dir, ephemeral }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("state.sqlite")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(unix)]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(DEFAULT_DIR_NAME);
        }
    }

    #[cfg(windows)]
    {
        if let Ok(home) = std::env::var("USERPROFILE") {
            return PathBuf::from(home).join(DEFAULT_DIR_NAME);
        }
    }

    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}
