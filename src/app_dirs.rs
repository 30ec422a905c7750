use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "shadowtype").map(|pd| pd.config_dir().join("config.json"))
    }

    /// Log file location; $HOME/.local/state first, like the other XDG state tools
    pub fn log_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("shadowtype");
            Some(state_dir.join("shadowtype.log"))
        } else {
            ProjectDirs::from("", "", "shadowtype")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("shadowtype.log"))
        }
    }
}
