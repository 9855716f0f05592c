use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "codetype";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/codetype`, falling back to the platform data dir and
    /// finally the working directory.
    pub fn state_dir() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join(APP_NAME)
        } else if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
            proj_dirs.data_local_dir().to_path_buf()
        } else {
            PathBuf::from(".")
        }
    }

    pub fn db_path() -> PathBuf {
        Self::state_dir().join("sessions.db")
    }

    pub fn log_path() -> PathBuf {
        Self::state_dir().join("codetype.log")
    }

    pub fn config_path() -> PathBuf {
        match ProjectDirs::from("", "", APP_NAME) {
            Some(pd) => pd.config_dir().join("config.json"),
            None => PathBuf::from("codetype_config.json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_live_under_state_dir() {
        let state = AppDirs::state_dir();
        assert_eq!(AppDirs::db_path().parent(), Some(state.as_path()));
        assert_eq!(AppDirs::log_path().parent(), Some(state.as_path()));
    }

    #[test]
    fn config_file_name() {
        assert!(AppDirs::config_path().ends_with("config.json"));
    }
}
