use anyhow::Result;
use std::path::{Path, PathBuf};

/// Overrides every location below with a single directory
pub const HOME_ENV: &str = "MOVIECLUB_HOME";

const APP_DIR: &str = "movieclub";

/// Where the CLI keeps its settings, the API token and its logs.
///
/// Settings and credentials live in the platform config directory; logs go
/// to the state directory where the platform has one (Linux), otherwise to
/// local data. `MOVIECLUB_HOME` puts all of it under one directory.
#[derive(Debug, Clone, PartialEq)]
pub struct PathManager {
    config_dir: PathBuf,
    log_dir: PathBuf,
}

impl PathManager {
    pub fn new() -> Result<Self> {
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_base(home));
        }

        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join(APP_DIR);
        let log_dir = match dirs::state_dir().or_else(dirs::data_local_dir) {
            Some(state) => state.join(APP_DIR).join("logs"),
            None => config_dir.join("logs"),
        };
        Ok(Self { config_dir, log_dir })
    }

    /// Root everything under one directory (tests, portable installs)
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            log_dir: base.join("logs"),
            config_dir: base,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Holds the write token and the signed-in person; kept apart from
    /// `config.toml` so the settings file can be shared
    pub fn credentials_file(&self) -> PathBuf {
        self.config_dir.join("credentials.toml")
    }

    /// `[logging] file` from the settings: relative names land in the log directory
    pub fn resolve_log_file(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.log_dir.join(file)
        }
    }

    /// Create the settings directory. The log directory is created on first write.
    pub fn ensure_config_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        Ok(())
    }
}

impl Default for PathManager {
    fn default() -> Self {
        // No usable home directory: keep state next to where the command runs
        Self::new().unwrap_or_else(|_| Self::with_base(Path::new(".").join(format!(".{}", APP_DIR))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_base_layout() {
        let paths = PathManager::with_base("/tmp/movieclub-test");
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/movieclub-test/config.toml"));
        assert_eq!(paths.credentials_file(), PathBuf::from("/tmp/movieclub-test/credentials.toml"));
        assert_eq!(paths.log_dir(), Path::new("/tmp/movieclub-test/logs"));
    }

    #[test]
    fn test_resolve_log_file() {
        let paths = PathManager::with_base("/tmp/movieclub-test");
        assert_eq!(
            paths.resolve_log_file(Path::new("debug.log")),
            PathBuf::from("/tmp/movieclub-test/logs/debug.log")
        );
        assert_eq!(
            paths.resolve_log_file(Path::new("/var/log/movieclub.log")),
            PathBuf::from("/var/log/movieclub.log")
        );
    }

    #[test]
    fn test_ensure_config_dir_leaves_logs_alone() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathManager::with_base(dir.path().join("nested"));
        paths.ensure_config_dir().unwrap();
        assert!(paths.config_dir().exists());
        assert!(!paths.log_dir().exists());
    }

    #[test]
    fn test_platform_layout_separates_logs() {
        if std::env::var_os(HOME_ENV).is_some() {
            return;
        }
        if let Ok(paths) = PathManager::new() {
            assert!(paths.config_dir().ends_with(APP_DIR));
            assert!(paths.log_dir().ends_with(Path::new(APP_DIR).join("logs")));
        }
    }
}
