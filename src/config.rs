/// Runtime configuration for the command-line front end
///
/// Resolves where the database lives and how chatty logging should be.

use std::path::{Path, PathBuf};

/// File name of the database inside the data directory
pub const DATABASE_FILE_NAME: &str = "HappyDayDatabase.db";

/// Environment variable that overrides the database location
pub const DATABASE_ENV_VAR: &str = "HAPPY_DAY_DATABASE";

/// Log verbosity selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    /// `--verbose` wins over `--debug`; neither means warnings only
    pub fn from_flags(debug: bool, verbose: bool) -> Self {
        if verbose {
            LogLevel::Debug
        } else if debug {
            LogLevel::Info
        } else {
            LogLevel::Warn
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }

    /// Filter directive scoped to this crate
    pub fn filter_directive(&self) -> String {
        format!("happy_day={}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub log_level: LogLevel,
}

impl AppConfig {
    /// Build the configuration from an optional explicit path
    ///
    /// An explicit path gets its parent directory created; otherwise the
    /// first writable default location is used.
    pub fn resolve(database: Option<PathBuf>, log_level: LogLevel) -> std::io::Result<Self> {
        let database_path = match database {
            Some(path) => {
                prepare_parent(&path)?;
                path
            }
            None => default_database_path()?,
        };

        Ok(Self {
            database_path,
            log_level,
        })
    }
}

fn prepare_parent(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn is_writable_dir(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let marker = dir.join(".write_test");
    if std::fs::write(&marker, b"ok").is_ok() {
        let _ = std::fs::remove_file(&marker);
        true
    } else {
        false
    }
}

/// Get the default database path with a fallback chain
///
/// Tries the home directory, then the platform data and config
/// directories, then the working directory, and finally the temp dir.
pub fn default_database_path() -> std::io::Result<PathBuf> {
    let candidates = [
        dirs::home_dir().map(|p| p.join(".happy_day")),
        dirs::data_dir().map(|p| p.join("happy_day")),
        dirs::config_dir().map(|p| p.join("happy_day")),
        std::env::current_dir().ok().map(|p| p.join(".happy_day")),
    ];

    for dir in candidates.iter().flatten() {
        if is_writable_dir(dir) {
            return Ok(dir.join(DATABASE_FILE_NAME));
        }
    }

    let temp_dir = std::env::temp_dir().join("happy_day");
    std::fs::create_dir_all(&temp_dir)?;
    tracing::warn!("Using temporary directory for database: {}", temp_dir.display());
    Ok(temp_dir.join(DATABASE_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_flags() {
        assert_eq!(LogLevel::from_flags(false, false), LogLevel::Warn);
        assert_eq!(LogLevel::from_flags(true, false), LogLevel::Info);
        assert_eq!(LogLevel::from_flags(true, true), LogLevel::Debug);
        assert_eq!(LogLevel::Info.filter_directive(), "happy_day=info");
    }

    #[test]
    fn test_explicit_path_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("diary.db");

        let config = AppConfig::resolve(Some(path.clone()), LogLevel::Warn).unwrap();

        assert_eq!(config.database_path, path);
        assert!(dir.path().join("nested").is_dir());
    }
}
