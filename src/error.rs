use std::path::PathBuf;
use thiserror::Error;

/// Invocation-level failures. Anything wrong *inside* a package is reported
/// as a diagnostic instead.
#[derive(Debug, Error)]
pub enum SkillcheckError {
    #[error("Path does not exist: {path}")]
    NotFound { path: PathBuf },

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Cannot read directory {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

pub type Result<T> = std::result::Result<T, SkillcheckError>;

impl SkillcheckError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
