use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RankError {
    #[error("I/O error: {source} (path: {path})")]
    Io {
        source: io::Error,
        path: PathBuf,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Malformed snapshot record at {path}:{line}: {reason}")]
    BadSnapshot {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("Page `{0}` is defined more than once in the snapshot")]
    DuplicatePage(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, RankError>;

impl RankError {
    pub fn io<P: AsRef<Path>>(source: io::Error, path: P) -> Self {
        RankError::Io {
            source,
            path: path.as_ref().to_path_buf(),
        }
    }
}

// `?` on a bare io::Error loses the path; prefer `RankError::io` where one is known
impl From<io::Error> for RankError {
    fn from(source: io::Error) -> Self {
        RankError::Io {
            source,
            path: PathBuf::from("<unknown>"),
        }
    }
}
