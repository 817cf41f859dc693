use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type ConvertResult<T> = Result<T, ConvertError>;

/// Per-file conversion failure. Never aborts a batch.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConvertError {
    /// The file the failure refers to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            ConvertError::Read { path, .. } | ConvertError::Write { path, .. } => path,
        }
    }
}
