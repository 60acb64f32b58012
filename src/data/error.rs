// ============================================================
// Layer 4 — Dataset Errors
// ============================================================
// Typed failures of the loaders. Every variant carries the path
// that failed so the aborted run says which file to look at.
// Callers in Layer 2 convert into anyhow::Error with `?`.

use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("manifest {path} line {line}: {msg}")]
    Manifest {
        path: PathBuf,
        line: usize,
        msg:  String,
    },
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("audio decode error at {path}: {source}")]
    Audio {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("{0}")]
    Other(String),
}

impl DatasetError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DatasetError::Io { path: path.into(), source }
    }
}
