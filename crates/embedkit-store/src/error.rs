use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid folder \"{folder}\": {reason}")]
    InvalidFolder { folder: String, reason: String },

    #[error("no free file name for {file_name} after {attempts} attempts")]
    NameExhausted { file_name: String, attempts: u32 },

    #[error("failed to encode embedded asset: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
