//src/error.rs

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::Source;

/// Everything that can stop a merge run.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Invalid name in merge order: '{name}' (requested merge order: {order})")]
    InvalidSource { name: String, order: String },

    #[error("Source '{0}' appears more than once in the merge order")]
    DuplicateSource(Source),

    #[error("Merge order is empty")]
    EmptyMergeOrder,

    #[error("Merge order references {0} but no {0} input file was given")]
    MissingInput(Source),

    #[error("{source_name} input file {} does not exist or is not a file", path.display())]
    InputNotFound { source_name: Source, path: PathBuf },

    #[error("Chunk size must be at least 1")]
    InvalidChunkSize,

    #[error("{source_name} parse error at line {line}: {message}")]
    Parse {
        source_name: Source,
        line: usize,
        message: String,
    },

    #[error("Cannot open {source_name} input {}: {error}", path.display())]
    Open {
        source_name: Source,
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("Counts for {0} requested before its records were fully read")]
    ReaderNotExhausted(Source),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Merge store error: {0}")]
    Store(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, MergeError>;

impl MergeError {
    /// Errors in the requested configuration, detected before any input is read.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            MergeError::InvalidSource { .. }
                | MergeError::DuplicateSource(_)
                | MergeError::EmptyMergeOrder
                | MergeError::MissingInput(_)
                | MergeError::InputNotFound { .. }
                | MergeError::InvalidChunkSize
        )
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_config_error() {
            2
        } else {
            1
        }
    }
}
