use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::git::GitError;

pub type Result<T> = std::result::Result<T, StampError>;

#[derive(Debug, Error)]
pub enum StampError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("template error at {line}:{col}: {msg}")]
    Template { line: usize, col: usize, msg: String },

    #[error("unknown template field '{{{name}}}' at {line}:{col}")]
    UnknownField { name: String, line: usize, col: usize },

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("failed to write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
