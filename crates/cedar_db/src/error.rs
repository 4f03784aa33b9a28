use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("bad schema line {line:?}: {reason}")]
    SchemaParse { line: String, reason: String },
    #[error("cannot parse {value:?} as {expected}")]
    CodecParse {
        value: String,
        expected: &'static str,
    },
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("no column named {0:?}")]
    UnknownColumn(String),
    #[error("corrupt data in {path} at offset {offset}: {reason}")]
    Corruption {
        path: PathBuf,
        offset: u64,
        reason: String,
    },
}

impl DbError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DbError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn schema(line: impl Into<String>, reason: impl Into<String>) -> Self {
        DbError::SchemaParse {
            line: line.into(),
            reason: reason.into(),
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, offset: u64, reason: impl Into<String>) -> Self {
        DbError::Corruption {
            path: path.into(),
            offset,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
