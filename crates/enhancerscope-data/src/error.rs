use std::path::PathBuf;

use thiserror::Error;

/// Startup failure while reading or joining the input tables. Always fatal.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Required file missing: {0}")]
    MissingFile(PathBuf),

    #[error("No accessibility files matching '{pattern}' in {dir}")]
    NoAccessibilityFiles { dir: PathBuf, pattern: String },

    #[error("Invalid accessibility file pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Arrow error in {path}: {message}")]
    Arrow { path: PathBuf, message: String },

    #[error("{path}: missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{path}:{line}: {message}")]
    MalformedRow { path: PathBuf, line: u64, message: String },

    #[error("Enhancer '{enhancer_id}': start {start} is not before end {end}")]
    InvalidInterval { enhancer_id: String, start: u64, end: u64 },

    #[error("Enhancer '{0}' has accessibility data but no metadata entry")]
    UnresolvedEnhancer(String),

    #[error("Cell type '{0}' does not resolve to an ordinal in 1..=34")]
    UnresolvedCellType(String),

    #[error("Cell type ordinal {ordinal} is used by both '{first}' and '{second}'")]
    ConflictingCellType { ordinal: u8, first: String, second: String },

    #[error("Exported row {enhancer_id}/{cell_type}@{position} does not match any loaded record")]
    UnmatchedRecord { enhancer_id: String, cell_type: String, position: u64 },

    #[error("No accessibility records were loaded")]
    Empty,
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::MissingFile(path)
        } else {
            LoadError::Io { path, source }
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        let path = path.into();
        match source.kind() {
            csv::ErrorKind::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                LoadError::MissingFile(path)
            }
            _ => LoadError::Csv { path, source },
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, line: u64, message: impl Into<String>) -> Self {
        LoadError::MalformedRow { path: path.into(), line, message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;
