use thiserror::Error;

/// Failures while serializing an export. The caller may retry.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export buffer error: {0}")]
    Buffer(String),
}

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("Unknown cell type '{0}'")]
    UnknownCellType(String),

    #[error(transparent)]
    Export(#[from] ExportError),
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
