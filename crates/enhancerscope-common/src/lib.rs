//! enhancerscope-common: Shared entities, configuration and errors used across all enhancerscope crates.

pub mod config;
pub mod entities;
pub mod error;

// Re-export commonly used types
pub use config::{AppConfig, DataConfig, ExportFormat, FigureConfig, ImagingConfig, ServerConfig};
pub use entities::{
    AccessibilityRecord, CellType, CellTypeOrdinal, Enhancer, EnhancerId, ExperimentKind,
    ExperimentMetadata, GenomeCopies, GenomicInterval, ImagingAssets,
};
pub use error::{ApiError, ConfigError, EnhancerScopeError};
