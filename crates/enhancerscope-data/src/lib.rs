//! Enhancer accessibility data loading.
//!
//! Reads the merged enhancer/experiment metadata table (Arrow IPC "feather"
//! or CSV) and the chunked per-cell-type accessibility tables, and joins them
//! into one immutable [`Dataset`] snapshot keyed by enhancer and cell type.
//!
//! # Example
//!
//! ```rust,no_run
//! use enhancerscope_common::DataConfig;
//! use enhancerscope_data::{DatasetSource, FileDatasetSource};
//!
//! fn main() -> Result<(), enhancerscope_data::LoadError> {
//!     let source = FileDatasetSource::new(DataConfig::in_dir("data"));
//!     let dataset = source.load()?;
//!
//!     for enhancer in dataset.enhancers() {
//!         println!("{} {} ({} records)", enhancer.id, enhancer.interval,
//!             dataset.records_for(enhancer.id.as_str()).len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod accessibility;
pub mod cell_types;
mod columns;
pub mod dataset;
pub mod error;
pub mod metadata;
pub mod source;
pub mod summary;
pub mod validate;

pub use accessibility::AccessibilityRow;
pub use cell_types::CellTypeRegistry;
pub use columns::clean_cell;
pub use dataset::{Dataset, JoinOptions, LoadNotes};
pub use error::{LoadError, Result};
pub use metadata::MetadataRow;
pub use source::{DatasetSource, FileDatasetSource};
pub use summary::{quantile_sorted, DatasetSummary, ScoreStats};
pub use validate::{IntegrityIssue, IntegrityReport};
