//! Enhancer exploration engine.
//!
//! Everything the dashboard shows is a pure function of the current
//! [`Selections`] and the loaded [`enhancerscope_data::Dataset`]:
//!
//!   1. Filter options: for each dimension, the values still reachable under
//!      every *other* selection (filters narrow each other)
//!   2. Filtered rows: the conjunction of all selections
//!   3. Figure: one accessibility track per cell type, in ordinal order
//!   4. Imaging: viewer and image links for the selected enhancer
//!   5. Export: the filtered rows as a delimited file
//!
//! [`Explorer::view`] computes all of them in one call.

pub mod catalog;
pub mod comparison;
pub mod error;
pub mod export;
pub mod figure;
pub mod filter;
pub mod imaging;
pub mod selection;
pub mod view;

pub use catalog::{CatalogRow, EnhancerCatalog};
pub use comparison::{
    build_cell_type_profile, build_comparison_heatmap, build_summary_dashboard, CellTypeEnhancerCount,
    CellTypeProfile, CellTypeScores, ComparisonHeatmap, EnhancerMean, EnhancerProfileRow, SummaryDashboard,
};
pub use error::{ExplorerError, ExportError};
pub use export::{export_file_name, export_rows, parse_delimited, preview_rows, to_delimited};
pub use figure::{build_tracks, FigureSpec, SummaryStatistics, Track, TrackFigure, TrackSeries};
pub use filter::{CellTypeOption, FilterEngine, FilterOptions, FilteredRows};
pub use imaging::{AssetKind, ImagingAsset, ImagingLinks, ImagingPolicy, ImagingResolver};
pub use selection::{Dimension, RawSelections, Selections};
pub use view::{Explorer, ExplorerView};
