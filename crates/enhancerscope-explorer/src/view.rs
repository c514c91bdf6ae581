//! One call from selections to everything the dashboard renders.

use std::sync::Arc;

use enhancerscope_common::config::{AppConfig, ExportConfig, ExportFormat, FigureConfig};
use enhancerscope_data::{AccessibilityRow, Dataset};
use serde_json::{json, Value};
use tracing::debug;

use crate::catalog::EnhancerCatalog;
use crate::error::Result;
use crate::export::{export_file_name, preview_rows, to_delimited};
use crate::figure::{build_tracks, FigureSpec, SummaryStatistics};
use crate::filter::{FilterEngine, FilterOptions, FilteredRows};
use crate::imaging::{ImagingLinks, ImagingPolicy, ImagingResolver};
use crate::selection::{RawSelections, Selections};

/// Holds the shared dataset and the presentation settings. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Explorer {
    dataset: Arc<Dataset>,
    figure: FigureConfig,
    imaging: ImagingPolicy,
    export: ExportConfig,
}

impl Explorer {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self {
            dataset,
            figure: FigureConfig::default(),
            imaging: ImagingPolicy::default(),
            export: ExportConfig::default(),
        }
    }

    pub fn from_config(dataset: Arc<Dataset>, config: &AppConfig) -> Self {
        Self {
            dataset,
            figure: config.figure.clone(),
            imaging: ImagingPolicy::from(&config.imaging),
            export: config.export.clone(),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn export_format(&self) -> ExportFormat {
        self.export.format
    }

    /// Resolve raw request input into selections over this dataset.
    pub fn selections(&self, raw: &RawSelections) -> Result<Selections> {
        Selections::resolve(raw, &self.dataset)
    }

    pub fn options(&self, selections: &Selections) -> FilterOptions {
        FilterEngine::new(&self.dataset).compute_options(selections)
    }

    pub fn imaging(&self, selections: &Selections) -> Option<ImagingLinks> {
        let enhancer = selections.enhancer.as_ref()?;
        let resolver = ImagingResolver::new(&self.dataset, self.imaging.clone());
        Some(resolver.resolve_with_copies(
            enhancer.as_str(),
            selections.experiment.as_deref(),
            selections.gc_delivered.as_ref(),
        ))
    }

    pub fn view(&self, selections: &Selections) -> ExplorerView<'_> {
        let engine = FilterEngine::new(&self.dataset);
        let options = engine.compute_options(selections);
        let rows = engine.apply_filters(selections);
        let figure = build_tracks(&rows, &self.figure);
        let summary = SummaryStatistics::from_rows(&rows);
        let catalog = EnhancerCatalog::from_rows(&rows, selections);
        let imaging = self.imaging(selections);
        let preview = preview_rows(&rows, self.export.preview_rows);

        debug!(
            "View computed: {} rows, {} tracks, empty={}",
            rows.len(),
            figure.tracks().len(),
            options.empty
        );

        ExplorerView {
            selections: selections.clone(),
            options,
            rows,
            figure,
            summary,
            imaging,
            catalog,
            preview,
        }
    }
}

/// Everything derived from one set of selections.
#[derive(Debug, Clone)]
pub struct ExplorerView<'a> {
    pub selections: Selections,
    pub options: FilterOptions,
    pub rows: FilteredRows<'a>,
    pub figure: FigureSpec,
    pub summary: Option<SummaryStatistics>,
    pub imaging: Option<ImagingLinks>,
    pub catalog: EnhancerCatalog,
    /// Leading export rows for the raw data table.
    pub preview: Vec<AccessibilityRow>,
}

impl ExplorerView<'_> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn export_bytes(&self, format: ExportFormat) -> Result<Vec<u8>> {
        Ok(to_delimited(&self.rows, format)?)
    }

    pub fn export_file_name(&self, format: ExportFormat) -> String {
        export_file_name(&self.selections, format)
    }

    /// JSON payload for the dashboard. The figure is already in Plotly form.
    pub fn to_json(&self) -> Value {
        let dataset = self.rows.dataset();
        json!({
            "selections": self.selections.to_raw(dataset),
            "options": self.options,
            "empty": self.options.empty,
            "row_count": self.rows.len(),
            "figure": self.figure.to_plotly(),
            "summary": self.summary,
            "imaging": self.imaging,
            "catalog": self.catalog,
            "preview": self.preview,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enhancerscope_common::entities::ExperimentKind;
    use enhancerscope_test_utils::reference_fixture;
    use pretty_assertions::assert_eq;

    fn explorer() -> Explorer {
        Explorer::new(Arc::new(reference_fixture().build()))
    }

    #[test]
    fn test_view_without_enhancer_has_no_imaging() {
        let explorer = explorer();
        let view = explorer.view(&Selections::all());
        assert!(view.imaging.is_none());
        assert_eq!(view.catalog.len(), 3);
        assert_eq!(view.rows.len(), 15 + 8 + 3);
        assert!(view.summary.is_some());
    }

    #[test]
    fn test_view_for_enhancer() {
        let explorer = explorer();
        let view = explorer.view(&Selections::all().with_enhancer("E1"));
        assert_eq!(view.figure.tracks().len(), 3);
        assert_eq!(
            view.imaging.as_ref().and_then(ImagingLinks::modality),
            Some(ExperimentKind::Lightsheet)
        );
        assert_eq!(view.export_file_name(ExportFormat::Csv), "E1_accessibility_data.csv");

        let json = view.to_json();
        assert_eq!(json["selections"]["enhancer"], "E1");
        assert_eq!(json["imaging"]["status"], "available");
        assert_eq!(json["row_count"], 15);
    }

    #[test]
    fn test_raw_selections_resolve_through_explorer() {
        let explorer = explorer();
        let raw = RawSelections { cell_type: Some("cell_type_3".into()), ..RawSelections::default() };
        let s = explorer.selections(&raw).unwrap();
        assert_eq!(s.cell_type.map(|c| c.get()), Some(3));

        let bad = RawSelections { cell_type: Some("Astrocytes".into()), ..RawSelections::default() };
        assert!(explorer.selections(&bad).is_err());
    }

    #[test]
    fn test_config_drives_figure_imaging_and_preview() {
        let mut config = AppConfig::default();
        config.figure.track_height_px = 200;
        config.figure.min_height_px = 100;
        config.imaging.priority = vec![ExperimentKind::Epi];
        config.export.preview_rows = 2;
        config.export.format = ExportFormat::Tsv;
        let explorer = Explorer::from_config(Arc::new(reference_fixture().build()), &config);
        assert_eq!(explorer.export_format(), ExportFormat::Tsv);

        let view = explorer.view(&Selections::all().with_enhancer("E1"));
        assert_eq!(view.figure.height_px(), 3 * 200);
        assert_eq!(
            view.imaging.as_ref().and_then(ImagingLinks::modality),
            Some(ExperimentKind::Epi)
        );
        assert_eq!(view.preview.len(), 2);
        assert_eq!(view.preview[0].enhancer_id, "E1");
        assert_eq!(view.to_json()["preview"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_empty_view_exports_header_only() {
        let explorer = explorer();
        let view = explorer.view(&Selections::all().with_gene("Sst").with_cargo("GFP"));
        assert!(view.is_empty());
        assert!(view.figure.is_empty());
        assert!(view.options.empty);
        let bytes = view.export_bytes(ExportFormat::Csv).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap().lines().count(), 1);
    }
}
