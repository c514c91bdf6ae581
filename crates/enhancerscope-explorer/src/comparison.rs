//! Cross-enhancer views: the comparison heatmap, the per-cell-type profile
//! and the four-panel summary overview.

use std::collections::{BTreeMap, BTreeSet};

use enhancerscope_common::entities::CellTypeOrdinal;
use enhancerscope_data::{Dataset, ScoreStats};
use serde::Serialize;
use serde_json::{json, Value};

use crate::figure::cell_type_color;
use crate::filter::FilteredRows;

const MIN_HEIGHT_PX: u32 = 400;
const ROW_HEIGHT_PX: u32 = 25;

fn chart_height(rows: usize) -> u32 {
    MIN_HEIGHT_PX.max(u32::try_from(rows).unwrap_or(u32::MAX).saturating_mul(ROW_HEIGHT_PX))
}

/// Mean accessibility per (cell type, enhancer). `values[row][col]` is
/// `None` where an enhancer has no record for a cell type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonHeatmap {
    pub enhancers: Vec<String>,
    pub cell_types: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
    pub height_px: u32,
}

impl ComparisonHeatmap {
    pub fn is_empty(&self) -> bool {
        self.enhancers.is_empty() || self.cell_types.is_empty()
    }

    pub fn to_plotly(&self) -> Value {
        json!({
            "data": [{
                "type": "heatmap",
                "z": self.values,
                "x": self.enhancers,
                "y": self.cell_types,
                "colorscale": "Viridis",
                "hovertemplate": "<b>%{y}</b><br>%{x}<br>Accessibility: %{z:.4f}<extra></extra>",
            }],
            "layout": {
                "title": { "text": "Mean Accessibility Comparison Across Enhancers and Cell Types" },
                "xaxis": { "title": { "text": "Enhancer ID" } },
                "yaxis": { "title": { "text": "Cell Type" } },
                "height": self.height_px,
            },
        })
    }
}

/// Heatmap over the given enhancers. Unknown identifiers are skipped;
/// columns keep the requested order.
pub fn build_comparison_heatmap<S: AsRef<str>>(dataset: &Dataset, enhancer_ids: &[S]) -> ComparisonHeatmap {
    let mut enhancers: Vec<&str> = Vec::new();
    for id in enhancer_ids.iter().map(AsRef::as_ref) {
        if dataset.enhancer(id).is_some() && !enhancers.contains(&id) {
            enhancers.push(id);
        }
    }

    let mut sums: BTreeMap<(CellTypeOrdinal, usize), (f64, usize)> = BTreeMap::new();
    for (col, id) in enhancers.iter().enumerate() {
        for record in dataset.records_for(id) {
            let entry = sums.entry((record.cell_type, col)).or_insert((0.0, 0));
            entry.0 += record.score;
            entry.1 += 1;
        }
    }

    let ordinals: Vec<CellTypeOrdinal> =
        sums.keys().map(|(ct, _)| *ct).collect::<BTreeSet<_>>().into_iter().collect();
    let values = ordinals
        .iter()
        .map(|ct| {
            (0..enhancers.len())
                .map(|col| sums.get(&(*ct, col)).map(|(sum, n)| sum / *n as f64))
                .collect()
        })
        .collect();

    ComparisonHeatmap {
        enhancers: enhancers.iter().map(|s| s.to_string()).collect(),
        cell_types: ordinals.iter().map(|o| dataset.cell_type_name(*o)).collect(),
        values,
        height_px: chart_height(ordinals.len()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancerProfileRow {
    pub enhancer_id: String,
    pub mean: f64,
    pub max: f64,
    pub std: f64,
    pub count: usize,
    pub length: u64,
}

/// One cell type across every enhancer, ascending by mean score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellTypeProfile {
    pub ordinal: u8,
    pub cell_type: String,
    pub rows: Vec<EnhancerProfileRow>,
    pub height_px: u32,
}

impl CellTypeProfile {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_plotly(&self) -> Value {
        let ids: Vec<&str> = self.rows.iter().map(|r| r.enhancer_id.as_str()).collect();
        let means: Vec<f64> = self.rows.iter().map(|r| r.mean).collect();
        let text: Vec<String> = means.iter().map(|m| format!("{m:.4}")).collect();
        let custom: Vec<Value> = self.rows.iter().map(|r| json!([r.max, r.std, r.count, r.length])).collect();
        json!({
            "data": [{
                "type": "bar",
                "orientation": "h",
                "y": ids,
                "x": means,
                "text": text,
                "textposition": "auto",
                "customdata": custom,
                "marker": {
                    "color": means,
                    "colorscale": "Viridis",
                    "showscale": true,
                    "colorbar": { "title": { "text": "Mean Accessibility" } },
                },
                "hovertemplate": "<b>%{y}</b><br>Mean Accessibility: %{x:.4f}<br>\
Max Accessibility: %{customdata[0]:.4f}<br>Std Deviation: %{customdata[1]:.4f}<br>\
Data Points: %{customdata[2]}<br>Length: %{customdata[3]:,} bp<extra></extra>",
            }],
            "layout": {
                "title": { "text": format!("<b>Enhancer Accessibility Profile - {}</b>", self.cell_type) },
                "xaxis": { "title": { "text": "Mean Accessibility Score" } },
                "yaxis": { "title": { "text": "Enhancer ID" } },
                "height": self.height_px,
                "margin": { "l": 100, "r": 50, "t": 80, "b": 50 },
            },
        })
    }
}

pub fn build_cell_type_profile(dataset: &Dataset, ordinal: CellTypeOrdinal) -> CellTypeProfile {
    let mut rows: Vec<EnhancerProfileRow> = dataset
        .enhancers()
        .filter_map(|enhancer| {
            let scores = dataset
                .records_for(enhancer.id.as_str())
                .iter()
                .filter(|r| r.cell_type == ordinal)
                .map(|r| r.score);
            let stats = ScoreStats::from_values(scores)?;
            Some(EnhancerProfileRow {
                enhancer_id: enhancer.id.to_string(),
                mean: stats.mean,
                max: stats.max,
                std: stats.std,
                count: stats.count,
                length: enhancer.interval.len(),
            })
        })
        .collect();
    rows.sort_by(|a, b| a.mean.total_cmp(&b.mean).then_with(|| a.enhancer_id.cmp(&b.enhancer_id)));

    CellTypeProfile {
        ordinal: ordinal.get(),
        cell_type: dataset.cell_type_name(ordinal),
        height_px: chart_height(rows.len()),
        rows,
    }
}

// ── Summary overview ─────────────────────────────────────────────────────────

const OVERVIEW_CELL_TYPES: usize = 15;
const OVERVIEW_TOP_ENHANCERS: usize = 20;
const OVERVIEW_HEIGHT_PX: u32 = 800;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellTypeScores {
    pub cell_type: String,
    pub color: &'static str,
    pub scores: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellTypeEnhancerCount {
    pub cell_type: String,
    pub enhancers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancerMean {
    pub enhancer_id: String,
    pub length: u64,
    pub mean: f64,
}

/// Four panels over a set of rows:
/// score distribution for the most measured cell types, distinct enhancers
/// per cell type, the highest mean enhancers, and length against mean.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryDashboard {
    /// Descending by record count, ties by ordinal.
    pub distributions: Vec<CellTypeScores>,
    /// Ordinal order.
    pub enhancer_counts: Vec<CellTypeEnhancerCount>,
    /// Descending by mean, ties by id.
    pub top_enhancers: Vec<EnhancerMean>,
    /// Every enhancer in the rows, by id.
    pub length_vs_mean: Vec<EnhancerMean>,
}

impl SummaryDashboard {
    pub fn is_empty(&self) -> bool {
        self.length_vs_mean.is_empty()
    }

    pub fn to_plotly(&self) -> Value {
        let mut data: Vec<Value> = self
            .distributions
            .iter()
            .map(|d| {
                json!({
                    "type": "box",
                    "y": d.scores,
                    "name": d.cell_type,
                    "marker": { "color": d.color },
                    "boxmean": true,
                    "showlegend": false,
                    "xaxis": "x",
                    "yaxis": "y",
                })
            })
            .collect();

        data.push(json!({
            "type": "bar",
            "name": "Enhancer Count",
            "x": self.enhancer_counts.iter().map(|c| c.cell_type.as_str()).collect::<Vec<_>>(),
            "y": self.enhancer_counts.iter().map(|c| c.enhancers).collect::<Vec<_>>(),
            "marker": { "color": "lightblue" },
            "showlegend": false,
            "xaxis": "x2",
            "yaxis": "y2",
        }));
        data.push(json!({
            "type": "bar",
            "name": "Mean Accessibility",
            "x": self.top_enhancers.iter().map(|e| e.enhancer_id.as_str()).collect::<Vec<_>>(),
            "y": self.top_enhancers.iter().map(|e| e.mean).collect::<Vec<_>>(),
            "marker": { "color": "lightcoral" },
            "showlegend": false,
            "xaxis": "x3",
            "yaxis": "y3",
        }));
        let means: Vec<f64> = self.length_vs_mean.iter().map(|e| e.mean).collect();
        data.push(json!({
            "type": "scatter",
            "mode": "markers",
            "x": self.length_vs_mean.iter().map(|e| e.length).collect::<Vec<_>>(),
            "y": means,
            "text": self.length_vs_mean.iter().map(|e| e.enhancer_id.as_str()).collect::<Vec<_>>(),
            "marker": {
                "size": 8,
                "color": means,
                "colorscale": "Viridis",
                "showscale": true,
                "colorbar": { "title": { "text": "Mean Accessibility" } },
            },
            "hovertemplate": "<b>%{text}</b><br>Length: %{x:,} bp<br>Mean Accessibility: %{y:.4f}<extra></extra>",
            "showlegend": false,
            "xaxis": "x4",
            "yaxis": "y4",
        }));

        let panel_title = |text: &str, x: f64, y: f64| {
            json!({
                "text": format!("<b>{text}</b>"),
                "x": x, "y": y,
                "xref": "paper", "yref": "paper",
                "xanchor": "center", "yanchor": "bottom",
                "showarrow": false,
            })
        };
        json!({
            "data": data,
            "layout": {
                "title": { "text": "<b>Enhancer Summary Dashboard</b>", "x": 0.5 },
                "height": OVERVIEW_HEIGHT_PX,
                "showlegend": false,
                "xaxis":  { "domain": [0.0, 0.45], "anchor": "y",  "title": { "text": "Cell Type" }, "tickangle": 45 },
                "yaxis":  { "domain": [0.575, 1.0], "anchor": "x",  "title": { "text": "Accessibility Score" } },
                "xaxis2": { "domain": [0.55, 1.0], "anchor": "y2", "title": { "text": "Cell Type" }, "tickangle": 45 },
                "yaxis2": { "domain": [0.575, 1.0], "anchor": "x2", "title": { "text": "Number of Enhancers" } },
                "xaxis3": { "domain": [0.0, 0.45], "anchor": "y3", "title": { "text": "Enhancer ID" }, "tickangle": 45 },
                "yaxis3": { "domain": [0.0, 0.425], "anchor": "x3", "title": { "text": "Mean Accessibility" } },
                "xaxis4": { "domain": [0.55, 1.0], "anchor": "y4", "title": { "text": "Enhancer Length (bp)" } },
                "yaxis4": { "domain": [0.0, 0.425], "anchor": "x4", "title": { "text": "Mean Accessibility" } },
                "annotations": [
                    panel_title("Accessibility Distribution by Cell Type", 0.225, 1.0),
                    panel_title("Enhancers per Cell Type", 0.775, 1.0),
                    panel_title("Top Enhancers by Mean Accessibility", 0.225, 0.425),
                    panel_title("Enhancer Length vs Mean Accessibility", 0.775, 0.425),
                ],
            },
        })
    }
}

pub fn build_summary_dashboard(rows: &FilteredRows<'_>) -> SummaryDashboard {
    let dataset = rows.dataset();
    let mut by_cell_type: BTreeMap<CellTypeOrdinal, (Vec<f64>, BTreeSet<&str>)> = BTreeMap::new();
    let mut by_enhancer: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for record in rows.iter() {
        let id = record.enhancer_id.as_str();
        let (scores, enhancers) = by_cell_type.entry(record.cell_type).or_default();
        scores.push(record.score);
        enhancers.insert(id);
        let entry = by_enhancer.entry(id).or_insert((0.0, 0));
        entry.0 += record.score;
        entry.1 += 1;
    }

    let mut ranked: Vec<(&CellTypeOrdinal, &Vec<f64>)> =
        by_cell_type.iter().map(|(ct, (scores, _))| (ct, scores)).collect();
    ranked.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(b.0)));
    let distributions = ranked
        .into_iter()
        .take(OVERVIEW_CELL_TYPES)
        .map(|(ct, scores)| CellTypeScores {
            cell_type: dataset.cell_type_name(*ct),
            color: cell_type_color(*ct),
            scores: scores.clone(),
        })
        .collect();

    let enhancer_counts = by_cell_type
        .iter()
        .take(OVERVIEW_CELL_TYPES)
        .map(|(ct, (_, enhancers))| CellTypeEnhancerCount {
            cell_type: dataset.cell_type_name(*ct),
            enhancers: enhancers.len(),
        })
        .collect();

    let length_vs_mean: Vec<EnhancerMean> = by_enhancer
        .into_iter()
        .map(|(id, (sum, n))| EnhancerMean {
            enhancer_id: id.to_string(),
            length: dataset.enhancer(id).map(|e| e.interval.len()).unwrap_or(0),
            mean: sum / n as f64,
        })
        .collect();

    let mut top_enhancers = length_vs_mean.clone();
    top_enhancers.sort_by(|a, b| b.mean.total_cmp(&a.mean).then_with(|| a.enhancer_id.cmp(&b.enhancer_id)));
    top_enhancers.truncate(OVERVIEW_TOP_ENHANCERS);

    SummaryDashboard { distributions, enhancer_counts, top_enhancers, length_vs_mean }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterEngine;
    use crate::selection::Selections;
    use enhancerscope_test_utils::reference_fixture;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_heatmap_means_and_gaps() {
        let dataset = reference_fixture().build();
        let heatmap = build_comparison_heatmap(&dataset, &["E2", "E1", "missing", "E2"]);

        assert_eq!(heatmap.enhancers, vec!["E2", "E1"]);
        assert_eq!(
            heatmap.cell_types,
            vec!["cell_type_1", "cell_type_2", "cell_type_3", "cell_type_5"]
        );
        // E1 has no cell type 2; E2 has no cell type 1.
        assert_eq!(heatmap.values[0][0], None);
        assert!(heatmap.values[0][1].is_some());
        assert_eq!(heatmap.values[1][1], None);

        // E2 cell type 3 is its second label: 0.1 + 0.01, then +0.05 steps over 4 points.
        let mean = heatmap.values[2][0].unwrap();
        assert!((mean - 0.185).abs() < 1e-9);
        assert_eq!(heatmap.height_px, 400);
    }

    #[test]
    fn test_heatmap_empty_without_known_enhancers() {
        let dataset = reference_fixture().build();
        let heatmap = build_comparison_heatmap::<&str>(&dataset, &[]);
        assert!(heatmap.is_empty());
        assert!(build_comparison_heatmap(&dataset, &["nope"]).is_empty());
    }

    #[test]
    fn test_cell_type_profile_sorted_by_mean() {
        let dataset = reference_fixture().build();
        let ct3 = dataset.resolve_cell_type("3").unwrap();
        let profile = build_cell_type_profile(&dataset, ct3);

        assert_eq!(profile.cell_type, "cell_type_3");
        let ids: Vec<&str> = profile.rows.iter().map(|r| r.enhancer_id.as_str()).collect();
        // E2 has 4 points (mean 0.185), E1 has 5 (mean 0.21).
        assert_eq!(ids, vec!["E2", "E1"]);
        assert_eq!(profile.rows[1].count, 5);
        assert_eq!(profile.rows[1].length, 500);

        let plotly = profile.to_plotly();
        assert_eq!(plotly["data"][0]["y"], json!(["E2", "E1"]));
    }

    #[test]
    fn test_profile_for_unused_cell_type_is_empty() {
        let dataset = reference_fixture().build();
        let profile = build_cell_type_profile(&dataset, CellTypeOrdinal::new(30).unwrap());
        assert!(profile.is_empty());
        assert_eq!(profile.height_px, 400);
    }

    #[test]
    fn test_summary_dashboard_panels() {
        let dataset = reference_fixture().build();
        let rows = FilterEngine::new(&dataset).apply_filters(&Selections::all());
        let overview = build_summary_dashboard(&rows);

        // Record counts: ct3 9, ct1 5, ct5 5, ct2 4, ct4 3.
        let ranked: Vec<(&str, usize)> =
            overview.distributions.iter().map(|d| (d.cell_type.as_str(), d.scores.len())).collect();
        assert_eq!(
            ranked,
            vec![("cell_type_3", 9), ("cell_type_1", 5), ("cell_type_5", 5), ("cell_type_2", 4), ("cell_type_4", 3)]
        );

        let counts: Vec<usize> = overview.enhancer_counts.iter().map(|c| c.enhancers).collect();
        assert_eq!(counts, vec![1, 1, 2, 1, 1]);

        let top: Vec<&str> = overview.top_enhancers.iter().map(|e| e.enhancer_id.as_str()).collect();
        assert_eq!(top, vec!["E1", "E2", "E3"]);
        assert!((overview.top_enhancers[0].mean - 0.21).abs() < 1e-9);

        let lengths: Vec<(&str, u64)> =
            overview.length_vs_mean.iter().map(|e| (e.enhancer_id.as_str(), e.length)).collect();
        assert_eq!(lengths, vec![("E1", 500), ("E2", 800), ("E3", 400)]);

        let plotly = overview.to_plotly();
        // Five box traces, then the three single-trace panels.
        assert_eq!(plotly["data"].as_array().map(Vec::len), Some(8));
        assert_eq!(plotly["data"][7]["xaxis"], "x4");
        assert_eq!(plotly["layout"]["annotations"].as_array().map(Vec::len), Some(4));
    }

    #[test]
    fn test_summary_dashboard_follows_filters() {
        let dataset = reference_fixture().build();
        let rows = FilterEngine::new(&dataset).apply_filters(&Selections::all().with_cargo("GFP"));
        let overview = build_summary_dashboard(&rows);
        let ids: Vec<&str> = overview.length_vs_mean.iter().map(|e| e.enhancer_id.as_str()).collect();
        assert_eq!(ids, vec!["E1", "E3"]);
        assert!(overview.enhancer_counts.iter().all(|c| c.cell_type != "cell_type_2"));

        let none = FilterEngine::new(&dataset).apply_filters(&Selections::all().with_cargo("none"));
        assert!(build_summary_dashboard(&none).is_empty());
    }
}
