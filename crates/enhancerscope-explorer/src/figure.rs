//! Genome-browser style accessibility figure.
//!
//! One track per cell type, stacked top to bottom in ordinal order, each
//! plotting accessibility score against genomic position. All tracks share
//! one y range so heights compare across cell types. The figure is plain data;
//! [`FigureSpec::to_plotly`] renders it for Plotly.js.

use std::collections::BTreeMap;

use enhancerscope_common::config::FigureConfig;
use enhancerscope_common::entities::CellTypeOrdinal;
use enhancerscope_data::{quantile_sorted, ScoreStats};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::filter::FilteredRows;

/// Track colours, indexed by cell type ordinal.
pub const PALETTE: [&str; 35] = [
    "#8B0000", "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4",
    "#FFEAA7", "#DDA0DD", "#98D8C8", "#F7DC6F", "#BB8FCE",
    "#85C1E9", "#F8C471", "#82E0AA", "#F1948A", "#AED6F1",
    "#A9DFBF", "#F9E79F", "#D7BDE2", "#A3E4D7", "#FAD7A0",
    "#CD5C5C", "#20B2AA", "#87CEEB", "#DDA0DD", "#F0E68C",
    "#FFB6C1", "#98FB98", "#87CEFA", "#F4A460", "#DA70D6",
    "#32CD32", "#FF69B4", "#00CED1", "#FF1493", "#00FF7F",
];

pub fn cell_type_color(ordinal: CellTypeOrdinal) -> &'static str {
    PALETTE[(ordinal.get() as usize - 1) % PALETTE.len()]
}

pub const EMPTY_MESSAGE: &str = "No accessibility data for the current selection";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FigureSpec {
    Tracks(TrackFigure),
    Empty { message: String, height_px: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackFigure {
    pub title: String,
    /// Locus line, only when a single enhancer is shown.
    pub subtitle: Option<String>,
    pub height_px: u32,
    pub y_range: [f64; 2],
    /// Enhancer span, only when a single enhancer is shown.
    pub x_range: Option<[u64; 2]>,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub ordinal: u8,
    pub cell_type: String,
    pub color: &'static str,
    pub series: Vec<TrackSeries>,
}

/// Points of one enhancer within a track, sorted by position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSeries {
    pub enhancer_id: String,
    pub positions: Vec<u64>,
    pub scores: Vec<f64>,
    /// Scores strictly above this are peaks.
    pub peak_threshold: f64,
    /// Indices into `positions`/`scores`.
    pub peaks: Vec<usize>,
}

impl FigureSpec {
    pub fn is_empty(&self) -> bool {
        matches!(self, FigureSpec::Empty { .. })
    }

    pub fn height_px(&self) -> u32 {
        match self {
            FigureSpec::Tracks(fig) => fig.height_px,
            FigureSpec::Empty { height_px, .. } => *height_px,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        match self {
            FigureSpec::Tracks(fig) => &fig.tracks,
            FigureSpec::Empty { .. } => &[],
        }
    }

    /// Plotly `{data, layout}` with one stacked y axis per track.
    pub fn to_plotly(&self) -> Value {
        match self {
            FigureSpec::Empty { message, height_px } => json!({
                "data": [],
                "layout": {
                    "height": height_px,
                    "xaxis": { "visible": false },
                    "yaxis": { "visible": false },
                    "annotations": [{
                        "text": message,
                        "xref": "paper", "yref": "paper",
                        "x": 0.5, "y": 0.5,
                        "showarrow": false,
                        "font": { "size": 16, "color": "#6c757d" }
                    }],
                    "plot_bgcolor": "white"
                }
            }),
            FigureSpec::Tracks(fig) => fig.to_plotly(),
        }
    }
}

impl TrackFigure {
    fn to_plotly(&self) -> Value {
        let n = self.tracks.len();
        let gap = if n > 1 { 0.02 } else { 0.0 };
        let mut data = Vec::new();
        let mut layout = Map::new();

        for (i, track) in self.tracks.iter().enumerate() {
            let axis = if i == 0 { "y".to_string() } else { format!("y{}", i + 1) };
            let axis_key = if i == 0 { "yaxis".to_string() } else { format!("yaxis{}", i + 1) };
            let top = 1.0 - i as f64 / n as f64;
            let bottom = (1.0 - (i + 1) as f64 / n as f64 + gap).min(top);

            for series in &track.series {
                data.push(json!({
                    "type": "scatter",
                    "mode": "lines",
                    "x": series.positions,
                    "y": series.scores,
                    "xaxis": "x",
                    "yaxis": axis,
                    "name": track.cell_type,
                    "fill": "tozeroy",
                    "fillcolor": rgba(track.color, 0.3),
                    "line": { "color": track.color, "width": 1.5 },
                    "hovertemplate": format!(
                        "<b>{}</b><br>{}<br>Position: %{{x:,}}<br>Accessibility: %{{y:.4f}}<extra></extra>",
                        track.cell_type, series.enhancer_id
                    ),
                }));
                if !series.peaks.is_empty() {
                    let xs: Vec<u64> = series.peaks.iter().map(|&p| series.positions[p]).collect();
                    let ys: Vec<f64> = series.peaks.iter().map(|&p| series.scores[p]).collect();
                    data.push(json!({
                        "type": "scatter",
                        "mode": "markers",
                        "x": xs,
                        "y": ys,
                        "xaxis": "x",
                        "yaxis": axis,
                        "name": format!("{} peaks", track.cell_type),
                        "marker": { "color": track.color, "size": 6, "line": { "color": "white", "width": 1 } },
                        "showlegend": false,
                        "hovertemplate": "Peak: %{y:.4f}<extra></extra>",
                    }));
                }
            }

            layout.insert(
                axis_key,
                json!({
                    "domain": [bottom, top],
                    "range": self.y_range,
                    "anchor": "x",
                    "title": { "text": track.cell_type, "font": { "size": 10 } },
                    "showgrid": true,
                    "gridcolor": "#f0f0f0",
                    "zeroline": false,
                }),
            );
        }

        let bottom_axis = if n <= 1 { "y".to_string() } else { format!("y{n}") };
        let mut xaxis = json!({
            "anchor": bottom_axis,
            "title": { "text": "Genomic Position" },
            "showgrid": true,
            "gridcolor": "#f0f0f0",
            "tickformat": ",d",
        });
        if let Some(range) = self.x_range {
            xaxis["range"] = json!(range);
        }
        layout.insert("xaxis".into(), xaxis);

        let title = match &self.subtitle {
            Some(sub) => format!("{}<br><sub>{}</sub>", self.title, sub),
            None => self.title.clone(),
        };
        layout.insert("title".into(), json!({ "text": title, "x": 0.5 }));
        layout.insert("height".into(), json!(self.height_px));
        layout.insert("showlegend".into(), json!(false));
        layout.insert("plot_bgcolor".into(), json!("white"));
        layout.insert("hovermode".into(), json!("closest"));
        layout.insert("margin".into(), json!({ "l": 140, "r": 40, "t": 90, "b": 60 }));

        json!({ "data": data, "layout": Value::Object(layout) })
    }
}

fn rgba(hex: &str, alpha: f64) -> String {
    let h = hex.trim_start_matches('#');
    let channel = |i: usize| h.get(i..i + 2).and_then(|c| u8::from_str_radix(c, 16).ok()).unwrap_or(0);
    format!("rgba({}, {}, {}, {})", channel(0), channel(2), channel(4), alpha)
}

/// Build the track figure for the filtered rows. Never fails: an empty
/// selection gives [`FigureSpec::Empty`].
pub fn build_tracks(rows: &FilteredRows<'_>, config: &FigureConfig) -> FigureSpec {
    if rows.is_empty() {
        return FigureSpec::Empty {
            message: EMPTY_MESSAGE.to_string(),
            height_px: config.empty_height_px,
        };
    }
    let dataset = rows.dataset();

    // cell type -> enhancer -> (position, score)
    let mut grouped: BTreeMap<CellTypeOrdinal, BTreeMap<&str, Vec<(u64, f64)>>> = BTreeMap::new();
    let mut max_score = f64::NEG_INFINITY;
    for record in rows.iter() {
        grouped
            .entry(record.cell_type)
            .or_default()
            .entry(record.enhancer_id.as_str())
            .or_default()
            .push((record.position, record.score));
        max_score = max_score.max(record.score);
    }

    let tracks: Vec<Track> = grouped
        .into_iter()
        .map(|(ordinal, by_enhancer)| Track {
            ordinal: ordinal.get(),
            cell_type: dataset.cell_type_name(ordinal),
            color: cell_type_color(ordinal),
            series: by_enhancer
                .into_iter()
                .map(|(id, points)| build_series(id, points, config.peak_quantile))
                .collect(),
        })
        .collect();

    let enhancers = rows.enhancers();
    let (title, subtitle, x_range) = match enhancers.as_slice() {
        [single] => (
            format!("Peak Accessibility Profile: {}", single.id),
            Some(single.interval.locus_label()),
            Some([single.interval.start, single.interval.end]),
        ),
        many => (format!("Peak Accessibility Profile: {} enhancers", many.len()), None, None),
    };

    let track_count = tracks.len() as u32;
    let y_max = if max_score > 0.0 { max_score * config.y_padding } else { 1.0 };
    FigureSpec::Tracks(TrackFigure {
        title,
        subtitle,
        height_px: config.min_height_px.max(track_count.saturating_mul(config.track_height_px)),
        y_range: [0.0, y_max],
        x_range,
        tracks,
    })
}

fn build_series(enhancer_id: &str, mut points: Vec<(u64, f64)>, peak_quantile: f64) -> TrackSeries {
    points.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
    let mut sorted_scores: Vec<f64> = points.iter().map(|p| p.1).collect();
    sorted_scores.sort_by(f64::total_cmp);
    let peak_threshold = quantile_sorted(&sorted_scores, peak_quantile);

    let peaks = points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.1 > peak_threshold)
        .map(|(i, _)| i)
        .collect();
    TrackSeries {
        enhancer_id: enhancer_id.to_string(),
        positions: points.iter().map(|p| p.0).collect(),
        scores: points.iter().map(|p| p.1).collect(),
        peak_threshold,
        peaks,
    }
}

/// Statistics panel for the filtered rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub enhancers: usize,
    pub cell_types: usize,
    /// Cell type reaching the highest single score.
    pub top_cell_type: Option<String>,
    /// Distinct peak positions across the selection.
    pub peak_positions: usize,
}

impl SummaryStatistics {
    /// `None` when there are no rows.
    pub fn from_rows(rows: &FilteredRows<'_>) -> Option<Self> {
        let stats = ScoreStats::from_values(rows.iter().map(|r| r.score))?;
        let top = rows
            .iter()
            .fold(None, |best: Option<(CellTypeOrdinal, f64)>, r| match best {
                Some((_, s)) if s >= r.score => best,
                _ => Some((r.cell_type, r.score)),
            })
            .map(|(o, _)| rows.dataset().cell_type_name(o));
        let positions: std::collections::BTreeSet<u64> = rows.iter().map(|r| r.position).collect();

        Some(Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean,
            median: stats.median,
            std: stats.std,
            enhancers: rows.enhancers().len(),
            cell_types: rows.cell_types().len(),
            top_cell_type: top,
            peak_positions: positions.len(),
        })
    }
}
