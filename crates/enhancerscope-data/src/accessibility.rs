//! Accessibility table reader.
//!
//! Each chunk is a delimited file with one row per (enhancer, cell type,
//! position) measurement:
//!
//! | column | type |
//! |---|---|
//! | `enhancer_id` | string |
//! | `chr` | string |
//! | `start`, `end` | non-negative integer, `start < end` |
//! | `cell_type` | label carrying the ordinal, e.g. `11_CNU_HYa_GABA` |
//! | `position_index` | genomic position |
//! | `accessibility_score` (alias `accessibility`) | float |

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::columns::{clean_cell, ColumnMap};
use crate::error::{LoadError, Result};

/// One accessibility row as it appears on disk. The export writes the same
/// shape, column for column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityRow {
    pub enhancer_id: String,
    #[serde(rename = "chr")]
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub cell_type: String,
    #[serde(rename = "position_index")]
    pub position: u64,
    #[serde(rename = "accessibility_score")]
    pub score: f64,
}

/// Column order of the on-disk and exported tables.
pub const ACCESSIBILITY_COLUMNS: [&str; 7] = [
    "enhancer_id",
    "chr",
    "start",
    "end",
    "cell_type",
    "position_index",
    "accessibility_score",
];

struct Columns {
    enhancer_id: usize,
    chrom: usize,
    start: usize,
    end: usize,
    cell_type: usize,
    position: usize,
    score: usize,
}

impl Columns {
    fn resolve(map: &ColumnMap) -> Result<Self> {
        Ok(Self {
            enhancer_id: map.require("enhancer_id", &["enhancer_id"])?,
            chrom: map.require("chr", &["chr", "chrom", "chromosome"])?,
            start: map.require("start", &["start"])?,
            end: map.require("end", &["end"])?,
            cell_type: map.require("cell_type", &["cell_type"])?,
            position: map.require("position_index", &["position_index", "position"])?,
            score: map.require("accessibility_score", &["accessibility_score", "accessibility"])?,
        })
    }
}

/// Read every row of one accessibility chunk. The first malformed row aborts
/// the load with its line number.
pub fn read_accessibility(path: &Path) -> Result<Vec<AccessibilityRow>> {
    debug!("Loading accessibility rows from {:?}", path);

    let delimiter = if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("tsv")) {
        b'\t'
    } else {
        b','
    };
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(|e| LoadError::csv(path, e))?;

    let headers = reader.headers().map_err(|e| LoadError::csv(path, e))?.clone();
    let columns = Columns::resolve(&ColumnMap::new(path, headers.iter()))?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| LoadError::csv(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let field = |index: usize, name: &str| {
            record
                .get(index)
                .and_then(clean_cell)
                .ok_or_else(|| LoadError::malformed(path, line, format!("empty {name}")))
        };

        let enhancer_id = field(columns.enhancer_id, "enhancer_id")?;
        let chrom = field(columns.chrom, "chr")?;
        let start = parse_coordinate(&field(columns.start, "start")?)
            .ok_or_else(|| LoadError::malformed(path, line, "start is not a non-negative integer"))?;
        let end = parse_coordinate(&field(columns.end, "end")?)
            .ok_or_else(|| LoadError::malformed(path, line, "end is not a non-negative integer"))?;
        if start >= end {
            return Err(LoadError::malformed(
                path,
                line,
                format!("start {start} is not before end {end}"),
            ));
        }
        let cell_type = field(columns.cell_type, "cell_type")?;
        let position = parse_coordinate(&field(columns.position, "position_index")?)
            .ok_or_else(|| LoadError::malformed(path, line, "position_index is not a non-negative integer"))?;
        let score = field(columns.score, "accessibility_score")?
            .parse::<f64>()
            .ok()
            .filter(|s| s.is_finite())
            .ok_or_else(|| LoadError::malformed(path, line, "accessibility_score is not a finite number"))?;

        rows.push(AccessibilityRow { enhancer_id, chrom, start, end, cell_type, position, score });
    }

    debug!("Read {} rows from {:?}", rows.len(), path);
    Ok(rows)
}

/// Integers, also when a dataframe export wrote them as `1200.0`.
fn parse_coordinate(raw: &str) -> Option<u64> {
    if let Ok(v) = raw.parse::<u64>() {
        return Some(v);
    }
    let v = raw.parse::<f64>().ok()?;
    (v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64).then_some(v as u64)
}
