//! Header normalisation and the raw table shape shared by the CSV and Arrow
//! readers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{LoadError, Result};

/// Cell values the upstream exports use for "no value".
const ABSENT_MARKERS: &[&str] = &["", "nan", "none", "null", "false", "n/a"];

/// Trims a cell and maps placeholder markers to `None`.
pub fn clean_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if ABSENT_MARKERS.iter().any(|m| trimmed.eq_ignore_ascii_case(m)) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// `Viewer Link` -> `viewer_link`, `GC delivered` -> `gc_delivered`.
pub(crate) fn normalize_header(header: &str) -> String {
    header
        .trim()
        .trim_start_matches('\u{feff}')
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

pub(crate) struct ColumnMap {
    path: PathBuf,
    indices: HashMap<String, usize>,
}

impl ColumnMap {
    pub(crate) fn new<'a>(path: &Path, headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut indices = HashMap::new();
        for (i, h) in headers.into_iter().enumerate() {
            // First occurrence wins for duplicated headers.
            indices.entry(normalize_header(h)).or_insert(i);
        }
        Self { path: path.to_path_buf(), indices }
    }

    /// Index of the first alias present.
    pub(crate) fn find(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|a| self.indices.get(*a).copied())
    }

    pub(crate) fn require(&self, column: &'static str, aliases: &[&str]) -> Result<usize> {
        self.find(aliases).ok_or_else(|| LoadError::MissingColumn {
            path: self.path.clone(),
            column,
        })
    }
}

/// A table read into strings, one entry per data row with its 1-based
/// source line (CSV) or row number (Arrow).
pub(crate) struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<(u64, Vec<Option<String>>)>,
}

impl RawTable {
    pub(crate) fn read_csv(path: &Path, delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_path(path)
            .map_err(|e| LoadError::csv(path, e))?;

        let headers = reader
            .headers()
            .map_err(|e| LoadError::csv(path, e))?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| LoadError::csv(path, e))?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            rows.push((line, record.iter().map(clean_cell).collect()));
        }
        Ok(Self { headers, rows })
    }

    /// `None` for a cell past the end of a short row.
    pub(crate) fn cell(cells: &[Option<String>], index: Option<usize>) -> Option<&str> {
        index.and_then(|i| cells.get(i)).and_then(|c| c.as_deref())
    }
}
