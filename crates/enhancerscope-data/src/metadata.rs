//! Enhancer/experiment metadata reader.
//!
//! The metadata table has one row per (enhancer, experiment) with the
//! enhancer's cargo and proximal gene repeated on every row, plus the imaging
//! links for that experiment. It is usually an Arrow IPC ("feather") file; a
//! CSV/TSV export with the same columns is accepted too.

use std::fs::File;
use std::path::Path;

use arrow_array::Array;
use arrow_cast::display::array_value_to_string;
use arrow_ipc::reader::FileReader;
use tracing::{debug, warn};

use crate::columns::{clean_cell, ColumnMap, RawTable};
use crate::error::{LoadError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataRow {
    pub enhancer_id: String,
    pub cargo: Option<String>,
    pub experiment: Option<String>,
    pub proximal_gene: Option<String>,
    pub gc_delivered: Option<String>,
    pub image_link: Option<String>,
    pub neuroglancer_1: Option<String>,
    pub neuroglancer_3: Option<String>,
    pub viewer_link: Option<String>,
    pub coronal_mip: Option<String>,
    pub sagittal_mip: Option<String>,
}

impl MetadataRow {
    pub fn new(enhancer_id: impl Into<String>) -> Self {
        Self { enhancer_id: enhancer_id.into(), ..Self::default() }
    }
}

/// Read the metadata table, choosing the reader from the file extension.
/// Rows without an enhancer id are skipped and reported in the second value.
pub fn read_metadata(path: &Path) -> Result<(Vec<MetadataRow>, usize)> {
    if !path.exists() {
        return Err(LoadError::MissingFile(path.to_path_buf()));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let table = match ext.as_deref() {
        Some("csv") => RawTable::read_csv(path, b',')?,
        Some("tsv") | Some("txt") => RawTable::read_csv(path, b'\t')?,
        _ => read_ipc_table(path)?,
    };
    rows_from_table(path, table)
}

/// Stringify every cell of an Arrow IPC file. Nulls become `None`.
fn read_ipc_table(path: &Path) -> Result<RawTable> {
    debug!("Reading Arrow IPC table {:?}", path);
    let arrow_err = |e: arrow_schema::ArrowError| LoadError::Arrow {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let file = File::open(path).map_err(|e| LoadError::io(path, e))?;
    let reader = FileReader::try_new(file, None).map_err(arrow_err)?;
    let headers = reader
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    let mut row_number = 0u64;
    for batch in reader {
        let batch = batch.map_err(arrow_err)?;
        for row in 0..batch.num_rows() {
            row_number += 1;
            let mut cells = Vec::with_capacity(batch.num_columns());
            for column in batch.columns() {
                if column.is_null(row) {
                    cells.push(None);
                } else {
                    let value = array_value_to_string(column.as_ref(), row).map_err(arrow_err)?;
                    cells.push(clean_cell(&value));
                }
            }
            rows.push((row_number, cells));
        }
    }
    Ok(RawTable { headers, rows })
}

fn rows_from_table(path: &Path, table: RawTable) -> Result<(Vec<MetadataRow>, usize)> {
    let map = ColumnMap::new(path, table.headers.iter().map(String::as_str));
    let enhancer_id = map.require("enhancer_id", &["enhancer_id"])?;
    let cargo = map.require("cargo", &["cargo"])?;
    let experiment = map.require("experiment_type", &["experiment_type", "experiment"])?;
    let gene = map.require("proximal_gene", &["proximal_gene", "gene"])?;
    let gc = map.find(&["gc_delivered", "gc"]);
    let image_link = map.find(&["image_link", "image_links"]);
    let ng1 = map.find(&["neuroglancer_1"]);
    let ng3 = map.find(&["neuroglancer_3"]);
    let viewer = map.find(&["viewer_link", "neuroglancer_url"]);
    let coronal = map.find(&["coronal_mip"]);
    let sagittal = map.find(&["sagittal_mip"]);

    let owned = |cells: &[Option<String>], index: Option<usize>| {
        RawTable::cell(cells, index).map(str::to_string)
    };

    let mut rows = Vec::with_capacity(table.rows.len());
    let mut skipped = 0usize;
    for (_, cells) in &table.rows {
        let Some(id) = RawTable::cell(cells, Some(enhancer_id)) else {
            skipped += 1;
            continue;
        };
        rows.push(MetadataRow {
            enhancer_id: id.to_string(),
            cargo: owned(cells, Some(cargo)),
            experiment: owned(cells, Some(experiment)),
            proximal_gene: owned(cells, Some(gene)),
            gc_delivered: owned(cells, gc),
            image_link: owned(cells, image_link),
            neuroglancer_1: owned(cells, ng1),
            neuroglancer_3: owned(cells, ng3),
            viewer_link: owned(cells, viewer),
            coronal_mip: owned(cells, coronal),
            sagittal_mip: owned(cells, sagittal),
        });
    }

    if skipped > 0 {
        warn!("Skipped {} metadata rows without an enhancer id in {:?}", skipped, path);
    }
    debug!("Read {} metadata rows from {:?}", rows.len(), path);
    Ok((rows, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow_array::{Float64Array, RecordBatch, StringArray};
    use arrow_ipc::writer::FileWriter;
    use arrow_schema::{DataType, Field, Schema};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reads_csv_with_spaced_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.csv");
        std::fs::write(
            &path,
            "Enhancer_ID,Cargo,Experiment_Type,Proximal_Gene,GC delivered,image_link,neuroglancer_1,Viewer Link\n\
             E1,GFP,EPI,Gad2,1e10,https://img.org/E1_contact_sheet.png,nan,false\n\
             ,GFP,EPI,Gad2,1e10,,,\n",
        )
        .unwrap();

        let (rows, skipped) = read_metadata(&path).unwrap();
        assert_eq!(skipped, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0],
            MetadataRow {
                enhancer_id: "E1".into(),
                cargo: Some("GFP".into()),
                experiment: Some("EPI".into()),
                proximal_gene: Some("Gad2".into()),
                gc_delivered: Some("1e10".into()),
                image_link: Some("https://img.org/E1_contact_sheet.png".into()),
                ..MetadataRow::new("E1")
            }
        );
    }

    #[test]
    fn test_reads_feather_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.feather");

        let schema = Arc::new(Schema::new(vec![
            Field::new("Enhancer_ID", DataType::Utf8, false),
            Field::new("Cargo", DataType::Utf8, true),
            Field::new("Experiment_Type", DataType::Utf8, true),
            Field::new("Proximal_Gene", DataType::Utf8, true),
            Field::new("GC delivered", DataType::Float64, true),
            Field::new("coronal_mip", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["E1", "E2"])),
                Arc::new(StringArray::from(vec![Some("GFP"), None])),
                Arc::new(StringArray::from(vec!["Lightsheet", "EPI"])),
                Arc::new(StringArray::from(vec!["Gad2", "Sst"])),
                Arc::new(Float64Array::from(vec![Some(5e9), None])),
                Arc::new(StringArray::from(vec![Some("https://img.org/E1_coronal.png"), Some("nan")])),
            ],
        )
        .unwrap();
        let file = File::create(&path).unwrap();
        let mut writer = FileWriter::try_new(file, &schema).unwrap();
        writer.write(&batch).unwrap();
        writer.finish().unwrap();

        let (rows, skipped) = read_metadata(&path).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].experiment.as_deref(), Some("Lightsheet"));
        assert!(rows[0].gc_delivered.is_some());
        assert_eq!(rows[0].coronal_mip.as_deref(), Some("https://img.org/E1_coronal.png"));
        assert_eq!(rows[1].cargo, None);
        assert_eq!(rows[1].gc_delivered, None);
        assert_eq!(rows[1].coronal_mip, None);
    }

    #[test]
    fn test_missing_required_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.csv");
        std::fs::write(&path, "Enhancer_ID,Cargo\nE1,GFP\n").unwrap();
        assert!(matches!(
            read_metadata(&path),
            Err(LoadError::MissingColumn { column: "experiment_type", .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.feather");
        assert!(matches!(read_metadata(&path), Err(LoadError::MissingFile(_))));
    }
}
