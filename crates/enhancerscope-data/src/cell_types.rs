//! Cell type reference table.
//!
//! Without an explicit table the ordinal is read from the label itself
//! (`11_CNU_HYa_GABA` is cell type 11). With a table (`ordinal,name` CSV),
//! only the labels it lists are accepted.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use enhancerscope_common::entities::{CellType, CellTypeOrdinal};
use tracing::info;

use crate::columns::{ColumnMap, RawTable};
use crate::error::{LoadError, Result};

#[derive(Debug, Clone, Default)]
pub struct CellTypeRegistry {
    by_ordinal: BTreeMap<CellTypeOrdinal, CellType>,
    by_label: HashMap<String, CellTypeOrdinal>,
    /// Loaded from a table: unknown labels are rejected instead of parsed.
    fixed: bool,
}

impl CellTypeRegistry {
    /// Registry that learns cell types from labels as they are resolved.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry restricted to the given cell types.
    pub fn from_cell_types(cell_types: impl IntoIterator<Item = CellType>) -> Result<Self> {
        let mut registry = Self { fixed: true, ..Self::default() };
        for cell_type in cell_types {
            registry.insert(cell_type.ordinal, &cell_type.name)?;
        }
        Ok(registry)
    }

    /// Load an `ordinal,name` table.
    pub fn from_table(path: &Path) -> Result<Self> {
        let table = RawTable::read_csv(path, b',')?;
        let map = ColumnMap::new(path, table.headers.iter().map(String::as_str));
        let ordinal_col = map.require("ordinal", &["ordinal", "cell_type_id", "id"])?;
        let name_col = map.require("name", &["name", "cell_type", "label"])?;

        let mut cell_types = Vec::with_capacity(table.rows.len());
        for (line, cells) in &table.rows {
            let raw = RawTable::cell(cells, Some(ordinal_col))
                .ok_or_else(|| LoadError::malformed(path, *line, "empty ordinal"))?;
            let ordinal = raw
                .parse::<u8>()
                .ok()
                .and_then(CellTypeOrdinal::new)
                .ok_or_else(|| LoadError::malformed(path, *line, format!("ordinal '{raw}' outside 1..=34")))?;
            let name = RawTable::cell(cells, Some(name_col))
                .ok_or_else(|| LoadError::malformed(path, *line, "empty name"))?;
            cell_types.push(CellType { ordinal, name: name.to_string() });
        }

        let registry = Self::from_cell_types(cell_types)?;
        info!("Loaded {} cell types from {:?}", registry.len(), path);
        Ok(registry)
    }

    fn insert(&mut self, ordinal: CellTypeOrdinal, label: &str) -> Result<()> {
        if let Some(existing) = self.by_ordinal.get(&ordinal) {
            if existing.name != label {
                return Err(LoadError::ConflictingCellType {
                    ordinal: ordinal.get(),
                    first: existing.name.clone(),
                    second: label.to_string(),
                });
            }
        } else {
            self.by_ordinal.insert(ordinal, CellType { ordinal, name: label.to_string() });
        }
        self.by_label.insert(label.to_string(), ordinal);
        Ok(())
    }

    /// Resolve a label, registering it when the registry is not fixed.
    pub fn resolve(&mut self, label: &str) -> Result<CellTypeOrdinal> {
        if let Some(ordinal) = self.lookup(label) {
            return Ok(ordinal);
        }
        if self.fixed {
            return Err(LoadError::UnresolvedCellType(label.to_string()));
        }
        let ordinal = CellTypeOrdinal::parse_label(label)
            .ok_or_else(|| LoadError::UnresolvedCellType(label.to_string()))?;
        self.insert(ordinal, label)?;
        Ok(ordinal)
    }

    /// Read-only resolution: an exact label, or a bare ordinal such as `"5"`.
    pub fn lookup(&self, label: &str) -> Option<CellTypeOrdinal> {
        if let Some(ordinal) = self.by_label.get(label) {
            return Some(*ordinal);
        }
        label
            .trim()
            .parse::<u8>()
            .ok()
            .and_then(CellTypeOrdinal::new)
            .filter(|o| self.by_ordinal.contains_key(o))
    }

    pub fn get(&self, ordinal: CellTypeOrdinal) -> Option<&CellType> {
        self.by_ordinal.get(&ordinal)
    }

    /// Display name, falling back to the bare ordinal.
    pub fn name(&self, ordinal: CellTypeOrdinal) -> String {
        self.get(ordinal)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| ordinal.to_string())
    }

    /// Cell types in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = &CellType> {
        self.by_ordinal.values()
    }

    pub fn len(&self) -> usize {
        self.by_ordinal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ordinal.is_empty()
    }

    /// Drop cell types no record refers to.
    pub(crate) fn retain(&mut self, used: impl Fn(CellTypeOrdinal) -> bool) {
        self.by_ordinal.retain(|o, _| used(*o));
        self.by_label.retain(|_, o| used(*o));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learns_ordinals_from_labels() {
        let mut registry = CellTypeRegistry::new();
        assert_eq!(registry.resolve("11_CNU_HYa_GABA").unwrap().get(), 11);
        assert_eq!(registry.resolve("cell_type_3").unwrap().get(), 3);
        assert_eq!(registry.lookup("11").map(|o| o.get()), Some(11));
        assert_eq!(registry.lookup("12"), None);

        let names: Vec<&str> = registry.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["cell_type_3", "11_CNU_HYa_GABA"]);
    }

    #[test]
    fn test_rejects_unparseable_and_conflicting_labels() {
        let mut registry = CellTypeRegistry::new();
        assert!(matches!(registry.resolve("Astro"), Err(LoadError::UnresolvedCellType(_))));
        assert!(matches!(registry.resolve("40_Unknown"), Err(LoadError::UnresolvedCellType(_))));

        registry.resolve("5_L5_ET").unwrap();
        assert!(matches!(
            registry.resolve("5_Other"),
            Err(LoadError::ConflictingCellType { ordinal: 5, .. })
        ));
    }

    #[test]
    fn test_table_restricts_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cell_types.csv");
        std::fs::write(&path, "ordinal,name\n1,Astro\n2,Oligo\n").unwrap();

        let mut registry = CellTypeRegistry::from_table(&path).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve("Oligo").unwrap().get(), 2);
        assert_eq!(registry.resolve("1").unwrap().get(), 1);
        assert!(matches!(registry.resolve("3_Micro"), Err(LoadError::UnresolvedCellType(_))));
    }

    #[test]
    fn test_table_with_bad_ordinal_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cell_types.csv");
        std::fs::write(&path, "ordinal,name\n99,Astro\n").unwrap();
        assert!(matches!(
            CellTypeRegistry::from_table(&path),
            Err(LoadError::MalformedRow { line: 2, .. })
        ));
    }
}
