//! In-memory worksheet storage.

use std::collections::BTreeMap;

use super::types::CellValue;

/// Maximum worksheet name length accepted by Excel.
pub const MAX_SHEET_NAME_LEN: usize = 31;

const INVALID_NAME_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// A worksheet held entirely in memory.
///
/// Rows are sparse and keyed by their 0-based index; each row is a dense
/// vector of cells starting at column 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Worksheet {
    name: String,
    rows: BTreeMap<u32, Vec<CellValue>>,
    modified: bool,
}

impl Worksheet {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            rows: BTreeMap::new(),
            modified: false,
        }
    }

    /// Get the worksheet name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows, counting from row 0 to the last populated row.
    pub fn row_count(&self) -> usize {
        self.rows
            .keys()
            .next_back()
            .map(|last| *last as usize + 1)
            .unwrap_or(0)
    }

    /// Index of the last populated row, if any.
    pub fn last_row_index(&self) -> Option<u32> {
        self.rows.keys().next_back().copied()
    }

    /// Get a row by its 0-based index.
    pub fn row(&self, index: u32) -> Option<&[CellValue]> {
        self.rows.get(&index).map(Vec::as_slice)
    }

    /// Iterate populated rows in ascending order.
    pub fn rows(&self) -> impl Iterator<Item = (u32, &[CellValue])> + '_ {
        self.rows.iter().map(|(idx, cells)| (*idx, cells.as_slice()))
    }

    /// Get a cell value (0-based). Missing cells read as [`CellValue::Empty`].
    pub fn cell(&self, row: u32, column: u16) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.rows
            .get(&row)
            .and_then(|cells| cells.get(column as usize))
            .unwrap_or(&EMPTY)
    }

    /// Set a cell value (0-based), growing the row as needed.
    pub fn set_cell(&mut self, row: u32, column: u16, value: CellValue) {
        let cells = self.rows.entry(row).or_default();
        let column = column as usize;
        if cells.len() <= column {
            cells.resize(column + 1, CellValue::Empty);
        }
        cells[column] = value;
        self.modified = true;
    }

    /// Replace a whole row.
    pub fn set_row(&mut self, row: u32, values: Vec<CellValue>) {
        self.rows.insert(row, values);
        self.modified = true;
    }

    /// Append a row after the last populated one and return its index.
    pub fn append_row(&mut self, values: Vec<CellValue>) -> u32 {
        let index = self.last_row_index().map(|r| r + 1).unwrap_or(0);
        self.set_row(index, values);
        index
    }

    /// Remove a row, returning its cells.
    pub fn remove_row(&mut self, row: u32) -> Option<Vec<CellValue>> {
        let removed = self.rows.remove(&row);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    /// Get the dimensions as (first_row, first_col, last_row, last_col), inclusive.
    /// Returns None if the worksheet has no populated cells.
    pub fn dimensions(&self) -> Option<(u32, u16, u32, u16)> {
        let first_row = *self.rows.keys().next()?;
        let last_row = *self.rows.keys().next_back()?;
        let mut first_col = usize::MAX;
        let mut last_col = 0usize;
        for cells in self.rows.values() {
            if let Some(pos) = cells.iter().position(|c| !c.is_empty()) {
                first_col = first_col.min(pos);
            }
            if let Some(pos) = cells.iter().rposition(|c| !c.is_empty()) {
                last_col = last_col.max(pos);
            }
        }
        if first_col == usize::MAX {
            return None;
        }
        Some((first_row, first_col as u16, last_row, last_col as u16))
    }

    /// Check if the worksheet changed since it was loaded.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub(crate) fn mark_saved(&mut self) {
        self.modified = false;
    }
}

/// Validate a worksheet name against Excel's rules.
pub(crate) fn validate_sheet_name(name: &str) -> Result<(), String> {
    let len = name.chars().count();
    if len == 0 || len > MAX_SHEET_NAME_LEN {
        return Err(format!(
            "Worksheet name must be 1-{} characters",
            MAX_SHEET_NAME_LEN
        ));
    }
    if let Some(c) = name.chars().find(|c| INVALID_NAME_CHARS.contains(c)) {
        return Err(format!("Worksheet name contains invalid character '{}'", c));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err("Worksheet name cannot start or end with an apostrophe".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_cell_grows_row() {
        let mut ws = Worksheet::new("Sheet1".to_string());
        ws.set_cell(2, 3, CellValue::Int(7));
        assert_eq!(ws.row(2).unwrap().len(), 4);
        assert_eq!(ws.cell(2, 3), &CellValue::Int(7));
        assert_eq!(ws.cell(2, 0), &CellValue::Empty);
        assert_eq!(ws.cell(9, 9), &CellValue::Empty);
        assert_eq!(ws.row_count(), 3);
        assert!(ws.is_modified());
    }

    #[test]
    fn test_dimensions_ignore_empty_padding() {
        let mut ws = Worksheet::new("Data".to_string());
        assert_eq!(ws.dimensions(), None);
        ws.set_row(1, vec![CellValue::Empty, "a".into(), CellValue::Empty]);
        ws.set_row(4, vec![CellValue::Empty, CellValue::Empty, 1i64.into()]);
        assert_eq!(ws.dimensions(), Some((1, 1, 4, 2)));
    }

    #[test]
    fn test_append_row() {
        let mut ws = Worksheet::new("Data".to_string());
        assert_eq!(ws.append_row(vec!["h".into()]), 0);
        ws.set_row(10, vec!["x".into()]);
        assert_eq!(ws.append_row(vec!["y".into()]), 11);
    }

    #[test]
    fn test_validate_sheet_name() {
        assert!(validate_sheet_name("Sheet1").is_ok());
        assert!(validate_sheet_name("").is_err());
        assert!(validate_sheet_name(&"x".repeat(32)).is_err());
        assert!(validate_sheet_name("a/b").is_err());
        assert!(validate_sheet_name("'quoted'").is_err());
    }
}
