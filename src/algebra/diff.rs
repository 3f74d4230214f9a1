//! Keyed diff between two tables. Each side is indexed by the raw text of
//! its key column (later collisions overwrite earlier rows); comparison then
//! walks the old table's headers only, so columns added in the new table are
//! invisible to the change list. That asymmetry is deliberate and documented.

use crate::model::Row;
use crate::model::Table;
use indexmap::IndexMap;

/// One differing cell of a modified row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellChange {
    pub column: String,
    pub old_raw: String,
    pub new_raw: String,
}

/// A row present on both sides whose non-key cells differ.
#[derive(Clone, Debug)]
pub struct RowChange {
    /// Raw text of the key column
    pub key: String,
    pub old: Row,
    pub new: Row,
    /// Differing columns, in the old table's header order
    pub changes: Vec<CellChange>,
}

/// Result of [`Table::diff`].
#[derive(Clone, Debug, Default)]
pub struct DiffResult {
    /// Rows whose key exists only in the new table, in new-table order
    pub added: Vec<Row>,
    /// Rows whose key exists only in the old table, in old-table order
    pub removed: Vec<Row>,
    pub modified: Vec<RowChange>,
}

impl DiffResult {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

impl Table {
    /// Diffs `self` (the old table) against `new`, keyed on the raw text of
    /// column `key`.
    pub fn diff(&self, new: &Table, key: &str) -> DiffResult {
        let old_rows = key_rows(self, key);
        let new_rows = key_rows(new, key);

        let mut result = DiffResult::default();
        for (value, row) in &new_rows {
            if !old_rows.contains_key(value) {
                result.added.push((*row).to_owned());
            }
        }
        for (value, row) in &old_rows {
            if !new_rows.contains_key(value) {
                result.removed.push((*row).to_owned());
            }
        }

        for (value, old_row) in &old_rows {
            let new_row = match new_rows.get(value) {
                Some(row) => *row,
                None => continue,
            };
            let mut changes = Vec::<CellChange>::new();
            for (index, column) in self.headers().iter().enumerate() {
                if column == key {
                    continue;
                }
                let old_raw = old_row.raw(index);
                let new_raw = new
                    .column_index(column)
                    .map(|index| new_row.raw(index))
                    .unwrap_or("");
                if old_raw != new_raw {
                    changes.push(CellChange {
                        column: column.to_owned(),
                        old_raw: old_raw.to_owned(),
                        new_raw: new_raw.to_owned(),
                    });
                }
            }
            if !changes.is_empty() {
                result.modified.push(RowChange {
                    key: value.to_owned(),
                    old: (*old_row).to_owned(),
                    new: new_row.to_owned(),
                    changes,
                });
            }
        }
        result
    }
}

/// Indexes rows by the raw text of the key column; later rows overwrite
/// earlier ones with the same key, keeping the first position.
fn key_rows<'a>(table: &'a Table, key: &str) -> IndexMap<String, &'a Row> {
    let index = table.column_index(key);
    let mut rows = IndexMap::<String, &Row>::new();
    for row in table.rows() {
        let value = index.map(|index| row.raw(index)).unwrap_or("").to_owned();
        rows.insert(value, row);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Cell;
    use crate::model::CellKind;
    use crate::model::CellValue;

    fn cell(row: usize, col: usize, text: &str) -> Cell {
        Cell::new(row, col, CellValue::Text(text.to_owned()), text.to_owned())
    }

    fn table(headers: &[&str], data: &[&[&str]]) -> Table {
        let rows: Vec<Row> = data
            .iter()
            .enumerate()
            .map(|(row, values)| {
                Row::new(
                    values
                        .iter()
                        .enumerate()
                        .map(|(col, value)| cell(row + 1, col, value))
                        .collect(),
                )
            })
            .collect();
        Table::new(
            "T".to_owned(),
            "S".to_owned(),
            0,
            0,
            data.len(),
            0,
            headers.len().saturating_sub(1),
            headers.iter().map(|h| (*h).to_owned()).collect(),
            vec![CellKind::Text; headers.len()],
            rows,
        )
    }

    #[test]
    fn added_and_removed_by_key() {
        let old = table(&["ID", "Name"], &[&["1", "Alice"], &["2", "Bob"]]);
        let new = table(&["ID", "Name"], &[&["1", "Alice"], &["3", "Charlie"]]);

        let result = old.diff(&new, "ID");
        assert_eq!(result.added.len(), 1);
        assert_eq!(result.added[0].raw(1), "Charlie");
        assert_eq!(result.removed.len(), 1);
        assert_eq!(result.removed[0].raw(1), "Bob");
        assert!(result.modified.is_empty());
    }

    #[test]
    fn modified_rows_list_changed_columns_in_old_order() {
        let old = table(
            &["ID", "Name", "City"],
            &[&["1", "Alice", "Oslo"], &["2", "Bob", "Lima"]],
        );
        let new = table(
            &["ID", "Name", "City"],
            &[&["1", "Alice", "Bergen"], &["2", "Bob", "Lima"]],
        );

        let result = old.diff(&new, "ID");
        assert!(result.added.is_empty());
        assert!(result.removed.is_empty());
        assert_eq!(result.modified.len(), 1);
        let change = &result.modified[0];
        assert_eq!(change.key, "1");
        assert_eq!(
            change.changes,
            vec![CellChange {
                column: "City".to_owned(),
                old_raw: "Oslo".to_owned(),
                new_raw: "Bergen".to_owned(),
            }]
        );
    }

    #[test]
    fn diff_ignores_new_only_columns() {
        let old = table(&["ID", "Name"], &[&["1", "Alice"]]);
        let new = table(&["ID", "Name", "Email"], &[&["1", "Alice", "a@x.io"]]);

        // The extra "Email" column never shows up: only old headers are read
        let result = old.diff(&new, "ID");
        assert!(result.is_unchanged());
    }

    #[test]
    fn later_key_collisions_overwrite_earlier_rows() {
        let old = table(&["ID", "Name"], &[&["1", "First"], &["1", "Second"]]);
        let new = table(&["ID", "Name"], &[&["1", "Second"]]);

        let result = old.diff(&new, "ID");
        assert!(result.is_unchanged());
    }

    #[test]
    fn column_missing_in_new_reads_as_empty() {
        let old = table(&["ID", "Name"], &[&["1", "Alice"]]);
        let new = table(&["ID"], &[&["1"]]);

        let result = old.diff(&new, "ID");
        assert_eq!(result.modified.len(), 1);
        assert_eq!(result.modified[0].changes[0].new_raw, "");
    }
}
