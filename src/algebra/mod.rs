//! # Table algebra
//!
//! Pure, composable transformations over detected tables. Every operation
//! returns a new table and leaves its input untouched, so pipelines compose
//! without aliasing hazards. Lookup failures never raise: unknown columns are
//! silently dropped or treated as empty, exactly as documented per operation.

pub(crate) mod diff;
pub(crate) mod group;

pub use diff::CellChange;
pub use diff::DiffResult;
pub use diff::RowChange;
pub use group::Aggregation;
pub use group::AggregateOp;
pub use group::GroupedTable;

use crate::model::CellKind;
use crate::model::Row;
use crate::model::RowView;
use crate::model::Table;
use indexmap::IndexMap;

/// Rows that share one value of the deduplication key.
#[derive(Clone, Debug)]
pub struct DuplicateGroup {
    /// Raw text of the key column for this class
    pub value: String,
    /// All rows of the class, in table order
    pub rows: Vec<Row>,
    pub count: usize,
}

impl Table {
    /// Retains the rows the predicate accepts, preserving order.
    pub fn filter<P>(&self, predicate: P) -> Table
    where
        P: Fn(&RowView<'_>) -> bool,
    {
        let rows = self
            .rows()
            .iter()
            .filter(|row| predicate(&self.view(row)))
            .cloned()
            .collect();
        self.derived(self.headers().to_vec(), self.column_kinds().to_vec(), rows)
    }

    /// Keeps only the named columns, in the order given. Unknown names are
    /// silently dropped; repeated names keep their first mention. An empty
    /// selection yields a zero-column table with the same number of rows.
    pub fn select(&self, columns: &[&str]) -> Table {
        let mut indexes = Vec::<usize>::new();
        for column in columns {
            if let Some(index) = self.column_index(column) {
                if !indexes.contains(&index) {
                    indexes.push(index);
                }
            }
        }
        self.project(&indexes)
    }

    /// Renames columns through an old-name to new-name mapping. Unknown keys
    /// are ignored. When renaming makes two columns collide, the later column
    /// wins and the earlier one is dropped.
    pub fn rename(&self, renames: &[(&str, &str)]) -> Table {
        let mapping: IndexMap<&str, &str> = renames.iter().copied().collect();
        let new_names: Vec<String> = self
            .headers()
            .iter()
            .map(|header| {
                mapping
                    .get(header.as_str())
                    .map(|name| (*name).to_owned())
                    .unwrap_or_else(|| header.to_owned())
            })
            .collect();

        // A column survives only when no later column takes the same name
        let survivors: Vec<usize> = (0..new_names.len())
            .filter(|index| {
                new_names[index + 1..]
                    .iter()
                    .all(|name| name != &new_names[*index])
            })
            .collect();

        let headers: Vec<String> = survivors
            .iter()
            .map(|index| new_names[*index].to_owned())
            .collect();
        let column_kinds: Vec<CellKind> = survivors
            .iter()
            .map(|index| self.column_kinds().get(*index).copied().unwrap_or_default())
            .collect();
        let rows: Vec<Row> = self
            .rows()
            .iter()
            .map(|row| {
                Row::new(
                    survivors
                        .iter()
                        .filter_map(|index| row.get(*index).cloned())
                        .collect(),
                )
            })
            .collect();
        self.derived(headers, column_kinds, rows)
    }

    /// Puts the named columns in the given order, dropping the rest.
    /// `reorder(headers)` with every column listed is the identity.
    pub fn reorder(&self, columns: &[&str]) -> Table {
        self.select(columns)
    }

    /// Keeps the first row of every distinct raw value of `key`. Rows without
    /// the key column form one class, so a missing key keeps only the first
    /// row.
    pub fn deduplicate(&self, key: &str) -> Table {
        let index = self.column_index(key);
        let mut seen = std::collections::HashSet::<&str>::new();
        let rows: Vec<Row> = self
            .rows()
            .iter()
            .filter(|row| seen.insert(index.map(|index| row.raw(index)).unwrap_or("")))
            .cloned()
            .collect();
        self.derived(self.headers().to_vec(), self.column_kinds().to_vec(), rows)
    }

    /// Returns the second-and-later rows of every duplicate class, in table
    /// order.
    pub fn find_duplicates(&self, key: &str) -> Vec<Row> {
        let index = self.column_index(key);
        let mut seen = std::collections::HashSet::<&str>::new();
        self.rows()
            .iter()
            .filter(|row| !seen.insert(index.map(|index| row.raw(index)).unwrap_or("")))
            .cloned()
            .collect()
    }

    /// Returns every class of size two or more, in order of first occurrence.
    pub fn find_duplicate_groups(&self, key: &str) -> Vec<DuplicateGroup> {
        let index = self.column_index(key);
        let mut classes = IndexMap::<String, Vec<Row>>::new();
        for row in self.rows() {
            let value = index.map(|index| row.raw(index)).unwrap_or("").to_owned();
            classes.entry(value).or_default().push(row.to_owned());
        }
        classes
            .into_iter()
            .filter(|(_, rows)| rows.len() >= 2)
            .map(|(value, rows)| DuplicateGroup {
                value,
                count: rows.len(),
                rows,
            })
            .collect()
    }

    /// Projection onto a list of column indexes, shared by select/reorder.
    fn project(&self, indexes: &[usize]) -> Table {
        let headers: Vec<String> = indexes
            .iter()
            .map(|index| self.headers()[*index].to_owned())
            .collect();
        let column_kinds: Vec<CellKind> = indexes
            .iter()
            .map(|index| self.column_kinds().get(*index).copied().unwrap_or_default())
            .collect();
        let rows: Vec<Row> = self
            .rows()
            .iter()
            .map(|row| {
                Row::new(
                    indexes
                        .iter()
                        .filter_map(|index| row.get(*index).cloned())
                        .collect(),
                )
            })
            .collect();
        self.derived(headers, column_kinds, rows)
    }
}
