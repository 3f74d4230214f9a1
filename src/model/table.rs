use crate::model::cell::Cell;
use crate::model::cell::CellKind;
use indexmap::IndexMap;

/// A detected rectangular table over a grid.
///
/// Headers are unique after disambiguation; every row carries exactly one
/// cell per header, empty cells included. Rows are addressable positionally
/// through [`Row`] and by header name through [`RowView`]; the header-to-index
/// map lives here once, shared by all rows. Tables are never mutated: the
/// algebra operations build new ones.
#[derive(Clone, Debug)]
pub struct Table {
    name: String,
    sheet_name: String,
    start_row: usize,
    header_row: usize,
    end_row: usize,
    start_col: usize,
    end_col: usize,
    headers: Vec<String>,
    header_index: IndexMap<String, usize>,
    column_kinds: Vec<CellKind>,
    rows: Vec<Row>,
}

/// A single table row: one cell per table column, in column order.
#[derive(Clone, Debug)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    pub(crate) fn new(cells: Vec<Cell>) -> Row {
        Row { cells }
    }

    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Raw textual form of the cell at `index`, empty string when out of range.
    pub fn raw(&self, index: usize) -> &str {
        self.cells.get(index).map(|cell| cell.raw.as_str()).unwrap_or("")
    }
}

/// Read access to a row with header-name lookup resolved through the table.
#[derive(Copy, Clone)]
pub struct RowView<'a> {
    header_index: &'a IndexMap<String, usize>,
    row: &'a Row,
}

impl<'a> RowView<'a> {
    pub fn get(&self, header: &str) -> Option<&'a Cell> {
        self.header_index
            .get(header)
            .and_then(|index| self.row.get(*index))
    }

    pub fn at(&self, index: usize) -> Option<&'a Cell> {
        self.row.get(index)
    }

    /// Raw textual form of the named cell, empty string when the header is
    /// unknown.
    pub fn raw(&self, header: &str) -> &'a str {
        self.get(header).map(|cell| cell.raw.as_str()).unwrap_or("")
    }

    pub fn row(&self) -> &'a Row {
        self.row
    }
}

impl Table {
    /// Builds a table from detector output. Headers must already be unique.
    pub(crate) fn new(
        name: String,
        sheet_name: String,
        start_row: usize,
        header_row: usize,
        end_row: usize,
        start_col: usize,
        end_col: usize,
        headers: Vec<String>,
        column_kinds: Vec<CellKind>,
        rows: Vec<Row>,
    ) -> Table {
        debug_assert_eq!(headers.len(), end_col - start_col + 1);
        debug_assert!(rows.iter().all(|row| row.len() == headers.len()));
        let header_index = Self::index_headers(&headers);
        Table {
            name,
            sheet_name,
            start_row,
            header_row,
            end_row,
            start_col,
            end_col,
            headers,
            header_index,
            column_kinds,
            rows,
        }
    }

    /// Builds an algebra result sharing this table's identity and location.
    /// The column span is recomputed from the new header count; a zero-column
    /// result degenerates to `end_col == start_col`.
    pub(crate) fn derived(
        &self,
        headers: Vec<String>,
        column_kinds: Vec<CellKind>,
        rows: Vec<Row>,
    ) -> Table {
        let header_index = Self::index_headers(&headers);
        let end_col = self.start_col + headers.len().saturating_sub(1);
        Table {
            name: self.name.to_owned(),
            sheet_name: self.sheet_name.to_owned(),
            start_row: self.start_row,
            header_row: self.header_row,
            end_row: self.end_row,
            start_col: self.start_col,
            end_col,
            headers,
            header_index,
            column_kinds,
            rows,
        }
    }

    fn index_headers(headers: &[String]) -> IndexMap<String, usize> {
        headers
            .iter()
            .enumerate()
            .map(|(index, header)| (header.to_owned(), index))
            .collect()
    }

    /// Table name, `<SheetName>_Table<k>` for detected tables.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn start_row(&self) -> usize {
        self.start_row
    }

    /// Grid row the column names were taken from.
    pub fn header_row(&self) -> usize {
        self.header_row
    }

    pub fn end_row(&self) -> usize {
        self.end_row
    }

    pub fn start_col(&self) -> usize {
        self.start_col
    }

    pub fn end_col(&self) -> usize {
        self.end_col
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Per-column kinds as decided at detection time (dominant kind, demoted
    /// to Text below the consistency threshold).
    pub fn column_kinds(&self) -> &[CellKind] {
        &self.column_kinds
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.header_index.get(header).copied()
    }

    /// Header-addressable view of a row.
    pub fn view<'a>(&'a self, row: &'a Row) -> RowView<'a> {
        RowView {
            header_index: &self.header_index,
            row,
        }
    }

    pub fn views(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(|row| self.view(row))
    }

    /// Cell at a row index / header name pair.
    pub fn cell(&self, row: usize, header: &str) -> Option<&Cell> {
        let column = self.column_index(header)?;
        self.rows.get(row).and_then(|row| row.get(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cell::CellValue;

    fn text_cell(row: usize, col: usize, text: &str) -> Cell {
        Cell::new(row, col, CellValue::Text(text.to_owned()), text.to_owned())
    }

    fn sample_table() -> Table {
        Table::new(
            "Sheet1_Table1".to_owned(),
            "Sheet1".to_owned(),
            0,
            0,
            2,
            0,
            1,
            vec!["ID".to_owned(), "Name".to_owned()],
            vec![CellKind::Text, CellKind::Text],
            vec![
                Row::new(vec![text_cell(1, 0, "1"), text_cell(1, 1, "Alice")]),
                Row::new(vec![text_cell(2, 0, "2"), text_cell(2, 1, "Bob")]),
            ],
        )
    }

    #[test]
    fn header_lookup_is_shared_by_rows() {
        let table = sample_table();
        assert_eq!(table.column_index("Name"), Some(1));
        let view = table.view(&table.rows()[1]);
        assert_eq!(view.raw("Name"), "Bob");
        assert_eq!(view.raw("Missing"), "");
        assert_eq!(view.at(0).map(|cell| cell.raw.as_str()), Some("2"));
    }

    #[test]
    fn header_count_matches_column_span() {
        let table = sample_table();
        assert_eq!(table.headers().len(), table.end_col() - table.start_col() + 1);
        assert!(table.rows().iter().all(|row| row.len() == table.headers().len()));
    }

    #[test]
    fn cell_by_row_and_header() {
        let table = sample_table();
        assert_eq!(table.cell(0, "Name").map(|cell| cell.raw.as_str()), Some("Alice"));
        assert_eq!(table.cell(5, "Name"), None);
        assert_eq!(table.cell(0, "Nope"), None);
    }
}
