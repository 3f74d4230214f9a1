//! # Table detector
//!
//! Partitions the occupied region of a grid into disjoint rectangles of
//! dense cells, picks a header row for each by score, names the columns, and
//! extracts the body rows. Rectangles that never reach the header threshold,
//! or that keep too few data rows below the chosen header, are skipped with
//! a warning; detection never fails a sheet.

pub(crate) mod config;

pub use config::DetectConfig;

use crate::error::SheetScanError;
use crate::model::Cell;
use crate::model::CellKind;
use crate::model::Grid;
use crate::model::Row;
use crate::model::Table;
use crate::spreadsheet::reference::index_to_reference;
use std::collections::HashSet;

/// A candidate rectangle: a vertical band crossed with a contiguous column
/// range, trimmed to the rows that actually hold data in that range.
#[derive(Copy, Clone, Debug)]
struct Rectangle {
    start_row: usize,
    end_row: usize,
    start_col: usize,
    end_col: usize,
}

impl Rectangle {
    fn location(&self) -> String {
        format!(
            "{}:{}",
            index_to_reference(self.start_row, self.start_col),
            index_to_reference(self.end_row, self.end_col)
        )
    }
}

/// Detects every table on the grid, ordered by (start_row, start_col) and
/// named `<SheetName>_Table<k>` with k starting at 1.
pub fn detect_tables(
    grid: &Grid,
    sheet_name: &str,
    config: &DetectConfig,
) -> (Vec<Table>, Vec<SheetScanError>) {
    let mut tables = Vec::<Table>::new();
    let mut warnings = Vec::<SheetScanError>::new();
    let (max_row, max_col) = match grid.max_row().zip(grid.max_col()) {
        Some(bounds) => bounds,
        None => return (tables, warnings),
    };

    let mut rectangles = Vec::<Rectangle>::new();
    for (band_start, band_end) in vertical_bands(grid, max_row, max_col, config) {
        for (start_col, end_col) in column_ranges(grid, band_start, band_end, max_col, config) {
            if end_col - start_col + 1 < config.min_columns {
                continue;
            }
            if let Some(rectangle) =
                trim_rectangle(grid, band_start, band_end, start_col, end_col, config)
            {
                rectangles.push(rectangle);
            }
        }
    }
    rectangles.sort_by_key(|rectangle| (rectangle.start_row, rectangle.start_col));

    for rectangle in rectangles {
        match build_table(grid, sheet_name, rectangle, tables.len() + 1, config) {
            Ok(table) => tables.push(table),
            Err(warning) => warnings.push(warning),
        }
    }
    log::debug!(
        "{}: detected {} table(s), {} warning(s)",
        sheet_name,
        tables.len(),
        warnings.len()
    );
    (tables, warnings)
}

/// Walks rows top to bottom, accumulating runs of present rows. A row is
/// present when it has at least `min_columns` non-empty cells; a run closes
/// after `max_empty_rows` consecutive non-present rows.
fn vertical_bands(
    grid: &Grid,
    max_row: usize,
    max_col: usize,
    config: &DetectConfig,
) -> Vec<(usize, usize)> {
    let mut bands = Vec::<(usize, usize)>::new();
    let mut run_start = None::<usize>;
    let mut last_present = 0usize;
    let mut empty_streak = 0usize;
    for row in 0..=max_row {
        let present = grid.occupied_in_row(row, 0, max_col) >= config.min_columns;
        if present {
            if run_start.is_none() {
                run_start = Some(row);
            }
            last_present = row;
            empty_streak = 0;
        } else if let Some(start) = run_start {
            empty_streak += 1;
            if empty_streak >= config.max_empty_rows {
                bands.push((start, last_present));
                run_start = None;
                empty_streak = 0;
            }
        }
    }
    if let Some(start) = run_start {
        bands.push((start, last_present));
    }
    bands
}

/// Splits the band's occupied columns into maximal contiguous ranges; a gap
/// wider than `max_empty_cols` separates side-by-side rectangles.
fn column_ranges(
    grid: &Grid,
    band_start: usize,
    band_end: usize,
    max_col: usize,
    config: &DetectConfig,
) -> Vec<(usize, usize)> {
    let mut occupied = vec![false; max_col + 1];
    for row in band_start..=band_end {
        for (col, slot) in occupied.iter_mut().enumerate() {
            if !*slot && !grid.is_empty_at(row, col) {
                *slot = true;
            }
        }
    }

    let mut ranges = Vec::<(usize, usize)>::new();
    let mut start = None::<usize>;
    let mut last = 0usize;
    for (col, _) in occupied.iter().enumerate().filter(|(_, slot)| **slot) {
        match start {
            None => start = Some(col),
            Some(first) => {
                if col - last - 1 > config.max_empty_cols {
                    ranges.push((first, last));
                    start = Some(col);
                }
            }
        }
        last = col;
    }
    if let Some(first) = start {
        ranges.push((first, last));
    }
    ranges
}

/// Trims the band vertically to the rows with data inside the column range
/// and applies the data-row count gate.
fn trim_rectangle(
    grid: &Grid,
    band_start: usize,
    band_end: usize,
    start_col: usize,
    end_col: usize,
    config: &DetectConfig,
) -> Option<Rectangle> {
    let mut rows_with_data = (band_start..=band_end)
        .filter(|row| grid.occupied_in_row(*row, start_col, end_col) > 0);
    let start_row = rows_with_data.next()?;
    let end_row = rows_with_data.last().unwrap_or(start_row);
    let populated = (start_row..=end_row)
        .filter(|row| grid.occupied_in_row(*row, start_col, end_col) > 0)
        .count();
    if populated < config.min_rows {
        return None;
    }
    Some(Rectangle {
        start_row,
        end_row,
        start_col,
        end_col,
    })
}

/// Header score of one row: density plus half the text fraction minus a
/// quarter of the numeric fraction.
fn header_score(grid: &Grid, row: usize, rectangle: &Rectangle) -> f64 {
    let width = rectangle.end_col - rectangle.start_col + 1;
    let mut filled = 0usize;
    let mut text = 0usize;
    let mut numeric = 0usize;
    for col in rectangle.start_col..=rectangle.end_col {
        match grid.get(row, col).map(Cell::kind) {
            None | Some(CellKind::Empty) => (),
            Some(CellKind::Text) => {
                filled += 1;
                text += 1;
            }
            Some(CellKind::Number) => {
                filled += 1;
                numeric += 1;
            }
            Some(_) => filled += 1,
        }
    }
    if filled == 0 {
        return 0.0;
    }
    let density = filled as f64 / width as f64;
    let text_fraction = text as f64 / filled as f64;
    let numeric_fraction = numeric as f64 / filled as f64;
    density + 0.5 * text_fraction - 0.25 * numeric_fraction
}

/// Number of rows at the top of a rectangle considered as header candidates.
const HEADER_SCAN_ROWS: usize = 4;

fn build_table(
    grid: &Grid,
    sheet_name: &str,
    rectangle: Rectangle,
    ordinal: usize,
    config: &DetectConfig,
) -> Result<Table, SheetScanError> {
    // Header selection: best score wins, ties break to the topmost row
    let scan_end = rectangle
        .end_row
        .min(rectangle.start_row + HEADER_SCAN_ROWS - 1);
    let mut best = None::<(usize, f64)>;
    for row in rectangle.start_row..=scan_end {
        let score = header_score(grid, row, &rectangle);
        if score >= config.header_density && best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((row, score));
        }
    }
    let header_row = match best {
        Some((row, _)) => row,
        None => {
            return Err(SheetScanError::AmbiguousHeader {
                sheet: sheet_name.to_owned(),
                location: rectangle.location(),
            })
        }
    };
    let data_rows = rectangle.end_row - header_row;
    if data_rows < config.min_rows {
        return Err(SheetScanError::UnusableRectangle {
            sheet: sheet_name.to_owned(),
            location: rectangle.location(),
            message: format!("only {} data row(s) below the header", data_rows),
        });
    }

    let headers = name_columns(grid, header_row, &rectangle);

    // Body extraction: every row after the header, empty cells preserved
    let mut rows = Vec::<Row>::new();
    for row in (header_row + 1)..=rectangle.end_row {
        let cells: Vec<Cell> = (rectangle.start_col..=rectangle.end_col)
            .map(|col| {
                grid.get(row, col)
                    .cloned()
                    .unwrap_or_else(|| Cell::empty(row, col))
            })
            .collect();
        rows.push(Row::new(cells));
    }

    let column_kinds = column_kinds(&rows, headers.len(), config);
    Ok(Table::new(
        format!("{}_Table{}", sheet_name, ordinal),
        sheet_name.to_owned(),
        rectangle.start_row,
        header_row,
        rectangle.end_row,
        rectangle.start_col,
        rectangle.end_col,
        headers,
        column_kinds,
        rows,
    ))
}

/// Names columns from the header row. Empty header cells become
/// `Column_<N>` (1-based offset); duplicates get `_2`, `_3`, ... suffixes in
/// left-to-right order.
fn name_columns(grid: &Grid, header_row: usize, rectangle: &Rectangle) -> Vec<String> {
    let mut used = HashSet::<String>::new();
    let mut headers = Vec::<String>::new();
    for (offset, col) in (rectangle.start_col..=rectangle.end_col).enumerate() {
        let base = grid
            .get(header_row, col)
            .map(|cell| cell.raw.trim().to_owned())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| format!("Column_{}", offset + 1));
        let name = if used.contains(&base) {
            let mut suffix = 2usize;
            while used.contains(&format!("{base}_{suffix}")) {
                suffix += 1;
            }
            format!("{base}_{suffix}")
        } else {
            base
        };
        used.insert(name.to_owned());
        headers.push(name);
    }
    headers
}

/// Dominant kind per column; demoted to Text when the dominant fraction
/// among non-empty cells falls below the consistency threshold.
fn column_kinds(rows: &[Row], columns: usize, config: &DetectConfig) -> Vec<CellKind> {
    // Tie-break order mirrors column inference: Text > Number > Date > Bool
    const ORDER: [CellKind; 5] = [
        CellKind::Text,
        CellKind::Number,
        CellKind::Date,
        CellKind::Bool,
        CellKind::Formula,
    ];
    (0..columns)
        .map(|column| {
            let mut counts = [0usize; 5];
            let mut filled = 0usize;
            for row in rows {
                if let Some(cell) = row.get(column) {
                    if let Some(slot) = ORDER.iter().position(|kind| *kind == cell.kind()) {
                        counts[slot] += 1;
                        filled += 1;
                    }
                }
            }
            if filled == 0 {
                return CellKind::Empty;
            }
            let mut slot = 0usize;
            for (index, count) in counts.iter().enumerate() {
                if *count > counts[slot] {
                    slot = index;
                }
            }
            if (counts[slot] as f64) / (filled as f64) < config.column_consistency {
                CellKind::Text
            } else {
                ORDER[slot]
            }
        })
        .collect()
}
