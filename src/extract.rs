//! # Extraction entry point
//!
//! Opens a workbook, reads the selected sheets into grids, and runs table
//! detection over them, either sequentially or with one worker per sheet.
//! Both modes produce identical output: workers deliver results tagged with
//! the sheet index and the assembler restores document order. A cancellation
//! token is checked between sheets; the in-flight sheet always finishes.

use crate::detect::detect_tables;
use crate::detect::DetectConfig;
use crate::error::ResultMessage;
use crate::error::SheetScanError;
use crate::model::Cell;
use crate::model::Grid;
use crate::model::Row;
use crate::model::Sheet;
use crate::model::Table;
use crate::model::Workbook;
use crate::reader::read_grid;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::XlsxWorkbook;
use chrono::FixedOffset;
use glob::Pattern;
use rayon::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Cooperative cancellation flag shared between the caller and the workers.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Behavior of [`extract_workbook`].
#[derive(Clone, Debug, Default)]
pub struct ExtractOptions {
    pub detect: DetectConfig,
    /// Only sheets matching one of these patterns are processed
    pub sheet_name_patterns: Option<Vec<Pattern>>,
    /// Stop after this many selected sheets
    pub sheet_limit: Option<usize>,
    /// Detect each sheet on its own worker
    pub parallel: bool,
    pub cancel: CancelToken,
    /// Zone attached to date cells; UTC when absent
    pub timezone: Option<FixedOffset>,
}

impl ExtractOptions {
    /// Checks whether a sheet name passes the configured patterns.
    fn accept(&self, sheet_name: &str) -> bool {
        if let Some(patterns) = &self.sheet_name_patterns {
            patterns.iter().any(|pattern| pattern.matches(sheet_name))
        } else {
            true
        }
    }
}

/// Opens the workbook at `path` and detects tables on every selected sheet.
pub fn extract_workbook<P: AsRef<Path>>(
    path: P,
    options: &ExtractOptions,
) -> Result<Workbook, SheetScanError> {
    let mut workbook = XlsxWorkbook::open(&path)?;
    let sheets = extract_sheets(&mut workbook, options)
        .with_prefix(path.as_ref().to_string_lossy().as_ref())?;
    Ok(Workbook {
        source_path: path.as_ref().to_path_buf(),
        sheets,
    })
}

/// Detects tables on every selected sheet of an already opened workbook.
/// Useful when the archive lives in memory rather than on disk.
pub fn extract_sheets<RS: Read + Seek>(
    workbook: &mut XlsxWorkbook<RS>,
    options: &ExtractOptions,
) -> Result<Vec<Sheet>, SheetScanError> {
    let selected: Vec<(usize, String)> = workbook
        .sheet_names()
        .into_iter()
        .enumerate()
        .filter(|(_, name)| options.accept(name))
        .take(options.sheet_limit.unwrap_or(usize::MAX))
        .collect();

    // The archive is the single blocking resource, so grids are read up
    // front; detection then runs without touching the parser again.
    let mut grids = Vec::<(usize, String, Grid, Vec<SheetScanError>)>::new();
    for (index, name) in selected {
        if options.cancel.is_canceled() {
            return Err(SheetScanError::Canceled);
        }
        match read_grid(workbook, index, &options.detect, options.timezone) {
            Ok((grid, warnings)) => grids.push((index, name, grid, warnings)),
            Err(SheetScanError::Canceled) => return Err(SheetScanError::Canceled),
            Err(error) => {
                // Local failure: the sheet is produced empty with the error
                // attached, and the remaining sheets proceed
                log::warn!("{}: {}", name, error);
                grids.push((index, name, Grid::new(), vec![error]));
            }
        }
    }

    let detect_one = |(index, name, grid, mut warnings): (usize, String, Grid, Vec<SheetScanError>)|
     -> Result<Sheet, SheetScanError> {
        if options.cancel.is_canceled() {
            return Err(SheetScanError::Canceled);
        }
        let (tables, mut detect_warnings) = detect_tables(&grid, &name, &options.detect);
        warnings.append(&mut detect_warnings);
        Ok(Sheet {
            name,
            index,
            tables,
            warnings,
        })
    };

    let mut sheets = if options.parallel {
        grids
            .into_par_iter()
            .map(detect_one)
            .collect::<Result<Vec<Sheet>, SheetScanError>>()?
    } else {
        grids
            .into_iter()
            .map(detect_one)
            .collect::<Result<Vec<Sheet>, SheetScanError>>()?
    };
    // Workers are index-tagged; assembly restores document order
    sheets.sort_by_key(|sheet| sheet.index);
    Ok(sheets)
}

/// A parsed `Sheet!$A$1:$D$10` reference.
struct RangeRef {
    sheet: Option<String>,
    start: (usize, usize),
    end: (usize, usize),
}

fn parse_range_ref(text: &str) -> Option<RangeRef> {
    let pattern = Regex::new(
        r"^(?:(?:'([^']+)'|([^'!]+))!)?(\$?[A-Za-z]{1,3}\$?[0-9]+)(?::(\$?[A-Za-z]{1,3}\$?[0-9]+))?$",
    )
    .expect("Hardcode regex pattern");
    let captures = pattern.captures(text.trim())?;
    let sheet = captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|matched| matched.as_str().to_owned());
    let start = reference_to_index(captures.get(3)?.as_str())?;
    let end = match captures.get(4) {
        Some(matched) => reference_to_index(matched.as_str())?,
        None => start,
    };
    Some(RangeRef { sheet, start, end })
}

/// Resolves a defined name against the workbook and materializes the
/// referenced rectangle as a table: its first row supplies the headers, the
/// remaining rows become the body. No detection heuristics are involved.
/// Returns None when the name does not exist or its reference is unusable.
pub fn extract_named_range<P: AsRef<Path>>(
    path: P,
    name: &str,
    options: &ExtractOptions,
) -> Result<Option<Table>, SheetScanError> {
    let mut workbook = XlsxWorkbook::open(&path)?;
    let named = match workbook
        .named_ranges()
        .iter()
        .find(|named| named.name == name)
    {
        Some(named) => named.to_owned(),
        None => return Ok(None),
    };
    let range = match parse_range_ref(&named.refers_to) {
        Some(range) => range,
        None => {
            log::warn!("named range '{}' has an unusable reference: {}", name, named.refers_to);
            return Ok(None);
        }
    };
    let sheet_name = match range.sheet.or(named.scope) {
        Some(sheet) => sheet,
        None => return Ok(None),
    };
    let index = workbook
        .sheet_names()
        .iter()
        .position(|candidate| candidate == &sheet_name)
        .ok_or_else(|| SheetScanError::SheetNotFound(sheet_name.to_owned()))?;

    let (grid, _) = read_grid(&mut workbook, index, &options.detect, options.timezone)?;
    let (start_row, start_col) = range.start;
    let (end_row, end_col) = range.end;
    if end_row < start_row || end_col < start_col {
        return Ok(None);
    }

    let mut used = HashSet::<String>::new();
    let headers: Vec<String> = (start_col..=end_col)
        .enumerate()
        .map(|(offset, col)| {
            let base = grid
                .get(start_row, col)
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
            name
        })
        .collect();

    let rows: Vec<Row> = ((start_row + 1)..=end_row)
        .map(|row| {
            Row::new(
                (start_col..=end_col)
                    .map(|col| {
                        grid.get(row, col)
                            .cloned()
                            .unwrap_or_else(|| Cell::empty(row, col))
                    })
                    .collect(),
            )
        })
        .collect();

    let column_kinds = vec![Default::default(); headers.len()];
    Ok(Some(Table::new(
        name.to_owned(),
        sheet_name,
        start_row,
        start_row,
        end_row,
        start_col,
        end_col,
        headers,
        column_kinds,
        rows,
    )))
}
