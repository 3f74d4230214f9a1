//! # Sheet reader adapter
//!
//! Pulls raw cells from the parser into a densified [`Grid`]: classifies each
//! cell into a typed kind, converts date-formatted serials, resolves shared
//! strings, attaches comments and hyperlinks, and applies the merge policy.
//! Problems are recorded as warnings; the adapter never aborts a sheet.

pub(crate) mod dates;

use crate::detect::config::DetectConfig;
use crate::error::SheetScanError;
use crate::model::Cell;
use crate::model::CellValue;
use crate::model::Grid;
use crate::model::MergeInfo;
use crate::reader::dates::is_date_format;
use crate::reader::dates::serial_to_datetime;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::RawCell;
use crate::spreadsheet::RawCellType;
use crate::spreadsheet::RawSheet;
use crate::spreadsheet::XlsxWorkbook;
use chrono::DateTime;
use chrono::FixedOffset;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use std::io::Read;
use std::io::Seek;

/// Reads one worksheet into a grid. Returns the grid plus the local warnings
/// gathered along the way (invalid addresses, malformed merges, serial 60).
pub(crate) fn read_grid<RS: Read + Seek>(
    workbook: &mut XlsxWorkbook<RS>,
    index: usize,
    config: &DetectConfig,
    timezone: Option<FixedOffset>,
) -> Result<(Grid, Vec<SheetScanError>), SheetScanError> {
    let raw = workbook.read_sheet(index)?;
    let is_1904 = workbook.is_1904();
    let mut warnings = Vec::<SheetScanError>::new();

    for address in &raw.invalid_addresses {
        warnings.push(SheetScanError::InvalidAddress {
            sheet: raw.name.to_owned(),
            address: address.to_owned(),
        });
    }

    let mut grid = Grid::new();
    for cell in &raw.cells {
        grid.insert(classify_cell(cell, workbook, is_1904, timezone, &raw.name, &mut warnings));
    }

    attach_annotations(&mut grid, &raw);
    apply_merges(&mut grid, &raw, config, &mut warnings);

    for warning in &warnings {
        log::warn!("{}: {}", raw.name, warning);
    }
    Ok((grid, warnings))
}

/// Classifies one raw cell into a typed cell, following the rule order:
/// boolean tag, formula, shared string, date-formatted number, number, empty.
fn classify_cell<RS: Read + Seek>(
    raw: &RawCell,
    workbook: &XlsxWorkbook<RS>,
    is_1904: bool,
    timezone: Option<FixedOffset>,
    sheet: &str,
    warnings: &mut Vec<SheetScanError>,
) -> Cell {
    let (value, text) = if raw.kind == RawCellType::Boolean {
        let truthy = raw.value == "1" || raw.value.eq_ignore_ascii_case("true");
        (CellValue::Bool(truthy), raw.value.to_owned())
    } else if let Some(source) = &raw.formula {
        let (cached, text) = classify_scalar(raw, workbook, is_1904, timezone, sheet, warnings);
        (
            CellValue::Formula {
                source: source.to_owned(),
                cached: Box::new(cached),
            },
            text,
        )
    } else {
        classify_scalar(raw, workbook, is_1904, timezone, sheet, warnings)
    };

    let mut cell = Cell::new(raw.row, raw.col, value, text);
    if cell.is_empty() {
        // Kind Empty requires an empty raw form
        cell.raw.clear();
    }
    cell
}

/// Applies the non-boolean, non-formula classification rules and returns the
/// typed value together with the raw textual form to keep on the cell.
fn classify_scalar<RS: Read + Seek>(
    raw: &RawCell,
    workbook: &XlsxWorkbook<RS>,
    is_1904: bool,
    timezone: Option<FixedOffset>,
    sheet: &str,
    warnings: &mut Vec<SheetScanError>,
) -> (CellValue, String) {
    match raw.kind {
        RawCellType::SharedString => {
            let resolved = raw
                .value
                .parse::<usize>()
                .ok()
                .and_then(|index| workbook.shared_string(index))
                .unwrap_or(raw.value.as_str())
                .to_owned();
            if resolved.is_empty() {
                (CellValue::Empty, String::new())
            } else {
                (CellValue::Text(resolved.to_owned()), resolved)
            }
        }
        RawCellType::InlineString | RawCellType::FormulaString | RawCellType::Error => {
            if raw.value.is_empty() {
                (CellValue::Empty, String::new())
            } else {
                (CellValue::Text(raw.value.to_owned()), raw.value.to_owned())
            }
        }
        RawCellType::IsoDateTime => match parse_iso_datetime(&raw.value) {
            Some(instant) => (
                CellValue::Date(attach_zone(instant, timezone)),
                raw.value.to_owned(),
            ),
            None => (CellValue::Text(raw.value.to_owned()), raw.value.to_owned()),
        },
        RawCellType::Number => {
            if raw.value.is_empty() {
                return (CellValue::Empty, String::new());
            }
            let number = match raw.value.trim().parse::<f64>() {
                Ok(number) => number,
                // Numeric tag with a non-numeric lexeme: keep the text
                Err(_) => return (CellValue::Text(raw.value.to_owned()), raw.value.to_owned()),
            };
            let is_date = raw
                .style
                .and_then(|style| workbook.number_format(style))
                .map(is_date_format)
                .unwrap_or(false);
            if is_date {
                match serial_to_datetime(number, is_1904) {
                    Some(instant) => (
                        CellValue::Date(attach_zone(instant, timezone)),
                        raw.value.to_owned(),
                    ),
                    None => {
                        if !is_1904 && number.trunc() == 60.0 {
                            warnings.push(SheetScanError::UnsupportedDateSerial60 {
                                sheet: sheet.to_owned(),
                                location: index_to_reference(raw.row, raw.col),
                            });
                        }
                        (CellValue::Number(number), raw.value.to_owned())
                    }
                }
            } else {
                (CellValue::Number(number), raw.value.to_owned())
            }
        }
        RawCellType::Boolean => {
            // Handled before formulas in classify_cell
            let truthy = raw.value == "1" || raw.value.eq_ignore_ascii_case("true");
            (CellValue::Bool(truthy), raw.value.to_owned())
        }
    }
}

/// Attaches the wall-clock reading to the caller's zone, UTC by default.
fn attach_zone(instant: NaiveDateTime, timezone: Option<FixedOffset>) -> DateTime<FixedOffset> {
    let offset = timezone.unwrap_or_else(|| FixedOffset::east_opt(0).expect("Hardcode UTC offset"));
    instant
        .and_local_timezone(offset)
        .single()
        .expect("Fixed offsets are unambiguous")
}

/// Parses the `d` cell type's ISO 8601 payload, date-only or datetime.
fn parse_iso_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// Copies comment and hyperlink annotations onto their cells, materializing
/// empty cells for annotations on positions without a value.
fn attach_annotations(grid: &mut Grid, raw: &RawSheet) {
    for (&(row, col), comment) in &raw.comments {
        if grid.get(row, col).is_none() {
            grid.insert(Cell::empty(row, col));
        }
        if let Some(cell) = grid.get_mut(row, col) {
            cell.comment = Some(comment.to_owned());
        }
    }
    for (&(row, col), target) in &raw.hyperlinks {
        if grid.get(row, col).is_none() {
            grid.insert(Cell::empty(row, col));
        }
        if let Some(cell) = grid.get_mut(row, col) {
            cell.hyperlink = Some(target.to_owned());
        }
    }
}

/// Applies the merge policy: optionally track membership on every cell of
/// each rectangle, optionally copy the origin value across it. Rectangles
/// that cannot be parsed, are inverted, or fall outside the grid's bounding
/// box are skipped with a warning.
fn apply_merges(
    grid: &mut Grid,
    raw: &RawSheet,
    config: &DetectConfig,
    warnings: &mut Vec<SheetScanError>,
) {
    if !config.track_merge_metadata && !config.expand_merged_cells {
        return;
    }
    for merge in &raw.merges {
        let (start_row, start_col, end_row, end_col) = match merge.bounds {
            Some(bounds) => bounds,
            None => {
                warnings.push(SheetScanError::MalformedMerge {
                    sheet: raw.name.to_owned(),
                    range: merge.reference.to_owned(),
                });
                continue;
            }
        };
        let inside = grid
            .max_row()
            .zip(grid.max_col())
            .map(|(max_row, max_col)| end_row <= max_row && end_col <= max_col)
            .unwrap_or(false);
        if start_row > end_row || start_col > end_col || !inside {
            warnings.push(SheetScanError::MalformedMerge {
                sheet: raw.name.to_owned(),
                range: merge.reference.to_owned(),
            });
            continue;
        }

        if config.track_merge_metadata {
            for row in start_row..=end_row {
                for col in start_col..=end_col {
                    if grid.get(row, col).is_none() {
                        grid.insert(Cell::empty(row, col));
                    }
                    if let Some(cell) = grid.get_mut(row, col) {
                        cell.merge = Some(MergeInfo {
                            origin_row: start_row,
                            origin_col: start_col,
                            end_row,
                            end_col,
                            is_origin: row == start_row && col == start_col,
                        });
                    }
                }
            }
        }

        if config.expand_merged_cells {
            let origin = grid.get(start_row, start_col).cloned();
            if let Some(origin) = origin {
                for row in start_row..=end_row {
                    for col in start_col..=end_col {
                        if row == start_row && col == start_col {
                            continue;
                        }
                        let merge_info = grid.get(row, col).and_then(|cell| cell.merge);
                        let mut copy = Cell::new(row, col, origin.value.to_owned(), origin.raw.to_owned());
                        copy.merge = merge_info;
                        grid.insert(copy);
                    }
                }
            }
        }
    }
}
