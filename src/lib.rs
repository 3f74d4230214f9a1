//! # sheetscan
//!
//! Recovers typed tables from OOXML workbook archives whose layout is not
//! known in advance, and offers a small relational-style query surface over
//! them.
//!
//! ## Features
//!
//! - **Table detection**: finds one or more rectangular tables per sheet in
//!   raw cell grids, picks a header row by score, and names the columns
//! - **Typed cells**: text, numbers, dates (with the Excel 1900 leap-year
//!   quirk handled), booleans, and formulas with their cached values
//! - **Merged cells**: optional value expansion and membership tracking
//! - **Table algebra**: filter, select, rename, reorder, deduplicate,
//!   group-by with aggregation, and keyed diff, all pure and composable
//! - **Column analysis**: per-column kind inference and statistics
//! - **Schema validation**: match detected shape against declared templates
//! - **Parallel extraction**: one worker per sheet with identical ordering,
//!   cooperative cancellation between sheets
//!
//! ## Example
//!
//! ```no_run
//! use sheetscan::{extract_workbook, ExtractOptions};
//!
//! let workbook = extract_workbook("report.xlsx", &ExtractOptions::default())?;
//! for sheet in &workbook.sheets {
//!     for table in &sheet.tables {
//!         println!("{}: {} rows", table.name(), table.row_count());
//!     }
//! }
//! # Ok::<(), sheetscan::SheetScanError>(())
//! ```

mod algebra;
mod detect;
mod error;
mod extract;
mod model;
mod reader;
mod spreadsheet;
mod validate;

pub use algebra::AggregateOp;
pub use algebra::Aggregation;
pub use algebra::CellChange;
pub use algebra::DiffResult;
pub use algebra::DuplicateGroup;
pub use algebra::GroupedTable;
pub use algebra::RowChange;
pub use detect::detect_tables;
pub use detect::DetectConfig;
pub use error::SheetScanError;
pub use extract::extract_named_range;
pub use extract::extract_sheets;
pub use extract::extract_workbook;
pub use extract::CancelToken;
pub use extract::ExtractOptions;
pub use model::Cell;
pub use model::CellKind;
pub use model::CellValue;
pub use model::ColumnStats;
pub use model::Grid;
pub use model::MergeInfo;
pub use model::NumericStats;
pub use model::Row;
pub use model::RowView;
pub use model::Sheet;
pub use model::Table;
pub use model::Workbook;
pub use spreadsheet::reference;
pub use spreadsheet::NamedRange;
pub use spreadsheet::XlsxWorkbook;
pub use validate::ensure_valid;
pub use validate::validate_workbook;
pub use validate::ColumnSchema;
pub use validate::CustomCheck;
pub use validate::SheetSchema;
pub use validate::TypeStrictness;
pub use validate::ValidationIssue;
pub use validate::WorkbookTemplate;
