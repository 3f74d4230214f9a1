//! # Typed data model
//!
//! The immutable core the rest of the crate operates on: typed cells, the
//! sparse sheet grid, detected tables with header-addressable rows, and the
//! workbook/sheet containers. Cells and grids are created by the reader
//! adapter and never mutated afterwards; tables are created by the detector,
//! and every algebra operation returns a new table.

pub(crate) mod cell;
pub(crate) mod column;
pub(crate) mod grid;
pub(crate) mod table;
pub(crate) mod workbook;

pub use cell::Cell;
pub use cell::CellKind;
pub use cell::CellValue;
pub use cell::MergeInfo;
pub use column::ColumnStats;
pub use column::NumericStats;
pub use grid::Grid;
pub use table::Row;
pub use table::RowView;
pub use table::Table;
pub use workbook::Sheet;
pub use workbook::Workbook;
