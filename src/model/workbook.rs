use crate::error::SheetScanError;
use crate::model::table::Table;
use std::path::PathBuf;

/// One worksheet's detection result: its tables in document order plus the
/// recoverable problems encountered while reading or detecting.
#[derive(Debug)]
pub struct Sheet {
    pub name: String,
    /// Position of the sheet in the workbook (0-based)
    pub index: usize,
    pub tables: Vec<Table>,
    /// Recoverable failures collected while reading; the sheet is still produced
    pub warnings: Vec<SheetScanError>,
}

impl Sheet {
    /// Finds a detected table by its emitted name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name() == name)
    }
}

/// The extraction result for a whole workbook file.
#[derive(Debug)]
pub struct Workbook {
    pub source_path: PathBuf,
    /// Sheets in document order (parallel mode reassembles this order)
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }

    /// All detected tables across sheets, in document order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.sheets.iter().flat_map(|sheet| sheet.tables.iter())
    }
}
