use crate::spreadsheet::reference::index_to_reference;
use chrono::DateTime;
use chrono::FixedOffset;
use std::fmt;
use std::fmt::Display;

/// Discriminant of a cell value.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum CellKind {
    #[default]
    Empty,
    /// Textual content (shared, inline or formula-string results)
    Text,
    /// 64-bit floating point numbers
    Number,
    /// Instants recovered from date-formatted serial numbers or ISO strings
    Date,
    /// Boolean values
    Bool,
    /// Formulas, captured as source text plus the last cached value
    Formula,
}

impl CellKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Bool => "bool",
            Self::Formula => "formula",
        }
    }
}

impl Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Typed cell value; the variant always matches the cell's kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(DateTime<FixedOffset>),
    Bool(bool),
    Formula {
        /// Formula source without the leading '='
        source: String,
        /// Last value the producing application cached for the formula
        cached: Box<CellValue>,
    },
}

impl CellValue {
    /// Returns the discriminant of this value.
    pub fn kind(&self) -> CellKind {
        match self {
            Self::Empty => CellKind::Empty,
            Self::Text(_) => CellKind::Text,
            Self::Number(_) => CellKind::Number,
            Self::Date(_) => CellKind::Date,
            Self::Bool(_) => CellKind::Bool,
            Self::Formula { .. } => CellKind::Formula,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Numeric reading of the value. Formulas delegate to their cached value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(value) => value.trim().parse().ok(),
            Self::Formula { cached, .. } => cached.as_f64(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            Self::Formula { cached, .. } => cached.as_text(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Formula { cached, .. } => cached.as_bool(),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Date(value) => Some(*value),
            Self::Formula { cached, .. } => cached.as_date(),
            _ => None,
        }
    }
}

/// Placement of a cell inside a merged rectangle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MergeInfo {
    pub origin_row: usize,
    pub origin_col: usize,
    pub end_row: usize,
    pub end_col: usize,
    /// True only for the top-left cell of the rectangle
    pub is_origin: bool,
}

impl MergeInfo {
    /// Checks whether a grid position lies inside the rectangle.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.origin_row <= row && row <= self.end_row && self.origin_col <= col && col <= self.end_col
    }
}

/// A single grid cell: position, typed value, and the verbatim source lexeme.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
    /// Typed value; the variant matches the cell kind
    pub value: CellValue,
    /// Raw textual form as delivered by the parser, before coercion
    pub raw: String,
    /// Comment text attached to the cell, if any
    pub comment: Option<String>,
    /// Hyperlink target attached to the cell, if any
    pub hyperlink: Option<String>,
    /// Merge rectangle membership, when merge tracking is enabled
    pub merge: Option<MergeInfo>,
}

impl Cell {
    pub fn new(row: usize, col: usize, value: CellValue, raw: String) -> Cell {
        Cell {
            row,
            col,
            value,
            raw,
            comment: None,
            hyperlink: None,
            merge: None,
        }
    }

    /// An empty cell at the given position. Empty means: no typed value and
    /// an empty raw form.
    pub fn empty(row: usize, col: usize) -> Cell {
        Cell::new(row, col, CellValue::Empty, String::new())
    }

    pub fn kind(&self) -> CellKind {
        self.value.kind()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Excel-style reference of the cell position (e.g. "B3").
    pub fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Numeric reading used by aggregation: the typed value first, then the
    /// raw lexeme as a fallback for text cells.
    pub fn to_number(&self) -> Option<f64> {
        self.value.as_f64().or_else(|| self.raw.trim().parse().ok())
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(CellValue::Empty.kind(), CellKind::Empty);
        assert_eq!(CellValue::Text("a".to_owned()).kind(), CellKind::Text);
        assert_eq!(CellValue::Number(1.5).kind(), CellKind::Number);
        assert_eq!(CellValue::Bool(true).kind(), CellKind::Bool);
        let formula = CellValue::Formula {
            source: "B2*C2".to_owned(),
            cached: Box::new(CellValue::Number(10.0)),
        };
        assert_eq!(formula.kind(), CellKind::Formula);
        assert_eq!(formula.as_f64(), Some(10.0));
    }

    #[test]
    fn empty_cell_invariant() {
        let cell = Cell::empty(3, 4);
        assert!(cell.is_empty());
        assert!(cell.raw.is_empty());
        assert_eq!(cell.reference(), "E4");
    }

    #[test]
    fn to_number_falls_back_to_raw() {
        let cell = Cell::new(0, 0, CellValue::Text("42.5".to_owned()), "42.5".to_owned());
        assert_eq!(cell.to_number(), Some(42.5));
        let cell = Cell::new(0, 0, CellValue::Text("n/a".to_owned()), "n/a".to_owned());
        assert_eq!(cell.to_number(), None);
    }

    #[test]
    fn merge_info_contains() {
        let merge = MergeInfo {
            origin_row: 1,
            origin_col: 1,
            end_row: 2,
            end_col: 3,
            is_origin: false,
        };
        assert!(merge.contains(1, 1));
        assert!(merge.contains(2, 3));
        assert!(!merge.contains(0, 1));
        assert!(!merge.contains(2, 4));
    }
}
