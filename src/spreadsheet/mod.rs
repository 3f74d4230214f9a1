//! # OOXML parser collaborator
//!
//! The boundary the core depends on: raw cells straight from the worksheet
//! XML, with their OOXML type tags, verbatim text, formula source, and style
//! indexes. Addresses are 0-indexed; deciding the typed cell kind is the
//! reader adapter's job, never the parser's.

pub(crate) mod parts;
pub mod reference;
pub(crate) mod xlsx;

pub use xlsx::XlsxWorkbook;

use std::collections::HashMap;

/// OOXML cell type tags (`t` attribute values, `n` when absent).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum RawCellType {
    /// `s` - index into the shared string table
    SharedString,
    /// `inlineStr` - string stored inline in the cell
    InlineString,
    /// `str` - string produced by a formula
    FormulaString,
    /// `b` - boolean
    Boolean,
    /// `n` or absent - number
    #[default]
    Number,
    /// `d` - ISO 8601 date string
    IsoDateTime,
    /// `e` - error literal such as `#DIV/0!`
    Error,
}

impl RawCellType {
    pub(crate) fn from_tag(tag: &str) -> RawCellType {
        match tag {
            "s" => Self::SharedString,
            "inlineStr" => Self::InlineString,
            "str" => Self::FormulaString,
            "b" => Self::Boolean,
            "d" => Self::IsoDateTime,
            "e" => Self::Error,
            _ => Self::Number,
        }
    }
}

/// One cell as stored in the worksheet part, before any typing decisions.
#[derive(Clone, Debug)]
pub(crate) struct RawCell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    pub(crate) kind: RawCellType,
    /// Cell text exactly as stored (shared-string cells store the index)
    pub(crate) value: String,
    /// Formula source without the leading '='
    pub(crate) formula: Option<String>,
    /// Index into the workbook's cell format table
    pub(crate) style: Option<usize>,
}

/// A declared merge rectangle; `bounds` is None when the `ref` attribute
/// could not be parsed, so the adapter can warn and skip it.
#[derive(Clone, Debug)]
pub(crate) struct MergeRef {
    pub(crate) reference: String,
    pub(crate) bounds: Option<(usize, usize, usize, usize)>,
}

/// Number format attached to a cell format (`xf`) slot.
#[derive(Clone, Debug, Default)]
pub(crate) struct NumberFormat {
    /// `numFmtId`; builtin ids stay meaningful without a code
    pub(crate) id: u32,
    /// Custom format code, when the workbook defines one for this id
    pub(crate) code: Option<String>,
}

/// A `definedName` entry from the workbook part.
#[derive(Clone, Debug)]
pub struct NamedRange {
    pub name: String,
    /// Sheet the name is scoped to; None for workbook scope
    pub scope: Option<String>,
    /// The reference text, e.g. `Sheet1!$A$1:$D$10`
    pub refers_to: String,
}

/// Everything the parser recovers from one worksheet part.
#[derive(Debug, Default)]
pub(crate) struct RawSheet {
    pub(crate) name: String,
    pub(crate) cells: Vec<RawCell>,
    pub(crate) merges: Vec<MergeRef>,
    /// `r` attributes that failed to parse; cells fell back to stream order
    pub(crate) invalid_addresses: Vec<String>,
    pub(crate) comments: HashMap<(usize, usize), String>,
    pub(crate) hyperlinks: HashMap<(usize, usize), String>,
}
