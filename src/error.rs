use thiserror::Error;

/// Main error type for the sheetscan library.
/// Covers fatal workbook-level failures, per-sheet conditions that are
/// recorded as warnings, and wrapped errors from the parsing stack.
#[derive(Error, Debug)]
pub enum SheetScanError {
    /// Workbook file does not exist or cannot be opened
    #[error("File not found: '{0}'")]
    FileNotFound(String),

    /// File exists but is not a readable OOXML archive
    #[error("Invalid workbook archive '{name}': {message}")]
    InvalidArchive { name: String, message: String },

    /// An XML part inside the archive that cannot be parsed
    #[error("Malformed part '{part}': {message}")]
    MalformedPart { part: String, message: String },

    /// Cell address that cannot be mapped to a grid position
    #[error("Invalid cell address '{address}' in sheet '{sheet}'")]
    InvalidAddress { sheet: String, address: String },

    /// Merge rectangle that is inverted or outside the sheet bounding box
    #[error("Malformed merge range '{range}' in sheet '{sheet}'")]
    MalformedMerge { sheet: String, range: String },

    /// Excel serial 60 is the phantom 1900-02-29; the cell stays numeric
    #[error("Unsupported date serial 60 (1900-02-29 does not exist) at {location} in sheet '{sheet}'")]
    UnsupportedDateSerial60 { sheet: String, location: String },

    /// Requested sheet is absent from the workbook
    #[error("Sheet not found: '{0}'")]
    SheetNotFound(String),

    /// No row in a candidate rectangle reached the header threshold
    #[error("No header row met the density threshold for rectangle {location} in sheet '{sheet}'")]
    AmbiguousHeader { sheet: String, location: String },

    /// A candidate rectangle could not be turned into a table
    #[error("Skipped rectangle {location} in sheet '{sheet}': {message}")]
    UnusableRectangle {
        sheet: String,
        location: String,
        message: String,
    },

    /// Workbook failed schema validation
    #[error("Validation failed with {0} issue(s)")]
    ValidationFailed(usize),

    /// Extraction was canceled through the CancelToken
    #[error("Extraction canceled")]
    Canceled,

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    /// Error with an added location or file-name prefix
    #[error("{0}")]
    WithContextError(String),
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, SheetScanError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| match e {
            // Keep the distinguished kinds intact so callers can match on them
            SheetScanError::Canceled => SheetScanError::Canceled,
            SheetScanError::FileNotFound(name) => SheetScanError::FileNotFound(name),
            other => SheetScanError::WithContextError(format!("{}: {}", message, other)),
        })
    }
}
