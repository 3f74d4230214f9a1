use crate::error::SheetScanError;
use crate::spreadsheet::parts::attribute;
use crate::spreadsheet::parts::open_part;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::MergeRef;
use crate::spreadsheet::NamedRange;
use crate::spreadsheet::NumberFormat;
use crate::spreadsheet::RawCell;
use crate::spreadsheet::RawCellType;
use crate::spreadsheet::RawSheet;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use zip::ZipArchive;

// XML tag names for parsing the OOXML workbook parts
const TAG_RELATIONSHIP: &[u8] = b"Relationship"; // Entry in a .rels part
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts"); // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt"); // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs"); // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf"); // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si"); // Shared string table item
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Workbook properties
const TAG_SHEET: QName = QName(b"sheet"); // Worksheet definition
const TAG_DEFINED_NAME: QName = QName(b"definedName"); // Named range definition
const TAG_ROW: QName = QName(b"row"); // Row in worksheet
const TAG_CELL: QName = QName(b"c"); // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is"); // Inline string value
const TAG_VALUE: QName = QName(b"v"); // Cell value content
const TAG_FORMULA: QName = QName(b"f"); // Cell formula source
const TAG_MERGE_CELL: QName = QName(b"mergeCell"); // Declared merge rectangle
const TAG_HYPERLINK: QName = QName(b"hyperlink"); // Hyperlink anchor in worksheet
const TAG_COMMENT: QName = QName(b"comment"); // Comment in the comments part
const TAG_COMMENT_TEXT: QName = QName(b"text"); // Comment body container

/// A relationship entry: type URI plus resolved target path.
struct Relationship {
    kind: String,
    target: String,
}

/// An OOXML workbook archive, opened for raw-cell extraction.
///
/// This is the parser collaborator: it exposes sheet names, raw cells with
/// their OOXML type tags, merge ranges, shared strings, number formats and
/// named ranges. It never decides cell kinds.
pub struct XlsxWorkbook<RS: Read + Seek> {
    name: String,
    zip: ZipArchive<RS>,
    /// Worksheets as (name, zip path) pairs, in workbook order
    sheets: Vec<(String, String)>,
    shared_strings: Vec<String>,
    /// Number formats indexed by cell format (`xf`) slot
    number_formats: Vec<NumberFormat>,
    named_ranges: Vec<NamedRange>,
    is_1904: bool,
}

impl XlsxWorkbook<BufReader<File>> {
    /// Opens a workbook archive from the file system.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SheetScanError> {
        let name = path.as_ref().to_string_lossy().to_string();
        let file = File::open(&path).map_err(|error| {
            if error.kind() == std::io::ErrorKind::NotFound {
                SheetScanError::FileNotFound(name.to_owned())
            } else {
                SheetScanError::IoError(error)
            }
        })?;
        Self::from_reader(&name, BufReader::new(file))
    }
}

impl<RS: Read + Seek> XlsxWorkbook<RS> {
    /// Opens a workbook archive from any seekable reader; `name` is used in
    /// error messages only.
    pub fn from_reader(name: &str, reader: RS) -> Result<Self, SheetScanError> {
        let mut zip = ZipArchive::new(reader).map_err(|error| SheetScanError::InvalidArchive {
            name: name.to_owned(),
            message: error.to_string(),
        })?;
        let (sheets, named_ranges, is_1904) = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SheetScanError::InvalidArchive {
                name: name.to_owned(),
                message: "workbook has no worksheets".to_owned(),
            })?
        }
        let number_formats = load_number_formats(&mut zip)?;
        let shared_strings = load_shared_strings(&mut zip)?;
        Ok(XlsxWorkbook {
            name: name.to_owned(),
            zip,
            sheets,
            shared_strings,
            number_formats,
            named_ranges,
            is_1904,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    pub fn sheet_name(&self, index: usize) -> Option<&str> {
        self.sheets.get(index).map(|(name, _)| name.as_str())
    }

    /// True when the workbook declares the 1904 date system.
    pub fn is_1904(&self) -> bool {
        self.is_1904
    }

    pub fn named_ranges(&self) -> &[NamedRange] {
        &self.named_ranges
    }

    pub(crate) fn shared_string(&self, index: usize) -> Option<&str> {
        self.shared_strings.get(index).map(String::as_str)
    }

    pub(crate) fn number_format(&self, style: usize) -> Option<&NumberFormat> {
        self.number_formats.get(style)
    }

    /// Reads one worksheet part into raw cells plus merge, comment and
    /// hyperlink metadata.
    pub(crate) fn read_sheet(&mut self, index: usize) -> Result<RawSheet, SheetScanError> {
        let (sheet_name, zip_path) = self
            .sheets
            .get(index)
            .ok_or_else(|| SheetScanError::SheetNotFound(format!("#{index}")))?
            .to_owned();

        // Sheet-level relationships resolve hyperlink targets and locate the
        // comments part; they must be read before the worksheet part because
        // the archive hands out one reader at a time.
        let relationships =
            load_relationships(&mut self.zip, &rels_path(&zip_path), parent_dir(&zip_path))?;
        let comments = match relationships
            .values()
            .find(|relationship| relationship.kind.ends_with("/comments"))
        {
            Some(relationship) => load_comments(&mut self.zip, &relationship.target)?,
            None => HashMap::new(),
        };

        let mut sheet = RawSheet {
            name: sheet_name.to_owned(),
            comments,
            ..RawSheet::default()
        };
        let mut pending_links = Vec::<(String, Option<String>, Option<String>)>::new();
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut current = None::<RawCell>;
        let mut reader = open_part(&mut self.zip, &zip_path)?
            .ok_or_else(|| SheetScanError::SheetNotFound(sheet_name.to_owned()))?;
        while let Some(event) = reader.next()? {
            match event {
                Event::End(element) if element.name() == TAG_ROW => {
                    row_count += 1;
                    col_count = 0;
                }
                Event::Start(element) if element.name() == TAG_CELL => {
                    let position = match attribute(&element, "r")? {
                        Some(reference) => match reference_to_index(&reference) {
                            Some(position) => Some(position),
                            None => {
                                // Unusable address: report it and skip the cell
                                sheet.invalid_addresses.push(reference);
                                None
                            }
                        },
                        None => Some((row_count, col_count)),
                    };
                    col_count += 1;
                    let (row, col) = match position {
                        Some(position) => position,
                        None => {
                            current = None;
                            continue;
                        }
                    };
                    let kind = attribute(&element, "t")?
                        .map(|tag| RawCellType::from_tag(&tag))
                        .unwrap_or_default();
                    let style = attribute(&element, "s")?.and_then(|id| id.parse::<usize>().ok());
                    current = Some(RawCell {
                        row,
                        col,
                        kind,
                        value: String::new(),
                        formula: None,
                        style,
                    });
                }
                Event::Start(element) if current.is_some() && element.name() == TAG_FORMULA => {
                    let source = reader.text_until(TAG_FORMULA, true)?;
                    if let Some(cell) = current.as_mut() {
                        if !source.is_empty() {
                            cell.formula = Some(source);
                        }
                    }
                }
                Event::Start(element)
                    if current.is_some() && element.name() == TAG_INLINE_STRING =>
                {
                    let text = reader.text_until(TAG_INLINE_STRING, false)?;
                    if let Some(cell) = current.as_mut() {
                        cell.value = text;
                    }
                }
                Event::Start(element) if current.is_some() && element.name() == TAG_VALUE => {
                    let text = reader.text_until(TAG_VALUE, true)?;
                    if let Some(cell) = current.as_mut() {
                        cell.value = text;
                    }
                }
                Event::End(element) if element.name() == TAG_CELL => {
                    if let Some(cell) = current.take() {
                        if !cell.value.is_empty() || cell.formula.is_some() {
                            sheet.cells.push(cell);
                        }
                    }
                }
                Event::Start(element) if element.name() == TAG_MERGE_CELL => {
                    if let Some(reference) = attribute(&element, "ref")? {
                        sheet.merges.push(parse_merge_ref(&reference));
                    }
                }
                Event::Start(element) if element.name() == TAG_HYPERLINK => {
                    let reference = attribute(&element, "ref")?;
                    let id = attribute(&element, "r:id")?;
                    let location = attribute(&element, "location")?;
                    if let Some(reference) = reference {
                        pending_links.push((reference, id, location));
                    }
                }
                _ => (),
            }
        }

        for (reference, id, location) in pending_links {
            let target = id
                .and_then(|id| relationships.get(&id).map(|rel| rel.target.to_owned()))
                .or(location);
            if let Some((target, (row, col))) = target.zip(reference_to_index(&reference)) {
                sheet.hyperlinks.insert((row, col), target);
            }
        }
        Ok(sheet)
    }
}

/// Splits `A1:B2` into parsed corner positions; single-cell refs collapse to
/// a 1x1 rectangle.
fn parse_merge_ref(reference: &str) -> MergeRef {
    let mut corners = reference.splitn(2, ':');
    let start = corners.next().and_then(reference_to_index);
    let end = match corners.next() {
        Some(corner) => reference_to_index(corner),
        None => start,
    };
    MergeRef {
        reference: reference.to_owned(),
        bounds: start.zip(end).map(|((sr, sc), (er, ec))| (sr, sc, er, ec)),
    }
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
fn rels_path(part_path: &str) -> String {
    match part_path.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part_path}.rels"),
    }
}

fn parent_dir(part_path: &str) -> &str {
    part_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Resolves a relationship target against the directory of the part that
/// declared it. Leading '/' means archive-absolute; '..' segments walk up.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => (),
            ".." => {
                segments.pop();
            }
            name => segments.push(name),
        }
    }
    segments.join("/")
}

/// Loads a relationships part into an id -> relationship map. Returns an
/// empty map when the part does not exist.
fn load_relationships<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    path: &str,
    base_dir: &str,
) -> Result<HashMap<String, Relationship>, SheetScanError> {
    let mut relationships = HashMap::<String, Relationship>::new();
    let mut reader = match open_part(zip, path)? {
        Some(reader) => reader,
        None => return Ok(relationships),
    };
    while let Some(event) = reader.next()? {
        match event {
            Event::Start(element) if element.local_name().as_ref() == TAG_RELATIONSHIP => {
                let id = attribute(&element, "Id")?;
                let kind = attribute(&element, "Type")?;
                let target = attribute(&element, "Target")?;
                let mode = attribute(&element, "TargetMode")?;
                if let Some(((id, kind), target)) = id.zip(kind).zip(target) {
                    // External targets (hyperlink URLs) stay verbatim
                    let target = if mode.as_deref() == Some("External") {
                        target
                    } else {
                        resolve_target(base_dir, &target)
                    };
                    relationships.insert(id, Relationship { kind, target });
                }
            }
            _ => (),
        }
    }
    Ok(relationships)
}

/// Loads the workbook part: worksheet (name, path) pairs in document order,
/// named ranges, and the date-system flag.
#[allow(clippy::type_complexity)]
fn load_workbook<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
) -> Result<(Vec<(String, String)>, Vec<NamedRange>, bool), SheetScanError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels", "xl")?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut named_ranges: Vec<NamedRange> = Vec::new();
    let mut is_1904 = false;
    let mut reader =
        open_part(zip, "xl/workbook.xml")?.ok_or_else(|| SheetScanError::InvalidArchive {
            name: "xl/workbook.xml".to_owned(),
            message: "missing workbook part".to_owned(),
        })?;
    while let Some(event) = reader.next()? {
        match event {
            Event::Start(element) if element.name() == TAG_SHEET => {
                let name = attribute(&element, "name")?;
                let id = match attribute(&element, "r:id")? {
                    Some(id) => Some(id),
                    None => attribute(&element, "id")?,
                };
                if let Some((name, id)) = name.zip(id) {
                    if let Some(relationship) = relationships.get(&id) {
                        if relationship.kind.ends_with("/worksheet") {
                            sheets.push((name, relationship.target.to_owned()));
                        }
                    }
                }
            }
            Event::Start(element) if element.name() == TAG_WORKBOOK_PROPERTIES => {
                is_1904 = attribute(&element, "date1904")?
                    .map(|value| value == "1" || value == "true")
                    .unwrap_or(false);
            }
            Event::Start(element) if element.name() == TAG_DEFINED_NAME => {
                let name = attribute(&element, "name")?;
                let scope = attribute(&element, "localSheetId")?;
                let refers_to = reader.text_until(TAG_DEFINED_NAME, true)?;
                if let Some(name) = name {
                    named_ranges.push(NamedRange {
                        name,
                        // Resolved to a sheet name below, once all sheets are known
                        scope,
                        refers_to,
                    });
                }
            }
            _ => (),
        }
    }

    // localSheetId counts worksheets in workbook order
    for named_range in &mut named_ranges {
        if let Some(scope) = &named_range.scope {
            named_range.scope = scope
                .parse::<usize>()
                .ok()
                .and_then(|index| sheets.get(index))
                .map(|(name, _)| name.to_owned());
        }
    }
    Ok((sheets, named_ranges, is_1904))
}

/// Loads the styles part: for every cell format slot, the number format id
/// and its custom code when one is defined.
fn load_number_formats<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
) -> Result<Vec<NumberFormat>, SheetScanError> {
    let mut reader = match open_part(zip, "xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<u32, String>::new();

    let mut format_indexes_context = false;
    let mut format_ids = Vec::<u32>::new();

    while let Some(event) = reader.next()? {
        match event {
            Event::Start(element) if !custom_formats_context && element.name() == TAG_CUSTOM_FORMATS => {
                custom_formats_context = true;
            }
            Event::End(element) if custom_formats_context && element.name() == TAG_CUSTOM_FORMATS => {
                custom_formats_context = false;
            }
            Event::Start(element) if custom_formats_context && element.name() == TAG_CUSTOM_FORMAT => {
                let id = attribute(&element, "numFmtId")?;
                let code = attribute(&element, "formatCode")?;
                if let Some((id, code)) = id.zip(code) {
                    if let Ok(id) = id.parse::<u32>() {
                        custom_formats.insert(id, code);
                    }
                }
            }

            Event::Start(element) if !format_indexes_context && element.name() == TAG_FORMAT_INDEXES => {
                format_indexes_context = true;
            }
            Event::End(element) if format_indexes_context && element.name() == TAG_FORMAT_INDEXES => {
                format_indexes_context = false;
            }
            Event::Start(element) if format_indexes_context && element.name() == TAG_FORMAT_INDEX => {
                if let Some(id) = attribute(&element, "numFmtId")? {
                    format_ids.push(id.parse::<u32>().unwrap_or(0));
                }
            }
            _ => (),
        }
    }

    Ok(format_ids
        .into_iter()
        .map(|id| NumberFormat {
            id,
            code: custom_formats.get(&id).map(Clone::clone),
        })
        .collect())
}

/// Loads the shared string table. Cells reference strings by index, so the
/// table is loaded fully up front.
fn load_shared_strings<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
) -> Result<Vec<String>, SheetScanError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match open_part(zip, "xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    while let Some(event) = reader.next()? {
        match event {
            Event::Start(element) if element.name() == TAG_SHARED_STRING_ITEM => {
                let string = reader.text_until(TAG_SHARED_STRING_ITEM, false)?;
                shared_strings.push(string);
            }
            _ => (),
        }
    }
    Ok(shared_strings)
}

/// Loads a comments part into a position -> text map.
fn load_comments<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    path: &str,
) -> Result<HashMap<(usize, usize), String>, SheetScanError> {
    let mut comments = HashMap::<(usize, usize), String>::new();
    let mut reader = match open_part(zip, path)? {
        Some(reader) => reader,
        None => return Ok(comments),
    };
    let mut position = None::<(usize, usize)>;
    while let Some(event) = reader.next()? {
        match event {
            Event::Start(element) if element.name() == TAG_COMMENT => {
                position = attribute(&element, "ref")?
                    .and_then(|reference| reference_to_index(&reference));
            }
            Event::End(element) if element.name() == TAG_COMMENT => {
                position = None;
            }
            Event::Start(element) if position.is_some() && element.name() == TAG_COMMENT_TEXT => {
                let text = reader.text_until(TAG_COMMENT_TEXT, false)?;
                if let Some(position) = position.take() {
                    if !text.is_empty() {
                        comments.insert(position, text);
                    }
                }
            }
            _ => (),
        }
    }
    Ok(comments)
}
