//! Access to the XML parts of a workbook archive.
//!
//! Office writers disagree on member-name casing and separators, worksheet
//! text comes in two shapes (bare payloads like `<v>` and rich-text runs
//! with phonetic annotations), and a parse failure is only actionable when
//! it names the part it happened in. [`PartReader`] folds those concerns
//! into one streaming reader so the workbook loader stays declarative.

use crate::error::SheetScanError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

/// Phonetic run inside rich text; its content never reaches the cell value
const TAG_PHONETIC: QName = QName(b"rPh");
/// Text run inside rich-text containers
const TAG_TEXT_RUN: QName = QName(b"t");

/// Streaming reader over one XML part. Carries the part's archive path so
/// every parse failure is located, and reuses one scratch buffer across
/// events.
pub(crate) struct PartReader<R: BufRead> {
    path: String,
    reader: Reader<R>,
    buffer: Vec<u8>,
}

pub(crate) type ZipPartReader<'a, RS> = PartReader<BufReader<ZipFile<'a, RS>>>;

/// Opens a part by name, tolerating the case differences and backslash
/// separators Office writers produce. None when the part is absent.
pub(crate) fn open_part<'a, RS: Read + Seek>(
    zip: &'a mut ZipArchive<RS>,
    name: &str,
) -> Result<Option<ZipPartReader<'a, RS>>, SheetScanError> {
    let pattern = name.replace('\\', "/");
    let path = zip
        .file_names()
        .find(|candidate| pattern.eq_ignore_ascii_case(candidate))
        .map(str::to_owned);
    let file = match path.map(|path| zip.by_name(&path)) {
        Some(Ok(file)) => file,
        None | Some(Err(ZipError::FileNotFound)) => return Ok(None),
        Some(Err(error)) => Err(error)?,
    };
    Ok(Some(PartReader::new(name, BufReader::new(file))))
}

/// Reads one attribute of an element, unescaped and owned. None when the
/// element does not carry it.
pub(crate) fn attribute(
    element: &BytesStart<'_>,
    name: &str,
) -> Result<Option<String>, SheetScanError> {
    match element.try_get_attribute(name)? {
        Some(attribute) => Ok(Some(attribute.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

impl<R: BufRead> PartReader<R> {
    fn new(path: &str, source: R) -> PartReader<R> {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);
        PartReader {
            path: path.to_owned(),
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Next XML event, or None at the end of the part.
    pub(crate) fn next(&mut self) -> Result<Option<Event<'_>>, SheetScanError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(SheetScanError::MalformedPart {
                part: self.path.to_owned(),
                message: error.to_string(),
            }),
        }
    }

    /// Collects the textual content up to the closing `end` tag.
    ///
    /// `bare` parts (`<v>`, `<f>`, `definedName`) hold their payload
    /// directly; rich-text containers (`<is>`, `<si>`, comment bodies) hold
    /// it inside `<t>` runs, with `<rPh>` phonetic annotations skipped.
    pub(crate) fn text_until(&mut self, end: QName, bare: bool) -> Result<String, SheetScanError> {
        let mut text = String::new();
        let mut phonetic = false;
        let mut take = bare;
        while let Some(event) = self.next()? {
            match event {
                Event::End(element) if element.name() == end => break,
                Event::Start(element) if element.name() == TAG_PHONETIC => phonetic = true,
                Event::End(element) if element.name() == TAG_PHONETIC => phonetic = false,
                Event::Start(element) if !phonetic && element.name() == TAG_TEXT_RUN => take = true,
                Event::End(element) if take && element.name() == TAG_TEXT_RUN => take = false,
                Event::Text(element) if take => text.push_str(&element.xml_content()?),
                Event::CData(element) if take => text.push_str(&element.xml_content()?),
                Event::GeneralRef(element) if take => push_reference(&mut text, &element)?,
                _ => (),
            }
        }
        Ok(text)
    }
}

/// Resolves an entity or character reference and appends it.
fn push_reference(text: &mut String, bytes: &BytesRef<'_>) -> Result<(), SheetScanError> {
    let raw = bytes.xml_content()?;
    if let Some(number) = raw.strip_prefix('#') {
        let code = if let Some(hex) = number.strip_prefix('x') {
            u32::from_str_radix(hex, 16)?
        } else {
            u32::from_str_radix(number, 10)?
        };
        if let Some(character) = std::char::from_u32(code) {
            text.push_str(character.encode_utf8(&mut [0u8; 4]));
        }
    } else if let Some(entity) = resolve_xml_entity(&raw) {
        text.push_str(entity);
    }
    Ok(())
}
