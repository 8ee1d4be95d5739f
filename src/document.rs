//! PDF document model.
//!
//! A [`PdfDocument`] is the browser's PDF loaded fully into memory: its header
//! bytes, every indirect object in a [`DocumentIndex`], and the trailer's
//! `/Root` and `/Info` references. Outlines and trim boxes are added in
//! place, then the document is serialized again with a fresh xref table.

use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::index::DocumentIndex;
use crate::object::{Dictionary, Object, ObjectRef};
use crate::outline::{HeadingRecord, ObjectGraphAssembler, OutlineTreeBuilder};
use crate::page_boxes::{apply_trim_boxes, PageBoxes};
use crate::parser::parse_indirect_object;
use crate::writer::{DocumentSerializer, SerializedPdf, DEFAULT_HEADER};
use crate::xref::{find_xref_offset, parse_xref, CrossRefTable};
use std::collections::HashSet;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

/// Maximum depth of the page tree.
const MAX_PAGE_TREE_DEPTH: usize = 50;

/// PDF document held in memory.
///
/// # Example
///
/// ```no_run
/// use paged_pdf::{ExportConfig, HeadingRecord, PdfDocument};
///
/// let mut doc = PdfDocument::open("book.pdf")?;
/// let headings = vec![HeadingRecord::new("H1", "Intro", "intro")];
/// doc.add_outline(&headings, &["h1".to_string()])?;
/// doc.save_to("book-with-outline.pdf", &ExportConfig::default())?;
/// # Ok::<(), paged_pdf::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct PdfDocument {
    /// Header bytes (`%PDF-x.y` line plus an optional binary comment line)
    header: Vec<u8>,
    /// PDF version (major, minor)
    version: (u8, u8),
    /// All indirect objects, in file order
    index: DocumentIndex,
    /// The document catalog
    catalog: ObjectRef,
    /// The document information dictionary, if any
    info: Option<ObjectRef>,
}

impl PdfDocument {
    /// Open a PDF document from a file path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::load(&data)
    }

    /// Load a PDF document from bytes.
    ///
    /// The classic xref table (with its `/Prev` chain) is used when it is
    /// readable and consistent; otherwise the table is rebuilt by scanning
    /// the file for object headers.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidHeader`] when the data does not start with `%PDF-x.y`
    /// - [`Error::Unsupported`] for encrypted files and object streams
    /// - [`Error::MissingCatalog`] when no catalog can be found
    pub fn load(data: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(data);
        let version = parse_header(&mut reader)?;
        let header = header_bytes(data);

        let (xref, mut index) = match Self::try_open_regular(&mut reader, data) {
            Ok(loaded) => loaded,
            Err(e) => {
                log::warn!("Regular xref parsing failed: {}, attempting reconstruction", e);
                let xref = crate::xref_reconstruction::reconstruct_xref(&mut reader)
                    .map_err(|recon_err| {
                        log::error!("XRef reconstruction also failed: {}", recon_err);
                        e
                    })?;
                let (index, failures) = load_objects(data, &xref)?;
                if failures > 0 {
                    log::warn!("{} objects could not be parsed after reconstruction", failures);
                }
                (xref, index)
            },
        };

        let trailer = xref.trailer().cloned().unwrap_or_default();
        if trailer.contains_key("Encrypt") {
            return Err(Error::Unsupported("encrypted documents".to_string()));
        }

        let catalog = trailer
            .get("Root")
            .and_then(Object::as_reference)
            .filter(|r| index.get(*r).is_some_and(|o| o.has_type("Catalog")))
            .or_else(|| index.catalog_ref())
            .ok_or(Error::MissingCatalog)?;

        let info = trailer
            .get("Info")
            .and_then(Object::as_reference)
            .filter(|r| index.contains(*r));

        drop_xref_streams(&mut index);

        log::info!(
            "Loaded PDF {}.{} with {} objects (catalog {})",
            version.0,
            version.1,
            index.len(),
            catalog
        );

        Ok(Self {
            header,
            version,
            index,
            catalog,
            info,
        })
    }

    /// Build a document from an already populated index.
    ///
    /// Uses the default header; `catalog` must name a `/Type /Catalog` object.
    pub fn from_index(index: DocumentIndex, info: Option<ObjectRef>) -> Result<Self> {
        let catalog = index.catalog_ref().ok_or(Error::MissingCatalog)?;
        Ok(Self {
            header: DEFAULT_HEADER.to_vec(),
            version: (1, 7),
            index,
            catalog,
            info,
        })
    }

    /// Parse the xref chain and load every object it lists.
    ///
    /// Fails when the table is empty, when any listed object cannot be
    /// parsed, or when the trailer has no usable `/Root`, so the caller can
    /// fall back to reconstruction.
    fn try_open_regular<R: Read + Seek>(
        reader: &mut R,
        data: &[u8],
    ) -> Result<(CrossRefTable, DocumentIndex)> {
        let xref_offset = find_xref_offset(reader)?;
        let xref = parse_xref(reader, xref_offset)?;
        if xref.is_empty() {
            return Err(Error::InvalidXref);
        }

        let (index, failures) = load_objects(data, &xref)?;
        if failures > 0 {
            return Err(Error::InvalidPdf(format!(
                "{} xref entries do not point at their objects",
                failures
            )));
        }

        let has_root = xref
            .trailer()
            .and_then(|t| t.get("Root"))
            .and_then(Object::as_reference)
            .is_some_and(|r| index.contains(r));
        if !has_root {
            return Err(Error::InvalidPdf("trailer /Root does not resolve".to_string()));
        }

        Ok((xref, index))
    }

    /// PDF version from the header.
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    /// Header bytes written in front of the objects on save.
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// The object graph.
    pub fn index(&self) -> &DocumentIndex {
        &self.index
    }

    /// Reference of the document catalog.
    pub fn catalog_ref(&self) -> ObjectRef {
        self.catalog
    }

    /// Reference of the document information dictionary.
    pub fn info_ref(&self) -> Option<ObjectRef> {
        self.info
    }

    /// The catalog dictionary.
    pub fn catalog(&self) -> Result<&Dictionary> {
        let obj = self
            .index
            .get(self.catalog)
            .ok_or(Error::ObjectNotFound(self.catalog.id, self.catalog.gen))?;
        obj.as_dict().ok_or_else(|| Error::InvalidObjectType {
            expected: "Dictionary".to_string(),
            found: obj.type_name().to_string(),
        })
    }

    /// References of all pages in document order.
    pub fn page_refs(&self) -> Result<Vec<ObjectRef>> {
        let pages_ref = self
            .catalog()?
            .get("Pages")
            .and_then(Object::as_reference)
            .ok_or_else(|| Error::InvalidPdf("catalog has no /Pages reference".to_string()))?;

        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        self.collect_pages(pages_ref, 0, &mut visited, &mut pages);
        Ok(pages)
    }

    fn collect_pages(
        &self,
        node_ref: ObjectRef,
        depth: usize,
        visited: &mut HashSet<ObjectRef>,
        pages: &mut Vec<ObjectRef>,
    ) {
        if depth > MAX_PAGE_TREE_DEPTH {
            log::warn!("Page tree depth exceeded {} levels, stopping", MAX_PAGE_TREE_DEPTH);
            return;
        }
        if !visited.insert(node_ref) {
            log::warn!("Circular reference in page tree at object {}, skipping", node_ref);
            return;
        }

        let Some(node) = self.index.get(node_ref).and_then(Object::as_dict) else {
            log::warn!("Page tree node {} is missing or not a dictionary", node_ref);
            return;
        };

        match node.get("Type").and_then(Object::as_name) {
            Some("Page") => pages.push(node_ref),
            Some("Pages") => {
                let kids = node.get("Kids").and_then(|k| self.index.resolve(k));
                match kids.and_then(Object::as_array) {
                    Some(kids) => {
                        for kid in kids.iter().filter_map(Object::as_reference) {
                            self.collect_pages(kid, depth + 1, visited, pages);
                        }
                    },
                    None => log::warn!("Pages node {} missing /Kids array", node_ref),
                }
            },
            other => log::warn!("Unknown page tree node type: {:?}", other.unwrap_or("(none)")),
        }
    }

    /// Build an outline from `headings` and attach it to the catalog.
    ///
    /// `priority` lists the outline tags, outermost level first. Returns the
    /// `/Outlines` reference, or `None` when no heading produced a bookmark.
    ///
    /// # Errors
    ///
    /// [`Error::MissingAnchor`] if any heading lacks an anchor id; the
    /// document is unchanged in that case.
    pub fn add_outline(
        &mut self,
        headings: &[HeadingRecord],
        priority: &[String],
    ) -> Result<Option<ObjectRef>> {
        let tree = OutlineTreeBuilder::new(priority.iter().cloned()).build(headings)?;
        if tree.is_empty() {
            log::info!("No headings for the outline; leaving the document without one");
            return Ok(None);
        }
        if self.catalog()?.contains_key("Outlines") {
            log::warn!("Replacing the document's existing outline");
        }
        ObjectGraphAssembler::new().assemble(&tree, &mut self.index).map(Some)
    }

    /// Set `/TrimBox` on pages with a bleed area. Returns the number of pages changed.
    pub fn set_trim_boxes(&mut self, pages: &[PageBoxes]) -> Result<usize> {
        let page_refs = self.page_refs()?;
        Ok(apply_trim_boxes(&mut self.index, &page_refs, pages))
    }

    /// Serialize the document, returning bytes together with any warnings.
    pub fn serialize(&self, config: &ExportConfig) -> Result<SerializedPdf> {
        DocumentSerializer::new()
            .with_compact(config.compact)
            .with_compress_streams(config.compress_streams)
            .serialize(&self.index, &self.header, Some(self.catalog), self.info)
    }

    /// Serialize the document to bytes.
    pub fn save(&self, config: &ExportConfig) -> Result<Vec<u8>> {
        let serialized = self.serialize(config)?;
        for warning in &serialized.warnings {
            log::warn!("{}", warning);
        }
        Ok(serialized.bytes)
    }

    /// Serialize the document and write it to `path`.
    pub fn save_to(&self, path: impl AsRef<Path>, config: &ExportConfig) -> Result<()> {
        let bytes = self.save(config)?;
        std::fs::write(path.as_ref(), bytes)?;
        Ok(())
    }
}

/// Parse every in-use object the table lists.
///
/// Returns the populated index and the number of entries whose offset did
/// not hold the expected object.
fn load_objects(data: &[u8], xref: &CrossRefTable) -> Result<(DocumentIndex, usize)> {
    let mut index = DocumentIndex::new();
    let mut failures = 0;

    for (number, entry) in xref.in_use_entries() {
        let parsed = usize::try_from(entry.offset)
            .ok()
            .and_then(|start| data.get(start..))
            .and_then(|input| parse_indirect_object(input).ok());

        match parsed {
            Some((_, (reference, object))) if reference.id == number => {
                if object.has_type("ObjStm") {
                    return Err(Error::Unsupported("object streams".to_string()));
                }
                index.assign(reference, object)?;
            },
            _ => {
                log::warn!("No object {} at offset {}", number, entry.offset);
                failures += 1;
            },
        }
    }

    Ok((index, failures))
}

/// Cross-reference streams describe the old layout; a fresh table is written on save.
fn drop_xref_streams(index: &mut DocumentIndex) {
    let xref_streams: Vec<ObjectRef> = index
        .iter()
        .filter(|(_, obj)| obj.has_type("XRef"))
        .map(|(r, _)| r)
        .collect();
    for reference in xref_streams {
        log::debug!("Dropping cross-reference stream {}", reference);
        index.remove(reference);
    }
}

/// The header lines: `%PDF-x.y` plus the following comment line, if any.
fn header_bytes(data: &[u8]) -> Vec<u8> {
    let line_end = |from: usize| {
        data[from..]
            .iter()
            .position(|&c| c == b'\n' || c == b'\r')
            .map(|pos| {
                let end = from + pos;
                if data[end] == b'\r' && data.get(end + 1) == Some(&b'\n') {
                    end + 2
                } else {
                    end + 1
                }
            })
    };

    let Some(first) = line_end(0) else {
        let mut header = data.to_vec();
        header.push(b'\n');
        return header;
    };
    let end = match data.get(first) {
        Some(b'%') => line_end(first).unwrap_or(first),
        _ => first,
    };
    data[..end].to_vec()
}

/// Parse the `%PDF-M.m` header.
///
/// ```
/// use paged_pdf::document::parse_header;
/// use std::io::Cursor;
///
/// let mut cursor = Cursor::new(b"%PDF-1.7\n");
/// assert_eq!(parse_header(&mut cursor).unwrap(), (1, 7));
/// ```
pub fn parse_header<R: Read + Seek>(reader: &mut R) -> Result<(u8, u8)> {
    let mut header = [0u8; 8];
    reader
        .read_exact(&mut header)
        .map_err(|_| Error::InvalidHeader("File too short to contain PDF header".to_string()))?;

    if &header[0..5] != b"%PDF-" {
        return Err(Error::InvalidHeader(String::from_utf8_lossy(&header[0..5]).to_string()));
    }

    let (major, dot, minor) = (header[5], header[6], header[7]);
    if dot != b'.' || !major.is_ascii_digit() || !minor.is_ascii_digit() {
        return Err(Error::InvalidHeader(String::from_utf8_lossy(&header).to_string()));
    }

    let (major, minor) = (major - b'0', minor - b'0');
    if major > 2 || major == 0 {
        return Err(Error::Unsupported(format!("PDF version {}.{}", major, minor)));
    }

    Ok((major, minor))
}
