//! PDF document serializer.
//!
//! Lays out a [`DocumentIndex`] as a complete classic PDF file: header,
//! stream objects, non-stream objects, xref table and trailer.

use super::object_serializer::ObjectSerializer;
use crate::error::{Error, Result};
use crate::index::DocumentIndex;
use crate::object::{Dictionary, Object, ObjectRef};
use std::collections::BTreeMap;
use std::io::Write;

/// Header written when the caller has no header of its own: version line plus
/// a binary marker comment.
pub const DEFAULT_HEADER: &[u8] = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n";

/// Build a header for the given PDF version (e.g. `"1.4"`).
pub fn header_for_version(version: &str) -> Vec<u8> {
    let mut header = format!("%PDF-{}\n", version).into_bytes();
    header.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
    header
}

/// Compress data using Flate/Deflate compression.
///
/// Returns compressed bytes suitable for the FlateDecode filter.
fn compress_data(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Output of [`DocumentSerializer::serialize`].
#[derive(Debug)]
pub struct SerializedPdf {
    /// The complete file
    pub bytes: Vec<u8>,
    /// Byte offset of the `xref` keyword
    pub xref_offset: usize,
    /// Non-fatal problems found while writing (e.g. a missing catalog)
    pub warnings: Vec<Error>,
}

/// Writes an object graph as a classic cross-reference PDF.
///
/// Stream objects are written before all other objects; within each group the
/// index's insertion order is kept, so the same index always produces the
/// same bytes.
#[derive(Debug, Clone)]
pub struct DocumentSerializer {
    compact: bool,
    compress_streams: bool,
}

impl Default for DocumentSerializer {
    fn default() -> Self {
        Self {
            compact: true,
            compress_streams: false,
        }
    }
}

impl DocumentSerializer {
    /// Create a serializer with compact dictionaries and no compression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose between compact and one-entry-per-line dictionaries.
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Flate-compress stream payloads that carry no `/Filter` yet.
    pub fn with_compress_streams(mut self, compress: bool) -> Self {
        self.compress_streams = compress;
        self
    }

    /// Serialize every object in `index`.
    ///
    /// `catalog` becomes the trailer's `/Root`; when it is `None` or absent
    /// from the index, the first `/Type /Catalog` object is used instead. If
    /// there is none, the file is still written (without `/Root`) and
    /// [`Error::MissingCatalog`] is reported in the warnings. `/Info` is
    /// written only when `info` names an object in the index.
    pub fn serialize(
        &self,
        index: &DocumentIndex,
        header: &[u8],
        catalog: Option<ObjectRef>,
        info: Option<ObjectRef>,
    ) -> Result<SerializedPdf> {
        let mut warnings = Vec::new();

        let catalog = catalog
            .filter(|r| index.contains(*r))
            .or_else(|| index.catalog_ref());
        if catalog.is_none() {
            log::error!("Missing document catalog; writing file without /Root");
            warnings.push(Error::MissingCatalog);
        }

        let info = match info {
            Some(r) if !index.contains(r) => {
                log::warn!("Info dictionary {} is not in the index; omitting /Info", r);
                None
            },
            other => other,
        };

        for (owner, target) in index.dangling_references() {
            log::warn!("Object {} references missing object {}", owner, target);
        }

        let serializer = ObjectSerializer::with_compact(self.compact);
        let mut output = Vec::with_capacity(header.len() + index.len() * 64);
        output.extend_from_slice(header);

        // Object number -> (offset, generation), sorted by number
        let mut offsets: BTreeMap<u32, (usize, u16)> = BTreeMap::new();

        let streams = index.iter().filter(|(_, obj)| obj.is_stream());
        let others = index.iter().filter(|(_, obj)| !obj.is_stream());

        for (reference, obj) in streams {
            let encoded = self.encode_stream(reference, obj);
            record_offset(&mut offsets, reference, output.len());
            serializer.write_indirect(&mut output, reference, encoded.as_ref().unwrap_or(obj))?;
        }
        for (reference, obj) in others {
            record_offset(&mut offsets, reference, output.len());
            serializer.write_indirect(&mut output, reference, obj)?;
        }

        let max_number = index.max_object_number();
        let size = max_number
            .checked_add(1)
            .ok_or(Error::ObjectNumberOutOfRange(u64::from(max_number)))?;
        let xref_offset = output.len();
        write_xref_table(&mut output, size, &offsets)?;

        let mut trailer = Dictionary::new();
        trailer.insert("Size".to_string(), Object::Integer(i64::from(size)));
        if let Some(root) = catalog {
            trailer.insert("Root".to_string(), Object::Reference(root));
        }
        if let Some(info) = info {
            trailer.insert("Info".to_string(), Object::Reference(info));
        }

        writeln!(output, "trailer")?;
        serializer.write_object(&mut output, &Object::Dictionary(trailer))?;
        write!(output, "\nstartxref\n{}\n%%EOF\n", xref_offset)?;

        log::debug!(
            "Serialized {} objects into {} bytes (xref at {})",
            index.len(),
            output.len(),
            xref_offset
        );

        Ok(SerializedPdf {
            bytes: output,
            xref_offset,
            warnings,
        })
    }

    /// Compress an unfiltered stream when compression is enabled.
    ///
    /// Returns `None` when the object should be written unchanged.
    fn encode_stream(&self, reference: ObjectRef, obj: &Object) -> Option<Object> {
        if !self.compress_streams {
            return None;
        }
        let Object::Stream { dict, data } = obj else {
            return None;
        };
        if dict.contains_key("Filter") {
            return None;
        }
        match compress_data(data) {
            Ok(compressed) => {
                let mut dict = dict.clone();
                dict.insert("Filter".to_string(), Object::Name("FlateDecode".to_string()));
                Some(Object::Stream {
                    dict,
                    data: bytes::Bytes::from(compressed),
                })
            },
            Err(e) => {
                log::warn!("Failed to compress stream {}: {}; writing it uncompressed", reference, e);
                None
            },
        }
    }
}

fn record_offset(offsets: &mut BTreeMap<u32, (usize, u16)>, reference: ObjectRef, offset: usize) {
    if let Some((_, gen)) = offsets.insert(reference.id, (offset, reference.gen)) {
        log::warn!(
            "Object number {} is defined with generations {} and {}; the later one wins",
            reference.id,
            gen,
            reference.gen
        );
    }
}

/// Write `xref`, one subsection `0 size` and exactly `size` 20-byte entries.
///
/// Numbers without an object become free entries. Entry 0 heads the free
/// list; each free entry points at the next free number and the last one
/// points back to 0.
fn write_xref_table<W: Write>(
    w: &mut W,
    size: u32,
    offsets: &BTreeMap<u32, (usize, u16)>,
) -> std::io::Result<()> {
    let free: Vec<u32> = (1..size).filter(|n| !offsets.contains_key(n)).collect();
    let mut next_free = free.iter().copied().skip(1).chain(std::iter::once(0));

    write!(w, "xref\n0 {}\n", size)?;
    write!(w, "{:010} {:05} f \n", free.first().copied().unwrap_or(0), 65535)?;
    for number in 1..size {
        match offsets.get(&number) {
            Some((offset, gen)) => write!(w, "{:010} {:05} n \n", offset, gen)?,
            None => write!(w, "{:010} {:05} f \n", next_free.next().unwrap_or(0), 0)?,
        }
    }
    Ok(())
}
