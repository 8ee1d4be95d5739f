//! Cross-reference table parser.
//!
//! The xref table maps object numbers to byte offsets in the PDF file. Only
//! classic `xref` tables are read; cross-reference streams (PDF 1.5+) are
//! reported as unsupported so the caller can fall back to a full scan.

use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, MAX_OBJECT_NUMBER};
use crate::parser::parse_object;
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};

/// Upper bound on entries in a single subsection.
const MAX_SUBSECTION_ENTRIES: u32 = 1_000_000;

/// Cross-reference table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XRefEntry {
    /// Byte offset of the object (in-use entries) or next free object number
    pub offset: u64,
    /// Generation number
    pub generation: u16,
    /// Whether the object is in use (`n`) or free (`f`)
    pub in_use: bool,
}

impl XRefEntry {
    /// Create a new cross-reference entry.
    pub fn new(offset: u64, generation: u16, in_use: bool) -> Self {
        Self {
            offset,
            generation,
            in_use,
        }
    }

    /// Create an in-use entry.
    pub fn in_use(offset: u64, generation: u16) -> Self {
        Self::new(offset, generation, true)
    }

    /// Create a free entry.
    pub fn free(next_free: u64, generation: u16) -> Self {
        Self::new(next_free, generation, false)
    }
}

/// Cross-reference table that maps object numbers to their locations.
#[derive(Debug, Clone, Default)]
pub struct CrossRefTable {
    entries: HashMap<u32, XRefEntry>,
    trailer: Option<Dictionary>,
}

impl CrossRefTable {
    /// Create a new empty cross-reference table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trailer dictionary.
    pub fn set_trailer(&mut self, trailer: Dictionary) {
        self.trailer = Some(trailer);
    }

    /// Get the trailer dictionary if present.
    pub fn trailer(&self) -> Option<&Dictionary> {
        self.trailer.as_ref()
    }

    /// Add an entry, replacing any previous entry for the same number.
    pub fn add_entry(&mut self, object_number: u32, entry: XRefEntry) {
        self.entries.insert(object_number, entry);
    }

    /// Get an entry by object number.
    pub fn get(&self, object_number: u32) -> Option<&XRefEntry> {
        self.entries.get(&object_number)
    }

    /// In-use entries sorted by byte offset, i.e. in file order.
    pub fn in_use_entries(&self) -> Vec<(u32, XRefEntry)> {
        let mut entries: Vec<(u32, XRefEntry)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.in_use)
            .map(|(n, e)| (*n, *e))
            .collect();
        entries.sort_by_key(|(n, e)| (e.offset, *n));
        entries
    }

    /// Merge entries from an older table (reached through `/Prev`).
    ///
    /// Entries already present in `self` win, since later sections override
    /// earlier ones.
    pub fn merge_from(&mut self, other: CrossRefTable) {
        for (obj_num, entry) in other.entries {
            self.entries.entry(obj_num).or_insert(entry);
        }
        if self.trailer.is_none() {
            self.trailer = other.trailer;
        }
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Find the byte offset of the xref table by scanning from the end of the file.
///
/// # Errors
///
/// Returns `Error::InvalidXref` if no `startxref` keyword followed by a
/// number appears in the last 2 KB of the file.
pub fn find_xref_offset<R: Read + Seek>(reader: &mut R) -> Result<u64> {
    let file_size = reader.seek(SeekFrom::End(0))?;
    let read_size = std::cmp::min(2048, file_size);
    reader.seek(SeekFrom::End(-(read_size as i64)))?;

    let mut buf = Vec::new();
    reader.take(read_size).read_to_end(&mut buf)?;

    let content = String::from_utf8_lossy(&buf);
    let startxref_pos = content.rfind("startxref").ok_or(Error::InvalidXref)?;
    let after_keyword = &content[startxref_pos + "startxref".len()..];

    split_lines(after_keyword)
        .iter()
        .map(|line| line.trim())
        .find(|line| !line.is_empty())
        .filter(|line| line.chars().all(|c| c.is_ascii_digit()))
        .ok_or(Error::InvalidXref)?
        .parse::<u64>()
        .map_err(|_| Error::InvalidXref)
}

/// Parse the cross-reference table at `offset`, following `/Prev` links to
/// older sections.
pub fn parse_xref<R: Read + Seek>(reader: &mut R, offset: u64) -> Result<CrossRefTable> {
    parse_xref_recursive(reader, offset, 0)
}

fn parse_xref_recursive<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    depth: u32,
) -> Result<CrossRefTable> {
    if depth > 100 {
        return Err(Error::InvalidPdf("xref /Prev chain depth exceeded 100".to_string()));
    }

    reader.seek(SeekFrom::Start(offset))?;
    let mut peek_buf = [0u8; 20];
    let bytes_read = reader.read(&mut peek_buf)?;
    let peek = String::from_utf8_lossy(&peek_buf[..bytes_read]);
    let trimmed = peek.trim_start();

    log::debug!("Parsing xref at offset {}", offset);

    let mut xref = if trimmed.starts_with("xref") {
        parse_traditional_xref(reader, offset)?
    } else if trimmed.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return Err(Error::Unsupported("cross-reference streams".to_string()));
    } else {
        return Err(Error::InvalidXref);
    };

    let prev = xref
        .trailer()
        .and_then(|t| t.get("Prev"))
        .and_then(Object::as_integer);
    if let Some(prev_offset) = prev {
        if prev_offset < 0 || prev_offset as u64 == offset {
            log::warn!("Ignoring invalid /Prev offset {}", prev_offset);
        } else {
            log::debug!("Following /Prev to offset {}", prev_offset);
            let older = parse_xref_recursive(reader, prev_offset as u64, depth + 1)?;
            xref.merge_from(older);
        }
    }

    Ok(xref)
}

/// Parse a classic cross-reference section and the trailer that follows it.
///
/// ```text
/// xref
/// 0 6
/// 0000000000 65535 f
/// 0000000018 00000 n
/// ...
/// trailer
/// << /Size 6 /Root 1 0 R >>
/// ```
fn parse_traditional_xref<R: Read + Seek>(reader: &mut R, offset: u64) -> Result<CrossRefTable> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut content = Vec::new();
    reader.read_to_end(&mut content)?;

    let mut xref = CrossRefTable::new();
    let mut lines = ByteLines::new(&content);

    loop {
        match lines.next() {
            Some((_, line)) if line.trim().is_empty() => continue,
            Some((_, line)) if line.trim().starts_with("xref") => break,
            _ => return Err(Error::InvalidXref),
        }
    }

    while let Some((line_start, line)) = lines.next() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        if trimmed.starts_with("trailer") {
            let keyword_pos = line_start + line.find("trailer").unwrap_or(0) + "trailer".len();
            let trailer = match parse_object(&content[keyword_pos..]) {
                Ok((_, Object::Dictionary(dict))) => dict,
                _ => return Err(Error::InvalidPdf("malformed trailer dictionary".to_string())),
            };
            xref.set_trailer(trailer);
            return Ok(xref);
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        if parts.len() != 2 {
            log::warn!("Skipping malformed xref subsection header {:?}", trimmed);
            continue;
        }
        let start_obj: u32 = parts[0].parse().map_err(|_| Error::InvalidXref)?;
        let count: u32 = parts[1].parse().map_err(|_| Error::InvalidXref)?;
        if count > MAX_SUBSECTION_ENTRIES {
            return Err(Error::InvalidPdf("xref subsection count exceeds limit".to_string()));
        }
        let end_obj = u64::from(start_obj) + u64::from(count);
        if count > 0 && end_obj - 1 > u64::from(MAX_OBJECT_NUMBER) {
            return Err(Error::InvalidPdf(format!(
                "xref subsection {} {} runs past object number {}",
                start_obj, count, MAX_OBJECT_NUMBER
            )));
        }

        let mut i = 0;
        while i < count {
            let Some((_, line)) = lines.peek() else {
                break;
            };
            let trimmed = line.trim();
            if trimmed.starts_with("trailer") {
                log::warn!("Expected {} entries but only found {} before trailer", count, i);
                break;
            }
            lines.next();
            if trimmed.is_empty() {
                continue;
            }
            xref.add_entry(start_obj + i, parse_entry(trimmed));
            i += 1;
        }
    }

    Err(Error::InvalidPdf("xref section has no trailer".to_string()))
}

/// Parse `nnnnnnnnnn ggggg n` leniently. Unreadable entries become free so
/// the numbering of the rest of the subsection stays intact.
fn parse_entry(line: &str) -> XRefEntry {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 {
        log::warn!("Malformed xref entry: {:?}", line);
        return XRefEntry::free(0, 65535);
    }
    match (parts[0].parse::<u64>(), parts[1].parse::<u16>()) {
        (Ok(offset), Ok(generation)) => {
            let in_use = parts[2].starts_with(['n', 'N']);
            XRefEntry::new(offset, generation, in_use)
        },
        _ => {
            log::warn!("Unreadable xref entry: {:?}", line);
            XRefEntry::free(0, 65535)
        },
    }
}

/// Line iterator over raw bytes that accepts CR, LF and CRLF endings and
/// reports the byte position of each line.
struct ByteLines<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteLines<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn peek(&self) -> Option<(usize, String)> {
        let mut copy = ByteLines {
            data: self.data,
            pos: self.pos,
        };
        copy.next()
    }
}

impl Iterator for ByteLines<'_> {
    type Item = (usize, String);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }
        let start = self.pos;
        let rest = &self.data[start..];
        let end = rest
            .iter()
            .position(|&c| c == b'\r' || c == b'\n')
            .unwrap_or(rest.len());
        let mut next = start + end;
        if rest.get(end) == Some(&b'\r') && rest.get(end + 1) == Some(&b'\n') {
            next += 2;
        } else if end < rest.len() {
            next += 1;
        }
        self.pos = next;
        Some((start, String::from_utf8_lossy(&rest[..end]).into_owned()))
    }
}

/// Split text on CR, LF and CRLF.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match rest.find(['\r', '\n']) {
            Some(pos) => {
                lines.push(&rest[..pos]);
                let skip = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[pos + skip..];
            },
            None => {
                lines.push(rest);
                break;
            },
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectRef;
    use std::io::Cursor;

    const SIMPLE: &[u8] = b"%PDF-1.4\n\
1 0 obj\n<< /Type /Catalog >>\nendobj\n\
xref\n\
0 2\n\
0000000000 65535 f \n\
0000000009 00000 n \n\
trailer\n\
<< /Size 2 /Root 1 0 R >>\n\
startxref\n\
45\n\
%%EOF\n";

    #[test]
    fn test_find_xref_offset_valid() {
        let mut cursor = Cursor::new(SIMPLE);
        assert_eq!(find_xref_offset(&mut cursor).unwrap(), 45);
    }

    #[test]
    fn test_find_xref_offset_cr_line_endings() {
        let pdf = b"%PDF-1.4\rtrailer\r<<>>\rstartxref\r123\r%%EOF";
        let mut cursor = Cursor::new(&pdf[..]);
        assert_eq!(find_xref_offset(&mut cursor).unwrap(), 123);
    }

    #[test]
    fn test_find_xref_offset_no_startxref() {
        let mut cursor = Cursor::new(&b"%PDF-1.4\nxref\n0 1\n"[..]);
        assert!(matches!(find_xref_offset(&mut cursor), Err(Error::InvalidXref)));
    }

    #[test]
    fn test_parse_traditional_xref() {
        let mut cursor = Cursor::new(SIMPLE);
        let xref = parse_xref(&mut cursor, 45).unwrap();

        assert_eq!(xref.len(), 2);
        assert_eq!(xref.get(0), Some(&XRefEntry::free(0, 65535)));
        assert_eq!(xref.get(1), Some(&XRefEntry::in_use(9, 0)));

        let trailer = xref.trailer().unwrap();
        assert_eq!(trailer["Size"].as_integer(), Some(2));
        assert_eq!(trailer["Root"].as_reference(), Some(ObjectRef::new(1, 0)));
    }

    #[test]
    fn test_parse_multiple_subsections() {
        let data = b"xref\n0 1\n0000000000 65535 f \n3 2\n0000000100 00000 n \n0000000200 00002 n \ntrailer\n<< /Size 5 >>\n";
        let mut cursor = Cursor::new(&data[..]);
        let xref = parse_xref(&mut cursor, 0).unwrap();
        assert_eq!(xref.get(3), Some(&XRefEntry::in_use(100, 0)));
        assert_eq!(xref.get(4), Some(&XRefEntry::in_use(200, 2)));
        assert!(xref.get(1).is_none());
    }

    #[test]
    fn test_short_subsection_stops_at_trailer() {
        let data = b"xref\n0 3\n0000000000 65535 f \ntrailer\n<< /Size 3 >>\n";
        let mut cursor = Cursor::new(&data[..]);
        let xref = parse_xref(&mut cursor, 0).unwrap();
        assert_eq!(xref.len(), 1);
        assert!(xref.trailer().is_some());
    }

    #[test]
    fn test_prev_chain_merges_older_entries() {
        let mut data = Vec::new();
        data.extend_from_slice(b"xref\n0 2\n0000000000 65535 f \n0000000010 00000 n \ntrailer\n<< /Size 2 >>\n");
        let second = data.len();
        data.extend_from_slice(
            b"xref\n1 2\n0000000500 00000 n \n0000000600 00000 n \ntrailer\n<< /Size 3 /Prev 0 /Root 2 0 R >>\n",
        );

        let mut cursor = Cursor::new(&data[..]);
        let xref = parse_xref(&mut cursor, second as u64).unwrap();
        // Newer section wins for object 1
        assert_eq!(xref.get(1), Some(&XRefEntry::in_use(500, 0)));
        assert_eq!(xref.get(0), Some(&XRefEntry::free(0, 65535)));
        assert_eq!(xref.get(2), Some(&XRefEntry::in_use(600, 0)));
        assert!(xref.trailer().unwrap().contains_key("Root"));
    }

    #[test]
    fn test_xref_stream_is_unsupported() {
        let data = b"12 0 obj\n<< /Type /XRef >>\nstream\n";
        let mut cursor = Cursor::new(&data[..]);
        assert!(matches!(parse_xref(&mut cursor, 0), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_garbage_at_offset_is_invalid() {
        let mut cursor = Cursor::new(&b"hello world"[..]);
        assert!(matches!(parse_xref(&mut cursor, 0), Err(Error::InvalidXref)));
    }

    #[test]
    fn test_in_use_entries_sorted_by_offset() {
        let mut table = CrossRefTable::new();
        table.add_entry(0, XRefEntry::free(0, 65535));
        table.add_entry(2, XRefEntry::in_use(300, 0));
        table.add_entry(1, XRefEntry::in_use(100, 0));
        let numbers: Vec<u32> = table.in_use_entries().iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_split_lines_mixed_endings() {
        assert_eq!(split_lines("a\rb\r\nc\nd"), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_subsection_past_object_limit() {
        let data = b"xref\n4294967295 1\n0000000010 00000 n \ntrailer\n<< /Size 2 >>\n";
        let mut cursor = Cursor::new(&data[..]);
        assert!(matches!(parse_xref(&mut cursor, 0), Err(Error::InvalidPdf(_))));

        let data = b"xref\n8388607 1\n0000000010 00000 n \ntrailer\n<< /Size 8388608 >>\n";
        let mut cursor = Cursor::new(&data[..]);
        assert!(parse_xref(&mut cursor, 0).unwrap().get(8_388_607).is_some());
    }
}
