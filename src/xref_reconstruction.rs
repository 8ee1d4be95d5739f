//! Cross-reference table reconstruction for damaged PDFs.
//!
//! When the xref table is missing, corrupt or stored as a stream, the file is
//! scanned for `N G obj` headers and a table is rebuilt from their offsets.

use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef, MAX_OBJECT_NUMBER};
use crate::parser::{parse_indirect_object, parse_object};
use crate::xref::{CrossRefTable, XRefEntry};
use lazy_static::lazy_static;
use std::io::{Read, Seek, SeekFrom};

lazy_static! {
    /// Matches object headers such as `12 0 obj`
    static ref RE_OBJ_PATTERN: regex::bytes::Regex =
        regex::bytes::Regex::new(r"(\d+)\s+(\d+)\s+obj\b").expect("valid object header regex");

    /// Matches the start of a trailer dictionary
    static ref RE_TRAILER: regex::bytes::Regex =
        regex::bytes::Regex::new(r"trailer\s*<<").expect("valid trailer regex");
}

/// Rebuild the cross-reference table by scanning the whole file.
///
/// When an object number appears several times (incremental updates), the
/// last occurrence wins. The trailer is the last `trailer << ... >>` in the
/// file; without one, a minimal trailer pointing at the first catalog found
/// is synthesized.
///
/// # Errors
///
/// Returns `Error::InvalidPdf` when no object header is found, when an
/// object number exceeds [`MAX_OBJECT_NUMBER`], or when no trailer exists and
/// no catalog can be identified.
pub fn reconstruct_xref<R: Read + Seek>(reader: &mut R) -> Result<CrossRefTable> {
    log::info!("Reconstructing xref table by scanning file");

    reader.seek(SeekFrom::Start(0))?;
    let mut contents = Vec::new();
    reader.read_to_end(&mut contents)?;

    let mut xref = CrossRefTable::new();
    let mut objects_found = 0;

    for capture in RE_OBJ_PATTERN.captures_iter(&contents) {
        let (Some(full), Some(num), Some(gen)) = (capture.get(0), capture.get(1), capture.get(2))
        else {
            continue;
        };
        // Require a delimiter before the object number so "112 0 obj" is not
        // also matched as "12 0 obj"
        if full.start() > 0 && contents[full.start() - 1].is_ascii_digit() {
            continue;
        }
        let parsed = std::str::from_utf8(num.as_bytes())
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .zip(std::str::from_utf8(gen.as_bytes()).ok().and_then(|s| s.parse::<u16>().ok()));
        let Some((obj_num, gen_num)) = parsed else {
            log::warn!("Unreadable object header at offset {}", full.start());
            continue;
        };

        if !looks_like_object_start(&contents[full.end()..]) {
            log::debug!("Skipping false positive object header at offset {}", full.start());
            continue;
        }

        let obj_num = match u32::try_from(obj_num) {
            Ok(n) if n <= MAX_OBJECT_NUMBER => n,
            _ => {
                return Err(Error::InvalidPdf(format!(
                    "object number {} at offset {} exceeds {}",
                    obj_num,
                    full.start(),
                    MAX_OBJECT_NUMBER
                )))
            },
        };
        xref.add_entry(obj_num, XRefEntry::in_use(full.start() as u64, gen_num));
        objects_found += 1;
    }

    log::info!("Reconstructed xref with {} objects", objects_found);
    if objects_found == 0 {
        return Err(Error::InvalidPdf("No objects found during xref reconstruction".to_string()));
    }

    let trailer = find_trailer(&contents).map_or_else(|| minimal_trailer(&contents, &xref), Ok)?;
    xref.set_trailer(trailer);
    Ok(xref)
}

fn looks_like_object_start(after_header: &[u8]) -> bool {
    match after_header.iter().find(|c| !c.is_ascii_whitespace()) {
        Some(&c) => matches!(c, b'<' | b'[' | b'(' | b'/' | b't' | b'f' | b'n' | b'-' | b'+' | b'.')
            || c.is_ascii_digit(),
        None => false,
    }
}

fn find_trailer(contents: &[u8]) -> Option<Dictionary> {
    let mat = RE_TRAILER.find_iter(contents).last()?;
    let dict_start = mat.start() + "trailer".len();
    match parse_object(&contents[dict_start..]) {
        Ok((_, Object::Dictionary(dict))) => Some(dict),
        _ => {
            log::warn!("Failed to parse trailer dictionary at offset {}", mat.start());
            None
        },
    }
}

fn minimal_trailer(contents: &[u8], xref: &CrossRefTable) -> Result<Dictionary> {
    log::info!("No trailer found; searching for the catalog");

    let catalog = xref.in_use_entries().into_iter().find_map(|(_, entry)| {
        let start = usize::try_from(entry.offset).ok()?;
        match parse_indirect_object(contents.get(start..)?) {
            Ok((_, (reference, obj))) if obj.has_type("Catalog") => Some(reference),
            _ => None,
        }
    });
    let catalog: ObjectRef = catalog
        .ok_or_else(|| Error::InvalidPdf("Could not find catalog in reconstructed xref".to_string()))?;

    let mut trailer = Dictionary::new();
    trailer.insert("Size".to_string(), Object::Integer(xref.len() as i64 + 1));
    trailer.insert("Root".to_string(), Object::Reference(catalog));
    Ok(trailer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reconstruct_finds_objects_and_trailer() {
        let pdf = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\ntrailer\n<< /Size 3 /Root 1 0 R >>\n%%EOF";
        let mut cursor = Cursor::new(&pdf[..]);
        let xref = reconstruct_xref(&mut cursor).unwrap();

        assert_eq!(xref.get(1).unwrap().offset, 9);
        assert!(xref.get(2).unwrap().in_use);
        assert_eq!(
            xref.trailer().unwrap()["Root"].as_reference(),
            Some(ObjectRef::new(1, 0))
        );
    }

    #[test]
    fn test_reconstruct_synthesizes_trailer() {
        let pdf = b"%PDF-1.4\n3 0 obj\n(hello)\nendobj\n7 0 obj\n<< /Type /Catalog >>\nendobj\n";
        let mut cursor = Cursor::new(&pdf[..]);
        let xref = reconstruct_xref(&mut cursor).unwrap();
        assert_eq!(
            xref.trailer().unwrap()["Root"].as_reference(),
            Some(ObjectRef::new(7, 0))
        );
    }

    #[test]
    fn test_reconstruct_last_definition_wins() {
        let pdf = b"1 0 obj\n(old)\nendobj\n1 0 obj\n(new)\nendobj\ntrailer\n<< /Root 1 0 R >>";
        let mut cursor = Cursor::new(&pdf[..]);
        let xref = reconstruct_xref(&mut cursor).unwrap();
        assert_eq!(xref.get(1).unwrap().offset, 21);
    }

    #[test]
    fn test_reconstruct_skips_false_positives() {
        let pdf = b"1 0 obj\n<< /Type /Catalog >>\nendobj\n(text 5 0 obj ) 9 0 obj endobj";
        let mut cursor = Cursor::new(&pdf[..]);
        let xref = reconstruct_xref(&mut cursor).unwrap();
        // "5 0 obj )" is followed by ')', "9 0 obj endobj" by 'e'
        assert!(xref.get(5).is_none());
        assert!(xref.get(9).is_none());
    }

    #[test]
    fn test_reconstruct_empty_file_fails() {
        let mut cursor = Cursor::new(&b"not a pdf"[..]);
        assert!(reconstruct_xref(&mut cursor).is_err());
    }

    #[test]
    fn test_reconstruct_rejects_huge_object_numbers() {
        let pdf = b"1 0 obj\n<< /Type /Catalog >>\nendobj\n9999999 0 obj\n<< >>\nendobj";
        let mut cursor = Cursor::new(&pdf[..]);
        assert!(matches!(reconstruct_xref(&mut cursor), Err(Error::InvalidPdf(_))));
    }
}
