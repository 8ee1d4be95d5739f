//! Integration tests for document serialization.

use paged_pdf::parser::parse_indirect_object;
use paged_pdf::{Dictionary, DocumentIndex, DocumentSerializer, Error, Object, ObjectRef};

fn catalog_and_page() -> (DocumentIndex, ObjectRef) {
    let mut index = DocumentIndex::new();
    let page = index.allocate().unwrap();
    let mut catalog = Dictionary::new();
    catalog.insert("Type".to_string(), Object::Name("Catalog".to_string()));
    catalog.insert("Pages".to_string(), Object::Reference(page));
    let catalog_ref = index.register(Object::Dictionary(catalog)).unwrap();

    let mut page_dict = Dictionary::new();
    page_dict.insert("Type".to_string(), Object::Name("Page".to_string()));
    index.assign(page, Object::Dictionary(page_dict)).unwrap();
    (index, catalog_ref)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn startxref_value(bytes: &[u8]) -> usize {
    let pos = bytes.windows(9).rposition(|w| w == b"startxref").unwrap();
    let tail = String::from_utf8_lossy(&bytes[pos + 9..]).to_string();
    tail.split_whitespace().next().unwrap().parse().unwrap()
}

#[test]
fn test_two_objects_without_outline() {
    let (index, catalog) = catalog_and_page();
    let out = DocumentSerializer::new()
        .serialize(&index, b"%PDF-1.7\n", Some(catalog), None)
        .unwrap();

    assert!(out.warnings.is_empty());
    let bytes = &out.bytes;
    assert!(find(bytes, b"/Size 3").is_some());
    assert!(find(bytes, b"/Info").is_none());
    assert_eq!(startxref_value(bytes), out.xref_offset);
    assert_eq!(&bytes[out.xref_offset..out.xref_offset + 4], b"xref");
    assert!(bytes.ends_with(b"%%EOF\n"));
}

#[test]
fn test_xref_entries_are_twenty_bytes_and_point_at_objects() {
    let (index, catalog) = catalog_and_page();
    let out = DocumentSerializer::new()
        .serialize(&index, b"%PDF-1.7\n", Some(catalog), None)
        .unwrap();
    let bytes = &out.bytes;

    let table = &bytes[out.xref_offset..];
    let subsection = b"xref\n0 3\n";
    assert!(table.starts_with(subsection));
    let entries = &table[subsection.len()..subsection.len() + 3 * 20];
    assert_eq!(&entries[..20], b"0000000000 65535 f \n");

    for (number, entry) in entries.chunks(20).enumerate().skip(1) {
        assert_eq!(&entry[17..], b"n \n");
        let offset: usize = std::str::from_utf8(&entry[..10]).unwrap().parse().unwrap();
        let (_, (reference, _)) = parse_indirect_object(&bytes[offset..]).unwrap();
        assert_eq!(reference.id as usize, number);
    }
    assert!(table[subsection.len() + 60..].starts_with(b"trailer"));
}

#[test]
fn test_serialize_then_parse_recovers_objects() {
    let (mut index, catalog) = catalog_and_page();
    index.register(Object::Stream {
        dict: Dictionary::new(),
        data: bytes::Bytes::from_static(b"BT /F1 12 Tf (Hi) Tj ET"),
    })
    .unwrap();
    let out = DocumentSerializer::new()
        .serialize(&index, b"%PDF-1.7\n", Some(catalog), None)
        .unwrap();

    // Streams come first
    let stream_pos = find(&out.bytes, b"3 0 obj").unwrap();
    let catalog_pos = find(&out.bytes, b"2 0 obj").unwrap();
    assert!(stream_pos < catalog_pos);

    for (reference, original) in index.iter() {
        let header = format!("{} {} obj", reference.id, reference.gen);
        let pos = find(&out.bytes, header.as_bytes()).unwrap();
        let (_, (parsed_ref, parsed)) = parse_indirect_object(&out.bytes[pos..]).unwrap();
        assert_eq!(parsed_ref, reference);
        match (original, &parsed) {
            (Object::Stream { data, .. }, Object::Stream { dict, data: parsed_data }) => {
                assert_eq!(data, parsed_data);
                assert_eq!(dict.get("Length"), Some(&Object::Integer(data.len() as i64)));
            },
            _ => assert_eq!(original, &parsed),
        }
    }
}

#[test]
fn test_missing_catalog_still_writes_file() {
    let mut index = DocumentIndex::new();
    index.register(Object::Integer(42)).unwrap();
    let out = DocumentSerializer::new()
        .serialize(&index, b"%PDF-1.7\n", None, None)
        .unwrap();

    assert!(matches!(out.warnings.as_slice(), [Error::MissingCatalog]));
    assert!(find(&out.bytes, b"/Root").is_none());
    assert!(find(&out.bytes, b"/Size 2").is_some());
}

#[test]
fn test_info_in_trailer() {
    let (mut index, catalog) = catalog_and_page();
    let mut info = Dictionary::new();
    info.insert("Producer".to_string(), Object::text_string("paged"));
    let info_ref = index.register(Object::Dictionary(info)).unwrap();

    let out = DocumentSerializer::new()
        .serialize(&index, b"%PDF-1.7\n", Some(catalog), Some(info_ref))
        .unwrap();
    assert!(find(&out.bytes, b"/Info 3 0 R").is_some());
    assert!(find(&out.bytes, b"/Size 4").is_some());
}
