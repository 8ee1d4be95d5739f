//! PDF object serialization.
//!
//! Serializes PDF objects to their byte representation. Dictionary entries
//! are written in insertion order.

use crate::object::{Dictionary, Object, ObjectRef};
use std::io::Write;

/// Serializer for PDF objects.
#[derive(Debug, Clone, Default)]
pub struct ObjectSerializer {
    /// Whether to use compact formatting (minimal whitespace)
    compact: bool,
}

impl ObjectSerializer {
    /// Create a serializer that puts each dictionary entry on its own line.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact serializer (minimal whitespace).
    pub fn compact() -> Self {
        Self { compact: true }
    }

    /// Create a serializer with the given formatting mode.
    pub fn with_compact(compact: bool) -> Self {
        Self { compact }
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_object(&mut buf, obj)?;
        Ok(buf)
    }

    /// Serialize an object to a string (for debugging).
    pub fn serialize_to_string(&self, obj: &Object) -> std::io::Result<String> {
        Ok(String::from_utf8_lossy(&self.serialize(obj)?).into_owned())
    }

    /// Serialize an indirect object definition.
    ///
    /// Format: `{id} {gen} obj\n{object}\nendobj\n`
    pub fn serialize_indirect(
        &self,
        reference: ObjectRef,
        obj: &Object,
    ) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_indirect(&mut buf, reference, obj)?;
        Ok(buf)
    }

    /// Write an indirect object definition to any writer.
    pub fn write_indirect<W: Write>(
        &self,
        w: &mut W,
        reference: ObjectRef,
        obj: &Object,
    ) -> std::io::Result<()> {
        writeln!(w, "{} {} obj", reference.id, reference.gen)?;
        self.write_object(w, obj)?;
        write!(w, "\nendobj\n")
    }

    /// Write an object to any writer.
    pub fn write_object<W: Write>(&self, w: &mut W, obj: &Object) -> std::io::Result<()> {
        match obj {
            Object::Null => write!(w, "null"),
            Object::Boolean(b) => write!(w, "{}", if *b { "true" } else { "false" }),
            Object::Integer(i) => write!(w, "{}", i),
            Object::Real(r) => self.write_real(w, *r),
            Object::String(s) => self.write_string(w, s),
            Object::Name(n) => self.write_name(w, n),
            Object::Array(arr) => self.write_array(w, arr),
            Object::Dictionary(dict) => self.write_dictionary(w, dict),
            Object::Stream { dict, data } => self.write_stream(w, dict, data),
            Object::Reference(r) => write!(w, "{} {} R", r.id, r.gen),
        }
    }

    /// Write a real number with at most 5 decimal places, trailing zeros trimmed.
    fn write_real<W: Write>(&self, w: &mut W, value: f64) -> std::io::Result<()> {
        if !value.is_finite() {
            log::warn!("Writing non-finite real {} as 0", value);
            return write!(w, "0");
        }
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            write!(w, "{}", value as i64)
        } else {
            let formatted = format!("{:.5}", value);
            let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
            match trimmed {
                "-0" | "" => write!(w, "0"),
                other => write!(w, "{}", other),
            }
        }
    }

    /// Write a PDF string.
    ///
    /// Printable ASCII uses literal syntax `(...)`; anything else (including
    /// UTF-16BE text strings) uses hex syntax `<...>`.
    fn write_string<W: Write>(&self, w: &mut W, data: &[u8]) -> std::io::Result<()> {
        let is_printable = data
            .iter()
            .all(|&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..=0x7E).contains(&b));

        if is_printable {
            write!(w, "(")?;
            for &byte in data {
                match byte {
                    b'(' => write!(w, "\\(")?,
                    b')' => write!(w, "\\)")?,
                    b'\\' => write!(w, "\\\\")?,
                    b'\n' => write!(w, "\\n")?,
                    b'\r' => write!(w, "\\r")?,
                    b'\t' => write!(w, "\\t")?,
                    _ => w.write_all(&[byte])?,
                }
            }
            write!(w, ")")
        } else {
            write!(w, "<")?;
            for byte in data {
                write!(w, "{:02X}", byte)?;
            }
            write!(w, ">")
        }
    }

    /// Write a PDF name, escaping delimiters and non-regular bytes as `#xx`.
    fn write_name<W: Write>(&self, w: &mut W, name: &str) -> std::io::Result<()> {
        write!(w, "/")?;
        for byte in name.bytes() {
            match byte {
                b'!'
                | b'"'
                | b'$'..=b'&'
                | b'\''
                | b'*'..=b'.'
                | b'0'..=b';'
                | b'='
                | b'?'
                | b'@'
                | b'A'..=b'Z'
                | b'\\'
                | b'^'..=b'z'
                | b'|'
                | b'~' => w.write_all(&[byte])?,
                _ => write!(w, "#{:02X}", byte)?,
            }
        }
        Ok(())
    }

    fn write_array<W: Write>(&self, w: &mut W, arr: &[Object]) -> std::io::Result<()> {
        write!(w, "[")?;
        for (i, obj) in arr.iter().enumerate() {
            if i > 0 {
                write!(w, " ")?;
            }
            self.write_object(w, obj)?;
        }
        write!(w, "]")
    }

    fn write_dictionary<W: Write>(&self, w: &mut W, dict: &Dictionary) -> std::io::Result<()> {
        write!(w, "<<")?;
        for (key, value) in dict {
            if !self.compact {
                write!(w, "\n  ")?;
            }
            self.write_name(w, key)?;
            write!(w, " ")?;
            self.write_object(w, value)?;
        }
        if !self.compact && !dict.is_empty() {
            writeln!(w)?;
        }
        write!(w, ">>")
    }

    /// Write a stream. `/Length` is always rewritten to the payload size.
    fn write_stream<W: Write>(
        &self,
        w: &mut W,
        dict: &Dictionary,
        data: &[u8],
    ) -> std::io::Result<()> {
        let mut dict_with_length = dict.clone();
        dict_with_length.insert("Length".to_string(), Object::Integer(data.len() as i64));

        self.write_dictionary(w, &dict_with_length)?;
        write!(w, "\nstream\n")?;
        w.write_all(data)?;
        write!(w, "\nendstream")
    }
}

/// Helper functions for building PDF objects.
impl ObjectSerializer {
    /// Create a Name object.
    pub fn name(s: &str) -> Object {
        Object::Name(s.to_string())
    }

    /// Create a Dictionary object, keeping the entries in the given order.
    pub fn dict(entries: Vec<(&str, Object)>) -> Object {
        Object::Dictionary(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    /// Create a rectangle array [x, y, width, height] -> [llx, lly, urx, ury].
    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Object {
        Object::Array(vec![
            Object::Real(x),
            Object::Real(y),
            Object::Real(x + width),
            Object::Real(y + height),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_object;

    #[test]
    fn test_serialize_primitives() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::Null).unwrap(), "null");
        assert_eq!(s.serialize_to_string(&Object::Boolean(false)).unwrap(), "false");
        assert_eq!(s.serialize_to_string(&Object::Integer(-123)).unwrap(), "-123");
    }

    #[test]
    fn test_serialize_real() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::Real(3.14258)).unwrap(), "3.14258");
        assert_eq!(s.serialize_to_string(&Object::Real(1.0)).unwrap(), "1");
        assert_eq!(s.serialize_to_string(&Object::Real(0.5)).unwrap(), "0.5");
        assert_eq!(s.serialize_to_string(&Object::Real(-0.000001)).unwrap(), "0");
        assert_eq!(s.serialize_to_string(&Object::Real(f64::NAN)).unwrap(), "0");
    }

    #[test]
    fn test_serialize_string() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::String(b"Hello".to_vec())).unwrap(), "(Hello)");
        assert_eq!(
            s.serialize_to_string(&Object::String(b"Test (parens) \\".to_vec())).unwrap(),
            "(Test \\(parens\\) \\\\)"
        );
    }

    #[test]
    fn test_serialize_utf16_text_as_hex() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::text_string("Ü")).unwrap(), "<FEFF00DC>");
    }

    #[test]
    fn test_serialize_name_with_special_chars() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&ObjectSerializer::name("Type")).unwrap(), "/Type");
        assert_eq!(
            s.serialize_to_string(&ObjectSerializer::name("Name With Space")).unwrap(),
            "/Name#20With#20Space"
        );
        assert_eq!(s.serialize_to_string(&ObjectSerializer::name("a/b#c")).unwrap(), "/a#2Fb#23c");
    }

    #[test]
    fn test_serialize_dictionary_keeps_insertion_order() {
        let s = ObjectSerializer::compact();
        let dict = ObjectSerializer::dict(vec![
            ("Title", Object::String(b"A".to_vec())),
            ("Parent", Object::Reference(ObjectRef::new(3, 0))),
            ("Count", Object::Integer(2)),
        ]);
        assert_eq!(s.serialize_to_string(&dict).unwrap(), "<</Title (A)/Parent 3 0 R/Count 2>>");
    }

    #[test]
    fn test_serialize_pretty_dictionary() {
        let s = ObjectSerializer::new();
        let dict = ObjectSerializer::dict(vec![("Type", ObjectSerializer::name("Outlines"))]);
        assert_eq!(s.serialize_to_string(&dict).unwrap(), "<<\n  /Type /Outlines\n>>");
        assert_eq!(s.serialize_to_string(&ObjectSerializer::dict(vec![])).unwrap(), "<<>>");
    }

    #[test]
    fn test_serialize_indirect() {
        let s = ObjectSerializer::compact();
        let bytes = s.serialize_indirect(ObjectRef::new(1, 0), &Object::Integer(42)).unwrap();
        assert_eq!(bytes, b"1 0 obj\n42\nendobj\n");
    }

    #[test]
    fn test_rect_helper() {
        let rect = ObjectSerializer::rect(0.0, 0.0, 612.0, 792.0);
        assert_eq!(
            ObjectSerializer::compact().serialize_to_string(&rect).unwrap(),
            "[0 0 612 792]"
        );
    }

    #[test]
    fn test_serialize_stream_overrides_length() {
        let s = ObjectSerializer::compact();
        let mut dict = Dictionary::new();
        dict.insert("Length".to_string(), Object::Reference(ObjectRef::new(9, 0)));
        dict.insert("Filter".to_string(), ObjectSerializer::name("FlateDecode"));

        let stream = Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"stream data"),
        };
        assert_eq!(
            s.serialize_to_string(&stream).unwrap(),
            "<</Length 11/Filter /FlateDecode>>\nstream\nstream data\nendstream"
        );
    }

    #[test]
    fn test_output_parses_back() {
        for compact in [true, false] {
            let s = ObjectSerializer::with_compact(compact);
            let original = ObjectSerializer::dict(vec![
                ("Type", ObjectSerializer::name("Page")),
                ("MediaBox", Object::Array(vec![Object::Integer(0), Object::Real(792.5)])),
                ("Title", Object::text_string("Größe (1)")),
                ("Kids", Object::Array(vec![Object::Reference(ObjectRef::new(4, 0))])),
            ]);
            let bytes = s.serialize(&original).unwrap();
            let (_, parsed) = parse_object(&bytes).unwrap();
            assert_eq!(parsed, original);
        }
    }
}
