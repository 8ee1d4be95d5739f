//! PDF object parser.
//!
//! Combines lexer tokens into complete objects using recursive descent:
//! read a token, decide what kind of object starts there, and recurse into
//! arrays and dictionaries.

use crate::error::{Error, Result};
use crate::lexer::{skip_ws, token, Token};
use crate::object::{Dictionary, Object, ObjectRef, MAX_OBJECT_NUMBER};
use nom::IResult;

fn parse_fail(input: &[u8], kind: nom::error::ErrorKind) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, kind))
}

/// Decode escape sequences in the raw bytes of a literal string.
///
/// Handles `\n \r \t \b \f \( \) \\`, octal `\ddd` (1-3 digits) and
/// backslash line continuations. Unknown escapes keep the backslash.
///
/// ```
/// # use paged_pdf::parser::decode_literal_string_escapes;
/// assert_eq!(decode_literal_string_escapes(b"a\\(b\\)"), b"a(b)");
/// assert_eq!(decode_literal_string_escapes(b"\\247"), b"\xa7");
/// ```
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        if raw[i] != b'\\' || i + 1 >= raw.len() {
            out.push(raw[i]);
            i += 1;
            continue;
        }

        let escaped = raw[i + 1];
        i += 2;
        match escaped {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'(' | b')' | b'\\' => out.push(escaped),
            b'\n' => {},
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'0'..=b'7' => {
                let mut code = u32::from(escaped - b'0');
                let mut digits = 1;
                while digits < 3 {
                    match raw.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            code = code * 8 + u32::from(d - b'0');
                            i += 1;
                            digits += 1;
                        },
                        _ => break,
                    }
                }
                out.push((code & 0xFF) as u8);
            },
            other => {
                out.push(b'\\');
                out.push(other);
            },
        }
    }

    out
}

/// Decode the body of a hex string. Whitespace is ignored and an odd final
/// digit is padded with 0.
///
/// ```
/// # use paged_pdf::parser::decode_hex;
/// assert_eq!(decode_hex(b"48656C6C6F").unwrap(), b"Hello");
/// assert_eq!(decode_hex(b"7").unwrap(), vec![0x70]);
/// ```
pub fn decode_hex(hex_bytes: &[u8]) -> Result<Vec<u8>> {
    let digits: Vec<u8> = hex_bytes
        .iter()
        .copied()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    digits
        .chunks(2)
        .map(|chunk| {
            let hi = hex_value(chunk[0])?;
            let lo = match chunk.get(1) {
                Some(&c) => hex_value(c)?,
                None => 0,
            };
            Ok(hi << 4 | lo)
        })
        .collect()
}

fn hex_value(c: u8) -> Result<u8> {
    (c as char)
        .to_digit(16)
        .map(|v| v as u8)
        .ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: format!("invalid hex digit '{}'", c as char),
        })
}

/// Parse one PDF object.
///
/// ```
/// use paged_pdf::parser::parse_object;
/// use paged_pdf::object::{Object, ObjectRef};
///
/// let (_, obj) = parse_object(b"[1 0 R /Name]").unwrap();
/// assert_eq!(
///     obj,
///     Object::Array(vec![
///         Object::Reference(ObjectRef::new(1, 0)),
///         Object::Name("Name".to_string()),
///     ])
/// );
/// ```
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    let (rest, tok) = token(input)?;

    match tok {
        Token::Null => Ok((rest, Object::Null)),
        Token::True => Ok((rest, Object::Boolean(true))),
        Token::False => Ok((rest, Object::Boolean(false))),
        Token::Integer(i) => {
            // `num gen R` is a reference; anything else is a plain integer
            if let Ok((after_gen, Token::Integer(gen))) = token(rest) {
                if let Ok((after_r, Token::R)) = token(after_gen) {
                    if (0..=i64::from(u32::MAX)).contains(&i) && (0..=65535).contains(&gen) {
                        let reference = ObjectRef::new(i as u32, gen as u16);
                        return Ok((after_r, Object::Reference(reference)));
                    }
                }
            }
            Ok((rest, Object::Integer(i)))
        },
        Token::Real(r) => Ok((rest, Object::Real(r))),
        Token::LiteralString(raw) => Ok((rest, Object::String(decode_literal_string_escapes(raw)))),
        Token::HexString(raw) => match decode_hex(raw) {
            Ok(decoded) => Ok((rest, Object::String(decoded))),
            Err(_) => Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::HexDigit,
            ))),
        },
        Token::Name(name) => Ok((rest, Object::Name(name))),
        Token::ArrayStart => parse_array(rest),
        Token::DictStart => {
            let (rest, dict) = parse_dictionary(rest)?;
            match token(rest) {
                Ok((stream_input, Token::StreamStart)) => {
                    let (rest, data) = parse_stream_data(stream_input, &dict)?;
                    Ok((
                        rest,
                        Object::Stream {
                            dict,
                            data: bytes::Bytes::from(data),
                        },
                    ))
                },
                _ => Ok((rest, Object::Dictionary(dict))),
            }
        },
        _ => Err(parse_fail(input, nom::error::ErrorKind::Tag)),
    }
}

fn parse_array(mut input: &[u8]) -> IResult<&[u8], Object> {
    let mut items = Vec::new();
    loop {
        if let Ok((rest, Token::ArrayEnd)) = token(input) {
            return Ok((rest, Object::Array(items)));
        }
        let (rest, item) = parse_object(input)?;
        items.push(item);
        input = rest;
    }
}

fn parse_dictionary(mut input: &[u8]) -> IResult<&[u8], Dictionary> {
    let mut dict = Dictionary::new();
    loop {
        let (rest, tok) = token(input)?;
        match tok {
            Token::DictEnd => return Ok((rest, dict)),
            Token::Name(key) => {
                let (rest, value) = parse_object(rest)?;
                dict.insert(key, value);
                input = rest;
            },
            _ => return Err(parse_fail(input, nom::error::ErrorKind::Tag)),
        }
    }
}

/// Read stream bytes following the `stream` keyword.
///
/// A direct `/Length` is trusted when `endstream` follows it; otherwise (an
/// indirect or wrong length) the data runs up to the next `endstream` minus
/// its preceding end-of-line marker.
fn parse_stream_data<'a>(input: &'a [u8], dict: &Dictionary) -> IResult<&'a [u8], Vec<u8>> {
    let body = if let Some(rest) = input.strip_prefix(b"\r\n") {
        rest
    } else if let Some(rest) = input.strip_prefix(b"\n") {
        rest
    } else if let Some(rest) = input.strip_prefix(b"\r") {
        log::warn!("stream keyword followed by a bare CR");
        rest
    } else {
        input
    };

    if let Some(length) = dict.get("Length").and_then(Object::as_integer) {
        let length = usize::try_from(length).unwrap_or(usize::MAX);
        if length <= body.len() {
            if let Ok((rest, Token::StreamEnd)) = token(&body[length..]) {
                return Ok((rest, body[..length].to_vec()));
            }
        }
        log::debug!("stream /Length {} does not end at endstream; scanning", length);
    }

    let keyword = b"endstream";
    let pos = body
        .windows(keyword.len())
        .position(|w| w == keyword)
        .ok_or_else(|| parse_fail(body, nom::error::ErrorKind::Eof))?;

    let mut data = &body[..pos];
    if let Some(trimmed) = data.strip_suffix(b"\r\n") {
        data = trimmed;
    } else if let Some(trimmed) = data.strip_suffix(b"\n").or_else(|| data.strip_suffix(b"\r")) {
        data = trimmed;
    }
    Ok((&body[pos + keyword.len()..], data.to_vec()))
}

/// Parse an indirect object definition: `num gen obj <object> endobj`.
///
/// Returns the object's reference, the object, and the input after `endobj`.
pub fn parse_indirect_object(input: &[u8]) -> IResult<&[u8], (ObjectRef, Object)> {
    let (rest, num) = token(input)?;
    let (rest, gen) = token(rest)?;
    let (rest, keyword) = token(rest)?;

    let reference = match (num, gen, keyword) {
        (Token::Integer(num), Token::Integer(gen), Token::ObjStart)
            if (1..=i64::from(MAX_OBJECT_NUMBER)).contains(&num)
                && (0..=65535).contains(&gen) =>
        {
            ObjectRef::new(num as u32, gen as u16)
        },
        _ => return Err(parse_fail(input, nom::error::ErrorKind::Tag)),
    };

    let (rest, object) = parse_object(rest)?;
    let rest = match token(rest) {
        Ok((after, Token::ObjEnd)) => after,
        _ => {
            log::warn!("object {} is missing its endobj keyword", reference);
            skip_ws(rest)
        },
    };

    Ok((rest, (reference, object)))
}
