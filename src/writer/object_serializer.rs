//! PDF object serialization.
//!
//! Serializes [`Object`] values to their byte representation (ISO 32000-1
//! section 7.3). When an object belongs to an encrypted document every string
//! and stream payload is passed through the [`EncryptionWriteHandler`] with
//! the owning object's number.

use std::collections::HashMap;
use std::io::{self, Write};

use crate::encryption::EncryptionWriteHandler;
use crate::object::{Object, ObjectRef};

/// Encryption context for one indirect object.
#[derive(Clone, Copy)]
struct Crypt<'a> {
    handler: &'a EncryptionWriteHandler,
    obj_num: u32,
}

/// Serializer for PDF objects.
///
/// Dictionary keys are written in sorted order so output is deterministic.
#[derive(Debug, Clone, Default)]
pub struct ObjectSerializer {
    /// Whether to use compact formatting (minimal whitespace)
    compact: bool,
}

impl ObjectSerializer {
    /// Create a new object serializer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact serializer (minimal whitespace).
    pub fn compact() -> Self {
        Self { compact: true }
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        // Writes into a Vec cannot fail.
        let _ = self.write_value(&mut buf, obj, None);
        buf
    }

    /// Serialize an object to a string (for debugging and tests).
    pub fn serialize_to_string(&self, obj: &Object) -> String {
        String::from_utf8_lossy(&self.serialize(obj)).to_string()
    }

    /// Write an object in the clear.
    pub fn write_object<W: Write>(&self, w: &mut W, obj: &Object) -> io::Result<()> {
        self.write_value(w, obj, None)
    }

    /// Write an object whose strings and streams are encrypted with the key of
    /// object `obj_num`.
    pub fn write_object_encrypted<W: Write>(
        &self,
        w: &mut W,
        obj: &Object,
        obj_num: u32,
        handler: &EncryptionWriteHandler,
    ) -> io::Result<()> {
        self.write_value(w, obj, Some(Crypt { handler, obj_num }))
    }

    /// Write an object, encrypting when a handler is given.
    pub fn write_object_with<W: Write>(
        &self,
        w: &mut W,
        obj: &Object,
        obj_num: u32,
        handler: Option<&EncryptionWriteHandler>,
    ) -> io::Result<()> {
        match handler {
            Some(handler) => self.write_object_encrypted(w, obj, obj_num, handler),
            None => self.write_object(w, obj),
        }
    }

    fn write_value<W: Write>(&self, w: &mut W, obj: &Object, crypt: Option<Crypt<'_>>) -> io::Result<()> {
        match obj {
            Object::Null => write!(w, "null"),
            Object::Boolean(b) => write!(w, "{}", if *b { "true" } else { "false" }),
            Object::Integer(i) => write!(w, "{}", i),
            Object::Real(r) => write_real(w, *r),
            Object::String(s) => match crypt {
                Some(c) => write_string(w, &c.handler.encrypt_string(s, c.obj_num, 0)),
                None => write_string(w, s),
            },
            Object::Name(n) => write_name(w, n),
            Object::Array(arr) => self.write_array(w, arr, crypt),
            Object::Dictionary(dict) => self.write_dictionary(w, dict, crypt),
            Object::Stream { dict, data } => self.write_stream(w, dict, data, crypt),
            Object::Reference(r) => write!(w, "{}", r),
        }
    }

    fn write_array<W: Write>(&self, w: &mut W, arr: &[Object], crypt: Option<Crypt<'_>>) -> io::Result<()> {
        write!(w, "[")?;
        for (i, obj) in arr.iter().enumerate() {
            if i > 0 {
                write!(w, " ")?;
            }
            self.write_value(w, obj, crypt)?;
        }
        write!(w, "]")
    }

    fn write_dictionary<W: Write>(
        &self,
        w: &mut W,
        dict: &HashMap<String, Object>,
        crypt: Option<Crypt<'_>>,
    ) -> io::Result<()> {
        write!(w, "<<")?;

        let mut keys: Vec<_> = dict.keys().collect();
        keys.sort();

        for key in keys {
            if let Some(value) = dict.get(key) {
                if self.compact {
                    write!(w, " ")?;
                } else {
                    write!(w, "\n  ")?;
                }
                write_name(w, key)?;
                write!(w, " ")?;
                self.write_value(w, value, crypt)?;
            }
        }

        if !self.compact && !dict.is_empty() {
            writeln!(w)?;
        }
        write!(w, ">>")
    }

    /// `/Length` always reflects the bytes actually written, after encryption.
    fn write_stream<W: Write>(
        &self,
        w: &mut W,
        dict: &HashMap<String, Object>,
        data: &[u8],
        crypt: Option<Crypt<'_>>,
    ) -> io::Result<()> {
        let encrypted;
        let payload = match crypt {
            Some(c) => {
                encrypted = c.handler.encrypt_stream(data, c.obj_num, 0);
                &encrypted[..]
            },
            None => data,
        };

        let mut dict_with_length = dict.clone();
        dict_with_length.insert("Length".to_string(), Object::Integer(payload.len() as i64));

        self.write_dictionary(w, &dict_with_length, crypt)?;
        write!(w, "\nstream\n")?;
        w.write_all(payload)?;
        write!(w, "\nendstream")
    }
}

/// Write a real number with at most five decimals, trailing zeros removed.
fn write_real<W: Write>(w: &mut W, value: f64) -> io::Result<()> {
    if value.fract() == 0.0 {
        write!(w, "{}", value as i64)
    } else {
        let formatted = format!("{:.5}", value);
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
        write!(w, "{}", trimmed)
    }
}

/// Write a PDF string: literal syntax for printable ASCII, hex otherwise.
fn write_string<W: Write>(w: &mut W, data: &[u8]) -> io::Result<()> {
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

/// Write a PDF name, escaping delimiters and non-regular bytes as `#XX`.
fn write_name<W: Write>(w: &mut W, name: &str) -> io::Result<()> {
    write!(w, "/")?;
    for byte in name.bytes() {
        match byte {
            b'!'
            | b'"'
            | b'$'..=b'&'
            | b'\''..=b'.'
            | b'0'..=b'9'
            | b';'
            | b'?'
            | b'@'
            | b'A'..=b'Z'
            | b'^'..=b'z'
            | b'|'
            | b'~' => w.write_all(&[byte])?,
            _ => write!(w, "#{:02X}", byte)?,
        }
    }
    Ok(())
}

/// Helper functions for building PDF objects.
impl ObjectSerializer {
    /// Create a Name object.
    pub fn name(s: &str) -> Object {
        Object::Name(s.to_string())
    }

    /// Create a String object from a Rust string.
    pub fn string(s: &str) -> Object {
        Object::String(s.as_bytes().to_vec())
    }

    /// Create a text string: UTF-16BE with a byte order mark.
    pub fn text_string(s: &str) -> Object {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in s.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes)
    }

    /// Create an Integer object.
    pub fn integer(i: i64) -> Object {
        Object::Integer(i)
    }

    /// Create a Real object.
    pub fn real(r: f64) -> Object {
        Object::Real(r)
    }

    /// Create an Array object.
    pub fn array(items: Vec<Object>) -> Object {
        Object::Array(items)
    }

    /// Create a Dictionary object.
    pub fn dict(entries: Vec<(&str, Object)>) -> Object {
        let map: HashMap<String, Object> = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Object::Dictionary(map)
    }

    /// Create a Stream object.
    pub fn stream(entries: Vec<(&str, Object)>, data: impl Into<bytes::Bytes>) -> Object {
        let dict = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Object::Stream {
            dict,
            data: data.into(),
        }
    }

    /// Reference to the object at a 0-based registry index.
    pub fn reference(index: usize) -> Object {
        Object::Reference(ObjectRef::from_index(index))
    }

    /// Create a rectangle array `[llx lly urx ury]`.
    pub fn rect(llx: f64, lly: f64, urx: f64, ury: f64) -> Object {
        Object::Array(vec![
            Object::Real(llx),
            Object::Real(lly),
            Object::Real(urx),
            Object::Real(ury),
        ])
    }
}
