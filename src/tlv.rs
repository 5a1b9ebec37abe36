//! Matter TLV encoding and decoding.
//!
//! Attribute payloads and command fields travel as Matter TLV: a one byte
//! control field (element type in the low 5 bits, tag control in the high 3),
//! an optional context tag byte, then a little-endian value. Containers
//! (struct/array/list) nest until an end-of-container byte.
//!
//! [TlvWriter] builds payloads:
//! ```
//! # use rmatter::tlv;
//! let mut w = tlv::TlvWriter::new();
//! w.start_struct_anon();
//! w.put_u8(0, 128);
//! w.put_str(1, "kitchen");
//! w.end_container();
//! let payload = w.finish();
//! ```
//!
//! [decode] parses a payload into a [TlvElement] tree; the `get_*` accessors
//! walk nested containers by context-tag path.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

const T_INT8: u8 = 0x00;
const T_INT16: u8 = 0x01;
const T_INT32: u8 = 0x02;
const T_UINT8: u8 = 0x04;
const T_UINT16: u8 = 0x05;
const T_UINT32: u8 = 0x06;
const T_UINT64: u8 = 0x07;
const T_BOOL_FALSE: u8 = 0x08;
const T_BOOL_TRUE: u8 = 0x09;
const T_UTF8_L1: u8 = 0x0c;
const T_OCTETS_L1: u8 = 0x10;
const T_OCTETS_L2: u8 = 0x11;
const T_NULL: u8 = 0x14;
const T_STRUCT: u8 = 0x15;
const T_ARRAY: u8 = 0x16;
const T_LIST: u8 = 0x17;
const T_END: u8 = 0x18;

const TAG_CTX: u8 = 1 << 5;

/// Streaming TLV payload builder.
pub struct TlvWriter {
    buf: Vec<u8>,
}

impl TlvWriter {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(256),
        }
    }

    fn ctrl(&mut self, tp: u8, tag: u8) {
        self.buf.push(TAG_CTX | tp);
        self.buf.push(tag);
    }

    pub fn put_u8(&mut self, tag: u8, v: u8) {
        self.ctrl(T_UINT8, tag);
        self.buf.push(v);
    }
    pub fn put_u16(&mut self, tag: u8, v: u16) {
        self.ctrl(T_UINT16, tag);
        let _ = self.buf.write_u16::<LittleEndian>(v);
    }
    pub fn put_u32(&mut self, tag: u8, v: u32) {
        self.ctrl(T_UINT32, tag);
        let _ = self.buf.write_u32::<LittleEndian>(v);
    }
    pub fn put_u64(&mut self, tag: u8, v: u64) {
        self.ctrl(T_UINT64, tag);
        let _ = self.buf.write_u64::<LittleEndian>(v);
    }
    pub fn put_i8(&mut self, tag: u8, v: i8) {
        self.ctrl(T_INT8, tag);
        let _ = self.buf.write_i8(v);
    }
    pub fn put_i16(&mut self, tag: u8, v: i16) {
        self.ctrl(T_INT16, tag);
        let _ = self.buf.write_i16::<LittleEndian>(v);
    }
    pub fn put_bool(&mut self, tag: u8, v: bool) {
        self.buf.push(TAG_CTX | if v { T_BOOL_TRUE } else { T_BOOL_FALSE });
        self.buf.push(tag);
    }
    pub fn put_str(&mut self, tag: u8, v: &str) {
        let bytes = v.as_bytes();
        self.ctrl(T_UTF8_L1, tag);
        self.buf.push(bytes.len() as u8);
        self.buf.extend_from_slice(bytes);
    }
    pub fn put_octets(&mut self, tag: u8, v: &[u8]) {
        if v.len() > 0xff {
            self.ctrl(T_OCTETS_L2, tag);
            let _ = self.buf.write_u16::<LittleEndian>(v.len() as u16);
        } else {
            self.ctrl(T_OCTETS_L1, tag);
            self.buf.push(v.len() as u8);
        }
        self.buf.extend_from_slice(v);
    }
    pub fn put_null(&mut self, tag: u8) {
        self.ctrl(T_NULL, tag);
    }

    // anonymous (untagged) elements, used for bare attribute values

    pub fn put_u8_anon(&mut self, v: u8) {
        self.buf.push(T_UINT8);
        self.buf.push(v);
    }
    pub fn put_u16_anon(&mut self, v: u16) {
        self.buf.push(T_UINT16);
        let _ = self.buf.write_u16::<LittleEndian>(v);
    }
    pub fn put_u64_anon(&mut self, v: u64) {
        self.buf.push(T_UINT64);
        let _ = self.buf.write_u64::<LittleEndian>(v);
    }
    pub fn put_i16_anon(&mut self, v: i16) {
        self.buf.push(T_INT16);
        let _ = self.buf.write_i16::<LittleEndian>(v);
    }
    pub fn put_bool_anon(&mut self, v: bool) {
        self.buf.push(if v { T_BOOL_TRUE } else { T_BOOL_FALSE });
    }
    pub fn put_str_anon(&mut self, v: &str) {
        let bytes = v.as_bytes();
        self.buf.push(T_UTF8_L1);
        self.buf.push(bytes.len() as u8);
        self.buf.extend_from_slice(bytes);
    }
    pub fn put_null_anon(&mut self) {
        self.buf.push(T_NULL);
    }
    pub fn put_octets_anon(&mut self, v: &[u8]) {
        if v.len() > 0xff {
            self.buf.push(T_OCTETS_L2);
            let _ = self.buf.write_u16::<LittleEndian>(v.len() as u16);
        } else {
            self.buf.push(T_OCTETS_L1);
            self.buf.push(v.len() as u8);
        }
        self.buf.extend_from_slice(v);
    }

    pub fn start_struct(&mut self, tag: u8) {
        self.ctrl(T_STRUCT, tag);
    }
    pub fn start_struct_anon(&mut self) {
        self.buf.push(T_STRUCT);
    }
    pub fn start_array(&mut self, tag: u8) {
        self.ctrl(T_ARRAY, tag);
    }
    pub fn start_array_anon(&mut self) {
        self.buf.push(T_ARRAY);
    }
    pub fn start_list(&mut self, tag: u8) {
        self.ctrl(T_LIST, tag);
    }
    pub fn end_container(&mut self) {
        self.buf.push(T_END);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for TlvWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Value of a decoded TLV element.
#[derive(Debug, Clone, PartialEq)]
pub enum TlvValue {
    Unsigned(u64),
    Signed(i64),
    Bool(bool),
    Utf8(String),
    Octets(Vec<u8>),
    Container(Vec<TlvElement>),
    Null,
}

/// A decoded element: context tag plus value. Anonymous elements carry tag 0.
#[derive(Debug, Clone, PartialEq)]
pub struct TlvElement {
    pub tag: u8,
    pub value: TlvValue,
}

impl TlvElement {
    /// Walk nested containers by context-tag path. An empty path returns
    /// this element's own value.
    pub fn get(&self, path: &[u8]) -> Option<&TlvValue> {
        match path.split_first() {
            None => Some(&self.value),
            Some((head, rest)) => {
                if let TlvValue::Container(items) = &self.value {
                    items.iter().find(|i| i.tag == *head)?.get(rest)
                } else {
                    None
                }
            }
        }
    }

    pub fn get_unsigned(&self, path: &[u8]) -> Option<u64> {
        match self.get(path)? {
            TlvValue::Unsigned(v) => Some(*v),
            TlvValue::Signed(v) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }

    pub fn get_signed(&self, path: &[u8]) -> Option<i64> {
        match self.get(path)? {
            TlvValue::Signed(v) => Some(*v),
            TlvValue::Unsigned(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn get_bool(&self, path: &[u8]) -> Option<bool> {
        if let TlvValue::Bool(v) = self.get(path)? {
            Some(*v)
        } else {
            None
        }
    }

    pub fn get_str(&self, path: &[u8]) -> Option<&str> {
        if let TlvValue::Utf8(s) = self.get(path)? {
            Some(s)
        } else {
            None
        }
    }

    pub fn get_octets(&self, path: &[u8]) -> Option<&[u8]> {
        if let TlvValue::Octets(o) = self.get(path)? {
            Some(o)
        } else {
            None
        }
    }

    pub fn get_container(&self, path: &[u8]) -> Option<&[TlvElement]> {
        if let TlvValue::Container(items) = self.get(path)? {
            Some(items)
        } else {
            None
        }
    }
}

fn read_ctx_tag(tag_ctrl: u8, cur: &mut Cursor<&[u8]>) -> std::io::Result<u8> {
    if tag_ctrl == 1 {
        cur.read_u8()
    } else {
        Ok(0)
    }
}

fn bad(msg: String) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg)
}

fn decode_into(cur: &mut Cursor<&[u8]>, out: &mut Vec<TlvElement>) -> std::io::Result<()> {
    while cur.position() < cur.get_ref().len() as u64 {
        let first = cur.read_u8()?;
        let tp = first & 0x1f;
        let tag_ctrl = first >> 5;
        if tp == T_END {
            return Ok(());
        }
        let tag = read_ctx_tag(tag_ctrl, cur)?;
        let value = match tp {
            T_INT8 => TlvValue::Signed(cur.read_i8()? as i64),
            T_INT16 => TlvValue::Signed(cur.read_i16::<LittleEndian>()? as i64),
            T_INT32 => TlvValue::Signed(cur.read_i32::<LittleEndian>()? as i64),
            T_UINT8 => TlvValue::Unsigned(cur.read_u8()? as u64),
            T_UINT16 => TlvValue::Unsigned(cur.read_u16::<LittleEndian>()? as u64),
            T_UINT32 => TlvValue::Unsigned(cur.read_u32::<LittleEndian>()? as u64),
            T_UINT64 => TlvValue::Unsigned(cur.read_u64::<LittleEndian>()?),
            T_BOOL_FALSE => TlvValue::Bool(false),
            T_BOOL_TRUE => TlvValue::Bool(true),
            T_NULL => TlvValue::Null,
            T_UTF8_L1 => {
                let len = cur.read_u8()? as usize;
                let mut raw = vec![0; len];
                cur.read_exact(&mut raw)?;
                TlvValue::Utf8(String::from_utf8(raw).map_err(|e| bad(e.to_string()))?)
            }
            T_OCTETS_L1 | T_OCTETS_L2 => {
                let len = if tp == T_OCTETS_L1 {
                    cur.read_u8()? as usize
                } else {
                    cur.read_u16::<LittleEndian>()? as usize
                };
                let mut raw = vec![0; len];
                cur.read_exact(&mut raw)?;
                TlvValue::Octets(raw)
            }
            T_STRUCT | T_ARRAY | T_LIST => {
                let mut inner = Vec::new();
                decode_into(cur, &mut inner)?;
                TlvValue::Container(inner)
            }
            _ => return Err(bad(format!("unknown tlv element type 0x{:x}", tp))),
        };
        out.push(TlvElement { tag, value });
    }
    Ok(())
}

/// Decode a raw TLV payload. A payload with a single top-level element yields
/// that element; multiple top-level elements are wrapped in an anonymous
/// container.
pub fn decode(data: &[u8]) -> std::io::Result<TlvElement> {
    let mut cur = Cursor::new(data);
    let mut items = Vec::new();
    decode_into(&mut cur, &mut items)?;
    if items.len() == 1 {
        Ok(items.remove(0))
    } else {
        Ok(TlvElement {
            tag: 0,
            value: TlvValue::Container(items),
        })
    }
}
