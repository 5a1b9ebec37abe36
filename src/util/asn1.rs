//! Minimal DER encoder for the certification request builder.
//!
//! Sequence lengths are back-patched: `start_seq` reserves a single length
//! byte and `end_seq` widens it to the long form when the content outgrew it.

use std::io::Result;

fn write_len(buf: &mut Vec<u8>, len: u8) {
    buf.push(len);
}

#[derive(Debug, Clone)]
struct Frame {
    pos: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Encoder {
    buffer: Vec<u8>,
    stack: Vec<Frame>,
}

impl Encoder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            stack: Vec::new(),
        }
    }

    pub fn start_seq(&mut self, tag: u8) {
        self.buffer.push(tag);
        self.stack.push(Frame {
            pos: self.buffer.len() - 1,
        });
        write_len(&mut self.buffer, 0);
    }

    pub fn end_seq(&mut self) {
        if let Some(f) = self.stack.pop() {
            let s = self.buffer.len() - f.pos - 2;
            if s < 0x80 {
                self.buffer[f.pos + 1] = s as u8;
            } else if s <= 0xff {
                self.buffer[f.pos + 1] = 0x81;
                self.buffer.insert(f.pos + 2, s as u8);
            } else {
                self.buffer[f.pos + 1] = 0x82;
                self.buffer.insert(f.pos + 2, (s >> 8) as u8);
                self.buffer.insert(f.pos + 3, s as u8);
            }
        }
    }

    pub fn write_int(&mut self, val: u32) -> Result<()> {
        self.buffer.push(0x02);
        if val < 0x80 {
            write_len(&mut self.buffer, 1);
            self.buffer.push(val as u8);
        } else if val < 0x8000 {
            write_len(&mut self.buffer, 2);
            self.buffer.push((val >> 8) as u8);
            self.buffer.push(val as u8);
        } else {
            return Err(std::io::Error::from(std::io::ErrorKind::Unsupported));
        }
        Ok(())
    }

    pub fn write_oid(&mut self, oid: &const_oid::ObjectIdentifier) {
        self.write_with_tag(0x06, oid.as_bytes());
    }

    pub fn write_utf8_string(&mut self, val: &str) {
        self.write_with_tag(0x0c, val.as_bytes());
    }

    /// BIT STRING with zero unused bits.
    pub fn write_bit_string(&mut self, val: &[u8]) {
        self.buffer.push(0x03);
        write_len(&mut self.buffer, (val.len() + 1) as u8);
        self.buffer.push(0);
        self.buffer.extend_from_slice(val);
    }

    /// Append pre-encoded DER as-is.
    pub fn write_raw(&mut self, der: &[u8]) {
        self.buffer.extend_from_slice(der);
    }

    fn write_with_tag(&mut self, tag: u8, val: &[u8]) {
        self.buffer.push(tag);
        write_len(&mut self.buffer, val.len() as u8);
        self.buffer.extend_from_slice(val);
    }

    pub fn encode(mut self) -> Vec<u8> {
        while !self.stack.is_empty() {
            self.end_seq();
        }
        self.buffer
    }
}
