//! Setup payload parsing for device onboarding.
//!
//! Devices advertise their pairing parameters either as an 11 or 21 digit
//! manual pairing code or as a QR payload starting with `MT:`. Both carry the
//! discriminator used to find the device and the passcode used to establish
//! the initial secure session.

use crate::error::CommissioningError;

const QR_PREFIX: &str = "MT:";
const BASE38_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-.";

/// Discovery transports a device advertises in its QR payload.
pub const DISCOVERY_SOFT_AP: u8 = 1 << 0;
pub const DISCOVERY_BLE: u8 = 1 << 1;
pub const DISCOVERY_ON_NETWORK: u8 = 1 << 2;

/// Pairing parameters extracted from a setup code.
///
/// Manual codes only carry the discriminator and passcode; the remaining
/// fields stay zero for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupPayload {
    pub version: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub commissioning_flow: u8,
    pub discovery_capabilities: u8,
    pub discriminator: u16,
    pub passcode: u32,
}

/// Parse either payload form, dispatching on the `MT:` prefix.
pub fn parse_setup_code(code: &str) -> Result<SetupPayload, CommissioningError> {
    if let Some(qr) = code.strip_prefix(QR_PREFIX) {
        parse_qr_payload(qr)
    } else {
        parse_manual_code(code)
    }
}

/// Decode a manual pairing code into discriminator and passcode.
///
/// Only the first 11 digits matter; the 21 digit variant appends vendor and
/// product ids that the commissioner does not need. The discriminator
/// recovered here is the 4 bit short form shifted into the high bits of the
/// 12 bit field.
pub fn parse_manual_code(code: &str) -> Result<SetupPayload, CommissioningError> {
    let norm: String = code.chars().filter(|c| *c != '-').collect();
    if norm.len() < 10 || !norm.chars().all(|c| c.is_ascii_digit()) {
        return Err(CommissioningError::SetupPayloadInvalid(format!(
            "manual code {:?} is not a 11 or 21 digit code",
            code
        )));
    }
    let digits = |r: std::ops::Range<usize>| -> Result<u32, CommissioningError> {
        norm[r].parse::<u32>().map_err(|e| {
            CommissioningError::SetupPayloadInvalid(format!("manual code group: {e}"))
        })
    };
    let first = digits(0..1)?;
    let second = digits(1..6)?;
    let third = digits(6..10)?;
    let passcode = second & 0x3fff | (third << 14);
    let discriminator = (((first & 3) << 10) | (second >> 6) & 0x300) as u16;
    Ok(SetupPayload {
        version: 0,
        vendor_id: 0,
        product_id: 0,
        commissioning_flow: 0,
        discovery_capabilities: 0,
        discriminator,
        passcode,
    })
}

fn base38_decode(s: &str) -> Result<Vec<u8>, CommissioningError> {
    let err = |msg: String| CommissioningError::SetupPayloadInvalid(msg);
    let chars = s.as_bytes();
    let mut out = Vec::with_capacity(chars.len() * 3 / 5 + 3);
    for chunk in chars.chunks(5) {
        let mut n: u32 = 0;
        for c in chunk.iter().rev() {
            let idx = BASE38_ALPHABET
                .iter()
                .position(|a| a == c)
                .ok_or_else(|| err(format!("invalid base38 character {:?}", *c as char)))?;
            n = n
                .checked_mul(38)
                .and_then(|n| n.checked_add(idx as u32))
                .ok_or_else(|| err("base38 chunk overflow".into()))?;
        }
        let nbytes = match chunk.len() {
            5 => 3,
            4 => 2,
            2 => 1,
            other => return Err(err(format!("invalid base38 chunk length {other}"))),
        };
        for i in 0..nbytes {
            out.push((n >> (8 * i)) as u8);
        }
    }
    Ok(out)
}

/// LSB-first bit reader over the decoded QR bytes.
struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn take(&mut self, nbits: usize) -> Result<u32, CommissioningError> {
        let mut v: u32 = 0;
        for i in 0..nbits {
            let byte = self.pos / 8;
            if byte >= self.data.len() {
                return Err(CommissioningError::SetupPayloadInvalid(
                    "qr payload truncated".into(),
                ));
            }
            let bit = (self.data[byte] >> (self.pos % 8)) & 1;
            v |= (bit as u32) << i;
            self.pos += 1;
        }
        Ok(v)
    }
}

/// Decode the packed bit fields of a QR payload (prefix already stripped).
pub fn parse_qr_payload(qr: &str) -> Result<SetupPayload, CommissioningError> {
    let bytes = base38_decode(qr)?;
    let mut r = BitReader {
        data: &bytes,
        pos: 0,
    };
    let version = r.take(3)? as u8;
    let vendor_id = r.take(16)? as u16;
    let product_id = r.take(16)? as u16;
    let commissioning_flow = r.take(2)? as u8;
    let discovery_capabilities = r.take(8)? as u8;
    let discriminator = r.take(12)? as u16;
    let passcode = r.take(27)?;
    if passcode == 0 {
        return Err(CommissioningError::SetupPayloadInvalid(
            "qr payload has zero passcode".into(),
        ));
    }
    Ok(SetupPayload {
        version,
        vendor_id,
        product_id,
        commissioning_flow,
        discovery_capabilities,
        discriminator,
        passcode,
    })
}
