//! Value codecs shared by the cluster clients.
//!
//! Wire scaling: temperatures travel as hundredths of a degree in a signed
//! 16 bit field; level, hue and saturation travel in [0, 254] with a 2.55
//! scale from their user-facing ranges (percent, or degrees via percent of
//! the wheel).

use crate::error::ClusterError;
use crate::tlv::{self, TlvElement, TlvValue, TlvWriter};

pub const WIRE_MAX: u8 = 254;
const SCALE: f32 = 2.55;

pub fn temperature_to_wire(celsius: f32) -> i16 {
    (celsius * 100.0).round() as i16
}

pub fn wire_to_temperature(wire: i16) -> f32 {
    wire as f32 / 100.0
}

pub fn percent_to_wire(percent: f32) -> u8 {
    let clamped = percent.clamp(0.0, 100.0);
    ((clamped * SCALE).round() as u16).min(WIRE_MAX as u16) as u8
}

pub fn wire_to_percent(wire: u8) -> f32 {
    wire as f32 / SCALE
}

pub fn hue_degrees_to_wire(degrees: f32) -> u8 {
    percent_to_wire(degrees.rem_euclid(360.0) / 3.6)
}

pub fn wire_to_hue_degrees(wire: u8) -> f32 {
    wire_to_percent(wire) * 3.6
}

pub(crate) fn parse(payload: &[u8]) -> Result<TlvElement, ClusterError> {
    tlv::decode(payload).map_err(|e| ClusterError::InvalidPayload(e.to_string()))
}

/// On/off style decode: boolean element, or integer with 0 = false.
pub(crate) fn decode_bool(payload: &[u8]) -> Result<bool, ClusterError> {
    let e = parse(payload)?;
    match e.value {
        TlvValue::Bool(v) => Ok(v),
        TlvValue::Unsigned(v) => Ok(v != 0),
        TlvValue::Signed(v) => Ok(v != 0),
        other => Err(ClusterError::InvalidPayload(format!(
            "expected bool, got {other:?}"
        ))),
    }
}

pub(crate) fn decode_u64(payload: &[u8]) -> Result<u64, ClusterError> {
    parse(payload)?
        .get_unsigned(&[])
        .ok_or_else(|| ClusterError::InvalidPayload("expected unsigned integer".into()))
}

pub(crate) fn decode_u32(payload: &[u8]) -> Result<u32, ClusterError> {
    u32::try_from(decode_u64(payload)?)
        .map_err(|_| ClusterError::InvalidPayload("value exceeds u32".into()))
}

pub(crate) fn decode_u16(payload: &[u8]) -> Result<u16, ClusterError> {
    u16::try_from(decode_u64(payload)?)
        .map_err(|_| ClusterError::InvalidPayload("value exceeds u16".into()))
}

pub(crate) fn decode_u8(payload: &[u8]) -> Result<u8, ClusterError> {
    u8::try_from(decode_u64(payload)?)
        .map_err(|_| ClusterError::InvalidPayload("value exceeds u8".into()))
}

pub(crate) fn decode_i16(payload: &[u8]) -> Result<i16, ClusterError> {
    let v = parse(payload)?
        .get_signed(&[])
        .ok_or_else(|| ClusterError::InvalidPayload("expected signed integer".into()))?;
    i16::try_from(v).map_err(|_| ClusterError::InvalidPayload("value exceeds i16".into()))
}

pub(crate) fn decode_string(payload: &[u8]) -> Result<String, ClusterError> {
    parse(payload)?
        .get_str(&[])
        .map(str::to_owned)
        .ok_or_else(|| ClusterError::InvalidPayload("expected utf8 string".into()))
}

pub(crate) fn decode_octets(payload: &[u8]) -> Result<Vec<u8>, ClusterError> {
    parse(payload)?
        .get_octets(&[])
        .map(<[u8]>::to_vec)
        .ok_or_else(|| ClusterError::InvalidPayload("expected octet string".into()))
}

/// List attributes arrive as an array of unsigned element values.
pub(crate) fn decode_unsigned_list(payload: &[u8]) -> Result<Vec<u64>, ClusterError> {
    let e = parse(payload)?;
    let items = e
        .get_container(&[])
        .ok_or_else(|| ClusterError::InvalidPayload("expected array".into()))?;
    items
        .iter()
        .map(|i| {
            i.get_unsigned(&[])
                .ok_or_else(|| ClusterError::InvalidPayload("expected unsigned element".into()))
        })
        .collect()
}

pub(crate) fn encode_u8(v: u8) -> Vec<u8> {
    let mut w = TlvWriter::new();
    w.put_u8_anon(v);
    w.finish()
}

pub(crate) fn encode_i16(v: i16) -> Vec<u8> {
    let mut w = TlvWriter::new();
    w.put_i16_anon(v);
    w.finish()
}

#[cfg(test)]
pub(crate) fn encode_string(v: &str) -> Vec<u8> {
    let mut w = TlvWriter::new();
    w.put_str_anon(v);
    w.finish()
}

/// JSON rendition of a scalar attribute payload for cache snapshots.
/// Containers, octet strings and nulls are not snapshotted.
pub(crate) fn json_snapshot(payload: &[u8]) -> Option<serde_json::Value> {
    match tlv::decode(payload).ok()?.value {
        TlvValue::Unsigned(v) => Some(serde_json::Value::from(v)),
        TlvValue::Signed(v) => Some(serde_json::Value::from(v)),
        TlvValue::Bool(v) => Some(serde_json::Value::from(v)),
        TlvValue::Utf8(ref s) => Some(serde_json::Value::from(s.as_str())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_scale_round_trips() {
        for t in [-40.0f32, -0.5, 0.0, 21.37, 100.0] {
            let wire = temperature_to_wire(t);
            assert!((wire_to_temperature(wire) - t).abs() < 0.005);
        }
        assert_eq!(temperature_to_wire(21.37), 2137);
        assert_eq!(temperature_to_wire(-23.5), -2350);
    }

    #[test]
    fn percent_scale_round_trips() {
        for p in 0..=100u8 {
            let wire = percent_to_wire(p as f32);
            assert!(wire <= WIRE_MAX);
            let back = wire_to_percent(wire);
            assert!((back - p as f32).abs() < 0.5, "p={p} back={back}");
        }
        assert_eq!(percent_to_wire(100.0), WIRE_MAX);
        assert_eq!(percent_to_wire(150.0), WIRE_MAX);
        assert_eq!(percent_to_wire(-3.0), 0);
    }

    #[test]
    fn hue_scale_round_trips() {
        for deg in [0.0f32, 90.0, 180.0, 270.0, 359.0] {
            let wire = hue_degrees_to_wire(deg);
            assert!(wire <= WIRE_MAX);
            let back = wire_to_hue_degrees(wire);
            assert!((back - deg).abs() < 1.5, "deg={deg} back={back}");
        }
    }

    #[test]
    fn bool_decodes_from_integer_codes() {
        assert!(!decode_bool(&encode_u8(0)).unwrap());
        assert!(decode_bool(&encode_u8(1)).unwrap());
        assert!(decode_bool(&encode_u8(7)).unwrap());
    }

    #[test]
    fn string_round_trip() {
        let payload = encode_string("node-1");
        assert_eq!(decode_string(&payload).unwrap(), "node-1");
    }

    #[test]
    fn signed_round_trip() {
        assert_eq!(decode_i16(&encode_i16(-2350)).unwrap(), -2350);
    }

    #[test]
    fn json_snapshot_covers_scalars_only() {
        assert_eq!(json_snapshot(&encode_u8(254)), Some(serde_json::json!(254)));
        assert_eq!(json_snapshot(&encode_i16(-2350)), Some(serde_json::json!(-2350)));
        assert_eq!(
            json_snapshot(&encode_string("node-1")),
            Some(serde_json::json!("node-1"))
        );
        let mut w = TlvWriter::new();
        w.start_struct_anon();
        w.end_container();
        assert_eq!(json_snapshot(&w.finish()), None);
    }
}
