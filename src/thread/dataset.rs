//! Thread operational dataset codec.
//!
//! A dataset is a flat TLV blob: one byte tag, one byte length, value. Tag
//! values and field lengths are fixed by the Thread spec; a border router
//! rejects datasets that deviate from them.

use crate::error::ThreadError;
use rand::RngCore;
use std::time::{SystemTime, UNIX_EPOCH};

pub const TAG_CHANNEL: u8 = 0x00;
pub const TAG_PAN_ID: u8 = 0x01;
pub const TAG_EXTENDED_PAN_ID: u8 = 0x02;
pub const TAG_NETWORK_NAME: u8 = 0x03;
pub const TAG_PSKC: u8 = 0x04;
pub const TAG_NETWORK_KEY: u8 = 0x05;
pub const TAG_MESH_LOCAL_PREFIX: u8 = 0x07;
pub const TAG_SECURITY_POLICY: u8 = 0x0c;
pub const TAG_ACTIVE_TIMESTAMP: u8 = 0x0e;
pub const TAG_DELAY_TIMER: u8 = 0x34;
pub const TAG_CHANNEL_MASK: u8 = 0x35;

const GENERATED_CHANNEL: u16 = 17;
const GENERATED_NETWORK_NAME: &str = "Espressif-TBR";
const GENERATED_CHANNEL_MASK: [u8; 6] = [0x00, 0x04, 0x00, 0x1f, 0xff, 0xe0];
const GENERATED_SECURITY_POLICY: [u8; 4] = [0x02, 0xa0, 0xf7, 0x78];

/// Parsed dataset. Field order is preserved so re-encoding a pulled dataset
/// is byte-identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadDataset {
    fields: Vec<(u8, Vec<u8>)>,
}

impl ThreadDataset {
    pub fn parse(data: &[u8]) -> Result<Self, ThreadError> {
        let mut fields = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            if pos + 2 > data.len() {
                return Err(ThreadError::DatasetMalformed(format!(
                    "truncated header at offset {pos}"
                )));
            }
            let tag = data[pos];
            let len = data[pos + 1] as usize;
            pos += 2;
            if pos + len > data.len() {
                return Err(ThreadError::DatasetMalformed(format!(
                    "field {tag:#04x} runs past the end"
                )));
            }
            fields.push((tag, data[pos..pos + len].to_vec()));
            pos += len;
        }
        Ok(Self { fields })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (tag, value) in &self.fields {
            out.push(*tag);
            out.push(value.len() as u8);
            out.extend_from_slice(value);
        }
        out
    }

    pub fn get(&self, tag: u8) -> Option<&[u8]> {
        self.fields
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, v)| v.as_slice())
    }

    fn set(&mut self, tag: u8, value: Vec<u8>) {
        match self.fields.iter_mut().find(|(t, _)| *t == tag) {
            Some((_, v)) => *v = value,
            None => self.fields.push((tag, value)),
        }
    }

    pub fn network_name(&self) -> Option<String> {
        self.get(TAG_NETWORK_NAME)
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }

    pub fn active_timestamp(&self) -> Option<u64> {
        let v = self.get(TAG_ACTIVE_TIMESTAMP)?;
        let bytes: [u8; 8] = v.try_into().ok()?;
        Some(u64::from_be_bytes(bytes))
    }

    pub fn set_active_timestamp(&mut self, timestamp: u64) {
        self.set(TAG_ACTIVE_TIMESTAMP, timestamp.to_be_bytes().to_vec());
    }

    pub fn increase_active_timestamp(&mut self, by: u64) {
        let current = self.active_timestamp().unwrap_or(0);
        self.set_active_timestamp(current.saturating_add(by));
    }

    /// Instructs the mesh to switch to this dataset after `ms` milliseconds.
    pub fn add_delay_timer(&mut self, ms: u32) {
        self.set(TAG_DELAY_TIMER, ms.to_be_bytes().to_vec());
    }

    /// Fresh random dataset for a border router that has never formed a
    /// network. Channel and policy are fixed; all key material is random.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut ext_pan = [0u8; 8];
        rng.fill_bytes(&mut ext_pan);
        let mut prefix = [0u8; 8];
        rng.fill_bytes(&mut prefix);
        let mut key = [0u8; 16];
        rng.fill_bytes(&mut key);
        let mut pan = [0u8; 2];
        rng.fill_bytes(&mut pan);
        let mut pskc = [0u8; 16];
        rng.fill_bytes(&mut pskc);

        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let channel = [0x00, (GENERATED_CHANNEL >> 8) as u8, GENERATED_CHANNEL as u8];
        let fields = vec![
            (TAG_ACTIVE_TIMESTAMP, now_ms.to_be_bytes().to_vec()),
            (TAG_CHANNEL, channel.to_vec()),
            (TAG_CHANNEL_MASK, GENERATED_CHANNEL_MASK.to_vec()),
            (TAG_EXTENDED_PAN_ID, ext_pan.to_vec()),
            (TAG_MESH_LOCAL_PREFIX, prefix.to_vec()),
            (TAG_NETWORK_KEY, key.to_vec()),
            (TAG_NETWORK_NAME, GENERATED_NETWORK_NAME.as_bytes().to_vec()),
            (TAG_PAN_ID, pan.to_vec()),
            (TAG_PSKC, pskc.to_vec()),
            (TAG_SECURITY_POLICY, GENERATED_SECURITY_POLICY.to_vec()),
        ];
        Self { fields }
    }
}
