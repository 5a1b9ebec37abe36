//! Capability and topology cache.
//!
//! Commissioning records what it learned about each device so later cluster
//! interactions do not have to re-walk the descriptor cluster. Entries are
//! persisted as JSON and live until [CapabilityCache::remove_device] is
//! called; there is no expiry.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

/// Everything learned about one device during commissioning, keyed by the
/// fabric group id and the device's operational node id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub group_id: String,
    pub device_id: u64,
    #[serde(default)]
    pub matter_node_id: Option<String>,
    #[serde(default)]
    pub vendor_id: Option<u16>,
    #[serde(default)]
    pub product_id: Option<u16>,
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub software_version: Option<u32>,
    #[serde(default)]
    pub software_version_string: Option<String>,
    #[serde(default)]
    pub device_types: Vec<u64>,
    #[serde(default)]
    pub endpoints: Vec<u16>,
    /// Server cluster ids per endpoint.
    #[serde(default)]
    pub servers: HashMap<u16, Vec<u32>>,
    /// Client cluster ids per endpoint.
    #[serde(default)]
    pub clients: HashMap<u16, Vec<u32>>,
    /// Last seen attribute values, keyed "endpoint:cluster:attribute".
    #[serde(default)]
    pub attribute_snapshots: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub is_rainmaker: bool,
}

impl DeviceRecord {
    pub fn new(group_id: &str, device_id: u64) -> Self {
        Self {
            group_id: group_id.to_owned(),
            device_id,
            matter_node_id: None,
            vendor_id: None,
            product_id: None,
            vendor_name: None,
            product_name: None,
            serial_number: None,
            software_version: None,
            software_version_string: None,
            device_types: Vec::new(),
            endpoints: Vec::new(),
            servers: HashMap::new(),
            clients: HashMap::new(),
            attribute_snapshots: HashMap::new(),
            is_rainmaker: false,
        }
    }

    fn snapshot_key(endpoint: u16, cluster: u32, attribute: u32) -> String {
        format!("{}:{}:{}", endpoint, cluster, attribute)
    }
}

pub struct CapabilityCache {
    path: Option<String>,
    records: Mutex<Vec<DeviceRecord>>,
}

impl CapabilityCache {
    /// Loads the cache from `path`, starting empty when the file does not
    /// exist yet.
    pub fn load(path: &str) -> Result<Self> {
        let records = match std::fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).context("parsing capability cache")?,
            Err(_) => Vec::new(),
        };
        Ok(Self {
            path: Some(path.to_owned()),
            records: Mutex::new(records),
        })
    }

    /// In-memory cache without a backing file.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: Mutex::new(Vec::new()),
        }
    }

    fn save(&self, records: &[DeviceRecord]) -> Result<()> {
        if let Some(path) = &self.path {
            let data = serde_json::to_string_pretty(records)?;
            std::fs::write(path, data).context(format!("writing capability cache to {}", path))?;
        }
        Ok(())
    }

    /// Inserts or replaces the record for (group, device).
    pub fn upsert(&self, record: DeviceRecord) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        match records
            .iter()
            .position(|r| r.group_id == record.group_id && r.device_id == record.device_id)
        {
            Some(pos) => records[pos] = record,
            None => records.push(record),
        }
        self.save(&records)
    }

    pub fn record(&self, group_id: &str, device_id: u64) -> Option<DeviceRecord> {
        let records = self.records.lock().unwrap();
        records
            .iter()
            .find(|r| r.group_id == group_id && r.device_id == device_id)
            .cloned()
    }

    /// The only way entries leave the cache.
    pub fn remove_device(&self, group_id: &str, device_id: u64) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        records.retain(|r| !(r.group_id == group_id && r.device_id == device_id));
        self.save(&records)
    }

    pub fn devices_in_group(&self, group_id: &str) -> Vec<u64> {
        let records = self.records.lock().unwrap();
        records
            .iter()
            .filter(|r| r.group_id == group_id)
            .map(|r| r.device_id)
            .collect()
    }

    /// First endpoint on which the device serves `cluster`.
    pub fn server_endpoint(&self, group_id: &str, device_id: u64, cluster: u32) -> Option<u16> {
        let record = self.record(group_id, device_id)?;
        let mut endpoints: Vec<u16> = record
            .servers
            .iter()
            .filter(|(_, clusters)| clusters.contains(&cluster))
            .map(|(ep, _)| *ep)
            .collect();
        endpoints.sort_unstable();
        endpoints.first().copied()
    }

    pub fn is_rainmaker(&self, group_id: &str, device_id: u64) -> bool {
        self.record(group_id, device_id)
            .map(|r| r.is_rainmaker)
            .unwrap_or(false)
    }

    pub fn is_tbr_supported(&self, group_id: &str, device_id: u64) -> bool {
        self.server_endpoint(
            group_id,
            device_id,
            crate::clusters::defs::cluster::THREAD_BORDER_ROUTER_MANAGEMENT,
        )
        .is_some()
    }

    pub fn set_attribute_snapshot(
        &self,
        group_id: &str,
        device_id: u64,
        endpoint: u16,
        cluster: u32,
        attribute: u32,
        value: serde_json::Value,
    ) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        if let Some(r) = records
            .iter_mut()
            .find(|r| r.group_id == group_id && r.device_id == device_id)
        {
            r.attribute_snapshots
                .insert(DeviceRecord::snapshot_key(endpoint, cluster, attribute), value);
        }
        self.save(&records)
    }

    pub fn attribute_snapshot(
        &self,
        group_id: &str,
        device_id: u64,
        endpoint: u16,
        cluster: u32,
        attribute: u32,
    ) -> Option<serde_json::Value> {
        let record = self.record(group_id, device_id)?;
        record
            .attribute_snapshots
            .get(&DeviceRecord::snapshot_key(endpoint, cluster, attribute))
            .cloned()
    }
}

/// Fabric-wide vendor id, keyed by group id. Read often, written once per
/// fabric, so readers share the lock.
#[derive(Default)]
pub struct VendorIdStore {
    ids: RwLock<HashMap<String, u16>>,
}

impl VendorIdStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, group_id: &str, vendor_id: u16) {
        self.ids.write().unwrap().insert(group_id.to_owned(), vendor_id);
    }

    pub fn get(&self, group_id: &str) -> Option<u16> {
        self.ids.read().unwrap().get(group_id).copied()
    }
}
