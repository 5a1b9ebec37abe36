//! Access control cluster client.
//!
//! The ACL attribute is read and written whole; callers edit the entry list
//! and push the full list back.

use super::defs::{access_control as acl, cluster};
use super::{codec, ClusterHandle};
use crate::error::ClusterError;
use crate::session::SessionInner;
use crate::tlv::{TlvElement, TlvWriter};
use std::sync::Arc;

pub use super::defs::access_control::{AUTH_MODE_CASE, PRIVILEGE_ADMINISTER, PRIVILEGE_OPERATE};

/// One target restriction inside an ACL entry. A `None` field is a wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AclTarget {
    pub cluster: Option<u64>,
    pub endpoint: Option<u64>,
    pub device_type: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclEntry {
    pub privilege: u64,
    pub auth_mode: u64,
    pub subjects: Vec<u64>,
    pub targets: Vec<AclTarget>,
}

impl AclEntry {
    /// CASE entry with no target restriction.
    pub fn case_entry(privilege: u64, subjects: Vec<u64>) -> Self {
        Self {
            privilege,
            auth_mode: acl::AUTH_MODE_CASE,
            subjects,
            targets: Vec::new(),
        }
    }
}

pub struct AccessControlClient {
    h: ClusterHandle,
}

impl AccessControlClient {
    pub(crate) fn new(session: Arc<SessionInner>, device_id: u64) -> Self {
        Self {
            h: ClusterHandle::new(session, device_id, 0, cluster::ACCESS_CONTROL),
        }
    }

    pub async fn read_acl(&self) -> Result<Vec<AclEntry>, ClusterError> {
        let payload = self.h.read(acl::ATTR_ACL).await?;
        decode_acl(&payload)
    }

    pub async fn write_acl(&self, entries: &[AclEntry]) -> Result<(), ClusterError> {
        self.h.write(acl::ATTR_ACL, &encode_acl(entries)).await
    }
}

pub(crate) fn encode_acl(entries: &[AclEntry]) -> Vec<u8> {
    let mut w = TlvWriter::new();
    w.start_array_anon();
    for entry in entries {
        w.start_struct_anon();
        w.put_u8(1, entry.privilege as u8);
        w.put_u8(2, entry.auth_mode as u8);
        w.start_array(3);
        for subject in &entry.subjects {
            w.put_u64_anon(*subject);
        }
        w.end_container();
        if entry.targets.is_empty() {
            w.put_null(4);
        } else {
            w.start_array(4);
            for t in &entry.targets {
                w.start_struct_anon();
                match t.cluster {
                    Some(c) => w.put_u64(0, c),
                    None => w.put_null(0),
                }
                match t.endpoint {
                    Some(e) => w.put_u64(1, e),
                    None => w.put_null(1),
                }
                match t.device_type {
                    Some(d) => w.put_u64(2, d),
                    None => w.put_null(2),
                }
                w.end_container();
            }
            w.end_container();
        }
        w.end_container();
    }
    w.end_container();
    w.finish()
}

pub(crate) fn decode_acl(payload: &[u8]) -> Result<Vec<AclEntry>, ClusterError> {
    let e = codec::parse(payload)?;
    let items = e
        .get_container(&[])
        .ok_or_else(|| ClusterError::InvalidPayload("acl is not an array".into()))?;
    items.iter().map(decode_entry).collect()
}

fn decode_entry(item: &TlvElement) -> Result<AclEntry, ClusterError> {
    let privilege = item
        .get_unsigned(&[1])
        .ok_or_else(|| ClusterError::InvalidPayload("acl entry privilege".into()))?;
    let auth_mode = item
        .get_unsigned(&[2])
        .ok_or_else(|| ClusterError::InvalidPayload("acl entry auth mode".into()))?;
    let subjects = match item.get_container(&[3]) {
        Some(list) => list
            .iter()
            .map(|s| {
                s.get_unsigned(&[])
                    .ok_or_else(|| ClusterError::InvalidPayload("acl subject".into()))
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    let targets = match item.get_container(&[4]) {
        Some(list) => list
            .iter()
            .map(|t| AclTarget {
                cluster: t.get_unsigned(&[0]),
                endpoint: t.get_unsigned(&[1]),
                device_type: t.get_unsigned(&[2]),
            })
            .collect(),
        None => Vec::new(),
    };
    Ok(AclEntry {
        privilege,
        auth_mode,
        subjects,
        targets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FabricSession;
    use crate::testutil::{test_fabric, FakeConnector, FakeFactory, TEST_CERT_PEM};

    #[test]
    fn acl_round_trips() {
        let entries = vec![
            AclEntry::case_entry(PRIVILEGE_ADMINISTER, vec![0xFFFF_FFFD_0000_0001, 42]),
            AclEntry {
                privilege: PRIVILEGE_OPERATE,
                auth_mode: AUTH_MODE_CASE,
                subjects: vec![7],
                targets: vec![AclTarget {
                    cluster: Some(0x0006),
                    endpoint: Some(1),
                    device_type: None,
                }],
            },
        ];
        let decoded = decode_acl(&encode_acl(&entries)).unwrap();
        assert_eq!(decoded, entries);
    }

    #[tokio::test]
    async fn write_then_read_back() {
        let connector = FakeConnector::arc();
        let factory = FakeFactory::new(&connector);
        let s = FabricSession::start(test_fabric(), TEST_CERT_PEM, &factory)
            .await
            .unwrap();
        let client = s.access_control(8);
        let entries = vec![AclEntry::case_entry(PRIVILEGE_ADMINISTER, vec![1])];
        client.write_acl(&entries).await.unwrap();
        assert_eq!(client.read_acl().await.unwrap(), entries);
    }
}
