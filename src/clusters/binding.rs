//! Binding cluster client.

use super::defs::{binding, cluster};
use super::{codec, ClusterHandle};
use crate::error::ClusterError;
use crate::session::SessionInner;
use crate::tlv::{TlvElement, TlvWriter};
use std::sync::Arc;

/// A unicast binding to another node's cluster endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingTarget {
    pub node: u64,
    pub endpoint: u16,
    pub cluster: u32,
}

pub struct BindingClient {
    h: ClusterHandle,
}

impl BindingClient {
    pub(crate) fn new(session: Arc<SessionInner>, device_id: u64, endpoint: u16) -> Self {
        Self {
            h: ClusterHandle::new(session, device_id, endpoint, cluster::BINDING),
        }
    }

    pub async fn read_bindings(&self) -> Result<Vec<BindingTarget>, ClusterError> {
        let payload = self.h.read(binding::ATTR_BINDING).await?;
        decode_bindings(&payload)
    }

    /// Replaces the whole binding table on this endpoint.
    pub async fn write_bindings(&self, targets: &[BindingTarget]) -> Result<(), ClusterError> {
        self.h
            .write(binding::ATTR_BINDING, &encode_bindings(targets))
            .await
    }
}

pub(crate) fn encode_bindings(targets: &[BindingTarget]) -> Vec<u8> {
    let mut w = TlvWriter::new();
    w.start_array_anon();
    for t in targets {
        w.start_struct_anon();
        w.put_u64(1, t.node);
        w.put_u16(3, t.endpoint);
        w.put_u32(4, t.cluster);
        w.end_container();
    }
    w.end_container();
    w.finish()
}

pub(crate) fn decode_bindings(payload: &[u8]) -> Result<Vec<BindingTarget>, ClusterError> {
    let e = codec::parse(payload)?;
    let items = e
        .get_container(&[])
        .ok_or_else(|| ClusterError::InvalidPayload("binding table is not an array".into()))?;
    items.iter().map(decode_target).collect()
}

fn decode_target(item: &TlvElement) -> Result<BindingTarget, ClusterError> {
    let node = item
        .get_unsigned(&[1])
        .ok_or_else(|| ClusterError::InvalidPayload("binding node".into()))?;
    let endpoint = item
        .get_unsigned(&[3])
        .ok_or_else(|| ClusterError::InvalidPayload("binding endpoint".into()))?;
    let cluster = item
        .get_unsigned(&[4])
        .ok_or_else(|| ClusterError::InvalidPayload("binding cluster".into()))?;
    Ok(BindingTarget {
        node,
        endpoint: endpoint as u16,
        cluster: cluster as u32,
    })
}
