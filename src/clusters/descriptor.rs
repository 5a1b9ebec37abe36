//! Descriptor cluster client: endpoint topology discovery.

use super::defs::{cluster, descriptor};
use super::{codec, ClusterHandle};
use crate::error::ClusterError;
use crate::session::SessionInner;
use std::sync::Arc;

pub struct DescriptorClient {
    session: Arc<SessionInner>,
    device_id: u64,
}

impl DescriptorClient {
    pub(crate) fn new(session: Arc<SessionInner>, device_id: u64) -> Self {
        Self { session, device_id }
    }

    fn on_endpoint(&self, endpoint: u16) -> ClusterHandle {
        ClusterHandle::new(
            self.session.clone(),
            self.device_id,
            endpoint,
            cluster::DESCRIPTOR,
        )
    }

    /// All endpoints of the device, from the root endpoint's parts list.
    pub async fn parts_list(&self) -> Result<Vec<u16>, ClusterError> {
        let payload = self.on_endpoint(0).read(descriptor::ATTR_PARTS_LIST).await?;
        codec::decode_unsigned_list(&payload)?
            .into_iter()
            .map(|v| {
                u16::try_from(v)
                    .map_err(|_| ClusterError::InvalidPayload("endpoint exceeds u16".into()))
            })
            .collect()
    }

    /// Server cluster ids hosted on an endpoint.
    pub async fn server_list(&self, endpoint: u16) -> Result<Vec<u32>, ClusterError> {
        let payload = self
            .on_endpoint(endpoint)
            .read(descriptor::ATTR_SERVER_LIST)
            .await?;
        collect_u32(&payload)
    }

    /// Client cluster ids hosted on an endpoint.
    pub async fn client_list(&self, endpoint: u16) -> Result<Vec<u32>, ClusterError> {
        let payload = self
            .on_endpoint(endpoint)
            .read(descriptor::ATTR_CLIENT_LIST)
            .await?;
        collect_u32(&payload)
    }

    /// Device type ids declared on an endpoint. Entries arrive as structs
    /// carrying the type id in field 0.
    pub async fn device_type_list(&self, endpoint: u16) -> Result<Vec<u64>, ClusterError> {
        let payload = self
            .on_endpoint(endpoint)
            .read(descriptor::ATTR_DEVICE_TYPE_LIST)
            .await?;
        let e = codec::parse(&payload)?;
        let items = e
            .get_container(&[])
            .ok_or_else(|| ClusterError::InvalidPayload("expected array".into()))?;
        items
            .iter()
            .map(|i| {
                i.get_unsigned(&[0])
                    .ok_or_else(|| ClusterError::InvalidPayload("device type entry".into()))
            })
            .collect()
    }
}

fn collect_u32(payload: &[u8]) -> Result<Vec<u32>, ClusterError> {
    codec::decode_unsigned_list(payload)?
        .into_iter()
        .map(|v| {
            u32::try_from(v).map_err(|_| ClusterError::InvalidPayload("cluster id exceeds u32".into()))
        })
        .collect()
}
