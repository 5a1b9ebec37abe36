//! Basic information cluster client (endpoint 0 identity attributes).

use super::defs::{basic_information as attrs, cluster};
use super::{codec, ClusterHandle};
use crate::error::ClusterError;
use crate::session::SessionInner;
use std::sync::Arc;

pub struct BasicInformationClient {
    h: ClusterHandle,
}

impl BasicInformationClient {
    pub(crate) fn new(session: Arc<SessionInner>, device_id: u64) -> Self {
        Self {
            h: ClusterHandle::new(session, device_id, 0, cluster::BASIC_INFORMATION),
        }
    }

    pub async fn read_vendor_id(&self) -> Result<u16, ClusterError> {
        codec::decode_u16(&self.h.read(attrs::ATTR_VENDOR_ID).await?)
    }

    pub async fn read_product_id(&self) -> Result<u16, ClusterError> {
        codec::decode_u16(&self.h.read(attrs::ATTR_PRODUCT_ID).await?)
    }

    pub async fn read_vendor_name(&self) -> Result<String, ClusterError> {
        codec::decode_string(&self.h.read(attrs::ATTR_VENDOR_NAME).await?)
    }

    pub async fn read_product_name(&self) -> Result<String, ClusterError> {
        codec::decode_string(&self.h.read(attrs::ATTR_PRODUCT_NAME).await?)
    }

    pub async fn read_node_label(&self) -> Result<String, ClusterError> {
        codec::decode_string(&self.h.read(attrs::ATTR_NODE_LABEL).await?)
    }

    pub async fn read_software_version(&self) -> Result<u32, ClusterError> {
        codec::decode_u32(&self.h.read(attrs::ATTR_SOFTWARE_VERSION).await?)
    }

    pub async fn read_software_version_string(&self) -> Result<String, ClusterError> {
        codec::decode_string(&self.h.read(attrs::ATTR_SOFTWARE_VERSION_STRING).await?)
    }

    pub async fn read_serial_number(&self) -> Result<String, ClusterError> {
        codec::decode_string(&self.h.read(attrs::ATTR_SERIAL_NUMBER).await?)
    }
}
