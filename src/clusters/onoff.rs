//! On/off cluster client.

use super::defs::{cluster, on_off};
use super::{codec, empty_command, map_reports, ClusterHandle};
use crate::error::ClusterError;
use crate::session::SessionInner;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct OnOffClient {
    h: ClusterHandle,
}

impl OnOffClient {
    pub(crate) fn new(session: Arc<SessionInner>, device_id: u64, endpoint: u16) -> Self {
        Self {
            h: ClusterHandle::new(session, device_id, endpoint, cluster::ON_OFF),
        }
    }

    pub async fn on(&self) -> Result<(), ClusterError> {
        self.h.invoke(on_off::CMD_ON, &empty_command(), None).await?;
        Ok(())
    }

    pub async fn off(&self) -> Result<(), ClusterError> {
        self.h.invoke(on_off::CMD_OFF, &empty_command(), None).await?;
        Ok(())
    }

    pub async fn toggle(&self) -> Result<(), ClusterError> {
        self.h
            .invoke(on_off::CMD_TOGGLE, &empty_command(), None)
            .await?;
        Ok(())
    }

    pub async fn read_on_off(&self) -> Result<bool, ClusterError> {
        let payload = self.h.read(on_off::ATTR_ON_OFF).await?;
        codec::decode_bool(&payload)
    }

    pub async fn subscribe_on_off(&self) -> Result<mpsc::Receiver<bool>, ClusterError> {
        let raw = self.h.subscribe_raw(on_off::ATTR_ON_OFF).await?;
        Ok(map_reports(raw, codec::decode_bool))
    }
}
