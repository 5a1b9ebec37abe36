//! Level control cluster client. Levels are percent at the API, [0, 254]
//! on the wire.

use super::defs::{cluster, level};
use super::{codec, map_reports, ClusterHandle};
use crate::error::ClusterError;
use crate::session::SessionInner;
use crate::tlv::TlvWriter;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct LevelClient {
    h: ClusterHandle,
}

impl LevelClient {
    pub(crate) fn new(session: Arc<SessionInner>, device_id: u64, endpoint: u16) -> Self {
        Self {
            h: ClusterHandle::new(session, device_id, endpoint, cluster::LEVEL_CONTROL),
        }
    }

    pub async fn move_to_level(&self, percent: u8) -> Result<(), ClusterError> {
        let mut w = TlvWriter::new();
        w.start_struct_anon();
        w.put_u8(0, codec::percent_to_wire(percent as f32));
        w.put_u16(1, 0); // transition time
        w.put_u8(2, 0); // options mask
        w.put_u8(3, 0); // options override
        w.end_container();
        self.h
            .invoke(level::CMD_MOVE_TO_LEVEL, &w.finish(), None)
            .await?;
        Ok(())
    }

    pub async fn read_level(&self) -> Result<u8, ClusterError> {
        let payload = self.h.read(level::ATTR_CURRENT_LEVEL).await?;
        Ok(codec::wire_to_percent(codec::decode_u8(&payload)?).round() as u8)
    }

    pub async fn subscribe_level(&self) -> Result<mpsc::Receiver<u8>, ClusterError> {
        let raw = self.h.subscribe_raw(level::ATTR_CURRENT_LEVEL).await?;
        Ok(map_reports(raw, |payload| {
            Ok(codec::wire_to_percent(codec::decode_u8(payload)?).round() as u8)
        }))
    }
}
