//! Color control cluster client. Hue is degrees at the API, saturation is
//! percent; both travel in [0, 254].

use super::defs::{cluster, color};
use super::{codec, map_reports, ClusterHandle};
use crate::error::ClusterError;
use crate::session::SessionInner;
use crate::tlv::TlvWriter;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct ColorClient {
    h: ClusterHandle,
}

impl ColorClient {
    pub(crate) fn new(session: Arc<SessionInner>, device_id: u64, endpoint: u16) -> Self {
        Self {
            h: ClusterHandle::new(session, device_id, endpoint, cluster::COLOR_CONTROL),
        }
    }

    pub async fn move_to_hue(&self, degrees: f32) -> Result<(), ClusterError> {
        let mut w = TlvWriter::new();
        w.start_struct_anon();
        w.put_u8(0, codec::hue_degrees_to_wire(degrees));
        w.put_u8(1, 0); // direction: shortest distance
        w.put_u16(2, 0); // transition time
        w.put_u8(3, 0);
        w.put_u8(4, 0);
        w.end_container();
        self.h.invoke(color::CMD_MOVE_TO_HUE, &w.finish(), None).await?;
        Ok(())
    }

    pub async fn move_to_saturation(&self, percent: f32) -> Result<(), ClusterError> {
        let mut w = TlvWriter::new();
        w.start_struct_anon();
        w.put_u8(0, codec::percent_to_wire(percent));
        w.put_u16(1, 0); // transition time
        w.put_u8(2, 0);
        w.put_u8(3, 0);
        w.end_container();
        self.h
            .invoke(color::CMD_MOVE_TO_SATURATION, &w.finish(), None)
            .await?;
        Ok(())
    }

    pub async fn read_hue_degrees(&self) -> Result<f32, ClusterError> {
        let payload = self.h.read(color::ATTR_CURRENT_HUE).await?;
        Ok(codec::wire_to_hue_degrees(codec::decode_u8(&payload)?))
    }

    pub async fn read_saturation_percent(&self) -> Result<f32, ClusterError> {
        let payload = self.h.read(color::ATTR_CURRENT_SATURATION).await?;
        Ok(codec::wire_to_percent(codec::decode_u8(&payload)?))
    }

    pub async fn subscribe_hue(&self) -> Result<mpsc::Receiver<f32>, ClusterError> {
        let raw = self.h.subscribe_raw(color::ATTR_CURRENT_HUE).await?;
        Ok(map_reports(raw, |p| {
            Ok(codec::wire_to_hue_degrees(codec::decode_u8(p)?))
        }))
    }

    pub async fn subscribe_saturation(&self) -> Result<mpsc::Receiver<f32>, ClusterError> {
        let raw = self.h.subscribe_raw(color::ATTR_CURRENT_SATURATION).await?;
        Ok(map_reports(raw, |p| {
            Ok(codec::wire_to_percent(codec::decode_u8(p)?))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FabricSession;
    use crate::testutil::{test_fabric, FakeConnector, FakeFactory, TEST_CERT_PEM};
    use crate::tlv;

    #[tokio::test]
    async fn hue_and_saturation_scale_on_the_way_out() {
        let connector = FakeConnector::arc();
        let factory = FakeFactory::new(&connector);
        let s = FabricSession::start(test_fabric(), TEST_CERT_PEM, &factory)
            .await
            .unwrap();
        let client = s.color(4, 1);
        client.move_to_hue(360.0).await.unwrap(); // wraps to 0
        client.move_to_saturation(100.0).await.unwrap();
        let invokes = connector.invokes_of(cluster::COLOR_CONTROL);
        assert_eq!(invokes[0].0, color::CMD_MOVE_TO_HUE);
        let hue = tlv::decode(&invokes[0].1).unwrap();
        assert_eq!(hue.get_unsigned(&[0]), Some(0));
        let sat = tlv::decode(&invokes[1].1).unwrap();
        assert_eq!(sat.get_unsigned(&[0]), Some(254));
    }

    #[tokio::test]
    async fn reads_scale_back() {
        let connector = FakeConnector::arc();
        connector.set_attr(
            4,
            1,
            cluster::COLOR_CONTROL,
            color::ATTR_CURRENT_SATURATION,
            codec::encode_u8(127),
        );
        let factory = FakeFactory::new(&connector);
        let s = FabricSession::start(test_fabric(), TEST_CERT_PEM, &factory)
            .await
            .unwrap();
        let pct = s.color(4, 1).read_saturation_percent().await.unwrap();
        assert!((pct - 49.8).abs() < 0.5);
    }
}
