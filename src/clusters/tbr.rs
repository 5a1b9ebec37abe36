//! Thread border router management cluster client.
//!
//! Dataset writes are timed invokes; the device rejects an untimed
//! SetActiveDatasetRequest.

use super::defs::{cluster, thread_br_management as tbr};
use super::{codec, ClusterHandle};
use crate::error::ClusterError;
use crate::session::SessionInner;
use crate::tlv::{decode as tlv_decode, TlvValue, TlvWriter};
use std::sync::Arc;

const DATASET_WRITE_TIMEOUT_MS: u64 = 5_000;

pub struct ThreadBorderRouterClient {
    h: ClusterHandle,
}

impl ThreadBorderRouterClient {
    pub(crate) fn new(session: Arc<SessionInner>, device_id: u64, endpoint: u16) -> Self {
        Self {
            h: ClusterHandle::new(session, device_id, endpoint, cluster::THREAD_BORDER_ROUTER_MANAGEMENT),
        }
    }

    pub async fn feature_map(&self) -> Result<u64, ClusterError> {
        let payload = self.h.read(tbr::ATTR_FEATURE_MAP).await?;
        codec::decode_u64(&payload)
    }

    /// Whether the border router advertises pending dataset support.
    pub async fn supports_pan_change(&self) -> Result<bool, ClusterError> {
        Ok(self.feature_map().await? & tbr::FEATURE_PAN_CHANGE != 0)
    }

    pub async fn border_router_name(&self) -> Result<String, ClusterError> {
        let payload = self.h.read(tbr::ATTR_BORDER_ROUTER_NAME).await?;
        codec::decode_string(&payload)
    }

    pub async fn border_agent_id(&self) -> Result<Vec<u8>, ClusterError> {
        let payload = self.h.read(tbr::ATTR_BORDER_AGENT_ID).await?;
        codec::decode_octets(&payload)
    }

    pub async fn thread_version(&self) -> Result<u16, ClusterError> {
        let payload = self.h.read(tbr::ATTR_THREAD_VERSION).await?;
        codec::decode_u16(&payload)
    }

    pub async fn interface_enabled(&self) -> Result<bool, ClusterError> {
        let payload = self.h.read(tbr::ATTR_INTERFACE_ENABLED).await?;
        codec::decode_bool(&payload)
    }

    /// Timestamp of the dataset currently in use, `None` when the border
    /// router has no active dataset yet.
    pub async fn active_dataset_timestamp(&self) -> Result<Option<u64>, ClusterError> {
        let payload = self.h.read(tbr::ATTR_ACTIVE_DATASET_TIMESTAMP).await?;
        let e = codec::parse(&payload)?;
        match e.value {
            TlvValue::Null => Ok(None),
            TlvValue::Unsigned(v) => Ok(Some(v)),
            _ => Err(ClusterError::InvalidPayload(
                "dataset timestamp is not an integer".into(),
            )),
        }
    }

    pub async fn get_active_dataset(&self) -> Result<Vec<u8>, ClusterError> {
        let resp = self
            .h
            .invoke(tbr::CMD_GET_ACTIVE_DATASET, &super::empty_command(), None)
            .await?;
        dataset_from_response(&resp)
    }

    pub async fn set_active_dataset(&self, dataset: &[u8]) -> Result<(), ClusterError> {
        self.h
            .invoke(
                tbr::CMD_SET_ACTIVE_DATASET,
                &dataset_request(dataset),
                Some(DATASET_WRITE_TIMEOUT_MS),
            )
            .await?;
        Ok(())
    }

    pub async fn set_pending_dataset(&self, dataset: &[u8]) -> Result<(), ClusterError> {
        self.h
            .invoke(
                tbr::CMD_SET_PENDING_DATASET,
                &dataset_request(dataset),
                Some(DATASET_WRITE_TIMEOUT_MS),
            )
            .await?;
        Ok(())
    }
}

fn dataset_request(dataset: &[u8]) -> Vec<u8> {
    let mut w = TlvWriter::new();
    w.start_struct_anon();
    w.put_octets(0, dataset);
    w.end_container();
    w.finish()
}

fn dataset_from_response(payload: &[u8]) -> Result<Vec<u8>, ClusterError> {
    let e = tlv_decode(payload)
        .map_err(|err| ClusterError::InvalidPayload(err.to_string()))?;
    if let TlvValue::Octets(bytes) = &e.value {
        return Ok(bytes.clone());
    }
    e.get_octets(&[0])
        .map(|b| b.to_vec())
        .ok_or_else(|| ClusterError::InvalidPayload("missing dataset in response".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clusters::defs::{cluster, thread_br_management as tbr};
    use crate::session::FabricSession;
    use crate::testutil::{test_fabric, FakeConnector, FakeFactory, TEST_CERT_PEM};
    use crate::tlv::TlvWriter;

    async fn session(connector: &std::sync::Arc<FakeConnector>) -> FabricSession {
        let factory = FakeFactory::new(connector);
        FabricSession::start(test_fabric(), TEST_CERT_PEM, &factory)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn dataset_write_is_timed() {
        let connector = FakeConnector::arc();
        let s = session(&connector).await;
        s.thread_border_router(1, 1)
            .set_active_dataset(&[0x0e, 0x08, 0, 0, 0, 0, 0, 0, 0, 0x10])
            .await
            .unwrap();

        let invokes = connector.invokes_of(cluster::THREAD_BORDER_ROUTER_MANAGEMENT);
        assert_eq!(invokes.len(), 1);
        assert_eq!(invokes[0].0, tbr::CMD_SET_ACTIVE_DATASET);
        assert_eq!(invokes[0].2, Some(5_000));
        let sent = crate::tlv::decode(&invokes[0].1).unwrap();
        assert_eq!(sent.get_octets(&[0]).unwrap()[0], 0x0e);
    }

    #[tokio::test]
    async fn null_timestamp_means_no_dataset() {
        let connector = FakeConnector::arc();
        let mut w = TlvWriter::new();
        w.put_null_anon();
        connector.set_attr(
            1,
            1,
            cluster::THREAD_BORDER_ROUTER_MANAGEMENT,
            tbr::ATTR_ACTIVE_DATASET_TIMESTAMP,
            w.finish(),
        );
        let s = session(&connector).await;
        let ts = s
            .thread_border_router(1, 1)
            .active_dataset_timestamp()
            .await
            .unwrap();
        assert_eq!(ts, None);
    }

    #[tokio::test]
    async fn active_dataset_comes_back_from_response_field() {
        let connector = FakeConnector::arc();
        let mut w = TlvWriter::new();
        w.start_struct_anon();
        w.put_octets(0, &[1, 2, 3]);
        w.end_container();
        connector.set_invoke_response(
            cluster::THREAD_BORDER_ROUTER_MANAGEMENT,
            tbr::CMD_GET_ACTIVE_DATASET,
            w.finish(),
        );
        let s = session(&connector).await;
        let dataset = s.thread_border_router(1, 1).get_active_dataset().await.unwrap();
        assert_eq!(dataset, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn pan_change_gate_follows_feature_map() {
        let connector = FakeConnector::arc();
        connector.set_attr(
            1,
            1,
            cluster::THREAD_BORDER_ROUTER_MANAGEMENT,
            tbr::ATTR_FEATURE_MAP,
            crate::clusters::codec::encode_u8(1),
        );
        let s = session(&connector).await;
        assert!(s.thread_border_router(1, 1).supports_pan_change().await.unwrap());
    }
}
