//! General commissioning cluster client.
//!
//! Only the fail-safe and completion commands are used here; the rest of the
//! cluster is handled during initial pairing by the platform controller.

use super::defs::{cluster, general_commissioning as gc};
use super::ClusterHandle;
use crate::error::ClusterError;
use crate::session::SessionInner;
use crate::tlv::{decode as tlv_decode, TlvWriter};
use std::sync::Arc;

pub struct GeneralCommissioningClient {
    h: ClusterHandle,
}

impl GeneralCommissioningClient {
    pub(crate) fn new(session: Arc<SessionInner>, device_id: u64) -> Self {
        Self {
            h: ClusterHandle::new(session, device_id, 0, cluster::GENERAL_COMMISSIONING),
        }
    }

    /// Arms the device fail-safe timer. Returns the device error code,
    /// 0 on success.
    pub async fn arm_fail_safe(
        &self,
        expiry_s: u16,
        breadcrumb: u64,
    ) -> Result<u64, ClusterError> {
        let mut w = TlvWriter::new();
        w.start_struct_anon();
        w.put_u16(0, expiry_s);
        w.put_u64(1, breadcrumb);
        w.end_container();
        let resp = self
            .h
            .invoke(gc::CMD_ARM_FAIL_SAFE, &w.finish(), None)
            .await?;
        error_code(&resp)
    }

    /// Commits configuration made under the fail-safe. Returns the device
    /// error code, 0 on success.
    pub async fn commissioning_complete(&self) -> Result<u64, ClusterError> {
        let resp = self
            .h
            .invoke(gc::CMD_COMMISSIONING_COMPLETE, &super::empty_command(), None)
            .await?;
        error_code(&resp)
    }
}

fn error_code(payload: &[u8]) -> Result<u64, ClusterError> {
    if payload.is_empty() {
        return Ok(0);
    }
    let e = tlv_decode(payload)
        .map_err(|err| ClusterError::InvalidPayload(err.to_string()))?;
    e.get_unsigned(&[0])
        .ok_or_else(|| ClusterError::InvalidPayload("missing error code".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clusters::defs::{cluster, general_commissioning as gc};
    use crate::session::FabricSession;
    use crate::testutil::{test_fabric, FakeConnector, FakeFactory, TEST_CERT_PEM};
    use crate::tlv::TlvWriter;

    fn status_response(code: u8) -> Vec<u8> {
        let mut w = TlvWriter::new();
        w.start_struct_anon();
        w.put_u8(0, code);
        w.end_container();
        w.finish()
    }

    #[tokio::test]
    async fn arm_fail_safe_sends_expiry_and_breadcrumb() {
        let connector = FakeConnector::arc();
        connector.set_invoke_response(
            cluster::GENERAL_COMMISSIONING,
            gc::CMD_ARM_FAIL_SAFE,
            status_response(0),
        );
        let factory = FakeFactory::new(&connector);
        let s = FabricSession::start(test_fabric(), TEST_CERT_PEM, &factory)
            .await
            .unwrap();
        let code = s
            .general_commissioning(5)
            .arm_fail_safe(300, 1)
            .await
            .unwrap();
        assert_eq!(code, 0);

        let invokes = connector.invokes_of(cluster::GENERAL_COMMISSIONING);
        assert_eq!(invokes.len(), 1);
        let sent = crate::tlv::decode(&invokes[0].1).unwrap();
        assert_eq!(sent.get_unsigned(&[0]), Some(300));
        assert_eq!(sent.get_unsigned(&[1]), Some(1));
    }

    #[tokio::test]
    async fn commissioning_complete_surfaces_device_error() {
        let connector = FakeConnector::arc();
        connector.set_invoke_response(
            cluster::GENERAL_COMMISSIONING,
            gc::CMD_COMMISSIONING_COMPLETE,
            status_response(9),
        );
        let factory = FakeFactory::new(&connector);
        let s = FabricSession::start(test_fabric(), TEST_CERT_PEM, &factory)
            .await
            .unwrap();
        let code = s
            .general_commissioning(5)
            .commissioning_complete()
            .await
            .unwrap();
        assert_eq!(code, 9);
    }
}
