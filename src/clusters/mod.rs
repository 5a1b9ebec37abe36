//! Typed cluster clients.
//!
//! A client owns a `(device, endpoint)` pair on a running session and turns
//! attribute/command ids plus raw TLV into typed operations. Construction is
//! cheap and does no I/O; the first operation that needs the device finds
//! out whether it is reachable.

pub mod access_control;
pub mod basic_information;
pub mod binding;
pub mod codec;
pub mod color;
pub mod defs;
pub mod descriptor;
pub mod general_commissioning;
pub mod level;
pub mod onoff;
pub mod tbr;
pub mod temperature;
pub mod thermostat;
pub mod vendor;

use crate::error::ClusterError;
use crate::session::{FabricSession, SessionInner};
use crate::tlv::TlvWriter;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Default subscription report window, seconds.
pub const SUBSCRIBE_MIN_INTERVAL_S: u16 = 1;
pub const SUBSCRIBE_MAX_INTERVAL_S: u16 = 60;

/// Session-bound address of one cluster instance.
#[derive(Clone)]
pub(crate) struct ClusterHandle {
    session: Arc<SessionInner>,
    pub(crate) device_id: u64,
    pub(crate) endpoint: u16,
    pub(crate) cluster: u32,
}

impl ClusterHandle {
    pub(crate) fn new(session: Arc<SessionInner>, device_id: u64, endpoint: u16, cluster: u32) -> Self {
        Self {
            session,
            device_id,
            endpoint,
            cluster,
        }
    }

    pub(crate) async fn read(&self, attribute: u32) -> Result<Vec<u8>, ClusterError> {
        let payload = self
            .session
            .read(self.device_id, self.endpoint, self.cluster, attribute)
            .await
            .map_err(|e| ClusterError::from_read(self.device_id, e))?;
        self.record_snapshot(attribute, &payload);
        Ok(payload)
    }

    /// Mirror a successfully read or reported attribute value into the
    /// attached capability cache, if any.
    fn record_snapshot(&self, attribute: u32, payload: &[u8]) {
        let Some(cache) = self.session.snapshot_cache() else {
            return;
        };
        let Some(value) = codec::json_snapshot(payload) else {
            return;
        };
        if let Err(e) = cache.set_attribute_snapshot(
            &self.session.fabric.group_id,
            self.device_id,
            self.endpoint,
            self.cluster,
            attribute,
            value,
        ) {
            log::warn!("attribute snapshot update failed: {e:#}");
        }
    }

    pub(crate) async fn write(&self, attribute: u32, tlv: &[u8]) -> Result<(), ClusterError> {
        self.session
            .write(self.device_id, self.endpoint, self.cluster, attribute, tlv)
            .await
            .map_err(|e| ClusterError::from_write(self.device_id, e))
    }

    pub(crate) async fn invoke(
        &self,
        command: u32,
        tlv: &[u8],
        timed_ms: Option<u64>,
    ) -> Result<Vec<u8>, ClusterError> {
        self.session
            .invoke(self.device_id, self.endpoint, self.cluster, command, tlv, timed_ms)
            .await
            .map_err(|e| ClusterError::from_invoke(self.device_id, e))
    }

    pub(crate) async fn subscribe_raw(
        &self,
        attribute: u32,
    ) -> Result<mpsc::Receiver<Vec<u8>>, ClusterError> {
        let mut raw = self
            .session
            .subscribe(
                self.device_id,
                self.endpoint,
                self.cluster,
                attribute,
                SUBSCRIBE_MIN_INTERVAL_S,
                SUBSCRIBE_MAX_INTERVAL_S,
            )
            .await
            .map_err(|e| ClusterError::SubscribeFailed(e.to_string()))?;
        let (tx, rx) = mpsc::channel(16);
        let handle = self.clone();
        tokio::spawn(async move {
            while let Some(payload) = raw.recv().await {
                handle.record_snapshot(attribute, &payload);
                if tx.send(payload).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}

/// Command with no fields: an empty anonymous structure.
pub(crate) fn empty_command() -> Vec<u8> {
    let mut w = TlvWriter::new();
    w.start_struct_anon();
    w.end_container();
    w.finish()
}

/// Forward raw subscription reports through a decoder, dropping payloads
/// that do not decode.
pub(crate) fn map_reports<T, F>(mut raw: mpsc::Receiver<Vec<u8>>, decode: F) -> mpsc::Receiver<T>
where
    T: Send + 'static,
    F: Fn(&[u8]) -> Result<T, ClusterError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        while let Some(payload) = raw.recv().await {
            match decode(&payload) {
                Ok(v) => {
                    if tx.send(v).await.is_err() {
                        break;
                    }
                }
                Err(e) => log::debug!("dropping undecodable report: {e}"),
            }
        }
    });
    rx
}

impl FabricSession {
    pub fn on_off(&self, device_id: u64, endpoint: u16) -> onoff::OnOffClient {
        onoff::OnOffClient::new(self.inner(), device_id, endpoint)
    }

    pub fn level(&self, device_id: u64, endpoint: u16) -> level::LevelClient {
        level::LevelClient::new(self.inner(), device_id, endpoint)
    }

    pub fn color(&self, device_id: u64, endpoint: u16) -> color::ColorClient {
        color::ColorClient::new(self.inner(), device_id, endpoint)
    }

    pub fn thermostat(&self, device_id: u64, endpoint: u16) -> thermostat::ThermostatClient {
        thermostat::ThermostatClient::new(self.inner(), device_id, endpoint)
    }

    pub fn temperature_measurement(
        &self,
        device_id: u64,
        endpoint: u16,
    ) -> temperature::TemperatureMeasurementClient {
        temperature::TemperatureMeasurementClient::new(self.inner(), device_id, endpoint)
    }

    pub fn descriptor(&self, device_id: u64) -> descriptor::DescriptorClient {
        descriptor::DescriptorClient::new(self.inner(), device_id)
    }

    pub fn basic_information(&self, device_id: u64) -> basic_information::BasicInformationClient {
        basic_information::BasicInformationClient::new(self.inner(), device_id)
    }

    pub fn access_control(&self, device_id: u64) -> access_control::AccessControlClient {
        access_control::AccessControlClient::new(self.inner(), device_id)
    }

    pub fn binding(&self, device_id: u64, endpoint: u16) -> binding::BindingClient {
        binding::BindingClient::new(self.inner(), device_id, endpoint)
    }

    pub fn general_commissioning(
        &self,
        device_id: u64,
    ) -> general_commissioning::GeneralCommissioningClient {
        general_commissioning::GeneralCommissioningClient::new(self.inner(), device_id)
    }

    pub fn thread_border_router(
        &self,
        device_id: u64,
        endpoint: u16,
    ) -> tbr::ThreadBorderRouterClient {
        tbr::ThreadBorderRouterClient::new(self.inner(), device_id, endpoint)
    }

    pub fn rainmaker(&self, device_id: u64) -> vendor::RainmakerClient {
        vendor::RainmakerClient::new(self.inner(), device_id)
    }

    pub fn rainmaker_controller(
        &self,
        device_id: u64,
        endpoint: u16,
    ) -> vendor::RainmakerControllerClient {
        vendor::RainmakerControllerClient::new(self.inner(), device_id, endpoint)
    }

    pub fn border_router(&self, device_id: u64, endpoint: u16) -> vendor::BorderRouterClient {
        vendor::BorderRouterClient::new(self.inner(), device_id, endpoint)
    }

    pub fn participant_data(
        &self,
        device_id: u64,
        endpoint: u16,
    ) -> vendor::ParticipantDataClient {
        vendor::ParticipantDataClient::new(self.inner(), device_id, endpoint)
    }
}
