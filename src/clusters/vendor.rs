//! Espressif vendor cluster clients.

use super::defs::{border_router, cluster, participant_data, rainmaker, rainmaker_controller};
use super::{codec, ClusterHandle};
use crate::error::ClusterError;
use crate::session::SessionInner;
use crate::tlv::TlvWriter;
use std::sync::Arc;

fn string_command(value: &str) -> Vec<u8> {
    let mut w = TlvWriter::new();
    w.start_struct_anon();
    w.put_str(0, value);
    w.end_container();
    w.finish()
}

/// Client for the RainMaker cluster on endpoint 0. Used after pairing to
/// exchange the cloud node id and the proof-of-possession challenge.
pub struct RainmakerClient {
    h: ClusterHandle,
}

impl RainmakerClient {
    pub(crate) fn new(session: Arc<SessionInner>, device_id: u64) -> Self {
        Self {
            h: ClusterHandle::new(session, device_id, 0, cluster::RAINMAKER),
        }
    }

    pub async fn read_rainmaker_node_id(&self) -> Result<String, ClusterError> {
        let payload = self.h.read(rainmaker::ATTR_RAINMAKER_NODE_ID).await?;
        codec::decode_string(&payload)
    }

    pub async fn read_challenge(&self) -> Result<String, ClusterError> {
        let payload = self.h.read(rainmaker::ATTR_CHALLENGE).await?;
        codec::decode_string(&payload)
    }

    /// Pushes the fabric-scoped matter node id down to the device.
    pub async fn send_node_id(&self, matter_node_id: &str) -> Result<(), ClusterError> {
        self.h
            .invoke(
                rainmaker::CMD_SEND_NODE_ID,
                &string_command(matter_node_id),
                None,
            )
            .await?;
        Ok(())
    }
}

/// Client for the RainMaker controller cluster, present on hub-capable
/// devices that talk to the cloud on the user's behalf.
pub struct RainmakerControllerClient {
    h: ClusterHandle,
}

impl RainmakerControllerClient {
    pub(crate) fn new(session: Arc<SessionInner>, device_id: u64, endpoint: u16) -> Self {
        Self {
            h: ClusterHandle::new(session, device_id, endpoint, cluster::RAINMAKER_CONTROLLER),
        }
    }

    pub async fn read_authorized(&self) -> Result<bool, ClusterError> {
        let payload = self.h.read(rainmaker_controller::ATTR_AUTHORIZED).await?;
        codec::decode_bool(&payload)
    }

    pub async fn read_user_noc_installed(&self) -> Result<bool, ClusterError> {
        let payload = self
            .h
            .read(rainmaker_controller::ATTR_USER_NOC_INSTALLED)
            .await?;
        codec::decode_bool(&payload)
    }

    pub async fn read_endpoint_url(&self) -> Result<String, ClusterError> {
        let payload = self.h.read(rainmaker_controller::ATTR_ENDPOINT_URL).await?;
        codec::decode_string(&payload)
    }

    pub async fn append_refresh_token(&self, token: &str) -> Result<(), ClusterError> {
        self.h
            .invoke(
                rainmaker_controller::CMD_APPEND_REFRESH_TOKEN,
                &string_command(token),
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn reset_refresh_token(&self) -> Result<(), ClusterError> {
        self.h
            .invoke(
                rainmaker_controller::CMD_RESET_REFRESH_TOKEN,
                &super::empty_command(),
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn authorize(&self, endpoint_url: &str) -> Result<(), ClusterError> {
        self.h
            .invoke(
                rainmaker_controller::CMD_AUTHORIZE,
                &string_command(endpoint_url),
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn update_user_noc(&self) -> Result<(), ClusterError> {
        self.h
            .invoke(
                rainmaker_controller::CMD_UPDATE_USER_NOC,
                &super::empty_command(),
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn update_device_list(&self) -> Result<(), ClusterError> {
        self.h
            .invoke(
                rainmaker_controller::CMD_UPDATE_DEVICE_LIST,
                &super::empty_command(),
                None,
            )
            .await?;
        Ok(())
    }
}

/// Client for the vendor border router cluster found on older RainMaker
/// thread border routers that predate the standard management cluster.
pub struct BorderRouterClient {
    h: ClusterHandle,
}

impl BorderRouterClient {
    pub(crate) fn new(session: Arc<SessionInner>, device_id: u64, endpoint: u16) -> Self {
        Self {
            h: ClusterHandle::new(session, device_id, endpoint, cluster::BORDER_ROUTER),
        }
    }

    pub async fn read_active_dataset(&self) -> Result<Vec<u8>, ClusterError> {
        let payload = self.h.read(border_router::ATTR_ACTIVE_DATASET).await?;
        codec::decode_octets(&payload)
    }

    pub async fn read_border_agent_id(&self) -> Result<Vec<u8>, ClusterError> {
        let payload = self.h.read(border_router::ATTR_BORDER_AGENT_ID).await?;
        codec::decode_octets(&payload)
    }

    pub async fn configure_dataset(&self, dataset: &[u8]) -> Result<(), ClusterError> {
        let mut w = TlvWriter::new();
        w.start_struct_anon();
        w.put_octets(0, dataset);
        w.end_container();
        self.h
            .invoke(border_router::CMD_CONFIGURE_DATASET, &w.finish(), None)
            .await?;
        Ok(())
    }

    pub async fn start_network(&self) -> Result<(), ClusterError> {
        self.h
            .invoke(
                border_router::CMD_START_NETWORK,
                &super::empty_command(),
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn stop_network(&self) -> Result<(), ClusterError> {
        self.h
            .invoke(
                border_router::CMD_STOP_NETWORK,
                &super::empty_command(),
                None,
            )
            .await?;
        Ok(())
    }
}

/// Badge details shown on event-demo devices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantData {
    pub name: String,
    pub company_name: String,
    pub email: String,
    pub contact: String,
    pub event_name: String,
}

pub struct ParticipantDataClient {
    h: ClusterHandle,
}

impl ParticipantDataClient {
    pub(crate) fn new(session: Arc<SessionInner>, device_id: u64, endpoint: u16) -> Self {
        Self {
            h: ClusterHandle::new(session, device_id, endpoint, cluster::PARTICIPANT_DATA),
        }
    }

    pub async fn read_participant_data(&self) -> Result<ParticipantData, ClusterError> {
        Ok(ParticipantData {
            name: self.read_str(participant_data::ATTR_NAME).await?,
            company_name: self.read_str(participant_data::ATTR_COMPANY_NAME).await?,
            email: self.read_str(participant_data::ATTR_EMAIL).await?,
            contact: self.read_str(participant_data::ATTR_CONTACT).await?,
            event_name: self.read_str(participant_data::ATTR_EVENT_NAME).await?,
        })
    }

    async fn read_str(&self, attribute: u32) -> Result<String, ClusterError> {
        let payload = self.h.read(attribute).await?;
        codec::decode_string(&payload)
    }

    pub async fn send_data(&self, data: &ParticipantData) -> Result<(), ClusterError> {
        let mut w = TlvWriter::new();
        w.start_struct_anon();
        w.put_str(0, &data.name);
        w.put_str(1, &data.company_name);
        w.put_str(2, &data.email);
        w.put_str(3, &data.contact);
        w.put_str(4, &data.event_name);
        w.end_container();
        self.h
            .invoke(participant_data::CMD_SEND_DATA, &w.finish(), None)
            .await?;
        Ok(())
    }
}
