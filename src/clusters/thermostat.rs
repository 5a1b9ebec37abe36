//! Thermostat cluster client. Temperatures are degrees Celsius at the API,
//! hundredths in a signed 16 bit field on the wire.

use super::defs::{cluster, thermostat};
use super::{codec, ClusterHandle};
use crate::error::ClusterError;
use crate::session::SessionInner;
use std::sync::Arc;

/// System mode codes as the cluster defines them.
pub mod system_mode {
    pub const OFF: u8 = 0;
    pub const AUTO: u8 = 1;
    pub const COOL: u8 = 3;
    pub const HEAT: u8 = 4;
}

pub struct ThermostatClient {
    h: ClusterHandle,
}

impl ThermostatClient {
    pub(crate) fn new(session: Arc<SessionInner>, device_id: u64, endpoint: u16) -> Self {
        Self {
            h: ClusterHandle::new(session, device_id, endpoint, cluster::THERMOSTAT),
        }
    }

    pub async fn read_local_temperature(&self) -> Result<f32, ClusterError> {
        let payload = self.h.read(thermostat::ATTR_LOCAL_TEMPERATURE).await?;
        Ok(codec::wire_to_temperature(codec::decode_i16(&payload)?))
    }

    pub async fn read_occupied_cooling_setpoint(&self) -> Result<f32, ClusterError> {
        let payload = self
            .h
            .read(thermostat::ATTR_OCCUPIED_COOLING_SETPOINT)
            .await?;
        Ok(codec::wire_to_temperature(codec::decode_i16(&payload)?))
    }

    pub async fn write_occupied_cooling_setpoint(&self, celsius: f32) -> Result<(), ClusterError> {
        self.h
            .write(
                thermostat::ATTR_OCCUPIED_COOLING_SETPOINT,
                &codec::encode_i16(codec::temperature_to_wire(celsius)),
            )
            .await
    }

    pub async fn read_occupied_heating_setpoint(&self) -> Result<f32, ClusterError> {
        let payload = self
            .h
            .read(thermostat::ATTR_OCCUPIED_HEATING_SETPOINT)
            .await?;
        Ok(codec::wire_to_temperature(codec::decode_i16(&payload)?))
    }

    pub async fn write_occupied_heating_setpoint(&self, celsius: f32) -> Result<(), ClusterError> {
        self.h
            .write(
                thermostat::ATTR_OCCUPIED_HEATING_SETPOINT,
                &codec::encode_i16(codec::temperature_to_wire(celsius)),
            )
            .await
    }

    pub async fn read_system_mode(&self) -> Result<u8, ClusterError> {
        let payload = self.h.read(thermostat::ATTR_SYSTEM_MODE).await?;
        codec::decode_u8(&payload)
    }

    pub async fn write_system_mode(&self, mode: u8) -> Result<(), ClusterError> {
        self.h
            .write(thermostat::ATTR_SYSTEM_MODE, &codec::encode_u8(mode))
            .await
    }

    pub async fn read_control_sequence(&self) -> Result<u8, ClusterError> {
        let payload = self.h.read(thermostat::ATTR_CONTROL_SEQUENCE).await?;
        codec::decode_u8(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FabricSession;
    use crate::testutil::{test_fabric, FakeConnector, FakeFactory, TEST_CERT_PEM};

    #[tokio::test]
    async fn setpoint_round_trips_through_wire_scale() {
        let connector = FakeConnector::arc();
        let factory = FakeFactory::new(&connector);
        let s = FabricSession::start(test_fabric(), TEST_CERT_PEM, &factory)
            .await
            .unwrap();
        let client = s.thermostat(7, 1);
        client.write_occupied_heating_setpoint(21.5).await.unwrap();
        assert_eq!(
            client.read_occupied_heating_setpoint().await.unwrap(),
            21.5
        );
        let writes = connector.writes_to(
            cluster::THERMOSTAT,
            thermostat::ATTR_OCCUPIED_HEATING_SETPOINT,
        );
        assert_eq!(codec::decode_i16(&writes[0]).unwrap(), 2150);
    }

    #[tokio::test]
    async fn negative_temperature_decodes() {
        let connector = FakeConnector::arc();
        connector.set_attr(
            7,
            1,
            cluster::THERMOSTAT,
            thermostat::ATTR_LOCAL_TEMPERATURE,
            codec::encode_i16(-1230),
        );
        let factory = FakeFactory::new(&connector);
        let s = FabricSession::start(test_fabric(), TEST_CERT_PEM, &factory)
            .await
            .unwrap();
        assert_eq!(
            s.thermostat(7, 1).read_local_temperature().await.unwrap(),
            -12.3
        );
    }

    #[tokio::test]
    async fn system_mode_writes_raw_code() {
        let connector = FakeConnector::arc();
        let factory = FakeFactory::new(&connector);
        let s = FabricSession::start(test_fabric(), TEST_CERT_PEM, &factory)
            .await
            .unwrap();
        s.thermostat(7, 1)
            .write_system_mode(system_mode::HEAT)
            .await
            .unwrap();
        let writes = connector.writes_to(cluster::THERMOSTAT, thermostat::ATTR_SYSTEM_MODE);
        assert_eq!(codec::decode_u8(&writes[0]).unwrap(), 4);
    }
}
