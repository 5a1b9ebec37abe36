//! Temperature measurement cluster client.

use super::defs::{cluster, temperature_measurement};
use super::{codec, ClusterHandle};
use crate::error::ClusterError;
use crate::session::SessionInner;
use std::sync::Arc;

pub struct TemperatureMeasurementClient {
    h: ClusterHandle,
}

impl TemperatureMeasurementClient {
    pub(crate) fn new(session: Arc<SessionInner>, device_id: u64, endpoint: u16) -> Self {
        Self {
            h: ClusterHandle::new(
                session,
                device_id,
                endpoint,
                cluster::TEMPERATURE_MEASUREMENT,
            ),
        }
    }

    pub async fn read_measured_value(&self) -> Result<f32, ClusterError> {
        let payload = self
            .h
            .read(temperature_measurement::ATTR_MEASURED_VALUE)
            .await?;
        Ok(codec::wire_to_temperature(codec::decode_i16(&payload)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FabricSession;
    use crate::testutil::{test_fabric, FakeConnector, FakeFactory, TEST_CERT_PEM};

    #[tokio::test]
    async fn measured_value_scales_to_celsius() {
        let connector = FakeConnector::arc();
        connector.set_attr(
            2,
            1,
            cluster::TEMPERATURE_MEASUREMENT,
            temperature_measurement::ATTR_MEASURED_VALUE,
            codec::encode_i16(2466),
        );
        let factory = FakeFactory::new(&connector);
        let s = FabricSession::start(test_fabric(), TEST_CERT_PEM, &factory)
            .await
            .unwrap();
        assert_eq!(
            s.temperature_measurement(2, 1)
                .read_measured_value()
                .await
                .unwrap(),
            24.66
        );
    }
}
