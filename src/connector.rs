//! Seam to the platform Matter controller.
//!
//! The crate does not speak the Matter secure channel itself; the platform
//! controller owns PASE/CASE, attestation and the operational transport.
//! Everything above drives it through [DeviceConnector]. Production wires in
//! the SDK controller; tests use an in-memory fake.

use crate::error::{ConnectorError, SessionError};
use crate::fabric::Fabric;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outcome of the device attestation check performed during pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationOutcome {
    Verified,
    Failed(String),
}

/// Operational credentials installed on a device at commissioning time.
pub struct OperationalCredentials<'a> {
    /// Node operational certificate, DER.
    pub noc_der: &'a [u8],
    /// Fabric root certificate, DER.
    pub root_der: &'a [u8],
    /// Signed identity protection key.
    pub ipk: &'a [u8],
    /// CAT subject granted administer privilege in the initial ACL.
    pub admin_subject: u64,
}

/// Raw device operations, keyed by (device, endpoint, cluster, attribute or
/// command id). Payloads are Matter TLV.
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    /// Locate the device on the operational network and make sure a CASE
    /// session can be had for it.
    async fn resolve_device(&self, device_id: u64) -> Result<(), ConnectorError>;

    /// Establish the initial PASE session with an uncommissioned device.
    async fn establish_pase(
        &self,
        device_id: u64,
        passcode: u32,
        discriminator: u16,
    ) -> Result<(), ConnectorError>;

    /// Run device attestation on a freshly paired device.
    async fn device_attestation(&self, device_id: u64)
        -> Result<AttestationOutcome, ConnectorError>;

    /// Install the operational certificate chain on the device.
    async fn install_operational_certificate(
        &self,
        device_id: u64,
        credentials: OperationalCredentials<'_>,
    ) -> Result<(), ConnectorError>;

    async fn read_attribute(
        &self,
        device_id: u64,
        endpoint: u16,
        cluster: u32,
        attribute: u32,
    ) -> Result<Vec<u8>, ConnectorError>;

    async fn write_attribute(
        &self,
        device_id: u64,
        endpoint: u16,
        cluster: u32,
        attribute: u32,
        tlv: &[u8],
    ) -> Result<(), ConnectorError>;

    /// Invoke a command; `timed_ms` wraps it in a timed interaction.
    async fn invoke_command(
        &self,
        device_id: u64,
        endpoint: u16,
        cluster: u32,
        command: u32,
        tlv: &[u8],
        timed_ms: Option<u64>,
    ) -> Result<Vec<u8>, ConnectorError>;

    /// Subscribe to an attribute. Reports arrive as raw TLV payloads on the
    /// returned channel; dropping the receiver ends delivery, there is no
    /// explicit unsubscribe.
    async fn subscribe(
        &self,
        device_id: u64,
        endpoint: u16,
        cluster: u32,
        attribute: u32,
        min_interval_s: u16,
        max_interval_s: u16,
    ) -> Result<mpsc::Receiver<Vec<u8>>, ConnectorError>;
}

/// Allocates the platform controller for a fabric when a session starts.
#[async_trait]
pub trait ControllerFactory: Send + Sync {
    async fn start_controller(
        &self,
        fabric: &Fabric,
        root_ca_der: &[u8],
        operational_cert_der: &[u8],
        ipk: &[u8],
    ) -> Result<Arc<dyn DeviceConnector>, SessionError>;
}
