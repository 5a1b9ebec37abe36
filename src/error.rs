//! Error taxonomy for the commissioning and cluster layers.
//!
//! Each layer gets its own error enum; callers decide the fallback behavior
//! explicitly. Most failures are non-fatal: they leave cached state untouched
//! and nothing retries automatically.

use thiserror::Error;

/// Errors raised while starting or driving a fabric session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("certificate invalid: {0}")]
    CertificateInvalid(String),
    #[error("controller startup failed: {0}")]
    StartupFailed(String),
}

/// Errors raised by the raw device connector.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("session is not active (state: {0})")]
    NotActive(&'static str),
    #[error("device {0:#x} could not be resolved")]
    DeviceNotFound(u64),
    #[error("operation timed out")]
    Timeout,
    #[error("device returned status {0}")]
    Status(u64),
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Errors raised by typed cluster clients.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("device {0:#x} unresolvable")]
    DeviceUnresolvable(u64),
    #[error("attribute read failed: {0}")]
    ReadFailed(String),
    #[error("attribute write failed: {0}")]
    WriteFailed(String),
    #[error("command invoke failed: {0}")]
    InvokeFailed(String),
    #[error("subscribe failed: {0}")]
    SubscribeFailed(String),
    #[error("cluster {cluster:#x} not supported on endpoint {endpoint}")]
    UnsupportedCluster { cluster: u32, endpoint: u16 },
    #[error("unexpected attribute payload: {0}")]
    InvalidPayload(String),
}

impl ClusterError {
    pub(crate) fn from_read(device_id: u64, e: ConnectorError) -> Self {
        match e {
            ConnectorError::DeviceNotFound(_) | ConnectorError::Timeout => {
                ClusterError::DeviceUnresolvable(device_id)
            }
            other => ClusterError::ReadFailed(other.to_string()),
        }
    }
    pub(crate) fn from_write(device_id: u64, e: ConnectorError) -> Self {
        match e {
            ConnectorError::DeviceNotFound(_) | ConnectorError::Timeout => {
                ClusterError::DeviceUnresolvable(device_id)
            }
            other => ClusterError::WriteFailed(other.to_string()),
        }
    }
    pub(crate) fn from_invoke(device_id: u64, e: ConnectorError) -> Self {
        match e {
            ConnectorError::DeviceNotFound(_) | ConnectorError::Timeout => {
                ClusterError::DeviceUnresolvable(device_id)
            }
            other => ClusterError::InvokeFailed(other.to_string()),
        }
    }
}

/// Errors raised by the commissioning state machine. Kept cloneable so the
/// terminal `Failed` state can carry the error while the caller also gets it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommissioningError {
    #[error("setup payload invalid: {0}")]
    SetupPayloadInvalid(String),
    #[error("pairing failed: {0}")]
    PairingFailed(String),
    #[error("csr generation failed: {0}")]
    CsrFailed(String),
    #[error("certificate exchange with cloud failed: {0}")]
    CertificateExchangeFailed(String),
    #[error("operational certificate install failed: {0}")]
    CertificateInstallFailed(String),
    #[error("cloud commissioning confirmation failed: {0}")]
    CloudConfirmationFailed(String),
    #[error("post-commissioning action failed: {0}")]
    PostActionFailed(String),
}

/// Errors raised by the two-phase device linking protocol.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("acl read failed: {0}")]
    AclReadFailed(String),
    #[error("acl write failed: {0}")]
    AclWriteFailed(String),
    #[error("no administer entry in acl")]
    NoAdminEntry,
    #[error("binding read failed: {0}")]
    BindingReadFailed(String),
    #[error("binding write failed: {0}")]
    BindingWriteFailed(String),
    #[error("on/off server endpoint unknown for device {0:#x}")]
    DestinationEndpointUnknown(u64),
}

/// Errors raised by thread dataset reconciliation.
#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("thread border router management cluster not supported")]
    ClusterNotSupported,
    #[error("general commissioning cluster not supported")]
    FailSafeNotSupported,
    #[error("arming fail-safe timer failed")]
    FailSafeArmFailed,
    #[error("setting active operational dataset failed")]
    ActiveDatasetWriteFailed,
    #[error("setting pending operational dataset failed")]
    PendingDatasetWriteFailed,
    #[error("setting pending dataset is not supported on the device")]
    PendingDatasetUnsupported,
    #[error("thread network not visible after setting dataset")]
    NetworkNotVisible,
    #[error("thread credentials access declined by user")]
    CredentialsDeclined,
    #[error("could not generate a local thread dataset")]
    DatasetGenerationFailed,
    #[error("failed to read active dataset")]
    ActiveDatasetReadFailed,
    #[error("failed to store thread credentials locally")]
    LocalStoreFailed,
    #[error("dataset malformed: {0}")]
    DatasetMalformed(String),
}
