//! Fabric session lifecycle.
//!
//! One [FabricSession] drives one fabric's platform controller. All device
//! traffic funnels through a single async mutex so requests execute strictly
//! one at a time in arrival order; nothing is coalesced or cancelled.
//! Switching fabrics means shutting this session down and starting another.

use crate::cache::CapabilityCache;
use crate::connector::{
    AttestationOutcome, ControllerFactory, DeviceConnector, OperationalCredentials,
};
use crate::error::{ConnectorError, SessionError};
use crate::fabric::Fabric;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Active,
    ShuttingDown,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Active => "active",
            SessionState::ShuttingDown => "shutting-down",
        }
    }
}

pub(crate) struct SessionInner {
    pub(crate) fabric: Fabric,
    connector: Arc<dyn DeviceConnector>,
    op_lock: Mutex<()>,
    state: StdMutex<SessionState>,
    cache: StdMutex<Option<Arc<CapabilityCache>>>,
}

impl SessionInner {
    fn ensure_active(&self) -> Result<(), ConnectorError> {
        let state = *self.state.lock().unwrap();
        if state == SessionState::Active {
            Ok(())
        } else {
            Err(ConnectorError::NotActive(state.name()))
        }
    }

    pub(crate) fn snapshot_cache(&self) -> Option<Arc<CapabilityCache>> {
        self.cache.lock().unwrap().clone()
    }

    pub(crate) async fn resolve(&self, device_id: u64) -> Result<(), ConnectorError> {
        self.ensure_active()?;
        let _queue = self.op_lock.lock().await;
        self.connector.resolve_device(device_id).await
    }

    pub(crate) async fn read(
        &self,
        device_id: u64,
        endpoint: u16,
        cluster: u32,
        attribute: u32,
    ) -> Result<Vec<u8>, ConnectorError> {
        self.ensure_active()?;
        let _queue = self.op_lock.lock().await;
        log::debug!(
            "read device:{:x} endpoint:{} cluster:{:#x} attr:{}",
            device_id,
            endpoint,
            cluster,
            attribute
        );
        self.connector
            .read_attribute(device_id, endpoint, cluster, attribute)
            .await
    }

    pub(crate) async fn write(
        &self,
        device_id: u64,
        endpoint: u16,
        cluster: u32,
        attribute: u32,
        tlv: &[u8],
    ) -> Result<(), ConnectorError> {
        self.ensure_active()?;
        let _queue = self.op_lock.lock().await;
        log::debug!(
            "write device:{:x} endpoint:{} cluster:{:#x} attr:{}",
            device_id,
            endpoint,
            cluster,
            attribute
        );
        self.connector
            .write_attribute(device_id, endpoint, cluster, attribute, tlv)
            .await
    }

    pub(crate) async fn invoke(
        &self,
        device_id: u64,
        endpoint: u16,
        cluster: u32,
        command: u32,
        tlv: &[u8],
        timed_ms: Option<u64>,
    ) -> Result<Vec<u8>, ConnectorError> {
        self.ensure_active()?;
        let _queue = self.op_lock.lock().await;
        log::debug!(
            "invoke device:{:x} endpoint:{} cluster:{:#x} cmd:{} timed:{:?}",
            device_id,
            endpoint,
            cluster,
            command,
            timed_ms
        );
        self.connector
            .invoke_command(device_id, endpoint, cluster, command, tlv, timed_ms)
            .await
    }

    pub(crate) async fn subscribe(
        &self,
        device_id: u64,
        endpoint: u16,
        cluster: u32,
        attribute: u32,
        min_interval_s: u16,
        max_interval_s: u16,
    ) -> Result<mpsc::Receiver<Vec<u8>>, ConnectorError> {
        self.ensure_active()?;
        let _queue = self.op_lock.lock().await;
        self.connector
            .subscribe(
                device_id,
                endpoint,
                cluster,
                attribute,
                min_interval_s,
                max_interval_s,
            )
            .await
    }

    pub(crate) async fn establish_pase(
        &self,
        device_id: u64,
        passcode: u32,
        discriminator: u16,
    ) -> Result<(), ConnectorError> {
        self.ensure_active()?;
        let _queue = self.op_lock.lock().await;
        self.connector
            .establish_pase(device_id, passcode, discriminator)
            .await
    }

    pub(crate) async fn device_attestation(
        &self,
        device_id: u64,
    ) -> Result<AttestationOutcome, ConnectorError> {
        self.ensure_active()?;
        let _queue = self.op_lock.lock().await;
        self.connector.device_attestation(device_id).await
    }

    pub(crate) async fn install_operational_certificate(
        &self,
        device_id: u64,
        credentials: OperationalCredentials<'_>,
    ) -> Result<(), ConnectorError> {
        self.ensure_active()?;
        let _queue = self.op_lock.lock().await;
        self.connector
            .install_operational_certificate(device_id, credentials)
            .await
    }
}

/// Active connection to one fabric's controller.
pub struct FabricSession {
    inner: Arc<SessionInner>,
}

impl FabricSession {
    /// Convert the fabric and operational certificates, derive the group
    /// key and start the platform controller.
    pub async fn start(
        fabric: Fabric,
        operational_cert_pem: &str,
        factory: &dyn ControllerFactory,
    ) -> Result<Self, SessionError> {
        log::info!("starting session for fabric group {}", fabric.group_id);
        let root_der = fabric.root_ca_der()?;
        let noc_der = pem::parse(operational_cert_pem)
            .map_err(|e| SessionError::CertificateInvalid(format!("operational cert: {e}")))?
            .contents()
            .to_vec();
        let ipk = fabric.signed_ipk()?;
        let connector = factory
            .start_controller(&fabric, &root_der, &noc_der, &ipk)
            .await?;
        Ok(Self {
            inner: Arc::new(SessionInner {
                fabric,
                connector,
                op_lock: Mutex::new(()),
                state: StdMutex::new(SessionState::Active),
                cache: StdMutex::new(None),
            }),
        })
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.lock().unwrap()
    }

    pub fn fabric(&self) -> &Fabric {
        &self.inner.fabric
    }

    /// Route attribute values seen by reads and subscription reports into
    /// `cache` as snapshots.
    pub fn attach_cache(&self, cache: Arc<CapabilityCache>) {
        *self.inner.cache.lock().unwrap() = Some(cache);
    }

    /// Stop serving requests. Idempotent; in-flight requests finish, new
    /// ones fail with a not-active error.
    pub fn shutdown(&self) {
        let mut state = self.inner.state.lock().unwrap();
        if *state == SessionState::Active {
            log::info!(
                "shutting down session for fabric group {}",
                self.inner.fabric.group_id
            );
            *state = SessionState::ShuttingDown;
        }
        *state = SessionState::Idle;
    }

    /// Race device resolution against a deadline. The losing side is simply
    /// dropped.
    pub async fn is_reachable(&self, device_id: u64, timeout: Duration) -> bool {
        matches!(
            tokio::time::timeout(timeout, self.inner.resolve(device_id)).await,
            Ok(Ok(()))
        )
    }

    pub(crate) fn inner(&self) -> Arc<SessionInner> {
        self.inner.clone()
    }
}
