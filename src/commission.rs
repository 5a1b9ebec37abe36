//! Commissioning state machine.
//!
//! One [CommissioningEngine] drives one device from setup payload to a fully
//! commissioned cloud-registered node. Intermediate results accumulate on the
//! engine; a failed run keeps them for inspection. The engine never retries
//! on its own.

use crate::cache::{CapabilityCache, DeviceRecord};
use crate::cert::{self, CsrBundle};
use crate::cloud::{CertificateService, NodeCertificates, STATUS_FAILURE, STATUS_SUCCESS};
use crate::clusters::defs::cluster;
use crate::clusters::{
    access_control::{AccessControlClient, AclEntry, PRIVILEGE_OPERATE},
    basic_information::BasicInformationClient,
    descriptor::DescriptorClient,
    vendor::RainmakerClient,
};
use crate::connector::{AttestationOutcome, OperationalCredentials};
use crate::error::CommissioningError;
use crate::onboarding::{self, SetupPayload};
use crate::session::{FabricSession, SessionInner};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Progress of one commissioning run. `Failed` is terminal and reachable
/// from every state except `Ready`; `Ready` is only reachable through
/// `Commissioned`.
#[derive(Debug, Clone, PartialEq)]
pub enum CommissioningState {
    Discovered,
    SessionEstablishing,
    SessionEstablished,
    AttestationPending,
    AttestationResolved,
    CsrRequested,
    CertificateIssued,
    Commissioned,
    PostCommissionActionsRunning,
    Ready,
    Failed(CommissioningError),
}

impl CommissioningState {
    pub fn name(&self) -> &'static str {
        match self {
            CommissioningState::Discovered => "discovered",
            CommissioningState::SessionEstablishing => "session-establishing",
            CommissioningState::SessionEstablished => "session-established",
            CommissioningState::AttestationPending => "attestation-pending",
            CommissioningState::AttestationResolved => "attestation-resolved",
            CommissioningState::CsrRequested => "csr-requested",
            CommissioningState::CertificateIssued => "certificate-issued",
            CommissioningState::Commissioned => "commissioned",
            CommissioningState::PostCommissionActionsRunning => "post-actions",
            CommissioningState::Ready => "ready",
            CommissioningState::Failed(_) => "failed",
        }
    }
}

/// Progress and alert callbacks, the only place commissioning talks to a UI.
pub trait CommissioningObserver: Send + Sync {
    fn on_state(&self, _state: &CommissioningState) {}
    fn on_alert(&self, _message: &str) {}
}

/// No-op observer for headless callers.
pub struct NullObserver;
impl CommissioningObserver for NullObserver {}

/// What the device told us about itself before certificate issuance.
#[derive(Debug, Clone, Default)]
pub struct DeviceMetadata {
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
    pub vendor_name: Option<String>,
    pub product_name: Option<String>,
    pub serial_number: Option<String>,
    pub software_version: Option<u32>,
    pub software_version_string: Option<String>,
    pub device_types: Vec<u64>,
    pub endpoints: Vec<u16>,
    pub servers: HashMap<u16, Vec<u32>>,
    pub clients: HashMap<u16, Vec<u32>>,
}

impl DeviceMetadata {
    fn supports_server(&self, cluster: u32) -> bool {
        self.servers.values().any(|list| list.contains(&cluster))
    }

    fn to_json(&self) -> Value {
        json!({
            "vendor_id": self.vendor_id,
            "product_id": self.product_id,
            "vendor_name": self.vendor_name,
            "product_name": self.product_name,
            "serial_number": self.serial_number,
            "software_version": self.software_version,
            "software_version_string": self.software_version_string,
            "device_types": self.device_types,
            "endpoints": self.endpoints,
        })
    }
}

pub struct CommissioningEngine {
    session: Arc<SessionInner>,
    certificates: Arc<dyn CertificateService>,
    cache: Arc<CapabilityCache>,
    observer: Arc<dyn CommissioningObserver>,
    state: CommissioningState,
    payload: Option<SetupPayload>,
    device_id: u64,
    csr: Option<CsrBundle>,
    issued: Option<NodeCertificates>,
    request_id: Option<String>,
    metadata: DeviceMetadata,
    rainmaker_node_id: Option<String>,
    challenge: Option<String>,
}

impl CommissioningEngine {
    pub fn new(
        session: &FabricSession,
        certificates: Arc<dyn CertificateService>,
        cache: Arc<CapabilityCache>,
        observer: Arc<dyn CommissioningObserver>,
    ) -> Self {
        session.attach_cache(cache.clone());
        Self {
            session: session.inner(),
            certificates,
            cache,
            observer,
            state: CommissioningState::Discovered,
            payload: None,
            device_id: 0,
            csr: None,
            issued: None,
            request_id: None,
            metadata: DeviceMetadata::default(),
            rainmaker_node_id: None,
            challenge: None,
        }
    }

    pub fn state(&self) -> &CommissioningState {
        &self.state
    }

    pub fn metadata(&self) -> &DeviceMetadata {
        &self.metadata
    }

    pub fn rainmaker_node_id(&self) -> Option<&str> {
        self.rainmaker_node_id.as_deref()
    }

    /// Runs the whole flow: pairing, attestation, certificate issuance,
    /// cloud confirmation and capability export.
    pub async fn commission(
        &mut self,
        device_id: u64,
        setup_code: &str,
    ) -> Result<(), CommissioningError> {
        self.device_id = device_id;
        self.begin(setup_code)?;
        self.establish_session().await?;
        self.run_attestation().await;
        self.prepare_csr().await?;
        self.request_certificates().await?;
        self.install_certificates().await?;
        self.post_commission_actions().await?;
        Ok(())
    }

    fn set_state(&mut self, state: CommissioningState) {
        log::info!(
            "commissioning device {:#x}: {} -> {}",
            self.device_id,
            self.state.name(),
            state.name()
        );
        self.state = state;
        self.observer.on_state(&self.state);
    }

    fn fail(&mut self, err: CommissioningError) -> CommissioningError {
        self.set_state(CommissioningState::Failed(err.clone()));
        err
    }

    fn fail_alert(&mut self, err: CommissioningError, alert: &str) -> CommissioningError {
        self.observer.on_alert(alert);
        self.fail(err)
    }

    fn begin(&mut self, setup_code: &str) -> Result<(), CommissioningError> {
        self.set_state(CommissioningState::Discovered);
        match onboarding::parse_setup_code(setup_code) {
            Ok(payload) => {
                self.payload = Some(payload);
                self.set_state(CommissioningState::SessionEstablishing);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn establish_session(&mut self) -> Result<(), CommissioningError> {
        let payload = self
            .payload
            .clone()
            .ok_or_else(|| CommissioningError::SetupPayloadInvalid("no payload parsed".into()))?;
        match self
            .session
            .establish_pase(self.device_id, payload.passcode, payload.discriminator)
            .await
        {
            Ok(()) => {
                self.set_state(CommissioningState::SessionEstablished);
                Ok(())
            }
            Err(e) => Err(self.fail_alert(
                CommissioningError::PairingFailed(e.to_string()),
                "pairing failed",
            )),
        }
    }

    /// Attestation outcome is recorded but never blocks commissioning; the
    /// fabric admits devices with unverifiable attestation chains.
    async fn run_attestation(&mut self) {
        self.set_state(CommissioningState::AttestationPending);
        match self.session.device_attestation(self.device_id).await {
            Ok(AttestationOutcome::Verified) => {
                log::info!("device {:#x} attestation verified", self.device_id)
            }
            Ok(AttestationOutcome::Failed(reason)) => log::warn!(
                "device {:#x} attestation failed, continuing: {}",
                self.device_id,
                reason
            ),
            Err(e) => log::warn!(
                "device {:#x} attestation errored, continuing: {}",
                self.device_id,
                e
            ),
        }
        self.set_state(CommissioningState::AttestationResolved);
    }

    async fn prepare_csr(&mut self) -> Result<(), CommissioningError> {
        let common_name = format!("{}-node", self.session.fabric.group_id);
        let bundle = match cert::generate_csr(&common_name) {
            Ok(b) => b,
            Err(e) => return Err(self.fail_alert(e, "commissioning failed")),
        };
        self.csr = Some(bundle);
        self.metadata = self.collect_metadata().await;
        self.set_state(CommissioningState::CsrRequested);
        Ok(())
    }

    /// Reads basic information and walks the descriptor cluster. Every read
    /// is optional; a device that rejects one still commissions.
    async fn collect_metadata(&self) -> DeviceMetadata {
        let mut meta = DeviceMetadata::default();
        let basic = BasicInformationClient::new(self.session.clone(), self.device_id);
        meta.vendor_id = basic.read_vendor_id().await.ok();
        meta.product_id = basic.read_product_id().await.ok();
        meta.vendor_name = basic.read_vendor_name().await.ok();
        meta.product_name = basic.read_product_name().await.ok();
        meta.serial_number = basic.read_serial_number().await.ok();
        meta.software_version = basic.read_software_version().await.ok();
        meta.software_version_string = basic.read_software_version_string().await.ok();

        let descriptor = DescriptorClient::new(self.session.clone(), self.device_id);
        meta.device_types = descriptor.device_type_list(0).await.unwrap_or_default();
        let mut endpoints = vec![0u16];
        endpoints.extend(descriptor.parts_list().await.unwrap_or_default());
        for endpoint in &endpoints {
            if let Ok(servers) = descriptor.server_list(*endpoint).await {
                meta.servers.insert(*endpoint, servers);
            }
            if let Ok(clients) = descriptor.client_list(*endpoint).await {
                meta.clients.insert(*endpoint, clients);
            }
        }
        meta.endpoints = endpoints;
        meta
    }

    async fn request_certificates(&mut self) -> Result<(), CommissioningError> {
        let csr_pem = self
            .csr
            .as_ref()
            .map(|c| c.csr_pem.clone())
            .ok_or_else(|| CommissioningError::CsrFailed("no csr generated".into()))?;
        let group_id = self.session.fabric.group_id.clone();
        let response = match self
            .certificates
            .add_node_to_fabric(&group_id, &csr_pem, Some(self.metadata.to_json()))
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return Err(self.fail_alert(
                    CommissioningError::CertificateExchangeFailed(e.to_string()),
                    "commissioning failed",
                ))
            }
        };
        let issued = match response.node_certificates() {
            Some(c) if c.node_noc.is_some() => c.clone(),
            _ => {
                let reason = response
                    .description
                    .unwrap_or_else(|| "no certificate in response".to_owned());
                return Err(self.fail_alert(
                    CommissioningError::CertificateExchangeFailed(reason),
                    "commissioning failed",
                ));
            }
        };
        self.request_id = response.request_id;
        self.issued = Some(issued);
        self.set_state(CommissioningState::CertificateIssued);
        Ok(())
    }

    async fn install_certificates(&mut self) -> Result<(), CommissioningError> {
        let issued = self.issued.clone().ok_or_else(|| {
            CommissioningError::CertificateInstallFailed("no issued certificate".into())
        })?;
        let noc_pem = issued.node_noc.as_deref().unwrap_or_default();
        let parts = self.credential_parts(noc_pem);
        let (noc_der, root_der, ipk, admin_subject) = match parts {
            Ok(parts) => parts,
            Err(e) => {
                self.report_failure().await;
                return Err(self.fail_alert(e, "commissioning failed"));
            }
        };
        let credentials = OperationalCredentials {
            noc_der: &noc_der,
            root_der: &root_der,
            ipk: &ipk,
            admin_subject,
        };
        if let Err(e) = self
            .session
            .install_operational_certificate(self.device_id, credentials)
            .await
        {
            self.report_failure().await;
            return Err(self.fail_alert(
                CommissioningError::CertificateInstallFailed(e.to_string()),
                "commissioning failed",
            ));
        }
        self.set_state(CommissioningState::Commissioned);
        Ok(())
    }

    /// Tell the cloud an issued certificate never made it onto the device so
    /// the pending node can be cleaned up. Best effort.
    async fn report_failure(&self) {
        let Some(request_id) = self.request_id.clone() else {
            return;
        };
        let group_id = self.session.fabric.group_id.clone();
        if let Err(e) = self
            .certificates
            .confirm_node_commissioning(&group_id, &request_id, STATUS_FAILURE)
            .await
        {
            log::warn!("failure report to cloud failed: {e:#}");
        }
    }

    fn credential_parts(
        &self,
        noc_pem: &str,
    ) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>, u64), CommissioningError> {
        let install_err =
            |e: crate::error::SessionError| CommissioningError::CertificateInstallFailed(e.to_string());
        let noc_der = cert::pem_to_der(noc_pem)?;
        let root_der = self.session.fabric.root_ca_der().map_err(install_err)?;
        let ipk = self.session.fabric.signed_ipk().map_err(install_err)?;
        let admin_subject = self.session.fabric.admin_subject_id().map_err(install_err)?;
        Ok((noc_der, root_der, ipk, admin_subject))
    }

    async fn post_commission_actions(&mut self) -> Result<(), CommissioningError> {
        self.set_state(CommissioningState::PostCommissionActionsRunning);
        let is_rainmaker = self.metadata.supports_server(cluster::RAINMAKER);
        if is_rainmaker {
            self.confirm_rainmaker().await?;
        } else {
            self.confirm_plain().await?;
        }
        self.export_capabilities(is_rainmaker);
        self.append_operate_subject().await;
        self.set_state(CommissioningState::Ready);
        Ok(())
    }

    /// RainMaker devices prove possession: the device hands over its cloud
    /// node id and a challenge which the cloud checks against the request.
    async fn confirm_rainmaker(&mut self) -> Result<(), CommissioningError> {
        let client = RainmakerClient::new(self.session.clone(), self.device_id);
        let rainmaker_node_id = match client.read_rainmaker_node_id().await {
            Ok(id) => id,
            Err(e) => {
                return Err(self.fail_alert(
                    CommissioningError::PostActionFailed(e.to_string()),
                    "commissioning failed",
                ))
            }
        };
        self.rainmaker_node_id = Some(rainmaker_node_id.clone());

        let matter_node_id = self
            .issued
            .as_ref()
            .and_then(|c| c.matter_node_id.clone())
            .unwrap_or_default();
        if let Err(e) = client.send_node_id(&matter_node_id).await {
            return Err(self.fail_alert(
                CommissioningError::PostActionFailed(e.to_string()),
                "commissioning failed",
            ));
        }

        let challenge = match client.read_challenge().await {
            Ok(c) => c,
            Err(e) => {
                return Err(self.fail_alert(
                    CommissioningError::PostActionFailed(e.to_string()),
                    "fetch challenge failed",
                ))
            }
        };
        self.challenge = Some(challenge.clone());

        let group_id = self.session.fabric.group_id.clone();
        let request_id = self.request_id.clone().unwrap_or_default();
        if let Err(e) = self
            .certificates
            .confirm_matter_rainmaker_commissioning(
                &group_id,
                &request_id,
                &rainmaker_node_id,
                &challenge,
            )
            .await
        {
            return Err(self.fail_alert(
                CommissioningError::CloudConfirmationFailed(e.to_string()),
                "challenge failed",
            ));
        }
        Ok(())
    }

    async fn confirm_plain(&mut self) -> Result<(), CommissioningError> {
        let group_id = self.session.fabric.group_id.clone();
        let request_id = self.request_id.clone().unwrap_or_default();
        if let Err(e) = self
            .certificates
            .confirm_node_commissioning(&group_id, &request_id, STATUS_SUCCESS)
            .await
        {
            return Err(self.fail_alert(
                CommissioningError::CloudConfirmationFailed(e.to_string()),
                "commissioning failed",
            ));
        }
        Ok(())
    }

    fn export_capabilities(&self, is_rainmaker: bool) {
        let mut record = DeviceRecord::new(&self.session.fabric.group_id, self.device_id);
        record.matter_node_id = self.issued.as_ref().and_then(|c| c.matter_node_id.clone());
        record.vendor_id = self.metadata.vendor_id;
        record.product_id = self.metadata.product_id;
        record.vendor_name = self.metadata.vendor_name.clone();
        record.product_name = self.metadata.product_name.clone();
        record.serial_number = self.metadata.serial_number.clone();
        record.software_version = self.metadata.software_version;
        record.software_version_string = self.metadata.software_version_string.clone();
        record.device_types = self.metadata.device_types.clone();
        record.endpoints = self.metadata.endpoints.clone();
        record.servers = self.metadata.servers.clone();
        record.clients = self.metadata.clients.clone();
        record.is_rainmaker = is_rainmaker;
        if let Err(e) = self.cache.upsert(record) {
            log::warn!("capability cache write failed: {e:#}");
        }
    }

    /// Grants the fabric's operate CAT subject access to the device. The
    /// device already works for the admin, so a failure here only logs.
    async fn append_operate_subject(&self) {
        let operate_subject = match self.session.fabric.operate_subject_id() {
            Ok(s) => s,
            Err(e) => {
                log::warn!("operate subject unavailable: {e}");
                return;
            }
        };
        let client = AccessControlClient::new(self.session.clone(), self.device_id);
        let mut acl = match client.read_acl().await {
            Ok(acl) => acl,
            Err(e) => {
                log::warn!("acl read for operate grant failed: {e}");
                return;
            }
        };
        if acl
            .iter()
            .any(|entry| entry.subjects.contains(&operate_subject))
        {
            return;
        }
        acl.push(AclEntry::case_entry(PRIVILEGE_OPERATE, vec![operate_subject]));
        if let Err(e) = client.write_acl(&acl).await {
            log::warn!("acl write for operate grant failed: {e}");
        }
    }
}
