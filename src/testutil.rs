//! Shared fakes for the in-file test modules.

use crate::cloud::{AddNodeResponse, CertificateService, NodeCertificates};
use crate::connector::{
    AttestationOutcome, ControllerFactory, DeviceConnector, OperationalCredentials,
};
use crate::error::{ConnectorError, SessionError};
use crate::fabric::Fabric;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Self-signed P-256 certificate standing in for fabric and operational
/// certificates.
pub const TEST_CERT_PEM: &str = "-----BEGIN CERTIFICATE-----
MIIBjTCCATOgAwIBAgIUZWbqNPki7bWJNGxT0h9vGJFVv1swCgYIKoZIzj0EAwIw
HDEaMBgGA1UEAwwRcm1hdHRlciB0ZXN0IHJvb3QwHhcNMjYwODI5MDQwMTEzWhcN
NDYwODI0MDQwMTEzWjAcMRowGAYDVQQDDBFybWF0dGVyIHRlc3Qgcm9vdDBZMBMG
ByqGSM49AgEGCCqGSM49AwEHA0IABGlSl5xEoz5swnCRCrPe9mYBKAnS4qvkI6hi
3dA7opP0J6qa5C2QzQpb1fVT1N93J4oHTiMlu8+HF7BN7ndKjRujUzBRMB0GA1Ud
DgQWBBTBcsGk3qr7GmCLJ4aj0vCsLxJM9jAfBgNVHSMEGDAWgBTBcsGk3qr7GmCL
J4aj0vCsLxJM9jAPBgNVHRMBAf8EBTADAQH/MAoGCCqGSM49BAMCA0gAMEUCIFqb
e49GqMzh8galf+UNMQX9R9yLiXm0wccCoV7H+CngAiEA4+nmx0jhkhA+B2QInt22
CSx82fzR3x7jXGjcJBZ/RyM=
-----END CERTIFICATE-----
";

pub fn test_fabric() -> Fabric {
    Fabric::new("group-1", 0x1234, TEST_CERT_PEM, "00000001", "00000002")
}

/// Call at the top of a test to see `log` output with `RUST_LOG=debug`.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

type AttrKey = (u64, u16, u32, u32);

#[derive(Default)]
struct FakeState {
    attrs: HashMap<AttrKey, Vec<u8>>,
    writes: Vec<(AttrKey, Vec<u8>)>,
    invokes: Vec<(u64, u16, u32, u32, Vec<u8>, Option<u64>)>,
    invoke_responses: HashMap<(u32, u32), Vec<u8>>,
    fail_reads: HashSet<(u32, u32)>,
    fail_writes: HashSet<(u32, u32)>,
    fail_invokes: HashSet<(u32, u32)>,
    hang_resolve: HashSet<u64>,
    fail_resolve: HashSet<u64>,
    pase_fails: bool,
    install_fails: bool,
    attestation: Option<AttestationOutcome>,
    installed: Vec<(u64, u64)>,
    report_senders: HashMap<AttrKey, mpsc::Sender<Vec<u8>>>,
}

/// Scriptable in-memory device connector.
#[derive(Default)]
pub struct FakeConnector {
    state: Mutex<FakeState>,
}

impl FakeConnector {
    pub fn arc() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_attr(&self, device: u64, endpoint: u16, cluster: u32, attr: u32, tlv: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .attrs
            .insert((device, endpoint, cluster, attr), tlv);
    }

    pub fn attr(&self, device: u64, endpoint: u16, cluster: u32, attr: u32) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .attrs
            .get(&(device, endpoint, cluster, attr))
            .cloned()
    }

    pub fn set_invoke_response(&self, cluster: u32, command: u32, tlv: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .invoke_responses
            .insert((cluster, command), tlv);
    }

    pub fn fail_read_on(&self, cluster: u32, attr: u32) {
        self.state.lock().unwrap().fail_reads.insert((cluster, attr));
    }

    pub fn fail_write_on(&self, cluster: u32, attr: u32) {
        self.state.lock().unwrap().fail_writes.insert((cluster, attr));
    }

    pub fn fail_invoke_on(&self, cluster: u32, command: u32) {
        self.state
            .lock()
            .unwrap()
            .fail_invokes
            .insert((cluster, command));
    }

    pub fn hang_resolve(&self, device: u64) {
        self.state.lock().unwrap().hang_resolve.insert(device);
    }

    pub fn fail_resolve(&self, device: u64) {
        self.state.lock().unwrap().fail_resolve.insert(device);
    }

    pub fn fail_install(&self) {
        self.state.lock().unwrap().install_fails = true;
    }

    pub fn fail_pase(&self) {
        self.state.lock().unwrap().pase_fails = true;
    }

    pub fn set_attestation(&self, outcome: AttestationOutcome) {
        self.state.lock().unwrap().attestation = Some(outcome);
    }

    /// Devices that had operational credentials installed, with the admin
    /// subject used.
    pub fn installed(&self) -> Vec<(u64, u64)> {
        self.state.lock().unwrap().installed.clone()
    }

    pub fn writes_to(&self, cluster: u32, attr: u32) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .writes
            .iter()
            .filter(|((_, _, c, a), _)| *c == cluster && *a == attr)
            .map(|(_, tlv)| tlv.clone())
            .collect()
    }

    pub fn invokes_of(&self, cluster: u32) -> Vec<(u32, Vec<u8>, Option<u64>)> {
        self.state
            .lock()
            .unwrap()
            .invokes
            .iter()
            .filter(|(_, _, c, _, _, _)| *c == cluster)
            .map(|(_, _, _, cmd, tlv, timed)| (*cmd, tlv.clone(), *timed))
            .collect()
    }

    /// Push a subscription report for an attribute with a live subscriber.
    pub fn push_report(&self, device: u64, endpoint: u16, cluster: u32, attr: u32, tlv: Vec<u8>) {
        let senders = self.state.lock().unwrap();
        if let Some(tx) = senders.report_senders.get(&(device, endpoint, cluster, attr)) {
            let _ = tx.try_send(tlv);
        }
    }
}

#[async_trait]
impl DeviceConnector for FakeConnector {
    async fn resolve_device(&self, device_id: u64) -> Result<(), ConnectorError> {
        let hang = {
            let s = self.state.lock().unwrap();
            if s.fail_resolve.contains(&device_id) {
                return Err(ConnectorError::DeviceNotFound(device_id));
            }
            s.hang_resolve.contains(&device_id)
        };
        if hang {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        }
        Ok(())
    }

    async fn establish_pase(
        &self,
        _device_id: u64,
        _passcode: u32,
        _discriminator: u16,
    ) -> Result<(), ConnectorError> {
        if self.state.lock().unwrap().pase_fails {
            Err(ConnectorError::Transport("pase handshake failed".into()))
        } else {
            Ok(())
        }
    }

    async fn device_attestation(
        &self,
        _device_id: u64,
    ) -> Result<AttestationOutcome, ConnectorError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .attestation
            .clone()
            .unwrap_or(AttestationOutcome::Verified))
    }

    async fn install_operational_certificate(
        &self,
        device_id: u64,
        credentials: OperationalCredentials<'_>,
    ) -> Result<(), ConnectorError> {
        let mut s = self.state.lock().unwrap();
        if s.install_fails {
            return Err(ConnectorError::Status(1));
        }
        s.installed.push((device_id, credentials.admin_subject));
        Ok(())
    }

    async fn read_attribute(
        &self,
        device_id: u64,
        endpoint: u16,
        cluster: u32,
        attribute: u32,
    ) -> Result<Vec<u8>, ConnectorError> {
        let s = self.state.lock().unwrap();
        if s.fail_reads.contains(&(cluster, attribute)) {
            return Err(ConnectorError::Status(1));
        }
        s.attrs
            .get(&(device_id, endpoint, cluster, attribute))
            .cloned()
            .ok_or(ConnectorError::Status(0x86))
    }

    async fn write_attribute(
        &self,
        device_id: u64,
        endpoint: u16,
        cluster: u32,
        attribute: u32,
        tlv: &[u8],
    ) -> Result<(), ConnectorError> {
        let mut s = self.state.lock().unwrap();
        if s.fail_writes.contains(&(cluster, attribute)) {
            return Err(ConnectorError::Status(1));
        }
        let key = (device_id, endpoint, cluster, attribute);
        s.attrs.insert(key, tlv.to_vec());
        s.writes.push((key, tlv.to_vec()));
        Ok(())
    }

    async fn invoke_command(
        &self,
        device_id: u64,
        endpoint: u16,
        cluster: u32,
        command: u32,
        tlv: &[u8],
        timed_ms: Option<u64>,
    ) -> Result<Vec<u8>, ConnectorError> {
        let mut s = self.state.lock().unwrap();
        if s.fail_invokes.contains(&(cluster, command)) {
            return Err(ConnectorError::Status(1));
        }
        s.invokes
            .push((device_id, endpoint, cluster, command, tlv.to_vec(), timed_ms));
        Ok(s.invoke_responses
            .get(&(cluster, command))
            .cloned()
            .unwrap_or_default())
    }

    async fn subscribe(
        &self,
        device_id: u64,
        endpoint: u16,
        cluster: u32,
        attribute: u32,
        _min_interval_s: u16,
        _max_interval_s: u16,
    ) -> Result<mpsc::Receiver<Vec<u8>>, ConnectorError> {
        let (tx, rx) = mpsc::channel(16);
        let mut s = self.state.lock().unwrap();
        let key = (device_id, endpoint, cluster, attribute);
        if let Some(current) = s.attrs.get(&key) {
            let _ = tx.try_send(current.clone());
        }
        s.report_senders.insert(key, tx);
        Ok(rx)
    }
}

/// Factory handing out one shared [FakeConnector].
pub struct FakeFactory {
    connector: Arc<FakeConnector>,
}

impl FakeFactory {
    pub fn new(connector: &Arc<FakeConnector>) -> Self {
        Self {
            connector: connector.clone(),
        }
    }
}

#[async_trait]
impl ControllerFactory for FakeFactory {
    async fn start_controller(
        &self,
        _fabric: &Fabric,
        _root_ca_der: &[u8],
        _operational_cert_der: &[u8],
        _ipk: &[u8],
    ) -> Result<Arc<dyn DeviceConnector>, SessionError> {
        Ok(self.connector.clone())
    }
}

#[derive(Default)]
struct FakeCloudState {
    add_node_calls: Vec<(String, String)>,
    confirm_node_calls: Vec<(String, String, String)>,
    confirm_rainmaker_calls: Vec<(String, String, String, String)>,
    removed: Vec<(String, Vec<String>)>,
    fail_add_node: bool,
    fail_rainmaker_confirm: bool,
}

/// In-memory stand-in for the cloud CA.
pub struct FakeCertificateService {
    matter_node_id: String,
    state: Mutex<FakeCloudState>,
}

impl FakeCertificateService {
    pub fn new(matter_node_id: &str) -> Self {
        Self {
            matter_node_id: matter_node_id.to_owned(),
            state: Mutex::new(FakeCloudState::default()),
        }
    }

    pub fn fail_add_node(&self) {
        self.state.lock().unwrap().fail_add_node = true;
    }

    pub fn fail_rainmaker_confirm(&self) {
        self.state.lock().unwrap().fail_rainmaker_confirm = true;
    }

    pub fn confirm_node_calls(&self) -> Vec<(String, String, String)> {
        self.state.lock().unwrap().confirm_node_calls.clone()
    }

    pub fn confirm_rainmaker_calls(&self) -> Vec<(String, String, String, String)> {
        self.state.lock().unwrap().confirm_rainmaker_calls.clone()
    }

    pub fn add_node_calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().add_node_calls.clone()
    }
}

#[async_trait]
impl CertificateService for FakeCertificateService {
    async fn add_node_to_fabric(
        &self,
        group_id: &str,
        csr_pem: &str,
        _metadata: Option<Value>,
    ) -> Result<AddNodeResponse> {
        let mut s = self.state.lock().unwrap();
        s.add_node_calls
            .push((group_id.to_owned(), csr_pem.to_owned()));
        if s.fail_add_node {
            return Err(anyhow!("cloud rejected csr"));
        }
        Ok(AddNodeResponse {
            request_id: Some("req-1".to_owned()),
            status: Some("success".to_owned()),
            certificates: Some(vec![NodeCertificates {
                group_id: Some(group_id.to_owned()),
                matter_node_id: Some(self.matter_node_id.clone()),
                node_noc: Some(TEST_CERT_PEM.to_owned()),
            }]),
            description: None,
        })
    }

    async fn confirm_node_commissioning(
        &self,
        group_id: &str,
        request_id: &str,
        status: &str,
    ) -> Result<()> {
        self.state.lock().unwrap().confirm_node_calls.push((
            group_id.to_owned(),
            request_id.to_owned(),
            status.to_owned(),
        ));
        Ok(())
    }

    async fn confirm_matter_rainmaker_commissioning(
        &self,
        group_id: &str,
        request_id: &str,
        rainmaker_node_id: &str,
        challenge: &str,
    ) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.confirm_rainmaker_calls.push((
            group_id.to_owned(),
            request_id.to_owned(),
            rainmaker_node_id.to_owned(),
            challenge.to_owned(),
        ));
        if s.fail_rainmaker_confirm {
            return Err(anyhow!("challenge rejected"));
        }
        Ok(())
    }

    async fn remove_nodes_from_fabric(&self, group_id: &str, node_ids: &[String]) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .removed
            .push((group_id.to_owned(), node_ids.to_vec()));
        Ok(())
    }
}
