//! Thread credential reconciliation.
//!
//! A border router may hold an active dataset, the host platform may hold
//! one locally, and the two can disagree. [ThreadDatasetManager] reconciles
//! the copies through the thread border router management cluster, arming
//! the device fail-safe around every dataset write.

pub mod dataset;

pub use dataset::ThreadDataset;

use crate::cache::CapabilityCache;
use crate::clusters::defs::cluster;
use crate::clusters::general_commissioning::GeneralCommissioningClient;
use crate::clusters::tbr::ThreadBorderRouterClient;
use crate::error::ThreadError;
use crate::session::{FabricSession, SessionInner};
use async_trait::async_trait;
use std::sync::Arc;

const FAIL_SAFE_EXPIRY_S: u16 = 300;
const FAIL_SAFE_BREADCRUMB: u64 = 1;
const PENDING_DELAY_MS: u32 = 60_000;

/// Looks for a Thread network on the air. Production backs this with the
/// platform's network scan API.
#[async_trait]
pub trait NetworkScanner: Send + Sync {
    async fn thread_network_visible(&self, network_name: &str) -> bool;
}

/// Host-platform thread credential storage. Fetching may require user
/// consent and can be declined.
#[async_trait]
pub trait ThreadCredentialStore: Send + Sync {
    async fn fetch_active_dataset(&self) -> Result<Option<Vec<u8>>, ThreadError>;
    async fn store_active_dataset(
        &self,
        network_name: &str,
        dataset: &[u8],
    ) -> Result<(), ThreadError>;
}

pub struct ThreadDatasetManager {
    session: Arc<SessionInner>,
    cache: Arc<CapabilityCache>,
    scanner: Arc<dyn NetworkScanner>,
    store: Arc<dyn ThreadCredentialStore>,
}

impl ThreadDatasetManager {
    pub fn new(
        session: &FabricSession,
        cache: Arc<CapabilityCache>,
        scanner: Arc<dyn NetworkScanner>,
        store: Arc<dyn ThreadCredentialStore>,
    ) -> Self {
        Self {
            session: session.inner(),
            cache,
            scanner,
            store,
        }
    }

    /// Reconciles the border router's dataset with the locally stored one.
    pub async fn update_thread_dataset(&self, device_id: u64) -> Result<(), ThreadError> {
        let endpoint = self
            .cache
            .server_endpoint(
                &self.session.fabric.group_id,
                device_id,
                cluster::THREAD_BORDER_ROUTER_MANAGEMENT,
            )
            .ok_or(ThreadError::ClusterNotSupported)?;
        let tbr = ThreadBorderRouterClient::new(self.session.clone(), device_id, endpoint);

        let device_timestamp = match tbr.active_dataset_timestamp().await {
            Ok(ts) => ts,
            Err(e) => {
                log::warn!("dataset timestamp read failed, assuming no dataset: {e}");
                None
            }
        };
        let local = self.store.fetch_active_dataset().await?;

        match (device_timestamp, local) {
            (None, None) => self.form_new_network(device_id, &tbr).await,
            (None, Some(local)) => {
                let ds = ThreadDataset::parse(&local)?;
                log::info!(
                    "pushing stored dataset '{}' to device {:#x}",
                    ds.network_name().unwrap_or_default(),
                    device_id
                );
                self.write_active(device_id, &tbr, &ds.to_bytes()).await
            }
            (Some(_), None) => self.pull_and_store(&tbr).await,
            (Some(device_ts), Some(local)) => {
                self.push_pending(device_id, &tbr, device_ts, &local).await
            }
        }
    }

    /// Case 1: nothing anywhere. Form a network from a generated dataset and
    /// verify it actually came up before persisting.
    async fn form_new_network(
        &self,
        device_id: u64,
        tbr: &ThreadBorderRouterClient,
    ) -> Result<(), ThreadError> {
        let ds = ThreadDataset::generate();
        let name = ds
            .network_name()
            .ok_or(ThreadError::DatasetGenerationFailed)?;
        self.write_active(device_id, tbr, &ds.to_bytes()).await?;
        if !self.scanner.thread_network_visible(&name).await {
            return Err(ThreadError::NetworkNotVisible);
        }
        self.store
            .store_active_dataset(&name, &ds.to_bytes())
            .await
            .map_err(|_| ThreadError::LocalStoreFailed)
    }

    /// Case 3: only the device has credentials; mirror them locally.
    async fn pull_and_store(&self, tbr: &ThreadBorderRouterClient) -> Result<(), ThreadError> {
        let bytes = tbr
            .get_active_dataset()
            .await
            .map_err(|_| ThreadError::ActiveDatasetReadFailed)?;
        let ds = ThreadDataset::parse(&bytes)?;
        let name = ds.network_name().unwrap_or_default();
        self.store
            .store_active_dataset(&name, &bytes)
            .await
            .map_err(|_| ThreadError::LocalStoreFailed)
    }

    /// Case 4: both sides hold credentials. The local copy wins; its
    /// timestamp is bumped past the device's and the device migrates via a
    /// delayed pending dataset.
    async fn push_pending(
        &self,
        device_id: u64,
        tbr: &ThreadBorderRouterClient,
        device_timestamp: u64,
        local: &[u8],
    ) -> Result<(), ThreadError> {
        let pan_change = tbr.supports_pan_change().await.unwrap_or(false);
        if !pan_change {
            return Err(ThreadError::PendingDatasetUnsupported);
        }
        let mut ds = ThreadDataset::parse(local)?;
        let local_timestamp = ds.active_timestamp().unwrap_or(0);
        if local_timestamp <= device_timestamp {
            ds.set_active_timestamp(device_timestamp);
            ds.increase_active_timestamp(1);
        }
        ds.add_delay_timer(PENDING_DELAY_MS);

        self.arm_fail_safe(device_id).await?;
        let result = tbr.set_pending_dataset(&ds.to_bytes()).await;
        self.release_fail_safe(device_id).await;
        result.map_err(|_| ThreadError::PendingDatasetWriteFailed)
    }

    /// Arm, write the active dataset, release. Commissioning-complete is
    /// sent even when the write fails so the device leaves the arming
    /// window.
    async fn write_active(
        &self,
        device_id: u64,
        tbr: &ThreadBorderRouterClient,
        bytes: &[u8],
    ) -> Result<(), ThreadError> {
        self.arm_fail_safe(device_id).await?;
        let result = tbr.set_active_dataset(bytes).await;
        self.release_fail_safe(device_id).await;
        result.map_err(|_| ThreadError::ActiveDatasetWriteFailed)
    }

    async fn arm_fail_safe(&self, device_id: u64) -> Result<(), ThreadError> {
        let root_servers = self
            .cache
            .record(&self.session.fabric.group_id, device_id)
            .and_then(|r| r.servers.get(&0).cloned());
        if let Some(servers) = root_servers {
            if !servers.contains(&cluster::GENERAL_COMMISSIONING) {
                return Err(ThreadError::FailSafeNotSupported);
            }
        }
        let gc = GeneralCommissioningClient::new(self.session.clone(), device_id);
        match gc
            .arm_fail_safe(FAIL_SAFE_EXPIRY_S, FAIL_SAFE_BREADCRUMB)
            .await
        {
            Ok(0) => Ok(()),
            Ok(code) => {
                log::warn!("arm fail-safe returned device error {code}");
                Err(ThreadError::FailSafeArmFailed)
            }
            Err(_) => Err(ThreadError::FailSafeArmFailed),
        }
    }

    async fn release_fail_safe(&self, device_id: u64) {
        let gc = GeneralCommissioningClient::new(self.session.clone(), device_id);
        if let Err(e) = gc.commissioning_complete().await {
            log::warn!("commissioning-complete after dataset write failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DeviceRecord;
    use crate::clusters::defs::{cluster, general_commissioning as gc, thread_br_management as tbr};
    use crate::session::FabricSession;
    use crate::testutil::{test_fabric, FakeConnector, FakeFactory, TEST_CERT_PEM};
    use crate::tlv::TlvWriter;
    use std::sync::Mutex;

    const DEVICE: u64 = 0x30;
    const ENDPOINT: u16 = 1;

    struct FakeScanner {
        visible: Mutex<Vec<String>>,
        queried: Mutex<Vec<String>>,
    }

    impl FakeScanner {
        fn seeing(names: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                visible: Mutex::new(names.iter().map(|s| s.to_string()).collect()),
                queried: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl NetworkScanner for FakeScanner {
        async fn thread_network_visible(&self, network_name: &str) -> bool {
            self.queried.lock().unwrap().push(network_name.to_owned());
            self.visible
                .lock()
                .unwrap()
                .iter()
                .any(|n| n == network_name)
        }
    }

    #[derive(Default)]
    struct FakeStore {
        dataset: Mutex<Option<Vec<u8>>>,
        declined: Mutex<bool>,
        stored: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl FakeStore {
        fn with_dataset(bytes: Vec<u8>) -> Arc<Self> {
            let store = Self::default();
            *store.dataset.lock().unwrap() = Some(bytes);
            Arc::new(store)
        }

        fn declining() -> Arc<Self> {
            let store = Self::default();
            *store.declined.lock().unwrap() = true;
            Arc::new(store)
        }
    }

    #[async_trait]
    impl ThreadCredentialStore for FakeStore {
        async fn fetch_active_dataset(&self) -> Result<Option<Vec<u8>>, ThreadError> {
            if *self.declined.lock().unwrap() {
                return Err(ThreadError::CredentialsDeclined);
            }
            Ok(self.dataset.lock().unwrap().clone())
        }

        async fn store_active_dataset(
            &self,
            network_name: &str,
            dataset: &[u8],
        ) -> Result<(), ThreadError> {
            self.stored
                .lock()
                .unwrap()
                .push((network_name.to_owned(), dataset.to_vec()));
            Ok(())
        }
    }

    fn arm_ok_response() -> Vec<u8> {
        let mut w = TlvWriter::new();
        w.start_struct_anon();
        w.put_u8(0, 0);
        w.end_container();
        w.finish()
    }

    fn set_device_timestamp(connector: &FakeConnector, ts: Option<u64>) {
        let mut w = TlvWriter::new();
        match ts {
            Some(v) => w.put_u64_anon(v),
            None => w.put_null_anon(),
        }
        connector.set_attr(
            DEVICE,
            ENDPOINT,
            cluster::THREAD_BORDER_ROUTER_MANAGEMENT,
            tbr::ATTR_ACTIVE_DATASET_TIMESTAMP,
            w.finish(),
        );
    }

    fn set_feature_map(connector: &FakeConnector, map: u64) {
        let mut w = TlvWriter::new();
        w.put_u64_anon(map);
        connector.set_attr(
            DEVICE,
            ENDPOINT,
            cluster::THREAD_BORDER_ROUTER_MANAGEMENT,
            tbr::ATTR_FEATURE_MAP,
            w.finish(),
        );
    }

    async fn base_rig() -> (std::sync::Arc<FakeConnector>, Arc<CapabilityCache>, FabricSession) {
        crate::testutil::init_logging();
        let connector = FakeConnector::arc();
        connector.set_invoke_response(
            cluster::GENERAL_COMMISSIONING,
            gc::CMD_ARM_FAIL_SAFE,
            arm_ok_response(),
        );
        connector.set_invoke_response(
            cluster::GENERAL_COMMISSIONING,
            gc::CMD_COMMISSIONING_COMPLETE,
            arm_ok_response(),
        );
        let factory = FakeFactory::new(&connector);
        let session = FabricSession::start(test_fabric(), TEST_CERT_PEM, &factory)
            .await
            .unwrap();
        let cache = Arc::new(CapabilityCache::in_memory());
        let mut record = DeviceRecord::new("group-1", DEVICE);
        record.servers.insert(
            ENDPOINT,
            vec![cluster::THREAD_BORDER_ROUTER_MANAGEMENT],
        );
        cache.upsert(record).unwrap();
        (connector, cache, session)
    }

    #[tokio::test]
    async fn case1_forms_and_verifies_new_network() {
        let (connector, cache, session) = base_rig().await;
        set_device_timestamp(&connector, None);
        let scanner = FakeScanner::seeing(&["Espressif-TBR"]);
        let store = Arc::new(FakeStore::default());
        let manager =
            ThreadDatasetManager::new(&session, cache, scanner.clone(), store.clone());

        manager.update_thread_dataset(DEVICE).await.unwrap();

        let invokes = connector.invokes_of(cluster::THREAD_BORDER_ROUTER_MANAGEMENT);
        assert_eq!(invokes.len(), 1);
        assert_eq!(invokes[0].0, tbr::CMD_SET_ACTIVE_DATASET);
        assert_eq!(invokes[0].2, Some(5_000));

        let gc_invokes = connector.invokes_of(cluster::GENERAL_COMMISSIONING);
        assert_eq!(
            gc_invokes.iter().map(|i| i.0).collect::<Vec<_>>(),
            vec![gc::CMD_ARM_FAIL_SAFE, gc::CMD_COMMISSIONING_COMPLETE]
        );

        let stored = store.stored.lock().unwrap().clone();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].0, "Espressif-TBR");
        let ds = ThreadDataset::parse(&stored[0].1).unwrap();
        assert_eq!(ds.get(dataset::TAG_NETWORK_KEY).unwrap().len(), 16);
        assert_eq!(*scanner.queried.lock().unwrap(), vec!["Espressif-TBR"]);
    }

    #[tokio::test]
    async fn case1_invisible_network_is_an_error() {
        let (connector, cache, session) = base_rig().await;
        set_device_timestamp(&connector, None);
        let scanner = FakeScanner::seeing(&[]);
        let store = Arc::new(FakeStore::default());
        let manager = ThreadDatasetManager::new(&session, cache, scanner, store.clone());

        let err = manager.update_thread_dataset(DEVICE).await.unwrap_err();
        assert!(matches!(err, ThreadError::NetworkNotVisible));
        assert!(store.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn case3_pulls_device_dataset_into_store() {
        let (connector, cache, session) = base_rig().await;
        set_device_timestamp(&connector, Some(42));
        let device_ds = ThreadDataset::generate();
        let mut w = TlvWriter::new();
        w.start_struct_anon();
        w.put_octets(0, &device_ds.to_bytes());
        w.end_container();
        connector.set_invoke_response(
            cluster::THREAD_BORDER_ROUTER_MANAGEMENT,
            tbr::CMD_GET_ACTIVE_DATASET,
            w.finish(),
        );
        let scanner = FakeScanner::seeing(&[]);
        let store = Arc::new(FakeStore::default());
        let manager = ThreadDatasetManager::new(&session, cache, scanner, store.clone());

        manager.update_thread_dataset(DEVICE).await.unwrap();

        let stored = store.stored.lock().unwrap().clone();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].1, device_ds.to_bytes());
    }

    #[tokio::test]
    async fn case4_without_pan_change_feature_fails() {
        let (connector, cache, session) = base_rig().await;
        set_device_timestamp(&connector, Some(42));
        set_feature_map(&connector, 0);
        let local = ThreadDataset::generate().to_bytes();
        let manager = ThreadDatasetManager::new(
            &session,
            cache,
            FakeScanner::seeing(&[]),
            FakeStore::with_dataset(local),
        );

        let err = manager.update_thread_dataset(DEVICE).await.unwrap_err();
        assert!(matches!(err, ThreadError::PendingDatasetUnsupported));
    }

    #[tokio::test]
    async fn case4_bumps_timestamp_and_writes_pending() {
        let (connector, cache, session) = base_rig().await;
        set_device_timestamp(&connector, Some(500));
        set_feature_map(&connector, tbr::FEATURE_PAN_CHANGE);
        let mut local = ThreadDataset::generate();
        local.set_active_timestamp(100);
        let manager = ThreadDatasetManager::new(
            &session,
            cache,
            FakeScanner::seeing(&[]),
            FakeStore::with_dataset(local.to_bytes()),
        );

        manager.update_thread_dataset(DEVICE).await.unwrap();

        let invokes = connector.invokes_of(cluster::THREAD_BORDER_ROUTER_MANAGEMENT);
        assert_eq!(invokes.len(), 1);
        assert_eq!(invokes[0].0, tbr::CMD_SET_PENDING_DATASET);
        let sent = crate::tlv::decode(&invokes[0].1).unwrap();
        let pending = ThreadDataset::parse(sent.get_octets(&[0]).unwrap()).unwrap();
        assert_eq!(pending.active_timestamp(), Some(501));
        assert_eq!(
            pending.get(dataset::TAG_DELAY_TIMER).unwrap(),
            &60_000u32.to_be_bytes()
        );
    }

    #[tokio::test]
    async fn root_endpoint_without_general_commissioning_is_rejected() {
        let (connector, cache, session) = base_rig().await;
        set_device_timestamp(&connector, None);
        let mut record = cache.record("group-1", DEVICE).unwrap();
        record.servers.insert(0, vec![cluster::DESCRIPTOR]);
        cache.upsert(record).unwrap();
        let manager = ThreadDatasetManager::new(
            &session,
            cache,
            FakeScanner::seeing(&["Espressif-TBR"]),
            Arc::new(FakeStore::default()),
        );

        let err = manager.update_thread_dataset(DEVICE).await.unwrap_err();
        assert!(matches!(err, ThreadError::FailSafeNotSupported));
        assert!(connector
            .invokes_of(cluster::THREAD_BORDER_ROUTER_MANAGEMENT)
            .is_empty());
    }

    #[tokio::test]
    async fn arm_fail_safe_invoke_failure_aborts_the_write() {
        let (connector, cache, session) = base_rig().await;
        set_device_timestamp(&connector, None);
        connector.fail_invoke_on(cluster::GENERAL_COMMISSIONING, gc::CMD_ARM_FAIL_SAFE);
        let store = Arc::new(FakeStore::default());
        let manager = ThreadDatasetManager::new(
            &session,
            cache,
            FakeScanner::seeing(&["Espressif-TBR"]),
            store.clone(),
        );

        let err = manager.update_thread_dataset(DEVICE).await.unwrap_err();
        assert!(matches!(err, ThreadError::FailSafeArmFailed));
        assert!(connector
            .invokes_of(cluster::THREAD_BORDER_ROUTER_MANAGEMENT)
            .is_empty());
        assert!(store.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn declined_credentials_propagate() {
        let (connector, cache, session) = base_rig().await;
        set_device_timestamp(&connector, None);
        let manager = ThreadDatasetManager::new(
            &session,
            cache,
            FakeScanner::seeing(&[]),
            FakeStore::declining(),
        );
        let err = manager.update_thread_dataset(DEVICE).await.unwrap_err();
        assert!(matches!(err, ThreadError::CredentialsDeclined));
    }

    #[tokio::test]
    async fn non_tbr_device_is_rejected() {
        let (connector, _cache, session) = base_rig().await;
        let _ = connector;
        let empty_cache = Arc::new(CapabilityCache::in_memory());
        let manager = ThreadDatasetManager::new(
            &session,
            empty_cache,
            FakeScanner::seeing(&[]),
            Arc::new(FakeStore::default()),
        );
        let err = manager.update_thread_dataset(DEVICE).await.unwrap_err();
        assert!(matches!(err, ThreadError::ClusterNotSupported));
    }
}
