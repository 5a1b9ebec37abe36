//! Device-to-device linking.
//!
//! Linking a switch (source) to a light (dest) is a two-phase protocol:
//! first the dest's ACL learns the source's node id, then the source's
//! binding table learns the dest's on/off endpoint. Order matters, and the
//! phases are not transactional: a phase-1 failure leaves everything
//! untouched, a phase-2 failure leaves the ACL entry behind. Unlinking
//! removes the binding before revoking access so the source never holds a
//! binding it is not allowed to use.

use crate::cache::CapabilityCache;
use crate::clusters::access_control::{AccessControlClient, PRIVILEGE_ADMINISTER};
use crate::clusters::binding::{BindingClient, BindingTarget};
use crate::clusters::defs::cluster;
use crate::error::BindingError;
use crate::session::{FabricSession, SessionInner};
use std::sync::Arc;

/// Endpoint used for the source's binding table when the capability cache
/// has no record of it.
const DEFAULT_BINDING_ENDPOINT: u16 = 1;

pub struct DeviceLinker {
    session: Arc<SessionInner>,
    cache: Arc<CapabilityCache>,
}

impl DeviceLinker {
    pub fn new(session: &FabricSession, cache: Arc<CapabilityCache>) -> Self {
        Self {
            session: session.inner(),
            cache,
        }
    }

    fn group_id(&self) -> &str {
        &self.session.fabric.group_id
    }

    fn binding_endpoint(&self, device_id: u64) -> u16 {
        self.cache
            .server_endpoint(self.group_id(), device_id, cluster::BINDING)
            .unwrap_or(DEFAULT_BINDING_ENDPOINT)
    }

    fn on_off_endpoint(&self, device_id: u64) -> Result<u16, BindingError> {
        self.cache
            .server_endpoint(self.group_id(), device_id, cluster::ON_OFF)
            .ok_or(BindingError::DestinationEndpointUnknown(device_id))
    }

    /// Lets `source` control `dest`'s on/off server. Idempotent.
    pub async fn link(&self, source: u64, dest: u64) -> Result<(), BindingError> {
        let dest_endpoint = self.on_off_endpoint(dest)?;
        self.grant_access(source, dest).await?;
        self.add_binding(source, dest, dest_endpoint).await
    }

    /// Reverses [DeviceLinker::link]. Idempotent.
    pub async fn unlink(&self, source: u64, dest: u64) -> Result<(), BindingError> {
        self.remove_binding(source, dest).await?;
        self.revoke_access(source, dest).await
    }

    pub async fn are_linked(&self, source: u64, dest: u64) -> Result<bool, BindingError> {
        let acl_client = AccessControlClient::new(self.session.clone(), dest);
        let acl = acl_client
            .read_acl()
            .await
            .map_err(|e| BindingError::AclReadFailed(e.to_string()))?;
        let in_acl = acl.iter().any(|entry| entry.subjects.contains(&source));

        let bindings = BindingClient::new(
            self.session.clone(),
            source,
            self.binding_endpoint(source),
        )
        .read_bindings()
        .await
        .map_err(|e| BindingError::BindingReadFailed(e.to_string()))?;
        let in_bindings = bindings
            .iter()
            .any(|b| b.node == dest && b.cluster == cluster::ON_OFF);

        Ok(in_acl && in_bindings)
    }

    async fn grant_access(&self, source: u64, dest: u64) -> Result<(), BindingError> {
        let client = AccessControlClient::new(self.session.clone(), dest);
        let mut acl = client
            .read_acl()
            .await
            .map_err(|e| BindingError::AclReadFailed(e.to_string()))?;
        let admin = acl
            .iter_mut()
            .find(|entry| entry.privilege == PRIVILEGE_ADMINISTER)
            .ok_or(BindingError::NoAdminEntry)?;
        if admin.subjects.contains(&source) {
            return Ok(());
        }
        admin.subjects.push(source);
        client
            .write_acl(&acl)
            .await
            .map_err(|e| BindingError::AclWriteFailed(e.to_string()))
    }

    async fn revoke_access(&self, source: u64, dest: u64) -> Result<(), BindingError> {
        let client = AccessControlClient::new(self.session.clone(), dest);
        let mut acl = client
            .read_acl()
            .await
            .map_err(|e| BindingError::AclReadFailed(e.to_string()))?;
        let mut changed = false;
        for entry in &mut acl {
            let before = entry.subjects.len();
            entry.subjects.retain(|s| *s != source);
            changed |= entry.subjects.len() != before;
        }
        if !changed {
            return Ok(());
        }
        client
            .write_acl(&acl)
            .await
            .map_err(|e| BindingError::AclWriteFailed(e.to_string()))
    }

    async fn add_binding(
        &self,
        source: u64,
        dest: u64,
        dest_endpoint: u16,
    ) -> Result<(), BindingError> {
        let client = BindingClient::new(
            self.session.clone(),
            source,
            self.binding_endpoint(source),
        );
        let mut bindings = client
            .read_bindings()
            .await
            .map_err(|e| BindingError::BindingReadFailed(e.to_string()))?;
        if bindings
            .iter()
            .any(|b| b.node == dest && b.cluster == cluster::ON_OFF)
        {
            return Ok(());
        }
        bindings.push(BindingTarget {
            node: dest,
            endpoint: dest_endpoint,
            cluster: cluster::ON_OFF,
        });
        client
            .write_bindings(&bindings)
            .await
            .map_err(|e| BindingError::BindingWriteFailed(e.to_string()))
    }

    async fn remove_binding(&self, source: u64, dest: u64) -> Result<(), BindingError> {
        let client = BindingClient::new(
            self.session.clone(),
            source,
            self.binding_endpoint(source),
        );
        let mut bindings = client
            .read_bindings()
            .await
            .map_err(|e| BindingError::BindingReadFailed(e.to_string()))?;
        let before = bindings.len();
        bindings.retain(|b| !(b.node == dest && b.cluster == cluster::ON_OFF));
        if bindings.len() == before {
            return Ok(());
        }
        client
            .write_bindings(&bindings)
            .await
            .map_err(|e| BindingError::BindingWriteFailed(e.to_string()))
    }
}
