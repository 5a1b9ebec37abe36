//! Cloud node-group service: the fabric CA and commissioning bookkeeping.
//!
//! The cloud signs node CSRs into operational certificates and tracks which
//! nodes belong to which group. [CertificateService] is the seam; production
//! talks HTTP through [HttpCertificateService], tests substitute an
//! in-memory fake.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const OPERATION_ADD: &str = "add";
pub const OPERATION_REMOVE: &str = "remove";
pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAILURE: &str = "failure";

#[derive(Debug, Serialize)]
struct CsrRequest {
    csr: String,
    group_id: String,
}

#[derive(Debug, Serialize)]
struct AddNodeRequest {
    operation: String,
    csr_type: String,
    csr_requests: Vec<CsrRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Value>,
}

/// One issued node operational certificate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeCertificates {
    pub group_id: Option<String>,
    /// Matter node id the cloud assigned, 16 hex digits.
    pub matter_node_id: Option<String>,
    /// Node operational certificate, PEM.
    pub node_noc: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddNodeResponse {
    pub request_id: Option<String>,
    pub status: Option<String>,
    pub certificates: Option<Vec<NodeCertificates>>,
    pub description: Option<String>,
}

impl AddNodeResponse {
    /// First issued certificate, if the cloud returned any.
    pub fn node_certificates(&self) -> Option<&NodeCertificates> {
        self.certificates.as_ref()?.first()
    }
}

#[derive(Debug, Serialize)]
struct ConfirmRequest {
    request_id: String,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rainmaker_node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    challenge: Option<String>,
}

#[derive(Debug, Serialize)]
struct RemoveNodesRequest {
    nodes: Vec<String>,
    operation: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: Option<String>,
    description: Option<String>,
}

/// Fabric CA operations performed against the cloud.
#[async_trait]
pub trait CertificateService: Send + Sync {
    /// Submit a node CSR for signing into the group's fabric.
    async fn add_node_to_fabric(
        &self,
        group_id: &str,
        csr_pem: &str,
        metadata: Option<Value>,
    ) -> Result<AddNodeResponse>;

    /// Report plain Matter commissioning outcome for an earlier request.
    async fn confirm_node_commissioning(
        &self,
        group_id: &str,
        request_id: &str,
        status: &str,
    ) -> Result<()>;

    /// Report RainMaker commissioning outcome, proving device ownership with
    /// the challenge read from the device.
    async fn confirm_matter_rainmaker_commissioning(
        &self,
        group_id: &str,
        request_id: &str,
        rainmaker_node_id: &str,
        challenge: &str,
    ) -> Result<()>;

    /// Detach nodes from the group's fabric.
    async fn remove_nodes_from_fabric(&self, group_id: &str, node_ids: &[String]) -> Result<()>;
}

/// HTTP implementation against the RainMaker node-group API.
pub struct HttpCertificateService {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl HttpCertificateService {
    pub fn new(base_url: &str, access_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            access_token: access_token.to_owned(),
        }
    }

    fn group_url(&self, group_id: Option<&str>) -> String {
        match group_id {
            Some(g) => format!("{}/user/node_group?group_id={}", self.base_url, g),
            None => format!("{}/user/node_group", self.base_url),
        }
    }

    async fn put_json<B: Serialize>(&self, url: &str, body: &B) -> Result<reqwest::Response> {
        let resp = self
            .client
            .put(url)
            .header("Authorization", &self.access_token)
            .json(body)
            .send()
            .await
            .context("node group request failed")?;
        if !resp.status().is_success() {
            return Err(anyhow!("node group request status {}", resp.status()));
        }
        Ok(resp)
    }
}

#[async_trait]
impl CertificateService for HttpCertificateService {
    async fn add_node_to_fabric(
        &self,
        group_id: &str,
        csr_pem: &str,
        metadata: Option<Value>,
    ) -> Result<AddNodeResponse> {
        let body = AddNodeRequest {
            operation: OPERATION_ADD.to_owned(),
            csr_type: "node".to_owned(),
            csr_requests: vec![CsrRequest {
                csr: csr_pem.to_owned(),
                group_id: group_id.to_owned(),
            }],
            metadata,
        };
        let resp = self.put_json(&self.group_url(None), &body).await?;
        let parsed: AddNodeResponse = resp.json().await.context("add node response body")?;
        if parsed.node_certificates().is_none() {
            return Err(anyhow!(
                "cloud issued no certificates: {}",
                parsed.description.as_deref().unwrap_or("no description")
            ));
        }
        Ok(parsed)
    }

    async fn confirm_node_commissioning(
        &self,
        group_id: &str,
        request_id: &str,
        status: &str,
    ) -> Result<()> {
        let body = ConfirmRequest {
            request_id: request_id.to_owned(),
            status: status.to_owned(),
            rainmaker_node_id: None,
            challenge: None,
        };
        self.put_json(&self.group_url(Some(group_id)), &body).await?;
        Ok(())
    }

    async fn confirm_matter_rainmaker_commissioning(
        &self,
        group_id: &str,
        request_id: &str,
        rainmaker_node_id: &str,
        challenge: &str,
    ) -> Result<()> {
        let body = ConfirmRequest {
            request_id: request_id.to_owned(),
            status: STATUS_SUCCESS.to_owned(),
            rainmaker_node_id: Some(rainmaker_node_id.to_owned()),
            challenge: Some(challenge.to_owned()),
        };
        let resp = self.put_json(&self.group_url(Some(group_id)), &body).await?;
        let parsed: StatusResponse = resp.json().await.context("confirm response body")?;
        match parsed.status.as_deref() {
            Some(s) if s.eq_ignore_ascii_case(STATUS_SUCCESS) => Ok(()),
            other => Err(anyhow!(
                "rainmaker confirmation rejected: {}",
                parsed
                    .description
                    .as_deref()
                    .unwrap_or(other.unwrap_or("no status"))
            )),
        }
    }

    async fn remove_nodes_from_fabric(&self, group_id: &str, node_ids: &[String]) -> Result<()> {
        let body = RemoveNodesRequest {
            nodes: node_ids.to_vec(),
            operation: OPERATION_REMOVE.to_owned(),
        };
        self.put_json(&self.group_url(Some(group_id)), &body).await?;
        Ok(())
    }
}
