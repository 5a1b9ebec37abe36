//! Fabric identity: the cloud group a commissioned device joins.
//!
//! A fabric carries the cloud group id, the Matter fabric id, the fabric root
//! certificate and the CAT (CASE authenticated tag) ids the cloud assigned to
//! the group. Key material for group messaging is derived with HKDF the same
//! way the Matter spec derives the operational group key.

use crate::error::SessionError;
use byteorder::{BigEndian, WriteBytesExt};
use hkdf::Hkdf;
use sha2::Sha256;
use x509_cert::der::Decode;
use x509_cert::Certificate;

/// CAT subjects are the CAT id suffixed onto this node-id prefix.
const CAT_SUBJECT_PREFIX: &str = "FFFFFFFD";

#[derive(Debug, Clone)]
pub struct Fabric {
    /// Cloud node-group id this fabric belongs to.
    pub group_id: String,
    pub fabric_id: u64,
    /// Fabric root CA certificate, PEM.
    pub root_ca_pem: String,
    pub ipk_epoch_key: Vec<u8>,
    /// CAT id for administer privilege, 8 hex digits.
    pub cat_id_admin: String,
    /// CAT id for operate privilege, 8 hex digits.
    pub cat_id_operate: String,
}

impl Fabric {
    pub fn new(
        group_id: &str,
        fabric_id: u64,
        root_ca_pem: &str,
        cat_id_admin: &str,
        cat_id_operate: &str,
    ) -> Self {
        Self {
            group_id: group_id.to_owned(),
            fabric_id,
            root_ca_pem: root_ca_pem.to_owned(),
            ipk_epoch_key: vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 0xa, 0xb, 0xc, 0xd, 0xe, 0xf],
            cat_id_admin: cat_id_admin.to_owned(),
            cat_id_operate: cat_id_operate.to_owned(),
        }
    }

    pub fn root_ca_der(&self) -> Result<Vec<u8>, SessionError> {
        let p = pem::parse(&self.root_ca_pem)
            .map_err(|e| SessionError::CertificateInvalid(e.to_string()))?;
        Ok(p.contents().to_vec())
    }

    /// Uncompressed SEC1 public key of the fabric root CA.
    pub fn root_public_key(&self) -> Result<Vec<u8>, SessionError> {
        let der = self.root_ca_der()?;
        let cert = Certificate::from_der(&der)
            .map_err(|e| SessionError::CertificateInvalid(e.to_string()))?;
        let spki = &cert.tbs_certificate.subject_public_key_info;
        let key = spki
            .subject_public_key
            .as_bytes()
            .ok_or_else(|| SessionError::CertificateInvalid("public key not octet aligned".into()))?;
        Ok(key.to_vec())
    }

    /// Compressed fabric identifier.
    pub fn compressed_id(&self) -> Result<Vec<u8>, SessionError> {
        let mut fabric_be = Vec::new();
        fabric_be
            .write_u64::<BigEndian>(self.fabric_id)
            .map_err(|e| SessionError::StartupFailed(e.to_string()))?;
        let pubkey = self.root_public_key()?;
        // skip the 0x04 uncompressed-point marker
        hkdf_sha256(&fabric_be, &pubkey[1..], b"CompressedFabric", 8)
    }

    /// Operational group key (signed IPK).
    pub fn signed_ipk(&self) -> Result<Vec<u8>, SessionError> {
        let compressed = self.compressed_id()?;
        hkdf_sha256(&compressed, &self.ipk_epoch_key, b"GroupKey v1.0", 16)
    }

    /// CAT subject node id carrying administer privilege.
    pub fn admin_subject_id(&self) -> Result<u64, SessionError> {
        cat_subject_id(&self.cat_id_admin)
    }

    /// CAT subject node id carrying operate privilege.
    pub fn operate_subject_id(&self) -> Result<u64, SessionError> {
        cat_subject_id(&self.cat_id_operate)
    }
}

fn cat_subject_id(cat_id: &str) -> Result<u64, SessionError> {
    u64::from_str_radix(&format!("{CAT_SUBJECT_PREFIX}{cat_id}"), 16).map_err(|e| {
        SessionError::CertificateInvalid(format!("cat id {cat_id:?} is not hex: {e}"))
    })
}

fn hkdf_sha256(
    salt: &[u8],
    secret: &[u8],
    info: &[u8],
    size: usize,
) -> Result<Vec<u8>, SessionError> {
    let hk = Hkdf::<Sha256>::new(Some(salt), secret);
    let mut okm = vec![0u8; size];
    hk.expand(info, &mut okm)
        .map_err(|e| SessionError::StartupFailed(format!("hkdf: {e:?}")))?;
    Ok(okm)
}
