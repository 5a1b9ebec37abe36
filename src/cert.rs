//! Certification request generation and PEM plumbing.
//!
//! During commissioning the engine generates a fresh P-256 operational
//! keypair and a PKCS#10 certification request for it. The cloud CA signs
//! the request and returns the node operational certificate chain as PEM;
//! the platform controller wants DER, so conversion helpers live here too.

use crate::error::CommissioningError;
use crate::util::asn1;
use x509_cert::der::Decode;

const OID_COMMON_NAME: const_oid::ObjectIdentifier =
    const_oid::ObjectIdentifier::new_unwrap("2.5.4.3");
const OID_EC_PUBLIC_KEY: const_oid::ObjectIdentifier =
    const_oid::ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const OID_PRIME256V1: const_oid::ObjectIdentifier =
    const_oid::ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const OID_ECDSA_WITH_SHA256: const_oid::ObjectIdentifier =
    const_oid::ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");

/// Freshly generated operational keypair with its signed request.
pub struct CsrBundle {
    pub key: p256::SecretKey,
    pub csr_pem: String,
}

/// Generate a P-256 keypair and a PKCS#10 request with `CN=<common_name>`.
pub fn generate_csr(common_name: &str) -> Result<CsrBundle, CommissioningError> {
    let key = p256::SecretKey::random(&mut rand::thread_rng());
    let csr_der = build_csr_der(&key, common_name)?;

    // round-trip through the x509 parser to catch encoder slips early
    x509_cert::request::CertReq::from_der(&csr_der)
        .map_err(|e| CommissioningError::CsrFailed(format!("csr does not parse back: {e}")))?;

    Ok(CsrBundle {
        key,
        csr_pem: der_to_pem("CERTIFICATE REQUEST", &csr_der),
    })
}

fn build_csr_der(key: &p256::SecretKey, common_name: &str) -> Result<Vec<u8>, CommissioningError> {
    let csr_err = |e: std::io::Error| CommissioningError::CsrFailed(e.to_string());
    let public_sec1 = key.public_key().to_sec1_bytes();

    let mut info = asn1::Encoder::new();
    info.start_seq(0x30);
    info.write_int(0).map_err(csr_err)?;
    // subject: single RDN, CN
    info.start_seq(0x30);
    info.start_seq(0x31);
    info.start_seq(0x30);
    info.write_oid(&OID_COMMON_NAME);
    info.write_utf8_string(common_name);
    info.end_seq();
    info.end_seq();
    info.end_seq();
    // subjectPKInfo
    info.start_seq(0x30);
    info.start_seq(0x30);
    info.write_oid(&OID_EC_PUBLIC_KEY);
    info.write_oid(&OID_PRIME256V1);
    info.end_seq();
    info.write_bit_string(&public_sec1);
    info.end_seq();
    // attributes, [0] implicit, none
    info.start_seq(0xa0);
    info.end_seq();
    info.end_seq();
    let info_der = info.encode();

    let signing_key = ecdsa::SigningKey::from(key);
    let signature = signing_key
        .sign_recoverable(&info_der)
        .map_err(|e| CommissioningError::CsrFailed(format!("signing failed: {e}")))?
        .0;

    let mut enc = asn1::Encoder::new();
    enc.start_seq(0x30);
    enc.write_raw(&info_der);
    enc.start_seq(0x30);
    enc.write_oid(&OID_ECDSA_WITH_SHA256);
    enc.end_seq();
    enc.write_bit_string(signature.to_der().as_bytes());
    enc.end_seq();
    Ok(enc.encode())
}

/// Strip PEM armor, returning the DER contents of the first block.
pub fn pem_to_der(pem_text: &str) -> Result<Vec<u8>, CommissioningError> {
    let p = pem::parse(pem_text).map_err(|e| {
        CommissioningError::CertificateInstallFailed(format!("pem parse: {e}"))
    })?;
    Ok(p.contents().to_vec())
}

pub fn der_to_pem(tag: &str, der: &[u8]) -> String {
    pem::encode(&pem::Pem::new(tag, der))
}
