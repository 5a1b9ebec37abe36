//! Matter device commissioning and cluster interaction for RainMaker fabrics.
//!
//! The crate drives a platform Matter controller (supplied through the
//! [DeviceConnector](connector::DeviceConnector) seam) to commission devices
//! into a cloud-backed fabric and to talk to them afterwards. Main parts of
//! the api:
//! - [onboarding] - parsers for QR setup payloads and manual pairing codes.
//! - [Fabric](fabric::Fabric) - cloud group identity: root CA, CAT ids,
//!   derived group key material.
//! - [FabricSession](session::FabricSession) - one fabric's live controller;
//!   serializes all device traffic and hands out typed cluster clients.
//! - [clusters] - typed clients for the standard and vendor clusters
//!   (on/off, level, color, thermostat, descriptor, access control, binding,
//!   thread border router management, rainmaker).
//! - [CommissioningEngine](commission::CommissioningEngine) - the pairing
//!   state machine: PASE, attestation, cloud certificate issuance, NOC
//!   install and post-commissioning confirmation.
//! - [DeviceLinker](linking::DeviceLinker) - two-phase ACL/binding linking
//!   so one device can control another.
//! - [ThreadDatasetManager](thread::ThreadDatasetManager) - reconciles
//!   Thread credentials between a border router and the host platform.
//! - [CapabilityCache](cache::CapabilityCache) - persisted per-device
//!   topology and capability records.
//!
//! Example parsing a setup code and describing the fabric a device will
//! join:
//! ```no_run
//! # use rmatter::fabric::Fabric;
//! # use rmatter::onboarding;
//! # fn main() -> Result<(), rmatter::error::CommissioningError> {
//! let payload = onboarding::parse_setup_code("MT:Y.K9042C00KA0648G00")?;
//! println!("discriminator {} passcode {}", payload.discriminator, payload.passcode);
//! let fabric = Fabric::new(
//!     "node-group-id",
//!     0x1234,
//!     "-----BEGIN CERTIFICATE-----...",
//!     "00000001",
//!     "00000002",
//! );
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cert;
pub mod cloud;
pub mod clusters;
pub mod commission;
pub mod connector;
pub mod error;
pub mod fabric;
pub mod linking;
pub mod onboarding;
pub mod session;
pub mod thread;
pub mod tlv;
mod util;

#[cfg(test)]
pub(crate) mod testutil;
