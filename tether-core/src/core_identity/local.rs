//! Local identity credentials
//!
//! The configuration root holds one local key pair (`certificate`,
//! `private-key`), generated on first run. The bytes are opaque to the
//! core; the handshake layer owns their real format. The core only needs
//! the stable device id derived from the certificate.

use rand::RngCore;
use std::fs;
use std::path::Path;
use tracing::info;

use super::device_id::DeviceId;
use super::errors::IdentityResult;
use super::store::write_atomic;

const CERTIFICATE_FILE: &str = "certificate";
const PRIVATE_KEY_FILE: &str = "private-key";

/// Length of the generated key material, in bytes
const KEY_LEN: usize = 32;

/// The local device's credentials and derived id
#[derive(Debug, Clone)]
pub struct LocalIdentity {
    id: DeviceId,
    certificate: Vec<u8>,
}

impl LocalIdentity {
    /// Load the key pair under `root`, generating one on first run
    ///
    /// Failure here is fatal to construction: without credentials the
    /// local device has no identity to present.
    pub fn load_or_generate(root: &Path) -> IdentityResult<Self> {
        fs::create_dir_all(root)?;

        let cert_path = root.join(CERTIFICATE_FILE);
        let key_path = root.join(PRIVATE_KEY_FILE);

        let certificate = if cert_path.is_file() && key_path.is_file() {
            fs::read(&cert_path)?
        } else {
            let mut private_key = vec![0u8; KEY_LEN];
            rand::rng().fill_bytes(&mut private_key);

            // Public half: the handshake layer will replace this derivation
            // with its own certificate, but the id stays stable either way.
            let certificate = blake3::hash(&private_key).as_bytes().to_vec();

            write_atomic(&key_path, &private_key)?;
            write_atomic(&cert_path, &certificate)?;
            info!(path = %root.display(), "Generated local key pair");

            certificate
        };

        let id = Self::derive_id(&certificate)?;
        Ok(LocalIdentity { id, certificate })
    }

    /// Derive the stable device id from certificate bytes
    pub fn derive_id(certificate: &[u8]) -> IdentityResult<DeviceId> {
        let digest = blake3::hash(certificate);
        DeviceId::new(hex::encode(&digest.as_bytes()[..16]))
    }

    /// The local device id
    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    /// The local certificate bytes
    pub fn certificate(&self) -> &[u8] {
        &self.certificate
    }
}
