//! ECDH key agreement: generate an ephemeral P-256 keypair per session,
//! publish the public key as base64 SPKI DER, and derive a session cipher
//! from a peer's public key.

use crate::cipher::{KeyWidth, SessionCipher};
use crate::error::CryptoError;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use p256::ecdh::EphemeralSecret;
use p256::pkcs8::{DecodePublicKey, EncodePublicKey};
use p256::PublicKey;
use rand_core::OsRng;

/// Abstraction over ECDH key agreement, so a driver can swap in a different
/// crypto backend without touching session/transport logic.
pub trait CryptoProvider: Send + Sync {
    /// Base64-encoded DER SubjectPublicKeyInfo of this session's public key.
    fn public_key_b64(&self) -> String;

    /// Derive the session cipher shared with `peer_public_key_b64`, using
    /// the canonical 16-byte AES-128 key width.
    fn derive_session_cipher(&self, peer_public_key_b64: &str) -> Result<SessionCipher, CryptoError> {
        self.derive_session_cipher_with_width(peer_public_key_b64, KeyWidth::Bits128)
    }

    /// As [`CryptoProvider::derive_session_cipher`], but with an explicit
    /// key width — exposed for diagnosing interop against the AES-256
    /// cipher variant.
    fn derive_session_cipher_with_width(
        &self,
        peer_public_key_b64: &str,
        width: KeyWidth,
    ) -> Result<SessionCipher, CryptoError>;
}

/// ECDH P-256 provider backed by a freshly generated ephemeral keypair.
pub struct DefaultCryptoProvider {
    secret: EphemeralSecret,
    public_key_b64: String,
}

impl DefaultCryptoProvider {
    /// Generate a new ephemeral P-256 keypair for this session.
    pub fn new() -> Self {
        let secret = EphemeralSecret::random(&mut OsRng);
        let der = secret
            .public_key()
            .to_public_key_der()
            .expect("P-256 public key always encodes to DER");
        Self { secret, public_key_b64: B64.encode(der.as_bytes()) }
    }
}

impl Default for DefaultCryptoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoProvider for DefaultCryptoProvider {
    fn public_key_b64(&self) -> String {
        self.public_key_b64.clone()
    }

    fn derive_session_cipher_with_width(
        &self,
        peer_public_key_b64: &str,
        width: KeyWidth,
    ) -> Result<SessionCipher, CryptoError> {
        let der = B64.decode(peer_public_key_b64).map_err(|_| CryptoError::NotBase64)?;
        let peer_public =
            PublicKey::from_public_key_der(&der).map_err(|e| CryptoError::MalformedSpki(e.to_string()))?;
        let shared = self.secret.diffie_hellman(&peer_public);
        Ok(SessionCipher::from_shared_secret(shared.raw_secret_bytes(), width))
    }
}
