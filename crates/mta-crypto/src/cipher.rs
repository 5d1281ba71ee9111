//! AES-CTR session cipher applied per-field to `P2pInfo`'s `ssid`/`psk`/`mac`.

use crate::error::CryptoError;
use aes::{Aes128, Aes256};
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use ctr::cipher::{KeyIvInit, StreamCipher};

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Fixed IV used by every session cipher, matching the Android reference.
const FIXED_IV: &[u8; 16] = b"0102030405060708";

/// AES key width. `Bits128` (truncating the ECDH shared secret to its first
/// 16 bytes) is the canonical, default wire form; `Bits256` exists only for
/// diagnostic interop against the secondary cipher variant observed in the
/// reference implementation and must be opted into explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyWidth {
    Bits128,
    Bits256,
}

/// Encrypts/decrypts UTF-8 strings to/from base64 ciphertext using AES-CTR
/// with the protocol's fixed IV.
pub struct SessionCipher {
    key: Vec<u8>,
    width: KeyWidth,
}

impl SessionCipher {
    /// Derive a cipher from a raw ECDH shared secret. `width` selects how
    /// many leading bytes of the secret become the AES key.
    pub fn from_shared_secret(shared_secret: &[u8], width: KeyWidth) -> Self {
        let len = match width {
            KeyWidth::Bits128 => 16,
            KeyWidth::Bits256 => 32,
        };
        let key = shared_secret[..len.min(shared_secret.len())].to_vec();
        Self { key, width }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut buf = plaintext.as_bytes().to_vec();
        self.apply_keystream(&mut buf)?;
        Ok(B64.encode(buf))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, CryptoError> {
        let mut buf = B64.decode(encoded).map_err(|_| CryptoError::CiphertextNotBase64)?;
        self.apply_keystream(&mut buf)?;
        String::from_utf8(buf).map_err(|_| CryptoError::NotUtf8)
    }

    fn apply_keystream(&self, buf: &mut [u8]) -> Result<(), CryptoError> {
        match self.width {
            KeyWidth::Bits128 => {
                let mut cipher = Aes128Ctr::new_from_slices(&self.key, FIXED_IV)
                    .map_err(|e| CryptoError::MalformedSpki(e.to_string()))?;
                cipher.apply_keystream(buf);
            }
            KeyWidth::Bits256 => {
                let mut cipher = Aes256Ctr::new_from_slices(&self.key, FIXED_IV)
                    .map_err(|e| CryptoError::MalformedSpki(e.to_string()))?;
                cipher.apply_keystream(buf);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_plaintext() {
        let secret = [0x42u8; 32];
        let cipher = SessionCipher::from_shared_secret(&secret, KeyWidth::Bits128);
        let ct = cipher.encrypt("DIRECT-ab12cd34").unwrap();
        let pt = cipher.decrypt(&ct).unwrap();
        assert_eq!(pt, "DIRECT-ab12cd34");
    }

    #[test]
    fn bits128_and_bits256_disagree() {
        let secret = [0x11u8; 32];
        let a = SessionCipher::from_shared_secret(&secret, KeyWidth::Bits128);
        let b = SessionCipher::from_shared_secret(&secret, KeyWidth::Bits256);
        let ct = a.encrypt("hello").unwrap();
        assert_ne!(b.decrypt(&ct).unwrap_or_default(), "hello");
    }

    #[test]
    fn rejects_non_base64_ciphertext() {
        let cipher = SessionCipher::from_shared_secret(&[0u8; 32], KeyWidth::Bits128);
        assert!(matches!(cipher.decrypt("not base64!!"), Err(CryptoError::CiphertextNotBase64)));
    }
}
