//! Crypto-layer error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("peer public key is not valid base64")]
    NotBase64,

    #[error("peer public key is not a valid SubjectPublicKeyInfo: {0}")]
    MalformedSpki(String),

    #[error("ciphertext is not valid base64")]
    CiphertextNotBase64,

    #[error("decrypted plaintext is not valid UTF-8")]
    NotUtf8,
}

impl From<CryptoError> for mta_common::MtaError {
    fn from(err: CryptoError) -> Self {
        mta_common::MtaError::Crypto(err.to_string())
    }
}
