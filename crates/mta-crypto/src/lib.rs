//! ECDH P-256 key agreement and AES-CTR session cipher.

pub mod cipher;
pub mod error;
pub mod provider;

pub use cipher::{KeyWidth, SessionCipher};
pub use error::CryptoError;
pub use provider::{CryptoProvider, DefaultCryptoProvider};
