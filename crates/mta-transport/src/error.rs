//! Transport-layer error taxonomy: folds every collaborator's error type into
//! one enum the driver functions return.

use crate::bundle::BundleError;
use crate::https::HttpsError;
use crate::wifi::WifiP2pError;
use mta_discovery::BleError;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Ble(#[from] BleError),
    #[error(transparent)]
    Wifi(#[from] WifiP2pError),
    #[error(transparent)]
    Crypto(#[from] mta_crypto::CryptoError),
    #[error(transparent)]
    Https(#[from] HttpsError),
    #[error(transparent)]
    Bundle(#[from] BundleError),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("malformed control frame: {0}")]
    Wire(#[from] mta_wire::message::ParseError),
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("transfer rejected by the receiving user")]
    Rejected,
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("control channel closed unexpectedly")]
    ChannelClosed,
}

impl From<TransportError> for mta_common::MtaError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Rejected => mta_common::MtaError::UserRefuse { reason: "user refuse".into() },
            TransportError::Timeout(stage) => mta_common::MtaError::timeout(stage),
            other => mta_common::MtaError::transport(other.to_string()),
        }
    }
}
