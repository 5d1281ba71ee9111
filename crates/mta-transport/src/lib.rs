//! Transport orchestrator (C5): binds the wire codec, crypto core, discovery
//! layer, and session state machines to BLE, Wi-Fi P2P, WebSocket, and HTTPS
//! I/O.

pub mod bundle;
pub mod driver;
pub mod error;
pub mod https;
pub mod wifi;

pub use bundle::{create_bundle, extract_bundle, BundleEntry, BundleError, ExtractedFile};
pub use driver::{receive_transfer, send_transfer, ReceivedTransfer, SendItem};
pub use error::TransportError;
pub use https::{connect_session_wss, download_bundle, HttpsError, SessionChannels, SessionServer};
pub use wifi::{generate_passphrase, generate_ssid, Band, WifiP2pError, WifiP2pGroup, WifiP2pProvider};
