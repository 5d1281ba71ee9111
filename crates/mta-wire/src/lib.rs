//! Wire codec: the WebSocket control-message grammar and the BLE
//! advertisement scan-response blob.

pub mod advertisement;
pub mod message;

pub use advertisement::{build_scan_response, parse_scan_response, ScanResponse, BLOB_LEN};
pub use message::{
    make_send_request, make_status, make_version_negotiation, ParseError, WsMessage,
    ACTION_SEND_REQUEST, ACTION_STATUS, ACTION_VERSION_NEGOTIATION, TYPE_ACK, TYPE_ACTION,
};
