//! Sans-I/O sender protocol state machine.

use mta_common::models::{generate_sender_id, generate_task_id, SendRequest, StatusType, TransferStatus};
use mta_wire::{
    message::{ACTION_SEND_REQUEST, ACTION_STATUS, ACTION_VERSION_NEGOTIATION},
    WsMessage, TYPE_ACK, TYPE_ACTION,
};

const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    Initial,
    SentVersion,
    SentRequest,
    WaitDownload,
    Transferring,
    Completed,
    Rejected,
    Failed,
}

#[derive(Debug, Clone)]
pub enum SenderEvent {
    VersionAcked { version: u32 },
    RequestSent { task_id: String },
    TransferStarted { task_id: String },
    TransferCompleted { task_id: String },
    TransferRejected { reason: String },
    ProtocolError { message: String },
}

/// One file (or synthetic text item) queued to send.
#[derive(Debug, Clone)]
pub struct FileSpec {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub text_content: Option<String>,
}

impl FileSpec {
    pub fn file(name: impl Into<String>, size: u64, mime_type: impl Into<String>) -> Self {
        Self { name: name.into(), size, mime_type: mime_type.into(), text_content: None }
    }

    pub fn text(text: impl Into<String>, name: impl Into<String>) -> Self {
        let text = text.into();
        Self { size: text.len() as u64, name: name.into(), mime_type: "text/plain".into(), text_content: Some(text) }
    }
}

pub struct SenderProtocol {
    pub device_name: String,
    pub sender_id: String,
    pub task_id: String,
    pub state: SenderState,
    pub version: u32,
    files: Vec<FileSpec>,
    msg_id: u64,
}

impl SenderProtocol {
    pub fn new(device_name: impl Into<String>) -> Self {
        Self::with_sender_id(device_name, generate_sender_id())
    }

    pub fn with_sender_id(device_name: impl Into<String>, sender_id: String) -> Self {
        Self {
            device_name: device_name.into(),
            sender_id,
            task_id: generate_task_id(),
            state: SenderState::Initial,
            version: PROTOCOL_VERSION,
            files: Vec::new(),
            msg_id: 0,
        }
    }

    pub fn set_files(&mut self, files: Vec<FileSpec>) {
        self.files = files;
    }

    fn next_msg_id(&mut self) -> u64 {
        let id = self.msg_id;
        self.msg_id += 1;
        id
    }

    fn build_send_request(&self) -> SendRequest {
        let total_size = self.files.iter().map(|f| f.size).sum();
        let file_count = self.files.len() as u32;

        let mime_type = match self.files.as_slice() {
            [single] => single.mime_type.clone(),
            files => {
                let mut mimes = files.iter().map(|f| f.mime_type.as_str());
                let first = mimes.next().unwrap_or("*/*");
                if mimes.all(|m| m == first) { first.to_string() } else { "*/*".to_string() }
            }
        };

        let text_content =
            if let [single] = self.files.as_slice() { single.text_content.clone() } else { None };

        SendRequest {
            task_id: self.task_id.clone(),
            sender_id: self.sender_id.clone(),
            sender_name: self.device_name.clone(),
            file_name: self.files.first().map(|f| f.name.clone()).unwrap_or_default(),
            mime_type,
            file_count,
            total_size,
            text_content,
            thumbnail: None,
        }
    }

    /// Start the handshake: returns the version-negotiation frame to send.
    pub fn start_handshake(&mut self) -> WsMessage {
        self.state = SenderState::SentVersion;
        mta_wire::make_version_negotiation(self.next_msg_id(), self.version)
    }

    pub fn on_ws_message(&mut self, msg: &WsMessage) -> Option<(Option<SenderEvent>, Option<WsMessage>)> {
        if msg.kind == TYPE_ACK {
            if msg.is_ack(ACTION_VERSION_NEGOTIATION) {
                let acked_version =
                    msg.payload.as_ref().and_then(|p| p.get("version")).and_then(|v| v.as_u64()).unwrap_or(1) as u32;
                self.version = acked_version.min(self.version);

                let request = self.build_send_request();
                let request_msg = mta_wire::make_send_request(self.next_msg_id(), &request);
                self.state = SenderState::SentRequest;
                Some((Some(SenderEvent::VersionAcked { version: self.version }), Some(request_msg)))
            } else if msg.is_ack(ACTION_SEND_REQUEST) {
                self.state = SenderState::WaitDownload;
                Some((Some(SenderEvent::RequestSent { task_id: self.task_id.clone() }), None))
            } else if msg.is_ack(ACTION_STATUS) {
                Some((None, None))
            } else {
                None
            }
        } else if msg.kind == TYPE_ACTION {
            if msg.is_action(ACTION_STATUS) {
                let Some(payload) = &msg.payload else {
                    return Some((
                        Some(SenderEvent::ProtocolError { message: "status has no payload".into() }),
                        Some(msg.make_ack(None)),
                    ));
                };
                let status: TransferStatus = match serde_json::from_value(payload.clone()) {
                    Ok(s) => s,
                    Err(e) => {
                        return Some((
                            Some(SenderEvent::ProtocolError { message: format!("malformed status: {e}") }),
                            Some(msg.make_ack(None)),
                        ))
                    }
                };
                match status.status() {
                    StatusType::UserRefuse => {
                        self.state = SenderState::Rejected;
                        Some((Some(SenderEvent::TransferRejected { reason: status.reason }), Some(msg.make_ack(None))))
                    }
                    StatusType::Ok => {
                        self.state = SenderState::Completed;
                        Some((
                            Some(SenderEvent::TransferCompleted { task_id: self.task_id.clone() }),
                            Some(msg.make_ack(None)),
                        ))
                    }
                    _ => Some((None, Some(msg.make_ack(None)))),
                }
            } else {
                Some((None, Some(msg.make_ack(None))))
            }
        } else {
            None
        }
    }

    /// Caller notifies that the HTTPS download request has started.
    pub fn on_download_started(&mut self) -> SenderEvent {
        self.state = SenderState::Transferring;
        SenderEvent::TransferStarted { task_id: self.task_id.clone() }
    }

    /// Validate an inbound download request's `taskId` against this session.
    pub fn check_task_id(&self, request_task_id: &str) -> bool {
        request_task_id == self.task_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_starts_at_id_zero() {
        let mut proto = SenderProtocol::new("My Device");
        let msg = proto.start_handshake();
        assert_eq!(msg.id, 0);
        assert_eq!(proto.state, SenderState::SentVersion);
    }

    #[test]
    fn version_ack_produces_send_request_with_built_fields() {
        let mut proto = SenderProtocol::new("My Device");
        proto.set_files(vec![FileSpec::file("photo.jpg", 2048, "image/jpeg")]);
        proto.start_handshake();

        let ack = WsMessage::parse("ack:0:versionNegotiation?{\"version\":1}").unwrap();
        let (event, response) = proto.on_ws_message(&ack).unwrap();
        assert!(matches!(event, Some(SenderEvent::VersionAcked { version: 1 })));
        assert_eq!(proto.state, SenderState::SentRequest);

        let response = response.unwrap();
        assert_eq!(response.name, "sendRequest");
        let payload = response.payload.unwrap();
        assert_eq!(payload["fileName"], "photo.jpg");
        assert_eq!(payload["mimeType"], "image/jpeg");
        assert_eq!(payload["totalSize"], 2048);
    }

    #[test]
    fn heterogeneous_mime_types_fall_back_to_wildcard() {
        let mut proto = SenderProtocol::new("My Device");
        proto.set_files(vec![
            FileSpec::file("a.jpg", 10, "image/jpeg"),
            FileSpec::file("b.txt", 20, "text/plain"),
        ]);
        let request = proto.build_send_request();
        assert_eq!(request.mime_type, "*/*");
        assert_eq!(request.total_size, 30);
        assert_eq!(request.file_count, 2);
    }

    #[test]
    fn single_text_item_produces_text_content() {
        let mut proto = SenderProtocol::new("My Device");
        proto.set_files(vec![FileSpec::text("hello world", "shared_text.txt")]);
        let request = proto.build_send_request();
        assert_eq!(request.text_content.as_deref(), Some("hello world"));
    }

    #[test]
    fn request_ack_transitions_to_wait_download() {
        let mut proto = SenderProtocol::new("My Device");
        let ack = WsMessage::parse("ack:1:sendRequest").unwrap();
        let (event, response) = proto.on_ws_message(&ack).unwrap();
        assert!(matches!(event, Some(SenderEvent::RequestSent { .. })));
        assert!(response.is_none());
        assert_eq!(proto.state, SenderState::WaitDownload);
    }

    #[test]
    fn status_ok_completes_transfer() {
        let mut proto = SenderProtocol::new("My Device");
        let msg = WsMessage::parse(&format!(
            "action:1:status?{{\"taskId\":\"{}\",\"id\":\"{}\",\"type\":1,\"reason\":\"ok\"}}",
            proto.task_id, proto.task_id
        ))
        .unwrap();
        let (event, _) = proto.on_ws_message(&msg).unwrap();
        assert!(matches!(event, Some(SenderEvent::TransferCompleted { .. })));
        assert_eq!(proto.state, SenderState::Completed);
    }

    #[test]
    fn status_user_refuse_rejects_transfer() {
        let mut proto = SenderProtocol::new("My Device");
        let msg = WsMessage::parse(&format!(
            "action:1:status?{{\"taskId\":\"{}\",\"type\":3,\"reason\":\"user refuse\"}}",
            proto.task_id
        ))
        .unwrap();
        let (event, _) = proto.on_ws_message(&msg).unwrap();
        assert!(matches!(event, Some(SenderEvent::TransferRejected { .. })));
        assert_eq!(proto.state, SenderState::Rejected);
    }

    #[test]
    fn check_task_id_matches_only_current_session() {
        let proto = SenderProtocol::new("My Device");
        assert!(proto.check_task_id(&proto.task_id));
        assert!(!proto.check_task_id("000000"));
    }
}
