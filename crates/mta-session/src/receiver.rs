//! Sans-I/O receiver protocol state machine.
//!
//! Pure logic: feed it parsed [`WsMessage`]s, it tells you what happened and
//! what (if anything) to send back. No networking here.

use mta_common::models::{SendRequest, TransferStatus};
use mta_wire::{
    message::{ACTION_SEND_REQUEST, ACTION_STATUS, ACTION_VERSION_NEGOTIATION},
    WsMessage, TYPE_ACTION,
};

const PROTOCOL_VERSION: u32 = 1;
const DEFAULT_THREAD_LIMIT: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    WaitVersion,
    WaitRequest,
    WaitUserAccept,
    Transferring,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub enum ReceiverEvent {
    VersionNegotiated { version: u32, thread_limit: u32 },
    SendRequestReceived { request: SendRequest, thumbnail_path: Option<String> },
    TextReceived { text: String, task_id: String },
    TransferAccepted { task_id: String, download_url: String },
    StatusReceived { status: TransferStatus },
    ProtocolError { message: String },
}

/// Receiver-side protocol state, parameterized by the sender's HTTPS host
/// and port (needed to build the download URL on accept).
pub struct ReceiverProtocol {
    server_host: String,
    server_port: u16,
    pub state: ReceiverState,
    pub version: u32,
    pub thread_limit: u32,
    send_request: Option<SendRequest>,
    msg_id_counter: u64,
}

impl ReceiverProtocol {
    pub fn new(server_host: impl Into<String>, server_port: u16) -> Self {
        Self {
            server_host: server_host.into(),
            server_port,
            state: ReceiverState::WaitVersion,
            version: PROTOCOL_VERSION,
            thread_limit: DEFAULT_THREAD_LIMIT,
            send_request: None,
            msg_id_counter: 99,
        }
    }

    fn next_msg_id(&mut self) -> u64 {
        self.msg_id_counter += 1;
        self.msg_id_counter
    }

    /// Process one inbound WebSocket message. Returns `None` for non-action
    /// frames (acks are not this state machine's concern); otherwise an
    /// event plus an optional frame to send back.
    pub fn on_ws_message(&mut self, msg: &WsMessage) -> Option<(Option<ReceiverEvent>, Option<WsMessage>)> {
        if msg.kind != TYPE_ACTION {
            return None;
        }

        if msg.is_action(ACTION_VERSION_NEGOTIATION) {
            let in_version = msg
                .payload
                .as_ref()
                .and_then(|p| p.get("version"))
                .and_then(|v| v.as_u64())
                .unwrap_or(1) as u32;
            self.version = in_version.min(PROTOCOL_VERSION);
            self.state = ReceiverState::WaitRequest;

            let response = serde_json::json!({ "version": self.version, "threadLimit": self.thread_limit });
            Some((
                Some(ReceiverEvent::VersionNegotiated { version: self.version, thread_limit: self.thread_limit }),
                Some(msg.make_ack(Some(response))),
            ))
        } else if msg.is_action(ACTION_SEND_REQUEST) {
            let Some(payload) = &msg.payload else {
                return Some((
                    Some(ReceiverEvent::ProtocolError { message: "sendRequest has no payload".into() }),
                    Some(msg.make_ack(None)),
                ));
            };

            let request: SendRequest = match serde_json::from_value(payload.clone()) {
                Ok(r) => r,
                Err(e) => {
                    return Some((
                        Some(ReceiverEvent::ProtocolError { message: format!("malformed sendRequest: {e}") }),
                        Some(msg.make_ack(None)),
                    ))
                }
            };

            self.state = ReceiverState::WaitUserAccept;
            let thumbnail_path = request.thumbnail.clone();
            let event = if let Some(text) = request.text_content.clone() {
                let task_id = request.task_id.clone();
                ReceiverEvent::TextReceived { text, task_id }
            } else {
                ReceiverEvent::SendRequestReceived { request: request.clone(), thumbnail_path }
            };
            self.send_request = Some(request);

            Some((Some(event), Some(msg.make_ack(None))))
        } else if msg.is_action(ACTION_STATUS) {
            let Some(payload) = &msg.payload else {
                return Some((
                    Some(ReceiverEvent::ProtocolError { message: "status has no payload".into() }),
                    Some(msg.make_ack(None)),
                ));
            };

            let status: TransferStatus = match serde_json::from_value(payload.clone()) {
                Ok(s) => s,
                Err(e) => {
                    return Some((
                        Some(ReceiverEvent::ProtocolError { message: format!("malformed status: {e}") }),
                        Some(msg.make_ack(None)),
                    ))
                }
            };

            if status.status() == mta_common::models::StatusType::UserRefuse && status.reason == "user refuse" {
                self.state = ReceiverState::Failed;
            }

            Some((Some(ReceiverEvent::StatusReceived { status }), Some(msg.make_ack(None))))
        } else {
            Some((None, Some(msg.make_ack(None))))
        }
    }

    /// Caller accepts the pending transfer. Returns the download URL to
    /// fetch; emits no frame of its own (the driver sends `status{ok}`
    /// after the download succeeds, via [`ReceiverProtocol::send_ok`]).
    pub fn accept_transfer(&mut self) -> Option<ReceiverEvent> {
        let request = self.send_request.as_ref()?;
        self.state = ReceiverState::Transferring;
        let download_url =
            format!("https://{}:{}/download?taskId={}", self.server_host, self.server_port, request.task_id);
        Some(ReceiverEvent::TransferAccepted { task_id: request.task_id.clone(), download_url })
    }

    /// Caller rejects the pending transfer.
    pub fn reject_transfer(&mut self) -> WsMessage {
        let task_id = self.send_request.as_ref().map(|r| r.task_id.clone()).unwrap_or_default();
        self.state = ReceiverState::Failed;
        let status = TransferStatus { r#type: 3, reason: "user refuse".into(), task_id };
        mta_wire::make_status(self.next_msg_id(), &status)
    }

    /// Send OK status after a successful download.
    pub fn send_ok(&mut self) -> WsMessage {
        let task_id = self.send_request.as_ref().map(|r| r.task_id.clone()).unwrap_or_default();
        self.state = ReceiverState::Completed;
        let status = TransferStatus { r#type: 1, reason: "ok".into(), task_id };
        mta_wire::make_status(self.next_msg_id(), &status)
    }

    pub fn thumbnail_url(&self) -> Option<String> {
        let request = self.send_request.as_ref()?;
        let thumbnail = request.thumbnail.as_ref()?;
        Some(format!("https://{}:{}{}", self.server_host, self.server_port, thumbnail))
    }
}
