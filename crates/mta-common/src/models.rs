//! Wire-level data model shared by every MTA component: device/session
//! credentials exchanged over BLE GATT, and transfer metadata exchanged over
//! the WebSocket control channel.

use rand::Rng;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Device status advertised via the `CHAR_STATUS` GATT characteristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub state: i32,
    pub mac: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "catShare", skip_serializing_if = "Option::is_none")]
    pub cat_share: Option<i32>,
}

/// P2P join credentials exchanged via the `CHAR_P2P` GATT characteristic.
///
/// `ssid`, `psk`, and `mac` are the session-cipher-encrypted fields whenever
/// `key` is present (see `mta-crypto`); plaintext once decrypted.
///
/// `mac` is sent by the receiver unused (its own address), but when the
/// sender writes this struct back over GATT it repurposes the field to carry
/// the Wi-Fi P2P group owner's host address rather than a MAC — the
/// transport layer (`mta-transport`) treats it as the host to dial, matching
/// the reference protocol rather than renaming the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct P2pInfo {
    pub ssid: String,
    pub psk: String,
    pub mac: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "catShare", skip_serializing_if = "Option::is_none")]
    pub cat_share: Option<i32>,
}

/// A file (or text) transfer request, carried as the payload of a
/// `sendRequest` action frame.
///
/// The wire form duplicates the task id under both `taskId` and `id`;
/// readers accept either, writers always emit both (see [`SendRequest`]'s
/// manual [`Serialize`] impl below).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SendRequest {
    #[serde(alias = "id", rename = "taskId")]
    pub task_id: String,
    #[serde(rename = "senderId")]
    pub sender_id: String,
    #[serde(rename = "senderName", default = "default_sender_name")]
    pub sender_name: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "mimeType", default = "default_mime_type")]
    pub mime_type: String,
    #[serde(rename = "fileCount")]
    pub file_count: u32,
    #[serde(rename = "totalSize")]
    pub total_size: u64,
    #[serde(rename = "catShareText", skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl Serialize for SendRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("SendRequest", 9)?;
        s.serialize_field("taskId", &self.task_id)?;
        s.serialize_field("id", &self.task_id)?;
        s.serialize_field("senderId", &self.sender_id)?;
        s.serialize_field("senderName", &self.sender_name)?;
        s.serialize_field("fileName", &self.file_name)?;
        s.serialize_field("mimeType", &self.mime_type)?;
        s.serialize_field("fileCount", &self.file_count)?;
        s.serialize_field("totalSize", &self.total_size)?;
        if let Some(text) = &self.text_content {
            s.serialize_field("catShareText", text)?;
        }
        if let Some(thumb) = &self.thumbnail {
            s.serialize_field("thumbnail", thumb)?;
        }
        s.end()
    }
}

fn default_sender_name() -> String {
    "Unknown".to_string()
}

fn default_mime_type() -> String {
    "*/*".to_string()
}

/// Status codes carried by `status` action frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum StatusType {
    Unknown = 0,
    Ok = 1,
    Error = 2,
    UserRefuse = 3,
}

impl StatusType {
    pub fn from_i32(v: i32) -> Self {
        match v {
            1 => Self::Ok,
            2 => Self::Error,
            3 => Self::UserRefuse,
            _ => Self::Unknown,
        }
    }
}

/// A transfer status update, carried as the payload of a `status` action
/// frame. Like [`SendRequest`], `taskId`/`id` duplicate the same value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransferStatus {
    #[serde(default)]
    pub r#type: i32,
    #[serde(default)]
    pub reason: String,
    #[serde(alias = "id", rename = "taskId")]
    pub task_id: String,
}

impl Serialize for TransferStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("TransferStatus", 4)?;
        s.serialize_field("taskId", &self.task_id)?;
        s.serialize_field("id", &self.task_id)?;
        s.serialize_field("type", &self.r#type)?;
        s.serialize_field("reason", &self.reason)?;
        s.end()
    }
}

impl TransferStatus {
    pub fn status(&self) -> StatusType {
        StatusType::from_i32(self.r#type)
    }
}

/// Generate a random 4-hex-digit sender id, e.g. `"3f2a"`.
pub fn generate_sender_id() -> String {
    let n: u16 = rand::rng().random();
    format!("{n:04x}")
}

/// Generate a random 6-digit decimal task id in `100000..=999999`.
pub fn generate_task_id() -> String {
    let n: u32 = rand::rng().random_range(100_000..=999_999);
    n.to_string()
}
