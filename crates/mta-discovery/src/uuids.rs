//! Fixed BLE UUIDs for the MTA discovery and GATT surface.

pub const ADV_SERVICE_UUID: &str = "00003331-0000-1000-8000-008123456789";
pub const DATA_SERVICE_UUID: &str = "00009955-0000-1000-8000-00805f9b34fb";
pub const STATUS_CHAR_UUID: &str = "00009954-0000-1000-8000-00805f9b34fb";
pub const P2P_CHAR_UUID: &str = "00009953-0000-1000-8000-00805f9b34fb";
pub const SCAN_RESPONSE_NAME_UUID: &str = "0000ffff-0000-1000-8000-00805f9b34fb";
pub const SCAN_RESPONSE_RANDOM_UUID: &str = "000001ff-0000-1000-8000-00805f9b34fb";
