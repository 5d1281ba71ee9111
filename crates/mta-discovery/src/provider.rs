//! BLE collaborator traits. Implementations bind the discovery layer to an
//! actual BLE stack; this crate only specifies the contract and the
//! protocol-level decoding around it.

use async_trait::async_trait;
use mta_common::models::{DeviceInfo, P2pInfo};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BleError {
    #[error("scan timed out with no matching device")]
    ScanTimeout,
    #[error("GATT connection failed: {0}")]
    ConnectFailed(String),
    #[error("GATT operation failed: {0}")]
    GattFailed(String),
}

/// A device discovered while scanning as the central.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredDevice {
    pub address: String,
    pub name: String,
    pub rssi: i16,
    pub supports_5ghz: bool,
}

/// Central-role BLE scanning: find advertising receivers.
#[async_trait]
pub trait BleCentral: Send + Sync {
    async fn start_scan(&mut self, timeout_secs: u64) -> Result<Vec<DiscoveredDevice>, BleError>;
    async fn connect(&mut self, address: &str) -> Result<Box<dyn BleConnection>, BleError>;
}

/// An open GATT connection to a receiver, from the sender's (central) side.
#[async_trait]
pub trait BleConnection: Send + Sync {
    async fn read_device_info(&mut self) -> Result<DeviceInfo, BleError>;
    async fn write_p2p_info(&mut self, info: &P2pInfo) -> Result<(), BleError>;
    async fn disconnect(&mut self) -> Result<(), BleError>;
}

/// Peripheral-role BLE advertising and GATT serving: the receiver's side.
#[async_trait]
pub trait BlePeripheral: Send + Sync {
    /// Start advertising `device_name` under the discovery service UUID,
    /// serve `device_info` from the Status characteristic, and wait for a
    /// sender to write P2P join credentials to the P2P characteristic.
    /// Returns the credentials as written (still session-cipher-encrypted
    /// if `device_info.key` was set).
    async fn start_advertising(
        &mut self,
        device_name: &str,
        device_info: &DeviceInfo,
    ) -> Result<P2pInfo, BleError>;
    async fn stop_advertising(&mut self) -> Result<(), BleError>;
}
