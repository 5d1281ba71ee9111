//! End-to-end integration tests driving `send_transfer`/`receive_transfer`
//! against in-process BLE/Wi-Fi stand-ins over real loopback TCP sockets, for
//! both the text-share fast path and the general file-bundle path.

use async_trait::async_trait;
use mta_common::models::{DeviceInfo, P2pInfo};
use mta_crypto::{CryptoProvider, DefaultCryptoProvider};
use mta_discovery::{BleCentral, BleConnection, BleError, BlePeripheral, DiscoveredDevice};
use mta_transport::{receive_transfer, send_transfer, Band, ReceivedTransfer, SendItem, WifiP2pError, WifiP2pGroup, WifiP2pProvider};
use std::time::Duration;
use tokio::sync::mpsc;

struct LoopbackGroup {
    owner: String,
    is_owner: bool,
}

#[async_trait]
impl WifiP2pGroup for LoopbackGroup {
    fn group_owner_address(&self) -> &str {
        &self.owner
    }

    fn is_group_owner(&self) -> bool {
        self.is_owner
    }

    async fn wait_for_client(&mut self, _timeout_secs: u64) -> Result<Option<String>, WifiP2pError> {
        Ok(None)
    }

    async fn remove(&mut self) -> Result<(), WifiP2pError> {
        Ok(())
    }
}

/// Stands in for Wi-Fi Direct group creation/joining: both sides "connect"
/// over plain loopback TCP instead of an actual Wi-Fi P2P network.
struct LoopbackWifi {
    mac: String,
}

#[async_trait]
impl WifiP2pProvider for LoopbackWifi {
    async fn create_group(&mut self, _ssid: &str, _passphrase: &str, _band: Band) -> Result<Box<dyn WifiP2pGroup>, WifiP2pError> {
        Ok(Box::new(LoopbackGroup { owner: "127.0.0.1".into(), is_owner: true }))
    }

    async fn connect_to_group(&mut self, _ssid: &str, _passphrase: &str) -> Result<Box<dyn WifiP2pGroup>, WifiP2pError> {
        Ok(Box::new(LoopbackGroup { owner: "127.0.0.1".into(), is_owner: false }))
    }

    fn mac_address(&self) -> &str {
        &self.mac
    }
}

struct FakeConnection {
    device_info: DeviceInfo,
    p2p_tx: mpsc::UnboundedSender<P2pInfo>,
}

#[async_trait]
impl BleConnection for FakeConnection {
    async fn read_device_info(&mut self) -> Result<DeviceInfo, BleError> {
        Ok(self.device_info.clone())
    }

    async fn write_p2p_info(&mut self, info: &P2pInfo) -> Result<(), BleError> {
        self.p2p_tx.send(info.clone()).map_err(|_| BleError::GattFailed("peripheral gone".into()))
    }

    async fn disconnect(&mut self) -> Result<(), BleError> {
        Ok(())
    }
}

struct FakeCentral {
    device_info: DeviceInfo,
    p2p_tx: Option<mpsc::UnboundedSender<P2pInfo>>,
}

#[async_trait]
impl BleCentral for FakeCentral {
    async fn start_scan(&mut self, _timeout_secs: u64) -> Result<Vec<DiscoveredDevice>, BleError> {
        Ok(vec![DiscoveredDevice { address: "loopback".into(), name: "peer".into(), rssi: -40, supports_5ghz: true }])
    }

    async fn connect(&mut self, _address: &str) -> Result<Box<dyn BleConnection>, BleError> {
        let p2p_tx = self.p2p_tx.take().expect("connect called only once in this test");
        Ok(Box::new(FakeConnection { device_info: self.device_info.clone(), p2p_tx }))
    }
}

struct FakePeripheral {
    p2p_rx: mpsc::UnboundedReceiver<P2pInfo>,
}

#[async_trait]
impl BlePeripheral for FakePeripheral {
    async fn start_advertising(&mut self, _device_name: &str, _device_info: &DeviceInfo) -> Result<P2pInfo, BleError> {
        self.p2p_rx.recv().await.ok_or(BleError::ScanTimeout)
    }

    async fn stop_advertising(&mut self) -> Result<(), BleError> {
        Ok(())
    }
}

#[tokio::test]
async fn text_share_round_trips_over_loopback() {
    let receiver_crypto = DefaultCryptoProvider::new();
    let receiver_device_info =
        DeviceInfo { state: 0, mac: "02:00:00:00:00:00".into(), key: Some(receiver_crypto.public_key_b64()), cat_share: None };

    let (p2p_tx, p2p_rx) = mpsc::unbounded_channel();
    let mut central = FakeCentral { device_info: receiver_device_info, p2p_tx: Some(p2p_tx) };
    let mut peripheral = FakePeripheral { p2p_rx };
    let mut sender_wifi = LoopbackWifi { mac: "AA:BB:CC:DD:EE:FF".into() };
    let mut receiver_wifi = LoopbackWifi { mac: "02:00:00:00:00:00".into() };
    let sender_crypto = DefaultCryptoProvider::new();

    let sender = tokio::spawn(async move {
        send_transfer(
            "Sender Device",
            "loopback",
            vec![SendItem::Text { content: "hello from loopback".into(), display_name: "shared_text.txt".into() }],
            &mut central,
            &mut sender_wifi,
            &sender_crypto,
            Duration::from_secs(5),
        )
        .await
    });

    let receiver = tokio::spawn(async move {
        receive_transfer(
            "Receiver Device",
            std::path::Path::new("/tmp"),
            &mut peripheral,
            &mut receiver_wifi,
            &receiver_crypto,
            |_req| true,
            Duration::from_secs(5),
        )
        .await
    });

    let (send_result, recv_result) = tokio::join!(sender, receiver);
    send_result.expect("sender task panicked").expect("send_transfer failed");

    match recv_result.expect("receiver task panicked").expect("receive_transfer failed") {
        ReceivedTransfer::Text(text) => assert_eq!(text, "hello from loopback"),
        ReceivedTransfer::Files(_) => panic!("expected a text transfer"),
    }
}

#[tokio::test]
async fn file_share_downloads_and_extracts_bundle() {
    let dir = std::env::temp_dir().join(format!("mta-transfer-test-{}", rand::random::<u32>()));
    std::fs::create_dir_all(&dir).unwrap();
    let source_path = dir.join("source.txt");
    std::fs::write(&source_path, b"bundled file contents").unwrap();
    let output_dir = dir.join("received");

    let receiver_crypto = DefaultCryptoProvider::new();
    let receiver_device_info =
        DeviceInfo { state: 0, mac: "02:00:00:00:00:00".into(), key: Some(receiver_crypto.public_key_b64()), cat_share: None };

    let (p2p_tx, p2p_rx) = mpsc::unbounded_channel();
    let mut central = FakeCentral { device_info: receiver_device_info, p2p_tx: Some(p2p_tx) };
    let mut peripheral = FakePeripheral { p2p_rx };
    let mut sender_wifi = LoopbackWifi { mac: "AA:BB:CC:DD:EE:FF".into() };
    let mut receiver_wifi = LoopbackWifi { mac: "02:00:00:00:00:00".into() };
    let sender_crypto = DefaultCryptoProvider::new();

    let send_path = source_path.clone();
    let sender = tokio::spawn(async move {
        send_transfer(
            "Sender Device",
            "loopback",
            vec![SendItem::File { path: send_path, display_name: "source.txt".into(), mime_type: "text/plain".into() }],
            &mut central,
            &mut sender_wifi,
            &sender_crypto,
            Duration::from_secs(5),
        )
        .await
    });

    let recv_output_dir = output_dir.clone();
    let receiver = tokio::spawn(async move {
        receive_transfer(
            "Receiver Device",
            &recv_output_dir,
            &mut peripheral,
            &mut receiver_wifi,
            &receiver_crypto,
            |_req| true,
            Duration::from_secs(5),
        )
        .await
    });

    let (send_result, recv_result) = tokio::join!(sender, receiver);
    send_result.expect("sender task panicked").expect("send_transfer failed");

    match recv_result.expect("receiver task panicked").expect("receive_transfer failed") {
        ReceivedTransfer::Files(files) => {
            assert_eq!(files.len(), 1);
            assert_eq!(files[0].name, "source.txt");
            assert_eq!(std::fs::read(&files[0].path).unwrap(), b"bundled file contents");
        }
        ReceivedTransfer::Text(_) => panic!("expected a file transfer"),
    }

    std::fs::remove_dir_all(&dir).ok();
}
