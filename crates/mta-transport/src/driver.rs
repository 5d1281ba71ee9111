//! Transport orchestrator (C5): binds the sans-I/O session state machines in
//! `mta-session` to real BLE, Wi-Fi P2P, WebSocket, and HTTPS collaborators.
//!
//! One MTA transfer is a single-peer, one-shot exchange, not a long-lived
//! multi-client room, so this module drives it as a plain async function per
//! role (matching the reference implementation's `MTAReceiver.listen` /
//! `receive_from` flow) rather than an actor with a command channel.
//!
//! The control channel and the bundle download share one self-signed TLS
//! listener and port, matching the reference implementation: the P2P
//! credentials handed over GATT carry a single port, not one per service.
//! The receiver trusts the BLE/Wi-Fi P2P handshake as the actual trust
//! anchor and connects with certificate validation disabled, not the cert.

use crate::bundle::{create_bundle, extract_bundle, BundleEntry, ExtractedFile};
use crate::error::TransportError;
use crate::https::{connect_session_wss, download_bundle, SessionChannels, SessionServer};
use crate::wifi::{Band, WifiP2pGroup, WifiP2pProvider};
use futures_util::{SinkExt, StreamExt};
use mta_common::models::{DeviceInfo, P2pInfo};
use mta_crypto::CryptoProvider;
use mta_discovery::{BleCentral, BleConnection, BlePeripheral};
use mta_session::{FileSpec, ReceiverEvent, ReceiverProtocol, SenderEvent, SenderProtocol};
use mta_wire::WsMessage;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

const WS_ENDPOINT: &str = "/websocket";

/// One file or text snippet to send, with its actual content (unlike
/// [`FileSpec`], which only carries metadata for the wire protocol).
pub enum SendItem {
    File { path: PathBuf, display_name: String, mime_type: String },
    Text { content: String, display_name: String },
}

impl SendItem {
    fn display_name(&self) -> &str {
        match self {
            SendItem::File { display_name, .. } => display_name,
            SendItem::Text { display_name, .. } => display_name,
        }
    }

    async fn load(&self) -> Result<Vec<u8>, std::io::Error> {
        match self {
            SendItem::File { path, .. } => tokio::fs::read(path).await,
            SendItem::Text { content, .. } => Ok(content.clone().into_bytes()),
        }
    }
}

fn build_file_specs(items: &[SendItem], sizes: &[u64]) -> Vec<FileSpec> {
    items
        .iter()
        .zip(sizes)
        .map(|(item, &size)| match item {
            SendItem::File { display_name, mime_type, .. } => FileSpec::file(display_name.clone(), size, mime_type.clone()),
            SendItem::Text { content, display_name } => FileSpec::text(content.clone(), display_name.clone()),
        })
        .collect()
}

/// Send `items` to the BLE device discovered at `address`.
///
/// Drives the full C5 flow: GATT key/credential exchange, Wi-Fi P2P group
/// creation, WebSocket handshake, and serving the bundle over self-signed
/// HTTPS until the receiver reports completion or rejection.
pub async fn send_transfer(
    device_name: &str,
    address: &str,
    items: Vec<SendItem>,
    ble: &mut dyn BleCentral,
    wifi: &mut dyn WifiP2pProvider,
    crypto: &dyn CryptoProvider,
    handshake_timeout: Duration,
) -> Result<(), TransportError> {
    let mut connection = ble.connect(address).await?;
    let peer_info = connection.read_device_info().await?;

    let ssid = crate::wifi::generate_ssid();
    let passphrase = crate::wifi::generate_passphrase();

    let group = wifi.create_group(&ssid, &passphrase, Band::Auto).await?;
    let host = group.group_owner_address().to_string();

    let mut proto = SenderProtocol::new(device_name);
    let contents: Vec<Vec<u8>> = {
        let mut buf = Vec::with_capacity(items.len());
        for item in &items {
            buf.push(item.load().await.map_err(|e| TransportError::Protocol(e.to_string()))?);
        }
        buf
    };
    let sizes: Vec<u64> = contents.iter().map(|c| c.len() as u64).collect();
    proto.set_files(build_file_specs(&items, &sizes));

    let entries: Vec<BundleEntry<'_>> =
        items.iter().zip(contents.iter()).map(|(item, bytes)| BundleEntry { display_name: item.display_name(), contents: bytes }).collect();
    let bundle = create_bundle(&entries)?;

    let (session_server, session_rx) = SessionServer::new();
    session_server.register_bundle(proto.task_id.clone(), bundle).await;
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let bind_addr: SocketAddr = "0.0.0.0:0".parse().expect("valid bind address");
    let session_port = session_server
        .serve(bind_addr, async {
            let _ = shutdown_rx.await;
        })
        .await?;

    let p2p_info = build_p2p_info(&peer_info, &ssid, &passphrase, &host, session_port, crypto)?;
    connection.write_p2p_info(&p2p_info).await?;
    connection.disconnect().await.ok();

    let channels = tokio::time::timeout(handshake_timeout, session_rx).await.map_err(|_| TransportError::Timeout("receiver connection"))?;
    let result = match channels {
        Ok(channels) => run_sender_socket(&mut proto, channels).await,
        Err(_) => Err(TransportError::ChannelClosed),
    };

    let _ = shutdown_tx.send(());
    let mut group = group;
    group.remove().await.ok();

    result
}

fn build_p2p_info(
    peer_info: &DeviceInfo,
    ssid: &str,
    passphrase: &str,
    host: &str,
    port: u16,
    crypto: &dyn CryptoProvider,
) -> Result<P2pInfo, TransportError> {
    match &peer_info.key {
        Some(peer_key) => {
            let cipher = crypto.derive_session_cipher(peer_key)?;
            Ok(P2pInfo {
                ssid: cipher.encrypt(ssid)?,
                psk: cipher.encrypt(passphrase)?,
                mac: cipher.encrypt(host)?,
                port,
                id: None,
                key: Some(crypto.public_key_b64()),
                cat_share: None,
            })
        }
        None => Ok(P2pInfo {
            ssid: ssid.to_string(),
            psk: passphrase.to_string(),
            mac: host.to_string(),
            port,
            id: None,
            key: None,
            cat_share: None,
        }),
    }
}

async fn run_sender_socket(proto: &mut SenderProtocol, mut channels: SessionChannels) -> Result<(), TransportError> {
    channels
        .outbound
        .send(proto.start_handshake().serialize_with_id(None))
        .map_err(|_| TransportError::ChannelClosed)?;

    while let Some(text) = channels.inbound.recv().await {
        let Ok(msg) = WsMessage::parse(&text) else {
            tracing::warn!(%text, "dropping malformed frame");
            continue;
        };

        let Some((event, response)) = proto.on_ws_message(&msg) else { continue };
        if let Some(response) = response {
            channels.outbound.send(response.serialize_with_id(None)).map_err(|_| TransportError::ChannelClosed)?;
        }

        match event {
            Some(SenderEvent::RequestSent { .. }) => {
                tracing::debug!("send request acked, waiting for download");
            }
            Some(SenderEvent::TransferCompleted { .. }) => return Ok(()),
            Some(SenderEvent::TransferRejected { .. }) => return Err(TransportError::Rejected),
            Some(SenderEvent::ProtocolError { message }) => return Err(TransportError::Protocol(message)),
            _ => {}
        }
    }

    Err(TransportError::ChannelClosed)
}

/// Outcome of a completed receive.
pub enum ReceivedTransfer {
    Files(Vec<ExtractedFile>),
    Text(String),
}

/// Listen for an incoming transfer, asking `on_request` whether to accept
/// any file share (text shares are always accepted, matching the reference
/// behavior of surfacing them directly rather than gating on user input).
pub async fn receive_transfer(
    device_name: &str,
    output_dir: &Path,
    peripheral: &mut dyn BlePeripheral,
    wifi: &mut dyn WifiP2pProvider,
    crypto: &dyn CryptoProvider,
    mut on_request: impl FnMut(&mta_common::models::SendRequest) -> bool,
    advertise_timeout: Duration,
) -> Result<ReceivedTransfer, TransportError> {
    let device_info = DeviceInfo { state: 0, mac: wifi.mac_address().to_string(), key: Some(crypto.public_key_b64()), cat_share: None };

    let p2p_info = tokio::time::timeout(advertise_timeout, peripheral.start_advertising(device_name, &device_info))
        .await
        .map_err(|_| TransportError::Timeout("ble advertising"))??;
    peripheral.stop_advertising().await.ok();

    let p2p_info = match &p2p_info.key {
        Some(peer_key) => {
            let cipher = crypto.derive_session_cipher(peer_key)?;
            P2pInfo {
                ssid: cipher.decrypt(&p2p_info.ssid)?,
                psk: cipher.decrypt(&p2p_info.psk)?,
                mac: cipher.decrypt(&p2p_info.mac)?,
                port: p2p_info.port,
                id: p2p_info.id.clone(),
                key: None,
                cat_share: p2p_info.cat_share,
            }
        }
        None => p2p_info,
    };

    let mut group = wifi.connect_to_group(&p2p_info.ssid, &p2p_info.psk).await?;
    let host = p2p_info.mac.clone();
    let port = p2p_info.port;

    let mut proto = ReceiverProtocol::new(host.clone(), port);
    let ws_stream = connect_session_wss(&host, port, WS_ENDPOINT).await?;
    let (mut write, mut read) = ws_stream.split();

    let outcome = loop {
        let Some(frame) = read.next().await else { break Err(TransportError::ChannelClosed) };
        let frame = frame?;
        let Message::Text(text) = frame else { continue };
        let Ok(msg) = WsMessage::parse(&text) else {
            tracing::warn!(%text, "dropping malformed frame");
            continue;
        };

        let Some((event, response)) = proto.on_ws_message(&msg) else { continue };
        if let Some(response) = response {
            write.send(Message::Text(response.serialize_with_id(None).into())).await?;
        }

        match event {
            Some(ReceiverEvent::TextReceived { text, .. }) => {
                let ok = proto.send_ok();
                write.send(Message::Text(ok.serialize_with_id(None).into())).await?;
                tokio::time::sleep(Duration::from_secs(1)).await;
                break Ok(ReceivedTransfer::Text(text));
            }
            Some(ReceiverEvent::SendRequestReceived { request, .. }) => {
                if !on_request(&request) {
                    let reject = proto.reject_transfer();
                    write.send(Message::Text(reject.serialize_with_id(None).into())).await?;
                    break Err(TransportError::Rejected);
                }

                let Some(ReceiverEvent::TransferAccepted { download_url, .. }) = proto.accept_transfer() else {
                    break Err(TransportError::Protocol("accept_transfer called with no pending request".into()));
                };
                let host_port = download_url
                    .strip_prefix("https://")
                    .and_then(|rest| rest.split_once('/'))
                    .map(|(hp, _)| hp)
                    .ok_or_else(|| TransportError::Protocol("malformed download url".into()))?;
                let (dl_host, dl_port) =
                    host_port.rsplit_once(':').ok_or_else(|| TransportError::Protocol("malformed download url".into()))?;
                let dl_port: u16 = dl_port.parse().map_err(|_| TransportError::Protocol("malformed download port".into()))?;

                let bundle = download_bundle(dl_host, dl_port, &request.task_id).await?;
                let files = extract_bundle(&bundle, output_dir)?;

                let ok = proto.send_ok();
                write.send(Message::Text(ok.serialize_with_id(None).into())).await?;
                tokio::time::sleep(Duration::from_secs(1)).await;
                break Ok(ReceivedTransfer::Files(files));
            }
            Some(ReceiverEvent::StatusReceived { status }) => {
                if status.status() == mta_common::models::StatusType::UserRefuse {
                    break Err(TransportError::Rejected);
                }
            }
            Some(ReceiverEvent::ProtocolError { message }) => break Err(TransportError::Protocol(message)),
            _ => {}
        }
    };

    group.remove().await.ok();
    outcome
}
