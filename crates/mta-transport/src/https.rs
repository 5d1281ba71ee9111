//! The sender's combined HTTPS/WSS endpoint: one self-signed TLS listener
//! serves both `/websocket` (the control channel) and `/download` (the
//! packed bundle), matching the reference implementation's single
//! `host:port` for both. The receiver trusts the BLE/Wi-Fi P2P handshake as
//! the actual trust anchor and connects with certificate validation
//! disabled, not the cert itself.

use axum::extract::ws::{Message as AxumMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Once};
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio_rustls::TlsConnector;
use tokio_tungstenite::tungstenite::Message as TungsteniteMessage;
use tokio_tungstenite::WebSocketStream;

#[derive(Debug, thiserror::Error)]
pub enum HttpsError {
    #[error("failed to generate self-signed certificate: {0}")]
    CertGen(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid server name: {0}")]
    InvalidServerName(#[from] rustls::pki_types::InvalidDnsNameError),
    #[error("websocket handshake failed: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("download request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server responded {0}")]
    Status(StatusCode),
}

static INSTALL_CRYPTO_PROVIDER: Once = Once::new();

fn install_crypto_provider() {
    INSTALL_CRYPTO_PROVIDER.call_once(|| {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });
}

#[derive(Clone, Default)]
struct BundleStore {
    bundles: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

/// The accepted control-channel connection, as plain text frames. The
/// server-side axum handler speaks the WebSocket framing; the driver only
/// ever needs the text payloads.
pub struct SessionChannels {
    pub inbound: mpsc::UnboundedReceiver<String>,
    pub outbound: mpsc::UnboundedSender<String>,
}

#[derive(Clone)]
struct ServerState {
    bundles: BundleStore,
    session_tx: Arc<Mutex<Option<oneshot::Sender<SessionChannels>>>>,
}

/// Serves one sender session's control channel and bundle download over a
/// single self-signed HTTPS/WSS listener.
///
/// Construction hands back a [`oneshot::Receiver`] that resolves once the
/// receiver has connected to `/websocket`; only the first connection is
/// accepted, matching the one-shot, single-peer nature of a transfer.
pub struct SessionServer {
    state: ServerState,
}

impl SessionServer {
    pub fn new() -> (Self, oneshot::Receiver<SessionChannels>) {
        let (tx, rx) = oneshot::channel();
        let state = ServerState { bundles: BundleStore::default(), session_tx: Arc::new(Mutex::new(Some(tx))) };
        (Self { state }, rx)
    }

    pub async fn register_bundle(&self, task_id: impl Into<String>, bundle: Vec<u8>) {
        self.state.bundles.bundles.write().await.insert(task_id.into(), bundle);
    }

    /// Bind a self-signed HTTPS/WSS listener on `bind_addr` and serve it
    /// until `shutdown` resolves. Returns the port actually bound (useful
    /// when `bind_addr`'s port is 0).
    pub async fn serve(
        &self,
        bind_addr: SocketAddr,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<u16, HttpsError> {
        install_crypto_provider();
        let (cert_pem, key_pem) = generate_self_signed_cert("mta.local")?;
        let config = axum_server::tls_rustls::RustlsConfig::from_pem(cert_pem.into_bytes(), key_pem.into_bytes())
            .await
            .map_err(HttpsError::Io)?;

        let app = Router::new()
            .route("/download", get(download_handler))
            .route("/websocket", get(websocket_handler))
            .with_state(self.state.clone());

        let listener = std::net::TcpListener::bind(bind_addr)?;
        listener.set_nonblocking(true)?;
        let bound_port = listener.local_addr()?.port();

        tokio::spawn(async move {
            let server = axum_server::from_tcp_rustls(listener, config).serve(app.into_make_service());
            tokio::select! {
                result = server => {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "session server exited with error");
                    }
                }
                _ = shutdown => {
                    tracing::debug!("session server shut down");
                }
            }
        });

        Ok(bound_port)
    }
}

#[derive(serde::Deserialize)]
struct DownloadQuery {
    #[serde(alias = "id", rename = "taskId")]
    task_id: String,
}

async fn download_handler(State(state): State<ServerState>, Query(query): Query<DownloadQuery>) -> impl IntoResponse {
    match state.bundles.bundles.read().await.get(&query.task_id) {
        Some(bytes) => (StatusCode::OK, bytes.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn websocket_handler(State(state): State<ServerState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: ServerState) {
    let Some(session_tx) = state.session_tx.lock().expect("mutex not poisoned").take() else {
        return;
    };

    let (to_peer_tx, mut to_peer_rx) = mpsc::unbounded_channel::<String>();
    let (from_peer_tx, from_peer_rx) = mpsc::unbounded_channel::<String>();
    if session_tx.send(SessionChannels { inbound: from_peer_rx, outbound: to_peer_tx }).is_err() {
        return;
    }

    let (mut sink, mut stream) = socket.split();
    let send_task = tokio::spawn(async move {
        while let Some(text) = to_peer_rx.recv().await {
            if sink.send(AxumMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        if let AxumMessage::Text(text) = msg {
            if from_peer_tx.send(text.to_string()).is_err() {
                break;
            }
        }
    }

    send_task.abort();
}

fn generate_self_signed_cert(subject_alt_name: &str) -> Result<(String, String), HttpsError> {
    let certified = rcgen::generate_simple_self_signed(vec![subject_alt_name.to_string()])
        .map_err(|e| HttpsError::CertGen(e.to_string()))?;
    Ok((certified.cert.pem(), certified.key_pair.serialize_pem()))
}

/// Download the bundle for `task_id` from a sender's [`SessionServer`],
/// accepting its self-signed certificate.
pub async fn download_bundle(host: &str, port: u16, task_id: &str) -> Result<Vec<u8>, HttpsError> {
    let client = reqwest::Client::builder().danger_accept_invalid_certs(true).build()?;
    let url = format!("https://{host}:{port}/download?taskId={task_id}");
    let response = client.get(&url).send().await?;
    if !response.status().is_success() {
        return Err(HttpsError::Status(response.status()));
    }
    Ok(response.bytes().await?.to_vec())
}

#[derive(Debug)]
struct NoCertVerification;

impl ServerCertVerifier for NoCertVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}

/// Connect to the sender's control channel over WSS, trusting the BLE/Wi-Fi
/// P2P handshake rather than the listener's self-signed certificate.
pub async fn connect_session_wss(
    host: &str,
    port: u16,
    path: &str,
) -> Result<WebSocketStream<tokio_rustls::client::TlsStream<tokio::net::TcpStream>>, HttpsError> {
    install_crypto_provider();
    let tls_config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(NoCertVerification))
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(tls_config));

    let tcp_stream = tokio::net::TcpStream::connect((host, port)).await?;
    let server_name = ServerName::try_from(host.to_string())?;
    let tls_stream = connector.connect(server_name, tcp_stream).await?;

    let url = format!("wss://{host}:{port}{path}");
    let (ws_stream, _response) = tokio_tungstenite::client_async(url, tls_stream).await?;
    Ok(ws_stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_bundle_over_self_signed_https() {
        let (server, _session_rx) = SessionServer::new();
        server.register_bundle("123456", b"zip bytes here".to_vec()).await;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let port = server
            .serve(addr, async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();

        let bundle = download_bundle("127.0.0.1", port, "123456").await.unwrap();
        assert_eq!(bundle, b"zip bytes here");

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn unknown_task_id_returns_404() {
        let (server, _session_rx) = SessionServer::new();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let port = server
            .serve(addr, async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();

        let err = download_bundle("127.0.0.1", port, "000000").await.unwrap_err();
        assert!(matches!(err, HttpsError::Status(StatusCode::NOT_FOUND)));

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn websocket_and_download_share_one_port() {
        let (server, session_rx) = SessionServer::new();
        server.register_bundle("t1", b"payload".to_vec()).await;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let port = server
            .serve(addr, async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();

        let mut client = connect_session_wss("127.0.0.1", port, "/websocket").await.unwrap();
        client.send(TungsteniteMessage::Text("hello".into())).await.unwrap();

        let mut channels = session_rx.await.unwrap();
        let received = channels.inbound.recv().await.unwrap();
        assert_eq!(received, "hello");
        channels.outbound.send("world".into()).unwrap();

        let reply = client.next().await.unwrap().unwrap();
        assert_eq!(reply.into_text().unwrap(), "world");

        let bundle = download_bundle("127.0.0.1", port, "t1").await.unwrap();
        assert_eq!(bundle, b"payload");

        let _ = shutdown_tx.send(());
    }
}
