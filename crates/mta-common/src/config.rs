//! Runtime configuration, loaded from environment variables and an optional
//! `config.toml`. Precedence: env vars > `.env` file > `config.toml` > defaults.

use serde::Deserialize;
use std::sync::OnceLock;

static CONFIG: OnceLock<MtaConfig> = OnceLock::new();

/// Get the global configuration.
///
/// # Panics
/// Panics if [`init`] has not been called yet.
pub fn get() -> &'static MtaConfig {
    CONFIG
        .get()
        .expect("config not initialized. Call mta_common::config::init() first.")
}

/// Initialize the global configuration. Should be called once at startup.
pub fn init() -> Result<&'static MtaConfig, config::ConfigError> {
    let _ = dotenvy::dotenv();

    let cfg = config::Config::builder()
        .set_default("device.name", "MTA Device")?
        .set_default("protocol.version", 1)?
        .set_default("protocol.thread_limit", 5)?
        .set_default("protocol.aes_key_width", "bits128")?
        .set_default("timeouts.scan_secs", 30)?
        .set_default("timeouts.gatt_connect_secs", 15)?
        .set_default("timeouts.p2p_credential_secs", 300)?
        .set_default("timeouts.wifi_join_secs", 30)?
        .set_default("timeouts.download_secs", 120)?
        .add_source(config::File::with_name("config").required(false))
        .add_source(
            config::Environment::with_prefix("MTA")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app_config: MtaConfig = cfg.try_deserialize()?;
    Ok(CONFIG.get_or_init(|| app_config))
}

/// Install a `tracing` subscriber reading `RUST_LOG` (or `MTA_LOG`), falling
/// back to `info`. Call once at process startup, alongside [`init`].
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_env("MTA_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}

#[derive(Debug, Deserialize, Clone)]
pub struct MtaConfig {
    pub device: DeviceConfig,
    pub protocol: ProtocolConfig,
    pub timeouts: TimeoutsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    /// Name advertised to peers during BLE discovery and handshake.
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProtocolConfig {
    pub version: u32,
    /// Advertised download concurrency, sent in the version-negotiation ack.
    pub thread_limit: u32,
    /// `bits128` (default, matches the Android reference) or `bits256`
    /// (diagnostic-only AES-256 compatibility mode).
    pub aes_key_width: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimeoutsConfig {
    pub scan_secs: u64,
    pub gatt_connect_secs: u64,
    pub p2p_credential_secs: u64,
    pub wifi_join_secs: u64,
    pub download_secs: u64,
}
