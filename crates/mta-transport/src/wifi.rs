//! Wi-Fi P2P (Wi-Fi Direct) group acquisition.
//!
//! Platform group creation/joining is explicitly out of scope here — only
//! the credential-generation rules and the collaborator trait are provided.
//! [`StubWifiP2pProvider`] exists for testing and for driver configurations
//! where the user is expected to join the group manually.

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WifiP2pError {
    #[error("failed to create P2P group: {0}")]
    CreateFailed(String),
    #[error("failed to join P2P group: {0}")]
    JoinFailed(String),
    #[error("timed out waiting for a client to join")]
    ClientTimeout,
}

const SSID_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const PSK_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

fn random_string(charset: &[u8], len: usize) -> String {
    let mut rng = rand::rng();
    (0..len).map(|_| charset[rng.random_range(0..charset.len())] as char).collect()
}

/// Generate a `DIRECT-XXXXXXXX` SSID with 8 random uppercase-alphanumeric
/// characters.
pub fn generate_ssid() -> String {
    format!("DIRECT-{}", random_string(SSID_CHARS, 8))
}

/// Generate an 8-character random alphanumeric passphrase.
pub fn generate_passphrase() -> String {
    random_string(PSK_CHARS, 8)
}

/// Frequency band preference for group creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Ghz24,
    Ghz5,
    Auto,
}

#[async_trait]
pub trait WifiP2pGroup: Send + Sync {
    fn group_owner_address(&self) -> &str;
    fn is_group_owner(&self) -> bool;
    async fn wait_for_client(&mut self, timeout_secs: u64) -> Result<Option<String>, WifiP2pError>;
    async fn remove(&mut self) -> Result<(), WifiP2pError>;
}

#[async_trait]
pub trait WifiP2pProvider: Send + Sync {
    async fn create_group(
        &mut self,
        ssid: &str,
        passphrase: &str,
        band: Band,
    ) -> Result<Box<dyn WifiP2pGroup>, WifiP2pError>;

    async fn connect_to_group(
        &mut self,
        ssid: &str,
        passphrase: &str,
    ) -> Result<Box<dyn WifiP2pGroup>, WifiP2pError>;

    fn mac_address(&self) -> &str;
}

/// Non-functional group that never actually joins a network. Used by
/// [`StubWifiP2pProvider`] and in tests.
pub struct StubWifiP2pGroup {
    owner_address: String,
    is_owner: bool,
}

#[async_trait]
impl WifiP2pGroup for StubWifiP2pGroup {
    fn group_owner_address(&self) -> &str {
        &self.owner_address
    }

    fn is_group_owner(&self) -> bool {
        self.is_owner
    }

    async fn wait_for_client(&mut self, timeout_secs: u64) -> Result<Option<String>, WifiP2pError> {
        tokio::time::sleep(std::time::Duration::from_secs(timeout_secs)).await;
        Ok(None)
    }

    async fn remove(&mut self) -> Result<(), WifiP2pError> {
        Ok(())
    }
}

/// Stub provider for platforms without a native Wi-Fi Direct binding, or for
/// tests: does not create a real network, surfaces credentials for manual
/// setup instead.
pub struct StubWifiP2pProvider {
    mac: String,
}

impl StubWifiP2pProvider {
    pub fn new(mac: impl Into<String>) -> Self {
        Self { mac: mac.into() }
    }
}

impl Default for StubWifiP2pProvider {
    fn default() -> Self {
        Self::new("02:00:00:00:00:00")
    }
}

#[async_trait]
impl WifiP2pProvider for StubWifiP2pProvider {
    async fn create_group(
        &mut self,
        _ssid: &str,
        _passphrase: &str,
        _band: Band,
    ) -> Result<Box<dyn WifiP2pGroup>, WifiP2pError> {
        Ok(Box::new(StubWifiP2pGroup { owner_address: "192.168.49.1".into(), is_owner: true }))
    }

    async fn connect_to_group(
        &mut self,
        _ssid: &str,
        _passphrase: &str,
    ) -> Result<Box<dyn WifiP2pGroup>, WifiP2pError> {
        Ok(Box::new(StubWifiP2pGroup { owner_address: "192.168.49.1".into(), is_owner: false }))
    }

    fn mac_address(&self) -> &str {
        &self.mac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssid_has_direct_prefix_and_length() {
        let ssid = generate_ssid();
        assert!(ssid.starts_with("DIRECT-"));
        assert_eq!(ssid.len(), "DIRECT-".len() + 8);
    }

    #[test]
    fn passphrase_is_eight_chars() {
        assert_eq!(generate_passphrase().len(), 8);
    }

    #[tokio::test]
    async fn stub_provider_creates_owner_group() {
        let mut provider = StubWifiP2pProvider::default();
        let group = provider.create_group("DIRECT-ABCD1234", "password", Band::Auto).await.unwrap();
        assert!(group.is_group_owner());
        assert_eq!(group.group_owner_address(), "192.168.49.1");
    }
}
