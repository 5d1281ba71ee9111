//! Discovery layer (C3): GATT service contract, scan-response decoding, and
//! central-side advertisement filtering/dedup.

pub mod cache;
pub mod provider;
pub mod uuids;

pub use cache::ScanDedupCache;
pub use mta_wire::{parse_scan_response, ScanResponse};
pub use provider::{BleCentral, BleConnection, BleError, BlePeripheral, DiscoveredDevice};

/// Whether an advertisement's service-UUID list includes the discovery
/// service UUID. Membership, not equality — other UUIDs may be present.
pub fn advertises_mta_service(service_uuids: &[String]) -> bool {
    service_uuids.iter().any(|u| u.eq_ignore_ascii_case(uuids::ADV_SERVICE_UUID))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_discovery_uuid_among_others() {
        let uuids = vec!["0000180f-0000-1000-8000-00805f9b34fb".to_string(), uuids::ADV_SERVICE_UUID.to_string()];
        assert!(advertises_mta_service(&uuids));
    }

    #[test]
    fn rejects_when_discovery_uuid_absent() {
        let uuids = vec!["0000180f-0000-1000-8000-00805f9b34fb".to_string()];
        assert!(!advertises_mta_service(&uuids));
    }
}
