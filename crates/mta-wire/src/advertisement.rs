//! The 27-byte advertisement scan-response blob carried as BLE service data.

pub const BLOB_LEN: usize = 27;
const NAME_START: usize = 10;
const NAME_END: usize = 26;
const FLAGS_BYTE: usize = 26;
const SUPPORTS_5GHZ_BIT: u8 = 0x01;

/// Decoded contents of a scan-response blob.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResponse {
    pub name: String,
    pub supports_5ghz: bool,
}

/// Decode a scan-response blob.
///
/// A blob shorter than [`BLOB_LEN`] or containing a non-UTF-8 name decodes
/// to a fallback `"Unknown"` name with 5 GHz assumed supported, matching
/// what a tolerant central must do rather than dropping the advertisement.
pub fn parse_scan_response(data: &[u8]) -> ScanResponse {
    if data.len() < BLOB_LEN {
        return ScanResponse { name: "Unknown".to_string(), supports_5ghz: true };
    }

    let name_bytes = &data[NAME_START..NAME_END];
    let trimmed = trim_trailing_nul(name_bytes);
    let name = match std::str::from_utf8(trimmed) {
        Ok(s) if s.ends_with('\t') => format!("{}...", &s[..s.len() - 1]),
        Ok(s) => s.to_string(),
        Err(_) => "Unknown".to_string(),
    };

    let supports_5ghz = data[FLAGS_BYTE] & SUPPORTS_5GHZ_BIT != 0;

    ScanResponse { name, supports_5ghz }
}

fn trim_trailing_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != 0).map(|i| i + 1).unwrap_or(0);
    &bytes[..end]
}

/// Encode a scan-response blob for advertising.
///
/// Bytes 0–7 are zero-filled padding; bytes 8–9 are a session-random nonce
/// the caller supplies (callers typically draw it from their RNG once per
/// advertising session). `name` is UTF-8 truncated to fit 16 bytes; if
/// truncation occurred, the last byte is set to `0x09` (TAB) so a central
/// renders it with an ellipsis.
pub fn build_scan_response(nonce: [u8; 2], name: &str, supports_5ghz: bool) -> [u8; BLOB_LEN] {
    let mut blob = [0u8; BLOB_LEN];
    blob[8..10].copy_from_slice(&nonce);

    let name_bytes = name.as_bytes();
    if name_bytes.len() <= 16 {
        blob[NAME_START..NAME_START + name_bytes.len()].copy_from_slice(name_bytes);
    } else {
        // Truncate on a UTF-8 boundary within the first 15 bytes, leaving
        // room for the truncation marker.
        let mut cut = 15;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        blob[NAME_START..NAME_START + cut].copy_from_slice(&name_bytes[..cut]);
        blob[NAME_START + cut] = b'\t';
    }

    if supports_5ghz {
        blob[FLAGS_BYTE] |= SUPPORTS_5GHZ_BIT;
    }
    blob
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_blob_falls_back_to_unknown() {
        let resp = parse_scan_response(&[0u8; 10]);
        assert_eq!(resp, ScanResponse { name: "Unknown".into(), supports_5ghz: true });
    }

    #[test]
    fn decodes_name_and_5ghz_flag() {
        let blob = build_scan_response([1, 2], "Pixel 8", true);
        let resp = parse_scan_response(&blob);
        assert_eq!(resp.name, "Pixel 8");
        assert!(resp.supports_5ghz);
    }

    #[test]
    fn truncated_name_gets_ellipsis() {
        let long_name = "A Very Long Device Name Indeed";
        let blob = build_scan_response([0, 0], long_name, false);
        let resp = parse_scan_response(&blob);
        assert!(resp.name.ends_with("..."));
        assert!(!resp.supports_5ghz);
    }

    #[test]
    fn non_utf8_name_falls_back_to_unknown() {
        let mut blob = [0u8; BLOB_LEN];
        blob[NAME_START] = 0xff;
        blob[NAME_START + 1] = 0xfe;
        let resp = parse_scan_response(&blob);
        assert_eq!(resp.name, "Unknown");
    }
}
