//! The monitor fingerprint algorithm (spec.md §4.1). Pure over a list of
//! per-monitor identity strings so it can be exercised without a live
//! desktop, the same way `win32-display-data`'s `Device` is a plain struct
//! decoupled from the enumeration call that produced it.

use sha2::{Digest, Sha256};

/// One monitor's EDID-derived (or fallback) identity string, already in the
/// `MMMM:PPPP:I` / `noedid:<path>` / `gdi:<name>` form spec.md §4.1 defines.
pub type MonitorIdentity = String;

/// Formats the stable per-monitor identity from EDID fields, or falls back
/// to a device-path-keyed identity when EDID is absent.
pub fn monitor_identity(
    edid_valid: bool,
    manufacturer_id: u16,
    product_code: u16,
    connector_instance: u32,
    device_path: &str,
) -> MonitorIdentity {
    if edid_valid {
        format!(
            "{:04X}:{:04X}:{:X}",
            manufacturer_id, product_code, connector_instance
        )
    } else {
        format!("noedid:{device_path}")
    }
}

/// Sorts the per-monitor identities, joins with `|`, and returns the
/// lowercase-hex first 8 bytes of the SHA-256 digest — an order-independent,
/// fixed-width fingerprint (spec.md §4.1 steps 4-6).
pub fn compute_fingerprint(mut identities: Vec<MonitorIdentity>) -> String {
    identities.sort();
    let joined = identities.join("|");
    let digest = Sha256::digest(joined.as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}
