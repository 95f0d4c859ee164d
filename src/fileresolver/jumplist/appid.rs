//! AppID → jump-list filename hashing (spec.md §4.3.1, §6, GLOSSARY). CRC-64
//! with the Jones polynomial over the AppID's UTF-16LE bytes, each code unit
//! fed low-byte-first.

use crc::{Algorithm, Crc};

/// CRC-64/Jones, per spec.md §4.3.1 (`0xAD93D23594C935A9`). The `crc` crate's
/// generic [`Algorithm`] constructor lets us express the exact poly/init/
/// refin/refout/xorout combination the jump-list filename hash is defined
/// over.
const CRC_64_JONES: Algorithm<u64> = Algorithm {
    width: 64,
    poly: 0xAD93_D235_94C9_35A9,
    init: 0xFFFF_FFFF_FFFF_FFFF,
    refin: true,
    refout: true,
    xorout: 0,
    check: 0,
    residue: 0,
};

fn crc() -> Crc<u64> {
    Crc::<u64>::new(&CRC_64_JONES)
}

/// Encodes a string the way the jump-list AppID hash expects: UTF-16LE code
/// units, each one's two bytes emitted low byte first (i.e. plain
/// little-endian `u16` bytes).
fn utf16le_bytes(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect()
}

/// Computes the 64-bit AppID hash for the given AppID string.
pub fn app_id_hash(app_id: &str) -> u64 {
    let bytes = utf16le_bytes(app_id);
    crc().checksum(&bytes)
}

/// Formats the hash as the 16-lowercase-hex-digit jump-list filename stem
/// (spec.md §4.3.1).
pub fn app_id_hash_hex(app_id: &str) -> String {
    format!("{:016x}", app_id_hash(app_id))
}

/// The default AppID for an application without an explicit manifest: its
/// lowercased full executable path (spec.md §4.3.1, GLOSSARY).
pub fn default_app_id(executable_path: &str) -> String {
    executable_path.to_lowercase()
}
