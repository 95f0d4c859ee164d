//! Shell Link (.lnk) binary parsing (spec.md §4.3.1, §6, §8 property 6).
//! Pure over an in-memory byte slice so it can be tested without touching a
//! real jump-list file; `compound.rs` is responsible for handing it the raw
//! bytes of each stream.

const HEADER_SIZE: usize = 76;
const HEADER_MAGIC: u8 = 0x4C;
const FLAGS_OFFSET: usize = 20;
const FLAG_HAS_LINK_TARGET_ID_LIST: u32 = 1 << 0;
const FLAG_HAS_LINK_INFO: u32 = 1 << 1;
const UNICODE_HEADER_SIZE_THRESHOLD: u32 = 0x24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LnkParseError {
    TooShort,
    BadMagic,
    TruncatedIdList,
    TruncatedLinkInfo,
}

impl std::fmt::Display for LnkParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort => write!(f, "stream shorter than the 76-byte shell link header"),
            Self::BadMagic => write!(f, "missing 0x4C header magic"),
            Self::TruncatedIdList => write!(f, "link-target id-list block truncated"),
            Self::TruncatedLinkInfo => write!(f, "link-info block truncated"),
        }
    }
}

/// Parses a Shell Link blob and returns its target path, if any, preferring
/// the Unicode local-base-path over the ANSI one when both are present
/// (spec.md §4.3.1, §6).
pub fn parse_target_path(data: &[u8]) -> Result<Option<String>, LnkParseError> {
    if data.len() < HEADER_SIZE {
        return Err(LnkParseError::TooShort);
    }
    if data[0] != HEADER_MAGIC {
        return Err(LnkParseError::BadMagic);
    }

    let flags = read_u32(data, FLAGS_OFFSET).ok_or(LnkParseError::TooShort)?;
    let mut offset = HEADER_SIZE;

    if flags & FLAG_HAS_LINK_TARGET_ID_LIST != 0 {
        let size = read_u16(data, offset).ok_or(LnkParseError::TruncatedIdList)? as usize;
        offset = offset
            .checked_add(2)
            .and_then(|o| o.checked_add(size))
            .ok_or(LnkParseError::TruncatedIdList)?;
        if offset > data.len() {
            return Err(LnkParseError::TruncatedIdList);
        }
    }

    if flags & FLAG_HAS_LINK_INFO == 0 {
        return Ok(None);
    }

    let link_info = data.get(offset..).ok_or(LnkParseError::TruncatedLinkInfo)?;
    parse_link_info(link_info)
}

fn parse_link_info(block: &[u8]) -> Result<Option<String>, LnkParseError> {
    let _link_info_size = read_u32(block, 0).ok_or(LnkParseError::TruncatedLinkInfo)?;
    let header_size = read_u32(block, 4).ok_or(LnkParseError::TruncatedLinkInfo)?;
    let ansi_offset = read_u32(block, 16).ok_or(LnkParseError::TruncatedLinkInfo)?;

    let unicode_offset = if header_size >= UNICODE_HEADER_SIZE_THRESHOLD {
        read_u32(block, 28)
    } else {
        None
    };

    if let Some(off) = unicode_offset.filter(|&o| o != 0) {
        if let Some(path) = read_utf16le_nul_terminated(block, off as usize) {
            return Ok(Some(path));
        }
    }

    if ansi_offset != 0 {
        if let Some(path) = read_ansi_nul_terminated(block, ansi_offset as usize) {
            return Ok(Some(path));
        }
    }

    Ok(None)
}

fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_ansi_nul_terminated(data: &[u8], offset: usize) -> Option<String> {
    let rest = data.get(offset..)?;
    let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
    Some(String::from_utf8_lossy(&rest[..end]).into_owned())
}

fn read_utf16le_nul_terminated(data: &[u8], offset: usize) -> Option<String> {
    let rest = data.get(offset..)?;
    let mut units = Vec::new();
    let mut i = 0;
    while i + 1 < rest.len() {
        let unit = u16::from_le_bytes([rest[i], rest[i + 1]]);
        if unit == 0 {
            break;
        }
        units.push(unit);
        i += 2;
    }
    Some(String::from_utf16_lossy(&units))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(flags: u32) -> Vec<u8> {
        let mut h = vec![0u8; HEADER_SIZE];
        h[0] = HEADER_MAGIC;
        h[FLAGS_OFFSET..FLAGS_OFFSET + 4].copy_from_slice(&flags.to_le_bytes());
        h
    }

    fn link_info_block(ansi_path: &str, unicode_path: Option<&str>) -> Vec<u8> {
        let header_size: u32 = if unicode_path.is_some() { 0x24 } else { 0x1C };
        let mut block = vec![0u8; header_size as usize];
        block[4..8].copy_from_slice(&header_size.to_le_bytes());

        let ansi_offset = block.len() as u32;
        block.extend_from_slice(ansi_path.as_bytes());
        block.push(0);

        let unicode_offset = if let Some(u) = unicode_path {
            let off = block.len() as u32;
            for unit in u.encode_utf16() {
                block.extend_from_slice(&unit.to_le_bytes());
            }
            block.extend_from_slice(&[0, 0]);
            off
        } else {
            0
        };

        block[16..20].copy_from_slice(&ansi_offset.to_le_bytes());
        if header_size >= UNICODE_HEADER_SIZE_THRESHOLD {
            block[28..32].copy_from_slice(&unicode_offset.to_le_bytes());
        }

        let total_size = block.len() as u32;
        block[0..4].copy_from_slice(&total_size.to_le_bytes());
        block
    }

    #[test]
    fn too_short_is_rejected() {
        assert_eq!(parse_target_path(&[0x4C]), Err(LnkParseError::TooShort));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut h = header(0);
        h[0] = 0;
        assert_eq!(parse_target_path(&h), Err(LnkParseError::BadMagic));
    }

    #[test]
    fn no_link_info_flag_returns_none() {
        let h = header(FLAG_HAS_LINK_TARGET_ID_LIST);
        let mut data = h;
        data.extend_from_slice(&0u16.to_le_bytes()); // zero-length id list
        assert_eq!(parse_target_path(&data).unwrap(), None);
    }

    #[test]
    fn prefers_unicode_path_when_both_present() {
        let mut data = header(FLAG_HAS_LINK_INFO);
        data.extend(link_info_block(r"C:\ANSI\path.txt", Some(r"C:\Unicode\Path\notes.txt")));
        assert_eq!(
            parse_target_path(&data).unwrap(),
            Some(r"C:\Unicode\Path\notes.txt".to_string())
        );
    }

    #[test]
    fn falls_back_to_ansi_when_no_unicode() {
        let mut data = header(FLAG_HAS_LINK_INFO);
        data.extend(link_info_block(r"C:\ANSI\only.txt", None));
        assert_eq!(
            parse_target_path(&data).unwrap(),
            Some(r"C:\ANSI\only.txt".to_string())
        );
    }

    #[test]
    fn id_list_then_link_info_both_parsed() {
        let mut data = header(FLAG_HAS_LINK_TARGET_ID_LIST | FLAG_HAS_LINK_INFO);
        let id_list_payload = vec![0xAAu8; 10];
        data.extend_from_slice(&(id_list_payload.len() as u16).to_le_bytes());
        data.extend_from_slice(&id_list_payload);
        data.extend(link_info_block(r"C:\after\idlist.txt", None));
        assert_eq!(
            parse_target_path(&data).unwrap(),
            Some(r"C:\after\idlist.txt".to_string())
        );
    }
}
