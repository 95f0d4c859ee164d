//! OLE compound document extraction for jump-list files (spec.md §4.3.1,
//! §6, §7 `CompoundDocMalformed`/`LnkMalformed`). Uses the real Windows
//! Structured Storage API (`StgOpenStorage`/`IStorage`/`IEnumSTATSTG`/
//! `IStream`) rather than a hand-rolled OLE reader — the `windows` crate
//! already exposes this surface (the same `Win32_System_Com_StructuredStorage`
//! feature family is imported, unused, by `hdrcapture`'s `Cargo.toml`), and
//! reaching for the system API instead of reinventing the container format
//! matches the rest of the stack's reliance on `windows` for every other
//! binary-OS-format need.

use super::shelllink::parse_target_path;

const DEST_LIST_STREAM_NAME: &str = "DestList";

/// One recovered target path from a jump-list file's non-`DestList` streams.
#[derive(Debug, Clone)]
pub struct JumpListEntry {
    pub path: String,
}

/// Extracts every target path from the streams of a jump-list compound
/// document at `path`. Stream-level failures are isolated: a single corrupt
/// stream is skipped and logged, the remaining streams are still parsed
/// (spec.md §5, §7).
#[cfg(windows)]
pub fn extract_entries(path: &std::path::Path) -> Vec<JumpListEntry> {
    match os::extract_entries(path) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("jump-list file {path:?} unreadable: {e}");
            Vec::new()
        }
    }
}

#[cfg(not(windows))]
pub fn extract_entries(_path: &std::path::Path) -> Vec<JumpListEntry> {
    Vec::new()
}

/// Given raw stream bytes (already read off disk, by whatever means), parses
/// it as a Shell Link and returns the target path if it refers to an
/// existing filesystem entity (spec.md §4.3.1: "Result is returned only if
/// it refers to a filesystem entity that exists").
pub fn entry_from_stream_bytes(name: &str, bytes: &[u8], path_exists: impl Fn(&str) -> bool) -> Option<JumpListEntry> {
    if name.eq_ignore_ascii_case(DEST_LIST_STREAM_NAME) {
        return None;
    }
    let target = parse_target_path(bytes).ok().flatten()?;
    path_exists(&target).then_some(JumpListEntry { path: target })
}

#[cfg(windows)]
mod os {
    use std::io;
    use std::path::{Path, PathBuf};

    use windows::core::PCWSTR;
    use windows::Win32::System::Com::StructuredStorage::{StgOpenStorage, STGM_READ, STGM_SHARE_EXCLUSIVE};
    use windows::Win32::System::Com::{CoTaskMemFree, STATFLAG_DEFAULT};

    use super::JumpListEntry;

    pub fn extract_entries(path: &Path) -> Result<Vec<JumpListEntry>, io::Error> {
        // The shell keeps the original jump-list file locked; copy it first.
        let temp = copy_to_temp(path)?;
        let result = read_compound_document(&temp);
        let _ = std::fs::remove_file(&temp);
        result
    }

    fn copy_to_temp(path: &Path) -> Result<PathBuf, io::Error> {
        let mut temp = std::env::temp_dir();
        let unique = format!(
            "windowanchor-jl-{}-{}",
            std::process::id(),
            path.file_name().and_then(|n| n.to_str()).unwrap_or("stream")
        );
        temp.push(unique);
        std::fs::copy(path, &temp)?;
        Ok(temp)
    }

    fn read_compound_document(path: &Path) -> Result<Vec<JumpListEntry>, io::Error> {
        let wide: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        let storage = unsafe { StgOpenStorage(PCWSTR(wide.as_ptr()), None, STGM_READ | STGM_SHARE_EXCLUSIVE, None, 0) }
            .map_err(|e| io::Error::other(format!("StgOpenStorage failed: {e}")))?;

        let enumerator = unsafe { storage.EnumElements(0, None, 0) }
            .map_err(|e| io::Error::other(format!("EnumElements failed: {e}")))?;

        let mut entries = Vec::new();
        loop {
            let mut stat_buf = [std::mem::MaybeUninit::uninit(); 1];
            let mut fetched = 0u32;
            let hr = unsafe { enumerator.Next(std::mem::transmute(stat_buf.as_mut_ptr()), &mut fetched) };
            if hr.is_err() || fetched == 0 {
                break;
            }
            let stat = unsafe { stat_buf[0].assume_init_ref() };
            let name = widestring_to_string(&stat.pwcsName);
            // IEnumSTATSTG::Next allocates pwcsName via CoTaskMemAlloc; ours to free.
            if !stat.pwcsName.is_null() {
                unsafe { CoTaskMemFree(Some(stat.pwcsName.0 as *const _)) };
            }
            if name.eq_ignore_ascii_case(super::DEST_LIST_STREAM_NAME) {
                continue;
            }

            match read_stream(&storage, &name) {
                Ok(bytes) => {
                    if let Some(entry) = super::entry_from_stream_bytes(&name, &bytes, |p| Path::new(p).exists()) {
                        entries.push(entry);
                    }
                }
                Err(e) => log::debug!("jump-list stream {name:?} skipped: {e}"),
            }
        }

        Ok(entries)
    }

    fn read_stream(
        storage: &windows::Win32::System::Com::StructuredStorage::IStorage,
        name: &str,
    ) -> Result<Vec<u8>, io::Error> {
        let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
        let stream = unsafe {
            storage.OpenStream(
                PCWSTR(wide.as_ptr()),
                None,
                windows::Win32::System::Com::StructuredStorage::STGM_READ
                    | windows::Win32::System::Com::StructuredStorage::STGM_SHARE_EXCLUSIVE,
                0,
            )
        }
        .map_err(|e| io::Error::other(format!("OpenStream failed: {e}")))?;

        let mut stat = windows::Win32::System::Com::STATSTG::default();
        unsafe { stream.Stat(&mut stat, STATFLAG_DEFAULT) }
            .map_err(|e| io::Error::other(format!("Stat failed: {e}")))?;

        let size = stat.cbSize as usize;
        let mut buf = vec![0u8; size];
        let mut read = 0u32;
        unsafe { stream.Read(buf.as_mut_ptr() as *mut _, size as u32, Some(&mut read)) }
            .ok()
            .map_err(|e| io::Error::other(format!("Read failed: {e}")))?;
        buf.truncate(read as usize);
        Ok(buf)
    }

    fn widestring_to_string(p: &windows::core::PWSTR) -> String {
        if p.is_null() {
            return String::new();
        }
        unsafe { p.to_string().unwrap_or_default() }
    }

    use std::os::windows::ffi::OsStrExt;
}
