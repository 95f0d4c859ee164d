//! The jump-list index (spec.md §4.3.1): built once per snapshot pass,
//! discarded at the end, and queried through the handler → process-name →
//! direct-exe tier order `GetRecentFilesForApp` defines.

pub mod appid;
pub mod compound;
pub mod shelllink;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use appid::{app_id_hash_hex, default_app_id};
use compound::JumpListEntry;

/// Maps a file extension (lowercase, with leading dot) to the canonical
/// process name used by the process-name index — Office apps, Acrobat,
/// Notepad, Notepad++ (spec.md §4.3.1, index #2).
/// The direct-exe tier only ever consults one application's own jump-list
/// file, so it is capped much tighter than the cross-application handler and
/// process-name tiers (spec.md §9: "Tier-2 candidate pool size differs
/// between call sites (5, 30, 50) ... preserve each site's specific limit").
const DIRECT_EXE_POOL_SIZE: usize = 5;

fn process_name_for_extension(ext: &str) -> Option<&'static str> {
    Some(match ext {
        ".doc" | ".docx" | ".docm" | ".rtf" => "winword",
        ".xls" | ".xlsx" | ".xlsm" | ".csv" => "excel",
        ".ppt" | ".pptx" | ".pptm" => "powerpnt",
        ".one" => "onenote",
        ".pdf" => "acrord32",
        ".txt" | ".log" | ".ini" => "notepad",
        // Source/config file types nobody else in the table claims, the
        // ones Notepad++ is actually opened for day to day.
        ".json" | ".xml" | ".yaml" | ".yml" | ".ps1" | ".md" => "notepad++",
        _ => return None,
    })
}

pub struct JumpListIndex {
    directory: PathBuf,
    /// Handler executable path (lowercased, resolved via the registry) →
    /// discovered jump-list paths.
    handler_index: HashMap<String, Vec<String>>,
    /// Canonical process name → discovered jump-list paths, bypassing
    /// handler resolution entirely (spec.md §4.3.1, index #2).
    process_name_index: HashMap<&'static str, Vec<String>>,
    /// Executables already resolved through the direct-exe tier (index #3),
    /// cached so a repeat query doesn't re-parse the same file.
    direct_exe_cache: HashMap<String, Vec<String>>,
}

impl JumpListIndex {
    /// Builds the handler and process-name indexes by parsing every
    /// jump-list file in `directory`. The direct-exe index is populated
    /// lazily, on first query per executable (spec.md §4.3.1, index #3).
    pub fn build(directory: PathBuf, resolve_handler: impl Fn(&str) -> Option<String>) -> Self {
        let mut handler_index: HashMap<String, Vec<String>> = HashMap::new();
        let mut process_name_index: HashMap<&'static str, Vec<String>> = HashMap::new();

        let files = match std::fs::read_dir(&directory) {
            Ok(rd) => rd.filter_map(|e| e.ok()).map(|e| e.path()).collect::<Vec<_>>(),
            Err(e) => {
                log::warn!("jump-list directory {directory:?} unreadable: {e}");
                Vec::new()
            }
        };

        for file in files {
            let entries = compound::extract_entries(&file);
            for JumpListEntry { path } in entries {
                if let Some(ext) = Path::new(&path)
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
                {
                    if let Some(proc_name) = process_name_for_extension(&ext) {
                        process_name_index.entry(proc_name).or_default().push(path.clone());
                    }
                    if let Some(handler) = resolve_handler(&ext) {
                        handler_index.entry(handler.to_lowercase()).or_default().push(path);
                    }
                }
            }
        }

        Self {
            directory,
            handler_index,
            process_name_index,
            direct_exe_cache: HashMap::new(),
        }
    }

    /// Resolution order per spec.md §4.3.1: direct → handler → process-name.
    /// The first tier returning a non-empty list wins; results are truncated
    /// to `max`. Never returns null — an empty `Vec` on a total miss.
    pub fn recent_files_for_app(&mut self, exe_path: &str, max: usize) -> Vec<String> {
        let direct = self.direct_exe_entries(exe_path);
        if !direct.is_empty() {
            return direct.into_iter().take(max).collect();
        }

        let exe_lower = exe_path.to_lowercase();
        if let Some(list) = self.handler_index.get(&exe_lower) {
            if !list.is_empty() {
                return list.iter().take(max).cloned().collect();
            }
        }

        let process_name = Path::new(exe_path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if let Some(list) = self.process_name_index.get(process_name.as_str()) {
            return list.iter().take(max).cloned().collect();
        }

        Vec::new()
    }

    fn direct_exe_entries(&mut self, exe_path: &str) -> Vec<String> {
        if let Some(cached) = self.direct_exe_cache.get(exe_path) {
            return cached.clone();
        }
        let app_id = default_app_id(exe_path);
        let stem = app_id_hash_hex(&app_id);
        let file = self.directory.join(format!("{stem}.automaticDestinations-ms"));
        let entries: Vec<String> = compound::extract_entries(&file)
            .into_iter()
            .map(|e| e.path)
            .take(DIRECT_EXE_POOL_SIZE)
            .collect();
        self.direct_exe_cache.insert(exe_path.to_string(), entries.clone());
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_name_covers_office_and_readers() {
        assert_eq!(process_name_for_extension(".docx"), Some("winword"));
        assert_eq!(process_name_for_extension(".pdf"), Some("acrord32"));
        assert_eq!(process_name_for_extension(".xlsx"), Some("excel"));
        assert_eq!(process_name_for_extension(".json"), Some("notepad++"));
        assert_eq!(process_name_for_extension(".unknown"), None);
    }

    #[test]
    fn recent_files_returns_empty_not_missing() {
        let mut idx = JumpListIndex::build(std::env::temp_dir().join("windowanchor-test-empty"), |_| None);
        assert_eq!(idx.recent_files_for_app(r"c:\no\such\app.exe", 30), Vec::<String>::new());
    }
}
