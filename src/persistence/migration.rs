//! One-time migration of legacy `profiles/*.profile.json` files into the
//! current workspace format, gated by a `.migrated_v2` sentinel so it never
//! runs twice (spec.md §4.6).

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use serde::Deserialize;

use super::Store;
use crate::error::PersistenceError;
use crate::fileresolver::FileSource;
use crate::window::{Rect, ShowCommand, WindowRecord};
use crate::workspace::{WorkspaceEntry, WorkspaceSnapshot};

const LEGACY_PROFILES_SUBDIR: &str = "profiles";
const MIGRATION_SENTINEL: &str = ".migrated_v2";

/// The pre-v2 on-disk shape: flatter, no file-detection fields, no monitor
/// metadata beyond a bare id string.
#[derive(Debug, Deserialize)]
struct LegacyProfile {
    #[serde(rename = "ProfileName", default)]
    profile_name: String,
    #[serde(rename = "MonitorFingerprint", default)]
    monitor_fingerprint: String,
    #[serde(rename = "LastSaved")]
    last_saved: chrono::DateTime<Utc>,
    #[serde(rename = "Windows")]
    windows: Vec<LegacyWindow>,
}

#[derive(Debug, Deserialize)]
struct LegacyWindow {
    #[serde(rename = "ExePath")]
    exe_path: String,
    #[serde(rename = "ClassName")]
    class_name: String,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Left")]
    left: i32,
    #[serde(rename = "Top")]
    top: i32,
    #[serde(rename = "Right")]
    right: i32,
    #[serde(rename = "Bottom")]
    bottom: i32,
    #[serde(rename = "Maximized", default)]
    maximized: bool,
    #[serde(rename = "Minimized", default)]
    minimized: bool,
    #[serde(rename = "MonitorId", default)]
    monitor_id: String,
}

fn process_name_from_exe(path: &str) -> String {
    std::path::Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The fallback name for a legacy profile with no display name: `Monitor
/// Config <first-6-of-fingerprint>` (spec.md §4.6).
fn fallback_name(fingerprint: &str) -> String {
    let prefix: String = fingerprint.chars().take(6).collect();
    format!("Monitor Config {prefix}")
}

fn convert(legacy: LegacyProfile) -> WorkspaceSnapshot {
    let LegacyProfile { profile_name, monitor_fingerprint, last_saved, windows } = legacy;
    let name = if profile_name.trim().is_empty() {
        fallback_name(&monitor_fingerprint)
    } else {
        profile_name
    };

    let entries = windows
        .into_iter()
        .map(|w| {
            let show_command = if w.maximized {
                ShowCommand::Maximized
            } else if w.minimized {
                ShowCommand::Minimized
            } else {
                ShowCommand::Normal
            };
            let process_name = process_name_from_exe(&w.exe_path);
            let position = WindowRecord {
                executable_path: w.exe_path.clone(),
                process_name: process_name.clone(),
                window_class_name: w.class_name.clone(),
                title_snippet: crate::window::truncate_title(&w.title),
                show_command,
                rect: Rect { left: w.left, top: w.top, right: w.right, bottom: w.bottom },
                // legacy profiles predate per-window DPI capture; 96 (100%) is
                // the least-surprising default and keeps scale_rect a no-op
                // until the window is actually repositioned once.
                dpi: 96,
                folder_path: None,
                monitor_id: w.monitor_id.clone(),
                monitor_index: 0,
                monitor_name: String::new(),
            };
            WorkspaceEntry {
                executable_path: w.exe_path,
                process_name,
                window_class_name: w.class_name,
                file_path: None,
                file_confidence: 0,
                file_source: FileSource::None,
                launch_arg: None,
                position,
                monitor_id: w.monitor_id,
                monitor_index: 0,
                monitor_name: String::new(),
                was_restored: false,
            }
        })
        .collect();

    WorkspaceSnapshot {
        name,
        monitor_fingerprint,
        saved_at: last_saved,
        saved_with_files: false,
        monitors: vec![],
        entries,
    }
}

/// Migrates every `profiles/*.profile.json` file under `legacy_root` into
/// `store`, then writes the sentinel. Returns the migrated workspace names.
/// A no-op, returning an empty list, if the sentinel already exists or the
/// legacy directory is absent.
pub fn migrate_if_needed(store: &Store, legacy_root: &std::path::Path) -> Result<Vec<String>, PersistenceError> {
    let sentinel = store.root().join(MIGRATION_SENTINEL);
    if sentinel.exists() {
        return Ok(Vec::new());
    }

    let profiles_dir = legacy_root.join(LEGACY_PROFILES_SUBDIR);
    let mut migrated = Vec::new();

    if profiles_dir.is_dir() {
        let files: Vec<PathBuf> = fs::read_dir(&profiles_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
            .collect();

        for file in files {
            let contents = match fs::read_to_string(&file) {
                Ok(c) => c,
                Err(e) => {
                    log::warn!("skipping unreadable legacy profile {file:?}: {e}");
                    continue;
                }
            };
            let legacy: LegacyProfile = match serde_json::from_str(&contents) {
                Ok(l) => l,
                Err(e) => {
                    log::warn!("skipping malformed legacy profile {file:?}: {e}");
                    continue;
                }
            };
            let snapshot = convert(legacy);
            let name = snapshot.name.clone();
            store.save_workspace(&snapshot)?;
            migrated.push(name);
        }
    }

    fs::write(sentinel, b"1")?;
    Ok(migrated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_json() -> &'static str {
        r#"{
            "ProfileName": "Legacy Desktop",
            "MonitorFingerprint": "deadbeefcafef00d",
            "LastSaved": "2022-03-01T12:00:00Z",
            "Windows": [
                {
                    "ExePath": "C:\\Windows\\notepad.exe",
                    "ClassName": "Notepad",
                    "Title": "notes.txt - Notepad",
                    "Left": 100, "Top": 100, "Right": 600, "Bottom": 500,
                    "Maximized": false, "Minimized": false,
                    "MonitorId": "ABCD:1234:0"
                }
            ]
        }"#
    }

    fn legacy_json_unnamed() -> &'static str {
        r#"{
            "ProfileName": "",
            "MonitorFingerprint": "deadbeefcafef00d",
            "LastSaved": "2022-03-01T12:00:00Z",
            "Windows": []
        }"#
    }

    #[test]
    fn migration_converts_legacy_fields() {
        let legacy: LegacyProfile = serde_json::from_str(legacy_json()).unwrap();
        let snap = convert(legacy);
        assert_eq!(snap.name, "Legacy Desktop");
        assert_eq!(snap.monitor_fingerprint, "deadbeefcafef00d");
        assert_eq!(snap.saved_at.to_rfc3339(), "2022-03-01T12:00:00+00:00");
        assert!(!snap.saved_with_files);
        assert_eq!(snap.entries.len(), 1);
        assert_eq!(snap.entries[0].process_name, "notepad");
        assert_eq!(snap.entries[0].position.show_command, ShowCommand::Normal);
    }

    #[test]
    fn migration_falls_back_to_monitor_config_name_when_unnamed() {
        let legacy: LegacyProfile = serde_json::from_str(legacy_json_unnamed()).unwrap();
        let snap = convert(legacy);
        assert_eq!(snap.name, "Monitor Config deadbe");
    }

    #[test]
    fn migration_is_idempotent_via_sentinel() {
        let root = std::env::temp_dir().join("windowanchor-migration-test");
        let _ = fs::remove_dir_all(&root);
        let legacy_root = root.join("legacy");
        fs::create_dir_all(legacy_root.join(LEGACY_PROFILES_SUBDIR)).unwrap();
        fs::write(legacy_root.join(LEGACY_PROFILES_SUBDIR).join("a.profile.json"), legacy_json()).unwrap();

        let store = Store::at(root.join("data")).unwrap();
        let first = migrate_if_needed(&store, &legacy_root).unwrap();
        assert_eq!(first, vec!["Legacy Desktop".to_string()]);

        let second = migrate_if_needed(&store, &legacy_root).unwrap();
        assert!(second.is_empty());

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn malformed_legacy_file_is_skipped_not_fatal() {
        let root = std::env::temp_dir().join("windowanchor-migration-malformed");
        let _ = fs::remove_dir_all(&root);
        let legacy_root = root.join("legacy");
        fs::create_dir_all(legacy_root.join(LEGACY_PROFILES_SUBDIR)).unwrap();
        fs::write(legacy_root.join(LEGACY_PROFILES_SUBDIR).join("broken.profile.json"), b"not json").unwrap();

        let store = Store::at(root.join("data")).unwrap();
        let migrated = migrate_if_needed(&store, &legacy_root).unwrap();
        assert!(migrated.is_empty());

        fs::remove_dir_all(&root).unwrap();
    }
}
