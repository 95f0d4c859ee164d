//! On-disk persistence (spec.md §4.6): one JSON file per named workspace
//! under the per-user app-data directory, a last-known-fingerprint marker,
//! and a rolling log file. Grounded on `dirs::data_dir` for the base path
//! the way `DrChat-persistentwin` locates its own profile store, with
//! pretty-printed camelCase JSON via `serde_json` matching the rest of the
//! crate's wire format.

pub mod migration;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PersistenceError;
use crate::workspace::WorkspaceSnapshot;

/// App-data subdirectory name, also used as the Windows registry app name
/// for future per-user settings (spec.md §4.6).
const APP_DIR_NAME: &str = "WindowAnchor";
const WORKSPACES_SUBDIR: &str = "workspaces";
const LAST_FINGERPRINT_FILE: &str = "last_fingerprint.txt";
const SETTINGS_FILE: &str = "settings.json";
const LOG_FILE: &str = "app.log";
/// Log files are truncated once they cross this size, oldest lines dropped
/// first (spec.md §4.6).
const LOG_TRUNCATE_BYTES: u64 = 2 * 1024 * 1024;

pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Resolves the app-data root via [`dirs::data_dir`] and ensures the
    /// `workspaces` subdirectory exists.
    pub fn open() -> Result<Self, PersistenceError> {
        let base = dirs::data_dir().ok_or(PersistenceError::NoDataDir)?;
        let root = base.join(APP_DIR_NAME);
        fs::create_dir_all(root.join(WORKSPACES_SUBDIR))?;
        Ok(Self { root })
    }

    /// For tests and integrators that want an explicit root instead of the
    /// real per-user app-data directory.
    pub fn at(root: PathBuf) -> Result<Self, PersistenceError> {
        fs::create_dir_all(root.join(WORKSPACES_SUBDIR))?;
        Ok(Self { root })
    }

    fn workspace_path(&self, name: &str) -> PathBuf {
        self.root.join(WORKSPACES_SUBDIR).join(format!("{}.workspace.json", sanitize_name(name)))
    }

    pub fn save_workspace(&self, snapshot: &WorkspaceSnapshot) -> Result<(), PersistenceError> {
        let path = self.workspace_path(&snapshot.name);
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(path, json)?;
        self.record_fingerprint(&snapshot.monitor_fingerprint)?;
        Ok(())
    }

    pub fn load_workspace(&self, name: &str) -> Result<WorkspaceSnapshot, PersistenceError> {
        let path = self.workspace_path(name);
        let json = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PersistenceError::NotFound(name.to_string())
            } else {
                PersistenceError::Io(e)
            }
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn delete_workspace(&self, name: &str) -> Result<(), PersistenceError> {
        let path = self.workspace_path(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PersistenceError::NotFound(name.to_string())),
            Err(e) => Err(PersistenceError::Io(e)),
        }
    }

    /// Lists workspace names by reading the `workspaces` directory — no
    /// index file, the directory listing is the source of truth.
    pub fn list_workspaces(&self) -> Result<Vec<String>, PersistenceError> {
        let dir = self.root.join(WORKSPACES_SUBDIR);
        let mut names: Vec<String> = fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let file_name = e.file_name().to_string_lossy().into_owned();
                file_name.strip_suffix(".workspace.json").map(str::to_string)
            })
            .collect();
        names.sort();
        Ok(names)
    }

    fn record_fingerprint(&self, fingerprint: &str) -> Result<(), PersistenceError> {
        fs::write(self.root.join(LAST_FINGERPRINT_FILE), fingerprint)?;
        Ok(())
    }

    pub fn last_fingerprint(&self) -> Option<String> {
        fs::read_to_string(self.root.join(LAST_FINGERPRINT_FILE)).ok()
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Truncates the log file to its trailing half once it exceeds
    /// [`LOG_TRUNCATE_BYTES`], called opportunistically before each append
    /// (spec.md §4.6) — never mid-write, so a crash can't corrupt a valid
    /// entry.
    pub fn roll_log_if_needed(&self) -> Result<(), PersistenceError> {
        let path = self.log_path();
        let Ok(metadata) = fs::metadata(&path) else {
            return Ok(());
        };
        if metadata.len() <= LOG_TRUNCATE_BYTES {
            return Ok(());
        }
        let contents = fs::read_to_string(&path)?;
        let mut keep_from = contents.len() / 2;
        while keep_from > 0 && !contents.is_char_boundary(keep_from) {
            keep_from += 1;
        }
        let boundary = contents[keep_from..]
            .find('\n')
            .map(|i| keep_from + i + 1)
            .unwrap_or(keep_from);
        fs::write(&path, &contents[boundary..])?;
        Ok(())
    }
}

/// Strips filesystem-hostile characters (collapsing them to nothing, not
/// substituting) so a workspace name can't escape the `workspaces` directory
/// or collide with a reserved Windows device name (spec.md §4.6).
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::Monitor;

    fn sample_snapshot(name: &str) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            name: name.to_string(),
            monitor_fingerprint: "abc123".into(),
            saved_at: chrono::Utc::now(),
            saved_with_files: false,
            monitors: vec![Monitor {
                monitor_id: "ABCD:1234:0".into(),
                friendly_name: "Monitor 1".into(),
                device_name: r"\\.\DISPLAY1".into(),
                index: 0,
                width_pixels: 1920,
                height_pixels: 1080,
                is_primary: true,
            }],
            entries: vec![],
        }
    }

    fn temp_store(tag: &str) -> (Store, PathBuf) {
        let root = std::env::temp_dir().join(format!("windowanchor-persist-{tag}"));
        let _ = fs::remove_dir_all(&root);
        (Store::at(root.clone()).unwrap(), root)
    }

    #[test]
    fn save_then_load_round_trips() {
        let (store, root) = temp_store("roundtrip");
        let snap = sample_snapshot("Work");
        store.save_workspace(&snap).unwrap();
        let loaded = store.load_workspace("Work").unwrap();
        assert_eq!(loaded.name, "Work");
        assert_eq!(loaded.monitor_fingerprint, "abc123");
        assert_eq!(store.last_fingerprint().as_deref(), Some("abc123"));
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn missing_workspace_is_not_found() {
        let (store, root) = temp_store("missing");
        assert!(matches!(store.load_workspace("ghost"), Err(PersistenceError::NotFound(_))));
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn delete_removes_the_file() {
        let (store, root) = temp_store("delete");
        store.save_workspace(&sample_snapshot("Temp")).unwrap();
        store.delete_workspace("Temp").unwrap();
        assert!(matches!(store.load_workspace("Temp"), Err(PersistenceError::NotFound(_))));
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn list_workspaces_is_sorted() {
        let (store, root) = temp_store("list");
        store.save_workspace(&sample_snapshot("Zeta")).unwrap();
        store.save_workspace(&sample_snapshot("Alpha")).unwrap();
        assert_eq!(store.list_workspaces().unwrap(), vec!["Alpha", "Zeta"]);
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn sanitize_strips_path_separators_and_reserved_chars() {
        assert_eq!(sanitize_name("Client: Project/Review"), "Client ProjectReview");
        assert_eq!(sanitize_name("   "), "untitled");
    }

    #[test]
    fn log_roll_keeps_file_under_threshold_on_next_write() {
        let (store, root) = temp_store("logroll");
        let oversized = "x\n".repeat(2 * 1024 * 1024);
        fs::write(store.log_path(), oversized).unwrap();
        store.roll_log_if_needed().unwrap();
        let after = fs::metadata(store.log_path()).unwrap().len();
        assert!(after < LOG_TRUNCATE_BYTES);
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn log_roll_does_not_split_a_multibyte_char_at_the_midpoint() {
        let (store, root) = temp_store("logroll-utf8");
        // "café\n" repeated lands the halfway point inside the 2-byte 'é'
        // for many repeat counts; this just needs to not panic.
        let oversized = "café\n".repeat(700_000);
        fs::write(store.log_path(), oversized).unwrap();
        store.roll_log_if_needed().unwrap();
        let after = fs::read_to_string(store.log_path()).unwrap();
        assert!(String::from_utf8(after.into_bytes()).is_ok());
        fs::remove_dir_all(&root).unwrap();
    }
}
