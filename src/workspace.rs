//! The `WorkspaceEntry` / `WorkspaceSnapshot` data model (spec.md §3).
//! Plain, serde-derivable data — no behavior attached — the way
//! `win32-display-data::Device` carries only fields and lets callers decide
//! what to do with them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::display::Monitor;
use crate::fileresolver::FileSource;
use crate::window::WindowRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceEntry {
    pub executable_path: String,
    pub process_name: String,
    pub window_class_name: String,
    pub file_path: Option<String>,
    pub file_confidence: u8,
    pub file_source: FileSource,
    pub launch_arg: Option<String>,
    pub position: WindowRecord,
    pub monitor_id: String,
    pub monitor_index: u32,
    pub monitor_name: String,
    /// Not persisted: set by the restore engine as entries are matched.
    #[serde(skip)]
    pub was_restored: bool,
}

impl WorkspaceEntry {
    /// Enforces spec.md §3's invariants: a non-empty `launch_arg` implies
    /// confidence ≥ 80; `EXPLORER_FOLDER` implies confidence == 95.
    pub fn is_well_formed(&self) -> bool {
        let launch_arg_ok = match &self.launch_arg {
            Some(arg) if !arg.is_empty() => {
                self.file_confidence >= crate::fileresolver::LAUNCH_ARGUMENT_CONFIDENCE_FLOOR
            }
            _ => true,
        };
        let explorer_ok = self.file_source != FileSource::ExplorerFolder || self.file_confidence == 95;
        launch_arg_ok && explorer_ok
    }

    /// Neutralizes every file-detection field — used when a snapshot was
    /// saved with `saved_with_files == false` (spec.md §3).
    pub fn neutralize_file_fields(&mut self) {
        self.file_path = None;
        self.file_confidence = 0;
        self.file_source = FileSource::None;
        self.launch_arg = None;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSnapshot {
    pub name: String,
    pub monitor_fingerprint: String,
    pub saved_at: DateTime<Utc>,
    pub saved_with_files: bool,
    pub monitors: Vec<Monitor>,
    pub entries: Vec<WorkspaceEntry>,
}

impl WorkspaceSnapshot {
    /// spec.md §3: every entry's monitor id either matches one of the
    /// snapshot's monitors or is empty (legacy/migrated data).
    pub fn monitor_ids_consistent(&self) -> bool {
        let known: std::collections::HashSet<_> =
            self.monitors.iter().map(|m| m.monitor_id.as_str()).collect();
        self.entries
            .iter()
            .all(|e| e.monitor_id.is_empty() || known.contains(e.monitor_id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{Rect, ShowCommand};

    fn sample_record() -> WindowRecord {
        WindowRecord {
            executable_path: r"C:\Windows\notepad.exe".into(),
            process_name: "notepad".into(),
            window_class_name: "Notepad".into(),
            title_snippet: "Untitled - Notepad".into(),
            show_command: ShowCommand::Normal,
            rect: Rect { left: 100, top: 100, right: 600, bottom: 500 },
            dpi: 96,
            folder_path: None,
            monitor_id: "ABCD:1234:0".into(),
            monitor_index: 0,
            monitor_name: "Monitor 1".into(),
        }
    }

    fn sample_entry() -> WorkspaceEntry {
        WorkspaceEntry {
            executable_path: r"C:\Windows\notepad.exe".into(),
            process_name: "notepad".into(),
            window_class_name: "Notepad".into(),
            file_path: None,
            file_confidence: 0,
            file_source: FileSource::None,
            launch_arg: None,
            position: sample_record(),
            monitor_id: "ABCD:1234:0".into(),
            monitor_index: 0,
            monitor_name: "Monitor 1".into(),
            was_restored: false,
        }
    }

    #[test]
    fn launch_arg_without_confidence_is_malformed() {
        let mut e = sample_entry();
        e.launch_arg = Some(r"C:\notes.txt".into());
        e.file_confidence = 40;
        assert!(!e.is_well_formed());
    }

    #[test]
    fn explorer_folder_must_be_confidence_95() {
        let mut e = sample_entry();
        e.file_source = FileSource::ExplorerFolder;
        e.file_confidence = 80;
        assert!(!e.is_well_formed());
        e.file_confidence = 95;
        assert!(e.is_well_formed());
    }

    #[test]
    fn neutralize_clears_every_file_field() {
        let mut e = sample_entry();
        e.file_path = Some("x".into());
        e.file_confidence = 90;
        e.file_source = FileSource::TitleParse;
        e.launch_arg = Some("x".into());
        e.neutralize_file_fields();
        assert_eq!(e.file_path, None);
        assert_eq!(e.file_confidence, 0);
        assert_eq!(e.file_source, FileSource::None);
        assert_eq!(e.launch_arg, None);
    }
}
