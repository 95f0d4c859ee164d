//! `SnapshotEngine` (spec.md §4.4): orchestrates per-window capture, applies
//! smart exclusion, runs file detection, and hands the result to
//! persistence.

use std::path::PathBuf;

use chrono::Utc;

use crate::config::{CoreConfig, WORKSPACE_PROMOTION_PROCESSES};
use crate::display::{self, Monitor};
use crate::fileresolver::jumplist::JumpListIndex;
use crate::fileresolver::{FileDetection, Resolver};
use crate::progress::{NullProgressSink, ProgressSink, SnapshotProgress};
use crate::window::{self, explorer, LiveWindow};
use crate::workspace::{WorkspaceEntry, WorkspaceSnapshot};

/// Per-window context the engine threads through capture + detection; kept
/// separate from [`LiveWindow`] because it adds the Explorer-only folder
/// path and whatever `selected_windows` filtering excludes.
pub struct CaptureCandidate {
    pub live: LiveWindow,
    pub explorer_folder: Option<String>,
}

pub struct SnapshotEngine<'a> {
    pub config: &'a CoreConfig,
    pub resolver: Resolver,
    pub jumplist_dir: PathBuf,
    pub home_dir: PathBuf,
}

impl<'a> SnapshotEngine<'a> {
    pub fn new(config: &'a CoreConfig, jumplist_dir: PathBuf, home_dir: PathBuf) -> Self {
        Self { config, resolver: Resolver::new(), jumplist_dir, home_dir }
    }

    /// `TakeSnapshot(name, save_files, selected_windows?, progress_sink?)`
    /// (spec.md §4.4). `save_files` of `None` defers to
    /// `CoreConfig::detect_files_by_default`.
    pub fn take_snapshot(
        &self,
        name: &str,
        save_files: Option<bool>,
        selected_handles: Option<&[isize]>,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<WorkspaceSnapshot, crate::error::WindowError> {
        let null_sink = NullProgressSink;
        let sink = sink.unwrap_or(&null_sink);
        let save_files = save_files.unwrap_or(self.config.detect_files_by_default);

        let monitor_list = display::enumerate().unwrap_or(display::MonitorList {
            monitors: Vec::new(),
            fingerprint: display::fingerprint_only(),
        });

        let self_pid = std::process::id();
        let candidates = self.enumerate_candidates(selected_handles, self_pid)?;

        let mut jumplist_index = if save_files {
            Some(JumpListIndex::build(self.jumplist_dir.clone(), |ext| self.resolver.handler_cache.resolve(ext)))
        } else {
            None
        };

        let total = candidates.len();
        let mut entries = Vec::with_capacity(total);

        sink.on_snapshot_progress(SnapshotProgress {
            current: 0,
            total,
            process_name: String::new(),
            title_snippet: String::new(),
        });

        for (i, candidate) in candidates.into_iter().enumerate() {
            sink.on_snapshot_progress(SnapshotProgress {
                current: i + 1,
                total,
                process_name: candidate.live.process_name.clone(),
                title_snippet: candidate.live.title.clone(),
            });

            entries.push(self.capture_entry(candidate, &monitor_list.monitors, save_files, jumplist_index.as_mut()));
        }

        sink.on_snapshot_progress(SnapshotProgress {
            current: total,
            total,
            process_name: String::new(),
            title_snippet: "saving…".to_string(),
        });

        Ok(WorkspaceSnapshot {
            name: name.to_string(),
            monitor_fingerprint: monitor_list.fingerprint,
            saved_at: Utc::now(),
            saved_with_files: save_files,
            monitors: monitor_list.monitors,
            entries,
        })
    }

    fn enumerate_candidates(
        &self,
        selected_handles: Option<&[isize]>,
        self_pid: u32,
    ) -> Result<Vec<CaptureCandidate>, crate::error::WindowError> {
        let live_windows = window::enumerate_user_windows()?;
        let explorer_folders = explorer::folder_paths_by_hwnd();

        Ok(live_windows
            .into_iter()
            .filter(|w| w.pid != self_pid)
            .filter(|w| selected_handles.map(|sel| sel.contains(&w.handle)).unwrap_or(true))
            .map(|live| {
                let explorer_folder = explorer_folders.get(&live.handle).cloned();
                CaptureCandidate { live, explorer_folder }
            })
            .collect())
    }

    fn capture_entry(
        &self,
        candidate: CaptureCandidate,
        monitors: &[Monitor],
        save_files: bool,
        jumplist_index: Option<&mut JumpListIndex>,
    ) -> WorkspaceEntry {
        let live = &candidate.live;
        let process_lower = live.process_name.to_lowercase();

        let monitor_id = display::monitor_id_for_window(live.handle, monitors);
        let (monitor_index, monitor_name) = monitors
            .iter()
            .find(|m| m.monitor_id == monitor_id)
            .map(|m| (m.index, m.friendly_name.clone()))
            .unwrap_or((0, String::new()));

        let position = window::capture_record(live, monitor_id.clone(), monitor_index, monitor_name.clone());

        let detection = if !save_files {
            FileDetection::none()
        } else if let Some(index) = jumplist_index {
            self.resolver.resolve(
                index,
                &process_lower,
                &live.executable_path,
                &live.title,
                candidate.explorer_folder.as_deref(),
                &self.home_dir,
            )
        } else {
            FileDetection::none()
        };

        let mut launch_arg = detection.launch_argument();
        if WORKSPACE_PROMOTION_PROCESSES.contains(&process_lower.as_str()) {
            launch_arg = launch_arg.map(|arg| promote_workspace_folder(&arg));
        }

        WorkspaceEntry {
            executable_path: live.executable_path.clone(),
            process_name: live.process_name.clone(),
            window_class_name: live.window_class_name.clone(),
            file_path: detection.file_path,
            file_confidence: detection.confidence,
            file_source: detection.source,
            launch_arg,
            position,
            monitor_id,
            monitor_index,
            monitor_name,
            was_restored: false,
        }
    }
}

/// Workspace-folder promotion for Electron-based code editors (spec.md
/// §4.4): a directory is kept as-is, a `.code-workspace` manifest is kept,
/// any other existing file is replaced by its containing directory.
pub fn promote_workspace_folder(path: &str) -> String {
    let p = std::path::Path::new(path);
    if p.is_dir() {
        return path.to_string();
    }
    if p.extension().map(|e| e.eq_ignore_ascii_case("code-workspace")).unwrap_or(false) && p.exists() {
        return path.to_string();
    }
    if p.exists() {
        if let Some(parent) = p.parent() {
            return parent.to_string_lossy().into_owned();
        }
    }
    path.to_string()
}

/// Pure re-statement of spec.md §4.4's smart-exclusion predicate, exposed so
/// the save dialog can decide default-checked state without re-deriving it.
pub fn is_smart_excluded(config: &CoreConfig, process_name_lower: &str, title: &str) -> bool {
    config.is_password_manager(process_name_lower) || config.is_private_title(title)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingSink {
        reports: std::sync::Mutex<Vec<SnapshotProgress>>,
    }

    impl ProgressSink for RecordingSink {
        fn on_snapshot_progress(&self, report: SnapshotProgress) {
            self.reports.lock().unwrap().push(report);
        }
    }

    #[test]
    fn take_snapshot_reports_a_leading_progress_event_before_any_window() {
        let config = CoreConfig::default();
        let engine = SnapshotEngine::new(&config, std::env::temp_dir().join("windowanchor-snapshot-jumplist"), std::env::temp_dir());
        let sink = RecordingSink { reports: std::sync::Mutex::new(Vec::new()) };
        let snapshot = engine.take_snapshot("Test", Some(false), None, Some(&sink)).unwrap();

        let reports = sink.reports.lock().unwrap();
        assert!(!reports.is_empty());
        assert_eq!(reports[0].current, 0);
        assert_eq!(reports[0].total, snapshot.entries.len());
    }

    #[test]
    fn smart_exclusion_flags_password_managers() {
        let cfg = CoreConfig::default();
        assert!(is_smart_excluded(&cfg, "keepass", "KeePass"));
        assert!(!is_smart_excluded(&cfg, "notepad", "notes.txt - Notepad"));
    }

    #[test]
    fn smart_exclusion_flags_private_browsing() {
        let cfg = CoreConfig::default();
        assert!(is_smart_excluded(&cfg, "chrome", "tab title - Incognito"));
    }

    #[test]
    fn promotion_keeps_existing_directory() {
        let dir = std::env::temp_dir();
        assert_eq!(promote_workspace_folder(dir.to_str().unwrap()), dir.to_str().unwrap());
    }

    #[test]
    fn promotion_replaces_plain_file_with_parent() {
        let dir = std::env::temp_dir().join("windowanchor-promote-test");
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("project.txt");
        std::fs::write(&file, b"x").unwrap();
        assert_eq!(promote_workspace_folder(file.to_str().unwrap()), dir.to_str().unwrap());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
