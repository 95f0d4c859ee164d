//! `RestoreEngine` (spec.md §4.5): the five-phase match → launch → wait →
//! rematch → wait → rematch state machine, plus the standalone
//! `SwitchWorkspaceAsync` context switch.

use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::SESSION_RESTORE_BROWSERS;
use crate::error::RestoreError;
use crate::progress::{CloseProgress, NullProgressSink, ProgressSink};
use crate::window::{self, LiveWindow};
use crate::workspace::{WorkspaceEntry, WorkspaceSnapshot};

/// How many leading bytes of the saved title snippet the live title must
/// start with for a same-exe-same-prefix match (spec.md §4.5, matching tier
/// 3).
const TITLE_PREFIX_MATCH_LEN: usize = 10;
const WAIT_AFTER_LAUNCH: Duration = Duration::from_secs(3);
const WAIT_BEFORE_FINAL_PASS: Duration = Duration::from_secs(2);
const WORKSPACE_SWITCH_POLL_INTERVAL: Duration = Duration::from_millis(500);
const WORKSPACE_SWITCH_POLL_ATTEMPTS: u32 = 240; // 240 * 500ms == 120s

#[derive(Debug, Clone, Copy)]
pub struct RestoreOutcome {
    pub matched: usize,
    pub launched: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchTier {
    ExeTitlePrefix,
    ExeClass,
    DocumentAware,
}

/// Scores how well `entry` matches a live window, returning the strongest
/// applicable tier (spec.md §4.5): document-aware beats exe+class beats
/// exe+title-prefix. `None` if the executables don't even match.
fn match_quality(entry: &WorkspaceEntry, live: &LiveWindow) -> Option<MatchTier> {
    if !entry.executable_path.eq_ignore_ascii_case(&live.executable_path) {
        return None;
    }

    if let Some(path) = entry.file_path.as_deref() {
        if let Some(stem) = Path::new(path).file_stem().and_then(|s| s.to_str()) {
            if stem.len() >= 2 && live.title.to_lowercase().contains(&stem.to_lowercase()) {
                return Some(MatchTier::DocumentAware);
            }
        }
    }

    if entry.window_class_name == live.window_class_name {
        return Some(MatchTier::ExeClass);
    }

    if title_prefix_matches(&entry.position.title_snippet, &live.title) {
        return Some(MatchTier::ExeTitlePrefix);
    }

    None
}

/// Slices `s` to at most `max_bytes` bytes without splitting a UTF-8 code
/// point, the same boundary-safe approach `truncate_title` uses.
fn byte_prefix(s: &str, max_bytes: usize) -> &str {
    let mut end = max_bytes.min(s.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// The live title starts (case-insensitive) with the first
/// [`TITLE_PREFIX_MATCH_LEN`] bytes of the saved title snippet (spec.md
/// §4.5, matching tier 3).
fn title_prefix_matches(saved_snippet: &str, live_title: &str) -> bool {
    let prefix = byte_prefix(saved_snippet, TITLE_PREFIX_MATCH_LEN).to_lowercase();
    prefix.len() >= 3 && live_title.to_lowercase().starts_with(&prefix)
}

/// First-fit greedy assignment of entries to live windows, in snapshot
/// order, preferring the strongest available tier per entry. Not a global
/// optimum — a documented simplification (spec.md §9).
fn match_entries_to_windows(entries: &[WorkspaceEntry], live: &[LiveWindow]) -> Vec<Option<usize>> {
    let mut used = vec![false; live.len()];
    let mut result = vec![None; entries.len()];

    for (i, entry) in entries.iter().enumerate() {
        if entry.was_restored {
            continue;
        }
        let mut best: Option<(MatchTier, usize)> = None;
        for (j, win) in live.iter().enumerate() {
            if used[j] {
                continue;
            }
            if let Some(tier) = match_quality(entry, win) {
                if best.map(|(t, _)| tier > t).unwrap_or(true) {
                    best = Some((tier, j));
                }
            }
        }
        if let Some((_, j)) = best {
            used[j] = true;
            result[i] = Some(j);
        }
    }
    result
}

fn rematch_and_reposition(entries: &mut [WorkspaceEntry]) -> usize {
    let live = window::enumerate_user_windows().unwrap_or_default();
    let assignment = match_entries_to_windows(entries, &live);
    let mut newly_matched = 0;
    for (i, hit) in assignment.into_iter().enumerate() {
        if let Some(j) = hit {
            entries[i].was_restored = true;
            let _ = window::restore_placement(live[j].handle, &entries[i].position, live[j].dpi);
            newly_matched += 1;
        }
    }
    newly_matched
}

/// Groups unmatched entry indices by executable path, preserving snapshot
/// order (stable, so launch order is deterministic across runs).
fn group_unmatched_by_exe(entries: &[WorkspaceEntry]) -> Vec<(String, Vec<usize>)> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    for (i, e) in entries.iter().enumerate() {
        if e.was_restored {
            continue;
        }
        match groups.iter_mut().find(|(exe, _)| exe == &e.executable_path) {
            Some((_, idxs)) => idxs.push(i),
            None => groups.push((e.executable_path.clone(), vec![i])),
        }
    }
    groups
}

/// Within one executable's group, returns only the entries this pass should
/// actually launch (spec.md §4.5): document entries launch, in snapshot
/// order. Bare-executable entries launch too, but only when no document
/// entry for the same executable is pending this pass — launching the bare
/// exe first would let a single-instance app claim the slot before its
/// sibling document-opening launch arrives, and launching it anyway once a
/// sibling document is already queued would let the OS's document-open
/// (DDE) semantics route that document into the bare instance, permanently
/// starving the bare entry of its own window. A skipped bare entry is never
/// retried later in the same restore (spec.md §4.5 scenario 4, §5 "plain-app
/// entries for which a document entry is pending are not launched at all in
/// that pass").
fn docs_before_bare(indices: Vec<usize>, entries: &[WorkspaceEntry]) -> Vec<usize> {
    let (mut with_doc, mut bare): (Vec<usize>, Vec<usize>) =
        indices.into_iter().partition(|&i| entries[i].launch_arg.is_some());
    with_doc.sort_unstable();
    if !with_doc.is_empty() {
        return with_doc;
    }
    bare.sort_unstable();
    bare
}

fn launch_entry(entry: &WorkspaceEntry) -> Result<(), RestoreError> {
    let mut cmd = std::process::Command::new(&entry.executable_path);
    if let Some(arg) = &entry.launch_arg {
        cmd.arg(arg);
    } else if SESSION_RESTORE_BROWSERS.contains(&entry.process_name.to_lowercase().as_str()) {
        // Bare browser relaunch: restore tabs rather than opening a blank window
        // (spec.md §4.5, `BrowserSessionRestore`).
        cmd.arg("--restore-last-session");
    }
    cmd.spawn()
        .map(|_| ())
        .map_err(|e| RestoreError::LaunchFailed(format!("{}: {e}", entry.executable_path)))
}

async fn cancellable_sleep(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = cancel.cancelled() => true,
    }
}

/// Restricts a snapshot's entries to those on the given monitor ids, for a
/// partial/selective restore (spec.md §4.5). `None` restores everything.
fn select_entries(snapshot: &WorkspaceSnapshot, monitor_filter: Option<&[String]>) -> Vec<WorkspaceEntry> {
    match monitor_filter {
        None => snapshot.entries.clone(),
        Some(ids) => snapshot
            .entries
            .iter()
            .filter(|e| ids.iter().any(|id| id == &e.monitor_id))
            .cloned()
            .collect(),
    }
}

/// The five-phase restore state machine (spec.md §4.5):
///
/// 1. Match already-running windows to entries, reposition matches.
/// 2. Launch entries with no match, per executable group: documents first;
///    a bare-executable entry only launches when no document entry shares
///    its executable this pass, otherwise it is skipped outright.
/// 3. If nothing was launched, return immediately (everything that could be
///    matched already has been).
/// 4. Wait 3s, then rematch and reposition the newcomers.
/// 5. Wait 2s more, then run one final rematch pass for slow starters.
pub async fn restore_workspace(
    snapshot: &WorkspaceSnapshot,
    monitor_filter: Option<&[String]>,
    cancel: &CancellationToken,
) -> Result<RestoreOutcome, RestoreError> {
    let mut entries = select_entries(snapshot, monitor_filter);

    let matched_live = rematch_and_reposition(&mut entries);
    let _ = matched_live;

    let mut launched = 0usize;
    for (_exe, group) in group_unmatched_by_exe(&entries) {
        for i in docs_before_bare(group, &entries) {
            if cancel.is_cancelled() {
                return Err(RestoreError::Cancelled);
            }
            if launch_entry(&entries[i]).is_ok() {
                launched += 1;
            }
        }
    }

    if launched == 0 {
        let matched = entries.iter().filter(|e| e.was_restored).count();
        return Ok(RestoreOutcome { matched, launched });
    }

    if cancellable_sleep(WAIT_AFTER_LAUNCH, cancel).await {
        return Err(RestoreError::Cancelled);
    }
    rematch_and_reposition(&mut entries);

    if cancellable_sleep(WAIT_BEFORE_FINAL_PASS, cancel).await {
        return Err(RestoreError::Cancelled);
    }
    rematch_and_reposition(&mut entries);

    let matched = entries.iter().filter(|e| e.was_restored).count();
    Ok(RestoreOutcome { matched, launched })
}

/// `SwitchWorkspaceAsync` (spec.md §4.5): gracefully closes every current
/// window, polls for the desktop to empty out (up to 120s, 500ms interval),
/// emitting a [`CloseProgress`] report whenever the remaining count changes.
/// If the desktop is still non-empty at timeout, the switch aborts with
/// [`RestoreError::SwitchTimedOut`] and no restore is performed — an
/// unsaved-changes dialog blocking a close must not silently wipe out
/// windows the user never agreed to close.
pub async fn switch_workspace(
    target: &WorkspaceSnapshot,
    monitor_filter: Option<&[String]>,
    cancel: &CancellationToken,
    sink: Option<&dyn ProgressSink>,
) -> Result<RestoreOutcome, RestoreError> {
    let null_sink = NullProgressSink;
    let sink = sink.unwrap_or(&null_sink);

    let _ = window::close_all_except_self();

    let mut remaining = window::count_user_windows();
    sink.on_close_progress(CloseProgress { remaining });

    let mut drained = remaining == 0;
    for _ in 0..WORKSPACE_SWITCH_POLL_ATTEMPTS {
        if drained {
            break;
        }
        if cancellable_sleep(WORKSPACE_SWITCH_POLL_INTERVAL, cancel).await {
            return Err(RestoreError::Cancelled);
        }
        let current = window::count_user_windows();
        if current != remaining {
            remaining = current;
            sink.on_close_progress(CloseProgress { remaining });
        }
        drained = remaining == 0;
    }

    if !drained {
        log::warn!("workspace switch: windows still open after 120s poll, aborting switch");
        return Err(RestoreError::SwitchTimedOut);
    }

    restore_workspace(target, monitor_filter, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::Monitor;
    use crate::fileresolver::FileSource;
    use crate::window::{Rect, ShowCommand, WindowRecord};

    fn live(process_name: &str, class: &str, title: &str) -> LiveWindow {
        LiveWindow {
            handle: 1,
            pid: 4242,
            executable_path: format!(r"C:\apps\{process_name}.exe"),
            process_name: process_name.to_string(),
            window_class_name: class.to_string(),
            title: title.to_string(),
            show_command: ShowCommand::Normal,
            restored_rect: Rect::default(),
            actual_rect: Rect::default(),
            dpi: 96,
        }
    }

    fn entry(process_name: &str, class: &str, title_snippet: &str, file_path: Option<&str>) -> WorkspaceEntry {
        WorkspaceEntry {
            executable_path: format!(r"C:\apps\{process_name}.exe"),
            process_name: process_name.to_string(),
            window_class_name: class.to_string(),
            file_path: file_path.map(str::to_string),
            file_confidence: if file_path.is_some() { 90 } else { 0 },
            file_source: if file_path.is_some() { FileSource::TitleParse } else { FileSource::None },
            launch_arg: file_path.map(str::to_string),
            position: WindowRecord {
                executable_path: format!(r"C:\apps\{process_name}.exe"),
                process_name: process_name.to_string(),
                window_class_name: class.to_string(),
                title_snippet: title_snippet.to_string(),
                show_command: ShowCommand::Normal,
                rect: Rect::default(),
                dpi: 96,
                folder_path: None,
                monitor_id: String::new(),
                monitor_index: 0,
                monitor_name: String::new(),
            },
            monitor_id: String::new(),
            monitor_index: 0,
            monitor_name: String::new(),
            was_restored: false,
        }
    }

    #[allow(dead_code)]
    fn sample_monitor() -> Monitor {
        Monitor {
            monitor_id: "m".into(),
            friendly_name: "m".into(),
            device_name: "m".into(),
            index: 0,
            width_pixels: 1920,
            height_pixels: 1080,
            is_primary: true,
        }
    }

    #[test]
    fn document_aware_match_beats_class_match() {
        let e = entry("winword", "OpusApp", "report.docx - Word", Some(r"C:\Docs\report.docx"));
        let w = live("winword", "SomeOtherClass", "report.docx - Word");
        assert_eq!(match_quality(&e, &w), Some(MatchTier::DocumentAware));
    }

    #[test]
    fn class_match_beats_title_prefix() {
        let e = entry("notepad", "Notepad", "notes.txt - Notepad", None);
        let w = live("notepad", "Notepad", "completely different title");
        assert_eq!(match_quality(&e, &w), Some(MatchTier::ExeClass));
    }

    #[test]
    fn different_executable_never_matches() {
        let e = entry("notepad", "Notepad", "notes.txt - Notepad", None);
        let w = live("winword", "OpusApp", "notes.txt - Notepad");
        assert_eq!(match_quality(&e, &w), None);
    }

    #[test]
    fn title_prefix_matches_first_ten_bytes_case_insensitively() {
        assert!(title_prefix_matches("report.docx - Word", "REPORT.DOC - Word (Recovered)"));
        assert!(!title_prefix_matches("report.docx - Word", "unrelated - Word"));
    }

    #[test]
    fn title_prefix_match_is_utf8_boundary_safe() {
        // A 10-byte cut of a CJK title must not panic or split a code point.
        let snippet = "文書編集アプリ - メモ帳";
        assert!(title_prefix_matches(snippet, &format!("{snippet} something else")));
    }

    #[test]
    fn assignment_does_not_reuse_a_window_for_two_entries() {
        let entries = vec![
            entry("notepad", "Notepad", "a.txt - Notepad", None),
            entry("notepad", "Notepad", "b.txt - Notepad", None),
        ];
        let windows = vec![live("notepad", "Notepad", "a.txt - Notepad")];
        let assignment = match_entries_to_windows(&entries, &windows);
        let matched_count = assignment.iter().filter(|a| a.is_some()).count();
        assert_eq!(matched_count, 1);
    }

    #[test]
    fn bare_entry_is_skipped_when_a_doc_entry_for_the_same_exe_is_pending() {
        let entries = vec![
            entry("code", "Chrome_WidgetWin_1", "bare", None),
            entry("code", "Chrome_WidgetWin_1", "project", Some(r"C:\proj")),
        ];
        let ordered = docs_before_bare(vec![0, 1], &entries);
        assert_eq!(ordered, vec![1]);
    }

    #[test]
    fn bare_entries_launch_normally_with_no_doc_entry_pending() {
        let entries = vec![
            entry("notepad", "Notepad", "a.txt - Notepad", None),
            entry("notepad", "Notepad", "b.txt - Notepad", None),
        ];
        let ordered = docs_before_bare(vec![0, 1], &entries);
        assert_eq!(ordered, vec![0, 1]);
    }

    #[test]
    fn multiple_doc_entries_all_launch_and_stay_ordered() {
        let entries = vec![
            entry("code", "Chrome_WidgetWin_1", "a", Some(r"C:\a")),
            entry("code", "Chrome_WidgetWin_1", "bare", None),
            entry("code", "Chrome_WidgetWin_1", "b", Some(r"C:\b")),
        ];
        let ordered = docs_before_bare(vec![0, 1, 2], &entries);
        assert_eq!(ordered, vec![0, 2]);
    }

    #[test]
    fn grouping_preserves_first_seen_order() {
        let entries = vec![
            entry("chrome", "Chrome_WidgetWin_1", "a", None),
            entry("notepad", "Notepad", "b", None),
            entry("chrome", "Chrome_WidgetWin_1", "c", None),
        ];
        let groups = group_unmatched_by_exe(&entries);
        assert_eq!(groups[0].0, r"C:\apps\chrome.exe");
        assert_eq!(groups[0].1, vec![0, 2]);
        assert_eq!(groups[1].0, r"C:\apps\notepad.exe");
    }

    #[test]
    fn already_restored_entries_are_excluded_from_grouping() {
        let mut entries = vec![entry("notepad", "Notepad", "a", None)];
        entries[0].was_restored = true;
        assert!(group_unmatched_by_exe(&entries).is_empty());
    }

    #[tokio::test]
    async fn restore_with_no_live_windows_and_unlaunchable_exe_reports_zero_matches() {
        let snapshot = WorkspaceSnapshot {
            name: "test".into(),
            monitor_fingerprint: "fp".into(),
            saved_at: chrono::Utc::now(),
            saved_with_files: false,
            monitors: vec![],
            entries: vec![entry("definitely-not-a-real-binary", "X", "t", None)],
        };
        let cancel = CancellationToken::new();
        let outcome = restore_workspace(&snapshot, None, &cancel).await.unwrap();
        assert_eq!(outcome.matched, 0);
        assert_eq!(outcome.launched, 0);
    }

    #[tokio::test]
    async fn cancellation_before_launch_short_circuits() {
        let snapshot = WorkspaceSnapshot {
            name: "test".into(),
            monitor_fingerprint: "fp".into(),
            saved_at: chrono::Utc::now(),
            saved_with_files: false,
            monitors: vec![],
            entries: vec![entry("definitely-not-a-real-binary", "X", "t", None)],
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = restore_workspace(&snapshot, None, &cancel).await;
        assert!(matches!(result, Err(RestoreError::Cancelled)));
    }

    struct RecordingSink {
        events: std::sync::Mutex<Vec<CloseProgress>>,
    }

    impl ProgressSink for RecordingSink {
        fn on_close_progress(&self, report: CloseProgress) {
            self.events.lock().unwrap().push(report);
        }
    }

    #[tokio::test]
    async fn switch_workspace_reports_close_progress_then_restores_once_drained() {
        let snapshot = WorkspaceSnapshot {
            name: "test".into(),
            monitor_fingerprint: "fp".into(),
            saved_at: chrono::Utc::now(),
            saved_with_files: false,
            monitors: vec![],
            entries: vec![],
        };
        let cancel = CancellationToken::new();
        let sink = RecordingSink { events: std::sync::Mutex::new(Vec::new()) };
        let outcome = switch_workspace(&snapshot, None, &cancel, Some(&sink)).await.unwrap();
        assert_eq!(outcome.matched, 0);

        let events = sink.events.lock().unwrap();
        assert!(!events.is_empty(), "expected at least the leading close-progress report");
        assert_eq!(events[0].remaining, 0);
    }
}
